use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use replaylab_engine::{
    Game, GameSettings, RandomState, Trial,
    games::{DiceNim, DiceNimMove},
};

/// Batch of recorded trials together with the game they were played on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialCollection {
    /// Timestamp when the collection was recorded (ISO 8601 format)
    pub recorded_at: DateTime<Utc>,
    pub game: GameConfig,
    /// Agent that played every seat
    pub agent: String,
    pub trials: Vec<RecordedTrial>,
}

/// Parameters needed to rebuild the game of a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    pub players: usize,
    pub piles: Vec<u16>,
    pub max_turn_limit: usize,
    pub max_move_limit: usize,
}

/// A trial and the random state it must be replayed from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedTrial {
    pub random_state: RandomState,
    pub trial: Trial<DiceNimMove>,
}

impl GameConfig {
    pub const PLAYERS: std::ops::RangeInclusive<usize> = 2..=4;

    pub fn settings(&self) -> GameSettings {
        GameSettings::new(self.players).with_limits(self.max_turn_limit, self.max_move_limit)
    }

    pub fn to_game(&self) -> anyhow::Result<Game<DiceNim>> {
        anyhow::ensure!(
            Self::PLAYERS.contains(&self.players),
            "Dice Nim is played by 2 to 4 players, got {}",
            self.players
        );
        let rules = DiceNim::new(&self.piles)?;
        Ok(Game::new(rules, self.settings()))
    }
}

impl TrialCollection {
    /// Index-aligned trials and random states.
    pub fn split(&self) -> (Vec<Trial<DiceNimMove>>, Vec<RandomState>) {
        self.trials
            .iter()
            .map(|recorded| (recorded.trial.clone(), recorded.random_state.clone()))
            .unzip()
    }

    pub fn get(&self, index: usize) -> anyhow::Result<&RecordedTrial> {
        self.trials.get(index).ok_or_else(|| {
            anyhow::anyhow!(
                "Trial index {index} out of range (collection holds {} trials)",
                self.trials.len()
            )
        })
    }
}
