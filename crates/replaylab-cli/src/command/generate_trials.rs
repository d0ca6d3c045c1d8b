use std::path::PathBuf;

use chrono::Utc;
use log::info;

use replaylab_engine::{Agent, GameSettings, RandomState, TrialRunner, games::DiceNim};

use crate::{
    agent::AgentKind,
    schema::record::{GameConfig, RecordedTrial, TrialCollection},
    util,
};

const PROGRESS_INTERVAL: usize = 100;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct GenerateTrialsArg {
    /// Number of trials to play
    #[arg(long, default_value_t = 100)]
    num_trials: usize,
    /// Number of players (2 to 4)
    #[arg(long, default_value_t = 2)]
    players: usize,
    /// Initial pile sizes, comma separated
    #[arg(long, value_delimiter = ',', default_values_t = [3, 4, 5])]
    piles: Vec<u16>,
    /// Turn limit; longer trials count as timeouts
    #[arg(long, default_value_t = GameSettings::DEFAULT_MAX_TURN_LIMIT)]
    max_turns: usize,
    /// Real move limit; longer trials count as timeouts
    #[arg(long, default_value_t = GameSettings::DEFAULT_MAX_MOVE_LIMIT)]
    max_moves: usize,
    /// Agent playing every seat
    #[arg(long, value_enum, default_value_t = AgentKind::Random)]
    agent: AgentKind,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &GenerateTrialsArg) -> anyhow::Result<()> {
    let GenerateTrialsArg {
        num_trials,
        players,
        piles,
        max_turns,
        max_moves,
        agent,
        output,
    } = arg;

    let config = GameConfig {
        players: *players,
        piles: piles.clone(),
        max_turn_limit: *max_turns,
        max_move_limit: *max_moves,
    };
    let game = config.to_game()?;
    let agent = agent.build()?;
    let agents: Vec<&dyn Agent<DiceNim>> = vec![agent.as_ref(); *players];
    let runner = TrialRunner::new(&game);

    let mut rng = rand::rng();
    let mut trials = Vec::with_capacity(*num_trials);
    let mut timeouts = 0;
    for i in 0..*num_trials {
        let random_state = RandomState::random(&mut rng);
        let trial = runner.run(&random_state, &agents, &mut rng);
        if game.is_timeout(&trial) {
            timeouts += 1;
        }
        trials.push(RecordedTrial {
            random_state,
            trial,
        });
        if (i + 1) % PROGRESS_INTERVAL == 0 {
            info!("played {}/{num_trials} trials", i + 1);
        }
    }
    info!(
        "recorded {num_trials} trials of {} with agent {} ({timeouts} timeouts)",
        game.name(),
        agent.name()
    );

    let collection = TrialCollection {
        recorded_at: Utc::now(),
        game: config,
        agent: agent.name().to_owned(),
        trials,
    };
    util::save_json(&collection, output.as_deref())?;
    Ok(())
}
