use serde::{Deserialize, Serialize};

/// How a recorded trial ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::IsVariant)]
#[serde(rename_all = "snake_case")]
pub enum TrialStatus {
    /// The game had not reached a terminal state when recording stopped
    /// (typically because a turn or move limit was hit).
    Ongoing,
    /// The game reached a terminal state.
    Finished {
        /// Winning player, `None` for a draw.
        winner: Option<usize>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum MalformedTrialError {
    #[display(
        "trial declares {placement_moves} placement moves but only records {num_moves} moves"
    )]
    PlacementOverflow {
        placement_moves: usize,
        num_moves: usize,
    },
    #[display("trial declares {num_turns} turns but only {real_moves} real moves")]
    TooManyTurns { num_turns: usize, real_moves: usize },
    #[display("trial records {real_moves} real moves but no turns")]
    MissingTurns { real_moves: usize },
    #[display("trial winner {winner} is not a player index")]
    UnknownWinner { winner: usize },
}

/// Record of one game session.
///
/// A trial stores the ordered list of moves, split into an initial placement
/// phase followed by real moves, plus the number of turns and the final
/// status. Move indices are 0-based and stable: moves are only ever appended.
///
/// Trials loaded from external data should be checked with
/// [`Trial::validate`] before use; the replay engine does so itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trial<M> {
    moves: Vec<M>,
    num_initial_placement_moves: usize,
    num_turns: usize,
    status: TrialStatus,
}

impl<M> Default for Trial<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> Trial<M> {
    /// Creates an empty, ongoing trial.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            moves: vec![],
            num_initial_placement_moves: 0,
            num_turns: 0,
            status: TrialStatus::Ongoing,
        }
    }

    /// Builds a trial from recorded parts, rejecting inconsistent counters.
    pub fn from_parts(
        moves: Vec<M>,
        num_initial_placement_moves: usize,
        num_turns: usize,
        status: TrialStatus,
    ) -> Result<Self, MalformedTrialError> {
        let trial = Self {
            moves,
            num_initial_placement_moves,
            num_turns,
            status,
        };
        trial.validate()?;
        Ok(trial)
    }

    /// Checks the structural consistency of the counters.
    pub fn validate(&self) -> Result<(), MalformedTrialError> {
        if self.num_initial_placement_moves > self.moves.len() {
            return Err(MalformedTrialError::PlacementOverflow {
                placement_moves: self.num_initial_placement_moves,
                num_moves: self.moves.len(),
            });
        }
        let real_moves = self.number_real_moves();
        if self.num_turns > real_moves {
            return Err(MalformedTrialError::TooManyTurns {
                num_turns: self.num_turns,
                real_moves,
            });
        }
        if real_moves > 0 && self.num_turns == 0 {
            return Err(MalformedTrialError::MissingTurns { real_moves });
        }
        Ok(())
    }

    /// Checks that the recorded winner (if any) is one of `players`.
    pub fn validate_players(&self, players: usize) -> Result<(), MalformedTrialError> {
        match self.status {
            TrialStatus::Finished {
                winner: Some(winner),
            } if winner >= players => Err(MalformedTrialError::UnknownWinner { winner }),
            _ => Ok(()),
        }
    }

    /// Appends an initial placement move.
    ///
    /// # Panics
    ///
    /// Panics if a real move has already been recorded.
    pub fn push_placement_move(&mut self, mv: M) {
        assert_eq!(
            self.moves.len(),
            self.num_initial_placement_moves,
            "placement moves must precede real moves"
        );
        self.moves.push(mv);
        self.num_initial_placement_moves += 1;
    }

    /// Appends a real move.
    pub fn push_move(&mut self, mv: M) {
        self.moves.push(mv);
    }

    /// Sets the final counters once recording stops.
    pub fn finish(&mut self, num_turns: usize, status: TrialStatus) {
        self.num_turns = num_turns;
        self.status = status;
    }

    #[must_use]
    pub fn moves(&self) -> &[M] {
        &self.moves
    }

    #[must_use]
    pub fn get_move(&self, index: usize) -> Option<&M> {
        self.moves.get(index)
    }

    /// Total number of recorded moves, placement moves included.
    #[must_use]
    pub fn num_moves(&self) -> usize {
        self.moves.len()
    }

    #[must_use]
    pub fn num_initial_placement_moves(&self) -> usize {
        self.num_initial_placement_moves
    }

    /// Number of moves played after the placement phase.
    #[must_use]
    pub fn number_real_moves(&self) -> usize {
        self.moves
            .len()
            .saturating_sub(self.num_initial_placement_moves)
    }

    #[must_use]
    pub fn num_turns(&self) -> usize {
        self.num_turns
    }

    #[must_use]
    pub fn status(&self) -> TrialStatus {
        self.status
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_finished()
    }

    /// Returns the winning player of a finished trial.
    #[must_use]
    pub fn winner(&self) -> Option<usize> {
        match self.status {
            TrialStatus::Finished { winner } => winner,
            TrialStatus::Ongoing => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let mut trial = Trial::new();
        trial.push_placement_move('a');
        trial.push_placement_move('b');
        trial.push_move('c');
        trial.push_move('d');
        trial.push_move('e');
        trial.finish(2, TrialStatus::Finished { winner: Some(1) });

        assert_eq!(trial.num_moves(), 5);
        assert_eq!(trial.num_initial_placement_moves(), 2);
        assert_eq!(trial.number_real_moves(), 3);
        assert_eq!(trial.num_turns(), 2);
        assert_eq!(trial.get_move(2), Some(&'c'));
        assert!(trial.is_terminal());
        assert_eq!(trial.winner(), Some(1));
        assert!(trial.validate().is_ok());
    }

    #[test]
    #[should_panic(expected = "placement moves must precede real moves")]
    fn test_placement_after_real_move_panics() {
        let mut trial = Trial::new();
        trial.push_move(1);
        trial.push_placement_move(2);
    }

    #[test]
    fn test_from_parts_rejects_inconsistent_counters() {
        assert_eq!(
            Trial::from_parts(vec![1, 2], 3, 0, TrialStatus::Ongoing),
            Err(MalformedTrialError::PlacementOverflow {
                placement_moves: 3,
                num_moves: 2
            })
        );
        assert_eq!(
            Trial::from_parts(vec![1, 2, 3], 1, 3, TrialStatus::Ongoing),
            Err(MalformedTrialError::TooManyTurns {
                num_turns: 3,
                real_moves: 2
            })
        );
        assert_eq!(
            Trial::from_parts(vec![1, 2, 3], 1, 0, TrialStatus::Ongoing),
            Err(MalformedTrialError::MissingTurns { real_moves: 2 })
        );
        assert!(Trial::<u8>::from_parts(vec![], 0, 0, TrialStatus::Ongoing).is_ok());
    }

    #[test]
    fn test_deserialized_trial_is_validated_separately() {
        let json = r#"{
            "moves": [1, 2],
            "num_initial_placement_moves": 5,
            "num_turns": 0,
            "status": "ongoing"
        }"#;
        let trial: Trial<u8> = serde_json::from_str(json).unwrap();
        assert!(matches!(
            trial.validate(),
            Err(MalformedTrialError::PlacementOverflow { .. })
        ));
    }

    #[test]
    fn test_unknown_winner() {
        let trial = Trial::from_parts(vec![0], 0, 1, TrialStatus::Finished { winner: Some(3) })
            .unwrap();
        assert_eq!(
            trial.validate_players(2),
            Err(MalformedTrialError::UnknownWinner { winner: 3 })
        );
        assert!(trial.validate_players(4).is_ok());
    }
}
