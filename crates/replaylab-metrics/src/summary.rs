use serde::{Deserialize, Serialize};

use replaylab_engine::{RandomState, ReplayEngine, Rules, Trial, TrialError, TrialStatus};

/// Everything the metrics need to know about one trial.
///
/// Summaries are computed once per trial and shared by every metric of an
/// evaluation, so a trial is replayed at most once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialSummary {
    index: usize,
    num_turns: usize,
    real_moves: usize,
    timed_out: bool,
    status: TrialStatus,
    branching: Option<Vec<usize>>,
}

impl TrialSummary {
    /// Summarises `trial`, replaying it when `replay` is set.
    ///
    /// Structural checks always run; the branching profile (and therefore the
    /// legality of every recorded move) is only checked on replay.
    pub fn new<R>(
        engine: ReplayEngine<'_, R>,
        index: usize,
        trial: &Trial<R::Move>,
        random_state: &RandomState,
        replay: bool,
    ) -> Result<Self, TrialFailure>
    where
        R: Rules,
    {
        let game = engine.game();
        let fail = |error: TrialError| TrialFailure { index, error };
        trial.validate().map_err(|e| fail(e.into()))?;
        trial
            .validate_players(game.settings().players)
            .map_err(|e| fail(e.into()))?;
        let branching = if replay {
            Some(
                engine
                    .branching_profile(trial, random_state)
                    .map_err(fail)?,
            )
        } else {
            None
        };
        Ok(Self {
            index,
            num_turns: trial.num_turns(),
            real_moves: trial.number_real_moves(),
            timed_out: game.is_timeout(trial),
            status: trial.status(),
            branching,
        })
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn num_turns(&self) -> usize {
        self.num_turns
    }

    #[must_use]
    pub fn real_moves(&self) -> usize {
        self.real_moves
    }

    #[must_use]
    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    #[must_use]
    pub fn status(&self) -> TrialStatus {
        self.status
    }

    /// Legal-move counts along the branching walk, empty if not replayed.
    #[must_use]
    pub fn branching(&self) -> &[usize] {
        self.branching.as_deref().unwrap_or_default()
    }
}

/// A trial that could not be summarised.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("trial {index}: {error}")]
pub struct TrialFailure {
    pub index: usize,
    #[error(source)]
    pub error: TrialError,
}

/// Serialisable record of a trial excluded from a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedTrial {
    pub index: usize,
    pub reason: String,
}

impl From<&TrialFailure> for SkippedTrial {
    fn from(failure: &TrialFailure) -> Self {
        Self {
            index: failure.index,
            reason: failure.error.to_string(),
        }
    }
}
