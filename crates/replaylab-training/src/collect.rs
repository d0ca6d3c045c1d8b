use std::{fmt, num::NonZeroUsize};

use log::debug;

use replaylab_engine::{
    Agent, Context, Game, RandomState, ReplayEngine, Rules, Trial, TrialError,
};

use crate::{
    feature::FeatureSet,
    sample::{
        ExperienceSample, ImportedGameSample, SampleMismatchError, SelfPlaySample,
        TrainingExample,
    },
};

/// Which decision points of a trial become samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DecisionPoints {
    /// Every real move.
    #[default]
    All,
    /// Every `n`-th real move, starting with the first one.
    Every(NonZeroUsize),
}

impl DecisionPoints {
    /// Whether the `ordinal`-th real move (0-based) is selected.
    #[must_use]
    pub fn selects(&self, ordinal: usize) -> bool {
        match self {
            Self::All => true,
            Self::Every(n) => ordinal % n.get() == 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum CollectError {
    #[display("{_0}")]
    Trial(TrialError),
    #[display("move {index}: {error}")]
    #[from(ignore)]
    Sample {
        index: usize,
        #[error(source)]
        error: SampleMismatchError,
    },
}

/// Replays trials and turns their decision points into samples.
pub struct SampleCollector<'g, R> {
    game: &'g Game<R>,
    points: DecisionPoints,
}

impl<R> fmt::Debug for SampleCollector<'_, R>
where
    R: Rules,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampleCollector")
            .field("game", &self.game.name())
            .field("points", &self.points)
            .finish()
    }
}

impl<'g, R> SampleCollector<'g, R>
where
    R: Rules,
{
    #[must_use]
    pub const fn new(game: &'g Game<R>, points: DecisionPoints) -> Self {
        Self { game, points }
    }

    /// One-hot samples on the moves recorded in `trial`.
    pub fn imported(
        &self,
        trial: &Trial<R::Move>,
        random_state: &RandomState,
    ) -> Result<Vec<ImportedGameSample<R>>, CollectError> {
        self.collect(trial, random_state, |ctx, moves, played| {
            ImportedGameSample::new(ctx.clone(), moves, played)
        })
    }

    /// Samples labelled by `expert` at the decision points of `trial`.
    pub fn self_play(
        &self,
        trial: &Trial<R::Move>,
        random_state: &RandomState,
        expert: &dyn Agent<R>,
    ) -> Result<Vec<SelfPlaySample<R>>, CollectError> {
        self.collect(trial, random_state, |ctx, moves, _| {
            let policy = expert.policy(self.game, ctx, &moves);
            SelfPlaySample::new(ctx.clone(), moves, expert.name(), policy)
        })
    }

    /// Validated training examples for `trial`.
    ///
    /// With an `expert`, decision points are labelled by its policy;
    /// otherwise by the recorded moves.
    pub fn export(
        &self,
        trial: &Trial<R::Move>,
        random_state: &RandomState,
        expert: Option<&dyn Agent<R>>,
        feature_set: &dyn FeatureSet<R>,
    ) -> Result<Vec<TrainingExample>, CollectError> {
        match expert {
            Some(expert) => {
                to_examples(&self.self_play(trial, random_state, expert)?, feature_set)
            }
            None => to_examples(&self.imported(trial, random_state)?, feature_set),
        }
    }

    fn collect<S, F>(
        &self,
        trial: &Trial<R::Move>,
        random_state: &RandomState,
        mut make: F,
    ) -> Result<Vec<S>, CollectError>
    where
        F: FnMut(&Context<R::State>, Vec<R::Move>, &R::Move) -> Result<S, SampleMismatchError>,
    {
        let start = trial.num_initial_placement_moves();
        let points = self.points;
        let mut samples = vec![];
        ReplayEngine::new(self.game).for_each_decision(
            trial,
            random_state,
            |index| points.selects(index - start),
            |index, ctx, moves, played| {
                samples.push(
                    make(ctx, moves, played).map_err(|error| CollectError::Sample { index, error }),
                );
            },
        )?;
        let samples = samples.into_iter().collect::<Result<Vec<_>, _>>()?;
        debug!(
            "collected {} samples from a trial of {} moves",
            samples.len(),
            trial.num_moves()
        );
        Ok(samples)
    }
}

fn to_examples<R, S>(
    samples: &[S],
    feature_set: &dyn FeatureSet<R>,
) -> Result<Vec<TrainingExample>, CollectError>
where
    R: Rules,
    S: ExperienceSample<R>,
{
    samples
        .iter()
        .map(|sample| {
            TrainingExample::from_sample(sample, feature_set).map_err(|error| {
                CollectError::Sample {
                    index: sample.move_index(),
                    error,
                }
            })
        })
        .collect()
}
