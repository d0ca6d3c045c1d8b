//! Training samples extracted from decision points.
//!
//! An [`ExperienceSample`] pairs the feature vectors of the legal moves of one
//! decision point with an [`ExpertDistribution`] over those same moves. The
//! `i`-th probability always describes the `i`-th legal move; a sample whose
//! lengths disagree is rejected with [`SampleMismatchError`], never truncated.
//!
//! - [`SelfPlaySample`] - Labelled by an agent's policy
//! - [`ImportedGameSample`] - Labelled one-hot on the move actually played
//! - [`TrainingExample`] - Validated, serialisable export of either

use std::{
    collections::BTreeMap,
    fmt,
    sync::{Mutex, PoisonError},
};

use serde::{Deserialize, Serialize};

use replaylab_engine::{Agent, Context, Game, MoveSet, Rules};

use crate::feature::{FeatureSet, FeatureVector};

/// Allowed deviation of a distribution's total from `1.0`.
pub const DISTRIBUTION_TOLERANCE: f32 = 1e-4;

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum SampleMismatchError {
    #[display("{vectors} feature vectors but {probabilities} probabilities")]
    LengthMismatch { vectors: usize, probabilities: usize },
    #[display("feature vector {index} does not fit feature set `{feature_set}`")]
    ShapeMismatch { index: usize, feature_set: String },
    #[display("probability {index} is {value}, expected a finite non-negative number")]
    InvalidProbability { index: usize, value: f32 },
    #[display("probabilities sum to {total}, expected 1")]
    BadTotal { total: f32 },
    #[display("recorded move {mv} is not among the {num_moves} legal moves")]
    UnknownMove { mv: String, num_moves: usize },
}

/// Probability distribution over the legal moves of a decision point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpertDistribution(Vec<f32>);

impl ExpertDistribution {
    /// Normalises non-negative weights into a distribution.
    pub fn from_weights(mut weights: Vec<f32>) -> Result<Self, SampleMismatchError> {
        check_probabilities(&weights)?;
        let total = weights.iter().sum::<f32>();
        if total <= 0.0 || !total.is_finite() {
            return Err(SampleMismatchError::BadTotal { total });
        }
        for w in &mut weights {
            *w /= total;
        }
        Ok(Self(weights))
    }

    /// Puts all mass on `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    #[must_use]
    pub fn one_hot(len: usize, index: usize) -> Self {
        assert!(index < len, "one-hot index {index} out of {len}");
        let mut probabilities = vec![0.0; len];
        probabilities[index] = 1.0;
        Self(probabilities)
    }

    #[must_use]
    pub fn probabilities(&self) -> &[f32] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Checks non-negativity and that the total is `1` within
    /// [`DISTRIBUTION_TOLERANCE`].
    pub fn validate(&self) -> Result<(), SampleMismatchError> {
        check_probabilities(&self.0)?;
        let total = self.0.iter().sum::<f32>();
        if (total - 1.0).abs() > DISTRIBUTION_TOLERANCE {
            return Err(SampleMismatchError::BadTotal { total });
        }
        Ok(())
    }
}

fn check_probabilities(values: &[f32]) -> Result<(), SampleMismatchError> {
    match values
        .iter()
        .enumerate()
        .find(|(_, v)| !v.is_finite() || **v < 0.0)
    {
        Some((index, value)) => Err(SampleMismatchError::InvalidProbability {
            index,
            value: *value,
        }),
        None => Ok(()),
    }
}

/// One unit of training data.
pub trait ExperienceSample<R>
where
    R: Rules,
{
    /// Move index of the decision point within its trial.
    fn move_index(&self) -> usize;

    /// Legal moves of the decision point, in rules order.
    fn legal_moves(&self) -> &[R::Move];

    /// One feature vector per legal move, in the same order.
    ///
    /// Implementations may return cached vectors; only values and order are
    /// guaranteed.
    fn generate_feature_vectors(&self, feature_set: &dyn FeatureSet<R>) -> Vec<FeatureVector>;

    /// Distribution aligned with [`Self::legal_moves`].
    fn expert_distribution(&self) -> &ExpertDistribution;
}

/// Feature vectors computed so far, keyed by feature-set id.
#[derive(Debug, Default)]
struct FeatureCache(Mutex<BTreeMap<String, Vec<FeatureVector>>>);

impl FeatureCache {
    fn get_or_compute<F>(&self, id: &str, compute: F) -> Vec<FeatureVector>
    where
        F: FnOnce() -> Vec<FeatureVector>,
    {
        let mut cache = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        cache
            .entry(id.to_owned())
            .or_insert_with(compute)
            .clone()
    }
}

/// Snapshot of a decision point shared by both sample kinds.
struct DecisionPoint<R>
where
    R: Rules,
{
    ctx: Context<R::State>,
    moves: MoveSet<R::Move>,
    cache: FeatureCache,
}

impl<R> fmt::Debug for DecisionPoint<R>
where
    R: Rules,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecisionPoint")
            .field("move_index", &self.ctx.move_index())
            .field("moves", &self.moves)
            .finish_non_exhaustive()
    }
}

impl<R> DecisionPoint<R>
where
    R: Rules,
{
    fn new(ctx: Context<R::State>, moves: MoveSet<R::Move>) -> Self {
        Self {
            ctx,
            moves,
            cache: FeatureCache::default(),
        }
    }

    fn feature_vectors(&self, feature_set: &dyn FeatureSet<R>) -> Vec<FeatureVector> {
        self.cache.get_or_compute(feature_set.id(), || {
            feature_set.compute_all(&self.ctx, &self.moves)
        })
    }
}

/// Decision point labelled by an agent's policy.
#[derive(Debug)]
pub struct SelfPlaySample<R>
where
    R: Rules,
{
    point: DecisionPoint<R>,
    agent: String,
    distribution: ExpertDistribution,
}

impl<R> SelfPlaySample<R>
where
    R: Rules,
{
    /// Builds a sample from a policy aligned with `moves`.
    pub fn new(
        ctx: Context<R::State>,
        moves: MoveSet<R::Move>,
        agent: impl Into<String>,
        policy: Vec<f32>,
    ) -> Result<Self, SampleMismatchError> {
        if policy.len() != moves.len() {
            return Err(SampleMismatchError::LengthMismatch {
                vectors: moves.len(),
                probabilities: policy.len(),
            });
        }
        Ok(Self {
            point: DecisionPoint::new(ctx, moves),
            agent: agent.into(),
            distribution: ExpertDistribution::from_weights(policy)?,
        })
    }

    /// Asks `agent` for its policy at `ctx`.
    pub fn from_agent(
        game: &Game<R>,
        ctx: Context<R::State>,
        agent: &dyn Agent<R>,
    ) -> Result<Self, SampleMismatchError> {
        let moves = game.legal_moves(&ctx);
        let policy = agent.policy(game, &ctx, &moves);
        Self::new(ctx, moves, agent.name(), policy)
    }

    /// Name of the labelling agent.
    #[must_use]
    pub fn agent(&self) -> &str {
        &self.agent
    }

    #[must_use]
    pub fn context(&self) -> &Context<R::State> {
        &self.point.ctx
    }
}

impl<R> ExperienceSample<R> for SelfPlaySample<R>
where
    R: Rules,
{
    fn move_index(&self) -> usize {
        self.point.ctx.move_index()
    }

    fn legal_moves(&self) -> &[R::Move] {
        &self.point.moves
    }

    fn generate_feature_vectors(&self, feature_set: &dyn FeatureSet<R>) -> Vec<FeatureVector> {
        self.point.feature_vectors(feature_set)
    }

    fn expert_distribution(&self) -> &ExpertDistribution {
        &self.distribution
    }
}

/// Decision point of an imported trial, labelled with the move played.
#[derive(Debug)]
pub struct ImportedGameSample<R>
where
    R: Rules,
{
    point: DecisionPoint<R>,
    played: usize,
    distribution: ExpertDistribution,
}

impl<R> ImportedGameSample<R>
where
    R: Rules,
{
    pub fn new(
        ctx: Context<R::State>,
        moves: MoveSet<R::Move>,
        played: &R::Move,
    ) -> Result<Self, SampleMismatchError> {
        let index = moves.iter().position(|mv| mv == played).ok_or_else(|| {
            SampleMismatchError::UnknownMove {
                mv: format!("{played:?}"),
                num_moves: moves.len(),
            }
        })?;
        Ok(Self {
            distribution: ExpertDistribution::one_hot(moves.len(), index),
            point: DecisionPoint::new(ctx, moves),
            played: index,
        })
    }

    /// The move that was played.
    #[must_use]
    pub fn played_move(&self) -> &R::Move {
        &self.point.moves[self.played]
    }

    #[must_use]
    pub fn context(&self) -> &Context<R::State> {
        &self.point.ctx
    }
}

impl<R> ExperienceSample<R> for ImportedGameSample<R>
where
    R: Rules,
{
    fn move_index(&self) -> usize {
        self.point.ctx.move_index()
    }

    fn legal_moves(&self) -> &[R::Move] {
        &self.point.moves
    }

    fn generate_feature_vectors(&self, feature_set: &dyn FeatureSet<R>) -> Vec<FeatureVector> {
        self.point.feature_vectors(feature_set)
    }

    fn expert_distribution(&self) -> &ExpertDistribution {
        &self.distribution
    }
}

/// Validated `(features, distribution)` pair ready for export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub feature_set: String,
    pub move_index: usize,
    pub features: Vec<FeatureVector>,
    pub distribution: ExpertDistribution,
}

impl TrainingExample {
    /// Encodes `sample` with `feature_set` and checks the alignment contract.
    pub fn from_sample<R, S>(
        sample: &S,
        feature_set: &dyn FeatureSet<R>,
    ) -> Result<Self, SampleMismatchError>
    where
        R: Rules,
        S: ExperienceSample<R> + ?Sized,
    {
        let features = sample.generate_feature_vectors(feature_set);
        let distribution = sample.expert_distribution().clone();
        if features.len() != distribution.len() {
            return Err(SampleMismatchError::LengthMismatch {
                vectors: features.len(),
                probabilities: distribution.len(),
            });
        }
        if let Some(index) = features.iter().position(|v| !feature_set.fits(v)) {
            return Err(SampleMismatchError::ShapeMismatch {
                index,
                feature_set: feature_set.id().to_owned(),
            });
        }
        distribution.validate()?;
        Ok(Self {
            feature_set: feature_set.id().to_owned(),
            move_index: sample.move_index(),
            features,
            distribution,
        })
    }
}
