//! Action encodings.
//!
//! A [`FeatureSet`] turns one legal move of a decision point into a
//! [`FeatureVector`]: a sparse list of active spatial features plus a dense
//! block of aspatial values. Every vector produced by the same feature set has
//! the same shape, which is what a downstream learner relies on.

use std::fmt;

use serde::{Deserialize, Serialize};

use replaylab_engine::{Context, Rules};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    active_spatial: Vec<u32>,
    aspatial: Vec<f32>,
}

impl FeatureVector {
    /// Creates a vector; active indices are sorted and deduplicated.
    #[must_use]
    pub fn new(mut active_spatial: Vec<u32>, aspatial: Vec<f32>) -> Self {
        active_spatial.sort_unstable();
        active_spatial.dedup();
        Self {
            active_spatial,
            aspatial,
        }
    }

    #[must_use]
    pub fn active_spatial(&self) -> &[u32] {
        &self.active_spatial
    }

    #[must_use]
    pub fn aspatial(&self) -> &[f32] {
        &self.aspatial
    }
}

/// Encodes the legal moves of a decision point.
pub trait FeatureSet<R>: fmt::Debug + Send + Sync
where
    R: Rules,
{
    /// Stable identifier, used as cache key and recorded in exported examples.
    fn id(&self) -> &str;

    /// Number of distinct spatial features; active indices are below this.
    fn num_spatial_features(&self) -> usize;

    /// Length of the aspatial block of every vector.
    fn num_aspatial_features(&self) -> usize;

    #[must_use]
    fn compute(&self, ctx: &Context<R::State>, mv: &R::Move) -> FeatureVector;

    /// Encodes `moves` in order.
    #[must_use]
    fn compute_all(&self, ctx: &Context<R::State>, moves: &[R::Move]) -> Vec<FeatureVector> {
        moves.iter().map(|mv| self.compute(ctx, mv)).collect()
    }

    /// Whether `vector` has the shape this feature set produces.
    #[must_use]
    fn fits(&self, vector: &FeatureVector) -> bool {
        vector.aspatial.len() == self.num_aspatial_features()
            && vector
                .active_spatial
                .iter()
                .all(|i| usize::try_from(*i).is_ok_and(|i| i < self.num_spatial_features()))
    }
}
