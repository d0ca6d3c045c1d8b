//! Training data extraction from recorded trials.
//!
//! # Key Components
//!
//! - [`FeatureSet`] / [`FeatureVector`] - Per-move encodings
//! - [`ExperienceSample`] - Feature vectors plus an aligned expert distribution
//!   ([`SelfPlaySample`], [`ImportedGameSample`])
//! - [`SampleCollector`] - Replays trials and stops at decision points
//! - [`TrainingExample`] - Validated export record
//!
//! Every exported example satisfies `features.len() == distribution.len()`,
//! with non-negative probabilities summing to one within
//! [`DISTRIBUTION_TOLERANCE`].

pub use self::{collect::*, feature::*, sample::*};

mod collect;
pub mod dice_nim;
mod feature;
mod sample;
