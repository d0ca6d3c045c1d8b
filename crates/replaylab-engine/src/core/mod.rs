//! Core data structures shared by play, replay and measurement.
//!
//! - [`RandomState`] / [`RandomSeed`] - Restorable snapshots of the game RNG
//! - [`Context`] - Mutable reconstruction target (state, RNG, counters)
//! - [`Trial`] - Append-only record of a played game session

pub use self::{context::*, random_state::*, trial::*};

mod context;
mod random_state;
mod trial;
