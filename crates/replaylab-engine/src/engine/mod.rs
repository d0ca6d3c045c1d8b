//! Game façade, replay and trial recording.
//!
//! - [`Rules`] - Capability consumed from a rules implementation
//! - [`Game`] - Rules plus immutable [`GameSettings`]; keeps context counters
//! - [`ReplayEngine`] - Deterministic reconstruction of recorded trials
//! - [`TrialRunner`] - Plays and records new trials with a set of [`Agent`]s
//!
//! # Replay Flow
//!
//! 1. [`ReplayEngine::reconstruct`] restores a context from a [`RandomState`](crate::RandomState)
//! 2. [`ReplayEngine::advance`] re-applies recorded moves, checking legality
//! 3. The caller inspects the context (legal moves, outcome, counters)
//!
//! Stopping at move `k` and later resuming from `k` reaches the same state as
//! replaying straight to the end.

pub use self::{game::*, replay::*, runner::*};

mod game;
mod replay;
mod runner;
