//! Reference rules implementations.
//!
//! The replay engine treats rules as an opaque capability; the games in this
//! module exist so that replay, metrics and sample generation can be exercised
//! end to end.

pub use self::dice_nim::{DiceNim, DiceNimError, DiceNimMove, DiceNimState};

pub mod dice_nim;
