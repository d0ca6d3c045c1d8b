//! Metrics over batches of recorded trials.
//!
//! - [`Metric`] - Tagged set of outcome and concept metrics
//! - [`Evaluation`] - Parallel, order-independent evaluation of a batch
//! - [`TrialSummary`] - Per-trial data the metrics reduce
//!
//! ```
//! use replaylab_engine::{
//!     Agent, Game, GameSettings, RandomState, TrialRunner, UniformAgent, games::DiceNim,
//! };
//! use replaylab_metrics::{Evaluation, Metric};
//!
//! let game = Game::new(DiceNim::new(&[3, 4, 5]).unwrap(), GameSettings::new(2));
//! let agents: [&dyn Agent<DiceNim>; 2] = [&UniformAgent, &UniformAgent];
//! let mut rng = rand::rng();
//! let states = (0..4).map(|_| RandomState::random(&mut rng)).collect::<Vec<_>>();
//! let trials = states
//!     .iter()
//!     .map(|state| TrialRunner::new(&game).run(state, &agents, &mut rng))
//!     .collect::<Vec<_>>();
//!
//! let report = Evaluation::new(Metric::ALL.to_vec())
//!     .run(&game, &trials, &states)
//!     .unwrap();
//! assert_eq!(report.metrics.len(), Metric::ALL.len());
//! assert!(report.skipped.is_empty());
//! ```

pub use self::{evaluation::*, metric::*, summary::*};

mod evaluation;
mod metric;
mod summary;
