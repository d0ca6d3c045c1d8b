//! Batch evaluation of metrics over recorded trials.
//!
//! An [`Evaluation`] summarises every trial of a batch exactly once, spreading
//! the work over scoped threads, and then lets each metric reduce the same
//! summaries. Results are collected in trial-index order, so reports do not
//! depend on the number of threads or on which thread finishes first.
//!
//! # Failure Policy
//!
//! A trial that cannot be summarised (malformed counters, an illegal move on
//! replay) is handled according to [`FailurePolicy`]:
//!
//! - [`FailurePolicy::Skip`] - The trial is excluded from every metric and
//!   listed in the report with its index
//! - [`FailurePolicy::Strict`] - The evaluation fails with the error of the
//!   lowest-index failing trial

use std::{num::NonZeroUsize, panic, thread};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use replaylab_engine::{Game, RandomState, ReplayEngine, Rules, Trial};

use crate::{
    metric::{Metric, MetricReport},
    summary::{SkippedTrial, TrialFailure, TrialSummary},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, derive_more::IsVariant)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    #[default]
    Skip,
    Strict,
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum EvaluationError {
    #[display("got {trials} trials but {random_states} random states")]
    #[from(ignore)]
    LengthMismatch { trials: usize, random_states: usize },
    #[display("{_0}")]
    Trial(TrialFailure),
}

/// Summaries of a batch, split into successes and failures.
#[derive(Debug, Clone, Default)]
pub struct SummaryBatch {
    /// Successful summaries in trial-index order.
    pub summaries: Vec<TrialSummary>,
    /// Failed trials in trial-index order.
    pub failures: Vec<TrialFailure>,
}

impl SummaryBatch {
    #[must_use]
    pub fn skipped(&self) -> Vec<SkippedTrial> {
        self.failures.iter().map(SkippedTrial::from).collect()
    }
}

/// Reports of every metric of an evaluation over one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub game: String,
    pub players: usize,
    pub num_trials: usize,
    pub failure_policy: FailurePolicy,
    pub metrics: Vec<MetricReport>,
    pub skipped: Vec<SkippedTrial>,
}

/// Run configuration shared by every metric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    metrics: Vec<Metric>,
    failure_policy: FailurePolicy,
    parallelism: NonZeroUsize,
}

impl Default for Evaluation {
    fn default() -> Self {
        Self::new(Metric::ALL.to_vec())
    }
}

impl Evaluation {
    /// Creates an evaluation that skips failing trials and uses all
    /// available cores.
    #[must_use]
    pub fn new(metrics: Vec<Metric>) -> Self {
        Self {
            metrics,
            failure_policy: FailurePolicy::default(),
            parallelism: thread::available_parallelism().unwrap_or(NonZeroUsize::MIN),
        }
    }

    #[must_use]
    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    /// Sets the number of worker threads; `0` is treated as `1`.
    #[must_use]
    pub fn with_parallelism(mut self, threads: usize) -> Self {
        self.parallelism = NonZeroUsize::new(threads).unwrap_or(NonZeroUsize::MIN);
        self
    }

    #[must_use]
    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    #[must_use]
    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    #[must_use]
    pub fn parallelism(&self) -> usize {
        self.parallelism.get()
    }

    /// Applies every metric to the batch.
    pub fn run<R>(
        &self,
        game: &Game<R>,
        trials: &[Trial<R::Move>],
        random_states: &[RandomState],
    ) -> Result<EvaluationReport, EvaluationError>
    where
        R: Rules,
    {
        let replay = self.metrics.iter().any(Metric::needs_replay);
        let batch = self.summarize(game, trials, random_states, replay)?;
        let skipped = batch.skipped();
        let metrics = self
            .metrics
            .iter()
            .map(|metric| metric.report(game.settings(), &batch.summaries, &skipped))
            .collect::<Vec<_>>();
        info!(
            "evaluated {} metrics over {} trials of {} ({} skipped)",
            metrics.len(),
            batch.summaries.len(),
            game.name(),
            skipped.len()
        );
        Ok(EvaluationReport {
            game: game.name().to_owned(),
            players: game.settings().players,
            num_trials: trials.len(),
            failure_policy: self.failure_policy,
            metrics,
            skipped,
        })
    }

    /// Summarises every trial of the batch, in parallel.
    ///
    /// `trials[i]` is replayed from `random_states[i]` when `replay` is set.
    pub fn summarize<R>(
        &self,
        game: &Game<R>,
        trials: &[Trial<R::Move>],
        random_states: &[RandomState],
        replay: bool,
    ) -> Result<SummaryBatch, EvaluationError>
    where
        R: Rules,
    {
        if trials.len() != random_states.len() {
            return Err(EvaluationError::LengthMismatch {
                trials: trials.len(),
                random_states: random_states.len(),
            });
        }

        let engine = ReplayEngine::new(game);
        let chunk_size = trials.len().div_ceil(self.parallelism.get()).max(1);
        let results = thread::scope(|s| {
            let handles = trials
                .chunks(chunk_size)
                .zip(random_states.chunks(chunk_size))
                .enumerate()
                .map(|(chunk, (trials, random_states))| {
                    let offset = chunk * chunk_size;
                    s.spawn(move || {
                        trials
                            .iter()
                            .zip(random_states)
                            .enumerate()
                            .map(|(i, (trial, random_state))| {
                                TrialSummary::new(engine, offset + i, trial, random_state, replay)
                            })
                            .collect::<Vec<_>>()
                    })
                })
                .collect::<Vec<_>>();
            handles
                .into_iter()
                .flat_map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|payload| panic::resume_unwind(payload))
                })
                .collect::<Vec<_>>()
        });

        let mut batch = SummaryBatch::default();
        for result in results {
            match result {
                Ok(summary) => batch.summaries.push(summary),
                Err(failure) => {
                    debug!("{failure}");
                    if self.failure_policy.is_strict() {
                        return Err(failure.into());
                    }
                    warn!("skipping {failure}");
                    batch.failures.push(failure);
                }
            }
        }
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use replaylab_engine::{
        Agent, GameSettings, RandomSeed, ReplayError, TrialError, TrialRunner, TrialStatus,
        UniformAgent,
        games::{DiceNim, DiceNimMove},
    };

    use super::*;
    use crate::metric::{ConceptMetric, MetricValue, OutcomeMetric};

    const BRANCHING_MAX: Metric = Metric::Outcome(OutcomeMetric::BranchingFactorMax);
    const NOT_TIMEOUTS: Metric = Metric::Concept(ConceptMetric::DurationTurnsNotTimeouts);

    fn game(settings: GameSettings) -> Game<DiceNim> {
        Game::new(DiceNim::new(&[4, 5, 6]).unwrap(), settings)
    }

    fn random_state(byte: u8) -> RandomState {
        RandomState::from_seed(RandomSeed::from_bytes([byte; 16]))
    }

    fn record(game: &Game<DiceNim>, count: u8) -> (Vec<Trial<DiceNimMove>>, Vec<RandomState>) {
        let agents: [&dyn Agent<DiceNim>; 2] = [&UniformAgent, &UniformAgent];
        let runner = TrialRunner::new(game);
        let random_states = (0..count).map(random_state).collect::<Vec<_>>();
        let trials = random_states
            .iter()
            .map(|state| runner.run(state, &agents, &mut rand::rng()))
            .collect();
        (trials, random_states)
    }

    /// A trial whose `num_turns` turns each hold a single move.
    fn synthetic(num_turns: usize) -> Trial<DiceNimMove> {
        let moves = vec![DiceNimMove::Take { pile: 0, count: 1 }; num_turns];
        Trial::from_parts(
            moves,
            0,
            num_turns,
            TrialStatus::Finished { winner: Some(0) },
        )
        .unwrap()
    }

    fn scalar(report: &MetricReport) -> f64 {
        report.value.as_scalar().unwrap()
    }

    #[test]
    fn test_empty_batch_branching_factor_is_zero() {
        let game = game(GameSettings::new(2));
        let report = BRANCHING_MAX
            .apply(&game, &Evaluation::default(), &[], &[])
            .unwrap();
        assert_eq!(report.value, MetricValue::Scalar(0.0));
        assert_eq!(report.num_trials, 0);
    }

    #[test]
    fn test_all_timeouts_fall_back_to_turn_limit_times_players() {
        let game = game(GameSettings::new(2).with_limits(5, 100));
        let trials = vec![synthetic(6), synthetic(7), synthetic(9)];
        let states = vec![random_state(0); 3];
        let report = NOT_TIMEOUTS
            .apply(&game, &Evaluation::default(), &trials, &states)
            .unwrap();
        assert_eq!(scalar(&report), 10.0);

        let empty = NOT_TIMEOUTS
            .apply(&game, &Evaluation::default(), &[], &[])
            .unwrap();
        assert_eq!(scalar(&empty), 10.0);
    }

    #[test]
    fn test_fallback_with_huge_limits_does_not_overflow() {
        let game = game(GameSettings::new(2).with_limits(usize::MAX, usize::MAX));
        let report = NOT_TIMEOUTS
            .apply(&game, &Evaluation::default(), &[], &[])
            .unwrap();
        #[expect(clippy::cast_precision_loss)]
        let expected = usize::MAX as f64 * 2.0;
        assert_eq!(scalar(&report), expected);
        assert!(scalar(&report).is_finite());
    }

    #[test]
    fn test_move_limit_alone_marks_timeout() {
        let game = game(GameSettings::new(2).with_limits(100, 2));
        let long_turn = Trial::from_parts(
            vec![DiceNimMove::Take { pile: 0, count: 1 }; 3],
            0,
            1,
            TrialStatus::Finished { winner: Some(0) },
        )
        .unwrap();
        let trials = vec![long_turn, synthetic(2)];
        let states = vec![random_state(0); 2];
        assert!(game.is_timeout(&trials[0]));
        assert!(!game.is_timeout(&trials[1]));

        let report = NOT_TIMEOUTS
            .apply(&game, &Evaluation::default(), &trials, &states)
            .unwrap();
        assert_eq!(scalar(&report), 2.0);

        let timeouts = Metric::Concept(ConceptMetric::Timeouts)
            .apply(&game, &Evaluation::default(), &trials, &states)
            .unwrap();
        assert_eq!(scalar(&timeouts), 0.5);
    }

    #[test]
    fn test_partial_timeouts_average_remaining_trials() {
        let game = game(GameSettings::new(2).with_limits(5, 100));
        let trials = vec![synthetic(3), synthetic(8), synthetic(4)];
        let states = vec![random_state(0); 3];
        let report = NOT_TIMEOUTS
            .apply(&game, &Evaluation::default(), &trials, &states)
            .unwrap();
        assert_eq!(scalar(&report), 3.5);

        let all = Metric::Concept(ConceptMetric::DurationTurns)
            .apply(&game, &Evaluation::default(), &trials, &states)
            .unwrap();
        assert_eq!(scalar(&all), 5.0);

        let timeouts = Metric::Concept(ConceptMetric::Timeouts)
            .apply(&game, &Evaluation::default(), &trials, &states)
            .unwrap();
        assert!((scalar(&timeouts) - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_branching_max_bounds_first_measured_state() {
        let game = game(GameSettings::new(2));
        let engine = ReplayEngine::new(&game);
        let (trials, states) = record(&game, 8);
        for (trial, state) in trials.iter().zip(&states) {
            let report = BRANCHING_MAX
                .apply(
                    &game,
                    &Evaluation::default(),
                    std::slice::from_ref(trial),
                    std::slice::from_ref(state),
                )
                .unwrap();
            let start = trial.num_initial_placement_moves();
            let first = engine.replay_to(trial, state, start).unwrap();
            let first_count = game.legal_moves(&first).len();
            assert!(scalar(&report) >= f64::from(u32::try_from(first_count).unwrap()));
        }
    }

    #[test]
    fn test_length_mismatch() {
        let game = game(GameSettings::new(2));
        let (trials, states) = record(&game, 3);
        assert_eq!(
            Evaluation::default().run(&game, &trials, &states[..2]),
            Err(EvaluationError::LengthMismatch {
                trials: 3,
                random_states: 2
            })
        );
    }

    #[test]
    fn test_tampered_trial_is_skipped_or_fatal() {
        let game = game(GameSettings::new(2));
        let (mut trials, states) = record(&game, 6);
        let placement = trials[2].num_initial_placement_moves();
        let mut moves = trials[2].moves().to_vec();
        moves[placement] = DiceNimMove::Take { pile: 1, count: 150 };
        trials[2] = Trial::from_parts(
            moves,
            placement,
            trials[2].num_turns(),
            trials[2].status(),
        )
        .unwrap();

        let expected = TrialFailure {
            index: 2,
            error: TrialError::Replay(ReplayError::IllegalMove {
                index: placement,
                mv: "Take { pile: 1, count: 150 }".to_owned(),
            }),
        };

        let report = Evaluation::default().run(&game, &trials, &states).unwrap();
        assert_eq!(report.skipped, vec![SkippedTrial::from(&expected)]);
        for metric in &report.metrics {
            assert_eq!(metric.num_trials, 5);
            assert!(metric.value.is_within(&metric.range), "{}", metric.id);
        }

        let strict = Evaluation::default()
            .with_failure_policy(FailurePolicy::Strict)
            .run(&game, &trials, &states);
        assert_eq!(strict, Err(EvaluationError::Trial(expected)));
    }

    #[test]
    fn test_results_do_not_depend_on_parallelism() {
        let game = game(GameSettings::new(2));
        let (trials, states) = record(&game, 17);
        let serial = Evaluation::default()
            .with_parallelism(1)
            .run(&game, &trials, &states)
            .unwrap();
        for threads in [2, 4, 32] {
            let parallel = Evaluation::default()
                .with_parallelism(threads)
                .run(&game, &trials, &states)
                .unwrap();
            assert_eq!(parallel, serial);
        }
    }

    #[test]
    fn test_win_rates_have_one_entry_per_player() {
        let game = game(GameSettings::new(2));
        let (trials, states) = record(&game, 10);
        let report = Metric::Outcome(OutcomeMetric::WinRates)
            .apply(&game, &Evaluation::default(), &trials, &states)
            .unwrap();
        let rates = report.value.as_vector().unwrap();
        assert_eq!(rates.len(), 2);
        assert!((rates.iter().sum::<f64>() - 1.0).abs() < 1e-9);

        let empty = Metric::Outcome(OutcomeMetric::WinRates)
            .apply(&game, &Evaluation::default(), &[], &[])
            .unwrap();
        assert_eq!(empty.value, MetricValue::Vector(vec![0.0, 0.0]));
    }
}
