//! Metric definitions and their reducers.
//!
//! Every metric reduces a batch of [`TrialSummary`] values to a single
//! [`MetricValue`]. Reducers are pure: they never see a trial that failed to
//! summarise, and they visit summaries in trial-index order.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use replaylab_engine::{Game, GameSettings, RandomState, Rules, Trial, TrialStatus};

use crate::{
    evaluation::{Evaluation, EvaluationError},
    summary::{SkippedTrial, TrialSummary},
};

/// Coarse classification of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    /// Computed from the outcome and the replayed trajectory of each trial.
    #[display("outcomes")]
    Outcomes,
    /// Tied to a named game concept, with a closed-form fallback.
    #[display("concept")]
    Concept,
}

/// Game concept a concept metric measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum Concept {
    #[display("duration_turns")]
    DurationTurns,
    #[display("duration_moves")]
    DurationMoves,
    #[display("timeouts")]
    Timeouts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeMetric {
    BranchingFactorMax,
    BranchingFactorAverage,
    Completion,
    WinRates,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConceptMetric {
    DurationTurns,
    DurationTurnsNotTimeouts,
    DurationMoves,
    Timeouts,
}

impl ConceptMetric {
    #[must_use]
    pub const fn concept(self) -> Concept {
        match self {
            Self::DurationTurns | Self::DurationTurnsNotTimeouts => Concept::DurationTurns,
            Self::DurationMoves => Concept::DurationMoves,
            Self::Timeouts => Concept::Timeouts,
        }
    }
}

/// A measurement over a batch of trials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::IsVariant)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Outcome(OutcomeMetric),
    Concept(ConceptMetric),
}

/// Inclusive range of valid values; `max: None` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricRange {
    pub min: f64,
    pub max: Option<f64>,
}

impl MetricRange {
    const UNIT: Self = Self {
        min: 0.0,
        max: Some(1.0),
    };
    const NON_NEGATIVE: Self = Self {
        min: 0.0,
        max: None,
    };

    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && self.max.is_none_or(|max| value <= max)
    }
}

/// Static description of a metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub metric_type: MetricType,
    pub concept: Option<Concept>,
    pub range: MetricRange,
}

/// Value produced by a metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_more::IsVariant)]
#[serde(untagged)]
pub enum MetricValue {
    Scalar(f64),
    Vector(Vec<f64>),
}

impl MetricValue {
    #[must_use]
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Self::Scalar(value) => Some(*value),
            Self::Vector(_) => None,
        }
    }

    #[must_use]
    pub fn as_vector(&self) -> Option<&[f64]> {
        match self {
            Self::Scalar(_) => None,
            Self::Vector(values) => Some(values),
        }
    }

    #[must_use]
    pub fn is_within(&self, range: &MetricRange) -> bool {
        match self {
            Self::Scalar(value) => range.contains(*value),
            Self::Vector(values) => values.iter().all(|v| range.contains(*v)),
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(value) => write!(f, "{value:.4}"),
            Self::Vector(values) => {
                write!(f, "[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value:.4}")?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Result of applying one metric to a batch of trials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricReport {
    pub id: String,
    pub name: String,
    pub metric_type: MetricType,
    pub value: MetricValue,
    pub range: MetricRange,
    /// Number of trials that contributed to `value`.
    pub num_trials: usize,
    pub skipped: Vec<SkippedTrial>,
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("unknown metric `{id}`")]
pub struct UnknownMetricError {
    pub id: String,
}

impl Metric {
    pub const ALL: [Self; 8] = [
        Self::Outcome(OutcomeMetric::BranchingFactorMax),
        Self::Outcome(OutcomeMetric::BranchingFactorAverage),
        Self::Outcome(OutcomeMetric::Completion),
        Self::Outcome(OutcomeMetric::WinRates),
        Self::Concept(ConceptMetric::DurationTurns),
        Self::Concept(ConceptMetric::DurationTurnsNotTimeouts),
        Self::Concept(ConceptMetric::DurationMoves),
        Self::Concept(ConceptMetric::Timeouts),
    ];

    #[must_use]
    pub const fn metric_type(&self) -> MetricType {
        match self {
            Self::Outcome(_) => MetricType::Outcomes,
            Self::Concept(_) => MetricType::Concept,
        }
    }

    #[must_use]
    pub const fn concept(&self) -> Option<Concept> {
        match self {
            Self::Outcome(_) => None,
            Self::Concept(metric) => Some(metric.concept()),
        }
    }

    #[must_use]
    pub const fn info(&self) -> MetricInfo {
        let (id, name, description, range) = match self {
            Self::Outcome(OutcomeMetric::BranchingFactorMax) => (
                "branching-factor-max",
                "Branching Factor Max",
                "Maximum number of legal moves along each trial, averaged over trials.",
                MetricRange::NON_NEGATIVE,
            ),
            Self::Outcome(OutcomeMetric::BranchingFactorAverage) => (
                "branching-factor-average",
                "Branching Factor Average",
                "Mean number of legal moves along each trial, averaged over trials.",
                MetricRange::NON_NEGATIVE,
            ),
            Self::Outcome(OutcomeMetric::Completion) => (
                "completion",
                "Completion",
                "Fraction of trials that reached a terminal state.",
                MetricRange::UNIT,
            ),
            Self::Outcome(OutcomeMetric::WinRates) => (
                "win-rates",
                "Win Rates",
                "Per player, fraction of finished trials won by that player.",
                MetricRange::UNIT,
            ),
            Self::Concept(ConceptMetric::DurationTurns) => (
                "duration-turns",
                "Duration Turns",
                "Mean number of turns per trial.",
                MetricRange::NON_NEGATIVE,
            ),
            Self::Concept(ConceptMetric::DurationTurnsNotTimeouts) => (
                "duration-turns-not-timeouts",
                "Duration Turns Not Timeouts",
                "Mean number of turns over trials that did not time out.",
                MetricRange::NON_NEGATIVE,
            ),
            Self::Concept(ConceptMetric::DurationMoves) => (
                "duration-moves",
                "Duration Moves",
                "Mean number of real moves per trial.",
                MetricRange::NON_NEGATIVE,
            ),
            Self::Concept(ConceptMetric::Timeouts) => (
                "timeouts",
                "Timeouts",
                "Fraction of trials that exceeded the turn or move limit.",
                MetricRange::UNIT,
            ),
        };
        MetricInfo {
            id,
            name,
            description,
            metric_type: self.metric_type(),
            concept: self.concept(),
            range,
        }
    }

    #[must_use]
    pub const fn id(&self) -> &'static str {
        self.info().id
    }

    /// Whether the metric needs each trial to be replayed.
    #[must_use]
    pub const fn needs_replay(&self) -> bool {
        matches!(
            self,
            Self::Outcome(
                OutcomeMetric::BranchingFactorMax | OutcomeMetric::BranchingFactorAverage
            )
        )
    }

    /// Value reported for an empty batch.
    #[must_use]
    pub fn default_value(&self, settings: &GameSettings) -> MetricValue {
        self.reduce(settings, &[])
    }

    /// Measures `trials`, replaying them with their index-aligned
    /// `random_states`.
    pub fn apply<R>(
        &self,
        game: &Game<R>,
        evaluation: &Evaluation,
        trials: &[Trial<R::Move>],
        random_states: &[RandomState],
    ) -> Result<MetricReport, EvaluationError>
    where
        R: Rules,
    {
        let batch = evaluation.summarize(game, trials, random_states, self.needs_replay())?;
        Ok(self.report(game.settings(), &batch.summaries, &batch.skipped()))
    }

    pub(crate) fn report(
        &self,
        settings: &GameSettings,
        summaries: &[TrialSummary],
        skipped: &[SkippedTrial],
    ) -> MetricReport {
        let info = self.info();
        MetricReport {
            id: info.id.to_owned(),
            name: info.name.to_owned(),
            metric_type: info.metric_type,
            value: self.reduce(settings, summaries),
            range: info.range,
            num_trials: summaries.len(),
            skipped: skipped.to_vec(),
        }
    }

    /// Reduces trial summaries to the metric value.
    #[must_use]
    pub fn reduce(&self, settings: &GameSettings, summaries: &[TrialSummary]) -> MetricValue {
        match self {
            Self::Outcome(metric) => reduce_outcome(*metric, settings, summaries),
            Self::Concept(metric) => {
                MetricValue::Scalar(reduce_concept(*metric, settings, summaries))
            }
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Metric {
    type Err = UnknownMetricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|metric| metric.id() == s)
            .ok_or_else(|| UnknownMetricError { id: s.to_owned() })
    }
}

#[expect(clippy::cast_precision_loss)]
fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

#[expect(clippy::cast_precision_loss)]
fn fraction(hits: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

#[expect(clippy::cast_precision_loss)]
fn reduce_outcome(
    metric: OutcomeMetric,
    settings: &GameSettings,
    summaries: &[TrialSummary],
) -> MetricValue {
    match metric {
        OutcomeMetric::BranchingFactorMax => {
            let maxima = summaries
                .iter()
                .map(|s| s.branching().iter().copied().max().unwrap_or(0) as f64);
            MetricValue::Scalar(mean(maxima).unwrap_or(0.0))
        }
        OutcomeMetric::BranchingFactorAverage => {
            let averages = summaries.iter().map(|s| {
                mean(s.branching().iter().map(|count| *count as f64)).unwrap_or(0.0)
            });
            MetricValue::Scalar(mean(averages).unwrap_or(0.0))
        }
        OutcomeMetric::Completion => {
            let finished = summaries.iter().filter(|s| s.status().is_finished()).count();
            MetricValue::Scalar(fraction(finished, summaries.len()))
        }
        OutcomeMetric::WinRates => {
            let mut wins = vec![0; settings.players];
            let mut finished = 0;
            for summary in summaries {
                if let TrialStatus::Finished { winner } = summary.status() {
                    finished += 1;
                    if let Some(count) = winner.and_then(|w| wins.get_mut(w)) {
                        *count += 1;
                    }
                }
            }
            MetricValue::Vector(wins.into_iter().map(|w| fraction(w, finished)).collect())
        }
    }
}

#[expect(clippy::cast_precision_loss)]
fn reduce_concept(
    metric: ConceptMetric,
    settings: &GameSettings,
    summaries: &[TrialSummary],
) -> f64 {
    match metric {
        ConceptMetric::DurationTurns => {
            mean(summaries.iter().map(|s| s.num_turns() as f64)).unwrap_or(0.0)
        }
        ConceptMetric::DurationTurnsNotTimeouts => mean(
            summaries
                .iter()
                .filter(|s| !s.timed_out())
                .map(|s| s.num_turns() as f64),
        )
        .unwrap_or(settings.max_turn_limit as f64 * settings.players as f64),
        ConceptMetric::DurationMoves => {
            mean(summaries.iter().map(|s| s.real_moves() as f64)).unwrap_or(0.0)
        }
        ConceptMetric::Timeouts => {
            let timeouts = summaries.iter().filter(|s| s.timed_out()).count();
            fraction(timeouts, summaries.len())
        }
    }
}
