use std::path::PathBuf;

use replaylab_metrics::{Evaluation, FailurePolicy, Metric};

use crate::util;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct EvaluateArg {
    /// Trial collection file
    collection: PathBuf,
    /// Metric to compute (repeatable, default: all)
    #[arg(long = "metric")]
    metrics: Vec<Metric>,
    /// Fail on the first trial that cannot be replayed instead of skipping it
    #[arg(long)]
    strict: bool,
    /// Number of worker threads (default: available cores)
    #[arg(long)]
    threads: Option<usize>,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &EvaluateArg) -> anyhow::Result<()> {
    let EvaluateArg {
        collection,
        metrics,
        strict,
        threads,
        output,
    } = arg;

    let collection = util::read_trial_collection(collection)?;
    let game = collection.game.to_game()?;
    let (trials, random_states) = collection.split();

    let metrics = if metrics.is_empty() {
        Metric::ALL.to_vec()
    } else {
        metrics.clone()
    };
    let policy = if *strict {
        FailurePolicy::Strict
    } else {
        FailurePolicy::Skip
    };
    let mut evaluation = Evaluation::new(metrics).with_failure_policy(policy);
    if let Some(threads) = threads {
        evaluation = evaluation.with_parallelism(*threads);
    }

    let report = evaluation.run(&game, &trials, &random_states)?;

    eprintln!(
        "{} trials of {} ({} skipped)",
        report.num_trials,
        report.game,
        report.skipped.len()
    );
    for metric in &report.metrics {
        eprintln!("  {:<28} {}", metric.id, metric.value);
    }
    util::save_json(&report, output.as_deref())?;
    Ok(())
}
