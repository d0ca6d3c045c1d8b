use std::{num::NonZeroUsize, path::PathBuf};

use anyhow::Context as _;
use log::info;
use serde::Serialize;

use replaylab_engine::games::DiceNim;
use replaylab_training::{
    DecisionPoints, FeatureSet, SampleCollector, TrainingExample, dice_nim::DiceNimFeatures,
};

use crate::{
    agent::AgentKind,
    util,
};

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, derive_more::FromStr)]
pub enum FeatureSetKind {
    #[default]
    Compact,
    Extended,
}

impl FeatureSetKind {
    fn features(self) -> DiceNimFeatures {
        match self {
            Self::Compact => DiceNimFeatures::Compact,
            Self::Extended => DiceNimFeatures::Extended,
        }
    }
}

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct ExportSamplesArg {
    /// Trial collection file
    collection: PathBuf,
    /// Feature set used to encode moves (compact or extended)
    #[arg(long, default_value = "compact")]
    feature_set: FeatureSetKind,
    /// Keep every n-th decision point of each trial
    #[arg(long)]
    every: Option<NonZeroUsize>,
    /// Label decision points with this agent's policy instead of the recorded moves
    #[arg(long, value_enum)]
    expert: Option<AgentKind>,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct SampleExport {
    feature_set: String,
    num_spatial_features: usize,
    num_aspatial_features: usize,
    expert: Option<String>,
    examples: Vec<TrainingExample>,
}

pub(crate) fn run(arg: &ExportSamplesArg) -> anyhow::Result<()> {
    let ExportSamplesArg {
        collection,
        feature_set,
        every,
        expert,
        output,
    } = arg;

    let collection = util::read_trial_collection(collection)?;
    let game = collection.game.to_game()?;
    let features = feature_set.features();
    let feature_set: &dyn FeatureSet<DiceNim> = &features;
    let expert = expert.map(AgentKind::build).transpose()?;
    let points = every.map_or(DecisionPoints::All, DecisionPoints::Every);
    let collector = SampleCollector::new(&game, points);

    let mut examples = vec![];
    for (i, recorded) in collection.trials.iter().enumerate() {
        let trial_examples = collector
            .export(
                &recorded.trial,
                &recorded.random_state,
                expert.as_deref(),
                feature_set,
            )
            .with_context(|| format!("Failed to export samples from trial {i}"))?;
        examples.extend(trial_examples);
    }
    info!(
        "exported {} examples from {} trials",
        examples.len(),
        collection.trials.len()
    );

    let export = SampleExport {
        feature_set: feature_set.id().to_owned(),
        num_spatial_features: feature_set.num_spatial_features(),
        num_aspatial_features: feature_set.num_aspatial_features(),
        expert: expert.as_ref().map(|agent| agent.name().to_owned()),
        examples,
    };
    util::save_json(&export, output.as_deref())?;
    Ok(())
}
