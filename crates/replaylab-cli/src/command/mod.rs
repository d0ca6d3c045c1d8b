use clap::{ArgAction, Parser, Subcommand};

use self::{
    evaluate::EvaluateArg, export_samples::ExportSamplesArg, generate_trials::GenerateTrialsArg,
    replay::ReplayArg,
};

mod evaluate;
mod export_samples;
mod generate_trials;
mod replay;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// What mode to run the program in
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Play new trials and record them
    GenerateTrials(#[clap(flatten)] GenerateTrialsArg),
    /// Compute metrics over a trial collection
    Evaluate(#[clap(flatten)] EvaluateArg),
    /// Reconstruct one trial up to a move index
    Replay(#[clap(flatten)] ReplayArg),
    /// Export training examples from a trial collection
    ExportSamples(#[clap(flatten)] ExportSamplesArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    crate::util::init_logger(args.verbose)?;
    match args.mode {
        Mode::GenerateTrials(arg) => generate_trials::run(&arg)?,
        Mode::Evaluate(arg) => evaluate::run(&arg)?,
        Mode::Replay(arg) => replay::run(&arg)?,
        Mode::ExportSamples(arg) => export_samples::run(&arg)?,
    }
    Ok(())
}
