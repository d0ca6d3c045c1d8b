use std::path::PathBuf;

use anyhow::Context as _;

use replaylab_engine::ReplayEngine;

use crate::util;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct ReplayArg {
    /// Trial collection file
    collection: PathBuf,
    /// Index of the trial to replay
    #[arg(long)]
    trial: usize,
    /// Stop before this move index (default: end of the trial)
    #[arg(long)]
    to: Option<usize>,
}

pub(crate) fn run(arg: &ReplayArg) -> anyhow::Result<()> {
    let ReplayArg {
        collection,
        trial: index,
        to,
    } = arg;

    let collection = util::read_trial_collection(collection)?;
    let game = collection.game.to_game()?;
    let recorded = collection.get(*index)?;
    let trial = &recorded.trial;
    let to = to.unwrap_or(trial.num_moves());

    let ctx = ReplayEngine::new(&game)
        .replay_to(trial, &recorded.random_state, to)
        .with_context(|| format!("Failed to replay trial {index}"))?;

    println!(
        "trial {index}: {} moves ({} placement), {} turns, {:?}{}",
        trial.num_moves(),
        trial.num_initial_placement_moves(),
        trial.num_turns(),
        trial.status(),
        if game.is_timeout(trial) { ", timed out" } else { "" }
    );
    println!("at move {}:", ctx.move_index());
    println!("  mover:       {}", ctx.mover());
    println!("  turns:       {}", ctx.num_turns());
    println!("  piles:       {:?}", ctx.state().piles());
    println!("  roll:        {}", ctx.state().roll());
    println!("  nim-sum:     {}", ctx.state().nim_sum());
    if let Some(outcome) = game.outcome(&ctx) {
        println!("  outcome:     {outcome:?}");
    }
    let moves = game.legal_moves(&ctx);
    println!("  legal moves: {}", moves.len());
    for mv in &moves {
        let marker = if trial.get_move(to) == Some(mv) { "*" } else { " " };
        println!("  {marker} {mv:?}");
    }
    Ok(())
}
