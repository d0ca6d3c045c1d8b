use std::fmt;

use log::debug;
use rand::{Rng, distr::Distribution as _, distr::weighted::WeightedIndex};

use crate::{
    core::{Context, RandomState, Trial},
    engine::game::{Game, Rules},
};

/// A player that assigns preferences to the legal moves of a context.
///
/// The policy must return one non-negative weight per move, in the same order
/// as `moves`. The runner samples a move proportionally to these weights; an
/// all-zero policy falls back to uniform choice.
pub trait Agent<R>: fmt::Debug + Send + Sync
where
    R: Rules,
{
    fn name(&self) -> &str;

    fn policy(&self, game: &Game<R>, ctx: &Context<R::State>, moves: &[R::Move]) -> Vec<f32>;
}

/// Agent that picks every legal move with equal probability.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformAgent;

impl<R> Agent<R> for UniformAgent
where
    R: Rules,
{
    fn name(&self) -> &str {
        "uniform"
    }

    fn policy(&self, _game: &Game<R>, _ctx: &Context<R::State>, moves: &[R::Move]) -> Vec<f32> {
        vec![1.0; moves.len()]
    }
}

/// Plays new trials and records them.
///
/// The runner restores the context RNG from the given [`RandomState`], so the
/// resulting trial can later be replayed from that same state. Move selection
/// uses the caller's RNG, which never touches the context RNG.
pub struct TrialRunner<'g, R> {
    game: &'g Game<R>,
}

impl<R> fmt::Debug for TrialRunner<'_, R>
where
    R: Rules,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrialRunner")
            .field("game", &self.game.name())
            .finish()
    }
}

impl<'g, R> TrialRunner<'g, R>
where
    R: Rules,
{
    #[must_use]
    pub const fn new(game: &'g Game<R>) -> Self {
        Self { game }
    }

    /// Plays one trial from `random_state` until the game ends or a limit is
    /// exceeded.
    ///
    /// `agents[p]` chooses the moves of player `p`.
    ///
    /// # Panics
    ///
    /// Panics if `agents` has fewer entries than the game has players.
    pub fn run<G>(
        &self,
        random_state: &RandomState,
        agents: &[&dyn Agent<R>],
        rng: &mut G,
    ) -> Trial<R::Move>
    where
        G: Rng + ?Sized,
    {
        let settings = self.game.settings();
        assert!(
            agents.len() >= settings.players,
            "need one agent per player ({} < {})",
            agents.len(),
            settings.players
        );

        let mut ctx = self.game.new_context(random_state);
        let mut trial = Trial::new();
        while !settings.exceeds_limits(ctx.num_turns(), ctx.real_moves()) {
            let moves = self.game.legal_moves(&ctx);
            if moves.is_empty() {
                break;
            }
            let agent = agents[ctx.mover()];
            let index = select(&agent.policy(self.game, &ctx, &moves), rng);
            let mv = moves[index].clone();
            if self.game.apply(&mut ctx, &mv) {
                trial.push_placement_move(mv);
            } else {
                trial.push_move(mv);
            }
        }
        trial.finish(ctx.num_turns(), self.game.status(&ctx));
        debug!(
            "recorded trial: {} moves, {} turns, {:?}",
            trial.num_moves(),
            trial.num_turns(),
            trial.status()
        );
        trial
    }
}

fn select<G>(weights: &[f32], rng: &mut G) -> usize
where
    G: Rng + ?Sized,
{
    match WeightedIndex::new(weights) {
        Ok(dist) => dist.sample(rng),
        Err(_) => rng.random_range(0..weights.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        GameSettings, RandomSeed, ReplayEngine,
        games::{DiceNim, DiceNimMove},
    };

    #[derive(Debug)]
    struct FirstMoveAgent;

    impl Agent<DiceNim> for FirstMoveAgent {
        fn name(&self) -> &str {
            "first"
        }

        fn policy(
            &self,
            _game: &Game<DiceNim>,
            _ctx: &Context<<DiceNim as Rules>::State>,
            moves: &[DiceNimMove],
        ) -> Vec<f32> {
            let mut policy = vec![0.0; moves.len()];
            policy[0] = 1.0;
            policy
        }
    }

    fn game(players: usize) -> Game<DiceNim> {
        Game::new(DiceNim::new(&[3, 4, 5]).unwrap(), GameSettings::new(players))
    }

    #[test]
    fn test_recorded_trial_replays_to_same_result() {
        let game = game(3);
        let agents: [&dyn Agent<DiceNim>; 3] = [&UniformAgent, &FirstMoveAgent, &UniformAgent];
        let mut rng = rand::rng();
        for _ in 0..20 {
            let state = RandomState::random(&mut rng);
            let trial = TrialRunner::new(&game).run(&state, &agents, &mut rng);
            assert!(trial.validate().is_ok());
            assert_eq!(trial.num_initial_placement_moves(), 3);

            let ctx = ReplayEngine::new(&game)
                .replay_to(&trial, &state, trial.num_moves())
                .unwrap();
            assert_eq!(ctx.num_turns(), trial.num_turns());
            assert_eq!(ctx.real_moves(), trial.number_real_moves());
            assert_eq!(game.status(&ctx), trial.status());
        }
    }

    #[test]
    fn test_limits_stop_recording() {
        let game = Game::new(
            DiceNim::new(&[50, 50, 50]).unwrap(),
            GameSettings::new(2).with_limits(3, 100),
        );
        let agents: [&dyn Agent<DiceNim>; 2] = [&FirstMoveAgent, &FirstMoveAgent];
        let state = RandomState::from_seed(RandomSeed::from_bytes([3; 16]));
        let trial = TrialRunner::new(&game).run(&state, &agents, &mut rand::rng());

        assert!(!trial.is_terminal());
        assert!(game.is_timeout(&trial));
        assert_eq!(trial.num_turns(), 4);
    }

    #[test]
    fn test_move_limit_stops_recording_before_turn_limit() {
        let game = Game::new(
            DiceNim::new(&[50, 50, 50]).unwrap(),
            GameSettings::new(2).with_limits(1000, 5),
        );
        let agents: [&dyn Agent<DiceNim>; 2] = [&FirstMoveAgent, &FirstMoveAgent];
        let state = RandomState::from_seed(RandomSeed::from_bytes([5; 16]));
        let trial = TrialRunner::new(&game).run(&state, &agents, &mut rand::rng());

        assert!(!trial.is_terminal());
        assert!(game.is_timeout(&trial));
        assert_eq!(trial.number_real_moves(), 6);
        assert!(trial.num_turns() <= 6);
    }

    #[test]
    fn test_all_zero_policy_falls_back_to_uniform() {
        let mut rng = rand::rng();
        for _ in 0..50 {
            assert!(select(&[0.0, 0.0, 0.0], &mut rng) < 3);
        }
        assert_eq!(select(&[0.0, 2.0, 0.0], &mut rng), 1);
    }
}
