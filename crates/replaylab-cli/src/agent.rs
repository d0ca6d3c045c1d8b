use rand::Rng as _;
use rand_distr::Normal;

use replaylab_engine::{
    Agent, Context, Game, UniformAgent,
    games::{DiceNim, DiceNimMove, DiceNimState, dice_nim::nim_sum},
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum AgentKind {
    /// Uniformly random legal moves
    #[default]
    Random,
    /// Winning moves first, then moves leaving a zero nim-sum
    Greedy,
    /// Greedy scores perturbed by Gaussian noise
    NoisyGreedy,
}

const NOISE_SIGMA: f32 = 1.0;

impl AgentKind {
    pub fn build(self) -> anyhow::Result<Box<dyn Agent<DiceNim>>> {
        Ok(match self {
            Self::Random => Box::new(UniformAgent),
            Self::Greedy => Box::new(GreedyAgent),
            Self::NoisyGreedy => Box::new(NoisyGreedyAgent::new(NOISE_SIGMA)?),
        })
    }
}

/// Heuristic score of a move: 2 for a win, 1 for a zero nim-sum, 0 otherwise.
fn score(state: &DiceNimState, mv: &DiceNimMove) -> f32 {
    let DiceNimMove::Take { count, .. } = *mv else {
        return 0.0;
    };
    let mut piles = state.piles().to_vec();
    piles[mv.pile()] -= count;
    if piles.iter().all(|p| *p == 0) {
        2.0
    } else if nim_sum(&piles) == 0 {
        1.0
    } else {
        0.0
    }
}

/// One-hot-ish policy spreading mass over the best scores.
fn best_of(scores: &[f32]) -> Vec<f32> {
    let best = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    scores
        .iter()
        .map(|s| if *s >= best { 1.0 } else { 0.0 })
        .collect()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyAgent;

impl Agent<DiceNim> for GreedyAgent {
    fn name(&self) -> &str {
        "greedy"
    }

    fn policy(
        &self,
        _game: &Game<DiceNim>,
        ctx: &Context<DiceNimState>,
        moves: &[DiceNimMove],
    ) -> Vec<f32> {
        let scores = moves
            .iter()
            .map(|mv| score(ctx.state(), mv))
            .collect::<Vec<_>>();
        best_of(&scores)
    }
}

#[derive(Debug, Clone)]
pub struct NoisyGreedyAgent {
    noise: Normal<f32>,
}

impl NoisyGreedyAgent {
    pub fn new(sigma: f32) -> anyhow::Result<Self> {
        let noise = Normal::new(0.0, sigma)
            .map_err(|e| anyhow::anyhow!("Invalid noise sigma {sigma}: {e}"))?;
        Ok(Self { noise })
    }
}

impl Agent<DiceNim> for NoisyGreedyAgent {
    fn name(&self) -> &str {
        "noisy-greedy"
    }

    fn policy(
        &self,
        _game: &Game<DiceNim>,
        ctx: &Context<DiceNimState>,
        moves: &[DiceNimMove],
    ) -> Vec<f32> {
        // agent noise never touches the context RNG
        let mut rng = rand::rng();
        let scores = moves
            .iter()
            .map(|mv| score(ctx.state(), mv) + rng.sample(self.noise))
            .collect::<Vec<_>>();
        best_of(&scores)
    }
}

#[cfg(test)]
mod tests {
    use replaylab_engine::{GameSettings, RandomSeed, RandomState};

    use super::*;

    #[test]
    fn test_greedy_prefers_winning_and_zero_nim_sum() {
        let game = Game::new(DiceNim::new(&[1, 0]).unwrap(), GameSettings::new(2));
        let mut ctx = game.new_context(&RandomState::from_seed(RandomSeed::from_bytes([0; 16])));
        game.apply(&mut ctx, &DiceNimMove::Place { pile: 1 });
        game.apply(&mut ctx, &DiceNimMove::Place { pile: 1 });
        // piles [1, 2]
        let moves = game.legal_moves(&ctx);
        let policy = GreedyAgent.policy(&game, &ctx, &moves);
        for (mv, weight) in moves.iter().zip(&policy) {
            // taking one from pile 1 leaves [1, 1]
            let expected = *mv == DiceNimMove::Take { pile: 1, count: 1 };
            assert_eq!(*weight == 1.0, expected, "{mv:?}");
        }
    }

    #[test]
    fn test_agent_kinds_build() {
        for kind in [AgentKind::Random, AgentKind::Greedy, AgentKind::NoisyGreedy] {
            let agent = kind.build().unwrap();
            assert!(!agent.name().is_empty());
        }
        assert!(NoisyGreedyAgent::new(-1.0).is_err());
    }
}
