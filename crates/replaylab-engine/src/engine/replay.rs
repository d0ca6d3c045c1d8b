use std::fmt;

use crate::{
    core::{Context, MalformedTrialError, RandomState, Trial},
    engine::game::{Game, MoveSet, Rules},
};

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum ReplayError {
    /// A recorded move is not legal in the reconstructed state.
    ///
    /// Usually means the trial was recorded with a different version of the
    /// rules, or that it was corrupted.
    #[display("move {index} ({mv}) is illegal in the reconstructed state")]
    IllegalMove {
        index: usize,
        mv: String,
    },
    #[display("replay range {from}..{to} is outside the trial's {num_moves} moves")]
    OutOfRange {
        from: usize,
        to: usize,
        num_moves: usize,
    },
    #[display("context is at move {actual}, cannot resume from move {expected}")]
    CursorMismatch { expected: usize, actual: usize },
}

/// Error raised while preparing or running a replay.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum TrialError {
    #[display("malformed trial: {_0}")]
    Malformed(MalformedTrialError),
    #[display("replay failed: {_0}")]
    Replay(ReplayError),
}

/// Deterministic reconstruction of recorded trials.
///
/// The engine is a thin, stateless view over a [`Game`]: it restores contexts
/// from [`RandomState`]s and re-applies recorded moves, checking each move
/// against the legal moves of the reconstructed state.
///
/// # Example
///
/// ```
/// use replaylab_engine::{
///     Agent, Game, GameSettings, RandomSeed, RandomState, ReplayEngine, TrialRunner,
///     UniformAgent, games::DiceNim,
/// };
///
/// let game = Game::new(DiceNim::new(&[3, 4, 5]).unwrap(), GameSettings::new(2));
/// let state = RandomState::from_seed(RandomSeed::from_bytes([1; 16]));
/// let agents: [&dyn Agent<DiceNim>; 2] = [&UniformAgent, &UniformAgent];
/// let trial = TrialRunner::new(&game).run(&state, &agents, &mut rand::rng());
///
/// let engine = ReplayEngine::new(&game);
/// let a = engine.replay_to(&trial, &state, trial.num_moves()).unwrap();
/// let b = engine.replay_to(&trial, &state, trial.num_moves()).unwrap();
/// assert_eq!(a, b);
/// ```
pub struct ReplayEngine<'g, R> {
    game: &'g Game<R>,
}

impl<R> fmt::Debug for ReplayEngine<'_, R>
where
    R: Rules,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplayEngine")
            .field("game", &self.game.name())
            .finish()
    }
}

impl<R> Clone for ReplayEngine<'_, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for ReplayEngine<'_, R> {}

impl<'g, R> ReplayEngine<'g, R>
where
    R: Rules,
{
    #[must_use]
    pub const fn new(game: &'g Game<R>) -> Self {
        Self { game }
    }

    #[must_use]
    pub fn game(&self) -> &'g Game<R> {
        self.game
    }

    /// Restores a fresh context whose RNG continues from `random_state`.
    #[must_use]
    pub fn reconstruct(&self, random_state: &RandomState) -> Context<R::State> {
        self.game.new_context(random_state)
    }

    /// Re-applies moves `from..to` of `trial` to `ctx`.
    ///
    /// `ctx` must be positioned at move `from`, i.e. it was reconstructed from
    /// the trial's random state and already advanced to `from`. On error the
    /// context is left at the offending move and must be discarded.
    pub fn advance(
        &self,
        ctx: &mut Context<R::State>,
        trial: &Trial<R::Move>,
        from: usize,
        to: usize,
    ) -> Result<(), ReplayError> {
        if from > to || to > trial.num_moves() {
            return Err(ReplayError::OutOfRange {
                from,
                to,
                num_moves: trial.num_moves(),
            });
        }
        if ctx.move_index() != from {
            return Err(ReplayError::CursorMismatch {
                expected: from,
                actual: ctx.move_index(),
            });
        }
        for (index, mv) in trial.moves()[from..to].iter().enumerate() {
            self.apply_checked(ctx, from + index, mv)?;
        }
        Ok(())
    }

    /// Validates `trial`, reconstructs its context and advances it to `to`.
    pub fn replay_to(
        &self,
        trial: &Trial<R::Move>,
        random_state: &RandomState,
        to: usize,
    ) -> Result<Context<R::State>, TrialError> {
        trial.validate()?;
        let mut ctx = self.reconstruct(random_state);
        self.advance(&mut ctx, trial, 0, to)?;
        Ok(ctx)
    }

    /// Legal-move counts along the branching-factor walk of `trial`.
    ///
    /// The walk starts in the state reached after the initial placement moves,
    /// then applies every real move except the last one, measuring the legal
    /// moves of each state it visits. The state after the final move is never
    /// measured. The returned vector is never empty.
    pub fn branching_profile(
        &self,
        trial: &Trial<R::Move>,
        random_state: &RandomState,
    ) -> Result<Vec<usize>, TrialError> {
        let start = trial.num_initial_placement_moves();
        let mut ctx = self.replay_to(trial, random_state, start)?;
        let mut counts = vec![self.game.legal_moves(&ctx).len()];
        for index in start..trial.num_moves().saturating_sub(1) {
            self.advance(&mut ctx, trial, index, index + 1)?;
            counts.push(self.game.legal_moves(&ctx).len());
        }
        Ok(counts)
    }

    /// Visits every decision point of `trial`.
    ///
    /// For each real move index `i` accepted by `filter`, calls `visit` with
    /// the context positioned right before move `i`, the legal moves of that
    /// state and the recorded move. Placement moves are replayed but never
    /// visited.
    pub fn for_each_decision<F, V>(
        &self,
        trial: &Trial<R::Move>,
        random_state: &RandomState,
        mut filter: F,
        mut visit: V,
    ) -> Result<(), TrialError>
    where
        F: FnMut(usize) -> bool,
        V: FnMut(usize, &Context<R::State>, MoveSet<R::Move>, &R::Move),
    {
        let start = trial.num_initial_placement_moves();
        let mut ctx = self.replay_to(trial, random_state, start)?;
        for (offset, mv) in trial.moves()[start..].iter().enumerate() {
            let index = start + offset;
            let legal = self.game.legal_moves(&ctx);
            if !legal.contains(mv) {
                return Err(illegal_move(index, mv).into());
            }
            if filter(index) {
                visit(index, &ctx, legal, mv);
            }
            self.game.apply(&mut ctx, mv);
        }
        Ok(())
    }

    fn apply_checked(
        &self,
        ctx: &mut Context<R::State>,
        index: usize,
        mv: &R::Move,
    ) -> Result<(), ReplayError> {
        if !self.game.legal_moves(ctx).contains(mv) {
            return Err(illegal_move(index, mv));
        }
        self.game.apply(ctx, mv);
        Ok(())
    }
}

fn illegal_move<M>(index: usize, mv: &M) -> ReplayError
where
    M: fmt::Debug,
{
    ReplayError::IllegalMove {
        index,
        mv: format!("{mv:?}"),
    }
}
