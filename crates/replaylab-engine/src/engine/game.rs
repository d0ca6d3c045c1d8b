use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::{Context, RandomState, Trial, TrialStatus};

/// Ordered set of legal moves.
///
/// The order is part of the contract: replay, metrics and training samples
/// all index into it.
pub type MoveSet<M> = Vec<M>;

/// Terminal result of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    /// Winning player, `None` for a draw.
    pub winner: Option<usize>,
}

/// Rules of a game: the capability the replay engine consumes.
///
/// Implementations must be deterministic given the context: every random
/// decision has to be drawn from the context RNG, never from an external
/// source, otherwise trials cannot be replayed.
pub trait Rules: fmt::Debug + Send + Sync {
    type State: Clone + fmt::Debug + PartialEq + Send + Sync;
    type Move: Clone + fmt::Debug + PartialEq + Send + Sync;

    /// Human-readable name of the game.
    fn name(&self) -> &str;

    /// Builds the initial state. May draw from `rng`.
    fn setup(&self, settings: &GameSettings, rng: &mut crate::GameRng) -> Self::State;

    /// Legal moves in the current context; empty once the game is over.
    fn legal_moves(&self, ctx: &Context<Self::State>) -> MoveSet<Self::Move>;

    /// Applies a legal move. Callers guarantee `mv` is in [`Self::legal_moves`].
    fn apply(&self, ctx: &mut Context<Self::State>, mv: &Self::Move);

    /// Whether the next move belongs to the initial placement phase.
    fn is_placement_phase(&self, ctx: &Context<Self::State>) -> bool;

    /// Terminal result, or `None` while the game is running.
    fn outcome(&self, ctx: &Context<Self::State>) -> Option<Outcome>;
}

/// Static parameters of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSettings {
    /// Number of players.
    pub players: usize,
    /// A trial with more turns than this is considered timed out.
    pub max_turn_limit: usize,
    /// A trial with more real moves than this is considered timed out.
    pub max_move_limit: usize,
}

impl GameSettings {
    pub const DEFAULT_MAX_TURN_LIMIT: usize = 1250;
    pub const DEFAULT_MAX_MOVE_LIMIT: usize = 10000;

    #[must_use]
    pub const fn new(players: usize) -> Self {
        Self {
            players,
            max_turn_limit: Self::DEFAULT_MAX_TURN_LIMIT,
            max_move_limit: Self::DEFAULT_MAX_MOVE_LIMIT,
        }
    }

    #[must_use]
    pub const fn with_limits(mut self, max_turn_limit: usize, max_move_limit: usize) -> Self {
        self.max_turn_limit = max_turn_limit;
        self.max_move_limit = max_move_limit;
        self
    }

    /// Whether a game with these counters has exceeded one of the limits.
    #[must_use]
    pub const fn exceeds_limits(&self, num_turns: usize, real_moves: usize) -> bool {
        num_turns > self.max_turn_limit || real_moves > self.max_move_limit
    }

    /// Whether `trial` timed out under these settings.
    #[must_use]
    pub fn is_timeout<M>(&self, trial: &Trial<M>) -> bool {
        self.exceeds_limits(trial.num_turns(), trial.number_real_moves())
    }
}

/// A rules implementation together with its immutable settings.
///
/// `Game` is the façade used by the rest of the workspace: it creates contexts
/// and applies moves, keeping the context counters in sync with the rules.
/// None of its methods mutate the game itself, so a single instance can be
/// shared by any number of concurrent replays.
#[derive(Debug, Clone)]
pub struct Game<R> {
    rules: R,
    settings: GameSettings,
}

impl<R> Game<R>
where
    R: Rules,
{
    #[must_use]
    pub const fn new(rules: R, settings: GameSettings) -> Self {
        Self { rules, settings }
    }

    #[must_use]
    pub fn rules(&self) -> &R {
        &self.rules
    }

    #[must_use]
    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.rules.name()
    }

    /// Creates a fresh context whose RNG continues from `random_state`.
    ///
    /// Game setup draws from the restored RNG.
    #[must_use]
    pub fn new_context(&self, random_state: &RandomState) -> Context<R::State> {
        let mut rng = random_state.restore();
        let state = self.rules.setup(&self.settings, &mut rng);
        Context::new(state, rng)
    }

    #[must_use]
    pub fn legal_moves(&self, ctx: &Context<R::State>) -> MoveSet<R::Move> {
        self.rules.legal_moves(ctx)
    }

    /// Applies `mv` and updates the context counters.
    ///
    /// Returns whether the move was an initial placement move. Legality is not
    /// checked here; see [`ReplayEngine`](crate::ReplayEngine) for checked
    /// application.
    pub fn apply(&self, ctx: &mut Context<R::State>, mv: &R::Move) -> bool {
        let placement = self.rules.is_placement_phase(ctx);
        if placement {
            ctx.record_placement_move();
        } else {
            ctx.record_real_move();
        }
        self.rules.apply(ctx, mv);
        placement
    }

    #[must_use]
    pub fn outcome(&self, ctx: &Context<R::State>) -> Option<Outcome> {
        self.rules.outcome(ctx)
    }

    #[must_use]
    pub fn is_over(&self, ctx: &Context<R::State>) -> bool {
        self.outcome(ctx).is_some()
    }

    /// Status a trial ending in `ctx` would carry.
    #[must_use]
    pub fn status(&self, ctx: &Context<R::State>) -> TrialStatus {
        match self.outcome(ctx) {
            Some(Outcome { winner }) => TrialStatus::Finished { winner },
            None => TrialStatus::Ongoing,
        }
    }

    #[must_use]
    pub fn is_timeout<M>(&self, trial: &Trial<M>) -> bool {
        self.settings.is_timeout(trial)
    }
}
