use crate::core::random_state::{GameRng, RandomState};

/// Mutable game state reconstructed during play or replay.
///
/// A context owns the game-specific state `S`, the random number generator
/// that drives every stochastic rule, and the counters the replay engine and
/// metrics rely on. Contexts are never shared between trials: each replay
/// creates its own and drops it afterwards.
///
/// Only [`Game`](crate::Game) advances the move counters; rules implementations
/// manipulate the state, the RNG and the active player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context<S> {
    state: S,
    rng: GameRng,
    mover: usize,
    move_index: usize,
    placement_moves: usize,
    num_turns: usize,
    turn_open: bool,
}

impl<S> Context<S> {
    pub(crate) fn new(state: S, rng: GameRng) -> Self {
        Self {
            state,
            rng,
            mover: 0,
            move_index: 0,
            placement_moves: 0,
            num_turns: 0,
            turn_open: false,
        }
    }

    /// Returns the game-specific state.
    #[must_use]
    pub fn state(&self) -> &S {
        &self.state
    }

    /// Returns the state and the RNG at the same time.
    ///
    /// Rules typically need both when a move triggers a chance event.
    pub fn state_and_rng_mut(&mut self) -> (&mut S, &mut GameRng) {
        (&mut self.state, &mut self.rng)
    }

    /// Snapshot of the context RNG at this point of the game.
    #[must_use]
    pub fn random_state(&self) -> RandomState {
        RandomState::capture(&self.rng)
    }

    /// Index of the player to move.
    #[must_use]
    pub fn mover(&self) -> usize {
        self.mover
    }

    /// Number of moves applied so far (placement moves included).
    ///
    /// This is also the index of the next move of the trial being replayed.
    #[must_use]
    pub fn move_index(&self) -> usize {
        self.move_index
    }

    /// Number of initial placement moves applied so far.
    #[must_use]
    pub fn placement_moves(&self) -> usize {
        self.placement_moves
    }

    /// Number of moves applied outside the placement phase.
    #[must_use]
    pub fn real_moves(&self) -> usize {
        self.move_index - self.placement_moves
    }

    /// Number of turns in which at least one real move was played.
    #[must_use]
    pub fn num_turns(&self) -> usize {
        self.num_turns
    }

    /// Hands control to `player` without closing a turn.
    ///
    /// Used while players take part in a setup phase that is not counted as
    /// turns.
    pub fn hand_over(&mut self, player: usize) {
        self.mover = player;
    }

    /// Closes the current turn and gives the next one to `player`.
    ///
    /// The same player may receive consecutive turns.
    pub fn end_turn(&mut self, player: usize) {
        self.mover = player;
        self.turn_open = false;
    }

    pub(crate) fn record_placement_move(&mut self) {
        self.move_index += 1;
        self.placement_moves += 1;
    }

    pub(crate) fn record_real_move(&mut self) {
        if !self.turn_open {
            self.turn_open = true;
            self.num_turns += 1;
        }
        self.move_index += 1;
    }
}
