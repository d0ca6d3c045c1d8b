//! Dice Nim: a small stochastic take-away game.
//!
//! Rules:
//!
//! 1. **Placement** - Starting with player 0, every player places one bonus
//!    stone on a pile of their choice. These are initial placement moves.
//! 2. **Play** - The first player to move is drawn at random during setup.
//!    At the start of each move a six-sided die is rolled; the mover takes
//!    between 1 and `min(roll, pile)` stones from a single pile.
//! 3. **Bonus** - A roll of 6 grants the mover another move in the same turn.
//! 4. **End** - Whoever takes the last stone wins.
//!
//! Every chance event (starting player, dice) is drawn from the context RNG, so
//! games replay exactly from their [`RandomState`](crate::RandomState).

use arrayvec::ArrayVec;
use rand::Rng as _;
use serde::{Deserialize, Serialize};

use crate::{
    core::{Context, GameRng},
    engine::{GameSettings, MoveSet, Outcome, Rules},
};

pub const MAX_PILES: usize = 8;
pub const MAX_PILE_SIZE: u16 = 200;
pub const DIE_FACES: u8 = 6;

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum DiceNimError {
    #[display("dice nim needs between 1 and {MAX_PILES} piles, got {count}")]
    PileCount { count: usize },
    #[display("pile {index} holds {size} stones, more than {MAX_PILE_SIZE}")]
    PileTooLarge { index: usize, size: u16 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiceNimMove {
    /// Adds one stone to a pile (placement phase only).
    Place { pile: u8 },
    /// Removes `count` stones from a pile.
    Take { pile: u8, count: u16 },
}

impl DiceNimMove {
    #[must_use]
    pub fn pile(&self) -> usize {
        match *self {
            Self::Place { pile } | Self::Take { pile, .. } => usize::from(pile),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiceNimState {
    piles: ArrayVec<u16, MAX_PILES>,
    players: usize,
    placements_left: usize,
    first_player: usize,
    roll: u8,
    winner: Option<usize>,
}

impl DiceNimState {
    #[must_use]
    pub fn piles(&self) -> &[u16] {
        &self.piles
    }

    /// Die value of the current move, `0` during placement and after the end.
    #[must_use]
    pub fn roll(&self) -> u8 {
        self.roll
    }

    #[must_use]
    pub fn players(&self) -> usize {
        self.players
    }

    #[must_use]
    pub fn total_stones(&self) -> u32 {
        self.piles.iter().copied().map(u32::from).sum()
    }

    /// XOR of all pile sizes.
    #[must_use]
    pub fn nim_sum(&self) -> u16 {
        nim_sum(&self.piles)
    }

    fn next_player(&self, player: usize) -> usize {
        (player + 1) % self.players
    }
}

/// XOR of all pile sizes.
#[must_use]
pub fn nim_sum(piles: &[u16]) -> u16 {
    piles.iter().fold(0, |acc, p| acc ^ p)
}

fn roll_die(rng: &mut GameRng) -> u8 {
    rng.random_range(1..=DIE_FACES)
}

/// Dice Nim rules with a fixed starting layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiceNim {
    piles: ArrayVec<u16, MAX_PILES>,
}

impl DiceNim {
    pub fn new(piles: &[u16]) -> Result<Self, DiceNimError> {
        if piles.is_empty() || piles.len() > MAX_PILES {
            return Err(DiceNimError::PileCount { count: piles.len() });
        }
        if let Some((index, &size)) = piles
            .iter()
            .enumerate()
            .find(|(_, size)| **size > MAX_PILE_SIZE)
        {
            return Err(DiceNimError::PileTooLarge { index, size });
        }
        Ok(Self {
            piles: piles.iter().copied().collect(),
        })
    }

    #[must_use]
    pub fn piles(&self) -> &[u16] {
        &self.piles
    }
}

impl Rules for DiceNim {
    type State = DiceNimState;
    type Move = DiceNimMove;

    fn name(&self) -> &str {
        "dice-nim"
    }

    fn setup(&self, settings: &GameSettings, rng: &mut GameRng) -> Self::State {
        let players = settings.players.max(1);
        DiceNimState {
            piles: self.piles.clone(),
            players,
            placements_left: players,
            first_player: rng.random_range(0..players),
            roll: 0,
            winner: None,
        }
    }

    fn legal_moves(&self, ctx: &Context<Self::State>) -> MoveSet<Self::Move> {
        let state = ctx.state();
        if state.winner.is_some() {
            return vec![];
        }
        let piles = (0..).zip(state.piles.iter().copied());
        if state.placements_left > 0 {
            return piles.map(|(pile, _)| DiceNimMove::Place { pile }).collect();
        }
        let roll = u16::from(state.roll);
        piles
            .flat_map(|(pile, size)| {
                (1..=size.min(roll)).map(move |count| DiceNimMove::Take { pile, count })
            })
            .collect()
    }

    fn apply(&self, ctx: &mut Context<Self::State>, mv: &Self::Move) {
        let mover = ctx.mover();
        match *mv {
            DiceNimMove::Place { pile } => {
                let (state, rng) = ctx.state_and_rng_mut();
                state.piles[usize::from(pile)] += 1;
                state.placements_left -= 1;
                let next = if state.placements_left > 0 {
                    state.next_player(mover)
                } else {
                    state.roll = roll_die(rng);
                    state.first_player
                };
                ctx.hand_over(next);
            }
            DiceNimMove::Take { pile, count } => {
                let (state, rng) = ctx.state_and_rng_mut();
                state.piles[usize::from(pile)] -= count;
                if state.total_stones() == 0 {
                    state.winner = Some(mover);
                    state.roll = 0;
                    return;
                }
                let bonus = state.roll == DIE_FACES;
                state.roll = roll_die(rng);
                if !bonus {
                    let next = state.next_player(mover);
                    ctx.end_turn(next);
                }
            }
        }
    }

    fn is_placement_phase(&self, ctx: &Context<Self::State>) -> bool {
        ctx.state().placements_left > 0
    }

    fn outcome(&self, ctx: &Context<Self::State>) -> Option<Outcome> {
        ctx.state()
            .winner
            .map(|winner| Outcome {
                winner: Some(winner),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Game, RandomSeed, RandomState};

    fn new_game(piles: &[u16], players: usize) -> Game<DiceNim> {
        Game::new(DiceNim::new(piles).unwrap(), GameSettings::new(players))
    }

    fn seed(byte: u8) -> RandomState {
        RandomState::from_seed(RandomSeed::from_bytes([byte; 16]))
    }

    #[test]
    fn test_rejects_bad_layouts() {
        assert_eq!(
            DiceNim::new(&[]),
            Err(DiceNimError::PileCount { count: 0 })
        );
        assert_eq!(
            DiceNim::new(&[1; 9]),
            Err(DiceNimError::PileCount { count: 9 })
        );
        assert_eq!(
            DiceNim::new(&[3, 201]),
            Err(DiceNimError::PileTooLarge {
                index: 1,
                size: 201
            })
        );
    }

    #[test]
    fn test_placement_phase() {
        let game = new_game(&[1, 2], 2);
        let mut ctx = game.new_context(&seed(1));

        assert!(game.rules().is_placement_phase(&ctx));
        assert_eq!(
            game.legal_moves(&ctx),
            vec![
                DiceNimMove::Place { pile: 0 },
                DiceNimMove::Place { pile: 1 }
            ]
        );
        assert_eq!(ctx.mover(), 0);

        assert!(game.apply(&mut ctx, &DiceNimMove::Place { pile: 0 }));
        assert_eq!(ctx.mover(), 1);
        assert!(game.apply(&mut ctx, &DiceNimMove::Place { pile: 0 }));

        assert!(!game.rules().is_placement_phase(&ctx));
        assert_eq!(ctx.state().piles(), &[3, 2]);
        assert_eq!(ctx.placement_moves(), 2);
        assert_eq!(ctx.num_turns(), 0);
        assert!((1..=DIE_FACES).contains(&ctx.state().roll()));
    }

    #[test]
    fn test_take_moves_are_bounded_by_roll() {
        let game = new_game(&[2, 9], 2);
        for byte in 0..32 {
            let mut ctx = game.new_context(&seed(byte));
            game.apply(&mut ctx, &DiceNimMove::Place { pile: 0 });
            game.apply(&mut ctx, &DiceNimMove::Place { pile: 1 });

            let roll = u16::from(ctx.state().roll());
            let moves = game.legal_moves(&ctx);
            let expected = usize::from(roll.min(3) + roll.min(10));
            assert_eq!(moves.len(), expected);
            assert!(moves.iter().all(|mv| matches!(
                mv,
                DiceNimMove::Take { count, .. } if (1..=roll).contains(count)
            )));
        }
    }

    #[test]
    fn test_last_stone_wins() {
        let game = new_game(&[0], 2);
        let mut ctx = game.new_context(&seed(5));
        game.apply(&mut ctx, &DiceNimMove::Place { pile: 0 });
        game.apply(&mut ctx, &DiceNimMove::Place { pile: 0 });
        let mover = ctx.mover();

        // 2 stones, any roll allows taking 1
        game.apply(&mut ctx, &DiceNimMove::Take { pile: 0, count: 1 });
        let finisher = ctx.mover();
        let moves = game.legal_moves(&ctx);
        assert_eq!(moves[0], DiceNimMove::Take { pile: 0, count: 1 });
        game.apply(&mut ctx, &moves[0]);

        assert_eq!(
            game.outcome(&ctx),
            Some(Outcome {
                winner: Some(finisher)
            })
        );
        assert!(game.legal_moves(&ctx).is_empty());
        assert!(ctx.num_turns() >= 1);
        assert!(finisher == mover || ctx.num_turns() == 2);
    }

    #[test]
    fn test_setup_draws_first_player_from_rng() {
        let game = new_game(&[4, 4], 4);
        let firsts = (0..64)
            .map(|byte| game.new_context(&seed(byte)).state().first_player)
            .collect::<std::collections::BTreeSet<_>>();
        assert!(firsts.len() > 1);
        assert!(firsts.iter().all(|p| *p < 4));
    }

    #[test]
    fn test_nim_sum() {
        assert_eq!(nim_sum(&[1, 2, 3]), 0);
        assert_eq!(nim_sum(&[4, 1]), 5);
    }
}
