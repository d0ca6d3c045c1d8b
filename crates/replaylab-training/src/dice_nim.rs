//! Feature sets for Dice Nim.
//!
//! Spatial features mark the pile a move touches (and, for the extended set,
//! how many stones it takes). Aspatial features describe the position the
//! move leaves behind.

use replaylab_engine::{
    Context,
    games::{
        DiceNim, DiceNimMove, DiceNimState,
        dice_nim::{DIE_FACES, MAX_PILES, nim_sum},
    },
};

use crate::feature::{FeatureSet, FeatureVector};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiceNimFeatures {
    /// Pile one-hot plus four aspatial values.
    Compact,
    /// Compact features plus a take-count one-hot and three position values.
    Extended,
}

const COMPACT_ASPATIAL: usize = 4;
const EXTENDED_ASPATIAL: usize = COMPACT_ASPATIAL + 3;

fn flag(value: bool) -> f32 {
    if value { 1.0 } else { 0.0 }
}

impl DiceNimFeatures {
    fn compact(state: &DiceNimState, mv: &DiceNimMove) -> (Vec<u32>, Vec<f32>) {
        let pile = u32::from(match *mv {
            DiceNimMove::Place { pile } | DiceNimMove::Take { pile, .. } => pile,
        });
        let DiceNimMove::Take { count, .. } = *mv else {
            return (vec![pile], vec![0.0; COMPACT_ASPATIAL]);
        };

        let mut piles = state.piles().to_vec();
        piles[mv.pile()] -= count;
        let roll = f32::from(state.roll().max(1));
        let aspatial = vec![
            (f32::from(count) / roll).min(1.0),
            flag(nim_sum(&piles) == 0),
            flag(piles[mv.pile()] == 0),
            flag(piles.iter().all(|p| *p == 0)),
        ];
        (vec![pile], aspatial)
    }

    #[expect(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    fn extended(state: &DiceNimState, mv: &DiceNimMove) -> (Vec<u32>, Vec<f32>) {
        let (mut spatial, mut aspatial) = Self::compact(state, mv);
        let count = match *mv {
            DiceNimMove::Place { .. } => 0,
            DiceNimMove::Take { count, .. } => count.min(u16::from(DIE_FACES)),
        };
        if count > 0 {
            spatial.push(MAX_PILES as u32 + u32::from(count) - 1);
        }
        let total = state.total_stones().max(1) as f32;
        aspatial.extend([
            f32::from(count) / total,
            f32::from(state.roll()) / f32::from(DIE_FACES),
            flag(state.roll() == DIE_FACES),
        ]);
        (spatial, aspatial)
    }
}

impl FeatureSet<DiceNim> for DiceNimFeatures {
    fn id(&self) -> &str {
        match self {
            Self::Compact => "dice-nim-compact",
            Self::Extended => "dice-nim-extended",
        }
    }

    fn num_spatial_features(&self) -> usize {
        match self {
            Self::Compact => MAX_PILES,
            Self::Extended => MAX_PILES + usize::from(DIE_FACES),
        }
    }

    fn num_aspatial_features(&self) -> usize {
        match self {
            Self::Compact => COMPACT_ASPATIAL,
            Self::Extended => EXTENDED_ASPATIAL,
        }
    }

    fn compute(&self, ctx: &Context<DiceNimState>, mv: &DiceNimMove) -> FeatureVector {
        let (spatial, aspatial) = match self {
            Self::Compact => Self::compact(ctx.state(), mv),
            Self::Extended => Self::extended(ctx.state(), mv),
        };
        FeatureVector::new(spatial, aspatial)
    }
}

#[cfg(test)]
mod tests {
    use replaylab_engine::{Game, GameSettings, RandomSeed, RandomState};

    use super::*;

    fn play_phase(piles: &[u16]) -> (Game<DiceNim>, Context<DiceNimState>) {
        let game = Game::new(DiceNim::new(piles).unwrap(), GameSettings::new(2));
        let mut ctx = game.new_context(&RandomState::from_seed(RandomSeed::from_bytes([2; 16])));
        game.apply(&mut ctx, &DiceNimMove::Place { pile: 0 });
        game.apply(&mut ctx, &DiceNimMove::Place { pile: 0 });
        (game, ctx)
    }

    #[test]
    fn test_every_vector_fits_its_feature_set() {
        let (game, ctx) = play_phase(&[4, 9, 1]);
        let moves = game.legal_moves(&ctx);
        for features in [DiceNimFeatures::Compact, DiceNimFeatures::Extended] {
            let vectors = features.compute_all(&ctx, &moves);
            assert_eq!(vectors.len(), moves.len());
            assert!(vectors.iter().all(|v| features.fits(v)), "{}", features.id());
        }
    }

    #[test]
    fn test_winning_move_is_flagged() {
        // pile 0 holds the two placed stones, every roll allows taking one
        let (game, ctx) = play_phase(&[0]);
        let take_all = game
            .legal_moves(&ctx)
            .into_iter()
            .find(|mv| *mv == DiceNimMove::Take { pile: 0, count: 2 });
        let take_one =
            DiceNimFeatures::Compact.compute(&ctx, &DiceNimMove::Take { pile: 0, count: 1 });
        assert_eq!(take_one.aspatial()[3], 0.0);
        if let Some(mv) = take_all {
            let vector = DiceNimFeatures::Compact.compute(&ctx, &mv);
            assert_eq!(vector.active_spatial(), &[0]);
            assert_eq!(&vector.aspatial()[1..], &[1.0, 1.0, 1.0]);
        }
    }

    #[test]
    fn test_extended_marks_take_count() {
        let (_, ctx) = play_phase(&[6]);
        let vector =
            DiceNimFeatures::Extended.compute(&ctx, &DiceNimMove::Take { pile: 0, count: 1 });
        assert_eq!(vector.active_spatial(), &[0, 8]);
        assert_eq!(vector.aspatial().len(), EXTENDED_ASPATIAL);
    }
}
