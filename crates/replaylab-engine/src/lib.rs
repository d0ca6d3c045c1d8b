//! Deterministic game replay.
//!
//! This crate holds the data model the rest of the workspace is built on:
//! recorded [`Trial`]s, restorable [`RandomState`] snapshots, the mutable
//! [`Context`] they are replayed into, and the [`ReplayEngine`] that
//! reconstructs every intermediate state bit-for-bit.
//!
//! Rules are consumed through the [`Rules`] trait. The [`games`] module ships
//! a small stochastic reference game used by tests and the CLI.

pub use self::{core::*, engine::*};

pub mod core;
pub mod engine;
pub mod games;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::{DiceNim, DiceNimMove};

    fn game() -> Game<DiceNim> {
        Game::new(DiceNim::new(&[4, 6, 7]).unwrap(), GameSettings::new(2))
    }

    fn record(game: &Game<DiceNim>, byte: u8) -> (Trial<DiceNimMove>, RandomState) {
        let state = RandomState::from_seed(RandomSeed::from_bytes([byte; 16]));
        let agents: [&dyn Agent<DiceNim>; 2] = [&UniformAgent, &UniformAgent];
        let trial = TrialRunner::new(game).run(&state, &agents, &mut rand::rng());
        (trial, state)
    }

    #[test]
    fn test_independent_replays_are_identical() {
        let game = game();
        let engine = ReplayEngine::new(&game);
        for byte in 0..16 {
            let (trial, state) = record(&game, byte);
            let mut a = engine.reconstruct(&state);
            let mut b = engine.reconstruct(&state);
            assert_eq!(a, b);
            for i in 0..trial.num_moves() {
                engine.advance(&mut a, &trial, i, i + 1).unwrap();
                engine.advance(&mut b, &trial, i, i + 1).unwrap();
                assert_eq!(a, b);
                assert_eq!(game.legal_moves(&a), game.legal_moves(&b));
            }
        }
    }

    #[test]
    fn test_split_advance_matches_direct_advance() {
        let game = game();
        let engine = ReplayEngine::new(&game);
        let (trial, state) = record(&game, 42);
        let n = trial.num_moves();

        let mut direct = engine.reconstruct(&state);
        engine.advance(&mut direct, &trial, 0, n).unwrap();

        for k in 0..=n {
            let mut split = engine.reconstruct(&state);
            engine.advance(&mut split, &trial, 0, k).unwrap();
            engine.advance(&mut split, &trial, k, n).unwrap();
            assert_eq!(split, direct);
        }
    }

    #[test]
    fn test_advance_rejects_bad_ranges() {
        let game = game();
        let engine = ReplayEngine::new(&game);
        let (trial, state) = record(&game, 9);
        let n = trial.num_moves();
        let mut ctx = engine.reconstruct(&state);

        assert_eq!(
            engine.advance(&mut ctx, &trial, 0, n + 1),
            Err(ReplayError::OutOfRange {
                from: 0,
                to: n + 1,
                num_moves: n
            })
        );
        assert_eq!(
            engine.advance(&mut ctx, &trial, 1, 2),
            Err(ReplayError::CursorMismatch {
                expected: 1,
                actual: 0
            })
        );
    }

    #[test]
    fn test_illegal_move_is_reported() {
        let game = game();
        let engine = ReplayEngine::new(&game);
        let (trial, state) = record(&game, 11);
        let placement = trial.num_initial_placement_moves();

        let mut moves = trial.moves().to_vec();
        moves[placement] = DiceNimMove::Take { pile: 0, count: 99 };
        let tampered = Trial::from_parts(moves, placement, trial.num_turns(), trial.status())
            .unwrap();

        assert_eq!(
            engine.replay_to(&tampered, &state, tampered.num_moves()),
            Err(TrialError::Replay(ReplayError::IllegalMove {
                index: placement,
                mv: "Take { pile: 0, count: 99 }".to_owned(),
            }))
        );
    }

    #[test]
    fn test_branching_profile_walk() {
        let game = game();
        let engine = ReplayEngine::new(&game);
        let (trial, state) = record(&game, 21);
        let profile = engine.branching_profile(&trial, &state).unwrap();

        let start = trial.num_initial_placement_moves();
        assert_eq!(profile.len(), trial.num_moves() - start);

        let first = engine.replay_to(&trial, &state, start).unwrap();
        assert_eq!(profile[0], game.legal_moves(&first).len());
        assert!(profile.iter().all(|count| *count > 0));
    }

    #[test]
    fn test_for_each_decision_visits_real_moves() {
        let game = game();
        let engine = ReplayEngine::new(&game);
        let (trial, state) = record(&game, 33);

        let mut visited = vec![];
        engine
            .for_each_decision(
                &trial,
                &state,
                |_| true,
                |index, ctx, legal, mv| {
                    assert_eq!(ctx.move_index(), index);
                    assert!(legal.contains(mv));
                    visited.push(index);
                },
            )
            .unwrap();

        let start = trial.num_initial_placement_moves();
        assert_eq!(visited, (start..trial.num_moves()).collect::<Vec<_>>());
    }
}
