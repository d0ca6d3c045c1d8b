use std::fmt::Write as _;

use rand::{
    Rng, SeedableRng as _,
    distr::{Distribution, StandardUniform},
};
use rand_pcg::Pcg32;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Random number generator owned by a [`Context`](crate::Context).
///
/// All randomness that influences game state (setup, dice rolls, ...) must be
/// drawn from this generator so that a trial can be replayed bit-for-bit from
/// its [`RandomState`].
pub type GameRng = Pcg32;

/// 128-bit seed used to create a fresh [`RandomState`].
///
/// Serialized as a 32-character hex string so it can be written on the command
/// line or in a config file.
///
/// # Example
///
/// ```
/// use replaylab_engine::{RandomSeed, RandomState};
/// use rand::Rng as _;
///
/// let seed: RandomSeed = rand::rng().random();
/// assert_eq!(RandomState::from_seed(seed), RandomState::from_seed(seed));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomSeed([u8; 16]);

impl RandomSeed {
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }
}

impl Serialize for RandomSeed {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let num = u128::from_be_bytes(self.0);
        let mut hex_str = String::with_capacity(2 * self.0.len());
        write!(&mut hex_str, "{num:032x}").map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&hex_str)
    }
}

impl<'de> Deserialize<'de> for RandomSeed {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let hex_str = String::deserialize(deserializer)?;
        hex_str.parse().map_err(serde::de::Error::custom)
    }
}

impl std::str::FromStr for RandomSeed {
    type Err = String;

    fn from_str(hex_str: &str) -> Result<Self, Self::Err> {
        if hex_str.len() != 32 {
            return Err(format!(
                "invalid hex: expected 32 characters, got {}",
                hex_str.len()
            ));
        }
        let num =
            u128::from_str_radix(hex_str, 16).map_err(|e| format!("invalid hex: {hex_str} ({e})"))?;
        Ok(Self(num.to_be_bytes()))
    }
}

impl Distribution<RandomSeed> for StandardUniform {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> RandomSeed {
        let mut seed = [0; 16];
        rng.fill(&mut seed);
        RandomSeed(seed)
    }
}

/// Snapshot of a [`GameRng`]'s internal state.
///
/// Restoring a snapshot and drawing from it reproduces exactly the sequence the
/// original generator would have produced from the moment the snapshot was
/// taken. Trials are stored together with the snapshot taken right before game
/// setup, which is all the replay engine needs to rebuild every state.
///
/// The snapshot is opaque: the only operations are capture, restore and
/// (de)serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RandomState(Pcg32);

impl RandomState {
    /// Creates the state of a freshly seeded generator.
    #[must_use]
    pub fn from_seed(seed: RandomSeed) -> Self {
        Self(Pcg32::from_seed(seed.0))
    }

    /// Creates a state from a seed drawn from `rng`.
    #[must_use]
    pub fn random<R>(rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        Self::from_seed(rng.random())
    }

    /// Captures the current state of `rng` without advancing it.
    #[must_use]
    pub fn capture(rng: &GameRng) -> Self {
        Self(rng.clone())
    }

    /// Returns a generator that continues from this snapshot.
    #[must_use]
    pub fn restore(&self) -> GameRng {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use rand::RngCore as _;

    use super::*;

    fn draw(rng: &mut GameRng, n: usize) -> Vec<u32> {
        (0..n).map(|_| rng.next_u32()).collect()
    }

    #[test]
    fn test_seed_known_value_sequential_bytes() {
        let seed = RandomSeed([
            0x01, 0x23, 0x45, 0x67, 0x89, 0xAB, 0xCD, 0xEF, 0xFE, 0xDC, 0xBA, 0x98, 0x76, 0x54,
            0x32, 0x10,
        ]);
        let serialized = serde_json::to_string(&seed).unwrap();
        assert_eq!(serialized, "\"0123456789abcdeffedcba9876543210\"");

        let deserialized: RandomSeed = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, seed);
    }

    #[test]
    fn test_seed_rejects_bad_hex() {
        for json in ["\"\"", "\"0123\"", "\"ghijklmnopqrstuvwxyzghijklmnopqr\""] {
            let err = serde_json::from_str::<RandomSeed>(json).unwrap_err();
            assert!(err.to_string().contains("invalid hex"), "{json}: {err}");
        }
    }

    #[test]
    fn test_restore_continues_mid_stream() {
        let mut rng = RandomState::from_seed(RandomSeed([7; 16])).restore();
        let _ = draw(&mut rng, 13);

        let snapshot = RandomState::capture(&rng);
        let expected = draw(&mut rng, 32);

        let mut restored = snapshot.restore();
        assert_eq!(draw(&mut restored, 32), expected);
    }

    #[test]
    fn test_json_snapshot_preserves_sequence() {
        let state = RandomState::random(&mut rand::rng());
        let json = serde_json::to_string(&state).unwrap();
        let restored: RandomState = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, state);
        assert_eq!(draw(&mut restored.restore(), 20), draw(&mut state.restore(), 20));
    }
}
