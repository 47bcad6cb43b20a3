//! Dice Rolls
//!
//! Xorshift128+ generator behind every to-hit and damage roll.
//! The server owns the stream; client-supplied values never feed it.

use sha2::{Digest, Sha256};

/// Server-side dice generator using the Xorshift128+ algorithm.
///
/// Seeded once per process from hashed system entropy. Given the same
/// seed it produces the same sequence, which is what the combat tests
/// rely on.
#[derive(Clone, Debug)]
pub struct DiceRng {
    state: [u64; 2],
}

impl DiceRng {
    /// Create a generator from a 64-bit seed.
    ///
    /// Uses SplitMix64 to initialize the internal state, ensuring
    /// good distribution even from weak seeds.
    pub fn new(seed: u64) -> Self {
        let mut s = seed;
        let state0 = splitmix64(&mut s);
        let state1 = splitmix64(&mut s);

        // State must never be all zeros
        let state = if state0 == 0 && state1 == 0 {
            [1, 1]
        } else {
            [state0, state1]
        };

        Self { state }
    }

    /// Create a generator seeded from system entropy.
    pub fn from_entropy() -> Self {
        Self::new(derive_dice_seed())
    }

    /// Generate the next 64-bit random value.
    #[inline]
    fn next_u64(&mut self) -> u64 {
        let s0 = self.state[0];
        let mut s1 = self.state[1];
        let result = s0.wrapping_add(s1);

        s1 ^= s0;
        self.state[0] = s0.rotate_left(24) ^ s1 ^ (s1 << 16);
        self.state[1] = s1.rotate_left(37);

        result
    }

    /// Roll one die, producing a value in `[1, sides]`.
    ///
    /// `sides == 0` is treated as a one-sided die.
    #[inline]
    pub fn roll(&mut self, sides: u32) -> u32 {
        if sides <= 1 {
            return 1;
        }
        // Simple modulo - slight bias for very large dice, but acceptable
        (self.next_u64() % sides as u64) as u32 + 1
    }

    /// Roll the to-hit d20.
    #[inline]
    pub fn d20(&mut self) -> u32 {
        self.roll(20)
    }
}

/// SplitMix64 for seed initialization.
/// Produces well-distributed values from sequential seeds.
#[inline]
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Derive a process-wide dice seed from system entropy.
///
/// Hashes wall-clock nanoseconds and the process id under a domain
/// separator so two servers started in the same instant still diverge.
pub fn derive_dice_seed() -> u64 {
    let mut hasher = Sha256::new();

    // Domain separator
    hasher.update(b"TAVERN_ARENA_DICE_V1");

    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    hasher.update(nanos.to_le_bytes());
    hasher.update(std::process::id().to_le_bytes());

    let hash = hasher.finalize();

    // Take first 8 bytes as seed
    u64::from_le_bytes(hash[0..8].try_into().unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = DiceRng::new(12345);
        let mut b = DiceRng::new(12345);

        for _ in 0..1000 {
            assert_eq!(a.roll(20), b.roll(20));
        }
    }

    #[test]
    fn test_different_seeds_diverge() {
        let mut a = DiceRng::new(12345);
        let mut b = DiceRng::new(54321);

        let rolls_a: Vec<u32> = (0..32).map(|_| a.roll(20)).collect();
        let rolls_b: Vec<u32> = (0..32).map(|_| b.roll(20)).collect();
        assert_ne!(rolls_a, rolls_b);
    }

    #[test]
    fn test_d20_bounds() {
        let mut rng = DiceRng::new(7);
        for _ in 0..10_000 {
            let r = rng.d20();
            assert!((1..=20).contains(&r));
        }
    }

    #[test]
    fn test_damage_die_bounds() {
        let mut rng = DiceRng::new(99);
        for sides in [2u32, 4, 6, 8, 10, 12] {
            for _ in 0..1000 {
                let r = rng.roll(sides);
                assert!(r >= 1 && r <= sides);
            }
        }
    }

    #[test]
    fn test_d20_covers_full_range() {
        let mut rng = DiceRng::new(1);
        let mut seen = [false; 21];
        for _ in 0..10_000 {
            seen[rng.d20() as usize] = true;
        }
        for face in 1..=20 {
            assert!(seen[face], "face {} never rolled", face);
        }
    }

    #[test]
    fn test_degenerate_die() {
        let mut rng = DiceRng::new(3);
        assert_eq!(rng.roll(0), 1);
        assert_eq!(rng.roll(1), 1);
    }

    #[test]
    fn test_zero_seed_is_valid() {
        let mut rng = DiceRng::new(0);
        let r = rng.d20();
        assert!((1..=20).contains(&r));
    }
}
