//! Random number generation for simulation runs.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Multiplier of the 64-bit linear-congruential generator (Knuth MMIX).
const LCG_MULTIPLIER: u64 = 6_364_136_223_846_793_005;

/// Increment of the 64-bit linear-congruential generator (Knuth MMIX).
const LCG_INCREMENT: u64 = 1_442_695_040_888_963_407;

/// Scale turning the top 53 bits of a word into a float in [0, 1).
const UNIT_SCALE: f64 = 1.0 / (1u64 << 53) as f64;

#[derive(Debug, Clone)]
enum Source {
    Lcg { state: u64 },
    Entropy(ChaCha8Rng),
}

/// The single random source of one simulation run.
///
/// Seeded runs use a 64-bit linear-congruential generator so that the same
/// seed always reproduces the same sequence. Unseeded runs draw from a
/// ChaCha8 generator seeded by the thread RNG.
#[derive(Debug, Clone)]
pub struct SimRng {
    source: Source,
    seed: Option<u64>,
}

impl SimRng {
    /// Creates a deterministic generator from a seed.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            source: Source::Lcg { state: seed },
            seed: Some(seed),
        }
    }

    /// Creates a non-reproducible generator from ambient entropy.
    pub fn from_entropy() -> Self {
        Self {
            source: Source::Entropy(ChaCha8Rng::from_rng(&mut rand::rng())),
            seed: None,
        }
    }

    /// Creates the generator a run with the given optional seed should use.
    pub fn for_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::from_seed(seed),
            None => Self::from_entropy(),
        }
    }

    /// Returns the seed, if this generator is deterministic.
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Generates a random number in [0, 1).
    pub fn next_f64(&mut self) -> f64 {
        let word = match &mut self.source {
            Source::Lcg { state } => {
                *state = state
                    .wrapping_mul(LCG_MULTIPLIER)
                    .wrapping_add(LCG_INCREMENT);
                *state
            }
            Source::Entropy(rng) => rng.next_u64(),
        };
        (word >> 11) as f64 * UNIT_SCALE
    }

    /// Returns true with the given probability.
    pub fn random_bool(&mut self, probability: f64) -> bool {
        self.next_f64() < probability
    }
}
