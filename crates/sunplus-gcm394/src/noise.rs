//! Undriven bus source for status registers nothing drives.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// What an undriven status register returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusNoise {
    /// Fresh entropy on every read, as on hardware.
    #[default]
    Undriven,
    /// Reproducible pseudo-random sequence.
    Seeded(u64),
    /// Always the same value.
    Fixed(u16),
}

#[derive(Debug)]
pub(crate) struct NoiseSource {
    mode: BusNoise,
    rng: ChaCha8Rng,
    draws: u64,
}

impl NoiseSource {
    pub(crate) fn new(mode: BusNoise) -> Self {
        Self {
            mode,
            rng: Self::rng_for(mode),
            draws: 0,
        }
    }

    fn rng_for(mode: BusNoise) -> ChaCha8Rng {
        match mode {
            BusNoise::Seeded(seed) => ChaCha8Rng::seed_from_u64(seed),
            BusNoise::Undriven | BusNoise::Fixed(_) => ChaCha8Rng::from_rng(&mut rand::rng()),
        }
    }

    pub(crate) fn mode(&self) -> BusNoise {
        self.mode
    }

    pub(crate) fn next(&mut self) -> u16 {
        if let BusNoise::Fixed(value) = self.mode {
            return value;
        }
        // One stream word per draw, so `seek` can jump by word position.
        self.draws = self.draws.wrapping_add(1);
        self.rng.next_u32() as u16
    }

    /// Values drawn since construction.
    pub(crate) fn draws(&self) -> u64 {
        self.draws
    }

    /// Move to `draws` values in. Only a seeded sequence is repositioned;
    /// undriven noise keeps the count but draws fresh entropy.
    pub(crate) fn seek(&mut self, draws: u64) {
        self.rng = Self::rng_for(self.mode);
        if matches!(self.mode, BusNoise::Seeded(_)) {
            self.rng.set_word_pos(u128::from(draws));
        }
        self.draws = draws;
    }
}
