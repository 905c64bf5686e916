//! One-dimensional gradient (Perlin) noise over time.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use super::{DEFAULT_SEED, ParameterGenerator};

const TABLE_SIZE: usize = 256;
/// Time advanced per call.
const TIME_STEP: f64 = 0.01;

/// Fractal 1-D Perlin noise: `octaves` layers, each at twice the frequency and
/// `persistence` times the amplitude of the last.
#[derive(Debug, Clone)]
pub struct NoiseGenerator {
    seed: u64,
    time: f64,
    octaves: u32,
    persistence: f64,
    scale: f64,
    permutation: Vec<u8>,
}

impl Default for NoiseGenerator {
    fn default() -> Self {
        NoiseGenerator::with_seed(DEFAULT_SEED)
    }
}

impl NoiseGenerator {
    pub fn with_seed(seed: u64) -> Self {
        NoiseGenerator {
            seed,
            time: 0.0,
            octaves: 4,
            persistence: 0.5,
            scale: 1.0,
            permutation: shuffled_table(seed),
        }
    }

    pub fn set_octaves(&mut self, octaves: u32) {
        self.octaves = octaves.clamp(1, 16);
    }

    pub fn set_persistence(&mut self, persistence: f64) {
        if persistence.is_finite() {
            self.persistence = persistence.clamp(0.0, 1.0);
        }
    }

    /// Lattice cells per unit of time; floored at 0.1.
    pub fn set_scale(&mut self, scale: f64) {
        if scale.is_finite() {
            self.scale = scale.max(0.1);
        }
    }

    pub fn octaves(&self) -> u32 {
        self.octaves
    }

    pub fn persistence(&self) -> f64 {
        self.persistence
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    fn gradient(&self, lattice: f64) -> f64 {
        let i = (lattice as i64).rem_euclid(TABLE_SIZE as i64) as usize;
        let hash = self.permutation[i];
        hash as f64 / 127.5 - 1.0
    }

    /// Single-octave noise in [-0.5, 0.5].
    fn perlin(&self, x: f64) -> f64 {
        let x0 = x.floor();
        let t = x - x0;
        let n0 = self.gradient(x0) * t;
        let n1 = self.gradient(x0 + 1.0) * (t - 1.0);
        n0 + fade(t) * (n1 - n0)
    }
}

/// Quintic smoothstep `6t⁵ − 15t⁴ + 10t³`; first and second derivatives vanish at the lattice.
fn fade(t: f64) -> f64 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

fn shuffled_table(seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut table: Vec<u8> = (0..=255).collect();
    table.shuffle(&mut rng);
    table
}

impl ParameterGenerator for NoiseGenerator {
    fn next_value(&mut self) -> f64 {
        let mut sum = 0.0;
        let mut total = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = self.scale;
        for _ in 0..self.octaves {
            sum += self.perlin(self.time * frequency) * amplitude;
            total += amplitude;
            amplitude *= self.persistence;
            frequency *= 2.0;
        }
        self.time += TIME_STEP;

        if total <= 0.0 {
            return 0.5;
        }
        (0.5 + sum / total).clamp(0.0, 1.0)
    }

    fn reset(&mut self) {
        self.time = 0.0;
    }

    fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
        self.permutation = shuffled_table(seed);
        self.time = 0.0;
    }
}
