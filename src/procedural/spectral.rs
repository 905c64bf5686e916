//! Additive sum-of-sines parameter source.

use std::f64::consts::TAU;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{DEFAULT_SEED, ParameterGenerator};

/// Time advanced per call.
const TIME_STEP: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Harmonic {
    frequency: f64,
    amplitude: f64,
    phase: f64,
}

/// `0.5 + 0.5 · Σ Aᵢ·sin(2π·fᵢ·t + φᵢ) / Σ|Aᵢ|`.
///
/// Phases are drawn from the seed, so reseeding changes the waveform shape but
/// not its spectrum. With no harmonics the output holds at 0.5.
#[derive(Debug, Clone)]
pub struct SpectralGenerator {
    harmonics: Vec<Harmonic>,
    seed: u64,
    rng: StdRng,
    time: f64,
}

impl Default for SpectralGenerator {
    fn default() -> Self {
        SpectralGenerator::with_seed(DEFAULT_SEED)
    }
}

impl SpectralGenerator {
    pub fn with_seed(seed: u64) -> Self {
        SpectralGenerator {
            harmonics: Vec::new(),
            seed,
            rng: StdRng::seed_from_u64(seed),
            time: 0.0,
        }
    }

    pub fn with_harmonic(mut self, frequency: f64, amplitude: f64) -> Self {
        self.add_harmonic(frequency, amplitude);
        self
    }

    /// `frequency` in cycles per unit time (one unit = 100 calls). Non-finite
    /// values are ignored.
    pub fn add_harmonic(&mut self, frequency: f64, amplitude: f64) {
        if !(frequency.is_finite() && amplitude.is_finite()) {
            return;
        }
        let phase = self.rng.random_range(0.0..TAU);
        self.harmonics.push(Harmonic {
            frequency,
            amplitude,
            phase,
        });
    }

    pub fn clear_harmonics(&mut self) {
        self.harmonics.clear();
    }

    pub fn harmonic_count(&self) -> usize {
        self.harmonics.len()
    }
}

impl ParameterGenerator for SpectralGenerator {
    fn next_value(&mut self) -> f64 {
        let t = self.time;
        self.time += TIME_STEP;

        let norm: f64 = self.harmonics.iter().map(|h| h.amplitude.abs()).sum();
        if norm <= 0.0 {
            return 0.5;
        }
        let sum: f64 = self
            .harmonics
            .iter()
            .map(|h| h.amplitude * (TAU * h.frequency * t + h.phase).sin())
            .sum();
        (0.5 + 0.5 * sum / norm).clamp(0.0, 1.0)
    }

    /// Rewinds time and the phase stream to the last seed.
    fn reset(&mut self) {
        self.set_seed(self.seed);
    }

    /// Redraws the phase of every harmonic from the new seed.
    fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
        self.rng = StdRng::seed_from_u64(seed);
        for h in &mut self.harmonics {
            h.phase = self.rng.random_range(0.0..TAU);
        }
        self.time = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_holds_midpoint() {
        let mut g = SpectralGenerator::default();
        assert_eq!(g.harmonic_count(), 0);
        for _ in 0..10 {
            assert_eq!(g.next_value(), 0.5);
        }
    }

    #[test]
    fn single_harmonic_is_periodic() {
        // 1 cycle per unit time = 100 calls per period.
        let mut g = SpectralGenerator::default().with_harmonic(1.0, 2.0);
        let values: Vec<f64> = (0..300).map(|_| g.next_value()).collect();
        for i in 0..100 {
            assert!((values[i] - values[i + 100]).abs() < 1e-9);
        }
        let hi = values.iter().cloned().fold(0.0, f64::max);
        let lo = values.iter().cloned().fold(1.0, f64::min);
        assert!(hi > 0.99 && lo < 0.01, "full swing expected, got {lo}..{hi}");
    }

    #[test]
    fn normalized_into_unit_range() {
        let mut g = SpectralGenerator::with_seed(4)
            .with_harmonic(0.3, 5.0)
            .with_harmonic(1.7, -3.0)
            .with_harmonic(4.1, 2.0);
        assert_eq!(g.harmonic_count(), 3);
        for _ in 0..5000 {
            let v = g.next_value();
            assert!((0.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn clear_returns_to_midpoint() {
        let mut g = SpectralGenerator::default().with_harmonic(2.0, 1.0);
        g.clear_harmonics();
        assert_eq!(g.harmonic_count(), 0);
        assert_eq!(g.next_value(), 0.5);
    }

    #[test]
    fn reset_replays_phase_draws() {
        let mut g = SpectralGenerator::with_seed(9).with_harmonic(1.0, 1.0);
        for _ in 0..37 {
            g.next_value();
        }
        g.reset();
        g.add_harmonic(3.0, 0.5);

        let mut fresh = SpectralGenerator::with_seed(9)
            .with_harmonic(1.0, 1.0)
            .with_harmonic(3.0, 0.5);
        for i in 0..200 {
            assert_eq!(g.next_value(), fresh.next_value(), "call {i}");
        }
    }

    #[test]
    fn non_finite_harmonic_ignored() {
        let mut g = SpectralGenerator::default();
        g.add_harmonic(f64::NAN, 1.0);
        g.add_harmonic(1.0, f64::INFINITY);
        assert_eq!(g.harmonic_count(), 0);
    }
}
