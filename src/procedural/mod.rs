//! Procedural parameter generation.
//!
//! Every generator yields values in [0, 1] and is reproducible from its seed.
//! The [`ProceduralController`] maps four of them onto audio parameter ranges;
//! the [`AdaptiveProceduralSystem`] steers those ranges from measured output.

pub mod adaptive;
pub mod chaotic;
pub mod controller;
pub mod markov;
pub mod noise;
pub mod spectral;

pub use adaptive::{AdaptiveProceduralSystem, AudioMetrics};
pub use chaotic::{ChaosType, ChaoticGenerator};
pub use controller::{ParameterSlot, ProceduralController, ProceduralParameters};
pub use markov::MarkovGenerator;
pub use noise::NoiseGenerator;
pub use spectral::SpectralGenerator;

/// Seed used by generators constructed without one.
pub const DEFAULT_SEED: u64 = 12345;

/// A source of parameter values in [0, 1].
pub trait ParameterGenerator {
    fn next_value(&mut self) -> f64;

    /// Return to the state right after the last `set_seed` (or construction).
    fn reset(&mut self);

    /// Reseed. The same seed always yields the same sequence.
    fn set_seed(&mut self, seed: u64);
}

/// The closed set of generator kinds.
#[derive(Debug, Clone)]
pub enum Generator {
    Noise(NoiseGenerator),
    Chaotic(ChaoticGenerator),
    Spectral(SpectralGenerator),
    Markov(MarkovGenerator),
}

impl ParameterGenerator for Generator {
    fn next_value(&mut self) -> f64 {
        match self {
            Generator::Noise(g) => g.next_value(),
            Generator::Chaotic(g) => g.next_value(),
            Generator::Spectral(g) => g.next_value(),
            Generator::Markov(g) => g.next_value(),
        }
    }

    fn reset(&mut self) {
        match self {
            Generator::Noise(g) => g.reset(),
            Generator::Chaotic(g) => g.reset(),
            Generator::Spectral(g) => g.reset(),
            Generator::Markov(g) => g.reset(),
        }
    }

    fn set_seed(&mut self, seed: u64) {
        match self {
            Generator::Noise(g) => g.set_seed(seed),
            Generator::Chaotic(g) => g.set_seed(seed),
            Generator::Spectral(g) => g.set_seed(seed),
            Generator::Markov(g) => g.set_seed(seed),
        }
    }
}

impl From<NoiseGenerator> for Generator {
    fn from(g: NoiseGenerator) -> Self {
        Generator::Noise(g)
    }
}

impl From<ChaoticGenerator> for Generator {
    fn from(g: ChaoticGenerator) -> Self {
        Generator::Chaotic(g)
    }
}

impl From<SpectralGenerator> for Generator {
    fn from(g: SpectralGenerator) -> Self {
        Generator::Spectral(g)
    }
}

impl From<MarkovGenerator> for Generator {
    fn from(g: MarkovGenerator) -> Self {
        Generator::Markov(g)
    }
}
