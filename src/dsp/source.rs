//! Synthesis sources: the closed set of things the mixer can pull audio from.

use crate::integration::impact_synth::ImpactSynthesizer;
use crate::integration::resonance::ResonanceSynthesizer;

use super::oscillator::Oscillator;

/// Parameter identifiers accepted by [`Synthesizer::set_parameter`].
///
/// Sources ignore identifiers that do not apply to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Param {
    /// Hz.
    Frequency,
    /// Linear gain [0, 1].
    Amplitude,
    /// Waveform index (see [`super::oscillator::Waveform::from_index`]).
    Waveform,
    /// Pitch multiplier per second for impact sounds.
    FrequencyDecay,
    /// Lowest pitch an impact decays to (Hz).
    FrequencyFloor,
    /// Resonator Q.
    Quality,
    /// Resonator damping [0, 1].
    Damping,
}

/// Anything that renders interleaved stereo audio.
pub trait Synthesizer {
    /// Resize `out` to `num_samples` stereo frames (`num_samples * 2` values)
    /// and fill it. Values stay within [-1, 1].
    fn generate_samples(&mut self, out: &mut Vec<f32>, num_samples: usize);

    fn set_parameter(&mut self, param: Param, value: f64);

    fn sample_rate(&self) -> f64;
}

/// A source registered with the mixer.
#[derive(Debug, Clone)]
pub enum Source {
    Oscillator(Oscillator),
    Impact(ImpactSynthesizer),
    Resonance(ResonanceSynthesizer),
}

impl Source {
    /// Whether the source currently contributes sound.
    pub fn is_active(&self) -> bool {
        match self {
            Source::Oscillator(o) => o.amplitude() > 0.0,
            Source::Impact(s) => s.is_playing(),
            Source::Resonance(s) => s.is_ringing(),
        }
    }
}

impl Synthesizer for Source {
    fn generate_samples(&mut self, out: &mut Vec<f32>, num_samples: usize) {
        match self {
            Source::Oscillator(s) => s.generate_samples(out, num_samples),
            Source::Impact(s) => s.generate_samples(out, num_samples),
            Source::Resonance(s) => s.generate_samples(out, num_samples),
        }
    }

    fn set_parameter(&mut self, param: Param, value: f64) {
        match self {
            Source::Oscillator(s) => s.set_parameter(param, value),
            Source::Impact(s) => s.set_parameter(param, value),
            Source::Resonance(s) => s.set_parameter(param, value),
        }
    }

    fn sample_rate(&self) -> f64 {
        match self {
            Source::Oscillator(s) => s.sample_rate(),
            Source::Impact(s) => s.sample_rate(),
            Source::Resonance(s) => s.sample_rate(),
        }
    }
}

impl From<Oscillator> for Source {
    fn from(s: Oscillator) -> Self {
        Source::Oscillator(s)
    }
}

impl From<ImpactSynthesizer> for Source {
    fn from(s: ImpactSynthesizer) -> Self {
        Source::Impact(s)
    }
}

impl From<ResonanceSynthesizer> for Source {
    fn from(s: ResonanceSynthesizer) -> Self {
        Source::Resonance(s)
    }
}

/// Size `out` to `num_samples` zeroed stereo frames.
pub(crate) fn prepare_stereo(out: &mut Vec<f32>, num_samples: usize) {
    out.clear();
    out.resize(num_samples * 2, 0.0);
}
