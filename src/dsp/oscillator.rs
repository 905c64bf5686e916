//! Wavetable oscillator with PolyBLEP-corrected edges and a seeded noise source.

use std::f64::consts::PI;
use std::sync::OnceLock;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::source::{Param, Synthesizer, prepare_stereo};

/// Entries in the shared sine table (one full cycle).
const SINE_TABLE_SIZE: usize = 4096;
/// Lowest frequency an oscillator will run at (Hz).
pub const MIN_FREQUENCY: f64 = 0.01;

static SINE_TABLE: OnceLock<Vec<f64>> = OnceLock::new();

fn sine_table() -> &'static [f64] {
    SINE_TABLE.get_or_init(|| {
        (0..=SINE_TABLE_SIZE)
            .map(|i| (2.0 * PI * i as f64 / SINE_TABLE_SIZE as f64).sin())
            .collect()
    })
}

/// Supported waveform shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Square,
    Sawtooth,
    Triangle,
    Noise,
}

impl Waveform {
    /// Waveform for a numeric parameter value (rounded, clamped to the last shape).
    pub fn from_index(index: f64) -> Self {
        match index.round().max(0.0) as u32 {
            0 => Waveform::Sine,
            1 => Waveform::Square,
            2 => Waveform::Sawtooth,
            3 => Waveform::Triangle,
            _ => Waveform::Noise,
        }
    }
}

/// A phase-accumulating oscillator.
#[derive(Debug, Clone)]
pub struct Oscillator {
    waveform: Waveform,
    frequency: f64,
    amplitude: f64,
    phase: f64,
    sample_rate: f64,
    seed: u64,
    rng: StdRng,
}

impl Oscillator {
    pub fn new(waveform: Waveform, sample_rate: f64) -> Self {
        let seed = 0x5eed;
        Oscillator {
            waveform,
            frequency: 440.0,
            amplitude: 1.0,
            phase: 0.0,
            sample_rate: sample_rate.max(1.0),
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Clamped to `(0, sample_rate / 2]`.
    pub fn set_frequency(&mut self, frequency: f64) {
        let nyquist = self.sample_rate * 0.5;
        self.frequency = if frequency.is_finite() {
            frequency.clamp(MIN_FREQUENCY, nyquist)
        } else {
            MIN_FREQUENCY
        };
    }

    pub fn amplitude(&self) -> f64 {
        self.amplitude
    }

    /// Clamped to [0, 1].
    pub fn set_amplitude(&mut self, amplitude: f64) {
        self.amplitude = if amplitude.is_finite() {
            amplitude.clamp(0.0, 1.0)
        } else {
            0.0
        };
    }

    /// Reseed the noise source.
    pub fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
        self.rng = StdRng::seed_from_u64(seed);
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Phase increment per sample.
    fn phase_inc(&self) -> f64 {
        self.frequency / self.sample_rate
    }

    /// Next raw waveform sample in [-1, 1], before amplitude.
    pub fn next_sample(&mut self) -> f64 {
        let inc = self.phase_inc();
        let sample = match self.waveform {
            Waveform::Sine => self.sine(),
            Waveform::Sawtooth => self.sawtooth(inc),
            Waveform::Square => self.square(inc),
            Waveform::Triangle => self.triangle(),
            Waveform::Noise => self.rng.random_range(-1.0..=1.0),
        };

        self.phase += inc;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
        }

        sample.clamp(-1.0, 1.0)
    }

    /// Table lookup with linear interpolation.
    fn sine(&self) -> f64 {
        let table = sine_table();
        let pos = self.phase * SINE_TABLE_SIZE as f64;
        let idx = (pos as usize).min(SINE_TABLE_SIZE - 1);
        let frac = pos - idx as f64;
        table[idx] + (table[idx + 1] - table[idx]) * frac
    }

    fn sawtooth(&self, inc: f64) -> f64 {
        let naive = 2.0 * self.phase - 1.0;
        naive - poly_blep(self.phase, inc)
    }

    fn square(&self, inc: f64) -> f64 {
        let mut value = if self.phase < 0.5 { 1.0 } else { -1.0 };
        value += poly_blep(self.phase, inc);
        value -= poly_blep((self.phase + 0.5) % 1.0, inc);
        value
    }

    /// Piecewise linear: -1→+1 over the first half cycle, back down over the second.
    fn triangle(&self) -> f64 {
        if self.phase < 0.5 {
            4.0 * self.phase - 1.0
        } else {
            3.0 - 4.0 * self.phase
        }
    }

    /// Reset phase and the noise sequence.
    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.rng = StdRng::seed_from_u64(self.seed);
    }
}

impl Synthesizer for Oscillator {
    fn generate_samples(&mut self, out: &mut Vec<f32>, num_samples: usize) {
        prepare_stereo(out, num_samples);
        for frame in out.chunks_exact_mut(2) {
            let s = (self.next_sample() * self.amplitude) as f32;
            frame[0] = s;
            frame[1] = s;
        }
    }

    fn set_parameter(&mut self, param: Param, value: f64) {
        match param {
            Param::Frequency => self.set_frequency(value),
            Param::Amplitude => self.set_amplitude(value),
            Param::Waveform => self.set_waveform(Waveform::from_index(value)),
            _ => {}
        }
    }

    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }
}

/// PolyBLEP (Polynomial Band-Limited Step) correction.
///
/// `t` is the phase [0, 1), `dt` is the phase increment per sample.
fn poly_blep(t: f64, dt: f64) -> f64 {
    if t < dt {
        let t = t / dt;
        2.0 * t - t * t - 1.0
    } else if t > 1.0 - dt {
        let t = (t - 1.0) / dt;
        t * t + 2.0 * t + 1.0
    } else {
        0.0
    }
}
