//! Sustained resonator: a two-pole feedback oscillator excited by impacts.

use std::f64::consts::PI;

use crate::config::ResonanceConfig;
use crate::dsp::source::{Param, Synthesizer, prepare_stereo};

/// Additional decay rate (1/s) at full damping.
const DAMPING_RATE: f64 = 20.0;
/// Peak amplitude the resonator is allowed to ring at.
const MAX_AMPLITUDE: f64 = 1.0;
/// Below this energy the resonator is considered silent.
const SILENCE: f64 = 1e-10;

/// A narrow-band resonator.
///
/// `y[n] = 2r·cos(ω)·y[n−1] − r²·y[n−2] + x[n]`, with the pole radius
/// `r = exp(−(π·f/Q + damping·20) / sr)`. Higher Q rings longer, higher damping
/// dies faster. Energy decays by `r²` per sample.
#[derive(Debug, Clone)]
pub struct ResonanceSynthesizer {
    sample_rate: f64,
    frequency: f64,
    quality: f64,
    damping: f64,
    accumulated_energy: f64,
    // Recursion coefficients
    omega: f64,
    radius: f64,
    a1: f64,
    a2: f64,
    // Filter state
    y1: f64,
    y2: f64,
    pending_input: f64,
}

impl ResonanceSynthesizer {
    pub fn new(sample_rate: f64) -> Self {
        ResonanceSynthesizer::with_config(sample_rate, &ResonanceConfig::default())
    }

    pub fn with_config(sample_rate: f64, config: &ResonanceConfig) -> Self {
        let mut s = ResonanceSynthesizer {
            sample_rate: sample_rate.max(1.0),
            frequency: 0.0,
            quality: 0.0,
            damping: 0.0,
            accumulated_energy: 0.0,
            omega: 0.0,
            radius: 0.0,
            a1: 0.0,
            a2: 0.0,
            y1: 0.0,
            y2: 0.0,
            pending_input: 0.0,
        };
        s.set_resonance(config.frequency, config.quality, config.damping);
        s
    }

    /// Frequency (Hz), Q, and damping [0, 1]; each clamped to its valid range.
    pub fn set_resonance(&mut self, frequency: f64, quality: f64, damping: f64) {
        let c = ResonanceConfig {
            frequency,
            quality,
            damping,
        }
        .sanitized();
        self.frequency = c.frequency.min(self.sample_rate * 0.45);
        self.quality = c.quality;
        self.damping = c.damping;
        self.update_coefficients();
    }

    fn update_coefficients(&mut self) {
        self.omega = 2.0 * PI * self.frequency / self.sample_rate;
        let decay_rate = PI * self.frequency / self.quality + self.damping * DAMPING_RATE;
        self.radius = (-decay_rate / self.sample_rate).exp();
        self.a1 = 2.0 * self.radius * self.omega.cos();
        self.a2 = self.radius * self.radius;
    }

    /// Add energy [0, 1] to the resonator. The kick is applied on the next sample.
    pub fn excite_resonance(&mut self, energy: f64) {
        if !energy.is_finite() || energy <= 0.0 {
            return;
        }
        let energy = energy.min(1.0);
        self.pending_input += energy.sqrt() * self.omega.sin();
        self.accumulated_energy += energy;
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn quality(&self) -> f64 {
        self.quality
    }

    pub fn damping(&self) -> f64 {
        self.damping
    }

    /// Per-sample pole radius (amplitude decay factor).
    pub fn decay_factor(&self) -> f64 {
        self.radius
    }

    pub fn energy(&self) -> f64 {
        self.accumulated_energy
    }

    pub fn is_ringing(&self) -> bool {
        self.accumulated_energy > SILENCE || self.pending_input != 0.0
    }

    /// Silence the resonator immediately.
    pub fn reset(&mut self) {
        self.y1 = 0.0;
        self.y2 = 0.0;
        self.pending_input = 0.0;
        self.accumulated_energy = 0.0;
    }

    fn next_sample(&mut self) -> f64 {
        let input = std::mem::take(&mut self.pending_input);
        let y = self.a1 * self.y1 - self.a2 * self.y2 + input;
        self.y2 = self.y1;
        self.y1 = y;
        self.accumulated_energy *= self.a2;

        if input != 0.0 {
            self.limit_amplitude();
        }
        if self.accumulated_energy <= SILENCE {
            self.reset();
        }
        y.clamp(-MAX_AMPLITUDE, MAX_AMPLITUDE)
    }

    /// Rescale the state if the ringing amplitude exceeds the ceiling.
    fn limit_amplitude(&mut self) {
        let sin_w = self.omega.sin();
        if sin_w.abs() < 1e-9 {
            return;
        }
        let q = self.y1 * self.y1 + self.y2 * self.y2 - 2.0 * self.omega.cos() * self.y1 * self.y2;
        let amplitude = q.max(0.0).sqrt() / sin_w.abs();
        if amplitude > MAX_AMPLITUDE {
            let scale = MAX_AMPLITUDE / amplitude;
            self.y1 *= scale;
            self.y2 *= scale;
            self.accumulated_energy = MAX_AMPLITUDE * MAX_AMPLITUDE;
        } else {
            self.accumulated_energy = amplitude * amplitude;
        }
    }
}

impl Synthesizer for ResonanceSynthesizer {
    fn generate_samples(&mut self, out: &mut Vec<f32>, num_samples: usize) {
        prepare_stereo(out, num_samples);
        if !self.is_ringing() {
            return;
        }
        for frame in out.chunks_exact_mut(2) {
            let s = self.next_sample() as f32;
            frame[0] = s;
            frame[1] = s;
        }
    }

    fn set_parameter(&mut self, param: Param, value: f64) {
        match param {
            Param::Frequency => self.set_resonance(value, self.quality, self.damping),
            Param::Quality => self.set_resonance(self.frequency, value, self.damping),
            Param::Damping => self.set_resonance(self.frequency, self.quality, value),
            _ => {}
        }
    }

    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }
}
