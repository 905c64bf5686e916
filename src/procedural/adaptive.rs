//! Adaptive procedural system: output metrics steer the controller's ranges.

use std::collections::VecDeque;

use tracing::debug;

use crate::config::{ParamRange, ProceduralConfig};

use super::controller::{ParameterSlot, ProceduralController, ProceduralParameters};

/// Metric frames averaged for each adaptation step.
const HISTORY_LEN: usize = 16;
/// RMS level the amplitude bias steers towards.
const TARGET_ENERGY: f64 = 0.25;
/// Brightness the frequency and richness biases steer towards.
const TARGET_BRIGHTNESS: f64 = 0.5;
/// Bias change per update at full adaptation rate and unit error.
const STEP: f64 = 0.1;
/// Largest bias, as a fraction of the configured range width.
const MAX_BIAS: f64 = 0.5;

/// Summary statistics of a rendered buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AudioMetrics {
    /// RMS level [0, 1].
    pub energy: f64,
    /// Zero-crossing estimate of the dominant frequency (Hz).
    pub centroid: f64,
    /// High-frequency share of the signal [0, 1].
    pub brightness: f64,
}

impl AudioMetrics {
    /// Measure an interleaved stereo buffer. Only the left channel is used
    /// for the crossing and brightness estimates.
    pub fn from_buffer(buffer: &[f32], sample_rate: f64) -> Self {
        if buffer.is_empty() {
            return AudioMetrics::default();
        }
        let energy = (buffer.iter().map(|&s| (s as f64) * (s as f64)).sum::<f64>() / buffer.len() as f64).sqrt();

        let left: Vec<f64> = buffer.iter().step_by(2).map(|&s| s as f64).collect();
        let mut crossings = 0usize;
        let mut power = 0.0;
        let mut diff_power = 0.0;
        for pair in left.windows(2) {
            if (pair[0] < 0.0) != (pair[1] < 0.0) {
                crossings += 1;
            }
            let d = pair[1] - pair[0];
            diff_power += d * d;
            power += pair[1] * pair[1];
        }

        let centroid = crossings as f64 * sample_rate / (2.0 * left.len() as f64);
        let brightness = if power > 0.0 {
            ((diff_power / power).sqrt() * 0.5).clamp(0.0, 1.0)
        } else {
            0.0
        };
        AudioMetrics {
            energy: energy.clamp(0.0, 1.0),
            centroid,
            brightness,
        }
    }

    fn sanitized(self) -> Self {
        let unit = |v: f64| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
        AudioMetrics {
            energy: unit(self.energy),
            centroid: if self.centroid.is_finite() { self.centroid.max(0.0) } else { 0.0 },
            brightness: unit(self.brightness),
        }
    }
}

/// A [`ProceduralController`] whose ranges drift with the audio it produces.
///
/// Bright output pulls frequency and richness down; quiet output pushes
/// amplitude up. Each bias is bounded to half the configured range width and
/// only narrows the range from one side, so generated values never leave
/// the configured ranges.
#[derive(Debug, Clone)]
pub struct AdaptiveProceduralSystem {
    controller: ProceduralController,
    base: ProceduralConfig,
    adaptation_rate: f64,
    history: VecDeque<AudioMetrics>,
    previous: Option<AudioMetrics>,
    frequency_bias: f64,
    amplitude_bias: f64,
    richness_bias: f64,
}

impl Default for AdaptiveProceduralSystem {
    fn default() -> Self {
        AdaptiveProceduralSystem::new(&ProceduralConfig::default())
    }
}

impl AdaptiveProceduralSystem {
    pub fn new(config: &ProceduralConfig) -> Self {
        let base = config.sanitized();
        AdaptiveProceduralSystem {
            controller: ProceduralController::new(&base),
            adaptation_rate: base.adaptation_rate,
            base,
            history: VecDeque::with_capacity(HISTORY_LEN),
            previous: None,
            frequency_bias: 0.0,
            amplitude_bias: 0.0,
            richness_bias: 0.0,
        }
    }

    pub fn set_adaptation_rate(&mut self, rate: f64) {
        if rate.is_finite() {
            self.adaptation_rate = rate.clamp(0.0, 1.0);
        }
    }

    pub fn adaptation_rate(&self) -> f64 {
        self.adaptation_rate
    }

    pub fn controller(&self) -> &ProceduralController {
        &self.controller
    }

    /// Generators may be swapped freely; ranges are rewritten on every update.
    pub fn controller_mut(&mut self) -> &mut ProceduralController {
        &mut self.controller
    }

    /// Most recent metrics passed to [`update`](Self::update).
    pub fn previous_metrics(&self) -> Option<AudioMetrics> {
        self.previous
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Current (frequency, amplitude, richness) biases in [-0.5, 0.5].
    pub fn biases(&self) -> (f64, f64, f64) {
        (self.frequency_bias, self.amplitude_bias, self.richness_bias)
    }

    /// Fold `metrics` into the biases, then draw one parameter set.
    pub fn update(&mut self, metrics: &AudioMetrics) -> ProceduralParameters {
        let metrics = metrics.sanitized();
        if self.history.len() == HISTORY_LEN {
            self.history.pop_front();
        }
        self.history.push_back(metrics);
        self.previous = Some(metrics);

        let average = self.average();
        let rate = self.adaptation_rate;
        let brightness_error = average.brightness - TARGET_BRIGHTNESS;
        let energy_error = TARGET_ENERGY - average.energy;

        self.frequency_bias = bounded("frequency", self.frequency_bias, -rate * STEP * brightness_error);
        self.richness_bias = bounded("richness", self.richness_bias, -rate * STEP * brightness_error);
        self.amplitude_bias = bounded("amplitude", self.amplitude_bias, rate * STEP * energy_error);

        self.apply_biases();
        self.controller.generate_parameters()
    }

    fn average(&self) -> AudioMetrics {
        let n = self.history.len().max(1) as f64;
        let sum = self.history.iter().fold(AudioMetrics::default(), |acc, m| AudioMetrics {
            energy: acc.energy + m.energy,
            centroid: acc.centroid + m.centroid,
            brightness: acc.brightness + m.brightness,
        });
        AudioMetrics {
            energy: sum.energy / n,
            centroid: sum.centroid / n,
            brightness: sum.brightness / n,
        }
    }

    fn apply_biases(&mut self) {
        let pairs = [
            (ParameterSlot::Frequency, self.base.frequency_range, self.frequency_bias),
            (ParameterSlot::Amplitude, self.base.amplitude_range, self.amplitude_bias),
            (ParameterSlot::Richness, self.base.richness_range, self.richness_bias),
        ];
        for (slot, base, bias) in pairs {
            let r = narrowed(base, bias);
            self.controller.set_range(slot, r.min, r.max);
        }
    }

    /// Clear history and biases, restore the configured ranges, and reset
    /// the controller's generators.
    pub fn reset(&mut self) {
        self.history.clear();
        self.previous = None;
        self.frequency_bias = 0.0;
        self.amplitude_bias = 0.0;
        self.richness_bias = 0.0;
        self.apply_biases();
        self.controller.reset();
    }
}

fn bounded(name: &str, bias: f64, delta: f64) -> f64 {
    let next = (bias + delta).clamp(-MAX_BIAS, MAX_BIAS);
    if next.abs() == MAX_BIAS && bias.abs() < MAX_BIAS {
        debug!(target: "procedural", "{name} bias reached its limit ({next:+.2})");
    }
    next
}

/// Positive bias raises the floor, negative lowers the ceiling.
fn narrowed(base: ParamRange, bias: f64) -> ParamRange {
    let width = base.width();
    ParamRange::new(base.min + bias.max(0.0) * width, base.max + bias.min(0.0) * width)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, amp: f32, frames: usize, sr: f64) -> Vec<f32> {
        (0..frames)
            .flat_map(|i| {
                let s = amp * (std::f64::consts::TAU * freq * (i as f64 + 0.25) / sr).sin() as f32;
                [s, s]
            })
            .collect()
    }

    #[test]
    fn silence_measures_zero() {
        let m = AudioMetrics::from_buffer(&[0.0; 512], 48_000.0);
        assert_eq!(m, AudioMetrics::default());
        assert_eq!(AudioMetrics::from_buffer(&[], 48_000.0), AudioMetrics::default());
    }

    #[test]
    fn sine_metrics() {
        let buf = sine(1000.0, 0.5, 4800, 48_000.0);
        let m = AudioMetrics::from_buffer(&buf, 48_000.0);
        assert!((m.energy - 0.5 / 2f64.sqrt()).abs() < 0.01, "rms {}", m.energy);
        assert!((m.centroid - 1000.0).abs() < 50.0, "centroid {}", m.centroid);
        assert!(m.brightness < 0.1);
    }

    #[test]
    fn alternating_signal_is_bright() {
        let buf: Vec<f32> = (0..1024).flat_map(|i| if i % 2 == 0 { [0.5, 0.5] } else { [-0.5, -0.5] }).collect();
        let m = AudioMetrics::from_buffer(&buf, 48_000.0);
        assert!(m.brightness > 0.99);
    }

    #[test]
    fn rate_comes_from_config() {
        let config = ProceduralConfig {
            adaptation_rate: 0.35,
            ..ProceduralConfig::default()
        };
        let sys = AdaptiveProceduralSystem::new(&config);
        assert_eq!(sys.adaptation_rate(), 0.35);
        assert_eq!(AdaptiveProceduralSystem::default().adaptation_rate(), 0.1);
    }

    #[test]
    fn drift_is_bounded() {
        let config = ProceduralConfig::default();
        let mut sys = AdaptiveProceduralSystem::new(&config);
        sys.set_adaptation_rate(1.0);
        let loud_bright = AudioMetrics {
            energy: 1.0,
            centroid: 20_000.0,
            brightness: 1.0,
        };
        for _ in 0..10_000 {
            let p = sys.update(&loud_bright);
            assert!(config.frequency_range.contains(p.frequency));
            assert!(config.amplitude_range.contains(p.amplitude));
            assert!(config.richness_range.contains(p.richness));
        }
        let (f, a, r) = sys.biases();
        assert_eq!(f, -MAX_BIAS);
        assert_eq!(r, -MAX_BIAS);
        assert_eq!(a, -MAX_BIAS);
        let freq = sys.controller().range(ParameterSlot::Frequency);
        assert!(freq.max < config.frequency_range.max);
        assert_eq!(freq.min, config.frequency_range.min);
    }

    #[test]
    fn zero_rate_leaves_ranges_alone() {
        let mut sys = AdaptiveProceduralSystem::default();
        sys.set_adaptation_rate(0.0);
        let m = AudioMetrics {
            energy: 0.0,
            centroid: 0.0,
            brightness: 0.0,
        };
        for _ in 0..100 {
            sys.update(&m);
        }
        assert_eq!(sys.biases(), (0.0, 0.0, 0.0));
        assert_eq!(
            sys.controller().range(ParameterSlot::Frequency),
            ProceduralConfig::default().frequency_range
        );
    }

    #[test]
    fn dull_quiet_audio_raises_floors() {
        let mut sys = AdaptiveProceduralSystem::default();
        sys.set_adaptation_rate(0.5);
        let m = AudioMetrics {
            energy: 0.0,
            centroid: 100.0,
            brightness: 0.0,
        };
        for _ in 0..20 {
            sys.update(&m);
        }
        let (f, a, _) = sys.biases();
        assert!(f > 0.0 && a > 0.0);
        assert_eq!(sys.history_len(), HISTORY_LEN);

        sys.reset();
        assert_eq!(sys.biases(), (0.0, 0.0, 0.0));
        assert_eq!(sys.history_len(), 0);
    }
}
