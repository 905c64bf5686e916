//! Impact → synthesis parameter mapping.

use crate::config::MapperConfig;
use crate::physics::impact::ImpactEvent;

/// Shortest and longest impact sound the mapper will suggest (s).
const MIN_DURATION: f64 = 0.02;
const MAX_DURATION: f64 = 4.0;

/// Synthesis parameters for one impact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpactVoicing {
    pub frequency: f64,
    pub amplitude: f64,
    pub duration: f64,
}

/// Maps normalized impact data onto pitch, loudness and length.
#[derive(Debug, Clone)]
pub struct AudioPhysicsMapper {
    min_frequency: f64,
    max_frequency: f64,
    base_duration: f64,
    absorption: f64,
    amplitude_scale: f64,
}

impl Default for AudioPhysicsMapper {
    fn default() -> Self {
        AudioPhysicsMapper::new(&MapperConfig::default())
    }
}

impl AudioPhysicsMapper {
    pub fn new(config: &MapperConfig) -> Self {
        let config = config.sanitized();
        AudioPhysicsMapper {
            min_frequency: config.min_frequency,
            max_frequency: config.max_frequency,
            base_duration: config.base_duration,
            absorption: config.absorption,
            amplitude_scale: config.amplitude_scale,
        }
    }

    /// `min + (max − min) · hardness · √force`, clamped to the range.
    ///
    /// The square root compresses force so heavy hits do not dominate pitch.
    pub fn generate_impact_frequency(&self, hardness: f64, force: f64) -> f64 {
        let hardness = unit(hardness);
        let force = unit(force);
        let f = self.min_frequency + (self.max_frequency - self.min_frequency) * hardness * force.sqrt();
        f.clamp(self.min_frequency, self.max_frequency)
    }

    /// Amplitude proportional to force.
    pub fn generate_amplitude(&self, force: f64) -> f64 {
        (unit(force) * self.amplitude_scale).clamp(0.0, 1.0)
    }

    /// `base · (1 − absorption) · (0.25 + 0.75·force)`, clamped to [20 ms, 4 s].
    pub fn generate_duration(&self, force: f64) -> f64 {
        let d = self.base_duration * (1.0 - self.absorption) * (0.25 + 0.75 * unit(force));
        d.clamp(MIN_DURATION, MAX_DURATION)
    }

    /// Full voicing for an impact event.
    pub fn map_impact_to_audio(&self, event: &ImpactEvent) -> ImpactVoicing {
        ImpactVoicing {
            frequency: self.generate_impact_frequency(event.hardness, event.force),
            amplitude: self.generate_amplitude(event.force),
            duration: self.generate_duration(event.force),
        }
    }

    /// Ordered and clamped to [1, 20 000] Hz.
    pub fn set_frequency_range(&mut self, min_hz: f64, max_hz: f64) {
        let config = MapperConfig {
            min_frequency: min_hz,
            max_frequency: max_hz,
            ..MapperConfig::default()
        }
        .sanitized();
        self.min_frequency = config.min_frequency;
        self.max_frequency = config.max_frequency;
    }

    pub fn frequency_range(&self) -> (f64, f64) {
        (self.min_frequency, self.max_frequency)
    }

    pub fn set_absorption(&mut self, absorption: f64) {
        self.absorption = unit(absorption);
    }

    pub fn absorption(&self) -> f64 {
        self.absorption
    }
}

fn unit(v: f64) -> f64 {
    if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 }
}
