//! Procedural controller: four generators mapped onto audio parameter ranges.

use serde::{Deserialize, Serialize};

use crate::config::{ParamRange, ProceduralConfig};

use super::noise::NoiseGenerator;
use super::{Generator, ParameterGenerator};

/// The parameters a controller produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterSlot {
    Frequency,
    Amplitude,
    Richness,
    Duration,
}

impl ParameterSlot {
    pub const ALL: [ParameterSlot; 4] = [
        ParameterSlot::Frequency,
        ParameterSlot::Amplitude,
        ParameterSlot::Richness,
        ParameterSlot::Duration,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// Outer bounds a range for this slot is clamped to.
    fn limits(self) -> (f64, f64) {
        match self {
            ParameterSlot::Frequency => (1.0, 20_000.0),
            ParameterSlot::Amplitude | ParameterSlot::Richness => (0.0, 1.0),
            ParameterSlot::Duration => (0.01, 30.0),
        }
    }
}

/// One generated parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProceduralParameters {
    /// Hz.
    pub frequency: f64,
    pub amplitude: f64,
    /// Harmonic content [0, 1].
    pub richness: f64,
    /// Seconds.
    pub duration: f64,
}

#[derive(Debug, Clone)]
struct Lane {
    assigned: Option<Generator>,
    fallback: Generator,
    range: ParamRange,
}

impl Lane {
    fn generator(&mut self) -> &mut Generator {
        self.assigned.as_mut().unwrap_or(&mut self.fallback)
    }
}

/// Owns one generator per [`ParameterSlot`] and affine-maps their [0, 1]
/// output into each slot's range. Slots without an assigned generator use a
/// seeded noise generator.
#[derive(Debug, Clone)]
pub struct ProceduralController {
    lanes: [Lane; 4],
    seed: u64,
}

impl Default for ProceduralController {
    fn default() -> Self {
        ProceduralController::new(&ProceduralConfig::default())
    }
}

impl ProceduralController {
    pub fn new(config: &ProceduralConfig) -> Self {
        let config = config.sanitized();
        let ranges = [
            config.frequency_range,
            config.amplitude_range,
            config.richness_range,
            config.duration_range,
        ];
        let lanes = ParameterSlot::ALL.map(|slot| Lane {
            assigned: None,
            fallback: NoiseGenerator::with_seed(slot_seed(config.seed, slot)).into(),
            range: ranges[slot.index()],
        });
        ProceduralController {
            lanes,
            seed: config.seed,
        }
    }

    /// Assign a generator to a slot. Its seed and state are kept as given.
    pub fn set_generator(&mut self, slot: ParameterSlot, generator: impl Into<Generator>) {
        self.lanes[slot.index()].assigned = Some(generator.into());
    }

    /// Return the slot to its default noise generator.
    pub fn clear_generator(&mut self, slot: ParameterSlot) -> Option<Generator> {
        self.lanes[slot.index()].assigned.take()
    }

    pub fn has_generator(&self, slot: ParameterSlot) -> bool {
        self.lanes[slot.index()].assigned.is_some()
    }

    pub fn set_frequency_generator(&mut self, generator: impl Into<Generator>) {
        self.set_generator(ParameterSlot::Frequency, generator);
    }

    pub fn set_amplitude_generator(&mut self, generator: impl Into<Generator>) {
        self.set_generator(ParameterSlot::Amplitude, generator);
    }

    pub fn set_spectral_generator(&mut self, generator: impl Into<Generator>) {
        self.set_generator(ParameterSlot::Richness, generator);
    }

    pub fn set_duration_generator(&mut self, generator: impl Into<Generator>) {
        self.set_generator(ParameterSlot::Duration, generator);
    }

    /// Set a slot's output range. Bounds are ordered and clamped to the
    /// slot's limits; non-finite bounds leave the range unchanged.
    pub fn set_range(&mut self, slot: ParameterSlot, min: f64, max: f64) {
        let (floor, ceil) = slot.limits();
        let lane = &mut self.lanes[slot.index()];
        lane.range = ParamRange::new(min, max).sanitized(floor, ceil, lane.range);
    }

    pub fn range(&self, slot: ParameterSlot) -> ParamRange {
        self.lanes[slot.index()].range
    }

    pub fn set_frequency_range(&mut self, min_hz: f64, max_hz: f64) {
        self.set_range(ParameterSlot::Frequency, min_hz, max_hz);
    }

    pub fn set_amplitude_range(&mut self, min: f64, max: f64) {
        self.set_range(ParameterSlot::Amplitude, min, max);
    }

    pub fn set_richness_range(&mut self, min: f64, max: f64) {
        self.set_range(ParameterSlot::Richness, min, max);
    }

    pub fn set_duration_range(&mut self, min_secs: f64, max_secs: f64) {
        self.set_range(ParameterSlot::Duration, min_secs, max_secs);
    }

    /// Draw one value from every slot.
    pub fn generate_parameters(&mut self) -> ProceduralParameters {
        let mut next = |slot: ParameterSlot| {
            let lane = &mut self.lanes[slot.index()];
            let unit = lane.generator().next_value();
            lane.range.map(unit)
        };
        ProceduralParameters {
            frequency: next(ParameterSlot::Frequency),
            amplitude: next(ParameterSlot::Amplitude),
            richness: next(ParameterSlot::Richness),
            duration: next(ParameterSlot::Duration),
        }
    }

    /// Reseed every slot with `seed + slot index`.
    pub fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
        for (slot, lane) in ParameterSlot::ALL.into_iter().zip(self.lanes.iter_mut()) {
            let s = slot_seed(seed, slot);
            lane.fallback.set_seed(s);
            if let Some(g) = lane.assigned.as_mut() {
                g.set_seed(s);
            }
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn reset(&mut self) {
        for lane in &mut self.lanes {
            lane.fallback.reset();
            if let Some(g) = lane.assigned.as_mut() {
                g.reset();
            }
        }
    }
}

fn slot_seed(seed: u64, slot: ParameterSlot) -> u64 {
    seed.wrapping_add(slot.index() as u64)
}
