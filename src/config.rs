//! Sandbox configuration.
//!
//! One [`SandboxConfig`] is built at setup and threaded through every
//! constructor. All sections deserialize from camelCase JSON with every field
//! optional; [`SandboxConfig::sanitized`] clamps out-of-range values to their
//! documented floors and ceilings instead of rejecting them.

use serde::{Deserialize, Serialize};

use crate::error::SandboxError;
use crate::physics::object::PhysicsObject;
use crate::physics::vector::Vector3;

pub const DEFAULT_SAMPLE_RATE: f64 = 48_000.0;
pub const DEFAULT_BUFFER_FRAMES: usize = 2048;

/// A closed `[min, max]` output range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamRange {
    pub min: f64,
    pub max: f64,
}

impl ParamRange {
    pub const fn new(min: f64, max: f64) -> Self {
        ParamRange { min, max }
    }

    /// Affine map of a unit value into the range. Input is clamped to [0, 1].
    pub fn map(&self, unit: f64) -> f64 {
        let t = if unit.is_finite() { unit.clamp(0.0, 1.0) } else { 0.0 };
        let v = self.min + (self.max - self.min) * t;
        if self.min <= self.max { v.clamp(self.min, self.max) } else { v }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    /// Ordered, finite, and inside `[floor, ceil]`. Falls back to `fallback` when unusable.
    pub fn sanitized(&self, floor: f64, ceil: f64, fallback: ParamRange) -> ParamRange {
        if !(self.min.is_finite() && self.max.is_finite()) {
            return fallback;
        }
        let (lo, hi) = if self.min <= self.max {
            (self.min, self.max)
        } else {
            (self.max, self.min)
        };
        ParamRange::new(lo.clamp(floor, ceil), hi.clamp(floor, ceil))
    }
}

/// World constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PhysicsConfig {
    pub gravity: Vector3,
    /// Height of the ground plane (m).
    pub ground_height: f64,
    /// Bounce coefficient against the ground [0, 1].
    pub ground_restitution: f64,
    /// Bounce coefficient between spheres [0, 1]; 1.0 is perfectly elastic.
    pub collision_restitution: f64,
    /// Rebound speeds below this settle on the ground (m/s).
    pub rest_speed: f64,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        PhysicsConfig {
            gravity: Vector3::new(0.0, -9.81, 0.0),
            ground_height: 0.0,
            ground_restitution: 0.5,
            collision_restitution: 1.0,
            rest_speed: 0.05,
        }
    }
}

impl PhysicsConfig {
    pub fn sanitized(&self) -> Self {
        let d = PhysicsConfig::default();
        PhysicsConfig {
            gravity: if self.gravity.is_finite() { self.gravity } else { d.gravity },
            ground_height: finite_or(self.ground_height, d.ground_height),
            ground_restitution: unit_or(self.ground_restitution, d.ground_restitution),
            collision_restitution: unit_or(self.collision_restitution, d.collision_restitution),
            rest_speed: finite_or(self.rest_speed, d.rest_speed).max(0.0),
        }
    }
}

/// Impact → synthesis parameter mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MapperConfig {
    /// Lowest impact pitch (Hz).
    pub min_frequency: f64,
    /// Highest impact pitch (Hz).
    pub max_frequency: f64,
    /// Duration of a full-force impact on a non-absorbing surface (s).
    pub base_duration: f64,
    /// Material absorption [0, 1]; shortens every impact sound.
    pub absorption: f64,
    /// Force → amplitude gain.
    pub amplitude_scale: f64,
}

impl Default for MapperConfig {
    fn default() -> Self {
        MapperConfig {
            min_frequency: 80.0,
            max_frequency: 2000.0,
            base_duration: 0.5,
            absorption: 0.2,
            amplitude_scale: 1.0,
        }
    }
}

impl MapperConfig {
    pub fn sanitized(&self) -> Self {
        let d = MapperConfig::default();
        let range = ParamRange::new(self.min_frequency, self.max_frequency).sanitized(
            1.0,
            20_000.0,
            ParamRange::new(d.min_frequency, d.max_frequency),
        );
        MapperConfig {
            min_frequency: range.min,
            max_frequency: range.max,
            base_duration: finite_or(self.base_duration, d.base_duration).clamp(0.01, 10.0),
            absorption: unit_or(self.absorption, d.absorption),
            amplitude_scale: finite_or(self.amplitude_scale, d.amplitude_scale).clamp(0.0, 4.0),
        }
    }
}

/// What the impact queue does when it is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OverflowPolicy {
    /// Reject the incoming event.
    DropNewest,
    /// Evict the oldest queued event to make room.
    #[default]
    DropOldest,
}

/// Impact detection, queueing and voicing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImpactConfig {
    pub queue_capacity: usize,
    pub overflow_policy: OverflowPolicy,
    /// Simultaneous impact voices.
    pub voices: usize,
    /// Contacts closing slower than this are ignored (m/s).
    pub min_impact_speed: f64,
    /// Impulse (N·s) that maps to a normalized force of 1.0.
    pub impulse_reference: f64,
    /// Pitch multiplier per second of an impact sound (0, 1).
    pub frequency_decay: f64,
    /// Pitch never falls below this (Hz).
    pub frequency_floor: f64,
    /// Energy fed to the resonance synthesizer per unit of impact force.
    pub resonance_gain: f64,
}

impl Default for ImpactConfig {
    fn default() -> Self {
        ImpactConfig {
            queue_capacity: 256,
            overflow_policy: OverflowPolicy::DropOldest,
            voices: 8,
            min_impact_speed: 0.1,
            impulse_reference: 40.0,
            frequency_decay: 0.35,
            frequency_floor: 30.0,
            resonance_gain: 0.5,
        }
    }
}

impl ImpactConfig {
    pub fn sanitized(&self) -> Self {
        let d = ImpactConfig::default();
        ImpactConfig {
            queue_capacity: self.queue_capacity.clamp(1, 65_536),
            overflow_policy: self.overflow_policy,
            voices: self.voices.clamp(1, 64),
            min_impact_speed: finite_or(self.min_impact_speed, d.min_impact_speed).max(0.0),
            impulse_reference: finite_or(self.impulse_reference, d.impulse_reference).max(1e-3),
            frequency_decay: finite_or(self.frequency_decay, d.frequency_decay).clamp(1e-3, 1.0),
            frequency_floor: finite_or(self.frequency_floor, d.frequency_floor).clamp(1.0, 20_000.0),
            resonance_gain: finite_or(self.resonance_gain, d.resonance_gain).clamp(0.0, 1.0),
        }
    }
}

/// Sustained resonator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResonanceConfig {
    /// Resonant frequency (Hz).
    pub frequency: f64,
    /// Quality factor; higher rings longer.
    pub quality: f64,
    /// Extra energy loss [0, 1].
    pub damping: f64,
}

impl Default for ResonanceConfig {
    fn default() -> Self {
        ResonanceConfig {
            frequency: 220.0,
            quality: 8.0,
            damping: 0.1,
        }
    }
}

impl ResonanceConfig {
    pub fn sanitized(&self) -> Self {
        let d = ResonanceConfig::default();
        ResonanceConfig {
            frequency: finite_or(self.frequency, d.frequency).clamp(1.0, 20_000.0),
            quality: finite_or(self.quality, d.quality).clamp(0.5, 1000.0),
            damping: unit_or(self.damping, d.damping),
        }
    }
}

/// Output ranges for the procedural controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProceduralConfig {
    pub frequency_range: ParamRange,
    pub amplitude_range: ParamRange,
    pub richness_range: ParamRange,
    pub duration_range: ParamRange,
    pub seed: u64,
    /// Gain applied to the procedural voice before mixing.
    pub gain: f64,
    /// How strongly measured output steers the ranges [0, 1]; 0 disables feedback.
    pub adaptation_rate: f64,
}

impl Default for ProceduralConfig {
    fn default() -> Self {
        ProceduralConfig {
            frequency_range: ParamRange::new(100.0, 2000.0),
            amplitude_range: ParamRange::new(0.1, 0.8),
            richness_range: ParamRange::new(0.0, 1.0),
            duration_range: ParamRange::new(0.1, 1.0),
            seed: 12345,
            gain: 0.3,
            adaptation_rate: 0.1,
        }
    }
}

impl ProceduralConfig {
    pub fn sanitized(&self) -> Self {
        let d = ProceduralConfig::default();
        ProceduralConfig {
            frequency_range: self.frequency_range.sanitized(1.0, 20_000.0, d.frequency_range),
            amplitude_range: self.amplitude_range.sanitized(0.0, 1.0, d.amplitude_range),
            richness_range: self.richness_range.sanitized(0.0, 1.0, d.richness_range),
            duration_range: self.duration_range.sanitized(0.01, 30.0, d.duration_range),
            seed: self.seed,
            gain: unit_or(self.gain, d.gain),
            adaptation_rate: unit_or(self.adaptation_rate, d.adaptation_rate),
        }
    }
}

/// Subsystem switches. A disabled subsystem renders silence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FeatureFlags {
    pub physics_audio: bool,
    pub procedural_audio: bool,
    pub resonance: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        FeatureFlags {
            physics_audio: true,
            procedural_audio: true,
            resonance: true,
        }
    }
}

/// A sphere placed in the world at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SphereSpec {
    pub position: Vector3,
    pub velocity: Vector3,
    pub radius: f64,
    pub mass: f64,
    pub damping: f64,
    pub hardness: f64,
}

impl Default for SphereSpec {
    fn default() -> Self {
        SphereSpec {
            position: Vector3::new(0.0, 5.0, 0.0),
            velocity: Vector3::ZERO,
            radius: 0.5,
            mass: 2.0,
            damping: 0.01,
            hardness: 0.5,
        }
    }
}

impl SphereSpec {
    /// Build the physics object. Mass, radius, damping and hardness are clamped
    /// by the object itself; non-finite kinematics are rejected.
    pub fn build(&self, index: usize) -> Result<PhysicsObject, SandboxError> {
        if !self.position.is_finite() {
            return Err(SandboxError::InvalidScene {
                index,
                reason: "position is not finite".to_string(),
            });
        }
        if !self.velocity.is_finite() {
            return Err(SandboxError::InvalidScene {
                index,
                reason: "velocity is not finite".to_string(),
            });
        }
        Ok(PhysicsObject::sphere(self.radius, self.mass)
            .with_position(self.position)
            .with_velocity(self.velocity)
            .with_damping(self.damping)
            .with_hardness(self.hardness))
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SandboxConfig {
    pub sample_rate: f64,
    /// Frames per update; the output holds twice as many interleaved samples.
    pub buffer_frames: usize,
    pub master_volume: f64,
    /// Multiplier on every `dt` handed to the engine (floor 0.1).
    pub simulation_speed: f64,
    /// Weight of the physics stream in the final mix.
    pub physics_mix: f64,
    /// Weight of the procedural stream in the final mix.
    pub procedural_mix: f64,
    /// Gain applied to the summed mix before soft clipping.
    pub output_gain: f64,
    pub features: FeatureFlags,
    pub physics: PhysicsConfig,
    pub mapper: MapperConfig,
    pub impacts: ImpactConfig,
    pub resonance: ResonanceConfig,
    pub procedural: ProceduralConfig,
    pub scene: Vec<SphereSpec>,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        SandboxConfig {
            sample_rate: DEFAULT_SAMPLE_RATE,
            buffer_frames: DEFAULT_BUFFER_FRAMES,
            master_volume: 1.0,
            simulation_speed: 1.0,
            physics_mix: 0.6,
            procedural_mix: 0.4,
            output_gain: 0.9,
            features: FeatureFlags::default(),
            physics: PhysicsConfig::default(),
            mapper: MapperConfig::default(),
            impacts: ImpactConfig::default(),
            resonance: ResonanceConfig::default(),
            procedural: ProceduralConfig::default(),
            scene: Vec::new(),
        }
    }
}

impl SandboxConfig {
    /// Parse from JSON and clamp every field into range.
    pub fn from_json(json: &str) -> Result<Self, SandboxError> {
        let config: SandboxConfig = serde_json::from_str(json)?;
        Ok(config.sanitized())
    }

    pub fn to_json(&self) -> Result<String, SandboxError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn sanitized(&self) -> Self {
        let d = SandboxConfig::default();
        SandboxConfig {
            sample_rate: finite_or(self.sample_rate, d.sample_rate).clamp(1000.0, 384_000.0),
            buffer_frames: self.buffer_frames.clamp(1, 1 << 16),
            master_volume: unit_or(self.master_volume, d.master_volume),
            simulation_speed: finite_or(self.simulation_speed, d.simulation_speed).max(0.1),
            physics_mix: finite_or(self.physics_mix, d.physics_mix).clamp(0.0, 1.0),
            procedural_mix: finite_or(self.procedural_mix, d.procedural_mix).clamp(0.0, 1.0),
            output_gain: finite_or(self.output_gain, d.output_gain).clamp(0.0, 2.0),
            features: self.features,
            physics: self.physics.sanitized(),
            mapper: self.mapper.sanitized(),
            impacts: self.impacts.sanitized(),
            resonance: self.resonance.sanitized(),
            procedural: self.procedural.sanitized(),
            scene: self.scene.clone(),
        }
    }
}

fn finite_or(v: f64, fallback: f64) -> f64 {
    if v.is_finite() { v } else { fallback }
}

fn unit_or(v: f64, fallback: f64) -> f64 {
    finite_or(v, fallback).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = SandboxConfig::default();
        assert_eq!(c.sample_rate, 48_000.0);
        assert_eq!(c.buffer_frames, 2048);
        assert_eq!(c.physics.gravity, Vector3::new(0.0, -9.81, 0.0));
        assert_eq!(c.procedural.frequency_range, ParamRange::new(100.0, 2000.0));
        assert_eq!(c.impacts.overflow_policy, OverflowPolicy::DropOldest);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let c = SandboxConfig::from_json(
            r#"{ "masterVolume": 0.5, "impacts": { "overflowPolicy": "dropNewest" } }"#,
        )
        .expect("valid json");
        assert_eq!(c.master_volume, 0.5);
        assert_eq!(c.impacts.overflow_policy, OverflowPolicy::DropNewest);
        assert_eq!(c.impacts.queue_capacity, 256);
        assert_eq!(c.sample_rate, 48_000.0);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let c = SandboxConfig::from_json(
            r#"{
                "masterVolume": 7.0,
                "simulationSpeed": 0.0,
                "physics": { "groundRestitution": -2.0 },
                "procedural": { "frequencyRange": { "min": 3000.0, "max": 50.0 } }
            }"#,
        )
        .expect("valid json");
        assert_eq!(c.master_volume, 1.0);
        assert_eq!(c.simulation_speed, 0.1);
        assert_eq!(c.physics.ground_restitution, 0.0);
        assert_eq!(c.procedural.frequency_range, ParamRange::new(50.0, 3000.0));
    }

    #[test]
    fn malformed_json_is_an_error() {
        let err = SandboxConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, SandboxError::Json(_)));
    }

    #[test]
    fn json_roundtrip_preserves_scene() {
        let mut c = SandboxConfig::default();
        c.scene.push(SphereSpec::default());
        let json = c.to_json().unwrap();
        let back = SandboxConfig::from_json(&json).unwrap();
        assert_eq!(back.scene, c.scene);
    }

    #[test]
    fn range_map_clamps_input() {
        let r = ParamRange::new(100.0, 200.0);
        assert_eq!(r.map(0.0), 100.0);
        assert_eq!(r.map(1.0), 200.0);
        assert_eq!(r.map(2.0), 200.0);
        assert_eq!(r.map(f64::NAN), 100.0);
    }

    #[test]
    fn scene_rejects_non_finite_position() {
        let spec = SphereSpec {
            position: Vector3::new(f64::NAN, 0.0, 0.0),
            ..SphereSpec::default()
        };
        assert!(spec.build(3).is_err());
        assert!(SphereSpec::default().build(0).is_ok());
    }
}
