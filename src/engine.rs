//! Sandbox engine: one tick of physics, impact audio and procedural audio.
//!
//! Per [`SandboxEngine::update`]: the world is stepped, the integration layer
//! turns the contacts of that step into impact sound, the procedural voice
//! renders its stream, and both streams are weighted, summed and soft-clipped
//! into the output buffer. A disabled stream contributes silence; the output
//! always holds `frames * 2` interleaved values in [-1, 1].

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{FeatureFlags, SandboxConfig};
use crate::dsp::envelope::{Envelope, EnvelopeParams};
use crate::dsp::mixer::soft_clip;
use crate::dsp::oscillator::{Oscillator, Waveform};
use crate::dsp::source::prepare_stereo;
use crate::error::SandboxError;
use crate::integration::sandbox::AudioPhysicsSandbox;
use crate::physics::object::PhysicsObject;
use crate::physics::world::{ObjectHandle, PhysicsWorld};
use crate::procedural::adaptive::{AdaptiveProceduralSystem, AudioMetrics};
use crate::procedural::controller::ProceduralParameters;

/// Longest physics sub-step (s). Larger ticks are split evenly.
const MAX_PHYSICS_STEP: f64 = 1.0 / 240.0;

/// Snapshot of engine state for hosts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStats {
    pub active_objects: usize,
    pub monitored_objects: usize,
    pub queued_impacts: usize,
    pub dropped_impacts: u64,
    pub active_voices: usize,
    /// RMS of the last output buffer.
    pub average_audio_level: f64,
    /// Wall-clock time of the last update (ms). Zero on wasm.
    pub last_frame_time_ms: f64,
    /// Simulated seconds since construction.
    pub elapsed: f64,
}

/// The procedural stream: one oscillator under one envelope.
///
/// A new parameter set is drawn only when the current note's duration has
/// elapsed. The gate closes after 70% of the note; the release fills the rest.
#[derive(Debug, Clone)]
struct ProceduralVoice {
    sample_rate: f64,
    oscillator: Oscillator,
    envelope: Envelope,
    note_length: f64,
    note_time: f64,
    gate_open: bool,
    current: Option<ProceduralParameters>,
}

impl ProceduralVoice {
    fn new(sample_rate: f64, seed: u64) -> Self {
        let mut oscillator = Oscillator::new(Waveform::Sine, sample_rate);
        oscillator.set_seed(seed);
        ProceduralVoice {
            sample_rate,
            oscillator,
            envelope: Envelope::new(sample_rate),
            note_length: 0.0,
            note_time: 0.0,
            gate_open: false,
            current: None,
        }
    }

    fn start_note(&mut self, params: ProceduralParameters) {
        self.oscillator.set_waveform(waveform_for_richness(params.richness));
        self.oscillator.set_frequency(params.frequency);
        self.oscillator.set_amplitude(params.amplitude);

        let length = params.duration;
        self.envelope.set_parameters(EnvelopeParams {
            attack_time: (length * 0.1).min(0.05),
            decay_time: length * 0.2,
            sustain_level: 0.6,
            release_time: length * 0.3,
        });
        self.envelope.note_on();
        self.note_length = length;
        self.note_time = 0.0;
        self.gate_open = true;
        self.current = Some(params);
    }

    /// Render `frames` frames, asking `next_params` for a new note whenever one ends.
    fn render(
        &mut self,
        out: &mut Vec<f32>,
        frames: usize,
        mut next_params: impl FnMut() -> ProceduralParameters,
    ) {
        prepare_stereo(out, frames);
        let step = 1.0 / self.sample_rate;
        for frame in out.chunks_exact_mut(2) {
            if self.current.is_none() || self.note_time >= self.note_length {
                self.start_note(next_params());
            }
            if self.gate_open && self.note_time >= self.note_length * 0.7 {
                self.envelope.note_off();
                self.gate_open = false;
            }
            let s = (self.oscillator.next_sample() * self.oscillator.amplitude() * self.envelope.next_value()) as f32;
            frame[0] = s;
            frame[1] = s;
            self.note_time += step;
        }
    }
}

/// Richness below 0.33 is a sine, below 0.66 a triangle, otherwise a sawtooth.
fn waveform_for_richness(richness: f64) -> Waveform {
    if richness < 0.33 {
        Waveform::Sine
    } else if richness < 0.66 {
        Waveform::Triangle
    } else {
        Waveform::Sawtooth
    }
}

/// Owns the world, the integration layer and the procedural stream.
#[derive(Debug, Clone)]
pub struct SandboxEngine {
    config: SandboxConfig,
    world: PhysicsWorld,
    sandbox: AudioPhysicsSandbox,
    procedural: AdaptiveProceduralSystem,
    voice: ProceduralVoice,
    features: FeatureFlags,
    master_volume: f64,
    simulation_speed: f64,
    physics_buffer: Vec<f32>,
    procedural_buffer: Vec<f32>,
    metrics: AudioMetrics,
    last_frame_time_ms: f64,
    elapsed: f64,
}

impl Default for SandboxEngine {
    fn default() -> Self {
        SandboxEngine::new(&SandboxConfig::default())
    }
}

impl SandboxEngine {
    /// Build an engine with an empty world. The config's scene is ignored;
    /// see [`SandboxEngine::from_config`].
    pub fn new(config: &SandboxConfig) -> Self {
        let config = config.sanitized();
        let frames = config.buffer_frames;
        info!(
            target: "engine",
            "engine: {} Hz, {} frames per buffer, {} impact voices",
            config.sample_rate,
            frames,
            config.impacts.voices
        );
        SandboxEngine {
            world: PhysicsWorld::new(&config.physics),
            sandbox: AudioPhysicsSandbox::with_config(&config),
            procedural: AdaptiveProceduralSystem::new(&config.procedural),
            voice: ProceduralVoice::new(config.sample_rate, config.procedural.seed),
            features: config.features,
            master_volume: config.master_volume,
            simulation_speed: config.simulation_speed,
            physics_buffer: Vec::with_capacity(frames * 2),
            procedural_buffer: Vec::with_capacity(frames * 2),
            metrics: AudioMetrics::default(),
            last_frame_time_ms: 0.0,
            elapsed: 0.0,
            config,
        }
    }

    /// Build an engine and populate the world from the config's scene.
    pub fn from_config(config: &SandboxConfig) -> Result<Self, SandboxError> {
        let mut engine = SandboxEngine::new(config);
        for (index, sphere) in config.scene.iter().enumerate() {
            engine.add_physics_object(sphere.build(index)?);
        }
        Ok(engine)
    }

    pub fn from_json(json: &str) -> Result<Self, SandboxError> {
        SandboxEngine::from_config(&SandboxConfig::from_json(json)?)
    }

    /// Add an object to the world and monitor it for impacts.
    pub fn add_physics_object(&mut self, object: PhysicsObject) -> ObjectHandle {
        let handle = self.world.add_object(object);
        self.sandbox.register_physics_object(handle);
        handle
    }

    /// Remove an object from the world and the monitor. Unknown handles are ignored.
    pub fn remove_physics_object(&mut self, handle: ObjectHandle) -> Option<PhysicsObject> {
        self.sandbox.unregister_physics_object(handle);
        self.world.remove_object(handle)
    }

    /// Advance by `dt` seconds and render one buffer of the configured length.
    pub fn update(&mut self, dt: f64, out: &mut Vec<f32>) {
        let frames = self.config.buffer_frames;
        self.update_frames(dt, out, frames);
    }

    /// Advance by `dt` seconds and render `frames` stereo frames into `out`.
    pub fn update_frames(&mut self, dt: f64, out: &mut Vec<f32>, frames: usize) {
        #[cfg(not(target_arch = "wasm32"))]
        let started = std::time::Instant::now();

        let dt = if dt.is_finite() && dt > 0.0 { dt * self.simulation_speed } else { 0.0 };
        self.step_physics(dt);

        if self.features.physics_audio {
            self.sandbox.render(&mut self.world, dt, &mut self.physics_buffer, frames);
        } else {
            // Contacts from a muted stretch must not sound once it is re-enabled.
            self.world.drain_contacts();
            prepare_stereo(&mut self.physics_buffer, frames);
        }

        if self.features.procedural_audio {
            let procedural = &mut self.procedural;
            let metrics = self.metrics;
            self.voice
                .render(&mut self.procedural_buffer, frames, || procedural.update(&metrics));
        } else {
            prepare_stereo(&mut self.procedural_buffer, frames);
        }

        let physics_mix = self.config.physics_mix as f32;
        let procedural_mix = (self.config.procedural_mix * self.config.procedural.gain * self.master_volume) as f32;
        let output_gain = self.config.output_gain as f32;
        out.clear();
        out.extend(
            self.physics_buffer
                .iter()
                .zip(self.procedural_buffer.iter())
                .map(|(&p, &q)| soft_clip((p * physics_mix + q * procedural_mix) * output_gain)),
        );

        self.metrics = AudioMetrics::from_buffer(out, self.config.sample_rate);
        self.elapsed += dt;

        #[cfg(not(target_arch = "wasm32"))]
        {
            self.last_frame_time_ms = started.elapsed().as_secs_f64() * 1000.0;
        }
    }

    fn step_physics(&mut self, dt: f64) {
        if dt <= 0.0 {
            return;
        }
        let steps = (dt / MAX_PHYSICS_STEP).ceil().max(1.0) as usize;
        let h = dt / steps as f64;
        for _ in 0..steps {
            self.world.simulate_step(h);
        }
    }

    pub fn set_master_volume(&mut self, volume: f64) {
        self.sandbox.set_master_volume(volume);
        self.master_volume = self.sandbox.master_volume();
    }

    pub fn master_volume(&self) -> f64 {
        self.master_volume
    }

    /// Multiplier on every `dt`; floored at 0.1.
    pub fn set_simulation_speed(&mut self, speed: f64) {
        if speed.is_finite() {
            self.simulation_speed = speed.max(0.1);
        }
    }

    pub fn simulation_speed(&self) -> f64 {
        self.simulation_speed
    }

    pub fn enable_physics_audio(&mut self, enabled: bool) {
        debug!(target: "engine", "physics audio {}", if enabled { "on" } else { "off" });
        self.features.physics_audio = enabled;
    }

    pub fn enable_procedural_audio(&mut self, enabled: bool) {
        debug!(target: "engine", "procedural audio {}", if enabled { "on" } else { "off" });
        self.features.procedural_audio = enabled;
    }

    pub fn enable_resonance(&mut self, enabled: bool) {
        self.features.resonance = enabled;
        self.sandbox.set_resonance_enabled(enabled);
    }

    pub fn features(&self) -> FeatureFlags {
        self.features
    }

    /// Reseed every procedural generator and the noise oscillator.
    pub fn set_procedural_seed(&mut self, seed: u64) {
        self.procedural.controller_mut().set_seed(seed);
        self.voice.oscillator.set_seed(seed);
    }

    pub fn get_stats(&self) -> EngineStats {
        let queue = self.sandbox.impact_queue();
        EngineStats {
            active_objects: self.world.len(),
            monitored_objects: self.sandbox.monitored_count(),
            queued_impacts: queue.queue_size(),
            dropped_impacts: queue.dropped_count(),
            active_voices: self.sandbox.active_voices(),
            average_audio_level: self.metrics.energy,
            last_frame_time_ms: self.last_frame_time_ms,
            elapsed: self.elapsed,
        }
    }

    /// Metrics of the last output buffer.
    pub fn last_metrics(&self) -> AudioMetrics {
        self.metrics
    }

    /// Parameters of the procedural note currently sounding.
    pub fn current_procedural_parameters(&self) -> Option<ProceduralParameters> {
        self.voice.current
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    /// Objects added here are simulated but not monitored for impacts.
    pub fn world_mut(&mut self) -> &mut PhysicsWorld {
        &mut self.world
    }

    pub fn sandbox(&self) -> &AudioPhysicsSandbox {
        &self.sandbox
    }

    pub fn sandbox_mut(&mut self) -> &mut AudioPhysicsSandbox {
        &mut self.sandbox
    }

    pub fn procedural(&self) -> &AdaptiveProceduralSystem {
        &self.procedural
    }

    pub fn procedural_mut(&mut self) -> &mut AdaptiveProceduralSystem {
        &mut self.procedural
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SphereSpec;
    use crate::physics::vector::Vector3;

    fn small_config() -> SandboxConfig {
        SandboxConfig {
            buffer_frames: 512,
            ..SandboxConfig::default()
        }
    }

    fn assert_valid(buf: &[f32], frames: usize) {
        assert_eq!(buf.len(), frames * 2);
        assert!(buf.iter().all(|s| s.is_finite() && (-1.0..=1.0).contains(s)));
    }

    #[test]
    fn renders_configured_buffer_length() {
        let mut engine = SandboxEngine::new(&small_config());
        let mut out = Vec::new();
        engine.update(1.0 / 60.0, &mut out);
        assert_valid(&out, 512);
        engine.update_frames(1.0 / 60.0, &mut out, 100);
        assert_valid(&out, 100);
        engine.update_frames(1.0 / 60.0, &mut out, 0);
        assert!(out.is_empty());
    }

    #[test]
    fn procedural_stream_is_audible() {
        let mut engine = SandboxEngine::new(&small_config());
        let mut out = Vec::new();
        for _ in 0..10 {
            engine.update(1.0 / 60.0, &mut out);
        }
        assert!(engine.get_stats().average_audio_level > 0.0);
        assert!(engine.current_procedural_parameters().is_some());
    }

    #[test]
    fn disabled_streams_are_silent() {
        let mut config = small_config();
        config.scene.push(SphereSpec {
            position: Vector3::new(0.0, 0.2, 0.0),
            velocity: Vector3::new(0.0, -5.0, 0.0),
            ..SphereSpec::default()
        });
        let mut engine = SandboxEngine::from_config(&config).unwrap();
        engine.enable_physics_audio(false);
        engine.enable_procedural_audio(false);
        let mut out = Vec::new();
        for _ in 0..10 {
            engine.update(1.0 / 60.0, &mut out);
            assert_valid(&out, 512);
            assert!(out.iter().all(|&s| s == 0.0));
        }
        assert!(engine.world().contacts().is_empty());
    }

    #[test]
    fn dropped_sphere_is_heard() {
        let mut config = small_config();
        config.features.procedural_audio = false;
        config.scene.push(SphereSpec {
            position: Vector3::new(0.0, 1.0, 0.0),
            ..SphereSpec::default()
        });
        let mut engine = SandboxEngine::from_config(&config).unwrap();
        assert_eq!(engine.get_stats().active_objects, 1);
        assert_eq!(engine.get_stats().monitored_objects, 1);

        let mut out = Vec::new();
        let mut heard = false;
        for _ in 0..60 {
            engine.update(1.0 / 60.0, &mut out);
            heard |= out.iter().any(|s| s.abs() > 0.01);
        }
        assert!(heard, "the sphere should have hit the ground within a second");
    }

    #[test]
    fn physics_stream_is_clipped_once() {
        let mut config = small_config();
        config.features.procedural_audio = false;
        config.master_volume = 1.0;
        config.output_gain = 1.5;
        config.scene.push(SphereSpec {
            position: Vector3::new(0.0, 0.6, 0.0),
            velocity: Vector3::new(0.0, -10.0, 0.0),
            hardness: 1.0,
            ..SphereSpec::default()
        });
        let mut engine = SandboxEngine::from_config(&config).unwrap();
        let physics_mix = engine.config.physics_mix as f32;
        let output_gain = engine.config.output_gain as f32;

        let mut out = Vec::new();
        let mut heard = false;
        for _ in 0..30 {
            engine.update(1.0 / 60.0, &mut out);
            for (o, p) in out.iter().zip(&engine.physics_buffer) {
                assert_eq!(*o, soft_clip(*p * physics_mix * output_gain));
            }
            heard |= engine.physics_buffer.iter().any(|p| p.abs() > 0.01);
        }
        assert!(heard, "the impact should reach the physics stream");
    }

    #[test]
    fn remove_object_updates_stats() {
        let mut engine = SandboxEngine::new(&small_config());
        let h = engine.add_physics_object(PhysicsObject::sphere(0.5, 1.0));
        assert!(engine.remove_physics_object(h).is_some());
        assert!(engine.remove_physics_object(h).is_none());
        let stats = engine.get_stats();
        assert_eq!(stats.active_objects, 0);
        assert_eq!(stats.monitored_objects, 0);
    }

    #[test]
    fn controls_are_clamped() {
        let mut engine = SandboxEngine::default();
        engine.set_master_volume(4.0);
        assert_eq!(engine.master_volume(), 1.0);
        engine.set_simulation_speed(0.0);
        assert_eq!(engine.simulation_speed(), 0.1);
    }

    #[test]
    fn elapsed_follows_simulation_speed() {
        let mut engine = SandboxEngine::new(&small_config());
        engine.set_simulation_speed(2.0);
        let mut out = Vec::new();
        engine.update(0.5, &mut out);
        assert!((engine.get_stats().elapsed - 1.0).abs() < 1e-12);
    }

    #[test]
    fn richness_selects_waveform() {
        assert_eq!(waveform_for_richness(0.1), Waveform::Sine);
        assert_eq!(waveform_for_richness(0.5), Waveform::Triangle);
        assert_eq!(waveform_for_richness(0.9), Waveform::Sawtooth);
    }

    #[test]
    fn invalid_scene_is_rejected() {
        let mut config = small_config();
        config.scene.push(SphereSpec {
            velocity: Vector3::new(f64::INFINITY, 0.0, 0.0),
            ..SphereSpec::default()
        });
        assert!(matches!(
            SandboxEngine::from_config(&config),
            Err(SandboxError::InvalidScene { index: 0, .. })
        ));
    }
}
