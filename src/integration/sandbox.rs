//! Audio-physics sandbox: turns world contacts into impact audio each tick.
//!
//! Per update: drain the world's contacts for monitored objects into impact
//! events, route every queued event through the mapper into an impact voice
//! (and the resonator), then mix the voices and apply the master volume.

use std::collections::HashSet;

use tracing::{debug, trace};

use crate::config::SandboxConfig;
use crate::dsp::mixer::{Mixer, SourceId, soft_clip};
use crate::dsp::source::Source;
use crate::physics::impact::ImpactEvent;
use crate::physics::world::{Contact, ObjectHandle, PhysicsWorld};

use super::impact_synth::ImpactSynthesizer;
use super::mapper::AudioPhysicsMapper;
use super::queue::ImpactEventQueue;
use super::resonance::ResonanceSynthesizer;

/// Integration layer between a [`PhysicsWorld`] and the synthesizers.
#[derive(Debug, Clone)]
pub struct AudioPhysicsSandbox {
    sample_rate: f64,
    mixer: Mixer,
    mapper: AudioPhysicsMapper,
    queue: ImpactEventQueue,
    impact_voices: Vec<SourceId>,
    resonance: SourceId,
    resonance_enabled: bool,
    resonance_gain: f64,
    monitored: HashSet<ObjectHandle>,
    master_volume: f64,
    min_impact_speed: f64,
    impulse_reference: f64,
    elapsed: f64,
}

impl AudioPhysicsSandbox {
    pub fn new(sample_rate: f64) -> Self {
        let config = SandboxConfig {
            sample_rate,
            ..SandboxConfig::default()
        };
        AudioPhysicsSandbox::with_config(&config)
    }

    pub fn with_config(config: &SandboxConfig) -> Self {
        let config = config.sanitized();
        let sample_rate = config.sample_rate;
        let mut mixer = Mixer::new();

        let impact_voices = (0..config.impacts.voices)
            .map(|_| mixer.add_source(ImpactSynthesizer::with_config(sample_rate, &config.impacts)))
            .collect();
        let resonance = mixer.add_source(ResonanceSynthesizer::with_config(sample_rate, &config.resonance));

        AudioPhysicsSandbox {
            sample_rate,
            mixer,
            mapper: AudioPhysicsMapper::new(&config.mapper),
            queue: ImpactEventQueue::new(config.impacts.queue_capacity, config.impacts.overflow_policy),
            impact_voices,
            resonance,
            resonance_enabled: config.features.resonance,
            resonance_gain: config.impacts.resonance_gain,
            monitored: HashSet::new(),
            master_volume: config.master_volume,
            min_impact_speed: config.impacts.min_impact_speed,
            impulse_reference: config.impacts.impulse_reference,
            elapsed: 0.0,
        }
    }

    /// Start listening for impacts from an object.
    pub fn register_physics_object(&mut self, handle: ObjectHandle) {
        self.monitored.insert(handle);
    }

    /// Stop listening. Unknown handles are ignored.
    pub fn unregister_physics_object(&mut self, handle: ObjectHandle) {
        self.monitored.remove(&handle);
    }

    pub fn is_monitored(&self, handle: ObjectHandle) -> bool {
        self.monitored.contains(&handle)
    }

    pub fn monitored_count(&self) -> usize {
        self.monitored.len()
    }

    /// Run one tick and fill `out` with `num_samples` soft-clipped stereo frames.
    ///
    /// The world must already have been stepped for this tick: contacts it
    /// produced are voiced in this same buffer.
    pub fn update(&mut self, world: &mut PhysicsWorld, dt: f64, out: &mut Vec<f32>, num_samples: usize) {
        self.render(world, dt, out, num_samples);
        for s in out.iter_mut() {
            *s = soft_clip(*s);
        }
    }

    /// Same tick as [`update`](Self::update) but leaves the mix unclipped,
    /// for callers that combine it with other streams before clipping.
    pub fn render(&mut self, world: &mut PhysicsWorld, dt: f64, out: &mut Vec<f32>, num_samples: usize) {
        if dt.is_finite() && dt > 0.0 {
            self.elapsed += dt;
        }
        self.process_physics_impacts(world);
        self.drain_impacts();

        self.mixer.mix_audio(out, num_samples);
        let volume = self.master_volume as f32;
        for s in out.iter_mut() {
            *s *= volume;
        }
    }

    /// Turn the world's pending contacts into queued impact events.
    ///
    /// Only contacts involving a monitored object and closing faster than the
    /// minimum impact speed are kept. Returns the number of events queued.
    pub fn process_physics_impacts(&mut self, world: &mut PhysicsWorld) -> usize {
        let mut queued = 0;
        for contact in world.drain_contacts() {
            if contact.closing_speed < self.min_impact_speed {
                continue;
            }
            let Some(event) = self.impact_from_contact(world, &contact) else {
                continue;
            };
            trace!(
                target: "impacts",
                "impact from {} force={:.3} freq={:.1}",
                event.object.id(),
                event.force,
                event.frequency
            );
            if self.queue.queue_impact(event) {
                queued += 1;
            }
        }
        queued
    }

    fn impact_from_contact(&self, world: &PhysicsWorld, contact: &Contact) -> Option<ImpactEvent> {
        let (source, normal) = if self.monitored.contains(&contact.object) {
            (contact.object, contact.normal)
        } else {
            let other = contact.other.filter(|o| self.monitored.contains(o))?;
            (other, -contact.normal)
        };

        let hardness_of = |h: ObjectHandle| world.get(h).map(|o| o.hardness());
        let own = hardness_of(source)?;
        let hardness = match contact.other.and_then(hardness_of) {
            Some(other) => 0.5 * (own + other),
            None => own,
        };

        let force = (contact.impulse / self.impulse_reference).clamp(0.0, 1.0);
        let mut event = ImpactEvent::new(source, contact.point, normal, force);
        event.hardness = hardness;
        event.frequency = self.mapper.generate_impact_frequency(hardness, force);
        event.duration = self.mapper.generate_duration(force);
        Some(event)
    }

    /// Queue an externally produced impact (a scripted strike, say).
    pub fn queue_impact(&mut self, event: ImpactEvent) -> bool {
        self.queue.queue_impact(event)
    }

    /// Voice every queued event, oldest first.
    fn drain_impacts(&mut self) {
        while let Some(event) = self.queue.dequeue_impact() {
            self.route_impact(&event);
        }
    }

    fn route_impact(&mut self, event: &ImpactEvent) {
        let voicing = self.mapper.map_impact_to_audio(event);
        if let Some(voice) = self.pick_voice() {
            voice.trigger_impact(voicing.frequency, voicing.amplitude, voicing.duration);
        }

        if self.resonance_enabled {
            let energy = event.force * self.resonance_gain;
            if let Some(Source::Resonance(r)) = self.mixer.source_mut(self.resonance) {
                r.excite_resonance(energy);
            }
        }
    }

    /// An idle voice, or else the one closest to finishing.
    fn pick_voice(&mut self) -> Option<&mut ImpactSynthesizer> {
        let mut best: Option<(SourceId, f64)> = None;
        for &id in &self.impact_voices {
            let Some(Source::Impact(voice)) = self.mixer.source(id) else {
                continue;
            };
            let remaining = if voice.is_playing() { voice.remaining_duration() } else { -1.0 };
            if best.is_none_or(|(_, r)| remaining < r) {
                best = Some((id, remaining));
            }
        }
        let (id, remaining) = best?;
        if remaining >= 0.0 {
            debug!(target: "impacts", "all impact voices busy, stealing one with {remaining:.3}s left");
        }
        match self.mixer.source_mut(id) {
            Some(Source::Impact(voice)) => Some(voice),
            _ => None,
        }
    }

    /// Impact voices currently sounding.
    pub fn active_voices(&self) -> usize {
        self.impact_voices
            .iter()
            .filter(|&&id| matches!(self.mixer.source(id), Some(Source::Impact(v)) if v.is_playing()))
            .count()
    }

    pub fn voice_count(&self) -> usize {
        self.impact_voices.len()
    }

    pub fn resonance(&self) -> Option<&ResonanceSynthesizer> {
        match self.mixer.source(self.resonance) {
            Some(Source::Resonance(r)) => Some(r),
            _ => None,
        }
    }

    pub fn resonance_mut(&mut self) -> Option<&mut ResonanceSynthesizer> {
        match self.mixer.source_mut(self.resonance) {
            Some(Source::Resonance(r)) => Some(r),
            _ => None,
        }
    }

    /// Disabling also silences any ringing.
    pub fn set_resonance_enabled(&mut self, enabled: bool) {
        self.resonance_enabled = enabled;
        if !enabled {
            if let Some(r) = self.resonance_mut() {
                r.reset();
            }
        }
    }

    pub fn resonance_enabled(&self) -> bool {
        self.resonance_enabled
    }

    pub fn set_master_volume(&mut self, volume: f64) {
        self.master_volume = if volume.is_finite() { volume.clamp(0.0, 1.0) } else { 0.0 };
    }

    pub fn master_volume(&self) -> f64 {
        self.master_volume
    }

    pub fn mixer(&self) -> &Mixer {
        &self.mixer
    }

    pub fn mixer_mut(&mut self) -> &mut Mixer {
        &mut self.mixer
    }

    pub fn mapper(&self) -> &AudioPhysicsMapper {
        &self.mapper
    }

    pub fn mapper_mut(&mut self) -> &mut AudioPhysicsMapper {
        &mut self.mapper
    }

    pub fn impact_queue(&self) -> &ImpactEventQueue {
        &self.queue
    }

    pub fn impact_queue_mut(&mut self) -> &mut ImpactEventQueue {
        &mut self.queue
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Total simulated time handed to [`update`](Self::update).
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }
}
