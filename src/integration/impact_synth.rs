//! Transient impact voice: a falling-pitch tone under a short-attack envelope.

use crate::config::ImpactConfig;
use crate::dsp::envelope::{Envelope, EnvelopeParams};
use crate::dsp::oscillator::{Oscillator, Waveform};
use crate::dsp::source::{Param, Synthesizer, prepare_stereo};

/// Shortest impact the synthesizer will play (s).
const MIN_IMPACT_DURATION: f64 = 0.005;
/// Longest attack of the impact envelope (s).
const MAX_ATTACK: f64 = 0.005;

/// One impact voice.
///
/// Pitch follows `f(t) = f0 · r^t` (with `r < 1`) down to a floor, producing
/// the falling "thud" of a struck body. The envelope's attack + decay span the
/// whole duration with zero sustain, so the voice is silent when it stops.
#[derive(Debug, Clone)]
pub struct ImpactSynthesizer {
    sample_rate: f64,
    oscillator: Oscillator,
    envelope: Envelope,
    amplitude: f64,
    initial_frequency: f64,
    current_frequency: f64,
    /// Pitch multiplier per second (0, 1].
    frequency_decay: f64,
    frequency_floor: f64,
    impact_duration: f64,
    remaining_duration: f64,
    playing: bool,
}

impl ImpactSynthesizer {
    pub fn new(sample_rate: f64) -> Self {
        ImpactSynthesizer::with_config(sample_rate, &ImpactConfig::default())
    }

    pub fn with_config(sample_rate: f64, config: &ImpactConfig) -> Self {
        let config = config.sanitized();
        let sample_rate = sample_rate.max(1.0);
        ImpactSynthesizer {
            sample_rate,
            oscillator: Oscillator::new(Waveform::Sine, sample_rate),
            envelope: Envelope::new(sample_rate),
            amplitude: 0.0,
            initial_frequency: 200.0,
            current_frequency: 200.0,
            frequency_decay: config.frequency_decay,
            frequency_floor: config.frequency_floor,
            impact_duration: 0.0,
            remaining_duration: 0.0,
            playing: false,
        }
    }

    /// Start an impact. Retriggering a playing voice ramps from its current level.
    pub fn trigger_impact(&mut self, frequency: f64, amplitude: f64, duration: f64) {
        let duration = if duration.is_finite() {
            duration.max(MIN_IMPACT_DURATION)
        } else {
            MIN_IMPACT_DURATION
        };
        let attack = (duration * 0.1).min(MAX_ATTACK);

        self.oscillator.set_frequency(frequency);
        self.initial_frequency = self.oscillator.frequency();
        self.current_frequency = self.initial_frequency;
        self.amplitude = if amplitude.is_finite() {
            amplitude.clamp(0.0, 1.0)
        } else {
            0.0
        };

        self.envelope.set_parameters(EnvelopeParams {
            attack_time: attack,
            decay_time: duration - attack,
            sustain_level: 0.0,
            release_time: 0.0,
        });
        self.envelope.note_on();

        self.impact_duration = duration;
        self.remaining_duration = duration;
        self.playing = true;
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Seconds left before the voice falls silent.
    pub fn remaining_duration(&self) -> f64 {
        self.remaining_duration
    }

    pub fn impact_duration(&self) -> f64 {
        self.impact_duration
    }

    /// Current (decayed) pitch in Hz.
    pub fn current_frequency(&self) -> f64 {
        self.current_frequency
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.oscillator.set_waveform(waveform);
    }

    fn next_sample(&mut self) -> f64 {
        if !self.playing {
            return 0.0;
        }

        let env = self.envelope.next_value();
        self.oscillator.set_frequency(self.current_frequency);
        let sample = self.oscillator.next_sample() * env * self.amplitude;

        let per_sample = self.frequency_decay.powf(1.0 / self.sample_rate);
        let floor = self.frequency_floor.min(self.initial_frequency);
        self.current_frequency = (self.current_frequency * per_sample).max(floor);

        self.remaining_duration -= 1.0 / self.sample_rate;
        if self.remaining_duration <= 0.0 {
            self.remaining_duration = 0.0;
            self.playing = false;
            self.envelope.reset();
        }
        sample
    }
}

impl Synthesizer for ImpactSynthesizer {
    fn generate_samples(&mut self, out: &mut Vec<f32>, num_samples: usize) {
        prepare_stereo(out, num_samples);
        if !self.playing {
            return;
        }
        for frame in out.chunks_exact_mut(2) {
            let s = self.next_sample() as f32;
            frame[0] = s;
            frame[1] = s;
        }
    }

    fn set_parameter(&mut self, param: Param, value: f64) {
        if !value.is_finite() {
            return;
        }
        match param {
            Param::Frequency => {
                self.oscillator.set_frequency(value);
                self.initial_frequency = self.oscillator.frequency();
                self.current_frequency = self.initial_frequency;
            }
            Param::Amplitude => self.amplitude = value.clamp(0.0, 1.0),
            Param::Waveform => self.oscillator.set_waveform(Waveform::from_index(value)),
            Param::FrequencyDecay => self.frequency_decay = value.clamp(1e-3, 1.0),
            Param::FrequencyFloor => self.frequency_floor = value.max(1.0),
            Param::Quality | Param::Damping => {}
        }
    }

    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }
}
