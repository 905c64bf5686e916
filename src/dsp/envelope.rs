//! ADSR envelope generator.

/// Envelope stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

/// Stage durations and the sustain level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeParams {
    /// Attack time in seconds.
    pub attack_time: f64,
    /// Decay time in seconds.
    pub decay_time: f64,
    /// Sustain level [0, 1].
    pub sustain_level: f64,
    /// Release time in seconds.
    pub release_time: f64,
}

impl Default for EnvelopeParams {
    fn default() -> Self {
        EnvelopeParams {
            attack_time: 0.01,
            decay_time: 0.1,
            sustain_level: 0.7,
            release_time: 0.3,
        }
    }
}

impl EnvelopeParams {
    /// Negative or non-finite times become zero; sustain is clamped to [0, 1].
    pub fn sanitized(&self) -> Self {
        EnvelopeParams {
            attack_time: non_negative(self.attack_time),
            decay_time: non_negative(self.decay_time),
            sustain_level: if self.sustain_level.is_finite() {
                self.sustain_level.clamp(0.0, 1.0)
            } else {
                0.0
            },
            release_time: non_negative(self.release_time),
        }
    }
}

/// ADSR envelope with linear segments.
///
/// Every segment ramps from the level the envelope is at when the segment
/// starts, so retriggering or releasing mid-stage never jumps.
#[derive(Debug, Clone)]
pub struct Envelope {
    params: EnvelopeParams,
    stage: Stage,
    level: f64,
    sample_rate: f64,
    /// Samples in the current stage.
    stage_samples: usize,
    stage_counter: usize,
    /// Level at the start of the current stage.
    start_level: f64,
}

impl Envelope {
    pub fn new(sample_rate: f64) -> Self {
        Envelope {
            params: EnvelopeParams::default(),
            stage: Stage::Idle,
            level: 0.0,
            sample_rate: sample_rate.max(1.0),
            stage_samples: 0,
            stage_counter: 0,
            start_level: 0.0,
        }
    }

    pub fn with_params(sample_rate: f64, params: EnvelopeParams) -> Self {
        let mut env = Envelope::new(sample_rate);
        env.set_parameters(params);
        env
    }

    /// Takes effect at the next stage transition.
    pub fn set_parameters(&mut self, params: EnvelopeParams) {
        self.params = params.sanitized();
    }

    pub fn parameters(&self) -> EnvelopeParams {
        self.params
    }

    /// Start (or retrigger) the attack from the current level.
    pub fn note_on(&mut self) {
        self.enter(Stage::Attack, self.params.attack_time);
    }

    /// Release from the current level. Ignored while idle.
    pub fn note_off(&mut self) {
        if self.stage == Stage::Idle {
            return;
        }
        self.enter(Stage::Release, self.params.release_time);
    }

    /// Advance one sample and return the envelope level [0, 1].
    pub fn next_value(&mut self) -> f64 {
        match self.stage {
            Stage::Idle => {
                self.level = 0.0;
            }
            Stage::Attack => {
                if self.ramp(1.0) {
                    self.enter(Stage::Decay, self.params.decay_time);
                }
            }
            Stage::Decay => {
                if self.ramp(self.params.sustain_level) {
                    self.stage = Stage::Sustain;
                }
            }
            Stage::Sustain => {
                self.level = self.params.sustain_level;
            }
            Stage::Release => {
                if self.ramp(0.0) {
                    self.stage = Stage::Idle;
                }
            }
        }
        self.level
    }

    /// True whenever the stage is not [`Stage::Idle`].
    pub fn is_active(&self) -> bool {
        self.stage != Stage::Idle
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn value(&self) -> f64 {
        self.level
    }

    /// Hard reset to idle at zero.
    pub fn reset(&mut self) {
        self.stage = Stage::Idle;
        self.level = 0.0;
        self.stage_counter = 0;
        self.stage_samples = 0;
        self.start_level = 0.0;
    }

    fn enter(&mut self, stage: Stage, seconds: f64) {
        self.stage = stage;
        self.stage_samples = (seconds * self.sample_rate) as usize;
        self.stage_counter = 0;
        self.start_level = self.level;
    }

    /// One step of a linear ramp towards `target`. Returns true when the ramp is done.
    ///
    /// The first sample of a stage already moves by one step and the last
    /// sample lands exactly on `target`.
    fn ramp(&mut self, target: f64) -> bool {
        self.stage_counter += 1;
        if self.stage_counter >= self.stage_samples {
            self.level = target;
            return true;
        }
        let t = self.stage_counter as f64 / self.stage_samples as f64;
        self.level = self.start_level + (target - self.start_level) * t;
        false
    }
}

fn non_negative(v: f64) -> f64 {
    if v.is_finite() { v.max(0.0) } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f64 = 48_000.0;

    fn params(a: f64, d: f64, s: f64, r: f64) -> EnvelopeParams {
        EnvelopeParams {
            attack_time: a,
            decay_time: d,
            sustain_level: s,
            release_time: r,
        }
    }

    #[test]
    fn starts_idle() {
        let mut env = Envelope::new(SR);
        assert!(!env.is_active());
        assert_eq!(env.next_value(), 0.0);
    }

    #[test]
    fn attack_is_monotonic_and_reaches_one() {
        let mut env = Envelope::with_params(SR, params(0.01, 0.05, 0.5, 0.1));
        env.note_on();
        assert_eq!(env.stage(), Stage::Attack);

        let mut prev = 0.0;
        let attack_samples = (0.01 * SR) as usize;
        for _ in 0..attack_samples {
            let v = env.next_value();
            assert!(v >= prev, "attack went down: {prev} -> {v}");
            prev = v;
        }
        assert!((prev - 1.0).abs() < 1e-9, "attack should end at 1.0, got {prev}");
        assert_eq!(env.stage(), Stage::Decay);
    }

    #[test]
    fn settles_at_sustain() {
        let mut env = Envelope::with_params(SR, params(0.001, 0.001, 0.6, 0.1));
        env.note_on();
        for _ in 0..500 {
            env.next_value();
        }
        assert_eq!(env.stage(), Stage::Sustain);
        let s = env.next_value();
        assert!((s - 0.6).abs() < 1e-12, "Should sustain at 0.6, got {s}");
    }

    #[test]
    fn release_is_monotonic_to_zero() {
        let mut env = Envelope::with_params(SR, params(0.001, 0.001, 0.7, 0.01));
        env.note_on();
        for _ in 0..500 {
            env.next_value();
        }
        env.note_off();
        assert_eq!(env.stage(), Stage::Release);

        let mut prev = env.value();
        for _ in 0..1000 {
            let v = env.next_value();
            assert!(v <= prev, "release went up: {prev} -> {v}");
            prev = v;
        }
        assert!(!env.is_active(), "Should be idle after release");
        assert_eq!(env.value(), 0.0);
    }

    #[test]
    fn transitions_are_continuous() {
        let (a, d, r) = (0.004, 0.006, 0.005);
        let sustain = 0.4;
        let mut env = Envelope::with_params(SR, params(a, d, sustain, r));
        // Largest per-sample step any segment can take.
        let samples = |secs: f64| ((secs * SR) as usize) as f64;
        let max_step = [1.0 / samples(a), (1.0 - sustain) / samples(d), sustain / samples(r)]
            .into_iter()
            .fold(0.0_f64, f64::max)
            + 1e-9;

        env.note_on();
        let mut prev = 0.0;
        for i in 0..2000 {
            if i == 1000 {
                env.note_off();
            }
            let v = env.next_value();
            assert!(
                (v - prev).abs() <= max_step,
                "jump of {} at sample {i} ({:?})",
                (v - prev).abs(),
                env.stage()
            );
            prev = v;
        }
    }

    #[test]
    fn interrupted_attack_releases_from_current_level() {
        let mut env = Envelope::with_params(SR, params(0.1, 0.1, 0.5, 0.1));
        env.note_on();
        for _ in 0..100 {
            env.next_value();
        }
        let before = env.value();
        assert!(before > 0.0 && before < 0.1);
        env.note_off();
        let after = env.next_value();
        let step = before / (0.1 * SR);
        assert!(
            (before - after - step).abs() < 1e-12,
            "release should start one step below {before}, got {after}"
        );
    }

    #[test]
    fn retrigger_ramps_from_current_level() {
        let mut env = Envelope::with_params(SR, params(0.01, 0.01, 0.3, 0.5));
        env.note_on();
        for _ in 0..2000 {
            env.next_value();
        }
        env.note_off();
        for _ in 0..100 {
            env.next_value();
        }
        let before = env.value();
        env.note_on();
        let after = env.next_value();
        let step = (1.0 - before) / (0.01 * SR);
        assert!((after - before - step).abs() < 1e-12, "retrigger from {before} gave {after}");
    }

    #[test]
    fn every_stage_entry_moves_one_step() {
        let (a, d, r) = (0.004, 0.006, 0.005);
        let sustain = 0.4;
        let mut env = Envelope::with_params(SR, params(a, d, sustain, r));
        let samples = |secs: f64| (secs * SR) as usize;
        let (na, nd, nr) = (samples(a), samples(d), samples(r));
        let attack_step = 1.0 / na as f64;
        let decay_step = (1.0 - sustain) / nd as f64;
        let release_step = sustain / nr as f64;
        let close = |x: f64, y: f64| (x - y).abs() < 1e-12;

        // Idle -> Attack
        env.note_on();
        let first = env.next_value();
        assert!(close(first, attack_step), "first attack sample {first}");
        let mut v = first;
        for _ in 1..na - 1 {
            v = env.next_value();
        }
        assert_eq!(env.stage(), Stage::Attack);
        assert!(close(1.0 - v, attack_step), "attack ended with step {}", 1.0 - v);

        // Attack -> Decay
        assert_eq!(env.next_value(), 1.0);
        assert_eq!(env.stage(), Stage::Decay);
        let entry = env.next_value();
        assert!(close(1.0 - entry, decay_step), "decay entry {entry}");

        // Decay -> Sustain
        for _ in 1..nd - 1 {
            v = env.next_value();
        }
        assert_eq!(env.stage(), Stage::Decay);
        assert!(close(v - sustain, decay_step), "decay ended with step {}", v - sustain);
        assert_eq!(env.next_value(), sustain);
        assert_eq!(env.stage(), Stage::Sustain);
        assert_eq!(env.next_value(), sustain);

        // Sustain -> Release
        env.note_off();
        let entry = env.next_value();
        assert!(close(sustain - entry, release_step), "release entry {entry}");
        for _ in 1..nr - 1 {
            v = env.next_value();
        }
        assert_eq!(env.stage(), Stage::Release);
        assert!(close(v, release_step), "release tail {v}");
        assert_eq!(env.next_value(), 0.0);
        assert!(!env.is_active());
    }

    #[test]
    fn zero_length_stages_jump_to_targets() {
        let mut env = Envelope::with_params(SR, params(0.0, 0.0, 0.5, 0.0));
        env.note_on();
        assert_eq!(env.next_value(), 1.0);
        assert_eq!(env.next_value(), 0.5);
        env.note_off();
        assert_eq!(env.next_value(), 0.0);
        assert!(!env.is_active());
    }

    #[test]
    fn negative_params_sanitized() {
        let env = Envelope::with_params(SR, params(-1.0, f64::NAN, 2.0, -0.5));
        let p = env.parameters();
        assert_eq!(p.attack_time, 0.0);
        assert_eq!(p.decay_time, 0.0);
        assert_eq!(p.sustain_level, 1.0);
        assert_eq!(p.release_time, 0.0);
    }
}
