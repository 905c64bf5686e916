//! First-order Markov chain over quantized values.

use rand::SeedableRng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::rngs::StdRng;

use super::{DEFAULT_SEED, ParameterGenerator};

/// State granularity.
const QUANTUM: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Transition {
    from: f64,
    to: f64,
    weight: f64,
}

/// Walks a transition table. States are multiples of 0.1 in [0, 1].
///
/// Each step picks among the transitions leaving the current state with
/// probability proportional to their weights. A state with no outgoing
/// transition repeats itself.
#[derive(Debug, Clone)]
pub struct MarkovGenerator {
    transitions: Vec<Transition>,
    initial_state: f64,
    current: f64,
    seed: u64,
    rng: StdRng,
}

impl Default for MarkovGenerator {
    fn default() -> Self {
        MarkovGenerator::with_seed(DEFAULT_SEED)
    }
}

impl MarkovGenerator {
    pub fn with_seed(seed: u64) -> Self {
        MarkovGenerator {
            transitions: Vec::new(),
            initial_state: 0.5,
            current: 0.5,
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Both states are quantized. Non-positive or non-finite weights are ignored.
    pub fn add_transition(&mut self, from: f64, to: f64, probability: f64) {
        if !(probability.is_finite() && probability > 0.0) {
            return;
        }
        self.transitions.push(Transition {
            from: quantize(from),
            to: quantize(to),
            weight: probability,
        });
    }

    pub fn clear_transitions(&mut self) {
        self.transitions.clear();
    }

    pub fn transition_count(&self) -> usize {
        self.transitions.len()
    }

    /// State the chain starts from after `reset` / `set_seed`.
    pub fn set_initial_state(&mut self, state: f64) {
        self.initial_state = quantize(state);
        self.current = self.initial_state;
    }

    pub fn current_state(&self) -> f64 {
        self.current
    }

    fn select_next_state(&mut self) -> f64 {
        let key = self.current;
        let candidates: Vec<&Transition> = self
            .transitions
            .iter()
            .filter(|t| (t.from - key).abs() < QUANTUM * 0.5)
            .collect();
        if candidates.is_empty() {
            return key;
        }
        match WeightedIndex::new(candidates.iter().map(|t| t.weight)) {
            Ok(dist) => candidates[dist.sample(&mut self.rng)].to,
            Err(_) => key,
        }
    }
}

fn quantize(v: f64) -> f64 {
    let v = if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
    (v / QUANTUM).round() * QUANTUM
}

impl ParameterGenerator for MarkovGenerator {
    fn next_value(&mut self) -> f64 {
        self.current = self.select_next_state();
        self.current.clamp(0.0, 1.0)
    }

    fn reset(&mut self) {
        self.current = self.initial_state;
        self.rng = StdRng::seed_from_u64(self.seed);
    }

    fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
        self.reset();
    }
}
