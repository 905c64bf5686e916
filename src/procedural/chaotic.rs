//! Chaotic maps as parameter sources.
//!
//! Small changes to the chaos parameter move a map between periodic and
//! chaotic regimes. That sensitivity is the point.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{DEFAULT_SEED, ParameterGenerator};

const HENON_B: f64 = 0.3;
const LORENZ_SIGMA: f64 = 10.0;
const LORENZ_BETA: f64 = 8.0 / 3.0;
/// ρ = chaos parameter × this, so the default 4.0 gives the classic ρ = 28.
const LORENZ_RHO_SCALE: f64 = 7.0;
const LORENZ_DT: f64 = 0.01;
/// State magnitude treated as divergence.
const DIVERGENCE: f64 = 1e3;

/// Which map to iterate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChaosType {
    /// `x ← r·x·(1 − x)`
    Logistic,
    /// `x ← 1 − a·x² + y`, `y ← 0.3·x`
    Henon,
    /// Euler-stepped Lorenz system, projected onto x.
    Lorenz,
}

impl ChaosType {
    fn default_parameter(self) -> f64 {
        match self {
            ChaosType::Logistic => 3.9,
            ChaosType::Henon => 1.4,
            ChaosType::Lorenz => 4.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChaoticGenerator {
    kind: ChaosType,
    parameter: f64,
    seed: u64,
    x0: f64,
    x: f64,
    y: f64,
    z: f64,
}

impl ChaoticGenerator {
    pub fn new(kind: ChaosType) -> Self {
        ChaoticGenerator::with_seed(kind, DEFAULT_SEED)
    }

    pub fn with_seed(kind: ChaosType, seed: u64) -> Self {
        let mut g = ChaoticGenerator {
            kind,
            parameter: kind.default_parameter(),
            seed,
            x0: 0.5,
            x: 0.0,
            y: 0.0,
            z: 0.0,
        };
        g.set_seed(seed);
        g
    }

    pub fn kind(&self) -> ChaosType {
        self.kind
    }

    /// Clamped to [0, 4]. The state is left alone, so the map continues from
    /// where it is.
    pub fn set_chaos_parameter(&mut self, value: f64) {
        if value.is_finite() {
            self.parameter = value.clamp(0.0, 4.0);
        }
    }

    pub fn chaos_parameter(&self) -> f64 {
        self.parameter
    }

    fn restart(&mut self) {
        match self.kind {
            ChaosType::Logistic => {
                self.x = self.x0;
                self.y = 0.0;
                self.z = 0.0;
            }
            ChaosType::Henon => {
                self.x = self.x0 - 0.5;
                self.y = 0.0;
                self.z = 0.0;
            }
            ChaosType::Lorenz => {
                self.x = self.x0 * 2.0 - 1.0;
                self.y = 1.0;
                self.z = 1.0;
            }
        }
    }

    fn diverged(&self) -> bool {
        !(self.x.is_finite() && self.y.is_finite() && self.z.is_finite())
            || self.x.abs().max(self.y.abs()).max(self.z.abs()) > DIVERGENCE
    }

    fn logistic(&mut self) -> f64 {
        let x = self.parameter * self.x * (1.0 - self.x);
        // Fixed points at the boundary would pin the map forever.
        self.x = if x > 0.0 && x < 1.0 { x } else { self.x0 };
        x.clamp(0.0, 1.0)
    }

    fn henon(&mut self) -> f64 {
        let x = 1.0 - self.parameter * self.x * self.x + self.y;
        self.y = HENON_B * self.x;
        self.x = x;
        if self.diverged() {
            self.restart();
        }
        ((self.x + 1.5) / 3.0).clamp(0.0, 1.0)
    }

    fn lorenz(&mut self) -> f64 {
        let rho = self.parameter * LORENZ_RHO_SCALE;
        let dx = LORENZ_SIGMA * (self.y - self.x);
        let dy = self.x * (rho - self.z) - self.y;
        let dz = self.x * self.y - LORENZ_BETA * self.z;
        self.x += dx * LORENZ_DT;
        self.y += dy * LORENZ_DT;
        self.z += dz * LORENZ_DT;
        if self.diverged() {
            self.restart();
        }
        ((self.x + 20.0) / 40.0).clamp(0.0, 1.0)
    }
}

impl ParameterGenerator for ChaoticGenerator {
    fn next_value(&mut self) -> f64 {
        match self.kind {
            ChaosType::Logistic => self.logistic(),
            ChaosType::Henon => self.henon(),
            ChaosType::Lorenz => self.lorenz(),
        }
    }

    fn reset(&mut self) {
        self.restart();
    }

    /// The seed picks the starting point inside the basin of each map.
    fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
        let mut rng = StdRng::seed_from_u64(seed);
        self.x0 = rng.random_range(0.1..0.9);
        self.restart();
    }
}
