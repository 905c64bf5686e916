//! Physics → audio integration.
//!
//! Contacts recorded by the [`PhysicsWorld`](crate::physics::PhysicsWorld)
//! become [`ImpactEvent`](crate::physics::ImpactEvent)s in a bounded queue;
//! the sandbox drains the queue into impact voices and the resonator.

pub mod impact_synth;
pub mod mapper;
pub mod queue;
pub mod resonance;
pub mod sandbox;

pub use impact_synth::ImpactSynthesizer;
pub use mapper::{AudioPhysicsMapper, ImpactVoicing};
pub use queue::ImpactEventQueue;
pub use resonance::ResonanceSynthesizer;
pub use sandbox::AudioPhysicsSandbox;
