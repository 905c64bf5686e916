//! Rigid-body simulation that produces the collisions the audio side voices.
//!
//! Semi-implicit Euler, brute-force pairwise sphere tests, and a ground plane.
//! No random sampling: the same objects and `dt` sequence always reproduce the
//! same trajectory.

pub mod impact;
pub mod object;
pub mod vector;
pub mod world;

pub use impact::ImpactEvent;
pub use object::{PhysicsObject, Shape};
pub use vector::Vector3;
pub use world::{Contact, ObjectHandle, PhysicsWorld};
