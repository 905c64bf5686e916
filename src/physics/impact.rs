//! Impact events: immutable snapshots of a detected collision.

use serde::{Deserialize, Serialize};

use super::vector::Vector3;
use super::world::ObjectHandle;

/// One detected collision, carrying what the audio side needs to voice it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactEvent {
    pub position: Vector3,
    pub normal: Vector3,
    /// Normalized impact force [0, 1].
    pub force: f64,
    /// Suggested fundamental in Hz.
    pub frequency: f64,
    /// Suggested sound duration in seconds.
    pub duration: f64,
    /// Material hardness of the originating object [0, 1].
    pub hardness: f64,
    pub object: ObjectHandle,
}

impl ImpactEvent {
    pub fn new(object: ObjectHandle, position: Vector3, normal: Vector3, force: f64) -> Self {
        ImpactEvent {
            position,
            normal,
            force: force.clamp(0.0, 1.0),
            frequency: 200.0,
            duration: 0.5,
            hardness: 0.5,
            object,
        }
    }
}
