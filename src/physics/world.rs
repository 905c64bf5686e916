//! Physics world: owns the objects, integrates them, and resolves contacts.
//!
//! Objects live in a generational arena and are addressed by [`ObjectHandle`].
//! Anything else that needs to follow an object (the impact monitor, a host
//! scene) keeps a handle, so removing an object never leaves a dangling
//! reference: stale handles simply stop resolving.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::PhysicsConfig;

use super::object::PhysicsObject;
use super::vector::Vector3;

/// Contacts retained between drains. Older contacts are kept, newer ones dropped.
const MAX_PENDING_CONTACTS: usize = 4096;

/// Stable handle to an object registered in a [`PhysicsWorld`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectHandle {
    index: u32,
    generation: u32,
}

impl ObjectHandle {
    /// Compact numeric id, unique among live objects.
    pub fn id(&self) -> u64 {
        ((self.generation as u64) << 32) | self.index as u64
    }
}

/// A collision resolved during [`PhysicsWorld::simulate_step`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub object: ObjectHandle,
    /// The other body, or `None` for the ground plane.
    pub other: Option<ObjectHandle>,
    pub point: Vector3,
    /// Unit normal pointing from `other` towards `object`.
    pub normal: Vector3,
    /// Relative speed along the normal before resolution (m/s, ≥ 0).
    pub closing_speed: f64,
    /// m1·m2/(m1+m2); the object's own mass for ground contacts.
    pub reduced_mass: f64,
    /// Magnitude of the applied impulse (N·s).
    pub impulse: f64,
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    object: Option<PhysicsObject>,
}

/// Rigid-body world with gravity, sphere collisions and a ground plane.
#[derive(Debug, Clone)]
pub struct PhysicsWorld {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
    gravity: Vector3,
    ground_height: f64,
    ground_restitution: f64,
    collision_restitution: f64,
    rest_speed: f64,
    contacts: Vec<Contact>,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        PhysicsWorld::new(&PhysicsConfig::default())
    }
}

impl PhysicsWorld {
    pub fn new(config: &PhysicsConfig) -> Self {
        let config = config.sanitized();
        PhysicsWorld {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
            gravity: config.gravity,
            ground_height: config.ground_height,
            ground_restitution: config.ground_restitution,
            collision_restitution: config.collision_restitution,
            rest_speed: config.rest_speed,
            contacts: Vec::new(),
        }
    }

    /// Register an object and return its handle.
    pub fn add_object(&mut self, object: PhysicsObject) -> ObjectHandle {
        self.live += 1;
        let handle = if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.object = Some(object);
            ObjectHandle {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                object: Some(object),
            });
            ObjectHandle {
                index,
                generation: 0,
            }
        };
        debug!(target: "physics", "added object {} ({} live)", handle.id(), self.live);
        handle
    }

    /// Unregister an object. Unknown or stale handles are ignored.
    pub fn remove_object(&mut self, handle: ObjectHandle) -> Option<PhysicsObject> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let object = slot.object.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.live -= 1;
        debug!(target: "physics", "removed object {} ({} live)", handle.id(), self.live);
        Some(object)
    }

    pub fn get(&self, handle: ObjectHandle) -> Option<&PhysicsObject> {
        self.slots
            .get(handle.index as usize)
            .filter(|s| s.generation == handle.generation)
            .and_then(|s| s.object.as_ref())
    }

    pub fn get_mut(&mut self, handle: ObjectHandle) -> Option<&mut PhysicsObject> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|s| s.generation == handle.generation)
            .and_then(|s| s.object.as_mut())
    }

    pub fn contains(&self, handle: ObjectHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Iterate over all live objects with their handles.
    pub fn objects(&self) -> impl Iterator<Item = (ObjectHandle, &PhysicsObject)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.object.as_ref().map(|obj| {
                (
                    ObjectHandle {
                        index: i as u32,
                        generation: slot.generation,
                    },
                    obj,
                )
            })
        })
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn gravity(&self) -> Vector3 {
        self.gravity
    }

    pub fn set_gravity(&mut self, gravity: Vector3) {
        if gravity.is_finite() {
            self.gravity = gravity;
        }
    }

    pub fn ground_height(&self) -> f64 {
        self.ground_height
    }

    pub fn set_collision_restitution(&mut self, restitution: f64) {
        if restitution.is_finite() {
            self.collision_restitution = restitution.clamp(0.0, 1.0);
        }
    }

    pub fn set_ground_restitution(&mut self, restitution: f64) {
        if restitution.is_finite() {
            self.ground_restitution = restitution.clamp(0.0, 1.0);
        }
    }

    /// Contacts recorded since the last drain, oldest first.
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    /// Take every contact recorded since the last drain.
    pub fn drain_contacts(&mut self) -> Vec<Contact> {
        std::mem::take(&mut self.contacts)
    }

    /// Advance every object by `dt` seconds.
    ///
    /// Order: gravity, integration, pairwise sphere collisions (O(n²)),
    /// ground plane. Non-positive or non-finite `dt` is a no-op.
    pub fn simulate_step(&mut self, dt: f64) {
        if !(dt.is_finite() && dt > 0.0) {
            return;
        }

        let gravity = self.gravity;
        for obj in self.slots.iter_mut().filter_map(|s| s.object.as_mut()) {
            obj.apply_force(gravity * obj.mass());
            obj.update(dt);
        }

        self.detect_collisions();
        self.apply_ground_constraint();
    }

    fn detect_collisions(&mut self) {
        let live: Vec<usize> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.object.as_ref().is_some_and(|o| o.radius().is_some()))
            .map(|(i, _)| i)
            .collect();

        for (n, &i) in live.iter().enumerate() {
            for &j in &live[n + 1..] {
                self.resolve_pair(i, j);
            }
        }
    }

    fn resolve_pair(&mut self, i: usize, j: usize) {
        let restitution = self.collision_restitution;
        let (head, tail) = self.slots.split_at_mut(j);
        let (slot_a, slot_b) = (&mut head[i], &mut tail[0]);
        let (Some(a), Some(b)) = (slot_a.object.as_mut(), slot_b.object.as_mut()) else {
            return;
        };
        if a.check_collision(b).is_none() {
            return;
        }
        let (Some(ra), Some(rb)) = (a.radius(), b.radius()) else {
            return;
        };

        let delta = b.position - a.position;
        let distance = delta.magnitude();
        // Coincident centres have no line of centres; push apart vertically.
        let normal = if distance > 1e-9 {
            delta * (1.0 / distance)
        } else {
            Vector3::UP
        };

        let (ma, mb) = (a.mass(), b.mass());
        let total = ma + mb;
        let reduced_mass = ma * mb / total;

        let overlap = ra + rb - distance;
        if overlap > 0.0 {
            a.position -= normal * (overlap * mb / total);
            b.position += normal * (overlap * ma / total);
        }

        let closing = (b.velocity - a.velocity).dot(normal);
        if closing >= 0.0 {
            return;
        }

        let impulse = -(1.0 + restitution) * reduced_mass * closing;
        a.velocity -= normal * (impulse / ma);
        b.velocity += normal * (impulse / mb);

        let point = a.position + normal * ra;
        let handle_a = ObjectHandle {
            index: i as u32,
            generation: slot_a.generation,
        };
        let handle_b = ObjectHandle {
            index: j as u32,
            generation: slot_b.generation,
        };
        trace!(
            target: "physics",
            "sphere contact {} / {} closing={:.3} impulse={:.3}",
            handle_a.id(),
            handle_b.id(),
            -closing,
            impulse
        );
        self.record(Contact {
            object: handle_a,
            other: Some(handle_b),
            point,
            normal: -normal,
            closing_speed: -closing,
            reduced_mass,
            impulse,
        });
    }

    fn apply_ground_constraint(&mut self) {
        let ground = self.ground_height;
        let restitution = self.ground_restitution;
        let rest_speed = self.rest_speed;
        let mut recorded = Vec::new();

        for (i, slot) in self.slots.iter_mut().enumerate() {
            let Some(obj) = slot.object.as_mut() else {
                continue;
            };
            if obj.position.y >= ground {
                continue;
            }
            obj.position.y = ground;
            if obj.velocity.y >= 0.0 {
                continue;
            }

            let incoming = obj.velocity.y;
            let mut outgoing = -incoming * restitution;
            if outgoing < rest_speed {
                outgoing = 0.0;
            }
            obj.velocity.y = outgoing;

            let mass = obj.mass();
            recorded.push(Contact {
                object: ObjectHandle {
                    index: i as u32,
                    generation: slot.generation,
                },
                other: None,
                point: Vector3::new(obj.position.x, ground, obj.position.z),
                normal: Vector3::UP,
                closing_speed: -incoming,
                reduced_mass: mass,
                impulse: mass * (outgoing - incoming),
            });
        }

        for contact in recorded {
            self.record(contact);
        }
    }

    fn record(&mut self, contact: Contact) {
        if self.contacts.len() < MAX_PENDING_CONTACTS {
            self.contacts.push(contact);
        } else {
            trace!(target: "physics", "contact log full, dropping contact");
        }
    }
}
