//! Rigid bodies: point masses and spheres.

use serde::{Deserialize, Serialize};

use super::vector::Vector3;

/// Smallest mass an object may carry (kg).
pub const MIN_MASS: f64 = 1e-3;
/// Smallest sphere radius (m).
pub const MIN_RADIUS: f64 = 0.01;

/// Collision geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Shape {
    /// No extent; never collides with other objects, only with the ground.
    Point,
    Sphere { radius: f64 },
}

/// A rigid body with semi-implicit Euler integration.
#[derive(Debug, Clone)]
pub struct PhysicsObject {
    pub position: Vector3,
    pub velocity: Vector3,
    acceleration: Vector3,
    total_force: Vector3,
    mass: f64,
    /// Fraction of velocity lost per second [0, 1].
    damping: f64,
    /// Material hardness [0, 1]; harder surfaces ring higher.
    hardness: f64,
    shape: Shape,
}

impl PhysicsObject {
    /// A point mass. Mass is clamped to [`MIN_MASS`].
    pub fn new(mass: f64) -> Self {
        PhysicsObject {
            position: Vector3::ZERO,
            velocity: Vector3::ZERO,
            acceleration: Vector3::ZERO,
            total_force: Vector3::ZERO,
            mass: clamp_mass(mass),
            damping: 0.01,
            hardness: 0.5,
            shape: Shape::Point,
        }
    }

    /// A sphere. Radius and mass are clamped to their floors.
    pub fn sphere(radius: f64, mass: f64) -> Self {
        let mut obj = PhysicsObject::new(mass);
        obj.shape = Shape::Sphere {
            radius: clamp_radius(radius),
        };
        obj
    }

    pub fn with_position(mut self, position: Vector3) -> Self {
        self.position = position;
        self
    }

    pub fn with_velocity(mut self, velocity: Vector3) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_damping(mut self, damping: f64) -> Self {
        self.set_damping(damping);
        self
    }

    pub fn with_hardness(mut self, hardness: f64) -> Self {
        self.set_hardness(hardness);
        self
    }

    /// Advance by `dt` seconds: a = ΣF/m, v += a·dt, p += v·dt, then damping.
    pub fn update(&mut self, dt: f64) {
        self.acceleration = self.total_force * (1.0 / self.mass);
        self.velocity += self.acceleration * dt;
        self.position += self.velocity * dt;
        self.total_force = Vector3::ZERO;

        if self.damping > 0.0 {
            self.velocity = self.velocity * (1.0 - self.damping).powf(dt);
        }
    }

    /// Accumulate a force for the next update.
    pub fn apply_force(&mut self, force: Vector3) {
        self.total_force += force;
    }

    /// Instantaneous velocity change of `impulse / mass`.
    pub fn apply_impulse(&mut self, impulse: Vector3) {
        self.velocity += impulse * (1.0 / self.mass);
    }

    pub fn acceleration(&self) -> Vector3 {
        self.acceleration
    }

    pub fn speed(&self) -> f64 {
        self.velocity.magnitude()
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn set_mass(&mut self, mass: f64) {
        self.mass = clamp_mass(mass);
    }

    pub fn damping(&self) -> f64 {
        self.damping
    }

    pub fn set_damping(&mut self, damping: f64) {
        self.damping = clamp_unit(damping);
    }

    pub fn hardness(&self) -> f64 {
        self.hardness
    }

    pub fn set_hardness(&mut self, hardness: f64) {
        self.hardness = clamp_unit(hardness);
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Radius for spheres, `None` for point masses.
    pub fn radius(&self) -> Option<f64> {
        match self.shape {
            Shape::Sphere { radius } => Some(radius),
            Shape::Point => None,
        }
    }

    pub fn set_radius(&mut self, radius: f64) {
        if let Shape::Sphere { .. } = self.shape {
            self.shape = Shape::Sphere {
                radius: clamp_radius(radius),
            };
        }
    }

    /// Extent below the centre used by the ground test. Zero for point masses.
    pub fn extent(&self) -> f64 {
        self.radius().unwrap_or(0.0)
    }

    /// Sphere/sphere overlap test.
    ///
    /// Returns the combined momentum magnitude of the pair when the centre
    /// distance is less than the sum of radii.
    pub fn check_collision(&self, other: &PhysicsObject) -> Option<f64> {
        let (ra, rb) = (self.radius()?, other.radius()?);
        let distance = (other.position - self.position).magnitude();
        if distance < ra + rb {
            Some(self.calculate_impact_force() + other.calculate_impact_force())
        } else {
            None
        }
    }

    /// Momentum magnitude `m·|v|`.
    pub fn calculate_impact_force(&self) -> f64 {
        self.mass * self.speed()
    }
}

fn clamp_mass(mass: f64) -> f64 {
    if mass.is_finite() { mass.max(MIN_MASS) } else { MIN_MASS }
}

fn clamp_radius(radius: f64) -> f64 {
    if radius.is_finite() { radius.max(MIN_RADIUS) } else { MIN_RADIUS }
}

fn clamp_unit(v: f64) -> f64 {
    if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_mass_and_radius_clamped() {
        let obj = PhysicsObject::sphere(-1.0, 0.0);
        assert_eq!(obj.mass(), MIN_MASS);
        assert_eq!(obj.radius(), Some(MIN_RADIUS));

        let obj = PhysicsObject::new(f64::NAN);
        assert_eq!(obj.mass(), MIN_MASS);
    }

    #[test]
    fn damping_clamped_to_unit_range() {
        let obj = PhysicsObject::new(1.0).with_damping(3.0);
        assert_eq!(obj.damping(), 1.0);
        let obj = PhysicsObject::new(1.0).with_damping(-0.5);
        assert_eq!(obj.damping(), 0.0);
    }

    #[test]
    fn force_integrates_semi_implicitly() {
        let mut obj = PhysicsObject::new(2.0).with_damping(0.0);
        obj.apply_force(Vector3::new(4.0, 0.0, 0.0));
        obj.update(0.5);
        // a = 2, v = 1, p = v·dt = 0.5
        assert!((obj.acceleration().x - 2.0).abs() < 1e-12);
        assert!((obj.velocity.x - 1.0).abs() < 1e-12);
        assert!((obj.position.x - 0.5).abs() < 1e-12);

        // Force is cleared after the step
        obj.update(0.5);
        assert!((obj.velocity.x - 1.0).abs() < 1e-12);
    }

    #[test]
    fn impulse_changes_velocity_by_inverse_mass() {
        let mut obj = PhysicsObject::new(4.0);
        obj.apply_impulse(Vector3::new(0.0, 8.0, 0.0));
        assert!((obj.velocity.y - 2.0).abs() < 1e-12);
    }

    #[test]
    fn damping_is_step_size_independent() {
        let mut coarse = PhysicsObject::new(1.0)
            .with_velocity(Vector3::new(1.0, 0.0, 0.0))
            .with_damping(0.5);
        let mut fine = coarse.clone();
        coarse.update(1.0);
        for _ in 0..100 {
            fine.update(0.01);
        }
        assert!(
            (coarse.velocity.x - fine.velocity.x).abs() < 1e-9,
            "coarse {} vs fine {}",
            coarse.velocity.x,
            fine.velocity.x
        );
        assert!((coarse.velocity.x - 0.5).abs() < 1e-12);
    }

    #[test]
    fn sphere_collision_is_geometric() {
        let a = PhysicsObject::sphere(0.5, 1.0);
        let b = PhysicsObject::sphere(0.5, 1.0).with_position(Vector3::new(0.9, 0.0, 0.0));
        let c = PhysicsObject::sphere(0.5, 1.0).with_position(Vector3::new(1.1, 0.0, 0.0));
        assert!(a.check_collision(&b).is_some());
        assert!(a.check_collision(&c).is_none());
    }

    #[test]
    fn points_never_collide_with_spheres() {
        let a = PhysicsObject::new(1.0);
        let b = PhysicsObject::sphere(0.5, 1.0);
        assert!(a.check_collision(&b).is_none());
        assert!(b.check_collision(&a).is_none());
    }
}
