//! Characters, particles and the swept-volume contract

use std::fmt;

use glam::Vec3;

use crate::math::{Bumper, OctBb, OctVec};

/// Slot index of a character in an `ObjectSet`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CharacterId(pub u32);

/// Slot index of a particle in an `ObjectSet`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticleId(pub u32);

/// Payload of a BSP leaf: which object the leaf stands for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectRef {
    Character(CharacterId),
    Particle(ParticleId),
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectRef::Character(id) => write!(f, "character #{}", id.0),
            ObjectRef::Particle(id) => write!(f, "particle #{}", id.0),
        }
    }
}

impl From<CharacterId> for ObjectRef {
    fn from(id: CharacterId) -> Self {
        ObjectRef::Character(id)
    }
}

impl From<ParticleId> for ObjectRef {
    fn from(id: ParticleId) -> Self {
        ObjectRef::Particle(id)
    }
}

/// Anything that moves through the world with a bounding volume
pub trait SweptBody {
    fn position(&self) -> Vec3;

    fn velocity(&self) -> Vec3;

    /// Bounding volume relative to `position`
    fn bounds(&self) -> OctBb;

    /// Volume covered while moving from `dt_begin` to `dt_end` of the tick
    ///
    /// Position is extrapolated linearly from the current velocity.
    fn expand_bounding_box_for_tick(&self, dt_begin: f32, dt_end: f32) -> OctBb {
        let base = self.bounds();
        if base.is_empty() {
            return OctBb::EMPTY;
        }

        let start = self.position() + self.velocity() * dt_begin;
        let end = self.position() + self.velocity() * dt_end;
        OctBb::union(
            &base.add_vector(OctVec::from_vec3(start)),
            &base.add_vector(OctVec::from_vec3(end)),
        )
    }
}

/// A character in the world
#[derive(Clone, Debug, PartialEq)]
pub struct Character {
    pub position: Vec3,
    pub velocity: Vec3,
    pub bumper: Bumper,
}

impl Character {
    pub fn new(position: Vec3, bumper: Bumper) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            bumper,
        }
    }

    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }
}

impl SweptBody for Character {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn velocity(&self) -> Vec3 {
        self.velocity
    }

    fn bounds(&self) -> OctBb {
        OctBb::from_bumper(self.bumper)
    }
}

/// A short-lived particle, optionally fired by a character
#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    pub position: Vec3,
    pub velocity: Vec3,
    pub bumper: Bumper,
    /// Never collides with its owner
    pub owner: Option<CharacterId>,
    /// Remaining lifetime in seconds; `None` lives until terminated
    pub lifetime: Option<f32>,
}

impl Particle {
    pub fn new(position: Vec3, velocity: Vec3, bumper: Bumper) -> Self {
        Self {
            position,
            velocity,
            bumper,
            owner: None,
            lifetime: None,
        }
    }

    pub fn with_owner(mut self, owner: CharacterId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_lifetime(mut self, seconds: f32) -> Self {
        self.lifetime = Some(seconds);
        self
    }

    pub fn is_expired(&self) -> bool {
        self.lifetime.is_some_and(|t| t <= 0.0)
    }
}

impl SweptBody for Particle {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn velocity(&self) -> Vec3 {
        self.velocity
    }

    fn bounds(&self) -> OctBb {
        OctBb::from_bumper(self.bumper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::OctAxis;

    #[test]
    fn test_still_body_sweeps_to_its_bounds() {
        let c = Character::new(Vec3::new(10.0, 20.0, 0.0), Bumper::square(1.0, 2.0));
        let swept = c.expand_bounding_box_for_tick(0.0, 1.0);
        assert_eq!(swept.mins[OctAxis::X], 9.0);
        assert_eq!(swept.maxs[OctAxis::X], 11.0);
        assert_eq!(swept.mins[OctAxis::Y], 19.0);
        assert_eq!(swept.maxs[OctAxis::Z], 2.0);
    }

    #[test]
    fn test_moving_body_sweeps_whole_path() {
        let p = Particle::new(Vec3::ZERO, Vec3::new(4.0, 0.0, 0.0), Bumper::square(0.5, 1.0));
        let swept = p.expand_bounding_box_for_tick(0.0, 1.0);
        assert_eq!(swept.mins[OctAxis::X], -0.5);
        assert_eq!(swept.maxs[OctAxis::X], 4.5);
        assert_eq!(swept.maxs[OctAxis::Y], 0.5);

        let late = p.expand_bounding_box_for_tick(0.5, 1.0);
        assert_eq!(late.mins[OctAxis::X], 1.5);
    }

    #[test]
    fn test_diamond_bumper_keeps_diagonals() {
        let c = Character::new(Vec3::new(1.0, 1.0, 0.0), Bumper::new(1.0, 1.5, 2.0));
        let swept = c.expand_bounding_box_for_tick(0.0, 0.0);
        assert!(swept.has_diagonals());
        assert_eq!(swept.mins[OctAxis::XY], 2.0 - 1.5);
        assert_eq!(swept.maxs[OctAxis::YX], 1.5);
    }

    #[test]
    fn test_expiry() {
        let mut p = Particle::new(Vec3::ZERO, Vec3::ZERO, Bumper::square(0.1, 0.1)).with_lifetime(0.1);
        assert!(!p.is_expired());
        p.lifetime = Some(0.0);
        assert!(p.is_expired());
        assert!(!Particle::new(Vec3::ZERO, Vec3::ZERO, Bumper::default()).is_expired());
    }
}
