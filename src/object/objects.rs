//! Live character and particle collections

use crate::math::OctBb;

use super::body::{Character, CharacterId, ObjectRef, Particle, ParticleId, SweptBody};

/// Borrowed view of one live object
#[derive(Clone, Copy, Debug)]
pub enum ObjectView<'a> {
    Character(&'a Character),
    Particle(&'a Particle),
}

impl ObjectView<'_> {
    pub fn body(&self) -> &dyn SweptBody {
        match self {
            ObjectView::Character(c) => *c,
            ObjectView::Particle(p) => *p,
        }
    }
}

/// Slot storage that hands freed indices back out
#[derive(Clone, Debug)]
struct Slots<T> {
    items: Vec<Option<T>>,
    free: Vec<u32>,
}

impl<T> Default for Slots<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            free: Vec::new(),
        }
    }
}

impl<T> Slots<T> {
    fn insert(&mut self, item: T) -> u32 {
        if let Some(index) = self.free.pop() {
            self.items[index as usize] = Some(item);
            return index;
        }
        self.items.push(Some(item));
        (self.items.len() - 1) as u32
    }

    fn remove(&mut self, index: u32) -> Option<T> {
        let item = self.items.get_mut(index as usize)?.take()?;
        self.free.push(index);
        Some(item)
    }

    fn get(&self, index: u32) -> Option<&T> {
        self.items.get(index as usize)?.as_ref()
    }

    fn get_mut(&mut self, index: u32) -> Option<&mut T> {
        self.items.get_mut(index as usize)?.as_mut()
    }

    fn len(&self) -> usize {
        self.items.len() - self.free.len()
    }

    fn iter(&self) -> impl Iterator<Item = (u32, &T)> + '_ {
        self.items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| item.as_ref().map(|item| (i as u32, item)))
    }

    fn iter_mut(&mut self) -> impl Iterator<Item = (u32, &mut T)> + '_ {
        self.items
            .iter_mut()
            .enumerate()
            .filter_map(|(i, item)| item.as_mut().map(|item| (i as u32, item)))
    }
}

/// Every active character and particle in the simulation
#[derive(Clone, Debug, Default)]
pub struct ObjectSet {
    characters: Slots<Character>,
    particles: Slots<Particle>,
}

impl ObjectSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn_character(&mut self, character: Character) -> CharacterId {
        CharacterId(self.characters.insert(character))
    }

    pub fn spawn_particle(&mut self, particle: Particle) -> ParticleId {
        ParticleId(self.particles.insert(particle))
    }

    /// Remove an object. Returns false if it was already gone.
    pub fn terminate(&mut self, object: ObjectRef) -> bool {
        match object {
            ObjectRef::Character(id) => self.characters.remove(id.0).is_some(),
            ObjectRef::Particle(id) => self.particles.remove(id.0).is_some(),
        }
    }

    pub fn get(&self, object: ObjectRef) -> Option<ObjectView<'_>> {
        match object {
            ObjectRef::Character(id) => self.characters.get(id.0).map(ObjectView::Character),
            ObjectRef::Particle(id) => self.particles.get(id.0).map(ObjectView::Particle),
        }
    }

    pub fn character(&self, id: CharacterId) -> Option<&Character> {
        self.characters.get(id.0)
    }

    pub fn character_mut(&mut self, id: CharacterId) -> Option<&mut Character> {
        self.characters.get_mut(id.0)
    }

    pub fn particle(&self, id: ParticleId) -> Option<&Particle> {
        self.particles.get(id.0)
    }

    pub fn particle_mut(&mut self, id: ParticleId) -> Option<&mut Particle> {
        self.particles.get_mut(id.0)
    }

    pub fn contains(&self, object: ObjectRef) -> bool {
        self.get(object).is_some()
    }

    pub fn character_count(&self) -> usize {
        self.characters.len()
    }

    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    pub fn len(&self) -> usize {
        self.character_count() + self.particle_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live objects, characters first, each in slot order
    pub fn iter(&self) -> impl Iterator<Item = (ObjectRef, ObjectView<'_>)> + '_ {
        let characters = self
            .characters
            .iter()
            .map(|(i, c)| (ObjectRef::Character(CharacterId(i)), ObjectView::Character(c)));
        let particles = self
            .particles
            .iter()
            .map(|(i, p)| (ObjectRef::Particle(ParticleId(i)), ObjectView::Particle(p)));
        characters.chain(particles)
    }

    /// Swept volume of one object over `[dt_begin, dt_end]`
    pub fn swept_bounds(&self, object: ObjectRef, dt_begin: f32, dt_end: f32) -> Option<OctBb> {
        self.get(object)
            .map(|view| view.body().expand_bounding_box_for_tick(dt_begin, dt_end))
    }

    /// Advance every object by `dt` and age particles
    ///
    /// Returns the particles whose lifetime ran out. They are not removed;
    /// the caller decides when to terminate them.
    pub fn integrate(&mut self, dt: f32) -> Vec<ParticleId> {
        for (_, character) in self.characters.iter_mut() {
            character.position += character.velocity * dt;
        }

        let mut expired = Vec::new();
        for (index, particle) in self.particles.iter_mut() {
            particle.position += particle.velocity * dt;
            if let Some(lifetime) = particle.lifetime.as_mut() {
                *lifetime -= dt;
            }
            if particle.is_expired() {
                expired.push(ParticleId(index));
            }
        }
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Bumper, OctAxis};
    use glam::Vec3;

    fn bumper() -> Bumper {
        Bumper::square(0.5, 1.0)
    }

    #[test]
    fn test_spawn_and_terminate_reuse_slots() {
        let mut objects = ObjectSet::new();
        let a = objects.spawn_character(Character::new(Vec3::ZERO, bumper()));
        let b = objects.spawn_character(Character::new(Vec3::X, bumper()));
        assert_eq!((a, b), (CharacterId(0), CharacterId(1)));

        assert!(objects.terminate(a.into()));
        assert!(!objects.terminate(a.into()));
        assert!(!objects.contains(a.into()));
        assert_eq!(objects.character_count(), 1);

        let c = objects.spawn_character(Character::new(Vec3::Y, bumper()));
        assert_eq!(c, a);
        assert_eq!(objects.character(c).unwrap().position, Vec3::Y);
    }

    #[test]
    fn test_iter_lists_characters_then_particles() {
        let mut objects = ObjectSet::new();
        let p = objects.spawn_particle(Particle::new(Vec3::ZERO, Vec3::ZERO, bumper()));
        let c = objects.spawn_character(Character::new(Vec3::ZERO, bumper()));

        let refs: Vec<ObjectRef> = objects.iter().map(|(r, _)| r).collect();
        assert_eq!(refs, vec![c.into(), p.into()]);
        assert_eq!(objects.len(), 2);
    }

    #[test]
    fn test_integrate_moves_and_expires() {
        let mut objects = ObjectSet::new();
        let c = objects.spawn_character(Character::new(Vec3::ZERO, bumper()).with_velocity(Vec3::new(2.0, 0.0, 0.0)));
        let short = objects.spawn_particle(Particle::new(Vec3::ZERO, Vec3::Y, bumper()).with_lifetime(0.25));
        let long = objects.spawn_particle(Particle::new(Vec3::ZERO, Vec3::Y, bumper()).with_lifetime(10.0));

        let expired = objects.integrate(0.5);
        assert_eq!(expired, vec![short]);
        assert_eq!(objects.character(c).unwrap().position, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(objects.particle(long).unwrap().position, Vec3::new(0.0, 0.5, 0.0));
        // expired particles stay until the caller terminates them
        assert!(objects.contains(short.into()));
    }

    #[test]
    fn test_swept_bounds_of_missing_object() {
        let mut objects = ObjectSet::new();
        let c = objects.spawn_character(Character::new(Vec3::new(3.0, 0.0, 0.0), bumper()));
        let swept = objects.swept_bounds(c.into(), 0.0, 1.0).unwrap();
        assert_eq!(swept.mins[OctAxis::X], 2.5);

        objects.terminate(c.into());
        assert!(objects.swept_bounds(c.into(), 0.0, 1.0).is_none());
    }
}
