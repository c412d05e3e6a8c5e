//! Deferred spawn/terminate commands
//!
//! Collision handling walks the object set while deciding what to spawn or
//! kill. Those changes are queued here and applied once the walk is done.

use super::body::{ObjectRef, Particle, ParticleId};
use super::objects::ObjectSet;

/// A change to the object set, applied after iteration
#[derive(Clone, Debug, PartialEq)]
pub enum ObjectCommand {
    SpawnParticle(Particle),
    Terminate(ObjectRef),
}

/// What draining the queue did
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub spawned: Vec<ParticleId>,
    pub terminated: usize,
    /// Terminations aimed at objects that were already gone
    pub skipped: usize,
}

#[derive(Clone, Debug, Default)]
pub struct DeferredQueue {
    commands: Vec<ObjectCommand>,
}

impl DeferredQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: ObjectCommand) {
        self.commands.push(command);
    }

    pub fn spawn_particle(&mut self, particle: Particle) {
        self.push(ObjectCommand::SpawnParticle(particle));
    }

    pub fn terminate(&mut self, object: impl Into<ObjectRef>) {
        self.push(ObjectCommand::Terminate(object.into()));
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Apply every queued command in order and empty the queue
    pub fn drain_into(&mut self, objects: &mut ObjectSet) -> DrainReport {
        let mut report = DrainReport::default();
        for command in self.commands.drain(..) {
            match command {
                ObjectCommand::SpawnParticle(particle) => {
                    report.spawned.push(objects.spawn_particle(particle));
                }
                ObjectCommand::Terminate(object) => {
                    if objects.terminate(object) {
                        report.terminated += 1;
                    } else {
                        report.skipped += 1;
                    }
                }
            }
        }

        if report.terminated + report.spawned.len() > 0 {
            log::debug!(
                "Applied deferred commands: {} spawned, {} terminated, {} skipped",
                report.spawned.len(),
                report.terminated,
                report.skipped
            );
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Bumper;
    use crate::object::body::Character;
    use glam::Vec3;

    fn particle() -> Particle {
        Particle::new(Vec3::ZERO, Vec3::ZERO, Bumper::square(0.1, 0.1))
    }

    #[test]
    fn test_commands_wait_for_drain() {
        let mut objects = ObjectSet::new();
        let c = objects.spawn_character(Character::new(Vec3::ZERO, Bumper::square(1.0, 1.0)));

        let mut queue = DeferredQueue::new();
        queue.terminate(c);
        queue.spawn_particle(particle());
        assert_eq!(queue.len(), 2);
        assert!(objects.contains(c.into()));
        assert_eq!(objects.particle_count(), 0);

        let report = queue.drain_into(&mut objects);
        assert!(queue.is_empty());
        assert_eq!(report.terminated, 1);
        assert_eq!(report.spawned.len(), 1);
        assert!(!objects.contains(c.into()));
        assert_eq!(objects.particle_count(), 1);
    }

    #[test]
    fn test_double_terminate_is_skipped() {
        let mut objects = ObjectSet::new();
        let p = objects.spawn_particle(particle());

        let mut queue = DeferredQueue::new();
        queue.terminate(p);
        queue.terminate(p);
        let report = queue.drain_into(&mut objects);
        assert_eq!(report.terminated, 1);
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn test_commands_apply_in_order() {
        let mut objects = ObjectSet::new();
        let p = objects.spawn_particle(particle());

        // the freed slot is reused by the spawn that follows
        let mut queue = DeferredQueue::new();
        queue.terminate(p);
        queue.spawn_particle(particle().with_lifetime(1.0));
        let report = queue.drain_into(&mut objects);
        assert_eq!(report.spawned, vec![p]);
        assert_eq!(objects.particle(p).unwrap().lifetime, Some(1.0));
    }
}
