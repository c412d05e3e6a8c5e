//! Object BSP - the per-tick broad phase over characters and particles
//!
//! Each tick `fill` clears the tree, prunes empty branches and re-inserts
//! every live object's swept volume. Queries then return candidate leaves
//! that narrow-phase code resolves back to objects.

use std::collections::{BTreeSet, HashMap};

use crate::bsp::{BspConfig, BspTree, LeafBuffer, LeafId, Placement, PruneMode, TreeStats};
use crate::core::Result;
use crate::math::OctBb;

use super::body::ObjectRef;
use super::objects::{ObjectSet, ObjectView};

/// Outcome of one `fill` pass
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FillStats {
    /// Objects linked into the tree, infinite ones included
    pub inserted: usize,
    /// Objects outside the tree extent
    pub infinite: usize,
    /// Objects left out of the broad phase this tick
    pub dropped: usize,
    /// Branches returned to the pool before filling
    pub pruned: usize,
}

/// Unordered pair of distinct objects, stored lowest first
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollisionPair {
    pub first: ObjectRef,
    pub second: ObjectRef,
}

impl CollisionPair {
    pub fn new(a: ObjectRef, b: ObjectRef) -> Self {
        if a <= b {
            Self { first: a, second: b }
        } else {
            Self { first: b, second: a }
        }
    }

    pub fn contains(&self, object: ObjectRef) -> bool {
        self.first == object || self.second == object
    }
}

/// BSP tree populated from an `ObjectSet`
pub struct ObjectBsp {
    tree: BspTree<ObjectRef>,
    /// One leaf per object slot, reused across ticks
    leaves: HashMap<ObjectRef, LeafId>,
    /// Swept volumes from the last fill
    volumes: HashMap<ObjectRef, OctBb>,
    prune_mode: PruneMode,
    buffer: LeafBuffer,
}

impl ObjectBsp {
    pub fn new(config: &BspConfig) -> Result<Self> {
        Ok(Self {
            tree: BspTree::new(config)?,
            leaves: HashMap::new(),
            volumes: HashMap::new(),
            prune_mode: config.prune_mode,
            buffer: LeafBuffer::new(config.max_collisions),
        })
    }

    pub fn tree(&self) -> &BspTree<ObjectRef> {
        &self.tree
    }

    pub fn stats(&self) -> TreeStats {
        self.tree.stats()
    }

    /// Swept volume recorded for `object` by the last fill
    pub fn volume(&self, object: ObjectRef) -> Option<&OctBb> {
        self.volumes.get(&object)
    }

    /// Rebuild the tree from every live object in `objects`
    ///
    /// Objects that cannot be inserted are counted as dropped and are
    /// invisible to queries until the next fill.
    pub fn fill(&mut self, objects: &ObjectSet, dt_begin: f32, dt_end: f32) -> FillStats {
        self.tree.clear(false);
        self.volumes.clear();

        let mut stats = FillStats {
            pruned: self.tree.prune(self.prune_mode),
            ..Default::default()
        };

        for (object, view) in objects.iter() {
            let volume = view.body().expand_bounding_box_for_tick(dt_begin, dt_end);
            if volume.is_empty() {
                stats.dropped += 1;
                continue;
            }

            let tree = &mut self.tree;
            let leaf = *self.leaves.entry(object).or_insert_with(|| tree.add_leaf(object));

            let placed = self
                .tree
                .set_leaf_oct_bb(leaf, &volume)
                .and_then(|()| self.tree.insert_leaf(leaf));

            match placed {
                Ok(placement) => {
                    stats.inserted += 1;
                    if placement == Placement::Infinite {
                        stats.infinite += 1;
                    }
                    self.volumes.insert(object, volume);
                }
                Err(err) => {
                    log::warn!("Dropped {} from the broad phase: {}", object, err);
                    stats.dropped += 1;
                }
            }
        }

        log::debug!(
            "BSP fill: {} inserted ({} infinite), {} dropped, {} pruned",
            stats.inserted,
            stats.infinite,
            stats.dropped,
            stats.pruned
        );
        stats
    }

    /// Collect candidate leaves for an arbitrary volume
    pub fn collide(&self, query: &OctBb, out: &mut LeafBuffer) -> usize {
        self.tree.collide_oct_bb(query, out)
    }

    /// Object behind a leaf returned by `collide`
    pub fn resolve(&self, leaf: LeafId) -> Option<ObjectRef> {
        self.tree.leaf(leaf).map(|leaf| *leaf.data())
    }

    /// Every pair of filled objects whose cells may touch
    ///
    /// Pairs are reported once, never pair an object with itself, and skip
    /// objects no longer present in `objects`.
    pub fn candidates(&mut self, objects: &ObjectSet) -> Vec<CollisionPair> {
        let mut queries: Vec<(ObjectRef, OctBb)> = self.volumes.iter().map(|(&o, &v)| (o, v)).collect();
        queries.sort_unstable_by_key(|(object, _)| *object);

        let mut pairs = BTreeSet::new();
        for (object, volume) in queries {
            if !objects.contains(object) {
                continue;
            }

            self.tree.collide_oct_bb(&volume, &mut self.buffer);
            if self.buffer.is_full() {
                log::debug!("Collision buffer full while querying {}", object);
            }

            for leaf in self.buffer.iter() {
                let Some(other) = self.tree.leaf(leaf).map(|leaf| *leaf.data()) else {
                    continue;
                };
                if other != object && objects.contains(other) {
                    pairs.insert(CollisionPair::new(object, other));
                }
            }
        }

        pairs.into_iter().collect()
    }

    /// Candidate pairs whose swept volumes actually intersect
    ///
    /// A particle never collides with the character that owns it.
    pub fn overlapping_pairs(&mut self, objects: &ObjectSet) -> Vec<CollisionPair> {
        let candidates = self.candidates(objects);
        candidates
            .into_iter()
            .filter(|pair| !is_owner_pair(objects, pair))
            .filter(|pair| match (self.volumes.get(&pair.first), self.volumes.get(&pair.second)) {
                (Some(a), Some(b)) => !OctBb::intersection(a, b).is_empty(),
                _ => false,
            })
            .collect()
    }
}

fn is_owner_pair(objects: &ObjectSet, pair: &CollisionPair) -> bool {
    let owner_of = |object: ObjectRef| match objects.get(object) {
        Some(ObjectView::Particle(p)) => p.owner.map(ObjectRef::Character),
        _ => None,
    };
    owner_of(pair.first) == Some(pair.second) || owner_of(pair.second) == Some(pair.first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::logging;
    use crate::math::Bumper;
    use crate::object::body::{Character, CharacterId, Particle, ParticleId};
    use glam::Vec3;

    fn config() -> BspConfig {
        BspConfig::for_bounds(3, 3, &[0.0, 0.0, 0.0], &[64.0, 64.0, 64.0])
    }

    fn character(x: f32, y: f32) -> Character {
        Character::new(Vec3::new(x, y, 0.0), Bumper::square(1.0, 2.0))
    }

    #[test]
    fn test_pair_is_unordered() {
        let a = ObjectRef::Character(CharacterId(3));
        let b = ObjectRef::Particle(ParticleId(1));
        assert_eq!(CollisionPair::new(a, b), CollisionPair::new(b, a));
        assert_eq!(CollisionPair::new(b, a).first, a);
        assert!(CollisionPair::new(a, b).contains(b));
    }

    #[test]
    fn test_fill_and_query() {
        logging::init_for_tests();
        let mut objects = ObjectSet::new();
        let c1 = objects.spawn_character(character(10.0, 10.0));
        let c2 = objects.spawn_character(character(11.0, 10.0));
        let c3 = objects.spawn_character(character(40.0, 40.0));
        let far = objects.spawn_particle(Particle::new(Vec3::new(200.0, 0.0, 0.0), Vec3::ZERO, Bumper::square(0.5, 0.5)));

        let mut bsp = ObjectBsp::new(&config()).unwrap();
        let stats = bsp.fill(&objects, 0.0, 1.0);
        assert_eq!(stats.inserted, 4);
        assert_eq!(stats.infinite, 1);
        assert_eq!(stats.dropped, 0);

        let mut out = LeafBuffer::new(16);
        let query = OctBb::axial(Vec3::new(8.0, 8.0, 0.0), Vec3::new(9.5, 9.5, 1.0));
        bsp.collide(&query, &mut out);
        let mut hits: Vec<ObjectRef> = out.iter().filter_map(|leaf| bsp.resolve(leaf)).collect();
        hits.sort();
        assert_eq!(hits, vec![c1.into(), far.into()]);

        // the infinite particle is a candidate for everyone
        let candidates = bsp.candidates(&objects);
        assert_eq!(
            candidates,
            vec![
                CollisionPair::new(c1.into(), c2.into()),
                CollisionPair::new(c1.into(), far.into()),
                CollisionPair::new(c2.into(), far.into()),
                CollisionPair::new(c3.into(), far.into()),
            ]
        );

        assert_eq!(bsp.overlapping_pairs(&objects), vec![CollisionPair::new(c1.into(), c2.into())]);
    }

    #[test]
    fn test_lone_object_has_no_pairs() {
        let mut objects = ObjectSet::new();
        objects.spawn_character(character(10.0, 10.0));

        let mut bsp = ObjectBsp::new(&config()).unwrap();
        bsp.fill(&objects, 0.0, 1.0);
        assert!(bsp.candidates(&objects).is_empty());
    }

    #[test]
    fn test_owner_never_collides_with_its_particle() {
        let mut objects = ObjectSet::new();
        let shooter = objects.spawn_character(character(10.0, 10.0));
        let target = objects.spawn_character(character(14.0, 10.0));
        let bolt = objects.spawn_particle(
            Particle::new(Vec3::new(11.0, 10.0, 0.5), Vec3::new(2.0, 0.0, 0.0), Bumper::square(0.25, 0.5))
                .with_owner(shooter),
        );

        let mut bsp = ObjectBsp::new(&config()).unwrap();
        bsp.fill(&objects, 0.0, 1.0);
        let pairs = bsp.overlapping_pairs(&objects);
        assert_eq!(pairs, vec![CollisionPair::new(target.into(), bolt.into())]);
    }

    #[test]
    fn test_terminated_objects_drop_out() {
        let mut objects = ObjectSet::new();
        let a = objects.spawn_character(character(10.0, 10.0));
        let b = objects.spawn_character(character(10.5, 10.0));

        let mut bsp = ObjectBsp::new(&config()).unwrap();
        bsp.fill(&objects, 0.0, 1.0);
        objects.terminate(b.into());
        assert!(bsp.candidates(&objects).is_empty());

        bsp.fill(&objects, 0.0, 1.0);
        assert_eq!(bsp.stats().inserted, 1);
        assert!(bsp.volume(a.into()).is_some());
        assert!(bsp.volume(b.into()).is_none());
    }

    #[test]
    fn test_refill_reuses_leaves() {
        let mut objects = ObjectSet::new();
        let mover = objects.spawn_character(character(10.0, 10.0).with_velocity(Vec3::new(8.0, 0.0, 0.0)));
        objects.spawn_character(character(50.0, 50.0));

        let mut bsp = ObjectBsp::new(&config()).unwrap();
        for _ in 0..4 {
            objects.integrate(1.0);
            let stats = bsp.fill(&objects, 0.0, 1.0);
            assert_eq!(stats.inserted, 2);
        }
        assert_eq!(bsp.tree().leaves().len(), 2);
        assert_eq!(objects.character(mover).unwrap().position.x, 42.0);
    }

    #[test]
    fn test_pool_exhaustion_drops_objects() {
        let mut config = config();
        config.branch_capacity = Some(2);
        let mut objects = ObjectSet::new();
        let center = objects.spawn_character(character(32.0, 32.0));
        let corner = objects.spawn_character(character(10.0, 10.0));

        let mut bsp = ObjectBsp::new(&config).unwrap();
        let stats = bsp.fill(&objects, 0.0, 0.0);
        assert_eq!(stats.inserted, 1);
        assert_eq!(stats.dropped, 1);
        assert!(bsp.volume(center.into()).is_some());
        assert!(bsp.volume(corner.into()).is_none());
        assert!(bsp.stats().branches_free + bsp.stats().branches_used <= 2);
    }

    #[test]
    fn test_recursive_prune_mode_reclaims_branches() {
        let mut config = config();
        config.prune_mode = PruneMode::Recursive;
        let mut objects = ObjectSet::new();
        let c = objects.spawn_character(character(10.0, 10.0));

        let mut bsp = ObjectBsp::new(&config).unwrap();
        bsp.fill(&objects, 0.0, 0.0);
        let deep = bsp.stats().branches_used;
        assert!(deep > 1);

        objects.terminate(c.into());
        let stats = bsp.fill(&objects, 0.0, 0.0);
        assert_eq!(stats.pruned, deep - 1);
        assert_eq!(bsp.stats().branches_used, 1);
    }
}
