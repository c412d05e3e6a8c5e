//! BSP tree
//!
//! The tree covers a fixed box and pre-allocates every branch a complete tree
//! of its depth could need. Leaves whose boxes escape the fixed box go to the
//! `infinite` list and are reported by every query.
//!
//! Per tick the owner calls `clear_leaves`, `prune`, then re-inserts every
//! live object and runs its queries. Nothing is ever freed mid-run; branches
//! only move between the pool's free and used lists.

use crate::core::{Error, Result};
use crate::math::{BspAabb, OctBb};

use super::branch::{self, BspBranch};
use super::config::{BspConfig, PruneMode};
use super::leaf::{BspLeaf, BspLeafList, LeafBuffer, LeafId};
use super::pool::{BranchId, BranchPool};

/// Branch count of a complete `2^dimensions`-ary tree with levels `0..=depth`
///
/// `None` when `dimensions * (depth + 1)` exceeds 31 bits or `dimensions`
/// is zero.
pub fn count_nodes(dimensions: usize, depth: usize) -> Option<usize> {
    if dimensions == 0 {
        return None;
    }
    let bits = dimensions.checked_mul(depth.checked_add(1)?)?;
    if bits > 31 {
        return None;
    }
    let total = (1usize << bits) - 1;
    let per_level = (1usize << dimensions) - 1;
    Some(total / per_level)
}

/// Where an inserted leaf ended up
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    /// Outside the tree's fixed extent
    Infinite,
    /// In the node list of a branch at this depth
    Branch { depth: usize },
}

/// Snapshot of tree occupancy
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TreeStats {
    pub branch_capacity: usize,
    pub branches_used: usize,
    pub branches_free: usize,
    /// Registered leaves, linked or not
    pub leaves: usize,
    /// Leaves currently linked into the tree, infinite list included
    pub inserted: usize,
    pub infinite: usize,
}

/// N-dimensional BSP tree over leaves carrying a `T`
pub struct BspTree<T> {
    dimensions: usize,
    max_depth: usize,
    bbox: BspAabb,
    pool: BranchPool,
    root: Option<BranchId>,
    infinite: BspLeafList,
    leaves: Vec<BspLeaf<T>>,
}

impl<T> BspTree<T> {
    /// Build an empty tree and its branch pool
    pub fn new(config: &BspConfig) -> Result<Self> {
        config.validate()?;
        let capacity = config.pool_capacity()?;

        log::info!(
            "Created BSP tree: {} dimensions, depth {}, {} pooled branches",
            config.dimensions,
            config.max_depth,
            capacity
        );

        Ok(Self {
            dimensions: config.dimensions,
            max_depth: config.max_depth,
            bbox: config.bounds(),
            pool: BranchPool::new(capacity, config.dimensions),
            root: None,
            infinite: BspLeafList::new(config.dimensions),
            leaves: Vec::new(),
        })
    }

    /// Tree over `bounds` with default settings otherwise
    pub fn with_bounds(max_depth: usize, bounds: &BspAabb) -> Result<Self> {
        Self::new(&BspConfig::for_bounds(bounds.dimensions(), max_depth, bounds.mins(), bounds.maxs()))
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Fixed extent covered by the branches
    pub fn bbox(&self) -> &BspAabb {
        &self.bbox
    }

    pub fn root(&self) -> Option<BranchId> {
        self.root
    }

    pub fn infinite(&self) -> &BspLeafList {
        &self.infinite
    }

    pub fn pool(&self) -> &BranchPool {
        &self.pool
    }

    pub fn branch(&self, id: BranchId) -> Option<&BspBranch> {
        self.pool.get(id)
    }

    pub fn leaf(&self, id: LeafId) -> Option<&BspLeaf<T>> {
        self.leaves.get(id.index())
    }

    pub fn leaves(&self) -> &[BspLeaf<T>] {
        &self.leaves
    }

    /// Register a new leaf. It starts unlinked with an invalid box.
    pub fn add_leaf(&mut self, data: T) -> LeafId {
        let id = LeafId(self.leaves.len() as u32);
        self.leaves.push(BspLeaf::new(data, self.dimensions));
        id
    }

    /// Replace a leaf's box. The leaf must not be linked.
    pub fn set_leaf_bbox(&mut self, id: LeafId, bbox: BspAabb) -> Result<()> {
        if bbox.dimensions() != self.dimensions {
            return Err(Error::DimensionMismatch {
                expected: self.dimensions,
                actual: bbox.dimensions(),
            });
        }
        let leaf = self.leaves.get_mut(id.index()).ok_or(Error::UnknownLeaf(id))?;
        if leaf.is_inserted() {
            return Err(Error::AlreadyInserted(id));
        }
        leaf.set_bbox(bbox);
        Ok(())
    }

    pub fn set_leaf_oct_bb(&mut self, id: LeafId, bb: &OctBb) -> Result<()> {
        self.set_leaf_bbox(id, BspAabb::from_oct_bb(self.dimensions, bb))
    }

    /// Link a leaf into the tree
    ///
    /// Leaves outside the fixed extent go to the infinite list. A failed
    /// insertion leaves the leaf unlinked; it is simply invisible to queries
    /// until the next successful insertion.
    pub fn insert_leaf(&mut self, id: LeafId) -> Result<Placement> {
        let leaf = self.leaves.get(id.index()).ok_or(Error::UnknownLeaf(id))?;
        if leaf.is_inserted() {
            log::warn!("Rejected {}: already in the tree", id);
            return Err(Error::AlreadyInserted(id));
        }
        if !leaf.bbox().is_valid() {
            return Err(Error::InvalidBox);
        }
        let bbox = leaf.bbox().clone();

        if !self.bbox.contains(&bbox) {
            self.infinite.insert(&mut self.leaves, id)?;
            return Ok(Placement::Infinite);
        }

        let root = self.ensure_root()?;
        self.insert_leaf_rec(root, id, &bbox)
    }

    fn ensure_root(&mut self) -> Result<BranchId> {
        if let Some(root) = self.root.filter(|&root| self.pool.is_live(root)) {
            return Ok(root);
        }

        let capacity = self.pool.capacity();
        let root = self.pool.allocate().ok_or(Error::PoolExhausted { capacity })?;
        let branch = self.pool.get_mut(root).ok_or(Error::StaleBranch)?;
        branch.bsp_bbox = self.bbox.clone();
        branch.depth = Some(0);
        self.root = Some(root);
        Ok(root)
    }

    fn insert_leaf_rec(&mut self, id: BranchId, leaf: LeafId, bbox: &BspAabb) -> Result<Placement> {
        let branch = self.pool.get(id).ok_or(Error::StaleBranch)?;
        let depth = branch.depth().unwrap_or(0);

        let cell = if depth >= self.max_depth {
            None
        } else {
            match branch.child_index_for(bbox) {
                Ok(cell) => cell,
                Err(err) => {
                    log::error!("{} escaped branch {} at depth {}: {}", leaf, id.index(), depth, err);
                    debug_assert!(!self.bbox.contains(bbox), "contained leaf escaped its branch");
                    return Err(err);
                }
            }
        };

        let Some(cell) = cell else {
            let branch = self.pool.get_mut(id).ok_or(Error::StaleBranch)?;
            branch.nodes.insert(&mut self.leaves, leaf)?;
            return Ok(Placement::Branch { depth });
        };

        let child = branch::ensure_child(&mut self.pool, id, cell)?;
        let placement = self.insert_leaf_rec(child, leaf, bbox)?;
        if let Some(branch) = self.pool.get_mut(id) {
            branch.children.record_insert(bbox);
        }
        Ok(placement)
    }

    /// Unlink every leaf, keeping the branch skeleton for reuse
    pub fn clear_leaves(&mut self) {
        self.infinite.reset(&mut self.leaves);
        for id in self.pool.used_ids() {
            if let Some(branch) = self.pool.get_mut(id) {
                branch.nodes.reset(&mut self.leaves);
                branch.children.clear_aggregate();
            }
        }
    }

    /// Unlink every leaf; with `recursive` also return every branch,
    /// root included, to the pool
    pub fn clear(&mut self, recursive: bool) {
        self.clear_leaves();
        if recursive {
            let released = self.pool.release_all();
            self.root = None;
            log::debug!("Cleared BSP tree, {} branches returned to the pool", released);
        }
    }

    /// Return empty non-root branches to the pool
    pub fn prune(&mut self, mode: PruneMode) -> usize {
        let released = match mode {
            PruneMode::Shallow => self.prune_shallow(),
            PruneMode::Recursive => match self.root {
                Some(root) => branch::prune_recursive(&mut self.pool, &mut self.leaves, root, root),
                None => 0,
            },
        };

        if released > 0 {
            log::debug!(
                "Pruned {} branches ({:?}), {} still in use",
                released,
                mode,
                self.pool.used_count()
            );
        }
        released
    }

    fn prune_shallow(&mut self) -> usize {
        let mut released = 0;
        for id in self.pool.used_ids() {
            if Some(id) == self.root {
                continue;
            }
            if !self.pool.get(id).is_some_and(BspBranch::is_empty) {
                continue;
            }
            branch::unlink(&mut self.pool, &mut self.leaves, id);
            if self.pool.release(id) {
                released += 1;
            }
        }
        released
    }

    /// Collect candidate leaves for `query` into `out`
    ///
    /// `out` is cleared first. Infinite leaves are always reported. Returns
    /// the number of leaves collected, capped by the buffer capacity.
    pub fn collide(&self, query: &BspAabb, out: &mut LeafBuffer) -> usize {
        out.clear();
        if out.capacity() == 0 || !query.is_valid() {
            return 0;
        }

        self.infinite.collect_all(&self.leaves, out);
        if let Some(root) = self.root {
            branch::collide(&self.pool, &self.leaves, root, query, out);
        }
        out.len()
    }

    pub fn collide_oct_bb(&self, query: &OctBb, out: &mut LeafBuffer) -> usize {
        self.collide(&BspAabb::from_oct_bb(self.dimensions, query), out)
    }

    pub fn stats(&self) -> TreeStats {
        TreeStats {
            branch_capacity: self.pool.capacity(),
            branches_used: self.pool.used_count(),
            branches_free: self.pool.free_count(),
            leaves: self.leaves.len(),
            inserted: self.leaves.iter().filter(|leaf| leaf.is_inserted()).count(),
            infinite: self.infinite.len(),
        }
    }
}
