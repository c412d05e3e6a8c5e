//! BSP branches
//!
//! A branch covers a fixed box and owns up to `2^D` children, one per cell of
//! a midpoint split on every axis. Leaves that straddle a split plane stay in
//! the branch's own `nodes` list. Children are created lazily, the first time
//! a leaf needs that cell.
//!
//! Operations that follow child links work on the `BranchPool` directly,
//! since branches only refer to each other through pool handles.

use crate::core::{Error, Result};
use crate::math::BspAabb;

use super::leaf::{BspLeaf, BspLeafList, LeafBuffer};
use super::pool::{BranchId, BranchPool};

/// Fixed-size child table plus the aggregate box of leaves stored below it
#[derive(Clone, Debug)]
pub struct BranchList {
    slots: Vec<Option<BranchId>>,
    bbox: BspAabb,
    inserted: usize,
}

impl BranchList {
    pub fn new(dimensions: usize) -> Self {
        Self {
            slots: vec![None; 1 << dimensions],
            bbox: BspAabb::new(dimensions),
            inserted: 0,
        }
    }

    /// Number of child slots (`2^D`)
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True if no child slot is occupied
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    pub fn get(&self, index: usize) -> Option<BranchId> {
        self.slots.get(index).copied().flatten()
    }

    /// Occupied child handles
    pub fn iter(&self) -> impl Iterator<Item = BranchId> + '_ {
        self.slots.iter().flatten().copied()
    }

    /// Union of every leaf inserted below this branch since the last clear
    pub fn bbox(&self) -> &BspAabb {
        &self.bbox
    }

    /// Leaves inserted below this branch since the last clear
    pub fn inserted(&self) -> usize {
        self.inserted
    }

    pub(crate) fn set(&mut self, index: usize, child: Option<BranchId>) {
        self.slots[index] = child;
    }

    pub(crate) fn detach(&mut self, child: BranchId) -> bool {
        match self.slots.iter().position(|slot| *slot == Some(child)) {
            Some(pos) => {
                self.slots[pos] = None;
                true
            }
            None => false,
        }
    }

    pub(crate) fn record_insert(&mut self, bbox: &BspAabb) {
        self.bbox.self_union(bbox);
        self.inserted += 1;
    }

    pub(crate) fn clear_aggregate(&mut self) {
        self.bbox.clear();
        self.inserted = 0;
    }

    pub(crate) fn clear(&mut self) {
        self.slots.fill(None);
        self.clear_aggregate();
    }
}

/// A node of the BSP tree
#[derive(Clone, Debug)]
pub struct BspBranch {
    pub(crate) parent: Option<BranchId>,
    pub(crate) children: BranchList,
    /// Leaves that do not fit in any single child
    pub(crate) nodes: BspLeafList,
    /// Fixed extent of this branch, set when it is created
    pub(crate) bsp_bbox: BspAabb,
    /// `None` while the branch sits in the free pool
    pub(crate) depth: Option<usize>,
}

impl BspBranch {
    pub fn new(dimensions: usize) -> Self {
        Self {
            parent: None,
            children: BranchList::new(dimensions),
            nodes: BspLeafList::new(dimensions),
            bsp_bbox: BspAabb::new(dimensions),
            depth: None,
        }
    }

    pub fn parent(&self) -> Option<BranchId> {
        self.parent
    }

    pub fn children(&self) -> &BranchList {
        &self.children
    }

    pub fn nodes(&self) -> &BspLeafList {
        &self.nodes
    }

    pub fn bsp_bbox(&self) -> &BspAabb {
        &self.bsp_bbox
    }

    pub fn depth(&self) -> Option<usize> {
        self.depth
    }

    /// No children and no leaves of its own
    ///
    /// This is shallow: a branch whose only child is itself empty is still
    /// not empty.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty() && self.nodes.is_empty()
    }

    /// Pick the child cell that fully contains `bbox`
    ///
    /// `Ok(None)` means the box straddles a split plane and belongs to this
    /// branch. An error means the box is not even inside this branch.
    pub fn child_index_for(&self, bbox: &BspAabb) -> Result<Option<usize>> {
        let own = &self.bsp_bbox;
        let n = own.dimensions().min(bbox.dimensions());
        let mut index = 0;

        for axis in 0..n {
            let (lo, mid, hi) = (own.mins()[axis], own.mids()[axis], own.maxs()[axis]);
            let (min, max) = (bbox.mins()[axis], bbox.maxs()[axis]);

            if min >= lo && max <= mid {
                continue;
            } else if min >= mid && max <= hi {
                index |= 1 << axis;
            } else if min >= lo && max <= hi {
                return Ok(None);
            } else {
                return Err(Error::ExtentMismatch { axis });
            }
        }

        Ok(Some(index))
    }

    /// True if `query` encloses every leaf stored at or below this branch
    pub fn subtree_within(&self, query: &BspAabb) -> bool {
        let has_nodes = !self.nodes.is_empty();
        let has_children = self.children.inserted > 0;
        if !has_nodes && !has_children {
            return false;
        }
        (!has_nodes || query.contains(self.nodes.bbox()))
            && (!has_children || query.contains(&self.children.bbox))
    }

    /// Drop per-run state before the branch goes back to the pool.
    ///
    /// Callers must have emptied `nodes` already; leaves are not touched.
    pub(crate) fn reset(&mut self) {
        self.parent = None;
        self.children.clear();
        self.nodes.forget();
        self.bsp_bbox.clear();
        self.depth = None;
    }
}

/// Return child `index` of `parent`, creating it from the pool if needed
pub fn ensure_child(pool: &mut BranchPool, parent: BranchId, index: usize) -> Result<BranchId> {
    let (child_box, child_depth) = {
        let branch = pool.get(parent).ok_or(Error::StaleBranch)?;
        if let Some(existing) = branch.children.get(index) {
            return Ok(existing);
        }
        (branch.bsp_bbox.child(index), branch.depth.unwrap_or(0) + 1)
    };

    let capacity = pool.capacity();
    let child = pool.allocate().ok_or(Error::PoolExhausted { capacity })?;
    {
        let branch = pool.get_mut(child).ok_or(Error::StaleBranch)?;
        branch.parent = Some(parent);
        branch.bsp_bbox = child_box;
        branch.depth = Some(child_depth);
    }
    pool.get_mut(parent)
        .ok_or(Error::StaleBranch)?
        .children
        .set(index, Some(child));

    log::trace!("Created branch {} at depth {} (cell {})", child.index(), child_depth, index);
    Ok(child)
}

/// Detach a branch from its parent and drop its own links
///
/// Shallow: child branches are orphaned, not released. Callers must deal
/// with the subtree first.
pub fn unlink<T>(pool: &mut BranchPool, leaves: &mut [BspLeaf<T>], id: BranchId) -> bool {
    let Some(parent) = pool.get(id).map(BspBranch::parent) else {
        return false;
    };
    if let Some(parent) = parent {
        if let Some(branch) = pool.get_mut(parent) {
            branch.children.detach(id);
        }
    }

    let Some(branch) = pool.get_mut(id) else {
        return false;
    };
    branch.parent = None;
    branch.children.clear();
    branch.nodes.reset(leaves);
    true
}

/// Gather the leaves at or below `id` whose boxes overlap `query`
pub fn collide<T>(
    pool: &BranchPool,
    leaves: &[BspLeaf<T>],
    id: BranchId,
    query: &BspAabb,
    out: &mut LeafBuffer,
) -> usize {
    let Some(branch) = pool.get(id) else {
        return 0;
    };
    if out.is_full() || !query.overlaps(&branch.bsp_bbox) {
        return 0;
    }

    if branch.subtree_within(query) {
        return add_all(pool, leaves, id, out);
    }

    let mut found = branch.nodes.collide(leaves, query, out);

    if branch.children.inserted > 0 && query.overlaps(&branch.children.bbox) {
        for child in branch.children.iter() {
            if out.is_full() {
                break;
            }
            found += collide(pool, leaves, child, query, out);
        }
    }

    found
}

/// Gather every leaf at or below `id` without box tests
pub fn add_all<T>(pool: &BranchPool, leaves: &[BspLeaf<T>], id: BranchId, out: &mut LeafBuffer) -> usize {
    let Some(branch) = pool.get(id) else {
        return 0;
    };

    let mut added = branch.nodes.collect_all(leaves, out);
    for child in branch.children.iter() {
        if out.is_full() {
            break;
        }
        added += add_all(pool, leaves, child, out);
    }
    added
}

/// Post-order collapse of empty branches below (and including) `id`
///
/// `keep` is never released, even when empty. Returns the number of
/// branches given back to the pool.
pub fn prune_recursive<T>(
    pool: &mut BranchPool,
    leaves: &mut [BspLeaf<T>],
    id: BranchId,
    keep: BranchId,
) -> usize {
    let Some(slot_count) = pool.get(id).map(|b| b.children.len()) else {
        return 0;
    };

    let mut released = 0;
    for index in 0..slot_count {
        if let Some(child) = pool.get(id).and_then(|b| b.children.get(index)) {
            released += prune_recursive(pool, leaves, child, keep);
        }
    }

    if id != keep && pool.get(id).is_some_and(BspBranch::is_empty) {
        unlink(pool, leaves, id);
        if pool.release(id) {
            released += 1;
        }
    }
    released
}
