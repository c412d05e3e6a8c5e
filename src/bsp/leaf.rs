//! BSP leaves and the intrusive leaf list
//!
//! Leaves live in a flat `Vec` owned by the tree and link to each other by
//! index. A leaf belongs to at most one list at a time; lists are only ever
//! emptied wholesale with `reset`, never one item at a time.

use std::fmt;

use crate::core::{Error, Result};
use crate::math::BspAabb;

/// Index of a leaf in its tree's leaf storage
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LeafId(pub(crate) u32);

impl LeafId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for LeafId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "leaf #{}", self.0)
    }
}

/// Handle for one simulation object inside the tree
#[derive(Clone, Debug)]
pub struct BspLeaf<T> {
    data: T,
    bbox: BspAabb,
    inserted: bool,
    next: Option<LeafId>,
}

impl<T> BspLeaf<T> {
    pub fn new(data: T, dimensions: usize) -> Self {
        Self {
            data,
            bbox: BspAabb::new(dimensions),
            inserted: false,
            next: None,
        }
    }

    pub fn data(&self) -> &T {
        &self.data
    }

    pub fn bbox(&self) -> &BspAabb {
        &self.bbox
    }

    /// True while the leaf is linked into a list
    pub fn is_inserted(&self) -> bool {
        self.inserted
    }

    pub(crate) fn set_bbox(&mut self, bbox: BspAabb) {
        self.bbox = bbox;
    }
}

/// Bounded output buffer for collision queries
#[derive(Clone, Debug)]
pub struct LeafBuffer {
    ids: Vec<LeafId>,
    capacity: usize,
}

impl LeafBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            ids: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a leaf. Returns false once the buffer is full.
    pub fn push(&mut self, id: LeafId) -> bool {
        if self.is_full() {
            return false;
        }
        self.ids.push(id);
        true
    }

    pub fn is_full(&self) -> bool {
        self.ids.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn as_slice(&self) -> &[LeafId] {
        &self.ids
    }

    pub fn iter(&self) -> impl Iterator<Item = LeafId> + '_ {
        self.ids.iter().copied()
    }

    pub fn contains(&self, id: LeafId) -> bool {
        self.ids.contains(&id)
    }
}

/// Unordered singly linked list of leaves with a cumulative bounding box
#[derive(Clone, Debug)]
pub struct BspLeafList {
    head: Option<LeafId>,
    count: usize,
    bbox: BspAabb,
}

impl BspLeafList {
    pub fn new(dimensions: usize) -> Self {
        Self {
            head: None,
            count: 0,
            bbox: BspAabb::new(dimensions),
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Union of every member's box
    pub fn bbox(&self) -> &BspAabb {
        &self.bbox
    }

    /// Walk the member ids, most recently inserted first
    pub fn iter<'a, T>(&self, leaves: &'a [BspLeaf<T>]) -> LeafIter<'a, T> {
        LeafIter {
            leaves,
            cursor: self.head,
        }
    }

    /// Link a leaf at the head of the list
    pub fn insert<T>(&mut self, leaves: &mut [BspLeaf<T>], id: LeafId) -> Result<()> {
        if self.iter(leaves).any(|member| member == id) {
            log::warn!("{} is already a member of this list", id);
            return Err(Error::AlreadyInserted(id));
        }

        let leaf = leaves.get_mut(id.index()).ok_or(Error::UnknownLeaf(id))?;
        if leaf.inserted {
            log::warn!("Rejected {}: already linked into another list", id);
            return Err(Error::AlreadyInserted(id));
        }
        if !leaf.bbox.is_valid() {
            return Err(Error::InvalidBox);
        }

        leaf.next = self.head;
        leaf.inserted = true;
        self.head = Some(id);

        if self.count == 0 {
            self.bbox = leaf.bbox.clone();
        } else {
            self.bbox.self_union(&leaf.bbox);
        }
        self.count += 1;

        Ok(())
    }

    /// Unlink every member and empty the list
    pub fn reset<T>(&mut self, leaves: &mut [BspLeaf<T>]) {
        let mut cursor = self.head.take();
        while let Some(id) = cursor {
            let Some(leaf) = leaves.get_mut(id.index()) else {
                break;
            };
            cursor = leaf.next.take();
            leaf.inserted = false;
        }
        self.count = 0;
        self.bbox.clear();
    }

    /// Empty the list header without visiting members.
    ///
    /// Only valid when the members have already been unlinked.
    pub(crate) fn forget(&mut self) {
        self.head = None;
        self.count = 0;
        self.bbox.clear();
    }

    /// Append every member whose box overlaps `query`
    ///
    /// Skips the whole list when its cumulative box misses. Returns the
    /// number of leaves added; stops early once `out` is full.
    pub fn collide<T>(&self, leaves: &[BspLeaf<T>], query: &BspAabb, out: &mut LeafBuffer) -> usize {
        if self.is_empty() || !query.overlaps(&self.bbox) {
            return 0;
        }

        let mut added = 0;
        for id in self.iter(leaves) {
            if !query.overlaps(&leaves[id.index()].bbox) {
                continue;
            }
            if !out.push(id) {
                break;
            }
            added += 1;
        }
        added
    }

    /// Append every member without any box test
    pub fn collect_all<T>(&self, leaves: &[BspLeaf<T>], out: &mut LeafBuffer) -> usize {
        let mut added = 0;
        for id in self.iter(leaves) {
            if !out.push(id) {
                break;
            }
            added += 1;
        }
        added
    }
}

/// Iterator over the ids in a `BspLeafList`
pub struct LeafIter<'a, T> {
    leaves: &'a [BspLeaf<T>],
    cursor: Option<LeafId>,
}

impl<T> Iterator for LeafIter<'_, T> {
    type Item = LeafId;

    fn next(&mut self) -> Option<LeafId> {
        let id = self.cursor?;
        self.cursor = self.leaves.get(id.index()).and_then(|leaf| leaf.next);
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(data: u32, min: [f32; 2], max: [f32; 2]) -> BspLeaf<u32> {
        let mut leaf = BspLeaf::new(data, 2);
        leaf.set_bbox(BspAabb::from_corners(&min, &max));
        leaf
    }

    fn sample_leaves() -> Vec<BspLeaf<u32>> {
        vec![
            leaf(0, [0.0, 0.0], [1.0, 1.0]),
            leaf(1, [4.0, 4.0], [5.0, 5.0]),
            leaf(2, [8.0, 0.0], [9.0, 1.0]),
        ]
    }

    #[test]
    fn test_insert_tracks_count_and_bbox() {
        let mut leaves = sample_leaves();
        let mut list = BspLeafList::new(2);

        list.insert(&mut leaves, LeafId(0)).unwrap();
        assert_eq!(list.bbox(), leaves[0].bbox());

        list.insert(&mut leaves, LeafId(1)).unwrap();
        list.insert(&mut leaves, LeafId(2)).unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list.iter(&leaves).count(), 3);
        assert_eq!(list.bbox().mins(), &[0.0, 0.0]);
        assert_eq!(list.bbox().maxs(), &[9.0, 5.0]);
        assert!(leaves.iter().all(BspLeaf::is_inserted));
    }

    #[test]
    fn test_insert_rejects_linked_leaf() {
        let mut leaves = sample_leaves();
        let mut a = BspLeafList::new(2);
        let mut b = BspLeafList::new(2);

        a.insert(&mut leaves, LeafId(0)).unwrap();
        assert!(matches!(a.insert(&mut leaves, LeafId(0)), Err(Error::AlreadyInserted(_))));
        assert!(matches!(b.insert(&mut leaves, LeafId(0)), Err(Error::AlreadyInserted(_))));
        assert!(matches!(b.insert(&mut leaves, LeafId(7)), Err(Error::UnknownLeaf(_))));
        assert_eq!(a.len(), 1);
        assert!(b.is_empty());
    }

    #[test]
    fn test_insert_rejects_invalid_box() {
        let mut leaves = vec![BspLeaf::new(0u32, 2)];
        let mut list = BspLeafList::new(2);
        assert!(matches!(list.insert(&mut leaves, LeafId(0)), Err(Error::InvalidBox)));
        assert!(!leaves[0].is_inserted());
    }

    #[test]
    fn test_reset_unlinks_everything() {
        let mut leaves = sample_leaves();
        let mut list = BspLeafList::new(2);
        for i in 0..3 {
            list.insert(&mut leaves, LeafId(i)).unwrap();
        }

        list.reset(&mut leaves);
        assert!(list.is_empty());
        assert!(!list.bbox().is_valid());
        assert!(leaves.iter().all(|l| !l.is_inserted()));

        // leaves can be relinked after a reset
        list.insert(&mut leaves, LeafId(1)).unwrap();
        assert_eq!(list.iter(&leaves).collect::<Vec<_>>(), vec![LeafId(1)]);
    }

    #[test]
    fn test_collide_filters_by_box() {
        let mut leaves = sample_leaves();
        let mut list = BspLeafList::new(2);
        for i in 0..3 {
            list.insert(&mut leaves, LeafId(i)).unwrap();
        }

        let mut out = LeafBuffer::new(8);
        let query = BspAabb::from_corners(&[3.0, 3.0], &[10.0, 6.0]);
        assert_eq!(list.collide(&leaves, &query, &mut out), 1);
        assert_eq!(out.as_slice(), &[LeafId(1)]);

        out.clear();
        let miss = BspAabb::from_corners(&[20.0, 20.0], &[30.0, 30.0]);
        assert_eq!(list.collide(&leaves, &miss, &mut out), 0);
    }

    #[test]
    fn test_collide_stops_when_buffer_full() {
        let mut leaves = sample_leaves();
        let mut list = BspLeafList::new(2);
        for i in 0..3 {
            list.insert(&mut leaves, LeafId(i)).unwrap();
        }

        let mut out = LeafBuffer::new(2);
        let everything = BspAabb::from_corners(&[-1.0, -1.0], &[10.0, 10.0]);
        assert_eq!(list.collide(&leaves, &everything, &mut out), 2);
        assert!(out.is_full());
        assert!(!out.push(LeafId(0)));
    }

    #[test]
    fn test_collect_all_ignores_boxes() {
        let mut leaves = sample_leaves();
        let mut list = BspLeafList::new(2);
        list.insert(&mut leaves, LeafId(2)).unwrap();

        let mut out = LeafBuffer::new(4);
        assert_eq!(list.collect_all(&leaves, &mut out), 1);
        assert!(out.contains(LeafId(2)));
    }
}
