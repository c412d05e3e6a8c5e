//! Dimension-generic axis-aligned bounding box
//!
//! `BspAabb` keeps `mins`, `mids` and `maxs` in parallel arrays so the tree
//! can split on the midpoint of any axis without recomputing it.

use super::oct_bb::{OctAxis, OctBb};

/// Axis-aligned bounding box over `dimensions()` axes
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BspAabb {
    mins: Vec<f32>,
    mids: Vec<f32>,
    maxs: Vec<f32>,
    valid: bool,
}

impl BspAabb {
    /// Zeroed, unused box
    pub fn new(dimensions: usize) -> Self {
        Self {
            mins: vec![0.0; dimensions],
            mids: vec![0.0; dimensions],
            maxs: vec![0.0; dimensions],
            valid: false,
        }
    }

    /// Box from corners. Uses the shorter of the two slices.
    pub fn from_corners(mins: &[f32], maxs: &[f32]) -> Self {
        let dimensions = mins.len().min(maxs.len());
        let mut aabb = Self {
            mins: mins[..dimensions].to_vec(),
            mids: vec![0.0; dimensions],
            maxs: maxs[..dimensions].to_vec(),
            valid: false,
        };
        aabb.update_mids();
        aabb.validate();
        aabb
    }

    /// Project the linear slabs of an octagonal box
    ///
    /// Axes beyond Z are zero-filled. An empty source yields an invalid box.
    pub fn from_oct_bb(dimensions: usize, src: &OctBb) -> Self {
        let mut aabb = Self::new(dimensions);
        if src.is_empty() {
            return aabb;
        }
        for (i, axis) in OctAxis::LINEAR.iter().take(dimensions).enumerate() {
            aabb.mins[i] = src.mins[*axis];
            aabb.maxs[i] = src.maxs[*axis];
        }
        aabb.update_mids();
        aabb.validate();
        aabb
    }

    pub fn dimensions(&self) -> usize {
        self.mins.len()
    }

    pub fn mins(&self) -> &[f32] {
        &self.mins
    }

    pub fn mids(&self) -> &[f32] {
        &self.mids
    }

    pub fn maxs(&self) -> &[f32] {
        &self.maxs
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Recompute `valid`: every axis must satisfy `min <= mid <= max`
    pub fn validate(&mut self) -> bool {
        self.valid = (0..self.dimensions())
            .all(|i| self.mins[i] <= self.mids[i] && self.mids[i] <= self.maxs[i]);
        self.valid
    }

    /// Zero every axis and mark the box unused
    pub fn clear(&mut self) {
        self.mins.fill(0.0);
        self.mids.fill(0.0);
        self.maxs.fill(0.0);
        self.valid = false;
    }

    /// Copy the shared axes of `other`, keeping this box's dimensionality
    pub fn copy_from(&mut self, other: &BspAabb) {
        let n = self.dimensions().min(other.dimensions());
        self.clear();
        self.mins[..n].copy_from_slice(&other.mins[..n]);
        self.mids[..n].copy_from_slice(&other.mids[..n]);
        self.maxs[..n].copy_from_slice(&other.maxs[..n]);
        self.valid = other.valid;
    }

    /// Expand in place to cover `other`
    ///
    /// Axes that only one box has are left alone. An unused box takes the
    /// shape of `other`; an invalid `other` is ignored.
    pub fn self_union(&mut self, other: &BspAabb) {
        if !other.valid {
            return;
        }
        if !self.valid {
            self.copy_from(other);
            return;
        }

        let n = self.dimensions().min(other.dimensions());
        for i in 0..n {
            self.mins[i] = self.mins[i].min(other.mins[i]);
            self.maxs[i] = self.maxs[i].max(other.maxs[i]);
            self.mids[i] = (self.mins[i] + self.maxs[i]) * 0.5;
        }
        self.validate();
    }

    /// True if the boxes share at least one point on every common axis
    pub fn overlaps(&self, other: &BspAabb) -> bool {
        if !self.valid || !other.valid {
            return false;
        }
        let n = self.dimensions().min(other.dimensions());
        (0..n).all(|i| self.maxs[i] >= other.mins[i] && other.maxs[i] >= self.mins[i])
    }

    /// True if `other` lies entirely inside this box
    pub fn contains(&self, other: &BspAabb) -> bool {
        if !self.valid || !other.valid {
            return false;
        }
        let n = self.dimensions().min(other.dimensions());
        (0..n).all(|i| self.mins[i] <= other.mins[i] && other.maxs[i] <= self.maxs[i])
    }

    /// Box of child `index` after a midpoint split on every axis
    ///
    /// Bit `i` of `index` selects the high half of axis `i`.
    pub fn child(&self, index: usize) -> BspAabb {
        let mut child = BspAabb::new(self.dimensions());
        for i in 0..self.dimensions() {
            if index & (1 << i) != 0 {
                child.mins[i] = self.mids[i];
                child.maxs[i] = self.maxs[i];
            } else {
                child.mins[i] = self.mins[i];
                child.maxs[i] = self.mids[i];
            }
        }
        child.update_mids();
        child.validate();
        child
    }

    fn update_mids(&mut self) {
        for i in 0..self.dimensions() {
            self.mids[i] = (self.mins[i] + self.maxs[i]) * 0.5;
        }
    }
}
