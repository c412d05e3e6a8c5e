//! Octagonal bounding boxes
//!
//! An `OctBb` bounds a volume with five slabs: the three linear axes plus the
//! two 45° diagonals of the ground plane (`x + y` and `-x + y`). The diagonal
//! slabs cut the corners off a square footprint, which gives a much tighter
//! hull for the diamond-shaped bumpers used by characters.
//!
//! A box either carries real diagonal bounds (`PlaneSet::Full`) or only the
//! three linear slabs (`PlaneSet::Axial`). Axial boxes still store diagonal
//! values, but they are ignored and re-derived from the X/Y slabs whenever a
//! diagonal bound is needed.

use std::ops::{Add, Index, IndexMut, Mul, Sub};

use glam::Vec3;

/// Number of slabs in an octagonal box
pub const OCT_COUNT: usize = 5;

/// Slab index into an `OctVec`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OctAxis {
    X,
    Y,
    Z,
    /// `x + y`
    XY,
    /// `-x + y`
    YX,
}

impl OctAxis {
    pub const ALL: [OctAxis; OCT_COUNT] = [OctAxis::X, OctAxis::Y, OctAxis::Z, OctAxis::XY, OctAxis::YX];
    pub const LINEAR: [OctAxis; 3] = [OctAxis::X, OctAxis::Y, OctAxis::Z];
    pub const DIAGONAL: [OctAxis; 2] = [OctAxis::XY, OctAxis::YX];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// A point (or offset) projected onto the five slab axes
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OctVec(pub [f32; OCT_COUNT]);

impl OctVec {
    pub const ZERO: OctVec = OctVec([0.0; OCT_COUNT]);

    /// Project a 3D point onto the slab axes
    pub fn from_vec3(v: Vec3) -> Self {
        Self([v.x, v.y, v.z, v.x + v.y, -v.x + v.y])
    }

    pub fn splat(value: f32) -> Self {
        Self([value; OCT_COUNT])
    }

    /// Component-wise minimum
    pub fn min(self, other: OctVec) -> OctVec {
        let mut out = self;
        for (o, b) in out.0.iter_mut().zip(other.0) {
            *o = o.min(b);
        }
        out
    }

    /// Component-wise maximum
    pub fn max(self, other: OctVec) -> OctVec {
        let mut out = self;
        for (o, b) in out.0.iter_mut().zip(other.0) {
            *o = o.max(b);
        }
        out
    }
}

impl Index<OctAxis> for OctVec {
    type Output = f32;

    fn index(&self, axis: OctAxis) -> &f32 {
        &self.0[axis.index()]
    }
}

impl IndexMut<OctAxis> for OctVec {
    fn index_mut(&mut self, axis: OctAxis) -> &mut f32 {
        &mut self.0[axis.index()]
    }
}

impl Add for OctVec {
    type Output = OctVec;

    fn add(mut self, rhs: OctVec) -> OctVec {
        for (a, b) in self.0.iter_mut().zip(rhs.0) {
            *a += b;
        }
        self
    }
}

impl Sub for OctVec {
    type Output = OctVec;

    fn sub(mut self, rhs: OctVec) -> OctVec {
        for (a, b) in self.0.iter_mut().zip(rhs.0) {
            *a -= b;
        }
        self
    }
}

impl Mul<f32> for OctVec {
    type Output = OctVec;

    fn mul(mut self, rhs: f32) -> OctVec {
        for a in self.0.iter_mut() {
            *a *= rhs;
        }
        self
    }
}

/// Gameplay collision radii
///
/// A value of exactly `0.0` disables that dimension of the bumper.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Bumper {
    /// Half-width of the square footprint
    pub size: f32,
    /// Half-width of the diamond footprint
    pub size_big: f32,
    /// Height above the object origin
    pub height: f32,
}

impl Bumper {
    pub fn new(size: f32, size_big: f32, height: f32) -> Self {
        Self { size, size_big, height }
    }

    /// Square bumper without diagonal planes
    pub fn square(size: f32, height: f32) -> Self {
        Self { size, size_big: 0.0, height }
    }
}

/// Which slabs of an `OctBb` carry real bounds
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlaneSet {
    /// X, Y and Z only; diagonals are derived on demand
    Axial,
    /// All five slabs
    #[default]
    Full,
}

/// Octagonal bounding box
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OctBb {
    pub mins: OctVec,
    pub maxs: OctVec,
    /// Set when any active slab is inverted
    pub empty: bool,
    pub planes: PlaneSet,
}

impl Default for OctBb {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl OctBb {
    pub const EMPTY: OctBb = OctBb {
        mins: OctVec::ZERO,
        maxs: OctVec::ZERO,
        empty: true,
        planes: PlaneSet::Full,
    };

    /// Five-plane box from explicit slab bounds
    pub fn new(mins: OctVec, maxs: OctVec) -> Self {
        let mut bb = Self { mins, maxs, empty: false, planes: PlaneSet::Full };
        bb.validate();
        bb
    }

    /// Three-plane box from linear corners
    pub fn axial(min: Vec3, max: Vec3) -> Self {
        let mut bb = Self {
            mins: OctVec([min.x, min.y, min.z, 0.0, 0.0]),
            maxs: OctVec([max.x, max.y, max.z, 0.0, 0.0]),
            empty: false,
            planes: PlaneSet::Axial,
        };
        bb.validate();
        bb
    }

    /// Degenerate box around a single point
    pub fn from_point(p: Vec3) -> Self {
        let v = OctVec::from_vec3(p);
        Self::new(v, v)
    }

    /// Smallest five-plane box enclosing every point, `None` for no points
    pub fn from_points(points: &[Vec3]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut bb = Self::from_point(*first);
        for p in rest {
            let v = OctVec::from_vec3(*p);
            bb.mins = bb.mins.min(v);
            bb.maxs = bb.maxs.max(v);
        }
        bb.validate();
        Some(bb)
    }

    /// Box described by a bumper, relative to the object origin
    ///
    /// The footprint is centred on the origin, Z spans `[0, height]`. A
    /// bumper with `size_big == 0.0` yields an axial box.
    pub fn from_bumper(bump: Bumper) -> Self {
        let planes = if bump.size_big == 0.0 { PlaneSet::Axial } else { PlaneSet::Full };
        let mut bb = Self {
            mins: OctVec([-bump.size, -bump.size, 0.0, -bump.size_big, -bump.size_big]),
            maxs: OctVec([bump.size, bump.size, bump.height, bump.size_big, bump.size_big]),
            empty: false,
            planes,
        };
        bb.validate();
        bb
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    pub fn has_diagonals(&self) -> bool {
        self.planes == PlaneSet::Full
    }

    /// Recompute `empty` from the active slabs. Returns true if non-empty.
    pub fn validate(&mut self) -> bool {
        let axes: &[OctAxis] = match self.planes {
            PlaneSet::Full => &OctAxis::ALL,
            PlaneSet::Axial => &OctAxis::LINEAR,
        };
        self.empty = axes.iter().any(|&a| self.mins[a] > self.maxs[a]);
        !self.empty
    }

    /// Copy with diagonal slabs filled in from X/Y when they are not real
    pub fn with_derived_diagonals(&self) -> OctBb {
        let mut bb = *self;
        if bb.planes == PlaneSet::Axial {
            let (x0, x1) = (bb.mins[OctAxis::X], bb.maxs[OctAxis::X]);
            let (y0, y1) = (bb.mins[OctAxis::Y], bb.maxs[OctAxis::Y]);
            bb.mins[OctAxis::XY] = x0 + y0;
            bb.maxs[OctAxis::XY] = x1 + y1;
            bb.mins[OctAxis::YX] = y0 - x1;
            bb.maxs[OctAxis::YX] = y1 - x0;
        }
        bb
    }

    /// Per-slab union; an empty operand is the identity
    pub fn union(a: &OctBb, b: &OctBb) -> OctBb {
        if a.empty {
            return *b;
        }
        if b.empty {
            return *a;
        }

        let both_axial = a.planes == PlaneSet::Axial && b.planes == PlaneSet::Axial;
        let (a, b) = (a.with_derived_diagonals(), b.with_derived_diagonals());
        let mut out = OctBb {
            mins: a.mins.min(b.mins),
            maxs: a.maxs.max(b.maxs),
            empty: false,
            planes: if both_axial { PlaneSet::Axial } else { PlaneSet::Full },
        };
        out.validate();
        out
    }

    /// Grow `self` in place to cover `other`
    pub fn self_union(&mut self, other: &OctBb) {
        *self = OctBb::union(self, other);
    }

    /// Per-slab intersection; check `is_empty()` on the result
    ///
    /// Diagonal slabs are compared directly when both boxes carry them.
    /// Otherwise the missing diagonals are derived from the X/Y slabs of
    /// whichever input lacks them before comparing.
    pub fn intersection(a: &OctBb, b: &OctBb) -> OctBb {
        let both_axial = a.planes == PlaneSet::Axial && b.planes == PlaneSet::Axial;
        let either_empty = a.empty || b.empty;
        let (a, b) = (a.with_derived_diagonals(), b.with_derived_diagonals());

        let mut out = OctBb {
            mins: a.mins.max(b.mins),
            maxs: a.maxs.min(b.maxs),
            empty: false,
            planes: if both_axial { PlaneSet::Axial } else { PlaneSet::Full },
        };
        out.validate();
        out.empty |= either_empty;
        out
    }

    /// Translated copy
    pub fn add_vector(&self, offset: OctVec) -> OctBb {
        OctBb {
            mins: self.mins + offset,
            maxs: self.maxs + offset,
            ..*self
        }
    }

    pub fn self_add_vector(&mut self, offset: OctVec) {
        *self = self.add_vector(offset);
    }

    /// Inflate every slab by `margin` on both sides
    pub fn grow(&mut self, margin: OctVec) {
        self.mins = self.mins - margin;
        self.maxs = self.maxs + margin;
        self.validate();
    }

    pub fn contains_point(&self, p: OctVec) -> bool {
        if self.empty {
            return false;
        }
        let bb = self.with_derived_diagonals();
        OctAxis::ALL.iter().all(|&a| bb.mins[a] <= p[a] && p[a] <= bb.maxs[a])
    }

    /// True if `other` lies entirely inside `self`
    pub fn contains(&self, other: &OctBb) -> bool {
        if self.empty || other.empty {
            return false;
        }
        let (a, b) = (self.with_derived_diagonals(), other.with_derived_diagonals());
        OctAxis::ALL.iter().all(|&axis| a.mins[axis] <= b.mins[axis] && b.maxs[axis] <= a.maxs[axis])
    }

    /// Convert to the simpler bumper representation
    ///
    /// `bump_stt` selects which bumper fields are computed from the box and
    /// `bump_base` selects which slabs of the returned box survive. A field of
    /// exactly `0.0` in either one switches the matching dimension off: the
    /// bumper field becomes `0.0` and the slabs collapse to `[0, 0]`. When the
    /// diagonals are switched off the returned box is axial so that the zeroed
    /// slabs never act as a constraint.
    pub fn downgrade(&self, bump_stt: Bumper, bump_base: Bumper) -> (Bumper, OctBb) {
        let src = self.with_derived_diagonals();

        let height = if bump_stt.height == 0.0 { 0.0 } else { src.maxs[OctAxis::Z] };

        let size = if bump_stt.size == 0.0 {
            0.0
        } else {
            src.mins[OctAxis::X].abs()
                .max(src.maxs[OctAxis::X].abs())
                .max(src.mins[OctAxis::Y].abs())
                .max(src.maxs[OctAxis::Y].abs())
        };

        let size_big = if bump_stt.size_big == 0.0 {
            0.0
        } else {
            src.maxs[OctAxis::YX]
                .max(-src.mins[OctAxis::YX])
                .max(src.maxs[OctAxis::XY])
                .max(-src.mins[OctAxis::XY])
        };

        let mut bb = *self;
        if bump_base.height == 0.0 {
            bb.mins[OctAxis::Z] = 0.0;
            bb.maxs[OctAxis::Z] = 0.0;
        }
        if bump_base.size == 0.0 {
            for axis in [OctAxis::X, OctAxis::Y] {
                bb.mins[axis] = 0.0;
                bb.maxs[axis] = 0.0;
            }
        }
        if bump_base.size_big == 0.0 {
            for axis in OctAxis::DIAGONAL {
                bb.mins[axis] = 0.0;
                bb.maxs[axis] = 0.0;
            }
            bb.planes = PlaneSet::Axial;
        }
        bb.validate();

        (Bumper { size, size_big, height }, bb)
    }

    /// Linear blend between two boxes
    ///
    /// `t == 0` and `t == 1` return exact copies of `a` and `b`. Any other
    /// blend with an empty input fails.
    pub fn interpolate(a: &OctBb, b: &OctBb, t: f32) -> Option<OctBb> {
        if a.empty && b.empty {
            return None;
        }
        if t == 0.0 && !a.empty {
            return Some(*a);
        }
        if t == 1.0 && !b.empty {
            return Some(*b);
        }
        if a.empty || b.empty {
            return None;
        }

        let both_axial = a.planes == PlaneSet::Axial && b.planes == PlaneSet::Axial;
        let (a, b) = (a.with_derived_diagonals(), b.with_derived_diagonals());
        let mut out = OctBb {
            mins: a.mins + (b.mins - a.mins) * t,
            maxs: a.maxs + (b.maxs - a.maxs) * t,
            empty: false,
            planes: if both_axial { PlaneSet::Axial } else { PlaneSet::Full },
        };
        out.validate().then_some(out)
    }
}
