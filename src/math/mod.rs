//! Bounding volumes used by the BSP

pub mod aabb;
pub mod oct_bb;

pub use aabb::BspAabb;
pub use oct_bb::{Bumper, OctAxis, OctBb, OctVec, PlaneSet, OCT_COUNT};
