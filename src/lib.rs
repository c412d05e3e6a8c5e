//! Rkbsp - N-dimensional BSP broad phase for a voxel game engine

pub mod core;
pub mod math;
pub mod bsp;
pub mod object;
