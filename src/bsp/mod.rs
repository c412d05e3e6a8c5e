//! N-dimensional BSP tree for broad-phase collision
//!
//! Branches come from a pre-sized pool and are created lazily as leaves need
//! them. Leaves are rebuilt every tick: clear, prune, re-insert, query.

pub mod branch;
pub mod config;
pub mod leaf;
pub mod pool;
pub mod tree;

pub use branch::{BranchList, BspBranch};
pub use config::{BspConfig, PruneMode};
pub use leaf::{BspLeaf, BspLeafList, LeafBuffer, LeafId, LeafIter};
pub use pool::{BranchId, BranchPool};
pub use tree::{count_nodes, BspTree, Placement, TreeStats};
