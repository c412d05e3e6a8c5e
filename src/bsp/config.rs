//! BSP tree configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};
use crate::math::BspAabb;

use super::tree::count_nodes;

/// How `BspTree::prune` reclaims empty branches
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PruneMode {
    /// One pass over the used list, releasing branches that are empty right
    /// now. Empty chains collapse one link per pass when parents are visited
    /// before their children.
    #[default]
    Shallow,
    /// Post-order walk from the root; empty chains collapse in one call.
    Recursive,
}

/// Configuration for a BSP tree and the object layer that drives it
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BspConfig {
    /// Number of split axes (3 for the game world)
    pub dimensions: usize,
    /// Deepest branch level; the root is depth 0
    pub max_depth: usize,
    /// Static world extent covered by the tree
    pub bounds_min: Vec<f32>,
    pub bounds_max: Vec<f32>,
    /// Optional cap on the branch pool, below the complete-tree bound
    pub branch_capacity: Option<usize>,
    /// Output buffer capacity for collision queries
    pub max_collisions: usize,
    pub prune_mode: PruneMode,
}

impl Default for BspConfig {
    fn default() -> Self {
        Self {
            dimensions: 3,
            max_depth: 4,
            bounds_min: vec![-1024.0, -1024.0, -256.0],
            bounds_max: vec![1024.0, 1024.0, 768.0],
            branch_capacity: None,
            max_collisions: 256,
            prune_mode: PruneMode::Shallow,
        }
    }
}

impl BspConfig {
    /// Config covering the given extent, other settings default
    pub fn for_bounds(dimensions: usize, max_depth: usize, bounds_min: &[f32], bounds_max: &[f32]) -> Self {
        Self {
            dimensions,
            max_depth,
            bounds_min: bounds_min.to_vec(),
            bounds_max: bounds_max.to_vec(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.dimensions == 0 {
            return Err(Error::Config("dimensions must be at least 1".into()));
        }
        for bounds in [&self.bounds_min, &self.bounds_max] {
            if bounds.len() != self.dimensions {
                return Err(Error::DimensionMismatch {
                    expected: self.dimensions,
                    actual: bounds.len(),
                });
            }
        }
        if !self.bounds().is_valid() {
            return Err(Error::Config("bounds_min must not exceed bounds_max".into()));
        }
        if self.branch_capacity == Some(0) {
            return Err(Error::Config("branch_capacity must be at least 1".into()));
        }
        self.pool_capacity().map(|_| ())
    }

    /// Tree extent as a BSP box
    pub fn bounds(&self) -> BspAabb {
        BspAabb::from_corners(&self.bounds_min, &self.bounds_max)
    }

    /// Number of branches to pre-allocate
    pub fn pool_capacity(&self) -> Result<usize> {
        let bound = count_nodes(self.dimensions, self.max_depth).ok_or(Error::DimensionOverflow {
            dimensions: self.dimensions,
            depth: self.max_depth,
        })?;
        Ok(self.branch_capacity.map_or(bound, |cap| cap.min(bound)))
    }

    /// Load from a JSON file (sync)
    pub fn load_sync(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Save to a JSON file (sync)
    pub fn save_sync(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = BspConfig::default();
        config.validate().unwrap();
        assert_eq!(config.pool_capacity().unwrap(), 4681);
    }

    #[test]
    fn test_branch_capacity_caps_pool() {
        let mut config = BspConfig::for_bounds(2, 2, &[0.0, 0.0], &[16.0, 16.0]);
        assert_eq!(config.pool_capacity().unwrap(), 21);
        config.branch_capacity = Some(5);
        assert_eq!(config.pool_capacity().unwrap(), 5);
        config.branch_capacity = Some(500);
        assert_eq!(config.pool_capacity().unwrap(), 21);
    }

    #[test]
    fn test_validate_rejects_bad_configs() {
        let overflow = BspConfig::for_bounds(4, 7, &[0.0; 4], &[1.0; 4]);
        assert!(matches!(overflow.validate(), Err(Error::DimensionOverflow { dimensions: 4, depth: 7 })));

        let mismatch = BspConfig::for_bounds(3, 2, &[0.0, 0.0], &[1.0, 1.0]);
        assert!(matches!(mismatch.validate(), Err(Error::DimensionMismatch { expected: 3, actual: 2 })));

        let inverted = BspConfig::for_bounds(1, 2, &[5.0], &[1.0]);
        assert!(matches!(inverted.validate(), Err(Error::Config(_))));

        let zero = BspConfig::for_bounds(0, 2, &[], &[]);
        assert!(matches!(zero.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("bsp.json");

        let mut config = BspConfig::for_bounds(2, 3, &[0.0, 0.0], &[64.0, 32.0]);
        config.prune_mode = PruneMode::Recursive;
        config.max_collisions = 12;
        config.save_sync(&path).unwrap();

        let loaded = BspConfig::load_sync(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: BspConfig = serde_json::from_str(r#"{ "max_depth": 2, "prune_mode": "recursive" }"#).unwrap();
        assert_eq!(config.max_depth, 2);
        assert_eq!(config.dimensions, 3);
        assert_eq!(config.prune_mode, PruneMode::Recursive);
        assert_eq!(config.max_collisions, 256);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{ "dimensions": 2 }"#).unwrap();
        assert!(matches!(BspConfig::load_sync(&path), Err(Error::DimensionMismatch { .. })));

        assert!(matches!(BspConfig::load_sync(&dir.path().join("missing.json")), Err(Error::Io(_))));
    }
}
