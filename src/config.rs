//! Configuration of a [`World`](crate::world::World).

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration parameters for a [`World`](crate::world::World).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Whether deprecated operations log a warning when called.
    pub deprecation_warnings: bool,
    /// Seed for generating entity IDs. When [`None`], IDs are drawn from an
    /// entropy-seeded generator.
    pub entity_id_seed: Option<u64>,
}

impl WorldConfig {
    /// Reads the configuration from the RON file at the given path. Fields
    /// missing from the file get their default values.
    pub fn from_ron_file(file_path: impl AsRef<Path>) -> Result<Self> {
        arche_utils::io::parse_ron_file(file_path)
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            deprecation_warnings: true,
            entity_id_seed: None,
        }
    }
}
