//! Engine settings, read from YAML or built in code.
//!
//! ```yaml
//! threads: 16
//! max_hops: 64
//! build_shard_lines: 65536
//! sorted_adjacency: true
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PathError, Result};

pub const DEFAULT_BUILD_SHARD_LINES: usize = 65_536;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Batch worker count. `None` uses every available core.
    pub threads: Option<usize>,
    /// Longest path a search may return, in hops. `None` is unbounded.
    pub max_hops: Option<u32>,
    /// Lines per shard in the parallel graph builder.
    pub build_shard_lines: usize,
    /// Sort and dedup adjacency lists once the graph is built.
    pub sorted_adjacency: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            threads: None,
            max_hops: None,
            build_shard_lines: DEFAULT_BUILD_SHARD_LINES,
            sorted_adjacency: true,
        }
    }
}

impl EngineConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| PathError::io(format!("reading config {}", path.display()), e))?;
        Self::from_yaml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.threads == Some(0) {
            return Err(PathError::invalid_argument("threads must be at least 1"));
        }
        if self.build_shard_lines == 0 {
            return Err(PathError::invalid_argument(
                "build_shard_lines must be at least 1",
            ));
        }
        Ok(())
    }

    /// Worker count actually used for batches.
    pub fn worker_threads(&self) -> usize {
        self.threads.unwrap_or_else(num_cpus::get).max(1)
    }
}
