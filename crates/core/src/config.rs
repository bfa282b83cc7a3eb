//! Simulation configuration

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunables for one simulation instance.
///
/// Loaded from TOML or built in code; every field has a default so partial
/// config files stay valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Maximum depth of nested synchronous dispatch before a cascade is
    /// aborted with [`CoreError::CyclicCascade`](crate::CoreError).
    ///
    /// Each wire hop costs two levels (the propagation call plus the
    /// destination dispatch), so puzzles with very long powered chains may
    /// need a larger bound.
    pub max_cascade_depth: usize,

    /// Emit a `trace!` line for every dispatched event.
    pub trace_dispatch: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            max_cascade_depth: 64,
            trace_dispatch: false,
        }
    }
}

impl SimConfig {
    /// Load a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    /// Write the configuration to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let raw = toml::to_string_pretty(self)?;
        std::fs::write(path, raw)?;
        Ok(())
    }
}
