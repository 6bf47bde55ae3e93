use std::{path::Path, time::Duration};

use serde::Deserialize;

use crate::SimulationError;

/// Settings for a simulation run, read from YAML. Every field is optional in the file.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub child_id: String,
    pub grid_size: usize,
    pub pair_values: Vec<String>,
    pub mismatch_delay_ms: u64,
    pub activity_log_capacity: usize,
    /// Inputs allowed per game before giving up.
    pub max_moves: u32,
    pub database_url: Option<String>,
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            child_id: "demo-child".to_string(),
            grid_size: 3,
            pair_values: ["apple", "ball", "cat", "duck", "egg", "fish", "goat", "hat"]
                .iter()
                .map(|value| value.to_string())
                .collect(),
            mismatch_delay_ms: 1000,
            activity_log_capacity: database::DEFAULT_ACTIVITY_LOG_CAPACITY,
            max_moves: 10_000,
            database_url: None,
            seed: None,
        }
    }
}

impl SimulationConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, SimulationError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, SimulationError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| SimulationError::ConfigIo {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    pub fn mismatch_delay(&self) -> Duration {
        Duration::from_millis(self.mismatch_delay_ms)
    }
}
