//! Simulation configuration.
//!
//! Tunables come from (lowest to highest precedence):
//! - `SimConfig::default()`
//! - a JSON config file (every key optional)
//! - CLI flags

use crate::error::{Result, SimError};
use crate::scenarios::ScenarioId;
use opinion_core::{Model, PoissonDisk};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Upper bound on the background grid the spaced layout may span.
pub const MAX_LAYOUT_CELLS: f64 = 16_777_216.0;

/// Configuration for a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Master seed for determinism
    pub seed: u64,

    /// Number of agents (graph nodes)
    pub population: usize,

    /// Dynamics steps per simulated second
    pub updates_per_second: u32,

    /// Proximity threshold as a fraction of the largest pairwise distance
    pub connectivity: f32,

    /// Update rule
    pub model: Model,

    /// Graph topology to build
    pub topology: ScenarioId,

    /// Tick limit (0 = run until consensus or stall)
    pub max_ticks: u64,

    /// Layout region for the spaced topology
    pub region_width: f32,
    pub region_height: f32,

    /// Minimum node spacing for the spaced topology
    pub min_dist: f32,

    /// Poisson-disk candidates per active point
    pub max_candidate_points: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            population: 64,
            updates_per_second: 30,
            connectivity: 0.25,
            model: Model::Voter,
            topology: ScenarioId::Proximity,
            max_ticks: 100_000,
            region_width: 640.0,
            region_height: 480.0,
            min_dist: 30.0,
            max_candidate_points: 30,
        }
    }
}

impl SimConfig {
    /// Loads configuration from a JSON file. Missing keys keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| SimError::config(format!("Failed to read {}: {e}", path.display())))?;
        Self::from_json(&content)
    }

    /// Parses configuration from a JSON string and validates it.
    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)
            .map_err(|e| SimError::config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the simulation cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.population == 0 {
            return Err(SimError::config("population must be at least 1"));
        }
        if self.updates_per_second == 0 {
            return Err(SimError::config("updates_per_second must be positive"));
        }
        if !(self.connectivity > 0.0 && self.connectivity <= 1.0) {
            return Err(SimError::config(format!(
                "connectivity must be in (0, 1], got {}",
                self.connectivity
            )));
        }
        if !(self.min_dist.is_finite() && self.min_dist > 0.0) {
            return Err(SimError::config("min_dist must be positive"));
        }
        if !(self.region_width.is_finite()
            && self.region_height.is_finite()
            && self.region_width > 0.0
            && self.region_height > 0.0)
        {
            return Err(SimError::config("layout region must have positive size"));
        }
        let cells = self.sampler().cell_count();
        if cells > MAX_LAYOUT_CELLS {
            return Err(SimError::config(format!(
                "min_dist {} is too small for a {}x{} region ({cells:.0} grid cells, max {MAX_LAYOUT_CELLS})",
                self.min_dist, self.region_width, self.region_height
            )));
        }
        Ok(())
    }

    /// Virtual time covered by one tick.
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.updates_per_second as f64)
    }

    /// Poisson-disk sampler for the configured layout region.
    pub fn sampler(&self) -> PoissonDisk {
        PoissonDisk::new(self.region_height, self.region_width, self.min_dist)
            .with_candidates(self.max_candidate_points)
            .with_max_samples(self.population)
    }
}
