//! Deterministic opinion-dynamics simulator.
//!
//! Wraps `opinion_core` in a tick-driven world:
//! - **Randomness**: all entropy derived from a single 64-bit seed, with the
//!   graph layout on its own stream so the update rule never changes the graph
//! - **Time**: a virtual clock advanced by `1 / updates_per_second` per tick
//! - **Scenarios**: named topologies run until consensus or a tick limit
//!
//! # Usage
//!
//! ```no_run
//! use opinion_sim::{ScenarioId, SimConfig, SimWorld};
//!
//! let config = SimConfig {
//!     seed: 42,
//!     population: 32,
//!     topology: ScenarioId::Ring,
//!     ..Default::default()
//! };
//!
//! let mut world = SimWorld::new(config)?;
//! let summary = world.run(10_000, |_, _, _, _| {});
//! println!("consensus: {}", summary.reached_consensus);
//! # Ok::<(), opinion_sim::SimError>(())
//! ```

mod config;
mod context;
mod error;
mod exporter;
mod runner;
pub mod scenarios;
mod world;

pub use config::{SimConfig, MAX_LAYOUT_CELLS};
pub use context::{SimContext, LAYOUT_STREAM};
pub use error::{Result, SimError};
pub use exporter::{NodeChange, TransitionFrame, TransitionLog};
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner, SNAPSHOT_LABEL};
pub use scenarios::ScenarioId;
pub use world::{RunSummary, SimWorld};
