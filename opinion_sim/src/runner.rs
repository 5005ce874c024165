//! Scenario runner - drives one topology to consensus and reports on it.

use crate::config::SimConfig;
use crate::error::Result;
use crate::exporter::TransitionLog;
use crate::scenarios::ScenarioId;
use crate::world::SimWorld;

use opinion_core::{Model, StepOutcome};
use tracing::{debug, info, warn};

/// Name reported for runs over a graph loaded from a snapshot file.
pub const SNAPSHOT_LABEL: &str = "snapshot";

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run (`None` for a graph loaded from a snapshot)
    pub scenario: Option<ScenarioId>,

    /// Update rule used
    pub model: Model,

    /// Seed used
    pub seed: u64,

    /// Whether every node ended with the same opinion
    pub reached_consensus: bool,

    /// Total ticks executed
    pub total_ticks: u64,

    /// Final simulation time in seconds
    pub final_time_secs: f64,

    /// Fraction of nodes holding `true` at the end
    pub final_share: f64,

    /// Why consensus was not reached, if it wasn't
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScenarioMetrics {
    pub node_count: usize,
    pub edge_count: usize,

    /// Total opinion flips
    pub flips: u64,

    /// Ticks that sampled an edge but changed nothing
    pub quiet_ticks: u64,

    /// Largest number of flips in one tick
    pub max_changed: usize,
}

impl ScenarioResult {
    /// Scenario name, or [`SNAPSHOT_LABEL`] for loaded graphs.
    pub fn name(&self) -> &'static str {
        label(self.scenario)
    }
}

fn label(scenario: Option<ScenarioId>) -> &'static str {
    scenario.map_or(SNAPSHOT_LABEL, |s| s.name())
}

impl ScenarioMetrics {
    fn observe(&mut self, outcome: &StepOutcome) {
        let changed = outcome.changed().len();
        if changed == 0 {
            self.quiet_ticks += 1;
        }
        self.flips += changed as u64;
        self.max_changed = self.max_changed.max(changed);
    }
}

/// Runs opinion-dynamics scenarios.
pub struct ScenarioRunner {
    /// Base configuration; seed, population and topology are overridden per run
    config: SimConfig,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64, population: usize) -> Self {
        Self {
            config: SimConfig {
                seed,
                population,
                ..Default::default()
            },
        }
    }

    /// Starts from an existing configuration.
    pub fn with_config(mut self, config: SimConfig) -> Self {
        let (seed, population) = (self.config.seed, self.config.population);
        self.config = SimConfig {
            seed,
            population,
            ..config
        };
        self
    }

    /// Sets the update rule.
    pub fn with_model(mut self, model: Model) -> Self {
        self.config.model = model;
        self
    }

    /// Sets the tick limit (0 = none).
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.config.max_ticks = max_ticks;
        self
    }

    pub fn seed(&self) -> u64 {
        self.config.seed
    }

    fn world(&self, scenario: ScenarioId) -> Result<SimWorld> {
        SimWorld::new(SimConfig {
            topology: scenario,
            ..self.config.clone()
        })
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> Result<ScenarioResult> {
        let mut world = self.world(scenario)?;
        Ok(self.drive(Some(scenario), &mut world, |_, _, _, _| {}))
    }

    /// Runs a scenario while recording every opinion transition.
    pub fn run_recorded(&self, scenario: ScenarioId) -> Result<(ScenarioResult, TransitionLog)> {
        let mut world = self.world(scenario)?;
        Ok(self.record(Some(scenario), &mut world))
    }

    /// Records a run over an already-built world.
    ///
    /// Pass `None` as the scenario for a world loaded from a snapshot.
    pub fn record(
        &self,
        scenario: Option<ScenarioId>,
        world: &mut SimWorld,
    ) -> (ScenarioResult, TransitionLog) {
        let mut log = TransitionLog::new(label(scenario), world.seed(), world.model());
        log.set_graph_size(world.graph().node_count(), world.graph().edge_count());

        let result = self.drive(scenario, world, |store, tick, time, outcome| {
            log.record(tick, time, outcome, |id| store.node(id).map(|node| node.opinion));
        });

        log.finalize(
            result.total_ticks,
            result.final_time_secs,
            result.reached_consensus,
            result.final_share,
        );
        (result, log)
    }

    fn drive<F>(
        &self,
        scenario: Option<ScenarioId>,
        world: &mut SimWorld,
        mut on_step: F,
    ) -> ScenarioResult
    where
        F: FnMut(&opinion_core::EntityStore, u64, f64, &StepOutcome),
    {
        info!(
            "Starting scenario: {} (seed={}, model={})",
            label(scenario),
            world.seed(),
            world.model()
        );

        let mut metrics = ScenarioMetrics {
            node_count: world.graph().node_count(),
            edge_count: world.graph().edge_count(),
            ..Default::default()
        };
        let report_every = u64::from(world.config.updates_per_second).max(1) * 10;

        let summary = world.run(self.config.max_ticks, |store, tick, time, outcome| {
            if *outcome != StepOutcome::Idle {
                metrics.observe(outcome);
            }
            if tick % report_every == 0 {
                debug!("  t={:.1}s | tick={} | flips={}", time, tick, metrics.flips);
            }
            on_step(store, tick, time, outcome);
        });

        let failure_reason = if summary.reached_consensus {
            None
        } else if summary.stalled {
            Some("graph has no edges to sample".to_string())
        } else {
            Some(format!("no consensus after {} ticks", summary.ticks))
        };

        if let Some(reason) = &failure_reason {
            warn!("{} (seed={}): {}", label(scenario), world.seed(), reason);
        }

        ScenarioResult {
            scenario,
            model: world.model(),
            seed: world.seed(),
            reached_consensus: summary.reached_consensus,
            total_ticks: world.tick_count(),
            final_time_secs: world.time(),
            final_share: world.opinion_share(),
            failure_reason,
            metrics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_graph_reaches_consensus() {
        let runner = ScenarioRunner::new(42, 12).with_max_ticks(0);

        let result = runner.run(ScenarioId::Complete).unwrap();

        assert!(result.reached_consensus);
        assert!(result.failure_reason.is_none());
        assert!(result.final_share == 0.0 || result.final_share == 1.0);
        assert_eq!(result.metrics.edge_count, 132);
    }

    #[test]
    fn test_sznajd_complete_reaches_consensus() {
        let runner = ScenarioRunner::new(7, 10).with_model(Model::Sznajd).with_max_ticks(0);

        let result = runner.run(ScenarioId::Complete).unwrap();

        assert_eq!(result.model, Model::Sznajd);
        assert!(result.reached_consensus);
    }

    #[test]
    fn test_tick_limit_reported() {
        let runner = ScenarioRunner::new(42, 64).with_max_ticks(5);

        let result = runner.run(ScenarioId::Ring).unwrap();

        assert!(!result.reached_consensus);
        assert_eq!(result.total_ticks, 5);
        assert_eq!(result.failure_reason.as_deref(), Some("no consensus after 5 ticks"));
    }

    #[test]
    fn test_deterministic() {
        let runner1 = ScenarioRunner::new(99, 24);
        let runner2 = ScenarioRunner::new(99, 24);

        let a = runner1.run(ScenarioId::Lattice).unwrap();
        let b = runner2.run(ScenarioId::Lattice).unwrap();

        assert_eq!(a.total_ticks, b.total_ticks);
        assert_eq!(a.final_share, b.final_share);
        assert_eq!(a.metrics, b.metrics);
    }

    #[test]
    fn test_recorded_flips_match_metrics() {
        let runner = ScenarioRunner::new(42, 16);

        let (result, log) = runner.run_recorded(ScenarioId::Complete).unwrap();

        assert_eq!(log.flip_count() as u64, result.metrics.flips);
        assert_eq!(log.total_ticks, result.total_ticks);
        assert_eq!(log.reached_consensus, result.reached_consensus);
        assert_eq!(log.node_count, 16);
        assert_eq!(result.name(), "complete");
        assert_eq!(log.scenario, "complete");
    }

    #[test]
    fn test_snapshot_run_is_labeled() {
        let path = std::env::temp_dir()
            .join(format!("opinion_sim_runner_snapshot_{}.json", std::process::id()));
        let config = SimConfig {
            population: 9,
            topology: ScenarioId::Lattice,
            ..Default::default()
        };
        SimWorld::new(config.clone()).unwrap().save(&path).unwrap();

        let runner = ScenarioRunner::new(42, 9).with_config(config.clone());
        let mut world = SimWorld::from_snapshot(config, &path).unwrap();
        let _ = std::fs::remove_file(&path);
        let (result, log) = runner.record(None, &mut world);

        assert_eq!(result.scenario, None);
        assert_eq!(result.name(), SNAPSHOT_LABEL);
        assert_eq!(log.scenario, SNAPSHOT_LABEL);
        assert_eq!(log.edge_count, 24);
    }

    #[test]
    fn test_with_config_keeps_seed() {
        let config = SimConfig {
            seed: 1,
            population: 3,
            model: Model::Sznajd,
            ..Default::default()
        };
        let runner = ScenarioRunner::new(42, 8).with_config(config);

        assert_eq!(runner.seed(), 42);
        let result = runner.run(ScenarioId::Ring).unwrap();
        assert_eq!(result.metrics.node_count, 8);
        assert_eq!(result.model, Model::Sznajd);
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let runner = ScenarioRunner::new(42, 0);
        assert!(runner.run(ScenarioId::Ring).is_err());
    }
}
