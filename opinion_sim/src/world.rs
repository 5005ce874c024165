//! SimWorld - the simulation container driven once per tick.

use crate::config::SimConfig;
use crate::context::{SimContext, LAYOUT_STREAM};
use crate::error::Result;
use opinion_core::{
    is_consensus, opinion_share, step, EntityId, EntityStore, Graph, GraphError, Model, Node,
    StepOutcome,
};
use std::path::Path;
use tracing::{debug, info};

/// How a call to [`SimWorld::run`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Ticks executed by this call
    pub ticks: u64,

    /// All nodes share one opinion
    pub reached_consensus: bool,

    /// Stopped because the graph has no edges to sample
    pub stalled: bool,
}

/// The SimWorld - owns the entity store, graph, RNG and clock of one simulation.
pub struct SimWorld {
    /// Configuration
    pub config: SimConfig,

    /// Deterministic RNG and virtual clock
    context: SimContext,

    /// Node records
    store: EntityStore,

    /// Topology
    graph: Graph,

    /// Active update rule
    model: Model,

    /// Ticks are ignored while paused
    paused: bool,

    /// Current tick count
    tick_count: u64,
}

impl SimWorld {
    /// Creates a new SimWorld, building `config.topology`.
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate()?;

        let context = SimContext::new(config.seed);
        let mut layout_rng = context.derive_rng(LAYOUT_STREAM);
        let mut store = EntityStore::new();
        let graph = config.topology.build(&mut store, &mut layout_rng, &config)?;

        info!(
            "Built {} graph: {} nodes, {} edges (seed={})",
            config.topology,
            graph.node_count(),
            graph.edge_count(),
            config.seed
        );

        Ok(Self::assemble(config, context, store, graph))
    }

    /// Creates a SimWorld from a snapshot file instead of generating a graph.
    pub fn from_snapshot(config: SimConfig, path: impl AsRef<Path>) -> Result<Self> {
        config.validate()?;

        let mut store = EntityStore::new();
        let graph = Graph::load(&mut store, path)?;
        let context = SimContext::new(config.seed);

        Ok(Self::assemble(config, context, store, graph))
    }

    fn assemble(config: SimConfig, context: SimContext, store: EntityStore, graph: Graph) -> Self {
        Self {
            model: config.model,
            config,
            context,
            store,
            graph,
            paused: false,
            tick_count: 0,
        }
    }

    /// Advances simulation by one tick.
    ///
    /// Returns `None` while paused; otherwise the outcome of one dynamics step.
    pub fn tick(&mut self) -> Option<StepOutcome> {
        if self.paused {
            return None;
        }

        let outcome = step(&self.graph, &mut self.store, self.context.rng(), self.model);
        self.context.advance_time(self.config.tick_duration());
        self.tick_count += 1;

        Some(outcome)
    }

    /// Ticks until consensus, until the graph stalls, or until `max_ticks`
    /// ticks have run (0 = no limit).
    ///
    /// `on_step` sees every outcome with the tick index and time after it.
    pub fn run<F>(&mut self, max_ticks: u64, mut on_step: F) -> RunSummary
    where
        F: FnMut(&EntityStore, u64, f64, &StepOutcome),
    {
        let mut ticks = 0;
        let mut stalled = false;

        while !self.is_consensus() && (max_ticks == 0 || ticks < max_ticks) {
            let index = self.tick_count;
            let Some(outcome) = self.tick() else {
                break;
            };
            ticks += 1;
            on_step(&self.store, index, self.time(), &outcome);

            if outcome == StepOutcome::Idle {
                stalled = true;
                break;
            }
        }

        let reached_consensus = self.is_consensus();
        if reached_consensus {
            debug!("Consensus after {} ticks ({:.2}s)", self.tick_count, self.time());
        }

        RunSummary {
            ticks,
            reached_consensus,
            stalled,
        }
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn model(&self) -> Model {
        self.model
    }

    pub fn set_model(&mut self, model: Model) {
        self.model = model;
    }

    /// Switches between voter and Sznajd, returning the new model.
    pub fn toggle_model(&mut self) -> Model {
        self.model = self.model.toggle();
        self.model
    }

    /// Moves a node (e.g. dragged in a viewer).
    pub fn set_position(&mut self, id: EntityId, x: f32, y: f32) -> Result<()> {
        if !self.graph.has_node(id) {
            return Err(GraphError::UnknownNode(id).into());
        }
        let node = self.store.node_mut(id).ok_or(GraphError::UnknownNode(id))?;
        node.x = x;
        node.y = y;
        Ok(())
    }

    /// Every node with its record.
    pub fn nodes(&self) -> impl Iterator<Item = (EntityId, &Node)> + '_ {
        self.graph
            .node_ids()
            .filter_map(|id| self.store.node(id).map(|node| (id, node)))
    }

    /// Every directed edge.
    pub fn edges(&self) -> impl Iterator<Item = (EntityId, EntityId)> + '_ {
        self.graph.edges()
    }

    pub fn is_consensus(&self) -> bool {
        is_consensus(&self.graph, &self.store)
    }

    /// Fraction of nodes holding `true`.
    pub fn opinion_share(&self) -> f64 {
        opinion_share(&self.graph, &self.store)
    }

    /// Writes the current graph to a snapshot file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.graph.save(&self.store, path)?;
        Ok(())
    }

    /// Replaces the graph with a snapshot file.
    ///
    /// The snapshot is loaded into a fresh store, so on failure the current
    /// graph is left untouched.
    pub fn reload(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let mut store = EntityStore::new();
        let graph = Graph::load(&mut store, path)?;
        self.store = store;
        self.graph = graph;
        Ok(())
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    /// Returns the current simulation time in seconds.
    pub fn time(&self) -> f64 {
        self.context.now().as_secs_f64()
    }

    /// Returns the current tick count.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn seed(&self) -> u64 {
        self.context.seed()
    }
}
