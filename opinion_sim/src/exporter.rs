//! JSON exporter for opinion transitions.
//!
//! Records every tick that flipped at least one node, so a renderer can
//! replay transition effects offline.

use opinion_core::{EntityId, Model, StepOutcome};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;

/// A single node's new opinion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeChange {
    pub id: EntityId,
    pub opinion: bool,
}

/// One tick that changed at least one opinion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionFrame {
    /// Tick index (0-based)
    pub tick: u64,

    /// Simulation time in seconds
    pub time_sec: f64,

    /// Sampled edge `[u, v]`
    pub edge: [EntityId; 2],

    /// Nodes whose opinion flipped
    pub changed: Vec<NodeChange>,
}

/// Complete transition export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionLog {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Update rule
    pub model: Model,

    pub node_count: usize,
    pub edge_count: usize,

    /// Duration in seconds
    pub duration_sec: f64,

    /// Ticks executed
    pub total_ticks: u64,

    /// All frames
    pub frames: Vec<TransitionFrame>,

    /// Final results
    pub reached_consensus: bool,

    /// Fraction of nodes holding `true` at the end
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_share: Option<f64>,
}

impl TransitionLog {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: u64, model: Model) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            model,
            node_count: 0,
            edge_count: 0,
            duration_sec: 0.0,
            total_ticks: 0,
            frames: Vec::new(),
            reached_consensus: false,
            final_share: None,
        }
    }

    /// Records the graph size.
    pub fn set_graph_size(&mut self, node_count: usize, edge_count: usize) {
        self.node_count = node_count;
        self.edge_count = edge_count;
    }

    /// Adds a frame for `outcome` if it changed anything.
    ///
    /// `opinion_of` resolves the post-step opinion of a changed node.
    pub fn record<F>(&mut self, tick: u64, time_sec: f64, outcome: &StepOutcome, opinion_of: F)
    where
        F: Fn(EntityId) -> Option<bool>,
    {
        let StepOutcome::Applied { edge, changed } = outcome else {
            return;
        };
        if changed.is_empty() {
            return;
        }

        let changed = changed
            .iter()
            .filter_map(|&id| opinion_of(id).map(|opinion| NodeChange { id, opinion }))
            .collect();

        self.duration_sec = time_sec;
        self.frames.push(TransitionFrame {
            tick,
            time_sec,
            edge: [edge.0, edge.1],
            changed,
        });
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, total_ticks: u64, duration_sec: f64, reached_consensus: bool, share: f64) {
        self.total_ticks = total_ticks;
        self.duration_sec = duration_sec;
        self.reached_consensus = reached_consensus;
        self.final_share = Some(share);
    }

    /// Total opinion flips across all frames.
    pub fn flip_count(&self) -> usize {
        self.frames.iter().map(|f| f.changed.len()).sum()
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
