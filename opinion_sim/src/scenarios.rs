//! Named network topologies to run the dynamics on.

use crate::config::SimConfig;
use opinion_core::{
    generate_spaced_graph, init_opinions, proximity_edges, random_positions, EntityId,
    EntityStore, Graph, Result,
};
use opinion_core::generate::DEFAULT_LAYOUT_RADIUS;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Scenario identifiers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioId {
    /// Every ordered pair connected
    Complete,

    /// Undirected cycle
    Ring,

    /// Directed path 0 -> 1 -> ... -> n-1
    Chain,

    /// Undirected hub and spokes
    Star,

    /// Undirected square grid
    Lattice,

    /// Random geometric graph, one random-direction edge per close pair
    #[default]
    Proximity,

    /// Proximity graph over an evenly spaced Poisson-disk layout
    Spaced,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Complete,
            ScenarioId::Ring,
            ScenarioId::Chain,
            ScenarioId::Star,
            ScenarioId::Lattice,
            ScenarioId::Proximity,
            ScenarioId::Spaced,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Complete => "complete",
            ScenarioId::Ring => "ring",
            ScenarioId::Chain => "chain",
            ScenarioId::Star => "star",
            ScenarioId::Lattice => "lattice",
            ScenarioId::Proximity => "proximity",
            ScenarioId::Spaced => "spaced",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Complete => "Complete digraph, mean-field baseline",
            ScenarioId::Ring => "Undirected cycle, slow diffusive coarsening",
            ScenarioId::Chain => "Directed path, opinions flow toward the tail",
            ScenarioId::Star => "Hub-and-spoke, one node sees everyone",
            ScenarioId::Lattice => "Square grid with 4-neighborhoods",
            ScenarioId::Proximity => "Random geometric graph over a uniform layout",
            ScenarioId::Spaced => "Random geometric graph over a Poisson-disk layout",
        }
    }

    /// Builds the topology with `config.population` nodes and fair-coin opinions.
    pub fn build<R: Rng + ?Sized>(
        &self,
        store: &mut EntityStore,
        rng: &mut R,
        config: &SimConfig,
    ) -> Result<Graph> {
        let n = config.population;

        let graph = match self {
            ScenarioId::Proximity => {
                let mut graph = Graph::with_nodes(store, n)?;
                random_positions(&graph, store, rng, DEFAULT_LAYOUT_RADIUS)?;
                proximity_edges(&mut graph, store, rng, config.connectivity)?;
                graph
            }
            ScenarioId::Spaced => {
                // Opinions are drawn inside; return early to avoid a second draw
                return generate_spaced_graph(store, rng, n, config.connectivity, &config.sampler());
            }
            _ => {
                let mut graph = Graph::with_nodes(store, n)?;
                let ids: Vec<EntityId> = graph.node_ids().collect();
                self.connect(&mut graph, &ids)?;
                self.place(store, &ids);
                graph
            }
        };

        init_opinions(&graph, store, rng);
        Ok(graph)
    }

    fn connect(&self, graph: &mut Graph, ids: &[EntityId]) -> Result<()> {
        let n = ids.len();
        let link = |graph: &mut Graph, u: EntityId, v: EntityId| -> Result<()> {
            graph.add_edge(u, v)?;
            graph.add_edge(v, u)?;
            Ok(())
        };

        match self {
            ScenarioId::Complete => {
                for &u in ids {
                    for &v in ids {
                        if u != v {
                            graph.add_edge(u, v)?;
                        }
                    }
                }
            }
            ScenarioId::Ring if n > 1 => {
                for i in 0..n {
                    let j = (i + 1) % n;
                    if i != j {
                        link(graph, ids[i], ids[j])?;
                    }
                }
            }
            ScenarioId::Chain => {
                for pair in ids.windows(2) {
                    graph.add_edge(pair[0], pair[1])?;
                }
            }
            ScenarioId::Star => {
                for &leaf in ids.iter().skip(1) {
                    link(graph, ids[0], leaf)?;
                }
            }
            ScenarioId::Lattice => {
                let side = lattice_side(n);
                for i in 0..n {
                    if (i + 1) % side != 0 && i + 1 < n {
                        link(graph, ids[i], ids[i + 1])?;
                    }
                    if i + side < n {
                        link(graph, ids[i], ids[i + side])?;
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Deterministic positions for the structured topologies.
    fn place(&self, store: &mut EntityStore, ids: &[EntityId]) {
        let n = ids.len().max(1);
        let radius = DEFAULT_LAYOUT_RADIUS / 2.0;
        let side = lattice_side(n);
        let spacing = DEFAULT_LAYOUT_RADIUS / side as f32;

        for (i, &id) in ids.iter().enumerate() {
            let (x, y) = match self {
                ScenarioId::Chain => (
                    (i as f32 / n as f32 - 0.5) * DEFAULT_LAYOUT_RADIUS,
                    0.0,
                ),
                ScenarioId::Lattice => (
                    (i % side) as f32 * spacing - radius,
                    (i / side) as f32 * spacing - radius,
                ),
                ScenarioId::Star if i == 0 => (0.0, 0.0),
                _ => {
                    let angle = 2.0 * PI * i as f32 / n as f32;
                    (radius * angle.cos(), radius * angle.sin())
                }
            };

            if let Some(node) = store.node_mut(id) {
                node.x = x;
                node.y = y;
            }
        }
    }
}

fn lattice_side(n: usize) -> usize {
    ((n as f64).sqrt().ceil() as usize).max(1)
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "complete" | "mean_field" => Ok(ScenarioId::Complete),
            "ring" | "cycle" => Ok(ScenarioId::Ring),
            "chain" | "path" => Ok(ScenarioId::Chain),
            "star" => Ok(ScenarioId::Star),
            "lattice" | "grid" => Ok(ScenarioId::Lattice),
            "proximity" | "geometric" => Ok(ScenarioId::Proximity),
            "spaced" | "poisson" => Ok(ScenarioId::Spaced),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}
