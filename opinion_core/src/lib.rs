//! Opinion Core - entity-indexed graph store and opinion dynamics engine
//!
//! A population of agents (graph nodes) holds a binary opinion and is
//! evolved one sampled interaction at a time:
//! 1. **Entity Store**: opaque integer ids mapped to owned node records
//! 2. **Graph Store**: directed adjacency sets with JSON snapshot save/restore
//! 3. **Dynamics**: uniform edge sampling plus voter / Sznajd update rules
//!
//! Layout helpers (Poisson-disk sampling, proximity edges) and BFS/DFS
//! traversal work over the same store.
//!
//! # Usage
//!
//! ```ignore
//! use opinion_core::{generate_graph, is_consensus, step, EntityStore, Model};
//!
//! let mut store = EntityStore::new();
//! let graph = generate_graph(&mut store, &mut rng, 64, 0.25)?;
//! while !is_consensus(&graph, &store) {
//!     step(&graph, &mut store, &mut rng, Model::Voter);
//! }
//! ```

pub mod dynamics;
pub mod entity;
pub mod error;
pub mod generate;
pub mod graph;
pub mod poisson;
pub mod snapshot;
pub mod traversal;

// Re-export key types for convenience
pub use dynamics::{
    init_opinions, is_consensus, opinion_share, sample_edge, step, step_sznajd, step_voter, Model,
    StepOutcome,
};
pub use entity::{Entity, EntityId, EntityStore};
pub use error::{GraphError, Result};
pub use generate::{generate_graph, generate_spaced_graph, poisson_positions, proximity_edges, random_positions};
pub use graph::{Edge, Graph, Node};
pub use poisson::{generate_poisson_disk, PoissonDisk};
pub use snapshot::{Snapshot, SnapshotEdges};
pub use traversal::{bfs, bfs_order, dfs, dfs_order};
