//! JSON snapshot save/restore for a graph and its node records.
//!
//! Wire format:
//!
//! ```text
//! {
//!   "nodes": { "<id>": { "x": <float>, "y": <float>, "opinion": <bool> }, ... },
//!   "edges": { "<n>": [<u_id>, <v_id>], ... }
//! }
//! ```
//!
//! `edges` is written as an index-keyed object; a plain array of pairs is
//! accepted on read as well.

use crate::entity::{EntityId, EntityStore};
use crate::error::{GraphError, Result};
use crate::graph::{Graph, Node};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Serialized edge collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SnapshotEdges {
    /// `{ "0": [u, v], "1": [u, v], ... }`
    Indexed(BTreeMap<String, [EntityId; 2]>),

    /// `[[u, v], ...]`
    List(Vec<[EntityId; 2]>),
}

impl SnapshotEdges {
    fn pairs(&self) -> Vec<[EntityId; 2]> {
        match self {
            SnapshotEdges::Indexed(map) => map.values().copied().collect(),
            SnapshotEdges::List(list) => list.clone(),
        }
    }
}

/// In-memory form of a snapshot document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub nodes: BTreeMap<String, Node>,
    pub edges: SnapshotEdges,
}

impl Snapshot {
    /// Captures the graph structure plus every node record.
    pub fn capture(graph: &Graph, store: &EntityStore) -> Result<Self> {
        let mut nodes = BTreeMap::new();
        for id in graph.node_ids() {
            let node = store.node(id).ok_or(GraphError::UnknownNode(id))?;
            nodes.insert(id.to_string(), *node);
        }

        let edges = graph
            .edges()
            .enumerate()
            .map(|(n, (u, v))| (n.to_string(), [u, v]))
            .collect();

        Ok(Self {
            nodes,
            edges: SnapshotEdges::Indexed(edges),
        })
    }

    /// Rebuilds a graph, registering every node at its stored id.
    ///
    /// The store must not already hold any of the stored ids (clear it
    /// first when reloading a previous session). On failure every record
    /// registered by this call is removed again and the id counter is moved
    /// back, leaving `store` as it was.
    pub fn restore(&self, store: &mut EntityStore) -> Result<Graph> {
        let next_id = store.peek_next_id();
        let mut registered = Vec::with_capacity(self.nodes.len());
        let result = self.replay(store, &mut registered);

        if result.is_err() {
            for id in registered {
                store.remove(id);
            }
            store.rewind(next_id);
        }
        result
    }

    fn replay(&self, store: &mut EntityStore, registered: &mut Vec<EntityId>) -> Result<Graph> {
        let mut graph = Graph::new();

        for (key, node) in &self.nodes {
            let id: EntityId = key
                .parse()
                .map_err(|_| GraphError::malformed(format!("invalid node id {key:?}")))?;
            store.register(*node, Some(id))?;
            registered.push(id);
            graph.add_node(id);
        }

        for [u, v] in self.edges.pairs() {
            graph.add_edge(u, v).map_err(|err| match err {
                GraphError::UnknownNode(id) => {
                    GraphError::malformed(format!("edge ({u}, {v}) references unknown node {id}"))
                }
                other => other,
            })?;
        }

        Ok(graph)
    }
}

impl Graph {
    /// Serializes the graph and its node records to a JSON document.
    pub fn serialize(&self, store: &EntityStore) -> Result<Value> {
        let snapshot = Snapshot::capture(self, store)?;
        serde_json::to_value(snapshot).map_err(|e| GraphError::malformed(e.to_string()))
    }

    /// Reconstructs a graph from a JSON document produced by [`Graph::serialize`].
    pub fn deserialize(doc: &Value, store: &mut EntityStore) -> Result<Graph> {
        let snapshot =
            Snapshot::deserialize(doc).map_err(|e| GraphError::malformed(e.to_string()))?;
        snapshot.restore(store)
    }

    /// Writes a snapshot to `path` as pretty-printed JSON.
    pub fn save(&self, store: &EntityStore, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let snapshot = Snapshot::capture(self, store)?;
        let json = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| GraphError::malformed(e.to_string()))?;

        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;

        debug!(
            "Saved snapshot: {} nodes, {} edges -> {}",
            self.node_count(),
            self.edge_count(),
            path.display()
        );
        Ok(())
    }

    /// Reads a snapshot from `path`.
    ///
    /// The caller is responsible for clearing `store` beforehand if it still
    /// holds ids from a previous session.
    pub fn load(store: &mut EntityStore, path: impl AsRef<Path>) -> Result<Graph> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let snapshot: Snapshot =
            serde_json::from_str(&content).map_err(|e| GraphError::malformed(e.to_string()))?;
        let graph = snapshot.restore(store)?;

        debug!(
            "Loaded snapshot: {} nodes, {} edges <- {}",
            graph.node_count(),
            graph.edge_count(),
            path.display()
        );
        Ok(graph)
    }
}
