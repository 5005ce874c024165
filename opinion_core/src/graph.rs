//! The graph store - directed adjacency sets over entity ids.
//!
//! A single adjacency map is the source of truth: `nodes[u]` holds every `v`
//! such that the directed edge `(u, v)` exists. The global edge set is
//! derived from it on demand, so the two can never drift apart. A running
//! edge count is kept next to it for O(1) `edge_count()`.
//!
//! Undirected behavior is the caller's business: insert both `(u, v)` and
//! `(v, u)`. Self-loops are allowed.

use crate::entity::{EntityId, EntityStore};
use crate::error::{GraphError, Result};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A directed edge `(source, dest)`.
pub type Edge = (EntityId, EntityId);

/// Per-agent record: position for drawing and the binary opinion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub x: f32,
    pub y: f32,
    pub opinion: bool,
}

impl Node {
    pub fn new(x: f32, y: f32, opinion: bool) -> Self {
        Self { x, y, opinion }
    }

    pub fn position(&self) -> Point2<f32> {
        Point2::new(self.x, self.y)
    }

    pub fn set_position(&mut self, position: Point2<f32>) {
        self.x = position.x;
        self.y = position.y;
    }
}

/// Directed graph over entity ids.
///
/// Ordered collections keep iteration (and therefore seeded edge sampling)
/// reproducible across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Graph {
    /// Adjacency sets keyed by source node
    nodes: BTreeMap<EntityId, BTreeSet<EntityId>>,

    /// Total number of directed edges
    edge_count: usize,
}

impl Graph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a graph with `n` fresh nodes registered in `store`.
    ///
    /// Each node record starts at the origin with opinion `false`.
    pub fn with_nodes(store: &mut EntityStore, n: usize) -> Result<Self> {
        let mut graph = Self::new();
        for _ in 0..n {
            graph.create_node(store)?;
        }
        Ok(graph)
    }

    /// Allocates a zeroed node record and adds it to the graph.
    pub fn create_node(&mut self, store: &mut EntityStore) -> Result<EntityId> {
        let id = store.register(Node::default(), None)?;
        self.nodes.insert(id, BTreeSet::new());
        Ok(id)
    }

    /// Adds `id` with no outgoing edges. Returns `false` if it was already present.
    pub fn add_node(&mut self, id: EntityId) -> bool {
        if self.nodes.contains_key(&id) {
            return false;
        }
        self.nodes.insert(id, BTreeSet::new());
        true
    }

    pub fn has_node(&self, id: EntityId) -> bool {
        self.nodes.contains_key(&id)
    }

    fn adjacency(&self, id: EntityId) -> Result<&BTreeSet<EntityId>> {
        self.nodes.get(&id).ok_or(GraphError::UnknownNode(id))
    }

    fn require(&self, id: EntityId) -> Result<()> {
        if self.has_node(id) {
            Ok(())
        } else {
            Err(GraphError::UnknownNode(id))
        }
    }

    /// Out-degree of `id`.
    pub fn degree(&self, id: EntityId) -> Result<usize> {
        Ok(self.adjacency(id)?.len())
    }

    /// Returns whether the directed edge `(u, v)` exists.
    pub fn has_edge(&self, u: EntityId, v: EntityId) -> Result<bool> {
        self.require(v)?;
        Ok(self.adjacency(u)?.contains(&v))
    }

    /// Inserts the directed edge `(u, v)`.
    ///
    /// Idempotent: returns `false` if the edge already existed.
    pub fn add_edge(&mut self, u: EntityId, v: EntityId) -> Result<bool> {
        self.require(v)?;
        let adjacent = self.nodes.get_mut(&u).ok_or(GraphError::UnknownNode(u))?;
        let inserted = adjacent.insert(v);
        if inserted {
            self.edge_count += 1;
        }
        Ok(inserted)
    }

    /// Removes the directed edge `(u, v)`. Returns `false` if it was absent.
    pub fn remove_edge(&mut self, u: EntityId, v: EntityId) -> Result<bool> {
        self.require(v)?;
        let adjacent = self.nodes.get_mut(&u).ok_or(GraphError::UnknownNode(u))?;
        let removed = adjacent.remove(&v);
        if removed {
            self.edge_count -= 1;
        }
        Ok(removed)
    }

    /// Drops every edge, keeping all nodes.
    pub fn clear_edges(&mut self) {
        for adjacent in self.nodes.values_mut() {
            adjacent.clear();
        }
        self.edge_count = 0;
    }

    /// Removes `id`, every edge touching it, and its record in `store`.
    pub fn remove_node(&mut self, store: &mut EntityStore, id: EntityId) -> Result<()> {
        let outgoing = self.nodes.remove(&id).ok_or(GraphError::UnknownNode(id))?;
        self.edge_count -= outgoing.len();

        for adjacent in self.nodes.values_mut() {
            if adjacent.remove(&id) {
                self.edge_count -= 1;
            }
        }

        store.remove(id);
        Ok(())
    }

    /// Outgoing edges from `id`.
    pub fn edges_at(&self, id: EntityId) -> Result<impl Iterator<Item = Edge> + '_> {
        Ok(self.adjacency(id)?.iter().map(move |&v| (id, v)))
    }

    /// Ids reachable over one outgoing edge from `id`.
    pub fn neighbors(&self, id: EntityId) -> Result<impl Iterator<Item = EntityId> + '_> {
        Ok(self.adjacency(id)?.iter().copied())
    }

    /// Every directed edge in the graph.
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.nodes
            .iter()
            .flat_map(|(&u, adjacent)| adjacent.iter().map(move |&v| (u, v)))
    }

    /// Every node id in the graph.
    pub fn node_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.nodes.keys().copied()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Removes every node record from `store` and drops the graph.
    pub fn destroy(self, store: &mut EntityStore) {
        for id in self.nodes.keys() {
            store.remove(*id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const TEST_SIZE: usize = 8;

    fn setup(n: usize) -> (EntityStore, Graph, Vec<EntityId>) {
        let mut store = EntityStore::new();
        let graph = Graph::with_nodes(&mut store, n).unwrap();
        let ids = graph.node_ids().collect();
        (store, graph, ids)
    }

    #[test]
    fn test_create_zeroed_nodes() {
        let (store, graph, ids) = setup(TEST_SIZE);

        assert_eq!(graph.node_count(), TEST_SIZE);
        assert_eq!(graph.edge_count(), 0);
        for id in ids {
            assert!(graph.has_node(id));
            assert_eq!(graph.degree(id).unwrap(), 0);
            let node = store.node(id).unwrap();
            assert_eq!((node.x, node.y), (0.0, 0.0));
        }
    }

    #[test]
    fn test_add_node_is_noop_when_present() {
        let (_store, mut graph, ids) = setup(2);

        assert!(!graph.add_node(ids[0]));
        assert!(graph.add_node(EntityId(99)));
        assert_eq!(graph.node_count(), 3);
    }

    #[test]
    fn test_self_loops() {
        let (_store, mut graph, ids) = setup(TEST_SIZE);

        for &id in &ids {
            graph.add_edge(id, id).unwrap();
        }

        assert_eq!(graph.edge_count(), TEST_SIZE);
        for &u in &ids {
            assert_eq!(graph.degree(u).unwrap(), 1);
            for &v in &ids {
                assert_eq!(graph.has_edge(u, v).unwrap(), u == v);
            }
        }
    }

    #[test]
    fn test_unknown_node_errors() {
        let (_store, mut graph, ids) = setup(2);
        let ghost = EntityId(1000);

        assert!(matches!(graph.degree(ghost), Err(GraphError::UnknownNode(id)) if id == ghost));
        assert!(matches!(graph.has_edge(ids[0], ghost), Err(GraphError::UnknownNode(_))));
        assert!(matches!(graph.has_edge(ghost, ids[0]), Err(GraphError::UnknownNode(_))));
        assert!(matches!(graph.add_edge(ghost, ids[0]), Err(GraphError::UnknownNode(_))));
        assert!(matches!(graph.add_edge(ids[0], ghost), Err(GraphError::UnknownNode(_))));
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_edges_are_directed() {
        let (_store, mut graph, ids) = setup(2);

        graph.add_edge(ids[0], ids[1]).unwrap();

        assert!(graph.has_edge(ids[0], ids[1]).unwrap());
        assert!(!graph.has_edge(ids[1], ids[0]).unwrap());
        assert_eq!(graph.edges_at(ids[0]).unwrap().collect::<Vec<_>>(), vec![(ids[0], ids[1])]);
        assert_eq!(graph.edges_at(ids[1]).unwrap().count(), 0);
    }

    #[test]
    fn test_remove_edge_and_clear() {
        let (_store, mut graph, ids) = setup(3);
        graph.add_edge(ids[0], ids[1]).unwrap();
        graph.add_edge(ids[1], ids[2]).unwrap();

        assert!(graph.remove_edge(ids[0], ids[1]).unwrap());
        assert!(!graph.remove_edge(ids[0], ids[1]).unwrap());
        assert_eq!(graph.edge_count(), 1);

        graph.clear_edges();
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.edges().count(), 0);
        assert_eq!(graph.node_count(), 3);
    }

    #[test]
    fn test_remove_node_drops_incident_edges() {
        let (mut store, mut graph, ids) = setup(3);
        graph.add_edge(ids[0], ids[1]).unwrap();
        graph.add_edge(ids[1], ids[0]).unwrap();
        graph.add_edge(ids[1], ids[2]).unwrap();
        graph.add_edge(ids[2], ids[2]).unwrap();

        graph.remove_node(&mut store, ids[1]).unwrap();

        assert!(!graph.has_node(ids[1]));
        assert!(store.get(ids[1]).is_none());
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.edges().collect::<Vec<_>>(), vec![(ids[2], ids[2])]);
    }

    #[test]
    fn test_destroy_releases_records() {
        let (mut store, graph, _ids) = setup(TEST_SIZE);
        let label = store.register(crate::Entity::Label("keep".into()), None).unwrap();

        graph.destroy(&mut store);

        assert_eq!(store.len(), 1);
        assert!(store.get(label).is_some());
    }

    proptest! {
        #[test]
        fn test_add_edge_keeps_counts_consistent(
            pairs in proptest::collection::vec((0usize..TEST_SIZE, 0usize..TEST_SIZE), 0..64)
        ) {
            let (_store, mut graph, ids) = setup(TEST_SIZE);

            for (a, b) in pairs {
                let (u, v) = (ids[a], ids[b]);
                let before = graph.degree(u).unwrap();
                let had = graph.has_edge(u, v).unwrap();

                let inserted = graph.add_edge(u, v).unwrap();

                prop_assert!(graph.has_edge(u, v).unwrap());
                prop_assert_eq!(inserted, !had);
                prop_assert_eq!(graph.degree(u).unwrap(), before + usize::from(!had));
            }

            prop_assert_eq!(graph.edges().count(), graph.edge_count());
        }

        #[test]
        fn test_add_edge_idempotent(
            pairs in proptest::collection::vec((0usize..TEST_SIZE, 0usize..TEST_SIZE), 0..32)
        ) {
            let (_s1, mut once, ids) = setup(TEST_SIZE);
            let mut twice = once.clone();

            for &(a, b) in &pairs {
                once.add_edge(ids[a], ids[b]).unwrap();
                twice.add_edge(ids[a], ids[b]).unwrap();
                twice.add_edge(ids[a], ids[b]).unwrap();
            }

            prop_assert_eq!(once, twice);
        }
    }
}
