//! Breadth-first and depth-first walks over a [`Graph`].
//!
//! The visitor runs once for every node discovered from the source, in
//! discovery order. The source itself is marked visited up front and is
//! never passed to the visitor.

use crate::entity::EntityId;
use crate::error::{GraphError, Result};
use crate::graph::Graph;
use std::collections::{HashSet, VecDeque};

/// Frontier discipline shared by both walks.
trait Frontier {
    fn push(&mut self, id: EntityId);
    fn pop(&mut self) -> Option<EntityId>;
}

impl Frontier for VecDeque<EntityId> {
    fn push(&mut self, id: EntityId) {
        self.push_back(id);
    }

    fn pop(&mut self) -> Option<EntityId> {
        self.pop_front()
    }
}

impl Frontier for Vec<EntityId> {
    fn push(&mut self, id: EntityId) {
        Vec::push(self, id);
    }

    fn pop(&mut self) -> Option<EntityId> {
        Vec::pop(self)
    }
}

fn walk<Q, F>(graph: &Graph, source: EntityId, mut frontier: Q, mut visit: F) -> Result<()>
where
    Q: Frontier,
    F: FnMut(&Graph, EntityId),
{
    if !graph.has_node(source) {
        return Err(GraphError::UnknownNode(source));
    }

    let mut visited = HashSet::new();
    visited.insert(source);
    frontier.push(source);

    while let Some(node) = frontier.pop() {
        for next in graph.neighbors(node)? {
            if visited.insert(next) {
                frontier.push(next);
                visit(graph, next);
            }
        }
    }

    Ok(())
}

/// Breadth-first walk (FIFO frontier).
pub fn bfs<F>(graph: &Graph, source: EntityId, visit: F) -> Result<()>
where
    F: FnMut(&Graph, EntityId),
{
    walk(graph, source, VecDeque::new(), visit)
}

/// Depth-first walk (LIFO frontier).
pub fn dfs<F>(graph: &Graph, source: EntityId, visit: F) -> Result<()>
where
    F: FnMut(&Graph, EntityId),
{
    walk(graph, source, Vec::new(), visit)
}

/// BFS linearization of the nodes reachable from `source`.
pub fn bfs_order(graph: &Graph, source: EntityId) -> Result<Vec<EntityId>> {
    let mut ordering = Vec::new();
    bfs(graph, source, |_, id| ordering.push(id))?;
    Ok(ordering)
}

/// DFS linearization of the nodes reachable from `source`.
pub fn dfs_order(graph: &Graph, source: EntityId) -> Result<Vec<EntityId>> {
    let mut ordering = Vec::new();
    dfs(graph, source, |_, id| ordering.push(id))?;
    Ok(ordering)
}
