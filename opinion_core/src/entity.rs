//! Entity store - maps opaque integer ids to simulation records.
//!
//! Ids come from a single monotonically increasing counter. They are never
//! reused while the store is alive; only [`EntityStore::clear`] resets the
//! counter. Each simulation owns its own store, so independent simulations
//! (and tests) never share an id space.

use crate::error::{GraphError, Result};
use crate::graph::Node;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Opaque identifier for a simulation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u32);

impl EntityId {
    /// Reserved so that `u32::MAX` can never name a live entity.
    pub const RESERVED: u32 = u32::MAX;

}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for EntityId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.trim().parse().map(EntityId)
    }
}

impl From<u32> for EntityId {
    fn from(raw: u32) -> Self {
        EntityId(raw)
    }
}

/// Payload stored behind an id.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    /// A graph node (agent) record
    Node(Node),

    /// Free-form annotation sharing the id space (cluster names, markers)
    Label(String),
}

impl Entity {
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Entity::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_node_mut(&mut self) -> Option<&mut Node> {
        match self {
            Entity::Node(node) => Some(node),
            _ => None,
        }
    }
}

impl From<Node> for Entity {
    fn from(node: Node) -> Self {
        Entity::Node(node)
    }
}

/// Registry of live entities for one simulation.
#[derive(Debug, Default)]
pub struct EntityStore {
    /// Live payloads keyed by id
    entities: HashMap<EntityId, Entity>,

    /// Next id handed out by the allocator
    next_id: u32,
}

impl EntityStore {
    /// Creates an empty store with the counter at 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a payload and returns its id.
    ///
    /// With `id == None` the next counter value is allocated. A pinned id is
    /// used verbatim (snapshot replay) and the counter is moved past it so
    /// later allocations cannot collide.
    pub fn register(&mut self, payload: impl Into<Entity>, id: Option<EntityId>) -> Result<EntityId> {
        let id = match id {
            Some(id) => {
                if id.0 == EntityId::RESERVED {
                    return Err(GraphError::IdOverflow);
                }
                if self.entities.contains_key(&id) {
                    return Err(GraphError::IdInUse(id));
                }
                self.next_id = self.next_id.max(id.0 + 1);
                id
            }
            None => self.allocate()?,
        };

        self.entities.insert(id, payload.into());
        Ok(id)
    }

    fn allocate(&mut self) -> Result<EntityId> {
        if self.next_id >= EntityId::RESERVED {
            return Err(GraphError::IdOverflow);
        }
        let id = EntityId(self.next_id);
        self.next_id += 1;
        Ok(id)
    }

    /// Returns the payload for `id`, or `None` if nothing is registered.
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Returns the node record for `id` if it exists and is a node.
    pub fn node(&self, id: EntityId) -> Option<&Node> {
        self.get(id).and_then(Entity::as_node)
    }

    pub fn node_mut(&mut self, id: EntityId) -> Option<&mut Node> {
        self.get_mut(id).and_then(Entity::as_node_mut)
    }

    /// Erases the mapping entry and hands the payload back to the caller.
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.remove(&id)
    }

    /// Drops every entity and resets the id counter.
    ///
    /// Invalidates all previously issued ids; any graph still holding them
    /// must be discarded.
    pub fn clear(&mut self) {
        self.entities.clear();
        self.next_id = 0;
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// The id the next unpinned registration will receive.
    pub fn peek_next_id(&self) -> EntityId {
        EntityId(self.next_id)
    }

    /// Moves the counter back to `next` after the ids issued since were
    /// removed again (failed snapshot replay).
    pub(crate) fn rewind(&mut self, next: EntityId) {
        self.next_id = next.0;
    }
}
