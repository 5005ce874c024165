//! Opinion dynamics: edge sampling, the voter and Sznajd update rules,
//! and consensus detection.
//!
//! The engine carries no state of its own. Opinions live in the node
//! records of the [`EntityStore`]; topology comes from the [`Graph`]; all
//! randomness is drawn from the caller's RNG.

use crate::entity::{EntityId, EntityStore};
use crate::graph::{Edge, Graph};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Update rule applied on each tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Model {
    /// The sampled node adopts its neighbor's opinion
    #[default]
    Voter,

    /// An agreeing pair converts its neighborhood
    Sznajd,
}

impl Model {
    pub fn all() -> Vec<Model> {
        vec![Model::Voter, Model::Sznajd]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Model::Voter => "voter",
            Model::Sznajd => "sznajd",
        }
    }

    /// The other model (UI toggle).
    pub fn toggle(self) -> Model {
        match self {
            Model::Voter => Model::Sznajd,
            Model::Sznajd => Model::Voter,
        }
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Model {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "voter" => Ok(Model::Voter),
            "sznajd" => Ok(Model::Sznajd),
            _ => Err(format!("Unknown model: {}", s)),
        }
    }
}

/// Result of one dynamics step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The graph has no edges; nothing to sample
    Idle,

    /// A rule was applied to `edge`; `changed` lists nodes whose opinion flipped
    Applied { edge: Edge, changed: Vec<EntityId> },
}

impl StepOutcome {
    pub fn changed(&self) -> &[EntityId] {
        match self {
            StepOutcome::Idle => &[],
            StepOutcome::Applied { changed, .. } => changed,
        }
    }
}

/// Draws an edge uniformly at random, or `None` if the graph has no edges.
///
/// Walks the derived edge sequence to the drawn index, so the cost is
/// proportional to the edge count.
pub fn sample_edge<R: Rng + ?Sized>(graph: &Graph, rng: &mut R) -> Option<Edge> {
    let count = graph.edge_count();
    if count == 0 {
        return None;
    }
    let idx = rng.gen_range(0..count);
    graph.edges().nth(idx)
}

/// Assigns every node a fair-coin opinion.
pub fn init_opinions<R: Rng + ?Sized>(graph: &Graph, store: &mut EntityStore, rng: &mut R) {
    for id in graph.node_ids() {
        let opinion = rng.gen_bool(0.5);
        match store.node_mut(id) {
            Some(node) => node.opinion = opinion,
            None => warn!("Node {} has no record; opinion not initialized", id),
        }
    }
}

/// True iff every node shares one opinion.
///
/// Global over all nodes regardless of connectivity. An empty graph counts
/// as consensus since no node disagrees. Nodes without a record are ignored.
pub fn is_consensus(graph: &Graph, store: &EntityStore) -> bool {
    let mut opinions = graph.node_ids().filter_map(|id| store.node(id).map(|n| n.opinion));
    match opinions.next() {
        Some(first) => opinions.all(|opinion| opinion == first),
        None => true,
    }
}

/// Fraction of nodes holding opinion `true` (0.0 on an empty graph).
pub fn opinion_share(graph: &Graph, store: &EntityStore) -> f64 {
    let (total, positive) = graph
        .node_ids()
        .filter_map(|id| store.node(id))
        .fold((0usize, 0usize), |(t, p), node| (t + 1, p + usize::from(node.opinion)));

    if total == 0 {
        0.0
    } else {
        positive as f64 / total as f64
    }
}

fn endpoint_opinions(store: &EntityStore, (a, b): Edge) -> Option<(bool, bool)> {
    let first = store.node(a)?.opinion;
    let second = store.node(b)?.opinion;
    Some((first, second))
}

/// Voter rule on `(a, b)`: `a` adopts `b`'s opinion if they differ.
///
/// Returns the ids whose opinion changed. No-op if either record is absent.
pub fn step_voter(store: &mut EntityStore, edge: Edge) -> Vec<EntityId> {
    let (a, _) = edge;
    let Some((first, second)) = endpoint_opinions(store, edge) else {
        return Vec::new();
    };

    if first == second {
        return Vec::new();
    }

    match store.node_mut(a) {
        Some(node) => {
            node.opinion = second;
            vec![a]
        }
        None => Vec::new(),
    }
}

/// Tracks original opinions of every node written during one step.
struct Persuasion<'a> {
    store: &'a mut EntityStore,
    original: BTreeMap<EntityId, bool>,
}

impl<'a> Persuasion<'a> {
    fn new(store: &'a mut EntityStore) -> Self {
        Self {
            store,
            original: BTreeMap::new(),
        }
    }

    fn convert(&mut self, targets: impl Iterator<Item = EntityId>, opinion: bool) {
        for id in targets {
            if let Some(node) = self.store.node_mut(id) {
                self.original.entry(id).or_insert(node.opinion);
                node.opinion = opinion;
            }
        }
    }

    fn changed(self) -> Vec<EntityId> {
        let store = self.store;
        self.original
            .into_iter()
            .filter(|(id, before)| store.node(*id).is_some_and(|n| n.opinion != *before))
            .map(|(id, _)| id)
            .collect()
    }
}

/// Sznajd rule on `(a, b)`.
///
/// Agreeing pair: every out-neighbor of `a` and of `b` takes the shared
/// opinion. Disagreeing pair: out-neighbors of `a` other than `b` take `a`'s
/// opinion, then out-neighbors of `b` other than `a` take `b`'s (a node
/// adjacent to both ends up with `b`'s opinion).
///
/// Returns the ids whose opinion changed. No-op if either record is absent.
pub fn step_sznajd(graph: &Graph, store: &mut EntityStore, edge: Edge) -> Vec<EntityId> {
    let (a, b) = edge;
    let Some((first, second)) = endpoint_opinions(store, edge) else {
        return Vec::new();
    };

    let neighbors_of = |id: EntityId| graph.neighbors(id).into_iter().flatten();
    let mut persuasion = Persuasion::new(store);

    if first == second {
        persuasion.convert(neighbors_of(a), first);
        persuasion.convert(neighbors_of(b), first);
    } else {
        persuasion.convert(neighbors_of(a).filter(|&n| n != b), first);
        persuasion.convert(neighbors_of(b).filter(|&n| n != a), second);
    }

    persuasion.changed()
}

/// Samples an edge and applies `model`'s rule to it.
pub fn step<R: Rng + ?Sized>(
    graph: &Graph,
    store: &mut EntityStore,
    rng: &mut R,
    model: Model,
) -> StepOutcome {
    let Some(edge) = sample_edge(graph, rng) else {
        return StepOutcome::Idle;
    };

    if store.node(edge.0).is_none() || store.node(edge.1).is_none() {
        warn!("Sampled edge ({}, {}) has a missing record", edge.0, edge.1);
    }

    let changed = match model {
        Model::Voter => step_voter(store, edge),
        Model::Sznajd => step_sznajd(graph, store, edge),
    };

    if !changed.is_empty() {
        debug!("{} step on ({}, {}) flipped {} node(s)", model, edge.0, edge.1, changed.len());
    }

    StepOutcome::Applied { edge, changed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::BTreeSet;

    const TEST_SIZE: usize = 16;

    fn setup(n: usize) -> (EntityStore, Graph, Vec<EntityId>) {
        let mut store = EntityStore::new();
        let graph = Graph::with_nodes(&mut store, n).unwrap();
        let ids = graph.node_ids().collect();
        (store, graph, ids)
    }

    fn complete(graph: &mut Graph, ids: &[EntityId]) {
        for &u in ids {
            for &v in ids {
                if u != v {
                    graph.add_edge(u, v).unwrap();
                }
            }
        }
    }

    fn set(store: &mut EntityStore, id: EntityId, opinion: bool) {
        store.node_mut(id).unwrap().opinion = opinion;
    }

    fn opinion(store: &EntityStore, id: EntityId) -> bool {
        store.node(id).unwrap().opinion
    }

    #[test]
    fn test_model_parse_and_toggle() {
        assert_eq!("Voter".parse::<Model>().unwrap(), Model::Voter);
        assert_eq!("sznajd".parse::<Model>().unwrap(), Model::Sznajd);
        assert!("majority".parse::<Model>().is_err());
        assert_eq!(Model::Voter.toggle(), Model::Sznajd);
        assert_eq!(Model::Sznajd.toggle().to_string(), "voter");
        assert_eq!(serde_json::to_string(&Model::Sznajd).unwrap(), "\"sznajd\"");
    }

    #[test]
    fn test_sample_edge_empty_graph() {
        let (_store, graph, _ids) = setup(TEST_SIZE);
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        assert_eq!(sample_edge(&graph, &mut rng), None);
    }

    #[test]
    fn test_sample_edge_covers_all_edges() {
        let (_store, mut graph, ids) = setup(4);
        complete(&mut graph, &ids);
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let mut seen = BTreeSet::new();
        for _ in 0..2000 {
            let edge = sample_edge(&graph, &mut rng).unwrap();
            assert!(graph.has_edge(edge.0, edge.1).unwrap());
            seen.insert(edge);
        }

        assert_eq!(seen.len(), graph.edge_count());
    }

    #[test]
    fn test_init_opinions_deterministic() {
        let (mut s1, g1, _) = setup(64);
        let (mut s2, g2, _) = setup(64);

        init_opinions(&g1, &mut s1, &mut ChaCha8Rng::seed_from_u64(5));
        init_opinions(&g2, &mut s2, &mut ChaCha8Rng::seed_from_u64(5));

        let o1: Vec<_> = g1.node_ids().map(|id| opinion(&s1, id)).collect();
        let o2: Vec<_> = g2.node_ids().map(|id| opinion(&s2, id)).collect();
        assert_eq!(o1, o2);

        // 64 fair coins are all equal with probability 2^-63
        let share = opinion_share(&g1, &s1);
        assert!(share > 0.0 && share < 1.0);
    }

    #[test]
    fn test_consensus_detection() {
        let (mut store, graph, ids) = setup(TEST_SIZE);
        for &id in &ids {
            set(&mut store, id, true);
        }
        assert!(is_consensus(&graph, &store));
        assert_eq!(opinion_share(&graph, &store), 1.0);

        set(&mut store, ids[7], false);
        assert!(!is_consensus(&graph, &store));
    }

    #[test]
    fn test_consensus_empty_graph() {
        let store = EntityStore::new();
        let graph = Graph::new();

        assert!(is_consensus(&graph, &store));
        assert_eq!(opinion_share(&graph, &store), 0.0);
    }

    #[test]
    fn test_consensus_ignores_connectivity() {
        // Two isolated nodes that disagree are not a consensus
        let (mut store, graph, ids) = setup(2);
        set(&mut store, ids[0], true);

        assert!(!is_consensus(&graph, &store));
    }

    #[test]
    fn test_voter_adopts_second_endpoint() {
        let (mut store, mut graph, ids) = setup(2);
        graph.add_edge(ids[0], ids[1]).unwrap();
        set(&mut store, ids[0], false);
        set(&mut store, ids[1], true);

        let changed = step_voter(&mut store, (ids[0], ids[1]));

        assert_eq!(changed, vec![ids[0]]);
        assert!(opinion(&store, ids[0]));
        assert!(opinion(&store, ids[1]));
    }

    #[test]
    fn test_voter_noop_when_agreeing() {
        let (mut store, _graph, ids) = setup(2);

        assert!(step_voter(&mut store, (ids[0], ids[1])).is_empty());
        assert!(!opinion(&store, ids[0]));
    }

    #[test]
    fn test_voter_missing_record() {
        let (mut store, _graph, ids) = setup(2);
        set(&mut store, ids[1], true);
        store.remove(ids[0]);

        assert!(step_voter(&mut store, (ids[0], ids[1])).is_empty());
        assert!(step_voter(&mut store, (ids[1], ids[0])).is_empty());
    }

    #[test]
    fn test_sznajd_agreeing_pair_converts_path() {
        // a - b - c, undirected
        let (mut store, mut graph, ids) = setup(3);
        let (a, b, c) = (ids[0], ids[1], ids[2]);
        for (u, v) in [(a, b), (b, a), (b, c), (c, b)] {
            graph.add_edge(u, v).unwrap();
        }
        set(&mut store, a, true);
        set(&mut store, b, true);

        let changed = step_sznajd(&graph, &mut store, (a, b));

        assert_eq!(changed, vec![c]);
        assert!(opinion(&store, c));
    }

    #[test]
    fn test_sznajd_agreeing_pair_leaves_outsider() {
        // c points at b but is nobody's out-neighbor
        let (mut store, mut graph, ids) = setup(3);
        let (a, b, c) = (ids[0], ids[1], ids[2]);
        for (u, v) in [(a, b), (b, a), (c, b)] {
            graph.add_edge(u, v).unwrap();
        }
        set(&mut store, a, true);
        set(&mut store, b, true);

        let changed = step_sznajd(&graph, &mut store, (a, b));

        assert!(changed.is_empty());
        assert!(!opinion(&store, c));
    }

    #[test]
    fn test_sznajd_disagreeing_pair_sways_own_followers() {
        // a -> {b, x}, b -> {a, y}
        let (mut store, mut graph, ids) = setup(4);
        let (a, b, x, y) = (ids[0], ids[1], ids[2], ids[3]);
        for (u, v) in [(a, b), (a, x), (b, a), (b, y)] {
            graph.add_edge(u, v).unwrap();
        }
        set(&mut store, a, true);
        set(&mut store, y, true);

        let changed = step_sznajd(&graph, &mut store, (a, b));

        assert!(opinion(&store, a));
        assert!(!opinion(&store, b));
        assert!(opinion(&store, x));
        assert!(!opinion(&store, y));
        assert_eq!(changed, vec![x, y]);
    }

    #[test]
    fn test_sznajd_shared_follower_takes_second_opinion() {
        let (mut store, mut graph, ids) = setup(3);
        let (a, b, c) = (ids[0], ids[1], ids[2]);
        for (u, v) in [(a, b), (a, c), (b, c)] {
            graph.add_edge(u, v).unwrap();
        }
        set(&mut store, a, true);

        let changed = step_sznajd(&graph, &mut store, (a, b));

        // c was set true by a, then back to false by b: net no change
        assert!(!opinion(&store, c));
        assert!(changed.is_empty());
    }

    #[test]
    fn test_step_idle_on_edgeless_graph() {
        let (mut store, graph, _ids) = setup(TEST_SIZE);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        for model in Model::all() {
            assert_eq!(step(&graph, &mut store, &mut rng, model), StepOutcome::Idle);
        }
    }

    #[test]
    fn test_voter_reaches_consensus_on_complete_graph() {
        let (mut store, mut graph, ids) = setup(TEST_SIZE);
        complete(&mut graph, &ids);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        init_opinions(&graph, &mut store, &mut rng);

        let mut ticks = 0;
        while !is_consensus(&graph, &store) && ticks < 100_000 {
            step(&graph, &mut store, &mut rng, Model::Voter);
            ticks += 1;
        }

        assert!(is_consensus(&graph, &store), "no consensus after {ticks} ticks");
    }

    #[test]
    fn test_sznajd_reaches_consensus_on_complete_graph() {
        let (mut store, mut graph, ids) = setup(TEST_SIZE);
        complete(&mut graph, &ids);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        init_opinions(&graph, &mut store, &mut rng);

        let mut ticks = 0;
        while !is_consensus(&graph, &store) && ticks < 10_000 {
            let outcome = step(&graph, &mut store, &mut rng, Model::Sznajd);
            assert!(matches!(outcome, StepOutcome::Applied { .. }));
            ticks += 1;
        }

        assert!(is_consensus(&graph, &store));
    }
}
