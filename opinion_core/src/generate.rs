//! Procedural graph generation: node layout plus proximity-based edges.

use crate::dynamics::init_opinions;
use crate::entity::{EntityId, EntityStore};
use crate::error::{GraphError, Result};
use crate::graph::Graph;
use crate::poisson::PoissonDisk;
use nalgebra::Point2;
use rand::Rng;
use tracing::debug;

/// Layout radius used by [`generate_graph`].
pub const DEFAULT_LAYOUT_RADIUS: f32 = 160.0;

/// Places every node uniformly in `[-radius/2, radius/2)` on both axes.
pub fn random_positions<R: Rng + ?Sized>(
    graph: &Graph,
    store: &mut EntityStore,
    rng: &mut R,
    radius: f32,
) -> Result<()> {
    for id in graph.node_ids() {
        let node = store.node_mut(id).ok_or(GraphError::UnknownNode(id))?;
        node.x = rng.gen_range(-0.5..0.5) * radius;
        node.y = rng.gen_range(-0.5..0.5) * radius;
    }
    Ok(())
}

/// Places nodes on Poisson-disk samples, in id order.
///
/// Nodes left over once the samples run out get a uniform position inside
/// the sampler's region. Returns how many nodes landed on a sample.
pub fn poisson_positions<R: Rng + ?Sized>(
    graph: &Graph,
    store: &mut EntityStore,
    rng: &mut R,
    sampler: &PoissonDisk,
) -> Result<usize> {
    let samples = sampler.sample(rng);
    let mut placed = 0;

    for (i, id) in graph.node_ids().enumerate() {
        let position = match samples.get(i) {
            Some(point) => {
                placed += 1;
                *point
            }
            None if sampler.width > 0.0 && sampler.height > 0.0 => Point2::new(
                rng.gen_range(0.0..sampler.width),
                rng.gen_range(0.0..sampler.height),
            ),
            None => Point2::origin(),
        };

        store
            .node_mut(id)
            .ok_or(GraphError::UnknownNode(id))?
            .set_position(position);
    }

    debug!("Poisson layout: {}/{} nodes on samples", placed, graph.node_count());
    Ok(placed)
}

/// Connects every pair closer than `threshold` (as a fraction of the largest
/// pairwise distance) with ONE directed edge of random orientation.
///
/// Returns the number of edges added. If all nodes coincide nothing is added.
pub fn proximity_edges<R: Rng + ?Sized>(
    graph: &mut Graph,
    store: &EntityStore,
    rng: &mut R,
    threshold: f32,
) -> Result<usize> {
    let placed: Vec<(EntityId, Point2<f32>)> = graph
        .node_ids()
        .map(|id| {
            store
                .node(id)
                .map(|node| (id, node.position()))
                .ok_or(GraphError::UnknownNode(id))
        })
        .collect::<Result<_>>()?;

    let mut max_dist = 0.0f32;
    for i in 0..placed.len() {
        for k in (i + 1)..placed.len() {
            max_dist = max_dist.max(nalgebra::distance(&placed[i].1, &placed[k].1));
        }
    }
    if max_dist <= 0.0 {
        return Ok(0);
    }

    let mut added = 0;
    for i in 0..placed.len() {
        for k in (i + 1)..placed.len() {
            let d = nalgebra::distance(&placed[i].1, &placed[k].1);
            if d / max_dist < threshold {
                let (u, v) = if rng.gen_bool(0.5) {
                    (placed[i].0, placed[k].0)
                } else {
                    (placed[k].0, placed[i].0)
                };
                if graph.add_edge(u, v)? {
                    added += 1;
                }
            }
        }
    }

    Ok(added)
}

/// Builds a random geometric graph: `n` nodes at random positions,
/// proximity edges, fair-coin opinions.
pub fn generate_graph<R: Rng + ?Sized>(
    store: &mut EntityStore,
    rng: &mut R,
    n: usize,
    threshold: f32,
) -> Result<Graph> {
    let mut graph = Graph::with_nodes(store, n)?;
    random_positions(&graph, store, rng, DEFAULT_LAYOUT_RADIUS)?;
    let edges = proximity_edges(&mut graph, store, rng, threshold)?;
    init_opinions(&graph, store, rng);

    debug!("Generated graph: {} nodes, {} edges", n, edges);
    Ok(graph)
}

/// Like [`generate_graph`] but with an evenly spaced Poisson-disk layout.
pub fn generate_spaced_graph<R: Rng + ?Sized>(
    store: &mut EntityStore,
    rng: &mut R,
    n: usize,
    threshold: f32,
    sampler: &PoissonDisk,
) -> Result<Graph> {
    let mut graph = Graph::with_nodes(store, n)?;
    poisson_positions(&graph, store, rng, &sampler.with_max_samples(n))?;
    let edges = proximity_edges(&mut graph, store, rng, threshold)?;
    init_opinions(&graph, store, rng);

    debug!("Generated spaced graph: {} nodes, {} edges", n, edges);
    Ok(graph)
}
