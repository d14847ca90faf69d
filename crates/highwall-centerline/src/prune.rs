//! Spur pruning: remove short dead-end paths hanging off junctions.
//!
//! A spur is the chain of degree-2 nodes walked from an endpoint until a
//! junction is reached. Spurs shorter than the threshold are skeleton
//! noise (medial-axis whiskers at polygon corners) and are removed.
//! Chains that end at another endpoint are isolated lines and are kept
//! regardless of length; chains between two junctions are never touched.

use std::collections::HashSet;

use petgraph::stable_graph::{EdgeIndex, NodeIndex};
use serde::{Deserialize, Serialize};

use crate::graph::SkeletonGraph;

/// What a pruning run removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PruneReport {
    /// Passes actually executed (a pass that removes nothing ends the run).
    pub passes_run: u32,
    /// Spurs removed across all passes.
    pub spurs_removed: usize,
    /// Edges removed across all passes.
    pub edges_removed: usize,
    /// Nodes left isolated and removed across all passes.
    pub nodes_removed: usize,
    /// Total weight of removed edges.
    pub length_removed: f64,
}

/// Remove spurs shorter than `min_length` in a single pass.
///
/// Every endpoint is walked against the graph as it stood at the start
/// of the pass; marked edges are removed together afterwards, followed by
/// any nodes left isolated. Spurs exposed by this pass are not revisited
/// (use [`prune_spurs_repeated`] for that).
///
/// # Examples
///
/// ```
/// use highwall_centerline::graph::SkeletonGraph;
/// use highwall_centerline::prune::prune_spurs;
/// use highwall_centerline::Polyline;
///
/// // A 30 m trunk with two 5 m whiskers at its far end.
/// let (graph, _) = SkeletonGraph::from_polylines(&[
///     Polyline::from(vec![(0.0, 0.0), (30.0, 0.0)]),
///     Polyline::from(vec![(30.0, 0.0), (35.0, 0.0)]),
///     Polyline::from(vec![(30.0, 0.0), (30.0, 5.0)]),
/// ]);
/// let (pruned, report) = prune_spurs(graph, 10.0);
/// assert_eq!(pruned.edge_count(), 1);
/// assert_eq!(report.spurs_removed, 2);
/// ```
#[must_use]
pub fn prune_spurs(mut graph: SkeletonGraph, min_length: f64) -> (SkeletonGraph, PruneReport) {
    let mut marked: HashSet<EdgeIndex> = HashSet::new();
    let mut spurs_removed = 0;

    for endpoint in graph.endpoints() {
        if let Some(spur) = walk_spur(&graph, endpoint)
            && spur.length < min_length
        {
            spurs_removed += 1;
            marked.extend(spur.edges);
        }
    }

    let length_removed: f64 = marked.iter().filter_map(|&e| graph.edge_weight(e)).sum();
    let edges_removed = graph.remove_edges(marked);
    let nodes_removed = graph.remove_isolated_nodes();

    tracing::debug!(
        spurs_removed,
        edges_removed,
        nodes_removed,
        "spur pruning pass complete"
    );

    (
        graph,
        PruneReport {
            passes_run: 1,
            spurs_removed,
            edges_removed,
            nodes_removed,
            length_removed,
        },
    )
}

/// Run up to `passes` pruning passes, stopping early once a pass removes
/// nothing. Zero passes returns the graph untouched.
#[must_use]
pub fn prune_spurs_repeated(
    mut graph: SkeletonGraph,
    min_length: f64,
    passes: u32,
) -> (SkeletonGraph, PruneReport) {
    let mut total = PruneReport::default();

    for _ in 0..passes {
        let (next, report) = prune_spurs(graph, min_length);
        graph = next;
        total.passes_run += 1;
        total.spurs_removed += report.spurs_removed;
        total.edges_removed += report.edges_removed;
        total.nodes_removed += report.nodes_removed;
        total.length_removed += report.length_removed;
        if report.edges_removed == 0 {
            break;
        }
    }

    (graph, total)
}

/// A dead-end chain that terminated at a junction.
struct Spur {
    edges: Vec<EdgeIndex>,
    length: f64,
}

/// Walk from `endpoint` along degree-2 nodes.
///
/// Returns `Some` only when the walk reaches a junction; walks that end
/// at another endpoint (or run out of unvisited neighbours) return `None`.
fn walk_spur(graph: &SkeletonGraph, endpoint: NodeIndex) -> Option<Spur> {
    let mut edges = Vec::new();
    let mut length = 0.0;
    let mut previous: Option<NodeIndex> = None;
    let mut current = endpoint;

    // Each step consumes one edge, so a walk can never be longer than the
    // edge count.
    for _ in 0..=graph.edge_count() {
        let degree = graph.degree(current);
        if degree == 0 {
            return None;
        }
        if degree > 2 {
            return Some(Spur { edges, length });
        }
        if degree == 1 && current != endpoint {
            return None;
        }

        let (edge, next, weight) = graph
            .incident_edges(current)
            .find(|&(_, n, _)| Some(n) != previous)?;
        edges.push(edge);
        length += weight;
        previous = Some(current);
        current = next;
    }

    None
}
