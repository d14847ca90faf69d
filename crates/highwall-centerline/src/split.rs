//! Junction splitting: decompose a skeleton graph into junction-free
//! branches.
//!
//! Significant points are endpoints (degree 1) and junctions (degree > 2).
//! A direct path runs between two significant points through degree-2
//! nodes only, so no direct path can carry an interior junction. Every
//! such path is found by walking outward from each significant point
//! along each incident edge until the next significant point is reached.
//! Parallel paths between the same pair of points are distinct edge
//! chains and are kept as separate branches.
//!
//! Edges not on any direct path (rings hanging off a single junction and
//! junction-free cycles in otherwise branched graphs) are grouped into
//! connected chains afterwards and filtered by the same minimum length.

use std::collections::{BTreeSet, HashSet};

use petgraph::stable_graph::{EdgeIndex, NodeIndex};
use serde::{Deserialize, Serialize};

use crate::graph::{Branch, SkeletonGraph};
use crate::types::Point;

/// What the splitter found and kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SplitReport {
    /// Junction nodes in the input graph.
    pub junctions: usize,
    /// Endpoint nodes in the input graph.
    pub endpoints: usize,
    /// Direct paths between distinct significant points.
    pub direct_paths: usize,
    /// Chains assembled from edges left over after direct paths.
    pub leftover_chains: usize,
    /// Branches returned.
    pub branches_kept: usize,
    /// Branches dropped for being shorter than the minimum.
    pub branches_discarded: usize,
    /// Total length of dropped branches.
    pub length_discarded: f64,
}

impl SplitReport {
    fn keep_or_discard(&mut self, branch: Branch, min_length: f64, out: &mut Vec<Branch>) {
        let length = branch.length();
        if length >= min_length {
            self.branches_kept += 1;
            out.push(branch);
        } else {
            self.branches_discarded += 1;
            self.length_discarded += length;
        }
    }
}

/// Split `graph` at its junctions.
///
/// An edgeless graph yields no branches. A graph without junctions is
/// returned whole as a single branch with no length filter applied.
/// Otherwise every direct path and every leftover chain at least
/// `min_branch_length` long becomes a branch. Direct paths appear in
/// ascending order of the node they were first reached from, followed
/// by leftover chains.
///
/// Edges of a direct path are claimed whether or not the path survives
/// the length filter, so a discarded short path never resurfaces as part
/// of a leftover chain.
///
/// # Examples
///
/// ```
/// use highwall_centerline::graph::SkeletonGraph;
/// use highwall_centerline::split::split_at_junctions;
/// use highwall_centerline::Polyline;
///
/// // A "+" with four 25 m arms.
/// let (graph, _) = SkeletonGraph::from_polylines(&[
///     Polyline::from(vec![(-25.0, 0.0), (0.0, 0.0), (25.0, 0.0)]),
///     Polyline::from(vec![(0.0, -25.0), (0.0, 0.0), (0.0, 25.0)]),
/// ]);
/// let (branches, _) = split_at_junctions(graph, 20.0);
/// assert_eq!(branches.len(), 4);
/// ```
#[must_use]
pub fn split_at_junctions(
    graph: SkeletonGraph,
    min_branch_length: f64,
) -> (Vec<Branch>, SplitReport) {
    let mut report = SplitReport::default();
    if graph.is_empty() {
        return (Vec::new(), report);
    }

    let junctions = graph.junctions();
    let endpoints = graph.endpoints();
    report.junctions = junctions.len();
    report.endpoints = endpoints.len();

    if junctions.is_empty() {
        report.branches_kept = 1;
        return (vec![Branch::from_graph(&graph)], report);
    }

    let significant: BTreeSet<NodeIndex> = endpoints.into_iter().chain(junctions).collect();
    let mut claimed: HashSet<EdgeIndex> = HashSet::with_capacity(graph.edge_count());
    let mut branches = Vec::new();

    for &start in &significant {
        let first_steps: Vec<(EdgeIndex, NodeIndex, f64)> = graph.incident_edges(start).collect();
        for first_step in first_steps {
            if claimed.contains(&first_step.0) {
                continue;
            }
            let Some(chain) = walk_chain(&graph, &significant, start, first_step) else {
                continue;
            };
            claimed.extend(chain.iter().copied());
            report.direct_paths += 1;
            report.keep_or_discard(
                Branch::from_edge_indices(&graph, chain),
                min_branch_length,
                &mut branches,
            );
        }
    }

    for chain in leftover_chains(&graph, &claimed) {
        report.leftover_chains += 1;
        let anchor = chain_junction(&graph, &chain);
        let branch = Branch::from_edge_indices(&graph, chain);
        let branch = match anchor {
            Some(point) => branch.with_start(point),
            None => branch,
        };
        report.keep_or_discard(branch, min_branch_length, &mut branches);
    }

    tracing::debug!(
        junctions = report.junctions,
        direct_paths = report.direct_paths,
        leftover_chains = report.leftover_chains,
        kept = report.branches_kept,
        discarded = report.branches_discarded,
        "junction split complete"
    );

    (branches, report)
}

/// Follow degree-2 nodes from `start` along `first_step` until another
/// significant point is reached.
///
/// Returns `None` when the walk comes back to `start` (a ring on a single
/// point) or cannot continue; those edges are left for the leftover pass.
fn walk_chain(
    graph: &SkeletonGraph,
    significant: &BTreeSet<NodeIndex>,
    start: NodeIndex,
    first_step: (EdgeIndex, NodeIndex, f64),
) -> Option<Vec<EdgeIndex>> {
    let (first_edge, mut current, _) = first_step;
    let mut chain = vec![first_edge];
    let mut last_edge = first_edge;

    while !significant.contains(&current) {
        if chain.len() > graph.edge_count() {
            return None;
        }
        let (edge, next, _) = graph
            .incident_edges(current)
            .find(|&(e, ..)| e != last_edge)?;
        chain.push(edge);
        last_edge = edge;
        current = next;
    }

    (current != start).then_some(chain)
}

/// Group unclaimed edges into connected chains.
///
/// Seeds are taken in ascending edge order; each chain grows through any
/// unclaimed edge sharing a node with an edge already in it.
fn leftover_chains(graph: &SkeletonGraph, claimed: &HashSet<EdgeIndex>) -> Vec<Vec<EdgeIndex>> {
    let mut taken: HashSet<EdgeIndex> = claimed.clone();
    let mut chains = Vec::new();

    let seeds: Vec<EdgeIndex> = graph
        .edges()
        .map(|(e, ..)| e)
        .filter(|e| !claimed.contains(e))
        .collect();

    for seed in seeds {
        if !taken.insert(seed) {
            continue;
        }
        let mut chain = Vec::new();
        let mut stack = vec![seed];
        while let Some(edge) = stack.pop() {
            chain.push(edge);
            let Some((a, b)) = graph.edge_endpoints(edge) else {
                continue;
            };
            for node in [a, b] {
                for (next, ..) in graph.incident_edges(node) {
                    if taken.insert(next) {
                        stack.push(next);
                    }
                }
            }
        }
        chains.push(chain);
    }

    chains
}

/// Lowest-index junction touched by `chain`, as a coordinate.
///
/// A ring hanging off a junction is opened there so the junction ends up
/// at the end of the emitted line rather than inside it.
fn chain_junction(graph: &SkeletonGraph, chain: &[EdgeIndex]) -> Option<Point> {
    chain
        .iter()
        .filter_map(|&e| graph.edge_endpoints(e))
        .flat_map(|(a, b)| [a, b])
        .filter(|&n| graph.degree(n) > 2)
        .min()
        .and_then(|n| graph.point(n))
}
