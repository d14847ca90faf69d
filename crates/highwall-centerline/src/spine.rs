//! Spine extraction: peel the longest paths out of a skeleton forest.
//!
//! Each round picks the connected component with the most edges, finds
//! its weighted diameter path (two farthest-node sweeps followed by a
//! shortest-path query between the results), and moves that path into
//! the output. Rounds stop when the graph is empty or the best remaining
//! structure is shorter than the minimum spine length.

use std::collections::HashSet;

use petgraph::stable_graph::{EdgeIndex, NodeIndex};
use serde::{Deserialize, Serialize};

use crate::graph::SkeletonGraph;
use crate::types::{CenterlineError, Point};

/// What spine extraction kept and what it left behind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpineReport {
    /// Length of each extracted spine, in extraction order.
    pub spine_lengths: Vec<f64>,
    /// Total length of edges not claimed by any spine.
    pub length_discarded: f64,
}

impl SpineReport {
    /// Number of spines extracted.
    #[must_use]
    pub const fn spine_count(&self) -> usize {
        self.spine_lengths.len()
    }

    /// Total length across all spines.
    #[must_use]
    pub fn length_extracted(&self) -> f64 {
        self.spine_lengths.iter().sum()
    }
}

/// Extract every spine at least `min_spine_length` long.
///
/// Consumes the graph and returns a new graph holding only the spine
/// edges. Components containing cycles are handled by the shortest-path
/// step, which always yields a simple path.
///
/// # Errors
///
/// Returns [`CenterlineError::PathReconstruction`] if the shortest-path
/// query between the two diameter ends cannot be rebuilt.
pub fn extract_spines(
    mut graph: SkeletonGraph,
    min_spine_length: f64,
) -> Result<(SkeletonGraph, SpineReport), CenterlineError> {
    let mut spine_pairs: Vec<(Point, Point)> = Vec::new();
    let mut report = SpineReport::default();

    while !graph.is_empty() {
        let components = graph.components();
        let Some(component) = largest_component(&graph, &components) else {
            break;
        };
        if component_length(&graph, component) < min_spine_length {
            break;
        }

        let edges = diameter_edges(&graph, component)?;
        let length: f64 = edges.iter().filter_map(|&e| graph.edge_weight(e)).sum();
        if edges.is_empty() || length < min_spine_length {
            break;
        }

        tracing::trace!(edges = edges.len(), length, "extracted spine");
        spine_pairs.extend(edges.iter().filter_map(|&e| {
            let (a, b) = graph.edge_endpoints(e)?;
            Some((graph.point(a)?, graph.point(b)?))
        }));
        report.spine_lengths.push(length);
        graph.remove_edges(edges);
        graph.remove_isolated_nodes();
    }

    report.length_discarded = graph.total_length();
    tracing::debug!(
        spines = report.spine_count(),
        length_discarded = report.length_discarded,
        "spine extraction complete"
    );

    Ok((SkeletonGraph::from_point_pairs(spine_pairs), report))
}

/// Component with the most edges; the earliest wins a tie.
fn largest_component<'a>(
    graph: &SkeletonGraph,
    components: &'a [Vec<NodeIndex>],
) -> Option<&'a [NodeIndex]> {
    let mut best: Option<(&[NodeIndex], usize)> = None;
    for component in components {
        let count = graph.edge_count_within(component);
        if count > 0 && best.is_none_or(|(_, c)| count > c) {
            best = Some((component.as_slice(), count));
        }
    }
    best.map(|(component, _)| component)
}

fn component_length(graph: &SkeletonGraph, component: &[NodeIndex]) -> f64 {
    let members: HashSet<NodeIndex> = component.iter().copied().collect();
    graph
        .edges()
        .filter(|(_, a, b, _)| members.contains(a) && members.contains(b))
        .map(|(.., w)| w)
        .sum()
}

/// Edges of the component's diameter path.
fn diameter_edges(
    graph: &SkeletonGraph,
    component: &[NodeIndex],
) -> Result<Vec<EdgeIndex>, CenterlineError> {
    let Some(&start) = component.first() else {
        return Ok(Vec::new());
    };
    let one_end = farthest_node(graph, start);
    let other_end = farthest_node(graph, one_end);
    let path = graph.shortest_path(one_end, other_end)?;

    Ok(path
        .windows(2)
        .filter_map(|pair| graph.edge_between(pair[0], pair[1]))
        .collect())
}

/// Farthest node from `start` by accumulated edge weight.
///
/// Depth-first with an explicit stack; a node's distance is fixed the
/// first time it is popped, which on a tree is its unique path length.
/// The first node to reach the maximum wins.
fn farthest_node(graph: &SkeletonGraph, start: NodeIndex) -> NodeIndex {
    let mut visited: HashSet<NodeIndex> = HashSet::new();
    let mut stack = vec![(start, 0.0_f64)];
    let mut farthest = (start, 0.0_f64);

    while let Some((node, distance)) = stack.pop() {
        if !visited.insert(node) {
            continue;
        }
        if distance > farthest.1 {
            farthest = (node, distance);
        }
        for (_, neighbor, weight) in graph.incident_edges(node) {
            if !visited.contains(&neighbor) {
                stack.push((neighbor, distance + weight));
            }
        }
    }

    farthest.0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::Polyline;

    fn graph_of(lines: &[&[(f64, f64)]]) -> SkeletonGraph {
        let polylines: Vec<Polyline> = lines.iter().map(|l| Polyline::from(l.to_vec())).collect();
        SkeletonGraph::from_polylines(&polylines).0
    }

    #[test]
    fn empty_graph_yields_no_spines() {
        let (spines, report) = extract_spines(SkeletonGraph::new(), 20.0).unwrap();
        assert!(spines.is_empty());
        assert_eq!(report.spine_count(), 0);
    }

    #[test]
    fn straight_line_is_one_spine() {
        let graph = graph_of(&[&[(0.0, 0.0), (10.0, 0.0), (25.0, 0.0), (40.0, 0.0)]]);
        let (spines, report) = extract_spines(graph, 20.0).unwrap();
        assert_eq!(spines.edge_count(), 3);
        assert_eq!(report.spine_count(), 1);
        assert!((report.length_extracted() - 40.0).abs() < 1e-9);
        assert!(report.length_discarded.abs() < 1e-9);
    }

    #[test]
    fn short_arm_is_left_behind() {
        // 30 m trunk continuing into a 25 m arm, with a 5 m side arm.
        let graph = graph_of(&[
            &[(0.0, 0.0), (30.0, 0.0)],
            &[(30.0, 0.0), (55.0, 0.0)],
            &[(30.0, 0.0), (30.0, 5.0)],
        ]);
        let (spines, report) = extract_spines(graph, 20.0).unwrap();
        assert_eq!(report.spine_lengths.len(), 1);
        assert!((report.spine_lengths[0] - 55.0).abs() < 1e-9);
        assert!((report.length_discarded - 5.0).abs() < 1e-9);
        assert!(spines.node_at(Point::new(30.0, 5.0)).is_none());
        assert!(!spines.has_junctions());
    }

    #[test]
    fn cross_yields_two_spines() {
        let graph = graph_of(&[
            &[(-25.0, 0.0), (0.0, 0.0), (25.0, 0.0)],
            &[(0.0, -25.0), (0.0, 0.0), (0.0, 25.0)],
        ]);
        let (spines, report) = extract_spines(graph, 20.0).unwrap();
        assert_eq!(report.spine_count(), 2);
        for length in &report.spine_lengths {
            assert!((length - 50.0).abs() < 1e-9);
        }
        assert_eq!(spines.edge_count(), 4);
    }

    #[test]
    fn components_are_visited_largest_first() {
        let graph = graph_of(&[
            &[(100.0, 0.0), (130.0, 0.0)],
            &[
                (0.0, 0.0),
                (10.0, 0.0),
                (20.0, 0.0),
                (30.0, 0.0),
                (40.0, 0.0),
                (50.0, 0.0),
            ],
        ]);
        let (_, report) = extract_spines(graph, 20.0).unwrap();
        assert_eq!(report.spine_lengths.len(), 2);
        assert!((report.spine_lengths[0] - 50.0).abs() < 1e-9);
        assert!((report.spine_lengths[1] - 30.0).abs() < 1e-9);
    }

    #[test]
    fn short_structure_is_discarded() {
        let graph = graph_of(&[&[(0.0, 0.0), (15.0, 0.0)]]);
        let (spines, report) = extract_spines(graph, 20.0).unwrap();
        assert!(spines.is_empty());
        assert!((report.length_discarded - 15.0).abs() < 1e-9);
    }

    #[test]
    fn spine_follows_length_not_hop_count() {
        // A 10 m arm drawn with ten hops, beside a 40 m and a 30 m arm of
        // one hop each. The many-hop arm is the shortest by length.
        let hops: Vec<(f64, f64)> = (0..=10).map(|i| (f64::from(i), 0.0)).collect();
        let graph = graph_of(&[
            hops.as_slice(),
            &[(0.0, 0.0), (0.0, 40.0)],
            &[(0.0, 0.0), (0.0, -30.0)],
        ]);
        let (spines, report) = extract_spines(graph, 20.0).unwrap();
        assert_eq!(report.spine_count(), 1);
        assert!((report.spine_lengths[0] - 70.0).abs() < 1e-9);
        assert!((report.length_discarded - 10.0).abs() < 1e-9);
        assert!(spines.node_at(Point::new(0.0, 40.0)).is_some());
        assert!(spines.node_at(Point::new(0.0, -30.0)).is_some());
        assert!(spines.node_at(Point::new(10.0, 0.0)).is_none());
        assert_eq!(spines.edge_count(), 2);
    }

    #[test]
    fn cycle_is_peeled_without_error() {
        let graph = graph_of(&[&[
            (0.0, 0.0),
            (10.0, 0.0),
            (10.0, 10.0),
            (0.0, 10.0),
            (0.0, 0.0),
        ]]);
        let (spines, report) = extract_spines(graph, 5.0).unwrap();
        // The first sweep pair lands on adjacent nodes, so the first spine
        // is the single edge between them and the rest of the ring follows.
        assert_eq!(report.spine_count(), 2);
        assert!((report.spine_lengths[0] - 10.0).abs() < 1e-9);
        assert!((report.length_extracted() - 40.0).abs() < 1e-9);
        assert!(spines.total_length() <= 40.0 + 1e-9);
    }
}
