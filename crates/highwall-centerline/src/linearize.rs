//! Turn branches into ordered polylines.

use std::collections::HashSet;

use petgraph::stable_graph::NodeIndex;

use crate::graph::{Branch, SkeletonGraph};
use crate::types::{Point, Polyline};

/// Order a branch's edges into a polyline.
///
/// The walk starts at the branch's first degree-1 node. A branch with no
/// free end, such as a ring, starts at [`Branch::start`] when that vertex
/// belongs to it, and at its first node otherwise. From there the walk
/// repeatedly steps to an unvisited
/// neighbour. On a simple path this visits every vertex in order. On
/// anything else the walk stops at the first dead end and the result
/// covers only part of the branch.
///
/// Returns `None` for a branch with no edges.
///
/// # Examples
///
/// ```
/// use highwall_centerline::graph::{Branch, BranchEdge};
/// use highwall_centerline::linearize::linearize;
/// use highwall_centerline::Point;
///
/// let edge = |a: (f64, f64), b: (f64, f64)| BranchEdge {
///     a: Point::new(a.0, a.1),
///     b: Point::new(b.0, b.1),
///     weight: 0.0,
/// };
/// // Edges listed out of order still come back as one ordered line.
/// let branch = Branch::new(vec![
///     edge((10.0, 0.0), (20.0, 0.0)),
///     edge((0.0, 0.0), (10.0, 0.0)),
/// ]);
/// let line = linearize(&branch).unwrap();
/// assert_eq!(line.len(), 3);
/// assert!((line.length() - 20.0).abs() < 1e-9);
/// ```
#[must_use]
pub fn linearize(branch: &Branch) -> Option<Polyline> {
    let graph = branch.clone().into_graph();
    walk(&graph, branch.start())
}

/// Order each connected piece of a branch into its own polyline.
///
/// A junction-free graph with several components arrives from the
/// splitter as one branch; walking it whole would keep only the component
/// the walk starts in.
#[must_use]
pub fn linearize_components(branch: &Branch) -> Vec<Polyline> {
    branch
        .clone()
        .into_graph()
        .into_components()
        .iter()
        .filter_map(|component| walk(component, branch.start()))
        .collect()
}

fn walk(graph: &SkeletonGraph, preferred: Option<Point>) -> Option<Polyline> {
    let start = graph
        .endpoints()
        .into_iter()
        .min()
        .or_else(|| preferred.and_then(|p| graph.node_at(p)))
        .or_else(|| graph.node_indices().min())?;

    let mut visited: HashSet<NodeIndex> = HashSet::from([start]);
    let mut points = Vec::new();
    let mut current = start;
    loop {
        points.push(graph.point(current)?);
        let Some(next) = graph
            .neighbors(current)
            .filter(|n| !visited.contains(n))
            .min()
        else {
            break;
        };
        visited.insert(next);
        current = next;
    }

    (points.len() >= 2).then(|| Polyline::new(points))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::graph::BranchEdge;

    fn branch(pairs: &[((f64, f64), (f64, f64))]) -> Branch {
        Branch::new(
            pairs
                .iter()
                .map(|&(a, b)| {
                    let (a, b) = (Point::new(a.0, a.1), Point::new(b.0, b.1));
                    BranchEdge {
                        a,
                        b,
                        weight: a.distance(b),
                    }
                })
                .collect(),
        )
    }

    #[test]
    fn empty_branch_yields_none() {
        assert!(linearize(&Branch::default()).is_none());
        assert!(linearize_components(&Branch::default()).is_empty());
    }

    #[test]
    fn shuffled_path_is_ordered_end_to_end() {
        let b = branch(&[
            ((20.0, 0.0), (30.0, 5.0)),
            ((0.0, 0.0), (10.0, 0.0)),
            ((20.0, 0.0), (10.0, 0.0)),
        ]);
        let line = linearize(&b).unwrap();
        let pts = line.points();
        assert_eq!(pts.len(), 4);
        // The walk starts at whichever end comes first and runs to the other.
        let ends = [*line.first().unwrap(), *line.last().unwrap()];
        assert!(ends.contains(&Point::new(30.0, 5.0)));
        assert!(ends.contains(&Point::new(0.0, 0.0)));
        assert!((line.length() - b.length()).abs() < 1e-9);
    }

    #[test]
    fn ring_is_walked_without_closing() {
        let b = branch(&[
            ((0.0, 0.0), (10.0, 0.0)),
            ((10.0, 0.0), (10.0, 10.0)),
            ((10.0, 10.0), (0.0, 10.0)),
            ((0.0, 10.0), (0.0, 0.0)),
        ]);
        let line = linearize(&b).unwrap();
        assert_eq!(line.len(), 4);
        assert!((line.length() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn fork_yields_partial_line() {
        let b = branch(&[
            ((0.0, 0.0), (10.0, 0.0)),
            ((10.0, 0.0), (20.0, 5.0)),
            ((10.0, 0.0), (20.0, -5.0)),
        ]);
        let line = linearize(&b).unwrap();
        assert_eq!(line.len(), 3);
    }

    #[test]
    fn components_are_linearized_separately() {
        let b = branch(&[
            ((0.0, 0.0), (10.0, 0.0)),
            ((10.0, 0.0), (20.0, 0.0)),
            ((100.0, 0.0), (130.0, 0.0)),
        ]);
        assert_eq!(linearize(&b).unwrap().len(), 3);

        let lines = linearize_components(&b);
        assert_eq!(lines.len(), 2);
        assert!((lines[0].length() - 20.0).abs() < 1e-9);
        assert!((lines[1].length() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn ring_opens_at_its_start_vertex() {
        let b = branch(&[
            ((0.0, 0.0), (10.0, 0.0)),
            ((10.0, 0.0), (10.0, 10.0)),
            ((10.0, 10.0), (0.0, 10.0)),
            ((0.0, 10.0), (0.0, 0.0)),
        ])
        .with_start(Point::new(10.0, 10.0));
        let line = linearize(&b).unwrap();
        assert_eq!(line.first(), Some(&Point::new(10.0, 10.0)));
        assert_eq!(line.len(), 4);
        assert!(!line.points()[1..].contains(&Point::new(10.0, 10.0)));

        let lines = linearize_components(&b);
        assert_eq!(lines[0].first(), Some(&Point::new(10.0, 10.0)));
    }

    #[test]
    fn start_vertex_is_ignored_when_a_free_end_exists() {
        let b = branch(&[((0.0, 0.0), (10.0, 0.0)), ((10.0, 0.0), (20.0, 0.0))])
            .with_start(Point::new(10.0, 0.0));
        let line = linearize(&b).unwrap();
        assert_eq!(line.len(), 3);
        assert_ne!(line.first(), Some(&Point::new(10.0, 0.0)));
    }
}
