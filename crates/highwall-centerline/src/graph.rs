//! Weighted skeleton graph: coordinate nodes joined by length-weighted edges.
//!
//! Nodes live in an index arena ([`StableUnGraph`]) so that edge and node
//! removal never invalidates the indices other stages hold. A side table
//! maps each coordinate to its node. Coordinates are compared by exact
//! value: two polylines share a node only when they share a vertex
//! exactly, with no snapping tolerance. `-0.0` and `0.0` are the same
//! value and therefore the same node.

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::algo::dijkstra;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableUnGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use serde::{Deserialize, Serialize};

use crate::types::{CenterlineError, Point, Polyline};

/// Hashable exact-value identity of a coordinate.
///
/// Signed zeros are folded together before taking the bit pattern, so
/// equality here matches `f64` equality for every finite coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CoordKey {
    x_bits: u64,
    y_bits: u64,
}

impl CoordKey {
    const fn from_point(p: Point) -> Self {
        Self {
            x_bits: (p.x + 0.0).to_bits(),
            y_bits: (p.y + 0.0).to_bits(),
        }
    }
}

/// Counts gathered while building a graph from polylines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReport {
    /// Polylines that contributed at least one segment.
    pub polylines_used: usize,
    /// Polylines skipped for having fewer than two points.
    pub polylines_skipped: usize,
    /// Consecutive identical vertices skipped (they would be self-loops).
    pub self_loops_skipped: usize,
    /// Segments that repeated an existing edge.
    pub duplicate_edges: usize,
}

/// Undirected skeleton graph with Euclidean edge weights.
///
/// Stages that mutate the graph take it by value and hand back the
/// reduced graph, so no two stages ever observe the same instance.
#[derive(Debug, Clone, Default)]
pub struct SkeletonGraph {
    graph: StableUnGraph<Point, f64>,
    nodes: HashMap<CoordKey, NodeIndex>,
}

impl SkeletonGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from skeleton polylines.
    ///
    /// Every consecutive vertex pair becomes an edge weighted by its
    /// Euclidean length. Repeated pairs collapse into one edge, and
    /// polylines with fewer than two points are skipped.
    #[must_use]
    pub fn from_polylines(polylines: &[Polyline]) -> (Self, BuildReport) {
        let mut graph = Self::new();
        let mut report = BuildReport::default();

        for polyline in polylines {
            let pts = polyline.points();
            if pts.len() < 2 {
                tracing::trace!(points = pts.len(), "skipping degenerate polyline");
                report.polylines_skipped += 1;
                continue;
            }
            report.polylines_used += 1;
            for pair in pts.windows(2) {
                match graph.insert_edge(pair[0], pair[1]) {
                    EdgeInsert::Added => {}
                    EdgeInsert::Existing => report.duplicate_edges += 1,
                    EdgeInsert::SelfLoop => report.self_loops_skipped += 1,
                }
            }
        }

        (graph, report)
    }

    /// Build a graph from explicit point pairs, recomputing every weight.
    #[must_use]
    pub fn from_point_pairs(pairs: impl IntoIterator<Item = (Point, Point)>) -> Self {
        let mut graph = Self::new();
        for (a, b) in pairs {
            graph.insert_edge(a, b);
        }
        graph
    }

    fn node_for(&mut self, p: Point) -> NodeIndex {
        let graph = &mut self.graph;
        *self
            .nodes
            .entry(CoordKey::from_point(p))
            .or_insert_with(|| graph.add_node(p))
    }

    fn insert_edge(&mut self, a: Point, b: Point) -> EdgeInsert {
        if CoordKey::from_point(a) == CoordKey::from_point(b) {
            return EdgeInsert::SelfLoop;
        }
        let na = self.node_for(a);
        let nb = self.node_for(b);
        let weight = a.distance(b);
        if let Some(existing) = self.graph.find_edge(na, nb) {
            self.graph[existing] = weight;
            EdgeInsert::Existing
        } else {
            self.graph.add_edge(na, nb, weight);
            EdgeInsert::Added
        }
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns `true` if the graph has no edges.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.edge_count() == 0
    }

    /// Sum of all edge weights.
    #[must_use]
    pub fn total_length(&self) -> f64 {
        self.graph.edge_references().map(|e| *e.weight()).sum()
    }

    /// Coordinate of a node.
    #[must_use]
    pub fn point(&self, node: NodeIndex) -> Option<Point> {
        self.graph.node_weight(node).copied()
    }

    /// Node at an exact coordinate, if present.
    #[must_use]
    pub fn node_at(&self, p: Point) -> Option<NodeIndex> {
        self.nodes.get(&CoordKey::from_point(p)).copied()
    }

    /// All live node indices in ascending order.
    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    /// Number of edges incident to `node`.
    #[must_use]
    pub fn degree(&self, node: NodeIndex) -> usize {
        self.graph.edges(node).count()
    }

    /// Nodes adjacent to `node`.
    pub fn neighbors(&self, node: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors(node)
    }

    /// Edge joining `a` and `b`, if any.
    #[must_use]
    pub fn edge_between(&self, a: NodeIndex, b: NodeIndex) -> Option<EdgeIndex> {
        self.graph.find_edge(a, b)
    }

    /// Weight of an edge.
    #[must_use]
    pub fn edge_weight(&self, edge: EdgeIndex) -> Option<f64> {
        self.graph.edge_weight(edge).copied()
    }

    /// Endpoint nodes of an edge.
    #[must_use]
    pub fn edge_endpoints(&self, edge: EdgeIndex) -> Option<(NodeIndex, NodeIndex)> {
        self.graph.edge_endpoints(edge)
    }

    /// Edges incident to `node` as `(edge, neighbor, weight)`.
    pub fn incident_edges(
        &self,
        node: NodeIndex,
    ) -> impl Iterator<Item = (EdgeIndex, NodeIndex, f64)> + '_ {
        self.graph.edges(node).map(move |e| {
            let other = if e.source() == node {
                e.target()
            } else {
                e.source()
            };
            (e.id(), other, *e.weight())
        })
    }

    /// All edges as `(edge, a, b, weight)` in ascending edge order.
    pub fn edges(&self) -> impl Iterator<Item = (EdgeIndex, NodeIndex, NodeIndex, f64)> + '_ {
        self.graph
            .edge_references()
            .map(|e| (e.id(), e.source(), e.target(), *e.weight()))
    }

    /// Degree-1 nodes.
    #[must_use]
    pub fn endpoints(&self) -> Vec<NodeIndex> {
        self.node_indices().filter(|&n| self.degree(n) == 1).collect()
    }

    /// Nodes of degree greater than two.
    #[must_use]
    pub fn junctions(&self) -> Vec<NodeIndex> {
        self.node_indices().filter(|&n| self.degree(n) > 2).collect()
    }

    /// Returns `true` if any node has degree greater than two.
    #[must_use]
    pub fn has_junctions(&self) -> bool {
        self.node_indices().any(|n| self.degree(n) > 2)
    }

    /// Remove the given edges. Unknown or already removed edges are
    /// ignored. Returns the number of edges actually removed.
    pub fn remove_edges(&mut self, edges: impl IntoIterator<Item = EdgeIndex>) -> usize {
        edges
            .into_iter()
            .filter(|&e| self.graph.remove_edge(e).is_some())
            .count()
    }

    /// Remove every node left with no incident edges. Returns how many
    /// were removed.
    pub fn remove_isolated_nodes(&mut self) -> usize {
        let isolated: Vec<NodeIndex> = self
            .node_indices()
            .filter(|&n| self.degree(n) == 0)
            .collect();
        for &node in &isolated {
            if let Some(p) = self.graph.remove_node(node) {
                self.nodes.remove(&CoordKey::from_point(p));
            }
        }
        isolated.len()
    }

    /// Connected components as node lists, ordered by their lowest node
    /// index. Nodes within a component appear in breadth-first order.
    #[must_use]
    pub fn components(&self) -> Vec<Vec<NodeIndex>> {
        let mut seen: HashSet<NodeIndex> = HashSet::with_capacity(self.node_count());
        let mut components = Vec::new();

        for start in self.node_indices() {
            if !seen.insert(start) {
                continue;
            }
            let mut component = vec![start];
            let mut queue = VecDeque::from([start]);
            while let Some(node) = queue.pop_front() {
                for next in self.neighbors(node) {
                    if seen.insert(next) {
                        component.push(next);
                        queue.push_back(next);
                    }
                }
            }
            components.push(component);
        }

        components
    }

    /// Number of edges with both ends inside `nodes`.
    #[must_use]
    pub fn edge_count_within(&self, nodes: &[NodeIndex]) -> usize {
        let members: HashSet<NodeIndex> = nodes.iter().copied().collect();
        self.edges()
            .filter(|(_, a, b, _)| members.contains(a) && members.contains(b))
            .count()
    }

    /// Copy of the subgraph induced by `nodes`.
    #[must_use]
    pub fn subgraph(&self, nodes: &[NodeIndex]) -> Self {
        let members: HashSet<NodeIndex> = nodes.iter().copied().collect();
        let pairs = self
            .edges()
            .filter(|(_, a, b, _)| members.contains(a) && members.contains(b))
            .filter_map(|(_, a, b, _)| Some((self.point(a)?, self.point(b)?)));
        Self::from_point_pairs(pairs)
    }

    /// Weighted shortest path from `start` to `end` as a node sequence.
    ///
    /// Costs come from Dijkstra; the path is then rebuilt backwards from
    /// `end` by stepping to any unvisited neighbour whose cost plus the
    /// connecting edge weight matches the current node's cost.
    ///
    /// # Errors
    ///
    /// Returns [`CenterlineError::PathReconstruction`] if `end` is
    /// unreachable or the backwards walk stalls.
    pub fn shortest_path(
        &self,
        start: NodeIndex,
        end: NodeIndex,
    ) -> Result<Vec<NodeIndex>, CenterlineError> {
        if start == end {
            return Ok(vec![start]);
        }

        let costs = dijkstra(&self.graph, start, Some(end), |e| *e.weight());
        let Some(&end_cost) = costs.get(&end) else {
            return Err(CenterlineError::PathReconstruction(format!(
                "end node {end:?} is unreachable from start {start:?}"
            )));
        };

        let mut visited = HashSet::from([end]);
        let mut path = vec![end];
        let mut current = end;
        let mut current_cost = end_cost;
        while current != start {
            let next = self.incident_edges(current).find(|&(_, neighbor, weight)| {
                !visited.contains(&neighbor)
                    && costs
                        .get(&neighbor)
                        .is_some_and(|&cost| (cost + weight - current_cost).abs() < 1e-9)
            });
            let Some((_, neighbor, _)) = next else {
                return Err(CenterlineError::PathReconstruction(format!(
                    "reconstruction stalled at node {current:?} \
                     (start={start:?}, end={end:?}, path len so far={})",
                    path.len()
                )));
            };
            visited.insert(neighbor);
            path.push(neighbor);
            current = neighbor;
            current_cost = costs.get(&neighbor).copied().unwrap_or(f64::INFINITY);
        }
        path.reverse();

        Ok(path)
    }

    /// Split into one graph per connected component.
    #[must_use]
    pub fn into_components(self) -> Vec<Self> {
        let components = self.components();
        if components.len() <= 1 {
            return vec![self];
        }
        components.iter().map(|c| self.subgraph(c)).collect()
    }
}

/// Outcome of inserting a single segment.
enum EdgeInsert {
    Added,
    Existing,
    SelfLoop,
}

/// One edge of a [`Branch`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BranchEdge {
    /// First endpoint.
    pub a: Point,
    /// Second endpoint.
    pub b: Point,
    /// Euclidean length of the edge.
    pub weight: f64,
}

/// A bag of edges forming one maximal path between significant points.
///
/// Produced by the junction splitter and consumed by the linearizer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    edges: Vec<BranchEdge>,
    /// Preferred first vertex when the branch has no free end.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    start: Option<Point>,
}

impl Branch {
    /// Create a branch from edges.
    #[must_use]
    pub const fn new(edges: Vec<BranchEdge>) -> Self {
        Self { edges, start: None }
    }

    /// Set the vertex a closed branch is walked from.
    ///
    /// Only consulted when the branch has no degree-1 vertex; the
    /// splitter uses it to open a ring at the junction it hangs from.
    #[must_use]
    pub const fn with_start(mut self, start: Point) -> Self {
        self.start = Some(start);
        self
    }

    /// Preferred first vertex for a closed branch, if any.
    #[must_use]
    pub const fn start(&self) -> Option<Point> {
        self.start
    }

    /// Collect the edges of `graph` into a branch.
    #[must_use]
    pub fn from_graph(graph: &SkeletonGraph) -> Self {
        Self::from_edge_indices(graph, graph.edges().map(|(e, ..)| e))
    }

    /// Collect the given edges of `graph` into a branch.
    pub fn from_edge_indices(
        graph: &SkeletonGraph,
        edges: impl IntoIterator<Item = EdgeIndex>,
    ) -> Self {
        let edges = edges
            .into_iter()
            .filter_map(|e| {
                let (a, b) = graph.edge_endpoints(e)?;
                Some(BranchEdge {
                    a: graph.point(a)?,
                    b: graph.point(b)?,
                    weight: graph.edge_weight(e)?,
                })
            })
            .collect();
        Self { edges, start: None }
    }

    /// The branch's edges.
    #[must_use]
    pub fn edges(&self) -> &[BranchEdge] {
        &self.edges
    }

    /// Number of edges.
    #[must_use]
    pub const fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Returns `true` if the branch has no edges.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Sum of edge weights.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.edges.iter().map(|e| e.weight).sum()
    }

    /// Rebuild a standalone graph from the branch's edges.
    #[must_use]
    pub fn into_graph(self) -> SkeletonGraph {
        SkeletonGraph::from_point_pairs(self.edges.into_iter().map(|e| (e.a, e.b)))
    }
}
