//! Incremental pipeline: advance one polygon stage by stage, inspecting
//! each intermediate result before continuing.
//!
//! [`crate::process`] runs the whole chain in one call. [`Pipeline`]
//! lets the caller drive it step by step:
//!
//! ```rust
//! # use highwall_centerline::{CenterlineConfig, CenterlineError, Pipeline, Polyline, Skeleton};
//! # fn run() -> Result<(), CenterlineError> {
//! let skeleton = Skeleton::new(7, vec![Polyline::from(vec![(0.0, 0.0), (40.0, 0.0)])]);
//! let split = Pipeline::new(skeleton, CenterlineConfig::default())
//!     .build()?
//!     .prune()
//!     .reduce()?
//!     .split();
//! assert_eq!(split.branches().len(), 1);
//!
//! let segments = split.linearize().segment().into_segments();
//! assert_eq!(segments.len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next state (or a
//! `Result` for fallible stages). The graph is moved from stage to stage,
//! so no two stages ever hold the same graph.

use crate::diagnostics::StageMetrics;
use crate::graph::{Branch, BuildReport, SkeletonGraph};
use crate::linearize::linearize_components;
use crate::prune::{PruneReport, prune_spurs_repeated};
use crate::reduce::SkeletonReducer;
use crate::segment::{SegmentParams, split_polyline};
use crate::spine::SpineReport;
use crate::split::{SplitReport, split_at_junctions};
use crate::types::{CenterlineConfig, CenterlineError, PolygonId, Polyline, Segment, Skeleton};

/// Entry point for stepping through the pipeline.
pub struct Pipeline;

impl Pipeline {
    /// Start a pipeline for one skeleton.
    ///
    /// Nothing is validated until [`Pending::build`].
    #[allow(clippy::new_ret_no_self)]
    pub const fn new(skeleton: Skeleton, config: CenterlineConfig) -> Pending {
        Pending { config, skeleton }
    }
}

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
#[must_use = "pipeline stages are consumed by advancing; call .build() to continue"]
pub struct Pending {
    config: CenterlineConfig,
    skeleton: Skeleton,
}

impl Pending {
    /// The input skeleton.
    #[must_use]
    pub const fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    /// Validate the input and build the skeleton graph.
    ///
    /// # Errors
    ///
    /// Returns [`CenterlineError::InvalidConfig`] if the configuration is
    /// invalid, or [`CenterlineError::NonFiniteCoordinate`] if any vertex
    /// has a NaN or infinite coordinate.
    pub fn build(self) -> Result<Built, CenterlineError> {
        self.config.validate()?;
        let params = self.config.segment_params()?;

        if let Some(bad) = self
            .skeleton
            .polylines
            .iter()
            .flat_map(Polyline::points)
            .find(|p| !p.is_finite())
        {
            return Err(CenterlineError::NonFiniteCoordinate { x: bad.x, y: bad.y });
        }

        let (graph, report) = SkeletonGraph::from_polylines(&self.skeleton.polylines);
        tracing::debug!(
            id = %self.skeleton.id,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            skipped = report.polylines_skipped,
            "built skeleton graph"
        );

        Ok(Built {
            config: self.config,
            params,
            id: self.skeleton.id,
            graph,
            report,
        })
    }
}

// ───────────────────────── Stage 1: Built ────────────────────────────

/// Pipeline state after building the weighted graph.
#[must_use = "pipeline stages are consumed by advancing; call .prune() to continue"]
pub struct Built {
    config: CenterlineConfig,
    params: SegmentParams,
    id: PolygonId,
    graph: SkeletonGraph,
    report: BuildReport,
}

impl Built {
    /// The freshly built graph.
    #[must_use]
    pub const fn graph(&self) -> &SkeletonGraph {
        &self.graph
    }

    /// Build counts.
    #[must_use]
    pub const fn report(&self) -> &BuildReport {
        &self.report
    }

    /// Metrics for the build stage.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        StageMetrics::Build {
            polylines_used: self.report.polylines_used,
            polylines_skipped: self.report.polylines_skipped,
            node_count: self.graph.node_count(),
            edge_count: self.graph.edge_count(),
            total_length: self.graph.total_length(),
        }
    }

    /// Remove short spurs.
    pub fn prune(self) -> Pruned {
        let (graph, report) = prune_spurs_repeated(
            self.graph,
            self.config.min_spur_length,
            self.config.spur_passes,
        );
        Pruned {
            config: self.config,
            params: self.params,
            id: self.id,
            graph,
            report,
        }
    }
}

// ───────────────────────── Stage 2: Pruned ───────────────────────────

/// Pipeline state after spur pruning.
#[must_use = "pipeline stages are consumed by advancing; call .reduce() to continue"]
pub struct Pruned {
    config: CenterlineConfig,
    params: SegmentParams,
    id: PolygonId,
    graph: SkeletonGraph,
    report: PruneReport,
}

impl Pruned {
    /// The pruned graph.
    #[must_use]
    pub const fn graph(&self) -> &SkeletonGraph {
        &self.graph
    }

    /// What pruning removed.
    #[must_use]
    pub const fn report(&self) -> &PruneReport {
        &self.report
    }

    /// Metrics for the prune stage.
    #[must_use]
    pub const fn metrics(&self) -> StageMetrics {
        StageMetrics::Prune {
            passes_run: self.report.passes_run,
            spurs_removed: self.report.spurs_removed,
            edges_removed: self.report.edges_removed,
            length_removed: self.report.length_removed,
        }
    }

    /// Run the configured [`ReductionStrategy`](crate::ReductionStrategy).
    ///
    /// # Errors
    ///
    /// Returns [`CenterlineError::PathReconstruction`] if spine extraction
    /// fails to rebuild a shortest path.
    pub fn reduce(self) -> Result<Reduced, CenterlineError> {
        let reduction = self.config.reduction.reduce(self.graph, &self.config)?;
        Ok(Reduced {
            config: self.config,
            params: self.params,
            id: self.id,
            graph: reduction.graph,
            spines: reduction.spines,
        })
    }
}

// ───────────────────────── Stage 3: Reduced ──────────────────────────

/// Pipeline state after the reduction strategy has run.
#[must_use = "pipeline stages are consumed by advancing; call .split() to continue"]
pub struct Reduced {
    config: CenterlineConfig,
    params: SegmentParams,
    id: PolygonId,
    graph: SkeletonGraph,
    spines: Option<SpineReport>,
}

impl Reduced {
    /// The graph handed to the splitter.
    #[must_use]
    pub const fn graph(&self) -> &SkeletonGraph {
        &self.graph
    }

    /// Spine statistics, when spine extraction ran.
    #[must_use]
    pub const fn spines(&self) -> Option<&SpineReport> {
        self.spines.as_ref()
    }

    /// Metrics for the reduce stage.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        StageMetrics::Reduce {
            strategy: self.config.reduction.name().to_owned(),
            spine_count: self.spines.as_ref().map(SpineReport::spine_count),
            edge_count: self.graph.edge_count(),
            total_length: self.graph.total_length(),
        }
    }

    /// Split the graph at its junctions.
    pub fn split(self) -> Split {
        let (branches, report) = split_at_junctions(self.graph, self.config.min_branch_length);
        Split {
            params: self.params,
            id: self.id,
            branches,
            report,
        }
    }
}

// ───────────────────────── Stage 4: Split ────────────────────────────

/// Pipeline state after junction splitting.
#[must_use = "pipeline stages are consumed by advancing; call .linearize() to continue"]
pub struct Split {
    params: SegmentParams,
    id: PolygonId,
    branches: Vec<Branch>,
    report: SplitReport,
}

impl Split {
    /// The kept branches.
    #[must_use]
    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    /// What the splitter found.
    #[must_use]
    pub const fn report(&self) -> &SplitReport {
        &self.report
    }

    /// Metrics for the split stage.
    #[must_use]
    pub const fn metrics(&self) -> StageMetrics {
        StageMetrics::Split {
            junctions: self.report.junctions,
            direct_paths: self.report.direct_paths,
            leftover_chains: self.report.leftover_chains,
            branches_kept: self.report.branches_kept,
            branches_discarded: self.report.branches_discarded,
        }
    }

    /// Order every branch into polylines, one per connected piece.
    pub fn linearize(self) -> Linearized {
        let polylines: Vec<Polyline> = self.branches.iter().flat_map(linearize_components).collect();
        Linearized {
            params: self.params,
            id: self.id,
            polylines,
        }
    }
}

// ───────────────────────── Stage 5: Linearized ───────────────────────

/// Pipeline state after linearizing branches.
#[must_use = "pipeline stages are consumed by advancing; call .segment() to continue"]
pub struct Linearized {
    params: SegmentParams,
    id: PolygonId,
    polylines: Vec<Polyline>,
}

impl Linearized {
    /// Ordered branch polylines.
    #[must_use]
    pub fn polylines(&self) -> &[Polyline] {
        &self.polylines
    }

    /// Metrics for the linearize stage.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        StageMetrics::Linearize {
            polyline_count: self.polylines.len(),
            point_count: self.polylines.iter().map(Polyline::len).sum(),
            total_length: self.polylines.iter().map(Polyline::length).sum(),
        }
    }

    /// Cut each polyline into bounded-length segments.
    ///
    /// Zero-length pieces are dropped so every emitted segment has
    /// positive length.
    pub fn segment(self) -> Segmented {
        let segments: Vec<Segment> = self
            .polylines
            .iter()
            .flat_map(|polyline| split_polyline(polyline, &self.params))
            .map(|piece| Segment::new(self.id.clone(), piece))
            .filter(|segment| segment.length > 0.0)
            .collect();
        tracing::debug!(
            id = %self.id,
            polylines = self.polylines.len(),
            segments = segments.len(),
            "segmented centerlines"
        );
        Segmented {
            polylines: self.polylines,
            segments,
        }
    }
}

// ───────────────────────── Stage 6: Segmented ────────────────────────

/// Final pipeline state.
#[must_use = "call .into_segments() to take the output"]
pub struct Segmented {
    polylines: Vec<Polyline>,
    segments: Vec<Segment>,
}

impl Segmented {
    /// Polylines the segments were cut from.
    #[must_use]
    pub fn polylines(&self) -> &[Polyline] {
        &self.polylines
    }

    /// Output segments.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Metrics for the segment stage.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        let lengths = || self.segments.iter().map(|s| s.length);
        StageMetrics::Segment {
            segment_count: self.segments.len(),
            min_length: lengths().reduce(f64::min).unwrap_or(0.0),
            max_length: lengths().reduce(f64::max).unwrap_or(0.0),
            total_length: lengths().sum(),
        }
    }

    /// Consume the pipeline and return its segments.
    #[must_use]
    pub fn into_segments(self) -> Vec<Segment> {
        self.segments
    }
}
