//! highwall-centerline: Centerline graph reduction and segmentation (sans-IO).
//!
//! Turns the raw medial-axis skeleton of a highwall polygon into clean,
//! bounded-length centerline segments through:
//! graph build -> spur pruning -> reduction -> junction splitting ->
//! linearization -> segmentation.
//!
//! This crate has **no I/O dependencies**. It consumes in-memory
//! [`Skeleton`]s and returns [`Segment`]s; reading skeleton tables and
//! writing results lives in `highwall-bench` or the caller's own tooling.

pub mod batch;
pub mod diagnostics;
pub mod graph;
pub mod linearize;
pub mod pipeline;
pub mod prune;
pub mod reduce;
pub mod segment;
pub mod spine;
pub mod split;
pub mod types;

pub use batch::{BatchOutput, PolygonFailure, process_batch, process_batch_with_diagnostics};
pub use pipeline::Pipeline;
pub use reduce::{ReductionStrategy, SkeletonReducer};
pub use types::{CenterlineConfig, CenterlineError, Point, PolygonId, Polyline, Segment, Skeleton};

/// Run the full centerline pipeline on one skeleton.
///
/// # Pipeline steps
///
/// 1. Validate the configuration and coordinates, then build the
///    weighted skeleton graph
/// 2. Prune short dead-end spurs
/// 3. Reduce the graph (pluggable strategy)
/// 4. Split at junctions into branches
/// 5. Linearize each branch into an ordered polyline
/// 6. Split long polylines into segments near the target length
///
/// An empty or fully pruned skeleton yields an empty `Vec`, not an error.
///
/// # Errors
///
/// Returns [`CenterlineError::InvalidConfig`] if `config` is invalid.
/// Returns [`CenterlineError::NonFiniteCoordinate`] if the skeleton has a
/// NaN or infinite vertex.
/// Returns [`CenterlineError::PathReconstruction`] if spine extraction
/// cannot rebuild a shortest path.
///
/// # Examples
///
/// ```
/// use highwall_centerline::{CenterlineConfig, Polyline, Skeleton, process};
///
/// let skeleton = Skeleton::new(1, vec![Polyline::from(vec![(0.0, 0.0), (40.0, 0.0)])]);
/// let segments = process(skeleton, &CenterlineConfig::default()).unwrap();
/// assert_eq!(segments.len(), 1);
/// assert!((segments[0].length - 40.0).abs() < 1e-9);
/// ```
pub fn process(
    skeleton: Skeleton,
    config: &CenterlineConfig,
) -> Result<Vec<Segment>, CenterlineError> {
    Ok(Pipeline::new(skeleton, config.clone())
        .build()?
        .prune()
        .reduce()?
        .split()
        .linearize()
        .segment()
        .into_segments())
}
