//! Shared types for the centerline reduction engine.

use std::fmt;

use geo::Euclidean;
use geo::line_measures::Length;
use serde::{Deserialize, Serialize};

use crate::reduce::ReductionStrategy;

/// A 2D point in the skeleton's planar coordinate system.
///
/// Equality is exact floating-point equality. Graph node identity goes
/// one step further and compares bit patterns (see
/// [`crate::graph::SkeletonGraph`]).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Easting (or any planar x coordinate).
    pub x: f64,
    /// Northing (or any planar y coordinate).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Returns `true` if both coordinates are finite.
    #[must_use]
    pub const fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<Point> for geo::Coord<f64> {
    fn from(p: Point) -> Self {
        Self { x: p.x, y: p.y }
    }
}

/// An ordered sequence of points.
///
/// Input skeletons arrive as polylines, and every branch the engine
/// produces is emitted as one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline(Vec<Point>);

impl Polyline {
    /// Create a new polyline from a vector of points.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns `true` if the polyline has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of points in the polyline.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the first point, if any.
    #[must_use]
    pub fn first(&self) -> Option<&Point> {
        self.0.first()
    }

    /// Returns the last point, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Point> {
        self.0.last()
    }

    /// Returns a slice of all points.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Total Euclidean length along the vertices.
    ///
    /// Polylines with fewer than two points have length zero.
    #[must_use]
    pub fn length(&self) -> f64 {
        let line_string: geo::LineString<f64> =
            self.0.iter().copied().map(geo::Coord::from).collect();
        Euclidean.length(&line_string)
    }
}

impl From<Vec<(f64, f64)>> for Polyline {
    fn from(coords: Vec<(f64, f64)>) -> Self {
        Self(coords.into_iter().map(|(x, y)| Point::new(x, y)).collect())
    }
}

/// Identifier of the source polygon a skeleton was derived from.
///
/// Upstream tables key highwalls by either integer or text ids; both
/// are accepted and rendered as text on output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PolygonId {
    /// Numeric feature id.
    Integer(i64),
    /// Textual feature id.
    Text(String),
}

impl fmt::Display for PolygonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for PolygonId {
    fn from(id: i64) -> Self {
        Self::Integer(id)
    }
}

impl From<&str> for PolygonId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_owned())
    }
}

/// Raw medial-axis skeleton of one highwall polygon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skeleton {
    /// Source polygon identifier.
    pub id: PolygonId,
    /// Skeleton polylines as produced by the centerline routine.
    pub polylines: Vec<Polyline>,
}

impl Skeleton {
    /// Create a skeleton from an id and its polylines.
    #[must_use]
    pub fn new(id: impl Into<PolygonId>, polylines: Vec<Polyline>) -> Self {
        Self {
            id: id.into(),
            polylines,
        }
    }
}

/// A bounded-length centerline piece, the engine's final output unit.
///
/// Field names match the database columns (`id`, `geometry`, `length`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Source polygon identifier.
    pub id: PolygonId,
    /// Segment vertices.
    pub geometry: Polyline,
    /// Euclidean length of `geometry`.
    pub length: f64,
}

impl Segment {
    /// Create a segment, computing its length from the geometry.
    #[must_use]
    pub fn new(id: PolygonId, geometry: Polyline) -> Self {
        let length = geometry.length();
        Self {
            id,
            geometry,
            length,
        }
    }
}

/// Configuration for the centerline engine.
///
/// Every threshold is in the units of the skeleton's coordinate system
/// (metres for the UTM inputs this was tuned on). Call
/// [`validate`](Self::validate) once before processing a batch;
/// [`crate::process_batch`] does this for you.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CenterlineConfig {
    /// Dead-end paths (endpoint to junction) shorter than this are pruned.
    pub min_spur_length: f64,

    /// Number of spur pruning passes. Passes stop early once a pass
    /// removes nothing. Zero disables pruning.
    pub spur_passes: u32,

    /// Branches shorter than this are discarded by the junction splitter.
    pub min_branch_length: f64,

    /// Spines shorter than this end spine extraction.
    /// Only used by [`ReductionStrategy::SpineExtraction`].
    pub min_spine_length: f64,

    /// Which graph reduction runs between pruning and splitting.
    pub reduction: ReductionStrategy,

    /// Preferred segment length.
    pub target_segment_length: f64,

    /// Polylines no longer than this are emitted unsplit.
    pub max_segment_length: f64,

    /// A trailing piece shorter than this is folded into its neighbours.
    pub min_segment_length: f64,
}

impl CenterlineConfig {
    /// Default spur pruning threshold.
    pub const DEFAULT_MIN_SPUR_LENGTH: f64 = 10.0;
    /// Default number of spur pruning passes.
    pub const DEFAULT_SPUR_PASSES: u32 = 1;
    /// Default minimum branch length.
    pub const DEFAULT_MIN_BRANCH_LENGTH: f64 = 20.0;
    /// Default minimum spine length.
    pub const DEFAULT_MIN_SPINE_LENGTH: f64 = 20.0;
    /// Default reduction strategy.
    pub const DEFAULT_REDUCTION: ReductionStrategy = ReductionStrategy::JunctionSplit;
    /// Default target segment length.
    pub const DEFAULT_TARGET_SEGMENT_LENGTH: f64 = 100.0;
    /// Default maximum unsplit segment length.
    pub const DEFAULT_MAX_SEGMENT_LENGTH: f64 = 150.0;
    /// Default minimum trailing segment length.
    pub const DEFAULT_MIN_SEGMENT_LENGTH: f64 = 50.0;

    /// Check the configuration for caller errors.
    ///
    /// # Errors
    ///
    /// Returns [`CenterlineError::InvalidConfig`] if any length is
    /// negative or non-finite, or if the segment bounds do not satisfy
    /// `min_segment_length < target_segment_length < max_segment_length`.
    pub fn validate(&self) -> Result<(), CenterlineError> {
        let lengths = [
            ("min_spur_length", self.min_spur_length),
            ("min_branch_length", self.min_branch_length),
            ("min_spine_length", self.min_spine_length),
        ];
        for (name, value) in lengths {
            if !value.is_finite() || value < 0.0 {
                return Err(CenterlineError::InvalidConfig(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }
        crate::segment::SegmentParams::new(
            self.target_segment_length,
            self.max_segment_length,
            self.min_segment_length,
        )
        .map(|_| ())
    }

    /// Segment bounds as validated [`SegmentParams`](crate::segment::SegmentParams).
    ///
    /// # Errors
    ///
    /// Returns [`CenterlineError::InvalidConfig`] if the bounds are
    /// inconsistent.
    pub fn segment_params(&self) -> Result<crate::segment::SegmentParams, CenterlineError> {
        crate::segment::SegmentParams::new(
            self.target_segment_length,
            self.max_segment_length,
            self.min_segment_length,
        )
    }
}

impl Default for CenterlineConfig {
    fn default() -> Self {
        Self {
            min_spur_length: Self::DEFAULT_MIN_SPUR_LENGTH,
            spur_passes: Self::DEFAULT_SPUR_PASSES,
            min_branch_length: Self::DEFAULT_MIN_BRANCH_LENGTH,
            min_spine_length: Self::DEFAULT_MIN_SPINE_LENGTH,
            reduction: Self::DEFAULT_REDUCTION,
            target_segment_length: Self::DEFAULT_TARGET_SEGMENT_LENGTH,
            max_segment_length: Self::DEFAULT_MAX_SEGMENT_LENGTH,
            min_segment_length: Self::DEFAULT_MIN_SEGMENT_LENGTH,
        }
    }
}

/// Errors that can occur while reducing a skeleton.
///
/// [`InvalidConfig`](Self::InvalidConfig) is a caller bug and aborts a
/// batch up front. Every other variant is scoped to a single polygon:
/// [`crate::process_batch`] logs it and moves on.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
pub enum CenterlineError {
    /// Engine configuration is invalid.
    #[error("invalid centerline configuration: {0}")]
    InvalidConfig(String),

    /// A skeleton vertex has a NaN or infinite coordinate.
    #[error("skeleton contains a non-finite coordinate ({x}, {y})")]
    NonFiniteCoordinate {
        /// The offending x coordinate.
        x: f64,
        /// The offending y coordinate.
        y: f64,
    },

    /// Shortest-path reconstruction failed during spine extraction.
    #[error("path reconstruction failed: {0}")]
    PathReconstruction(String),

    /// Processing panicked and was caught at the polygon boundary.
    #[error("processing panicked: {0}")]
    Panicked(String),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // --- Point tests ---

    #[test]
    fn point_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance(b) - 5.0).abs() < f64::EPSILON);
        assert!((a.distance_squared(b) - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn point_is_finite() {
        assert!(Point::new(1.0, 2.0).is_finite());
        assert!(!Point::new(f64::NAN, 2.0).is_finite());
        assert!(!Point::new(1.0, f64::INFINITY).is_finite());
    }

    // --- Polyline tests ---

    #[test]
    fn polyline_length_sums_edges() {
        let pl = Polyline::from(vec![(0.0, 0.0), (3.0, 4.0), (3.0, 10.0)]);
        assert!((pl.length() - 11.0).abs() < 1e-10);
    }

    #[test]
    fn polyline_length_degenerate_is_zero() {
        assert!(Polyline::new(vec![]).length().abs() < f64::EPSILON);
        assert!(
            Polyline::new(vec![Point::new(5.0, 5.0)])
                .length()
                .abs()
                < f64::EPSILON
        );
    }

    #[test]
    fn polyline_first_and_last() {
        let pl = Polyline::from(vec![(1.0, 2.0), (3.0, 4.0), (5.0, 6.0)]);
        assert_eq!(pl.first(), Some(&Point::new(1.0, 2.0)));
        assert_eq!(pl.last(), Some(&Point::new(5.0, 6.0)));
        assert_eq!(pl.len(), 3);
    }

    // --- PolygonId tests ---

    #[test]
    fn polygon_id_display() {
        assert_eq!(PolygonId::Integer(42).to_string(), "42");
        assert_eq!(PolygonId::from("hw-7").to_string(), "hw-7");
    }

    #[test]
    fn polygon_id_deserializes_either_form() {
        let int: PolygonId = serde_json::from_str("17").unwrap();
        assert_eq!(int, PolygonId::Integer(17));
        let text: PolygonId = serde_json::from_str("\"A-17\"").unwrap();
        assert_eq!(text, PolygonId::Text("A-17".to_string()));
    }

    // --- Segment tests ---

    #[test]
    fn segment_new_computes_length() {
        let seg = Segment::new(
            PolygonId::Integer(1),
            Polyline::from(vec![(0.0, 0.0), (6.0, 8.0)]),
        );
        assert!((seg.length - 10.0).abs() < 1e-10);
    }

    #[test]
    fn segment_serializes_with_database_field_names() {
        let seg = Segment::new(
            PolygonId::from("a"),
            Polyline::from(vec![(0.0, 0.0), (1.0, 0.0)]),
        );
        let value = serde_json::to_value(&seg).unwrap();
        assert!(value.get("id").is_some());
        assert!(value.get("geometry").is_some());
        assert!(value.get("length").is_some());
    }

    // --- CenterlineConfig tests ---

    #[test]
    fn config_defaults_match_field_values() {
        let config = CenterlineConfig::default();
        assert!((config.min_spur_length - 10.0).abs() < f64::EPSILON);
        assert_eq!(config.spur_passes, 1);
        assert!((config.min_branch_length - 20.0).abs() < f64::EPSILON);
        assert!((config.min_spine_length - 20.0).abs() < f64::EPSILON);
        assert_eq!(config.reduction, ReductionStrategy::JunctionSplit);
        assert!((config.target_segment_length - 100.0).abs() < f64::EPSILON);
        assert!((config.max_segment_length - 150.0).abs() < f64::EPSILON);
        assert!((config.min_segment_length - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn default_config_is_valid() {
        assert!(CenterlineConfig::default().validate().is_ok());
    }

    #[test]
    fn config_rejects_min_not_below_target() {
        let config = CenterlineConfig {
            min_segment_length: 100.0,
            ..CenterlineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CenterlineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn config_rejects_negative_spur_length() {
        let config = CenterlineConfig {
            min_spur_length: -1.0,
            ..CenterlineConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("min_spur_length"));
    }

    #[test]
    fn config_rejects_nan_branch_length() {
        let config = CenterlineConfig {
            min_branch_length: f64::NAN,
            ..CenterlineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_partial_json_fills_defaults() {
        let config: CenterlineConfig =
            serde_json::from_str(r#"{"min_spur_length": 4.0, "spur_passes": 3}"#).unwrap();
        assert!((config.min_spur_length - 4.0).abs() < f64::EPSILON);
        assert_eq!(config.spur_passes, 3);
        assert!((config.target_segment_length - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn config_serde_round_trip() {
        let config = CenterlineConfig {
            min_spur_length: 5.0,
            spur_passes: 2,
            min_branch_length: 15.0,
            min_spine_length: 25.0,
            reduction: ReductionStrategy::SpineExtraction,
            target_segment_length: 80.0,
            max_segment_length: 120.0,
            min_segment_length: 30.0,
        };
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: CenterlineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    // --- CenterlineError tests ---

    #[test]
    fn error_display() {
        let err = CenterlineError::NonFiniteCoordinate {
            x: f64::NAN,
            y: 1.0,
        };
        assert_eq!(
            err.to_string(),
            "skeleton contains a non-finite coordinate (NaN, 1)"
        );
        let err = CenterlineError::InvalidConfig("bad".to_string());
        assert_eq!(err.to_string(), "invalid centerline configuration: bad");
    }

    #[test]
    fn error_serde_round_trip() {
        let err = CenterlineError::PathReconstruction("stalled".to_string());
        let json = serde_json::to_string(&err).unwrap();
        let deserialized: CenterlineError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, deserialized);
    }
}
