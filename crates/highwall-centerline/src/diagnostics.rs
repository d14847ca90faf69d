//! Per-polygon diagnostics: timing and counts for each pipeline stage.
//!
//! These diagnostics are permanent instrumentation for threshold tuning.
//! [`process_with_diagnostics`] runs the same stages as
//! [`crate::process`] and records a [`StageDiagnostics`] for each.
//!
//! Timestamps come from a caller-supplied [`Clock`], which keeps this
//! crate free of any particular time source. Durations are serialized as
//! fractional seconds (`f64`), since `std::time::Duration` does not
//! implement serde traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::pipeline::Pipeline;
use crate::types::{CenterlineConfig, CenterlineError, PolygonId, Segment, Skeleton};

/// Source of timestamps for stage timing.
pub trait Clock {
    /// Opaque timestamp type.
    type Instant;

    /// Current timestamp.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from processing one polygon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolygonDiagnostics {
    /// Source polygon identifier.
    pub id: PolygonId,
    /// Stage 1: graph construction.
    pub build: StageDiagnostics,
    /// Stage 2: spur pruning.
    pub prune: StageDiagnostics,
    /// Stage 3: graph reduction (pass-through or spine extraction).
    pub reduce: StageDiagnostics,
    /// Stage 4: junction splitting.
    pub split: StageDiagnostics,
    /// Stage 5: branch linearization.
    pub linearize: StageDiagnostics,
    /// Stage 6: segmentation.
    pub segment: StageDiagnostics,
    /// Total wall-clock duration across all stages (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Headline numbers for the polygon.
    pub summary: PolygonSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics that vary by pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Graph construction metrics.
    Build {
        /// Polylines that contributed edges.
        polylines_used: usize,
        /// Polylines skipped for having fewer than two points.
        polylines_skipped: usize,
        /// Nodes in the built graph.
        node_count: usize,
        /// Edges in the built graph.
        edge_count: usize,
        /// Sum of edge weights.
        total_length: f64,
    },
    /// Spur pruning metrics.
    Prune {
        /// Passes executed.
        passes_run: u32,
        /// Spurs removed.
        spurs_removed: usize,
        /// Edges removed.
        edges_removed: usize,
        /// Length removed.
        length_removed: f64,
    },
    /// Graph reduction metrics.
    Reduce {
        /// Strategy name.
        strategy: String,
        /// Spines extracted (spine extraction only).
        spine_count: Option<usize>,
        /// Edges left for the splitter.
        edge_count: usize,
        /// Length left for the splitter.
        total_length: f64,
    },
    /// Junction splitting metrics.
    Split {
        /// Junctions in the reduced graph.
        junctions: usize,
        /// Direct paths found.
        direct_paths: usize,
        /// Leftover chains assembled.
        leftover_chains: usize,
        /// Branches kept.
        branches_kept: usize,
        /// Branches discarded as too short.
        branches_discarded: usize,
    },
    /// Linearization metrics.
    Linearize {
        /// Polylines produced.
        polyline_count: usize,
        /// Total vertices across all polylines.
        point_count: usize,
        /// Total polyline length.
        total_length: f64,
    },
    /// Segmentation metrics.
    Segment {
        /// Segments emitted.
        segment_count: usize,
        /// Shortest segment length (0 when none).
        min_length: f64,
        /// Longest segment length (0 when none).
        max_length: f64,
        /// Total segment length.
        total_length: f64,
    },
}

/// High-level summary for one polygon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolygonSummary {
    /// Skeleton length as built.
    pub input_length: f64,
    /// Total length of emitted segments.
    pub output_length: f64,
    /// Segments emitted.
    pub segment_count: usize,
}

impl PolygonDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!(
            "Centerline Diagnostics: polygon {}\n{}",
            self.id,
            "=".repeat(60)
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<12} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        let stages = [
            ("Build", &self.build),
            ("Prune", &self.prune),
            ("Reduce", &self.reduce),
            ("Split", &self.split),
            ("Linearize", &self.linearize),
            ("Segment", &self.segment),
        ];
        for (name, diag) in stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<12} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Skeleton: {:.1}  |  Output: {:.1} in {} segments",
            self.summary.input_length, self.summary.output_length, self.summary.segment_count,
        ));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Build {
            polylines_used,
            polylines_skipped,
            node_count,
            edge_count,
            total_length,
        } => format!(
            "{polylines_used} polylines ({polylines_skipped} skipped) -> {node_count} nodes, {edge_count} edges, len={total_length:.1}"
        ),
        StageMetrics::Prune {
            passes_run,
            spurs_removed,
            edges_removed,
            length_removed,
        } => format!(
            "{passes_run} passes, {spurs_removed} spurs, {edges_removed} edges, len={length_removed:.1} removed"
        ),
        StageMetrics::Reduce {
            strategy,
            spine_count,
            edge_count,
            total_length,
        } => match spine_count {
            Some(n) => format!("{strategy}: {n} spines, {edge_count} edges, len={total_length:.1}"),
            None => format!("{strategy}: {edge_count} edges, len={total_length:.1}"),
        },
        StageMetrics::Split {
            junctions,
            direct_paths,
            leftover_chains,
            branches_kept,
            branches_discarded,
        } => format!(
            "{junctions} junctions, {direct_paths} paths + {leftover_chains} leftover -> {branches_kept} kept, {branches_discarded} dropped"
        ),
        StageMetrics::Linearize {
            polyline_count,
            point_count,
            total_length,
        } => format!("{polyline_count} polylines, {point_count} pts, len={total_length:.1}"),
        StageMetrics::Segment {
            segment_count,
            min_length,
            max_length,
            total_length,
        } => format!(
            "{segment_count} segments (min={min_length:.1} max={max_length:.1}), len={total_length:.1}"
        ),
    }
}

/// Run the pipeline for one skeleton, timing every stage.
///
/// Produces exactly the segments [`crate::process`] would.
///
/// # Errors
///
/// Returns the same errors as [`crate::process`].
pub fn process_with_diagnostics<C: Clock>(
    skeleton: Skeleton,
    config: &CenterlineConfig,
    clock: &C,
) -> Result<(Vec<Segment>, PolygonDiagnostics), CenterlineError> {
    let id = skeleton.id.clone();
    let pending = Pipeline::new(skeleton, config.clone());

    let start = clock.now();
    let built = pending.build()?;
    let build = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: built.metrics(),
    };
    let input_length = built.graph().total_length();

    let t = clock.now();
    let pruned = built.prune();
    let prune = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: pruned.metrics(),
    };

    let t = clock.now();
    let reduced = pruned.reduce()?;
    let reduce = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: reduced.metrics(),
    };

    let t = clock.now();
    let split = reduced.split();
    let split_diag = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: split.metrics(),
    };

    let t = clock.now();
    let linearized = split.linearize();
    let linearize = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: linearized.metrics(),
    };

    let t = clock.now();
    let segmented = linearized.segment();
    let segment = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: segmented.metrics(),
    };

    let total_duration = build.duration
        + prune.duration
        + reduce.duration
        + split_diag.duration
        + linearize.duration
        + segment.duration;

    let segments = segmented.into_segments();
    let summary = PolygonSummary {
        input_length,
        output_length: segments.iter().map(|s| s.length).sum(),
        segment_count: segments.len(),
    };

    Ok((
        segments,
        PolygonDiagnostics {
            id,
            build,
            prune,
            reduce,
            split: split_diag,
            linearize,
            segment,
            total_duration,
            summary,
        },
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::types::Polyline;

    /// Clock that advances one millisecond per reading.
    struct TickClock(Cell<u64>);

    impl Clock for TickClock {
        type Instant = u64;

        fn now(&self) -> u64 {
            let t = self.0.get();
            self.0.set(t + 1);
            t
        }

        fn elapsed(&self, since: &u64) -> Duration {
            Duration::from_millis(self.now() - since)
        }
    }

    fn cross_skeleton() -> Skeleton {
        Skeleton::new(
            12,
            vec![
                Polyline::from(vec![(-60.0, 0.0), (0.0, 0.0), (60.0, 0.0)]),
                Polyline::from(vec![(0.0, -60.0), (0.0, 0.0), (0.0, 60.0)]),
                Polyline::from(vec![(0.0, 0.0), (3.0, 3.0)]),
            ],
        )
    }

    #[test]
    fn duration_ms_converts_correctly() {
        let d = Duration::from_millis(1234);
        assert!((duration_ms(d) - 1234.0).abs() < 0.01);
    }

    #[test]
    fn diagnostics_match_plain_processing() {
        let config = CenterlineConfig::default();
        let plain = crate::process(cross_skeleton(), &config).unwrap();
        let (segments, diag) =
            process_with_diagnostics(cross_skeleton(), &config, &TickClock(Cell::new(0))).unwrap();
        assert_eq!(segments, plain);
        assert_eq!(diag.summary.segment_count, 4);
        assert_eq!(diag.id, PolygonId::Integer(12));
    }

    #[test]
    fn every_stage_is_timed() {
        let (_, diag) = process_with_diagnostics(
            cross_skeleton(),
            &CenterlineConfig::default(),
            &TickClock(Cell::new(0)),
        )
        .unwrap();
        // Each stage reads the clock twice, one tick apart.
        assert_eq!(diag.build.duration, Duration::from_millis(1));
        assert_eq!(diag.segment.duration, Duration::from_millis(1));
        assert_eq!(diag.total_duration, Duration::from_millis(6));
    }

    #[test]
    fn stage_metrics_reflect_the_work_done() {
        let (_, diag) = process_with_diagnostics(
            cross_skeleton(),
            &CenterlineConfig::default(),
            &TickClock(Cell::new(0)),
        )
        .unwrap();
        assert!(matches!(
            diag.prune.metrics,
            StageMetrics::Prune {
                spurs_removed: 1,
                ..
            }
        ));
        assert!(matches!(
            diag.split.metrics,
            StageMetrics::Split {
                junctions: 1,
                branches_kept: 4,
                ..
            }
        ));
    }

    #[test]
    fn report_lists_every_stage() {
        let (_, diag) = process_with_diagnostics(
            cross_skeleton(),
            &CenterlineConfig::default(),
            &TickClock(Cell::new(0)),
        )
        .unwrap();
        let report = diag.report();
        assert!(report.contains("Centerline Diagnostics: polygon 12"));
        for stage in ["Build", "Prune", "Reduce", "Split", "Linearize", "Segment"] {
            assert!(report.contains(stage), "missing {stage}");
        }
        assert!(report.contains("junction-split"));
    }

    #[test]
    fn diagnostics_serialize_durations_as_seconds() {
        let (_, diag) = process_with_diagnostics(
            cross_skeleton(),
            &CenterlineConfig::default(),
            &TickClock(Cell::new(0)),
        )
        .unwrap();
        let value = serde_json::to_value(&diag).unwrap();
        let secs = value["total_duration"].as_f64().unwrap();
        assert!((secs - 0.006).abs() < 1e-12);

        let back: PolygonDiagnostics = serde_json::from_value(value).unwrap();
        assert!((back.total_duration.as_secs_f64() - 0.006).abs() < 1e-9);
    }

    #[test]
    fn errors_propagate() {
        let skeleton = Skeleton::new(
            1,
            vec![Polyline::from(vec![(0.0, 0.0), (f64::INFINITY, 0.0)])],
        );
        let result = process_with_diagnostics(
            skeleton,
            &CenterlineConfig::default(),
            &TickClock(Cell::new(0)),
        );
        assert!(matches!(
            result,
            Err(CenterlineError::NonFiniteCoordinate { .. })
        ));
    }
}
