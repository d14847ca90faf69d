//! Batch driver: run many skeletons in parallel, skipping the ones that
//! fail.
//!
//! Configuration problems are caller bugs and fail the whole batch before
//! any work starts. Everything that goes wrong inside one polygon,
//! including a panic, is logged with the polygon id and recorded as a
//! [`PolygonFailure`]; that polygon contributes no segments and the rest
//! of the batch carries on.

use std::panic::{self, AssertUnwindSafe};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::diagnostics::{Clock, PolygonDiagnostics, process_with_diagnostics};
use crate::types::{CenterlineConfig, CenterlineError, PolygonId, Segment, Skeleton};

type Processed = Result<(Vec<Segment>, PolygonDiagnostics), CenterlineError>;

/// A polygon that produced no output, and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonFailure {
    /// Source polygon identifier.
    pub id: PolygonId,
    /// What went wrong.
    pub reason: CenterlineError,
}

/// Everything a batch run produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchOutput {
    /// Segments from every successful polygon, in input order.
    pub segments: Vec<Segment>,
    /// Polygons that were skipped, in input order.
    pub failures: Vec<PolygonFailure>,
    /// Per-polygon diagnostics for successful polygons (only filled by
    /// [`process_batch_with_diagnostics`]).
    pub diagnostics: Vec<PolygonDiagnostics>,
    /// Number of polygons that produced output without error.
    pub polygons_succeeded: usize,
}

/// Process every skeleton, in parallel, with skip-and-continue error
/// handling.
///
/// # Errors
///
/// Returns [`CenterlineError::InvalidConfig`] if `config` is invalid.
/// Per-polygon errors never fail the batch; they are reported in
/// [`BatchOutput::failures`].
///
/// # Examples
///
/// ```
/// use highwall_centerline::{CenterlineConfig, Polyline, Skeleton, process_batch};
///
/// let skeletons = vec![
///     Skeleton::new(1, vec![Polyline::from(vec![(0.0, 0.0), (80.0, 0.0)])]),
///     Skeleton::new(2, vec![Polyline::from(vec![(0.0, 0.0), (f64::NAN, 0.0)])]),
/// ];
/// let output = process_batch(skeletons, &CenterlineConfig::default()).unwrap();
/// assert_eq!(output.segments.len(), 1);
/// assert_eq!(output.failures.len(), 1);
/// ```
pub fn process_batch(
    skeletons: Vec<Skeleton>,
    config: &CenterlineConfig,
) -> Result<BatchOutput, CenterlineError> {
    config.validate()?;

    let results: Vec<(PolygonId, Result<Vec<Segment>, CenterlineError>)> = skeletons
        .into_par_iter()
        .map(|skeleton| {
            let id = skeleton.id.clone();
            let result = isolate(|| crate::process(skeleton, config));
            (id, result)
        })
        .collect();

    let mut output = BatchOutput::default();
    for (id, result) in results {
        match result {
            Ok(segments) => {
                output.polygons_succeeded += 1;
                output.segments.extend(segments);
            }
            Err(reason) => output.record_failure(id, reason),
        }
    }
    output.log_summary();
    Ok(output)
}

/// [`process_batch`] with per-polygon stage diagnostics.
///
/// # Errors
///
/// Returns [`CenterlineError::InvalidConfig`] if `config` is invalid.
pub fn process_batch_with_diagnostics<C: Clock + Sync>(
    skeletons: Vec<Skeleton>,
    config: &CenterlineConfig,
    clock: &C,
) -> Result<BatchOutput, CenterlineError> {
    config.validate()?;

    let results: Vec<(PolygonId, Processed)> = skeletons
        .into_par_iter()
        .map(|skeleton| {
            let id = skeleton.id.clone();
            let result = isolate(|| process_with_diagnostics(skeleton, config, clock));
            (id, result)
        })
        .collect();

    let mut output = BatchOutput::default();
    for (id, result) in results {
        match result {
            Ok((segments, diagnostics)) => {
                output.polygons_succeeded += 1;
                output.segments.extend(segments);
                output.diagnostics.push(diagnostics);
            }
            Err(reason) => output.record_failure(id, reason),
        }
    }
    output.log_summary();
    Ok(output)
}

impl BatchOutput {
    fn record_failure(&mut self, id: PolygonId, reason: CenterlineError) {
        tracing::warn!(id = %id, error = %reason, "skipping polygon");
        self.failures.push(PolygonFailure { id, reason });
    }

    fn log_summary(&self) {
        tracing::info!(
            succeeded = self.polygons_succeeded,
            failed = self.failures.len(),
            segments = self.segments.len(),
            "batch complete"
        );
    }
}

/// Run `f`, turning a panic into [`CenterlineError::Panicked`].
fn isolate<T>(f: impl FnOnce() -> Result<T, CenterlineError>) -> Result<T, CenterlineError> {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_owned());
        Err(CenterlineError::Panicked(message))
    })
}
