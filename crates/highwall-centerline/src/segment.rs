//! Resample long polylines into pieces near a target length.
//!
//! Cuts fall only on existing vertices: a piece closes at the first
//! vertex where its accumulated length reaches the even share, and the
//! next piece starts from that same vertex. Piece lengths are therefore
//! approximate, and concatenating the pieces (dropping each shared
//! boundary vertex once) reproduces the input vertex sequence exactly.

use serde::{Deserialize, Serialize};

use crate::types::{CenterlineError, Polyline};

/// Validated segment length bounds.
///
/// Construction enforces `0 <= min < target < max` with every bound
/// finite, so a value of this type can always be used for splitting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentParams {
    target: f64,
    max: f64,
    min: f64,
}

impl SegmentParams {
    /// Validate and bundle segment bounds.
    ///
    /// # Errors
    ///
    /// Returns [`CenterlineError::InvalidConfig`] if any bound is
    /// non-finite, `min` is negative, or `min < target < max` does not
    /// hold.
    pub fn new(target: f64, max: f64, min: f64) -> Result<Self, CenterlineError> {
        if !(target.is_finite() && max.is_finite() && min.is_finite()) {
            return Err(CenterlineError::InvalidConfig(format!(
                "segment lengths must be finite (target={target}, max={max}, min={min})"
            )));
        }
        if min < 0.0 || target <= 0.0 {
            return Err(CenterlineError::InvalidConfig(format!(
                "segment lengths must be positive (target={target}, min={min})"
            )));
        }
        if !(min < target && target < max) {
            return Err(CenterlineError::InvalidConfig(format!(
                "segment lengths must satisfy min < target < max \
                 (min={min}, target={target}, max={max})"
            )));
        }
        Ok(Self { target, max, min })
    }

    /// Preferred piece length.
    #[must_use]
    pub const fn target(&self) -> f64 {
        self.target
    }

    /// Longest polyline emitted unsplit.
    #[must_use]
    pub const fn max(&self) -> f64 {
        self.max
    }

    /// Shortest acceptable trailing piece.
    #[must_use]
    pub const fn min(&self) -> f64 {
        self.min
    }

    /// Number of pieces a polyline of `total` length is cut into.
    ///
    /// `ceil(total / target)`, less one when the remainder left by the
    /// target length is shorter than `min` and more than one piece would
    /// be produced.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn piece_count(&self, total: f64) -> usize {
        if total <= self.max {
            return 1;
        }
        let mut n = (total / self.target).ceil() as usize;
        if total % self.target < self.min && n > 1 {
            n -= 1;
        }
        n.max(1)
    }
}

/// Split `polyline` into pieces close to `params.target()`.
///
/// A polyline no longer than `params.max()` comes back unsplit. Otherwise
/// it is cut into [`SegmentParams::piece_count`] pieces of roughly equal
/// length at vertex boundaries; whatever remains after the last cut forms
/// the final piece regardless of its length.
///
/// # Examples
///
/// ```
/// use highwall_centerline::segment::{SegmentParams, split_polyline};
/// use highwall_centerline::Polyline;
///
/// let params = SegmentParams::new(100.0, 150.0, 50.0).unwrap();
/// // 320 m with a vertex every metre.
/// let line = Polyline::from((0..=320).map(|x| (f64::from(x), 0.0)).collect::<Vec<_>>());
/// let pieces = split_polyline(&line, &params);
/// assert_eq!(pieces.len(), 3);
/// ```
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn split_polyline(polyline: &Polyline, params: &SegmentParams) -> Vec<Polyline> {
    let total = polyline.length();
    if total <= params.max() {
        return vec![polyline.clone()];
    }

    let piece_length = total / params.piece_count(total) as f64;
    let points = polyline.points();
    let Some(&first) = points.first() else {
        return Vec::new();
    };

    let mut pieces = Vec::new();
    let mut current = vec![first];
    let mut accumulated = 0.0;
    for pair in points.windows(2) {
        accumulated += pair[0].distance(pair[1]);
        current.push(pair[1]);
        if accumulated >= piece_length {
            pieces.push(Polyline::new(std::mem::replace(&mut current, vec![pair[1]])));
            accumulated = 0.0;
        }
    }
    if current.len() >= 2 {
        pieces.push(Polyline::new(current));
    }

    pieces
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::Point;

    fn params() -> SegmentParams {
        SegmentParams::new(100.0, 150.0, 50.0).unwrap()
    }

    /// Straight line along x with a vertex every `step` metres.
    fn straight(length: u32, step: u32) -> Polyline {
        Polyline::from(
            (0..=length)
                .step_by(step as usize)
                .map(|x| (f64::from(x), 0.0))
                .collect::<Vec<_>>(),
        )
    }

    // --- SegmentParams tests ---

    #[test]
    fn params_accept_ordered_bounds() {
        let p = params();
        assert!((p.target() - 100.0).abs() < f64::EPSILON);
        assert!((p.max() - 150.0).abs() < f64::EPSILON);
        assert!((p.min() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn params_reject_min_at_or_above_target() {
        assert!(SegmentParams::new(100.0, 150.0, 100.0).is_err());
        assert!(SegmentParams::new(100.0, 150.0, 120.0).is_err());
    }

    #[test]
    fn params_reject_target_at_or_above_max() {
        assert!(SegmentParams::new(150.0, 150.0, 50.0).is_err());
    }

    #[test]
    fn params_reject_non_finite_and_negative() {
        assert!(SegmentParams::new(f64::NAN, 150.0, 50.0).is_err());
        assert!(SegmentParams::new(100.0, f64::INFINITY, 50.0).is_err());
        assert!(SegmentParams::new(100.0, 150.0, -1.0).is_err());
    }

    #[test]
    fn piece_count_drops_short_remainder() {
        let p = params();
        // 320 / 100 -> 4, remainder 20 < 50 -> 3.
        assert_eq!(p.piece_count(320.0), 3);
        // 360 / 100 -> 4, remainder 60 >= 50 -> 4.
        assert_eq!(p.piece_count(360.0), 4);
        assert_eq!(p.piece_count(120.0), 1);
    }

    // --- split_polyline tests ---

    #[test]
    fn short_polyline_is_unsplit() {
        let line = straight(120, 10);
        let pieces = split_polyline(&line, &params());
        assert_eq!(pieces, vec![line]);
    }

    #[test]
    fn polyline_at_max_is_unsplit() {
        let line = straight(150, 10);
        assert_eq!(split_polyline(&line, &params()).len(), 1);
    }

    #[test]
    fn long_polyline_splits_evenly() {
        let pieces = split_polyline(&straight(320, 1), &params());
        assert_eq!(pieces.len(), 3);
        for piece in &pieces {
            assert!((piece.length() - 320.0 / 3.0).abs() < 1.0);
        }
    }

    #[test]
    fn cuts_snap_to_existing_vertices() {
        // Vertices every 40 m: the 106.7 m share closes at 120 m.
        let pieces = split_polyline(&straight(320, 40), &params());
        assert!((pieces[0].length() - 120.0).abs() < 1e-9);
        let originals = straight(320, 40);
        for piece in &pieces {
            for p in piece.points() {
                assert!(originals.points().contains(p));
            }
        }
    }

    #[test]
    fn pieces_concatenate_back_to_input() {
        let line = Polyline::from(vec![
            (0.0, 0.0),
            (60.0, 10.0),
            (120.0, 0.0),
            (170.0, 30.0),
            (230.0, 20.0),
            (300.0, 60.0),
            (330.0, 40.0),
        ]);
        let pieces = split_polyline(&line, &params());
        assert!(pieces.len() > 1);

        let mut rebuilt: Vec<Point> = pieces[0].points().to_vec();
        for piece in &pieces[1..] {
            assert_eq!(piece.first(), rebuilt.last());
            rebuilt.extend_from_slice(&piece.points()[1..]);
        }
        assert_eq!(rebuilt, line.points());
    }

    #[test]
    fn trailing_piece_keeps_leftover_vertices() {
        // One long final edge overshoots every share, leaving a single piece.
        let line = Polyline::from(vec![(0.0, 0.0), (10.0, 0.0), (400.0, 0.0)]);
        let pieces = split_polyline(&line, &params());
        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0].len(), 3);
    }
}
