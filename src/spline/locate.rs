//! Segment lookup.

use crate::types::Bounds;

/// Index of the segment that owns `x`.
///
/// With knots `k₀ < … < k_{M−1}` the segments are `[low, k₀]`, `[k₀, k₁]`, …,
/// `[k_{M−1}, high]`, indexed `0..=M`:
///
/// - `x <= k₀` gives `0`
/// - `x >= k_{M−1}` gives `M`
/// - otherwise `i + 1` for the first `i` with `kᵢ <= x <= kᵢ₊₁`
///
/// A point exactly on a knot therefore belongs to the segment on its left,
/// except the last knot, which the outer rule hands to segment `M`. With a
/// single knot the first rule wins and the knot belongs to segment 0.
///
/// Every fit residual and every evaluation goes through this function, so the
/// fitted and the evaluated curve always agree on knot ownership.
///
/// An empty knot slice yields `0` (a single segment). NaN falls through every
/// comparison and also yields `0`.
///
/// # Examples
/// ```
/// use densfit::spline::locate;
/// let knots = [-1.5, 0.0, 1.5];
/// assert_eq!(locate(-3.0, &knots), 0);
/// assert_eq!(locate(0.0, &knots), 1);
/// assert_eq!(locate(0.1, &knots), 2);
/// assert_eq!(locate(1.5, &knots), 3);
/// ```
pub fn locate(x: f64, knots: &[f64]) -> usize {
    let Some((&first, &last)) = knots.first().zip(knots.last()) else {
        return 0;
    };
    if x <= first {
        return 0;
    }
    if x >= last {
        return knots.len();
    }
    // Linear scan rather than binary search: the first matching window is what
    // fixes the left-preference rule.
    knots
        .windows(2)
        .position(|w| w[0] <= x && x <= w[1])
        .map_or(0, |i| i + 1)
}

/// `(start, end)` of segment `index` given the knots and the outer bounds.
///
/// Segment `0` starts at `bounds.low` and segment `knots.len()` ends at
/// `bounds.high`. Returns `None` for an index past the last segment.
pub fn segment_span(index: usize, knots: &[f64], bounds: Bounds) -> Option<(f64, f64)> {
    let m = knots.len();
    if index > m {
        return None;
    }
    let start = if index == 0 {
        bounds.low
    } else {
        knots[index - 1]
    };
    let end = if index == m { bounds.high } else { knots[index] };
    Some((start, end))
}
