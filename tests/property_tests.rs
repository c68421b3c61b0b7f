//! Property-based tests using proptest.
//!
//! These tests verify invariant properties across random inputs rather than
//! testing fixed examples.

use densfit::scale::{DomainScaler, scale, unscale};
use densfit::spline::{Evaluator, assemble, locate, segment_span};
use densfit::types::{Bounds, CoefficientMatrix};
use proptest::prelude::*;

/// Strictly increasing knots inside (-1, 1).
fn knots_strategy() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::btree_set(-900_i32..900, 1..6)
        .prop_map(|set| set.into_iter().map(|k| f64::from(k) / 1000.0).collect())
}

// --- Property Test 1: scale/unscale round trip ---

proptest! {
    /// `unscale(scale(x)) == x` up to rounding for any non-degenerate
    /// domain and target, including descending targets.
    #[test]
    fn scale_roundtrip(
        x in -1e6_f64..1e6,
        d_min in -1e5_f64..1e5,
        d_width in 1e-2_f64..1e5,
        t_low in -10.0_f64..10.0,
        t_width in prop_oneof![1e-3_f64..1e3, -1e3_f64..-1e-3],
    ) {
        let target = Bounds::new(t_low, t_low + t_width);
        let d_max = d_min + d_width;
        let s = scale(x, d_min, d_max, target).unwrap();
        let back = unscale(s, d_min, d_max, target).unwrap();
        let tol = 1e-9 * (1.0 + x.abs() + d_min.abs() + d_width);
        prop_assert!((back - x).abs() <= tol, "x={x}, back={back}");
    }
}

// --- Property Test 2: scaled domain endpoints land on the target ---

proptest! {
    #[test]
    fn domain_endpoints_map_to_target(
        d_min in 1.0_f64..1e5,
        d_width in 1.0_f64..1e5,
    ) {
        let scaler = DomainScaler::unit(Bounds::new(d_min, d_min + d_width)).unwrap();
        prop_assert_eq!(scaler.scale(d_min).unwrap(), -1.0);
        let high = scaler.scale(d_min + d_width).unwrap();
        prop_assert!((high - 1.0).abs() < 1e-12);
    }
}

// --- Property Test 3: locate is monotone and consistent with segment spans ---

proptest! {
    #[test]
    fn locate_is_monotone_and_in_span(
        knots in knots_strategy(),
        mut xs in prop::collection::vec(-1.0_f64..=1.0, 2..40),
    ) {
        xs.sort_by(f64::total_cmp);
        let bounds = Bounds::unit();
        let mut previous = 0;
        for &x in &xs {
            let segment = locate(x, &knots);
            prop_assert!(segment <= knots.len());
            prop_assert!(segment >= previous, "locate not monotone at x={x}");
            previous = segment;
            let (start, end) = segment_span(segment, &knots, bounds).unwrap();
            prop_assert!(start <= x && x <= end, "x={x} outside [{start}, {end}]");
        }
    }
}

// --- Property Test 4: evaluators accept exactly their bounds ---

proptest! {
    #[test]
    fn evaluator_domain_is_closed_bounds(
        knots in knots_strategy(),
        x in -2.0_f64..2.0,
        order in 0_usize..=2,
    ) {
        let columns = vec![vec![0.5, -1.0, 2.0, 0.25]; knots.len() + 1];
        let m = CoefficientMatrix::from_columns(3, columns).unwrap();
        let f = assemble(&m, &knots, Bounds::unit(), order).unwrap();
        let result = f.evaluate(x);
        if (-1.0..=1.0).contains(&x) {
            prop_assert!(result.is_ok());
        } else {
            prop_assert!(result.is_err());
        }
    }
}

// --- Property Test 5: identical columns give knot-independent values ---

proptest! {
    /// When every segment carries the same polynomial the spline is that
    /// polynomial, wherever the knots are.
    #[test]
    fn identical_columns_ignore_knots(
        knots in knots_strategy(),
        x in -1.0_f64..=1.0,
    ) {
        let column = vec![0.5, -1.0, 2.0, 0.25];
        let single = CoefficientMatrix::from_columns(3, vec![column.clone()]).unwrap();
        let many = CoefficientMatrix::from_columns(3, vec![column; knots.len() + 1]).unwrap();
        let reference = assemble(&single, &[], Bounds::unit(), 0).unwrap();
        let split = assemble(&many, &knots, Bounds::unit(), 0).unwrap();
        prop_assert_eq!(split.evaluate(x).unwrap(), reference.evaluate(x).unwrap());
    }
}
