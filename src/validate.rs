//! Input validation.
//!
//! Fit inputs are checked in one ordered pass before any optimisation variable is
//! built, using `!is_finite()` to reject NaN, +Inf and -Inf uniformly.

use crate::error::InputViolation;
use crate::types::{Bounds, Observation};

/// Reject NaN and infinities.
pub(crate) fn validate_finite(value: f64, name: &'static str) -> Result<f64, InputViolation> {
    if !value.is_finite() {
        return Err(InputViolation::NonFinite { name, value });
    }
    Ok(value)
}

/// Validate that a sampling step is strictly positive and finite.
pub(crate) fn validate_step(step: f64) -> Result<f64, InputViolation> {
    validate_finite(step, "sampling step")?;
    if step <= 0.0 {
        return Err(InputViolation::NonPositiveStep { step });
    }
    Ok(step)
}

/// Check that knots are strictly increasing, distinguishing duplicates from disorder.
pub(crate) fn validate_knot_order(knots: &[f64]) -> Result<(), InputViolation> {
    for (index, w) in knots.windows(2).enumerate() {
        if w[1] == w[0] {
            return Err(InputViolation::DuplicateKnot {
                index,
                value: w[0],
            });
        }
        if w[1] < w[0] {
            return Err(InputViolation::UnsortedKnots {
                index,
                left: w[0],
                right: w[1],
            });
        }
    }
    Ok(())
}

/// Check that every knot lies strictly inside `bounds`, so no segment is empty.
pub(crate) fn validate_knots_inside(knots: &[f64], bounds: Bounds) -> Result<(), InputViolation> {
    if let Some(&knot) = knots
        .iter()
        .find(|&&k| k <= bounds.low || k >= bounds.high)
    {
        return Err(InputViolation::KnotOutsideBounds {
            knot,
            low: bounds.low,
            high: bounds.high,
        });
    }
    Ok(())
}

/// Validate every structural invariant of a fit problem.
///
/// Checks run in a fixed order and the first failure is returned:
/// finiteness, bound ordering, knot presence, knot ordering and uniqueness,
/// knots strictly inside the bounds, observation presence, observations within
/// the bounds, pivot membership, degree, sampling step.
///
/// # Errors
/// Returns the [`InputViolation`] describing the first invariant that failed.
pub fn validate_problem(
    observations: &[Observation],
    knots: &[f64],
    pivot: f64,
    bounds: Bounds,
    degree: usize,
    sampling_step: f64,
) -> Result<(), InputViolation> {
    validate_finite(bounds.low, "lower bound")?;
    validate_finite(bounds.high, "upper bound")?;
    for &k in knots {
        validate_finite(k, "knot")?;
    }
    validate_finite(pivot, "pivot")?;
    validate_finite(sampling_step, "sampling step")?;
    for obs in observations {
        validate_finite(obs.x, "observation x")?;
        validate_finite(obs.y, "observation y")?;
    }

    if bounds.low >= bounds.high {
        return Err(InputViolation::UnorderedBounds {
            low: bounds.low,
            high: bounds.high,
        });
    }

    if knots.is_empty() {
        return Err(InputViolation::NoKnots);
    }
    validate_knot_order(knots)?;
    validate_knots_inside(knots, bounds)?;

    if observations.is_empty() {
        return Err(InputViolation::NoObservations);
    }
    if let Some(obs) = observations.iter().find(|o| !bounds.contains(o.x)) {
        return Err(InputViolation::ObservationOutsideBounds {
            x: obs.x,
            low: bounds.low,
            high: bounds.high,
        });
    }

    // Exact comparison: the pivot must be bit-identical to one knot.
    if !knots.iter().any(|&k| k == pivot) {
        return Err(InputViolation::PivotNotKnot { pivot });
    }

    if degree < 3 {
        return Err(InputViolation::DegreeTooLow { degree });
    }

    validate_step(sampling_step)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(points: &[(f64, f64)]) -> Vec<Observation> {
        points.iter().map(|&(x, y)| Observation::new(x, y)).collect()
    }

    fn valid_points() -> Vec<Observation> {
        obs(&[(-0.8, 2.0), (0.0, 1.0), (0.7, 0.2)])
    }

    fn check(knots: &[f64], pivot: f64, degree: usize, step: f64) -> Result<(), InputViolation> {
        validate_problem(
            &valid_points(),
            knots,
            pivot,
            Bounds::new(-1.0, 1.0),
            degree,
            step,
        )
    }

    #[test]
    fn accepts_well_formed_problem() {
        assert_eq!(check(&[-0.5, 0.0, 0.5], 0.0, 3, 0.01), Ok(()));
    }

    #[test]
    fn rejects_unordered_bounds() {
        let result = validate_problem(
            &valid_points(),
            &[0.0],
            0.0,
            Bounds::new(1.0, -1.0),
            3,
            0.1,
        );
        assert!(matches!(result, Err(InputViolation::UnorderedBounds { .. })));
    }

    #[test]
    fn rejects_equal_bounds() {
        let result = validate_problem(&[], &[0.0], 0.0, Bounds::new(1.0, 1.0), 3, 0.1);
        assert!(matches!(result, Err(InputViolation::UnorderedBounds { .. })));
    }

    #[test]
    fn rejects_missing_knots() {
        assert_eq!(check(&[], 0.0, 3, 0.1), Err(InputViolation::NoKnots));
    }

    #[test]
    fn rejects_unsorted_knots() {
        let result = check(&[0.5, 0.0], 0.0, 3, 0.1);
        assert_eq!(
            result,
            Err(InputViolation::UnsortedKnots {
                index: 0,
                left: 0.5,
                right: 0.0
            })
        );
    }

    #[test]
    fn rejects_duplicate_knots() {
        let result = check(&[-0.5, 0.0, 0.0, 0.5], 0.0, 3, 0.1);
        assert!(matches!(
            result,
            Err(InputViolation::DuplicateKnot { index: 1, .. })
        ));
    }

    #[test]
    fn rejects_knot_on_or_beyond_bounds() {
        assert!(matches!(
            check(&[0.0, 1.0], 0.0, 3, 0.1),
            Err(InputViolation::KnotOutsideBounds { knot, .. }) if knot == 1.0
        ));
        assert!(matches!(
            check(&[-3.0, 0.0], 0.0, 3, 0.1),
            Err(InputViolation::KnotOutsideBounds { .. })
        ));
    }

    #[test]
    fn rejects_observation_outside_bounds() {
        let result = validate_problem(
            &obs(&[(0.0, 1.0), (1.5, 0.1)]),
            &[0.0],
            0.0,
            Bounds::new(-1.0, 1.0),
            3,
            0.1,
        );
        assert!(matches!(
            result,
            Err(InputViolation::ObservationOutsideBounds { x, .. }) if x == 1.5
        ));
    }

    #[test]
    fn accepts_observation_on_bounds() {
        let result = validate_problem(
            &obs(&[(-1.0, 1.0), (1.0, 0.1)]),
            &[0.0],
            0.0,
            Bounds::new(-1.0, 1.0),
            3,
            0.1,
        );
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn rejects_empty_observations() {
        let result = validate_problem(&[], &[0.0], 0.0, Bounds::new(-1.0, 1.0), 3, 0.1);
        assert_eq!(result, Err(InputViolation::NoObservations));
    }

    #[test]
    fn rejects_pivot_that_is_not_a_knot() {
        assert_eq!(
            check(&[-0.5, 0.5], 0.0, 3, 0.1),
            Err(InputViolation::PivotNotKnot { pivot: 0.0 })
        );
    }

    #[test]
    fn rejects_low_degree() {
        assert_eq!(
            check(&[0.0], 0.0, 2, 0.1),
            Err(InputViolation::DegreeTooLow { degree: 2 })
        );
    }

    #[test]
    fn rejects_non_positive_step() {
        assert!(matches!(
            check(&[0.0], 0.0, 3, 0.0),
            Err(InputViolation::NonPositiveStep { .. })
        ));
        assert!(matches!(
            check(&[0.0], 0.0, 3, -0.1),
            Err(InputViolation::NonPositiveStep { .. })
        ));
    }

    #[test]
    fn rejects_non_finite_values() {
        assert!(matches!(
            check(&[f64::NAN], 0.0, 3, 0.1),
            Err(InputViolation::NonFinite { name: "knot", .. })
        ));
        assert!(matches!(
            check(&[0.0], 0.0, 3, f64::INFINITY),
            Err(InputViolation::NonFinite { .. })
        ));
        let result = validate_problem(
            &obs(&[(0.0, f64::NAN)]),
            &[0.0],
            0.0,
            Bounds::new(-1.0, 1.0),
            3,
            0.1,
        );
        assert!(matches!(
            result,
            Err(InputViolation::NonFinite { name: "observation y", .. })
        ));
    }

    #[test]
    fn reports_first_violation_in_order() {
        // Unsorted knots and a low degree: knot ordering is checked first.
        assert!(matches!(
            check(&[0.5, 0.0], 0.0, 1, 0.1),
            Err(InputViolation::UnsortedKnots { .. })
        ));
        // Pivot and degree both wrong: pivot is checked first.
        assert!(matches!(
            check(&[0.0], 0.3, 1, 0.1),
            Err(InputViolation::PivotNotKnot { .. })
        ));
    }
}
