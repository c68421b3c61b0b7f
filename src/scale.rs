//! Affine rescaling between an original price domain and the working interval.
//!
//! High-degree monomials of raw strikes (e.g. `100_000⁴`) make the least-squares
//! problem hopelessly ill-conditioned, so fits run on x-values mapped into a
//! small working interval, canonically `[-1, 1]`:
//!
//! ```text
//! scale(x)   = t_min + (x − d_min) · (t_max − t_min) / (d_max − d_min)
//! unscale(s) = d_min + (s − t_min) · (d_max − d_min) / (t_max − t_min)
//! ```
//!
//! Only x is rescaled; observed values pass through unchanged.

use crate::error::{self, DensFitError};
use crate::spline::Evaluator;
use crate::types::{Bounds, Observation};

/// Map `x` from `[domain_min, domain_max]` into `target`.
///
/// # Errors
/// Returns [`DensFitError::Domain`] if `domain_max == domain_min` or an input is
/// not finite.
///
/// # Examples
/// ```
/// use densfit::scale::scale;
/// use densfit::types::Bounds;
///
/// let s = scale(150.0, 100.0, 200.0, Bounds::unit())?;
/// assert_eq!(s, 0.0);
/// # Ok::<(), densfit::DensFitError>(())
/// ```
pub fn scale(x: f64, domain_min: f64, domain_max: f64, target: Bounds) -> error::Result<f64> {
    DomainScaler::new(Bounds::new(domain_min, domain_max), target)?.scale(x)
}

/// Map `x_scaled` from `target` back into `[domain_min, domain_max]`.
///
/// Exact inverse of [`scale`] up to floating-point rounding.
///
/// # Errors
/// Returns [`DensFitError::Domain`] if either interval is degenerate or an
/// input is not finite.
pub fn unscale(
    x_scaled: f64,
    domain_min: f64,
    domain_max: f64,
    target: Bounds,
) -> error::Result<f64> {
    DomainScaler::new(Bounds::new(domain_min, domain_max), target)?.unscale(x_scaled)
}

/// Wrap an evaluator built on the working interval so it accepts original-domain x.
///
/// The returned evaluator computes `f_scaled.evaluate(scale(x))`. Pass a reference
/// (`&f_scaled`) to keep ownership; nothing is copied.
///
/// # Errors
/// Returns [`DensFitError::Domain`] if either interval is degenerate.
pub fn wrap_for_original_domain<E: Evaluator>(
    f_scaled: E,
    domain_min: f64,
    domain_max: f64,
    target: Bounds,
) -> error::Result<Rescaled<E>> {
    let scaler = DomainScaler::new(Bounds::new(domain_min, domain_max), target)?;
    Ok(scaler.wrap(f_scaled))
}

/// A validated affine map from an original domain onto a working interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DomainScaler {
    domain: Bounds,
    target: Bounds,
}

impl DomainScaler {
    /// Create a scaler from `domain` onto `target`.
    ///
    /// Either interval may be given in descending order (the map is then
    /// orientation-reversing), but neither may be degenerate.
    ///
    /// # Errors
    /// Returns [`DensFitError::Domain`] if an endpoint is not finite or an
    /// interval has zero width.
    pub fn new(domain: Bounds, target: Bounds) -> error::Result<Self> {
        for (name, b) in [("domain", domain), ("target interval", target)] {
            if !b.low.is_finite() || !b.high.is_finite() {
                return Err(DensFitError::Domain {
                    message: format!("{name} endpoints must be finite, got [{}, {}]", b.low, b.high),
                });
            }
            if b.low == b.high {
                return Err(DensFitError::Domain {
                    message: format!("{name} is degenerate: min == max == {}", b.low),
                });
            }
        }
        Ok(Self { domain, target })
    }

    /// Scaler onto the canonical working interval `[-1, 1]`.
    ///
    /// # Errors
    /// Same as [`DomainScaler::new`].
    pub fn unit(domain: Bounds) -> error::Result<Self> {
        Self::new(domain, Bounds::unit())
    }

    pub fn domain(&self) -> Bounds {
        self.domain
    }

    pub fn target(&self) -> Bounds {
        self.target
    }

    /// Map an original-domain value into the working interval.
    ///
    /// The domain's upper end maps exactly onto the target's upper end.
    /// Values outside the domain are extrapolated linearly; range checks are
    /// the evaluator's job.
    ///
    /// # Errors
    /// Returns [`DensFitError::Domain`] if `x` is not finite.
    pub fn scale(&self, x: f64) -> error::Result<f64> {
        if !x.is_finite() {
            return Err(DensFitError::Domain {
                message: format!("cannot scale non-finite value {x}"),
            });
        }
        Ok(self.forward(x))
    }

    /// Map a working-interval value back into the original domain.
    ///
    /// # Errors
    /// Returns [`DensFitError::Domain`] if `x_scaled` is not finite.
    pub fn unscale(&self, x_scaled: f64) -> error::Result<f64> {
        if !x_scaled.is_finite() {
            return Err(DensFitError::Domain {
                message: format!("cannot unscale non-finite value {x_scaled}"),
            });
        }
        if x_scaled == self.target.high {
            return Ok(self.domain.high);
        }
        Ok(self.domain.low
            + (x_scaled - self.target.low) * self.domain.width() / self.target.width())
    }

    /// [`scale`](Self::scale), but values inside the domain never leave the target.
    ///
    /// # Errors
    /// Returns [`DensFitError::Domain`] if `x` is not finite.
    pub fn scale_within(&self, x: f64) -> error::Result<f64> {
        let scaled = self.scale(x)?;
        if !contains(self.domain, x) {
            return Ok(scaled);
        }
        let (low, high) = ordered(self.target);
        Ok(scaled.clamp(low, high))
    }

    /// Scale the x-coordinate of each observation, keeping order and values.
    ///
    /// # Errors
    /// Returns [`DensFitError::Domain`] on the first non-finite x.
    pub fn scale_observations(&self, observations: &[Observation]) -> error::Result<Vec<Observation>> {
        observations
            .iter()
            .map(|o| Ok(Observation::new(self.scale(o.x)?, o.y)))
            .collect()
    }

    /// Scale every value of a slice, e.g. a knot list.
    ///
    /// # Errors
    /// Returns [`DensFitError::Domain`] on the first non-finite value.
    pub fn scale_all(&self, xs: &[f64]) -> error::Result<Vec<f64>> {
        xs.iter().map(|&x| self.scale(x)).collect()
    }

    /// Scale both endpoints of an interval.
    ///
    /// # Errors
    /// Returns [`DensFitError::Domain`] if an endpoint is not finite.
    pub fn scale_bounds(&self, bounds: Bounds) -> error::Result<Bounds> {
        Ok(Bounds::new(self.scale(bounds.low)?, self.scale(bounds.high)?))
    }

    /// Wrap a working-interval evaluator so it accepts original-domain x.
    pub fn wrap<E: Evaluator>(&self, f_scaled: E) -> Rescaled<E> {
        Rescaled {
            inner: f_scaled,
            scaler: *self,
        }
    }

    fn forward(&self, x: f64) -> f64 {
        if x == self.domain.high {
            return self.target.high;
        }
        self.target.low + (x - self.domain.low) * self.target.width() / self.domain.width()
    }
}

fn ordered(b: Bounds) -> (f64, f64) {
    if b.low <= b.high {
        (b.low, b.high)
    } else {
        (b.high, b.low)
    }
}

fn contains(b: Bounds, x: f64) -> bool {
    let (low, high) = ordered(b);
    low <= x && x <= high
}

/// An evaluator called with original-domain x, delegating to a working-interval one.
///
/// Derivatives are *not* rescaled: a wrapped first-derivative evaluator returns
/// `f'` with respect to the working coordinate, so ratios of differences (as in
/// probability queries) are unaffected by the scale factor.
#[derive(Debug, Clone)]
pub struct Rescaled<E> {
    inner: E,
    scaler: DomainScaler,
}

impl<E> Rescaled<E> {
    pub fn scaler(&self) -> &DomainScaler {
        &self.scaler
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }

    pub fn into_inner(self) -> E {
        self.inner
    }
}

impl<E: Evaluator> Evaluator for Rescaled<E> {
    fn evaluate(&self, x: f64) -> error::Result<f64> {
        self.inner.evaluate(self.scaler.scale_within(x)?)
    }

    fn bounds(&self) -> Bounds {
        let inner = self.inner.bounds();
        // Unscaling finite bounds through a validated map cannot fail.
        let low = self.scaler.unscale(inner.low).unwrap_or(f64::NAN);
        let high = self.scaler.unscale(inner.high).unwrap_or(f64::NAN);
        let (low, high) = ordered(Bounds::new(low, high));
        Bounds::new(low, high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    struct Identity(Bounds);

    impl Evaluator for Identity {
        fn evaluate(&self, x: f64) -> error::Result<f64> {
            Ok(x)
        }

        fn bounds(&self) -> Bounds {
            self.0
        }
    }

    #[test]
    fn scale_maps_endpoints_onto_target() {
        let target = Bounds::unit();
        assert_abs_diff_eq!(scale(85_000.0, 85_000.0, 150_000.0, target).unwrap(), -1.0);
        assert_abs_diff_eq!(scale(150_000.0, 85_000.0, 150_000.0, target).unwrap(), 1.0);
        assert_abs_diff_eq!(
            scale(117_500.0, 85_000.0, 150_000.0, target).unwrap(),
            0.0,
            epsilon = 1e-15
        );
    }

    #[test]
    fn scale_rejects_degenerate_domain() {
        let result = scale(1.0, 2.0, 2.0, Bounds::unit());
        assert!(matches!(result, Err(DensFitError::Domain { .. })));
    }

    #[test]
    fn unscale_rejects_degenerate_target() {
        let result = unscale(0.0, 0.0, 1.0, Bounds::new(3.0, 3.0));
        assert!(matches!(result, Err(DensFitError::Domain { .. })));
    }

    #[test]
    fn scale_rejects_nan() {
        assert!(scale(f64::NAN, 0.0, 1.0, Bounds::unit()).is_err());
        assert!(scale(0.5, 0.0, f64::INFINITY, Bounds::unit()).is_err());
    }

    #[test]
    fn unscale_inverts_scale_for_custom_target() {
        let target = Bounds::new(0.0, 10.0);
        for x in [-3.0, 0.0, 1.25, 7.5, 42.0] {
            let s = scale(x, -5.0, 50.0, target).unwrap();
            let back = unscale(s, -5.0, 50.0, target).unwrap();
            assert_abs_diff_eq!(back, x, epsilon = 1e-12);
        }
    }

    #[test]
    fn descending_target_reverses_orientation() {
        let scaler = DomainScaler::new(Bounds::new(0.0, 1.0), Bounds::new(1.0, -1.0)).unwrap();
        assert_abs_diff_eq!(scaler.scale(0.0).unwrap(), 1.0);
        assert_abs_diff_eq!(scaler.scale(1.0).unwrap(), -1.0);
    }

    #[test]
    fn scale_all_preserves_order() {
        let scaler = DomainScaler::unit(Bounds::new(90.0, 110.0)).unwrap();
        let knots = scaler.scale_all(&[95.0, 100.0, 105.0]).unwrap();
        assert_abs_diff_eq!(knots[0], -0.5, epsilon = 1e-15);
        assert_abs_diff_eq!(knots[1], 0.0, epsilon = 1e-15);
        assert_abs_diff_eq!(knots[2], 0.5, epsilon = 1e-15);
    }

    #[test]
    fn scale_observations_keeps_values() {
        let scaler = DomainScaler::unit(Bounds::new(0.0, 4.0)).unwrap();
        let scaled = scaler
            .scale_observations(&[Observation::new(1.0, 7.0), Observation::new(3.0, 2.0)])
            .unwrap();
        assert_eq!(scaled[0], Observation::new(-0.5, 7.0));
        assert_eq!(scaled[1], Observation::new(0.5, 2.0));
    }

    #[test]
    fn wrap_composes_with_scale() {
        let f = Identity(Bounds::unit());
        let wrapped = wrap_for_original_domain(&f, 100.0, 200.0, Bounds::unit()).unwrap();
        for x in [100.0, 125.0, 180.0, 200.0] {
            let expected = scale(x, 100.0, 200.0, Bounds::unit()).unwrap();
            assert_abs_diff_eq!(wrapped.evaluate(x).unwrap(), expected, epsilon = 1e-15);
        }
        let b = wrapped.bounds();
        assert_abs_diff_eq!(b.low, 100.0, epsilon = 1e-12);
        assert_abs_diff_eq!(b.high, 200.0, epsilon = 1e-12);
    }

    // --- Domain ends ---

    #[test]
    fn domain_ends_land_exactly_on_custom_target() {
        // 80 + 412.3 * 0.7 / 412.3 rounds above 0.9 without the endpoint rule.
        let target = Bounds::new(0.2, 0.9);
        let scaler = DomainScaler::new(Bounds::new(80.0, 492.3), target).unwrap();
        assert_eq!(scaler.scale(80.0).unwrap(), 0.2);
        assert_eq!(scaler.scale(492.3).unwrap(), 0.9);
        assert_eq!(scaler.unscale(0.2).unwrap(), 80.0);
        assert_eq!(scaler.unscale(0.9).unwrap(), 492.3);
    }

    #[test]
    fn wrapped_evaluator_accepts_whole_domain() {
        let target = Bounds::new(0.2, 0.9);
        let f = Identity(target);
        for high in [492.3, 117.7, 1e5 + 0.1, 3.3] {
            let wrapped = wrap_for_original_domain(&f, 1.1, high, target).unwrap();
            assert_eq!(wrapped.bounds(), Bounds::new(1.1, high));
            for i in 0..=1000 {
                let x = (1.1 + f64::from(i) * (high - 1.1) / 1000.0).min(high);
                let y = wrapped.evaluate(x).unwrap();
                assert!((0.2..=0.9).contains(&y), "x={x} mapped to {y}");
            }
        }
    }

    #[test]
    fn scale_within_only_clamps_inside_domain() {
        let scaler = DomainScaler::new(Bounds::new(0.0, 10.0), Bounds::new(0.2, 0.9)).unwrap();
        assert_eq!(scaler.scale_within(10.0).unwrap(), 0.9);
        assert_abs_diff_eq!(scaler.scale_within(20.0).unwrap(), 1.6, epsilon = 1e-12);
        assert!(scaler.scale_within(f64::NAN).is_err());
    }

    #[test]
    fn wrap_rejects_degenerate_domain() {
        let f = Identity(Bounds::unit());
        assert!(wrap_for_original_domain(f, 1.0, 1.0, Bounds::unit()).is_err());
    }
}
