//! Building evaluators from a fitted coefficient matrix.

use super::Evaluator;
use super::basis::evaluate_polynomial;
use super::locate::locate;
use crate::error::{self, DensFitError};
use crate::types::{Bounds, CoefficientMatrix, DerivativeOrder};
use crate::validate::validate_knot_order;

/// A piecewise polynomial, or one of its first two derivatives, on closed bounds.
///
/// Segment ownership follows [`locate`], so a point on a knot is evaluated
/// with the same polynomial the fit assigned it to.
///
/// # Examples
/// ```
/// use densfit::spline::{assemble, Evaluator};
/// use densfit::types::{Bounds, CoefficientMatrix};
///
/// // x² on both sides of a knot at 0
/// let m = CoefficientMatrix::from_columns(3, vec![vec![0.0, 1.0, 0.0, 0.0]; 2])?;
/// let second = assemble(&m, &[0.0], Bounds::unit(), 2)?;
/// assert_eq!(second.evaluate(0.5)?, 2.0);
/// assert!(second.evaluate(1.5).is_err());
/// # Ok::<(), densfit::DensFitError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PiecewisePolynomial {
    coefficients: CoefficientMatrix,
    knots: Vec<f64>,
    bounds: Bounds,
    order: DerivativeOrder,
}

/// Assemble an evaluator of derivative `order` (0, 1 or 2).
///
/// The matrix must have one column per segment, i.e. `knots.len() + 1`.
///
/// # Errors
/// - [`DensFitError::Configuration`] if `order > 2`, the matrix shape does not
///   match the knots, or the bounds are not finite and increasing.
/// - [`DensFitError::InvalidInput`] if the knots are not strictly increasing.
pub fn assemble(
    coefficients: &CoefficientMatrix,
    knots: &[f64],
    bounds: Bounds,
    order: usize,
) -> error::Result<PiecewisePolynomial> {
    let order = DerivativeOrder::try_from(order)?;
    PiecewisePolynomial::new(coefficients.clone(), knots.to_vec(), bounds, order)
}

impl PiecewisePolynomial {
    /// Take ownership of the parts and check their consistency.
    ///
    /// # Errors
    /// As [`assemble`].
    pub fn new(
        coefficients: CoefficientMatrix,
        knots: Vec<f64>,
        bounds: Bounds,
        order: DerivativeOrder,
    ) -> error::Result<Self> {
        if coefficients.segments() != knots.len() + 1 {
            return Err(DensFitError::Configuration {
                message: format!(
                    "{} knots need {} coefficient columns, got {}",
                    knots.len(),
                    knots.len() + 1,
                    coefficients.segments()
                ),
            });
        }
        if !(bounds.low.is_finite() && bounds.high.is_finite() && bounds.low < bounds.high) {
            return Err(DensFitError::Configuration {
                message: format!(
                    "bounds must be finite with low < high, got [{}, {}]",
                    bounds.low, bounds.high
                ),
            });
        }
        validate_knot_order(&knots)?;
        Ok(Self {
            coefficients,
            knots,
            bounds,
            order,
        })
    }

    /// The same curve at a different derivative order, sharing nothing mutable.
    pub fn with_order(&self, order: DerivativeOrder) -> Self {
        Self {
            order,
            ..self.clone()
        }
    }

    pub fn order(&self) -> DerivativeOrder {
        self.order
    }

    pub fn knots(&self) -> &[f64] {
        &self.knots
    }

    pub fn coefficients(&self) -> &CoefficientMatrix {
        &self.coefficients
    }

    /// `order`-th derivative of the underlying polynomial at `x`, any order,
    /// without a bounds check.
    pub(crate) fn derivative_at(&self, x: f64, order: usize) -> f64 {
        let segment = locate(x, &self.knots);
        evaluate_polynomial(self.coefficients.column(segment), x, order)
    }

    /// Left and right limits of the `order`-th derivative at knot `index`.
    pub(crate) fn knot_limits(&self, index: usize, order: usize) -> Option<(f64, f64)> {
        let k = *self.knots.get(index)?;
        Some((
            evaluate_polynomial(self.coefficients.column(index), k, order),
            evaluate_polynomial(self.coefficients.column(index + 1), k, order),
        ))
    }
}

impl Evaluator for PiecewisePolynomial {
    fn evaluate(&self, x: f64) -> error::Result<f64> {
        if !self.bounds.contains(x) {
            return Err(DensFitError::Domain {
                message: format!(
                    "x={x} outside [{}, {}]",
                    self.bounds.low, self.bounds.high
                ),
            });
        }
        Ok(self.derivative_at(x, self.order.order()))
    }

    fn bounds(&self) -> Bounds {
        self.bounds
    }
}
