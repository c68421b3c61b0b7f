//! Shape-constrained piecewise polynomials.
//!
//! A spline here is a set of per-segment polynomials of a fixed degree, one
//! segment per gap between consecutive knots plus the two outer segments up to
//! the bounds. All fitted curves are consumed through the [`Evaluator`] trait.
//!
//! ## Pieces
//!
//! - [`locate`](locate::locate): which segment owns a given x
//! - [`fit`](fit::fit): the constrained least-squares fit producing a [`CoefficientMatrix`](crate::types::CoefficientMatrix)
//! - [`assemble`](assemble::assemble): turns a coefficient matrix into a [`PiecewisePolynomial`]
//! - [`ShapeCheck`]: post-fit verification of continuity and shape

pub mod assemble;
pub mod basis;
pub mod fit;
pub mod locate;
pub mod shape;

pub use assemble::{PiecewisePolynomial, assemble};
pub use fit::{FitOptions, FitOutcome, FitStatus, SplineProblem, fit, fit_with_options};
pub use locate::{locate, segment_span};
pub use shape::{ShapeCheck, ShapeReport, ShapeViolation, ViolationKind};

use std::sync::Arc;

use crate::error;
use crate::types::Bounds;

/// A real function of one variable over a closed interval.
///
/// Implemented by assembled splines, by their original-domain wrappers and by
/// references, boxes and `Arc`s of any evaluator, so wrappers can borrow rather
/// than copy.
///
/// # Thread Safety
/// All implementations must be `Send + Sync`.
///
/// # Error Handling
/// `evaluate` returns [`DensFitError::Domain`](crate::DensFitError::Domain) for
/// inputs outside [`bounds`](Evaluator::bounds).
pub trait Evaluator: Send + Sync {
    /// Value at `x`.
    fn evaluate(&self, x: f64) -> error::Result<f64>;

    /// Closed interval on which `evaluate` succeeds.
    fn bounds(&self) -> Bounds;
}

impl<E: Evaluator + ?Sized> Evaluator for &E {
    fn evaluate(&self, x: f64) -> error::Result<f64> {
        (**self).evaluate(x)
    }

    fn bounds(&self) -> Bounds {
        (**self).bounds()
    }
}

impl<E: Evaluator + ?Sized> Evaluator for Box<E> {
    fn evaluate(&self, x: f64) -> error::Result<f64> {
        (**self).evaluate(x)
    }

    fn bounds(&self) -> Bounds {
        (**self).bounds()
    }
}

impl<E: Evaluator + ?Sized> Evaluator for Arc<E> {
    fn evaluate(&self, x: f64) -> error::Result<f64> {
        (**self).evaluate(x)
    }

    fn bounds(&self) -> Bounds {
        (**self).bounds()
    }
}
