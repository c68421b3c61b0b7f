//! Error types for the densfit library.
//!
//! All fallible operations return `Result<T, DensFitError>` rather than panicking.
//! A solver that fails to reach optimality is *not* an error: it is reported as a
//! [`FitStatus`](crate::spline::FitStatus) on the fit outcome, and callers check it
//! before using the coefficient matrix.

use thiserror::Error;

/// Convenience type alias for results in this crate.
pub type Result<T> = std::result::Result<T, DensFitError>;

/// Errors that can occur while fitting, assembling or evaluating a spline.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DensFitError {
    /// Fit inputs violate a structural invariant. Detected before any solve.
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InputViolation),

    /// An evaluator or scaler was called outside its valid input range.
    #[error("domain error: {message}")]
    Domain { message: String },

    /// An assembler was asked for an unsupported configuration (e.g. derivative order 3).
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// Numerical computation failed or produced unusable values.
    #[error("numerical error: {message}")]
    Numerical { message: String },
}

/// The first fit invariant that failed validation.
///
/// Produced by [`validate_problem`](crate::validate::validate_problem), which checks
/// the invariants in the order the variants are declared here.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum InputViolation {
    #[error("{name} must be finite, got {value}")]
    NonFinite { name: &'static str, value: f64 },

    #[error("bounds must satisfy low < high, got ({low}, {high})")]
    UnorderedBounds { low: f64, high: f64 },

    #[error("at least one knot is required")]
    NoKnots,

    #[error("knots must be strictly increasing, but knots[{index}]={left} > knots[{next}]={right}", next = .index + 1)]
    UnsortedKnots { index: usize, left: f64, right: f64 },

    #[error("knots must be unique, but knots[{index}] and knots[{next}] both equal {value}", next = .index + 1)]
    DuplicateKnot { index: usize, value: f64 },

    #[error("knot {knot} lies outside the open interval ({low}, {high})")]
    KnotOutsideBounds { knot: f64, low: f64, high: f64 },

    #[error("at least one observation is required")]
    NoObservations,

    #[error("observation with x={x} lies outside the bounds [{low}, {high}]")]
    ObservationOutsideBounds { x: f64, low: f64, high: f64 },

    #[error("pivot {pivot} is not one of the knots")]
    PivotNotKnot { pivot: f64 },

    #[error("polynomial degree must be at least 3, got {degree}")]
    DegreeTooLow { degree: usize },

    #[error("sampling step must be positive, got {step}")]
    NonPositiveStep { step: f64 },
}
