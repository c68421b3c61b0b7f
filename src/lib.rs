//! # densfit
//!
//! Shape-constrained piecewise polynomial fitting for market-implied
//! probability densities.
//!
//! Fits a smooth curve through noisy (strike, price) quotes such that the
//! curve is twice continuously differentiable across its knots, its second
//! derivative (the implied density) is non-negative, and its first derivative
//! turns from convex to concave at a single pivot. The fit is a constrained
//! least-squares quadratic program solved on a rescaled, well-conditioned
//! working interval.
//!
//! ## Architecture
//!
//! - **`scale`**: Affine maps between price units and the working interval
//! - **`spline`**: Segment lookup, the constrained fit, evaluators and shape checks
//! - **`density`**: End-to-end pipeline from quotes to probabilities, and the persisted record
//! - **`validate`**: The single up-front validation pass on fit inputs
//!
//! ## Design
//!
//! - **Solver status is a value.** [`fit`](fn@spline::fit) returns a
//!   [`FitOutcome`] whose [`FitStatus`] callers check before using the
//!   coefficients. Only invalid inputs are errors.
//! - **No panics.** Every fallible operation returns [`Result`]. Library code
//!   never calls `unwrap()` or `expect()`.
//! - **Immutable evaluators.** An assembled [`PiecewisePolynomial`] owns its
//!   coefficients, knots and bounds and never changes.
//! - **Thread-safe.** [`Evaluator`] requires `Send + Sync`; independent fits
//!   can run concurrently.
//! - **Serializable.** Value types implement Serde `Serialize` /
//!   `Deserialize`, validating on deserialisation where invariants exist
//!   ([`CoefficientMatrix`](types::CoefficientMatrix),
//!   [`FitRecord`](density::FitRecord)).

pub mod density;
pub mod error;
mod qp;
pub mod scale;
pub mod spline;
pub mod types;
pub mod validate;

#[doc(inline)]
pub use error::{DensFitError, InputViolation, Result};
#[doc(inline)]
pub use spline::{Evaluator, FitOutcome, FitStatus, PiecewisePolynomial};
#[doc(inline)]
pub use types::{Bounds, CoefficientMatrix, Observation};
