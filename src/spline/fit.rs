//! Shape-constrained least-squares spline fitting.
//!
//! The decision variables are the `(d + 1) × (M + 1)` polynomial coefficients of
//! `M + 1` segments, flattened column-major so segment `i` owns the contiguous
//! block `i·(d+1) .. (i+1)·(d+1)`. The quadratic program is
//!
//! ```text
//! minimise   Σ (p_{seg(x)}(x) − y)²                   over all observations
//! subject to p_i^{(k)}(k_i) = p_{i+1}^{(k)}(k_i)      k = 0, 1, 2, at every knot
//!            p''(t) ≥ 0                               at every sample t
//!            p'''(t) ≥ 0 if t < pivot, ≤ 0 if t > pivot
//! ```
//!
//! Each segment is sampled at `start + k·step` for every `k` with the sample
//! below the segment end, plus the end itself. The continuous shape constraints
//! are enforced only at these samples.

use std::fmt;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use super::basis::derivative_weights;
use super::locate::{locate, segment_span};
use crate::error::{self, DensFitError};
use crate::qp::{QpOutcome, QuadraticProgram};
use crate::types::{Bounds, CoefficientMatrix, Observation};
use crate::validate::validate_problem;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Orders of derivative that must agree across every knot.
const CONTINUITY_ORDERS: usize = 3;

/// Slack for float drift when counting samples, so `(end − start)/step` that
/// lands a hair above an integer does not produce a sample on the end point.
const SAMPLE_COUNT_SLACK: f64 = 1e-12;

/// Solver outcome of a fit.
///
/// A non-optimal status is a result value, not an error. Check it before
/// using [`FitOutcome::coefficients`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitStatus {
    /// Converged within tolerance.
    Optimal,
    /// Iteration limit reached with residuals within `sqrt(tolerance)`.
    /// A coefficient matrix is still returned.
    OptimalInaccurate,
    /// No usable solution; no coefficient matrix.
    SolverError,
}

impl FitStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Optimal => "optimal",
            Self::OptimalInaccurate => "optimal_inaccurate",
            Self::SolverError => "solver_error",
        }
    }
}

impl fmt::Display for FitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Solver settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitOptions {
    /// Interior-point iteration limit.
    pub max_iterations: usize,
    /// Convergence tolerance on primal, dual and complementarity residuals.
    pub tolerance: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-9,
        }
    }
}

impl FitOptions {
    fn validate(&self) -> error::Result<()> {
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(DensFitError::Configuration {
                message: format!("solver tolerance must be positive, got {}", self.tolerance),
            });
        }
        Ok(())
    }
}

/// Result of [`fit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitOutcome {
    pub status: FitStatus,
    /// Sum of squared residuals, `f64::INFINITY` when the solver failed.
    pub objective: f64,
    /// Fitted coefficients, present unless `status` is
    /// [`SolverError`](FitStatus::SolverError).
    pub coefficients: Option<CoefficientMatrix>,
    /// Interior-point iterations used.
    pub iterations: usize,
}

impl FitOutcome {
    pub fn is_optimal(&self) -> bool {
        self.status == FitStatus::Optimal
    }
}

/// Sample points of one segment: `start + k·step` below `end`, then `end`.
fn segment_samples(start: f64, end: f64, step: f64) -> Vec<f64> {
    let count = ((end - start) / step - SAMPLE_COUNT_SLACK).ceil().max(0.0) as usize;
    let mut samples: Vec<f64> = (0..count).map(|t| start + t as f64 * step).collect();
    samples.push(end);
    samples
}

/// A constructed, validated fit problem ready to solve.
///
/// Building is separate from solving so the program's size can be inspected
/// and benchmarked on its own.
#[derive(Debug, Clone)]
pub struct SplineProblem {
    degree: usize,
    knots: Vec<f64>,
    program: QuadraticProgram,
}

impl SplineProblem {
    /// Validate the inputs and assemble the quadratic program.
    ///
    /// # Errors
    /// Returns [`DensFitError::InvalidInput`] with the first violated invariant.
    pub fn build(
        observations: &[Observation],
        knots: &[f64],
        pivot: f64,
        bounds: Bounds,
        degree: usize,
        sampling_step: f64,
    ) -> error::Result<Self> {
        validate_problem(observations, knots, pivot, bounds, degree, sampling_step)?;

        let width = degree + 1;
        let segments = knots.len() + 1;
        let n = width * segments;

        // Residual rows: each observation hits only its own segment's block.
        let mut design = DMatrix::<f64>::zeros(observations.len(), n);
        for (row, obs) in observations.iter().enumerate() {
            let offset = locate(obs.x, knots) * width;
            for (j, w) in derivative_weights(obs.x, degree, 0).into_iter().enumerate() {
                design[(row, offset + j)] = w;
            }
        }
        let targets = DVector::from_iterator(observations.len(), observations.iter().map(|o| o.y));

        // Smoothness rows: left polynomial minus right polynomial at each knot.
        let mut equalities = DMatrix::<f64>::zeros(CONTINUITY_ORDERS * knots.len(), n);
        for (i, &k) in knots.iter().enumerate() {
            for order in 0..CONTINUITY_ORDERS {
                let row = i * CONTINUITY_ORDERS + order;
                for (j, w) in derivative_weights(k, degree, order).into_iter().enumerate() {
                    equalities[(row, i * width + j)] = w;
                    equalities[(row, (i + 1) * width + j)] = -w;
                }
            }
        }

        // Shape rows, built per segment at the segment's samples.
        let shape_rows = |segment: usize| -> Vec<Vec<f64>> {
            let Some((start, end)) = segment_span(segment, knots, bounds) else {
                return Vec::new();
            };
            let mut rows = Vec::new();
            for t in segment_samples(start, end, sampling_step) {
                rows.push(derivative_weights(t, degree, 2));
                if t < pivot {
                    rows.push(derivative_weights(t, degree, 3));
                } else if t > pivot {
                    rows.push(
                        derivative_weights(t, degree, 3)
                            .into_iter()
                            .map(|w| -w)
                            .collect(),
                    );
                }
            }
            rows
        };

        #[cfg(feature = "parallel")]
        let per_segment: Vec<Vec<Vec<f64>>> = (0..segments).into_par_iter().map(shape_rows).collect();
        #[cfg(not(feature = "parallel"))]
        let per_segment: Vec<Vec<Vec<f64>>> = (0..segments).map(shape_rows).collect();

        let total: usize = per_segment.iter().map(Vec::len).sum();
        let mut inequalities = DMatrix::<f64>::zeros(total, n);
        let mut row = 0;
        for (segment, rows) in per_segment.iter().enumerate() {
            for weights in rows {
                for (j, &w) in weights.iter().enumerate() {
                    inequalities[(row, segment * width + j)] = w;
                }
                row += 1;
            }
        }

        #[cfg(feature = "logging")]
        tracing::debug!(
            variables = n,
            equality_rows = equalities.nrows(),
            inequality_rows = total,
            "spline problem built"
        );

        Ok(Self {
            degree,
            knots: knots.to_vec(),
            program: QuadraticProgram {
                design,
                targets,
                equalities,
                inequalities,
            },
        })
    }

    /// Number of coefficients, `(degree + 1) · (knots + 1)`.
    pub fn variables(&self) -> usize {
        self.program.design.ncols()
    }

    /// Number of smoothness rows, `3 · knots`.
    pub fn equality_rows(&self) -> usize {
        self.program.equalities.nrows()
    }

    /// Number of shape rows over all samples.
    pub fn inequality_rows(&self) -> usize {
        self.program.inequalities.nrows()
    }

    pub fn observations(&self) -> usize {
        self.program.design.nrows()
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn segments(&self) -> usize {
        self.knots.len() + 1
    }

    /// Solve the program.
    ///
    /// # Errors
    /// Returns [`DensFitError::Configuration`] if the tolerance is not positive.
    /// Solver failure is reported through [`FitOutcome::status`].
    pub fn solve(&self, options: &FitOptions) -> error::Result<FitOutcome> {
        options.validate()?;
        let outcome = match self
            .program
            .solve(options.max_iterations, options.tolerance)
        {
            QpOutcome::Solved {
                solution,
                objective,
                iterations,
                accurate,
            } => match CoefficientMatrix::from_column_major(
                self.degree,
                self.segments(),
                solution.as_slice().to_vec(),
            ) {
                Ok(matrix) => FitOutcome {
                    status: if accurate {
                        FitStatus::Optimal
                    } else {
                        FitStatus::OptimalInaccurate
                    },
                    objective,
                    coefficients: Some(matrix),
                    iterations,
                },
                Err(_) => failed(iterations),
            },
            QpOutcome::Failed { iterations, reason } => {
                #[cfg(feature = "logging")]
                tracing::debug!(iterations, reason = %reason, "spline solve failed");
                #[cfg(not(feature = "logging"))]
                let _ = reason;
                failed(iterations)
            }
        };

        #[cfg(feature = "logging")]
        tracing::debug!(
            status = %outcome.status,
            objective = outcome.objective,
            iterations = outcome.iterations,
            "spline fit complete"
        );

        Ok(outcome)
    }
}

fn failed(iterations: usize) -> FitOutcome {
    FitOutcome {
        status: FitStatus::SolverError,
        objective: f64::INFINITY,
        coefficients: None,
        iterations,
    }
}

/// Fit a shape-constrained spline with default [`FitOptions`].
///
/// `observations`, `knots`, `pivot`, `bounds` and `sampling_step` are all in
/// working-interval coordinates.
///
/// # Errors
/// Returns [`DensFitError::InvalidInput`] if the inputs violate an invariant;
/// nothing is solved in that case. A failed solve is not an error: it is
/// reported through [`FitOutcome::status`].
///
/// # Examples
/// ```
/// use densfit::spline::{fit, FitStatus};
/// use densfit::types::{Bounds, Observation};
///
/// let points: Vec<Observation> = [(-3.0, 15.0), (-2.0, 9.0), (-1.0, 6.0), (0.0, 4.0),
///     (1.0, 2.5), (2.0, 1.5), (3.0, 1.0)]
///     .into_iter()
///     .map(Observation::from)
///     .collect();
/// let outcome = fit(&points, &[-1.5, 0.0, 1.5], 0.0, Bounds::new(-4.0, 4.0), 4, 0.1)?;
/// assert_eq!(outcome.status, FitStatus::Optimal);
/// assert_eq!(outcome.coefficients.unwrap().shape(), (5, 4));
/// # Ok::<(), densfit::DensFitError>(())
/// ```
pub fn fit(
    observations: &[Observation],
    knots: &[f64],
    pivot: f64,
    bounds: Bounds,
    degree: usize,
    sampling_step: f64,
) -> error::Result<FitOutcome> {
    fit_with_options(
        observations,
        knots,
        pivot,
        bounds,
        degree,
        sampling_step,
        &FitOptions::default(),
    )
}

/// [`fit`] with explicit solver settings.
///
/// # Errors
/// As [`fit`], plus [`DensFitError::Configuration`] for a non-positive tolerance.
pub fn fit_with_options(
    observations: &[Observation],
    knots: &[f64],
    pivot: f64,
    bounds: Bounds,
    degree: usize,
    sampling_step: f64,
    options: &FitOptions,
) -> error::Result<FitOutcome> {
    #[cfg(feature = "logging")]
    tracing::debug!(
        observations = observations.len(),
        knots = knots.len(),
        degree,
        sampling_step,
        "spline fit started"
    );

    SplineProblem::build(observations, knots, pivot, bounds, degree, sampling_step)?
        .solve(options)
}
