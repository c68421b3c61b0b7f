//! Post-fit shape verification.
//!
//! The fitter enforces its shape constraints only at discrete samples, so a
//! fitted curve can dip slightly between them. [`ShapeCheck`] re-samples a
//! fitted spline on an independent grid and reports every place where
//!
//! - the second derivative (the implied density) is negative,
//! - the third derivative is negative left of the pivot or positive right of it,
//! - a value or one of the first two derivatives jumps across a knot.
//!
//! The third-derivative sign is not checked within `pivot_margin` of the pivot,
//! where the sampled constraints leave a one-step gap.

use serde::{Deserialize, Serialize};

use super::assemble::PiecewisePolynomial;
use super::Evaluator;
use crate::error::{self, DensFitError};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Settings of a shape scan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapeCheck {
    /// Grid spacing in the spline's own coordinates.
    pub step: f64,
    /// Absolute slack before a value counts as a violation.
    pub tolerance: f64,
    /// Half-width of the neighbourhood around the pivot exempt from the
    /// third-derivative sign check.
    pub pivot_margin: f64,
}

impl Default for ShapeCheck {
    fn default() -> Self {
        Self {
            step: 0.001,
            tolerance: 1e-6,
            pivot_margin: 0.01,
        }
    }
}

/// What went wrong at a violation point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// f'' < 0.
    NegativeDensity,
    /// f''' < 0 left of the pivot.
    ConvexityBreak,
    /// f''' > 0 right of the pivot.
    ConcavityBreak,
    /// Left and right limits of the given derivative order differ at a knot.
    Discontinuity { order: usize },
}

/// A shape violation at a specific point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeViolation {
    pub x: f64,
    pub kind: ViolationKind,
    /// Absolute size of the violation.
    pub magnitude: f64,
}

/// Result of a shape scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeReport {
    /// Whether no violation was found.
    pub is_valid: bool,
    pub violations: Vec<ShapeViolation>,
}

impl ShapeReport {
    /// A report with no violations.
    pub fn clean() -> Self {
        Self {
            is_valid: true,
            violations: Vec::new(),
        }
    }

    fn from_violations(violations: Vec<ShapeViolation>) -> Self {
        Self {
            is_valid: violations.is_empty(),
            violations,
        }
    }

    /// Combine two reports; the result is valid only if both are.
    pub fn merge(&self, other: &ShapeReport) -> ShapeReport {
        let mut violations = self.violations.clone();
        violations.extend(other.violations.iter().cloned());
        ShapeReport {
            is_valid: self.is_valid && other.is_valid,
            violations,
        }
    }

    /// The violation with the largest magnitude, if any.
    ///
    /// # Examples
    ///
    /// ```
    /// use densfit::spline::{ShapeReport, ShapeViolation, ViolationKind};
    ///
    /// let report = ShapeReport {
    ///     is_valid: false,
    ///     violations: vec![
    ///         ShapeViolation { x: -0.5, kind: ViolationKind::NegativeDensity, magnitude: 1e-4 },
    ///         ShapeViolation { x: 0.3, kind: ViolationKind::ConcavityBreak, magnitude: 2e-3 },
    ///     ],
    /// };
    /// assert_eq!(report.worst_violation().unwrap().x, 0.3);
    /// ```
    pub fn worst_violation(&self) -> Option<&ShapeViolation> {
        self.violations
            .iter()
            .max_by(|a, b| a.magnitude.total_cmp(&b.magnitude))
    }

    /// Violations of one kind.
    pub fn of_kind(&self, kind: ViolationKind) -> impl Iterator<Item = &ShapeViolation> {
        self.violations.iter().filter(move |v| v.kind == kind)
    }
}

impl ShapeCheck {
    fn validate(&self) -> error::Result<()> {
        for (name, value) in [
            ("step", self.step),
            ("tolerance", self.tolerance),
            ("pivot margin", self.pivot_margin),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(DensFitError::Configuration {
                    message: format!("shape check {name} must be finite and non-negative, got {value}"),
                });
            }
        }
        if self.step == 0.0 {
            return Err(DensFitError::Configuration {
                message: "shape check step must be positive".into(),
            });
        }
        Ok(())
    }

    /// Grid from the lower to the upper bound, always including both.
    fn grid(&self, spline: &PiecewisePolynomial) -> Vec<f64> {
        let b = spline.bounds();
        let n = (b.width() / self.step).floor() as usize;
        let mut grid: Vec<f64> = (0..=n).map(|i| b.low + i as f64 * self.step).collect();
        if grid.last().is_some_and(|&x| x < b.high) {
            grid.push(b.high);
        }
        grid
    }

    fn violations_at(&self, spline: &PiecewisePolynomial, pivot: f64, x: f64) -> Vec<ShapeViolation> {
        let mut found = Vec::new();
        let density = spline.derivative_at(x, 2);
        if density < -self.tolerance {
            found.push(ShapeViolation {
                x,
                kind: ViolationKind::NegativeDensity,
                magnitude: -density,
            });
        }
        let third = spline.derivative_at(x, 3);
        if x < pivot - self.pivot_margin && third < -self.tolerance {
            found.push(ShapeViolation {
                x,
                kind: ViolationKind::ConvexityBreak,
                magnitude: -third,
            });
        } else if x > pivot + self.pivot_margin && third > self.tolerance {
            found.push(ShapeViolation {
                x,
                kind: ViolationKind::ConcavityBreak,
                magnitude: third,
            });
        }
        found
    }

    /// Scan `spline` for shape and continuity violations.
    ///
    /// The derivative order `spline` was assembled with is ignored; the scan
    /// always inspects the underlying polynomial.
    ///
    /// # Errors
    /// Returns [`DensFitError::Configuration`] if `step` is not positive or
    /// `tolerance` / `pivot_margin` is negative or not finite.
    pub fn check(&self, spline: &PiecewisePolynomial, pivot: f64) -> error::Result<ShapeReport> {
        self.validate()?;
        let grid = self.grid(spline);

        #[cfg(feature = "parallel")]
        let per_point: Vec<Vec<ShapeViolation>> = grid
            .par_iter()
            .map(|&x| self.violations_at(spline, pivot, x))
            .collect();
        #[cfg(not(feature = "parallel"))]
        let per_point: Vec<Vec<ShapeViolation>> = grid
            .iter()
            .map(|&x| self.violations_at(spline, pivot, x))
            .collect();

        let mut violations: Vec<ShapeViolation> = per_point.into_iter().flatten().collect();

        for (index, &k) in spline.knots().iter().enumerate() {
            for order in 0..3 {
                let Some((left, right)) = spline.knot_limits(index, order) else {
                    continue;
                };
                let jump = (left - right).abs();
                if jump > self.tolerance * (1.0 + left.abs().max(right.abs())) {
                    violations.push(ShapeViolation {
                        x: k,
                        kind: ViolationKind::Discontinuity { order },
                        magnitude: jump,
                    });
                }
            }
        }

        #[cfg(feature = "logging")]
        tracing::debug!(
            grid_points = grid.len(),
            violations = violations.len(),
            "shape check complete"
        );

        Ok(ShapeReport::from_violations(violations))
    }
}
