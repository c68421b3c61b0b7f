//! End-to-end fitting from raw market quotes.

use chrono::{DateTime, Utc};

use super::record::FitRecord;
use crate::error::{self, DensFitError, InputViolation};
use crate::scale::{DomainScaler, Rescaled};
use crate::spline::{
    Evaluator, FitOptions, FitOutcome, FitStatus, PiecewisePolynomial, ShapeCheck, ShapeReport,
    assemble, fit_with_options,
};
use crate::types::{Bounds, CoefficientMatrix, DerivativeOrder, Observation};

/// Builder for a density fit from observations in original price units.
///
/// The original domain is the `[min x, max x]` of the observations that pass
/// the value band. Observations, knots and pivot are mapped onto the working
/// interval with one [`DomainScaler`], fitted there, and the result is exposed
/// in original units through [`DensityFit`].
///
/// # Examples
///
/// ```
/// use densfit::density::DensityBuilder;
/// use densfit::spline::FitStatus;
///
/// let strikes = [80.0, 85.0, 90.0, 95.0, 100.0, 105.0, 110.0, 115.0, 120.0];
/// let prices = [20.4, 15.9, 11.8, 8.3, 5.5, 3.4, 2.0, 1.1, 0.6];
///
/// let fit = DensityBuilder::new()
///     .observations(&strikes, &prices)
///     .knots(&[90.0, 100.0, 110.0])
///     .pivot(100.0)
///     .degree(4)
///     .build()?;
///
/// assert_eq!(fit.status(), FitStatus::Optimal);
/// let p = fit.probability(90.0, 110.0)?;
/// assert!(p > 0.0 && p <= 1.0);
/// # Ok::<(), densfit::DensFitError>(())
/// ```
#[derive(Debug, Clone)]
pub struct DensityBuilder {
    observations: Vec<Observation>,
    min_value: f64,
    max_value: f64,
    knots: Vec<f64>,
    pivot: Option<f64>,
    degree: usize,
    sampling_step: f64,
    working: Bounds,
    options: FitOptions,
}

impl Default for DensityBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DensityBuilder {
    /// Degree 4, sampling step 0.01, working interval `[-1, 1]`, no value band.
    pub fn new() -> Self {
        Self {
            observations: Vec::new(),
            min_value: f64::NEG_INFINITY,
            max_value: f64::INFINITY,
            knots: Vec::new(),
            pivot: None,
            degree: 4,
            sampling_step: 0.01,
            working: Bounds::unit(),
            options: FitOptions::default(),
        }
    }

    /// Add paired price levels and values. Extra entries of the longer slice
    /// are ignored.
    pub fn observations(mut self, xs: &[f64], ys: &[f64]) -> Self {
        self.observations
            .extend(xs.iter().zip(ys).map(|(&x, &y)| Observation::new(x, y)));
        self
    }

    /// Add one observation.
    pub fn observation(mut self, x: f64, y: f64) -> Self {
        self.observations.push(Observation::new(x, y));
        self
    }

    /// Keep only observations with `min <= y <= max`.
    ///
    /// Filters out quotes too small to carry information (e.g. marks below the
    /// exchange tick) and deep in-the-money quotes.
    pub fn value_band(mut self, min: f64, max: f64) -> Self {
        self.min_value = min;
        self.max_value = max;
        self
    }

    /// Interior knots in original units.
    pub fn knots(mut self, knots: &[f64]) -> Self {
        self.knots = knots.to_vec();
        self
    }

    /// Pivot in original units; must equal one of the knots.
    pub fn pivot(mut self, pivot: f64) -> Self {
        self.pivot = Some(pivot);
        self
    }

    pub fn degree(mut self, degree: usize) -> Self {
        self.degree = degree;
        self
    }

    /// Constraint sampling step in working-interval units.
    pub fn sampling_step(mut self, step: f64) -> Self {
        self.sampling_step = step;
        self
    }

    /// Interval the fit runs in. Default `[-1, 1]`.
    pub fn working_interval(mut self, working: Bounds) -> Self {
        self.working = working;
        self
    }

    pub fn options(mut self, options: FitOptions) -> Self {
        self.options = options;
        self
    }

    /// Filter, scale, validate and fit.
    ///
    /// A solver that fails to converge is not an error here: the returned
    /// [`DensityFit`] carries the status and refuses curve queries.
    ///
    /// # Errors
    /// - [`DensFitError::InvalidInput`] if no observation survives the value
    ///   band, the pivot is missing, or the scaled problem violates an invariant.
    /// - [`DensFitError::Domain`] if all surviving observations share one x.
    /// - [`DensFitError::Configuration`] if the working interval is not
    ///   increasing or the solver options are invalid.
    pub fn build(self) -> error::Result<DensityFit> {
        #[cfg(feature = "logging")]
        tracing::debug!(
            observations = self.observations.len(),
            knots = self.knots.len(),
            degree = self.degree,
            "density build started"
        );

        let pivot = self.pivot.ok_or_else(|| DensFitError::Configuration {
            message: "pivot is required".into(),
        })?;
        if !(self.working.low < self.working.high) {
            return Err(DensFitError::Configuration {
                message: format!(
                    "working interval must satisfy low < high, got [{}, {}]",
                    self.working.low, self.working.high
                ),
            });
        }

        let kept: Vec<Observation> = self
            .observations
            .iter()
            .copied()
            .filter(|o| self.min_value <= o.y && o.y <= self.max_value)
            .collect();
        if kept.is_empty() {
            return Err(InputViolation::NoObservations.into());
        }

        #[cfg(feature = "logging")]
        tracing::debug!(
            kept = kept.len(),
            dropped = self.observations.len() - kept.len(),
            "value band applied"
        );

        let domain = kept.iter().fold(
            Bounds::new(f64::INFINITY, f64::NEG_INFINITY),
            |b, o| Bounds::new(b.low.min(o.x), b.high.max(o.x)),
        );
        let scaler = DomainScaler::new(domain, self.working)?;

        // Rounding can push the domain ends a hair past the working interval.
        let scaled: Vec<Observation> = scaler
            .scale_observations(&kept)?
            .into_iter()
            .map(|o| Observation::new(o.x.clamp(self.working.low, self.working.high), o.y))
            .collect();
        let scaled_knots = scaler.scale_all(&self.knots)?;
        let scaled_pivot = scaler.scale(pivot)?;

        let outcome = fit_with_options(
            &scaled,
            &scaled_knots,
            scaled_pivot,
            self.working,
            self.degree,
            self.sampling_step,
            &self.options,
        )?;

        #[cfg(feature = "logging")]
        tracing::debug!(status = %outcome.status, "density build complete");

        Ok(DensityFit {
            outcome,
            scaler,
            scaled_knots,
            pivot,
            scaled_pivot,
            observations: kept.len(),
        })
    }
}

/// A fitted density in original units.
///
/// The fitted function `f` plays the role of a call-price curve: its first
/// derivative is (up to scale) a cumulative distribution and its second
/// derivative the density.
#[derive(Debug, Clone)]
pub struct DensityFit {
    outcome: FitOutcome,
    scaler: DomainScaler,
    scaled_knots: Vec<f64>,
    pivot: f64,
    scaled_pivot: f64,
    observations: usize,
}

impl DensityFit {
    pub fn outcome(&self) -> &FitOutcome {
        &self.outcome
    }

    pub fn status(&self) -> FitStatus {
        self.outcome.status
    }

    pub fn scaler(&self) -> &DomainScaler {
        &self.scaler
    }

    /// `[min x, max x]` of the fitted observations, in original units.
    pub fn original_bounds(&self) -> Bounds {
        self.scaler.domain()
    }

    pub fn scaled_knots(&self) -> &[f64] {
        &self.scaled_knots
    }

    /// Pivot in original units.
    pub fn pivot(&self) -> f64 {
        self.pivot
    }

    /// Number of observations that passed the value band.
    pub fn observations_used(&self) -> usize {
        self.observations
    }

    fn coefficients(&self) -> error::Result<&CoefficientMatrix> {
        self.outcome
            .coefficients
            .as_ref()
            .ok_or_else(|| DensFitError::Numerical {
                message: format!("fit has no coefficients (status {})", self.outcome.status),
            })
    }

    /// Evaluator of derivative `order` on the working interval.
    ///
    /// # Errors
    /// [`DensFitError::Numerical`] if the solve failed,
    /// [`DensFitError::Configuration`] if `order > 2`.
    pub fn scaled_curve(&self, order: usize) -> error::Result<PiecewisePolynomial> {
        assemble(
            self.coefficients()?,
            &self.scaled_knots,
            self.scaler.target(),
            order,
        )
    }

    /// Evaluator of derivative `order` taking original-unit x.
    ///
    /// Derivatives are with respect to the working coordinate.
    ///
    /// # Errors
    /// As [`scaled_curve`](Self::scaled_curve).
    pub fn curve(&self, order: usize) -> error::Result<Rescaled<PiecewisePolynomial>> {
        Ok(self.scaler.wrap(self.scaled_curve(order)?))
    }

    /// Probability mass between `a` and `b` relative to the whole fitted domain.
    ///
    /// `(F(b) − F(a)) / (F(high) − F(low))` with `F = f'`.
    ///
    /// # Errors
    /// - [`DensFitError::Domain`] unless `low <= a < b <= high` in original units.
    /// - [`DensFitError::Numerical`] if the solve failed or the total mass is
    ///   not positive.
    pub fn probability(&self, a: f64, b: f64) -> error::Result<f64> {
        let domain = self.original_bounds();
        if !(domain.low <= a && a < b && b <= domain.high) {
            return Err(DensFitError::Domain {
                message: format!(
                    "probability interval must satisfy {} <= a < b <= {}, got a={a}, b={b}",
                    domain.low, domain.high
                ),
            });
        }
        let cdf = self.curve(DerivativeOrder::First.order())?;
        let total = cdf.evaluate(domain.high)? - cdf.evaluate(domain.low)?;
        if !(total > 0.0) {
            return Err(DensFitError::Numerical {
                message: format!("total probability mass must be positive, got {total}"),
            });
        }
        Ok((cdf.evaluate(b)? - cdf.evaluate(a)?) / total)
    }

    /// Scan the fitted curve for shape violations on the working interval.
    ///
    /// # Errors
    /// As [`ShapeCheck::check`], plus [`DensFitError::Numerical`] if the solve failed.
    pub fn shape_report(&self, check: &ShapeCheck) -> error::Result<ShapeReport> {
        check.check(&self.scaled_curve(0)?, self.scaled_pivot)
    }

    /// Snapshot of the fit for persistence.
    ///
    /// # Errors
    /// [`DensFitError::Numerical`] if the solve failed.
    pub fn record(
        &self,
        timestamp: DateTime<Utc>,
        reference: impl Into<String>,
    ) -> error::Result<FitRecord> {
        let domain = self.original_bounds();
        FitRecord::new(
            timestamp,
            self.pivot,
            reference.into(),
            self.coefficients()?.clone(),
            self.scaled_knots.clone(),
            self.scaler.target(),
            domain.low,
            domain.high,
        )
    }
}
