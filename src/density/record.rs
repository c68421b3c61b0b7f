//! Persisted form of a density fit.
//!
//! A record holds everything needed to rebuild the fitted curve without
//! solving again: the coefficient matrix, the knots and bounds it was fitted
//! on, and the original domain that maps back to price units.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{self, DensFitError};
use crate::scale::{DomainScaler, Rescaled};
use crate::spline::{PiecewisePolynomial, assemble};
use crate::types::{Bounds, CoefficientMatrix};
use crate::validate::{validate_knot_order, validate_knots_inside};

/// Snapshot of one fit, validated on construction and on deserialisation.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use densfit::density::FitRecord;
/// use densfit::spline::Evaluator;
/// use densfit::types::{Bounds, CoefficientMatrix};
///
/// let m = CoefficientMatrix::from_columns(3, vec![vec![0.0, 1.0, 0.0, 0.0]; 2])?;
/// let record = FitRecord::new(
///     Utc.with_ymd_and_hms(2025, 6, 20, 8, 0, 0).unwrap(),
///     100.0,
///     "BTC-20JUN25".into(),
///     m,
///     vec![0.0],
///     Bounds::unit(),
///     50.0,
///     150.0,
/// )?;
/// let back = FitRecord::from_json(&record.to_json()?)?;
/// assert_eq!(back, record);
/// assert_eq!(back.original_curve(0)?.evaluate(150.0)?, 1.0);
/// # Ok::<(), densfit::DensFitError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FitRecordRaw", into = "FitRecordRaw")]
pub struct FitRecord {
    timestamp: DateTime<Utc>,
    pivot: f64,
    reference: String,
    coefficients: CoefficientMatrix,
    scaled_knots: Vec<f64>,
    scaled_bounds: Bounds,
    original_min: f64,
    original_max: f64,
}

#[derive(Serialize, Deserialize)]
struct FitRecordRaw {
    timestamp: DateTime<Utc>,
    pivot: f64,
    reference: String,
    coefficients: CoefficientMatrix,
    scaled_knots: Vec<f64>,
    scaled_bounds: Bounds,
    original_min: f64,
    original_max: f64,
}

impl TryFrom<FitRecordRaw> for FitRecord {
    type Error = DensFitError;
    fn try_from(raw: FitRecordRaw) -> Result<Self, Self::Error> {
        Self::new(
            raw.timestamp,
            raw.pivot,
            raw.reference,
            raw.coefficients,
            raw.scaled_knots,
            raw.scaled_bounds,
            raw.original_min,
            raw.original_max,
        )
    }
}

impl From<FitRecord> for FitRecordRaw {
    fn from(r: FitRecord) -> Self {
        Self {
            timestamp: r.timestamp,
            pivot: r.pivot,
            reference: r.reference,
            coefficients: r.coefficients,
            scaled_knots: r.scaled_knots,
            scaled_bounds: r.scaled_bounds,
            original_min: r.original_min,
            original_max: r.original_max,
        }
    }
}

fn invalid(message: String) -> DensFitError {
    DensFitError::Numerical {
        message: format!("invalid fit record: {message}"),
    }
}

impl FitRecord {
    /// Create a record, checking that its parts describe one consistent curve.
    ///
    /// # Errors
    /// Returns [`DensFitError::Numerical`] if a number is not finite, an
    /// interval is not increasing, the knots are not strictly increasing or not
    /// strictly inside the scaled bounds, or the matrix does not have
    /// `knots + 1` columns.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        timestamp: DateTime<Utc>,
        pivot: f64,
        reference: String,
        coefficients: CoefficientMatrix,
        scaled_knots: Vec<f64>,
        scaled_bounds: Bounds,
        original_min: f64,
        original_max: f64,
    ) -> error::Result<Self> {
        if !pivot.is_finite() {
            return Err(invalid(format!("pivot must be finite, got {pivot}")));
        }
        if !(original_min.is_finite() && original_max.is_finite() && original_min < original_max)
        {
            return Err(invalid(format!(
                "original domain must be finite with min < max, got [{original_min}, {original_max}]"
            )));
        }
        if !(scaled_bounds.low.is_finite()
            && scaled_bounds.high.is_finite()
            && scaled_bounds.low < scaled_bounds.high)
        {
            return Err(invalid(format!(
                "scaled bounds must be finite with low < high, got [{}, {}]",
                scaled_bounds.low, scaled_bounds.high
            )));
        }
        if let Some(k) = scaled_knots.iter().find(|k| !k.is_finite()) {
            return Err(invalid(format!("knots must be finite, got {k}")));
        }
        validate_knot_order(&scaled_knots).map_err(|v| invalid(v.to_string()))?;
        validate_knots_inside(&scaled_knots, scaled_bounds).map_err(|v| invalid(v.to_string()))?;
        if coefficients.segments() != scaled_knots.len() + 1 {
            return Err(invalid(format!(
                "{} knots need {} coefficient columns, got {}",
                scaled_knots.len(),
                scaled_knots.len() + 1,
                coefficients.segments()
            )));
        }
        Ok(Self {
            timestamp,
            pivot,
            reference,
            coefficients,
            scaled_knots,
            scaled_bounds,
            original_min,
            original_max,
        })
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Pivot in original units.
    pub fn pivot(&self) -> f64 {
        self.pivot
    }

    /// Caller-chosen identifier, e.g. an instrument or expiry code.
    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn coefficients(&self) -> &CoefficientMatrix {
        &self.coefficients
    }

    pub fn scaled_knots(&self) -> &[f64] {
        &self.scaled_knots
    }

    pub fn scaled_bounds(&self) -> Bounds {
        self.scaled_bounds
    }

    pub fn original_bounds(&self) -> Bounds {
        Bounds::new(self.original_min, self.original_max)
    }

    /// The map from the original domain onto the scaled bounds.
    ///
    /// # Errors
    /// Cannot fail for a validated record; kept fallible to share the
    /// [`DomainScaler::new`] signature.
    pub fn scaler(&self) -> error::Result<DomainScaler> {
        DomainScaler::new(self.original_bounds(), self.scaled_bounds)
    }

    /// Evaluator of derivative `order` on the scaled bounds.
    ///
    /// # Errors
    /// [`DensFitError::Configuration`] if `order > 2`.
    pub fn scaled_curve(&self, order: usize) -> error::Result<PiecewisePolynomial> {
        assemble(&self.coefficients, &self.scaled_knots, self.scaled_bounds, order)
    }

    /// Evaluator of derivative `order` taking original-unit x.
    ///
    /// # Errors
    /// [`DensFitError::Configuration`] if `order > 2`.
    pub fn original_curve(&self, order: usize) -> error::Result<Rescaled<PiecewisePolynomial>> {
        Ok(self.scaler()?.wrap(self.scaled_curve(order)?))
    }

    /// Serialise to a JSON string.
    ///
    /// # Errors
    /// Returns [`DensFitError::Numerical`] if serialisation fails.
    pub fn to_json(&self) -> error::Result<String> {
        serde_json::to_string(self).map_err(|e| invalid(e.to_string()))
    }

    /// Parse and validate a record from JSON.
    ///
    /// # Errors
    /// Returns [`DensFitError::Numerical`] for malformed JSON or a record that
    /// fails validation.
    pub fn from_json(json: &str) -> error::Result<Self> {
        serde_json::from_str(json).map_err(|e| invalid(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spline::Evaluator;
    use approx::assert_abs_diff_eq;
    use chrono::TimeZone;

    fn matrix() -> CoefficientMatrix {
        // x² + 1 on both sides of a knot at 0
        CoefficientMatrix::from_columns(3, vec![vec![0.0, 1.0, 0.0, 1.0]; 2]).unwrap()
    }

    fn record() -> FitRecord {
        FitRecord::new(
            Utc.with_ymd_and_hms(2025, 6, 20, 8, 0, 0).unwrap(),
            100.0,
            "BTC-20JUN25".into(),
            matrix(),
            vec![0.0],
            Bounds::unit(),
            50.0,
            150.0,
        )
        .unwrap()
    }

    #[test]
    fn json_roundtrip_preserves_everything() {
        let r = record();
        let json = r.to_json().unwrap();
        assert!(json.contains("\"reference\":\"BTC-20JUN25\""));
        assert!(json.contains("2025-06-20T08:00:00Z"));
        let back = FitRecord::from_json(&json).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn curves_rebuild_without_solving() {
        let r = record();
        let scaled = r.scaled_curve(0).unwrap();
        assert_abs_diff_eq!(scaled.evaluate(0.5).unwrap(), 1.25);
        let original = r.original_curve(0).unwrap();
        // 125 maps to 0.5
        assert_abs_diff_eq!(original.evaluate(125.0).unwrap(), 1.25, epsilon = 1e-12);
        let density = r.original_curve(2).unwrap();
        assert_abs_diff_eq!(density.evaluate(60.0).unwrap(), 2.0);
        assert!(original.evaluate(151.0).is_err());
    }

    #[test]
    fn rejects_inconsistent_matrix() {
        let result = FitRecord::new(
            Utc::now(),
            100.0,
            String::new(),
            matrix(),
            vec![-0.5, 0.5],
            Bounds::unit(),
            50.0,
            150.0,
        );
        assert!(matches!(result, Err(DensFitError::Numerical { .. })));
    }

    #[test]
    fn rejects_degenerate_original_domain() {
        let result = FitRecord::new(
            Utc::now(),
            100.0,
            String::new(),
            matrix(),
            vec![0.0],
            Bounds::unit(),
            150.0,
            150.0,
        );
        assert!(matches!(result, Err(DensFitError::Numerical { .. })));
    }

    #[test]
    fn rejects_knot_on_or_outside_scaled_bounds() {
        for knot in [1.0, -1.0, 1.5] {
            let result = FitRecord::new(
                Utc::now(),
                100.0,
                String::new(),
                matrix(),
                vec![knot],
                Bounds::unit(),
                50.0,
                150.0,
            );
            assert!(
                matches!(result, Err(DensFitError::Numerical { .. })),
                "knot {knot} accepted"
            );
        }
    }

    #[test]
    fn from_json_rejects_knot_on_bound() {
        let json = record()
            .to_json()
            .unwrap()
            .replace("\"scaled_knots\":[0.0]", "\"scaled_knots\":[1.0]");
        assert!(json.contains("\"scaled_knots\":[1.0]"));
        assert!(matches!(
            FitRecord::from_json(&json),
            Err(DensFitError::Numerical { .. })
        ));
    }

    #[test]
    fn from_json_validates() {
        let json = record().to_json().unwrap().replace("\"original_max\":150.0", "\"original_max\":10.0");
        assert!(matches!(
            FitRecord::from_json(&json),
            Err(DensFitError::Numerical { .. })
        ));
        assert!(FitRecord::from_json("{not json").is_err());
    }
}
