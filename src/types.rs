//! Core value types shared by the fitter, the assembler and the pipeline.
//!
//! # Why no `Eq` or `Ord`?
//! These types wrap `f64`, which does not implement `Eq` or `Ord` because `NaN`
//! breaks total ordering. We derive `PartialEq` only.

use serde::{Deserialize, Serialize};

use crate::error::{self, DensFitError};

/// One (price-level, value) sample, e.g. an option strike and its mark price.
///
/// # Examples
/// ```
/// use densfit::types::Observation;
/// let obs = Observation::new(100_000.0, 0.042);
/// assert_eq!(obs.x, 100_000.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Price level.
    pub x: f64,
    /// Observed market value at `x`.
    pub y: f64,
}

impl Observation {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<(f64, f64)> for Observation {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Closed interval `[low, high]`.
///
/// Used both for the support of a fitted curve and for the working interval
/// the optimisation runs in. Construction does not validate ordering; the
/// operations that need `low < high` check it and report their own error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub low: f64,
    pub high: f64,
}

impl Bounds {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// The canonical working interval `[-1, 1]`.
    pub fn unit() -> Self {
        Self {
            low: -1.0,
            high: 1.0,
        }
    }

    /// Whether `x` lies in the closed interval.
    pub fn contains(&self, x: f64) -> bool {
        self.low <= x && x <= self.high
    }

    pub fn width(&self) -> f64 {
        self.high - self.low
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::unit()
    }
}

impl From<(f64, f64)> for Bounds {
    fn from((low, high): (f64, f64)) -> Self {
        Self { low, high }
    }
}

/// Which derivative of the piecewise polynomial an evaluator returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DerivativeOrder {
    /// f(x)
    Value,
    /// f'(x)
    First,
    /// f''(x)
    Second,
}

impl DerivativeOrder {
    /// Number of differentiations applied.
    pub fn order(self) -> usize {
        match self {
            Self::Value => 0,
            Self::First => 1,
            Self::Second => 2,
        }
    }
}

impl TryFrom<usize> for DerivativeOrder {
    type Error = DensFitError;

    fn try_from(order: usize) -> Result<Self, Self::Error> {
        match order {
            0 => Ok(Self::Value),
            1 => Ok(Self::First),
            2 => Ok(Self::Second),
            _ => Err(DensFitError::Configuration {
                message: format!("derivative order must be 0, 1 or 2, got {order}"),
            }),
        }
    }
}

/// Polynomial coefficients of a fitted spline, one column per segment.
///
/// The matrix has `degree + 1` rows and one column per segment. Column `i`
/// holds `[a₀, a₁, …, a_d]` of the segment polynomial `Σⱼ aⱼ · x^(d−j)`, highest
/// power first. Storage is column-major so a segment's coefficients are one
/// contiguous slice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CoefficientMatrixRaw", into = "CoefficientMatrixRaw")]
pub struct CoefficientMatrix {
    degree: usize,
    segments: usize,
    values: Vec<f64>,
}

#[derive(Serialize, Deserialize)]
struct CoefficientMatrixRaw {
    degree: usize,
    /// One inner vector per segment.
    columns: Vec<Vec<f64>>,
}

impl TryFrom<CoefficientMatrixRaw> for CoefficientMatrix {
    type Error = DensFitError;
    fn try_from(raw: CoefficientMatrixRaw) -> Result<Self, Self::Error> {
        Self::from_columns(raw.degree, raw.columns)
    }
}

impl From<CoefficientMatrix> for CoefficientMatrixRaw {
    fn from(m: CoefficientMatrix) -> Self {
        Self {
            degree: m.degree,
            columns: m.values.chunks(m.degree + 1).map(<[f64]>::to_vec).collect(),
        }
    }
}

impl CoefficientMatrix {
    /// Build from a column-major coefficient vector.
    ///
    /// # Errors
    /// Returns [`DensFitError::Numerical`] if the length does not equal
    /// `(degree + 1) * segments`, there are no segments, or a value is not finite.
    pub fn from_column_major(
        degree: usize,
        segments: usize,
        values: Vec<f64>,
    ) -> error::Result<Self> {
        if segments == 0 {
            return Err(DensFitError::Numerical {
                message: "coefficient matrix needs at least one segment".into(),
            });
        }
        if values.len() != (degree + 1) * segments {
            return Err(DensFitError::Numerical {
                message: format!(
                    "coefficient matrix of degree {degree} with {segments} segments needs {} values, got {}",
                    (degree + 1) * segments,
                    values.len()
                ),
            });
        }
        if let Some(v) = values.iter().find(|v| !v.is_finite()) {
            return Err(DensFitError::Numerical {
                message: format!("coefficients must be finite, got {v}"),
            });
        }
        Ok(Self {
            degree,
            segments,
            values,
        })
    }

    /// Build from per-segment columns, each `[a₀, …, a_d]`.
    ///
    /// # Errors
    /// Returns [`DensFitError::Numerical`] if a column has the wrong length or
    /// a value is not finite.
    pub fn from_columns(degree: usize, columns: Vec<Vec<f64>>) -> error::Result<Self> {
        let segments = columns.len();
        if let Some((i, col)) = columns
            .iter()
            .enumerate()
            .find(|(_, c)| c.len() != degree + 1)
        {
            return Err(DensFitError::Numerical {
                message: format!(
                    "column {i} has {} coefficients, expected {}",
                    col.len(),
                    degree + 1
                ),
            });
        }
        Self::from_column_major(degree, segments, columns.into_iter().flatten().collect())
    }

    /// Polynomial degree `d`.
    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Number of segments (`knots + 1`).
    pub fn segments(&self) -> usize {
        self.segments
    }

    /// `(rows, columns)` = `(degree + 1, segments)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.degree + 1, self.segments)
    }

    /// Coefficients of segment `segment`, highest power first.
    ///
    /// # Panics
    /// Panics if `segment >= self.segments()`.
    pub fn column(&self, segment: usize) -> &[f64] {
        let n = self.degree + 1;
        &self.values[segment * n..(segment + 1) * n]
    }

    /// Coefficient `a_{row, segment}`, or `None` out of range.
    pub fn get(&self, row: usize, segment: usize) -> Option<f64> {
        if row > self.degree || segment >= self.segments {
            return None;
        }
        Some(self.values[segment * (self.degree + 1) + row])
    }

    /// The column-major coefficient vector.
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_contains_is_closed() {
        let b = Bounds::new(-1.0, 1.0);
        assert!(b.contains(-1.0));
        assert!(b.contains(1.0));
        assert!(b.contains(0.3));
        assert!(!b.contains(1.0 + 1e-12));
        assert!(!b.contains(f64::NAN));
    }

    #[test]
    fn default_bounds_are_unit_interval() {
        assert_eq!(Bounds::default(), Bounds::new(-1.0, 1.0));
        assert_eq!(Bounds::unit().width(), 2.0);
    }

    #[test]
    fn derivative_order_rejects_three() {
        assert_eq!(DerivativeOrder::try_from(2).unwrap(), DerivativeOrder::Second);
        assert!(matches!(
            DerivativeOrder::try_from(3),
            Err(DensFitError::Configuration { .. })
        ));
    }

    #[test]
    fn matrix_columns_are_contiguous() {
        let m = CoefficientMatrix::from_columns(
            3,
            vec![vec![1.0, 2.0, 3.0, 4.0], vec![5.0, 6.0, 7.0, 8.0]],
        )
        .unwrap();
        assert_eq!(m.shape(), (4, 2));
        assert_eq!(m.column(1), &[5.0, 6.0, 7.0, 8.0]);
        assert_eq!(m.get(2, 0), Some(3.0));
        assert_eq!(m.get(4, 0), None);
        assert_eq!(m.get(0, 2), None);
    }

    #[test]
    fn matrix_rejects_ragged_columns() {
        let result = CoefficientMatrix::from_columns(3, vec![vec![1.0, 2.0, 3.0, 4.0], vec![1.0]]);
        assert!(matches!(result, Err(DensFitError::Numerical { .. })));
    }

    #[test]
    fn matrix_rejects_non_finite() {
        let result = CoefficientMatrix::from_column_major(1, 1, vec![1.0, f64::NAN]);
        assert!(matches!(result, Err(DensFitError::Numerical { .. })));
    }

    #[test]
    fn matrix_serde_roundtrip_validates() {
        let m = CoefficientMatrix::from_columns(3, vec![vec![0.0, 1.0, 0.0, 2.0]; 3]).unwrap();
        let json = serde_json::to_string(&m).unwrap();
        assert!(json.contains("columns"));
        let back: CoefficientMatrix = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);

        let bad = r#"{"degree":3,"columns":[[1.0,2.0]]}"#;
        assert!(serde_json::from_str::<CoefficientMatrix>(bad).is_err());
    }
}
