//! Market-implied densities from option quotes.
//!
//! [`DensityBuilder`] runs the full pipeline: value-band filtering, rescaling
//! to the working interval, the constrained fit, and original-unit evaluators.
//! [`FitRecord`] is the persisted snapshot of a finished fit.

pub mod builder;
pub mod record;

pub use builder::{DensityBuilder, DensityFit};
pub use record::FitRecord;
