//! Fit a market-implied density to a strip of call quotes.
//!
//! Shows how to:
//!   - Filter quotes by a price band and fit a shape-constrained spline
//!   - Evaluate the fitted price curve and its density in strike units
//!   - Query the probability of the underlying finishing in a range
//!   - Check the fitted shape and persist the fit as JSON
//!
//! Run with: `cargo run --example density_fit`

use chrono::Utc;
use densfit::Evaluator;
use densfit::density::{DensityBuilder, FitRecord};
use densfit::spline::ShapeCheck;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let underlying = 105_000.0;

    // Market data: call strikes and mark prices (in units of the underlying)
    let strikes: Vec<f64> = (0..27).map(|i| 80_000.0 + 2_500.0 * f64::from(i)).collect();
    let marks: Vec<f64> = strikes
        .iter()
        .map(|&k| {
            let moneyness = (k - underlying) / 15_000.0;
            0.08 * (1.0 + (-2.5 * moneyness).exp()).ln() / 2.5
        })
        .collect();

    // ---------------------------------------------------------------
    // 1. Fit
    // ---------------------------------------------------------------

    let fit = DensityBuilder::new()
        .observations(&strikes, &marks)
        .value_band(0.0005, 0.1)
        .knots(&[
            underlying - 10_000.0,
            underlying - 5_000.0,
            underlying,
            underlying + 5_000.0,
            underlying + 10_000.0,
        ])
        .pivot(underlying)
        .degree(4)
        .sampling_step(0.01)
        .build()?;

    let bounds = fit.original_bounds();
    println!(
        "Fitted {} quotes on [{:.0}, {:.0}]: status {}, objective {:.3e}\n",
        fit.observations_used(),
        bounds.low,
        bounds.high,
        fit.status(),
        fit.outcome().objective
    );

    // ---------------------------------------------------------------
    // 2. Curve and density
    // ---------------------------------------------------------------

    let price = fit.curve(0)?;
    let density = fit.curve(2)?;

    println!("{:>10} {:>12} {:>12}", "Strike", "Price", "Density");
    println!("{}", "-".repeat(36));
    let mut strike = bounds.low;
    while strike <= bounds.high {
        println!(
            "{strike:>10.0} {:>12.6} {:>12.6}",
            price.evaluate(strike)?,
            density.evaluate(strike)?
        );
        strike += 5_000.0;
    }

    // ---------------------------------------------------------------
    // 3. Probabilities
    // ---------------------------------------------------------------

    println!();
    for (a, b) in [
        (bounds.low, underlying),
        (underlying, bounds.high),
        (100_000.0, 110_000.0),
    ] {
        println!("P({a:.0} < X < {b:.0}) = {:.4}", fit.probability(a, b)?);
    }

    // ---------------------------------------------------------------
    // 4. Shape check and persistence
    // ---------------------------------------------------------------

    let report = fit.shape_report(&ShapeCheck::default())?;
    println!("\nShape valid: {}", report.is_valid);
    if let Some(worst) = report.worst_violation() {
        println!("Worst violation: {worst:?}");
    }

    let json = fit.record(Utc::now(), "BTC-DEMO")?.to_json()?;
    let restored = FitRecord::from_json(&json)?;
    println!(
        "Record round trip: {} bytes, f({underlying:.0}) = {:.6}",
        json.len(),
        restored.original_curve(0)?.evaluate(underlying)?
    );

    Ok(())
}
