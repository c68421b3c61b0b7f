//! Dense convex quadratic programming for constrained least squares.
//!
//! Solves
//!
//! ```text
//! minimise   ‖A c − y‖²
//! subject to E c = 0
//!            G c ≥ 0
//! ```
//!
//! with a Mehrotra predictor-corrector primal-dual interior-point method. The
//! inequalities are rewritten as `C c + s = 0` with `C = −G` and slacks
//! `s > 0`, duals `z > 0`. Each iteration factors the reduced KKT system
//!
//! ```text
//! ⎡ P + Cᵀ diag(z/s) C   Eᵀ ⎤ ⎡dc⎤   ⎡ −r_d + Cᵀ((r_sz − z∘r_i)/s) ⎤
//! ⎣ E                    0  ⎦ ⎣dy⎦ = ⎣ −r_e                        ⎦
//! ```
//!
//! once with LU and reuses it for the predictor and the corrector solve.
//!
//! Where an active inequality has a zero multiplier (no strict
//! complementarity), slack and dual both vanish like `√gap`, so the primal
//! solution is only accurate to about `√tolerance` while the objective stays
//! accurate to `tolerance`.
//!
//! `P = 2AᵀA` is only semidefinite when there are fewer observations than
//! free coefficients, so a ridge of `RIDGE · (1 + max diag P)` is added to it.

use nalgebra::{DMatrix, DVector};

/// Relative ridge added to the Hessian diagonal.
const RIDGE: f64 = 1e-10;

/// Fraction of the distance to the boundary taken per step.
const STEP_DAMPING: f64 = 0.99;

/// A least-squares objective with homogeneous linear constraints.
#[derive(Debug, Clone)]
pub(crate) struct QuadraticProgram {
    /// Design matrix `A`, one row per observation.
    pub design: DMatrix<f64>,
    /// Targets `y`.
    pub targets: DVector<f64>,
    /// Equality rows `E` (`E c = 0`).
    pub equalities: DMatrix<f64>,
    /// Inequality rows `G` (`G c ≥ 0`).
    pub inequalities: DMatrix<f64>,
}

/// How the interior-point iteration ended.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum QpOutcome {
    /// A primal solution was produced.
    ///
    /// `accurate` is `false` when the iteration limit was hit with residuals
    /// only within `sqrt(tolerance)`.
    Solved {
        solution: DVector<f64>,
        objective: f64,
        iterations: usize,
        accurate: bool,
    },
    /// Singular KKT system, non-finite iterate, or no acceptable point within
    /// the iteration limit.
    Failed { iterations: usize, reason: String },
}

struct Residuals {
    dual: DVector<f64>,
    equality: DVector<f64>,
    inequality: DVector<f64>,
    gap: f64,
    objective: f64,
}

impl Residuals {
    fn within(&self, tolerance: f64, q_norm: f64) -> bool {
        self.dual.amax() <= tolerance * (1.0 + q_norm)
            && self.equality.amax() <= tolerance
            && self.inequality.amax() <= tolerance
            && self.gap <= tolerance * (1.0 + self.objective)
    }
}

struct Direction {
    dx: DVector<f64>,
    dy: DVector<f64>,
    ds: DVector<f64>,
    dz: DVector<f64>,
}

/// Largest `α ∈ (0, 1]` keeping `v + α·dv ≥ 0`.
fn max_step(v: &DVector<f64>, dv: &DVector<f64>) -> f64 {
    v.iter()
        .zip(dv.iter())
        .filter(|&(_, &d)| d < 0.0)
        .fold(1.0_f64, |alpha, (&vi, &di)| alpha.min(-vi / di))
}

impl QuadraticProgram {
    fn variables(&self) -> usize {
        self.design.ncols()
    }

    /// Solve the program starting from the zero vector with unit slacks and duals.
    pub fn solve(&self, max_iterations: usize, tolerance: f64) -> QpOutcome {
        let n = self.variables();
        let me = self.equalities.nrows();
        let mi = self.inequalities.nrows();

        let mut p = self.design.tr_mul(&self.design) * 2.0;
        let max_diag = p.diagonal().iter().fold(0.0_f64, |m, &v| m.max(v));
        let ridge = RIDGE * (1.0 + max_diag);
        for i in 0..n {
            p[(i, i)] += ridge;
        }
        let q = self.design.tr_mul(&self.targets) * -2.0;
        let q_norm = q.amax();
        let c = -&self.inequalities;
        let e = &self.equalities;

        let mut x = DVector::<f64>::zeros(n);
        let mut y = DVector::<f64>::zeros(me);
        let mut s = DVector::<f64>::from_element(mi, 1.0);
        let mut z = DVector::<f64>::from_element(mi, 1.0);

        for iteration in 0..=max_iterations {
            let r = Residuals {
                dual: &p * &x + &q + e.tr_mul(&y) + c.tr_mul(&z),
                equality: e * &x,
                inequality: &c * &x + &s,
                gap: s.dot(&z),
                objective: (&self.design * &x - &self.targets).norm_squared(),
            };

            if !r.objective.is_finite() || !r.gap.is_finite() {
                return QpOutcome::Failed {
                    iterations: iteration,
                    reason: format!("non-finite iterate at iteration {iteration}"),
                };
            }
            if r.within(tolerance, q_norm) {
                return QpOutcome::Solved {
                    solution: x,
                    objective: r.objective,
                    iterations: iteration,
                    accurate: true,
                };
            }
            if iteration == max_iterations {
                return if r.within(tolerance.sqrt(), q_norm) {
                    QpOutcome::Solved {
                        solution: x,
                        objective: r.objective,
                        iterations: iteration,
                        accurate: false,
                    }
                } else {
                    QpOutcome::Failed {
                        iterations: iteration,
                        reason: format!(
                            "no convergence after {max_iterations} iterations (duality gap {:.3e})",
                            r.gap
                        ),
                    }
                };
            }

            let mu = if mi == 0 { 0.0 } else { r.gap / mi as f64 };
            let w = z.component_div(&s);
            let mut cw = c.clone();
            for (i, mut row) in cw.row_iter_mut().enumerate() {
                row *= w[i];
            }
            let h = &p + c.tr_mul(&cw);

            let mut kkt = DMatrix::<f64>::zeros(n + me, n + me);
            kkt.view_mut((0, 0), (n, n)).copy_from(&h);
            kkt.view_mut((0, n), (n, me)).copy_from(&e.transpose());
            kkt.view_mut((n, 0), (me, n)).copy_from(e);
            let lu = kkt.lu();

            let direction = |rsz: &DVector<f64>| -> Option<Direction> {
                let tmp = (rsz - z.component_mul(&r.inequality)).component_div(&s);
                let mut rhs = DVector::<f64>::zeros(n + me);
                rhs.rows_mut(0, n).copy_from(&(c.tr_mul(&tmp) - &r.dual));
                rhs.rows_mut(n, me).copy_from(&(-&r.equality));
                let sol = lu.solve(&rhs)?;
                if sol.iter().any(|v| !v.is_finite()) {
                    return None;
                }
                let dx = sol.rows(0, n).into_owned();
                let dy = sol.rows(n, me).into_owned();
                let ds = -&r.inequality - &c * &dx;
                let dz = (-rsz - z.component_mul(&ds)).component_div(&s);
                Some(Direction { dx, dy, ds, dz })
            };

            let singular = || QpOutcome::Failed {
                iterations: iteration,
                reason: format!("singular KKT system at iteration {iteration}"),
            };

            // Predictor: pure affine-scaling direction.
            let rsz_aff = s.component_mul(&z);
            let Some(aff) = direction(&rsz_aff) else {
                return singular();
            };
            let alpha_aff = max_step(&s, &aff.ds).min(max_step(&z, &aff.dz));
            let mu_aff = if mi == 0 {
                0.0
            } else {
                (&s + &aff.ds * alpha_aff).dot(&(&z + &aff.dz * alpha_aff)) / mi as f64
            };
            let sigma = if mu > 0.0 { (mu_aff / mu).powi(3) } else { 0.0 };

            // Corrector: second-order term and centring.
            let rsz = rsz_aff + aff.ds.component_mul(&aff.dz)
                - DVector::from_element(mi, sigma * mu);
            let Some(step) = direction(&rsz) else {
                return singular();
            };
            let alpha = (STEP_DAMPING * max_step(&s, &step.ds).min(max_step(&z, &step.dz))).min(1.0);

            #[cfg(feature = "logging")]
            tracing::trace!(iteration, mu, sigma, alpha, "interior point step");

            x += &step.dx * alpha;
            y += &step.dy * alpha;
            s += &step.ds * alpha;
            z += &step.dz * alpha;
        }

        // The loop always returns at `iteration == max_iterations`.
        QpOutcome::Failed {
            iterations: max_iterations,
            reason: "iteration loop exited unexpectedly".into(),
        }
    }
}
