//! Monomial basis rows and closed-form polynomial derivatives.
//!
//! Coefficients are ordered highest power first: `[a₀, …, a_d]` is
//! `Σⱼ aⱼ · x^(d−j)`. The k-th derivative of `x^p` is the falling factorial
//! `p·(p−1)·…·(p−k+1) · x^(p−k)`, and zero when `k > p`.

/// Falling factorial `p·(p−1)·…·(p−k+1)`; `1` when `k == 0`, `0` when `k > p`.
fn falling_factorial(p: usize, k: usize) -> f64 {
    if k > p {
        return 0.0;
    }
    ((p - k + 1)..=p).fold(1.0, |acc, t| acc * t as f64)
}

/// Weights `w` such that `Σⱼ wⱼ · aⱼ` is the `order`-th derivative at `x` of the
/// degree-`degree` polynomial with coefficients `a`.
///
/// This is one row of a constraint or design matrix.
pub fn derivative_weights(x: f64, degree: usize, order: usize) -> Vec<f64> {
    (0..=degree)
        .map(|j| {
            let p = degree - j;
            if order > p {
                0.0
            } else {
                falling_factorial(p, order) * x.powi((p - order) as i32)
            }
        })
        .collect()
}

/// `order`-th derivative at `x` of the polynomial with coefficients `coeffs`.
///
/// Evaluated with Horner's scheme on the differentiated coefficients, so no
/// large powers are formed.
pub fn evaluate_polynomial(coeffs: &[f64], x: f64, order: usize) -> f64 {
    let Some(degree) = coeffs.len().checked_sub(1) else {
        return 0.0;
    };
    if order > degree {
        return 0.0;
    }
    coeffs[..=degree - order]
        .iter()
        .enumerate()
        .fold(0.0, |acc, (j, &a)| {
            acc * x + a * falling_factorial(degree - j, order)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    // 2x⁴ − x³ + 3x² + 0.5x − 7
    const QUARTIC: [f64; 5] = [2.0, -1.0, 3.0, 0.5, -7.0];

    #[test]
    fn falling_factorial_values() {
        assert_eq!(falling_factorial(4, 0), 1.0);
        assert_eq!(falling_factorial(4, 2), 12.0);
        assert_eq!(falling_factorial(3, 3), 6.0);
        assert_eq!(falling_factorial(2, 3), 0.0);
    }

    #[test]
    fn weights_for_value_are_powers() {
        let w = derivative_weights(2.0, 3, 0);
        assert_eq!(w, vec![8.0, 4.0, 2.0, 1.0]);
    }

    #[test]
    fn weights_for_second_derivative() {
        // d²/dx² of [x⁴, x³, x², x, 1] at x = 2 is [12x², 6x, 2, 0, 0]
        let w = derivative_weights(2.0, 4, 2);
        assert_eq!(w, vec![48.0, 12.0, 2.0, 0.0, 0.0]);
    }

    #[test]
    fn weights_dot_coefficients_match_horner() {
        for order in 0..=4 {
            for x in [-1.3, 0.0, 0.4, 2.0] {
                let w = derivative_weights(x, 4, order);
                let dot: f64 = w.iter().zip(QUARTIC).map(|(w, a)| w * a).sum();
                assert_abs_diff_eq!(dot, evaluate_polynomial(&QUARTIC, x, order), epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn evaluate_quartic_and_derivatives() {
        let x = 1.5_f64;
        let f = 2.0 * x.powi(4) - x.powi(3) + 3.0 * x * x + 0.5 * x - 7.0;
        let f1 = 8.0 * x.powi(3) - 3.0 * x * x + 6.0 * x + 0.5;
        let f2 = 24.0 * x * x - 6.0 * x + 6.0;
        let f3 = 48.0 * x - 6.0;
        assert_abs_diff_eq!(evaluate_polynomial(&QUARTIC, x, 0), f, epsilon = 1e-12);
        assert_abs_diff_eq!(evaluate_polynomial(&QUARTIC, x, 1), f1, epsilon = 1e-12);
        assert_abs_diff_eq!(evaluate_polynomial(&QUARTIC, x, 2), f2, epsilon = 1e-12);
        assert_abs_diff_eq!(evaluate_polynomial(&QUARTIC, x, 3), f3, epsilon = 1e-12);
        assert_abs_diff_eq!(evaluate_polynomial(&QUARTIC, x, 4), 48.0, epsilon = 1e-12);
        assert_eq!(evaluate_polynomial(&QUARTIC, x, 5), 0.0);
    }

    #[test]
    fn empty_polynomial_is_zero() {
        assert_eq!(evaluate_polynomial(&[], 3.0, 0), 0.0);
    }
}
