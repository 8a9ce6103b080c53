// Forward-difference Jacobian + Newton step solve
// -----------------------------------------------

use nalgebra::{DMatrix, DVector};

/// Default relative step for the forward difference.
pub const DEFAULT_JAC_H: f64 = 1e-5;

/// Singular values below this (relative to the largest) are dropped by the
/// least-squares fallback.
const LSTSQ_RCOND: f64 = 1e-12;

/// Column j = (f(x + d_j e_j) - f(x)) / d_j with d_j = max(|x_j|, 1) * h.
///
/// `fx` must be `f(x)`; callers already have it from the residual evaluation,
/// so this costs exactly N evaluations of `f`.
pub fn forward_difference<F, E>(
    f: F,
    x: &DVector<f64>,
    fx: &DVector<f64>,
    h: f64,
) -> Result<DMatrix<f64>, E>
where
    F: Fn(&DVector<f64>) -> Result<DVector<f64>, E>,
{
    let n = x.len();
    let m = fx.len();
    let mut jac = DMatrix::<f64>::zeros(m, n);
    for j in 0..n {
        let step = x[j].abs().max(1.0) * h;
        let mut xh = x.clone();
        xh[j] += step;
        let fxh = f(&xh)?;
        jac.set_column(j, &((fxh - fx) / step));
    }
    Ok(jac)
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewtonStep {
    pub delta: DVector<f64>,
    pub least_squares: bool,
}

/// Solve `J * delta = -residual`. LU first; a singular or numerically
/// useless LU result drops to an SVD least-squares solve.
///
/// Non-finite input yields a NaN step rather than reaching the SVD, which
/// cannot factor it.
pub fn solve_step(jac: &DMatrix<f64>, residual: &DVector<f64>) -> NewtonStep {
    if !(all_finite(jac.iter()) && all_finite(residual.iter())) {
        return NewtonStep { delta: DVector::from_element(jac.ncols(), f64::NAN), least_squares: true };
    }
    let rhs = -residual;

    if jac.is_square() {
        if let Some(delta) = jac.clone().lu().solve(&rhs) {
            if delta.iter().all(|v| v.is_finite()) {
                return NewtonStep { delta, least_squares: false };
            }
        }
    }

    log::debug!("Jacobian singular or ill-conditioned, using least-squares step");
    let delta = match jac.clone().try_svd(true, true, f64::EPSILON, 0) {
        Some(svd) => {
            let eps = svd.singular_values.max() * LSTSQ_RCOND;
            svd.solve(&rhs, eps).unwrap_or_else(|_| DVector::zeros(jac.ncols()))
        }
        None => DVector::from_element(jac.ncols(), f64::NAN),
    };
    NewtonStep { delta, least_squares: true }
}

pub fn all_finite<'a>(mut values: impl Iterator<Item = &'a f64>) -> bool {
    values.all(|v| v.is_finite())
}
