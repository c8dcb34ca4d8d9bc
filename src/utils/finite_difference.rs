//! Finite difference methods for numerical differentiation.
//!
//! This module provides the forward-difference Jacobian used by the
//! Levenberg-Marquardt solver when a problem does not supply derivatives.

use crate::error::{RamanError, Result};
use crate::problem::Problem;
use ndarray::{Array1, Array2};

/// Default step size for finite differences.
pub const DEFAULT_EPSILON: f64 = 1e-8;

/// Compute the Jacobian matrix using forward finite differences.
///
/// The Jacobian is the matrix of partial derivatives of the residuals with
/// respect to the parameters: J[i,j] = ∂residual[i]/∂param[j]. The step for
/// each parameter scales with its magnitude.
///
/// # Arguments
///
/// * `problem` - The problem to evaluate
/// * `params` - The parameter values at which to evaluate the Jacobian
/// * `epsilon` - The relative step size (defaults to [`DEFAULT_EPSILON`])
pub fn jacobian(
    problem: &dyn Problem,
    params: &Array1<f64>,
    epsilon: Option<f64>,
) -> Result<Array2<f64>> {
    let residuals = problem.eval(params)?;
    jacobian_at(problem, params, &residuals, epsilon)
}

/// Forward-difference Jacobian reusing residuals already evaluated at `params`.
pub fn jacobian_at(
    problem: &dyn Problem,
    params: &Array1<f64>,
    residuals: &Array1<f64>,
    epsilon: Option<f64>,
) -> Result<Array2<f64>> {
    let eps = epsilon.unwrap_or(DEFAULT_EPSILON);
    let n_params = params.len();
    let n_residuals = problem.residual_count();

    if residuals.len() != n_residuals {
        return Err(RamanError::DimensionMismatch(format!(
            "Expected {} residuals, got {}",
            n_residuals,
            residuals.len()
        )));
    }

    let mut jac = Array2::zeros((n_residuals, n_params));

    for j in 0..n_params {
        let mut params_perturbed = params.clone();

        // Adapt epsilon to parameter scale
        let param_j = params[j];
        let eps_j = if param_j.abs() > 1.0 {
            param_j.abs() * eps
        } else {
            eps
        };

        params_perturbed[j] += eps_j;
        // Actual step after rounding
        let step = params_perturbed[j] - param_j;

        let residuals_perturbed = problem.eval(&params_perturbed)?;

        for i in 0..n_residuals {
            jac[[i, j]] = (residuals_perturbed[i] - residuals[i]) / step;
        }
    }

    Ok(jac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    struct Exponential {
        x: Array1<f64>,
    }

    impl Problem for Exponential {
        fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
            Ok(self.x.mapv(|x| params[0] * (params[1] * x).exp()))
        }

        fn parameter_count(&self) -> usize {
            2
        }

        fn residual_count(&self) -> usize {
            self.x.len()
        }
    }

    #[test]
    fn test_jacobian_matches_analytic() {
        let problem = Exponential {
            x: array![0.0, 0.5, 1.0, 1.5],
        };
        let params = array![2.0, -0.7];
        let jac = jacobian(&problem, &params, None).unwrap();

        for (i, &x) in problem.x.iter().enumerate() {
            let e = (params[1] * x).exp();
            assert_relative_eq!(jac[[i, 0]], e, epsilon = 1e-6);
            assert_relative_eq!(jac[[i, 1]], params[0] * x * e, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_residual_length_checked() {
        let problem = Exponential {
            x: array![0.0, 1.0],
        };
        let wrong = array![1.0];
        assert!(jacobian_at(&problem, &array![1.0, 1.0], &wrong, None).is_err());
    }
}
