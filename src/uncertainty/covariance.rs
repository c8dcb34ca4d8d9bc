//! Covariance matrix estimation for fitted parameters.
//!
//! The covariance is estimated as `(JᵀJ)⁻¹ · χ²_red`, with the Jacobian taken
//! with respect to the external (bounded) parameter values, as lmfit does.

use crate::error::{RamanError, Result};
use crate::utils::matrix_convert::ndarray_to_nalgebra;
use ndarray::{Array1, Array2};

/// Calculate the covariance matrix from a Jacobian and the reduced chi-square.
///
/// # Errors
///
/// `SingularMatrix` when `JᵀJ` cannot be inverted, which happens when a
/// parameter has no influence on the residuals.
pub fn calculate_covariance(jacobian: &Array2<f64>, redchi: f64) -> Result<Array2<f64>> {
    let jtj = jacobian.t().dot(jacobian);
    let n = jtj.nrows();

    let inverse = ndarray_to_nalgebra(&jtj)
        .try_inverse()
        .ok_or(RamanError::SingularMatrix)?;

    let covar = Array2::from_shape_fn((n, n), |(i, j)| inverse[(i, j)] * redchi);
    if covar.iter().any(|v| !v.is_finite()) {
        return Err(RamanError::SingularMatrix);
    }
    Ok(covar)
}

/// Reduced chi-square `cost / (n_data - n_params)`; NaN without degrees of freedom.
pub fn reduced_chi_square(cost: f64, n_data: usize, n_params: usize) -> f64 {
    if n_data <= n_params {
        return f64::NAN;
    }
    cost / (n_data - n_params) as f64
}

/// Extract standard errors from the covariance matrix.
///
/// Standard errors are the square roots of the diagonal elements
/// of the covariance matrix.
pub fn standard_errors_from_covariance(covar: &Array2<f64>) -> Array1<f64> {
    covar
        .diag()
        .mapv(|v| if v > 0.0 { v.sqrt() } else { 0.0 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::arr2;

    #[test]
    fn test_calculate_covariance() {
        let jacobian = arr2(&[[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]);

        // JᵀJ = [[35, 44], [44, 56]], det = 24
        let covar = calculate_covariance(&jacobian, 2.0).unwrap();
        assert_relative_eq!(covar[[0, 0]], 56.0 / 24.0 * 2.0, epsilon = 1e-10);
        assert_relative_eq!(covar[[0, 1]], -44.0 / 24.0 * 2.0, epsilon = 1e-10);
        assert_relative_eq!(covar[[1, 1]], 35.0 / 24.0 * 2.0, epsilon = 1e-10);

        let errors = standard_errors_from_covariance(&covar);
        assert_relative_eq!(errors[0], (56.0 / 12.0_f64).sqrt(), epsilon = 1e-10);
    }

    #[test]
    fn test_singular_jacobian() {
        let jacobian = arr2(&[[1.0, 0.0], [2.0, 0.0], [3.0, 0.0]]);
        assert!(matches!(
            calculate_covariance(&jacobian, 1.0),
            Err(RamanError::SingularMatrix)
        ));
    }

    #[test]
    fn test_reduced_chi_square() {
        assert_relative_eq!(reduced_chi_square(10.0, 12, 2), 1.0);
        assert!(reduced_chi_square(1.0, 3, 3).is_nan());
    }
}
