//! Implementation of the Levenberg-Marquardt algorithm.
//!
//! This module contains the core implementation of the Levenberg-Marquardt
//! algorithm for nonlinear least-squares optimization.

use nalgebra::DMatrix;
use ndarray::{Array1, Array2};
use std::fmt;

use crate::error::{RamanError, Result};
use crate::problem::Problem;
use crate::utils::finite_difference;
use crate::utils::matrix_convert::{
    nalgebra_vec_to_ndarray, ndarray_to_nalgebra, ndarray_vec_to_nalgebra,
};

use super::config::LmConfig;
use super::convergence::ConvergenceStatus;

/// Smallest diagonal scale used for Marquardt damping.
const MIN_DIAGONAL: f64 = 1e-12;

/// Result of the Levenberg-Marquardt optimization.
#[derive(Debug, Clone)]
pub struct LmResult {
    /// Optimized parameter values
    pub params: Array1<f64>,

    /// Residuals at the solution
    pub residuals: Array1<f64>,

    /// Sum of squared residuals
    pub cost: f64,

    /// Number of accepted iterations
    pub iterations: usize,

    /// Number of function evaluations
    pub func_evals: usize,

    /// Why the iteration stopped
    pub status: ConvergenceStatus,
}

impl LmResult {
    /// Whether the optimization converged.
    pub fn success(&self) -> bool {
        self.status.is_converged()
    }

    /// A message describing the result
    pub fn message(&self) -> &'static str {
        self.status.description()
    }
}

impl fmt::Display for LmResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Optimization Result:")?;
        writeln!(f, "  Success: {}", self.success())?;
        writeln!(f, "  Message: {}", self.message())?;
        writeln!(f, "  Cost: {:.6e}", self.cost)?;
        writeln!(f, "  Iterations: {}", self.iterations)?;
        writeln!(f, "  Function evaluations: {}", self.func_evals)?;
        writeln!(f, "  Parameters: {:?}", self.params)?;
        Ok(())
    }
}

/// The Levenberg-Marquardt optimizer.
#[derive(Debug, Clone, Default)]
pub struct LevenbergMarquardt {
    /// Configuration options
    config: LmConfig,
}

impl LevenbergMarquardt {
    /// Create a new Levenberg-Marquardt optimizer with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new Levenberg-Marquardt optimizer with the given configuration.
    pub fn with_config(config: LmConfig) -> Self {
        Self { config }
    }

    /// The configuration in use.
    pub fn config(&self) -> &LmConfig {
        &self.config
    }

    /// Set the maximum number of iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    /// Set the tolerance for change in the sum of squares.
    pub fn with_ftol(mut self, ftol: f64) -> Self {
        self.config.ftol = ftol;
        self
    }

    /// Set the tolerance for change in parameter values.
    pub fn with_xtol(mut self, xtol: f64) -> Self {
        self.config.xtol = xtol;
        self
    }

    /// Set the tolerance for gradient norm.
    pub fn with_gtol(mut self, gtol: f64) -> Self {
        self.config.gtol = gtol;
        self
    }

    /// Set the initial value for the damping parameter.
    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.config.initial_lambda = lambda;
        self
    }

    /// Minimize the sum of squared residuals for the given problem.
    ///
    /// Each iteration solves the damped normal equations
    /// `(JᵀJ + λ·diag(JᵀJ)) δ = −Jᵀr`. A step that lowers the cost is accepted
    /// and λ shrinks; otherwise λ grows and the step is recomputed.
    ///
    /// Running out of iterations or damping is not an `Err`: the returned
    /// [`LmResult`] carries the best parameters so far and a non-converged
    /// status. `Err` is reserved for problems that cannot be evaluated at all.
    pub fn minimize<P: Problem>(&self, problem: &P, initial_params: Array1<f64>) -> Result<LmResult> {
        let n_params = problem.parameter_count();
        if initial_params.len() != n_params {
            return Err(RamanError::DimensionMismatch(format!(
                "Expected {} parameters, got {}",
                n_params,
                initial_params.len()
            )));
        }

        let mut params = initial_params;
        let mut residuals = problem.eval(&params)?;
        let mut func_evals = 1;
        let mut cost = sum_of_squares(&residuals);
        let mut lambda = self.config.initial_lambda;
        let mut iterations = 0;

        let finish = |params: Array1<f64>,
                      residuals: Array1<f64>,
                      cost: f64,
                      iterations: usize,
                      func_evals: usize,
                      status: ConvergenceStatus| LmResult {
            params,
            residuals,
            cost,
            iterations,
            func_evals,
            status,
        };

        if !cost.is_finite() {
            return Ok(finish(
                params,
                residuals,
                cost,
                iterations,
                func_evals,
                ConvergenceStatus::NumericalError,
            ));
        }

        loop {
            if cost == 0.0 {
                return Ok(finish(params, residuals, cost, iterations, func_evals, ConvergenceStatus::ExactFit));
            }
            if iterations >= self.config.max_iterations {
                return Ok(finish(
                    params,
                    residuals,
                    cost,
                    iterations,
                    func_evals,
                    ConvergenceStatus::MaxIterationsReached,
                ));
            }

            let jacobian = self.jacobian(problem, &params, &residuals)?;
            if !problem.has_custom_jacobian() {
                func_evals += n_params;
            }
            let jtj = jacobian.t().dot(&jacobian);
            let gradient = jacobian.t().dot(&residuals);

            let gradient_norm = gradient.iter().fold(0.0_f64, |m, g| m.max(g.abs()));
            if gradient_norm < self.config.gtol {
                return Ok(finish(
                    params,
                    residuals,
                    cost,
                    iterations,
                    func_evals,
                    ConvergenceStatus::GradientConvergence,
                ));
            }

            // Inner loop: raise damping until a step lowers the cost
            loop {
                let step = match solve_damped(&jtj, &gradient, lambda) {
                    Some(step) => step,
                    None => {
                        lambda *= self.config.lambda_up_factor;
                        if lambda > self.config.max_lambda {
                            return Ok(finish(
                                params,
                                residuals,
                                cost,
                                iterations,
                                func_evals,
                                ConvergenceStatus::LambdaOverflow,
                            ));
                        }
                        continue;
                    }
                };

                let step_norm = norm(&step);
                let param_norm = norm(&params);
                let small_step = step_norm <= self.config.xtol * (param_norm + self.config.xtol);

                // Reduction predicted by the linearised model
                let linearised = &residuals + &jacobian.dot(&step);
                let predicted = (cost - sum_of_squares(&linearised)) / cost;

                let new_params = &params + &step;
                let new_residuals = problem.eval(&new_params)?;
                func_evals += 1;
                let new_cost = sum_of_squares(&new_residuals);

                if new_cost.is_finite() && new_cost < cost {
                    let actual = (cost - new_cost) / cost;

                    params = new_params;
                    residuals = new_residuals;
                    cost = new_cost;
                    iterations += 1;
                    lambda = (lambda * self.config.lambda_down_factor).max(self.config.min_lambda);

                    if small_step {
                        return Ok(finish(
                            params,
                            residuals,
                            cost,
                            iterations,
                            func_evals,
                            ConvergenceStatus::ParameterConvergence,
                        ));
                    }
                    if actual <= self.config.ftol && predicted <= self.config.ftol {
                        return Ok(finish(
                            params,
                            residuals,
                            cost,
                            iterations,
                            func_evals,
                            ConvergenceStatus::FunctionValueConvergence,
                        ));
                    }
                    break;
                }

                // Step rejected. At a minimum the model predicts no further
                // progress, so stop instead of inflating lambda forever.
                if predicted.abs() <= self.config.ftol {
                    return Ok(finish(
                        params,
                        residuals,
                        cost,
                        iterations,
                        func_evals,
                        ConvergenceStatus::FunctionValueConvergence,
                    ));
                }
                if small_step {
                    return Ok(finish(
                        params,
                        residuals,
                        cost,
                        iterations,
                        func_evals,
                        ConvergenceStatus::ParameterConvergence,
                    ));
                }

                lambda *= self.config.lambda_up_factor;
                if lambda > self.config.max_lambda {
                    return Ok(finish(
                        params,
                        residuals,
                        cost,
                        iterations,
                        func_evals,
                        ConvergenceStatus::LambdaOverflow,
                    ));
                }
            }
        }
    }

    fn jacobian<P: Problem>(
        &self,
        problem: &P,
        params: &Array1<f64>,
        residuals: &Array1<f64>,
    ) -> Result<Array2<f64>> {
        if problem.has_custom_jacobian() {
            problem.jacobian(params)
        } else {
            finite_difference::jacobian_at(problem, params, residuals, Some(self.config.epsilon))
        }
    }
}

/// Solve `(JᵀJ + λ·D) δ = −g` with `D = diag(JᵀJ)` floored at [`MIN_DIAGONAL`].
///
/// Cholesky is tried first; LU is the fallback for numerically indefinite
/// systems. `None` means the system could not be solved at this damping.
fn solve_damped(jtj: &Array2<f64>, gradient: &Array1<f64>, lambda: f64) -> Option<Array1<f64>> {
    let mut a: DMatrix<f64> = ndarray_to_nalgebra(jtj);
    for i in 0..a.nrows() {
        a[(i, i)] += lambda * jtj[[i, i]].max(MIN_DIAGONAL);
    }
    let rhs = -ndarray_vec_to_nalgebra(gradient);

    let solution = match a.clone().cholesky() {
        Some(cholesky) => cholesky.solve(&rhs),
        None => a.lu().solve(&rhs)?,
    };

    if solution.iter().all(|v| v.is_finite()) {
        Some(nalgebra_vec_to_ndarray(&solution))
    } else {
        None
    }
}

fn sum_of_squares(values: &Array1<f64>) -> f64 {
    values.iter().map(|v| v * v).sum()
}

fn norm(values: &Array1<f64>) -> f64 {
    sum_of_squares(values).sqrt()
}
