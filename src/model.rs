//! Adapter from a peak model and its data to a least-squares [`Problem`].
//!
//! The solver works on unconstrained internal values. Each evaluation maps
//! them through the template's bounds transforms, so the model only ever sees
//! parameter values inside their bounds.

use crate::error::Result;
use crate::models::{FitParameters, PeakModel};
use crate::problem::Problem;
use crate::utils::finite_difference;
use ndarray::{Array1, Array2, ArrayView1};

/// A bounded peak-fitting problem over one spectrum region.
pub struct ModelProblem<'a> {
    /// Template providing the model and the bounds
    template: &'a FitParameters,
    /// The x data for the fit
    x_data: ArrayView1<'a, f64>,
    /// The y data for the fit
    y_data: ArrayView1<'a, f64>,
}

impl<'a> ModelProblem<'a> {
    /// Create a new ModelProblem
    ///
    /// # Arguments
    ///
    /// * `template` - The validated parameter template
    /// * `x_data` - The independent variable values
    /// * `y_data` - The observed values, same length as `x_data`
    pub fn new(template: &'a FitParameters, x_data: ArrayView1<'a, f64>, y_data: ArrayView1<'a, f64>) -> Self {
        Self {
            template,
            x_data,
            y_data,
        }
    }

    /// Starting point in internal space.
    pub fn initial_internal(&self) -> Result<Array1<f64>> {
        self.template.parameters().internal_values()
    }

    /// External (bounded) values for an internal vector.
    pub fn external(&self, internal: &Array1<f64>) -> Result<Array1<f64>> {
        self.template.parameters().external_from_internal(internal)
    }

    /// Get the number of data points
    pub fn ndata(&self) -> usize {
        self.x_data.len()
    }

    /// Jacobian of the residuals with respect to the external values.
    ///
    /// Used for parameter standard errors, which are reported in external
    /// units.
    pub fn external_jacobian(&self, values: &Array1<f64>) -> Result<Array2<f64>> {
        let external = ExternalProblem {
            model: self.template.model(),
            x_data: self.x_data,
            y_data: self.y_data,
        };
        finite_difference::jacobian(&external, values, None)
    }
}

/// Residuals as a function of the bounded values themselves.
struct ExternalProblem<'a> {
    model: PeakModel,
    x_data: ArrayView1<'a, f64>,
    y_data: ArrayView1<'a, f64>,
}

impl Problem for ExternalProblem<'_> {
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        self.model.residuals(params.view(), self.x_data, self.y_data)
    }

    fn parameter_count(&self) -> usize {
        self.model.parameter_count()
    }

    fn residual_count(&self) -> usize {
        self.x_data.len()
    }
}

impl Problem for ModelProblem<'_> {
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        let values = self.external(params)?;
        self.template
            .model()
            .residuals(values.view(), self.x_data, self.y_data)
    }

    fn parameter_count(&self) -> usize {
        self.template.parameters().len()
    }

    fn residual_count(&self) -> usize {
        self.x_data.len()
    }
}
