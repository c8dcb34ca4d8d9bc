//! Validated parameter templates.

use crate::error::{RamanError, Result};
use crate::models::peak::PeakModel;
use crate::parameters::Parameters;
use ndarray::Array1;
use std::path::Path;

/// Initial parameters for one peak model, checked against its key set.
///
/// The parameters are stored in the model's order so that
/// [`Parameters::values`] lines up with [`PeakModel::evaluate`]. A template is
/// shared read-only by every fit of a batch; fits work on clones.
#[derive(Debug, Clone, PartialEq)]
pub struct FitParameters {
    model: PeakModel,
    parameters: Parameters,
}

impl FitParameters {
    /// Validate `parameters` against `model`.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` when a key is missing or unexpected, or when an
    /// amplitude or width lacks a finite, non-negative lower bound.
    pub fn new(model: PeakModel, parameters: Parameters) -> Result<Self> {
        let expected = model.parameter_names();

        let unexpected: Vec<&str> = parameters
            .names()
            .into_iter()
            .filter(|name| !expected.contains(name))
            .collect();
        if !unexpected.is_empty() {
            return Err(RamanError::InvalidParameter(format!(
                "unexpected parameters for the {} model: {}",
                model,
                unexpected.join(", ")
            )));
        }

        let mut ordered = Parameters::new();
        for name in expected {
            let param = parameters.get(name).ok_or_else(|| {
                RamanError::InvalidParameter(format!(
                    "the {} model requires parameter '{}'",
                    model, name
                ))
            })?;

            if PeakModel::is_non_negative(name) && !(param.min().is_finite() && param.min() >= 0.0) {
                return Err(RamanError::InvalidParameter(format!(
                    "parameter '{}' needs a finite lower bound >= 0, got {}",
                    name,
                    param.min()
                )));
            }

            ordered.add(param.clone())?;
        }

        Ok(Self {
            model,
            parameters: ordered,
        })
    }

    /// Load and validate a parameter definition CSV file.
    pub fn from_csv_file<P: AsRef<Path>>(model: PeakModel, path: P) -> Result<Self> {
        Self::new(model, Parameters::from_csv_file(path)?)
    }

    /// The model this template belongs to.
    pub fn model(&self) -> PeakModel {
        self.model
    }

    /// The parameters in model order.
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Initial values in model order.
    pub fn values(&self) -> Array1<f64> {
        self.parameters.values()
    }

    /// The same parameters validated for another model with the same key set.
    ///
    /// Used to fit one single-peak template with both lineshapes.
    pub fn for_model(&self, model: PeakModel) -> Result<Self> {
        Self::new(model, self.parameters.clone())
    }
}
