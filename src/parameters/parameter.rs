//! Parameter definition and implementation
//!
//! A [`Parameter`] is a named fit quantity with an initial value and bounds,
//! the Rust counterpart of one row of a parameter definition file.

use crate::parameters::bounds::{Bounds, BoundsError, BoundsTransform};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when working with parameters
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParameterError {
    #[error("Bounds error for parameter '{name}': {source}")]
    Bounds { name: String, source: BoundsError },

    #[error("Parameter '{name}' not found")]
    ParameterNotFound { name: String },

    #[error("Parameter '{name}' is defined more than once")]
    DuplicateParameter { name: String },

    #[error("Parameter '{name}' has a non-finite value")]
    NonFiniteValue { name: String },
}

/// A parameter for peak fitting
///
/// Parameters carry bounds constraints which the solver honours through
/// [`BoundsTransform`]. This is similar to lmfit-py's Parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Name of the parameter
    name: String,

    /// Current value of the parameter
    value: f64,

    /// Initial value when created (for reset operations)
    #[serde(default)]
    init_value: Option<f64>,

    /// Minimum and maximum bounds for the parameter value
    #[serde(default)]
    bounds: Bounds,

    /// Standard error of the parameter (set after fitting)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    stderr: Option<f64>,
}

impl Parameter {
    /// Create a new unbounded parameter with the given name and value
    ///
    /// # Examples
    ///
    /// ```
    /// use raman_conversion::parameters::Parameter;
    ///
    /// let param = Parameter::new("p1_center", 1630.0);
    /// assert_eq!(param.name(), "p1_center");
    /// assert_eq!(param.value(), 1630.0);
    /// ```
    pub fn new(name: &str, value: f64) -> Self {
        Self {
            name: name.to_string(),
            value,
            init_value: Some(value),
            bounds: Bounds::default(),
            stderr: None,
        }
    }

    /// Create a new parameter with the given name, value, and bounds
    ///
    /// The value is clamped into the bounds.
    ///
    /// # Examples
    ///
    /// ```
    /// use raman_conversion::parameters::Parameter;
    ///
    /// let param = Parameter::with_bounds("p1_amplitude", -3.0, 0.0, f64::INFINITY).unwrap();
    /// assert_eq!(param.value(), 0.0);
    /// assert_eq!(param.min(), 0.0);
    /// ```
    pub fn with_bounds(name: &str, value: f64, min: f64, max: f64) -> Result<Self, ParameterError> {
        let bounds = Bounds::new(min, max).map_err(|source| ParameterError::Bounds {
            name: name.to_string(),
            source,
        })?;

        let value = bounds.clamp(value);

        Ok(Self {
            name: name.to_string(),
            value,
            init_value: Some(value),
            bounds,
            stderr: None,
        })
    }

    /// Get the name of the parameter
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn rename(&mut self, name: &str) {
        self.name = name.to_string();
    }

    /// Get the current value of the parameter
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Set the value of the parameter
    ///
    /// # Errors
    ///
    /// Returns an error if the value is outside bounds
    pub fn set_value(&mut self, value: f64) -> Result<(), ParameterError> {
        if !value.is_finite() {
            return Err(ParameterError::NonFiniteValue {
                name: self.name.clone(),
            });
        }

        if !self.bounds.is_within_bounds(value) {
            return Err(ParameterError::Bounds {
                name: self.name.clone(),
                source: BoundsError::ValueOutsideBounds {
                    value,
                    min: self.bounds.min,
                    max: self.bounds.max,
                },
            });
        }

        self.value = value;
        Ok(())
    }

    /// Get the initial value of the parameter
    pub fn init_value(&self) -> f64 {
        self.init_value.unwrap_or(self.value)
    }

    /// Reset the parameter to its initial value
    pub fn reset(&mut self) {
        self.value = self.bounds.clamp(self.init_value());
    }

    /// Get the minimum allowed value for the parameter
    pub fn min(&self) -> f64 {
        self.bounds.min
    }

    /// Get the maximum allowed value for the parameter
    pub fn max(&self) -> f64 {
        self.bounds.max
    }

    /// Get the bounds of the parameter
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Get the standard error of the parameter (if available)
    pub fn stderr(&self) -> Option<f64> {
        self.stderr
    }

    /// Set the standard error of the parameter
    pub fn set_stderr(&mut self, stderr: Option<f64>) {
        self.stderr = stderr;
    }

    /// Get the bounds transformation for this parameter
    pub fn transform(&self) -> BoundsTransform {
        BoundsTransform::new(self.bounds)
    }

    /// Value of this parameter in the solver's unconstrained space
    pub fn internal_value(&self) -> Result<f64, ParameterError> {
        self.transform()
            .to_internal(self.value)
            .map_err(|source| ParameterError::Bounds {
                name: self.name.clone(),
                source,
            })
    }

    /// Set the value from the solver's unconstrained space
    pub fn set_from_internal(&mut self, internal: f64) {
        self.value = self.transform().to_external(internal);
    }
}
