//! Parameter bounds implementation
//!
//! This module provides functionality for defining and managing parameter bounds
//! similar to lmfit-py. It implements the Minuit-style parameter transformation
//! that lets an unconstrained Levenberg-Marquardt solver honour bounds such as
//! the non-negative amplitude and width of a peak.

use serde::{Deserialize, Serialize};
use std::f64::{INFINITY, NEG_INFINITY};
use thiserror::Error;

/// Errors that can occur when working with parameter bounds
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BoundsError {
    #[error("Invalid bounds: min ({min}) must be less than or equal to max ({max})")]
    InvalidBounds { min: f64, max: f64 },

    #[error("Parameter value {value} is outside bounds: [{min}, {max}]")]
    ValueOutsideBounds { value: f64, min: f64, max: f64 },

    #[error("Infinite parameter value is not allowed")]
    InfiniteValue,
}

/// Represents the bounds constraints on a parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Minimum allowed value for the parameter
    pub min: f64,

    /// Maximum allowed value for the parameter
    pub max: f64,
}

impl Serialize for Bounds {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("Bounds", 2)?;

        // Infinite bounds are written as null
        if self.min.is_infinite() && self.min.is_sign_negative() {
            state.serialize_field("min", &Option::<f64>::None)?;
        } else {
            state.serialize_field("min", &Some(self.min))?;
        }

        if self.max.is_infinite() && self.max.is_sign_positive() {
            state.serialize_field("max", &Option::<f64>::None)?;
        } else {
            state.serialize_field("max", &Some(self.max))?;
        }

        state.end()
    }
}

impl<'de> Deserialize<'de> for Bounds {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct BoundsHelper {
            #[serde(default)]
            min: Option<f64>,

            #[serde(default)]
            max: Option<f64>,
        }

        let helper = BoundsHelper::deserialize(deserializer)?;

        let min = helper.min.unwrap_or(NEG_INFINITY);
        let max = helper.max.unwrap_or(INFINITY);

        Bounds::new(min, max).map_err(serde::de::Error::custom)
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            min: NEG_INFINITY,
            max: INFINITY,
        }
    }
}

impl Bounds {
    /// Create a new bounds constraint with min and max values
    ///
    /// # Examples
    ///
    /// ```
    /// use raman_conversion::parameters::Bounds;
    ///
    /// let bounds = Bounds::new(0.0, 10.0).unwrap();
    /// assert_eq!(bounds.min, 0.0);
    /// assert_eq!(bounds.max, 10.0);
    /// assert!(Bounds::new(1.0, 0.0).is_err());
    /// ```
    pub fn new(min: f64, max: f64) -> Result<Self, BoundsError> {
        if min.is_nan() || max.is_nan() || min > max {
            return Err(BoundsError::InvalidBounds { min, max });
        }

        Ok(Self { min, max })
    }

    /// Create an unbounded constraint (negative infinity to positive infinity)
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Create a bounds constraint with only a minimum value
    pub fn min_only(min: f64) -> Self {
        Self { min, max: INFINITY }
    }

    /// Create a bounds constraint from an optional lower and upper limit, as
    /// found in parameter definition files.
    pub fn from_options(min: Option<f64>, max: Option<f64>) -> Result<Self, BoundsError> {
        Self::new(min.unwrap_or(NEG_INFINITY), max.unwrap_or(INFINITY))
    }

    /// Check if a value is within the bounds
    pub fn is_within_bounds(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Check if the parameter is bounded from below
    pub fn has_lower_bound(&self) -> bool {
        self.min.is_finite()
    }

    /// Check if the parameter is bounded from above
    pub fn has_upper_bound(&self) -> bool {
        self.max.is_finite()
    }

    /// Clamp a value to be within the bounds
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

/// Implements the Minuit-style parameter transformations for handling bounds constraints
///
/// This allows the optimizer to work with unbounded parameters internally, while the
/// external values are constrained to be within the specified bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundsTransform {
    bounds: Bounds,
}

impl BoundsTransform {
    /// Create a new bounds transform
    pub fn new(bounds: Bounds) -> Self {
        Self { bounds }
    }

    /// Transform an internal parameter value to an external value
    ///
    /// The result always lies within the bounds, whatever the internal value.
    pub fn to_external(&self, internal_value: f64) -> f64 {
        match (self.bounds.has_lower_bound(), self.bounds.has_upper_bound()) {
            (false, false) => internal_value,
            (true, false) => self.bounds.min - 1.0 + (internal_value * internal_value + 1.0).sqrt(),
            (false, true) => self.bounds.max + 1.0 - (internal_value * internal_value + 1.0).sqrt(),
            (true, true) => {
                let bound_range = self.bounds.max - self.bounds.min;
                self.bounds.min + (internal_value.sin() + 1.0) * bound_range / 2.0
            }
        }
    }

    /// Transform an external parameter value to an internal value
    ///
    /// # Errors
    ///
    /// Returns an error if the external value is infinite or outside bounds.
    pub fn to_internal(&self, external_value: f64) -> Result<f64, BoundsError> {
        if !external_value.is_finite() {
            return Err(BoundsError::InfiniteValue);
        }

        if !self.bounds.is_within_bounds(external_value) {
            return Err(BoundsError::ValueOutsideBounds {
                value: external_value,
                min: self.bounds.min,
                max: self.bounds.max,
            });
        }

        let internal = match (self.bounds.has_lower_bound(), self.bounds.has_upper_bound()) {
            (false, false) => external_value,
            (true, false) => ((external_value - self.bounds.min + 1.0).powi(2) - 1.0).sqrt(),
            (false, true) => ((self.bounds.max - external_value + 1.0).powi(2) - 1.0).sqrt(),
            (true, true) => {
                let bound_range = self.bounds.max - self.bounds.min;
                if bound_range == 0.0 {
                    0.0
                } else {
                    // Ensure scaled is in [-1, 1] for asin
                    let scaled = 2.0 * (external_value - self.bounds.min) / bound_range - 1.0;
                    scaled.clamp(-1.0, 1.0).asin()
                }
            }
        };

        Ok(internal)
    }
}
