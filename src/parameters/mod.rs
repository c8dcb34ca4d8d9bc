//! # Parameter System
//!
//! Named, bounded fit parameters in the spirit of lmfit-py.
//!
//! ## Core Components
//!
//! - [`Parameter`]: an individual parameter with a value and bounds
//! - [`Parameters`]: an ordered collection, loadable from parameter definition
//!   tables (name, value, min, max) or JSON
//! - [`Bounds`] and [`BoundsTransform`]: handle parameter bounds during optimization
//!
//! ## Example Usage
//!
//! ```rust
//! use raman_conversion::parameters::Parameters;
//!
//! let mut params = Parameters::new();
//! params.add_param_with_bounds("p1_amplitude", 3.0, 0.0, f64::INFINITY).unwrap();
//! params.add_param("p1_center", 1630.0).unwrap();
//! params.add_param_with_bounds("p1_half_width", 4.0, 0.0, f64::INFINITY).unwrap();
//!
//! let values = params.values();
//! assert_eq!(values.len(), 3);
//! ```

pub mod bounds;
pub mod parameter;
pub mod parameters;

// Re-export key types
pub use bounds::{Bounds, BoundsError, BoundsTransform};
pub use parameter::{Parameter, ParameterError};
pub use parameters::{canonical_name, Parameters};
