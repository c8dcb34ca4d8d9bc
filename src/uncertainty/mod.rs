//! # Uncertainty
//!
//! - Covariance and standard errors of fitted parameters, estimated from the
//!   Jacobian at the solution as lmfit-py does
//! - [`UncertainValue`]: mean ± standard deviation arithmetic with linear
//!   error propagation, used for conversions

mod covariance;
mod value;

pub use covariance::{calculate_covariance, reduced_chi_square, standard_errors_from_covariance};
pub use value::UncertainValue;
