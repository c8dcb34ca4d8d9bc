//! Utility functions and helpers for the raman-conversion library.

pub mod finite_difference;
pub mod integrate;
pub mod matrix_convert;
pub mod stats;

// Re-export commonly used utilities
pub use integrate::{simpson, trapezoid};
pub use stats::{mean, r2_score, sample_std};
