//! Termination states of the Levenberg-Marquardt iteration.

use serde::{Deserialize, Serialize};

/// Possible termination states for an optimization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConvergenceStatus {
    /// Converged due to a small parameter change.
    ParameterConvergence,

    /// Converged due to a small change (or predicted change) in the cost.
    FunctionValueConvergence,

    /// Converged due to a small gradient.
    GradientConvergence,

    /// Converged because the residuals vanished exactly.
    ExactFit,

    /// Terminated due to reaching the maximum number of iterations.
    MaxIterationsReached,

    /// Terminated because no damping up to the maximum reduced the cost.
    LambdaOverflow,

    /// Terminated because the residuals became non-finite.
    NumericalError,
}

impl ConvergenceStatus {
    /// Returns true if the optimization has converged.
    pub fn is_converged(&self) -> bool {
        matches!(
            self,
            ConvergenceStatus::ParameterConvergence
                | ConvergenceStatus::FunctionValueConvergence
                | ConvergenceStatus::GradientConvergence
                | ConvergenceStatus::ExactFit
        )
    }

    /// Returns a description of the convergence status.
    pub fn description(&self) -> &'static str {
        match self {
            ConvergenceStatus::ParameterConvergence => "Converged: small parameter change",
            ConvergenceStatus::FunctionValueConvergence => "Converged: small cost change",
            ConvergenceStatus::GradientConvergence => "Converged: small gradient",
            ConvergenceStatus::ExactFit => "Converged: residuals are zero",
            ConvergenceStatus::MaxIterationsReached => "Terminated: maximum iterations reached",
            ConvergenceStatus::LambdaOverflow => {
                "Terminated: cost could not be decreased and lambda reached its maximum"
            }
            ConvergenceStatus::NumericalError => "Terminated: non-finite residuals",
        }
    }
}
