use thiserror::Error;

/// Error types for the raman-conversion library.
#[derive(Error, Debug)]
pub enum RamanError {
    /// A region is too short to fit a baseline through its extremes.
    #[error("Insufficient samples: need at least {required}, found {found}")]
    InsufficientSamples { required: usize, found: usize },

    /// A region discriminator other than vinyl or p-xylene.
    #[error("Unsupported region '{0}': expected 'vinyl' or 'p-xylene'")]
    UnsupportedRegion(String),

    /// The solver stopped without meeting any convergence criterion.
    ///
    /// Carries the best-effort parameter values and the number of iterations
    /// performed so callers can log or inspect the failed fit.
    #[error("Fit did not converge after {iterations} iterations: {message}")]
    FitDidNotConverge {
        params: Vec<(String, f64)>,
        iterations: usize,
        message: String,
    },

    /// Condition sets or their order differ between ratio tables.
    #[error("Misaligned conditions: {0}")]
    MisalignedConditions(String),

    /// File not found, wrong column count, non-numeric header and similar.
    #[error("Missing or malformed input: {0}")]
    MissingOrMalformedInput(String),

    /// Error indicating a mismatch in array dimensions.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Error indicating a singular matrix was encountered.
    #[error("Singular matrix encountered")]
    SingularMatrix,

    /// Error for invalid parameter values or parameter sets.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Parameter not found.
    #[error("Parameter not found: {0}")]
    ParameterNotFound(String),

    /// Error during computational operations.
    #[error("Computation error: {0}")]
    InvalidComputation(String),

    /// I/O error wrapper.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// CSV reading/writing error.
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// TOML configuration error.
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl From<crate::parameters::ParameterError> for RamanError {
    fn from(err: crate::parameters::ParameterError) -> Self {
        RamanError::InvalidParameter(format!("{}", err))
    }
}

impl From<crate::parameters::BoundsError> for RamanError {
    fn from(err: crate::parameters::BoundsError) -> Self {
        RamanError::InvalidParameter(format!("{}", err))
    }
}

impl RamanError {
    /// Whether this error is a per-spectrum fit failure rather than a
    /// structural problem with the inputs.
    pub fn is_fit_failure(&self) -> bool {
        matches!(self, RamanError::FitDidNotConverge { .. })
    }
}

/// Result type alias for raman-conversion operations.
pub type Result<T> = std::result::Result<T, RamanError>;
