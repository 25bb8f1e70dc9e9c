use thiserror::Error;

/// Contract violations raised by the matrix layer.
///
/// These are programmer errors: the caller handed an operation operands whose
/// shapes or arguments break its precondition. Nothing is written to the
/// destination when one of these is returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatrixError {
    #[error("invalid shape {rows}x{cols}: both dimensions must be at least 1")]
    InvalidShape { rows: usize, cols: usize },

    #[error("{op}: expected {}x{}, got {}x{}", .expected.0, .expected.1, .got.0, .got.1)]
    DimensionMismatch {
        op: &'static str,
        expected: (usize, usize),
        got: (usize, usize),
    },

    #[error("{op}: matrix must be square, got {rows}x{cols}")]
    NotSquare {
        op: &'static str,
        rows: usize,
        cols: usize,
    },

    #[error("{op}: scalar must be non-zero")]
    ZeroScalar { op: &'static str },

    #[error("{op}: row {row} cannot be combined with itself")]
    SameRow { op: &'static str, row: usize },

    #[error("{op}: row {row} out of range for {rows} rows")]
    RowOutOfRange {
        op: &'static str,
        row: usize,
        rows: usize,
    },

    #[error("expected {expected} values for initialisation, got {got}")]
    ValueCount { expected: usize, got: usize },
}

/// Errors surfaced by the Kalman predictor, the fitters and configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error(transparent)]
    Matrix(#[from] MatrixError),

    #[error("Singular matrix: {context}")]
    Singular { context: String },

    #[error("Invalid shape: {0}")]
    Shape(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl EngineError {
    pub(crate) fn singular(context: impl Into<String>) -> Self {
        EngineError::Singular {
            context: context.into(),
        }
    }

    /// True for the recoverable numerical failure class.
    pub fn is_singular(&self) -> bool {
        matches!(self, EngineError::Singular { .. })
    }

    /// True for programmer errors (bad shapes, bad arguments).
    pub fn is_contract_violation(&self) -> bool {
        match self {
            // Singularity never surfaces as a MatrixError; the inverter reports it as Ok(false).
            EngineError::Matrix(_) | EngineError::Shape(_) | EngineError::InvalidParameter(_) => true,
            EngineError::Singular { .. } | EngineError::Config(_) => false,
        }
    }
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
