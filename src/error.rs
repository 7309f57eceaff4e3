use thiserror::Error;

/// Crate-wide result alias for driver operations.
pub type OptResult<T> = Result<T, OptimizeError>;

// ===== EXPRESSION ERRORS =====

/// Failure while turning text into an expression tree.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("expression cannot be empty")]
    Empty,

    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("invalid number '{text}' at position {pos}")]
    InvalidNumber { text: String, pos: usize },

    #[error("expected {expected} at position {pos}, found '{found}'")]
    UnexpectedToken {
        expected: &'static str,
        found: String,
        pos: usize,
    },

    #[error("unexpected end of expression, expected {expected}")]
    UnexpectedEnd { expected: &'static str },

    #[error("unknown function '{name}' at position {pos}")]
    UnknownFunction { name: String, pos: usize },

    #[error("expression nests deeper than {limit} levels at position {pos}")]
    TooDeep { limit: usize, pos: usize },
}

/// Failure while evaluating an expression at a point.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    #[error("variable '{name}' has no value in the binding")]
    UnboundVariable { name: String },

    #[error("expected {expected} values, got {found}")]
    ArityMismatch { expected: usize, found: usize },

    #[error("evaluating '{expression}' produced non-finite value {value}")]
    NonFinite { expression: String, value: f64 },

    #[error("{what} count {count} exceeds the bytecode limit of {limit}")]
    TooLarge {
        what: &'static str,
        count: usize,
        limit: usize,
    },
}

// ===== DRIVER ERRORS =====

/// Errors surfaced by the optimization driver before any iteration runs.
#[derive(Debug, Error)]
pub enum OptimizeError {
    #[error("unknown method '{0}' (expected auto, gradient, newton or lagrangian)")]
    UnknownMethod(String),

    #[error("step size alpha must be finite and positive, got {0}")]
    InvalidAlpha(f64),

    #[error("max iterations must be positive")]
    InvalidMaxIterations,

    #[error("tolerance must be finite and positive, got {0}")]
    InvalidTolerance(f64),

    #[error("at least one variable is required")]
    NoVariables,

    #[error("variable '{0}' is listed more than once")]
    DuplicateVariable(String),

    #[error("initial point has {found} values but there are {expected} variables")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("failed to parse '{source_text}': {error}")]
    Parse {
        source_text: String,
        #[source]
        error: ParseError,
    },

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error("invalid solve request: {0}")]
    Request(#[from] serde_json::Error),
}

impl OptimizeError {
    pub(crate) fn parse(source_text: &str, error: ParseError) -> Self {
        OptimizeError::Parse {
            source_text: source_text.to_string(),
            error,
        }
    }
}
