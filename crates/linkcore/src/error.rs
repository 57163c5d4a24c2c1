use thiserror::Error;

#[derive(Error, Debug)]
pub enum LinkError {
    #[error("Node error: {0}")]
    Node(#[from] NodeError),

    #[error("Chain halted: {0}")]
    Halted(String),

    #[error("Timed out waiting for '{0}'")]
    TimedOut(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failures raised inside a chain. Every variant ends up in
/// [`Chain::report`](crate::Chain::report), never in the caller of `dispatch`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NodeError {
    #[error("Missing required input: {0}")]
    MissingInput(String),

    #[error("Invalid input type for '{field}': expected {expected}, got {actual}")]
    InvalidInputType {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Condition for '{event}' failed: {message}")]
    ConditionFailed { event: String, message: String },

    #[error("Transform for '{event}' failed: {message}")]
    TransformFailed { event: String, message: String },

    #[error("Request failed: {0}")]
    RequestFailed(String),
}

impl NodeError {
    pub fn invalid_type(field: impl Into<String>, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        NodeError::InvalidInputType {
            field: field.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}
