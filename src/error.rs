use thiserror::Error;

/// Main error type for relgraph
#[derive(Error, Debug)]
pub enum RelgraphError {
    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Whole-document parse errors (individual bad rows are skipped, not raised)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Diagram renderer rejected the diagram, timed out, or was unreachable
    #[error("Render error: {0}")]
    Render(String),

    /// LLM API returned a non-success status
    #[error("LLM API error {status}: {body}")]
    LlmStatus { status: u16, body: String },

    /// Other LLM errors (network, malformed response)
    #[error("LLM error: {0}")]
    Llm(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl RelgraphError {
    /// Whether an LLM call that failed with this error is worth retrying
    /// (rate limiting or a server-side failure).
    pub fn is_retryable(&self) -> bool {
        match self {
            RelgraphError::LlmStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Whether this error is a rate-limit response.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, RelgraphError::LlmStatus { status: 429, .. })
    }
}

/// Convenient Result type using RelgraphError
pub type Result<T> = std::result::Result<T, RelgraphError>;
