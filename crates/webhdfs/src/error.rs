//! Error types for the WebHDFS client library.

use thiserror::Error;

/// Main error type for client and transfer operations.
#[derive(Error, Debug)]
pub enum HdfsError {
    /// Configuration error (invalid YAML, unknown alias, bad endpoint, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// An endpoint could not be reached (refused, timed out, DNS failure).
    /// Retriable: the dispatcher rotates to the next endpoint.
    #[error("Connection to {endpoint} failed: {message}")]
    Connection { endpoint: String, message: String },

    /// The server rejected our credentials (HTTP 401). Never retried across
    /// endpoints: rotating hosts cannot fix a credential problem.
    #[error("Authentication failure on {endpoint}. Check your credentials.")]
    AuthFailure { endpoint: String },

    /// Structured error payload returned by the remote filesystem.
    #[error("{exception}: {message}")]
    Remote {
        status: u16,
        exception: String,
        message: String,
    },

    /// An API call succeeded at the HTTP level but reported failure, or the
    /// remote state does not permit the operation (rename returned false,
    /// listing a plain file, expanding an empty directory).
    #[error("{0}")]
    Operation(String),

    /// A local precondition failed before any data moved (missing source,
    /// destination exists without overwrite, empty source tree).
    #[error("{0}")]
    Precondition(String),

    /// A transfer worker thread panicked. Ordinary per-file errors propagate
    /// as themselves; this variant only wraps panics.
    #[error("Transfer worker failed for {path}: {message}")]
    Worker { path: String, message: String },

    /// IO error (local file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Remote exception class names the active namenode uses to signal that a
/// retry against another endpoint may succeed.
const RETRIABLE_EXCEPTIONS: &[&str] = &["RetriableException", "StandbyException"];

impl HdfsError {
    /// Create a Connection error for a given endpoint.
    pub fn connection(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        HdfsError::Connection {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create a Remote error from a parsed error payload.
    pub fn remote(status: u16, exception: impl Into<String>, message: impl Into<String>) -> Self {
        HdfsError::Remote {
            status,
            exception: exception.into(),
            message: message.into(),
        }
    }

    /// Create an Operation error.
    pub fn operation(message: impl Into<String>) -> Self {
        HdfsError::Operation(message.into())
    }

    /// Create a Precondition error.
    pub fn precondition(message: impl Into<String>) -> Self {
        HdfsError::Precondition(message.into())
    }

    /// Create a Worker error for a panicked transfer task.
    pub fn worker(path: impl Into<String>, message: impl Into<String>) -> Self {
        HdfsError::Worker {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether rotating to another endpoint may resolve this error.
    pub fn is_retriable(&self) -> bool {
        match self {
            HdfsError::Connection { .. } => true,
            HdfsError::Remote { exception, .. } => {
                RETRIABLE_EXCEPTIONS.iter().any(|e| e == exception)
            }
            _ => false,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        // Add error chain for wrapped errors
        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }

    /// Process exit code for the CLI. Each error family gets its own code so
    /// scripts can react without parsing messages.
    pub fn exit_code(&self) -> u8 {
        match self {
            HdfsError::Config(_) | HdfsError::Yaml(_) => 1,
            HdfsError::Precondition(_) => 2,
            HdfsError::AuthFailure { .. } => 3,
            HdfsError::Connection { .. } => 4,
            HdfsError::Remote { .. } | HdfsError::Operation(_) | HdfsError::Json(_) => 5,
            HdfsError::Worker { .. } => 6,
            HdfsError::Io(_) => 7,
        }
    }
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, HdfsError>;
