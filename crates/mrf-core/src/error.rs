//! Error types for MRF pipeline operations

use mrf_domain::DomainError;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for pipeline operations
///
/// Every variant is terminal for a run: stages surface the first error they
/// hit and the orchestrator aborts the remaining stages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Source fetch failed (non-success status, connection failure)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Invalid gzip framing or checksum
    #[error("Decode error: {0}")]
    Decode(String),

    /// Malformed JSON within the traversed path
    #[error("Invalid JSON syntax at byte {position}: {message}")]
    Parse {
        /// Absolute offset in the (decompressed) document
        position: u64,
        /// Error description
        message: String,
    },

    /// Traversed substructure has the wrong shape
    #[error("Schema error: {0}")]
    Schema(String),

    /// A field failed validation (e.g. an unparseable location URL)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Writing to the destination failed
    #[error("Sink error: {0}")]
    Sink(String),

    /// A buffered element, key or nesting level exceeded its configured bound
    #[error("Buffer limit exceeded: {0}")]
    BufferLimit(String),

    /// Path selector expression could not be parsed
    #[error("Invalid path selector: {0}")]
    InvalidSelector(String),

    /// Invalid pipeline or policy configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Local source I/O failure
    #[error("I/O error: {0}")]
    Io(String),
}

impl Error {
    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    /// Create a JSON parse error
    pub fn parse(position: u64, message: impl Into<String>) -> Self {
        Self::Parse {
            position,
            message: message.into(),
        }
    }

    /// Create a sink error
    pub fn sink(message: impl Into<String>) -> Self {
        Self::Sink(message.into())
    }

    /// Create a buffer limit error
    pub fn buffer_limit(message: impl Into<String>) -> Self {
        Self::BufferLimit(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Short name of the pipeline stage the error belongs to
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Transport(_) | Self::Io(_) => "source",
            Self::Decode(_) => "decompressor",
            Self::Parse { .. } | Self::BufferLimit(_) => "object stream",
            Self::Schema(_) | Self::Validation(_) => "filter",
            Self::Sink(_) => "serializer",
            Self::InvalidSelector(_) | Self::Config(_) => "setup",
        }
    }
}

impl From<DomainError> for Error {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Schema(msg) => Self::Schema(msg),
            DomainError::Validation(msg) => Self::Validation(msg),
            DomainError::InvalidSelector(msg) => Self::InvalidSelector(msg),
            other => Self::Config(other.to_string()),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}
