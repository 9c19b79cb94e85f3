//! Error types for the copy pipeline.

use thiserror::Error;

/// Boxed error used as the `source()` of wrapped driver failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for copy operations.
///
/// Every variant is terminal: nothing inside the library retries.
#[derive(Error, Debug)]
pub enum CopyError {
    /// Conflicting or missing inputs, detected before any I/O.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Table introspection failed or the column selection is unusable.
    #[error("Schema error: {0}")]
    Schema(String),

    /// Source connectivity, query or row decoding failure.
    #[error("Source query failed: {context}")]
    SourceQuery {
        context: String,
        #[source]
        source: BoxError,
    },

    /// DDL or transaction failure against the destination file.
    #[error("Destination write failed: {context}")]
    DestinationWrite {
        context: String,
        #[source]
        source: rusqlite::Error,
    },

    /// The id column decoded to something that cannot drive the cursor.
    #[error("Unsupported id value in column '{column}': {found}")]
    UnsupportedIdType { column: String, found: String },

    /// A pipeline role panicked or was cancelled by the runtime.
    #[error("Pipeline task failed: {0}")]
    Task(String),

    /// IO error (output file handling, config file reading)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML config file could not be parsed
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl CopyError {
    /// Wrap a source-side failure with the operation it happened in.
    pub fn source_query(err: impl Into<BoxError>, context: impl Into<String>) -> Self {
        CopyError::SourceQuery {
            context: context.into(),
            source: err.into(),
        }
    }

    /// Wrap a destination-side failure with the operation it happened in.
    pub fn destination(err: rusqlite::Error, context: impl Into<String>) -> Self {
        CopyError::DestinationWrite {
            context: context.into(),
            source: err,
        }
    }

    /// Classification shown to the operator next to the message.
    pub fn kind(&self) -> &'static str {
        match self {
            CopyError::Config(_) | CopyError::Yaml(_) => "ConfigurationError",
            CopyError::Schema(_) => "SchemaError",
            CopyError::SourceQuery { .. } => "SourceQueryError",
            CopyError::DestinationWrite { .. } => "DestinationWriteError",
            CopyError::UnsupportedIdType { .. } => "UnsupportedIdTypeError",
            CopyError::Task(_) => "InternalError",
            CopyError::Io(_) => "IoError",
        }
    }

    /// Process exit code for this error. Every failure exits with 1.
    pub fn exit_code(&self) -> u8 {
        1
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error [{}]: {}\n", self.kind(), self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for copy operations.
pub type Result<T> = std::result::Result<T, CopyError>;
