//! Unified error type for the imageboost service.
//!
//! All crates funnel their failures into [`Error`]. Two variants are signals
//! rather than true failures: [`Error::AlreadyConverted`] marks a reference
//! that is already in target form (the pipeline treats it as success), and
//! [`Error::NoMatchingRule`] marks a reference no configured rule applies to.

/// Unified error type covering all failure modes in imageboost.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The reference is already in the form a conversion would produce.
    ///
    /// This is an expected skip signal, not a failure; callers log it at
    /// informational level and report success.
    #[error("image already converted: {reference}")]
    AlreadyConverted {
        /// The reference that was resolved.
        reference: String,
    },

    /// No configured rule applies to the reference.
    ///
    /// Signals misconfiguration or unexpected input, never a transient fault.
    #[error("no conversion rule matches reference: {reference}")]
    NoMatchingRule {
        /// The reference that was resolved.
        reference: String,
    },

    /// Input or configuration failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A conversion pipeline stage failed.
    #[error("Stage error [{stage}]: {message}")]
    Stage {
        /// The pipeline stage that failed (lease, rule, pull, convert, push).
        stage: String,
        /// Human-readable error description.
        message: String,
    },

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Convenience constructor for [`Error::Stage`].
    pub fn stage(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Stage {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Whether this error is the expected already-converted skip signal.
    pub fn is_already_converted(&self) -> bool {
        matches!(self, Error::AlreadyConverted { .. })
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
