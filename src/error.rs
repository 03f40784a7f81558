//! Crate-wide error types.
//!
//! Library modules use specific error types via `thiserror`
//! ([`SourceError`](crate::sources::SourceError) for fetch sources), while the
//! CLI binary uses `anyhow` for convenient error propagation.
//!
//! Expected conditions (cache miss, no artwork, offline, disabled by
//! preference) are never errors at the public API: they surface as
//! [`ArtworkOutcome`](crate::engine::ArtworkOutcome) values instead.

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Identity has no usable fields for its subject
    #[error("Invalid artwork identity: {0}")]
    InvalidIdentity(String),

    /// Image decoding/encoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A programming error inside the request engine
    #[error("Internal consistency fault: {0}")]
    InternalConsistency(String),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create an invalid identity error.
    pub fn invalid_identity(message: impl Into<String>) -> Self {
        Self::InvalidIdentity(message.into())
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an internal consistency error.
    pub fn consistency(message: impl Into<String>) -> Self {
        Self::InternalConsistency(message.into())
    }

    /// Add context to an error.
    pub fn context(self, ctx: impl Into<String>) -> Self {
        Self::WithContext {
            context: ctx.into(),
            source: Box::new(self),
        }
    }
}

/// Report an internal consistency fault.
///
/// Fatal in debug builds; logged and ignored in release builds.
pub fn consistency_fault(err: &Error) {
    tracing::error!("{}", err);
    debug_assert!(false, "{}", err);
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn with_context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Io(e).context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, image::ImageError> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Image(e).context(ctx))
    }
}
