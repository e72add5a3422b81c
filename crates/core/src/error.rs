/// Result alias that carries the custom [`SonifyError`] type.
pub type Result<T> = std::result::Result<T, SonifyError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum SonifyError {
    /// A configuration value or lookup name was rejected at the call boundary.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// The tone output device failed to initialise or has been disposed.
    #[error("tone output device unavailable: {0}")]
    OutputDeviceUnavailable(String),
    /// The external narration capability reported an error.
    #[error("narration failed: {reason}")]
    NarrationFailure { reason: String },
    /// Internal failure that does not fit a dedicated variant, such as a
    /// poisoned lock.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl SonifyError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    pub fn invalid<T: Into<String>>(msg: T) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    pub fn device<T: Into<String>>(msg: T) -> Self {
        Self::OutputDeviceUnavailable(msg.into())
    }
}
