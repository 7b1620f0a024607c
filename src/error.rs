use thiserror::Error;

/// Outcome classification of a failed request. Every variant is returned to
/// the caller once; nothing here is retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecError {
    /// The transport reported that the slave never answered.
    #[error("I/O error: did not receive any data from slave.")]
    IoTimeout,

    /// The slave answered with an exception, or the function is not implemented.
    #[error("Slave threw exception \"{0}\" or function not implemented.")]
    ProtocolException(String),

    #[error(
        "Number of registers returned does not match number of registers requested! \
         (requested {expected}, returned {actual})"
    )]
    CountMismatch { expected: usize, actual: usize },
}

impl ExecError {
    /// Short title suitable for an error dialog.
    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::IoTimeout => "I/O error",
            Self::ProtocolException(_) | Self::CountMismatch { .. } => "Protocol error",
        }
    }
}

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error("no transport is active")]
    NoTransport,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("registry error: {0}")]
    Registry(String),

    #[error("already registered")]
    AlreadyRegistered,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
