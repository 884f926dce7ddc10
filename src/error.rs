use std::time::Duration;

/// Why a probe could not produce a value this tick.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProbeError {
    /// The backing tool is missing or the platform has no such source.
    #[error("probe unavailable: {0}")]
    Unavailable(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("`{command}` timed out after {elapsed:?}")]
    Timeout { command: String, elapsed: Duration },

    /// Single-tick hiccup: non-zero exit, unparsable output, I/O error.
    #[error("transient probe failure: {0}")]
    Transient(String),
}

impl ProbeError {
    pub fn unavailable<S: Into<String>>(msg: S) -> Self {
        ProbeError::Unavailable(msg.into())
    }

    pub fn permission_denied<S: Into<String>>(msg: S) -> Self {
        ProbeError::PermissionDenied(msg.into())
    }

    pub fn transient<S: Into<String>>(msg: S) -> Self {
        ProbeError::Transient(msg.into())
    }

    /// True when retrying next tick cannot help for the rest of the session.
    pub fn is_permanent(&self) -> bool {
        matches!(self, ProbeError::Unavailable(_))
    }
}

impl From<std::io::Error> for ProbeError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound         => ProbeError::Unavailable(e.to_string()),
            std::io::ErrorKind::PermissionDenied => ProbeError::PermissionDenied(e.to_string()),
            _                                    => ProbeError::Transient(e.to_string()),
        }
    }
}

pub type ProbeResult<T> = std::result::Result<T, ProbeError>;
