use snplab_types::{GenotypeId, MarkerId};

/// Broad families of failure, used to decide how an error is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The request never produced an HTTP response (connect, timeout, I/O).
    Transport,
    /// Missing, expired or rejected credential.
    Authorization,
    /// Form input that failed required-field or choice checks.
    Validation,
    /// The backend answered with an error status and (usually) a message.
    Backend,
    /// Local misuse: bad input, wrong phase, undecodable body, bad configuration.
    Local,
}

#[derive(Debug, thiserror::Error)]
pub enum LabError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("request timed out after {0}s")]
    Timeout(u64),
    #[error("session expired or access denied")]
    Unauthorized,
    #[error("no session token available")]
    MissingToken,
    #[error("backend error ({status}): {message}")]
    Backend { status: u16, message: String },
    #[error("failed to decode response from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },

    #[error("unknown reference marker {0}")]
    UnknownMarker(MarkerId),
    #[error("genotype {genotype} is not an option for marker {marker}")]
    GenotypeNotAllowed {
        marker: MarkerId,
        genotype: GenotypeId,
    },
    #[error("reference markers are unavailable; submission is disabled")]
    ReferenceUnavailable,
    #[error("operation not allowed {0}")]
    InvalidPhase(&'static str),
    #[error("form validation failed for: {}", .0.join(", "))]
    FormInvalid(Vec<String>),
    #[error("not one of the allowed choices: {}", .0.join(", "))]
    InvalidChoice(Vec<String>),

    #[error("failed to write session token: {0}")]
    TokenWrite(std::io::Error),
    #[error("malformed session token: {0}")]
    MalformedToken(String),
}

impl LabError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            LabError::Transport(_) | LabError::Timeout(_) => ErrorCategory::Transport,
            LabError::Unauthorized | LabError::MissingToken => ErrorCategory::Authorization,
            LabError::FormInvalid(_) | LabError::InvalidChoice(_) => ErrorCategory::Validation,
            LabError::Backend { .. } => ErrorCategory::Backend,
            _ => ErrorCategory::Local,
        }
    }

    pub fn is_authorization(&self) -> bool {
        self.category() == ErrorCategory::Authorization
    }

    /// Text suitable for a transient notification.
    ///
    /// Backend messages are passed through verbatim; other failures get a generic sentence so
    /// that transport internals never reach the user.
    pub fn user_message(&self) -> String {
        match self {
            LabError::Backend { message, .. } if !message.trim().is_empty() => message.clone(),
            LabError::Unauthorized | LabError::MissingToken => {
                crate::constants::MSG_SESSION_EXPIRED.to_string()
            }
            LabError::FormInvalid(_) | LabError::InvalidChoice(_) => self.to_string(),
            _ => crate::constants::MSG_GENERIC_FAILURE.to_string(),
        }
    }
}

pub type LabResult<T> = std::result::Result<T, LabError>;
