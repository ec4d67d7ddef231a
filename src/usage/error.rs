//! Error kinds surfaced by the usage client.

use reqwest::StatusCode;

/// Errors that can occur while resolving the organization or fetching usage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
    /// No session key configured
    MissingCredential,
    /// Base URL or endpoint path could not be turned into a URL
    InvalidUrl,
    /// Transport returned something other than a readable HTTP response
    InvalidResponse,
    /// Backend answered 401 or 403
    SessionExpired,
    /// Organizations list empty, malformed, or missing an identifier
    NoOrganization,
    /// Backend answered 429
    RateLimited,
    /// Usage body was not a JSON object
    ParseError,
    /// Any other non-200 status
    HttpError(u16),
    /// Connect failure, timeout or other transport problem
    Network(String),
}

impl UsageError {
    /// True when polling cannot succeed again until a new session key is set.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, UsageError::SessionExpired | UsageError::MissingCredential)
    }
}

impl std::fmt::Display for UsageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UsageError::MissingCredential => write!(f, "Session key not configured"),
            UsageError::InvalidUrl => write!(f, "Invalid URL"),
            UsageError::InvalidResponse => write!(f, "Invalid server response"),
            UsageError::SessionExpired => {
                write!(f, "Session expired - please enter a new session key")
            }
            UsageError::NoOrganization => write!(f, "No organization found"),
            UsageError::RateLimited => write!(f, "Too many requests - please wait"),
            UsageError::ParseError => write!(f, "Response could not be processed"),
            UsageError::HttpError(code) => write!(f, "HTTP error: {}", code),
            UsageError::Network(e) => write!(f, "Network error: {}", e),
        }
    }
}

impl std::error::Error for UsageError {}

/// Map a response status onto the shared status table used by both endpoints.
/// Only exactly 200 passes.
pub(crate) fn check_status(status: StatusCode) -> Result<(), UsageError> {
    match status.as_u16() {
        200 => Ok(()),
        401 | 403 => Err(UsageError::SessionExpired),
        429 => Err(UsageError::RateLimited),
        code => Err(UsageError::HttpError(code)),
    }
}
