//! Which registry failures are worth another attempt.

use reqwest::StatusCode;
use thiserror::Error;

/// Attempts made for one registry request, the first included.
pub const MAX_ATTEMPTS: usize = 3;

/// Pause between attempts in milliseconds.
pub const RETRY_DELAY_MS: u64 = 1000;

/// A registry response that another attempt will not change.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum NonRetryableError {
    #[error("registry rejected the credentials (HTTP 401), check NPM_TOKEN")]
    Unauthorized,
    #[error("access denied (HTTP 403), private packages need NPM_TOKEN")]
    Forbidden,
    #[error("rate limited by the registry (HTTP 429), try again later")]
    RateLimited,
    #[error("package not found (HTTP 404)")]
    NotFound,
    #[error("registry refused the request (HTTP {0})")]
    Rejected(u16),
}

impl NonRetryableError {
    /// `None` for statuses that may succeed later (5xx and anything unexpected).
    pub fn from_status(status: StatusCode) -> Option<Self> {
        match status {
            StatusCode::UNAUTHORIZED => Some(Self::Unauthorized),
            StatusCode::FORBIDDEN => Some(Self::Forbidden),
            StatusCode::TOO_MANY_REQUESTS => Some(Self::RateLimited),
            StatusCode::NOT_FOUND => Some(Self::NotFound),
            s if s.is_client_error() => Some(Self::Rejected(s.as_u16())),
            _ => None,
        }
    }
}

/// Connection errors and timeouts carry no status and stay retryable.
pub fn classify_error(error: &reqwest::Error) -> Option<NonRetryableError> {
    error.status().and_then(NonRetryableError::from_status)
}

/// Wraps an `error_for_status()` failure, swapping permanent ones for a
/// [`NonRetryableError`] the retry loop can recognize.
pub fn check_retryable(error: reqwest::Error) -> anyhow::Error {
    match classify_error(&error) {
        Some(permanent) => anyhow::Error::from(permanent),
        None => anyhow::Error::from(error),
    }
}
