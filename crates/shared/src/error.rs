use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const GUEST_NOT_FOUND_MESSAGE: &str = "We could not find your name or email in our guest list. Please check the spelling and try again, or contact us if you believe this is an error.";
pub const LOOKUP_UNAVAILABLE_MESSAGE: &str =
    "An error occurred while verifying your information. Please try again.";
pub const LOOKUP_AMBIGUOUS_MESSAGE: &str = "More than one guest matches those details. Please enter both your full name and email address.";
pub const SUBMISSION_FAILED_MESSAGE: &str =
    "We could not save your RSVP. Please try submitting again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    SessionExpired,
    NotFound,
    Conflict,
    Validation,
    Unavailable,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Failures surfaced to guests and administrators. Every variant leaves the
/// caller in an interactive state with an explanatory message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RsvpError {
    #[error("{0}")]
    GuestNotFound(String),
    #[error("{0}")]
    LookupAmbiguous(String),
    #[error("{0}")]
    LookupUnavailable(String),
    #[error("{0}")]
    SubmissionFailed(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("admin session expired")]
    SessionExpired,
}

impl RsvpError {
    pub fn guest_not_found() -> Self {
        RsvpError::GuestNotFound(GUEST_NOT_FOUND_MESSAGE.to_string())
    }

    pub fn lookup_ambiguous() -> Self {
        RsvpError::LookupAmbiguous(LOOKUP_AMBIGUOUS_MESSAGE.to_string())
    }

    pub fn lookup_unavailable() -> Self {
        RsvpError::LookupUnavailable(LOOKUP_UNAVAILABLE_MESSAGE.to_string())
    }

    pub fn submission_failed() -> Self {
        RsvpError::SubmissionFailed(SUBMISSION_FAILED_MESSAGE.to_string())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            RsvpError::GuestNotFound(_) => ErrorCode::NotFound,
            RsvpError::LookupAmbiguous(_) => ErrorCode::Conflict,
            RsvpError::LookupUnavailable(_) | RsvpError::SubmissionFailed(_) => {
                ErrorCode::Unavailable
            }
            RsvpError::InvalidResponse(_) => ErrorCode::Validation,
            RsvpError::Unauthorized(_) => ErrorCode::Unauthorized,
            RsvpError::SessionExpired => ErrorCode::SessionExpired,
        }
    }

    /// True for faults the user can retry without changing their input.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RsvpError::LookupUnavailable(_) | RsvpError::SubmissionFailed(_)
        )
    }
}

impl From<RsvpError> for ApiError {
    fn from(value: RsvpError) -> Self {
        ApiError::new(value.code(), value.to_string())
    }
}
