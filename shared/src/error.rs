use serde::{Serialize, Deserialize};
use std::fmt;
use thiserror::Error;

use crate::validation::{MAX_IMAGE_BYTES, MAX_NAME_LENGTH, MAX_DESCRIPTION_LENGTH};

#[derive(Debug, Clone, Copy, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCode {
    #[error("Invalid input provided")]
    InvalidInput,
    #[error("Resource not found")]
    NotFound,
    #[error("Operation not authorized")]
    Unauthorized,
    #[error("Resource conflict")]
    Conflict,
    #[error("Internal system error")]
    SystemError,
    #[error("Validation failed")]
    ValidationFailed,
    #[error("Rate limit exceeded")]
    RateLimited,
}

/// Rule violations raised by contest operations before anything is written.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContestError {
    #[error("Voting is currently closed")]
    VotingClosed,
    #[error("Contestants in the tie-break cannot vote in it")]
    ExcludedFromRevote,
    #[error("This costume is not part of the tie-break vote")]
    NotInRevote,
    #[error("You cannot vote for your own costume")]
    SelfVoteNotAllowed,
    #[error("You have already submitted a costume")]
    CostumeAlreadySubmitted,
    #[error("Costume not found")]
    CostumeNotFound,
    #[error("Only the owner can change this costume")]
    NotOwner,
    #[error("Please verify your email address first")]
    EmailNotVerified,
    #[error("Costume submissions are closed during the tie-break vote")]
    SubmissionsClosed,
    #[error("There is no tie for first place")]
    NoLeadingTie,
    #[error("A tie-break vote needs at least one costume")]
    EmptyRevote,
    #[error("Costume name must be between 1 and {MAX_NAME_LENGTH} characters")]
    InvalidName,
    #[error("Description exceeds maximum length of {MAX_DESCRIPTION_LENGTH}")]
    DescriptionTooLong,
    #[error("Possible profanity detected in {0}")]
    Inappropriate(&'static str),
}

impl ContestError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ContestError::CostumeNotFound => ErrorCode::NotFound,
            ContestError::CostumeAlreadySubmitted => ErrorCode::Conflict,
            ContestError::NotOwner
            | ContestError::ExcludedFromRevote
            | ContestError::EmailNotVerified => ErrorCode::Unauthorized,
            ContestError::InvalidName
            | ContestError::DescriptionTooLong
            | ContestError::Inappropriate(_) => ErrorCode::InvalidInput,
            _ => ErrorCode::ValidationFailed,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("Unsupported image type: {0}")]
    InvalidType(String),
    #[error("Image exceeds maximum size of {MAX_IMAGE_BYTES} bytes")]
    TooLarge,
    #[error("Image is empty")]
    Empty,
}

/// JSON error body returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(details) = &self.details {
            write!(f, "{}: {} ({})", self.code, self.message, details)
        } else {
            write!(f, "{}: {}", self.code, self.message)
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(code: ErrorCode, message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: Some(details.into()),
        }
    }
}

impl From<ContestError> for Error {
    fn from(err: ContestError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

impl From<UploadError> for Error {
    fn from(err: UploadError) -> Self {
        Self::new(ErrorCode::InvalidInput, err.to_string())
    }
}
