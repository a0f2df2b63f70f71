use rocket::http::Status;
use rocket::response::Responder;
use rocket::serde::json::Json;
use shared::{ContestError, Error as ErrorBody, ErrorCode, UploadError};
use thiserror::Error;
use tracing::error;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Contest(#[from] ContestError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Invalid costume ID")]
    InvalidId,
    #[error("Results are not visible yet")]
    ResultsHidden,
    #[error("{0}")]
    RateLimited(String),
    #[error("CSRF token expired, please use the new token")]
    Csrf(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> Status {
        match self {
            ApiError::Contest(e) => match e {
                ContestError::CostumeNotFound => Status::NotFound,
                ContestError::CostumeAlreadySubmitted => Status::Conflict,
                ContestError::NotOwner
                | ContestError::EmailNotVerified
                | ContestError::ExcludedFromRevote
                | ContestError::VotingClosed
                | ContestError::SubmissionsClosed => Status::Forbidden,
                _ => Status::BadRequest,
            },
            ApiError::Upload(UploadError::TooLarge) => Status::PayloadTooLarge,
            ApiError::Upload(_) => Status::BadRequest,
            ApiError::Store(StoreError::NotFound) => Status::NotFound,
            ApiError::Store(StoreError::Conflict) => Status::Conflict,
            ApiError::Store(_) | ApiError::Internal(_) => Status::InternalServerError,
            ApiError::InvalidId => Status::BadRequest,
            ApiError::ResultsHidden | ApiError::Csrf(_) => Status::Forbidden,
            ApiError::RateLimited(_) => Status::TooManyRequests,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ApiError::Contest(e) => e.code(),
            ApiError::Upload(_) | ApiError::InvalidId => ErrorCode::InvalidInput,
            ApiError::Store(StoreError::NotFound) => ErrorCode::NotFound,
            ApiError::Store(StoreError::Conflict) => ErrorCode::Conflict,
            ApiError::Store(_) | ApiError::Internal(_) => ErrorCode::SystemError,
            ApiError::ResultsHidden | ApiError::Csrf(_) => ErrorCode::Unauthorized,
            ApiError::RateLimited(_) => ErrorCode::RateLimited,
        }
    }

    fn body(&self) -> ErrorBody {
        match self {
            ApiError::Csrf(new_token) => ErrorBody::with_details(self.code(), self.to_string(), new_token.clone()),
            ApiError::Store(_) | ApiError::Internal(_) => {
                error!("{}", self);
                ErrorBody::new(self.code(), "An internal server error occurred.")
            }
            _ => ErrorBody::new(self.code(), self.to_string()),
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for ApiError {
    fn respond_to(self, req: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        rocket::Response::build_from(Json(self.body()).respond_to(req)?)
            .status(self.status())
            .ok()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
