use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::users::StoreError;

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
}

/// Error taxonomy for the whole API. Auth-category errors all map to 401;
/// dependency failures are logged with context and surfaced as a generic 500.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("Email already registered")]
    DuplicateEmail,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Invalid or expired verification token")]
    InvalidOrExpiredToken,
    #[error("Email not verified. Please check your inbox.")]
    EmailNotVerified,
    #[error("Account is pending admin approval")]
    PendingApproval,
    #[error("Account application was rejected")]
    Rejected,
    #[error("Invalid or expired token")]
    Unauthenticated,
    #[error("Admin access required")]
    Forbidden,
    #[error("User not found")]
    NotFound,
    #[error("User is not pending approval")]
    InvalidState,
    #[error("Admin user already exists")]
    AdminAlreadyExists,
    #[error("Internal server error")]
    Dependency(#[source] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_)
            | ApiError::InvalidOrExpiredToken
            | ApiError::InvalidState
            | ApiError::AdminAlreadyExists => StatusCode::BAD_REQUEST,
            ApiError::DuplicateEmail => StatusCode::CONFLICT,
            ApiError::InvalidCredentials
            | ApiError::EmailNotVerified
            | ApiError::PendingApproval
            | ApiError::Rejected
            | ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Dependency(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateEmail => ApiError::DuplicateEmail,
            StoreError::Other(e) => ApiError::Dependency(e),
        }
    }
}

/// Json extractor whose rejection keeps the API's error envelope: malformed
/// or missing JSON bodies come back as a 400 with `{ success, message }`
/// instead of axum's plain-text 415/422.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::Validation(rejection.body_text()))?;
        Ok(ApiJson(value))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Dependency(source) = &self {
            error!(error = %source, "dependency failure");
        }
        let body = Json(ErrorBody {
            success: false,
            message: self.to_string(),
        });
        (self.status(), body).into_response()
    }
}
