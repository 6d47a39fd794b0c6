use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{
        JwtKeys, LoginRequest, LoginResponse, MessageResponse, RegisterRequest, RegisterResponse,
        UserResponse, VerifyEmailRequest,
    },
    extractors::AuthUser,
    service,
};
use crate::error::{ApiError, ApiJson};
use crate::state::AppState;
use crate::users::PublicUser;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/verify-email", post(verify_email))
        .route("/auth/me", get(me))
        .route("/auth/logout", post(logout))
}

#[instrument(skip(state, payload))]
async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let user = service::register(
        state.store.as_ref(),
        state.mailer.as_ref(),
        &state.config.urls,
        payload,
    )
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            success: true,
            message: "Registration successful! Please check your email to verify your account."
                .into(),
            user: PublicUser::from(user),
        }),
    ))
}

#[instrument(skip(state, payload))]
async fn verify_email(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<VerifyEmailRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    service::verify_email(state.store.as_ref(), &payload.token).await?;
    Ok(Json(MessageResponse::ok(
        "Email verified successfully. Your account is awaiting admin approval.",
    )))
}

#[instrument(skip(state, payload))]
async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let keys = JwtKeys::from_ref(&state);
    let (token, user) = service::login(state.store.as_ref(), &keys, payload).await?;
    Ok(Json(LoginResponse {
        success: true,
        token,
        user: PublicUser::from(user),
    }))
}

#[instrument(skip(state))]
async fn me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = service::current_user(state.store.as_ref(), user_id).await?;
    Ok(Json(UserResponse {
        success: true,
        user: PublicUser::from(user),
    }))
}

/// Stateless: tokens are not revocable, so logout only acknowledges.
#[instrument(skip_all)]
async fn logout(AuthUser(_user_id): AuthUser) -> Json<MessageResponse> {
    Json(MessageResponse::ok("Logged out"))
}
