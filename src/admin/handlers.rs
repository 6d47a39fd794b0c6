use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use super::service::{self, UserStats};
use crate::auth::extractors::AdminUser;
use crate::error::{ApiError, ApiJson};
use crate::state::AppState;
use crate::users::PublicUser;

#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAdminRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub success: bool,
    pub users: Vec<PublicUser>,
}

#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub success: bool,
    pub stats: UserStats,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(list_users))
        .route("/admin/pending-users", get(pending_users))
        .route("/admin/approve-user/:id", post(approve_user))
        .route("/admin/reject-user/:id", post(reject_user))
        .route("/admin/stats", get(get_stats))
        .route("/admin/create-admin", post(create_admin))
}

#[instrument(skip(state, _admin))]
async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<UsersResponse>, ApiError> {
    let users = service::list_users(state.store.as_ref()).await?;
    Ok(Json(UsersResponse {
        success: true,
        users: users.into_iter().map(PublicUser::from).collect(),
    }))
}

#[instrument(skip(state, _admin))]
async fn pending_users(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<UsersResponse>, ApiError> {
    let users = service::pending_users(state.store.as_ref()).await?;
    Ok(Json(UsersResponse {
        success: true,
        users: users.into_iter().map(PublicUser::from).collect(),
    }))
}

#[instrument(skip(state, admin))]
async fn approve_user(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ActionResponse>, ApiError> {
    let user = service::approve(
        state.store.as_ref(),
        state.mailer.as_ref(),
        &state.config.urls,
        id,
        admin.id,
    )
    .await?;
    Ok(Json(ActionResponse {
        success: true,
        message: "User approved successfully".into(),
        user: PublicUser::from(user),
    }))
}

#[instrument(skip(state, _admin, payload))]
async fn reject_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    payload: Option<ApiJson<RejectRequest>>,
) -> Result<Json<ActionResponse>, ApiError> {
    // The reason (and the whole body) is optional.
    let reason = payload.and_then(|ApiJson(p)| p.reason);
    let user = service::reject(
        state.store.as_ref(),
        state.mailer.as_ref(),
        id,
        reason.as_deref(),
    )
    .await?;
    Ok(Json(ActionResponse {
        success: true,
        message: "User rejected successfully".into(),
        user: PublicUser::from(user),
    }))
}

#[instrument(skip(state, _admin))]
async fn get_stats(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<StatsResponse>, ApiError> {
    let stats = service::stats(state.store.as_ref()).await?;
    Ok(Json(StatsResponse {
        success: true,
        stats,
    }))
}

#[instrument(skip(state, _admin, payload))]
async fn create_admin(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiJson(payload): ApiJson<CreateAdminRequest>,
) -> Result<(StatusCode, Json<ActionResponse>), ApiError> {
    let admin = service::create_initial_admin(
        state.store.as_ref(),
        &payload.first_name,
        &payload.last_name,
        &payload.email,
        &payload.password,
    )
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(ActionResponse {
            success: true,
            message: "Admin user created successfully".into(),
            user: PublicUser::from(admin),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use crate::admin::service as admin_service;
    use crate::app::build_app;
    use crate::auth::dto::{JwtKeys, RegisterRequest};
    use crate::auth::service as auth_service;
    use crate::state::AppState;
    use crate::users::{AccountStatus, User};
    use axum::{
        body::Body,
        extract::FromRef,
        http::{header, Request, StatusCode},
    };
    use tower::ServiceExt;

    async fn admin_token(state: &AppState) -> String {
        let admin = admin_service::create_initial_admin(
            state.store.as_ref(),
            "Root",
            "Admin",
            "root@x.com",
            "rootpass",
        )
        .await
        .unwrap();
        JwtKeys::from_ref(state).sign(admin.id).unwrap()
    }

    async fn pending_user(state: &AppState, email: &str) -> User {
        auth_service::register(
            state.store.as_ref(),
            state.mailer.as_ref(),
            &state.config.urls,
            RegisterRequest {
                first_name: "Ada".into(),
                last_name: "Lovelace".into(),
                email: email.into(),
                password: "secret1".into(),
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn reject_without_body_rejects_the_user() {
        let state = AppState::fake();
        let token = admin_token(&state).await;
        let user = pending_user(&state, "a@x.com").await;
        let app = build_app(state.clone());

        let res = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/admin/reject-user/{}", user.id))
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        let stored = state.store.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AccountStatus::Rejected);
    }

    #[tokio::test]
    async fn reject_with_reason_body_still_works() {
        let state = AppState::fake();
        let token = admin_token(&state).await;
        let user = pending_user(&state, "a@x.com").await;
        let app = build_app(state.clone());

        let res = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/admin/reject-user/{}", user.id))
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"reason":"incomplete profile"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        let stored = state.store.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AccountStatus::Rejected);
    }

    #[tokio::test]
    async fn non_admin_is_forbidden() {
        let state = AppState::fake();
        admin_token(&state).await;
        let user = pending_user(&state, "a@x.com").await;
        let user_token = JwtKeys::from_ref(&state).sign(user.id).unwrap();
        let app = build_app(state);

        let res = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/api/admin/pending-users")
                    .header(header::AUTHORIZATION, format!("Bearer {user_token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }
}
