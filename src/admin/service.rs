use serde::Serialize;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::password::hash_password;
use crate::auth::service::validate_new_account;
use crate::config::{AdminSeed, PublicUrls};
use crate::email::{templates, Mailer};
use crate::error::ApiError;
use crate::users::{AccountStatus, NewUser, Role, User, UserFilter, UserStore};

#[derive(Debug, Serialize)]
pub struct UserStats {
    pub total: i64,
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
    pub verified: i64,
}

/// Approve a pending user. The status change is a conditional update, so a
/// racing second approve (or a retry after success) gets `InvalidState`.
pub async fn approve(
    store: &dyn UserStore,
    mailer: &dyn Mailer,
    urls: &PublicUrls,
    user_id: Uuid,
    acting_admin_id: Uuid,
) -> Result<User, ApiError> {
    store
        .find_by_id(user_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    let user = store
        .transition_status(
            user_id,
            AccountStatus::Approved,
            Some(acting_admin_id),
            OffsetDateTime::now_utc(),
        )
        .await?
        .ok_or(ApiError::InvalidState)?;

    info!(user_id = %user.id, admin_id = %acting_admin_id, "user approved");

    let template =
        templates::approval_email(&user.first_name, &user.last_name, &urls.login_link());
    if let Err(e) = mailer.send(&user.email, template).await {
        warn!(error = %e, user_id = %user.id, "approval email failed");
    }

    Ok(user)
}

/// Reject a pending user, optionally carrying a human-readable reason into
/// the rejection email. Terminal: a rejected account never comes back.
pub async fn reject(
    store: &dyn UserStore,
    mailer: &dyn Mailer,
    user_id: Uuid,
    reason: Option<&str>,
) -> Result<User, ApiError> {
    store
        .find_by_id(user_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    let user = store
        .transition_status(
            user_id,
            AccountStatus::Rejected,
            None,
            OffsetDateTime::now_utc(),
        )
        .await?
        .ok_or(ApiError::InvalidState)?;

    info!(user_id = %user.id, "user rejected");

    let template = templates::rejection_email(&user.first_name, reason);
    if let Err(e) = mailer.send(&user.email, template).await {
        warn!(error = %e, user_id = %user.id, "rejection email failed");
    }

    Ok(user)
}

pub async fn list_users(store: &dyn UserStore) -> Result<Vec<User>, ApiError> {
    Ok(store.list(UserFilter::All).await?)
}

/// Users an admin can act on: pending and email-verified.
pub async fn pending_users(store: &dyn UserStore) -> Result<Vec<User>, ApiError> {
    Ok(store.list(UserFilter::AwaitingApproval).await?)
}

pub async fn stats(store: &dyn UserStore) -> Result<UserStats, ApiError> {
    Ok(UserStats {
        total: store.count(UserFilter::All).await?,
        pending: store.count(UserFilter::AwaitingApproval).await?,
        approved: store.count(UserFilter::Status(AccountStatus::Approved)).await?,
        rejected: store.count(UserFilter::Status(AccountStatus::Rejected)).await?,
        verified: store.count(UserFilter::Verified).await?,
    })
}

/// One-time bootstrap: create the canonical admin, already verified and
/// approved. The store's conditional insert keeps it single even under
/// concurrent calls.
pub async fn create_initial_admin(
    store: &dyn UserStore,
    first_name: &str,
    last_name: &str,
    email: &str,
    password: &str,
) -> Result<User, ApiError> {
    let email = email.trim().to_lowercase();
    validate_new_account(first_name, last_name, &email, password)?;

    let password_hash = hash_password(password).map_err(ApiError::Dependency)?;
    let admin = store
        .create_admin_if_none(NewUser {
            email,
            password_hash,
            first_name: first_name.trim().to_string(),
            last_name: last_name.trim().to_string(),
            role: Role::Admin,
            email_verified: true,
            verification_token: None,
            verification_expires: None,
            status: AccountStatus::Approved,
        })
        .await?
        .ok_or(ApiError::AdminAlreadyExists)?;

    info!(admin_id = %admin.id, email = %admin.email, "initial admin created");
    Ok(admin)
}

/// Startup seeding from ADMIN_EMAIL/ADMIN_PASSWORD. A no-op when an admin
/// already exists.
pub async fn seed_admin(store: &dyn UserStore, seed: &AdminSeed) -> anyhow::Result<()> {
    match create_initial_admin(
        store,
        &seed.first_name,
        &seed.last_name,
        &seed.email,
        &seed.password,
    )
    .await
    {
        Ok(admin) => {
            info!(admin_id = %admin.id, "admin seeded from environment");
            Ok(())
        }
        Err(ApiError::AdminAlreadyExists) => {
            info!("admin already exists, skipping seed");
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!(e)),
    }
}
