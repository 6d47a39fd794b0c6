use axum::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::model::{AccountStatus, Role, User};

/// Fields for a user about to be inserted; the store assigns id and
/// created_at.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub email_verified: bool,
    pub verification_token: Option<String>,
    pub verification_expires: Option<OffsetDateTime>,
    pub status: AccountStatus,
}

#[derive(Debug, Clone, Copy)]
pub enum UserFilter {
    All,
    /// status = pending AND email_verified, i.e. actionable by an admin.
    AwaitingApproval,
    Status(AccountStatus),
    Verified,
    Admins,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                return StoreError::DuplicateEmail;
            }
        }
        StoreError::Other(e.into())
    }
}

/// Persistence boundary for user records. The Postgres implementation backs
/// the server; an in-memory one backs the tests. Mutating methods carry
/// their transition condition so races are settled by the store, not by
/// check-then-act in the caller.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn list(&self, filter: UserFilter) -> Result<Vec<User>, StoreError>;

    async fn count(&self, filter: UserFilter) -> Result<i64, StoreError>;

    /// Insert a new user. The unique index on email decides duplicate
    /// registrations, including concurrent ones.
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;

    /// Insert an admin only if no admin row exists yet. Returns None when
    /// one does; two racing bootstraps cannot both succeed.
    async fn create_admin_if_none(&self, user: NewUser) -> Result<Option<User>, StoreError>;

    /// Atomically consume an unexpired verification token: mark the user
    /// verified and clear the token. Returns None on any miss, whether the
    /// token is unknown, expired or already spent.
    async fn consume_verification_token(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> Result<Option<User>, StoreError>;

    /// Transition a user out of pending. Returns None when the row is not
    /// pending anymore, so the loser of an approve/reject race sees it.
    async fn transition_status(
        &self,
        id: Uuid,
        to: AccountStatus,
        approved_by: Option<Uuid>,
        now: OffsetDateTime,
    ) -> Result<Option<User>, StoreError>;
}
