use axum::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::model::{AccountStatus, User};
use super::store::{NewUser, StoreError, UserFilter, UserStore};

const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, role, \
     email_verified, verification_token, verification_expires, status, \
     approved_at, approved_by, created_at";

/// Postgres-backed user store.
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn list(&self, filter: UserFilter) -> Result<Vec<User>, StoreError> {
        let base = format!("SELECT {USER_COLUMNS} FROM users");
        let users = match filter {
            UserFilter::All => {
                sqlx::query_as::<_, User>(&format!("{base} ORDER BY created_at DESC"))
                    .fetch_all(&self.pool)
                    .await?
            }
            UserFilter::AwaitingApproval => {
                sqlx::query_as::<_, User>(&format!(
                    "{base} WHERE status = 'pending' AND email_verified ORDER BY created_at DESC"
                ))
                .fetch_all(&self.pool)
                .await?
            }
            UserFilter::Status(status) => {
                sqlx::query_as::<_, User>(&format!(
                    "{base} WHERE status = $1 ORDER BY created_at DESC"
                ))
                .bind(status)
                .fetch_all(&self.pool)
                .await?
            }
            UserFilter::Verified => {
                sqlx::query_as::<_, User>(&format!(
                    "{base} WHERE email_verified ORDER BY created_at DESC"
                ))
                .fetch_all(&self.pool)
                .await?
            }
            UserFilter::Admins => {
                sqlx::query_as::<_, User>(&format!(
                    "{base} WHERE role = 'admin' ORDER BY created_at DESC"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(users)
    }

    async fn count(&self, filter: UserFilter) -> Result<i64, StoreError> {
        let sql = match filter {
            UserFilter::All => "SELECT COUNT(*) FROM users".to_string(),
            UserFilter::AwaitingApproval => {
                "SELECT COUNT(*) FROM users WHERE status = 'pending' AND email_verified".to_string()
            }
            UserFilter::Status(_) => "SELECT COUNT(*) FROM users WHERE status = $1".to_string(),
            UserFilter::Verified => "SELECT COUNT(*) FROM users WHERE email_verified".to_string(),
            UserFilter::Admins => "SELECT COUNT(*) FROM users WHERE role = 'admin'".to_string(),
        };
        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        if let UserFilter::Status(status) = filter {
            query = query.bind(status);
        }
        Ok(query.fetch_one(&self.pool).await?)
    }

    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let created = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, password_hash, first_name, last_name, role,
                               email_verified, verification_token, verification_expires, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.role)
        .bind(user.email_verified)
        .bind(&user.verification_token)
        .bind(user.verification_expires)
        .bind(user.status)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn create_admin_if_none(&self, user: NewUser) -> Result<Option<User>, StoreError> {
        // Conditional insert so two concurrent bootstraps cannot both win.
        let created = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, password_hash, first_name, last_name, role,
                               email_verified, verification_token, verification_expires, status)
            SELECT $1, $2, $3, $4, $5, $6, $7, $8, $9
            WHERE NOT EXISTS (SELECT 1 FROM users WHERE role = 'admin')
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.role)
        .bind(user.email_verified)
        .bind(&user.verification_token)
        .bind(user.verification_expires)
        .bind(user.status)
        .fetch_optional(&self.pool)
        .await?;
        Ok(created)
    }

    async fn consume_verification_token(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET email_verified = TRUE, verification_token = NULL, verification_expires = NULL
            WHERE verification_token = $1 AND verification_expires > $2 AND NOT email_verified
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(token)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn transition_status(
        &self,
        id: Uuid,
        to: AccountStatus,
        approved_by: Option<Uuid>,
        now: OffsetDateTime,
    ) -> Result<Option<User>, StoreError> {
        let approved_at = approved_by.map(|_| now);
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET status = $2, approved_at = $3, approved_by = $4
            WHERE id = $1 AND status = 'pending'
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(to)
        .bind(approved_at)
        .bind(approved_by)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }
}
