use std::sync::Mutex;

use axum::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::model::{AccountStatus, Role, User};
use super::store::{NewUser, StoreError, UserFilter, UserStore};

/// In-memory user store mirroring the Postgres semantics, used by
/// `AppState::fake()` and the lifecycle tests. A single mutex stands in
/// for the database's single-row atomicity.
#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<Vec<User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn matches(user: &User, filter: UserFilter) -> bool {
        match filter {
            UserFilter::All => true,
            UserFilter::AwaitingApproval => {
                user.status == AccountStatus::Pending && user.email_verified
            }
            UserFilter::Status(status) => user.status == status,
            UserFilter::Verified => user.email_verified,
            UserFilter::Admins => user.role == Role::Admin,
        }
    }

    fn insert(users: &mut Vec<User>, new: NewUser) -> User {
        let user = User {
            id: Uuid::new_v4(),
            email: new.email,
            password_hash: new.password_hash,
            first_name: new.first_name,
            last_name: new.last_name,
            role: new.role,
            email_verified: new.email_verified,
            verification_token: new.verification_token,
            verification_expires: new.verification_expires,
            status: new.status,
            approved_at: None,
            approved_by: None,
            created_at: OffsetDateTime::now_utc(),
        };
        users.push(user.clone());
        user
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn list(&self, filter: UserFilter) -> Result<Vec<User>, StoreError> {
        let users = self.users.lock().unwrap();
        Ok(users
            .iter()
            .filter(|u| Self::matches(u, filter))
            .cloned()
            .collect())
    }

    async fn count(&self, filter: UserFilter) -> Result<i64, StoreError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().filter(|u| Self::matches(u, filter)).count() as i64)
    }

    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::DuplicateEmail);
        }
        Ok(Self::insert(&mut users, user))
    }

    async fn create_admin_if_none(&self, user: NewUser) -> Result<Option<User>, StoreError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.role == Role::Admin) {
            return Ok(None);
        }
        Ok(Some(Self::insert(&mut users, user)))
    }

    async fn consume_verification_token(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> Result<Option<User>, StoreError> {
        let mut users = self.users.lock().unwrap();
        let user = users.iter_mut().find(|u| {
            !u.email_verified
                && u.verification_token.as_deref() == Some(token)
                && u.verification_expires.is_some_and(|exp| exp > now)
        });
        Ok(user.map(|u| {
            u.email_verified = true;
            u.verification_token = None;
            u.verification_expires = None;
            u.clone()
        }))
    }

    async fn transition_status(
        &self,
        id: Uuid,
        to: AccountStatus,
        approved_by: Option<Uuid>,
        now: OffsetDateTime,
    ) -> Result<Option<User>, StoreError> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|u| u.id == id && u.status == AccountStatus::Pending);
        Ok(user.map(|u| {
            u.status = to;
            u.approved_by = approved_by;
            u.approved_at = approved_by.map(|_| now);
            u.clone()
        }))
    }
}
