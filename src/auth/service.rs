use lazy_static::lazy_static;
use rand::RngCore;
use regex::Regex;
use time::{Duration, OffsetDateTime};
use tracing::{info, warn};
use uuid::Uuid;

use super::dto::{JwtKeys, LoginRequest, RegisterRequest};
use super::password::{hash_password, verify_password};
use crate::config::PublicUrls;
use crate::email::{templates, Mailer};
use crate::error::ApiError;
use crate::users::{AccountStatus, NewUser, Role, User, UserFilter, UserStore};

const VERIFICATION_TOKEN_TTL_HOURS: i64 = 24;
const MIN_PASSWORD_LEN: usize = 6;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn validate_new_account(
    first_name: &str,
    last_name: &str,
    email: &str,
    password: &str,
) -> Result<(), ApiError> {
    if first_name.trim().is_empty() || last_name.trim().is_empty() {
        return Err(ApiError::Validation("All fields are required.".into()));
    }
    if !is_valid_email(email) {
        return Err(ApiError::Validation("Invalid email".into()));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// 32 random bytes, hex-encoded.
fn generate_verification_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Register a new account: pending, unverified, holding a fresh
/// verification token. Emails are best-effort; the created user is
/// returned even when dispatch fails.
pub async fn register(
    store: &dyn UserStore,
    mailer: &dyn Mailer,
    urls: &PublicUrls,
    req: RegisterRequest,
) -> Result<User, ApiError> {
    let email = req.email.trim().to_lowercase();
    validate_new_account(&req.first_name, &req.last_name, &email, &req.password)?;

    let password_hash = hash_password(&req.password).map_err(ApiError::Dependency)?;
    let token = generate_verification_token();
    let expires = OffsetDateTime::now_utc() + Duration::hours(VERIFICATION_TOKEN_TTL_HOURS);

    // The unique index on email settles concurrent duplicates.
    let user = store
        .create(NewUser {
            email,
            password_hash,
            first_name: req.first_name.trim().to_string(),
            last_name: req.last_name.trim().to_string(),
            role: Role::User,
            email_verified: false,
            verification_token: Some(token.clone()),
            verification_expires: Some(expires),
            status: AccountStatus::Pending,
        })
        .await?;

    info!(user_id = %user.id, email = %user.email, "user registered");

    let template = templates::verification_email(&user.first_name, &urls.verification_link(&token));
    if let Err(e) = mailer.send(&user.email, template).await {
        warn!(error = %e, user_id = %user.id, "verification email failed");
    }

    notify_admins(store, mailer, urls, &user).await;

    Ok(user)
}

/// Tell every admin a registration is waiting. Never fails the caller;
/// the user row is already committed.
async fn notify_admins(store: &dyn UserStore, mailer: &dyn Mailer, urls: &PublicUrls, user: &User) {
    let admins = match store.list(UserFilter::Admins).await {
        Ok(admins) => admins,
        Err(e) => {
            warn!(error = %e, "could not list admins for notification");
            return;
        }
    };
    let user_name = format!("{} {}", user.first_name, user.last_name);
    for admin in admins {
        let template = templates::admin_notification_email(
            &admin.first_name,
            &user_name,
            &user.email,
            user.created_at,
            &urls.admin_panel_link(),
        );
        if let Err(e) = mailer.send(&admin.email, template).await {
            warn!(error = %e, admin_id = %admin.id, "admin notification email failed");
        }
    }
}

/// Consume a verification token. Unknown, expired and already-spent tokens
/// are indistinguishable to the caller.
pub async fn verify_email(store: &dyn UserStore, token: &str) -> Result<User, ApiError> {
    let user = store
        .consume_verification_token(token, OffsetDateTime::now_utc())
        .await?
        .ok_or(ApiError::InvalidOrExpiredToken)?;
    info!(user_id = %user.id, "email verified");
    Ok(user)
}

/// Authenticate and issue a bearer token. Only verified, approved accounts
/// get one; unknown email and wrong password share an error.
pub async fn login(
    store: &dyn UserStore,
    keys: &JwtKeys,
    req: LoginRequest,
) -> Result<(String, User), ApiError> {
    let email = req.email.trim().to_lowercase();

    let user = store
        .find_by_email(&email)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    let ok = verify_password(&req.password, &user.password_hash).map_err(ApiError::Dependency)?;
    if !ok {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    if !user.email_verified {
        return Err(ApiError::EmailNotVerified);
    }
    match user.status {
        AccountStatus::Pending => return Err(ApiError::PendingApproval),
        AccountStatus::Rejected => return Err(ApiError::Rejected),
        AccountStatus::Approved => {}
    }

    let token = keys.sign(user.id).map_err(ApiError::Dependency)?;
    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok((token, user))
}

/// Resolve an authenticated user id to its record. A valid token for a
/// vanished user is treated as unauthenticated.
pub async fn current_user(store: &dyn UserStore, user_id: Uuid) -> Result<User, ApiError> {
    store
        .find_by_id(user_id)
        .await?
        .ok_or(ApiError::Unauthenticated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::service as admin_service;
    use crate::users::memory::MemoryUserStore;
    use axum::{async_trait, extract::FromRef};
    use std::sync::Mutex;

    use crate::email::EmailTemplate;
    use crate::state::AppState;

    /// Mailer that records every send for assertions.
    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<(String, EmailTemplate)>>,
    }

    impl RecordingMailer {
        fn sent_to(&self) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|(to, _)| to.clone())
                .collect()
        }

        fn subjects(&self) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|(_, t)| t.subject.clone())
                .collect()
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, to: &str, template: EmailTemplate) -> anyhow::Result<()> {
            self.sent.lock().unwrap().push((to.into(), template));
            Ok(())
        }
    }

    /// Mailer whose relay is always down.
    struct FailingMailer;

    #[async_trait]
    impl Mailer for FailingMailer {
        async fn send(&self, _to: &str, _template: EmailTemplate) -> anyhow::Result<()> {
            anyhow::bail!("connection refused")
        }
    }

    fn urls() -> PublicUrls {
        PublicUrls {
            frontend_url: "http://localhost:3000".into(),
        }
    }

    fn keys() -> JwtKeys {
        JwtKeys::from_ref(&AppState::fake())
    }

    fn register_req(email: &str) -> RegisterRequest {
        RegisterRequest {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: email.into(),
            password: "secret1".into(),
        }
    }

    fn login_req(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn register_creates_pending_unverified_user_with_live_token() {
        let store = MemoryUserStore::new();
        let mailer = RecordingMailer::default();

        let user = register(&store, &mailer, &urls(), register_req("a@x.com"))
            .await
            .unwrap();

        assert_eq!(user.status, AccountStatus::Pending);
        assert!(!user.email_verified);
        assert!(user.verification_token.is_some());
        assert!(user.verification_expires.unwrap() > OffsetDateTime::now_utc());
        assert_ne!(user.password_hash, "secret1");
        assert_eq!(mailer.sent_to(), vec!["a@x.com".to_string()]);
    }

    #[tokio::test]
    async fn register_lowercases_email() {
        let store = MemoryUserStore::new();
        let mailer = RecordingMailer::default();
        let user = register(&store, &mailer, &urls(), register_req("Ada@X.Com"))
            .await
            .unwrap();
        assert_eq!(user.email, "ada@x.com");
    }

    #[tokio::test]
    async fn register_rejects_bad_input() {
        let store = MemoryUserStore::new();
        let mailer = RecordingMailer::default();

        let mut req = register_req("a@x.com");
        req.first_name = " ".into();
        assert!(matches!(
            register(&store, &mailer, &urls(), req).await,
            Err(ApiError::Validation(_))
        ));

        let req = register_req("not-an-email");
        assert!(matches!(
            register(&store, &mailer, &urls(), req).await,
            Err(ApiError::Validation(_))
        ));

        let mut req = register_req("a@x.com");
        req.password = "short".into();
        assert!(matches!(
            register(&store, &mailer, &urls(), req).await,
            Err(ApiError::Validation(_))
        ));
        assert_eq!(store.count(UserFilter::All).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn second_registration_with_same_email_is_duplicate() {
        let store = MemoryUserStore::new();
        let mailer = RecordingMailer::default();

        register(&store, &mailer, &urls(), register_req("a@x.com"))
            .await
            .unwrap();
        let err = register(&store, &mailer, &urls(), register_req("a@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::DuplicateEmail));
    }

    #[tokio::test]
    async fn email_failure_does_not_roll_back_registration() {
        let store = MemoryUserStore::new();

        let user = register(&store, &FailingMailer, &urls(), register_req("a@x.com"))
            .await
            .unwrap();
        assert!(store.find_by_id(user.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn registration_notifies_existing_admins() {
        let store = MemoryUserStore::new();
        let mailer = RecordingMailer::default();
        admin_service::create_initial_admin(
            &store,
            "Root",
            "Admin",
            "root@x.com",
            "rootpass",
        )
        .await
        .unwrap();

        register(&store, &mailer, &urls(), register_req("a@x.com"))
            .await
            .unwrap();

        let recipients = mailer.sent_to();
        assert!(recipients.contains(&"a@x.com".to_string()));
        assert!(recipients.contains(&"root@x.com".to_string()));
        assert!(mailer
            .subjects()
            .iter()
            .any(|s| s.contains("Pending Approval")));
    }

    #[tokio::test]
    async fn verify_email_is_single_use_and_uniform_on_misses() {
        let store = MemoryUserStore::new();
        let mailer = RecordingMailer::default();

        let user = register(&store, &mailer, &urls(), register_req("a@x.com"))
            .await
            .unwrap();
        let token = user.verification_token.unwrap();

        let verified = verify_email(&store, &token).await.unwrap();
        assert!(verified.email_verified);
        assert!(verified.verification_token.is_none());

        // Replay and never-existed tokens fail identically.
        let replay = verify_email(&store, &token).await.unwrap_err();
        let unknown = verify_email(&store, "feedfacecafebeef").await.unwrap_err();
        assert!(matches!(replay, ApiError::InvalidOrExpiredToken));
        assert!(matches!(unknown, ApiError::InvalidOrExpiredToken));
    }

    #[tokio::test]
    async fn login_walks_the_whole_lifecycle() {
        let store = MemoryUserStore::new();
        let mailer = RecordingMailer::default();
        let keys = keys();

        let user = register(&store, &mailer, &urls(), register_req("a@x.com"))
            .await
            .unwrap();
        let token = user.verification_token.clone().unwrap();

        // Unverified
        let err = login(&store, &keys, login_req("a@x.com", "secret1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::EmailNotVerified));

        verify_email(&store, &token).await.unwrap();

        // Verified but still pending
        let err = login(&store, &keys, login_req("a@x.com", "secret1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::PendingApproval));

        let admin = admin_service::create_initial_admin(
            &store,
            "Root",
            "Admin",
            "root@x.com",
            "rootpass",
        )
        .await
        .unwrap();
        let approved = admin_service::approve(&store, &mailer, &urls(), user.id, admin.id)
            .await
            .unwrap();
        assert_eq!(approved.status, AccountStatus::Approved);

        let (jwt, logged_in) = login(&store, &keys, login_req("a@x.com", "secret1"))
            .await
            .unwrap();
        assert_eq!(keys.verify(&jwt).unwrap().sub, user.id);
        assert_eq!(logged_in.id, user.id);

        let json = serde_json::to_string(&crate::users::PublicUser::from(logged_in)).unwrap();
        assert!(!json.contains("passwordHash"));
        assert!(!json.contains("password_hash"));
    }

    #[tokio::test]
    async fn rejected_user_cannot_log_in() {
        let store = MemoryUserStore::new();
        let mailer = RecordingMailer::default();
        let keys = keys();

        let user = register(&store, &mailer, &urls(), register_req("a@x.com"))
            .await
            .unwrap();
        verify_email(&store, &user.verification_token.clone().unwrap())
            .await
            .unwrap();
        admin_service::reject(&store, &mailer, user.id, Some("incomplete profile"))
            .await
            .unwrap();

        let err = login(&store, &keys, login_req("a@x.com", "secret1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Rejected));
    }

    #[tokio::test]
    async fn login_hides_which_credential_was_wrong() {
        let store = MemoryUserStore::new();
        let mailer = RecordingMailer::default();
        let keys = keys();

        register(&store, &mailer, &urls(), register_req("a@x.com"))
            .await
            .unwrap();

        let unknown = login(&store, &keys, login_req("b@x.com", "secret1"))
            .await
            .unwrap_err();
        let wrong_pw = login(&store, &keys, login_req("a@x.com", "wrong-password"))
            .await
            .unwrap_err();
        assert_eq!(unknown.to_string(), wrong_pw.to_string());
    }

    #[tokio::test]
    async fn current_user_fails_for_vanished_user() {
        let store = MemoryUserStore::new();
        let err = current_user(&store, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated));
    }
}
