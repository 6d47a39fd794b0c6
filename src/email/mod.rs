use axum::async_trait;

pub mod smtp;
pub mod templates;

pub use smtp::SmtpMailer;
pub use templates::EmailTemplate;

/// Outbound email boundary. The lifecycle engine only ever asks to send a
/// rendered template to an address; delivery failures are the caller's to
/// log, never to escalate.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, template: EmailTemplate) -> anyhow::Result<()>;
}

/// Mailer that drops everything, for environments without SMTP.
pub struct NullMailer;

#[async_trait]
impl Mailer for NullMailer {
    async fn send(&self, _to: &str, _template: EmailTemplate) -> anyhow::Result<()> {
        Ok(())
    }
}
