use time::{format_description::well_known::Rfc3339, OffsetDateTime};

/// A rendered transactional email: subject plus html and plain-text bodies.
#[derive(Debug, Clone)]
pub struct EmailTemplate {
    pub subject: String,
    pub html: String,
    pub text: String,
}

pub fn verification_email(first_name: &str, verification_link: &str) -> EmailTemplate {
    EmailTemplate {
        subject: "Verify Your Email Address - SecureAuth".into(),
        html: format!(
            r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h1>Welcome, {first_name}!</h1>
  <p>Thank you for registering with SecureAuth. Please verify your email address:</p>
  <p><a href="{verification_link}">Verify Email Address</a></p>
  <p>If the link doesn't work, copy and paste it into your browser:</p>
  <p>{verification_link}</p>
  <p>If you did not request this email, you can safely ignore it.</p>
</div>"#
        ),
        text: format!(
            "Welcome, {first_name}!\n\nPlease verify your email by visiting: {verification_link}\n\n\
             If you did not request this, please ignore this email."
        ),
    }
}

pub fn approval_email(first_name: &str, last_name: &str, login_link: &str) -> EmailTemplate {
    EmailTemplate {
        subject: "Account Approved - Welcome to SecureAuth!".into(),
        html: format!(
            r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h1>Congratulations, {first_name} {last_name}!</h1>
  <p>Your account has been approved. You can now log in:</p>
  <p><a href="{login_link}">Login Now</a></p>
  <p>Thank you for joining SecureAuth!</p>
</div>"#
        ),
        text: format!(
            "Congratulations, {first_name} {last_name}!\n\nYour account has been approved!\n\
             Login: {login_link}\n\nThank you for joining SecureAuth!"
        ),
    }
}

pub fn rejection_email(first_name: &str, reason: Option<&str>) -> EmailTemplate {
    let html_reason = reason
        .map(|r| format!("<p><strong>Reason:</strong> {r}</p>"))
        .unwrap_or_default();
    let text_reason = reason.map(|r| format!("\nReason: {r}")).unwrap_or_default();
    EmailTemplate {
        subject: "Account Application Update - SecureAuth".into(),
        html: format!(
            r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h1>Hello {first_name},</h1>
  <p>We appreciate your interest in SecureAuth. Unfortunately, your account
  application was not approved at this time.</p>
  {html_reason}
  <p>If you have any questions or believe this was a mistake, please reach out
  to our support team.</p>
</div>"#
        ),
        text: format!(
            "Hello {first_name},\n\nUnfortunately, your application was not approved.{text_reason}\n\n\
             If you have questions, please contact our support team."
        ),
    }
}

pub fn admin_notification_email(
    admin_name: &str,
    user_name: &str,
    user_email: &str,
    registered_at: OffsetDateTime,
    admin_panel_link: &str,
) -> EmailTemplate {
    let registered = registered_at
        .format(&Rfc3339)
        .unwrap_or_else(|_| registered_at.to_string());
    EmailTemplate {
        subject: "New User Registration Pending Approval - SecureAuth".into(),
        html: format!(
            r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h1>Hello {admin_name},</h1>
  <p>A new user has registered and is awaiting approval:</p>
  <p><strong>Name:</strong> {user_name}<br>
     <strong>Email:</strong> {user_email}<br>
     <strong>Registered At:</strong> {registered}</p>
  <p>Please log in to the admin panel to review and take action:</p>
  <p><a href="{admin_panel_link}">Open Admin Panel</a></p>
</div>"#
        ),
        text: format!(
            "Hello {admin_name},\n\nA new user is waiting for approval:\nName: {user_name}\n\
             Email: {user_email}\nRegistered At: {registered}\n\nAdmin Panel: {admin_panel_link}"
        ),
    }
}
