use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

/// Links embedded into outgoing emails.
#[derive(Debug, Clone, Deserialize)]
pub struct PublicUrls {
    pub frontend_url: String,
}

impl PublicUrls {
    pub fn verification_link(&self, token: &str) -> String {
        format!("{}/verify-email?token={}", self.frontend_url, token)
    }

    pub fn login_link(&self) -> String {
        format!("{}/login", self.frontend_url)
    }

    pub fn admin_panel_link(&self) -> String {
        format!("{}/admin", self.frontend_url)
    }
}

/// Optional startup admin seeding; skipped when an admin already exists.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub smtp: SmtpConfig,
    pub urls: PublicUrls,
    pub admin_seed: Option<AdminSeed>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "secureauth".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "secureauth-users".into()),
            // Login tokens live 7 days. Parsed unsigned so a negative
            // override cannot wrap into an enormous lifetime.
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|&v| v > 0)
                .unwrap_or(60 * 24 * 7),
        };
        let smtp_username = std::env::var("SMTP_USERNAME").unwrap_or_default();
        let smtp = SmtpConfig {
            host: std::env::var("SMTP_HOST").unwrap_or_else(|_| "smtp.gmail.com".into()),
            port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(587),
            from: std::env::var("EMAIL_FROM")
                .unwrap_or_else(|_| format!("SecureAuth <{smtp_username}>")),
            username: smtp_username,
            password: std::env::var("SMTP_PASSWORD").unwrap_or_default(),
        };
        let urls = PublicUrls {
            frontend_url: std::env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
        };
        let admin_seed = match (std::env::var("ADMIN_EMAIL"), std::env::var("ADMIN_PASSWORD")) {
            (Ok(email), Ok(password)) => Some(AdminSeed {
                email,
                password,
                first_name: std::env::var("ADMIN_FIRST_NAME").unwrap_or_else(|_| "Admin".into()),
                last_name: std::env::var("ADMIN_LAST_NAME").unwrap_or_else(|_| "User".into()),
            }),
            _ => None,
        };
        Ok(Self {
            database_url,
            jwt,
            smtp,
            urls,
            admin_seed,
        })
    }
}
