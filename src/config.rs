//! Application configuration parsed from environment variables.
//!
//! Required:
//! - `DATABASE_URL`
//!
//! Optional:
//! - `PORT`: default 3000
//! - `ADMIN_EMAILS`: comma-separated admin allow-list
//! - `NOTIFY_EMAILS`: comma-separated notification recipients (default: admin allow-list)
//! - `PUBLIC_BASE_URL`: default `http://localhost:3000`
//! - `RESEND_API_KEY` / `RESEND_FROM`: email delivery, disabled without a key
//! - `COOKIE_SECURE`: inferred from `PUBLIC_BASE_URL` when unset
//! - `DB_MAX_CONNECTIONS`: default 5

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_RESEND_FROM: &str = "Leads Desk <onboarding@resend.dev>";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env var {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Lower-cased admin email allow-list.
///
/// Gates the admin role at the application layer; the store's own access
/// rules are the real boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminAllowList(Vec<String>);

impl AdminAllowList {
    #[must_use]
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            emails
                .into_iter()
                .map(|e| e.as_ref().trim().to_ascii_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        )
    }

    #[must_use]
    pub fn parse(raw: &str) -> Self {
        Self::new(raw.split(','))
    }

    #[must_use]
    pub fn contains(&self, email: &str) -> bool {
        let needle = email.trim().to_ascii_lowercase();
        self.0.iter().any(|e| *e == needle)
    }

    #[must_use]
    pub fn emails(&self) -> &[String] {
        &self.0
    }
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub api_key: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub db_max_connections: u32,
    pub admins: AdminAllowList,
    pub notify_recipients: Vec<String>,
    pub public_base_url: String,
    pub cookie_secure: bool,
    pub mail: Option<MailConfig>,
}

impl AppConfig {
    /// Build typed config from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error when `DATABASE_URL` is missing or a numeric value does
    /// not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;
        let port = env_parse("PORT", DEFAULT_PORT)?;
        let db_max_connections = env_parse("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?;

        let admins = AdminAllowList::parse(&std::env::var("ADMIN_EMAILS").unwrap_or_default());
        let notify_recipients = match std::env::var("NOTIFY_EMAILS") {
            Ok(raw) => AdminAllowList::parse(&raw).emails().to_vec(),
            Err(_) => admins.emails().to_vec(),
        };

        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_PUBLIC_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let cookie_secure = env_bool("COOKIE_SECURE").unwrap_or_else(|| public_base_url.starts_with("https://"));

        let mail = std::env::var("RESEND_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .map(|api_key| MailConfig {
                api_key,
                from: std::env::var("RESEND_FROM").unwrap_or_else(|_| DEFAULT_RESEND_FROM.to_string()),
            });

        Ok(Self {
            database_url,
            port,
            db_max_connections,
            admins,
            notify_recipients,
            public_base_url,
            cookie_secure,
            mail,
        })
    }
}

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

fn env_parse<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
