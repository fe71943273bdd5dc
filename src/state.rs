//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the database pool, the admin allow-list, the optional LLM and
//! mailer collaborators, and the realtime hub that fans change events out
//! to connected websocket clients.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::{AdminAllowList, AppConfig};
use crate::llm::LlmChat;
use crate::rate_limit::RateLimiter;
use crate::services::notify::Notifier;
use crate::services::realtime::RealtimeHub;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or Clone.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    /// Emails allowed to hold the admin role.
    pub admins: AdminAllowList,
    /// Origin used when building links in outgoing email.
    pub public_base_url: Arc<str>,
    pub cookie_secure: bool,
    /// Optional LLM client. `None` if LLM env vars are not configured.
    pub llm: Option<Arc<dyn LlmChat>>,
    pub notifier: Notifier,
    pub realtime: RealtimeHub,
    /// In-memory rate limiter for AI requests.
    pub rate_limiter: RateLimiter,
}

impl AppState {
    #[must_use]
    pub fn new(pool: PgPool, config: &AppConfig, llm: Option<Arc<dyn LlmChat>>, notifier: Notifier) -> Self {
        Self {
            pool,
            admins: config.admins.clone(),
            public_base_url: Arc::from(config.public_base_url.as_str()),
            cookie_secure: config.cookie_secure,
            llm,
            notifier,
            realtime: RealtimeHub::new(),
            rate_limiter: RateLimiter::new(),
        }
    }

    /// Absolute URL for an app path such as `/reset-password?token=..`.
    #[must_use]
    pub fn link(&self, path: &str) -> String {
        format!("{}{path}", self.public_base_url)
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
