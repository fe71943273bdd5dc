mod config;
mod crm;
mod db;
mod frame;
mod llm;
mod model;
mod rate_limit;
mod routes;
mod services;
mod state;
mod validation;

use std::sync::Arc;

use crate::llm::LlmChat;
use crate::services::notify::{Mailer, Notifier, ResendMailer};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let config = config::AppConfig::from_env().expect("invalid configuration");

    let pool = db::init_pool(&config.database_url, config.db_max_connections)
        .await
        .expect("database init failed");

    // Initialize LLM client (non-fatal: AI features disabled if config missing).
    let llm: Option<Arc<dyn LlmChat>> = match llm::LlmClient::from_env() {
        Ok(client) => {
            tracing::info!(model = client.model(), "LLM client initialized");
            Some(Arc::new(client))
        }
        Err(e) => {
            tracing::warn!(error = %e, "LLM client not configured; AI analysis disabled");
            None
        }
    };

    let mailer: Option<Arc<dyn Mailer>> = match &config.mail {
        Some(mail) => {
            tracing::info!(from = %mail.from, recipients = config.notify_recipients.len(), "email notifications enabled");
            Some(Arc::new(ResendMailer::new(&mail.api_key, mail.from.clone())))
        }
        None => {
            tracing::warn!("RESEND_API_KEY not set; email notifications disabled");
            None
        }
    };
    let notifier = Notifier::new(mailer, config.notify_recipients.clone());

    let state = state::AppState::new(pool, &config, llm, notifier);

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .expect("failed to bind");

    tracing::info!(port = config.port, "leaddesk listening");
    axum::serve(listener, app).await.expect("server failed");
}
