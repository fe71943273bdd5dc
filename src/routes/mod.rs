//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the JSON API and the realtime websocket under a single
//! Axum router. Public endpoints (health, lead forms for work applications,
//! footer links) need no session; everything else goes through the
//! `AuthUser` or `AdminUser` extractors in `auth`.

pub mod analysis;
pub mod applications;
pub mod auth;
pub mod dashboard;
pub mod forms;
pub mod leads;
pub mod messages;
pub mod realtime;
pub mod social;

use axum::Router;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{delete, get, patch, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::services::applications::CrmError;
use crate::state::AppState;
use crate::validation::FieldErrors;

/// Full API router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/signin", post(auth::signin))
        .route("/api/auth/signout", post(auth::signout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/forgot-password", post(auth::forgot_password))
        .route("/api/auth/reset-password", post(auth::reset_password))
        .route("/api/forms/buy", post(forms::submit_buy))
        .route("/api/forms/sell", post(forms::submit_sell))
        .route("/api/forms/work", post(forms::submit_work))
        .route("/api/applications", get(applications::list))
        .route("/api/applications/export.csv", get(applications::export_csv))
        .route("/api/applications/pivot", get(applications::pivot))
        .route("/api/applications/{id}", patch(applications::update_status))
        .route("/api/dashboard/kpis", get(applications::kpis))
        .route("/api/dashboard/charts", get(applications::charts))
        .route("/api/leads", get(leads::list))
        .route("/api/leads/{lead_type}/{id}", patch(leads::update_status))
        .route("/api/leads/{lead_type}/{id}/notes", get(leads::list_notes).post(leads::add_note))
        .route("/api/notes/{id}", delete(leads::delete_note))
        .route("/api/messages", get(messages::my_thread).post(messages::send))
        .route("/api/admin/conversations", get(messages::conversations))
        .route(
            "/api/admin/conversations/{user_id}",
            get(messages::admin_thread).post(messages::reply),
        )
        .route("/api/social-links", get(social::list_public))
        .route("/api/admin/social-links", get(social::list_all).put(social::update))
        .route("/api/guest/dashboard", get(dashboard::guest))
        .route("/api/analysis", post(analysis::analyze))
        .route("/api/admin/summary-report", post(analysis::summary_report))
        .route("/api/realtime", get(realtime::handle_ws))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

// =============================================================================
// ERROR RESPONSES
// =============================================================================

/// `{ "error": message }` with the given status.
pub(crate) fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

/// 422 with `{ "errors": { field: message } }`.
pub(crate) fn validation_response(errors: FieldErrors) -> Response {
    (StatusCode::UNPROCESSABLE_ENTITY, Json(errors)).into_response()
}

/// Log the cause and answer a bare 500.
pub(crate) fn internal_error(context: &str, err: &dyn std::fmt::Display) -> Response {
    tracing::error!(error = %err, context, "request failed");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

pub(crate) fn crm_error_response(err: CrmError) -> Response {
    match err {
        CrmError::NotFound(_) => error_response(StatusCode::NOT_FOUND, "Not found"),
        CrmError::InvalidStatus(_) | CrmError::InvalidType(_) => error_response(StatusCode::BAD_REQUEST, err.to_string()),
        CrmError::Db(_) => internal_error("crm", &err),
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
