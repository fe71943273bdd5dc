//! Guest dashboard.

use axum::extract::State;
use axum::response::{IntoResponse, Json, Response};

use super::auth::AuthUser;
use super::crm_error_response;
use crate::services::dashboard;
use crate::state::AppState;

/// `GET /api/guest/dashboard`: the caller's submission counts and thread.
pub async fn guest(State(state): State<AppState>, auth: AuthUser) -> Response {
    match dashboard::load(&state.pool, auth.user.id).await {
        Ok(view) => Json(view).into_response(),
        Err(e) => crm_error_response(e),
    }
}
