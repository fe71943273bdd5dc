//! Guest ↔ admin messaging routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use uuid::Uuid;

use super::auth::{AdminUser, AuthUser};
use super::{crm_error_response, validation_response};
use crate::model::Message;
use crate::services::messages;
use crate::services::notify::Notification;
use crate::services::realtime::ChangeEvent;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NewMessage {
    #[serde(default)]
    pub content: String,
}

/// Admin inbox link for one guest's conversation.
pub(crate) fn conversation_path(user_id: Uuid) -> String {
    format!("/admin/messages?user={user_id}")
}

async fn publish(state: &AppState, message: &Message) {
    let mut owners = vec![message.sender_id];
    owners.extend(message.recipient_id);
    state
        .realtime
        .publish_row("messages", ChangeEvent::Insert, message, &owners)
        .await;
}

/// `GET /api/messages`: the caller's own thread, oldest first.
pub async fn my_thread(State(state): State<AppState>, auth: AuthUser) -> Response {
    match messages::thread(&state.pool, auth.user.id).await {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => crm_error_response(e),
    }
}

/// `POST /api/messages`: write to the admin team.
pub async fn send(State(state): State<AppState>, auth: AuthUser, Json(body): Json<NewMessage>) -> Response {
    let content = match messages::validate_content(&body.content) {
        Ok(c) => c,
        Err(errors) => return validation_response(errors),
    };
    let message = match messages::send_to_admins(&state.pool, auth.user.id, &content).await {
        Ok(m) => m,
        Err(e) => return crm_error_response(e),
    };

    state.notifier.dispatch(Notification::Message {
        sender_name: auth.user.full_name.clone(),
        sender_email: auth.user.email.clone(),
        content,
        conversation_url: state.link(&conversation_path(auth.user.id)),
    });
    publish(&state, &message).await;
    (StatusCode::CREATED, Json(message)).into_response()
}

/// `GET /api/admin/conversations`
pub async fn conversations(State(state): State<AppState>, _admin: AdminUser) -> Response {
    match messages::conversations(&state.pool).await {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => crm_error_response(e),
    }
}

/// `GET /api/admin/conversations/{user_id}`
pub async fn admin_thread(State(state): State<AppState>, _admin: AdminUser, Path(user_id): Path<Uuid>) -> Response {
    match messages::thread(&state.pool, user_id).await {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => crm_error_response(e),
    }
}

/// `POST /api/admin/conversations/{user_id}`: reply to one guest.
pub async fn reply(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(user_id): Path<Uuid>,
    Json(body): Json<NewMessage>,
) -> Response {
    let content = match messages::validate_content(&body.content) {
        Ok(c) => c,
        Err(errors) => return validation_response(errors),
    };
    match messages::reply(&state.pool, admin.user.id, user_id, &content).await {
        Ok(message) => {
            publish(&state, &message).await;
            (StatusCode::CREATED, Json(message)).into_response()
        }
        Err(e) => crm_error_response(e),
    }
}
