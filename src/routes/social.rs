//! Footer social links.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

use super::auth::AdminUser;
use super::{error_response, internal_error, validation_response};
use crate::services::realtime::ChangeEvent;
use crate::services::social::{self, SocialError, SocialLinkUpdate};
use crate::state::AppState;

pub(crate) fn social_error_response(err: SocialError) -> Response {
    match err {
        SocialError::UnknownPlatform(_) => error_response(StatusCode::BAD_REQUEST, err.to_string()),
        SocialError::Validation(errors) => validation_response(errors),
        SocialError::Db(_) => internal_error("social links", &err),
    }
}

/// `GET /api/social-links`: enabled links with a URL.
pub async fn list_public(State(state): State<AppState>) -> Response {
    match social::list_public(&state.pool).await {
        Ok(links) => Json(links).into_response(),
        Err(e) => social_error_response(e),
    }
}

/// `GET /api/admin/social-links`: all five platforms.
pub async fn list_all(State(state): State<AppState>, _admin: AdminUser) -> Response {
    match social::list_all(&state.pool).await {
        Ok(links) => Json(links).into_response(),
        Err(e) => social_error_response(e),
    }
}

/// `PUT /api/admin/social-links`: batch update `url` and `enabled`.
pub async fn update(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(body): Json<Vec<SocialLinkUpdate>>,
) -> Response {
    let updates = match social::validate_updates(&body) {
        Ok(u) => u,
        Err(e) => return social_error_response(e),
    };
    match social::apply_updates(&state.pool, &updates).await {
        Ok(links) => {
            tracing::info!(admin_id = %admin.user.id, count = updates.len(), "social links updated");
            for link in links.iter().filter(|l| updates.iter().any(|u| u.platform == l.id)) {
                state
                    .realtime
                    .publish_row("social_links", ChangeEvent::Update, link, &[])
                    .await;
            }
            Json(links).into_response()
        }
        Err(e) => social_error_response(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::FieldErrors;

    #[test]
    fn social_errors_map_to_statuses() {
        let unknown = social_error_response(SocialError::UnknownPlatform("tiktok".into()));
        assert_eq!(unknown.status(), StatusCode::BAD_REQUEST);

        let mut errors = FieldErrors::new();
        errors.add("instagram", "Please enter a valid URL starting with http:// or https://");
        assert_eq!(social_error_response(errors.into()).status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
