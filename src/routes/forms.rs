//! Lead-capture form routes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum_extra::extract::cookie::CookieJar;
use uuid::Uuid;

use super::auth::session_user;
use super::{error_response, internal_error, validation_response};
use crate::services::forms::{self, BuyForm, FormError, SellForm, Submission, WorkForm};
use crate::services::realtime::ChangeEvent;
use crate::state::AppState;
use crate::validation::FieldErrors;

pub(crate) fn form_error_response(err: FormError) -> Response {
    match err {
        FormError::Validation(errors) => validation_response(errors),
        FormError::SignInRequired => error_response(StatusCode::UNAUTHORIZED, err.to_string()),
        FormError::Db(_) => internal_error("form submission", &err),
    }
}

/// Signed-in user id, or `None` when there is no valid session.
async fn current_user_id(state: &AppState, jar: &CookieJar) -> Result<Option<Uuid>, Response> {
    session_user(state, jar)
        .await
        .map(|user| user.map(|u| u.user.id))
        .map_err(IntoResponse::into_response)
}

/// Persist, notify, and publish one validated submission.
async fn submit(state: &AppState, user_id: Option<Uuid>, validated: Result<Submission, FieldErrors>) -> Response {
    let submission = match validated {
        Ok(s) => s,
        Err(errors) => return validation_response(errors),
    };
    let recorded = match forms::record(&state.pool, user_id, &submission).await {
        Ok(r) => r,
        Err(e) => return form_error_response(e),
    };

    state.notifier.dispatch(submission.notification());

    let owners: Vec<Uuid> = user_id.into_iter().collect();
    state
        .realtime
        .publish(
            submission.kind.legacy_table(),
            ChangeEvent::Insert,
            serde_json::json!({ "id": recorded.legacy_id, "user_id": user_id }),
            &owners,
        )
        .await;
    state
        .realtime
        .publish_row("applications", ChangeEvent::Insert, &recorded.application, &owners)
        .await;

    (StatusCode::CREATED, Json(recorded.application)).into_response()
}

/// `POST /api/forms/buy`: signed-in users only.
pub async fn submit_buy(State(state): State<AppState>, jar: CookieJar, Json(form): Json<BuyForm>) -> Response {
    let user_id = match current_user_id(&state, &jar).await {
        Ok(Some(id)) => id,
        Ok(None) => return form_error_response(FormError::SignInRequired),
        Err(resp) => return resp,
    };
    submit(&state, Some(user_id), form.validate()).await
}

/// `POST /api/forms/sell`: signed-in users only.
pub async fn submit_sell(State(state): State<AppState>, jar: CookieJar, Json(form): Json<SellForm>) -> Response {
    let user_id = match current_user_id(&state, &jar).await {
        Ok(Some(id)) => id,
        Ok(None) => return form_error_response(FormError::SignInRequired),
        Err(resp) => return resp,
    };
    submit(&state, Some(user_id), form.validate()).await
}

/// `POST /api/forms/work`: open to anyone; linked to the user when signed in.
pub async fn submit_work(State(state): State<AppState>, jar: CookieJar, Json(form): Json<WorkForm>) -> Response {
    let user_id = match current_user_id(&state, &jar).await {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    submit(&state, user_id, form.validate()).await
}
