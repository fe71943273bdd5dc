//! Auth routes: password accounts, session cookie, password reset.

use axum::extract::{FromRef, FromRequestParts, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Json, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use super::{error_response, internal_error, validation_response};
use crate::services::auth::{self as auth_svc, AuthError, Role};
use crate::services::notify::Notification;
use crate::services::session;
use crate::state::AppState;

pub(crate) const COOKIE_NAME: &str = "session_token";

// =============================================================================
// AUTH EXTRACTORS
// =============================================================================

/// Authenticated user extracted from the session cookie.
/// Use as a handler parameter to require authentication.
pub struct AuthUser {
    pub user: session::SessionUser,
    pub token: String,
    /// Effective role after checking the admin allow-list.
    pub role: Role,
}

impl AuthUser {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let app_state = AppState::from_ref(state);
        session_user(&app_state, &jar).await?.ok_or(StatusCode::UNAUTHORIZED)
    }
}

/// Resolve the session cookie, if any. Used directly by endpoints where
/// signing in is optional.
pub(crate) async fn session_user(state: &AppState, jar: &CookieJar) -> Result<Option<AuthUser>, StatusCode> {
    let token = jar.get(COOKIE_NAME).map(Cookie::value).unwrap_or_default();
    if token.is_empty() {
        return Ok(None);
    }

    let user = session::validate_session(&state.pool, token).await.map_err(|e| {
        tracing::error!(error = %e, "session validation failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(user.map(|user| {
        let role = auth_svc::resolve_role(&user.stored_role, &user.email, &state.admins);
        AuthUser { user, token: token.to_owned(), role }
    }))
}

/// Authenticated user holding the effective admin role. Rejects guests with 403.
pub struct AdminUser(pub AuthUser);

impl<S> FromRequestParts<S> for AdminUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;
        if !auth.is_admin() {
            return Err(StatusCode::FORBIDDEN);
        }
        Ok(Self(auth))
    }
}

// =============================================================================
// COOKIES
// =============================================================================

fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

fn cleared_session_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(Duration::ZERO)
        .build()
}

// =============================================================================
// ERRORS
// =============================================================================

pub(crate) fn auth_error_response(err: AuthError) -> Response {
    match err {
        AuthError::Validation(errors) => validation_response(errors),
        AuthError::EmailTaken => error_response(StatusCode::CONFLICT, err.to_string()),
        AuthError::InvalidCredentials => error_response(StatusCode::UNAUTHORIZED, err.to_string()),
        AuthError::InvalidResetToken => error_response(StatusCode::BAD_REQUEST, err.to_string()),
        AuthError::PasswordHash(_) | AuthError::Db(_) => internal_error("auth", &err),
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub role: Role,
    pub is_admin: bool,
}

impl MeResponse {
    fn new(id: Uuid, email: String, full_name: Option<String>, role: Role) -> Self {
        Self { id, email, full_name, role, is_admin: role == Role::Admin }
    }
}

/// Body plus a fresh session cookie.
fn signed_in_response(status: StatusCode, token: String, secure: bool, me: MeResponse) -> Response {
    let jar = CookieJar::new().add(session_cookie(token, secure));
    (status, jar, Json(me)).into_response()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub full_name: Option<String>,
}

/// `POST /api/auth/signup`: create the account and sign it in.
pub async fn signup(State(state): State<AppState>, Json(body): Json<SignUpRequest>) -> Response {
    let input = match auth_svc::validate_sign_up(&body.email, &body.password, body.full_name.as_deref()) {
        Ok(input) => input,
        Err(errors) => return validation_response(errors),
    };
    let account = match auth_svc::sign_up(&state.pool, &state.admins, &input).await {
        Ok(account) => account,
        Err(e) => return auth_error_response(e),
    };
    let token = match session::create_session(&state.pool, account.user_id).await {
        Ok(t) => t,
        Err(e) => return internal_error("session creation", &e),
    };

    state.notifier.dispatch(Notification::Signup {
        full_name: account.full_name.clone(),
        email: account.email.clone(),
        at: OffsetDateTime::now_utc(),
    });

    let me = MeResponse::new(account.user_id, account.email, account.full_name, account.role);
    signed_in_response(StatusCode::CREATED, token, state.cookie_secure, me)
}

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// `POST /api/auth/signin`: verify credentials, set the session cookie.
pub async fn signin(State(state): State<AppState>, Json(body): Json<SignInRequest>) -> Response {
    let email = match auth_svc::validate_sign_in(&body.email, &body.password) {
        Ok(email) => email,
        Err(errors) => return validation_response(errors),
    };
    let user_id = match auth_svc::sign_in(&state.pool, &email, &body.password).await {
        Ok(id) => id,
        Err(e) => return auth_error_response(e),
    };
    let token = match session::create_session(&state.pool, user_id).await {
        Ok(t) => t,
        Err(e) => return internal_error("session creation", &e),
    };
    let user = match session::validate_session(&state.pool, &token).await {
        Ok(Some(user)) => user,
        Ok(None) => return StatusCode::UNAUTHORIZED.into_response(),
        Err(e) => return internal_error("session lookup", &e),
    };

    tracing::info!(%user_id, "signed in");
    let role = auth_svc::resolve_role(&user.stored_role, &user.email, &state.admins);
    let me = MeResponse::new(user.id, user.email, user.full_name, role);
    signed_in_response(StatusCode::OK, token, state.cookie_secure, me)
}

/// `GET /api/auth/me`: return current user.
pub async fn me(auth: AuthUser) -> Json<MeResponse> {
    let AuthUser { user, role, .. } = auth;
    Json(MeResponse::new(user.id, user.email, user.full_name, role))
}

/// `POST /api/auth/signout`: delete session, clear cookie.
pub async fn signout(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    if let Err(e) = session::delete_session(&state.pool, &auth.token).await {
        tracing::warn!(error = %e, user_id = %auth.user.id, "session delete failed");
    }
    let jar = CookieJar::new().add(cleared_session_cookie(state.cookie_secure));
    (jar, StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub email: String,
}

/// `POST /api/auth/forgot-password`: email a reset link. Answers 204 whether
/// or not the address is registered.
pub async fn forgot_password(State(state): State<AppState>, Json(body): Json<ForgotPasswordRequest>) -> Response {
    match auth_svc::request_password_reset(&state.pool, &body.email).await {
        Ok(Some((email, token))) => {
            let reset_url = state.link(&format!("/reset-password?token={token}"));
            state.notifier.dispatch(Notification::PasswordReset { email, reset_url });
            StatusCode::NO_CONTENT.into_response()
        }
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => auth_error_response(e),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

/// `POST /api/auth/reset-password`: consume the token and set a new password.
pub async fn reset_password(State(state): State<AppState>, Json(body): Json<ResetPasswordRequest>) -> Response {
    match auth_svc::reset_password(&state.pool, &body.token, &body.password, &body.confirm_password).await {
        Ok(user_id) => {
            tracing::info!(%user_id, "password reset");
            let jar = CookieJar::new().add(cleared_session_cookie(state.cookie_secure));
            (jar, StatusCode::NO_CONTENT).into_response()
        }
        Err(e) => auth_error_response(e),
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
