use super::*;
use crate::validation::FieldErrors;

#[test]
fn session_cookie_is_http_only_lax() {
    let cookie = session_cookie("tok".into(), true);
    assert_eq!(cookie.name(), COOKIE_NAME);
    assert_eq!(cookie.value(), "tok");
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(cookie.secure(), Some(true));
    assert_eq!(cookie.same_site(), Some(SameSite::Lax));
    assert_eq!(cookie.path(), Some("/"));
}

#[test]
fn cleared_cookie_expires_immediately() {
    let cookie = cleared_session_cookie(false);
    assert_eq!(cookie.value(), "");
    assert_eq!(cookie.max_age(), Some(Duration::ZERO));
    assert_eq!(cookie.secure(), Some(false));
}

#[test]
fn auth_errors_map_to_statuses() {
    let mut errors = FieldErrors::new();
    errors.add("email", "Please enter a valid email address");
    assert_eq!(auth_error_response(errors.into()).status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(auth_error_response(AuthError::EmailTaken).status(), StatusCode::CONFLICT);
    assert_eq!(auth_error_response(AuthError::InvalidCredentials).status(), StatusCode::UNAUTHORIZED);
    assert_eq!(auth_error_response(AuthError::InvalidResetToken).status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        auth_error_response(AuthError::PasswordHash("boom".into())).status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[test]
fn me_response_flags_admin() {
    let admin = MeResponse::new(Uuid::nil(), "owner@example.com".into(), None, Role::Admin);
    assert!(admin.is_admin);
    let json = serde_json::to_value(&admin).unwrap();
    assert_eq!(json["role"], "admin");

    let guest = MeResponse::new(Uuid::nil(), "g@example.com".into(), Some("G".into()), Role::Guest);
    assert!(!guest.is_admin);
}

#[test]
fn signup_request_reads_camel_case() {
    let body: SignUpRequest =
        serde_json::from_str(r#"{"email":"a@b.co","password":"secret1","fullName":"Ana"}"#).unwrap();
    assert_eq!(body.full_name.as_deref(), Some("Ana"));
    let body: ResetPasswordRequest =
        serde_json::from_str(r#"{"token":"t","password":"p","confirmPassword":"q"}"#).unwrap();
    assert_eq!(body.confirm_password, "q");
}

#[test]
fn signed_in_response_carries_status_and_cookie() {
    let me = MeResponse::new(Uuid::nil(), "a@b.co".into(), None, Role::Guest);
    let resp = signed_in_response(StatusCode::CREATED, "tok".into(), false, me);
    assert_eq!(resp.status(), StatusCode::CREATED);
    let cookie = resp
        .headers()
        .get(axum::http::header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert!(cookie.starts_with("session_token=tok"), "cookie was {cookie}");
    assert!(cookie.contains("HttpOnly"));
}
