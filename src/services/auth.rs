//! Password accounts: signup, sign-in, role resolution, password reset.
//!
//! DESIGN
//! ======
//! Passwords are stored as Argon2 PHC strings. Reset tokens are random
//! 32-byte values sent by email; only their SHA-256 digest is stored, each
//! is single-use, and consuming one revokes every session the user holds.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use serde::Serialize;
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::session;
use crate::config::AdminAllowList;
use crate::validation::{FieldErrors, normalize_email};

pub const PASSWORD_MIN_CHARS: usize = 6;
pub const PASSWORD_MAX_CHARS: usize = 128;
pub const FULL_NAME_MAX_CHARS: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    Validation(#[from] FieldErrors),
    #[error("An account with this email already exists")]
    EmailTaken,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("This reset link is invalid or has expired")]
    InvalidResetToken,
    #[error("password hashing failed: {0}")]
    PasswordHash(String),
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

impl crate::frame::ErrorCode for AuthError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "E_VALIDATION",
            Self::EmailTaken => "E_EMAIL_TAKEN",
            Self::InvalidCredentials => "E_INVALID_CREDENTIALS",
            Self::InvalidResetToken => "E_INVALID_RESET_TOKEN",
            Self::PasswordHash(_) => "E_PASSWORD_HASH",
            Self::Db(_) => "E_DATABASE",
        }
    }
}

// =============================================================================
// ROLES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Guest,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Guest => "guest",
        }
    }
}

/// Role assigned at signup: admin only for allow-listed emails.
#[must_use]
pub fn initial_role(email: &str, admins: &AdminAllowList) -> Role {
    if admins.contains(email) { Role::Admin } else { Role::Guest }
}

/// Effective role: the stored role must be `admin` and the email must still
/// be on the allow-list.
#[must_use]
pub fn resolve_role(stored_role: &str, email: &str, admins: &AdminAllowList) -> Role {
    if stored_role != "admin" {
        return Role::Guest;
    }
    if !admins.contains(email) {
        tracing::warn!(%email, "stored admin role not on allow-list; treating as guest");
        return Role::Guest;
    }
    Role::Admin
}

// =============================================================================
// PASSWORDS
// =============================================================================

/// # Errors
///
/// Returns [`AuthError::PasswordHash`] if Argon2 rejects the input.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::PasswordHash(e.to_string()))
}

#[must_use]
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[must_use]
pub fn hash_reset_token(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    session::bytes_to_hex(&digest)
}

// =============================================================================
// INPUT CHECKS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpInput {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
}

fn check_new_password(errors: &mut FieldErrors, field: &str, password: &str) {
    errors.check_length(
        field,
        password,
        PASSWORD_MIN_CHARS,
        PASSWORD_MAX_CHARS,
        "Password must be at least 6 characters",
    );
}

/// Normalize and check signup input.
///
/// # Errors
///
/// Returns every failing field.
pub fn validate_sign_up(email: &str, password: &str, full_name: Option<&str>) -> Result<SignUpInput, FieldErrors> {
    let mut errors = FieldErrors::new();
    let email = email.trim().to_ascii_lowercase();
    errors.check_email("email", &email, "Please enter a valid email address");
    check_new_password(&mut errors, "password", password);

    let full_name = full_name.map(str::trim).filter(|n| !n.is_empty());
    if let Some(name) = full_name {
        errors.check_length("fullName", name, 0, FULL_NAME_MAX_CHARS, "");
    }
    errors.into_result()?;

    Ok(SignUpInput { email, password: password.to_string(), full_name: full_name.map(str::to_string) })
}

/// # Errors
///
/// Returns every failing field.
pub fn validate_sign_in(email: &str, password: &str) -> Result<String, FieldErrors> {
    let mut errors = FieldErrors::new();
    let email = email.trim().to_ascii_lowercase();
    errors.check_email("email", &email, "Please enter a valid email address");
    errors.check_required("password", password, "Password is required");
    errors.into_result()?;
    Ok(email)
}

/// # Errors
///
/// Returns every failing field; a mismatch is reported on `confirmPassword`.
pub fn validate_new_password(password: &str, confirm_password: &str) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    check_new_password(&mut errors, "password", password);
    if password != confirm_password {
        errors.add("confirmPassword", "Passwords don't match");
    }
    errors.into_result()
}

// =============================================================================
// ACCOUNTS
// =============================================================================

#[derive(Debug, Clone)]
pub struct Account {
    pub user_id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub role: Role,
}

/// Create the user, profile, and role rows in one transaction.
///
/// # Errors
///
/// [`AuthError::EmailTaken`] when the address is registered.
pub async fn sign_up(pool: &PgPool, admins: &AdminAllowList, input: &SignUpInput) -> Result<Account, AuthError> {
    let password_hash = hash_password(&input.password)?;
    let role = initial_role(&input.email, admins);

    let mut tx = pool.begin().await?;
    let row = sqlx::query(
        r"INSERT INTO users (email, password_hash)
          VALUES ($1, $2)
          ON CONFLICT (email) DO NOTHING
          RETURNING id",
    )
    .bind(&input.email)
    .bind(&password_hash)
    .fetch_optional(&mut *tx)
    .await?;
    let Some(row) = row else {
        return Err(AuthError::EmailTaken);
    };
    let user_id: Uuid = row.get("id");

    sqlx::query("INSERT INTO profiles (user_id, full_name, email) VALUES ($1, $2, $3)")
        .bind(user_id)
        .bind(&input.full_name)
        .bind(&input.email)
        .execute(&mut *tx)
        .await?;
    sqlx::query("INSERT INTO user_roles (user_id, role) VALUES ($1, $2)")
        .bind(user_id)
        .bind(role.as_str())
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    tracing::info!(%user_id, role = role.as_str(), "account created");
    Ok(Account { user_id, email: input.email.clone(), full_name: input.full_name.clone(), role })
}

/// # Errors
///
/// [`AuthError::InvalidCredentials`] for an unknown email or wrong password.
pub async fn sign_in(pool: &PgPool, email: &str, password: &str) -> Result<Uuid, AuthError> {
    let row = sqlx::query("SELECT id, password_hash FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    let Some(row) = row else {
        return Err(AuthError::InvalidCredentials);
    };
    let hash: String = row.get("password_hash");
    if !verify_password(password, &hash) {
        return Err(AuthError::InvalidCredentials);
    }
    Ok(row.get("id"))
}

// =============================================================================
// PASSWORD RESET
// =============================================================================

/// Issue a reset token for a registered email. Returns `None` for unknown
/// addresses so callers can answer identically either way.
///
/// # Errors
///
/// [`AuthError::Validation`] for a malformed address.
pub async fn request_password_reset(pool: &PgPool, email: &str) -> Result<Option<(String, String)>, AuthError> {
    let Some(normalized) = normalize_email(email) else {
        let mut errors = FieldErrors::new();
        errors.add("email", "Please enter a valid email address");
        return Err(errors.into());
    };

    let row = sqlx::query("SELECT id FROM users WHERE email = $1")
        .bind(&normalized)
        .fetch_optional(pool)
        .await?;
    let Some(row) = row else {
        return Ok(None);
    };
    let user_id: Uuid = row.get("id");

    sqlx::query("DELETE FROM password_resets WHERE user_id = $1 AND consumed_at IS NULL")
        .bind(user_id)
        .execute(pool)
        .await?;

    let token = session::generate_token();
    sqlx::query("INSERT INTO password_resets (user_id, token_hash) VALUES ($1, $2)")
        .bind(user_id)
        .bind(hash_reset_token(&token))
        .execute(pool)
        .await?;

    Ok(Some((normalized, token)))
}

/// Consume `token`, set the new password, and revoke all sessions.
///
/// # Errors
///
/// [`AuthError::Validation`] for bad passwords; [`AuthError::InvalidResetToken`]
/// when the token is unknown, expired, or already used.
pub async fn reset_password(
    pool: &PgPool,
    token: &str,
    password: &str,
    confirm_password: &str,
) -> Result<Uuid, AuthError> {
    validate_new_password(password, confirm_password)?;
    let password_hash = hash_password(password)?;

    let mut tx = pool.begin().await?;
    let row = sqlx::query(
        r"UPDATE password_resets
          SET consumed_at = now()
          WHERE token_hash = $1
            AND consumed_at IS NULL
            AND expires_at > now()
          RETURNING user_id",
    )
    .bind(hash_reset_token(token.trim()))
    .fetch_optional(&mut *tx)
    .await?;
    let Some(row) = row else {
        return Err(AuthError::InvalidResetToken);
    };
    let user_id: Uuid = row.get("user_id");

    sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
        .bind(&password_hash)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    let revoked = session::delete_all_for_user(&mut *tx, user_id).await?;
    tx.commit().await?;

    tracing::info!(%user_id, revoked, "password reset");
    Ok(user_id)
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
