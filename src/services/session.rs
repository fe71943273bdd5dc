//! Session token management.
//!
//! ARCHITECTURE
//! ============
//! HTTP and realtime auth both use a long-lived opaque session token held
//! in an HttpOnly cookie. The token row is the only server-side session
//! state; signing out deletes it and a password reset deletes every row for
//! the user.

use std::fmt::Write;

use rand::Rng;
use sqlx::{PgPool, Postgres, Row};
use uuid::Uuid;

pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Generate a cryptographically random 32-byte hex token.
#[must_use]
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    bytes_to_hex(&bytes)
}

/// User row returned from session validation.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub email: String,
    /// Display name from the profile, if one was given at signup.
    pub full_name: Option<String>,
    /// Role as stored; see `auth::resolve_role` for the effective role.
    pub stored_role: String,
}

/// Create a session for the given user, returning the token.
pub async fn create_session<'e, E>(executor: E, user_id: Uuid) -> Result<String, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let token = generate_token();
    sqlx::query("INSERT INTO sessions (token, user_id) VALUES ($1, $2)")
        .bind(&token)
        .bind(user_id)
        .execute(executor)
        .await?;
    Ok(token)
}

/// Validate a session token and return the associated user.
pub async fn validate_session(pool: &PgPool, token: &str) -> Result<Option<SessionUser>, sqlx::Error> {
    let row = sqlx::query(
        r"SELECT
              u.id,
              u.email,
              p.full_name,
              COALESCE(r.role, 'guest') AS role
          FROM sessions s
          JOIN users u ON u.id = s.user_id
          LEFT JOIN profiles p ON p.user_id = u.id
          LEFT JOIN user_roles r ON r.user_id = u.id
          WHERE s.token = $1 AND s.expires_at > now()",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| SessionUser {
        id: r.get("id"),
        email: r.get("email"),
        full_name: r.get("full_name"),
        stored_role: r.get("role"),
    }))
}

/// Delete a session by token.
pub async fn delete_session(pool: &PgPool, token: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM sessions WHERE token = $1")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}

/// Revoke every session a user holds. Returns the number revoked.
pub async fn delete_all_for_user<'e, E>(executor: E, user_id: Uuid) -> Result<u64, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
        .bind(user_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
