//! Guest ↔ admin messaging.
//!
//! Guests write to the admin team as a whole (`recipient_id` is null);
//! admins reply to a specific guest. A conversation is keyed by the guest:
//! the sender of a guest message, or the recipient of an admin reply.

use std::collections::HashMap;

use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use time::OffsetDateTime;
use uuid::Uuid;

use super::applications::CrmError;
use crate::model::{Message, Profile};
use crate::validation::FieldErrors;

pub const MESSAGE_MAX_CHARS: usize = 5000;

const MESSAGE_COLUMNS: &str = "id, content, sender_id, recipient_id, is_from_admin, created_at";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conversation {
    pub user_id: Uuid,
    pub user_name: String,
    pub user_email: String,
    pub last_message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub last_message_at: OffsetDateTime,
    pub unread_count: u32,
}

/// # Errors
///
/// Empty or over-long content fails on the `content` field.
pub fn validate_content(raw: &str) -> Result<String, FieldErrors> {
    let content = raw.trim();
    let mut errors = FieldErrors::new();
    errors.check_length("content", content, 1, MESSAGE_MAX_CHARS, "Message cannot be empty");
    errors.into_result()?;
    Ok(content.to_string())
}

/// The guest on the other side of `msg`, if any.
#[must_use]
pub fn counterpart(msg: &Message) -> Option<Uuid> {
    if msg.is_from_admin { msg.recipient_id } else { Some(msg.sender_id) }
}

/// One conversation per guest, ordered by most recent message. `messages`
/// must be newest first.
#[must_use]
pub fn build_conversations(messages: &[Message], profiles: &[Profile]) -> Vec<Conversation> {
    let by_user: HashMap<Uuid, &Profile> = profiles.iter().map(|p| (p.user_id, p)).collect();
    let mut out: Vec<Conversation> = Vec::new();
    for msg in messages {
        let Some(user_id) = counterpart(msg) else {
            continue;
        };
        if out.iter().any(|c| c.user_id == user_id) {
            continue;
        }
        let profile = by_user.get(&user_id);
        out.push(Conversation {
            user_id,
            user_name: profile
                .and_then(|p| p.full_name.as_deref())
                .filter(|n| !n.trim().is_empty())
                .unwrap_or("Unknown")
                .to_string(),
            user_email: profile.map(|p| p.email.clone()).unwrap_or_default(),
            last_message: msg.content.clone(),
            last_message_at: msg.created_at,
            unread_count: 0,
        });
    }
    out
}

fn message_from_row(row: &PgRow) -> Result<Message, sqlx::Error> {
    Ok(Message {
        id: row.try_get("id")?,
        content: row.try_get("content")?,
        sender_id: row.try_get("sender_id")?,
        recipient_id: row.try_get("recipient_id")?,
        is_from_admin: row.try_get("is_from_admin")?,
        created_at: row.try_get("created_at")?,
    })
}

async fn insert(
    pool: &PgPool,
    sender_id: Uuid,
    recipient_id: Option<Uuid>,
    is_from_admin: bool,
    content: &str,
) -> Result<Message, CrmError> {
    let row = sqlx::query(&format!(
        r"INSERT INTO messages (content, sender_id, recipient_id, is_from_admin)
          VALUES ($1, $2, $3, $4)
          RETURNING {MESSAGE_COLUMNS}"
    ))
    .bind(content)
    .bind(sender_id)
    .bind(recipient_id)
    .bind(is_from_admin)
    .fetch_one(pool)
    .await?;
    Ok(message_from_row(&row)?)
}

/// Guest message to the admin team.
pub async fn send_to_admins(pool: &PgPool, sender_id: Uuid, content: &str) -> Result<Message, CrmError> {
    insert(pool, sender_id, None, false, content).await
}

/// Admin reply to one guest. An unknown recipient is
/// [`CrmError::NotFound`].
pub async fn reply(pool: &PgPool, admin_id: Uuid, recipient_id: Uuid, content: &str) -> Result<Message, CrmError> {
    insert(pool, admin_id, Some(recipient_id), true, content)
        .await
        .map_err(|e| missing_recipient(e, recipient_id))
}

fn missing_recipient(err: CrmError, recipient_id: Uuid) -> CrmError {
    match err {
        CrmError::Db(sqlx::Error::Database(db)) if db.is_foreign_key_violation() => CrmError::NotFound(recipient_id),
        other => other,
    }
}

/// Every message a user sent or received, oldest first.
pub async fn thread(pool: &PgPool, user_id: Uuid) -> Result<Vec<Message>, CrmError> {
    let rows = sqlx::query(&format!(
        "SELECT {MESSAGE_COLUMNS} FROM messages WHERE sender_id = $1 OR recipient_id = $1 ORDER BY created_at ASC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    let messages = rows.iter().map(message_from_row).collect::<Result<Vec<_>, _>>()?;
    Ok(messages)
}

pub async fn conversations(pool: &PgPool) -> Result<Vec<Conversation>, CrmError> {
    let rows = sqlx::query(&format!("SELECT {MESSAGE_COLUMNS} FROM messages ORDER BY created_at DESC"))
        .fetch_all(pool)
        .await?;
    let messages = rows.iter().map(message_from_row).collect::<Result<Vec<_>, _>>()?;

    let rows = sqlx::query("SELECT user_id, full_name, email FROM profiles")
        .fetch_all(pool)
        .await?;
    let profiles = rows
        .iter()
        .map(|r| {
            Ok(Profile { user_id: r.try_get("user_id")?, full_name: r.try_get("full_name")?, email: r.try_get("email")? })
        })
        .collect::<Result<Vec<_>, sqlx::Error>>()?;

    Ok(build_conversations(&messages, &profiles))
}

#[cfg(test)]
#[path = "messages_test.rs"]
mod tests;
