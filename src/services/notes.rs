//! Internal staff notes attached to a lead.

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::applications::CrmError;
use crate::model::LeadNote;
use crate::validation::FieldErrors;

pub const NOTE_MAX_CHARS: usize = 5000;

/// Trim and bound a note body.
///
/// # Errors
///
/// Empty or over-long notes fail on the `note` field.
pub fn validate_note(raw: &str) -> Result<String, FieldErrors> {
    let note = raw.trim();
    let mut errors = FieldErrors::new();
    errors.check_length("note", note, 1, NOTE_MAX_CHARS, "Note cannot be empty");
    errors.into_result()?;
    Ok(note.to_string())
}

fn note_from_row(row: &PgRow) -> Result<LeadNote, sqlx::Error> {
    Ok(LeadNote {
        id: row.try_get("id")?,
        lead_id: row.try_get("lead_id")?,
        lead_type: row.try_get("lead_type")?,
        note: row.try_get("note")?,
        created_by: row.try_get("created_by")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Notes for one lead, newest first.
pub async fn list(pool: &PgPool, lead_id: Uuid, lead_type: &str) -> Result<Vec<LeadNote>, CrmError> {
    let rows = sqlx::query(
        r"SELECT id, lead_id, lead_type, note, created_by, created_at
          FROM lead_notes
          WHERE lead_id = $1 AND lead_type = $2
          ORDER BY created_at DESC",
    )
    .bind(lead_id)
    .bind(lead_type)
    .fetch_all(pool)
    .await?;
    let notes = rows.iter().map(note_from_row).collect::<Result<Vec<_>, _>>()?;
    Ok(notes)
}

/// `note` must already be validated.
pub async fn add(pool: &PgPool, lead_id: Uuid, lead_type: &str, note: &str, created_by: Uuid) -> Result<LeadNote, CrmError> {
    let row = sqlx::query(
        r"INSERT INTO lead_notes (lead_id, lead_type, note, created_by)
          VALUES ($1, $2, $3, $4)
          RETURNING id, lead_id, lead_type, note, created_by, created_at",
    )
    .bind(lead_id)
    .bind(lead_type)
    .bind(note)
    .bind(created_by)
    .fetch_one(pool)
    .await?;
    Ok(note_from_row(&row)?)
}

/// Delete a note; any admin may delete any note.
///
/// # Errors
///
/// [`CrmError::NotFound`] when no note has `id`.
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<LeadNote, CrmError> {
    let row = sqlx::query(
        "DELETE FROM lead_notes WHERE id = $1 RETURNING id, lead_id, lead_type, note, created_by, created_at",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    let Some(row) = row else {
        return Err(CrmError::NotFound(id));
    };
    Ok(note_from_row(&row)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_is_trimmed() {
        assert_eq!(validate_note("  call back Tuesday \n").unwrap(), "call back Tuesday");
    }

    #[test]
    fn empty_note_rejected() {
        let errors = validate_note("   ").unwrap_err();
        assert_eq!(errors.get("note"), Some("Note cannot be empty"));
    }

    #[test]
    fn long_note_rejected() {
        let errors = validate_note(&"n".repeat(NOTE_MAX_CHARS + 1)).unwrap_err();
        assert_eq!(errors.get("note"), Some("String must contain at most 5000 character(s)"));
        assert!(validate_note(&"n".repeat(NOTE_MAX_CHARS)).is_ok());
    }

    #[cfg(feature = "live-db-tests")]
    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL/live Postgres"]
    async fn notes_newest_first_and_delete() {
        let pool = crate::db::testing::integration_pool().await;
        let admin = crate::db::testing::seed_user(&pool, "owner@example.com", "admin").await;
        let lead = Uuid::new_v4();

        let first = add(&pool, lead, "buy", "first", admin).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        add(&pool, lead, "buy", "second", admin).await.unwrap();

        let listed = list(&pool, lead, "buy").await.unwrap();
        assert_eq!(listed[0].note, "second");
        assert!(list(&pool, lead, "sell").await.unwrap().is_empty());

        delete(&pool, first.id).await.unwrap();
        assert!(matches!(delete(&pool, first.id).await, Err(CrmError::NotFound(_))));
    }
}
