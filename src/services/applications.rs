//! Unified application rows: load, status change, row decoding.

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::model::{Application, ApplicationStatus, ApplicationType};

const APPLICATION_COLUMNS: &str = "id, user_id, application_type, full_name, phone_number, email_address, \
     location, form_source, status, additional_data, created_at, updated_at";

#[derive(Debug, thiserror::Error)]
pub enum CrmError {
    #[error("record not found: {0}")]
    NotFound(Uuid),
    #[error("invalid status: {0}")]
    InvalidStatus(String),
    #[error("invalid lead type: {0}")]
    InvalidType(String),
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

impl crate::frame::ErrorCode for CrmError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_NOT_FOUND",
            Self::InvalidStatus(_) => "E_INVALID_STATUS",
            Self::InvalidType(_) => "E_INVALID_TYPE",
            Self::Db(_) => "E_DATABASE",
        }
    }
}

fn decode_err(column: &str, raw: &str) -> sqlx::Error {
    sqlx::Error::Decode(format!("unexpected {column} value: {raw}").into())
}

pub(crate) fn application_from_row(row: &PgRow) -> Result<Application, sqlx::Error> {
    let kind: String = row.try_get("application_type")?;
    let status: String = row.try_get("status")?;
    let additional: serde_json::Value = row.try_get("additional_data")?;
    Ok(Application {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        application_type: ApplicationType::parse(&kind).ok_or_else(|| decode_err("application_type", &kind))?,
        full_name: row.try_get("full_name")?,
        phone_number: row.try_get("phone_number")?,
        email_address: row.try_get("email_address")?,
        location: row.try_get("location")?,
        form_source: row.try_get("form_source")?,
        status: ApplicationStatus::parse(&status).ok_or_else(|| decode_err("status", &status))?,
        additional_data: match additional {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        },
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Every application, newest first.
pub async fn list_all(pool: &PgPool) -> Result<Vec<Application>, CrmError> {
    let rows = sqlx::query(&format!("SELECT {APPLICATION_COLUMNS} FROM applications ORDER BY created_at DESC"))
        .fetch_all(pool)
        .await?;
    let apps = rows.iter().map(application_from_row).collect::<Result<Vec<_>, _>>()?;
    Ok(apps)
}

/// Set the status and stamp `updated_at`.
///
/// # Errors
///
/// [`CrmError::NotFound`] when no application has `id`.
pub async fn update_status(pool: &PgPool, id: Uuid, status: ApplicationStatus) -> Result<Application, CrmError> {
    let row = sqlx::query(&format!(
        "UPDATE applications SET status = $1, updated_at = now() WHERE id = $2 RETURNING {APPLICATION_COLUMNS}"
    ))
    .bind(status.as_str())
    .bind(id)
    .fetch_optional(pool)
    .await?;
    let Some(row) = row else {
        return Err(CrmError::NotFound(id));
    };
    Ok(application_from_row(&row)?)
}

pub(crate) fn returning_columns() -> &'static str {
    APPLICATION_COLUMNS
}
