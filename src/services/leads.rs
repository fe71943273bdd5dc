//! Legacy per-type request tables, projected into one [`Lead`] shape.

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::applications::CrmError;
use crate::model::{ApplicationType, Lead, LeadStatus};

const LEADS_SQL: &str = r"
    SELECT id, 'buy' AS lead_type, full_name, email, phone_number,
           preferred_area AS location, NULL::text AS age,
           'Budget: ' || buying_budget AS details,
           created_at, lead_status, user_id
      FROM buy_requests
    UNION ALL
    SELECT id, 'sell', full_name, email, phone_number,
           home_address, NULL::text,
           'Home address: ' || home_address,
           created_at, lead_status, user_id
      FROM sell_requests
    UNION ALL
    SELECT id, 'work', full_name, email, '',
           location, age,
           skill || ' (' || skill_level || ')',
           created_at, lead_status, user_id
      FROM work_with_me_requests
    ORDER BY created_at DESC";

fn lead_from_row(row: &PgRow) -> Result<Lead, sqlx::Error> {
    let kind: String = row.try_get("lead_type")?;
    Ok(Lead {
        id: row.try_get("id")?,
        lead_type: ApplicationType::parse(&kind)
            .ok_or_else(|| sqlx::Error::Decode(format!("unexpected lead_type value: {kind}").into()))?,
        full_name: row.try_get("full_name")?,
        email: row.try_get("email")?,
        phone_number: row.try_get("phone_number")?,
        location: row.try_get("location")?,
        age: row.try_get("age")?,
        details: row.try_get("details")?,
        created_at: row.try_get("created_at")?,
        lead_status: row.try_get("lead_status")?,
        user_id: row.try_get("user_id")?,
    })
}

/// Every legacy lead across the three tables, newest first.
pub async fn list_all(pool: &PgPool) -> Result<Vec<Lead>, CrmError> {
    let rows = sqlx::query(LEADS_SQL).fetch_all(pool).await?;
    let leads = rows.iter().map(lead_from_row).collect::<Result<Vec<_>, _>>()?;
    Ok(leads)
}

/// Write `lead_status` on the table backing `kind`.
///
/// # Errors
///
/// [`CrmError::NotFound`] when that table has no row `id`.
pub async fn update_status(pool: &PgPool, kind: ApplicationType, id: Uuid, status: LeadStatus) -> Result<(), CrmError> {
    let result = sqlx::query(&format!("UPDATE {} SET lead_status = $1 WHERE id = $2", kind.legacy_table()))
        .bind(status.as_str())
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(CrmError::NotFound(id));
    }
    Ok(())
}
