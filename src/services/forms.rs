//! Lead-capture forms: validate, then record in both the per-type table and
//! the unified applications table.
//!
//! DESIGN
//! ======
//! Validation produces a [`Submission`], a plain description of both inserts
//! plus the notification fields. Persisting it is one transaction, so a
//! submission lands in both tables or in neither.

use serde::Deserialize;
use serde_json::{Map, Value};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::applications::{application_from_row, returning_columns};
use super::notify::Notification;
use crate::model::{Application, ApplicationType};
use crate::validation::FieldErrors;

pub const FORM_SOURCE: &str = "website";
pub const SKILL_LEVELS: [&str; 3] = ["Beginner", "Intermediate", "Advanced"];

#[derive(Debug, thiserror::Error)]
pub enum FormError {
    #[error(transparent)]
    Validation(#[from] FieldErrors),
    #[error("You need to be signed in to submit a request.")]
    SignInRequired,
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

impl crate::frame::ErrorCode for FormError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "E_VALIDATION",
            Self::SignInRequired => "E_SIGN_IN_REQUIRED",
            Self::Db(_) => "E_DATABASE",
        }
    }
}

// =============================================================================
// FORMS
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuyForm {
    pub full_name: String,
    pub phone_number: String,
    pub email: String,
    pub buying_budget: String,
    pub preferred_area: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SellForm {
    pub full_name: String,
    pub phone_number: String,
    pub email: String,
    pub home_address: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkForm {
    pub full_name: String,
    pub email: String,
    pub location: String,
    pub age: String,
    pub skill: String,
    pub skill_level: String,
}

/// Validated form, ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub kind: ApplicationType,
    pub full_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub location: String,
    /// Legacy table columns in insert order, `user_id` excluded.
    pub legacy_columns: Vec<(&'static str, String)>,
    pub additional_data: Map<String, Value>,
    /// Label/value pairs for the admin notification.
    pub notify_fields: Vec<(String, String)>,
}

impl Submission {
    #[must_use]
    pub fn form_type(&self) -> &'static str {
        match self.kind {
            ApplicationType::Buy => "Buy Request",
            ApplicationType::Sell => "Sell Request",
            ApplicationType::Work => "Work With Me Application",
        }
    }

    #[must_use]
    pub fn notification(&self) -> Notification {
        Notification::FormSubmission {
            full_name: self.full_name.clone(),
            email: self.email.clone(),
            form_type: self.form_type().to_string(),
            fields: self.notify_fields.clone(),
        }
    }
}

fn check_contact(errors: &mut FieldErrors, full_name: &str, phone_number: &str, email: &str) {
    errors.check_length("fullName", full_name, 2, 100, "Name must be at least 2 characters");
    errors.check_length("phoneNumber", phone_number, 10, 20, "Please enter a valid phone number");
    errors.check_email("email", email, "Please enter a valid email address");
}

fn pairs(fields: &[(&str, &str)]) -> Vec<(String, String)> {
    fields.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
}

fn data(fields: &[(&str, &str)]) -> Map<String, Value> {
    fields
        .iter()
        .map(|(k, v)| ((*k).to_string(), Value::String((*v).to_string())))
        .collect()
}

impl BuyForm {
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate(&self) -> Result<Submission, FieldErrors> {
        let full_name = self.full_name.trim();
        let phone = self.phone_number.trim();
        let email = self.email.trim();
        let budget = self.buying_budget.trim();
        let area = self.preferred_area.trim();

        let mut errors = FieldErrors::new();
        check_contact(&mut errors, full_name, phone, email);
        errors.check_required("buyingBudget", budget, "Please enter your budget");
        errors.check_length("preferredArea", area, 2, 200, "Please enter your preferred area");
        errors.into_result()?;

        Ok(Submission {
            kind: ApplicationType::Buy,
            full_name: full_name.into(),
            email: email.into(),
            phone_number: Some(phone.into()),
            location: area.into(),
            legacy_columns: vec![
                ("full_name", full_name.into()),
                ("phone_number", phone.into()),
                ("email", email.into()),
                ("buying_budget", budget.into()),
                ("preferred_area", area.into()),
            ],
            additional_data: data(&[("buying_budget", budget), ("preferred_area", area)]),
            notify_fields: pairs(&[
                ("Full Name", full_name),
                ("Phone Number", phone),
                ("Email", email),
                ("Buying Budget", budget),
                ("Preferred Area", area),
            ]),
        })
    }
}

impl SellForm {
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate(&self) -> Result<Submission, FieldErrors> {
        let full_name = self.full_name.trim();
        let phone = self.phone_number.trim();
        let email = self.email.trim();
        let address = self.home_address.trim();

        let mut errors = FieldErrors::new();
        check_contact(&mut errors, full_name, phone, email);
        errors.check_length("homeAddress", address, 5, 300, "Please enter your full address");
        errors.into_result()?;

        Ok(Submission {
            kind: ApplicationType::Sell,
            full_name: full_name.into(),
            email: email.into(),
            phone_number: Some(phone.into()),
            location: address.into(),
            legacy_columns: vec![
                ("full_name", full_name.into()),
                ("phone_number", phone.into()),
                ("email", email.into()),
                ("home_address", address.into()),
            ],
            additional_data: data(&[("home_address", address)]),
            notify_fields: pairs(&[
                ("Full Name", full_name),
                ("Phone Number", phone),
                ("Email", email),
                ("Home Address", address),
            ]),
        })
    }
}

impl WorkForm {
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate(&self) -> Result<Submission, FieldErrors> {
        let full_name = self.full_name.trim();
        let email = self.email.trim();
        let location = self.location.trim();
        let age = self.age.trim();
        let skill = self.skill.trim();
        let level = self.skill_level.trim();

        let mut errors = FieldErrors::new();
        errors.check_length("fullName", full_name, 1, 100, "Full name is required");
        errors.check_email("email", email, "Invalid email address");
        errors.check_length("location", location, 1, 200, "Location is required");
        errors.check_length("age", age, 1, 10, "Age is required");
        errors.check_length("skill", skill, 1, 200, "Skill is required");
        errors.check_one_of("skillLevel", level, &SKILL_LEVELS, "Skill level is required");
        errors.into_result()?;

        Ok(Submission {
            kind: ApplicationType::Work,
            full_name: full_name.into(),
            email: email.into(),
            phone_number: None,
            location: location.into(),
            legacy_columns: vec![
                ("full_name", full_name.into()),
                ("email", email.into()),
                ("location", location.into()),
                ("age", age.into()),
                ("skill", skill.into()),
                ("skill_level", level.into()),
            ],
            additional_data: data(&[("age", age), ("skill", skill), ("skill_level", level)]),
            notify_fields: pairs(&[
                ("Full Name", full_name),
                ("Email", email),
                ("Location", location),
                ("Age", age),
                ("Skill", skill),
                ("Skill Level", level),
            ]),
        })
    }
}

// =============================================================================
// PERSISTENCE
// =============================================================================

/// `INSERT INTO <table> (user_id, <cols>) VALUES ($1, ..) RETURNING id`.
#[must_use]
pub fn legacy_insert_sql(kind: ApplicationType, columns: &[(&'static str, String)]) -> String {
    let names: Vec<&str> = columns.iter().map(|(name, _)| *name).collect();
    let params: Vec<String> = (2..=columns.len() + 1).map(|i| format!("${i}")).collect();
    format!(
        "INSERT INTO {} (user_id, {}) VALUES ($1, {}) RETURNING id",
        kind.legacy_table(),
        names.join(", "),
        params.join(", ")
    )
}

/// Stored rows for one submission.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub legacy_id: Uuid,
    pub application: Application,
}

/// Insert the legacy row and the application row in one transaction.
///
/// # Errors
///
/// Returns [`FormError::Db`] if either insert fails; nothing is kept.
pub async fn record(pool: &PgPool, user_id: Option<Uuid>, sub: &Submission) -> Result<Recorded, FormError> {
    let mut tx = pool.begin().await?;

    let sql = legacy_insert_sql(sub.kind, &sub.legacy_columns);
    let mut legacy = sqlx::query(&sql).bind(user_id);
    for (_, value) in &sub.legacy_columns {
        legacy = legacy.bind(value);
    }
    let legacy_id: Uuid = legacy.fetch_one(&mut *tx).await?.get("id");

    let row = sqlx::query(&format!(
        r"INSERT INTO applications
              (user_id, application_type, full_name, phone_number, email_address,
               location, form_source, status, additional_data)
          VALUES ($1, $2, $3, $4, $5, $6, $7, 'new', $8)
          RETURNING {}",
        returning_columns()
    ))
    .bind(user_id)
    .bind(sub.kind.as_str())
    .bind(&sub.full_name)
    .bind(&sub.phone_number)
    .bind(&sub.email)
    .bind(&sub.location)
    .bind(FORM_SOURCE)
    .bind(Value::Object(sub.additional_data.clone()))
    .fetch_one(&mut *tx)
    .await?;
    let application = application_from_row(&row)?;

    tx.commit().await?;
    tracing::info!(kind = sub.kind.as_str(), %legacy_id, application_id = %application.id, "form submission recorded");
    Ok(Recorded { legacy_id, application })
}

#[cfg(test)]
#[path = "forms_test.rs"]
mod tests;
