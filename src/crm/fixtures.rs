//! Application and lead builders shared by the CRM view tests.

use serde_json::{Map, Value};
use time::OffsetDateTime;
use time::macros::datetime;
use uuid::Uuid;

use crate::model::{Application, ApplicationStatus, ApplicationType, Lead};

pub fn app(name: &str, kind: ApplicationType, status: ApplicationStatus, created_at: OffsetDateTime) -> Application {
    Application {
        id: Uuid::new_v4(),
        user_id: None,
        application_type: kind,
        full_name: name.to_string(),
        phone_number: None,
        email_address: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
        location: None,
        form_source: Some("website".into()),
        status,
        additional_data: Map::new(),
        created_at,
        updated_at: created_at,
    }
}

pub fn app_at(name: &str, created_at: OffsetDateTime) -> Application {
    app(name, ApplicationType::Buy, ApplicationStatus::New, created_at)
}

pub fn base_time() -> OffsetDateTime {
    datetime!(2025-03-10 12:00 UTC)
}

pub fn with_phone(mut app: Application, phone: &str) -> Application {
    app.phone_number = Some(phone.to_string());
    app
}

pub fn with_location(mut app: Application, location: &str) -> Application {
    app.location = Some(location.to_string());
    app
}

pub fn with_data(mut app: Application, key: &str, value: Value) -> Application {
    app.additional_data.insert(key.to_string(), value);
    app
}

pub fn lead(name: &str, kind: ApplicationType, status: &str, created_at: OffsetDateTime) -> Lead {
    Lead {
        id: Uuid::new_v4(),
        lead_type: kind,
        full_name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        phone_number: "5550001111".into(),
        location: String::new(),
        age: None,
        details: String::new(),
        created_at,
        lead_status: status.to_string(),
        user_id: None,
    }
}
