//! Records mirrored from the relational store.
//!
//! DESIGN
//! ======
//! Rows are plain data. Enumerated columns are stored as text and parsed
//! through `parse`/`as_str` so an unexpected value surfaces as a decode error
//! at the service boundary instead of deep inside view logic.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

// =============================================================================
// APPLICATION TYPE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationType {
    Buy,
    Sell,
    Work,
}

impl ApplicationType {
    pub const ALL: [Self; 3] = [Self::Buy, Self::Sell, Self::Work];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
            Self::Work => "work",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "buy" => Some(Self::Buy),
            "sell" => Some(Self::Sell),
            "work" => Some(Self::Work),
            _ => None,
        }
    }

    /// Label used in the application table and CSV export.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Buy => "Buying a House",
            Self::Sell => "Selling a House",
            Self::Work => "Work With Me",
        }
    }

    /// Label used in the pivot table rows.
    #[must_use]
    pub fn pivot_label(self) -> &'static str {
        match self {
            Self::Buy => "Buy Requests",
            Self::Sell => "Sell Requests",
            Self::Work => "Work With Me",
        }
    }

    /// Legacy per-type table backing this application type.
    #[must_use]
    pub fn legacy_table(self) -> &'static str {
        match self {
            Self::Buy => "buy_requests",
            Self::Sell => "sell_requests",
            Self::Work => "work_with_me_requests",
        }
    }
}

// =============================================================================
// APPLICATION STATUS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    New,
    InReview,
    Contacted,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub const ALL: [Self; 5] = [Self::New, Self::InReview, Self::Contacted, Self::Approved, Self::Rejected];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::InReview => "in_review",
            Self::Contacted => "contacted",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "new" => Some(Self::New),
            "in_review" => Some(Self::InReview),
            "contacted" => Some(Self::Contacted),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::InReview => "In Review",
            Self::Contacted => "Contacted",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
        }
    }
}

// =============================================================================
// LEGACY LEAD STATUS
// =============================================================================

/// Free-text status on the legacy per-type request tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeadStatus {
    #[serde(rename = "new")]
    New,
    #[serde(rename = "contacted")]
    Contacted,
    #[serde(rename = "in progress")]
    InProgress,
    #[serde(rename = "closed")]
    Closed,
}

impl LeadStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Contacted => "contacted",
            Self::InProgress => "in progress",
            Self::Closed => "closed",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "new" => Some(Self::New),
            "contacted" => Some(Self::Contacted),
            "in progress" => Some(Self::InProgress),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }
}

// =============================================================================
// ROWS
// =============================================================================

/// Unified CRM application row (`applications`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub application_type: ApplicationType,
    pub full_name: String,
    pub phone_number: Option<String>,
    pub email_address: String,
    pub location: Option<String>,
    pub form_source: Option<String>,
    pub status: ApplicationStatus,
    pub additional_data: serde_json::Map<String, serde_json::Value>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Legacy request row projected into one shape across the three tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub lead_type: ApplicationType,
    pub full_name: String,
    pub email: String,
    pub phone_number: String,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<String>,
    pub details: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub lead_status: String,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadNote {
    pub id: Uuid,
    pub lead_id: Uuid,
    pub lead_type: String,
    pub note: String,
    pub created_by: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub content: String,
    pub sender_id: Uuid,
    pub recipient_id: Option<Uuid>,
    pub is_from_admin: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: Uuid,
    pub full_name: Option<String>,
    pub email: String,
}

// =============================================================================
// SOCIAL LINKS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocialPlatform {
    Instagram,
    Facebook,
    Twitter,
    Linkedin,
    Youtube,
}

impl SocialPlatform {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Instagram => "instagram",
            Self::Facebook => "facebook",
            Self::Twitter => "twitter",
            Self::Linkedin => "linkedin",
            Self::Youtube => "youtube",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "instagram" => Some(Self::Instagram),
            "facebook" => Some(Self::Facebook),
            "twitter" => Some(Self::Twitter),
            "linkedin" => Some(Self::Linkedin),
            "youtube" => Some(Self::Youtube),
            _ => None,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Instagram => "Instagram",
            Self::Facebook => "Facebook",
            Self::Twitter => "Twitter / X",
            Self::Linkedin => "LinkedIn",
            Self::Youtube => "YouTube",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialLink {
    pub id: SocialPlatform,
    pub label: String,
    pub url: String,
    pub enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_strings_round_trip() {
        for status in ApplicationStatus::ALL {
            assert_eq!(ApplicationStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ApplicationStatus::parse("closed"), None);
    }

    #[test]
    fn status_serializes_as_column_value() {
        let json = serde_json::to_string(&ApplicationStatus::InReview).unwrap();
        assert_eq!(json, "\"in_review\"");
    }

    #[test]
    fn legacy_status_keeps_space() {
        assert_eq!(LeadStatus::parse("in progress"), Some(LeadStatus::InProgress));
        assert_eq!(serde_json::to_string(&LeadStatus::InProgress).unwrap(), "\"in progress\"");
    }

    #[test]
    fn lead_serializes_type_field() {
        let lead = Lead {
            id: Uuid::nil(),
            lead_type: ApplicationType::Sell,
            full_name: "Dana".into(),
            email: "dana@example.com".into(),
            phone_number: "5551234567".into(),
            location: "12 Elm St".into(),
            age: None,
            details: String::new(),
            created_at: OffsetDateTime::UNIX_EPOCH,
            lead_status: "new".into(),
            user_id: None,
        };
        let value = serde_json::to_value(&lead).unwrap();
        assert_eq!(value["type"], "sell");
        assert!(value.get("age").is_none());
        assert_eq!(value["created_at"], "1970-01-01T00:00:00Z");
    }

    #[test]
    fn unknown_platform_is_rejected() {
        assert_eq!(SocialPlatform::parse("tiktok"), None);
        assert_eq!(SocialPlatform::parse("linkedin"), Some(SocialPlatform::Linkedin));
    }
}
