//! Legacy lead table and the staff notes attached to each lead.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use uuid::Uuid;

use super::auth::AdminUser;
use super::{crm_error_response, validation_response};
use crate::crm::query::{self, LEAD_PAGE_SIZE, LeadFilter, LeadSortField, Sort, SortOrder};
use crate::model::{ApplicationType, LeadStatus};
use crate::services::applications::CrmError;
use crate::services::realtime::ChangeEvent;
use crate::services::{leads, notes};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LeadQuery {
    pub search: String,
    #[serde(rename = "type")]
    pub lead_type: Option<String>,
    pub lead_status: Option<String>,
    pub sort: Option<LeadSortField>,
    pub order: Option<SortOrder>,
    pub toggle: Option<LeadSortField>,
    pub page: Option<usize>,
}

impl LeadQuery {
    /// # Errors
    ///
    /// [`CrmError::InvalidType`] for an unknown lead type.
    pub fn filter(&self) -> Result<LeadFilter, CrmError> {
        let lead_type = match selected(self.lead_type.as_deref()) {
            Some(raw) => Some(parse_type(raw)?),
            None => None,
        };
        Ok(LeadFilter {
            search: self.search.trim().to_string(),
            lead_type,
            lead_status: selected(self.lead_status.as_deref()).map(str::to_string),
        })
    }

    #[must_use]
    pub fn sort(&self) -> Sort<LeadSortField> {
        let current = Sort { field: self.sort.unwrap_or_default(), order: self.order.unwrap_or_default() };
        self.toggle.map_or(current, |field| current.toggle(field))
    }
}

fn selected(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|v| !v.is_empty() && *v != "all")
}

fn parse_type(raw: &str) -> Result<ApplicationType, CrmError> {
    ApplicationType::parse(raw).ok_or_else(|| CrmError::InvalidType(raw.to_string()))
}

/// `GET /api/leads`: filtered, sorted, 10 per page.
pub async fn list(State(state): State<AppState>, _admin: AdminUser, Query(params): Query<LeadQuery>) -> Response {
    let filter = match params.filter() {
        Ok(f) => f,
        Err(e) => return crm_error_response(e),
    };
    let all = match leads::list_all(&state.pool).await {
        Ok(rows) => rows,
        Err(e) => return crm_error_response(e),
    };
    let sorted = query::filter_sort_leads(&all, &filter, params.sort());
    Json(query::paginate(&sorted, params.page.unwrap_or(1), LEAD_PAGE_SIZE)).into_response()
}

#[derive(Debug, Deserialize)]
pub struct LeadStatusUpdate {
    pub lead_status: String,
}

/// `PATCH /api/leads/{lead_type}/{id}`
pub async fn update_status(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path((lead_type, id)): Path<(String, Uuid)>,
    Json(body): Json<LeadStatusUpdate>,
) -> Response {
    let kind = match parse_type(&lead_type) {
        Ok(kind) => kind,
        Err(e) => return crm_error_response(e),
    };
    let Some(status) = LeadStatus::parse(body.lead_status.trim()) else {
        return crm_error_response(CrmError::InvalidStatus(body.lead_status));
    };
    if let Err(e) = leads::update_status(&state.pool, kind, id, status).await {
        return crm_error_response(e);
    }
    state
        .realtime
        .publish(
            kind.legacy_table(),
            ChangeEvent::Update,
            serde_json::json!({ "id": id, "lead_status": status.as_str() }),
            &[],
        )
        .await;
    StatusCode::NO_CONTENT.into_response()
}

// =============================================================================
// NOTES
// =============================================================================

/// `GET /api/leads/{lead_type}/{id}/notes`: newest first.
pub async fn list_notes(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path((lead_type, lead_id)): Path<(String, Uuid)>,
) -> Response {
    let kind = match parse_type(&lead_type) {
        Ok(kind) => kind,
        Err(e) => return crm_error_response(e),
    };
    match notes::list(&state.pool, lead_id, kind.as_str()).await {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => crm_error_response(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct NewNote {
    #[serde(default)]
    pub note: String,
}

/// `POST /api/leads/{lead_type}/{id}/notes`
pub async fn add_note(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path((lead_type, lead_id)): Path<(String, Uuid)>,
    Json(body): Json<NewNote>,
) -> Response {
    let kind = match parse_type(&lead_type) {
        Ok(kind) => kind,
        Err(e) => return crm_error_response(e),
    };
    let note = match notes::validate_note(&body.note) {
        Ok(n) => n,
        Err(errors) => return validation_response(errors),
    };
    match notes::add(&state.pool, lead_id, kind.as_str(), &note, admin.user.id).await {
        Ok(created) => {
            state
                .realtime
                .publish_row("lead_notes", ChangeEvent::Insert, &created, &[])
                .await;
            (StatusCode::CREATED, Json(created)).into_response()
        }
        Err(e) => crm_error_response(e),
    }
}

/// `DELETE /api/notes/{id}`
pub async fn delete_note(State(state): State<AppState>, _admin: AdminUser, Path(id): Path<Uuid>) -> Response {
    match notes::delete(&state.pool, id).await {
        Ok(deleted) => {
            state
                .realtime
                .publish_row("lead_notes", ChangeEvent::Delete, &deleted, &[])
                .await;
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => crm_error_response(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lead_query_defaults_and_filters() {
        let q = LeadQuery {
            search: " ana ".into(),
            lead_type: Some("buy".into()),
            lead_status: Some("in progress".into()),
            ..LeadQuery::default()
        };
        let filter = q.filter().unwrap();
        assert_eq!(filter.search, "ana");
        assert_eq!(filter.lead_type, Some(ApplicationType::Buy));
        assert_eq!(filter.lead_status.as_deref(), Some("in progress"));
        assert_eq!(q.sort(), Sort { field: LeadSortField::CreatedAt, order: SortOrder::Desc });
    }

    #[test]
    fn toggle_applies_header_click_to_current_sort() {
        let q = LeadQuery { toggle: Some(LeadSortField::CreatedAt), ..LeadQuery::default() };
        assert_eq!(q.sort(), Sort { field: LeadSortField::CreatedAt, order: SortOrder::Asc });

        let q = LeadQuery {
            sort: Some(LeadSortField::CreatedAt),
            order: Some(SortOrder::Asc),
            toggle: Some(LeadSortField::Location),
            ..LeadQuery::default()
        };
        assert_eq!(q.sort(), Sort { field: LeadSortField::Location, order: SortOrder::Asc });
    }

    #[test]
    fn all_status_is_no_filter() {
        let q = LeadQuery { lead_status: Some("all".into()), ..LeadQuery::default() };
        assert!(q.filter().unwrap().lead_status.is_none());
    }

    #[test]
    fn unknown_type_is_bad_request() {
        let q = LeadQuery { lead_type: Some("rent".into()), ..LeadQuery::default() };
        let err = q.filter().unwrap_err();
        assert!(matches!(err, CrmError::InvalidType(ref t) if t == "rent"));
        assert_eq!(crm_error_response(err).status(), StatusCode::BAD_REQUEST);
    }
}
