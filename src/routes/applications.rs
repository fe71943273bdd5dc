//! Admin application table: listing, status change, CSV export, pivot,
//! KPI cards and charts.
//!
//! Every view loads the full application list and hands it to the pure
//! functions in `crate::crm`; query strings carry the table view-state.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use time::macros::format_description;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::auth::AdminUser;
use super::{crm_error_response, error_response, internal_error};
use crate::crm::query::{ApplicationFilter, ApplicationSortField, DateRange, GroupBy, Sort, SortOrder};
use crate::crm::{export, kpi, pivot, query};
use crate::model::{Application, ApplicationStatus, ApplicationType};
use crate::services::applications::{self as app_svc, CrmError};
use crate::services::realtime::ChangeEvent;
use crate::state::AppState;

// =============================================================================
// VIEW-STATE
// =============================================================================

/// Table view-state as sent in the query string. `all` or an empty value
/// disables a filter. `toggle` is a header click applied on top of
/// `sort`/`order`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ApplicationQuery {
    pub search: String,
    #[serde(rename = "type")]
    pub application_type: Option<String>,
    pub status: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub sort: Option<ApplicationSortField>,
    pub order: Option<SortOrder>,
    pub toggle: Option<ApplicationSortField>,
    pub group_by: GroupBy,
    pub page: Option<usize>,
}

fn selected(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|v| !v.is_empty() && *v != "all")
}

fn parse_date(raw: Option<&str>) -> Result<Option<Date>, String> {
    let Some(raw) = selected(raw) else {
        return Ok(None);
    };
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .map(Some)
        .map_err(|_| format!("invalid date: {raw}"))
}

impl ApplicationQuery {
    /// # Errors
    ///
    /// Returns a message naming the first unknown type, status, or date.
    pub fn filter(&self) -> Result<ApplicationFilter, String> {
        let application_type = match selected(self.application_type.as_deref()) {
            Some(raw) => Some(ApplicationType::parse(raw).ok_or_else(|| format!("invalid type: {raw}"))?),
            None => None,
        };
        let status = match selected(self.status.as_deref()) {
            Some(raw) => Some(ApplicationStatus::parse(raw).ok_or_else(|| format!("invalid status: {raw}"))?),
            None => None,
        };
        Ok(ApplicationFilter {
            search: self.search.trim().to_string(),
            application_type,
            status,
            dates: DateRange { from: parse_date(self.from.as_deref())?, to: parse_date(self.to.as_deref())? },
        })
    }

    #[must_use]
    pub fn sort(&self) -> Sort<ApplicationSortField> {
        let current = Sort { field: self.sort.unwrap_or_default(), order: self.order.unwrap_or_default() };
        self.toggle.map_or(current, |field| current.toggle(field))
    }
}

async fn load_all(state: &AppState) -> Result<Vec<Application>, Response> {
    app_svc::list_all(&state.pool).await.map_err(crm_error_response)
}

/// Filtered and sorted list, or a 400 for a malformed query.
async fn load_filtered(state: &AppState, params: &ApplicationQuery) -> Result<Vec<Application>, Response> {
    let filter = params
        .filter()
        .map_err(|msg| error_response(StatusCode::BAD_REQUEST, msg))?;
    let apps = load_all(state).await?;
    Ok(query::filter_sort_applications(&apps, &filter, params.sort()))
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `GET /api/applications`: paged, or grouped when `group_by` is set.
pub async fn list(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(params): Query<ApplicationQuery>,
) -> Response {
    let filter = match params.filter() {
        Ok(f) => f,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, msg),
    };
    let apps = match load_all(&state).await {
        Ok(apps) => apps,
        Err(resp) => return resp,
    };
    let listing = query::list_applications(&apps, &filter, params.sort(), params.group_by, params.page.unwrap_or(1));
    Json(listing).into_response()
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

/// `PATCH /api/applications/{id}`: change status and notify subscribers.
pub async fn update_status(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusUpdate>,
) -> Response {
    let Some(status) = ApplicationStatus::parse(body.status.trim()) else {
        return crm_error_response(CrmError::InvalidStatus(body.status));
    };
    match app_svc::update_status(&state.pool, id, status).await {
        Ok(app) => {
            tracing::info!(application_id = %id, status = status.as_str(), admin_id = %admin.user.id, "application status changed");
            let owners: Vec<Uuid> = app.user_id.into_iter().collect();
            state
                .realtime
                .publish_row("applications", ChangeEvent::Update, &app, &owners)
                .await;
            Json(app).into_response()
        }
        Err(e) => crm_error_response(e),
    }
}

/// `GET /api/applications/export.csv`: filtered, sorted, unpaginated CSV.
pub async fn export_csv(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(params): Query<ApplicationQuery>,
) -> Response {
    let apps = match load_filtered(&state, &params).await {
        Ok(apps) => apps,
        Err(resp) => return resp,
    };
    let body = match export::applications_csv(&apps) {
        Ok(bytes) => bytes,
        Err(e) => return internal_error("csv export", &e),
    };
    let filename = export::export_filename(OffsetDateTime::now_utc().date());
    (
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
        ],
        body,
    )
        .into_response()
}

/// `GET /api/applications/pivot`: type x status matrix over all applications.
pub async fn pivot(State(state): State<AppState>, _admin: AdminUser) -> Response {
    match load_all(&state).await {
        Ok(apps) => Json(pivot::build_pivot(&apps)).into_response(),
        Err(resp) => resp,
    }
}

/// `GET /api/dashboard/kpis`
pub async fn kpis(State(state): State<AppState>, _admin: AdminUser) -> Response {
    match load_all(&state).await {
        Ok(apps) => Json(kpi::kpi_cards(&apps)).into_response(),
        Err(resp) => resp,
    }
}

/// `GET /api/dashboard/charts`
pub async fn charts(State(state): State<AppState>, _admin: AdminUser) -> Response {
    match load_all(&state).await {
        Ok(apps) => Json(kpi::chart_data(&apps, OffsetDateTime::now_utc().date())).into_response(),
        Err(resp) => resp,
    }
}

#[cfg(test)]
#[path = "applications_test.rs"]
mod tests;
