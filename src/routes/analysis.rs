//! AI lead analysis and the admin summary report email.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use time::OffsetDateTime;

use super::auth::AdminUser;
use super::{crm_error_response, error_response, internal_error};
use crate::crm::{kpi, pivot};
use crate::services::analysis::{self as analysis_svc, AnalysisError, LeadAnalysis};
use crate::services::applications as app_svc;
use crate::services::notify::{Notification, NotifyError};
use crate::state::AppState;

pub(crate) fn analysis_error_response(err: AnalysisError) -> Response {
    match err {
        AnalysisError::LlmNotConfigured => error_response(StatusCode::SERVICE_UNAVAILABLE, "AI analysis is not configured"),
        AnalysisError::RateLimited(_) | AnalysisError::UpstreamRateLimited => {
            error_response(StatusCode::TOO_MANY_REQUESTS, AnalysisError::UpstreamRateLimited.to_string())
        }
        AnalysisError::CreditsExhausted => error_response(StatusCode::PAYMENT_REQUIRED, err.to_string()),
        AnalysisError::Upstream(_) | AnalysisError::EmptyResponse => {
            tracing::error!(error = %err, "lead analysis failed upstream");
            error_response(StatusCode::BAD_GATEWAY, "Failed to analyze leads")
        }
        AnalysisError::Encode(_) | AnalysisError::Db(_) => internal_error("lead analysis", &err),
    }
}

pub(crate) fn notify_error_response(err: NotifyError) -> Response {
    match err {
        NotifyError::Disabled | NotifyError::NoRecipients => {
            error_response(StatusCode::SERVICE_UNAVAILABLE, err.to_string())
        }
        NotifyError::Delivery(_) => {
            tracing::error!(error = %err, "summary report delivery failed");
            error_response(StatusCode::BAD_GATEWAY, "Failed to send the report")
        }
    }
}

/// `POST /api/analysis`: rate-limited per admin and globally.
pub async fn analyze(State(state): State<AppState>, AdminUser(admin): AdminUser) -> Response {
    let Some(llm) = state.llm.clone() else {
        return analysis_error_response(AnalysisError::LlmNotConfigured);
    };
    if let Err(e) = state.rate_limiter.check_and_record(admin.user.id) {
        tracing::warn!(user_id = %admin.user.id, error = %e, "analysis rate limited");
        return analysis_error_response(e.into());
    }
    let apps = match app_svc::list_all(&state.pool).await {
        Ok(apps) => apps,
        Err(e) => return crm_error_response(e),
    };
    match analysis_svc::analyze(&*llm, &apps).await {
        Ok(analysis) => Json(analysis).into_response(),
        Err(e) => analysis_error_response(e),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SummaryReportRequest {
    /// Analysis the admin already ran, included in the email when present.
    pub analysis: Option<LeadAnalysis>,
}

/// `POST /api/admin/summary-report`: email KPIs, pivot, and optional
/// analysis to the notification recipients.
pub async fn summary_report(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(body): Json<SummaryReportRequest>,
) -> Response {
    if !state.notifier.is_enabled() {
        return notify_error_response(NotifyError::Disabled);
    }
    let apps = match app_svc::list_all(&state.pool).await {
        Ok(apps) => apps,
        Err(e) => return crm_error_response(e),
    };
    let report = Notification::SummaryReport {
        generated_at: OffsetDateTime::now_utc(),
        kpis: kpi::kpi_cards(&apps),
        pivot: pivot::build_pivot(&apps),
        analysis: body.analysis,
    };
    match state.notifier.send(&report).await {
        Ok(()) => {
            tracing::info!(admin_id = %admin.user.id, leads = apps.len(), "summary report sent");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => notify_error_response(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::LlmError;

    #[test]
    fn upstream_statuses_pass_through() {
        let limited = AnalysisError::from(LlmError::ApiResponse { status: 429, body: String::new() });
        assert_eq!(analysis_error_response(limited).status(), StatusCode::TOO_MANY_REQUESTS);
        let credits = AnalysisError::from(LlmError::ApiResponse { status: 402, body: String::new() });
        assert_eq!(analysis_error_response(credits).status(), StatusCode::PAYMENT_REQUIRED);
        let other = AnalysisError::from(LlmError::ApiResponse { status: 500, body: String::new() });
        assert_eq!(analysis_error_response(other).status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn missing_llm_is_unavailable() {
        let resp = analysis_error_response(AnalysisError::LlmNotConfigured);
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn notify_errors_map_to_statuses() {
        assert_eq!(notify_error_response(NotifyError::Disabled).status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(notify_error_response(NotifyError::Delivery("x".into())).status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn summary_request_analysis_is_optional() {
        let body: SummaryReportRequest = serde_json::from_str("{}").unwrap();
        assert!(body.analysis.is_none());
    }
}
