//! KPI cards and dashboard chart series.

use std::collections::HashMap;

use serde::Serialize;
use time::{Date, Duration, UtcOffset};

use super::query::locale_cmp;
use crate::model::{Application, ApplicationStatus, ApplicationType};

pub const TOP_LOCATIONS: usize = 8;
pub const DATE_WINDOW_DAYS: i64 = 14;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KpiCards {
    pub total: usize,
    pub new: usize,
    /// `in_review` plus `contacted`.
    pub contacted: usize,
    /// `approved` plus `rejected`.
    pub closed: usize,
    pub buy: usize,
    pub sell: usize,
    pub work: usize,
}

#[must_use]
pub fn kpi_cards(apps: &[Application]) -> KpiCards {
    let mut cards = KpiCards { total: apps.len(), ..KpiCards::default() };
    for app in apps {
        match app.status {
            ApplicationStatus::New => cards.new += 1,
            ApplicationStatus::InReview | ApplicationStatus::Contacted => cards.contacted += 1,
            ApplicationStatus::Approved | ApplicationStatus::Rejected => cards.closed += 1,
        }
        match app.application_type {
            ApplicationType::Buy => cards.buy += 1,
            ApplicationType::Sell => cards.sell += 1,
            ApplicationType::Work => cards.work += 1,
        }
    }
    cards
}

// =============================================================================
// CHARTS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartSlice {
    pub name: String,
    pub value: usize,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationPoint {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatePoint {
    /// `YYYY-MM-DD` (UTC).
    pub date: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    pub leads_by_type: Vec<ChartSlice>,
    pub leads_by_status: Vec<ChartSlice>,
    pub leads_by_location: Vec<LocationPoint>,
    pub leads_by_date: Vec<DatePoint>,
}

fn type_color(kind: ApplicationType) -> &'static str {
    match kind {
        ApplicationType::Buy => "#10b981",
        ApplicationType::Sell => "#3b82f6",
        ApplicationType::Work => "#a855f7",
    }
}

fn status_color(status: ApplicationStatus) -> &'static str {
    match status {
        ApplicationStatus::New => "#10b981",
        ApplicationStatus::InReview => "#f59e0b",
        ApplicationStatus::Contacted => "#3b82f6",
        ApplicationStatus::Approved => "#a855f7",
        ApplicationStatus::Rejected => "#ef4444",
    }
}

/// Build every chart series. `today` anchors the date window, which covers
/// the 14 UTC days ending on (and including) `today`.
#[must_use]
pub fn chart_data(apps: &[Application], today: Date) -> ChartData {
    let leads_by_type = ApplicationType::ALL
        .iter()
        .map(|kind| ChartSlice {
            name: kind.label().to_string(),
            value: apps.iter().filter(|a| a.application_type == *kind).count(),
            color: type_color(*kind),
        })
        .collect();

    let leads_by_status = ApplicationStatus::ALL
        .iter()
        .map(|status| ChartSlice {
            name: status.label().to_string(),
            value: apps.iter().filter(|a| a.status == *status).count(),
            color: status_color(*status),
        })
        .collect();

    ChartData {
        leads_by_type,
        leads_by_status,
        leads_by_location: leads_by_location(apps),
        leads_by_date: leads_by_date(apps, today),
    }
}

/// Top locations by count, ties broken by name. Blank locations are skipped.
fn leads_by_location(apps: &[Application]) -> Vec<LocationPoint> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for app in apps {
        let Some(location) = app.location.as_deref().map(str::trim) else {
            continue;
        };
        if location.is_empty() {
            continue;
        }
        *counts.entry(location).or_default() += 1;
    }
    let mut points: Vec<LocationPoint> = counts
        .into_iter()
        .map(|(name, count)| LocationPoint { name: name.to_string(), count })
        .collect();
    points.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| locale_cmp(&a.name, &b.name)));
    points.truncate(TOP_LOCATIONS);
    points
}

fn leads_by_date(apps: &[Application], today: Date) -> Vec<DatePoint> {
    let first = today - Duration::days(DATE_WINDOW_DAYS - 1);
    let mut counts: HashMap<Date, usize> = HashMap::new();
    for app in apps {
        let day = app.created_at.to_offset(UtcOffset::UTC).date();
        if day >= first && day <= today {
            *counts.entry(day).or_default() += 1;
        }
    }
    (0..DATE_WINDOW_DAYS)
        .map(|offset| {
            let day = first + Duration::days(offset);
            DatePoint { date: day.to_string(), count: counts.get(&day).copied().unwrap_or(0) }
        })
        .collect()
}

#[cfg(test)]
#[path = "kpi_test.rs"]
mod tests;
