//! Table view-state: filter, sort, paginate, group.
//!
//! DESIGN
//! ======
//! The same rules drive the application table (page size 15, grouping) and
//! the legacy lead table (page size 10). Both operate on an in-memory slice
//! already loaded from the store, newest first. Functions here are pure so
//! the HTTP layer only parses query strings and serializes results.
//!
//! Dates are interpreted in UTC: a `from` date starts at 00:00 and a `to`
//! date covers its whole day, both inclusive.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::model::{Application, ApplicationStatus, ApplicationType, Lead};

pub const APPLICATION_PAGE_SIZE: usize = 15;
pub const LEAD_PAGE_SIZE: usize = 10;

// =============================================================================
// SORTING
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    #[must_use]
    pub fn flip(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Asc => ordering,
            Self::Desc => ordering.reverse(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationSortField {
    FullName,
    EmailAddress,
    #[default]
    CreatedAt,
    Location,
    Status,
    ApplicationType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadSortField {
    FullName,
    Email,
    #[default]
    CreatedAt,
    Location,
    LeadStatus,
}

/// Active sort column and direction. Defaults to newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Sort<F> {
    pub field: F,
    pub order: SortOrder,
}

impl<F: PartialEq> Sort<F> {
    /// Header click: the active column flips direction, a new column starts
    /// ascending.
    #[must_use]
    pub fn toggle(self, field: F) -> Self {
        if self.field == field {
            Self { field, order: self.order.flip() }
        } else {
            Self { field, order: SortOrder::Asc }
        }
    }
}

/// Locale-style text comparison in three passes: base letters (accents and
/// case folded away), then accents, then case with lowercase first.
#[must_use]
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    base_letters(a)
        .cmp(base_letters(b))
        .then_with(|| accented(a).cmp(accented(b)))
        .then_with(|| b.cmp(a))
}

fn base_letters(s: &str) -> impl Iterator<Item = char> + '_ {
    accented(s).filter(|c| !is_combining_mark(*c))
}

fn accented(s: &str) -> impl Iterator<Item = char> + '_ {
    s.nfd().flat_map(char::to_lowercase)
}

fn compare_applications(a: &Application, b: &Application, field: ApplicationSortField) -> Ordering {
    match field {
        ApplicationSortField::FullName => locale_cmp(&a.full_name, &b.full_name),
        ApplicationSortField::EmailAddress => locale_cmp(&a.email_address, &b.email_address),
        ApplicationSortField::Location => locale_cmp(
            a.location.as_deref().unwrap_or_default(),
            b.location.as_deref().unwrap_or_default(),
        ),
        ApplicationSortField::Status => locale_cmp(a.status.as_str(), b.status.as_str()),
        ApplicationSortField::ApplicationType => locale_cmp(a.application_type.as_str(), b.application_type.as_str()),
        ApplicationSortField::CreatedAt => a.created_at.cmp(&b.created_at),
    }
}

fn compare_leads(a: &Lead, b: &Lead, field: LeadSortField) -> Ordering {
    match field {
        LeadSortField::FullName => locale_cmp(&a.full_name, &b.full_name),
        LeadSortField::Email => locale_cmp(&a.email, &b.email),
        LeadSortField::Location => locale_cmp(&a.location, &b.location),
        LeadSortField::LeadStatus => locale_cmp(&a.lead_status, &b.lead_status),
        LeadSortField::CreatedAt => a.created_at.cmp(&b.created_at),
    }
}

// =============================================================================
// FILTERING
// =============================================================================

/// Case-insensitive substring on name and email, case-sensitive on phone.
/// An empty term matches everything.
#[must_use]
pub fn matches_search(term: &str, full_name: &str, email: &str, phone: Option<&str>) -> bool {
    if term.is_empty() {
        return true;
    }
    let needle = term.to_lowercase();
    full_name.to_lowercase().contains(&needle)
        || email.to_lowercase().contains(&needle)
        || phone.is_some_and(|p| !p.is_empty() && p.contains(term))
}

/// Inclusive day-granular date window in UTC.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<Date>,
    pub to: Option<Date>,
}

impl DateRange {
    #[must_use]
    pub fn contains(&self, ts: OffsetDateTime) -> bool {
        if let Some(from) = self.from {
            if ts < PrimitiveDateTime::new(from, Time::MIDNIGHT).assume_utc() {
                return false;
            }
        }
        if let Some(to) = self.to {
            if ts >= start_of_next_day(to) {
                return false;
            }
        }
        true
    }
}

fn start_of_next_day(date: Date) -> OffsetDateTime {
    let day_start = PrimitiveDateTime::new(date, Time::MIDNIGHT).assume_utc();
    day_start + time::Duration::DAY
}

#[derive(Debug, Clone, Default)]
pub struct ApplicationFilter {
    pub search: String,
    pub application_type: Option<ApplicationType>,
    pub status: Option<ApplicationStatus>,
    pub dates: DateRange,
}

impl ApplicationFilter {
    #[must_use]
    pub fn matches(&self, app: &Application) -> bool {
        matches_search(&self.search, &app.full_name, &app.email_address, app.phone_number.as_deref())
            && self.application_type.is_none_or(|t| t == app.application_type)
            && self.status.is_none_or(|s| s == app.status)
            && self.dates.contains(app.created_at)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LeadFilter {
    pub search: String,
    pub lead_type: Option<ApplicationType>,
    pub lead_status: Option<String>,
}

impl LeadFilter {
    #[must_use]
    pub fn matches(&self, lead: &Lead) -> bool {
        matches_search(&self.search, &lead.full_name, &lead.email, Some(&lead.phone_number))
            && self.lead_type.is_none_or(|t| t == lead.lead_type)
            && self
                .lead_status
                .as_deref()
                .is_none_or(|s| s == lead.lead_status)
    }
}

/// Filter then stable-sort applications. The result is the list the table,
/// export, and grouping all work from.
#[must_use]
pub fn filter_sort_applications(
    apps: &[Application],
    filter: &ApplicationFilter,
    sort: Sort<ApplicationSortField>,
) -> Vec<Application> {
    let mut out: Vec<Application> = apps.iter().filter(|a| filter.matches(a)).cloned().collect();
    out.sort_by(|a, b| sort.order.apply(compare_applications(a, b, sort.field)));
    out
}

#[must_use]
pub fn filter_sort_leads(leads: &[Lead], filter: &LeadFilter, sort: Sort<LeadSortField>) -> Vec<Lead> {
    let mut out: Vec<Lead> = leads.iter().filter(|l| filter.matches(l)).cloned().collect();
    out.sort_by(|a, b| sort.order.apply(compare_leads(a, b, sort.field)));
    out
}

// =============================================================================
// PAGINATION
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub total_pages: usize,
}

/// Slice out 1-based `page`. Page 0 is treated as page 1; pages past the end
/// are empty.
#[must_use]
pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> Page<T> {
    let page = page.max(1);
    let page_size = page_size.max(1);
    let total = items.len();
    let start = (page - 1).saturating_mul(page_size);
    let slice = items.iter().skip(start).take(page_size).cloned().collect();
    Page { items: slice, page, page_size, total, total_pages: total.div_ceil(page_size) }
}

// =============================================================================
// GROUPING
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    #[default]
    None,
    ApplicationType,
    Status,
}

#[derive(Debug, Clone, Serialize)]
pub struct Group {
    pub key: String,
    pub label: String,
    pub count: usize,
    pub items: Vec<Application>,
}

/// Bucket the sorted list by type or status. Groups appear in order of their
/// first member; members keep the sorted order.
#[must_use]
pub fn group_applications(sorted: Vec<Application>, by: GroupBy) -> Vec<Group> {
    let mut groups: Vec<Group> = Vec::new();
    for app in sorted {
        let (key, label) = match by {
            GroupBy::None => ("all", "All"),
            GroupBy::ApplicationType => (app.application_type.as_str(), app.application_type.label()),
            GroupBy::Status => (app.status.as_str(), app.status.label()),
        };
        if let Some(group) = groups.iter_mut().find(|g| g.key == key) {
            group.count += 1;
            group.items.push(app);
        } else {
            groups.push(Group { key: key.to_string(), label: label.to_string(), count: 1, items: vec![app] });
        }
    }
    groups
}

/// Paged rows when grouping is off, every filtered row grouped otherwise.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ApplicationListing {
    Paged(Page<Application>),
    Grouped { total: usize, groups: Vec<Group> },
}

#[must_use]
pub fn list_applications(
    apps: &[Application],
    filter: &ApplicationFilter,
    sort: Sort<ApplicationSortField>,
    group_by: GroupBy,
    page: usize,
) -> ApplicationListing {
    let sorted = filter_sort_applications(apps, filter, sort);
    match group_by {
        GroupBy::None => ApplicationListing::Paged(paginate(&sorted, page, APPLICATION_PAGE_SIZE)),
        by => ApplicationListing::Grouped { total: sorted.len(), groups: group_applications(sorted, by) },
    }
}

#[cfg(test)]
#[path = "query_test.rs"]
mod tests;
