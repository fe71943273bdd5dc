//! Type x status count matrix.

use serde::Serialize;

use crate::model::{Application, ApplicationStatus, ApplicationType};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PivotRow {
    pub application_type: ApplicationType,
    pub label: String,
    /// Counts in `ApplicationStatus::ALL` order.
    pub counts: Vec<usize>,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PivotTable {
    pub statuses: Vec<ApplicationStatus>,
    pub rows: Vec<PivotRow>,
    pub column_totals: Vec<usize>,
    pub grand_total: usize,
}

#[cfg(test)]
impl PivotTable {
    pub fn count(&self, kind: ApplicationType, status: ApplicationStatus) -> usize {
        let Some(row) = self.rows.iter().find(|r| r.application_type == kind) else {
            return 0;
        };
        let Some(col) = self.statuses.iter().position(|s| *s == status) else {
            return 0;
        };
        row.counts.get(col).copied().unwrap_or(0)
    }
}

#[must_use]
pub fn build_pivot(apps: &[Application]) -> PivotTable {
    let statuses = ApplicationStatus::ALL;
    let mut rows: Vec<PivotRow> = ApplicationType::ALL
        .iter()
        .map(|kind| PivotRow {
            application_type: *kind,
            label: kind.pivot_label().to_string(),
            counts: vec![0; statuses.len()],
            total: 0,
        })
        .collect();
    let mut column_totals = vec![0; statuses.len()];

    for app in apps {
        let Some(r) = ApplicationType::ALL.iter().position(|k| *k == app.application_type) else {
            continue;
        };
        let Some(c) = statuses.iter().position(|s| *s == app.status) else {
            continue;
        };
        rows[r].counts[c] += 1;
        rows[r].total += 1;
        column_totals[c] += 1;
    }

    PivotTable { statuses: statuses.to_vec(), rows, column_totals, grand_total: apps.len() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crm::fixtures::{app, base_time};

    #[test]
    fn counts_land_in_matching_cells() {
        let t = base_time();
        let apps = vec![
            app("a", ApplicationType::Buy, ApplicationStatus::New, t),
            app("b", ApplicationType::Buy, ApplicationStatus::New, t),
            app("c", ApplicationType::Sell, ApplicationStatus::Approved, t),
            app("d", ApplicationType::Work, ApplicationStatus::InReview, t),
            app("e", ApplicationType::Work, ApplicationStatus::Rejected, t),
        ];
        let pivot = build_pivot(&apps);

        assert_eq!(pivot.count(ApplicationType::Buy, ApplicationStatus::New), 2);
        assert_eq!(pivot.count(ApplicationType::Sell, ApplicationStatus::Approved), 1);
        assert_eq!(pivot.count(ApplicationType::Sell, ApplicationStatus::New), 0);
        assert_eq!(pivot.rows[2].total, 2);
        assert_eq!(pivot.column_totals, vec![2, 1, 0, 1, 1]);
        assert_eq!(pivot.grand_total, 5);
    }

    #[test]
    fn row_and_column_totals_agree_with_grand_total() {
        let t = base_time();
        let apps: Vec<Application> = ApplicationType::ALL
            .iter()
            .flat_map(|k| ApplicationStatus::ALL.iter().map(move |s| app("x", *k, *s, t)))
            .collect();
        let pivot = build_pivot(&apps);
        let row_sum: usize = pivot.rows.iter().map(|r| r.total).sum();
        let col_sum: usize = pivot.column_totals.iter().sum();
        assert_eq!(row_sum, pivot.grand_total);
        assert_eq!(col_sum, pivot.grand_total);
        assert_eq!(pivot.grand_total, 15);
    }

    #[test]
    fn empty_input_has_fixed_shape() {
        let pivot = build_pivot(&[]);
        assert_eq!(pivot.rows.len(), 3);
        assert_eq!(pivot.rows[0].label, "Buy Requests");
        assert_eq!(pivot.statuses.len(), 5);
        assert_eq!(pivot.grand_total, 0);
    }
}
