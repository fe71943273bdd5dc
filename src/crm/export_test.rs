use super::*;
use crate::crm::fixtures::{app, base_time, with_data, with_location, with_phone};
use crate::model::{ApplicationStatus, ApplicationType};
use time::macros::{date, datetime};

fn render(apps: &[Application]) -> String {
    String::from_utf8(applications_csv(apps).unwrap()).unwrap()
}

#[test]
fn header_plus_one_row_per_record() {
    let t = base_time();
    let apps = vec![
        app("Ann", ApplicationType::Buy, ApplicationStatus::New, t),
        app("Ben", ApplicationType::Sell, ApplicationStatus::InReview, t),
        app("Cat", ApplicationType::Work, ApplicationStatus::Approved, t),
    ];
    let csv = render(&apps);
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(
        lines[0],
        "Full Name,Email,Phone,Location,Application Type,Status,Submission Date,Additional Data"
    );
}

#[test]
fn empty_list_is_header_only() {
    let csv = render(&[]);
    assert_eq!(csv.lines().count(), 1);
}

#[test]
fn every_field_is_quoted_with_labels() {
    let a = with_location(
        with_phone(app("Ann Lee", ApplicationType::Buy, ApplicationStatus::InReview, datetime!(2025-01-05 09:00 UTC)), "5551234567"),
        "Austin",
    );
    let csv = render(&[a]);
    let row = csv.lines().nth(1).unwrap();
    assert_eq!(
        row,
        r#""Ann Lee","ann.lee@example.com","5551234567","Austin","Buying a House","In Review","1/5/2025","{}""#
    );
}

#[test]
fn internal_quotes_are_doubled() {
    let a = app(r#"Robert "Bob" Jones"#, ApplicationType::Work, ApplicationStatus::Rejected, base_time());
    let csv = render(&[a]);
    let row = csv.lines().nth(1).unwrap();
    assert!(row.starts_with(r#""Robert ""Bob"" Jones","#), "row was {row}");
    assert!(row.contains(r#""Work With Me","Rejected""#));
}

#[test]
fn additional_data_is_compact_json() {
    let a = with_data(
        app("Ann", ApplicationType::Buy, ApplicationStatus::New, base_time()),
        "buying_budget",
        serde_json::json!("500000"),
    );
    let csv = render(&[a]);
    let row = csv.lines().nth(1).unwrap();
    assert!(row.ends_with(r#""{""buying_budget"":""500000""}""#), "row was {row}");
}

#[test]
fn missing_phone_and_location_are_empty_quoted() {
    let a = app("Ann", ApplicationType::Sell, ApplicationStatus::Contacted, base_time());
    let csv = render(&[a]);
    let row = csv.lines().nth(1).unwrap();
    assert!(row.contains(r#""ann@example.com","","","Selling a House""#), "row was {row}");
}

#[test]
fn submission_date_has_no_padding() {
    assert_eq!(submission_date(datetime!(2025-12-31 23:00 UTC)), "12/31/2025");
    assert_eq!(submission_date(datetime!(2024-02-09 00:00 UTC)), "2/9/2024");
}

#[test]
fn filename_uses_iso_date() {
    assert_eq!(export_filename(date!(2025 - 07 - 04)), "applications_export_2025-07-04.csv");
}
