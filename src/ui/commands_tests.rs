#![allow(clippy::unwrap_used)]

use rust_decimal_macros::dec;

use super::*;

fn setup() -> (App, Database) {
    let db = Database::open_in_memory().unwrap();
    let aep = db.insert_company(&Company::new("AEP")).unwrap();
    let aep = Company::with_id(aep, "AEP");
    for (m, y, amt) in [(12, 2023, dec!(72)), (12, 2022, dec!(81)), (1, 2024, dec!(90)), (2, 2024, dec!(109))] {
        db.insert_bill(&Bill::new(m, y, aep.clone(), amt).with_city("Columbus"))
            .unwrap();
    }
    let mut app = App::new();
    app.refresh_all(&db).unwrap();
    (app, db)
}

// ── Dispatch ─────────────────────────────────────────────────

#[test]
fn test_levenshtein() {
    assert_eq!(levenshtein("quit", "quit"), 0);
    assert_eq!(levenshtein("qiut", "quit"), 2);
    assert_eq!(levenshtein("", "abc"), 3);
}

#[test]
fn test_unknown_command_suggests_closest() {
    let (mut app, mut db) = setup();
    handle_command("qiut", &mut app, &mut db).unwrap();
    assert!(app.status_message.starts_with("Unknown command: :qiut"));
    assert!(app.status_message.contains("Did you mean :quit?"));
}

#[test]
fn test_quit_stops_app() {
    let (mut app, mut db) = setup();
    handle_command("q", &mut app, &mut db).unwrap();
    assert!(!app.running);
}

#[test]
fn test_domain_errors_land_in_status_bar() {
    let (mut app, mut db) = setup();
    handle_command("stats Smarch", &mut app, &mut db).unwrap();
    assert!(app.status_message.starts_with("Invalid input:"));
    assert!(app.running);
}

#[test]
fn test_report_error_formats_storage_failures() {
    let (mut app, _db) = setup();
    report_error(&mut app, "delete", &anyhow::anyhow!("database is locked"));
    assert_eq!(app.status_message, "Error: database is locked");

    let not_found: anyhow::Error = AnalysisError::not_found("No bills found").into();
    report_error(&mut app, "stats", &not_found);
    assert_eq!(app.status_message, "Not found: No bills found");
}

// ── Bills ────────────────────────────────────────────────────

#[test]
fn test_parse_bill_args_multi_word_company() {
    let parsed = parse_bill_args("Columbia Gas March 2024 $1,090.50 West Lafayette").unwrap();
    assert_eq!(parsed.company, "Columbia Gas");
    assert_eq!(parsed.month, 3);
    assert_eq!(parsed.year, 2024);
    assert_eq!(parsed.amount, dec!(1090.50));
    assert_eq!(parsed.city, "West Lafayette");
}

#[test]
fn test_parse_bill_args_company_named_like_month() {
    let parsed = parse_bill_args("May Electric 3 2024 50").unwrap();
    assert_eq!(parsed.company, "May Electric");
    assert_eq!(parsed.month, 3);
    assert!(parsed.city.is_empty());
}

#[test]
fn test_parse_bill_args_incomplete() {
    assert!(parse_bill_args("AEP March 2024").is_none());
    assert!(parse_bill_args("").is_none());
}

#[test]
fn test_add_bill_selects_it() {
    let (mut app, mut db) = setup();
    handle_command("add AEP March 2024 95.10 Dayton", &mut app, &mut db).unwrap();

    assert_eq!(app.bills.len(), 5);
    let selected = app.selected_bill().unwrap();
    assert_eq!((selected.month, selected.year), (3, 2024));
    assert_eq!(selected.city.as_deref(), Some("Dayton"));
    assert!(app.status_message.starts_with("Added bill"));
}

#[test]
fn test_add_duplicate_bill_is_rejected() {
    let (mut app, mut db) = setup();
    handle_command("add AEP 1 2024 1.00", &mut app, &mut db).unwrap();
    assert!(app.status_message.contains("already exists"));
    assert_eq!(db.count_bills().unwrap(), 4);
}

#[test]
fn test_add_bill_unknown_company() {
    let (mut app, mut db) = setup();
    handle_command("add Duke 1 2024 10", &mut app, &mut db).unwrap();
    assert!(app.status_message.starts_with("Not found: Company 'Duke'"));
}

#[test]
fn test_update_selected_bill_keeps_city() {
    let (mut app, mut db) = setup();
    app.bill_index = 0;
    let key = app.selected_bill().unwrap().key().unwrap();

    handle_command("update 99.99", &mut app, &mut db).unwrap();

    let bill = db.get_bill(&key).unwrap().unwrap();
    assert_eq!(bill.amount, dec!(99.99));
    assert_eq!(bill.city.as_deref(), Some("Columbus"));
}

#[test]
fn test_delete_asks_for_confirmation() {
    let (mut app, mut db) = setup();
    handle_command("delete", &mut app, &mut db).unwrap();
    assert_eq!(app.input_mode, InputMode::Confirm);
    assert!(matches!(
        app.pending_action,
        Some(PendingAction::DeleteBill { .. })
    ));
    assert_eq!(db.count_bills().unwrap(), 4);
}

#[test]
fn test_year_filter() {
    let (mut app, mut db) = setup();
    handle_command("year 2024", &mut app, &mut db).unwrap();
    assert_eq!(app.bills.len(), 2);

    handle_command("year", &mut app, &mut db).unwrap();
    assert_eq!(app.bills.len(), 4);
}

#[test]
fn test_year_filter_rejects_short_year() {
    let (mut app, mut db) = setup();
    handle_command("year 24", &mut app, &mut db).unwrap();
    assert!(app.status_message.starts_with("Invalid input:"));
    assert_eq!(app.bill_filter_year, None);
}

// ── Companies ────────────────────────────────────────────────

#[test]
fn test_add_company_and_duplicate() {
    let (mut app, mut db) = setup();
    handle_command("company Columbia Gas", &mut app, &mut db).unwrap();
    assert_eq!(app.screen, Screen::Companies);
    assert_eq!(app.selected_company().unwrap().name, "Columbia Gas");

    handle_command("company columbia gas", &mut app, &mut db).unwrap();
    assert!(app.status_message.contains("already exists"));
}

#[test]
fn test_rename_without_args_enters_editing() {
    let (mut app, mut db) = setup();
    app.screen = Screen::Companies;
    handle_command("rename", &mut app, &mut db).unwrap();
    assert_eq!(app.input_mode, InputMode::Editing);
    assert_eq!(app.command_input, "AEP");
}

#[test]
fn test_delete_company_confirmation_mentions_bills() {
    let (mut app, mut db) = setup();
    app.screen = Screen::Companies;
    handle_command("delete-company", &mut app, &mut db).unwrap();
    assert_eq!(app.confirm_message, "Delete 'AEP' and its 4 bills?");
}

// ── Analysis ─────────────────────────────────────────────────

#[test]
fn test_stats_for_selected_company() {
    let (mut app, mut db) = setup();
    handle_command("stats January 1", &mut app, &mut db).unwrap();

    assert_eq!(app.screen, Screen::Analysis);
    let stats = app.stats.unwrap();
    assert_eq!(stats.bill_count, 4);
    assert_eq!(stats.average, dec!(88));
    assert_eq!(stats.median, dec!(85.5));
    assert_eq!(stats.mode, vec![dec!(72), dec!(81), dec!(90), dec!(109)]);
}

#[test]
fn test_stats_with_no_bills() {
    let (mut app, mut db) = setup();
    handle_command("stats June", &mut app, &mut db).unwrap();
    assert!(app.status_message.starts_with("Not found:"));
    assert!(app.stats.is_none());
}

#[test]
fn test_summary_by_year() {
    let (mut app, mut db) = setup();
    handle_command("summary 2024", &mut app, &mut db).unwrap();
    assert_eq!(app.summary_lines.len(), 2);
    assert_eq!(app.summary_lines[1], "AEP = 199.00");
}

#[test]
fn test_summary_number_past_december_is_a_year() {
    let (mut app, mut db) = setup();
    handle_command("summary 999", &mut app, &mut db).unwrap();
    assert_eq!(app.status_message, "Invalid input: Year must be 4 digits");

    handle_command("summary 12 2023", &mut app, &mut db).unwrap();
    assert_eq!(
        app.summary_lines,
        vec!["Total Expenditure Summary for December, 2023", "AEP = 72.00"]
    );
}

#[test]
fn test_cities_for_selected_company() {
    let (mut app, mut db) = setup();
    handle_command("cities", &mut app, &mut db).unwrap();
    assert_eq!(app.city_spending, vec![("Columbus".to_string(), dec!(352))]);
    assert_eq!(app.city_company.as_deref(), Some("AEP"));
}

// ── Transfer ─────────────────────────────────────────────────

#[test]
fn test_export_then_import_skips_duplicates() {
    let (mut app, mut db) = setup();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bills.csv");
    let path = path.to_str().unwrap();

    handle_command(&format!("export {path}"), &mut app, &mut db).unwrap();
    assert!(app.status_message.starts_with("Exported 4 bills"));

    handle_command(&format!("import {path}"), &mut app, &mut db).unwrap();
    assert_eq!(
        app.status_message,
        "Imported 0 bills (4 duplicates skipped, 0 new companies)"
    );
}
