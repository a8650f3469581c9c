#![allow(clippy::unwrap_used)]

use super::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn company(db: &Database, name: &str) -> Company {
    let id = db.insert_company(&Company::new(name)).unwrap();
    Company::with_id(id, name)
}

fn seed(db: &Database) -> (Company, Company) {
    let aep = company(db, "AEP");
    let nipsco = company(db, "NIPSCO");
    for (m, y, amt) in [(12, 2023, dec!(72)), (12, 2022, dec!(81)), (1, 2024, dec!(90)), (2, 2024, dec!(109))] {
        assert!(db
            .insert_bill(&Bill::new(m, y, aep.clone(), amt).with_city("Columbus"))
            .unwrap());
    }
    assert!(db
        .insert_bill(&Bill::new(1, 2024, nipsco.clone(), dec!(88)).with_city("Gary"))
        .unwrap());
    (aep, nipsco)
}

// ── Schema ────────────────────────────────────────────────────

#[test]
fn test_fresh_database_is_empty() {
    let db = Database::open_in_memory().unwrap();
    assert!(db.get_companies().unwrap().is_empty());
    assert_eq!(db.count_bills().unwrap(), 0);
}

#[test]
fn test_reopen_file_database_keeps_data() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bills.db");
    {
        let db = Database::open(&path).unwrap();
        company(&db, "AEP");
    }
    let db = Database::open(&path).unwrap();
    assert_eq!(db.get_companies().unwrap().len(), 1);
}

// ── Company CRUD ──────────────────────────────────────────────

#[test]
fn test_company_crud() {
    let db = Database::open_in_memory().unwrap();
    let id = db.insert_company(&Company::new("  Duke Energy ")).unwrap();

    let fetched = db.get_company(id).unwrap().unwrap();
    assert_eq!(fetched.name, "Duke Energy");

    assert!(db.update_company(id, "Duke").unwrap());
    assert_eq!(db.get_company(id).unwrap().unwrap().name, "Duke");

    assert!(db.delete_company(id).unwrap());
    assert!(db.get_company(id).unwrap().is_none());
    assert!(!db.delete_company(id).unwrap());
}

#[test]
fn test_company_not_found() {
    let db = Database::open_in_memory().unwrap();
    assert!(db.get_company(99999).unwrap().is_none());
    assert!(db.get_company_by_name("nobody").unwrap().is_none());
    assert!(!db.update_company(99999, "Ghost").unwrap());
}

#[test]
fn test_company_empty_name_rejected() {
    let db = Database::open_in_memory().unwrap();
    let err = db.insert_company(&Company::new("   ")).unwrap_err();
    assert_eq!(
        AnalysisError::from_anyhow(&err),
        Some(&AnalysisError::invalid("Company name is required"))
    );
    let id = db.insert_company(&Company::new("AEP")).unwrap();
    assert!(db.update_company(id, "").is_err());
}

#[test]
fn test_company_duplicate_name_rejected() {
    let db = Database::open_in_memory().unwrap();
    company(&db, "AEP");
    let err = db.insert_company(&Company::new("aep")).unwrap_err();
    assert_eq!(
        AnalysisError::from_anyhow(&err),
        Some(&AnalysisError::invalid("Company 'aep' already exists"))
    );

    let other = company(&db, "NIPSCO");
    let err = db.update_company(other.id.unwrap(), "AEP").unwrap_err();
    assert!(matches!(
        AnalysisError::from_anyhow(&err),
        Some(AnalysisError::InvalidInput(_))
    ));
}

#[test]
fn test_companies_sorted_and_filtered() {
    let db = Database::open_in_memory().unwrap();
    for name in ["Spectrum", "AEP", "Columbia Gas", "NIPSCO"] {
        company(&db, name);
    }
    let names: Vec<String> = db
        .get_companies()
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["AEP", "Columbia Gas", "NIPSCO", "Spectrum"]);

    let found = db.find_companies("CO").unwrap();
    let names: Vec<&str> = found.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Columbia Gas", "NIPSCO"]);

    assert_eq!(db.find_companies("  ").unwrap().len(), 4);
    assert!(db.find_companies("%").unwrap().is_empty());
}

#[test]
fn test_company_by_name_ignores_case() {
    let db = Database::open_in_memory().unwrap();
    let aep = company(&db, "AEP");
    assert_eq!(db.get_company_by_name(" aep ").unwrap(), Some(aep));
}

// ── Bill CRUD ─────────────────────────────────────────────────

#[test]
fn test_bill_crud() {
    let db = Database::open_in_memory().unwrap();
    let aep = company(&db, "AEP");
    let key = BillKey::new(aep.id.unwrap(), 3, 2024);

    let bill = Bill::new(3, 2024, aep.clone(), dec!(99.95)).with_city("Columbus");
    assert!(db.insert_bill(&bill).unwrap());
    assert_eq!(db.get_bill(&key).unwrap(), Some(bill));

    let changed = Bill::new(3, 2024, aep.clone(), dec!(101.10));
    assert!(db.update_bill(&changed).unwrap());
    let fetched = db.get_bill(&key).unwrap().unwrap();
    assert_eq!(fetched.amount, dec!(101.10));
    assert_eq!(fetched.city, None);

    assert!(db.delete_bill(&key).unwrap());
    assert!(db.get_bill(&key).unwrap().is_none());
    assert!(!db.delete_bill(&key).unwrap());
}

#[test]
fn test_duplicate_bill_key_not_inserted() {
    let db = Database::open_in_memory().unwrap();
    let aep = company(&db, "AEP");
    assert!(db
        .insert_bill(&Bill::new(1, 2024, aep.clone(), dec!(90)))
        .unwrap());
    assert!(!db
        .insert_bill(&Bill::new(1, 2024, aep.clone(), dec!(500)))
        .unwrap());

    let key = BillKey::new(aep.id.unwrap(), 1, 2024);
    assert_eq!(db.get_bill(&key).unwrap().unwrap().amount, dec!(90));
    assert_eq!(db.count_bills().unwrap(), 1);
}

#[test]
fn test_update_missing_bill_reports_false() {
    let db = Database::open_in_memory().unwrap();
    let aep = company(&db, "AEP");
    assert!(!db
        .update_bill(&Bill::new(5, 2024, aep, dec!(10)))
        .unwrap());
    assert_eq!(db.count_bills().unwrap(), 0);
}

#[test]
fn test_bill_validation_before_write() {
    let db = Database::open_in_memory().unwrap();
    let aep = company(&db, "AEP");

    let cases = [
        (Bill::new(13, 2024, aep.clone(), dec!(1)), "Month must be between 1 and 12"),
        (Bill::new(1, 24, aep.clone(), dec!(1)), "Year must be 4 digits"),
        (Bill::new(1, 2024, aep.clone(), dec!(-1)), "Amount must not be negative"),
        (
            Bill::new(1, 2024, aep.clone(), Decimal::MAX),
            "Amount must not exceed 1000000000000",
        ),
        (Bill::new(1, 2024, Company::new("AEP"), dec!(1)), "Company is required"),
    ];
    for (bill, msg) in cases {
        let err = db.insert_bill(&bill).unwrap_err();
        assert_eq!(
            AnalysisError::from_anyhow(&err),
            Some(&AnalysisError::invalid(msg))
        );
    }
    assert_eq!(db.count_bills().unwrap(), 0);
}

#[test]
fn test_bill_for_unknown_company_is_not_found() {
    let db = Database::open_in_memory().unwrap();
    let ghost = Company::with_id(42, "Ghost");
    let err = db
        .insert_bill(&Bill::new(1, 2024, ghost, dec!(1)))
        .unwrap_err();
    assert!(matches!(
        AnalysisError::from_anyhow(&err),
        Some(AnalysisError::NotFound(_))
    ));
}

#[test]
fn test_zero_amount_allowed() {
    let db = Database::open_in_memory().unwrap();
    let aep = company(&db, "AEP");
    assert!(db.insert_bill(&Bill::new(1, 2024, aep, dec!(0))).unwrap());
}

#[test]
fn test_delete_company_cascades_to_bills() {
    let db = Database::open_in_memory().unwrap();
    let (aep, nipsco) = seed(&db);
    assert_eq!(db.count_bills().unwrap(), 5);

    assert!(db.delete_company(aep.id.unwrap()).unwrap());
    let left = db.get_bills(&BillFilter::default()).unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].company, nipsco);
}

// ── Queries ───────────────────────────────────────────────────

#[test]
fn test_get_bills_sorted_chronologically() {
    let db = Database::open_in_memory().unwrap();
    seed(&db);
    let bills = db.get_bills(&BillFilter::default()).unwrap();
    let keys: Vec<(i32, u32, &str)> = bills
        .iter()
        .map(|b| (b.year, b.month, b.company.name.as_str()))
        .collect();
    assert_eq!(
        keys,
        vec![
            (2022, 12, "AEP"),
            (2023, 12, "AEP"),
            (2024, 1, "AEP"),
            (2024, 1, "NIPSCO"),
            (2024, 2, "AEP"),
        ]
    );
}

#[test]
fn test_get_bills_filters_combine() {
    let db = Database::open_in_memory().unwrap();
    let (aep, _) = seed(&db);

    let by_company = BillFilter::default().company(aep.id.unwrap());
    assert_eq!(db.get_bills(&by_company).unwrap().len(), 4);

    let months: BTreeSet<u32> = [12, 1].into_iter().collect();
    let by_months = BillFilter::default().months(months.clone());
    assert_eq!(db.get_bills(&by_months).unwrap().len(), 4);

    let narrowed = BillFilter::default()
        .company(aep.id.unwrap())
        .months(months)
        .year(2024);
    let bills = db.get_bills(&narrowed).unwrap();
    assert_eq!(bills.len(), 1);
    assert_eq!(bills[0].amount, dec!(90));

    let by_city = BillFilter::default().city("gary");
    assert_eq!(db.get_bills(&by_city).unwrap().len(), 1);

    let none = BillFilter::default().months(BTreeSet::new());
    assert!(db.get_bills(&none).unwrap().is_empty());
}

#[test]
fn test_bill_counts_per_company() {
    let db = Database::open_in_memory().unwrap();
    let (aep, nipsco) = seed(&db);
    let spare = company(&db, "Spare");
    let counts = db.get_bill_counts().unwrap();
    assert_eq!(counts.get(&aep.id.unwrap()), Some(&4));
    assert_eq!(counts.get(&nipsco.id.unwrap()), Some(&1));
    assert_eq!(counts.get(&spare.id.unwrap()), None);
}

#[test]
fn test_amount_precision_preserved() {
    let db = Database::open_in_memory().unwrap();
    let aep = company(&db, "AEP");
    db.insert_bill(&Bill::new(1, 2024, aep.clone(), dec!(0.10)))
        .unwrap();
    let bills = db.get_bills(&BillFilter::default()).unwrap();
    assert_eq!(bills[0].amount.to_string(), "0.10");
}

// ── Batch ─────────────────────────────────────────────────────

#[test]
fn test_batch_creates_companies_and_skips_duplicates() {
    let mut db = Database::open_in_memory().unwrap();
    let aep = company(&db, "AEP");
    db.insert_bill(&Bill::new(1, 2024, aep.clone(), dec!(90)))
        .unwrap();

    let batch = vec![
        Bill::new(1, 2024, Company::new("aep"), dec!(91)),
        Bill::new(2, 2024, Company::new("AEP"), dec!(109)),
        Bill::new(1, 2024, Company::new("Spectrum"), dec!(60)),
        Bill::new(2, 2024, Company::new("Spectrum"), dec!(60)),
        Bill::new(2, 2024, Company::new("spectrum"), dec!(61)),
    ];
    let outcome = db.insert_bills_batch(&batch).unwrap();
    assert_eq!(
        outcome,
        BatchOutcome {
            inserted: 3,
            duplicates: 2,
            companies_created: 1,
        }
    );
    assert_eq!(db.get_companies().unwrap().len(), 2);
    assert_eq!(db.count_bills().unwrap(), 4);
}

#[test]
fn test_batch_rolls_back_on_invalid_bill() {
    let mut db = Database::open_in_memory().unwrap();
    let batch = vec![
        Bill::new(1, 2024, Company::new("AEP"), dec!(90)),
        Bill::new(14, 2024, Company::new("AEP"), dec!(90)),
    ];
    assert!(db.insert_bills_batch(&batch).is_err());
    assert_eq!(db.count_bills().unwrap(), 0);
    assert!(db.get_companies().unwrap().is_empty());
}
