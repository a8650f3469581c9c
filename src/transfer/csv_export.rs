use anyhow::{Context, Result};
use std::path::Path;

use crate::db::{BillFilter, Database};

pub(crate) const EXPORT_HEADER: [&str; 5] = ["month", "year", "company", "amount", "city"];

/// Write the bills matching `filter` to `path`. Returns the number of rows written.
pub(crate) fn export_bills(path: &Path, db: &Database, filter: &BillFilter) -> Result<usize> {
    let bills = db.get_bills(filter)?;
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    wtr.write_record(EXPORT_HEADER)?;
    for bill in &bills {
        wtr.write_record([
            bill.month.to_string(),
            bill.year.to_string(),
            bill.company.name.clone(),
            bill.amount.to_string(),
            bill.city.clone().unwrap_or_default(),
        ])?;
    }
    wtr.flush().context("Failed to flush CSV export")?;
    tracing::info!(path = %path.display(), rows = bills.len(), "csv export finished");
    Ok(bills.len())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::models::{Bill, Company};
    use crate::transfer::import_bills;
    use rust_decimal_macros::dec;

    fn seeded() -> Database {
        let db = Database::open_in_memory().unwrap();
        let aep = Company::with_id(db.insert_company(&Company::new("AEP")).unwrap(), "AEP");
        let gas = Company::with_id(
            db.insert_company(&Company::new("Columbia Gas, Inc")).unwrap(),
            "Columbia Gas, Inc",
        );
        db.insert_bill(&Bill::new(1, 2024, aep.clone(), dec!(90)).with_city("Columbus"))
            .unwrap();
        db.insert_bill(&Bill::new(2, 2024, aep, dec!(109.5))).unwrap();
        db.insert_bill(&Bill::new(1, 2024, gas, dec!(45.25)).with_city("Dublin"))
            .unwrap();
        db
    }

    #[test]
    fn test_export_writes_header_and_rows() {
        let db = seeded();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bills.csv");

        let count = export_bills(&path, &db, &BillFilter::default()).unwrap();
        assert_eq!(count, 3);

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "month,year,company,amount,city");
        assert_eq!(lines[1], "1,2024,AEP,90,Columbus");
        assert_eq!(lines[2], "1,2024,\"Columbia Gas, Inc\",45.25,Dublin");
        assert_eq!(lines[3], "2,2024,AEP,109.5,");
    }

    #[test]
    fn test_export_respects_filter() {
        let db = seeded();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feb.csv");
        let filter = BillFilter::default().months([2].into_iter().collect());
        assert_eq!(export_bills(&path, &db, &filter).unwrap(), 1);
    }

    #[test]
    fn test_export_then_import_round_trip() {
        let source = seeded();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("all.csv");
        export_bills(&path, &source, &BillFilter::default()).unwrap();

        let mut target = Database::open_in_memory().unwrap();
        let report = import_bills(&path, &mut target).unwrap();
        assert_eq!(report.inserted, 3);
        assert_eq!(report.companies_created, 2);
        assert_eq!(
            target.get_bills(&BillFilter::default()).unwrap(),
            source.get_bills(&BillFilter::default()).unwrap()
                .into_iter()
                .map(|mut b| {
                    let id = target.get_company_by_name(&b.company.name).unwrap().unwrap().id;
                    b.company.id = id;
                    b
                })
                .collect::<Vec<_>>()
        );

        let again = import_bills(&path, &mut target).unwrap();
        assert_eq!(again.inserted, 0);
        assert_eq!(again.duplicates, 3);
    }
}
