use anyhow::{Context, Result};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;

use crate::analysis::month_number;
use crate::db::Database;
use crate::models::{Bill, Company};

/// Where each bill field lives in a CSV row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BillColumns {
    pub(crate) month: usize,
    pub(crate) year: usize,
    pub(crate) company: usize,
    pub(crate) amount: usize,
    pub(crate) city: Option<usize>,
}

impl Default for BillColumns {
    fn default() -> Self {
        Self {
            month: 0,
            year: 1,
            company: 2,
            amount: 3,
            city: Some(4),
        }
    }
}

impl BillColumns {
    /// Map header names onto columns, falling back to the default order
    /// for anything not recognised.
    pub(crate) fn detect(headers: &[String]) -> Self {
        let h: Vec<String> = headers
            .iter()
            .map(|s| s.trim().to_lowercase().replace(['_', ' '], ""))
            .collect();
        let find = |names: &[&str]| h.iter().position(|col| names.contains(&col.as_str()));

        let defaults = Self::default();
        Self {
            month: find(&["month", "billingmonth"]).unwrap_or(defaults.month),
            year: find(&["year", "billingyear"]).unwrap_or(defaults.year),
            company: find(&["company", "companyname", "biller"]).unwrap_or(defaults.company),
            amount: find(&["amount", "total", "billamount"]).unwrap_or(defaults.amount),
            city: find(&["city"]).or(defaults.city),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ImportReport {
    pub(crate) rows: usize,
    pub(crate) inserted: usize,
    pub(crate) duplicates: usize,
    pub(crate) companies_created: usize,
}

/// Read the CSV and return headers (if the first row looks like one) + all rows.
pub(crate) fn preview(path: &Path) -> Result<(Option<Vec<String>>, Vec<Vec<String>>)> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;

    let mut all_rows: Vec<Vec<String>> = Vec::new();
    for result in rdr.records() {
        let record = result.context("Failed to read CSV record")?;
        all_rows.push(record.iter().map(|s| s.to_string()).collect());
    }

    if all_rows.is_empty() {
        anyhow::bail!("CSV file is empty");
    }

    // A data row always carries a numeric year, so a header is a row where nothing parses
    let looks_like_header = all_rows[0].iter().all(|field| {
        let trimmed = field.trim();
        parse_decimal(trimmed).is_err() && month_number(trimmed).is_err()
    });

    if looks_like_header {
        let headers = all_rows.remove(0);
        Ok((Some(headers), all_rows))
    } else {
        Ok((None, all_rows))
    }
}

/// Turn CSV rows into bills whose companies are identified by name only.
pub(crate) fn parse_rows(rows: &[Vec<String>], columns: &BillColumns) -> Result<Vec<Bill>> {
    let mut bills = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        if row.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        let line = i + 1;
        let field = |idx: usize| row.get(idx).map(|s| s.trim()).unwrap_or("");

        let month = month_number(field(columns.month))
            .with_context(|| format!("Row {line}: bad month '{}'", field(columns.month)))?;
        let year: i32 = field(columns.year)
            .parse()
            .with_context(|| format!("Row {line}: bad year '{}'", field(columns.year)))?;
        let company = field(columns.company);
        if company.is_empty() {
            anyhow::bail!("Row {line}: company is required");
        }
        let amount = parse_decimal(field(columns.amount))
            .with_context(|| format!("Row {line}: failed to parse amount"))?;

        let mut bill = Bill::new(month, year, Company::new(company), amount);
        if let Some(city_col) = columns.city {
            bill = bill.with_city(field(city_col));
        }
        bills.push(bill);
    }
    Ok(bills)
}

pub(crate) fn parse_decimal(s: &str) -> Result<Decimal> {
    let cleaned = s.replace(['$', ',', '"'], "").trim().to_string();
    if cleaned.is_empty() {
        anyhow::bail!("Amount is required");
    }
    Decimal::from_str(&cleaned).with_context(|| format!("Failed to parse '{s}' as decimal"))
}

/// Import `month,year,company,amount[,city]` rows in a single transaction.
pub(crate) fn import_bills(path: &Path, db: &mut Database) -> Result<ImportReport> {
    let (headers, rows) = preview(path)?;
    let columns = headers
        .as_deref()
        .map(BillColumns::detect)
        .unwrap_or_default();
    tracing::debug!(?columns, has_header = headers.is_some(), "csv layout");

    let bills = parse_rows(&rows, &columns)?;
    let outcome = db.insert_bills_batch(&bills)?;
    let report = ImportReport {
        rows: bills.len(),
        inserted: outcome.inserted,
        duplicates: outcome.duplicates,
        companies_created: outcome.companies_created,
    };
    tracing::info!(path = %path.display(), ?report, "csv import finished");
    Ok(report)
}

#[cfg(test)]
#[path = "csv_import_tests.rs"]
mod tests;
