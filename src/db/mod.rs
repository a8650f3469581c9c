mod schema;

use anyhow::{Context, Result};
use rusqlite::types::{ToSql, Type};
use rusqlite::{params, Connection, ErrorCode, Row};
use rust_decimal::Decimal;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::str::FromStr;

use crate::error::AnalysisError;
use crate::models::*;

const BILL_COLUMNS: &str = "b.billing_month, b.billing_year, c.id, c.name, b.amount, b.city
     FROM bills b JOIN companies c ON b.company_id = c.id";

/// Which bills `get_bills` returns. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct BillFilter {
    pub company_id: Option<i64>,
    pub months: Option<BTreeSet<u32>>,
    pub year: Option<i32>,
    pub city: Option<String>,
}

impl BillFilter {
    pub(crate) fn company(mut self, company_id: i64) -> Self {
        self.company_id = Some(company_id);
        self
    }

    pub(crate) fn months(mut self, months: BTreeSet<u32>) -> Self {
        self.months = Some(months);
        self
    }

    pub(crate) fn year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub(crate) fn city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BatchOutcome {
    pub inserted: usize,
    pub duplicates: usize,
    pub companies_created: usize,
}

pub(crate) struct Database {
    conn: Connection,
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

fn decimal_column(row: &Row, idx: usize) -> rusqlite::Result<Decimal> {
    let text: String = row.get(idx)?;
    Decimal::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn bill_from_row(row: &Row) -> rusqlite::Result<Bill> {
    Ok(Bill {
        month: row.get(0)?,
        year: row.get(1)?,
        company: Company::with_id(row.get(2)?, row.get::<_, String>(3)?),
        amount: decimal_column(row, 4)?,
        city: row.get(5)?,
    })
}

fn now_stamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

fn duplicate_company(name: &str) -> anyhow::Error {
    AnalysisError::invalid(format!("Company '{name}' already exists")).into()
}

impl Database {
    pub(crate) fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .context("Failed to set database pragmas")?;
        let mut db = Self { conn };
        db.migrate().context("Database migration failed")?;
        Ok(db)
    }

    #[cfg(test)]
    pub(crate) fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let mut db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&mut self) -> Result<()> {
        let has_version_table: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            [],
            |row| row.get(0),
        )?;

        if !has_version_table {
            // Fresh database
            self.conn.execute_batch(schema::SCHEMA_V1)?;
            self.conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![schema::CURRENT_VERSION],
            )?;
            tracing::info!(version = schema::CURRENT_VERSION, "created database schema");
            return Ok(());
        }

        let current: i32 = self
            .conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .unwrap_or(0);

        for &(from_version, sql) in schema::MIGRATIONS {
            if current <= from_version {
                self.conn.execute_batch(sql)?;
            }
        }

        if current < schema::CURRENT_VERSION {
            self.conn.execute(
                "UPDATE schema_version SET version = ?1",
                params![schema::CURRENT_VERSION],
            )?;
            tracing::info!(
                from = current,
                to = schema::CURRENT_VERSION,
                "migrated database schema"
            );
        }

        Ok(())
    }

    // ── Companies ─────────────────────────────────────────────

    pub(crate) fn insert_company(&self, company: &Company) -> Result<i64> {
        company.validate()?;
        let name = company.name.trim();
        match self.conn.execute(
            "INSERT INTO companies (name, created_at) VALUES (?1, ?2)",
            params![name, now_stamp()],
        ) {
            Ok(_) => {}
            Err(e) if is_constraint_violation(&e) => return Err(duplicate_company(name)),
            Err(e) => return Err(e.into()),
        }
        let id = self.conn.last_insert_rowid();
        tracing::info!(id, name, "company added");
        Ok(id)
    }

    pub(crate) fn get_companies(&self) -> Result<Vec<Company>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM companies ORDER BY name")?;
        let rows = stmt.query_map([], |row| {
            Ok(Company::with_id(row.get(0)?, row.get::<_, String>(1)?))
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Companies whose name contains `filter`, ignoring case. An empty filter matches all.
    pub(crate) fn find_companies(&self, filter: &str) -> Result<Vec<Company>> {
        let filter = filter.trim();
        if filter.is_empty() {
            return self.get_companies();
        }
        let mut stmt = self.conn.prepare(
            "SELECT id, name FROM companies WHERE name LIKE ?1 ESCAPE '\\' ORDER BY name",
        )?;
        let escaped = filter
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        let rows = stmt.query_map(params![format!("%{escaped}%")], |row| {
            Ok(Company::with_id(row.get(0)?, row.get::<_, String>(1)?))
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub(crate) fn get_company(&self, id: i64) -> Result<Option<Company>> {
        let result = self.conn.query_row(
            "SELECT id, name FROM companies WHERE id = ?1",
            params![id],
            |row| Ok(Company::with_id(row.get(0)?, row.get::<_, String>(1)?)),
        );
        match result {
            Ok(c) => Ok(Some(c)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub(crate) fn get_company_by_name(&self, name: &str) -> Result<Option<Company>> {
        let result = self.conn.query_row(
            "SELECT id, name FROM companies WHERE name = ?1 COLLATE NOCASE",
            params![name.trim()],
            |row| Ok(Company::with_id(row.get(0)?, row.get::<_, String>(1)?)),
        );
        match result {
            Ok(c) => Ok(Some(c)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Bill count per company id; companies without bills are absent.
    pub(crate) fn get_bill_counts(&self) -> Result<HashMap<i64, i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT company_id, COUNT(*) FROM bills GROUP BY company_id")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        Ok(rows.collect::<std::result::Result<HashMap<_, _>, _>>()?)
    }

    pub(crate) fn update_company(&self, id: i64, name: &str) -> Result<bool> {
        let company = Company::new(name);
        company.validate()?;
        let changed = match self.conn.execute(
            "UPDATE companies SET name = ?1 WHERE id = ?2",
            params![company.name, id],
        ) {
            Ok(n) => n,
            Err(e) if is_constraint_violation(&e) => return Err(duplicate_company(&company.name)),
            Err(e) => return Err(e.into()),
        };
        if changed > 0 {
            tracing::info!(id, name = %company.name, "company renamed");
        }
        Ok(changed > 0)
    }

    /// Delete a company together with all of its bills.
    pub(crate) fn delete_company(&self, id: i64) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM companies WHERE id = ?1", params![id])?;
        if changed > 0 {
            tracing::info!(id, "company deleted");
        }
        Ok(changed > 0)
    }

    // ── Bills ─────────────────────────────────────────────────

    fn ensure_company_exists(&self, company_id: i64) -> Result<()> {
        if self.get_company(company_id)?.is_none() {
            return Err(AnalysisError::not_found(format!("Company {company_id} not found")).into());
        }
        Ok(())
    }

    /// Returns `false` without writing when a bill with the same key exists.
    pub(crate) fn insert_bill(&self, bill: &Bill) -> Result<bool> {
        bill.validate()?;
        let key = bill.key()?;
        self.ensure_company_exists(key.company_id)?;
        let changed = self.conn.execute(
            "INSERT INTO bills (billing_month, billing_year, company_id, amount, city)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(billing_month, billing_year, company_id) DO NOTHING",
            params![
                key.month,
                key.year,
                key.company_id,
                bill.amount.to_string(),
                bill.city,
            ],
        )?;
        if changed == 0 {
            tracing::warn!(?key, "bill already exists");
        } else {
            tracing::info!(?key, amount = %bill.amount, "bill added");
        }
        Ok(changed > 0)
    }

    /// Returns `false` when no bill with the same key exists.
    pub(crate) fn update_bill(&self, bill: &Bill) -> Result<bool> {
        bill.validate()?;
        let key = bill.key()?;
        let changed = self.conn.execute(
            "UPDATE bills SET amount = ?1, city = ?2
             WHERE billing_month = ?3 AND billing_year = ?4 AND company_id = ?5",
            params![
                bill.amount.to_string(),
                bill.city,
                key.month,
                key.year,
                key.company_id,
            ],
        )?;
        if changed > 0 {
            tracing::info!(?key, amount = %bill.amount, "bill updated");
        }
        Ok(changed > 0)
    }

    pub(crate) fn delete_bill(&self, key: &BillKey) -> Result<bool> {
        let changed = self.conn.execute(
            "DELETE FROM bills WHERE billing_month = ?1 AND billing_year = ?2 AND company_id = ?3",
            params![key.month, key.year, key.company_id],
        )?;
        if changed > 0 {
            tracing::info!(?key, "bill deleted");
        }
        Ok(changed > 0)
    }

    pub(crate) fn get_bill(&self, key: &BillKey) -> Result<Option<Bill>> {
        let sql = format!(
            "SELECT {BILL_COLUMNS}
             WHERE b.billing_month = ?1 AND b.billing_year = ?2 AND b.company_id = ?3"
        );
        let result = self.conn.query_row(
            &sql,
            params![key.month, key.year, key.company_id],
            bill_from_row,
        );
        match result {
            Ok(b) => Ok(Some(b)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Bills matching every set field of `filter`, sorted by year, month and company name.
    pub(crate) fn get_bills(&self, filter: &BillFilter) -> Result<Vec<Bill>> {
        let mut sql = format!("SELECT {BILL_COLUMNS} WHERE 1=1");
        let mut param_values: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(cid) = filter.company_id {
            sql.push_str(&format!(" AND b.company_id = ?{}", param_values.len() + 1));
            param_values.push(Box::new(cid));
        }
        if let Some(months) = &filter.months {
            if months.is_empty() {
                return Ok(Vec::new());
            }
            let placeholders: String = months
                .iter()
                .enumerate()
                .map(|(i, _)| format!("?{}", param_values.len() + i + 1))
                .collect::<Vec<_>>()
                .join(",");
            sql.push_str(&format!(" AND b.billing_month IN ({placeholders})"));
            for m in months {
                param_values.push(Box::new(*m));
            }
        }
        if let Some(y) = filter.year {
            sql.push_str(&format!(" AND b.billing_year = ?{}", param_values.len() + 1));
            param_values.push(Box::new(y));
        }
        if let Some(city) = &filter.city {
            sql.push_str(&format!(
                " AND b.city = ?{} COLLATE NOCASE",
                param_values.len() + 1
            ));
            param_values.push(Box::new(city.trim().to_string()));
        }

        sql.push_str(" ORDER BY b.billing_year, b.billing_month, c.name");

        let params_ref: Vec<&dyn ToSql> = param_values.iter().map(|p| p.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_ref.as_slice(), bill_from_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub(crate) fn count_bills(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM bills", [], |row| row.get(0))?)
    }

    /// Insert bills in one transaction. Each bill's company is looked up by id,
    /// then by name, and created when neither matches. Existing keys are skipped.
    pub(crate) fn insert_bills_batch(&mut self, bills: &[Bill]) -> Result<BatchOutcome> {
        let tx = self.conn.transaction()?;
        let mut outcome = BatchOutcome::default();
        for bill in bills {
            let company_id = match bill.company.id {
                Some(id) => id,
                None => {
                    let name = bill.company.name.trim();
                    let existing = tx.query_row(
                        "SELECT id FROM companies WHERE name = ?1 COLLATE NOCASE",
                        params![name],
                        |row| row.get::<_, i64>(0),
                    );
                    match existing {
                        Ok(id) => id,
                        Err(rusqlite::Error::QueryReturnedNoRows) => {
                            bill.company.validate()?;
                            tx.execute(
                                "INSERT INTO companies (name, created_at) VALUES (?1, ?2)",
                                params![name, now_stamp()],
                            )?;
                            outcome.companies_created += 1;
                            tx.last_insert_rowid()
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
            };

            let mut resolved = bill.clone();
            resolved.company.id = Some(company_id);
            resolved.validate()?;

            let changed = tx.execute(
                "INSERT INTO bills (billing_month, billing_year, company_id, amount, city)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(billing_month, billing_year, company_id) DO NOTHING",
                params![
                    resolved.month,
                    resolved.year,
                    company_id,
                    resolved.amount.to_string(),
                    resolved.city,
                ],
            )?;
            if changed > 0 {
                outcome.inserted += 1;
            } else {
                outcome.duplicates += 1;
            }
        }
        tx.commit()?;
        tracing::info!(
            inserted = outcome.inserted,
            duplicates = outcome.duplicates,
            companies_created = outcome.companies_created,
            "bill batch stored"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests;
