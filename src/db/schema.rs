pub(crate) const SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS companies (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL UNIQUE COLLATE NOCASE,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS bills (
    billing_month INTEGER NOT NULL CHECK (billing_month BETWEEN 1 AND 12),
    billing_year  INTEGER NOT NULL CHECK (billing_year BETWEEN 1000 AND 9999),
    company_id    INTEGER NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    amount        TEXT NOT NULL,
    city          TEXT,
    PRIMARY KEY (billing_month, billing_year, company_id)
);

CREATE INDEX IF NOT EXISTS idx_bills_company ON bills(company_id);
CREATE INDEX IF NOT EXISTS idx_bills_period ON bills(billing_year, billing_month);
CREATE INDEX IF NOT EXISTS idx_bills_city ON bills(city COLLATE NOCASE);

"#;

pub(crate) const CURRENT_VERSION: i32 = 1;

/// Migrations from version N to N+1.
/// Each entry is (from_version, sql).
pub(crate) const MIGRATIONS: &[(i32, &str)] = &[];
