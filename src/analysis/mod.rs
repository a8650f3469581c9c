mod month_range;
mod stats;
mod summary;

pub use month_range::{month_name, month_number, month_range};
pub use stats::{average, median, mode, total, STAT_PRECISION};
pub use summary::{city_spending, summarize, SummaryFilter, DEFAULT_CITY_LIMIT};

use anyhow::Result;
use rust_decimal::Decimal;

use crate::db::{BillFilter, Database};
use crate::error::AnalysisError;
use crate::models::{validate_month, Bill};

/// Selects the bills a statistic runs over: one month, optionally widened
/// by `range` months on each side, optionally limited to one company.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BillQuery {
    pub company_id: Option<i64>,
    pub month: u32,
    pub range: Option<u32>,
}

impl BillQuery {
    pub fn month(month: u32) -> Self {
        Self {
            company_id: None,
            month,
            range: None,
        }
    }

    pub fn for_company(mut self, company_id: i64) -> Self {
        self.company_id = Some(company_id);
        self
    }

    pub fn with_range(mut self, range: u32) -> Self {
        self.range = Some(range);
        self
    }

    pub fn to_filter(&self) -> Result<BillFilter, AnalysisError> {
        let months = match self.range {
            Some(r) => month_range(self.month, r)?,
            None => {
                validate_month(self.month)?;
                [self.month].into_iter().collect()
            }
        };
        let mut filter = BillFilter::default().months(months);
        filter.company_id = self.company_id;
        Ok(filter)
    }

    /// Human-readable scope, e.g. "March ±2 months".
    pub fn describe(&self) -> String {
        match self.range {
            Some(r) if r > 0 => format!("{} ±{r} months", month_name(self.month)),
            _ => month_name(self.month).to_string(),
        }
    }
}

pub(crate) struct BillsAnalysis<'a> {
    db: &'a Database,
}

impl<'a> BillsAnalysis<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn bills_for(&self, query: &BillQuery) -> Result<Vec<Bill>> {
        let filter = query.to_filter()?;
        let bills = self.db.get_bills(&filter)?;
        if bills.is_empty() {
            tracing::debug!(?query, "no bills for query");
            return Err(AnalysisError::not_found(format!(
                "No bills found for {}",
                query.describe()
            ))
            .into());
        }
        Ok(bills)
    }

    fn amounts(&self, query: &BillQuery) -> Result<Vec<Decimal>> {
        Ok(self
            .bills_for(query)?
            .into_iter()
            .map(|b| b.amount)
            .collect())
    }

    pub fn average(&self, query: &BillQuery) -> Result<Decimal> {
        Ok(average(&self.amounts(query)?)?)
    }

    pub fn median(&self, query: &BillQuery) -> Result<Decimal> {
        Ok(median(&self.amounts(query)?)?)
    }

    pub fn mode(&self, query: &BillQuery) -> Result<Vec<Decimal>> {
        Ok(mode(&self.amounts(query)?)?)
    }

    pub fn summary(&self, filter: SummaryFilter) -> Result<Vec<String>> {
        let bills = self.db.get_bills(&BillFilter::default())?;
        Ok(summarize(&bills, filter)?)
    }

    pub fn city_spending(&self, company_id: i64, limit: usize) -> Result<Vec<(String, Decimal)>> {
        if self.db.get_company(company_id)?.is_none() {
            return Err(AnalysisError::not_found(format!("Company {company_id} not found")).into());
        }
        let bills = self
            .db
            .get_bills(&BillFilter::default().company(company_id))?;
        Ok(city_spending(&bills, limit)?)
    }
}
