use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::BTreeMap;

use super::month_range::month_name;
use super::stats::accumulate;
use crate::error::AnalysisError;
use crate::models::{validate_month, validate_year, Bill};

pub const DEFAULT_CITY_LIMIT: usize = 10;
pub const UNKNOWN_CITY: &str = "Unknown";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SummaryFilter {
    pub month: Option<u32>,
    pub year: Option<i32>,
}

impl SummaryFilter {
    pub fn all() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn month(month: u32) -> Self {
        Self {
            month: Some(month),
            year: None,
        }
    }

    #[cfg(test)]
    pub fn year(year: i32) -> Self {
        Self {
            month: None,
            year: Some(year),
        }
    }

    #[cfg(test)]
    pub fn month_year(month: u32, year: i32) -> Self {
        Self {
            month: Some(month),
            year: Some(year),
        }
    }

    fn validate(&self) -> Result<(), AnalysisError> {
        if let Some(m) = self.month {
            validate_month(m)?;
        }
        if let Some(y) = self.year {
            validate_year(y)?;
        }
        Ok(())
    }

    fn matches(&self, bill: &Bill) -> bool {
        self.month.is_none_or(|m| bill.month == m) && self.year.is_none_or(|y| bill.year == y)
    }

    pub fn title(&self) -> String {
        match (self.month, self.year) {
            (None, None) => "Total Expenditure Summary".to_string(),
            (Some(m), None) => format!("Total Expenditure Summary for {}", month_name(m)),
            (None, Some(y)) => format!("Total Expenditure Summary for {y}"),
            (Some(m), Some(y)) => {
                format!("Total Expenditure Summary for {}, {y}", month_name(m))
            }
        }
    }

    fn empty_message(&self) -> &'static str {
        match (self.month, self.year) {
            (None, None) => "No bills found",
            (Some(_), None) => "No bills found for the given month",
            (None, Some(_)) => "No bills found for the given year",
            (Some(_), Some(_)) => "No bills found for the given month and year",
        }
    }
}

/// Format an amount with exactly two decimal places, half away from zero.
pub fn two_places(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{rounded:.2}")
}

/// Per-company totals of the bills matching `filter`, ordered by company name.
pub fn category_totals(
    bills: &[Bill],
    filter: SummaryFilter,
) -> Result<Vec<(String, Decimal)>, AnalysisError> {
    filter.validate()?;
    let mut totals: BTreeMap<String, Decimal> = BTreeMap::new();
    for bill in bills.iter().filter(|b| filter.matches(b)) {
        accumulate(
            totals.entry(bill.company.name.clone()).or_insert(Decimal::ZERO),
            bill.amount,
        )?;
    }
    if totals.is_empty() {
        return Err(AnalysisError::not_found(filter.empty_message()));
    }
    Ok(totals.into_iter().collect())
}

/// Title line followed by one `"<company> = <total>"` line per company.
pub fn summarize(bills: &[Bill], filter: SummaryFilter) -> Result<Vec<String>, AnalysisError> {
    let totals = category_totals(bills, filter)?;
    let mut lines = Vec::with_capacity(totals.len() + 1);
    lines.push(filter.title());
    lines.extend(
        totals
            .into_iter()
            .map(|(name, total)| format!("{name} = {}", two_places(total))),
    );
    Ok(lines)
}

/// Spending per city, largest first, capped at `limit` entries.
pub fn city_spending(
    bills: &[Bill],
    limit: usize,
) -> Result<Vec<(String, Decimal)>, AnalysisError> {
    if bills.is_empty() {
        return Err(AnalysisError::not_found("No bills found"));
    }
    let mut totals: BTreeMap<String, Decimal> = BTreeMap::new();
    for bill in bills {
        let city = bill.city.as_deref().unwrap_or(UNKNOWN_CITY).to_string();
        accumulate(totals.entry(city).or_insert(Decimal::ZERO), bill.amount)?;
    }

    let mut ranked: Vec<(String, Decimal)> = totals.into_iter().collect();
    // Stable sort keeps the name order among equal totals.
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.truncate(limit);
    Ok(ranked)
}

#[cfg(test)]
#[path = "summary_tests.rs"]
mod tests;
