use rust_decimal::Decimal;

use super::Company;
use crate::error::AnalysisError;

pub const MIN_YEAR: i32 = 1000;
pub const MAX_YEAR: i32 = 9999;
/// Largest amount a single bill may carry.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000;

/// Natural key of a bill: one charge per company per calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BillKey {
    pub month: u32,
    pub year: i32,
    pub company_id: i64,
}

impl BillKey {
    pub fn new(company_id: i64, month: u32, year: i32) -> Self {
        Self {
            month,
            year,
            company_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bill {
    pub month: u32,
    pub year: i32,
    pub company: Company,
    pub amount: Decimal,
    pub city: Option<String>,
}

impl Bill {
    pub fn new(month: u32, year: i32, company: Company, amount: Decimal) -> Self {
        Self {
            month,
            year,
            company,
            amount,
            city: None,
        }
    }

    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        let city = city.into().trim().to_string();
        self.city = if city.is_empty() { None } else { Some(city) };
        self
    }

    pub fn key(&self) -> Result<BillKey, AnalysisError> {
        let company_id = self
            .company
            .id
            .ok_or_else(|| AnalysisError::invalid("Company is required"))?;
        Ok(BillKey::new(company_id, self.month, self.year))
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        validate_month(self.month)?;
        validate_year(self.year)?;
        if self.amount < Decimal::ZERO {
            return Err(AnalysisError::invalid("Amount must not be negative"));
        }
        if self.amount > Decimal::from(MAX_AMOUNT) {
            return Err(AnalysisError::invalid(format!(
                "Amount must not exceed {MAX_AMOUNT}"
            )));
        }
        self.company.validate()?;
        self.key()?;
        Ok(())
    }
}

pub fn validate_month(month: u32) -> Result<(), AnalysisError> {
    if !(1..=12).contains(&month) {
        return Err(AnalysisError::invalid("Month must be between 1 and 12"));
    }
    Ok(())
}

pub fn validate_year(year: i32) -> Result<(), AnalysisError> {
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return Err(AnalysisError::invalid("Year must be 4 digits"));
    }
    Ok(())
}
