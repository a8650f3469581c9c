use std::collections::BTreeSet;

use crate::error::AnalysisError;
use crate::models::validate_month;

pub const MAX_RANGE: u32 = 5;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Months within `radius` of `month`, wrapping around the year.
/// e.g. `month_range(1, 1)` → `{1, 2, 12}`
pub fn month_range(month: u32, radius: u32) -> Result<BTreeSet<u32>, AnalysisError> {
    validate_month(month)?;
    if radius > MAX_RANGE {
        return Err(AnalysisError::invalid(format!(
            "Range must be between 0 and {MAX_RANGE}"
        )));
    }

    let center = month as i64;
    let radius = radius as i64;
    Ok((center - radius..=center + radius)
        .map(|m| {
            if m <= 0 {
                m + 12
            } else if m > 12 {
                m - 12
            } else {
                m
            }
        })
        .map(|m| m as u32)
        .collect())
}

/// Parse a month given as a name ("March"), an abbreviation ("mar") or a number ("3").
pub fn month_number(input: &str) -> Result<u32, AnalysisError> {
    let trimmed = input.trim();
    if let Ok(n) = trimmed.parse::<u32>() {
        validate_month(n)?;
        return Ok(n);
    }

    let lower = trimmed.to_lowercase();
    MONTH_NAMES
        .iter()
        .position(|name| {
            let name = name.to_lowercase();
            name == lower || (lower.len() == 3 && name.starts_with(&lower))
        })
        .map(|i| i as u32 + 1)
        .ok_or_else(|| AnalysisError::invalid(format!("Invalid month: {trimmed}")))
}

/// English name for a month number; out-of-range numbers yield `"?"`.
pub fn month_name(month: u32) -> &'static str {
    month
        .checked_sub(1)
        .and_then(|i| MONTH_NAMES.get(i as usize))
        .copied()
        .unwrap_or("?")
}

#[cfg(test)]
#[path = "month_range_tests.rs"]
mod tests;
