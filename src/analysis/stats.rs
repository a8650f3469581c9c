use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::BTreeMap;

use crate::error::AnalysisError;

/// Decimal places kept by `median` and `mode`.
pub const STAT_PRECISION: u32 = 3;

fn ensure_not_empty(amounts: &[Decimal]) -> Result<(), AnalysisError> {
    if amounts.is_empty() {
        return Err(AnalysisError::not_found("No bills to analyze"));
    }
    Ok(())
}

fn round_stat(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(STAT_PRECISION, RoundingStrategy::MidpointAwayFromZero)
}

fn overflow() -> AnalysisError {
    AnalysisError::invalid("Total amount is out of range")
}

/// Add `amount` into a running total, failing instead of overflowing.
pub(crate) fn accumulate(total: &mut Decimal, amount: Decimal) -> Result<(), AnalysisError> {
    *total = total.checked_add(amount).ok_or_else(overflow)?;
    Ok(())
}

pub fn total(amounts: impl IntoIterator<Item = Decimal>) -> Result<Decimal, AnalysisError> {
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |sum, amount| sum.checked_add(amount))
        .ok_or_else(overflow)
}

pub fn average(amounts: &[Decimal]) -> Result<Decimal, AnalysisError> {
    ensure_not_empty(amounts)?;
    let sum = total(amounts.iter().copied())?;
    Ok(sum / Decimal::from(amounts.len()))
}

/// Mean of two values that stays in range for any pair of Decimals.
fn midpoint(a: Decimal, b: Decimal) -> Decimal {
    if a.is_sign_negative() != b.is_sign_negative() {
        (a + b) / Decimal::TWO
    } else {
        a + (b - a) / Decimal::TWO
    }
}

pub fn median(amounts: &[Decimal]) -> Result<Decimal, AnalysisError> {
    ensure_not_empty(amounts)?;
    let mut sorted = amounts.to_vec();
    sorted.sort();

    let mid = sorted.len() / 2;
    let median = if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        midpoint(sorted[mid - 1], sorted[mid])
    };
    Ok(round_stat(median))
}

/// Every value sharing the highest frequency, ascending.
pub fn mode(amounts: &[Decimal]) -> Result<Vec<Decimal>, AnalysisError> {
    ensure_not_empty(amounts)?;
    let mut counts: BTreeMap<Decimal, usize> = BTreeMap::new();
    for amount in amounts {
        *counts.entry(*amount).or_insert(0) += 1;
    }

    let max = counts.values().copied().max().unwrap_or(0);
    Ok(counts
        .into_iter()
        .filter(|(_, n)| *n == max)
        .map(|(value, _)| round_stat(value))
        .collect())
}

#[cfg(test)]
#[path = "stats_tests.rs"]
mod tests;
