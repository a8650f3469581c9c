use rust_decimal::{Decimal, RoundingStrategy};

use crate::analysis::STAT_PRECISION;

/// Dollar amount with thousands grouping, e.g. `1234567.891` → `"$1,234,567.89"`.
pub(crate) fn format_amount(val: Decimal) -> String {
    let rounded = val.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let text = format!("{:.2}", rounded.abs());
    let (whole, cents) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if rounded < Decimal::ZERO { "-" } else { "" };
    format!("{sign}${grouped}.{cents}")
}

/// Render a statistic at stat precision, dropping trailing zeros.
/// e.g. `94.33333` → `"94.333"`, `90.00` → `"90"`
pub(crate) fn format_stat(val: Decimal) -> String {
    val.round_dp_with_strategy(STAT_PRECISION, RoundingStrategy::MidpointAwayFromZero)
        .normalize()
        .to_string()
}

/// Cut `s` to at most `max` characters, the last one becoming "…".
pub(crate) fn truncate(s: &str, max: usize) -> String {
    match s.chars().nth(max) {
        None => s.to_string(),
        Some(_) if max == 0 => String::new(),
        Some(_) => {
            let kept: String = s.chars().take(max - 1).collect();
            format!("{kept}…")
        }
    }
}

// ── Table cursor ─────────────────────────────────────────────
// `index` is the selected row, `scroll` the first visible one, `page` the
// number of visible rows.

pub(crate) fn scroll_down(index: &mut usize, scroll: &mut usize, len: usize, page: usize) {
    if *index + 1 >= len {
        return;
    }
    *index += 1;
    let page = page.max(1);
    if *index >= *scroll + page {
        *scroll = *index + 1 - page;
    }
}

pub(crate) fn scroll_up(index: &mut usize, scroll: &mut usize) {
    *index = index.saturating_sub(1);
    *scroll = (*scroll).min(*index);
}

pub(crate) fn scroll_to_top(index: &mut usize, scroll: &mut usize) {
    *index = 0;
    *scroll = 0;
}

pub(crate) fn scroll_to_bottom(index: &mut usize, scroll: &mut usize, len: usize, page: usize) {
    if len == 0 {
        return;
    }
    *index = len - 1;
    *scroll = len.saturating_sub(page.max(1));
}
