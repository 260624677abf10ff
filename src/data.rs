use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy, prelude::FromPrimitive};

/// A single table cell; `None` is a missing value.
pub type Cell = Option<String>;

/// Tokens read as missing values when loading a table.
const MISSING_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

pub fn is_missing_token(value: &str) -> bool {
    MISSING_TOKENS.contains(&value)
}

/// Converts a raw field into a cell, treating missing-value tokens as absent.
pub fn to_cell(raw: String) -> Cell {
    if is_missing_token(raw.trim()) {
        None
    } else {
        Some(raw)
    }
}

/// Coerces a cell to a number. Anything that does not parse becomes `None`.
pub fn coerce_number(value: Option<&str>) -> Option<f64> {
    let trimmed = value?.trim();
    let parsed: f64 = trimmed.parse().ok()?;
    (!parsed.is_nan()).then_some(parsed)
}

/// Coerces a cell to an exact decimal so rounding works on the written digits.
pub fn coerce_decimal(value: Option<&str>) -> Option<Decimal> {
    let trimmed = value?.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()
        .or_else(|| coerce_number(Some(trimmed)).and_then(Decimal::from_f64))
}

/// Largest scale a [`Decimal`] can represent; precision requests are clamped to it.
pub const MAX_ROUNDING_PLACES: i64 = 28;

/// Rounds half to even, the convention numeric table tools use for `round`.
/// Negative `places` round to the left of the decimal point (`-1` rounds to
/// tens).
pub fn round_decimal(value: Decimal, places: i64) -> Decimal {
    let places = places.clamp(-MAX_ROUNDING_PLACES, MAX_ROUNDING_PLACES);
    let digits = places.unsigned_abs() as u32;
    if places >= 0 {
        return value.round_dp_with_strategy(digits, RoundingStrategy::MidpointNearestEven);
    }
    let factor = Decimal::from_i128_with_scale(10_i128.pow(digits), 0);
    (value / factor)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
        .checked_mul(factor)
        .unwrap_or(value)
}

/// Title-cases text: the first letter of every alphabetic run is upper-cased and
/// the rest lower-cased. Characters without case pass through untouched.
pub fn title_case(value: &str) -> String {
    let mut output = String::with_capacity(value.len());
    let mut previous_cased = false;
    for ch in value.chars() {
        if previous_cased {
            output.extend(ch.to_lowercase());
        } else {
            output.extend(ch.to_uppercase());
        }
        previous_cased = ch.is_lowercase() || ch.is_uppercase();
    }
    output
}

/// Truncates to the first `count` characters (not bytes).
pub fn char_prefix(value: &str, count: usize) -> &str {
    match value.char_indices().nth(count) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}

pub fn render_bool(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_tokens_become_none() {
        assert_eq!(to_cell(String::new()), None);
        assert_eq!(to_cell("NaN".to_string()), None);
        assert_eq!(to_cell("  ".to_string()), None);
        assert_eq!(to_cell("unknown".to_string()), Some("unknown".to_string()));
    }

    #[test]
    fn coerce_number_rejects_text_and_nan() {
        assert_eq!(coerce_number(Some(" 221 ")), Some(221.0));
        assert_eq!(coerce_number(Some("-206.0")), Some(-206.0));
        assert_eq!(coerce_number(Some("unknown")), None);
        assert_eq!(coerce_number(Some("nan")), None);
        assert_eq!(coerce_number(None), None);
    }

    #[test]
    fn coerce_decimal_keeps_written_digits() {
        let value = coerce_decimal(Some("117.91")).unwrap();
        assert_eq!(value.to_string(), "117.91");
        assert_eq!(coerce_decimal(Some("1.1791e2")).unwrap().normalize().to_string(), "117.91");
        assert!(coerce_decimal(Some("east")).is_none());
    }

    #[test]
    fn round_decimal_uses_half_even() {
        let half = Decimal::from_str("118.5").unwrap();
        assert_eq!(round_decimal(half, 0), Decimal::from(118));
        let up = Decimal::from_str("117.91").unwrap();
        assert_eq!(round_decimal(up, 1).to_string(), "117.9");
    }

    #[test]
    fn round_decimal_handles_negative_and_oversized_places() {
        let value = Decimal::from_str("117.91").unwrap();
        assert_eq!(round_decimal(value, -1), Decimal::from(120));
        assert_eq!(round_decimal(Decimal::from_str("121.0").unwrap(), -1), Decimal::from(120));
        assert_eq!(round_decimal(Decimal::from(150), -2), Decimal::from(200));
        assert_eq!(round_decimal(Decimal::from(250), -2), Decimal::from(200));
        assert_eq!(round_decimal(value, -40), Decimal::ZERO);
        assert_eq!(round_decimal(value, 5_000_000_000), value);
    }

    #[test]
    fn title_case_matches_word_boundaries() {
        assert_eq!(title_case("zhangye xian"), "Zhangye Xian");
        assert_eq!(title_case("ZHOU"), "Zhou");
        assert_eq!(title_case("jiu-quan"), "Jiu-Quan");
        assert_eq!(title_case("張掖"), "張掖");
    }

    #[test]
    fn char_prefix_counts_characters() {
        assert_eq!(char_prefix("張掖居延屬國", 2), "張掖");
        assert_eq!(char_prefix("張", 2), "張");
        assert_eq!(char_prefix("Zhangye", 2), "Zh");
    }
}
