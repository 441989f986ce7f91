//! Price text parsing and minor-unit arithmetic.
//!
//! Every amount that leaves this module is an integer count of minor currency
//! units (pence). Decimal text is parsed with [`rust_decimal`] so that
//! `"12.99"` becomes exactly `1299` without passing through binary floating
//! point.

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Parses free-form price text into integer pence.
///
/// Accepts currency symbols and surrounding words (`"£12.99"`, `"was £15.00"`,
/// `"Now only 1,299.00 GBP"`), thousands separators, decimal commas
/// (`"12,99 €"`), and bare pence (`"99p"`). The first numeric token wins.
///
/// Returns `None` when no number can be found; unparsable text is never an
/// error.
#[must_use]
pub fn parse_price_pence(text: &str) -> Option<i64> {
    let (token, rest) = first_numeric_token(text)?;

    // "99p" with no decimal separator is already in pence.
    let is_bare_pence = !token.contains(['.', ','])
        && rest.trim_start().starts_with('p')
        && !rest
            .trim_start()
            .chars()
            .nth(1)
            .is_some_and(char::is_alphabetic)
        && !text.contains(['£', '$', '€']);

    let normalized = normalize_separators(token)?;
    let value = Decimal::from_str(&normalized).ok()?;

    if is_bare_pence {
        return value.to_i64();
    }

    decimal_to_pence(value)
}

/// Converts a major-unit decimal amount into pence using `round(value * 100)`
/// with halves rounded away from zero.
#[must_use]
pub fn decimal_to_pence(value: Decimal) -> Option<i64> {
    value
        .checked_mul(Decimal::from(100))?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

/// Parses a JSON number or decimal string from structured data (`"12.99"`,
/// `12.99`, `"12"`) into pence.
#[must_use]
pub fn json_price_pence(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => {
            // Format through the JSON text form so 12.99 stays 12.99 rather
            // than its nearest binary approximation.
            let decimal = Decimal::from_str(&n.to_string()).ok()?;
            decimal_to_pence(decimal)
        }
        serde_json::Value::String(s) => parse_price_pence(s),
        _ => None,
    }
}

/// Formats pence as a plain major-unit decimal string, e.g. `1299` → `"12.99"`.
#[must_use]
pub fn format_pence(pence: i64) -> String {
    let sign = if pence < 0 { "-" } else { "" };
    let abs = pence.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

/// Formats pence with the currency symbol for known ISO codes, falling back
/// to a code suffix (`"12.99 SEK"`).
#[must_use]
pub fn format_money(pence: i64, currency: &str) -> String {
    let amount = format_pence(pence);
    match currency {
        "GBP" => format!("£{amount}"),
        "EUR" => format!("€{amount}"),
        "USD" => format!("${amount}"),
        other => format!("{amount} {other}"),
    }
}

/// Discount of `current` against `original` as a percentage rounded to two
/// decimal places: `round((original - current) / original * 100, 2)`.
///
/// Returns `None` unless `original > current` and `original > 0`.
#[must_use]
pub fn discount_percentage(current: i64, original: Option<i64>) -> Option<f64> {
    let original = original.filter(|&o| o > current && o > 0)?;
    let saving = Decimal::from(original) - Decimal::from(current);
    let pct = saving / Decimal::from(original) * Decimal::from(100);
    pct.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
}

/// Finds the first run of digits (with embedded `.`/`,`) and returns it along
/// with the text that follows it.
fn first_numeric_token(text: &str) -> Option<(&str, &str)> {
    let bytes = text.as_bytes();
    let start = bytes.iter().position(u8::is_ascii_digit)?;
    let mut end = start;
    while end < bytes.len() && (bytes[end].is_ascii_digit() || matches!(bytes[end], b'.' | b',')) {
        end += 1;
    }
    // Trailing punctuation ("£12.99.") is sentence punctuation, not a separator.
    let mut token = &text[start..end];
    while token.ends_with(['.', ',']) {
        token = &token[..token.len() - 1];
    }
    Some((token, &text[start + token.len()..]))
}

/// Rewrites a numeric token into `[digits][.digits]` form.
///
/// When both separators occur, the last one is the decimal mark. A lone comma
/// followed by one or two digits is a decimal comma; otherwise commas group
/// thousands.
fn normalize_separators(token: &str) -> Option<String> {
    let last_dot = token.rfind('.');
    let last_comma = token.rfind(',');

    let normalized = match (last_dot, last_comma) {
        (Some(dot), Some(comma)) if comma > dot => token.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => token.replace(',', ""),
        (None, Some(comma)) => {
            let decimals = token.len() - comma - 1;
            if token.matches(',').count() == 1 && (1..=2).contains(&decimals) {
                token.replace(',', ".")
            } else {
                token.replace(',', "")
            }
        }
        (Some(_), None) if token.matches('.').count() > 1 => {
            // "1.299.00" style grouping: keep only the final dot.
            let (head, tail) = token.rsplit_once('.')?;
            format!("{}.{tail}", head.replace('.', ""))
        }
        _ => token.to_owned(),
    };

    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pound_price() {
        assert_eq!(parse_price_pence("£12.99"), Some(1299));
    }

    #[test]
    fn parses_price_inside_words() {
        assert_eq!(parse_price_pence("was £15.00"), Some(1500));
        assert_eq!(parse_price_pence("Now only £3.50 each"), Some(350));
    }

    #[test]
    fn parses_thousands_separator() {
        assert_eq!(parse_price_pence("£1,299.99"), Some(129_999));
        assert_eq!(parse_price_pence("1,299"), Some(129_900));
    }

    #[test]
    fn parses_decimal_comma() {
        assert_eq!(parse_price_pence("12,99 €"), Some(1299));
        assert_eq!(parse_price_pence("1.299,50"), Some(129_950));
    }

    #[test]
    fn parses_bare_pence() {
        assert_eq!(parse_price_pence("99p"), Some(99));
        assert_eq!(parse_price_pence("45p per 100g"), Some(45));
    }

    #[test]
    fn whole_pounds_without_decimals() {
        assert_eq!(parse_price_pence("£20"), Some(2000));
    }

    #[test]
    fn strips_trailing_sentence_punctuation() {
        assert_eq!(parse_price_pence("Save on this: £4.49."), Some(449));
    }

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(parse_price_pence("£1.005"), Some(101));
        assert_eq!(parse_price_pence("£1.004"), Some(100));
    }

    #[test]
    fn unparsable_text_is_none() {
        assert_eq!(parse_price_pence("Price on request"), None);
        assert_eq!(parse_price_pence(""), None);
        assert_eq!(parse_price_pence("£"), None);
    }

    #[test]
    fn price_text_round_trips_through_format() {
        for text in ["£0.01", "£12.99", "£15.00", "£1,299.99", "£7.5", "99p", "£1000"] {
            let pence = parse_price_pence(text).expect("fixture parses");
            let reparsed = parse_price_pence(&format_money(pence, "GBP"));
            assert_eq!(reparsed, Some(pence), "round trip failed for {text}");
        }
    }

    #[test]
    fn json_numbers_and_strings_parse() {
        assert_eq!(json_price_pence(&serde_json::json!(12.99)), Some(1299));
        assert_eq!(json_price_pence(&serde_json::json!("4.20")), Some(420));
        assert_eq!(json_price_pence(&serde_json::json!(7)), Some(700));
        assert_eq!(json_price_pence(&serde_json::json!(null)), None);
    }

    #[test]
    fn oversized_amounts_are_none() {
        assert_eq!(parse_price_pence("£9999999999999999999999999999"), None);
        assert_eq!(
            json_price_pence(&serde_json::json!("79228162514264337593543950335")),
            None
        );
        assert_eq!(decimal_to_pence(Decimal::MAX), None);
        assert_eq!(parse_price_pence("£99999999999999999.99"), None);
    }

    #[test]
    fn format_pence_pads_minor_units() {
        assert_eq!(format_pence(1299), "12.99");
        assert_eq!(format_pence(5), "0.05");
        assert_eq!(format_pence(-250), "-2.50");
        assert_eq!(format_money(1299, "SEK"), "12.99 SEK");
    }

    #[test]
    fn discount_percentage_fixture() {
        assert_eq!(discount_percentage(1299, Some(1500)), Some(13.4));
    }

    #[test]
    fn discount_percentage_rounds_to_two_places() {
        // 100 / 300 = 33.333..%
        assert_eq!(discount_percentage(200, Some(300)), Some(33.33));
    }

    #[test]
    fn no_discount_when_original_not_higher() {
        assert_eq!(discount_percentage(1500, Some(1500)), None);
        assert_eq!(discount_percentage(1500, Some(1000)), None);
        assert_eq!(discount_percentage(1500, None), None);
    }
}
