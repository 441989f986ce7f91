//! Free-text field parsers shared by the extractors.
//!
//! Every parser returns `None` rather than guessing when the input is missing,
//! implausible or ambiguous.

use std::sync::LazyLock;

use chrono::NaiveDate;
use kibble_core::normalize_rating;
use regex::Regex;

/// Unit alternation, longest spellings first so `kg` is not read as `g`.
const UNIT: &str = r"kilograms?|kilos?|kg|grams?|gms?|g|millilitres?|milliliters?|ml|cl|litres?|liters?|ltrs?|l";

static MULTIPACK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(\d{{1,3}})\s*[x×]\s*(\d+(?:[.,]\d+)?)\s*({UNIT})\b"
    ))
    .expect("valid regex")
});

static MULTIPACK_TRAILING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(\d+(?:[.,]\d+)?)\s*({UNIT})\s*[x×]\s*(\d{{1,3}})\b"
    ))
    .expect("valid regex")
});

static WEIGHT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\b(\d+(?:[.,]\d+)?)\s*({UNIT})\b")).expect("valid regex")
});

static PACK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:(\d{1,3})\s*-?\s*(?:pack|pk)|pack\s+of\s+(\d{1,3}))\b")
        .expect("valid regex")
});

static RANGE_AFTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(?:-|–|to|or|/)\s*\d").expect("valid regex"));

static RANGE_BEFORE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\d\s*(?:-|–|to|or|/)\s*$").expect("valid regex"));

static STOCK_QUANTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bonly\s+(\d{1,5})\s+(?:left|remaining|in\s+stock)\b|\b(\d{1,5})\s+(?:left|remaining)\s+in\s+stock\b")
        .expect("valid regex")
});

static OUT_OF_SCALE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s*(?:out\s+of|/)\s*(\d+(?:[.,]\d+)?)").expect("valid regex")
});

static PERCENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*%").expect("valid regex"));

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:[.,]\d+)?)").expect("valid regex"));

static INTEGER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,7})").expect("valid regex"));

static ORDINAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d)(?:st|nd|rd|th)\b").expect("valid regex"));

static ISO_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4}-\d{2}-\d{2})").expect("valid regex"));

static SLASH_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2}/\d{1,2}/\d{4})\b").expect("valid regex"));

static DAY_MONTH_YEAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2}\s+[A-Za-z]{3,9}\.?,?\s+\d{4})\b").expect("valid regex")
});

static MONTH_DAY_YEAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Za-z]{3,9}\.?\s+\d{1,2},?\s+\d{4})\b").expect("valid regex")
});

static GTIN_DIGITS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{14}|\d{13}|\d{12}|\d{8})\b").expect("valid regex"));

/// Heaviest pack any supported retailer sells, in grams.
const MAX_PLAUSIBLE_GRAMS: f64 = 100_000.0;
const MAX_PLAUSIBLE_PACK: u32 = 500;

const OUT_OF_STOCK_PHRASES: &[&str] = &[
    "out of stock",
    "outofstock",
    "sold out",
    "soldout",
    "currently unavailable",
    "temporarily unavailable",
    "no longer available",
    "unavailable",
    "notify me when",
    "email me when",
];

const IN_STOCK_PHRASES: &[&str] = &[
    "in stock",
    "instock",
    "add to basket",
    "add to bag",
    "add to cart",
    "available",
];

/// Collapses runs of whitespace into single spaces and trims the ends.
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Net weight and pack count read from a product title or size label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackSize {
    /// Weight of one unit in grams (1 ml counted as 1 g).
    pub weight_grams: Option<u32>,
    /// Canonical unit the weight was written in: `g`, `kg`, `ml`, `cl` or `l`.
    pub weight_unit: Option<String>,
    /// Units in a multipack.
    pub quantity: Option<u32>,
}

impl PackSize {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.weight_grams.is_none() && self.quantity.is_none()
    }
}

/// Reads weight and multipack count from free text.
///
/// Handles `"12 x 400g"`, `"400g x 12"`, `"6 pack"`, `"pack of 6"` and plain
/// `"2.5kg"`. The first plausible weight wins; a range or list of alternatives
/// (`"2kg - 12kg"`, `"400g or 800g"`) is ambiguous and yields no weight.
#[must_use]
pub fn parse_pack_size(text: &str) -> PackSize {
    if let Some(caps) = MULTIPACK_RE.captures(text) {
        let quantity = caps[1].parse::<u32>().ok().filter(|q| plausible_pack(*q));
        if let (Some(quantity), Some((grams, unit))) = (quantity, to_grams(&caps[2], &caps[3])) {
            return PackSize {
                weight_grams: Some(grams),
                weight_unit: Some(unit.to_owned()),
                quantity: Some(quantity),
            };
        }
    }
    if let Some(caps) = MULTIPACK_TRAILING_RE.captures(text) {
        let quantity = caps[3].parse::<u32>().ok().filter(|q| plausible_pack(*q));
        if let (Some(quantity), Some((grams, unit))) = (quantity, to_grams(&caps[1], &caps[2])) {
            return PackSize {
                weight_grams: Some(grams),
                weight_unit: Some(unit.to_owned()),
                quantity: Some(quantity),
            };
        }
    }

    let quantity = PACK_RE.captures(text).and_then(|caps| {
        caps.get(1)
            .or_else(|| caps.get(2))
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .filter(|q| plausible_pack(*q))
    });

    let mut size = PackSize {
        quantity,
        ..PackSize::default()
    };
    for caps in WEIGHT_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let Some((grams, unit)) = to_grams(&caps[1], &caps[2]) else {
            continue;
        };
        if RANGE_AFTER_RE.is_match(&text[whole.end()..])
            || RANGE_BEFORE_RE.is_match(&text[..whole.start()])
        {
            tracing::debug!(text, "ambiguous weight range; leaving weight absent");
            return size;
        }
        size.weight_grams = Some(grams);
        size.weight_unit = Some(unit.to_owned());
        break;
    }
    size
}

fn plausible_pack(quantity: u32) -> bool {
    (1..=MAX_PLAUSIBLE_PACK).contains(&quantity)
}

/// Converts an amount in `unit` to grams, returning the canonical unit name.
fn to_grams(amount: &str, unit: &str) -> Option<(u32, &'static str)> {
    let value: f64 = amount.replace(',', ".").parse().ok()?;
    let unit = unit.to_ascii_lowercase();
    let (factor, canonical) = match unit.as_str() {
        "kg" | "kilo" | "kilos" | "kilogram" | "kilograms" => (1000.0, "kg"),
        "g" | "gm" | "gms" | "gram" | "grams" => (1.0, "g"),
        "ml" | "millilitre" | "millilitres" | "milliliter" | "milliliters" => (1.0, "ml"),
        "cl" => (10.0, "cl"),
        "l" | "ltr" | "ltrs" | "litre" | "litres" | "liter" | "liters" => (1000.0, "l"),
        _ => return None,
    };
    let grams = (value * factor).round();
    if !(1.0..=MAX_PLAUSIBLE_GRAMS).contains(&grams) {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Some((grams as u32, canonical))
}

/// Stock signal found in a piece of page text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockSignal {
    InStock,
    OutOfStock,
}

/// Classifies availability wording. Out-of-stock phrases are checked first so
/// `"unavailable"` never reads as `"available"`.
#[must_use]
pub fn stock_signal(text: &str) -> Option<StockSignal> {
    let lowered = text.to_lowercase();
    if OUT_OF_STOCK_PHRASES.iter().any(|p| lowered.contains(p)) {
        return Some(StockSignal::OutOfStock);
    }
    if IN_STOCK_PHRASES.iter().any(|p| lowered.contains(p)) {
        return Some(StockSignal::InStock);
    }
    None
}

/// Units left from low-stock wording such as `"Only 3 left"`.
#[must_use]
pub fn parse_stock_quantity(text: &str) -> Option<u32> {
    let caps = STOCK_QUANTITY_RE.captures(text)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .and_then(|m| m.as_str().parse().ok())
}

/// Reads a rating and normalizes it onto 0–5.
///
/// Understands `"4.5 out of 5"`, `"8/10"`, percentages (`"90%"`, including
/// `"width: 90%"` star bars), star glyphs (`"★★★★☆"`) and bare numbers, which
/// are read on `default_scale`.
#[must_use]
pub fn parse_rating_text(text: &str, default_scale: f64) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Some(caps) = OUT_OF_SCALE_RE.captures(text) {
        let value = parse_decimal(&caps[1])?;
        let scale = parse_decimal(&caps[2])?;
        return normalize_rating(value, scale);
    }
    if let Some(caps) = PERCENT_RE.captures(text) {
        return normalize_rating(caps[1].parse().ok()?, 100.0);
    }
    let filled = text.chars().filter(|c| matches!(c, '★' | '⭐')).count();
    let empty = text.chars().filter(|c| *c == '☆').count();
    if filled + empty > 0 {
        #[allow(clippy::cast_precision_loss)]
        return normalize_rating(filled as f64, (filled + empty) as f64);
    }
    let value = parse_decimal(&NUMBER_RE.captures(text)?[1])?;
    normalize_rating(value, default_scale)
}

fn parse_decimal(text: &str) -> Option<f64> {
    text.replace(',', ".").parse().ok()
}

/// First integer in `text`, e.g. `"12 people found this helpful"` → 12.
#[must_use]
pub fn parse_count(text: &str) -> Option<u32> {
    INTEGER_RE.captures(text)?[1].parse().ok()
}

/// Parses the review date formats UK retailers display: ISO 8601 (with or
/// without time), `dd/mm/yyyy`, `15 March 2024`, `15th Mar 2024` and
/// `March 15, 2024`.
#[must_use]
pub fn parse_review_date(text: &str) -> Option<NaiveDate> {
    if let Some(caps) = ISO_DATE_RE.captures(text) {
        if let Ok(date) = NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d") {
            return Some(date);
        }
    }
    if let Some(caps) = SLASH_DATE_RE.captures(text) {
        if let Ok(date) = NaiveDate::parse_from_str(&caps[1], "%d/%m/%Y") {
            return Some(date);
        }
    }
    let cleaned = ORDINAL_RE.replace_all(text, "$1");
    if let Some(caps) = DAY_MONTH_YEAR_RE.captures(&cleaned) {
        let candidate = caps[1].replace([',', '.'], "");
        if let Ok(date) = NaiveDate::parse_from_str(&collapse_whitespace(&candidate), "%d %B %Y") {
            return Some(date);
        }
    }
    if let Some(caps) = MONTH_DAY_YEAR_RE.captures(&cleaned) {
        let candidate = caps[1].replace([',', '.'], "");
        if let Ok(date) = NaiveDate::parse_from_str(&collapse_whitespace(&candidate), "%B %d %Y") {
            return Some(date);
        }
    }
    None
}

/// Finds a GTIN-8/12/13/14 with a valid check digit in `text`.
#[must_use]
pub fn find_gtin(text: &str) -> Option<String> {
    GTIN_DIGITS_RE
        .captures_iter(text)
        .map(|caps| caps[1].to_owned())
        .find(|digits| is_valid_gtin(digits))
}

/// Validates length and the GS1 mod-10 check digit.
#[must_use]
pub fn is_valid_gtin(digits: &str) -> bool {
    if !matches!(digits.len(), 8 | 12 | 13 | 14) || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let values: Vec<u32> = digits.bytes().map(|b| u32::from(b - b'0')).collect();
    let (body, check) = values.split_at(values.len() - 1);
    let sum: u32 = body
        .iter()
        .rev()
        .enumerate()
        .map(|(i, d)| if i % 2 == 0 { d * 3 } else { *d })
        .sum();
    (10 - sum % 10) % 10 == check[0]
}

#[cfg(test)]
#[path = "parse_test.rs"]
mod tests;
