//! Repairs raw quote batches into canonical `Quote` records.
//!
//! The upstream store has at times persisted prices through a lossy
//! round-trip (stringified composites, raw little-endian blobs), so every
//! field is coerced through an ordered cascade of typed attempts with a
//! defined fallback. A malformed field never aborts the batch: it defaults,
//! or the row is dropped.

use chrono::{DateTime, NaiveDateTime, Utc};
use rayon::prelude::*;
use tracing::debug;

use crate::model::Quote;

/// Timestamp the upstream feed uses for "never observed".
pub const NULL_TIMESTAMP: &str = "0001-01-01T00:00:00";

/// A field value of unpredictable representation, as handed back by the
/// API JSON decoder or a SQLite column read.
#[derive(Debug, Clone, PartialEq)]
pub enum RawField {
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    List(Vec<RawField>),
    Null,
}

impl From<serde_json::Value> for RawField {
    fn from(v: serde_json::Value) -> Self {
        use serde_json::Value;
        match v {
            Value::Null => RawField::Null,
            Value::Bool(b) => RawField::Int(b as i64),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    RawField::Int(i)
                } else {
                    RawField::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            Value::String(s) => RawField::Text(s),
            Value::Array(items) => {
                RawField::List(items.into_iter().map(RawField::from).collect())
            }
            Value::Object(_) => RawField::Null,
        }
    }
}

impl From<rusqlite::types::Value> for RawField {
    fn from(v: rusqlite::types::Value) -> Self {
        use rusqlite::types::Value;
        match v {
            Value::Null => RawField::Null,
            Value::Integer(i) => RawField::Int(i),
            Value::Real(f) => RawField::Float(f),
            Value::Text(s) => RawField::Text(s),
            Value::Blob(b) => RawField::Bytes(b),
        }
    }
}

/// One un-normalized candidate row, field values still untrusted.
#[derive(Debug, Clone)]
pub struct RawQuote {
    pub item_id: String,
    pub location: String,
    pub quality: RawField,
    pub sell_price_min: RawField,
    pub sell_price_min_at: RawField,
    pub buy_price_max: RawField,
    pub buy_price_max_at: RawField,
}

/// Normalize a batch. Returns the valid quotes plus the count of input
/// rows; rows with an empty identifier or no valid sell listing are
/// silently dropped.
pub fn normalize_batch(raw: Vec<RawQuote>) -> (Vec<Quote>, usize) {
    let total = raw.len();

    let quotes: Vec<Quote> = raw.into_par_iter().filter_map(normalize_row).collect();

    if quotes.len() < total {
        debug!(total, kept = quotes.len(), "dropped invalid quote rows");
    }
    (quotes, total)
}

pub fn normalize_row(raw: RawQuote) -> Option<Quote> {
    let item_id = raw.item_id.trim().to_string();
    let location = raw.location.trim().to_string();
    if item_id.is_empty() || location.is_empty() {
        return None;
    }

    let sell_price_min = coerce_price(&raw.sell_price_min);
    if sell_price_min <= 0 {
        return None;
    }

    let tier = tier_from_item_id(&item_id);

    Some(Quote {
        tier,
        quality: coerce_quality(&raw.quality),
        sell_price_min,
        sell_price_min_at: coerce_timestamp(&raw.sell_price_min_at),
        buy_price_max: coerce_price(&raw.buy_price_max),
        buy_price_max_at: coerce_timestamp(&raw.buy_price_max_at),
        item_id,
        location,
    })
}

/// Ordered coercion cascade to an integer. None on anything unrecoverable.
fn coerce_int(raw: &RawField) -> Option<i64> {
    match raw {
        RawField::Int(i) => Some(*i),
        RawField::Float(f) if f.is_finite() => Some(f.trunc() as i64),
        RawField::Text(s) => parse_int_text(s),
        RawField::List(items) => items.first().and_then(coerce_int),
        RawField::Bytes(b) if b.len() >= 4 => {
            Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as i64)
        }
        _ => None,
    }
}

/// Text form: take the first comma-separated field, strip quoting and
/// bracket artifacts, then parse (integer first, float fallback).
fn parse_int_text(s: &str) -> Option<i64> {
    let first = s.split(',').next().unwrap_or("");
    let cleaned = first
        .trim()
        .trim_matches(|c| matches!(c, '"' | '\'' | '(' | ')' | '[' | ']'))
        .trim();
    if cleaned.is_empty() {
        return None;
    }
    cleaned
        .parse::<i64>()
        .ok()
        .or_else(|| {
            cleaned
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(|f| f.trunc() as i64)
        })
}

fn coerce_price(raw: &RawField) -> i64 {
    coerce_int(raw).unwrap_or(0).max(0)
}

/// Quality is a single byte in blob form and must land in 1..=5; anything
/// corrupted or out of range becomes quality 1.
fn coerce_quality(raw: &RawField) -> i64 {
    let q = match raw {
        RawField::Bytes(b) => b.first().map(|&b| b as i64),
        other => coerce_int(other),
    };
    match q {
        Some(q @ 1..=5) => q,
        _ => 1,
    }
}

/// Null-likes and the feed's never-observed sentinel normalize to absent;
/// everything else parses as a UTC-anchored timestamp or is absent too.
pub fn coerce_timestamp(raw: &RawField) -> Option<DateTime<Utc>> {
    match raw {
        RawField::Text(s) => parse_timestamp_text(s),
        RawField::List(items) => items.first().and_then(coerce_timestamp),
        _ => None,
    }
}

fn parse_timestamp_text(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("null") || s.eq_ignore_ascii_case("nat") {
        return None;
    }
    if s.starts_with(NULL_TIMESTAMP) {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // The price API emits naive timestamps; they are UTC by contract.
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// First run of digits after a 'T' that is immediately followed by a digit:
/// "T4_ORE" -> 4, "T4_ORE_LEVEL1@1" -> 4, "MOUNT_HORSE" -> 0.
pub fn tier_from_item_id(item_id: &str) -> i64 {
    let bytes = item_id.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'T' {
            let digits: String = item_id[i + 1..]
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect();
            if !digits.is_empty() {
                return digits.parse().unwrap_or(0);
            }
        }
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_quote(item_id: &str, sell: RawField) -> RawQuote {
        RawQuote {
            item_id: item_id.to_string(),
            location: "Martlock".to_string(),
            quality: RawField::Int(1),
            sell_price_min: sell,
            sell_price_min_at: RawField::Text("2024-05-01T12:00:00".to_string()),
            buy_price_max: RawField::Int(90),
            buy_price_max_at: RawField::Null,
        }
    }

    #[test]
    fn coercion_is_lossless_for_recoverable_forms() {
        let expected = Some(1234);
        assert_eq!(coerce_int(&RawField::Int(1234)), expected);
        assert_eq!(coerce_int(&RawField::Float(1234.9)), expected);
        assert_eq!(coerce_int(&RawField::Text("1234".into())), expected);
        assert_eq!(coerce_int(&RawField::Text("1234,5678".into())), expected);
        assert_eq!(coerce_int(&RawField::Text("\"1234\"".into())), expected);
        assert_eq!(coerce_int(&RawField::Text("'1234'".into())), expected);
        assert_eq!(coerce_int(&RawField::Text("(1234,)".into())), expected);
        assert_eq!(
            coerce_int(&RawField::List(vec![RawField::Int(1234), RawField::Int(9)])),
            expected
        );
        assert_eq!(
            coerce_int(&RawField::Bytes(1234u32.to_le_bytes().to_vec())),
            expected
        );
    }

    #[test]
    fn unrecoverable_forms_default() {
        assert_eq!(coerce_price(&RawField::Null), 0);
        assert_eq!(coerce_price(&RawField::Text("garbage".into())), 0);
        assert_eq!(coerce_price(&RawField::Bytes(vec![1, 2])), 0);
        assert_eq!(coerce_price(&RawField::Int(-50)), 0);
    }

    #[test]
    fn quality_defaults_and_clamps() {
        assert_eq!(coerce_quality(&RawField::Int(3)), 3);
        assert_eq!(coerce_quality(&RawField::Bytes(vec![4, 0, 0, 0])), 4);
        assert_eq!(coerce_quality(&RawField::Int(0)), 1);
        assert_eq!(coerce_quality(&RawField::Int(7)), 1);
        assert_eq!(coerce_quality(&RawField::Text("junk".into())), 1);
        assert_eq!(coerce_quality(&RawField::Null), 1);
    }

    #[test]
    fn null_like_timestamps_are_absent() {
        for s in ["", "null", "NaT", NULL_TIMESTAMP, "not a date"] {
            assert_eq!(coerce_timestamp(&RawField::Text(s.into())), None, "{s:?}");
        }
        assert_eq!(coerce_timestamp(&RawField::Null), None);
    }

    #[test]
    fn timestamps_parse_as_utc() {
        let naive = coerce_timestamp(&RawField::Text("2024-05-01T12:30:00".into())).unwrap();
        let rfc = coerce_timestamp(&RawField::Text("2024-05-01T12:30:00Z".into())).unwrap();
        assert_eq!(naive, rfc);

        let offset = coerce_timestamp(&RawField::Text("2024-05-01T14:30:00+02:00".into())).unwrap();
        assert_eq!(offset, rfc);
    }

    #[test]
    fn tier_derivation() {
        assert_eq!(tier_from_item_id("T4_ORE"), 4);
        assert_eq!(tier_from_item_id("T8_PLANKS"), 8);
        assert_eq!(tier_from_item_id("T4_ORE_LEVEL1@1"), 4);
        assert_eq!(tier_from_item_id("MOUNT_HORSE"), 0);
        assert_eq!(tier_from_item_id(""), 0);
    }

    #[test]
    fn drops_empty_identifier_and_unsellable_rows() {
        let batch = vec![
            raw_quote("T4_ORE", RawField::Int(100)),
            raw_quote("", RawField::Int(100)),
            raw_quote("T4_ORE", RawField::Int(0)),
            raw_quote("T4_ORE", RawField::Text("junk".into())),
        ];
        let (quotes, total) = normalize_batch(batch);
        assert_eq!(total, 4);
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].sell_price_min, 100);
    }

    #[test]
    fn well_typed_rows_pass_through_unchanged() {
        let (quotes, _) = normalize_batch(vec![raw_quote("T5_HIDE", RawField::Int(777))]);
        let q = &quotes[0];
        assert_eq!(q.item_id, "T5_HIDE");
        assert_eq!(q.location, "Martlock");
        assert_eq!(q.quality, 1);
        assert_eq!(q.sell_price_min, 777);
        assert_eq!(q.buy_price_max, 90);
        assert_eq!(q.tier, 5);
        assert!(q.sell_price_min_at.is_some());
        assert!(q.buy_price_max_at.is_none());
    }

    #[test]
    fn corrupted_forms_recover_the_same_quote_as_direct_input() {
        let direct = normalize_row(raw_quote("T4_ORE", RawField::Int(1500))).unwrap();
        let as_text = normalize_row(raw_quote("T4_ORE", RawField::Text("1500,42".into()))).unwrap();
        let as_blob =
            normalize_row(raw_quote("T4_ORE", RawField::Bytes(1500u32.to_le_bytes().to_vec())))
                .unwrap();
        let as_list =
            normalize_row(raw_quote("T4_ORE", RawField::List(vec![RawField::Int(1500)]))).unwrap();

        for q in [&as_text, &as_blob, &as_list] {
            assert_eq!(q.sell_price_min, direct.sell_price_min);
        }
    }
}
