use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::normalize::{RawField, RawQuote};

const BASE_API_URL: &str = "https://www.albion-online-data.com/api/v2/stats/prices";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Fetch current prices from the Albion Data Project API. Returns raw
/// rows; resolving the API's null-date sentinel and any malformed values
/// is the normalizer's job, not ours.
pub fn fetch_prices(
    items: &[String],
    locations: &[String],
    qualities: &[i64],
) -> Result<Vec<RawQuote>> {
    if items.is_empty() || locations.is_empty() {
        warn!("empty item or location list, nothing to fetch");
        return Ok(Vec::new());
    }

    let item_list = items
        .iter()
        .map(|s| s.to_uppercase())
        .collect::<Vec<_>>()
        .join(",");
    let url = format!("{BASE_API_URL}/{item_list}");
    let quality_list = qualities
        .iter()
        .map(|q| q.to_string())
        .collect::<Vec<_>>()
        .join(",");

    info!(%url, locations = locations.len(), "requesting market prices");

    let client = reqwest::blocking::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .context("failed to build HTTP client")?;

    let rows: Vec<serde_json::Value> = client
        .get(&url)
        .query(&[("locations", locations.join(",")), ("qualities", quality_list)])
        .send()
        .context("price API request failed")?
        .error_for_status()
        .context("price API returned an error status")?
        .json()
        .context("price API returned malformed JSON")?;

    info!(rows = rows.len(), "price API responded");
    Ok(rows.iter().map(raw_quote_from_api).collect())
}

/// Load a local JSON batch for offline use. Tolerates the legacy shape
/// that carries a single `timestamp` for both sides.
pub fn load_sample_data(path: &str) -> Result<Vec<RawQuote>> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read sample data from {path}"))?;
    let rows: Vec<serde_json::Value> =
        serde_json::from_str(&data).context("sample data is not a JSON array")?;

    info!(rows = rows.len(), path, "loaded sample data");
    Ok(rows.iter().map(raw_quote_from_sample).collect())
}

fn raw_quote_from_api(v: &serde_json::Value) -> RawQuote {
    let field = |key: &str| {
        v.get(key)
            .cloned()
            .map(RawField::from)
            .unwrap_or(RawField::Null)
    };

    RawQuote {
        item_id: v
            .get("item_id")
            .and_then(|x| x.as_str())
            .unwrap_or_default()
            .to_string(),
        location: v
            .get("city")
            .and_then(|x| x.as_str())
            .unwrap_or_default()
            .to_string(),
        quality: field("quality"),
        sell_price_min: field("sell_price_min"),
        sell_price_min_at: field("sell_price_min_date"),
        buy_price_max: field("buy_price_max"),
        buy_price_max_at: field("buy_price_max_date"),
    }
}

fn raw_quote_from_sample(v: &serde_json::Value) -> RawQuote {
    let mut raw = raw_quote_from_api(v);
    if let Some(ts) = v.get("timestamp") {
        if raw.sell_price_min_at == RawField::Null {
            raw.sell_price_min_at = RawField::from(ts.clone());
        }
        if raw.buy_price_max_at == RawField::Null {
            raw.buy_price_max_at = RawField::from(ts.clone());
        }
    }
    raw
}
