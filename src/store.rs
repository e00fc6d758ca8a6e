//! SQLite persistence for quotes, keyed by (item_id, location, quality).
//! Last write wins; history is not retained. Reads go back through the
//! normalizer so corrupted history cannot reach profit math.

use rusqlite::{params, Connection, Result};
use tracing::{debug, info};

use crate::model::Quote;
use crate::normalize::{normalize_batch, RawField, RawQuote};

const TABLE: &str = "market_prices";

pub fn init_db(db_path: &str) -> Result<()> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {TABLE} (
            item_id TEXT NOT NULL,
            location TEXT NOT NULL,
            quality INTEGER NOT NULL,
            sell_price_min INTEGER NOT NULL,
            sell_price_min_at TEXT,
            buy_price_max INTEGER NOT NULL,
            buy_price_max_at TEXT,
            tier INTEGER NOT NULL,
            PRIMARY KEY (item_id, location, quality)
        ) WITHOUT ROWID;
        CREATE INDEX IF NOT EXISTS idx_{TABLE}_item_id ON {TABLE} (item_id);"
    ))?;
    debug!(db_path, "database initialized");
    Ok(())
}

/// Batch upsert of already-normalized quotes. A newer observation replaces
/// the prior row for its key; there is no merge.
pub fn upsert_quotes(db_path: &str, quotes: &[Quote]) -> Result<usize> {
    if quotes.is_empty() {
        return Ok(0);
    }

    let mut conn = Connection::open(db_path)?;
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(&format!(
            "INSERT INTO {TABLE} (
                item_id, location, quality,
                sell_price_min, sell_price_min_at,
                buy_price_max, buy_price_max_at, tier
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(item_id, location, quality) DO UPDATE SET
                sell_price_min = excluded.sell_price_min,
                sell_price_min_at = excluded.sell_price_min_at,
                buy_price_max = excluded.buy_price_max,
                buy_price_max_at = excluded.buy_price_max_at,
                tier = excluded.tier"
        ))?;

        for q in quotes {
            stmt.execute(params![
                q.item_id,
                q.location,
                q.quality,
                q.sell_price_min,
                q.sell_price_min_at.map(|t| t.to_rfc3339()),
                q.buy_price_max,
                q.buy_price_max_at.map(|t| t.to_rfc3339()),
                q.tier,
            ])?;
        }
    }
    tx.commit()?;

    info!(count = quotes.len(), "upserted quotes");
    Ok(quotes.len())
}

/// Load every stored quote. Columns are read back as raw values and routed
/// through the normalizer, so a historically corrupted row is repaired or
/// dropped rather than trusted.
pub fn load_quotes(db_path: &str) -> Result<Vec<Quote>> {
    let conn = Connection::open(db_path)?;

    let mut stmt = conn.prepare(&format!(
        "SELECT item_id, location, quality,
                sell_price_min, sell_price_min_at,
                buy_price_max, buy_price_max_at
         FROM {TABLE}
         ORDER BY item_id, location, quality"
    ))?;

    let rows = stmt.query_map([], |row| {
        Ok(RawQuote {
            item_id: text_of(row.get(0)?),
            location: text_of(row.get(1)?),
            quality: RawField::from(row.get::<_, rusqlite::types::Value>(2)?),
            sell_price_min: RawField::from(row.get::<_, rusqlite::types::Value>(3)?),
            sell_price_min_at: RawField::from(row.get::<_, rusqlite::types::Value>(4)?),
            buy_price_max: RawField::from(row.get::<_, rusqlite::types::Value>(5)?),
            buy_price_max_at: RawField::from(row.get::<_, rusqlite::types::Value>(6)?),
        })
    })?;

    let raw: Vec<RawQuote> = rows.filter_map(|r| r.ok()).collect();
    let (quotes, total) = normalize_batch(raw);
    debug!(total, kept = quotes.len(), "loaded quotes from store");
    Ok(quotes)
}

/// Full-store erasure; individual quotes are never deleted.
pub fn clear(db_path: &str) -> Result<usize> {
    let conn = Connection::open(db_path)?;
    let deleted = conn.execute(&format!("DELETE FROM {TABLE}"), [])?;
    info!(deleted, "cleared quote store");
    Ok(deleted)
}

fn text_of(v: rusqlite::types::Value) -> String {
    match v {
        rusqlite::types::Value::Text(s) => s,
        _ => String::new(),
    }
}
