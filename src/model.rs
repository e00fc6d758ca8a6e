use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

/// One market observation: what it costs to buy and what an instant
/// sale pays for an item at a single trading hub.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub item_id: String,
    pub location: String,
    pub quality: i64,

    /// Cheapest standing sell listing — the price a buyer pays here.
    pub sell_price_min: i64,
    pub sell_price_min_at: Option<DateTime<Utc>>,

    /// Highest standing buy order — the price an instant sale receives here.
    pub buy_price_max: i64,
    pub buy_price_max_at: Option<DateTime<Utc>>,

    /// Derived from the T<digit> prefix of `item_id`, 0 if unparseable.
    pub tier: i64,
}

impl Quote {
    /// Matching key for the cross-location join. Quality is part of the
    /// key: a quality-3 quote never trades against a quality-1 quote.
    pub fn item_key(&self) -> String {
        format!("{}_Q{}", self.item_id, self.quality)
    }
}

/// How the sell leg of a route is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SellStrategy {
    /// Fill an existing buy order at the sell location.
    Instant,
    /// Undercut the standing sell listing and wait for a buyer.
    Listed,
}

/// A profitable buy-here/sell-there route for one item and quality.
/// Recomputed on every query, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct Opportunity {
    pub item_key: String,
    pub buy_location: String,
    pub sell_location: String,

    pub buy_price: i64,
    pub sell_price: i64,

    pub gross_profit: i64,
    pub net_profit: f64,
    pub profit_pct: f64,
    pub confidence_score: f64,

    pub buy_observed_at: Option<DateTime<Utc>>,
    pub sell_observed_at: Option<DateTime<Utc>>,
}
