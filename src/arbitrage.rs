//! Cross-location arbitrage engine: match same-item quotes across trading
//! hubs, price the route net of fees and transport, score by freshness,
//! rank by net profit.
//!
//! Pure and synchronous: reads an in-memory snapshot, returns a new result
//! set, holds no state across calls.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::model::{Opportunity, Quote, SellStrategy};

/// Freshness decays linearly to zero over this horizon.
pub const FRESHNESS_HORIZON_HOURS: f64 = 72.0;

/// Routes must clear this net profit to be reported.
pub const MIN_NET_PROFIT: f64 = 0.0;

/// Freshness of one observation in [0, 1]: 1 at age zero, 0 past the
/// horizon or when the price was never observed.
pub fn confidence(observed_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
    let Some(ts) = observed_at else {
        return 0.0;
    };
    let age_hours = (now - ts).num_seconds() as f64 / 3600.0;
    (1.0 - age_hours / FRESHNESS_HORIZON_HOURS).clamp(0.0, 1.0)
}

/// One side of a candidate route: where, at what price, seen when.
struct Side<'a> {
    location: &'a str,
    price: i64,
    observed_at: Option<DateTime<Utc>>,
}

/// Find profitable buy-here/sell-there routes across the quote snapshot.
///
/// The buy leg always pays the cheapest standing sell listing. The sell leg
/// depends on strategy: `Instant` fills the standing buy order, `Listed`
/// undercuts the standing sell listing. Quotes match only on identical
/// `(item_id, quality)`, and both legs must sit at different locations.
///
/// Returns at most `top_n` routes, ranked by net profit descending. Empty
/// input, no profitable pair, or `top_n == 0` all yield an empty set.
pub fn find_opportunities(
    quotes: &[Quote],
    fee_pct: f64,
    transport_cost: i64,
    top_n: usize,
    strategy: SellStrategy,
    now: DateTime<Utc>,
) -> Vec<Opportunity> {
    // Index buy-side and sell-side candidates per item key. BTreeMap keeps
    // group order deterministic so ranking ties are stable across calls.
    let mut groups: BTreeMap<String, (Vec<Side>, Vec<Side>)> = BTreeMap::new();

    for q in quotes {
        let entry = groups.entry(q.item_key()).or_default();

        if q.sell_price_min > 0 {
            entry.0.push(Side {
                location: &q.location,
                price: q.sell_price_min,
                observed_at: q.sell_price_min_at,
            });
        }

        let (sell_price, sell_at) = match strategy {
            SellStrategy::Instant => (q.buy_price_max, q.buy_price_max_at),
            SellStrategy::Listed => (q.sell_price_min, q.sell_price_min_at),
        };
        if sell_price > 0 {
            entry.1.push(Side {
                location: &q.location,
                price: sell_price,
                observed_at: sell_at,
            });
        }
    }

    let fee_multiplier = 1.0 - fee_pct / 100.0;
    let mut candidates = Vec::new();

    for (item_key, (buys, sells)) in &groups {
        for buy in buys {
            for sell in sells {
                if buy.location == sell.location {
                    continue;
                }

                // Fee is charged on the sale leg only.
                let net_profit =
                    sell.price as f64 * fee_multiplier - buy.price as f64 - transport_cost as f64;
                if net_profit <= MIN_NET_PROFIT {
                    continue;
                }

                // The buy-side candidate set only admits positive listings.
                debug_assert!(buy.price > 0);
                let profit_pct = net_profit / buy.price as f64 * 100.0;

                let confidence_score = (confidence(buy.observed_at, now)
                    + confidence(sell.observed_at, now))
                    / 2.0;

                candidates.push(Opportunity {
                    item_key: item_key.clone(),
                    buy_location: buy.location.to_string(),
                    sell_location: sell.location.to_string(),
                    buy_price: buy.price,
                    sell_price: sell.price,
                    gross_profit: sell.price - buy.price,
                    net_profit,
                    profit_pct,
                    confidence_score,
                    buy_observed_at: buy.observed_at,
                    sell_observed_at: sell.observed_at,
                });
            }
        }
    }

    candidates.sort_by(|a, b| b.net_profit.total_cmp(&a.net_profit));
    candidates.truncate(top_n);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn quote(item_id: &str, quality: i64, location: &str, sell_min: i64, buy_max: i64) -> Quote {
        Quote {
            item_id: item_id.to_string(),
            location: location.to_string(),
            quality,
            sell_price_min: sell_min,
            sell_price_min_at: Some(now()),
            buy_price_max: buy_max,
            buy_price_max_at: Some(now()),
            tier: 4,
        }
    }

    #[test]
    fn confidence_decays_linearly_over_the_horizon() {
        assert_eq!(confidence(None, now()), 0.0);
        assert_eq!(confidence(Some(now()), now()), 1.0);

        let half = now() - Duration::hours(36);
        assert!((confidence(Some(half), now()) - 0.5).abs() < 1e-9);

        let stale = now() - Duration::hours(72);
        assert_eq!(confidence(Some(stale), now()), 0.0);
        let very_stale = now() - Duration::hours(200);
        assert_eq!(confidence(Some(very_stale), now()), 0.0);
    }

    #[test]
    fn confidence_is_monotonically_non_increasing_in_age() {
        let mut prev = f64::INFINITY;
        for hours in [0, 1, 12, 36, 71, 72, 73, 500] {
            let score = confidence(Some(now() - Duration::hours(hours)), now());
            assert!(score <= prev, "age {hours}h rose to {score}");
            prev = score;
        }
    }

    #[test]
    fn instant_route_matches_the_fee_and_transport_model() {
        let quotes = vec![
            quote("T4_ORE", 1, "Martlock", 100, 0),
            quote("T4_ORE", 1, "Caerleon", 0, 200),
        ];
        let opps = find_opportunities(&quotes, 4.5, 50, 50, SellStrategy::Instant, now());

        assert_eq!(opps.len(), 1);
        let o = &opps[0];
        assert_eq!(o.item_key, "T4_ORE_Q1");
        assert_eq!(o.buy_location, "Martlock");
        assert_eq!(o.sell_location, "Caerleon");
        assert_eq!(o.gross_profit, 100);
        assert!((o.net_profit - 41.0).abs() < 1e-9);
        assert!((o.profit_pct - 41.0).abs() < 1e-9);
        assert_eq!(o.confidence_score, 1.0);
    }

    #[test]
    fn unprofitable_routes_are_dropped() {
        let quotes = vec![
            quote("T4_ORE", 1, "Martlock", 100, 0),
            quote("T4_ORE", 1, "Caerleon", 0, 200),
        ];
        // 200 * 0.955 - 100 - 200 = -109
        let opps = find_opportunities(&quotes, 4.5, 200, 50, SellStrategy::Instant, now());
        assert!(opps.is_empty());
    }

    #[test]
    fn listed_strategy_sells_against_the_standing_listing() {
        let quotes = vec![
            quote("T4_ORE", 1, "Martlock", 100, 0),
            quote("T4_ORE", 1, "Caerleon", 300, 0),
        ];
        let opps = find_opportunities(&quotes, 4.5, 50, 50, SellStrategy::Listed, now());

        // Only Martlock -> Caerleon clears; the reverse is deep underwater.
        assert_eq!(opps.len(), 1);
        let o = &opps[0];
        assert_eq!(o.buy_location, "Martlock");
        assert_eq!(o.sell_location, "Caerleon");
        assert_eq!(o.sell_price, 300);
        assert!((o.net_profit - (300.0 * 0.955 - 100.0 - 50.0)).abs() < 1e-9);
    }

    #[test]
    fn same_location_and_quality_mismatch_never_pair() {
        let quotes = vec![
            quote("T4_ORE", 1, "Martlock", 100, 500),
            quote("T4_ORE", 2, "Caerleon", 1, 500),
        ];
        let opps = find_opportunities(&quotes, 0.0, 0, 50, SellStrategy::Instant, now());
        assert!(opps.is_empty());

        for o in &opps {
            assert_ne!(o.buy_location, o.sell_location);
        }
    }

    #[test]
    fn every_result_is_strictly_profitable_across_distinct_locations() {
        let quotes = vec![
            quote("T4_ORE", 1, "Martlock", 100, 120),
            quote("T4_ORE", 1, "Caerleon", 180, 200),
            quote("T4_ORE", 1, "Thetford", 150, 90),
            quote("T5_HIDE", 2, "Martlock", 400, 350),
            quote("T5_HIDE", 2, "Lymhurst", 600, 550),
        ];
        let opps = find_opportunities(&quotes, 4.5, 20, 100, SellStrategy::Instant, now());
        assert!(!opps.is_empty());
        for o in &opps {
            assert_ne!(o.buy_location, o.sell_location);
            assert!(o.net_profit > 0.0);
            let expected =
                o.sell_price as f64 * (1.0 - 4.5 / 100.0) - o.buy_price as f64 - 20.0;
            assert!((o.net_profit - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn ranked_by_net_profit_and_truncated() {
        let quotes = vec![
            quote("T4_ORE", 1, "Martlock", 100, 0),
            quote("T4_ORE", 1, "Caerleon", 0, 200),
            quote("T5_HIDE", 1, "Martlock", 100, 0),
            quote("T5_HIDE", 1, "Caerleon", 0, 900),
        ];
        let opps = find_opportunities(&quotes, 0.0, 0, 50, SellStrategy::Instant, now());
        assert_eq!(opps.len(), 2);
        assert_eq!(opps[0].item_key, "T5_HIDE_Q1");
        assert!(opps[0].net_profit >= opps[1].net_profit);

        let top_one = find_opportunities(&quotes, 0.0, 0, 1, SellStrategy::Instant, now());
        assert_eq!(top_one.len(), 1);
        assert_eq!(top_one[0].item_key, "T5_HIDE_Q1");

        let none = find_opportunities(&quotes, 0.0, 0, 0, SellStrategy::Instant, now());
        assert!(none.is_empty());
    }

    #[test]
    fn ranking_is_idempotent_across_reinvocation() {
        let quotes = vec![
            quote("T4_ORE", 1, "Martlock", 100, 140),
            quote("T4_ORE", 1, "Caerleon", 130, 200),
            quote("T4_WOOD", 1, "Martlock", 100, 140),
            quote("T4_WOOD", 1, "Caerleon", 130, 200),
        ];
        let a = find_opportunities(&quotes, 2.0, 5, 50, SellStrategy::Instant, now());
        let b = find_opportunities(&quotes, 2.0, 5, 50, SellStrategy::Instant, now());

        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.item_key, y.item_key);
            assert_eq!(x.buy_location, y.buy_location);
            assert_eq!(x.sell_location, y.sell_location);
            assert_eq!(x.net_profit, y.net_profit);
        }
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let opps = find_opportunities(&[], 4.5, 50, 50, SellStrategy::Instant, now());
        assert!(opps.is_empty());
    }

    #[test]
    fn absent_timestamps_halve_the_confidence() {
        let mut buy = quote("T4_ORE", 1, "Martlock", 100, 0);
        buy.sell_price_min_at = Some(now());
        let mut sell = quote("T4_ORE", 1, "Caerleon", 0, 200);
        sell.buy_price_max_at = None;

        let opps = find_opportunities(&[buy, sell], 0.0, 0, 50, SellStrategy::Instant, now());
        assert_eq!(opps.len(), 1);
        assert!((opps[0].confidence_score - 0.5).abs() < 1e-9);
    }
}
