//! Last-known tick cache plus durable tick history.
//!
//! Reads are lock-free for any number of concurrent readers; writes are
//! last-write-wins per symbol keyed on the tick timestamp, since freshness
//! is judged by wall clock rather than by version. Everything downstream
//! (validator, orchestrator, lifecycle) prices off this store.

use crate::types::{Price, Symbol, Timestamp};
use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A point-in-time price observation from some source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tick {
    pub symbol: Symbol,
    pub price: Price,
    pub liquidity_usd: Option<Decimal>,
    pub volume_24h_usd: Option<Decimal>,
    pub source: String,
    pub ts: Timestamp,
}

impl Tick {
    pub fn is_stale(&self, now: Timestamp, staleness_ms: i64) -> bool {
        self.ts.age_ms(now) > staleness_ms
    }
}

#[derive(Debug)]
pub struct PriceStore {
    staleness_ms: i64,
    latest: DashMap<Symbol, Tick>,
    history: Mutex<Vec<Tick>>,
}

impl PriceStore {
    pub fn new(staleness_ms: i64) -> Self {
        Self {
            staleness_ms,
            latest: DashMap::new(),
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn staleness_ms(&self) -> i64 {
        self.staleness_ms
    }

    // Cache the tick (last-write-wins by timestamp) and append it to history.
    pub fn record(&self, tick: Tick) {
        self.history.lock().push(tick.clone());

        match self.latest.entry(tick.symbol.clone()) {
            dashmap::mapref::entry::Entry::Occupied(mut existing) => {
                if tick.ts >= existing.get().ts {
                    existing.insert(tick);
                }
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(tick);
            }
        }
    }

    /// Fresh quote or None. Stale entries are treated as unavailable.
    pub fn quote(&self, symbol: &Symbol, now: Timestamp) -> Option<Tick> {
        let tick = self.latest.get(symbol)?.value().clone();
        if tick.is_stale(now, self.staleness_ms) {
            None
        } else {
            Some(tick)
        }
    }

    pub fn quotes(&self, symbols: &[Symbol], now: Timestamp) -> HashMap<Symbol, Option<Tick>> {
        symbols
            .iter()
            .map(|s| (s.clone(), self.quote(s, now)))
            .collect()
    }

    /// Most recent tick regardless of freshness. Used as the forced-close
    /// fallback when no live quote exists.
    pub fn last_seen(&self, symbol: &Symbol) -> Option<Tick> {
        self.latest.get(symbol).map(|t| t.value().clone())
    }

    pub fn history_len(&self) -> usize {
        self.history.lock().len()
    }

    pub fn history_for(&self, symbol: &Symbol) -> Vec<Tick> {
        self.history
            .lock()
            .iter()
            .filter(|t| &t.symbol == symbol)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn tick(symbol: &str, price: Decimal, ts: i64) -> Tick {
        Tick {
            symbol: Symbol::from(symbol),
            price: Price::new_unchecked(price),
            liquidity_usd: None,
            volume_24h_usd: None,
            source: "test".to_string(),
            ts: Timestamp::from_millis(ts),
        }
    }

    #[test]
    fn fresh_quote_is_returned() {
        let store = PriceStore::new(60_000);
        store.record(tick("MAJOR:BTC-USD", dec!(50_000), 1_000));

        let quote = store
            .quote(&Symbol::from("MAJOR:BTC-USD"), Timestamp::from_millis(31_000))
            .unwrap();
        assert_eq!(quote.price.value(), dec!(50_000));
    }

    #[test]
    fn stale_quote_is_unavailable() {
        let store = PriceStore::new(60_000);
        store.record(tick("MAJOR:BTC-USD", dec!(50_000), 1_000));

        let now = Timestamp::from_millis(62_000);
        assert!(store.quote(&Symbol::from("MAJOR:BTC-USD"), now).is_none());
        // but the raw entry survives for fallback pricing
        assert!(store.last_seen(&Symbol::from("MAJOR:BTC-USD")).is_some());
    }

    #[test]
    fn last_write_wins_by_timestamp() {
        let store = PriceStore::new(60_000);
        store.record(tick("MAJOR:BTC-USD", dec!(50_000), 2_000));
        // an older tick arriving late must not clobber the newer one
        store.record(tick("MAJOR:BTC-USD", dec!(49_000), 1_000));

        let latest = store.last_seen(&Symbol::from("MAJOR:BTC-USD")).unwrap();
        assert_eq!(latest.price.value(), dec!(50_000));
        // both still land in history
        assert_eq!(store.history_len(), 2);
    }

    #[test]
    fn batch_quotes_mark_missing_symbols() {
        let store = PriceStore::new(60_000);
        store.record(tick("MAJOR:BTC-USD", dec!(50_000), 1_000));

        let symbols = [Symbol::from("MAJOR:BTC-USD"), Symbol::from("MAJOR:ETH-USD")];
        let quotes = store.quotes(&symbols, Timestamp::from_millis(2_000));

        assert!(quotes[&Symbol::from("MAJOR:BTC-USD")].is_some());
        assert!(quotes[&Symbol::from("MAJOR:ETH-USD")].is_none());
    }
}
