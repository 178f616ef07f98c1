//! Market data source abstractions.
//!
//! The engine is agnostic to where ticks come from. Majors arrive from
//! exchange-style tick sources queried by symbol; memecoins arrive from a
//! liquidity-pool source queried by token address per chain, which also
//! drives universe discovery. Mock implementations stand in for the real
//! transports and drive the simulation and tests.

use crate::asset::Chain;
use crate::price_store::Tick;
use crate::types::{Price, Symbol, Timestamp};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One tradable pair observed on a pool venue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolPair {
    pub chain: Chain,
    pub address: String,
    pub name: String,
    pub price_usd: Decimal,
    pub liquidity_usd: Decimal,
    pub volume_24h_usd: Decimal,
    pub pair_created_at: Timestamp,
}

impl PoolPair {
    pub fn symbol(&self) -> Symbol {
        self.chain.pool_symbol(&self.address)
    }
}

/// Exchange-style source for major symbols.
pub trait TickSource {
    fn name(&self) -> &str;

    /// Fetch latest ticks for the requested symbols. Unknown symbols are
    /// silently absent from the result.
    fn fetch_ticks(&self, symbols: &[Symbol], now: Timestamp) -> Vec<Tick>;

    fn healthy(&self) -> bool;
}

/// Pool data source for discovered tokens, batched by address.
pub trait PoolSource {
    fn name(&self) -> &str;

    fn fetch_pairs(&self, chain: Chain, addresses: &[String]) -> Vec<PoolPair>;

    /// Candidate pairs for universe discovery, unfiltered. The aggregator
    /// applies the universe thresholds.
    fn discover(&self) -> Vec<PoolPair>;

    fn healthy(&self) -> bool;
}

/// In-memory tick source for tests and simulation.
pub struct MockTickSource {
    name: String,
    prices: Mutex<HashMap<Symbol, Decimal>>,
    healthy: Mutex<bool>,
}

impl MockTickSource {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            prices: Mutex::new(HashMap::new()),
            healthy: Mutex::new(true),
        }
    }

    pub fn set_price(&self, symbol: Symbol, price: Decimal) {
        self.prices.lock().insert(symbol, price);
    }

    pub fn set_healthy(&self, healthy: bool) {
        *self.healthy.lock() = healthy;
    }
}

impl TickSource for MockTickSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch_ticks(&self, symbols: &[Symbol], now: Timestamp) -> Vec<Tick> {
        if !self.healthy() {
            return Vec::new();
        }

        let prices = self.prices.lock();
        symbols
            .iter()
            .filter_map(|s| {
                let price = Price::new(*prices.get(s)?)?;
                Some(Tick {
                    symbol: s.clone(),
                    price,
                    liquidity_usd: None,
                    volume_24h_usd: None,
                    source: self.name.clone(),
                    ts: now,
                })
            })
            .collect()
    }

    fn healthy(&self) -> bool {
        *self.healthy.lock()
    }
}

/// In-memory pool source for tests and simulation.
pub struct MockPoolSource {
    name: String,
    pairs: Mutex<Vec<PoolPair>>,
    healthy: Mutex<bool>,
}

impl MockPoolSource {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            pairs: Mutex::new(Vec::new()),
            healthy: Mutex::new(true),
        }
    }

    pub fn add_pair(&self, pair: PoolPair) {
        self.pairs.lock().push(pair);
    }

    pub fn set_price(&self, chain: Chain, address: &str, price: Decimal) {
        let mut pairs = self.pairs.lock();
        for pair in pairs.iter_mut() {
            if pair.chain == chain && pair.address == address {
                pair.price_usd = price;
            }
        }
    }

    pub fn set_healthy(&self, healthy: bool) {
        *self.healthy.lock() = healthy;
    }
}

impl PoolSource for MockPoolSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch_pairs(&self, chain: Chain, addresses: &[String]) -> Vec<PoolPair> {
        if !self.healthy() {
            return Vec::new();
        }

        self.pairs
            .lock()
            .iter()
            .filter(|p| p.chain == chain && addresses.contains(&p.address))
            .cloned()
            .collect()
    }

    fn discover(&self) -> Vec<PoolPair> {
        if !self.healthy() {
            return Vec::new();
        }
        self.pairs.lock().clone()
    }

    fn healthy(&self) -> bool {
        *self.healthy.lock()
    }
}
