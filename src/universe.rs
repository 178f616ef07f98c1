//! The tradable-symbol universe.
//!
//! Majors are a fixed allowlist and always tradable. Memecoins enter through
//! discovery: a pool pair must clear the liquidity, volume, and age filters.
//! Refreshes upsert by symbol so repeated discovery is idempotent, and until
//! the first refresh lands the universe falls back to the majors alone.

use crate::asset::Chain;
use crate::config::{AssetParams, UniverseFilters};
use crate::sources::PoolPair;
use crate::types::{Symbol, Timestamp};
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniverseToken {
    pub symbol: Symbol,
    pub name: String,
    pub is_major: bool,
    pub chain: Option<Chain>,
    pub address: Option<String>,
    pub liquidity_usd: Option<Decimal>,
    pub volume_24h_usd: Option<Decimal>,
    pub pair_created_at: Option<Timestamp>,
    pub last_refreshed_at: Timestamp,
}

impl UniverseToken {
    pub fn major(symbol: &Symbol, refreshed_at: Timestamp) -> Self {
        let name = symbol
            .as_str()
            .trim_start_matches("MAJOR:")
            .trim_end_matches("-USD")
            .to_string();
        Self {
            symbol: symbol.clone(),
            name,
            is_major: true,
            chain: None,
            address: None,
            liquidity_usd: None,
            volume_24h_usd: None,
            pair_created_at: None,
            last_refreshed_at: refreshed_at,
        }
    }

    pub fn from_pool(pair: &PoolPair, refreshed_at: Timestamp) -> Self {
        Self {
            symbol: pair.symbol(),
            name: pair.name.clone(),
            is_major: false,
            chain: Some(pair.chain),
            address: Some(pair.address.clone()),
            liquidity_usd: Some(pair.liquidity_usd),
            volume_24h_usd: Some(pair.volume_24h_usd),
            pair_created_at: Some(pair.pair_created_at),
            last_refreshed_at: refreshed_at,
        }
    }
}

/// Discovery gate: all three thresholds must pass.
pub fn passes_filters(pair: &PoolPair, now: Timestamp, filters: &UniverseFilters) -> bool {
    if pair.liquidity_usd < filters.min_liquidity_usd {
        return false;
    }
    if pair.volume_24h_usd < filters.min_volume_24h_usd {
        return false;
    }
    pair.pair_created_at.age_ms(now) >= filters.min_pair_age_ms
}

#[derive(Debug, Default)]
pub struct UniverseStore {
    tokens: DashMap<Symbol, UniverseToken>,
}

impl UniverseStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, token: UniverseToken) {
        self.tokens.insert(token.symbol.clone(), token);
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn all(&self) -> Vec<UniverseToken> {
        self.tokens.iter().map(|t| t.value().clone()).collect()
    }

    pub fn get(&self, symbol: &Symbol) -> Option<UniverseToken> {
        self.tokens.get(symbol).map(|t| t.value().clone())
    }

    pub fn memecoin_symbols(&self) -> Vec<Symbol> {
        self.tokens
            .iter()
            .filter(|t| !t.is_major)
            .map(|t| t.symbol.clone())
            .collect()
    }

    // The set the validator checks membership against. An unpopulated store
    // still makes the majors tradable.
    pub fn tradable_symbols(&self, assets: &AssetParams) -> HashSet<Symbol> {
        if self.tokens.is_empty() {
            return assets.majors.iter().cloned().collect();
        }
        self.tokens.iter().map(|t| t.symbol.clone()).collect()
    }
}
