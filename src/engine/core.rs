// 8.1: exchange construction and account access. order placement lives in
// orders.rs, the terminal sweep in lifecycle.rs.

use super::results::EngineError;
use crate::account::Account;
use crate::config::ExchangeConfig;
use crate::events::{AccountOpenedEvent, EventPayload};
use crate::order::{Order, Trade};
use crate::position::Position;
use crate::price_store::{PriceStore, Tick};
use crate::store::ExchangeStore;
use crate::types::{AccountId, OrderId, Symbol, Timestamp};
use crate::universe::{UniverseStore, UniverseToken};
use std::collections::HashMap;
use std::sync::Arc;

/// Account state plus its open positions, as one consistent snapshot.
#[derive(Debug, Clone)]
pub struct AccountSnapshot {
    pub account: Account,
    pub open_positions: Vec<Position>,
}

// The engine. Shares its price store and universe with the market data
// aggregator; everything else it owns. All methods take &self — per-account
// serialization happens on the store's shard mutexes.
pub struct Exchange {
    pub(super) config: ExchangeConfig,
    pub(super) store: ExchangeStore,
    pub(super) prices: Arc<PriceStore>,
    pub(super) universe: Arc<UniverseStore>,
}

impl Exchange {
    pub fn new(config: ExchangeConfig) -> Self {
        let prices = Arc::new(PriceStore::new(config.market_data.staleness_ms));
        let universe = Arc::new(UniverseStore::new());
        Self {
            config,
            store: ExchangeStore::new(),
            prices,
            universe,
        }
    }

    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    /// Handle for wiring the market data aggregator to the same tick cache.
    pub fn price_store(&self) -> Arc<PriceStore> {
        Arc::clone(&self.prices)
    }

    pub fn universe_store(&self) -> Arc<UniverseStore> {
        Arc::clone(&self.universe)
    }

    /// Provision a fresh ACTIVE account with the configured starting balance.
    pub fn open_account(&self) -> AccountId {
        let now = Timestamp::now();
        let starting_balance = self.config.accounts.starting_balance;
        let id = self.store.create_account(starting_balance, now);
        self.store.append_event(
            id,
            EventPayload::AccountOpened(AccountOpenedEvent { starting_balance }),
            now,
        );
        id
    }

    pub fn account(&self, account_id: AccountId) -> Result<AccountSnapshot, EngineError> {
        let shard = self
            .store
            .shard(account_id)
            .ok_or(EngineError::AccountNotFound(account_id))?;
        let guard = shard.lock();
        Ok(AccountSnapshot {
            account: guard.account.clone(),
            open_positions: guard.open_position_list(),
        })
    }

    pub fn account_ids(&self) -> Vec<AccountId> {
        self.store.account_ids()
    }

    /// Fresh quote for a symbol, or None when no usable price exists.
    pub fn quote(&self, symbol: &Symbol) -> Option<Tick> {
        self.prices.quote(symbol, Timestamp::now())
    }

    pub fn quotes(&self, symbols: &[Symbol]) -> HashMap<Symbol, Option<Tick>> {
        self.prices.quotes(symbols, Timestamp::now())
    }

    /// The tradable universe, falling back to the majors allowlist before
    /// discovery has populated the store.
    pub fn universe(&self) -> Vec<UniverseToken> {
        if self.universe.is_empty() {
            let now = Timestamp::now();
            return self
                .config
                .assets
                .majors
                .iter()
                .map(|s| UniverseToken::major(s, now))
                .collect();
        }
        self.universe.all()
    }

    pub fn orders_for(&self, account_id: AccountId) -> Vec<Order> {
        self.store.orders_for(account_id)
    }

    pub fn order(&self, order_id: OrderId) -> Option<Order> {
        self.store.order(order_id)
    }

    pub fn trades_for(&self, account_id: AccountId) -> Vec<Trade> {
        self.store.trades_for(account_id)
    }

    pub fn events_for(&self, account_id: AccountId) -> Vec<crate::events::AccountEvent> {
        self.store.events_for(account_id)
    }
}
