// 10.0: persisted engine state, in memory. four logical tables: accounts,
// positions, orders (append-only), trades (append-only), plus the account
// event audit log.
//
// each account and its positions live together in a shard behind one mutex.
// the orchestrator and the lifecycle sweep hold that mutex for their entire
// read-compute-write span, which serializes concurrent mutation of the same
// account: without it, two concurrent fills could lose each other's cash,
// margin, or position writes. different accounts never contend.

use crate::account::Account;
use crate::events::{AccountEvent, EventPayload};
use crate::order::{Order, Trade};
use crate::position::Position;
use crate::types::{AccountId, EventId, OrderId, Quote, Symbol, Timestamp, TradeId};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug)]
pub struct AccountShard {
    pub account: Account,
    pub open_positions: HashMap<Symbol, Position>,
    pub closed_positions: Vec<Position>,
}

impl AccountShard {
    pub fn open_position_list(&self) -> Vec<Position> {
        self.open_positions.values().cloned().collect()
    }
}

#[derive(Debug, Default)]
pub struct ExchangeStore {
    shards: DashMap<AccountId, Arc<Mutex<AccountShard>>>,
    orders: Mutex<Vec<Order>>,
    trades: Mutex<Vec<Trade>>,
    events: Mutex<Vec<AccountEvent>>,
    next_account_id: AtomicU64,
    next_order_id: AtomicU64,
    next_trade_id: AtomicU64,
    next_event_id: AtomicU64,
}

impl ExchangeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_account(&self, starting_balance: Quote, timestamp: Timestamp) -> AccountId {
        let id = AccountId(self.next_account_id.fetch_add(1, Ordering::Relaxed) + 1);
        let shard = AccountShard {
            account: Account::new(id, starting_balance, timestamp),
            open_positions: HashMap::new(),
            closed_positions: Vec::new(),
        };
        self.shards.insert(id, Arc::new(Mutex::new(shard)));
        id
    }

    // The shard handle. Callers lock it for the whole pipeline they run.
    pub fn shard(&self, account_id: AccountId) -> Option<Arc<Mutex<AccountShard>>> {
        self.shards.get(&account_id).map(|s| Arc::clone(s.value()))
    }

    pub fn account_ids(&self) -> Vec<AccountId> {
        self.shards.iter().map(|s| *s.key()).collect()
    }

    pub fn append_order(&self, build: impl FnOnce(OrderId) -> Order) -> OrderId {
        let id = OrderId(self.next_order_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.orders.lock().push(build(id));
        id
    }

    pub fn append_trade(&self, build: impl FnOnce(TradeId) -> Trade) -> TradeId {
        let id = TradeId(self.next_trade_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.trades.lock().push(build(id));
        id
    }

    pub fn append_event(
        &self,
        account_id: AccountId,
        payload: EventPayload,
        timestamp: Timestamp,
    ) -> EventId {
        let id = EventId(self.next_event_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.events.lock().push(AccountEvent {
            id,
            account_id,
            timestamp,
            payload,
        });
        id
    }

    pub fn orders_for(&self, account_id: AccountId) -> Vec<Order> {
        self.orders
            .lock()
            .iter()
            .filter(|o| o.account_id == account_id)
            .cloned()
            .collect()
    }

    pub fn trades_for(&self, account_id: AccountId) -> Vec<Trade> {
        self.trades
            .lock()
            .iter()
            .filter(|t| t.account_id == account_id)
            .cloned()
            .collect()
    }

    pub fn events_for(&self, account_id: AccountId) -> Vec<AccountEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.account_id == account_id)
            .cloned()
            .collect()
    }

    pub fn order(&self, order_id: OrderId) -> Option<Order> {
        self.orders.lock().iter().find(|o| o.id == order_id).cloned()
    }
}
