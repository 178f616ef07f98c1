// 11.0: account audit events. every fill, rejection, and terminal transition
// appends one. used for audit trails and state reconstruction; the payload
// carries a snapshot so the event is meaningful without joining other tables.

use crate::account::TerminalState;
use crate::types::{
    AccountId, EventId, OrderId, OrderSide, PositionSide, Price, Quote, Symbol, Timestamp, TradeId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountEvent {
    pub id: EventId,
    pub account_id: AccountId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    AccountOpened(AccountOpenedEvent),
    OrderFilled(OrderFilledEvent),
    OrderRejected(OrderRejectedEvent),
    PositionForceClosed(PositionForceClosedEvent),
    AccountTerminated(AccountTerminatedEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountOpenedEvent {
    pub starting_balance: Quote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderFilledEvent {
    pub order_id: OrderId,
    pub trade_id: TradeId,
    pub symbol: Symbol,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub fill_price: Price,
    pub fee: Quote,
    pub realized_pnl: Quote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRejectedEvent {
    pub order_id: OrderId,
    pub symbol: Symbol,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionForceClosedEvent {
    pub symbol: Symbol,
    pub side: PositionSide,
    pub quantity: Decimal,
    pub exit_price: Price,
    pub realized_pnl: Quote,
    pub fee: Quote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountTerminatedEvent {
    pub state: TerminalState,
    pub equity: Quote,
    pub margin_used: Quote,
    pub positions_closed: usize,
}
