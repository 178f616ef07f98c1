// 2.0: order and trade records. orders are an append-only audit of every
// attempt, filled or not; trades are the executions derived 1:1 from fills.
// neither is ever mutated after insertion.

use crate::types::{
    AccountId, Bps, Leverage, OrderId, OrderSide, Price, Quote, Symbol, Timestamp, TradeId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Filled,
    Rejected,
}

// 2.1: why an order was refused. these are business outcomes, not errors:
// they are persisted on the order row and surfaced to the caller verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RejectReason {
    #[error("ACCOUNT_{0}")]
    AccountNotActive(String),

    #[error("INVALID_QUANTITY")]
    InvalidQuantity,

    #[error("SYMBOL_NOT_TRADABLE: {0}")]
    SymbolNotTradable(Symbol),

    #[error("NO_QUOTE_AVAILABLE")]
    NoQuoteAvailable,

    #[error("QUOTE_STALE")]
    QuoteStale,

    #[error("MEMECOIN_NO_LEVERAGE")]
    MemecoinNoLeverage,

    #[error("MEMECOIN_SELL_REQUIRES_OWNERSHIP")]
    MemecoinSellRequiresOwnership,

    #[error("LEVERAGE_EXCEEDS_MAX: {requested}x > {max}x")]
    LeverageExceedsMax { requested: Decimal, max: Decimal },

    #[error("INSUFFICIENT_COLLATERAL: need {required}, have {available}")]
    InsufficientCollateral { required: Quote, available: Quote },

    #[error("BELOW_MAINTENANCE: equity {equity} < required {required}")]
    BelowMaintenance { equity: Quote, required: Quote },
}

// 2.2: one order attempt. requested_price is the mark at request time,
// filled_price includes slippage. rejected orders keep the reason string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub account_id: AccountId,
    pub symbol: Symbol,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub leverage: Leverage,
    pub status: OrderStatus,
    pub reject_reason: Option<String>,
    pub requested_price: Option<Price>,
    pub filled_price: Option<Price>,
    pub fee: Option<Quote>,
    pub slippage_bps: Option<Bps>,
    pub created_at: Timestamp,
}

// 2.3: execution record for a filled order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub order_id: OrderId,
    pub account_id: AccountId,
    pub symbol: Symbol,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub price: Price,
    pub fee: Quote,
    pub realized_pnl: Quote,
    pub executed_at: Timestamp,
}
