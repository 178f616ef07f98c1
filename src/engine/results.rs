// 8.0.2: result types and errors for engine operations.

use crate::account::TerminalState;
use crate::order::{OrderStatus, RejectReason};
use crate::types::{AccountId, OrderId, Price, Quote, TradeId};

#[derive(Debug, Clone)]
pub struct OrderOutcome {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub trade_id: Option<TradeId>,
    pub fill_price: Option<Price>,
    pub fee: Option<Quote>,
    pub reject_reason: Option<RejectReason>,
    pub account_terminated: bool,
    pub terminal_state: Option<TerminalState>,
}

impl OrderOutcome {
    pub fn success(&self) -> bool {
        self.status == OrderStatus::Filled
    }

    pub(super) fn rejected(order_id: OrderId, reason: RejectReason) -> Self {
        Self {
            order_id,
            status: OrderStatus::Rejected,
            trade_id: None,
            fill_price: None,
            fee: None,
            reject_reason: Some(reason),
            account_terminated: false,
            terminal_state: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SweepOutcome {
    pub transitioned: bool,
    pub new_state: Option<TerminalState>,
    pub positions_closed: usize,
    pub close_errors: Vec<String>,
}

impl SweepOutcome {
    pub(super) fn unchanged() -> Self {
        Self {
            transitioned: false,
            new_state: None,
            positions_closed: 0,
            close_errors: Vec::new(),
        }
    }
}

// Integrity failures. Business rejections never appear here; they travel as
// REJECTED outcomes with a reason string.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("Account {0:?} not found")]
    AccountNotFound(AccountId),
}
