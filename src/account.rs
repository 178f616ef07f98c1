//! Account state and terminal transitions.
//!
//! An account holds cash, a derived equity snapshot, margin reserved against
//! leveraged positions, and a status. Once the status leaves ACTIVE the
//! account is dead: no order is ever accepted again and the death metadata
//! (reason, timestamp, final equity) is frozen on the row.

use crate::types::{AccountId, Quote, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountStatus {
    Active,
    Zeroed,
    Liquidated,
    Ended,
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountStatus::Active => write!(f, "ACTIVE"),
            AccountStatus::Zeroed => write!(f, "ZEROED"),
            AccountStatus::Liquidated => write!(f, "LIQUIDATED"),
            AccountStatus::Ended => write!(f, "ENDED"),
        }
    }
}

// The two ways an account dies mid-competition. ENDED is administrative
// and set from outside the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminalState {
    Zeroed,
    Liquidated,
}

impl TerminalState {
    pub fn status(&self) -> AccountStatus {
        match self {
            TerminalState::Zeroed => AccountStatus::Zeroed,
            TerminalState::Liquidated => AccountStatus::Liquidated,
        }
    }

    pub fn death_reason(&self) -> &'static str {
        match self {
            TerminalState::Zeroed => "EQUITY_DEPLETED",
            TerminalState::Liquidated => "MAINTENANCE_MARGIN_BREACH",
        }
    }
}

impl fmt::Display for TerminalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminalState::Zeroed => write!(f, "ZEROED"),
            TerminalState::Liquidated => write!(f, "LIQUIDATED"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub cash: Quote,
    // last persisted equity snapshot; recomputed by the lifecycle sweep
    pub equity: Quote,
    pub margin_used: Quote,
    pub status: AccountStatus,
    pub created_at: Timestamp,
    pub death_reason: Option<String>,
    pub death_ts: Option<Timestamp>,
    pub death_equity: Option<Quote>,
}

impl Account {
    pub fn new(id: AccountId, starting_balance: Quote, timestamp: Timestamp) -> Self {
        Self {
            id,
            cash: starting_balance,
            equity: starting_balance,
            margin_used: Quote::zero(),
            status: AccountStatus::Active,
            created_at: timestamp,
            death_reason: None,
            death_ts: None,
            death_equity: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }

    pub fn apply_cash_delta(&mut self, delta: Quote) {
        self.cash = self.cash.add(delta);
    }

    // freeze the account in a terminal state. equity here is the pre-close
    // snapshot taken before positions were force-closed.
    pub fn terminate(&mut self, state: TerminalState, equity: Quote, timestamp: Timestamp) {
        self.status = state.status();
        self.death_reason = Some(state.death_reason().to_string());
        self.death_ts = Some(timestamp);
        self.death_equity = Some(equity);
    }
}
