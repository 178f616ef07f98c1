//! Account lifecycle: terminal-state detection and forced unwinding.
//!
//! `check_and_transition` is invoked after every fill and by the periodic
//! sweep. It is idempotent — the ACTIVE guard makes a repeat call on a dead
//! account a no-op — and safe to race: two concurrent sweeps serialize on
//! the account shard and the second observes the terminal status.
//!
//! Forced closes are best-effort. One position failing to price must not
//! leave the others open or the account ACTIVE past insolvency, so errors
//! are accumulated per position and the terminal transition always lands.

use super::core::Exchange;
use super::results::{EngineError, SweepOutcome};
use crate::asset::classify;
use crate::events::{AccountTerminatedEvent, EventPayload, PositionForceClosedEvent};
use crate::fees::quote_fill;
use crate::margin::{check_terminal, compute_equity, compute_margin_used};
use crate::position::compute_unrealized_pnl;
use crate::store::AccountShard;
use crate::types::{AccountId, Symbol, Timestamp};

impl Exchange {
    /// Refresh the account's mark-to-market state, persist it, and force the
    /// account into a terminal state if it is insolvent.
    pub fn check_and_transition(&self, account_id: AccountId) -> Result<SweepOutcome, EngineError> {
        let now = Timestamp::now();
        let shard = self
            .store
            .shard(account_id)
            .ok_or(EngineError::AccountNotFound(account_id))?;
        let mut guard = shard.lock();

        if !guard.account.is_active() {
            return Ok(SweepOutcome::unchanged());
        }

        // mark-to-market: pull the latest stored tick per symbol, keeping
        // the previous mark where no tick has ever arrived
        for pos in guard.open_positions.values_mut() {
            if let Some(tick) = self.prices.last_seen(&pos.symbol) {
                pos.mark_price = tick.price;
            }
        }

        let equity = compute_equity(guard.account.cash, guard.open_positions.values());
        let margin_used = compute_margin_used(guard.open_positions.values(), &self.config.assets);
        guard.account.equity = equity;
        guard.account.margin_used = margin_used;

        let terminal = check_terminal(equity, margin_used, &self.config.margin);
        let Some(state) = terminal.state else {
            return Ok(SweepOutcome::unchanged());
        };

        log::warn!(
            "account {account_id:?} transitioning to {state}: equity={equity} margin_used={margin_used}",
        );

        let symbols: Vec<Symbol> = guard.open_positions.keys().cloned().collect();
        let mut positions_closed = 0usize;
        let mut close_errors = Vec::new();

        for symbol in symbols {
            match self.force_close(&mut guard, account_id, &symbol, now) {
                Ok(()) => positions_closed += 1,
                Err(err) => {
                    log::error!("forced close failed for {symbol}: {err}");
                    close_errors.push(format!("{symbol}: {err}"));
                }
            }
        }

        // death_equity is the pre-close snapshot
        guard.account.terminate(state, equity, now);

        self.store.append_event(
            account_id,
            EventPayload::AccountTerminated(AccountTerminatedEvent {
                state,
                equity,
                margin_used,
                positions_closed,
            }),
            now,
        );

        Ok(SweepOutcome {
            transitioned: true,
            new_state: Some(state),
            positions_closed,
            close_errors,
        })
    }

    /// Run every account through the terminal check, the periodic-sweep
    /// entry point. Accounts already terminal are skipped by the guard.
    pub fn sweep_all(&self) -> Vec<(AccountId, SweepOutcome)> {
        let mut results = Vec::new();
        for account_id in self.store.account_ids() {
            match self.check_and_transition(account_id) {
                Ok(outcome) => results.push((account_id, outcome)),
                Err(err) => log::error!("sweep failed for {account_id:?}: {err}"),
            }
        }
        results
    }

    // Close one position at the freshest price available, charging the same
    // fee/slippage as a voluntary exit on the opposite side.
    fn force_close(
        &self,
        shard: &mut AccountShard,
        account_id: AccountId,
        symbol: &Symbol,
        now: Timestamp,
    ) -> Result<(), String> {
        let pos = shard
            .open_positions
            .get(symbol)
            .ok_or_else(|| "position row missing".to_string())?;

        let quote = self.prices.quote(symbol, now);
        let (mark, liquidity) = match &quote {
            Some(q) => (q.price, q.liquidity_usd),
            None => (pos.mark_price, None),
        };

        let class = classify(symbol, &self.config.assets);
        let close_side = pos.side.closing_order_side();
        let fill = quote_fill(
            mark,
            pos.quantity,
            &class,
            close_side,
            liquidity,
            &self.config.fees,
            &self.config.slippage,
        );

        let realized = compute_unrealized_pnl(pos.side, pos.quantity, pos.entry_price, fill.fill_price);

        let mut closed = shard
            .open_positions
            .remove(symbol)
            .ok_or_else(|| "position row missing".to_string())?;

        self.store.append_event(
            account_id,
            EventPayload::PositionForceClosed(PositionForceClosedEvent {
                symbol: symbol.clone(),
                side: closed.side,
                quantity: closed.quantity,
                exit_price: fill.fill_price,
                realized_pnl: realized,
                fee: fill.fee,
            }),
            now,
        );

        // the closing fee comes out of the realized pnl on the record
        closed.realized_pnl = closed.realized_pnl.add(realized).sub(fill.fee);
        closed.mark_price = fill.fill_price;
        closed.is_open = false;
        closed.closed_at = Some(now);
        closed.updated_at = now;
        shard.closed_positions.push(closed);

        Ok(())
    }
}
