//! Order placement: the REQUESTED → VALIDATED → PRICED → MARGIN-CHECKED →
//! FILLED|REJECTED → SETTLED pipeline.
//!
//! The account shard mutex is held from the first state read to the last
//! write, so two concurrent orders on the same account serialize and cannot
//! lose each other's cash or position updates. Orders on different accounts
//! proceed independently.

use super::core::Exchange;
use super::results::{EngineError, OrderOutcome};
use crate::asset::classify;
use crate::events::{EventPayload, OrderFilledEvent, OrderRejectedEvent};
use crate::fees::quote_fill;
use crate::margin::check_margin;
use crate::order::{Order, OrderStatus, RejectReason};
use crate::position::{compute_position_update, Position, PositionUpdateKind};
use crate::store::AccountShard;
use crate::types::{AccountId, Leverage, OrderId, OrderSide, Price, Quote, Symbol, Timestamp};
use crate::validate::{validate_order, OrderCheck};
use rust_decimal::Decimal;

impl Exchange {
    /// Execute one order through the full pipeline. This is the only code
    /// path that mutates account, position, order, or trade state.
    pub fn place_order(
        &self,
        account_id: AccountId,
        symbol: Symbol,
        side: OrderSide,
        quantity: Decimal,
        leverage: Leverage,
    ) -> Result<OrderOutcome, EngineError> {
        let now = Timestamp::now();
        let shard = self
            .store
            .shard(account_id)
            .ok_or(EngineError::AccountNotFound(account_id))?;

        let class = classify(&symbol, &self.config.assets);
        let tradable = self.universe.tradable_symbols(&self.config.assets);
        let quote = self.prices.last_seen(&symbol);

        let (order_id, trade_id, fill) = {
            let mut guard = shard.lock();

            let validation = validate_order(&OrderCheck {
                symbol: &symbol,
                side,
                quantity,
                leverage,
                class: &class,
                account_status: guard.account.status,
                open_positions: &guard.open_positions,
                quote: quote.as_ref(),
                tradable: &tradable,
                now,
                staleness_ms: self.config.market_data.staleness_ms,
            });

            if let Err(reason) = validation {
                let order_id = self.persist_rejection(
                    account_id, &symbol, side, quantity, leverage,
                    quote.as_ref().map(|q| q.price), &reason, now,
                );
                return Ok(OrderOutcome::rejected(order_id, reason));
            }

            // the validator only passes when a fresh quote exists
            let quote = quote.as_ref().unwrap();
            let mark = quote.price;

            let fill = quote_fill(
                mark,
                quantity,
                &class,
                side,
                quote.liquidity_usd,
                &self.config.fees,
                &self.config.slippage,
            );

            // margin is checked against the fill notional, not the mark
            let notional = Quote::new(quantity * fill.fill_price.value());
            let margin_check = check_margin(
                guard.account.equity,
                guard.account.margin_used,
                notional,
                leverage,
                &class,
                &self.config.margin,
            );

            if let Some(reason) = margin_check.rejection {
                let order_id = self.persist_rejection(
                    account_id, &symbol, side, quantity, leverage,
                    Some(mark), &reason, now,
                );
                return Ok(OrderOutcome::rejected(order_id, reason));
            }

            let order_id = self.store.append_order(|id| Order {
                id,
                account_id,
                symbol: symbol.clone(),
                side,
                quantity,
                leverage,
                status: OrderStatus::Filled,
                reject_reason: None,
                requested_price: Some(mark),
                filled_price: Some(fill.fill_price),
                fee: Some(fill.fee),
                slippage_bps: Some(fill.slippage_bps),
                created_at: now,
            });

            let update = compute_position_update(
                &class,
                side,
                quantity,
                fill.fill_price,
                guard.open_positions.get(&symbol),
            );
            let realized_pnl = update.realized_pnl;

            apply_position_update(&mut guard, account_id, &symbol, side, fill.fill_price, &update, now);

            let trade_id = self.store.append_trade(|id| crate::order::Trade {
                id,
                order_id,
                account_id,
                symbol: symbol.clone(),
                side,
                quantity,
                price: fill.fill_price,
                fee: fill.fee,
                realized_pnl,
                executed_at: now,
            });

            // settle cash: pay notional+fee on BUY, collect notional-fee on
            // SELL, and credit whatever the fill realized
            let cash_delta = match side {
                OrderSide::Buy => notional.add(fill.fee).negate(),
                OrderSide::Sell => notional.sub(fill.fee),
            };
            guard.account.apply_cash_delta(cash_delta.add(realized_pnl));

            self.store.append_event(
                account_id,
                EventPayload::OrderFilled(OrderFilledEvent {
                    order_id,
                    trade_id,
                    symbol: symbol.clone(),
                    side,
                    quantity,
                    fill_price: fill.fill_price,
                    fee: fill.fee,
                    realized_pnl,
                }),
                now,
            );

            log::debug!(
                "order {order_id:?} filled: {side} {quantity} {symbol} @ {} (fee {})",
                fill.fill_price,
                fill.fee,
            );

            (order_id, trade_id, fill)
        };
        // shard lock dropped: the terminal check reacquires it

        let sweep = self.check_and_transition(account_id)?;

        Ok(OrderOutcome {
            order_id,
            status: OrderStatus::Filled,
            trade_id: Some(trade_id),
            fill_price: Some(fill.fill_price),
            fee: Some(fill.fee),
            reject_reason: None,
            account_terminated: sweep.transitioned,
            terminal_state: sweep.new_state,
        })
    }

    fn persist_rejection(
        &self,
        account_id: AccountId,
        symbol: &Symbol,
        side: OrderSide,
        quantity: Decimal,
        leverage: Leverage,
        requested_price: Option<Price>,
        reason: &RejectReason,
        now: Timestamp,
    ) -> OrderId {
        let order_id = self.store.append_order(|id| Order {
            id,
            account_id,
            symbol: symbol.clone(),
            side,
            quantity,
            leverage,
            status: OrderStatus::Rejected,
            reject_reason: Some(reason.to_string()),
            requested_price,
            filled_price: None,
            fee: None,
            slippage_bps: None,
            created_at: now,
        });

        self.store.append_event(
            account_id,
            EventPayload::OrderRejected(OrderRejectedEvent {
                order_id,
                symbol: symbol.clone(),
                side,
                quantity,
                reason: reason.to_string(),
            }),
            now,
        );

        log::debug!("order {order_id:?} rejected: {reason}");
        order_id
    }
}

// Apply a computed transition to the shard's position rows.
fn apply_position_update(
    shard: &mut AccountShard,
    account_id: AccountId,
    symbol: &Symbol,
    side: OrderSide,
    fill_price: Price,
    update: &crate::position::PositionUpdate,
    now: Timestamp,
) {
    if update.closes_existing {
        if let Some(mut closed) = shard.open_positions.remove(symbol) {
            closed.is_open = false;
            closed.closed_at = Some(now);
            closed.updated_at = now;
            closed.quantity = Decimal::ZERO;
            closed.mark_price = fill_price;
            closed.realized_pnl = closed.realized_pnl.add(update.realized_pnl);
            shard.closed_positions.push(closed);
        }
    }

    match update.kind {
        PositionUpdateKind::Open | PositionUpdateKind::Flip => {
            let entry = update
                .new_entry_price
                .unwrap_or(fill_price);
            let position = Position::open(
                account_id,
                symbol.clone(),
                side.position_side(),
                update.new_quantity,
                entry,
                now,
            );
            shard.open_positions.insert(symbol.clone(), position);
        }
        PositionUpdateKind::Increase | PositionUpdateKind::Reduce => {
            if let Some(pos) = shard.open_positions.get_mut(symbol) {
                pos.quantity = update.new_quantity;
                if let Some(entry) = update.new_entry_price {
                    pos.entry_price = entry;
                }
                pos.mark_price = fill_price;
                pos.realized_pnl = pos.realized_pnl.add(update.realized_pnl);
                pos.updated_at = now;
            }
        }
        PositionUpdateKind::Close => {}
    }
}
