//! Margin, equity, and solvency math.
//!
//! Everything here is a pure function over an explicit account + position
//! snapshot. Initial margin is notional divided by effective leverage;
//! maintenance is a fixed fraction of total margin used. Only open major
//! positions reserve margin — memecoins are unleveraged spot and contribute
//! zero.

use crate::asset::{classify, AssetClass};
use crate::config::{AssetParams, MarginParams};
use crate::account::TerminalState;
use crate::order::RejectReason;
use crate::position::Position;
use crate::types::{Leverage, Quote, Symbol};
use rust_decimal::Decimal;

/// Max leverage allowed for a symbol: the shared cap for majors, 1x otherwise.
pub fn max_leverage(symbol: &Symbol, assets: &AssetParams) -> Leverage {
    classify(symbol, assets).leverage_cap()
}

#[derive(Debug, Clone)]
pub struct MarginCheck {
    pub notional: Quote,
    pub initial_margin: Quote,
    pub total_margin_used: Quote,
    pub maintenance_required: Quote,
    pub free_collateral: Quote,
    pub effective_leverage: Leverage,
    pub rejection: Option<RejectReason>,
}

impl MarginCheck {
    pub fn can_open(&self) -> bool {
        self.rejection.is_none()
    }
}

// 3.1: gate for opening new exposure. requested leverage above the cap is an
// outright rejection; the clamp below it still applies because this function
// is also reached with caller-supplied leverage on forced flows.
pub fn check_margin(
    equity: Quote,
    current_margin_used: Quote,
    new_notional: Quote,
    requested_leverage: Leverage,
    class: &AssetClass,
    params: &MarginParams,
) -> MarginCheck {
    let cap = class.leverage_cap();
    let effective_leverage = requested_leverage.min(cap);

    let initial_margin = Quote::new(new_notional.value() / effective_leverage.value());
    let total_margin_used = current_margin_used.add(initial_margin);
    let maintenance_required = total_margin_used.mul(params.maintenance_ratio);
    let free_collateral = equity.sub(total_margin_used);

    let rejection = if requested_leverage.value() > cap.value() {
        Some(RejectReason::LeverageExceedsMax {
            requested: requested_leverage.value(),
            max: cap.value(),
        })
    } else if free_collateral.is_negative() {
        Some(RejectReason::InsufficientCollateral {
            required: initial_margin,
            available: equity.sub(current_margin_used),
        })
    } else if equity < maintenance_required {
        Some(RejectReason::BelowMaintenance {
            equity,
            required: maintenance_required,
        })
    } else {
        None
    };

    MarginCheck {
        notional: new_notional,
        initial_margin,
        total_margin_used,
        maintenance_required,
        free_collateral,
        effective_leverage,
        rejection,
    }
}

// 3.2: margin reserved by open positions, valued at their last mark.
// memecoin positions are skipped entirely.
pub fn compute_margin_used<'a>(
    positions: impl IntoIterator<Item = &'a Position>,
    assets: &AssetParams,
) -> Quote {
    let mut total = Decimal::ZERO;
    for pos in positions {
        if !pos.is_open || !classify(&pos.symbol, assets).is_major() {
            continue;
        }
        let notional = pos.quantity.abs() * pos.mark_price.value();
        total += notional / assets.leverage_cap.value();
    }
    Quote::new(total)
}

// 3.3: equity = cash + directed unrealized pnl over open positions.
pub fn compute_equity<'a>(
    cash: Quote,
    positions: impl IntoIterator<Item = &'a Position>,
) -> Quote {
    let unrealized: Quote = positions
        .into_iter()
        .filter(|p| p.is_open)
        .map(|p| p.unrealized_pnl(p.mark_price))
        .sum();
    cash.add(unrealized)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalCheck {
    pub state: Option<TerminalState>,
}

impl TerminalCheck {
    pub fn is_terminal(&self) -> bool {
        self.state.is_some()
    }
}

// 3.4: zeroing takes precedence over liquidation. an account with no margin
// in use can only die by equity depletion.
pub fn check_terminal(equity: Quote, margin_used: Quote, params: &MarginParams) -> TerminalCheck {
    if equity.value() <= params.zero_epsilon {
        return TerminalCheck {
            state: Some(TerminalState::Zeroed),
        };
    }

    let maintenance_required = margin_used.mul(params.maintenance_ratio);
    if margin_used.value() > Decimal::ZERO && equity < maintenance_required {
        return TerminalCheck {
            state: Some(TerminalState::Liquidated),
        };
    }

    TerminalCheck { state: None }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccountId, PositionSide, Price, Timestamp};
    use rust_decimal_macros::dec;

    fn major_class() -> AssetClass {
        AssetClass::Major {
            leverage_cap: Leverage::new(dec!(5)).unwrap(),
        }
    }

    fn open_pos(symbol: &str, side: PositionSide, qty: Decimal, entry: Decimal, mark: Decimal) -> Position {
        let mut pos = Position::open(
            AccountId(1),
            Symbol::from(symbol),
            side,
            qty,
            Price::new_unchecked(entry),
            Timestamp::from_millis(0),
        );
        pos.mark_price = Price::new_unchecked(mark);
        pos
    }

    #[test]
    fn max_leverage_by_class() {
        let assets = AssetParams::default();
        assert_eq!(
            max_leverage(&Symbol::from("MAJOR:ETH-USD"), &assets).value(),
            dec!(5)
        );
        assert_eq!(
            max_leverage(&Symbol::from("SOL:mint"), &assets).value(),
            dec!(1)
        );
    }

    #[test]
    fn margin_check_at_5x() {
        let check = check_margin(
            Quote::new(dec!(10_000)),
            Quote::zero(),
            Quote::new(dec!(25_000)),
            Leverage::new(dec!(5)).unwrap(),
            &major_class(),
            &MarginParams::default(),
        );

        assert!(check.can_open());
        // 25k / 5x = 5k initial margin
        assert_eq!(check.initial_margin.value(), dec!(5000));
        assert_eq!(check.maintenance_required.value(), dec!(2500));
        assert_eq!(check.free_collateral.value(), dec!(5000));
    }

    #[test]
    fn margin_check_rejects_over_cap() {
        let check = check_margin(
            Quote::new(dec!(10_000)),
            Quote::zero(),
            Quote::new(dec!(1_000)),
            Leverage::new(dec!(10)).unwrap(),
            &major_class(),
            &MarginParams::default(),
        );

        assert!(!check.can_open());
        assert!(matches!(
            check.rejection,
            Some(RejectReason::LeverageExceedsMax { .. })
        ));
        // clamped regardless of the rejection
        assert_eq!(check.effective_leverage.value(), dec!(5));
    }

    #[test]
    fn margin_check_rejects_insufficient_collateral() {
        let check = check_margin(
            Quote::new(dec!(1_000)),
            Quote::new(dec!(500)),
            Quote::new(dec!(10_000)),
            Leverage::new(dec!(5)).unwrap(),
            &major_class(),
            &MarginParams::default(),
        );

        assert!(!check.can_open());
        assert!(matches!(
            check.rejection,
            Some(RejectReason::InsufficientCollateral { .. })
        ));
    }

    #[test]
    fn memecoin_margin_is_full_notional() {
        let check = check_margin(
            Quote::new(dec!(10_000)),
            Quote::zero(),
            Quote::new(dec!(4_000)),
            Leverage::one(),
            &AssetClass::Memecoin,
            &MarginParams::default(),
        );

        assert!(check.can_open());
        assert_eq!(check.initial_margin.value(), dec!(4_000));
    }

    #[test]
    fn margin_used_counts_majors_only() {
        let assets = AssetParams::default();
        let positions = vec![
            open_pos("MAJOR:BTC-USD", PositionSide::Long, dec!(0.5), dec!(50_000), dec!(52_000)),
            open_pos("SOL:mint", PositionSide::Long, dec!(1000), dec!(1), dec!(2)),
        ];

        let used = compute_margin_used(&positions, &assets);
        // 0.5 * 52000 / 5 = 5200; the memecoin adds nothing
        assert_eq!(used.value(), dec!(5200));
    }

    #[test]
    fn closed_positions_reserve_nothing() {
        let assets = AssetParams::default();
        let mut pos = open_pos("MAJOR:BTC-USD", PositionSide::Long, dec!(1), dec!(100), dec!(100));
        pos.is_open = false;
        assert_eq!(compute_margin_used([&pos], &assets).value(), dec!(0));
    }

    #[test]
    fn equity_sums_directed_pnl() {
        let positions = vec![
            open_pos("MAJOR:BTC-USD", PositionSide::Long, dec!(1), dec!(100), dec!(110)),
            open_pos("MAJOR:ETH-USD", PositionSide::Short, dec!(2), dec!(50), dec!(55)),
        ];

        let equity = compute_equity(Quote::new(dec!(1_000)), &positions);
        // 1000 + 10 (long) - 10 (short losing) = 1000
        assert_eq!(equity.value(), dec!(1000));
    }

    #[test]
    fn terminal_zeroed_at_epsilon() {
        let params = MarginParams::default();
        let check = check_terminal(Quote::new(dec!(0.01)), Quote::zero(), &params);
        assert_eq!(check.state, Some(TerminalState::Zeroed));

        let check = check_terminal(Quote::new(dec!(0.02)), Quote::zero(), &params);
        assert!(!check.is_terminal());
    }

    #[test]
    fn terminal_liquidated_below_maintenance() {
        let params = MarginParams::default();
        // margin used 5000 -> maintenance 2500
        let check = check_terminal(Quote::new(dec!(2_499)), Quote::new(dec!(5_000)), &params);
        assert_eq!(check.state, Some(TerminalState::Liquidated));

        let check = check_terminal(Quote::new(dec!(2_500)), Quote::new(dec!(5_000)), &params);
        assert!(!check.is_terminal());
    }

    #[test]
    fn no_margin_means_no_liquidation() {
        let params = MarginParams::default();
        let check = check_terminal(Quote::new(dec!(5)), Quote::zero(), &params);
        assert!(!check.is_terminal());
    }
}
