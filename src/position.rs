// 4.0: open position tracking. directed pnl = sign * qty * (mark - entry).
// 4.2 has the fill transition function (open/increase/reduce/close/flip).

use crate::asset::AssetClass;
use crate::types::{AccountId, OrderSide, PositionSide, Price, Quote, Symbol, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// At most one open position exists per (account, symbol). quantity stays
// strictly positive while the position is open; direction lives in `side`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub account_id: AccountId,
    pub symbol: Symbol,
    pub side: PositionSide,
    pub quantity: Decimal,
    pub entry_price: Price,
    // last mark this position was valued at
    pub mark_price: Price,
    // accumulated over partial closes; the open remainder keeps carrying it
    pub realized_pnl: Quote,
    pub is_open: bool,
    pub opened_at: Timestamp,
    pub updated_at: Timestamp,
    pub closed_at: Option<Timestamp>,
}

impl Position {
    pub fn open(
        account_id: AccountId,
        symbol: Symbol,
        side: PositionSide,
        quantity: Decimal,
        entry_price: Price,
        timestamp: Timestamp,
    ) -> Self {
        debug_assert!(quantity > Decimal::ZERO, "open quantity must be positive");
        Self {
            account_id,
            symbol,
            side,
            quantity,
            entry_price,
            mark_price: entry_price,
            realized_pnl: Quote::zero(),
            is_open: true,
            opened_at: timestamp,
            updated_at: timestamp,
            closed_at: None,
        }
    }

    // 4.1: paper gains/losses at the given mark
    pub fn unrealized_pnl(&self, mark_price: Price) -> Quote {
        compute_unrealized_pnl(self.side, self.quantity, self.entry_price, mark_price)
    }

    pub fn notional(&self, mark_price: Price) -> Quote {
        Quote::new(self.quantity.abs() * mark_price.value())
    }
}

// 4.1: the pnl formula. long profits when mark > entry, short when mark < entry.
pub fn compute_unrealized_pnl(
    side: PositionSide,
    quantity: Decimal,
    entry_price: Price,
    mark_price: Price,
) -> Quote {
    let price_diff = mark_price.value() - entry_price.value();
    Quote::new(side.sign() * price_diff * quantity.abs())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionUpdateKind {
    Open,
    Increase,
    Reduce,
    Close,
    Flip,
}

// 4.2: the result of applying one fill to the (possibly absent) open position.
// for Close, new_entry_price is None and new_quantity is zero. for Flip, the
// fields describe the freshly opened opposite-direction position.
#[derive(Debug, Clone)]
pub struct PositionUpdate {
    pub kind: PositionUpdateKind,
    pub new_quantity: Decimal,
    pub new_entry_price: Option<Price>,
    pub realized_pnl: Quote,
    pub closes_existing: bool,
}

// 4.3: pure transition function. no existing position opens one; same-direction
// fills average the entry; opposite-direction fills reduce, close, or flip.
// flips are a majors privilege: a memecoin fill past the owned quantity just
// closes and the excess is discarded (no shorting spot instruments).
pub fn compute_position_update(
    class: &AssetClass,
    order_side: OrderSide,
    fill_quantity: Decimal,
    fill_price: Price,
    existing: Option<&Position>,
) -> PositionUpdate {
    let fill_side = order_side.position_side();

    let pos = match existing {
        Some(p) if p.is_open => p,
        _ => {
            return PositionUpdate {
                kind: PositionUpdateKind::Open,
                new_quantity: fill_quantity,
                new_entry_price: Some(fill_price),
                realized_pnl: Quote::zero(),
                closes_existing: false,
            }
        }
    };

    if pos.side == fill_side {
        let total_qty = pos.quantity + fill_quantity;
        let weighted = pos.entry_price.value() * pos.quantity + fill_price.value() * fill_quantity;
        return PositionUpdate {
            kind: PositionUpdateKind::Increase,
            new_quantity: total_qty,
            new_entry_price: Some(Price::new_unchecked(weighted / total_qty)),
            realized_pnl: Quote::zero(),
            closes_existing: false,
        };
    }

    // Opposite direction: realize pnl on whatever gets closed.
    let price_diff = fill_price.value() - pos.entry_price.value();
    let pnl_per_unit = pos.side.sign() * price_diff;

    if fill_quantity < pos.quantity {
        return PositionUpdate {
            kind: PositionUpdateKind::Reduce,
            new_quantity: pos.quantity - fill_quantity,
            new_entry_price: Some(pos.entry_price),
            realized_pnl: Quote::new(pnl_per_unit * fill_quantity),
            closes_existing: false,
        };
    }

    if fill_quantity == pos.quantity {
        return PositionUpdate {
            kind: PositionUpdateKind::Close,
            new_quantity: Decimal::ZERO,
            new_entry_price: None,
            realized_pnl: Quote::new(pnl_per_unit * fill_quantity),
            closes_existing: true,
        };
    }

    // Fill exceeds the open quantity.
    if !class.is_major() {
        // Spot instrument: close in full, cap the order to the owned quantity.
        return PositionUpdate {
            kind: PositionUpdateKind::Close,
            new_quantity: Decimal::ZERO,
            new_entry_price: None,
            realized_pnl: Quote::new(pnl_per_unit * pos.quantity),
            closes_existing: true,
        };
    }

    // Flip: the whole existing position realizes, the excess opens the other
    // way at the same fill price.
    PositionUpdate {
        kind: PositionUpdateKind::Flip,
        new_quantity: fill_quantity - pos.quantity,
        new_entry_price: Some(fill_price),
        realized_pnl: Quote::new(pnl_per_unit * pos.quantity),
        closes_existing: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Leverage;
    use rust_decimal_macros::dec;

    fn major() -> AssetClass {
        AssetClass::Major {
            leverage_cap: Leverage::new(dec!(5)).unwrap(),
        }
    }

    fn long_position(qty: Decimal, entry: Decimal) -> Position {
        Position::open(
            AccountId(1),
            Symbol::from("MAJOR:BTC-USD"),
            PositionSide::Long,
            qty,
            Price::new_unchecked(entry),
            Timestamp::from_millis(0),
        )
    }

    #[test]
    fn unrealized_pnl_directed() {
        let long = long_position(dec!(2), dec!(100));
        assert_eq!(
            long.unrealized_pnl(Price::new_unchecked(dec!(110))).value(),
            dec!(20)
        );
        assert_eq!(
            long.unrealized_pnl(Price::new_unchecked(dec!(90))).value(),
            dec!(-20)
        );

        let short = compute_unrealized_pnl(
            PositionSide::Short,
            dec!(2),
            Price::new_unchecked(dec!(100)),
            Price::new_unchecked(dec!(90)),
        );
        assert_eq!(short.value(), dec!(20));
    }

    #[test]
    fn no_position_opens() {
        let update =
            compute_position_update(&major(), OrderSide::Buy, dec!(0.5), Price::new_unchecked(dec!(100)), None);

        assert_eq!(update.kind, PositionUpdateKind::Open);
        assert_eq!(update.new_quantity, dec!(0.5));
        assert_eq!(update.new_entry_price.unwrap().value(), dec!(100));
        assert_eq!(update.realized_pnl.value(), dec!(0));
        assert!(!update.closes_existing);
    }

    #[test]
    fn same_side_increases_with_weighted_entry() {
        let pos = long_position(dec!(1), dec!(100));
        let update = compute_position_update(
            &major(),
            OrderSide::Buy,
            dec!(1),
            Price::new_unchecked(dec!(110)),
            Some(&pos),
        );

        assert_eq!(update.kind, PositionUpdateKind::Increase);
        assert_eq!(update.new_quantity, dec!(2));
        // (1*100 + 1*110) / 2 = 105
        assert_eq!(update.new_entry_price.unwrap().value(), dec!(105));
        assert_eq!(update.realized_pnl.value(), dec!(0));
    }

    #[test]
    fn partial_close_realizes_proportionally() {
        let pos = long_position(dec!(2), dec!(100));
        let update = compute_position_update(
            &major(),
            OrderSide::Sell,
            dec!(0.5),
            Price::new_unchecked(dec!(120)),
            Some(&pos),
        );

        assert_eq!(update.kind, PositionUpdateKind::Reduce);
        assert_eq!(update.new_quantity, dec!(1.5));
        // entry unchanged on reduction
        assert_eq!(update.new_entry_price.unwrap().value(), dec!(100));
        // (120 - 100) * 0.5 = 10
        assert_eq!(update.realized_pnl.value(), dec!(10.0));
    }

    #[test]
    fn exact_close_realizes_fully() {
        let pos = long_position(dec!(2), dec!(100));
        let update = compute_position_update(
            &major(),
            OrderSide::Sell,
            dec!(2),
            Price::new_unchecked(dec!(90)),
            Some(&pos),
        );

        assert_eq!(update.kind, PositionUpdateKind::Close);
        assert_eq!(update.new_quantity, dec!(0));
        assert!(update.new_entry_price.is_none());
        assert_eq!(update.realized_pnl.value(), dec!(-20));
        assert!(update.closes_existing);
    }

    #[test]
    fn short_close_realizes_inverted() {
        let mut pos = long_position(dec!(1), dec!(100));
        pos.side = PositionSide::Short;

        let update = compute_position_update(
            &major(),
            OrderSide::Buy,
            dec!(1),
            Price::new_unchecked(dec!(80)),
            Some(&pos),
        );

        assert_eq!(update.kind, PositionUpdateKind::Close);
        // short entered at 100, bought back at 80: +20
        assert_eq!(update.realized_pnl.value(), dec!(20));
    }

    #[test]
    fn major_excess_flips_at_fill_price() {
        let pos = long_position(dec!(1), dec!(100));
        let update = compute_position_update(
            &major(),
            OrderSide::Sell,
            dec!(3),
            Price::new_unchecked(dec!(110)),
            Some(&pos),
        );

        assert_eq!(update.kind, PositionUpdateKind::Flip);
        assert!(update.closes_existing);
        // realize on the existing 1 unit only
        assert_eq!(update.realized_pnl.value(), dec!(10));
        // excess 2 units open short at the fill price
        assert_eq!(update.new_quantity, dec!(2));
        assert_eq!(update.new_entry_price.unwrap().value(), dec!(110));
    }

    #[test]
    fn memecoin_excess_closes_and_discards() {
        let mut pos = long_position(dec!(1), dec!(100));
        pos.symbol = Symbol::from("SOL:mint");

        let update = compute_position_update(
            &AssetClass::Memecoin,
            OrderSide::Sell,
            dec!(5),
            Price::new_unchecked(dec!(110)),
            Some(&pos),
        );

        assert_eq!(update.kind, PositionUpdateKind::Close);
        assert_eq!(update.new_quantity, dec!(0));
        // realizes the owned quantity only, never a short remainder
        assert_eq!(update.realized_pnl.value(), dec!(10));
    }

    #[test]
    fn closed_position_reopens() {
        let mut pos = long_position(dec!(1), dec!(100));
        pos.is_open = false;

        let update = compute_position_update(
            &major(),
            OrderSide::Buy,
            dec!(1),
            Price::new_unchecked(dec!(105)),
            Some(&pos),
        );
        assert_eq!(update.kind, PositionUpdateKind::Open);
    }
}
