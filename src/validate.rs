//! Order validation rules.
//!
//! A stateless rule engine run before any pricing happens. Checks run in a
//! fixed order and short-circuit on the first failure; the result is a
//! `RejectReason` value, never a panic or an error, because a refused order
//! is an expected business outcome that gets persisted and surfaced.

use crate::asset::AssetClass;
use crate::account::AccountStatus;
use crate::order::RejectReason;
use crate::position::Position;
use crate::price_store::Tick;
use crate::types::{Leverage, OrderSide, PositionSide, Symbol, Timestamp};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};

pub struct OrderCheck<'a> {
    pub symbol: &'a Symbol,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub leverage: Leverage,
    pub class: &'a AssetClass,
    pub account_status: AccountStatus,
    pub open_positions: &'a HashMap<Symbol, Position>,
    pub quote: Option<&'a Tick>,
    pub tradable: &'a HashSet<Symbol>,
    pub now: Timestamp,
    pub staleness_ms: i64,
}

pub fn validate_order(check: &OrderCheck<'_>) -> Result<(), RejectReason> {
    // 1. account must be alive
    if check.account_status != AccountStatus::Active {
        return Err(RejectReason::AccountNotActive(
            check.account_status.to_string(),
        ));
    }

    // 2. quantity must be positive
    if check.quantity <= Decimal::ZERO {
        return Err(RejectReason::InvalidQuantity);
    }

    // 3. symbol must be in the current universe
    if !check.tradable.contains(check.symbol) {
        return Err(RejectReason::SymbolNotTradable(check.symbol.clone()));
    }

    // 4. a quote must exist and be fresh
    let quote = match check.quote {
        Some(q) => q,
        None => return Err(RejectReason::NoQuoteAvailable),
    };
    if quote.is_stale(check.now, check.staleness_ms) {
        return Err(RejectReason::QuoteStale);
    }

    // 5. asset-class rules: memecoins are spot only
    if !check.class.is_major() {
        if check.leverage.value() > Decimal::ONE {
            return Err(RejectReason::MemecoinNoLeverage);
        }

        if check.side == OrderSide::Sell {
            let owned = check
                .open_positions
                .get(check.symbol)
                .filter(|p| p.is_open && p.side == PositionSide::Long);
            match owned {
                Some(p) if p.quantity >= check.quantity => {}
                _ => return Err(RejectReason::MemecoinSellRequiresOwnership),
            }
        }
    }

    // 6. leverage cap
    let max = check.class.leverage_cap();
    if check.leverage.value() > max.value() {
        return Err(RejectReason::LeverageExceedsMax {
            requested: check.leverage.value(),
            max: max.value(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccountId, Price};
    use rust_decimal_macros::dec;

    fn major_class() -> AssetClass {
        AssetClass::Major {
            leverage_cap: Leverage::new(dec!(5)).unwrap(),
        }
    }

    fn fresh_tick(symbol: &str, ts: i64) -> Tick {
        Tick {
            symbol: Symbol::from(symbol),
            price: Price::new_unchecked(dec!(100)),
            liquidity_usd: None,
            volume_24h_usd: None,
            source: "test".to_string(),
            ts: Timestamp::from_millis(ts),
        }
    }

    struct Fixture {
        symbol: Symbol,
        class: AssetClass,
        positions: HashMap<Symbol, Position>,
        tradable: HashSet<Symbol>,
        quote: Tick,
    }

    impl Fixture {
        fn majors() -> Self {
            let symbol = Symbol::from("MAJOR:BTC-USD");
            Self {
                symbol: symbol.clone(),
                class: major_class(),
                positions: HashMap::new(),
                tradable: HashSet::from([symbol.clone()]),
                quote: fresh_tick("MAJOR:BTC-USD", 1_000),
            }
        }

        fn memecoin() -> Self {
            let symbol = Symbol::from("SOL:mint");
            Self {
                symbol: symbol.clone(),
                class: AssetClass::Memecoin,
                positions: HashMap::new(),
                tradable: HashSet::from([symbol.clone()]),
                quote: fresh_tick("SOL:mint", 1_000),
            }
        }

        fn check(&self, side: OrderSide, quantity: Decimal, leverage: Decimal) -> Result<(), RejectReason> {
            validate_order(&OrderCheck {
                symbol: &self.symbol,
                side,
                quantity,
                leverage: Leverage::new(leverage).unwrap(),
                class: &self.class,
                account_status: AccountStatus::Active,
                open_positions: &self.positions,
                quote: Some(&self.quote),
                tradable: &self.tradable,
                now: Timestamp::from_millis(2_000),
                staleness_ms: 60_000,
            })
        }
    }

    #[test]
    fn valid_major_order_passes() {
        let fx = Fixture::majors();
        assert!(fx.check(OrderSide::Buy, dec!(0.1), dec!(5)).is_ok());
    }

    #[test]
    fn dead_account_rejected_first() {
        let fx = Fixture::majors();
        let result = validate_order(&OrderCheck {
            symbol: &fx.symbol,
            side: OrderSide::Buy,
            quantity: dec!(-1), // would also fail, but status wins
            leverage: Leverage::one(),
            class: &fx.class,
            account_status: AccountStatus::Liquidated,
            open_positions: &fx.positions,
            quote: None,
            tradable: &fx.tradable,
            now: Timestamp::from_millis(2_000),
            staleness_ms: 60_000,
        });
        assert_eq!(
            result.unwrap_err().to_string(),
            "ACCOUNT_LIQUIDATED"
        );
    }

    #[test]
    fn zero_quantity_rejected() {
        let fx = Fixture::majors();
        assert_eq!(
            fx.check(OrderSide::Buy, dec!(0), dec!(1)),
            Err(RejectReason::InvalidQuantity)
        );
    }

    #[test]
    fn unknown_symbol_rejected() {
        let mut fx = Fixture::majors();
        fx.tradable.clear();
        assert!(matches!(
            fx.check(OrderSide::Buy, dec!(1), dec!(1)),
            Err(RejectReason::SymbolNotTradable(_))
        ));
    }

    #[test]
    fn missing_and_stale_quotes_rejected() {
        let fx = Fixture::majors();
        let result = validate_order(&OrderCheck {
            symbol: &fx.symbol,
            side: OrderSide::Buy,
            quantity: dec!(1),
            leverage: Leverage::one(),
            class: &fx.class,
            account_status: AccountStatus::Active,
            open_positions: &fx.positions,
            quote: None,
            tradable: &fx.tradable,
            now: Timestamp::from_millis(2_000),
            staleness_ms: 60_000,
        });
        assert_eq!(result, Err(RejectReason::NoQuoteAvailable));

        let stale = fresh_tick("MAJOR:BTC-USD", 1_000);
        let result = validate_order(&OrderCheck {
            symbol: &fx.symbol,
            side: OrderSide::Buy,
            quantity: dec!(1),
            leverage: Leverage::one(),
            class: &fx.class,
            account_status: AccountStatus::Active,
            open_positions: &fx.positions,
            quote: Some(&stale),
            tradable: &fx.tradable,
            now: Timestamp::from_millis(62_000),
            staleness_ms: 60_000,
        });
        assert_eq!(result, Err(RejectReason::QuoteStale));
    }

    #[test]
    fn memecoin_leverage_rejected() {
        let fx = Fixture::memecoin();
        assert_eq!(
            fx.check(OrderSide::Buy, dec!(100), dec!(2)),
            Err(RejectReason::MemecoinNoLeverage)
        );
    }

    #[test]
    fn memecoin_sell_requires_owned_quantity() {
        let mut fx = Fixture::memecoin();

        // nothing owned
        assert_eq!(
            fx.check(OrderSide::Sell, dec!(10), dec!(1)),
            Err(RejectReason::MemecoinSellRequiresOwnership)
        );

        // owns less than the sell quantity
        fx.positions.insert(
            fx.symbol.clone(),
            Position::open(
                AccountId(1),
                fx.symbol.clone(),
                PositionSide::Long,
                dec!(5),
                Price::new_unchecked(dec!(100)),
                Timestamp::from_millis(0),
            ),
        );
        assert_eq!(
            fx.check(OrderSide::Sell, dec!(10), dec!(1)),
            Err(RejectReason::MemecoinSellRequiresOwnership)
        );

        // owns enough
        assert!(fx.check(OrderSide::Sell, dec!(5), dec!(1)).is_ok());
    }

    #[test]
    fn major_leverage_over_cap_rejected() {
        let fx = Fixture::majors();
        assert!(matches!(
            fx.check(OrderSide::Buy, dec!(1), dec!(6)),
            Err(RejectReason::LeverageExceedsMax { .. })
        ));
    }
}
