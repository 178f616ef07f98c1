// 5.0: fee and slippage pricing. pure and deterministic: identical inputs
// always produce identical fills, which is what makes replay testing work.
//
// fee = notional * bps / 10_000 with per-class bps. majors get flat slippage;
// memecoin slippage adds 100 bps per 1% of pool liquidity consumed, capped.
// the fill price always moves against the trader: up for BUY, down for SELL.

use crate::asset::AssetClass;
use crate::config::{FeeParams, SlippageParams};
use crate::types::{Bps, OrderSide, Price, Quote};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillQuote {
    pub fee_bps: Bps,
    pub fee: Quote,
    pub slippage_bps: Bps,
    pub fill_price: Price,
}

pub fn quote_fill(
    mark_price: Price,
    quantity: Decimal,
    class: &AssetClass,
    side: OrderSide,
    liquidity_usd: Option<Decimal>,
    fees: &FeeParams,
    slippage: &SlippageParams,
) -> FillQuote {
    let notional = quantity * mark_price.value();

    let fee_bps = if class.is_major() {
        fees.majors_bps
    } else {
        fees.memecoins_bps
    };
    let fee = Quote::new(notional * fee_bps.value() / dec!(10_000));

    let slippage_bps = if class.is_major() {
        slippage.majors_bps
    } else {
        let base = slippage.memecoin_base_bps;
        match liquidity_usd {
            Some(liq) if liq > Decimal::ZERO => {
                // 100 bps per 1% of liquidity consumed
                let impact = notional / liq;
                Bps::new(base.value() + impact * dec!(100) * dec!(100)).min(slippage.max_bps)
            }
            _ => base,
        }
    };

    let multiplier = match side {
        OrderSide::Buy => Decimal::ONE + slippage_bps.as_fraction(),
        OrderSide::Sell => Decimal::ONE - slippage_bps.as_fraction(),
    };

    FillQuote {
        fee_bps,
        fee,
        slippage_bps,
        fill_price: Price::new_unchecked(mark_price.value() * multiplier),
    }
}
