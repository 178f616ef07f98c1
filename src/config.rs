// 7.0 config.rs: all settings in one place. fees, slippage, margin, market data,
// universe discovery. defaults mirror the production deployment so tests can
// construct a config with `ExchangeConfig::default()` and override one knob.

use crate::types::{Bps, Leverage, Quote, Symbol};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

// Asset tiering: the majors allowlist and the leverage cap they share.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetParams {
    pub majors: Vec<Symbol>,
    pub leverage_cap: Leverage,
}

impl Default for AssetParams {
    fn default() -> Self {
        Self {
            majors: [
                "MAJOR:BTC-USD",
                "MAJOR:ETH-USD",
                "MAJOR:SOL-USD",
                "MAJOR:AVAX-USD",
                "MAJOR:LINK-USD",
                "MAJOR:DOGE-USD",
                "MAJOR:ADA-USD",
            ]
            .into_iter()
            .map(Symbol::from)
            .collect(),
            leverage_cap: Leverage::new(dec!(5)).unwrap(),
        }
    }
}

/** 7.1: trading fees per asset class. 100 bps = 1% */
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeParams {
    pub majors_bps: Bps,
    pub memecoins_bps: Bps,
}

impl Default for FeeParams {
    fn default() -> Self {
        Self {
            majors_bps: Bps::from_int(5),    // 0.05%
            memecoins_bps: Bps::from_int(30), // 0.30%
        }
    }
}

// 7.2: slippage model. majors are deep markets and get a flat adjustment;
// memecoin slippage grows with order notional relative to pool liquidity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlippageParams {
    pub majors_bps: Bps,
    pub memecoin_base_bps: Bps,
    pub max_bps: Bps,
}

impl Default for SlippageParams {
    fn default() -> Self {
        Self {
            majors_bps: Bps::from_int(5),
            memecoin_base_bps: Bps::from_int(10),
            max_bps: Bps::from_int(200), // 2% hard ceiling
        }
    }
}

// 7.3: margin and solvency thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarginParams {
    // fraction of margin used that equity must stay above
    pub maintenance_ratio: Decimal,
    // equity at or below this counts as depleted
    pub zero_epsilon: Decimal,
}

impl Default for MarginParams {
    fn default() -> Self {
        Self {
            maintenance_ratio: dec!(0.5),
            zero_epsilon: dec!(0.01),
        }
    }
}

// 7.4: quote freshness and multi-source reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketDataParams {
    // quotes older than this are unusable for validation and pricing
    pub staleness_ms: i64,
    // warn when two sources disagree by more than this percentage
    pub divergence_warn_pct: Decimal,
}

impl Default for MarketDataParams {
    fn default() -> Self {
        Self {
            staleness_ms: 60_000,
            divergence_warn_pct: dec!(2),
        }
    }
}

// 7.5: outlier rejection window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlierParams {
    pub window_size: usize,
    pub max_deviation_pct: Decimal,
}

impl Default for OutlierParams {
    fn default() -> Self {
        Self {
            window_size: 5,
            max_deviation_pct: dec!(20),
        }
    }
}

// 7.6: thresholds a discovered pair must clear to enter the universe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniverseFilters {
    pub min_liquidity_usd: Decimal,
    pub min_volume_24h_usd: Decimal,
    pub min_pair_age_ms: i64,
}

impl Default for UniverseFilters {
    fn default() -> Self {
        Self {
            min_liquidity_usd: dec!(50_000),
            min_volume_24h_usd: dec!(25_000),
            min_pair_age_ms: 24 * 60 * 60 * 1000,
        }
    }
}

// 7.7: account provisioning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountParams {
    pub starting_balance: Quote,
}

impl Default for AccountParams {
    fn default() -> Self {
        Self {
            starting_balance: Quote::new(dec!(10_000)),
        }
    }
}

// Complete engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExchangeConfig {
    pub assets: AssetParams,
    pub fees: FeeParams,
    pub slippage: SlippageParams,
    pub margin: MarginParams,
    pub market_data: MarketDataParams,
    pub outlier: OutlierParams,
    pub universe: UniverseFilters,
    pub accounts: AccountParams,
}
