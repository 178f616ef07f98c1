//! Asset-class resolution.
//!
//! Two tiers exist: majors (fixed allowlist, long/short, leveraged) and
//! memecoins (discovered, spot only, 1x). The class is resolved once per
//! symbol and threaded through validation, margin, and fee computation so
//! the allowlist is consulted in exactly one place.

use crate::config::AssetParams;
use crate::types::{Leverage, Symbol};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetClass {
    Major { leverage_cap: Leverage },
    Memecoin,
}

impl AssetClass {
    pub fn is_major(&self) -> bool {
        matches!(self, AssetClass::Major { .. })
    }

    // memecoins are spot instruments; their cap is always 1x
    pub fn leverage_cap(&self) -> Leverage {
        match self {
            AssetClass::Major { leverage_cap } => *leverage_cap,
            AssetClass::Memecoin => Leverage::one(),
        }
    }
}

pub fn classify(symbol: &Symbol, params: &AssetParams) -> AssetClass {
    if params.majors.contains(symbol) {
        AssetClass::Major {
            leverage_cap: params.leverage_cap,
        }
    } else {
        AssetClass::Memecoin
    }
}

// Chains memecoins are discovered on. The chain determines the symbol prefix,
// e.g. "SOL:<mint>" for solana pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Chain {
    Solana,
    Base,
}

impl Chain {
    pub fn symbol_prefix(&self) -> &'static str {
        match self {
            Chain::Solana => "SOL",
            Chain::Base => "BASE",
        }
    }

    pub fn pool_symbol(&self, address: &str) -> Symbol {
        Symbol::new(format!("{}:{}", self.symbol_prefix(), address))
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Chain::Solana => write!(f, "solana"),
            Chain::Base => write!(f, "base"),
        }
    }
}
