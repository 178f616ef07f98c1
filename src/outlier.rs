// 9.1: rolling-median spike filter. a cheap, stateful guard that assumes one
// bad source at a time, not a statistical outlier model.
//
// per symbol we keep a short window of the most recent *accepted* prices,
// newest first. a candidate deviating more than the configured percentage
// from the window median is rejected and never enters the window, so a spike
// cannot drag the median toward itself. with fewer than 2 samples everything
// is accepted (cold start).

use crate::config::OutlierParams;
use crate::price_store::Tick;
use crate::types::Symbol;
use dashmap::DashMap;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickCheck {
    pub valid: bool,
    pub reason: Option<String>,
}

impl TickCheck {
    fn accepted() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    fn rejected(reason: String) -> Self {
        Self {
            valid: false,
            reason: Some(reason),
        }
    }
}

#[derive(Debug)]
pub struct OutlierDetector {
    params: OutlierParams,
    // per-symbol window, newest price first. the map entry guard serializes
    // concurrent ingestion for the same symbol.
    windows: DashMap<Symbol, VecDeque<Decimal>>,
}

impl OutlierDetector {
    pub fn new(params: OutlierParams) -> Self {
        Self {
            params,
            windows: DashMap::new(),
        }
    }

    pub fn validate(&self, tick: &Tick) -> TickCheck {
        let mut entry = self.windows.entry(tick.symbol.clone()).or_default();
        let window = entry.value_mut();

        if window.len() < 2 {
            Self::push(window, tick.price.value(), self.params.window_size);
            return TickCheck::accepted();
        }

        let median = median(window);
        let deviation_pct = ((tick.price.value() - median) / median).abs() * dec!(100);

        if deviation_pct > self.params.max_deviation_pct {
            return TickCheck::rejected(format!(
                "Price deviates {deviation_pct:.1}% from rolling median (max {}%)",
                self.params.max_deviation_pct
            ));
        }

        Self::push(window, tick.price.value(), self.params.window_size);
        TickCheck::accepted()
    }

    fn push(window: &mut VecDeque<Decimal>, price: Decimal, cap: usize) {
        window.push_front(price);
        window.truncate(cap);
    }

    pub fn window_len(&self, symbol: &Symbol) -> usize {
        self.windows.get(symbol).map(|w| w.len()).unwrap_or(0)
    }
}

fn median(values: &VecDeque<Decimal>) -> Decimal {
    let mut sorted: Vec<Decimal> = values.iter().copied().collect();
    sorted.sort();

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / dec!(2)
    } else {
        sorted[mid]
    }
}
