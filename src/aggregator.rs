// 9.0: market data aggregation. pulls ticks from independent sources,
// reconciles them, and pushes every candidate through the outlier detector
// before the price store sees it. rejected ticks are dropped silently from
// the cycle: callers of the aggregator never see them as errors.
//
// majors: all configured tick sources are queried; when several report, the
// mark is the median of their prices (with two sources, the mean) and a
// divergence above the configured threshold is logged but does not block.
// memecoins: a single pool source per chain, queried in address batches; the
// best pair per token is the one with the deepest liquidity.

use crate::asset::Chain;
use crate::config::{AssetParams, MarketDataParams, OutlierParams, UniverseFilters};
use crate::outlier::{OutlierDetector, TickCheck};
use crate::price_store::{PriceStore, Tick};
use crate::sources::{PoolPair, PoolSource, TickSource};
use crate::types::{Price, Symbol, Timestamp};
use crate::universe::{passes_filters, UniverseStore, UniverseToken};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;

// pool venues cap multi-address lookups around this size
const POOL_BATCH_SIZE: usize = 30;

pub struct MarketDataAggregator {
    market_data: MarketDataParams,
    filters: UniverseFilters,
    assets: AssetParams,
    tick_sources: Vec<Box<dyn TickSource + Send + Sync>>,
    pool_source: Box<dyn PoolSource + Send + Sync>,
    detector: OutlierDetector,
    prices: Arc<PriceStore>,
    universe: Arc<UniverseStore>,
}

impl MarketDataAggregator {
    pub fn new(
        market_data: MarketDataParams,
        outlier: OutlierParams,
        filters: UniverseFilters,
        assets: AssetParams,
        tick_sources: Vec<Box<dyn TickSource + Send + Sync>>,
        pool_source: Box<dyn PoolSource + Send + Sync>,
        prices: Arc<PriceStore>,
        universe: Arc<UniverseStore>,
    ) -> Self {
        Self {
            market_data,
            filters,
            assets,
            tick_sources,
            pool_source,
            detector: OutlierDetector::new(outlier),
            prices,
            universe,
        }
    }

    /// Gate a single tick through the outlier detector and, if accepted,
    /// into the price store. The entry point external feeds go through.
    pub fn ingest(&self, tick: Tick) -> TickCheck {
        let check = self.detector.validate(&tick);
        if check.valid {
            self.prices.record(tick);
        } else {
            log::warn!(
                "outlier rejected: {} price={} ({})",
                tick.symbol,
                tick.price,
                check.reason.as_deref().unwrap_or("no reason"),
            );
        }
        check
    }

    /// Fetch, reconcile, and store ticks for all majors. Returns the ticks
    /// that survived reconciliation and the outlier gate.
    pub fn refresh_majors(&self, now: Timestamp) -> Vec<Tick> {
        let symbols = self.assets.majors.clone();

        // one fetch per source, keyed per symbol afterwards
        let mut per_source: Vec<(String, HashMap<Symbol, Tick>)> = Vec::new();
        for source in &self.tick_sources {
            let ticks = source.fetch_ticks(&symbols, now);
            let by_symbol = ticks.into_iter().map(|t| (t.symbol.clone(), t)).collect();
            per_source.push((source.name().to_string(), by_symbol));
        }

        let mut accepted = Vec::new();
        for symbol in &symbols {
            let reported: Vec<(&str, &Tick)> = per_source
                .iter()
                .filter_map(|(name, map)| map.get(symbol).map(|t| (name.as_str(), t)))
                .collect();

            let Some(tick) = self.reconcile(symbol, &reported, now) else {
                continue;
            };

            if self.ingest(tick.clone()).valid {
                accepted.push(tick);
            }
        }
        accepted
    }

    // median-of-sources with a divergence warning. a single reporter is used
    // as-is; zero reporters yields nothing for this cycle.
    fn reconcile(&self, symbol: &Symbol, reported: &[(&str, &Tick)], now: Timestamp) -> Option<Tick> {
        if reported.is_empty() {
            return None;
        }

        if reported.len() == 1 {
            let (name, tick) = reported[0];
            return Some(Tick {
                source: name.to_string(),
                ts: now,
                ..tick.clone()
            });
        }

        let mut prices: Vec<Decimal> = reported.iter().map(|(_, t)| t.price.value()).collect();
        prices.sort();

        let min = prices[0];
        let max = prices[prices.len() - 1];
        let divergence_pct = (max - min) / min * dec!(100);
        if divergence_pct > self.market_data.divergence_warn_pct {
            log::warn!(
                "source divergence for {symbol}: min={min} max={max} ({divergence_pct:.1}%)",
            );
        }

        let mid = prices.len() / 2;
        let median = if prices.len() % 2 == 0 {
            (prices[mid - 1] + prices[mid]) / dec!(2)
        } else {
            prices[mid]
        };

        let names: Vec<&str> = reported.iter().map(|(n, _)| *n).collect();
        let volume = reported.iter().find_map(|(_, t)| t.volume_24h_usd);

        Some(Tick {
            symbol: symbol.clone(),
            price: Price::new(median)?,
            liquidity_usd: None,
            volume_24h_usd: volume,
            source: format!("median:{}", names.join("+")),
            ts: now,
        })
    }

    /// Fetch and store ticks for every memecoin in the current universe.
    pub fn refresh_memecoins(&self, now: Timestamp) -> Vec<Tick> {
        let mut by_chain: HashMap<Chain, Vec<String>> = HashMap::new();
        for token in self.universe.all() {
            if token.is_major {
                continue;
            }
            if let (Some(chain), Some(address)) = (token.chain, token.address) {
                by_chain.entry(chain).or_default().push(address);
            }
        }

        let mut accepted = Vec::new();
        for (chain, addresses) in by_chain {
            for batch in addresses.chunks(POOL_BATCH_SIZE) {
                let pairs = self.pool_source.fetch_pairs(chain, batch);
                for pair in best_pairs_by_liquidity(pairs).into_values() {
                    let Some(price) = Price::new(pair.price_usd) else {
                        continue;
                    };
                    let tick = Tick {
                        symbol: pair.symbol(),
                        price,
                        liquidity_usd: Some(pair.liquidity_usd),
                        volume_24h_usd: Some(pair.volume_24h_usd),
                        source: self.pool_source.name().to_string(),
                        ts: now,
                    };
                    if self.ingest(tick.clone()).valid {
                        accepted.push(tick);
                    }
                }
            }
        }
        accepted
    }

    /// Run discovery and rebuild the universe: majors plus every discovered
    /// pair that clears the filters. Upserts by symbol, so re-running is
    /// idempotent.
    pub fn refresh_universe(&self, now: Timestamp) -> Vec<UniverseToken> {
        for symbol in &self.assets.majors {
            self.universe.upsert(UniverseToken::major(symbol, now));
        }

        let discovered = self.pool_source.discover();
        let candidates = best_pairs_by_liquidity(discovered);

        let mut admitted = 0usize;
        for pair in candidates.into_values() {
            if pair.price_usd <= Decimal::ZERO {
                continue;
            }
            if !passes_filters(&pair, now, &self.filters) {
                continue;
            }
            self.universe.upsert(UniverseToken::from_pool(&pair, now));
            admitted += 1;
        }

        log::info!("universe refreshed: {admitted} memecoins admitted");
        self.universe.all()
    }

    /// The current universe, falling back to the majors before the first
    /// refresh has run.
    pub fn universe_tokens(&self, now: Timestamp) -> Vec<UniverseToken> {
        if self.universe.is_empty() {
            return self
                .assets
                .majors
                .iter()
                .map(|s| UniverseToken::major(s, now))
                .collect();
        }
        self.universe.all()
    }

    /// Health snapshot across every configured source.
    pub fn health(&self) -> Vec<(String, bool)> {
        let mut report: Vec<(String, bool)> = self
            .tick_sources
            .iter()
            .map(|s| (s.name().to_string(), s.healthy()))
            .collect();
        report.push((self.pool_source.name().to_string(), self.pool_source.healthy()));
        report
    }
}

// pick the deepest pool per token address
fn best_pairs_by_liquidity(pairs: Vec<PoolPair>) -> HashMap<(Chain, String), PoolPair> {
    let mut best: HashMap<(Chain, String), PoolPair> = HashMap::new();
    for pair in pairs {
        let key = (pair.chain, pair.address.clone());
        match best.get(&key) {
            Some(existing) if existing.liquidity_usd >= pair.liquidity_usd => {}
            _ => {
                best.insert(key, pair);
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExchangeConfig;
    use crate::sources::{MockPoolSource, MockTickSource};
    use rust_decimal_macros::dec;

    const DAY_MS: i64 = 24 * 60 * 60 * 1000;

    struct Harness {
        aggregator: MarketDataAggregator,
        prices: Arc<PriceStore>,
        universe: Arc<UniverseStore>,
    }

    fn harness(
        setup_ticks: impl Fn(&MockTickSource, &MockTickSource),
        setup_pools: impl Fn(&MockPoolSource),
    ) -> Harness {
        let cfg = ExchangeConfig::default();
        let prices = Arc::new(PriceStore::new(cfg.market_data.staleness_ms));
        let universe = Arc::new(UniverseStore::new());

        let primary = MockTickSource::new("primary");
        let secondary = MockTickSource::new("secondary");
        setup_ticks(&primary, &secondary);

        let pools = MockPoolSource::new("pools");
        setup_pools(&pools);

        let aggregator = MarketDataAggregator::new(
            cfg.market_data,
            cfg.outlier,
            cfg.universe,
            cfg.assets,
            vec![Box::new(primary), Box::new(secondary)],
            Box::new(pools),
            Arc::clone(&prices),
            Arc::clone(&universe),
        );

        Harness {
            aggregator,
            prices,
            universe,
        }
    }

    fn good_pair(address: &str, liquidity: Decimal) -> PoolPair {
        PoolPair {
            chain: Chain::Solana,
            address: address.to_string(),
            name: format!("Token {address}"),
            price_usd: dec!(0.5),
            liquidity_usd: liquidity,
            volume_24h_usd: dec!(30_000),
            pair_created_at: Timestamp::from_millis(0),
        }
    }

    #[test]
    fn two_sources_reconcile_to_mean() {
        let h = harness(
            |primary, secondary| {
                primary.set_price(Symbol::from("MAJOR:BTC-USD"), dec!(50_000));
                secondary.set_price(Symbol::from("MAJOR:BTC-USD"), dec!(50_100));
            },
            |_| {},
        );

        let ticks = h.aggregator.refresh_majors(Timestamp::from_millis(1_000));
        let btc = ticks
            .iter()
            .find(|t| t.symbol.as_str() == "MAJOR:BTC-USD")
            .unwrap();
        assert_eq!(btc.price.value(), dec!(50_050));
        assert_eq!(btc.source, "median:primary+secondary");

        let cached = h
            .prices
            .quote(&Symbol::from("MAJOR:BTC-USD"), Timestamp::from_millis(2_000))
            .unwrap();
        assert_eq!(cached.price.value(), dec!(50_050));
    }

    #[test]
    fn single_source_used_directly() {
        let h = harness(
            |primary, secondary| {
                primary.set_price(Symbol::from("MAJOR:ETH-USD"), dec!(3_000));
                secondary.set_healthy(false);
            },
            |_| {},
        );

        let ticks = h.aggregator.refresh_majors(Timestamp::from_millis(1_000));
        let eth = ticks
            .iter()
            .find(|t| t.symbol.as_str() == "MAJOR:ETH-USD")
            .unwrap();
        assert_eq!(eth.price.value(), dec!(3_000));
        assert_eq!(eth.source, "primary");
    }

    #[test]
    fn outlier_tick_never_reaches_the_store() {
        let h = harness(
            |primary, _| {
                primary.set_price(Symbol::from("MAJOR:BTC-USD"), dec!(50_000));
            },
            |_| {},
        );

        // build up a window
        for i in 0..3i64 {
            h.aggregator.refresh_majors(Timestamp::from_millis(1_000 + i));
        }
        let history_before = h.prices.history_len();

        let spike = Tick {
            symbol: Symbol::from("MAJOR:BTC-USD"),
            price: Price::new_unchecked(dec!(90_000)),
            liquidity_usd: None,
            volume_24h_usd: None,
            source: "rogue".to_string(),
            ts: Timestamp::from_millis(5_000),
        };
        let check = h.aggregator.ingest(spike);
        assert!(!check.valid);
        assert_eq!(h.prices.history_len(), history_before);
    }

    #[test]
    fn universe_refresh_applies_filters_and_is_idempotent() {
        let now = Timestamp::from_millis(3 * DAY_MS);
        let h = harness(
            |_, _| {},
            |pools| {
                pools.add_pair(good_pair("mint1", dec!(100_000)));
                // too thin to be admitted
                pools.add_pair(PoolPair {
                    liquidity_usd: dec!(1_000),
                    ..good_pair("mint2", dec!(1_000))
                });
            },
        );

        let universe = h.aggregator.refresh_universe(now);
        // 7 majors + 1 admitted memecoin
        assert_eq!(universe.len(), 8);

        let again = h.aggregator.refresh_universe(now);
        assert_eq!(again.len(), 8);
        assert!(h.universe.get(&Symbol::from("SOL:mint1")).is_some());
        assert!(h.universe.get(&Symbol::from("SOL:mint2")).is_none());
    }

    #[test]
    fn memecoin_ticks_use_best_pair_by_liquidity() {
        let now = Timestamp::from_millis(3 * DAY_MS);
        let h = harness(
            |_, _| {},
            |pools| {
                pools.add_pair(good_pair("mint1", dec!(100_000)));
                // same token, deeper pool, different price
                pools.add_pair(PoolPair {
                    price_usd: dec!(0.6),
                    ..good_pair("mint1", dec!(500_000))
                });
            },
        );

        h.aggregator.refresh_universe(now);
        let ticks = h.aggregator.refresh_memecoins(now);

        assert_eq!(ticks.len(), 1);
        assert_eq!(ticks[0].price.value(), dec!(0.6));
        assert_eq!(ticks[0].liquidity_usd, Some(dec!(500_000)));
    }

    #[test]
    fn universe_falls_back_to_majors() {
        let h = harness(|_, _| {}, |_| {});
        let tokens = h.aggregator.universe_tokens(Timestamp::from_millis(0));
        assert_eq!(tokens.len(), 7);
        assert!(tokens.iter().all(|t| t.is_major));
    }

    #[test]
    fn health_reports_every_source() {
        let h = harness(
            |_, secondary| {
                secondary.set_healthy(false);
            },
            |_| {},
        );

        let health = h.aggregator.health();
        assert_eq!(health.len(), 3);
        assert_eq!(
            health,
            vec![
                ("primary".to_string(), true),
                ("secondary".to_string(), false),
                ("pools".to_string(), true),
            ]
        );
    }
}
