//! Paper-Trading Exchange Core Simulation.
//!
//! Demonstrates the full engine lifecycle: universe discovery, multi-source
//! price ingestion with outlier rejection, synthetic fills with fees and
//! slippage, margin accounting, and a liquidation sweep.

use papertrade_core::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

fn main() {
    env_logger::init();

    println!("Paper-Trading Exchange Core Simulation");
    println!("Synthetic Fills, Two-Tier Margin, Terminal Sweeps\n");

    scenario_1_market_data_pipeline();
    scenario_2_basic_trading();
    scenario_3_memecoin_spot_rules();
    scenario_4_liquidation_sweep();

    println!("\nAll simulations completed successfully.");
}

struct Sim {
    exchange: Exchange,
    aggregator: MarketDataAggregator,
    primary: Arc<MockTickSource>,
    secondary: Arc<MockTickSource>,
    pools: Arc<MockPoolSource>,
}

// mock source fan-out wired to the exchange's own price/universe stores
fn build_sim() -> Sim {
    let config = ExchangeConfig::default();
    let exchange = Exchange::new(config.clone());

    let primary = Arc::new(MockTickSource::new("primary"));
    let secondary = Arc::new(MockTickSource::new("secondary"));
    let pools = Arc::new(MockPoolSource::new("pools"));

    let aggregator = MarketDataAggregator::new(
        config.market_data,
        config.outlier,
        config.universe,
        config.assets,
        vec![
            Box::new(SharedTickSource(Arc::clone(&primary))),
            Box::new(SharedTickSource(Arc::clone(&secondary))),
        ],
        Box::new(SharedPoolSource(Arc::clone(&pools))),
        exchange.price_store(),
        exchange.universe_store(),
    );

    Sim {
        exchange,
        aggregator,
        primary,
        secondary,
        pools,
    }
}

// thin forwarding wrappers so the scenarios keep handles to the mocks after
// the aggregator takes ownership of its sources
struct SharedTickSource(Arc<MockTickSource>);

impl TickSource for SharedTickSource {
    fn name(&self) -> &str {
        self.0.name()
    }
    fn fetch_ticks(&self, symbols: &[Symbol], now: Timestamp) -> Vec<Tick> {
        self.0.fetch_ticks(symbols, now)
    }
    fn healthy(&self) -> bool {
        self.0.healthy()
    }
}

struct SharedPoolSource(Arc<MockPoolSource>);

impl PoolSource for SharedPoolSource {
    fn name(&self) -> &str {
        self.0.name()
    }
    fn fetch_pairs(&self, chain: Chain, addresses: &[String]) -> Vec<PoolPair> {
        self.0.fetch_pairs(chain, addresses)
    }
    fn discover(&self) -> Vec<PoolPair> {
        self.0.discover()
    }
    fn healthy(&self) -> bool {
        self.0.healthy()
    }
}

fn seed_majors(sim: &Sim, btc: Decimal, eth: Decimal) {
    sim.primary.set_price(Symbol::from("MAJOR:BTC-USD"), btc);
    sim.secondary.set_price(Symbol::from("MAJOR:BTC-USD"), btc + dec!(20));
    sim.primary.set_price(Symbol::from("MAJOR:ETH-USD"), eth);
    sim.secondary.set_price(Symbol::from("MAJOR:ETH-USD"), eth);
    sim.aggregator.refresh_majors(Timestamp::now());
}

/// Multi-source reconciliation and the outlier gate.
fn scenario_1_market_data_pipeline() {
    println!("Scenario 1: Market Data Pipeline\n");

    let sim = build_sim();
    let day_ms: i64 = 24 * 60 * 60 * 1000;

    sim.pools.add_pair(PoolPair {
        chain: Chain::Solana,
        address: "bonkmint".to_string(),
        name: "Bonk".to_string(),
        price_usd: dec!(0.000025),
        liquidity_usd: dec!(400_000),
        volume_24h_usd: dec!(900_000),
        pair_created_at: Timestamp::from_millis(Timestamp::now().as_millis() - 30 * day_ms),
    });

    let universe = sim.aggregator.refresh_universe(Timestamp::now());
    println!("  Universe: {} tokens ({} majors)", universe.len(),
        universe.iter().filter(|t| t.is_major).count());

    seed_majors(&sim, dec!(50_000), dec!(3_000));
    let ticks = sim.aggregator.refresh_memecoins(Timestamp::now());
    println!("  Memecoin ticks stored: {}", ticks.len());

    // a window needs history before the spike filter engages
    for _ in 0..3 {
        seed_majors(&sim, dec!(50_000), dec!(3_000));
    }

    let spike = Tick {
        symbol: Symbol::from("MAJOR:BTC-USD"),
        price: Price::new_unchecked(dec!(90_000)),
        liquidity_usd: None,
        volume_24h_usd: None,
        source: "rogue".to_string(),
        ts: Timestamp::now(),
    };
    let check = sim.aggregator.ingest(spike);
    println!("  Spike tick at 90,000 accepted: {}", check.valid);
    println!("  Health: {:?}\n", sim.aggregator.health());
}

/// A plain leveraged major trade end to end.
fn scenario_2_basic_trading() {
    println!("Scenario 2: Basic Trading\n");

    let sim = build_sim();
    sim.aggregator.refresh_universe(Timestamp::now());
    seed_majors(&sim, dec!(50_000), dec!(3_000));

    let alice = sim.exchange.open_account();
    println!("  Alice opens an account with $10,000");

    let outcome = sim
        .exchange
        .place_order(
            alice,
            Symbol::from("MAJOR:BTC-USD"),
            OrderSide::Buy,
            dec!(0.1),
            Leverage::new(dec!(5)).unwrap(),
        )
        .unwrap();

    println!(
        "  BUY 0.1 BTC at 5x: filled={} fill_price={} fee={}",
        outcome.success(),
        outcome.fill_price.unwrap(),
        outcome.fee.unwrap()
    );

    let snapshot = sim.exchange.account(alice).unwrap();
    println!(
        "  Cash: {}  margin positions: {}",
        snapshot.account.cash,
        snapshot.open_positions.len()
    );

    // close it again (the unwind is margin-checked too, so keep 5x)
    let outcome = sim
        .exchange
        .place_order(
            alice,
            Symbol::from("MAJOR:BTC-USD"),
            OrderSide::Sell,
            dec!(0.1),
            Leverage::new(dec!(5)).unwrap(),
        )
        .unwrap();
    println!("  SELL 0.1 BTC closes the position: filled={}", outcome.success());

    let snapshot = sim.exchange.account(alice).unwrap();
    println!("  Open positions left: {}\n", snapshot.open_positions.len());
}

/// Memecoins are spot-only: no leverage, no naked sells, impact slippage.
fn scenario_3_memecoin_spot_rules() {
    println!("Scenario 3: Memecoin Spot Rules\n");

    let sim = build_sim();
    let day_ms: i64 = 24 * 60 * 60 * 1000;
    sim.pools.add_pair(PoolPair {
        chain: Chain::Solana,
        address: "bonkmint".to_string(),
        name: "Bonk".to_string(),
        price_usd: dec!(0.5),
        liquidity_usd: dec!(200_000),
        volume_24h_usd: dec!(100_000),
        pair_created_at: Timestamp::from_millis(Timestamp::now().as_millis() - 30 * day_ms),
    });
    sim.aggregator.refresh_universe(Timestamp::now());
    sim.aggregator.refresh_memecoins(Timestamp::now());
    seed_majors(&sim, dec!(50_000), dec!(3_000));

    let bob = sim.exchange.open_account();
    let bonk = Symbol::from("SOL:bonkmint");

    let leveraged = sim
        .exchange
        .place_order(bob, bonk.clone(), OrderSide::Buy, dec!(100), Leverage::new(dec!(2)).unwrap())
        .unwrap();
    println!(
        "  BUY at 2x rejected: {}",
        leveraged.reject_reason.unwrap()
    );

    let naked_sell = sim
        .exchange
        .place_order(bob, bonk.clone(), OrderSide::Sell, dec!(100), Leverage::one())
        .unwrap();
    println!("  Naked SELL rejected: {}", naked_sell.reject_reason.unwrap());

    let buy = sim
        .exchange
        .place_order(bob, bonk.clone(), OrderSide::Buy, dec!(1_000), Leverage::one())
        .unwrap();
    println!(
        "  Spot BUY 1000 filled at {} (slippage-adjusted)",
        buy.fill_price.unwrap()
    );

    let sell = sim
        .exchange
        .place_order(bob, bonk, OrderSide::Sell, dec!(1_000), Leverage::one())
        .unwrap();
    println!("  Spot SELL 1000 filled: {}\n", sell.success());
}

/// An over-leveraged long, an adverse move, and the terminal sweep.
fn scenario_4_liquidation_sweep() {
    println!("Scenario 4: Liquidation Sweep\n");

    let sim = build_sim();
    sim.aggregator.refresh_universe(Timestamp::now());
    seed_majors(&sim, dec!(50_000), dec!(3_000));

    let carol = sim.exchange.open_account();
    let outcome = sim
        .exchange
        .place_order(
            carol,
            Symbol::from("MAJOR:BTC-USD"),
            OrderSide::Buy,
            dec!(0.18),
            Leverage::new(dec!(5)).unwrap(),
        )
        .unwrap();
    println!("  Carol longs 0.18 BTC at 5x: filled={}", outcome.success());

    // a 4% drop pushes equity below the maintenance requirement
    seed_majors(&sim, dec!(48_000), dec!(3_000));

    let sweeps = sim.exchange.sweep_all();
    for (account_id, sweep) in sweeps {
        if sweep.transitioned {
            println!(
                "  Account {:?} -> {} ({} positions force-closed)",
                account_id,
                sweep.new_state.unwrap(),
                sweep.positions_closed
            );
        }
    }

    let snapshot = sim.exchange.account(carol).unwrap();
    println!(
        "  Carol status: {}  death_equity: {}",
        snapshot.account.status,
        snapshot
            .account
            .death_equity
            .map(|q| q.to_string())
            .unwrap_or_else(|| "-".to_string())
    );

    // the sweep is idempotent
    let again = sim.exchange.check_and_transition(carol).unwrap();
    println!("  Second sweep transitions: {}", again.transitioned);
}
