// papertrade-core: paper-trading exchange engine for autonomous agents.
// accounting-first architecture: margin math and terminal sweeps take priority.
// fills are synthetic (against the mark price), never matched against a book.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: AccountId, Symbol, Side, Price, Quote, Leverage
//   2.x  order.rs: immutable order/trade records, reject reasons
//   3.x  margin.rs: margin checks, equity, terminal-state math
//   4.x  position.rs: position struct, pnl, open/increase/reduce/close/flip
//   5.x  fees.rs: fee + slippage pricing, adverse fills
//   7.x  config.rs: fees, margins, universe filters, env presets
//   8.x  engine/: orchestrator: order pipeline, lifecycle sweeps
//   9.x  aggregator.rs: multi-source reconciliation and ingestion
//   9.1  outlier.rs: rolling-median spike filter
//   10.x store.rs: account shards + append-only order/trade/event logs
//   11.x events.rs: account audit events
//
// supporting modules: asset.rs (majors vs memecoins), validate.rs (order
// rules), price_store.rs (tick cache + history), universe.rs (tradable set),
// sources.rs (tick/pool source traits and mocks).

// core trading modules
pub mod account;
pub mod asset;
pub mod engine;
pub mod events;
pub mod fees;
pub mod margin;
pub mod order;
pub mod position;
pub mod types;
pub mod validate;

// market data modules
pub mod aggregator;
pub mod outlier;
pub mod price_store;
pub mod sources;
pub mod universe;

// state and configuration
pub mod config;
pub mod store;

// re exports for convenience
pub use account::*;
pub use aggregator::*;
pub use asset::*;
pub use config::*;
pub use engine::*;
pub use events::*;
pub use fees::*;
pub use margin::*;
pub use order::*;
pub use outlier::*;
pub use position::*;
pub use price_store::*;
pub use sources::*;
pub use types::*;
pub use universe::*;
pub use validate::*;
