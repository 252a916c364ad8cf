//! Rebalance engine.
//!
//! Values a base/quote holding at the current spot price, decides which way
//! and how much to trade to get back to a 50/50 split, snaps the size to the
//! exchange lot step and applies the max-trade-value cap. Real executions
//! redeem from flexible Earn, wait for settlement, then place a market order.

mod engine;
mod error;
mod locks;
mod types;

pub use engine::{EngineSettings, RebalanceEngine};
pub use error::{ExecutionStage, RebalanceError};
pub use locks::PairLocks;
pub use types::*;
