//! Exchange integrations for rebalancing.
//!
//! ## Binance
//! Signed REST access for:
//! - Spot prices and lot-size filters
//! - Simple Earn flexible product lookup and redemption
//! - Spot market orders
//!
//! ## Mock
//! In-memory paper-trading venue implementing the same gateway port.

mod client;
mod error;
pub mod mock;
mod traits;
mod types;

pub use client::BinanceClient;
pub use error::{GatewayError, INVALID_SYMBOL_CODE};
pub use mock::{GatewayCall, GatewayOperation, MockExchange};
#[cfg(test)]
pub use traits::MockExchangeGateway;
pub use traits::ExchangeGateway;
pub use types::*;
