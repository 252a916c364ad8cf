//! # Earn Rebalancer
//!
//! Keeps a base/quote holding at a 50/50 value split on Binance spot,
//! redeeming from flexible Simple Earn before each market order.
//!
//! ## Architecture
//!
//! - `config`: Configuration loading and validation
//! - `exchange`: Gateway port, signed Binance REST client and in-memory mock
//! - `rebalance`: Rebalance planning, quantization and execution
//! - `api`: axum HTTP surface
//! - `utils`: Shared utilities and decimal arithmetic

pub mod api;
pub mod config;
pub mod exchange;
pub mod rebalance;
pub mod utils;

pub use config::Config;
