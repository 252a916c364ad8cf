//! Shared utilities.

pub mod decimal;

pub use decimal::{adjust_to_step_size, round_down_to_lot, round_to_precision, safe_div, step_precision};
