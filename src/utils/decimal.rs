//! Decimal arithmetic utilities for financial calculations.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Round a decimal to a specific number of decimal places.
pub fn round_to_precision(value: Decimal, decimals: u32) -> Decimal {
    value.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero)
}

/// Round down to lot size (quantity precision).
pub fn round_down_to_lot(value: Decimal, lot_size: Decimal) -> Decimal {
    if lot_size == Decimal::ZERO {
        return value;
    }
    (value / lot_size).floor() * lot_size
}

/// Decimal places implied by a lot step: `round(-log10(step))`, never
/// negative and never fewer than the step's own scale.
pub fn step_precision(step_size: Decimal) -> u32 {
    let from_log = step_size
        .to_f64()
        .filter(|s| *s > 0.0)
        .map(|s| (-s.log10()).round())
        .filter(|p| *p > 0.0)
        .map(|p| p as u32)
        .unwrap_or(0);

    from_log.max(step_size.normalize().scale())
}

/// Snap `value` to the nearest multiple of `step_size` (half away from zero),
/// then trim to the step's precision.
///
/// A non-positive step means "no step constraint" and returns `value` as is.
/// `None` when the step count overflows `Decimal`.
pub fn adjust_to_step_size(value: Decimal, step_size: Decimal) -> Option<Decimal> {
    if step_size <= Decimal::ZERO {
        return Some(value);
    }

    let steps = value
        .checked_div(step_size)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let snapped = steps.checked_mul(step_size)?;
    Some(round_to_precision(snapped, step_precision(step_size)).normalize())
}

/// Safe division that returns zero if divisor is zero.
pub fn safe_div(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator == Decimal::ZERO {
        Decimal::ZERO
    } else {
        numerator / denominator
    }
}
