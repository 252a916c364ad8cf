//! Venue-agnostic gateway port used by the rebalance engine.
//!
//! Any exchange SDK can sit behind [`ExchangeGateway`]; request signing,
//! rate limits and transport stay on the implementation side.

use super::error::GatewayError;
use super::types::{FillReport, RedeemReceipt};
use async_trait::async_trait;
use rust_decimal::Decimal;

/// The five exchange capabilities a rebalance needs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    /// Last traded price of `symbol`, in quote currency per base unit.
    async fn get_price(&self, symbol: &str) -> Result<Decimal, GatewayError>;

    /// Lot step size of `symbol`, `None` when the venue publishes no lot filter.
    async fn get_lot_step_size(&self, symbol: &str) -> Result<Option<Decimal>, GatewayError>;

    /// Move `amount` of `asset` from flexible Earn back to the spot wallet.
    async fn redeem_flexible(
        &self,
        asset: &str,
        amount: Decimal,
    ) -> Result<RedeemReceipt, GatewayError>;

    /// Market buy spending `quote_amount` of the quote asset.
    async fn market_buy(
        &self,
        symbol: &str,
        quote_amount: Decimal,
    ) -> Result<FillReport, GatewayError>;

    /// Market sell of `base_amount` base units.
    async fn market_sell(
        &self,
        symbol: &str,
        base_amount: Decimal,
    ) -> Result<FillReport, GatewayError>;
}
