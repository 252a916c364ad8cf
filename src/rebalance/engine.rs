//! 50/50 rebalance computation and execution.

use super::error::{ExecutionStage, RebalanceError};
use super::locks::PairLocks;
use super::types::*;
use crate::config::RebalanceConfig;
use crate::exchange::{ExchangeGateway, GatewayError, OrderSide};
use crate::utils::adjust_to_step_size;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// Execution parameters of the engine.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Wait between Earn redemption and the market order
    pub settlement_delay: Duration,
    /// Multiplier on the quote redeemed before a buy
    pub redeem_buffer: Decimal,
    /// Guard plan + execute with a per-pair lock
    pub serialize_pairs: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from(&RebalanceConfig::default())
    }
}

impl From<&RebalanceConfig> for EngineSettings {
    fn from(config: &RebalanceConfig) -> Self {
        Self {
            settlement_delay: config.settlement_delay(),
            redeem_buffer: config.redeem_buffer,
            serialize_pairs: config.serialize_pairs,
        }
    }
}

/// Plans and executes rebalances against an exchange gateway.
pub struct RebalanceEngine {
    gateway: Arc<dyn ExchangeGateway>,
    settings: EngineSettings,
    locks: PairLocks,
}

impl RebalanceEngine {
    pub fn new(gateway: Arc<dyn ExchangeGateway>, settings: EngineSettings) -> Self {
        Self {
            gateway,
            settings,
            locks: PairLocks::new(),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Fetch a usable price for `symbol`.
    ///
    /// Invalid symbols and non-positive prices are `PriceUnavailable`; any
    /// other gateway failure is passed through.
    pub async fn quote(&self, symbol: &str) -> Result<PriceQuote, RebalanceError> {
        let symbol = symbol.trim().to_uppercase();
        let price = match self.gateway.get_price(&symbol).await {
            Ok(price) => price,
            Err(e) if e.is_invalid_symbol() => {
                return Err(RebalanceError::PriceUnavailable {
                    reason: e.to_string(),
                    symbol,
                });
            }
            Err(e) => return Err(e.into()),
        };

        if price <= Decimal::ZERO {
            return Err(RebalanceError::PriceUnavailable {
                reason: format!("exchange returned non-positive price {price}"),
                symbol,
            });
        }

        debug!(%symbol, %price, "Price fetched");
        Ok(PriceQuote { symbol, price })
    }

    /// Compute the plan that restores a 50/50 value split.
    #[instrument(skip(self, request), fields(symbol = %request.symbol()))]
    pub async fn compute(&self, request: &RebalanceRequest) -> Result<RebalancePlan, RebalanceError> {
        request.validate()?;

        let PriceQuote { symbol, price } = self.quote(&request.symbol()).await?;

        let base_value = request
            .base_asset_qty
            .checked_mul(price)
            .ok_or_else(|| too_large("base_asset_qty"))?;
        let quote_value = request.quote_asset_qty;
        let total_value = base_value
            .checked_add(quote_value)
            .ok_or_else(|| too_large("total holdings value"))?;
        let target_each = total_value / dec!(2);

        let (action, diff_value) = if base_value > target_each {
            (RebalanceAction::SellBaseBuyQuote, base_value - target_each)
        } else if quote_value > target_each {
            (RebalanceAction::BuyBaseSellQuote, target_each - base_value)
        } else {
            (RebalanceAction::Balanced, Decimal::ZERO)
        };
        let raw_amount = diff_value
            .checked_div(price)
            .ok_or_else(|| too_large("trade amount"))?;

        let mut amount = raw_amount;
        let mut step_size = None;
        if raw_amount > Decimal::ZERO {
            step_size = self
                .gateway
                .get_lot_step_size(&symbol)
                .await?
                .filter(|step| *step > Decimal::ZERO);

            if let Some(step) = step_size {
                amount = adjust_to_step_size(raw_amount, step).ok_or_else(|| too_large("trade amount"))?;
                if amount != raw_amount {
                    debug!(%symbol, original = %raw_amount, adjusted = %amount, %step, "Adjusted to step size");
                }
            } else {
                debug!(%symbol, "No lot step size published, trading raw amount");
            }
        }

        let over_limit = diff_value > request.max_trade_value_usd;

        info!(
            %symbol,
            %price,
            %base_value,
            %quote_value,
            %target_each,
            %action,
            %amount,
            %diff_value,
            over_limit,
            "Rebalance planned"
        );

        Ok(RebalancePlan {
            symbol,
            price,
            base_value,
            quote_value,
            total_value,
            target_each,
            action,
            raw_amount,
            amount,
            step_size,
            diff_value,
            over_limit,
            max_trade_value_usd: request.max_trade_value_usd,
        })
    }

    /// Skip, simulate, or redeem-settle-order according to `plan`.
    ///
    /// The over-limit check runs before the simulate check, so an oversized
    /// trade is reported as skipped in every mode.
    pub async fn execute(
        &self,
        plan: &RebalancePlan,
        request: &RebalanceRequest,
    ) -> Result<ExecutionOutcome, RebalanceError> {
        if !plan.has_trade() {
            debug!(symbol = %plan.symbol, action = %plan.action, "Nothing to trade");
            return Ok(ExecutionOutcome::Skipped {
                reason: SkipReason::Balanced,
            });
        }

        if plan.over_limit {
            warn!(
                symbol = %plan.symbol,
                diff_value = %plan.diff_value,
                limit = %plan.max_trade_value_usd,
                "Trade skipped: over limit"
            );
            return Ok(ExecutionOutcome::Skipped {
                reason: SkipReason::OverLimit,
            });
        }

        let Some(intent) = plan.trade_intent(request, self.settings.redeem_buffer)? else {
            debug!(symbol = %plan.symbol, amount = %plan.amount, "Order rounds to zero at exchange precision");
            return Ok(ExecutionOutcome::Skipped {
                reason: SkipReason::Balanced,
            });
        };

        if request.simulate {
            info!(
                symbol = %intent.symbol,
                side = ?intent.side,
                base_amount = %intent.base_amount,
                redeem_asset = %intent.redeem_asset,
                redeem_amount = %intent.redeem_amount,
                "[simulate] Would redeem and trade"
            );
            return Ok(ExecutionOutcome::Simulated { intent });
        }

        let redemption = self
            .gateway
            .redeem_flexible(&intent.redeem_asset, intent.redeem_amount)
            .await
            .and_then(|receipt| {
                if receipt.success {
                    Ok(receipt)
                } else {
                    Err(GatewayError::Unavailable(format!(
                        "redemption of {} {} was not accepted",
                        intent.redeem_amount, intent.redeem_asset
                    )))
                }
            })
            .map_err(|source| {
                error!(asset = %intent.redeem_asset, error = %source, "Earn redemption failed");
                RebalanceError::ExecutionFailed {
                    stage: ExecutionStage::Redeem,
                    source,
                }
            })?;

        self.settle().await;

        let order = match intent.side {
            OrderSide::Sell => self.gateway.market_sell(&intent.symbol, intent.base_amount).await,
            OrderSide::Buy => self.gateway.market_buy(&intent.symbol, intent.quote_amount).await,
        };
        let fill = order.map_err(|source| {
            error!(
                symbol = %intent.symbol,
                redeemed_asset = %redemption.asset,
                redeemed_amount = %redemption.amount,
                error = %source,
                "Order failed after redemption; redeemed funds remain in spot"
            );
            RebalanceError::ExecutionFailed {
                stage: ExecutionStage::Order,
                source,
            }
        })?;

        info!(
            symbol = %fill.symbol,
            order_id = fill.order_id,
            executed_qty = %fill.executed_qty,
            quote_qty = %fill.cumulative_quote_qty,
            avg_price = %fill.average_price(),
            "Rebalance executed"
        );

        Ok(ExecutionOutcome::Executed(ExecutionReport { redemption, fill }))
    }

    /// Plan and execute one rebalance.
    pub async fn run(&self, request: &RebalanceRequest) -> Result<RebalanceReport, RebalanceError> {
        let _guard = if self.settings.serialize_pairs {
            Some(self.locks.lock(&request.pair_key()).await)
        } else {
            None
        };

        let plan = self.compute(request).await?;
        let outcome = self.execute(&plan, request).await?;
        Ok(RebalanceReport { plan, outcome })
    }

    /// Redeem an arbitrary amount from flexible Earn.
    pub async fn redeem(
        &self,
        asset: &str,
        amount: Decimal,
        simulate: bool,
    ) -> Result<RedeemOutcome, RebalanceError> {
        let asset = asset.trim().to_uppercase();
        if asset.is_empty() {
            return Err(RebalanceError::InvalidRequest("asset is required".into()));
        }
        if amount <= Decimal::ZERO {
            return Err(RebalanceError::InvalidRequest("amount must be positive".into()));
        }

        if simulate {
            info!(%asset, %amount, "[simulate] Would redeem from Simple Earn");
            return Ok(RedeemOutcome::Simulated { asset, amount });
        }

        let receipt = self.gateway.redeem_flexible(&asset, amount).await?;
        Ok(RedeemOutcome::Redeemed(receipt))
    }

    /// Wait for redeemed funds to become tradable.
    async fn settle(&self) {
        if self.settings.settlement_delay.is_zero() {
            return;
        }
        debug!(delay_ms = self.settings.settlement_delay.as_millis() as u64, "Waiting for settlement");
        tokio::time::sleep(self.settings.settlement_delay).await;
    }
}

fn too_large(what: &str) -> RebalanceError {
    RebalanceError::InvalidRequest(format!("{what} is too large"))
}
