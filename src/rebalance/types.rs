//! Request, plan and outcome values for a single rebalance.

use super::error::RebalanceError;
use crate::exchange::{FillReport, OrderSide, RedeemReceipt};
use crate::utils::round_to_precision;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

/// Amounts sent to the exchange carry at most 8 decimals.
const ORDER_DECIMALS: u32 = 8;

/// Caller-supplied holdings to rebalance.
#[derive(Debug, Clone, PartialEq)]
pub struct RebalanceRequest {
    pub base_asset: String,
    pub quote_asset: String,
    /// Base asset currently held
    pub base_asset_qty: Decimal,
    /// Quote asset currently held, valued 1:1
    pub quote_asset_qty: Decimal,
    /// Dry-run: plan only, never redeem or trade
    pub simulate: bool,
    /// Safety ceiling for a single trade's notional value
    pub max_trade_value_usd: Decimal,
}

impl RebalanceRequest {
    pub fn new(
        base_asset: impl Into<String>,
        quote_asset: impl Into<String>,
        base_asset_qty: Decimal,
        quote_asset_qty: Decimal,
        max_trade_value_usd: Decimal,
    ) -> Self {
        Self {
            base_asset: base_asset.into(),
            quote_asset: quote_asset.into(),
            base_asset_qty,
            quote_asset_qty,
            simulate: false,
            max_trade_value_usd,
        }
    }

    pub fn with_simulate(mut self, simulate: bool) -> Self {
        self.simulate = simulate;
        self
    }

    /// Exchange symbol, e.g. `BTCUSDT`.
    pub fn symbol(&self) -> String {
        format!("{}{}", self.base_asset.trim(), self.quote_asset.trim()).to_uppercase()
    }

    /// Key identifying the pair for mutual exclusion.
    pub fn pair_key(&self) -> String {
        format!("{}/{}", self.base_asset.trim(), self.quote_asset.trim()).to_uppercase()
    }

    pub fn validate(&self) -> Result<(), RebalanceError> {
        if self.base_asset.trim().is_empty() {
            return Err(RebalanceError::InvalidRequest("base_asset is required".into()));
        }
        if self.quote_asset.trim().is_empty() {
            return Err(RebalanceError::InvalidRequest("quote_asset is required".into()));
        }
        if self.base_asset_qty < Decimal::ZERO {
            return Err(RebalanceError::InvalidRequest(
                "base_asset_qty must not be negative".into(),
            ));
        }
        if self.quote_asset_qty < Decimal::ZERO {
            return Err(RebalanceError::InvalidRequest(
                "quote_asset_qty must not be negative".into(),
            ));
        }
        Ok(())
    }
}

/// Current price of a symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceQuote {
    pub symbol: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

/// Direction needed to restore a 50/50 split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RebalanceAction {
    Balanced,
    SellBaseBuyQuote,
    BuyBaseSellQuote,
}

impl RebalanceAction {
    /// Order side on the pair, `None` when balanced.
    pub fn side(&self) -> Option<OrderSide> {
        match self {
            RebalanceAction::Balanced => None,
            RebalanceAction::SellBaseBuyQuote => Some(OrderSide::Sell),
            RebalanceAction::BuyBaseSellQuote => Some(OrderSide::Buy),
        }
    }
}

impl fmt::Display for RebalanceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RebalanceAction::Balanced => write!(f, "BALANCED"),
            RebalanceAction::SellBaseBuyQuote => write!(f, "SELL_BASE_BUY_QUOTE"),
            RebalanceAction::BuyBaseSellQuote => write!(f, "BUY_BASE_SELL_QUOTE"),
        }
    }
}

/// Computed rebalance, immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct RebalancePlan {
    pub symbol: String,
    pub price: Decimal,
    pub base_value: Decimal,
    pub quote_value: Decimal,
    pub total_value: Decimal,
    pub target_each: Decimal,
    pub action: RebalanceAction,
    /// Base units before lot-step quantization
    pub raw_amount: Decimal,
    /// Base units to trade after quantization
    pub amount: Decimal,
    pub step_size: Option<Decimal>,
    /// Quote notional of the imbalance
    pub diff_value: Decimal,
    pub over_limit: bool,
    pub max_trade_value_usd: Decimal,
}

impl RebalancePlan {
    /// Whether anything would be traded, ignoring the limit and simulate mode.
    pub fn has_trade(&self) -> bool {
        self.action != RebalanceAction::Balanced && self.amount > Decimal::ZERO
    }

    /// Redemption and order implied by this plan.
    ///
    /// Sells redeem the base amount; buys redeem the needed quote times
    /// `redeem_buffer` and spend exactly the needed quote. An order that
    /// rounds to zero at exchange precision has no intent.
    pub fn trade_intent(
        &self,
        request: &RebalanceRequest,
        redeem_buffer: Decimal,
    ) -> Result<Option<TradeIntent>, RebalanceError> {
        let Some(side) = self.action.side().filter(|_| self.has_trade()) else {
            return Ok(None);
        };

        let overflow = || RebalanceError::InvalidRequest("trade value is too large".into());
        let base_amount = round_to_precision(self.amount, ORDER_DECIMALS);
        let quote_amount = round_to_precision(
            self.amount.checked_mul(self.price).ok_or_else(overflow)?,
            ORDER_DECIMALS,
        );

        let intent = match side {
            OrderSide::Sell => TradeIntent {
                side,
                symbol: self.symbol.clone(),
                base_amount,
                quote_amount,
                redeem_asset: request.base_asset.trim().to_uppercase(),
                redeem_amount: base_amount,
            },
            OrderSide::Buy => TradeIntent {
                side,
                symbol: self.symbol.clone(),
                base_amount,
                quote_amount,
                redeem_asset: request.quote_asset.trim().to_uppercase(),
                redeem_amount: round_to_precision(
                    quote_amount.checked_mul(redeem_buffer).ok_or_else(overflow)?,
                    ORDER_DECIMALS,
                ),
            },
        };

        let order_size = match side {
            OrderSide::Sell => intent.base_amount,
            OrderSide::Buy => intent.quote_amount,
        };
        if order_size.is_zero() {
            return Ok(None);
        }
        Ok(Some(intent))
    }
}

/// Redemption plus market order derived from a plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeIntent {
    pub side: OrderSide,
    pub symbol: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub base_amount: Decimal,
    /// Notional at the planning price; the exact spend on buys
    #[serde(with = "rust_decimal::serde::float")]
    pub quote_amount: Decimal,
    pub redeem_asset: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub redeem_amount: Decimal,
}

/// Why no trade was attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Balanced,
    OverLimit,
}

/// Redemption receipt and fill of an executed rebalance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionReport {
    pub redemption: RedeemReceipt,
    pub fill: FillReport,
}

/// Terminal state of a rebalance that did not fail.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    Skipped { reason: SkipReason },
    Simulated { intent: TradeIntent },
    Executed(ExecutionReport),
}

impl ExecutionOutcome {
    pub fn is_executed(&self) -> bool {
        matches!(self, ExecutionOutcome::Executed(_))
    }
}

/// Plan and outcome of a full rebalance call.
#[derive(Debug, Clone, PartialEq)]
pub struct RebalanceReport {
    pub plan: RebalancePlan,
    pub outcome: ExecutionOutcome,
}

/// Result of a standalone Earn redemption.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RedeemOutcome {
    Simulated {
        asset: String,
        #[serde(with = "rust_decimal::serde::float")]
        amount: Decimal,
    },
    Redeemed(RedeemReceipt),
}
