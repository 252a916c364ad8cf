use crate::exchange::RedeemReceipt;
use crate::rebalance::{ExecutionOutcome, RebalanceAction, RebalanceReport, RebalanceRequest, RedeemOutcome};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub(crate) fn timestamp() -> String {
    Utc::now().to_rfc3339()
}

/// Body of `POST /rebalance`. Every field is optional so missing ones
/// can be reported as a 400 instead of a rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RebalanceBody {
    #[serde(default)]
    pub base_asset: Option<String>,
    #[serde(default)]
    pub quote_asset: Option<String>,
    #[serde(default)]
    pub base_asset_qty: Option<Decimal>,
    #[serde(default)]
    pub quote_asset_qty: Option<Decimal>,
    #[serde(default)]
    pub dev: Option<bool>,
}

impl RebalanceBody {
    /// Build the engine request; `None` when a required field is missing.
    pub fn into_request(self, simulate: bool, max_trade_value_usd: Decimal) -> Option<RebalanceRequest> {
        let base_asset = self.base_asset.filter(|s| !s.trim().is_empty())?;
        let quote_asset = self.quote_asset.filter(|s| !s.trim().is_empty())?;
        Some(
            RebalanceRequest::new(
                base_asset,
                quote_asset,
                self.base_asset_qty?,
                self.quote_asset_qty?,
                max_trade_value_usd,
            )
            .with_simulate(simulate),
        )
    }
}

/// Body of `POST /rebalance/test-redeem`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RedeemBody {
    #[serde(default)]
    pub asset: Option<String>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub dev: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PriceResponse {
    pub symbol: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub timestamp: String,
}

/// Full plan and outcome of a rebalance call.
#[derive(Debug, Clone, Serialize)]
pub struct RebalanceResponse {
    pub symbol: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub base_asset: String,
    pub quote_asset: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub base_asset_qty: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub quote_asset_qty: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub base_value: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub quote_value: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_value: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub target_each: Decimal,
    pub action: RebalanceAction,
    #[serde(with = "rust_decimal::serde::float")]
    pub trade_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub trade_value: Decimal,
    pub trade_over_limit: bool,
    #[serde(with = "rust_decimal::serde::float")]
    pub trade_limit_usd: Decimal,
    pub dev_mode: bool,
    pub trade_result: ExecutionOutcome,
    pub timestamp: String,
}

impl RebalanceResponse {
    pub fn from_report(request: &RebalanceRequest, report: RebalanceReport) -> Self {
        let RebalanceReport { plan, outcome } = report;
        Self {
            symbol: plan.symbol,
            price: plan.price,
            base_asset: request.base_asset.clone(),
            quote_asset: request.quote_asset.clone(),
            base_asset_qty: request.base_asset_qty,
            quote_asset_qty: request.quote_asset_qty,
            base_value: plan.base_value,
            quote_value: plan.quote_value,
            total_value: plan.total_value,
            target_each: plan.target_each,
            action: plan.action,
            trade_amount: plan.amount,
            trade_value: plan.diff_value,
            trade_over_limit: plan.over_limit,
            trade_limit_usd: plan.max_trade_value_usd,
            dev_mode: request.simulate,
            trade_result: outcome,
            timestamp: timestamp(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RedeemResponse {
    pub success: bool,
    pub dev_mode: bool,
    pub result: RedeemOutcome,
    pub timestamp: String,
}

impl RedeemResponse {
    pub fn new(result: RedeemOutcome) -> Self {
        let dev_mode = matches!(result, RedeemOutcome::Simulated { .. });
        let success = match &result {
            RedeemOutcome::Simulated { .. } => true,
            RedeemOutcome::Redeemed(RedeemReceipt { success, .. }) => *success,
        };
        Self {
            success,
            dev_mode,
            result,
            timestamp: timestamp(),
        }
    }
}

/// Error body shared by every endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, details: Option<serde_json::Value>) -> Self {
        Self {
            success: false,
            error: error.into(),
            details,
            timestamp: timestamp(),
        }
    }
}
