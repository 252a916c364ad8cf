use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::dto::*;
use super::{ApiError, AppState};

/// GET /
pub async fn root() -> &'static str {
    info!("Root route accessed");
    "🚀 Earn rebalancer is running!"
}

/// GET /price/{symbol}
pub async fn price(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Result<Json<PriceResponse>, ApiError> {
    let quote = state.engine.quote(&symbol).await.map_err(|e| {
        error!(%symbol, error = %e, "Price lookup failed");
        let api = ApiError::internal(e.to_string());
        match e.detail() {
            Some(detail) => api.with_details(Value::String(detail)),
            None => api,
        }
    })?;

    info!(symbol = %quote.symbol, price = %quote.price, "Price fetched");
    Ok(Json(PriceResponse {
        symbol: quote.symbol,
        price: quote.price,
        timestamp: timestamp(),
    }))
}

/// POST /rebalance
pub async fn rebalance(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RebalanceBody>, JsonRejection>,
) -> Result<Json<RebalanceResponse>, ApiError> {
    let Json(body) = payload?;
    let dev_mode = state.dev_mode(body.dev);
    let environment = if dev_mode { "DEV" } else { "PROD" };
    info!(environment, "Rebalance requested");

    let request = body
        .into_request(dev_mode, state.max_trade_value_usd)
        .ok_or_else(ApiError::missing_parameters)?;

    let report = state.engine.run(&request).await.map_err(|e| {
        if e.funds_redeemed() {
            error!(pair = %request.pair_key(), error = %e, "Rebalance left redeemed funds in spot");
        } else {
            warn!(pair = %request.pair_key(), error = %e, "Rebalance failed");
        }
        ApiError::from(e)
    })?;

    Ok(Json(RebalanceResponse::from_report(&request, report)))
}

/// POST /rebalance/test-redeem
pub async fn test_redeem(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RedeemBody>, JsonRejection>,
) -> Result<Json<RedeemResponse>, ApiError> {
    let Json(body) = payload?;
    let dev_mode = state.dev_mode(body.dev);

    let (Some(asset), Some(amount)) = (body.asset, body.amount) else {
        return Err(ApiError::bad_request(
            "Missing required parameters. Please provide asset and amount.",
        ));
    };

    let outcome = state.engine.redeem(&asset, amount, dev_mode).await.map_err(|e| {
        error!(%asset, %amount, error = %e, "Test redemption failed");
        ApiError::from(e)
    })?;

    Ok(Json(RedeemResponse::new(outcome)))
}
