use axum::{
    routing::{get, post},
    Router,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::config::{Config, Environment};
use crate::rebalance::RebalanceEngine;

/// Application state shared across handlers
pub struct AppState {
    pub engine: Arc<RebalanceEngine>,
    pub max_trade_value_usd: Decimal,
    pub environment: Environment,
}

impl AppState {
    pub fn new(engine: Arc<RebalanceEngine>, max_trade_value_usd: Decimal, environment: Environment) -> Self {
        AppState {
            engine,
            max_trade_value_usd,
            environment,
        }
    }

    pub fn from_config(engine: Arc<RebalanceEngine>, config: &Config) -> Self {
        Self::new(engine, config.rebalance.max_trade_value_usd, config.environment)
    }

    /// Caller dev flag OR'd with the deployment environment.
    pub fn dev_mode(&self, requested: Option<bool>) -> bool {
        requested.unwrap_or(false) || self.environment.is_development()
    }
}

/// Create the REST API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/price/{symbol}", get(handlers::price))
        .route("/rebalance", post(handlers::rebalance))
        .route("/rebalance/test-redeem", post(handlers::test_redeem))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
