//! Integration tests for the HTTP API
//!
//! Drives the full router against the in-memory mock exchange:
//! - price lookups and their error bodies
//! - rebalance planning, skipping, simulation and execution
//! - dev-mode resolution from body and environment
//! - test redemptions

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use earn_rebalancer::{
    api::{create_router, AppState},
    config::Environment,
    exchange::{GatewayCall, GatewayOperation, MockExchange},
    rebalance::{EngineSettings, RebalanceEngine},
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

// ============================================================================
// Test Fixtures
// ============================================================================

async fn create_test_exchange() -> Arc<MockExchange> {
    Arc::new(MockExchange::with_demo_markets().await)
}

fn create_test_app(exchange: Arc<MockExchange>, limit: Decimal, environment: Environment) -> Router {
    let settings = EngineSettings {
        settlement_delay: Duration::ZERO,
        redeem_buffer: dec!(1.10),
        serialize_pairs: true,
    };
    let engine = Arc::new(RebalanceEngine::new(exchange, settings));
    create_router(Arc::new(AppState::new(engine, limit, environment)))
}

async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

async fn post_raw(app: Router, uri: &str, body: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

async fn post(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    post_raw(app, uri, &body.to_string()).await
}

async fn side_effects(exchange: &MockExchange) -> Vec<GatewayCall> {
    exchange
        .calls()
        .await
        .into_iter()
        .filter(GatewayCall::is_side_effecting)
        .collect()
}

// ============================================================================
// Root & Price
// ============================================================================

#[tokio::test]
async fn test_root_endpoint() {
    let app = create_test_app(create_test_exchange().await, dec!(100), Environment::Production);

    let (status, body) = get(app, "/").await;

    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(body).unwrap().contains("running"));
}

#[tokio::test]
async fn test_price_endpoint() {
    let app = create_test_app(create_test_exchange().await, dec!(100), Environment::Production);

    let (status, body) = get(app, "/price/btcusdt").await;
    let json: Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["symbol"], "BTCUSDT");
    assert_eq!(json["price"], 50000.0);
    assert!(json["timestamp"].is_string());
}

#[tokio::test]
async fn test_price_unknown_symbol_is_server_error() {
    let app = create_test_app(create_test_exchange().await, dec!(100), Environment::Production);

    let (status, body) = get(app, "/price/FOOBAR").await;
    let json: Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["success"], false);
    assert!(json["error"].as_str().unwrap().contains("FOOBAR"));
}

// ============================================================================
// Rebalance
// ============================================================================

#[tokio::test]
async fn test_rebalance_over_limit_is_skipped() {
    let exchange = create_test_exchange().await;
    let app = create_test_app(exchange.clone(), dec!(100), Environment::Production);

    let (status, json) = post(
        app,
        "/rebalance",
        json!({
            "base_asset": "BTC",
            "quote_asset": "USDT",
            "base_asset_qty": 1,
            "quote_asset_qty": 40000
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["symbol"], "BTCUSDT");
    assert_eq!(json["action"], "SELL_BASE_BUY_QUOTE");
    assert_eq!(json["base_value"], 50000.0);
    assert_eq!(json["target_each"], 45000.0);
    assert_eq!(json["trade_amount"], 0.1);
    assert_eq!(json["trade_value"], 5000.0);
    assert_eq!(json["trade_over_limit"], true);
    assert_eq!(json["trade_limit_usd"], 100.0);
    assert_eq!(json["dev_mode"], false);
    assert_eq!(
        json["trade_result"],
        json!({"status": "skipped", "reason": "over_limit"})
    );
    assert!(side_effects(&exchange).await.is_empty());
}

#[tokio::test]
async fn test_rebalance_balanced() {
    let app = create_test_app(create_test_exchange().await, dec!(100), Environment::Production);

    let (status, json) = post(
        app,
        "/rebalance",
        json!({
            "base_asset": "BTC",
            "quote_asset": "USDT",
            "base_asset_qty": 0.5,
            "quote_asset_qty": 25000
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["action"], "BALANCED");
    assert_eq!(json["trade_amount"], 0.0);
    assert_eq!(json["trade_result"]["reason"], "balanced");
}

#[tokio::test]
async fn test_rebalance_dev_flag_simulates() {
    let exchange = create_test_exchange().await;
    let app = create_test_app(exchange.clone(), dec!(1000), Environment::Production);

    let (status, json) = post(
        app,
        "/rebalance",
        json!({
            "base_asset": "BTC",
            "quote_asset": "USDT",
            "base_asset_qty": 0,
            "quote_asset_qty": 1000,
            "dev": true
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["action"], "BUY_BASE_SELL_QUOTE");
    assert_eq!(json["trade_amount"], 0.01);
    assert_eq!(json["dev_mode"], true);
    assert_eq!(json["trade_result"]["status"], "simulated");
    assert_eq!(json["trade_result"]["intent"]["redeem_amount"], 550.0);
    assert!(side_effects(&exchange).await.is_empty());
}

#[tokio::test]
async fn test_development_environment_forces_simulation() {
    let exchange = create_test_exchange().await;
    let app = create_test_app(exchange.clone(), dec!(1000), Environment::Development);

    let (status, json) = post(
        app,
        "/rebalance",
        json!({
            "base_asset": "BTC",
            "quote_asset": "USDT",
            "base_asset_qty": 0,
            "quote_asset_qty": 1000,
            "dev": false
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["dev_mode"], true);
    assert_eq!(json["trade_result"]["status"], "simulated");
    assert!(side_effects(&exchange).await.is_empty());
}

#[tokio::test]
async fn test_rebalance_executes_buy() {
    let exchange = create_test_exchange().await;
    let app = create_test_app(exchange.clone(), dec!(1000), Environment::Production);

    let (status, json) = post(
        app,
        "/rebalance",
        json!({
            "base_asset": "BTC",
            "quote_asset": "USDT",
            "base_asset_qty": 0,
            "quote_asset_qty": 1000
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["trade_result"]["status"], "executed");
    assert_eq!(json["trade_result"]["redemption"]["asset"], "USDT");
    assert_eq!(json["trade_result"]["fill"]["side"], "BUY");
    assert_eq!(exchange.earn_balance("USDT").await, dec!(49450));
    assert_eq!(
        side_effects(&exchange).await,
        vec![
            GatewayCall::Redeem {
                asset: "USDT".to_string(),
                amount: dec!(550)
            },
            GatewayCall::MarketBuy {
                symbol: "BTCUSDT".to_string(),
                quote_amount: dec!(500)
            },
        ]
    );
}

#[tokio::test]
async fn test_rebalance_order_failure_reports_redeemed_funds() {
    let exchange = create_test_exchange().await;
    exchange.fail_on(GatewayOperation::MarketSell).await;
    let app = create_test_app(exchange.clone(), dec!(10000), Environment::Production);

    let (status, json) = post(
        app,
        "/rebalance",
        json!({
            "base_asset": "BTC",
            "quote_asset": "USDT",
            "base_asset_qty": 1,
            "quote_asset_qty": 40000
        }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["success"], false);
    assert_eq!(json["details"]["stage"], "order");
    assert_eq!(json["details"]["funds_redeemed"], true);
    assert_eq!(exchange.spot_balance("BTC").await, dec!(0.1));
}

#[tokio::test]
async fn test_rebalance_missing_fields() {
    let app = create_test_app(create_test_exchange().await, dec!(100), Environment::Production);

    let (status, json) = post(
        app,
        "/rebalance",
        json!({"base_asset": "BTC", "base_asset_qty": 1, "quote_asset_qty": 1}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Missing required parameters.");
}

#[tokio::test]
async fn test_rebalance_malformed_json() {
    let app = create_test_app(create_test_exchange().await, dec!(100), Environment::Production);

    let (status, json) = post_raw(app, "/rebalance", "{not json").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_rebalance_invalid_pair() {
    let app = create_test_app(create_test_exchange().await, dec!(100), Environment::Production);

    let (status, json) = post(
        app,
        "/rebalance",
        json!({
            "base_asset": "FOO",
            "quote_asset": "BAR",
            "base_asset_qty": 1,
            "quote_asset_qty": 1
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Invalid trading pair: FOOBAR");
}

#[tokio::test]
async fn test_rebalance_oversized_quantity_is_rejected() {
    let exchange = create_test_exchange().await;
    let app = create_test_app(exchange.clone(), dec!(100), Environment::Production);

    let (status, json) = post(
        app,
        "/rebalance",
        json!({
            "base_asset": "BTC",
            "quote_asset": "USDT",
            "base_asset_qty": "79228162514264337593543950335",
            "quote_asset_qty": 1
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert!(side_effects(&exchange).await.is_empty());
}

#[tokio::test]
async fn test_rebalance_negative_quantity() {
    let app = create_test_app(create_test_exchange().await, dec!(100), Environment::Production);

    let (status, _) = post(
        app,
        "/rebalance",
        json!({
            "base_asset": "BTC",
            "quote_asset": "USDT",
            "base_asset_qty": -1,
            "quote_asset_qty": 1
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Test Redemption
// ============================================================================

#[tokio::test]
async fn test_redeem_dev_mode() {
    let exchange = create_test_exchange().await;
    let app = create_test_app(exchange.clone(), dec!(100), Environment::Production);

    let (status, json) = post(
        app,
        "/rebalance/test-redeem",
        json!({"asset": "USDT", "amount": 10, "dev": true}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["dev_mode"], true);
    assert_eq!(json["result"]["status"], "simulated");
    assert!(exchange.calls().await.is_empty());
}

#[tokio::test]
async fn test_redeem_executes() {
    let exchange = create_test_exchange().await;
    let app = create_test_app(exchange.clone(), dec!(100), Environment::Production);

    let (status, json) = post(
        app,
        "/rebalance/test-redeem",
        json!({"asset": "eth", "amount": 2.5}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["result"]["status"], "redeemed");
    assert_eq!(json["result"]["asset"], "ETH");
    assert_eq!(exchange.earn_balance("ETH").await, dec!(7.5));
}

#[tokio::test]
async fn test_redeem_missing_fields() {
    let app = create_test_app(create_test_exchange().await, dec!(100), Environment::Production);

    let (status, _) = post(app, "/rebalance/test-redeem", json!({"asset": "USDT"})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}
