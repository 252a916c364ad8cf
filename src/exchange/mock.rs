//! Mock exchange for paper trading and tests.
//!
//! Keeps spot and flexible Earn balances in memory, fills market orders at
//! the configured price and records every gateway call in a journal.

use super::error::GatewayError;
use super::traits::ExchangeGateway;
use super::types::*;
use crate::utils::round_down_to_lot;
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Gateway operations, used for failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayOperation {
    GetPrice,
    GetLotStepSize,
    Redeem,
    MarketBuy,
    MarketSell,
}

/// One call received by the mock, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    GetPrice { symbol: String },
    GetLotStepSize { symbol: String },
    Redeem { asset: String, amount: Decimal },
    MarketBuy { symbol: String, quote_amount: Decimal },
    MarketSell { symbol: String, base_amount: Decimal },
}

impl GatewayCall {
    /// Redemptions and orders move funds; lookups do not.
    pub fn is_side_effecting(&self) -> bool {
        matches!(
            self,
            GatewayCall::Redeem { .. } | GatewayCall::MarketBuy { .. } | GatewayCall::MarketSell { .. }
        )
    }
}

/// Simulated market for a single pair.
#[derive(Debug, Clone)]
pub struct MockMarket {
    pub base_asset: String,
    pub quote_asset: String,
    pub price: Decimal,
    pub step_size: Option<Decimal>,
}

/// Oldest journal entries are dropped past this length.
pub const MAX_JOURNAL_LEN: usize = 1_000;

/// Mock trading state.
#[derive(Debug, Default)]
pub struct MockExchangeState {
    pub markets: HashMap<String, MockMarket>,
    pub spot: HashMap<String, Decimal>,
    pub earn: HashMap<String, Decimal>,
    pub calls: VecDeque<GatewayCall>,
    pub failures: HashSet<GatewayOperation>,
    pub total_fees: Decimal,
}

impl MockExchangeState {
    fn record(&mut self, call: GatewayCall) {
        if self.calls.len() >= MAX_JOURNAL_LEN {
            self.calls.pop_front();
        }
        self.calls.push_back(call);
    }
}

/// Mock client that simulates the Binance spot + Simple Earn API.
pub struct MockExchange {
    state: RwLock<MockExchangeState>,
    order_id_counter: AtomicI64,
    /// Spot taker fee, charged on the received asset (0.1%)
    fee_rate: Decimal,
}

impl Default for MockExchange {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExchange {
    /// Create an empty mock exchange.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MockExchangeState::default()),
            order_id_counter: AtomicI64::new(1),
            fee_rate: dec!(0.001),
        }
    }

    /// Mock exchange seeded with BTCUSDT/ETHUSDT markets and Earn balances,
    /// used for `--mock` runs.
    pub async fn with_demo_markets() -> Self {
        let exchange = Self::new();
        exchange
            .add_market("BTCUSDT", "BTC", "USDT", dec!(50000), Some(dec!(0.00001)))
            .await;
        exchange
            .add_market("ETHUSDT", "ETH", "USDT", dec!(3000), Some(dec!(0.0001)))
            .await;
        exchange.deposit_earn("BTC", dec!(1)).await;
        exchange.deposit_earn("ETH", dec!(10)).await;
        exchange.deposit_earn("USDT", dec!(50000)).await;
        exchange
    }

    pub async fn add_market(
        &self,
        symbol: &str,
        base_asset: &str,
        quote_asset: &str,
        price: Decimal,
        step_size: Option<Decimal>,
    ) {
        self.state.write().await.markets.insert(
            symbol.to_uppercase(),
            MockMarket {
                base_asset: base_asset.to_uppercase(),
                quote_asset: quote_asset.to_uppercase(),
                price,
                step_size,
            },
        );
    }

    /// Update the price of an existing market.
    pub async fn set_price(&self, symbol: &str, price: Decimal) {
        if let Some(market) = self.state.write().await.markets.get_mut(&symbol.to_uppercase()) {
            market.price = price;
        }
    }

    pub async fn deposit_spot(&self, asset: &str, amount: Decimal) {
        *self
            .state
            .write()
            .await
            .spot
            .entry(asset.to_uppercase())
            .or_default() += amount;
    }

    pub async fn deposit_earn(&self, asset: &str, amount: Decimal) {
        *self
            .state
            .write()
            .await
            .earn
            .entry(asset.to_uppercase())
            .or_default() += amount;
    }

    /// Make every subsequent call of `operation` fail.
    pub async fn fail_on(&self, operation: GatewayOperation) {
        self.state.write().await.failures.insert(operation);
    }

    pub async fn spot_balance(&self, asset: &str) -> Decimal {
        self.state
            .read()
            .await
            .spot
            .get(&asset.to_uppercase())
            .copied()
            .unwrap_or_default()
    }

    pub async fn earn_balance(&self, asset: &str) -> Decimal {
        self.state
            .read()
            .await
            .earn
            .get(&asset.to_uppercase())
            .copied()
            .unwrap_or_default()
    }

    /// Journal of the most recent calls, oldest first.
    pub async fn calls(&self) -> Vec<GatewayCall> {
        self.state.read().await.calls.iter().cloned().collect()
    }

    pub async fn total_fees(&self) -> Decimal {
        self.state.read().await.total_fees
    }

    fn next_order_id(&self) -> i64 {
        self.order_id_counter.fetch_add(1, Ordering::SeqCst)
    }

    fn check_failure(
        state: &MockExchangeState,
        operation: GatewayOperation,
    ) -> Result<(), GatewayError> {
        if state.failures.contains(&operation) {
            return Err(GatewayError::Unavailable(format!(
                "mock failure injected for {operation:?}"
            )));
        }
        Ok(())
    }

    fn market<'a>(state: &'a MockExchangeState, symbol: &str) -> Result<&'a MockMarket, GatewayError> {
        state
            .markets
            .get(&symbol.to_uppercase())
            .ok_or_else(|| GatewayError::InvalidSymbol(symbol.to_string()))
    }

    fn debit(
        balances: &mut HashMap<String, Decimal>,
        asset: &str,
        amount: Decimal,
    ) -> Result<(), GatewayError> {
        let balance = balances.entry(asset.to_string()).or_default();
        if *balance < amount {
            return Err(GatewayError::Api {
                status: 400,
                code: -2010,
                msg: format!(
                    "Account has insufficient balance for requested action. ({asset}: have {balance}, need {amount})"
                ),
            });
        }
        *balance -= amount;
        Ok(())
    }

    fn fill(
        &self,
        symbol: &str,
        side: OrderSide,
        executed_qty: Decimal,
        quote_qty: Decimal,
    ) -> FillReport {
        FillReport {
            order_id: self.next_order_id(),
            symbol: symbol.to_uppercase(),
            side,
            status: OrderStatus::Filled,
            executed_qty,
            cumulative_quote_qty: quote_qty,
            transact_time: Utc::now().timestamp_millis(),
        }
    }
}

#[async_trait]
impl ExchangeGateway for MockExchange {
    async fn get_price(&self, symbol: &str) -> Result<Decimal, GatewayError> {
        let mut state = self.state.write().await;
        state.record(GatewayCall::GetPrice {
            symbol: symbol.to_string(),
        });
        Self::check_failure(&state, GatewayOperation::GetPrice)?;

        Ok(Self::market(&state, symbol)?.price)
    }

    async fn get_lot_step_size(&self, symbol: &str) -> Result<Option<Decimal>, GatewayError> {
        let mut state = self.state.write().await;
        state.record(GatewayCall::GetLotStepSize {
            symbol: symbol.to_string(),
        });
        Self::check_failure(&state, GatewayOperation::GetLotStepSize)?;

        Ok(Self::market(&state, symbol)?.step_size)
    }

    async fn redeem_flexible(
        &self,
        asset: &str,
        amount: Decimal,
    ) -> Result<RedeemReceipt, GatewayError> {
        let mut state = self.state.write().await;
        state.record(GatewayCall::Redeem {
            asset: asset.to_string(),
            amount,
        });
        Self::check_failure(&state, GatewayOperation::Redeem)?;

        let asset = asset.to_uppercase();
        if !state.earn.contains_key(&asset) {
            return Err(GatewayError::ProductNotFound(asset));
        }
        Self::debit(&mut state.earn, &asset, amount)?;
        *state.spot.entry(asset.clone()).or_default() += amount;

        info!(%asset, %amount, "Mock Earn redemption");

        Ok(RedeemReceipt {
            product_id: format!("{asset}001"),
            asset,
            amount,
            success: true,
        })
    }

    async fn market_buy(
        &self,
        symbol: &str,
        quote_amount: Decimal,
    ) -> Result<FillReport, GatewayError> {
        let mut state = self.state.write().await;
        state.record(GatewayCall::MarketBuy {
            symbol: symbol.to_string(),
            quote_amount,
        });
        Self::check_failure(&state, GatewayOperation::MarketBuy)?;

        let market = Self::market(&state, symbol)?.clone();
        let mut quantity = quote_amount / market.price;
        if let Some(step) = market.step_size.filter(|s| *s > Decimal::ZERO) {
            quantity = round_down_to_lot(quantity, step);
        }
        let spent = quantity * market.price;
        let fee = quantity * self.fee_rate;

        Self::debit(&mut state.spot, &market.quote_asset, spent)?;
        *state.spot.entry(market.base_asset.clone()).or_default() += quantity - fee;
        state.total_fees += fee * market.price;

        debug!(%symbol, %quantity, %spent, %fee, "Mock market buy executed");
        Ok(self.fill(symbol, OrderSide::Buy, quantity, spent))
    }

    async fn market_sell(
        &self,
        symbol: &str,
        base_amount: Decimal,
    ) -> Result<FillReport, GatewayError> {
        let mut state = self.state.write().await;
        state.record(GatewayCall::MarketSell {
            symbol: symbol.to_string(),
            base_amount,
        });
        Self::check_failure(&state, GatewayOperation::MarketSell)?;

        let market = Self::market(&state, symbol)?.clone();
        let proceeds = base_amount * market.price;
        let fee = proceeds * self.fee_rate;

        Self::debit(&mut state.spot, &market.base_asset, base_amount)?;
        *state.spot.entry(market.quote_asset.clone()).or_default() += proceeds - fee;
        state.total_fees += fee;

        debug!(%symbol, %base_amount, %proceeds, %fee, "Mock market sell executed");
        Ok(self.fill(symbol, OrderSide::Sell, base_amount, proceeds))
    }
}
