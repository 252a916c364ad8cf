//! Binance REST API client (spot + Simple Earn).

use super::error::GatewayError;
use super::traits::ExchangeGateway;
use crate::config::BinanceConfig;
use crate::exchange::types::*;
use crate::utils::round_to_precision;
use anyhow::{Context, Result};
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::{Client, Response};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use sha2::Sha256;
use tracing::{debug, info, instrument, warn};

const SPOT_BASE_URL: &str = "https://api.binance.com";
const SPOT_TESTNET_URL: &str = "https://testnet.binance.vision";

/// Binance accepts at most 8 decimals on quantities.
const MAX_QTY_DECIMALS: u32 = 8;

/// Binance API client for spot trading and flexible Earn.
pub struct BinanceClient {
    http: Client,
    api_key: String,
    secret_key: String,
    base_url: String,
    recv_window_ms: u64,
}

impl BinanceClient {
    /// Create a new Binance client from configuration.
    pub fn new(config: &BinanceConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = match (&config.base_url, config.testnet) {
            (Some(url), _) => url.trim_end_matches('/').to_string(),
            (None, true) => SPOT_TESTNET_URL.to_string(),
            (None, false) => SPOT_BASE_URL.to_string(),
        };

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            secret_key: config.secret_key.clone(),
            base_url,
            recv_window_ms: config.recv_window_ms,
        })
    }

    /// Generate HMAC-SHA256 signature for authenticated requests.
    fn sign(&self, query_string: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret_key.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(query_string.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Encode `params`, append timestamp and recvWindow, then the signature.
    fn signed_query(&self, params: &[(&str, String)]) -> String {
        let timestamp = chrono::Utc::now().timestamp_millis();
        let query_string = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .chain([
                format!("recvWindow={}", self.recv_window_ms),
                format!("timestamp={}", timestamp),
            ])
            .collect::<Vec<_>>()
            .join("&");

        let signature = self.sign(&query_string);
        format!("{}&signature={}", query_string, signature)
    }

    /// Turn a response into `T`, or into the exchange's error body.
    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(match serde_json::from_str::<BinanceErrorBody>(&body) {
                Ok(err) => GatewayError::Api {
                    status: status.as_u16(),
                    code: err.code,
                    msg: err.msg,
                },
                Err(_) => GatewayError::Api {
                    status: status.as_u16(),
                    code: 0,
                    msg: body,
                },
            });
        }

        serde_json::from_str(&body).map_err(|e| GatewayError::Decode(e.to_string()))
    }

    // ==================== Market Data (Public) ====================

    /// Get the latest price for a symbol.
    #[instrument(skip(self))]
    pub async fn get_ticker_price(&self, symbol: &str) -> Result<TickerPrice, GatewayError> {
        let url = format!("{}/api/v3/ticker/price", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("symbol", symbol)])
            .send()
            .await?;

        Self::decode(response).await
    }

    /// Get exchange information for a single symbol.
    #[instrument(skip(self))]
    pub async fn get_exchange_info(&self, symbol: &str) -> Result<ExchangeInfo, GatewayError> {
        let url = format!("{}/api/v3/exchangeInfo", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("symbol", symbol)])
            .send()
            .await?;

        Self::decode(response).await
    }

    // ==================== Simple Earn (Authenticated) ====================

    /// List flexible Earn products for an asset.
    #[instrument(skip(self))]
    pub async fn get_flexible_products(
        &self,
        asset: &str,
    ) -> Result<FlexibleProductList, GatewayError> {
        let query = self.signed_query(&[("asset", asset.to_string())]);
        let url = format!("{}/sapi/v1/simple-earn/flexible/list?{}", self.base_url, query);

        let response = self
            .http
            .get(&url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await?;

        Self::decode(response).await
    }

    /// Resolve the flexible product id that holds `asset`.
    pub async fn get_flexible_product_id(&self, asset: &str) -> Result<String, GatewayError> {
        let products = self.get_flexible_products(asset).await?;
        products
            .rows
            .into_iter()
            .find(|p| p.asset.eq_ignore_ascii_case(asset))
            .map(|p| p.product_id)
            .ok_or_else(|| GatewayError::ProductNotFound(asset.to_string()))
    }

    /// Redeem `amount` from a flexible product.
    #[instrument(skip(self))]
    pub async fn redeem_flexible_product(
        &self,
        product_id: &str,
        amount: Decimal,
    ) -> Result<FlexibleRedeemResponse, GatewayError> {
        let query = self.signed_query(&[
            ("productId", product_id.to_string()),
            ("amount", amount.normalize().to_string()),
        ]);
        let url = format!("{}/sapi/v1/simple-earn/flexible/redeem?{}", self.base_url, query);

        let response = self
            .http
            .post(&url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await?;

        Self::decode(response).await
    }

    // ==================== Orders (Authenticated) ====================

    /// Place a spot market order. Exactly one of `quantity`/`quote_order_qty`
    /// is sent, as `size_param`.
    #[instrument(skip(self))]
    async fn place_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        size_param: &str,
        size: Decimal,
    ) -> Result<OrderResponse, GatewayError> {
        let side_str = match side {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        };
        let query = self.signed_query(&[
            ("symbol", symbol.to_uppercase()),
            ("side", side_str.to_string()),
            ("type", "MARKET".to_string()),
            (size_param, size.normalize().to_string()),
            ("newOrderRespType", "RESULT".to_string()),
        ]);
        let url = format!("{}/api/v3/order?{}", self.base_url, query);

        debug!(%symbol, side = side_str, %size, size_param, "Placing spot market order");

        let response = self
            .http
            .post(&url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await?;

        Self::decode(response).await
    }
}

#[async_trait]
impl ExchangeGateway for BinanceClient {
    async fn get_price(&self, symbol: &str) -> Result<Decimal, GatewayError> {
        let ticker = self.get_ticker_price(symbol).await?;
        debug!(symbol = %ticker.symbol, price = %ticker.price, "Price fetched");
        Ok(ticker.price)
    }

    async fn get_lot_step_size(&self, symbol: &str) -> Result<Option<Decimal>, GatewayError> {
        let info = self.get_exchange_info(symbol).await?;
        Ok(info.lot_step_size(symbol))
    }

    async fn redeem_flexible(
        &self,
        asset: &str,
        amount: Decimal,
    ) -> Result<RedeemReceipt, GatewayError> {
        let amount = round_to_precision(amount, MAX_QTY_DECIMALS);
        let product_id = self.get_flexible_product_id(asset).await?;
        let response = self.redeem_flexible_product(&product_id, amount).await?;

        if response.redeem_result {
            info!(%asset, %amount, %product_id, "Redeemed from Simple Earn");
        } else {
            warn!(%asset, %amount, %product_id, "Simple Earn redemption not accepted");
        }

        Ok(RedeemReceipt {
            asset: asset.to_string(),
            product_id,
            amount,
            success: response.redeem_result,
        })
    }

    async fn market_buy(
        &self,
        symbol: &str,
        quote_amount: Decimal,
    ) -> Result<FillReport, GatewayError> {
        let quote_amount = round_to_precision(quote_amount, MAX_QTY_DECIMALS);
        let response = self
            .place_market_order(symbol, OrderSide::Buy, "quoteOrderQty", quote_amount)
            .await?;
        info!(
            %symbol,
            order_id = response.order_id,
            executed_qty = %response.executed_qty,
            quote_qty = %response.cummulative_quote_qty,
            "Market buy placed"
        );
        Ok(response.into())
    }

    async fn market_sell(
        &self,
        symbol: &str,
        base_amount: Decimal,
    ) -> Result<FillReport, GatewayError> {
        let base_amount = round_to_precision(base_amount, MAX_QTY_DECIMALS);
        let response = self
            .place_market_order(symbol, OrderSide::Sell, "quantity", base_amount)
            .await?;
        info!(
            %symbol,
            order_id = response.order_id,
            executed_qty = %response.executed_qty,
            quote_qty = %response.cummulative_quote_qty,
            "Market sell placed"
        );
        Ok(response.into())
    }
}
