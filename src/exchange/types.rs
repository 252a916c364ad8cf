//! Type definitions for Binance spot and Simple Earn API responses.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Latest price for a symbol (`GET /api/v3/ticker/price`).
#[derive(Debug, Clone, Deserialize)]
pub struct TickerPrice {
    pub symbol: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
}

/// Spot exchange information (`GET /api/v3/exchangeInfo`).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeInfo {
    pub symbols: Vec<SpotSymbolInfo>,
}

impl ExchangeInfo {
    /// Lot step size for `symbol`, if the exchange publishes one.
    pub fn lot_step_size(&self, symbol: &str) -> Option<Decimal> {
        self.symbols
            .iter()
            .find(|s| s.symbol.eq_ignore_ascii_case(symbol))
            .and_then(SpotSymbolInfo::lot_step_size)
    }
}

/// Spot symbol information from exchange info.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotSymbolInfo {
    pub symbol: String,
    pub status: String,
    pub base_asset: String,
    pub quote_asset: String,
    #[serde(default)]
    pub filters: Vec<SymbolFilter>,
}

impl SpotSymbolInfo {
    pub fn lot_step_size(&self) -> Option<Decimal> {
        self.filters.iter().find_map(|f| match f {
            SymbolFilter::LotSize { step_size, .. } => Some(*step_size),
            _ => None,
        })
    }
}

/// Trading rule attached to a symbol. Only `LOT_SIZE` is interpreted.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "filterType")]
pub enum SymbolFilter {
    #[serde(rename = "LOT_SIZE", rename_all = "camelCase")]
    LotSize {
        #[serde(with = "rust_decimal::serde::str")]
        min_qty: Decimal,
        #[serde(with = "rust_decimal::serde::str")]
        max_qty: Decimal,
        #[serde(with = "rust_decimal::serde::str")]
        step_size: Decimal,
    },
    #[serde(other)]
    Other,
}

/// Page of flexible Simple Earn products (`GET /sapi/v1/simple-earn/flexible/list`).
#[derive(Debug, Clone, Deserialize)]
pub struct FlexibleProductList {
    #[serde(default)]
    pub rows: Vec<FlexibleProduct>,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlexibleProduct {
    pub asset: String,
    pub product_id: String,
    #[serde(default)]
    pub can_redeem: Option<bool>,
}

/// Raw redemption answer (`POST /sapi/v1/simple-earn/flexible/redeem`).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlexibleRedeemResponse {
    pub redeem_result: bool,
    #[serde(default)]
    pub redeem_id: Option<i64>,
}

/// Outcome of a flexible Earn redemption, as seen by the rebalance engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RedeemReceipt {
    pub asset: String,
    pub product_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub success: bool,
}

/// Order side (buy or sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Limit,
    Market,
}

/// Order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Canceled,
    PendingCancel,
    Rejected,
    Expired,
    ExpiredInMatch,
}

/// Spot order response (`POST /api/v3/order`).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub symbol: String,
    pub order_id: i64,
    pub client_order_id: String,
    pub transact_time: i64,
    #[serde(with = "rust_decimal::serde::str")]
    pub orig_qty: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub executed_qty: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub cummulative_quote_qty: Decimal,
    pub status: OrderStatus,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub side: OrderSide,
}

/// Filled market order, reduced to what a rebalance reports back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FillReport {
    pub order_id: i64,
    pub symbol: String,
    pub side: OrderSide,
    pub status: OrderStatus,
    #[serde(with = "rust_decimal::serde::float")]
    pub executed_qty: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub cumulative_quote_qty: Decimal,
    pub transact_time: i64,
}

impl FillReport {
    /// Volume-weighted fill price, zero when nothing executed.
    pub fn average_price(&self) -> Decimal {
        crate::utils::safe_div(self.cumulative_quote_qty, self.executed_qty)
    }
}

impl From<OrderResponse> for FillReport {
    fn from(response: OrderResponse) -> Self {
        Self {
            order_id: response.order_id,
            symbol: response.symbol,
            side: response.side,
            status: response.status,
            executed_qty: response.executed_qty,
            cumulative_quote_qty: response.cummulative_quote_qty,
            transact_time: response.transact_time,
        }
    }
}

/// Error body returned by Binance on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct BinanceErrorBody {
    pub code: i64,
    pub msg: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_exchange_info_lot_step_size() {
        let raw = r#"{
            "symbols": [{
                "symbol": "BTCUSDT",
                "status": "TRADING",
                "baseAsset": "BTC",
                "quoteAsset": "USDT",
                "filters": [
                    {"filterType": "PRICE_FILTER", "minPrice": "0.01", "maxPrice": "1000000.00", "tickSize": "0.01"},
                    {"filterType": "LOT_SIZE", "minQty": "0.00001000", "maxQty": "9000.00000000", "stepSize": "0.00001000"}
                ]
            }]
        }"#;

        let info: ExchangeInfo = serde_json::from_str(raw).unwrap();
        assert_eq!(info.lot_step_size("BTCUSDT"), Some(dec!(0.00001)));
        assert_eq!(info.lot_step_size("btcusdt"), Some(dec!(0.00001)));
        assert_eq!(info.lot_step_size("ETHUSDT"), None);
    }

    #[test]
    fn test_order_response_into_fill_report() {
        let raw = r#"{
            "symbol": "BTCUSDT",
            "orderId": 28,
            "orderListId": -1,
            "clientOrderId": "6gCrw2kRUAF9CvJDGP16IP",
            "transactTime": 1507725176595,
            "price": "0.00000000",
            "origQty": "0.10000000",
            "executedQty": "0.10000000",
            "cummulativeQuoteQty": "5000.00000000",
            "status": "FILLED",
            "timeInForce": "GTC",
            "type": "MARKET",
            "side": "SELL"
        }"#;

        let response: OrderResponse = serde_json::from_str(raw).unwrap();
        let fill = FillReport::from(response);

        assert_eq!(fill.status, OrderStatus::Filled);
        assert_eq!(fill.side, OrderSide::Sell);
        assert_eq!(fill.executed_qty, dec!(0.1));
        assert_eq!(fill.average_price(), dec!(50000));
    }
}
