//! Errors raised by exchange gateways.

use thiserror::Error;

/// Binance error code for an unknown trading pair.
pub const INVALID_SYMBOL_CODE: i64 = -1121;

/// Failure of a single exchange call.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The exchange answered with an error body.
    #[error("exchange returned {status} (code {code}): {msg}")]
    Api { status: u16, code: i64, msg: String },

    #[error("invalid symbol: {0}")]
    InvalidSymbol(String),

    #[error("no flexible Earn product found for {0}")]
    ProductNotFound(String),

    #[error("request failed: {0}")]
    Transport(String),

    #[error("failed to decode response: {0}")]
    Decode(String),

    /// Operation disabled or forced to fail (paper trading).
    #[error("{0}")]
    Unavailable(String),
}

impl GatewayError {
    /// Detail string provided by the exchange, if any.
    pub fn detail(&self) -> Option<String> {
        match self {
            GatewayError::Api { code, msg, .. } => Some(format!("{code}: {msg}")),
            _ => None,
        }
    }

    /// Whether the exchange rejected the symbol itself.
    pub fn is_invalid_symbol(&self) -> bool {
        match self {
            GatewayError::InvalidSymbol(_) => true,
            GatewayError::Api { code, .. } => *code == INVALID_SYMBOL_CODE,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GatewayError::Decode(err.to_string())
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}
