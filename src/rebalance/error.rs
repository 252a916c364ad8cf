//! Rebalance error taxonomy.

use crate::exchange::GatewayError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Step of a real execution that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStage {
    /// Earn redemption failed; nothing moved.
    Redeem,
    /// Order placement failed after a successful redemption.
    Order,
}

impl fmt::Display for ExecutionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionStage::Redeem => write!(f, "redeem"),
            ExecutionStage::Order => write!(f, "order"),
        }
    }
}

#[derive(Debug, Error)]
pub enum RebalanceError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Invalid trading pair: {symbol}")]
    PriceUnavailable { symbol: String, reason: String },

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("execution failed at {stage} step: {source}")]
    ExecutionFailed {
        stage: ExecutionStage,
        #[source]
        source: GatewayError,
    },
}

impl RebalanceError {
    /// True when funds left Earn but no order followed.
    pub fn funds_redeemed(&self) -> bool {
        matches!(
            self,
            RebalanceError::ExecutionFailed {
                stage: ExecutionStage::Order,
                ..
            }
        )
    }

    /// Exchange-provided detail, when the failure came from the exchange.
    pub fn detail(&self) -> Option<String> {
        match self {
            RebalanceError::PriceUnavailable { reason, .. } => Some(reason.clone()),
            RebalanceError::Gateway(source) | RebalanceError::ExecutionFailed { source, .. } => {
                source.detail()
            }
            RebalanceError::InvalidRequest(_) => None,
        }
    }
}
