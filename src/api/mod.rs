//! HTTP surface over the rebalance engine.

mod dto;
mod error;
mod handlers;
mod router;

pub use dto::*;
pub use error::ApiError;
pub use router::{create_router, AppState};
