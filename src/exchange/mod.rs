//! Exchange Abstraction Layer
//!
//! Traits the order book consumes from an exchange adapter. Adapters for
//! concrete venues implement these without the book knowing anything about
//! transport, authentication, or wire formats.

pub mod retry;

use async_trait::async_trait;
use thiserror::Error;

use crate::orders::Order;

/// Errors surfaced by exchange adapters.
#[derive(Debug, Clone, Error)]
pub enum ExchangeError {
    #[error("network error: {0}")]
    Network(String),

    #[error("order rejected: {0}")]
    OrderRejected(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    /// The caller abandoned the operation before it completed.
    #[error("operation cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

/// Parameters identifying a single order on the exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderQueryParams {
    pub symbol: String,
    pub order_id: u64,
}

/// Optional per-order query capability.
///
/// Venues that can report the authoritative state of a single order expose
/// this; the cancel engine prefers it over the open-orders fallback.
#[async_trait]
pub trait OrderQuery: Send + Sync {
    async fn query_order(&self, params: OrderQueryParams) -> Result<Order, ExchangeError>;
}

/// Minimal exchange surface the book needs for cancellation.
#[async_trait]
pub trait Exchange: Send + Sync {
    /// Request cancellation of the given orders. Fire-and-forget from the
    /// book's standpoint; completion is verified separately.
    async fn cancel_orders(&self, orders: &[Order]) -> Result<(), ExchangeError>;

    /// All orders currently open on the venue for a symbol.
    async fn query_open_orders(&self, symbol: &str) -> Result<Vec<Order>, ExchangeError>;

    /// Per-order query capability, if the venue supports one.
    fn order_query(&self) -> Option<&dyn OrderQuery> {
        None
    }
}
