//! Retrying wrappers around exchange queries.
//!
//! REST queries during cancel verification must survive transient venue
//! errors, so they loop with bounded exponential backoff until they succeed
//! or the caller gives up.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::{ExchangeError, OrderQuery, OrderQueryParams};
use crate::orders::Order;

const INITIAL_RETRY_DELAY: Duration = Duration::from_secs(1);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(10);

/// Query a single order, retrying until the venue answers or `token` fires.
///
/// Backoff doubles from 1s up to a 10s cap. Cancellation is reported as
/// `ExchangeError::Cancelled`.
pub async fn query_order_until_successful(
    token: &CancellationToken,
    service: &dyn OrderQuery,
    params: OrderQueryParams,
) -> Result<Order, ExchangeError> {
    let mut delay = INITIAL_RETRY_DELAY;
    let mut attempt: u32 = 0;

    loop {
        if token.is_cancelled() {
            return Err(ExchangeError::Cancelled);
        }

        attempt += 1;
        match service.query_order(params.clone()).await {
            Ok(order) => return Ok(order),
            Err(err) => {
                warn!(
                    order_id = params.order_id,
                    symbol = %params.symbol,
                    attempt,
                    delay = ?delay,
                    error = %err,
                    "order query failed, backing off"
                );
            }
        }

        tokio::select! {
            _ = token.cancelled() => return Err(ExchangeError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }
        delay = delay.saturating_mul(2).min(MAX_RETRY_DELAY);
    }
}
