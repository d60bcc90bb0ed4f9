//! Cancel engine.
//!
//! Two strategies: `fast_cancel` fires the cancel request and drops the
//! orders locally without confirmation; `graceful_cancel` loops
//! cancel → wait → verify until the targeted orders are provably gone.
//! The graceful loop tolerates cancel RPC failures, dropped stream events,
//! and partial REST visibility; caller cancellation stops the waiting, not
//! the cancel requests already in flight.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::{ActiveOrderBook, BookError, ExecutionMode};
use crate::exchange::{retry, Exchange, OrderQueryParams};
use crate::orders::{Order, OrderStatus, OrderType};

/// Result of a drain wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Everything watched is gone from the book.
    Clear,
    /// The overall timeout elapsed while orders remain.
    TimedOut,
    /// The caller's token fired.
    Cancelled,
}

impl ActiveOrderBook {
    /// Cancel without verification.
    ///
    /// Issues one cancel request and unconditionally removes the targeted
    /// orders from the local book. An RPC failure is logged, not returned;
    /// the local state is dropped either way.
    pub async fn fast_cancel(
        &self,
        ex: &dyn Exchange,
        orders: &[Order],
    ) -> Result<(), BookError> {
        let orders: Vec<Order> = if orders.is_empty() {
            self.orders()
        } else {
            self.validate_symbols(orders)?;
            orders.to_vec()
        };

        if self.execution_mode() == ExecutionMode::Backtest {
            return Ok(ex.cancel_orders(&orders).await?);
        }

        debug!(symbol = %self.symbol, count = orders.len(), "cancelling orders without wait");
        if let Err(err) = ex.cancel_orders(&orders).await {
            error!(symbol = %self.symbol, error = %err, "no-wait cancel request failed");
        }

        for order in &orders {
            self.orders.remove(order.order_id);
        }
        Ok(())
    }

    /// Cancel and keep going until the orders are provably gone.
    ///
    /// With an empty `specified` slice the whole book is drained; otherwise
    /// only the given orders are watched. Market orders in an explicit list
    /// never block the loop. Returns `Ok(())` on caller cancellation as
    /// well; callers needing strict confirmation check `num_of_orders`.
    pub async fn graceful_cancel(
        &self,
        token: &CancellationToken,
        ex: &dyn Exchange,
        specified: &[Order],
    ) -> Result<(), BookError> {
        let cancel_all = specified.is_empty();
        let mut orders: Vec<Order> = if cancel_all {
            self.orders()
        } else {
            self.validate_symbols(specified)?;
            specified.to_vec()
        };

        if self.execution_mode() == ExecutionMode::Backtest {
            return Ok(ex.cancel_orders(&orders).await?);
        }

        debug!(symbol = %self.symbol, count = orders.len(), "gracefully cancelling orders");
        let wait_time = self.cancel_order_wait_time();
        let started = std::time::Instant::now();

        loop {
            // the cancel request must still go out after the caller has
            // given up, so it is not raced against the token
            if let Err(err) = ex.cancel_orders(&orders).await {
                warn!(
                    symbol = %self.symbol,
                    count = orders.len(),
                    error = %err,
                    "cancel request failed"
                );
            }

            debug!(
                symbol = %self.symbol,
                count = orders.len(),
                wait = ?wait_time,
                "waiting for orders to be cancelled"
            );

            if cancel_all {
                match self
                    .wait_all_clear(token, wait_time, self.cancel_order_timeout())
                    .await
                {
                    WaitOutcome::Cancelled => break,
                    WaitOutcome::Clear => {
                        debug!(symbol = %self.symbol, "orders are cancelled");
                        break;
                    }
                    WaitOutcome::TimedOut => {
                        warn!(
                            symbol = %self.symbol,
                            remaining = self.num_of_orders(),
                            requested = orders.len(),
                            "orders are not cancelled yet"
                        );
                        self.print();
                    }
                }
            } else {
                let existing = self.filter_existing_orders(&orders);
                if existing.is_empty() {
                    debug!(symbol = %self.symbol, "orders are cancelled");
                    break;
                }
                if token.is_cancelled() {
                    break;
                }
            }

            // verify through the RESTful API what the stream did not confirm
            if let Some(query) = ex.order_query() {
                for slot in orders.iter_mut() {
                    let params = OrderQueryParams {
                        symbol: slot.symbol.clone(),
                        order_id: slot.order_id,
                    };
                    match retry::query_order_until_successful(token, query, params).await {
                        Ok(refreshed) => {
                            self.update(refreshed.clone());
                            *slot = refreshed;
                        }
                        Err(err) => {
                            error!(
                                order_id = slot.order_id,
                                error = %err,
                                "unable to refresh order"
                            );
                        }
                    }
                }

                if cancel_all {
                    orders = self.orders();
                } else {
                    orders.retain(|o| o.status != OrderStatus::Canceled);
                }
            } else {
                warn!(symbol = %self.symbol, "verifying active orders through the open orders api");

                let mut err_occurred = false;
                let mut left_overs: Vec<Order> = Vec::new();

                for (symbol, symbol_orders) in categorize_orders_by_symbol(&orders) {
                    let open_orders = match ex.query_open_orders(&symbol).await {
                        Ok(open_orders) => open_orders,
                        Err(err) => {
                            err_occurred = true;
                            error!(symbol = %symbol, error = %err, "can not query open orders");
                            break;
                        }
                    };

                    let open_ids: HashSet<u64> =
                        open_orders.iter().map(|o| o.order_id).collect();
                    for order in symbol_orders {
                        // not on the venue's book any more, drop it locally
                        if open_ids.contains(&order.order_id) {
                            left_overs.push(order);
                        } else {
                            self.remove(&order);
                        }
                    }
                }

                // on any error keep the previous working slice; replacing it
                // with a partial result could end the loop prematurely
                if !err_occurred {
                    orders = left_overs;
                }
            }
        }

        debug!(
            symbol = %self.symbol,
            elapsed = ?started.elapsed(),
            "graceful cancel finished"
        );
        Ok(())
    }

    /// Wait until a specific order leaves the book.
    ///
    /// Wakes on the membership signal or every `wait_time`, whichever comes
    /// first, and always re-checks after waking. The token is evaluated
    /// before the overall `timeout`, which in turn is evaluated before the
    /// cleared state, so at least one post-wait check is always made.
    pub async fn wait_clear(
        &self,
        token: &CancellationToken,
        order: &Order,
        wait_time: Duration,
        timeout: Duration,
    ) -> WaitOutcome {
        self.wait_until(token, wait_time, timeout, || {
            !self.orders.exists(order.order_id)
        })
        .await
    }

    /// Wait until the book is fully drained.
    pub async fn wait_all_clear(
        &self,
        token: &CancellationToken,
        wait_time: Duration,
        timeout: Duration,
    ) -> WaitOutcome {
        self.wait_until(token, wait_time, timeout, || self.num_of_orders() == 0)
            .await
    }

    async fn wait_until(
        &self,
        token: &CancellationToken,
        wait_time: Duration,
        timeout: Duration,
        clear: impl Fn() -> bool,
    ) -> WaitOutcome {
        if clear() {
            return WaitOutcome::Clear;
        }

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            tokio::select! {
                _ = tokio::time::sleep(wait_time) => {}
                _ = self.sig.wait() => {}
            }

            let cleared = clear();

            if token.is_cancelled() {
                return WaitOutcome::Cancelled;
            }
            if tokio::time::Instant::now() >= deadline {
                return if cleared {
                    WaitOutcome::Clear
                } else {
                    WaitOutcome::TimedOut
                };
            }
            if cleared {
                return WaitOutcome::Clear;
            }
        }
    }

    fn validate_symbols(&self, orders: &[Order]) -> Result<(), BookError> {
        if self.symbol.is_empty() {
            return Ok(());
        }
        for order in orders {
            if order.symbol != self.symbol {
                return Err(BookError::SymbolMismatch {
                    book_symbol: self.symbol.clone(),
                    order_symbol: order.symbol.clone(),
                });
            }
        }
        Ok(())
    }

    /// Subset of `orders` still present in the book.
    ///
    /// Market orders are skipped so a stray market order in the input can
    /// never block a graceful cancel.
    fn filter_existing_orders(&self, orders: &[Order]) -> Vec<Order> {
        orders
            .iter()
            .filter(|o| o.order_type != OrderType::Market)
            .filter(|o| self.exists(o))
            .cloned()
            .collect()
    }
}

fn categorize_orders_by_symbol(orders: &[Order]) -> HashMap<String, Vec<Order>> {
    let mut by_symbol: HashMap<String, Vec<Order>> = HashMap::new();
    for order in orders {
        by_symbol
            .entry(order.symbol.clone())
            .or_default()
            .push(order.clone());
    }
    by_symbol
}
