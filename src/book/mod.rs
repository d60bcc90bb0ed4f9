//! Client-side active order book.
//!
//! `ActiveOrderBook` mirrors the set of orders believed to be live on the
//! exchange for one symbol. Stream updates are reconciled against locally
//! registered submissions through a staleness oracle; updates that arrive
//! before their submission is confirmed are buffered and adopted when the
//! submission lands. Membership changes publish a coalesced wake-up signal
//! consumed by the cancel engine's drain waiters.
//!
//! Locking: `mu` serializes the whole update state machine (staleness check,
//! mutation, branch choice). It is released before any callback or signal
//! emission, so handlers may call back into the book without deadlocking.
//! The order maps carry their own reader/writer locks for the plain
//! accessors.

mod cancel;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde::{Serialize, Serializer};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::exchange::ExchangeError;
use crate::orders::{is_newer_update, sort_orders_by_price, Order, OrderMap, OrderStatus, SubmitOrder};
use crate::signal::Signal;
use crate::stream::OrderStream;

pub use cancel::WaitOutcome;

pub const DEFAULT_CANCEL_ORDER_WAIT_TIME: Duration = Duration::from_millis(20);
pub const DEFAULT_ORDER_CANCEL_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors surfaced by the order book itself.
#[derive(Debug, Error)]
pub enum BookError {
    #[error("cancel {book_symbol} order book with different order symbol: {order_symbol}")]
    SymbolMismatch {
        book_symbol: String,
        order_symbol: String,
    },

    #[error(transparent)]
    Exchange(#[from] ExchangeError),
}

/// How cancel requests are executed.
///
/// In `Backtest` mode the cancel engine short-circuits to a single exchange
/// call with no waits, since a simulated exchange completes synchronously.
/// The flag is injected per book rather than read from process state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    #[default]
    Live,
    Backtest,
}

type OrderCallback = Arc<dyn Fn(&Order) + Send + Sync>;

/// In-process mirror of the orders live on the exchange for one symbol.
///
/// An empty symbol makes the book symbol-agnostic: it accepts updates and
/// cancel inputs for any symbol.
pub struct ActiveOrderBook {
    symbol: String,

    orders: OrderMap,
    /// Updates whose order id has not been registered through `add` yet;
    /// the stream outran the submission confirmation.
    pending_order_updates: OrderMap,

    /// Wake-up published on membership changes the cancel engine must see.
    sig: Signal,

    /// Serializes the update state machine. Never held across an await or
    /// while invoking callbacks.
    mu: Mutex<()>,

    cancel_order_wait_time: RwLock<Duration>,
    cancel_order_timeout: RwLock<Duration>,
    mode: RwLock<ExecutionMode>,

    new_callbacks: RwLock<Vec<OrderCallback>>,
    filled_callbacks: RwLock<Vec<OrderCallback>>,
    canceled_callbacks: RwLock<Vec<OrderCallback>>,
}

impl ActiveOrderBook {
    /// Create a book for `symbol`; an empty symbol accepts any symbol.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            orders: OrderMap::new(),
            pending_order_updates: OrderMap::new(),
            sig: Signal::new(),
            mu: Mutex::new(()),
            cancel_order_wait_time: RwLock::new(DEFAULT_CANCEL_ORDER_WAIT_TIME),
            cancel_order_timeout: RwLock::new(DEFAULT_ORDER_CANCEL_TIMEOUT),
            mode: RwLock::new(ExecutionMode::default()),
            new_callbacks: RwLock::new(Vec::new()),
            filled_callbacks: RwLock::new(Vec::new()),
            canceled_callbacks: RwLock::new(Vec::new()),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Poll period between cancel reissues.
    pub fn cancel_order_wait_time(&self) -> Duration {
        *self.cancel_order_wait_time.read()
    }

    pub fn set_cancel_order_wait_time(&self, duration: Duration) {
        *self.cancel_order_wait_time.write() = duration;
    }

    /// Per-iteration drain timeout of the graceful cancel loop.
    pub fn cancel_order_timeout(&self) -> Duration {
        *self.cancel_order_timeout.read()
    }

    pub fn set_cancel_order_timeout(&self, duration: Duration) {
        *self.cancel_order_timeout.write() = duration;
    }

    pub fn execution_mode(&self) -> ExecutionMode {
        *self.mode.read()
    }

    pub fn set_execution_mode(&self, mode: ExecutionMode) {
        *self.mode.write() = mode;
    }

    /// The membership-change signal, for external drain waiters.
    pub fn signal(&self) -> &Signal {
        &self.sig
    }

    /// Register a handler fired when an order enters the book.
    pub fn on_new(&self, handler: impl Fn(&Order) + Send + Sync + 'static) {
        self.new_callbacks.write().push(Arc::new(handler));
    }

    /// Register a handler fired when an order leaves the book filled.
    pub fn on_filled(&self, handler: impl Fn(&Order) + Send + Sync + 'static) {
        self.filled_callbacks.write().push(Arc::new(handler));
    }

    /// Register a handler fired when an order leaves the book canceled.
    /// Rejections remove the order silently.
    pub fn on_canceled(&self, handler: impl Fn(&Order) + Send + Sync + 'static) {
        self.canceled_callbacks.write().push(Arc::new(handler));
    }

    fn emit_new(&self, order: &Order) {
        let callbacks = self.new_callbacks.read().clone();
        for callback in callbacks {
            callback(order);
        }
    }

    fn emit_filled(&self, order: &Order) {
        let callbacks = self.filled_callbacks.read().clone();
        for callback in callbacks {
            callback(order);
        }
    }

    fn emit_canceled(&self, order: &Order) {
        let callbacks = self.canceled_callbacks.read().clone();
        for callback in callbacks {
            callback(order);
        }
    }

    /// Register confirmed local submissions.
    ///
    /// Orders with a foreign symbol are skipped when the book is bound to a
    /// symbol.
    pub fn add(&self, orders: impl IntoIterator<Item = Order>) {
        for order in orders {
            if !self.symbol.is_empty() && order.symbol != self.symbol {
                continue;
            }
            self.add_order(order);
        }
    }

    /// Register one order, adopting any pending stream update for its id.
    fn add_order(&self, order: Order) {
        let Some(pending) = self.pending_order_updates.get(order.order_id) else {
            self.orders.add(order.clone());
            self.emit_new(&order);
            return;
        };

        debug!(order_id = order.order_id, pending_status = %pending.status, "adopting pending order update");
        self.pending_order_updates.remove(order.order_id);

        // the stream may have raced ahead of the submission; keep whichever
        // view the oracle says is newer
        if is_newer_update(&pending, &order) {
            if pending.status == OrderStatus::New {
                self.orders.add(pending.clone());
                self.emit_new(&pending);
                return;
            }

            // register the submission itself, then replay the newer stream
            // view through the state machine: a partial fill overwrites it,
            // a terminal status removes it and fires its callback
            self.orders.add(order);
            self.emit_new(&pending);
            self.update(pending);
            return;
        }

        self.orders.add(order.clone());
        self.emit_new(&order);
        if order.status != OrderStatus::New {
            self.update(order);
        }
    }

    /// Apply a stream- or REST-delivered order update.
    ///
    /// Stale updates are dropped; updates for unknown ids are buffered until
    /// the matching `add` arrives. Terminal transitions remove the order and
    /// fire the corresponding callback, then publish the signal.
    pub fn update(&self, order: Order) {
        if !self.symbol.is_empty() && order.symbol != self.symbol {
            return;
        }

        let guard = self.mu.lock();

        let previous = match self.orders.get(order.order_id) {
            Some(previous) => previous,
            None => {
                debug!(
                    order_id = order.order_id,
                    status = %order.status,
                    "order not registered yet, buffering pending update"
                );
                self.pending_order_updates.add(order);
                drop(guard);
                return;
            }
        };

        // single-sided staleness check: when ordering is undecidable the
        // incoming update loses
        if !is_newer_update(&order, &previous) {
            info!(
                order_id = order.order_id,
                update_time = ?order.update_time,
                "order update is out of date, skipping"
            );
            drop(guard);
            return;
        }

        match order.status {
            OrderStatus::Filled => {
                let removed = self.orders.remove(order.order_id);
                drop(guard);

                if removed {
                    info!(order_id = order.order_id, "{order}");
                    self.emit_filled(&order);
                }
                self.sig.emit();
            }

            OrderStatus::PartiallyFilled => {
                self.orders.update(order);
                drop(guard);
            }

            OrderStatus::New => {
                self.orders.update(order);
                drop(guard);

                self.sig.emit();
            }

            OrderStatus::Canceled | OrderStatus::Rejected => {
                debug!(order_id = order.order_id, status = %order.status, "removing terminal order");
                self.orders.remove(order.order_id);
                drop(guard);

                if order.status == OrderStatus::Canceled {
                    self.emit_canceled(&order);
                }
                self.sig.emit();
            }

            other => {
                drop(guard);
                warn!(order_id = order.order_id, status = %other, "unhandled order status");
            }
        }
    }

    /// Bind the book to a stream of order updates.
    ///
    /// Takes an `Arc` because the registered handler keeps the book alive
    /// for as long as the stream holds it. The handler copies the locally
    /// stored `tag` and `group_id` onto each incoming update so caller
    /// annotations survive venue round-trips.
    pub fn bind_stream(self: Arc<Self>, stream: &dyn OrderStream) {
        stream.on_order_update(Box::new(move |order| self.handle_order_update(order)));
    }

    fn handle_order_update(&self, mut order: Order) {
        if let Some(stored) = self.get(order.order_id) {
            order.tag = stored.tag;
            order.group_id = stored.group_id;
        }
        self.update(order);
    }

    pub fn exists(&self, order: &Order) -> bool {
        let _guard = self.mu.lock();
        self.orders.exists(order.order_id)
    }

    pub fn get(&self, order_id: u64) -> Option<Order> {
        self.orders.get(order_id)
    }

    /// Remove an order from the book, returning true iff it was present.
    /// Also evicts any pending update buffered under the same id.
    pub fn remove(&self, order: &Order) -> bool {
        let _guard = self.mu.lock();
        self.pending_order_updates.remove(order.order_id);
        self.orders.remove(order.order_id)
    }

    pub fn num_of_orders(&self) -> usize {
        self.orders.len()
    }

    /// Defensive snapshot of the live orders.
    pub fn orders(&self) -> Vec<Order> {
        self.orders.orders()
    }

    /// First live order matching the predicate.
    pub fn lookup(&self, predicate: impl Fn(&Order) -> bool) -> Option<Order> {
        self.orders.lookup(predicate)
    }

    /// Submit projections of the live orders, for persistence.
    pub fn backup(&self) -> Vec<SubmitOrder> {
        self.orders.backup()
    }

    /// Log the live orders, best priced first.
    pub fn print(&self) {
        let orders = sort_orders_by_price(self.orders.orders(), true);
        for order in &orders {
            info!("{order}");
        }
    }
}

impl Serialize for ActiveOrderBook {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.backup().serialize(serializer)
    }
}

impl std::fmt::Debug for ActiveOrderBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveOrderBook")
            .field("symbol", &self.symbol)
            .field("orders", &self.orders.len())
            .field("pending_order_updates", &self.pending_order_updates.len())
            .finish()
    }
}
