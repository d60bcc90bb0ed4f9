//! Order update stream binding.
//!
//! The book consumes order updates from any source that can register a
//! handler. Concrete adapters (WebSocket clients, replay readers) either
//! implement `OrderStream` directly or embed an `OrderUpdateDispatcher` and
//! forward decoded updates into it.

use parking_lot::RwLock;

use crate::orders::Order;

/// Handler invoked once per delivered order update.
///
/// A stream delivers one update at a time per handler and never re-enters a
/// handler from within itself.
pub type OrderUpdateHandler = Box<dyn Fn(Order) + Send + Sync>;

/// A source of order updates.
pub trait OrderStream {
    /// Register a handler for order updates. All registered handlers receive
    /// every update.
    fn on_order_update(&self, handler: OrderUpdateHandler);
}

/// Fan-out helper for stream implementations.
///
/// Holds the registered handlers and replays every emitted update to each of
/// them in registration order.
#[derive(Default)]
pub struct OrderUpdateDispatcher {
    handlers: RwLock<Vec<OrderUpdateHandler>>,
}

impl OrderUpdateDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver one update to every registered handler.
    pub fn emit_order_update(&self, order: Order) {
        let handlers = self.handlers.read();
        for handler in handlers.iter() {
            handler(order.clone());
        }
    }
}

impl OrderStream for OrderUpdateDispatcher {
    fn on_order_update(&self, handler: OrderUpdateHandler) {
        self.handlers.write().push(handler);
    }
}

impl std::fmt::Debug for OrderUpdateDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderUpdateDispatcher")
            .field("handlers", &self.handlers.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_dispatch_reaches_all_handlers() {
        let dispatcher = OrderUpdateDispatcher::new();
        let seen = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let seen = seen.clone();
            dispatcher.on_order_update(Box::new(move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
            }));
        }

        dispatcher.emit_order_update(Order::default());
        dispatcher.emit_order_update(Order::default());
        assert_eq!(seen.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn test_dispatch_without_handlers_is_a_no_op() {
        let dispatcher = OrderUpdateDispatcher::new();
        dispatcher.emit_order_update(Order::default());
    }
}
