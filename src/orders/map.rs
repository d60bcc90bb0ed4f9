//! Concurrent order storage.
//!
//! `OrderMap` is a thread-safe mapping from the exchange-assigned order id
//! to the latest known `Order` value. Readers proceed concurrently; writers
//! are serialized by the inner lock. All snapshots are defensive copies, so
//! callers can iterate without holding any lock.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::types::{Order, SubmitOrder};

/// Thread-safe `order_id -> Order` mapping.
#[derive(Debug, Default)]
pub struct OrderMap {
    orders: RwLock<HashMap<u64, Order>>,
}

impl OrderMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite an order.
    pub fn add(&self, order: Order) {
        let mut orders = self.orders.write();
        orders.insert(order.order_id, order);
    }

    /// Overwrite an order only if it is already present.
    pub fn update(&self, order: Order) {
        let mut orders = self.orders.write();
        if let Some(slot) = orders.get_mut(&order.order_id) {
            *slot = order;
        }
    }

    /// Remove an order, returning true iff it was present.
    pub fn remove(&self, order_id: u64) -> bool {
        let mut orders = self.orders.write();
        orders.remove(&order_id).is_some()
    }

    pub fn get(&self, order_id: u64) -> Option<Order> {
        let orders = self.orders.read();
        orders.get(&order_id).cloned()
    }

    pub fn exists(&self, order_id: u64) -> bool {
        let orders = self.orders.read();
        orders.contains_key(&order_id)
    }

    pub fn len(&self) -> usize {
        let orders = self.orders.read();
        orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all orders.
    pub fn orders(&self) -> Vec<Order> {
        let orders = self.orders.read();
        orders.values().cloned().collect()
    }

    /// Snapshot of the submit projections, for persistence.
    pub fn backup(&self) -> Vec<SubmitOrder> {
        let orders = self.orders.read();
        orders.values().map(Order::to_submit_order).collect()
    }

    /// First order matching the predicate, if any.
    pub fn lookup(&self, predicate: impl Fn(&Order) -> bool) -> Option<Order> {
        let orders = self.orders.read();
        orders.values().find(|o| predicate(o)).cloned()
    }
}
