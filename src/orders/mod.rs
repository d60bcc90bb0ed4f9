//! Order domain: types, concurrent storage, and update ordering.

mod map;
mod ordering;
mod types;

pub use map::OrderMap;
pub use ordering::{is_newer_update, is_newer_update_time};
pub use types::{sort_orders_by_price, Order, OrderStatus, OrderType, SubmitOrder, TimeInForce};
