//! Core order types.
//!
//! `Order` is the exchange-side view of a submission: it carries the
//! server-assigned `order_id`, the lifecycle `status`, and the execution
//! progress reported by the venue. `SubmitOrder` is the caller-side
//! projection used for backups and re-submission.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::OrderSide;

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderType {
    #[default]
    Limit,
    Market,
    StopLimit,
    StopMarket,
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderType::Limit => write!(f, "LIMIT"),
            OrderType::Market => write!(f, "MARKET"),
            OrderType::StopLimit => write!(f, "STOP_LIMIT"),
            OrderType::StopMarket => write!(f, "STOP_MARKET"),
        }
    }
}

/// Time-in-force carried on the submit projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TimeInForce {
    #[default]
    Gtc,
    Ioc,
    Fok,
}

impl std::fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeInForce::Gtc => write!(f, "GTC"),
            TimeInForce::Ioc => write!(f, "IOC"),
            TimeInForce::Fok => write!(f, "FOK"),
        }
    }
}

/// Order lifecycle status.
///
/// The lattice used for staleness decisions:
///
/// ```text
/// New ──► PartiallyFilled ──► Filled (terminal)
///   └───────────────────────► Canceled / Rejected (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Canceled,
    Rejected,
    /// Delivered by some venues. The book logs and ignores it.
    Expired,
}

impl OrderStatus {
    /// Returns true for statuses with no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Canceled | OrderStatus::Rejected
        )
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::New => write!(f, "NEW"),
            OrderStatus::PartiallyFilled => write!(f, "PARTIALLY_FILLED"),
            OrderStatus::Filled => write!(f, "FILLED"),
            OrderStatus::Canceled => write!(f, "CANCELED"),
            OrderStatus::Rejected => write!(f, "REJECTED"),
            OrderStatus::Expired => write!(f, "EXPIRED"),
        }
    }
}

/// Caller-side order projection.
///
/// This is what `backup()` emits: enough to re-submit the order on restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitOrder {
    pub symbol: String,
    pub side: OrderSide,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub price: Decimal,
    pub time_in_force: TimeInForce,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub group_id: u32,
}

/// Exchange-side order record, treated as a value.
///
/// `tag` and `group_id` are opaque caller annotations; the book preserves
/// them across stream updates. `update_time` may be absent when a venue does
/// not stamp its updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: u64,
    pub symbol: String,
    pub side: OrderSide,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub status: OrderStatus,
    pub quantity: Decimal,
    pub price: Decimal,
    pub executed_quantity: Decimal,
    pub time_in_force: TimeInForce,
    pub tag: Option<String>,
    pub group_id: u32,
    pub created_at: Option<DateTime<Utc>>,
    pub update_time: Option<DateTime<Utc>>,
}

impl Order {
    /// Project the caller-side submission view.
    pub fn to_submit_order(&self) -> SubmitOrder {
        SubmitOrder {
            symbol: self.symbol.clone(),
            side: self.side,
            order_type: self.order_type,
            quantity: self.quantity,
            price: self.price,
            time_in_force: self.time_in_force,
            tag: self.tag.clone(),
            group_id: self.group_id,
        }
    }
}

impl Default for Order {
    fn default() -> Self {
        Self {
            order_id: 0,
            symbol: String::new(),
            side: OrderSide::Buy,
            order_type: OrderType::Limit,
            status: OrderStatus::New,
            quantity: Decimal::ZERO,
            price: Decimal::ZERO,
            executed_quantity: Decimal::ZERO,
            time_in_force: TimeInForce::Gtc,
            tag: None,
            group_id: 0,
            created_at: None,
            update_time: None,
        }
    }
}

impl std::fmt::Display for Order {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "order #{} {} {} {} {}/{} @ {} {}",
            self.order_id,
            self.symbol,
            self.side,
            self.order_type,
            self.executed_quantity,
            self.quantity,
            self.price,
            self.status,
        )
    }
}

/// Sort a snapshot by price, descending when `descending` is set.
pub fn sort_orders_by_price(mut orders: Vec<Order>, descending: bool) -> Vec<Order> {
    orders.sort_by(|a, b| {
        if descending {
            b.price.cmp(&a.price)
        } else {
            a.price.cmp(&b.price)
        }
    });
    orders
}
