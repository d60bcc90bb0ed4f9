//! Order lifecycle through the public API: stream binding, reconciliation,
//! callbacks, and the backup projection.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use rust_decimal_macros::dec;

use activebook::stream::OrderUpdateDispatcher;
use activebook::{ActiveOrderBook, Order, OrderStatus, SubmitOrder};

fn order(order_id: u64, status: OrderStatus, update_ms: i64) -> Order {
    Order {
        order_id,
        symbol: "ETHUSDT".to_string(),
        status,
        quantity: dec!(2),
        price: dec!(1800),
        update_time: Some(Utc.timestamp_millis_opt(update_ms).unwrap()),
        ..Order::default()
    }
}

#[test]
fn test_stream_driven_lifecycle() {
    let book = Arc::new(ActiveOrderBook::new("ETHUSDT"));
    let dispatcher = OrderUpdateDispatcher::new();
    book.clone().bind_stream(&dispatcher);

    let events: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

    let log = events.clone();
    book.on_new(move |o| log.lock().push(format!("new#{}", o.order_id)));
    let log = events.clone();
    book.on_filled(move |o| log.lock().push(format!("filled#{}", o.order_id)));
    let log = events.clone();
    book.on_canceled(move |o| log.lock().push(format!("canceled#{}", o.order_id)));

    // two confirmed submissions, one tagged by the caller
    let mut tagged = order(1, OrderStatus::New, 10);
    tagged.tag = Some("scalper".to_string());
    tagged.group_id = 9;
    book.add([tagged, order(2, OrderStatus::New, 10)]);
    assert_eq!(book.num_of_orders(), 2);

    // a partial fill comes back without the local annotations
    let mut partial = order(1, OrderStatus::PartiallyFilled, 20);
    partial.executed_quantity = dec!(1);
    dispatcher.emit_order_update(partial);

    let stored = book.get(1).unwrap();
    assert_eq!(stored.executed_quantity, dec!(1));
    assert_eq!(stored.tag.as_deref(), Some("scalper"));
    assert_eq!(stored.group_id, 9);

    // a stale replay of the original ack must not clobber the fill
    dispatcher.emit_order_update(order(1, OrderStatus::New, 5));
    assert_eq!(book.get(1).unwrap().executed_quantity, dec!(1));

    // one order fills, the other is canceled
    let mut filled = order(1, OrderStatus::Filled, 30);
    filled.executed_quantity = dec!(2);
    dispatcher.emit_order_update(filled);
    dispatcher.emit_order_update(order(2, OrderStatus::Canceled, 30));

    assert_eq!(book.num_of_orders(), 0);
    assert_eq!(
        *events.lock(),
        vec!["new#1", "new#2", "filled#1", "canceled#2"]
    );
}

#[test]
fn test_update_outrunning_add_is_reconciled() {
    let book = Arc::new(ActiveOrderBook::new("ETHUSDT"));
    let dispatcher = OrderUpdateDispatcher::new();
    book.clone().bind_stream(&dispatcher);

    // the venue acks and partially fills before the submission call returns
    let mut early = order(3, OrderStatus::PartiallyFilled, 50);
    early.executed_quantity = dec!(0.5);
    dispatcher.emit_order_update(early);
    assert_eq!(book.num_of_orders(), 0);

    book.add([order(3, OrderStatus::New, 40)]);

    let stored = book.get(3).unwrap();
    assert_eq!(stored.status, OrderStatus::PartiallyFilled);
    assert_eq!(stored.executed_quantity, dec!(0.5));
}

#[test]
fn test_backup_round_trips_through_json() {
    let book = ActiveOrderBook::new("ETHUSDT");
    let mut tagged = order(4, OrderStatus::New, 10);
    tagged.tag = Some("grid".to_string());
    book.add([tagged, order(5, OrderStatus::New, 10)]);

    let json = serde_json::to_string(&book).unwrap();
    let restored: Vec<SubmitOrder> = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.len(), 2);
    assert!(restored.iter().all(|s| s.symbol == "ETHUSDT"));
    assert!(restored
        .iter()
        .any(|s| s.tag.as_deref() == Some("grid")));
}
