//! Update ordering oracle.
//!
//! Decides whether an incoming order update carries newer information than
//! the copy already stored, so that out-of-order stream deliveries can be
//! dropped. The status lattice is consulted first; only when it cannot
//! decide do the update timestamps break the tie. The test is single-sided:
//! when neither rule can decide, the incoming update is treated as stale.

use super::types::{Order, OrderStatus};

/// Returns true iff `a` should replace `b`.
///
/// The argument ordering matters: this function is not symmetric, and two
/// identical non-terminal orders compare as not-newer, which is what the
/// staleness check in the book relies on.
pub fn is_newer_update(a: &Order, b: &Order) -> bool {
    match a.status {
        // canceled / rejected is a final state
        OrderStatus::Canceled | OrderStatus::Rejected => {
            if matches!(
                b.status,
                OrderStatus::New | OrderStatus::PartiallyFilled
            ) {
                return true;
            }
        }

        OrderStatus::PartiallyFilled => match b.status {
            OrderStatus::New => return true,
            OrderStatus::PartiallyFilled => {
                // equal executed quantities are undecidable here
                if a.executed_quantity > b.executed_quantity {
                    return true;
                }
            }
            _ => {}
        },

        OrderStatus::Filled => {
            if matches!(
                b.status,
                OrderStatus::Filled | OrderStatus::PartiallyFilled | OrderStatus::New
            ) {
                return true;
            }
        }

        _ => {}
    }

    is_newer_update_time(a, b)
}

/// Timestamp tie-break: `a` wins only when it carries a timestamp that is
/// strictly later than `b`'s, or when `a` is stamped and `b` is not.
pub fn is_newer_update_time(a: &Order, b: &Order) -> bool {
    match (a.update_time, b.update_time) {
        (Some(au), Some(bu)) => au > bu,
        (Some(_), None) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn order(status: OrderStatus, executed: Decimal, update_ms: Option<i64>) -> Order {
        Order {
            order_id: 1,
            symbol: "BTCUSDT".to_string(),
            status,
            executed_quantity: executed,
            update_time: update_ms.map(|ms| Utc.timestamp_millis_opt(ms).unwrap()),
            ..Order::default()
        }
    }

    #[test]
    fn test_terminal_beats_live() {
        let canceled = order(OrderStatus::Canceled, dec!(0), None);
        let rejected = order(OrderStatus::Rejected, dec!(0), None);
        let new = order(OrderStatus::New, dec!(0), Some(100));
        let partial = order(OrderStatus::PartiallyFilled, dec!(1), Some(100));

        assert!(is_newer_update(&canceled, &new));
        assert!(is_newer_update(&canceled, &partial));
        assert!(is_newer_update(&rejected, &new));
        assert!(is_newer_update(&rejected, &partial));

        // and not the other way around without a newer timestamp
        assert!(!is_newer_update(&new, &canceled));
        assert!(!is_newer_update(&partial, &canceled));
    }

    #[test]
    fn test_partial_fill_progression() {
        let new = order(OrderStatus::New, dec!(0), None);
        let partial_1 = order(OrderStatus::PartiallyFilled, dec!(1), None);
        let partial_3 = order(OrderStatus::PartiallyFilled, dec!(3), None);

        assert!(is_newer_update(&partial_1, &new));
        assert!(is_newer_update(&partial_3, &partial_1));
        assert!(!is_newer_update(&partial_1, &partial_3));
        // equal executed quantity is undecidable, incoming is dropped
        assert!(!is_newer_update(&partial_1, &partial_1.clone()));
    }

    #[test]
    fn test_filled_beats_everything_live() {
        let filled = order(OrderStatus::Filled, dec!(5), None);
        assert!(is_newer_update(&filled, &order(OrderStatus::New, dec!(0), Some(99))));
        assert!(is_newer_update(
            &filled,
            &order(OrderStatus::PartiallyFilled, dec!(3), Some(99))
        ));
    }

    #[test]
    fn test_time_tie_break() {
        let older = order(OrderStatus::New, dec!(0), Some(100));
        let newer = order(OrderStatus::New, dec!(0), Some(200));
        let unstamped = order(OrderStatus::New, dec!(0), None);

        assert!(is_newer_update(&newer, &older));
        assert!(!is_newer_update(&older, &newer));
        // a stamped update beats an unstamped one, never the reverse
        assert!(is_newer_update(&older, &unstamped));
        assert!(!is_newer_update(&unstamped, &older));
        assert!(!is_newer_update(&unstamped, &unstamped.clone()));
    }

    #[test]
    fn test_not_reflexive_for_stored_statuses() {
        // the book only ever stores New / PartiallyFilled, so the staleness
        // check relies on identical live orders comparing as not-newer
        for status in [OrderStatus::New, OrderStatus::PartiallyFilled] {
            for ms in [None, Some(100)] {
                let o = order(status, dec!(2), ms);
                assert!(!is_newer_update(&o, &o.clone()), "{status} {ms:?}");
            }
        }
    }

    #[test]
    fn test_no_mutual_newer_for_stored_statuses() {
        // with the timestamp dimension held fixed, an incoming update and a
        // stored live order can never both claim to be newer
        let quantities = [dec!(0), dec!(1), dec!(2)];
        let stamps = [None, Some(100)];

        for b_status in [OrderStatus::New, OrderStatus::PartiallyFilled] {
            for b_qty in quantities {
                for ms in stamps {
                    let b = order(b_status, b_qty, ms);
                    for a_status in [
                        OrderStatus::New,
                        OrderStatus::PartiallyFilled,
                        OrderStatus::Filled,
                        OrderStatus::Canceled,
                        OrderStatus::Rejected,
                    ] {
                        for a_qty in quantities {
                            let a = order(a_status, a_qty, ms);
                            assert!(
                                !(is_newer_update(&a, &b) && is_newer_update(&b, &a)),
                                "mutually newer: {a_status}/{a_qty} vs {b_status}/{b_qty} at {ms:?}"
                            );
                        }
                    }
                }
            }
        }
    }
}
