use waiter_core::{sort_summary, Cycle, DeliveryFailure, Order, OrderId, OrderStatus, RESETTABLE};

#[test]
fn test_ready_order_creation() {
    let order = Order::ready(OrderId::new(), vec!["echo".to_string(), "hi".to_string()]);
    assert_eq!(order.status, OrderStatus::Ready);
    assert_eq!(order.arguments, vec!["echo", "hi"]);
    assert!(order.start.is_none());
    assert!(order.end.is_none());
    assert!(order.waiter.is_none());
    assert!(order.error.is_none());
}

#[test]
fn test_order_id_new() {
    let id1 = OrderId::new();
    let id2 = OrderId::new();
    assert_ne!(id1, id2);
}

#[test]
fn test_redelivery_after_failure_clears_error() {
    let mut order = Order::ready(OrderId::new(), vec!["x".into()]);
    order.status = OrderStatus::Running;
    order.start = Some(1.0);
    order.complete(Err(DeliveryFailure::new("nope")), "w1", 2.0).unwrap();
    assert_eq!(order.status, OrderStatus::Error);
    assert_eq!(order.error.as_deref(), Some("nope"));

    // reset then claimed again by another waiter
    order.status = OrderStatus::Running;
    order.complete(Ok(()), "w2", 3.0).unwrap();
    assert_eq!(order.status, OrderStatus::Done);
    assert_eq!(order.waiter.as_deref(), Some("w2"));
    assert!(order.error.is_none());
    assert!(order.complete(Ok(()), "w3", 4.0).is_err());
}

#[test]
fn test_resettable_excludes_done_and_ready() {
    assert!(!RESETTABLE.contains(&OrderStatus::Done));
    assert!(!RESETTABLE.contains(&OrderStatus::Ready));
}

#[test]
fn test_summary_sorts_by_count_then_label() {
    let got = sort_summary(vec![(OrderStatus::Ready, 3), (OrderStatus::Done, 5), (OrderStatus::Error, 2)]);
    assert_eq!(got, vec![(OrderStatus::Done, 5), (OrderStatus::Ready, 3), (OrderStatus::Error, 2)]);
}

#[test]
fn test_cycle_processed_flag() {
    assert!(Cycle::Processed { id: OrderId::new(), status: OrderStatus::Done }.processed());
    assert!(!Cycle::Idle.processed());
}
