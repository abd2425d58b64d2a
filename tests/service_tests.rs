//! Tests for the order service without the TCP layer.


use std::collections::HashSet;
use std::time::Duration;

use serde_json::json;

use order_dispatch::error::DispatchError;
use order_dispatch::order::{Lookup, OrderStatus};
use order_dispatch::server::OrderService;
use test_harness::{assert_eventually, fast_pool, slow_pool};

#[tokio::test]
async fn test_menu_lists_every_dish() {
    let service = OrderService::new(&fast_pool(2)).unwrap();
    let menu = service.get_menu();

    assert_eq!(menu.len(), 6);
    for dish in ["pizza", "burger", "salad", "soup", "lasagna", "sandwich"] {
        assert!(menu.contains(&dish.to_string()), "{} missing from menu", dish);
    }
}

/// Test that an order is pending right after submission and eventually
/// becomes ready with the submitted kind and quantity.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_order_goes_from_pending_to_ready() {
    let service = OrderService::new(&slow_pool(2)).unwrap();
    let id = service.submit_order("pizza", 2).unwrap();
    assert_eq!(id.to_string(), "P001");

    match service.query_order("P001") {
        Lookup::Pending(record) => assert_eq!(record.status, OrderStatus::Pending),
        other => panic!("expected pending, got {:?}", other),
    }
    assert_eq!(service.list_pending_orders(), vec![id]);

    let svc = service.clone();
    assert_eventually(
        move || matches!(svc.query_order("P001"), Lookup::Ready(_)),
        Duration::from_secs(5),
        "P001 to become ready",
    )
    .await;

    match service.query_order("P001") {
        Lookup::Ready(record) => {
            assert_eq!(record.kind, "pizza");
            assert_eq!(record.quantity.get(), 2);
            let result = record.result.expect("ready record has a result");
            assert!(result.worker.starts_with("worker-"));
            assert!(result.completed_at >= record.submitted_at);
        }
        other => panic!("expected ready, got {:?}", other),
    }
    assert!(service.list_pending_orders().is_empty());
}

/// Test that rejected submissions do not consume an identity.
#[tokio::test]
async fn test_rejections_do_not_consume_identities() {
    let service = OrderService::new(&fast_pool(2)).unwrap();

    match service.submit_order("sushi", 1) {
        Err(DispatchError::UnknownKind { kind, menu }) => {
            assert_eq!(kind, "sushi");
            assert_eq!(menu, service.get_menu());
        }
        other => panic!("expected unknown kind, got {:?}", other),
    }
    for quantity in [0, -3] {
        assert!(matches!(
            service.submit_order("pizza", quantity),
            Err(DispatchError::InvalidQuantity(_))
        ));
    }
    for raw in [json!("two"), json!(1.5), json!(null)] {
        assert!(matches!(
            service.submit_order_value("pizza", &raw),
            Err(DispatchError::InvalidQuantity(_))
        ));
    }

    assert!(service.registry().is_empty());
    let id = service.submit_order("salad", 1).unwrap();
    assert_eq!(id.to_string(), "P001");
}

#[tokio::test]
async fn test_unknown_kind_checked_before_quantity() {
    let service = OrderService::new(&fast_pool(1)).unwrap();
    assert!(matches!(
        service.submit_order("sushi", 0),
        Err(DispatchError::UnknownKind { .. })
    ));
}

#[tokio::test]
async fn test_query_unknown_or_malformed_id_is_not_found() {
    let service = OrderService::new(&fast_pool(1)).unwrap();
    service.submit_order("soup", 1).unwrap();

    for id in ["P999", "P002", "P1", "p001", "P0001", "", "order-1"] {
        assert!(
            matches!(service.query_order(id), Lookup::NotFound),
            "{:?} should not be found",
            id
        );
    }
    assert!(!matches!(service.query_order("P001"), Lookup::NotFound));
}

/// Test that concurrent submitters all receive distinct, contiguous ids.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submissions_get_distinct_ids() {
    let service = OrderService::new(&fast_pool(4)).unwrap();

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move {
                (0..10)
                    .map(|_| service.submit_order("sandwich", 1).unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for task in tasks {
        for id in task.await.unwrap() {
            assert!(ids.insert(id), "duplicate id {}", id);
        }
    }

    let sequences: HashSet<u64> = ids.iter().map(|id| id.sequence()).collect();
    assert_eq!(sequences, (1..=80).collect::<HashSet<u64>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_await_all_orders_leaves_nothing_pending() {
    let service = OrderService::new(&fast_pool(2)).unwrap();
    for kind in ["pizza", "burger", "salad", "soup", "lasagna"] {
        service.submit_order(kind, 1).unwrap();
    }

    let drained = tokio::time::timeout(Duration::from_secs(5), service.await_all_orders())
        .await
        .expect("await_all should finish");

    assert_eq!(drained, 5);
    assert!(service.list_pending_orders().is_empty());
    assert_eq!(service.registry().ready_count(), 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shutdown_drains_and_rejects_new_orders() {
    let service = OrderService::new(&fast_pool(2)).unwrap();
    service.submit_order("pizza", 1).unwrap();
    service.submit_order("burger", 2).unwrap();
    let token = service.shutdown_token();

    let drained = tokio::time::timeout(Duration::from_secs(5), service.shutdown())
        .await
        .expect("shutdown should finish");

    assert_eq!(drained, 2);
    assert!(token.is_cancelled());
    assert!(service.is_shutting_down());
    assert_eq!(service.registry().ready_count(), 2);
    assert!(matches!(
        service.submit_order("soup", 1),
        Err(DispatchError::ShuttingDown)
    ));

    // Queries keep working after shutdown.
    assert!(matches!(service.query_order("P002"), Lookup::Ready(_)));
}

#[tokio::test]
async fn test_repeated_shutdown_is_a_no_op() {
    let service = OrderService::new(&fast_pool(1)).unwrap();
    assert_eq!(service.shutdown().await, 0);
    assert_eq!(service.shutdown().await, 0);
    assert!(service.is_shutting_down());
}

/// Test that submissions are refused as soon as shutdown starts, while the
/// drain is still waiting.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_submit_rejected_while_draining() {
    let service = OrderService::new(&slow_pool(1)).unwrap();
    service.submit_order("lasagna", 1).unwrap();

    let shutdown = {
        let service = service.clone();
        tokio::spawn(async move { service.shutdown().await })
    };

    let svc = service.clone();
    assert_eventually(
        move || svc.is_shutting_down(),
        Duration::from_secs(2),
        "shutdown to start",
    )
    .await;
    assert!(matches!(
        service.submit_order("soup", 1),
        Err(DispatchError::ShuttingDown)
    ));

    assert_eq!(shutdown.await.unwrap(), 1);
}

#[tokio::test]
async fn test_invalid_pool_config_is_rejected() {
    let result = OrderService::new(&fast_pool(0));
    assert!(matches!(result, Err(DispatchError::Config(_))));

    let result = OrderService::new(&fast_pool(1).with_time_scale(1e300));
    assert!(matches!(result, Err(DispatchError::Config(_))));
}

/// Test that submissions racing a shutdown are either accepted with the next
/// identity or refused with `shutting down`, and never leave a gap.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_submissions_racing_shutdown_leave_no_gaps() {
    for _ in 0..20 {
        let service = OrderService::new(&fast_pool(2)).unwrap();

        let submitters: Vec<_> = (0..4)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move {
                    let mut accepted = Vec::new();
                    for _ in 0..25 {
                        match service.submit_order("salad", 1) {
                            Ok(id) => accepted.push(id.sequence()),
                            Err(DispatchError::ShuttingDown) => break,
                            Err(e) => panic!("unexpected error {:?}", e),
                        }
                        tokio::task::yield_now().await;
                    }
                    accepted
                })
            })
            .collect();

        tokio::task::yield_now().await;
        service.shutdown().await;

        let mut accepted = Vec::new();
        for submitter in submitters {
            accepted.extend(submitter.await.unwrap());
        }
        accepted.sort_unstable();
        let expected: Vec<u64> = (1..=accepted.len() as u64).collect();
        assert_eq!(accepted, expected);
        assert_eq!(service.registry().len(), accepted.len());
    }
}
