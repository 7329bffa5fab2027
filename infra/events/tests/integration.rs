use opshub_domain::ids::ModuleId;
use opshub_domain::lease::ActivationLease;
use opshub_event_bus::*;
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

async fn drain(rx: &mut mpsc::UnboundedReceiver<String>, expected: usize) -> Vec<String> {
    let mut seen = Vec::with_capacity(expected);
    while seen.len() < expected {
        let next = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("delivery timed out")
            .expect("channel closed");
        seen.push(next);
    }
    seen
}

fn recorder(
    bus: &EventBus,
    event: &str,
    module: &str,
    priority: i32,
    tx: &mpsc::UnboundedSender<String>,
) -> Subscription {
    let tx = tx.clone();
    let name = module.to_owned();
    bus.subscribe(event, SubscribeOptions::new(module).priority(priority), move |_| {
        let tx = tx.clone();
        let name = name.clone();
        async move {
            tx.send(name)?;
            Ok(())
        }
    })
    .unwrap()
}

#[tokio::test]
async fn deliveries_start_in_priority_order() {
    let bus = EventBus::new();
    let (tx, mut rx) = mpsc::unbounded_channel();

    recorder(&bus, "sales.completed", "low", -10, &tx);
    recorder(&bus, "sales.completed", "first-default", 0, &tx);
    recorder(&bus, "sales.completed", "high", 10, &tx);
    recorder(&bus, "sales.completed", "second-default", 0, &tx);

    assert_eq!(bus.emit("sales.completed", json!({}), "pos"), 4);

    // The current-thread runtime polls spawned tasks in spawn order.
    let order = drain(&mut rx, 4).await;
    assert_eq!(order, ["high", "first-default", "second-default", "low"]);
}

#[tokio::test]
async fn emit_returns_before_handlers_finish() {
    let bus = EventBus::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
    let release = Arc::new(Mutex::new(Some(release_rx)));

    bus.subscribe("slow", SubscribeOptions::new("slow"), move |_| {
        let release = release.lock().unwrap().take();
        let tx = tx.clone();
        async move {
            if let Some(release) = release {
                release.await?;
            }
            tx.send("done".to_owned())?;
            Ok(())
        }
    })
    .unwrap();

    assert_eq!(bus.emit("slow", json!(null), "host"), 1);
    assert!(rx.try_recv().is_err());

    release_tx.send(()).unwrap();
    assert_eq!(drain(&mut rx, 1).await, ["done"]);
}

#[tokio::test]
async fn failing_and_panicking_handlers_are_isolated() {
    let bus = EventBus::new();
    let (tx, mut rx) = mpsc::unbounded_channel();

    bus.subscribe("tick", SubscribeOptions::new("broken").priority(5), |_| async {
        anyhow::bail!("handler exploded")
    })
    .unwrap();
    bus.subscribe("tick", SubscribeOptions::new("panicky").priority(4), |event| async move {
        assert!(event.payload.is_null(), "handler panicked");
        Ok(())
    })
    .unwrap();
    recorder(&bus, "tick", "healthy", 0, &tx);

    assert_eq!(bus.emit("tick", json!(1), "host"), 3);
    assert_eq!(drain(&mut rx, 1).await, ["healthy"]);

    // The bus keeps working after a panic.
    assert_eq!(bus.emit("tick", json!(2), "host"), 3);
    assert_eq!(drain(&mut rx, 1).await, ["healthy"]);
}

#[tokio::test]
async fn payload_and_source_reach_the_handler() {
    let bus = EventBus::new();
    let (tx, mut rx) = mpsc::unbounded_channel();

    bus.subscribe("sales.completed", SubscribeOptions::new("inventory"), move |event| {
        let tx = tx.clone();
        async move {
            tx.send(format!("{}:{}:{}", event.event, event.source, event.payload["sku"]))?;
            Ok(())
        }
    })
    .unwrap();

    bus.emit("sales.completed", json!({ "sku": "A-1" }), "point-of-sale");
    assert_eq!(drain(&mut rx, 1).await, [r#"sales.completed:point-of-sale:"A-1""#]);
}

#[tokio::test]
async fn unsubscribe_is_idempotent() {
    let bus = EventBus::new();
    let (tx, _rx) = mpsc::unbounded_channel();

    let subscription = recorder(&bus, "tick", "a", 0, &tx);
    assert!(subscription.is_active());
    assert_eq!(subscription.event(), "tick");

    assert!(subscription.unsubscribe());
    assert!(!subscription.unsubscribe());
    assert!(!subscription.is_active());
    assert_eq!(bus.subscriber_count("tick"), 0);
    assert_eq!(bus.emit("tick", json!(null), "host"), 0);
}

#[tokio::test]
async fn unsubscribe_module_removes_only_that_module() {
    let bus = EventBus::new();
    let (tx, mut rx) = mpsc::unbounded_channel();

    recorder(&bus, "a", "inventory", 0, &tx);
    recorder(&bus, "b", "inventory", 0, &tx);
    recorder(&bus, "a", "dashboard", 0, &tx);

    assert_eq!(bus.unsubscribe_module(&ModuleId::new("inventory")), 2);
    assert_eq!(bus.unsubscribe_module(&ModuleId::new("inventory")), 0);
    assert_eq!(bus.events(), ["a"]);

    assert_eq!(bus.emit("a", json!(null), "host"), 1);
    assert_eq!(drain(&mut rx, 1).await, ["dashboard"]);
}

#[tokio::test]
async fn revoked_lease_rejects_subscription() {
    let bus = EventBus::new();
    let lease = ActivationLease::new(ModuleId::new("late"));
    lease.revoke();

    let err = bus
        .subscribe("tick", SubscribeOptions::new("late").with_lease(lease), |_| async { Ok(()) })
        .unwrap_err();

    assert!(matches!(err, EventBusError::ModuleNotActive { .. }));
    assert_eq!(bus.subscriber_count("tick"), 0);
}

#[tokio::test]
async fn subscriptions_added_during_delivery_wait_for_the_next_emission() {
    let bus = EventBus::new();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let inner_bus = bus.clone();
    let inner_tx = tx.clone();
    bus.subscribe("tick", SubscribeOptions::new("spawner").priority(1), move |_| {
        recorder(&inner_bus, "tick", "late", 0, &inner_tx);
        let tx = inner_tx.clone();
        async move {
            tx.send("spawner".to_owned())?;
            Ok(())
        }
    })
    .unwrap();

    assert_eq!(bus.emit("tick", json!(null), "host"), 1);
    assert_eq!(drain(&mut rx, 1).await, ["spawner"]);

    assert_eq!(bus.emit("tick", json!(null), "host"), 2);
    let mut second = drain(&mut rx, 2).await;
    second.sort();
    assert_eq!(second, ["late", "spawner"]);
    drop(tx);
}

#[tokio::test]
async fn shutdown_clears_everything() {
    let bus = EventBus::new();
    let (tx, _rx) = mpsc::unbounded_channel();

    recorder(&bus, "a", "x", 0, &tx);
    recorder(&bus, "b", "y", 0, &tx);

    assert_eq!(bus.shutdown(), 2);
    assert!(bus.events().is_empty());
}
