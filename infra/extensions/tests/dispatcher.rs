use opshub_domain::ids::ModuleId;
use opshub_domain::lease::ActivationLease;
use opshub_domain::session::{Role, Session};
use opshub_extensions::*;
use serde_json::{Value, json};
use std::sync::Arc;

fn constant(point: &str, module: &str, value: Value) -> ActionRegistration {
    ActionRegistration::new(point, module, move |_: &Value| Ok(value.clone()))
}

#[test]
fn invoke_runs_by_priority_then_registration_order() {
    let dispatcher = Dispatcher::new();
    dispatcher.add_action(constant("sales.totals", "a", json!("a")).priority(-5)).unwrap();
    dispatcher.add_action(constant("sales.totals", "b", json!("b"))).unwrap();
    dispatcher.add_action(constant("sales.totals", "c", json!("c")).priority(10)).unwrap();
    dispatcher.add_action(constant("sales.totals", "d", json!("d"))).unwrap();

    assert_eq!(
        dispatcher.invoke_values("sales.totals", &Value::Null),
        [json!("c"), json!("b"), json!("d"), json!("a")]
    );

    let order: Vec<_> = dispatcher
        .list_actions("sales.totals")
        .into_iter()
        .map(|info| info.module.to_string())
        .collect();
    assert_eq!(order, ["c", "b", "d", "a"]);
}

#[test]
fn handlers_receive_the_payload() {
    let dispatcher = Dispatcher::new();
    dispatcher
        .add_action(ActionRegistration::new("sales.tax", "tax", |payload: &Value| {
            let amount = payload["amount"].as_i64().unwrap_or_default();
            Ok(json!(amount / 10))
        }))
        .unwrap();

    assert_eq!(dispatcher.invoke("sales.tax", &json!({ "amount": 250 })), [Some(json!(25))]);
}

#[test]
fn failing_and_panicking_handlers_yield_none() {
    let dispatcher = Dispatcher::new();
    dispatcher.add_action(constant("dashboard.widgets", "first", json!(1)).priority(3)).unwrap();
    dispatcher
        .add_action(
            ActionRegistration::new("dashboard.widgets", "broken", |_: &Value| {
                anyhow::bail!("widget unavailable")
            })
            .priority(2),
        )
        .unwrap();
    dispatcher
        .add_action(
            ActionRegistration::new("dashboard.widgets", "panicky", |payload: &Value| {
                assert!(payload.is_string(), "widget panicked");
                Ok(Value::Null)
            })
            .priority(1),
        )
        .unwrap();
    dispatcher.add_action(constant("dashboard.widgets", "last", json!(4))).unwrap();

    assert_eq!(
        dispatcher.invoke("dashboard.widgets", &Value::Null),
        [Some(json!(1)), None, None, Some(json!(4))]
    );
}

#[test]
fn permission_predicates_see_the_current_session() {
    let dispatcher = Dispatcher::new();
    dispatcher
        .add_action(constant("reports.export", "reports", json!("csv")).requires_role(Role::Manager))
        .unwrap();
    dispatcher.add_action(constant("reports.export", "open", json!("txt"))).unwrap();

    assert_eq!(dispatcher.invoke("reports.export", &Value::Null), [None, Some(json!("txt"))]);

    dispatcher.set_session_source(Arc::new(Session::with_role(Role::Admin)));
    assert_eq!(
        dispatcher.invoke("reports.export", &Value::Null),
        [Some(json!("csv")), Some(json!("txt"))]
    );

    dispatcher.set_session_source(Arc::new(Session::with_role(Role::Staff)));
    assert_eq!(dispatcher.invoke_values("reports.export", &Value::Null), [json!("txt")]);
}

#[test]
fn unknown_point_yields_nothing() {
    let dispatcher = Dispatcher::new();
    assert!(dispatcher.invoke("nobody.home", &Value::Null).is_empty());
}

#[test]
fn actions_added_during_invoke_run_next_time() {
    let dispatcher = Dispatcher::new();
    let inner = dispatcher.clone();
    dispatcher
        .add_action(ActionRegistration::new("menu.items", "spawner", move |_: &Value| {
            inner.add_action(constant("menu.items", "late", json!("late")))?;
            Ok(json!("spawner"))
        }))
        .unwrap();

    assert_eq!(dispatcher.invoke_values("menu.items", &Value::Null), [json!("spawner")]);
    assert_eq!(
        dispatcher.invoke_values("menu.items", &Value::Null),
        [json!("spawner"), json!("late")]
    );
}

#[test]
fn handlers_may_invoke_other_points() {
    let dispatcher = Dispatcher::new();
    dispatcher.add_action(constant("price.base", "catalog", json!(100))).unwrap();

    let inner = dispatcher.clone();
    dispatcher
        .add_action(ActionRegistration::new("price.final", "pricing", move |_: &Value| {
            let base: i64 =
                inner.invoke_values("price.base", &Value::Null).iter().filter_map(Value::as_i64).sum();
            Ok(json!(base * 2))
        }))
        .unwrap();

    assert_eq!(dispatcher.invoke_values("price.final", &Value::Null), [json!(200)]);
}

#[test]
fn remove_module_drops_all_of_its_actions() {
    let dispatcher = Dispatcher::new();
    dispatcher.add_action(constant("a.one", "inventory", json!(1))).unwrap();
    dispatcher.add_action(constant("a.two", "inventory", json!(2))).unwrap();
    dispatcher.add_action(constant("a.one", "dashboard", json!(3))).unwrap();

    assert_eq!(dispatcher.remove_module(&ModuleId::new("inventory")), 2);
    assert_eq!(dispatcher.points(), ["a.one"]);
    assert_eq!(dispatcher.action_count(), 1);
    assert_eq!(dispatcher.clear(), 1);
}

#[test]
fn registration_is_validated() {
    let dispatcher = Dispatcher::new();
    let err = dispatcher.add_action(constant("widgets", "x", Value::Null)).unwrap_err();
    assert!(matches!(err, ExtensionError::InvalidPointName { .. }));

    let lease = ActivationLease::new(ModuleId::new("x"));
    lease.revoke();
    let err = dispatcher
        .add_action(constant("dashboard.widgets", "x", Value::Null).with_lease(lease))
        .unwrap_err();
    assert!(matches!(err, ExtensionError::ModuleNotActive { .. }));
    assert_eq!(dispatcher.action_count(), 0);
}
