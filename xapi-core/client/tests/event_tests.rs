//! 事件订阅测试

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use common::{failure, session, success, ScriptedTransport};
use xapi_client::models::{EventOperation, VmRecord};
use xapi_client::{ErrorCode, LegacySubscription, Subscription, SubscriptionState, Value, XapiError};

fn vm_event(id: i64, operation: &str) -> Value {
    Value::structure([
        ("id", Value::Int(id)),
        ("timestamp", Value::from("20240301T08:00:00Z")),
        ("class", Value::from("VM")),
        ("operation", Value::from(operation)),
        ("ref", Value::from("OpaqueRef:r")),
        ("obj_uuid", Value::from("vm-uuid")),
        (
            "snapshot",
            Value::structure([("uuid", Value::from("vm-uuid")), ("name_label", Value::from("web"))]),
        ),
    ])
}

fn batch(token: &str, events: Vec<Value>) -> Value {
    Value::structure([
        ("token", Value::from(token)),
        ("valid_ref_counts", Value::structure([("VM", Value::from("3"))])),
        ("events", Value::Array(events)),
    ])
}

#[tokio::test]
async fn test_event_loop_with_lost_events() {
    let polls = AtomicUsize::new(0);
    let transport = ScriptedTransport::new(move |call| match call.method.as_str() {
        "session.login_with_password" => Ok(success("OpaqueRef:S1")),
        "event.from" => match polls.fetch_add(1, Ordering::SeqCst) {
            0 => Ok(success(batch("t1", vec![vm_event(1, "mod")]))),
            1 => Ok(failure(&["EVENTS_LOST"])),
            _ => Ok(success(batch("t2", vec![]))),
        },
        "VM.get_all_records" | "SR.get_all_records" => Ok(success(Value::structure([(
            "OpaqueRef:x",
            Value::structure([("uuid", Value::from("x"))]),
        )]))),
        _ => Ok(failure(&["UNEXPECTED"])),
    });
    let session = session("https://h/", transport.clone());
    session.login().await.unwrap();

    let mut subscription =
        Subscription::new(session.clone(), ["VM", "SR"]).with_timeout(Duration::from_secs(30));
    assert_eq!(subscription.state(), SubscriptionState::Idle);

    let first = subscription.next_batch().await.unwrap();
    assert_eq!(first.token, "t1");
    assert_eq!(first.valid_ref_counts.get("VM"), Some(&3));
    assert_eq!(first.events.len(), 1);
    let event = &first.events[0];
    assert_eq!(event.class, "VM");
    assert_eq!(event.operation, EventOperation::Mod);
    assert_eq!(event.reference, "OpaqueRef:r");
    assert!(event.timestamp.is_some());
    let snapshot: VmRecord = event.snapshot_as().unwrap().unwrap();
    assert_eq!(snapshot.name_label, "web");
    assert_eq!(subscription.state(), SubscriptionState::Live);
    assert_eq!(subscription.token(), "t1");

    let err = subscription.next_batch().await.unwrap_err();
    assert!(err.is_code(&ErrorCode::EventsLost));
    assert_eq!(subscription.state(), SubscriptionState::LostEvents);

    // 未重新同步前不再发起轮询
    let err = subscription.next_batch().await.unwrap_err();
    assert!(err.is_code(&ErrorCode::EventsLost));
    assert_eq!(transport.count("event.from"), 2);

    let snapshot = subscription.resync().await.unwrap();
    assert_eq!(subscription.state(), SubscriptionState::Resynchronizing);
    assert_eq!(subscription.token(), "");
    assert!(snapshot.contains_key("VM"));
    assert!(snapshot.contains_key("SR"));

    let keepalive = subscription.next_batch().await.unwrap();
    assert!(keepalive.is_empty());
    assert_eq!(subscription.state(), SubscriptionState::Live);
    assert_eq!(subscription.token(), "t2");

    let polls: Vec<_> = transport
        .calls()
        .into_iter()
        .filter(|c| c.method == "event.from")
        .collect();
    let classes = Value::Array(vec![Value::from("VM"), Value::from("SR")]);
    assert_eq!(
        polls[0].params,
        vec![
            Value::from("OpaqueRef:S1"),
            classes.clone(),
            Value::from(""),
            Value::from(30.0),
        ]
    );
    assert_eq!(polls[1].param_str(2), Some("t1"));
    assert_eq!(polls[2].param_str(2), Some(""));
    assert!(polls[0].timeout.unwrap() > Duration::from_secs(30));
}

#[tokio::test]
async fn test_delete_event_has_no_snapshot() {
    let transport = ScriptedTransport::sequence(vec![
        success("OpaqueRef:S1"),
        success(batch("t1", vec![vm_event(9, "del")])),
    ]);
    let session = session("https://h/", transport);
    session.login().await.unwrap();

    let mut subscription = Subscription::new(session, ["VM"]);
    let batch = subscription.next_batch().await.unwrap();
    assert_eq!(batch.events[0].operation, EventOperation::Del);
    assert!(batch.events[0].snapshot.is_none());
}

#[tokio::test]
async fn test_missing_token_is_decode_error() {
    let transport = ScriptedTransport::sequence(vec![
        success("OpaqueRef:S1"),
        success(Value::structure([("events", Value::Array(vec![]))])),
    ]);
    let session = session("https://h/", transport);
    session.login().await.unwrap();

    let mut subscription = Subscription::new(session, ["VM"]).with_token("t0");
    let err = subscription.next_batch().await.unwrap_err();
    assert!(matches!(err, XapiError::Decode { .. }));
    assert_eq!(subscription.token(), "t0");
    assert_ne!(subscription.state(), SubscriptionState::LostEvents);
}

#[tokio::test(start_paused = true)]
async fn test_close_aborts_long_poll() {
    let transport = ScriptedTransport::new(|call| match call.method.as_str() {
        "session.login_with_password" => Ok(success("OpaqueRef:S1")),
        _ => Ok(success(batch("t1", vec![]))),
    });
    transport.delay("event.from", Duration::from_secs(30));
    let session = session("https://h/", transport);
    session.login().await.unwrap();

    let mut subscription = Subscription::new(session, ["*"]);
    let closer = subscription.closer();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        closer.close();
    });

    let err = subscription.next_batch().await.unwrap_err();
    assert!(matches!(err, XapiError::SubscriptionClosed));
    assert_eq!(subscription.state(), SubscriptionState::Closed);
    assert!(matches!(
        subscription.next_batch().await.unwrap_err(),
        XapiError::SubscriptionClosed
    ));
}

#[tokio::test]
async fn test_inject_token_ordering() {
    let transport = ScriptedTransport::new(|call| match call.method.as_str() {
        "session.login_with_password" => Ok(success("OpaqueRef:S1")),
        "event.inject" => Ok(success("00000000000000000005,00000000000000000000")),
        "event.from" => Ok(success(batch("00000000000000000007,00000000000000000000", vec![]))),
        _ => Ok(failure(&["UNEXPECTED"])),
    });
    let session = session("https://h/", transport);
    session.login().await.unwrap();

    let injected = session.event().inject("VM", "OpaqueRef:r").await.unwrap();
    let mut subscription = Subscription::new(session, ["VM"]);
    assert!(!subscription.has_reached(&injected));
    subscription.next_batch().await.unwrap();
    assert!(subscription.has_reached(&injected));
}

#[tokio::test]
async fn test_legacy_register_next() {
    let nexts = AtomicUsize::new(0);
    let transport = ScriptedTransport::new(move |call| match call.method.as_str() {
        "session.login_with_password" => Ok(success("OpaqueRef:S1")),
        "event.register" | "event.unregister" => Ok(success("")),
        "event.next" => match nexts.fetch_add(1, Ordering::SeqCst) {
            0 => Ok(success(Value::Array(vec![vm_event(1, "add")]))),
            1 => Ok(failure(&["EVENTS_LOST"])),
            _ => Ok(success(Value::Array(vec![]))),
        },
        "VM.get_all_records" => Ok(success(Value::structure::<&str, _>([]))),
        _ => Ok(failure(&["UNEXPECTED"])),
    });
    let session = session("https://h/", transport.clone());
    session.login().await.unwrap();

    let mut legacy = LegacySubscription::new(session, ["VM"]);
    assert!(legacy.next().await.is_err());

    legacy.register().await.unwrap();
    let events = legacy.next().await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].operation, EventOperation::Add);

    let err = legacy.next().await.unwrap_err();
    assert!(err.is_code(&ErrorCode::EventsLost));
    assert_eq!(legacy.state(), SubscriptionState::LostEvents);

    legacy.resync().await.unwrap();
    assert_eq!(legacy.state(), SubscriptionState::Resynchronizing);
    assert!(legacy.next().await.unwrap().is_empty());

    legacy.close().await;
    assert_eq!(legacy.state(), SubscriptionState::Closed);
    assert_eq!(transport.count("event.register"), 2);
    assert_eq!(transport.count("event.unregister"), 2);

    let register = transport
        .calls()
        .into_iter()
        .find(|c| c.method == "event.register")
        .unwrap();
    assert_eq!(register.params[1], Value::Array(vec![Value::from("VM")]));
}
