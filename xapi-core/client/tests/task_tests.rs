//! 异步任务测试：轮询、失败、取消与截止时间

mod common;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use common::{failure, session, success, ScriptedTransport};
use xapi_client::classes::{TaskRef, VdiRef};
use xapi_client::models::TaskStatusType;
use tokio::time::Instant;
use xapi_client::{ErrorCode, TaskHandle, Value, XapiError};

fn task_record(status: &str, progress: f64, result: &str, error_info: &[&str]) -> Value {
    Value::structure([
        ("uuid", Value::from("task-uuid")),
        ("status", Value::from(status)),
        ("progress", Value::from(progress)),
        ("result", Value::from(result)),
        (
            "error_info",
            Value::Array(error_info.iter().map(|e| Value::from(*e)).collect()),
        ),
    ])
}

#[tokio::test(start_paused = true)]
async fn test_async_clone_polls_until_success() {
    let polls = AtomicUsize::new(0);
    let transport = ScriptedTransport::new(move |call| match call.method.as_str() {
        "session.login_with_password" => Ok(success("OpaqueRef:S1")),
        "Async.VDI.clone" => Ok(success("OpaqueRef:T1")),
        "task.get_record" => {
            let record = match polls.fetch_add(1, Ordering::SeqCst) {
                0 => task_record("pending", 0.0, "", &[]),
                1 => task_record("pending", 0.5, "", &[]),
                _ => task_record("success", 1.0, "<value>OpaqueRef:V2</value>", &[]),
            };
            Ok(success(record))
        }
        _ => Ok(failure(&["UNEXPECTED"])),
    });
    let session = session("https://h/", transport.clone());
    session.login().await.unwrap();

    let vdi = VdiRef::from("OpaqueRef:V1");
    let task = session.vdi().async_clone(&vdi, &HashMap::new()).await.unwrap();
    assert_eq!(task.task_ref(), &TaskRef::from("OpaqueRef:T1"));

    let clone = task.wait().await.unwrap();
    assert_eq!(clone, VdiRef::from("OpaqueRef:V2"));

    let calls = transport.calls();
    let submit = calls.iter().find(|c| c.method == "Async.VDI.clone").unwrap();
    assert_eq!(
        submit.params,
        vec![
            Value::from("OpaqueRef:S1"),
            Value::from("OpaqueRef:V1"),
            Value::Struct(Default::default()),
        ]
    );
    assert_eq!(transport.count("task.get_record"), 3);
    assert_eq!(transport.count("task.destroy"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_plain_string_result() {
    let transport = ScriptedTransport::new(|call| match call.method.as_str() {
        "session.login_with_password" => Ok(success("OpaqueRef:S1")),
        "Async.VM.clone" => Ok(success("OpaqueRef:T1")),
        "task.get_record" => Ok(success(task_record("success", 1.0, "OpaqueRef:VM2", &[]))),
        _ => Ok(failure(&["UNEXPECTED"])),
    });
    let session = session("https://h/", transport);
    session.login().await.unwrap();

    let vm = "OpaqueRef:VM1".into();
    let task = session.vm().async_clone(&vm, "copy").await.unwrap();
    assert_eq!(task.wait().await.unwrap().as_str(), "OpaqueRef:VM2");
}

#[tokio::test(start_paused = true)]
async fn test_task_failure_carries_error_info() {
    let transport = ScriptedTransport::new(|call| match call.method.as_str() {
        "session.login_with_password" => Ok(success("OpaqueRef:S1")),
        "Async.VM.start" => Ok(success("OpaqueRef:T1")),
        "task.get_record" => Ok(success(task_record(
            "failure",
            1.0,
            "",
            &["VM_BAD_POWER_STATE", "OpaqueRef:VM1", "halted", "running"],
        ))),
        _ => Ok(failure(&["UNEXPECTED"])),
    });
    let session = session("https://h/", transport);
    session.login().await.unwrap();

    let task = session
        .vm()
        .async_start(&"OpaqueRef:VM1".into(), false, false)
        .await
        .unwrap();
    match task.wait().await.unwrap_err() {
        XapiError::TaskFailed(e) => {
            assert_eq!(e.code, ErrorCode::Other("VM_BAD_POWER_STATE".to_string()));
            assert_eq!(e.params, vec!["OpaqueRef:VM1", "halted", "running"]);
        }
        other => panic!("期望任务失败，实际为 {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_task() {
    let transport = ScriptedTransport::new(|call| match call.method.as_str() {
        "session.login_with_password" => Ok(success("OpaqueRef:S1")),
        "Async.SR.scan" => Ok(success("OpaqueRef:T1")),
        "task.get_record" => Ok(success(task_record("cancelled", 0.3, "", &[]))),
        _ => Ok(failure(&["UNEXPECTED"])),
    });
    let session = session("https://h/", transport);
    session.login().await.unwrap();

    let task = session.sr().async_scan(&"OpaqueRef:SR1".into()).await.unwrap();
    assert!(matches!(task.wait().await.unwrap_err(), XapiError::TaskCancelled(_)));
}

#[tokio::test(start_paused = true)]
async fn test_failure_with_task_cancelled_code() {
    let transport = ScriptedTransport::new(|call| match call.method.as_str() {
        "session.login_with_password" => Ok(success("OpaqueRef:S1")),
        "Async.SR.scan" => Ok(success("OpaqueRef:T1")),
        "task.get_record" => Ok(success(task_record(
            "failure",
            1.0,
            "",
            &["TASK_CANCELLED", "OpaqueRef:T1"],
        ))),
        _ => Ok(failure(&["UNEXPECTED"])),
    });
    let session = session("https://h/", transport);
    session.login().await.unwrap();

    let task = session.sr().async_scan(&"OpaqueRef:SR1".into()).await.unwrap();
    assert!(matches!(task.wait().await.unwrap_err(), XapiError::TaskCancelled(_)));
}

#[tokio::test(start_paused = true)]
async fn test_deadline_cancels_task() {
    let transport = ScriptedTransport::new(|call| match call.method.as_str() {
        "session.login_with_password" => Ok(success("OpaqueRef:S1")),
        "Async.VM.clean_shutdown" => Ok(success("OpaqueRef:T1")),
        "task.get_record" => Ok(success(task_record("pending", 0.1, "", &[]))),
        "task.cancel" => Ok(success("")),
        _ => Ok(failure(&["UNEXPECTED"])),
    });
    let session = session("https://h/", transport.clone());
    session.login().await.unwrap();

    let task = session
        .vm()
        .async_clean_shutdown(&"OpaqueRef:VM1".into())
        .await
        .unwrap();
    let err = task.wait_with_deadline(Duration::from_secs(1)).await.unwrap_err();
    assert!(matches!(err, XapiError::Timeout(d) if d == Duration::from_secs(1)));

    let cancel = transport
        .calls()
        .into_iter()
        .find(|c| c.method == "task.cancel")
        .unwrap();
    assert_eq!(cancel.param_str(1), Some("OpaqueRef:T1"));
}

#[tokio::test(start_paused = true)]
async fn test_deadline_bounds_in_flight_poll() {
    let transport = ScriptedTransport::new(|call| match call.method.as_str() {
        "session.login_with_password" => Ok(success("OpaqueRef:S1")),
        "Async.VM.clean_shutdown" => Ok(success("OpaqueRef:T1")),
        "task.get_record" => Ok(success(task_record("pending", 0.1, "", &[]))),
        "task.cancel" => Ok(success("")),
        _ => Ok(failure(&["UNEXPECTED"])),
    });
    transport.delay("task.get_record", Duration::from_secs(30));
    let session = session("https://h/", transport.clone());
    session.login().await.unwrap();

    let task = session
        .vm()
        .async_clean_shutdown(&"OpaqueRef:VM1".into())
        .await
        .unwrap();
    let started = Instant::now();
    let err = task.wait_with_deadline(Duration::from_secs(1)).await.unwrap_err();
    assert!(matches!(err, XapiError::Timeout(d) if d == Duration::from_secs(1)));
    assert!(started.elapsed() <= Duration::from_secs(2), "等待了 {:?}", started.elapsed());

    let poll = transport
        .calls()
        .into_iter()
        .find(|c| c.method == "task.get_record")
        .unwrap();
    let poll_timeout = poll.timeout.unwrap();
    assert!(poll_timeout <= Duration::from_secs(1), "{poll_timeout:?}");
    assert_eq!(transport.count("task.cancel"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unrecognized_status_keeps_polling() {
    let polls = AtomicUsize::new(0);
    let transport = ScriptedTransport::new(move |call| match call.method.as_str() {
        "session.login_with_password" => Ok(success("OpaqueRef:S1")),
        "task.get_record" => {
            let record = match polls.fetch_add(1, Ordering::SeqCst) {
                0 => task_record("migrating", 0.3, "", &[]),
                _ => task_record("success", 1.0, "", &[]),
            };
            Ok(success(record))
        }
        _ => Ok(failure(&["UNEXPECTED"])),
    });
    let session = session("https://h/", transport.clone());
    session.login().await.unwrap();

    let task: TaskHandle<Value> = TaskHandle::new(session, TaskRef::from("OpaqueRef:T1"), "VM.migrate");
    assert_eq!(task.wait().await.unwrap(), Value::from(""));
    assert_eq!(transport.count("task.get_record"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_record_and_destroy() {
    let transport = ScriptedTransport::new(|call| match call.method.as_str() {
        "session.login_with_password" => Ok(success("OpaqueRef:S1")),
        "Async.PBD.plug" => Ok(success("OpaqueRef:T1")),
        "task.get_record" => Ok(success(task_record("pending", 0.25, "", &[]))),
        "task.destroy" => Ok(success("")),
        _ => Ok(failure(&["UNEXPECTED"])),
    });
    let session = session("https://h/", transport.clone());
    session.login().await.unwrap();

    let task = session.pbd().async_plug(&"OpaqueRef:PBD1".into()).await.unwrap();
    let record = task.record().await.unwrap();
    assert_eq!(record.status, TaskStatusType::Pending);
    assert_eq!(record.progress, 0.25);

    task.destroy().await.unwrap();
    assert_eq!(transport.count("task.destroy"), 1);
}
