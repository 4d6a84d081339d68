mod common;

use common::{event_log, RecordingContext};
use futures::executor::block_on;
use serde_json::json;
use std::collections::HashSet;
use webbridge_format::{OutboundScript, ResponseEnvelope};
use webbridge_runtime::{
    Bridge, BridgeError, CallError, InboundMessage, InstanceDirectory,
};

fn respond(directory: &InstanceDirectory, bridge: &Bridge, envelope: &ResponseEnvelope) -> bool {
    directory.deliver(InboundMessage::new(
        bridge.id(),
        "_jsCallResponse",
        envelope.to_json().unwrap(),
    ))
}

#[test]
fn success_reply_fires_only_success_handler() {
    let directory = InstanceDirectory::new();
    let context = RecordingContext::new();
    let bridge = Bridge::attach(&directory, context.clone()).unwrap();
    let log = event_log();

    let ok = log.clone();
    let err = log.clone();
    let request_id = bridge
        .call_remote_function(
            "sum",
            json!([2, 3]),
            move |v| ok.borrow_mut().push(format!("ok:{}", v)),
            move |v| err.borrow_mut().push(format!("err:{}", v)),
        )
        .unwrap();

    assert_eq!(
        context.last_script(),
        OutboundScript::Call {
            request_id: request_id.clone(),
            function: "sum".to_string(),
            args: vec![json!(2), json!(3)],
        }
    );
    assert_eq!(bridge.pending_calls(), 1);

    respond(&directory, &bridge, &ResponseEnvelope::success(request_id, json!(5)));

    assert_eq!(*log.borrow(), vec!["ok:5".to_string()]);
    assert_eq!(bridge.pending_calls(), 0);
}

#[test]
fn remote_error_fires_error_handler() {
    let directory = InstanceDirectory::new();
    let context = RecordingContext::new();
    let bridge = Bridge::attach(&directory, context.clone()).unwrap();
    let log = event_log();

    let ok = log.clone();
    let err = log.clone();
    let request_id = bridge
        .call_remote_function(
            "explode",
            None::<serde_json::Value>,
            move |v| ok.borrow_mut().push(format!("ok:{}", v)),
            move |v| err.borrow_mut().push(format!("err:{}", v)),
        )
        .unwrap();

    respond(
        &directory,
        &bridge,
        &ResponseEnvelope::failure(request_id, json!("kaboom")),
    );

    assert_eq!(*log.borrow(), vec!["err:\"kaboom\"".to_string()]);
}

#[test]
fn duplicate_reply_is_ignored() {
    let directory = InstanceDirectory::new();
    let bridge = Bridge::attach(&directory, RecordingContext::new()).unwrap();
    let log = event_log();

    let ok = log.clone();
    let request_id = bridge
        .call_remote_function(
            "once",
            (),
            move |_| ok.borrow_mut().push("ok".to_string()),
            |_| {},
        )
        .unwrap();

    let envelope = ResponseEnvelope::success(request_id, json!(true));
    respond(&directory, &bridge, &envelope);
    respond(&directory, &bridge, &envelope);

    assert_eq!(log.borrow().len(), 1);
}

#[test]
fn unknown_and_malformed_replies_are_dropped() {
    let directory = InstanceDirectory::new();
    let bridge = Bridge::attach(&directory, RecordingContext::new()).unwrap();
    let log = event_log();

    let ok = log.clone();
    bridge
        .call_remote_function("f", (), move |_| ok.borrow_mut().push("ok".to_string()), |_| {})
        .unwrap();

    respond(&directory, &bridge, &ResponseEnvelope::success("999_1", json!(1)));
    bridge.dispatch("_jsCallResponse", "not an envelope");
    bridge.dispatch("_jsCallResponse", json!({"isError": false}));

    assert!(log.borrow().is_empty());
    assert_eq!(bridge.pending_calls(), 1);
}

#[test]
fn request_ids_are_unique_across_instances() {
    let directory = InstanceDirectory::new();
    let bridges: Vec<Bridge> = (0..8)
        .map(|_| Bridge::attach(&directory, RecordingContext::new()).unwrap())
        .collect();

    let mut seen = HashSet::new();
    for _ in 0..25 {
        for bridge in &bridges {
            let id = bridge
                .call_remote_function("noop", (), |_| {}, |_| {})
                .unwrap();
            assert!(seen.insert(id.clone()), "duplicate request id {}", id);
        }
    }
    assert_eq!(seen.len(), 200);
}

#[test]
fn reply_for_another_instance_does_not_resolve() {
    let directory = InstanceDirectory::new();
    let a = Bridge::attach(&directory, RecordingContext::new()).unwrap();
    let b = Bridge::attach(&directory, RecordingContext::new()).unwrap();
    let log = event_log();

    let ok = log.clone();
    let request_id = a
        .call_remote_function("f", (), move |_| ok.borrow_mut().push("a".to_string()), |_| {})
        .unwrap();

    respond(&directory, &b, &ResponseEnvelope::success(request_id.clone(), json!(1)));
    assert!(log.borrow().is_empty());

    respond(&directory, &a, &ResponseEnvelope::success(request_id, json!(1)));
    assert_eq!(*log.borrow(), vec!["a".to_string()]);
}

#[test]
fn injection_failure_discards_entry_and_reports_error() {
    let directory = InstanceDirectory::new();
    let context = RecordingContext::new();
    let bridge = Bridge::attach(&directory, context.clone()).unwrap();
    let log = event_log();

    context.fail_scripts.set(true);
    let err_log = log.clone();
    let err = bridge
        .call_remote_function("f", (), |_| {}, move |v| {
            err_log.borrow_mut().push(format!("err:{}", v))
        })
        .unwrap_err();

    assert!(matches!(err, BridgeError::Execution(_)));
    assert_eq!(bridge.pending_calls(), 0);
    assert!(log.borrow().is_empty());

    assert!(matches!(
        bridge.emit("ping", &json!(1)),
        Err(BridgeError::Execution(_))
    ));
}

#[test]
fn awaited_call_resolves_with_reply() {
    let directory = InstanceDirectory::new();
    let context = RecordingContext::new();
    let bridge = Bridge::attach(&directory, context.clone()).unwrap();

    let call = bridge.call("sum", json!([2, 3]));
    let request_id = call.request_id().unwrap().to_string();
    assert_eq!(request_id, context.last_request_id());

    respond(&directory, &bridge, &ResponseEnvelope::success(request_id, json!(5)));

    assert_eq!(block_on(call), Ok(json!(5)));
}

#[test]
fn awaited_call_reports_remote_error() {
    let directory = InstanceDirectory::new();
    let context = RecordingContext::new();
    let bridge = Bridge::attach(&directory, context.clone()).unwrap();

    let call = bridge.call("explode", ());
    respond(
        &directory,
        &bridge,
        &ResponseEnvelope::failure(context.last_request_id(), json!({"message": "nope"})),
    );

    assert_eq!(
        block_on(call),
        Err(CallError::Remote(json!({"message": "nope"})))
    );
}

#[test]
fn awaited_call_is_abandoned_on_destroy() {
    let directory = InstanceDirectory::new();
    let bridge = Bridge::attach(&directory, RecordingContext::new()).unwrap();

    let call = bridge.call("slow", ());
    bridge.destroy();

    assert_eq!(block_on(call), Err(CallError::Abandoned));
}

#[test]
fn awaited_call_on_destroyed_bridge_fails_immediately() {
    let directory = InstanceDirectory::new();
    let bridge = Bridge::attach(&directory, RecordingContext::new()).unwrap();
    bridge.destroy();

    let call = bridge.call("late", ());
    assert!(call.request_id().is_none());
    assert_eq!(
        block_on(call),
        Err(CallError::Bridge(BridgeError::Destroyed(bridge.id())))
    );
}

#[test]
fn success_handler_can_issue_follow_up_call() {
    let directory = InstanceDirectory::new();
    let context = RecordingContext::new();
    let bridge = Bridge::attach(&directory, context.clone()).unwrap();
    let log = event_log();

    let handle = bridge.clone();
    let sink = log.clone();
    let first = bridge
        .call_remote_function(
            "login",
            (),
            move |_| {
                let next = handle
                    .call_remote_function("profile", (), |_| {}, |_| {})
                    .unwrap();
                sink.borrow_mut().push(next);
            },
            |_| {},
        )
        .unwrap();

    assert!(respond(
        &directory,
        &bridge,
        &ResponseEnvelope::success(first, json!(true))
    ));

    assert_eq!(*log.borrow(), vec![format!("{}_2", bridge.id())]);
    assert_eq!(bridge.pending_calls(), 1);
    assert_eq!(context.last_request_id(), format!("{}_2", bridge.id()));
}
