//! Integration tests for buffering before identify and draining after.

use crossbeam_channel::Receiver;
use greenfinch_profiles::{
    ActionKind, Batcher, ChannelDispatcher, Client, ClientConfig, FlushCallbacks, PendingRequest,
    Properties, Response,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;

fn test_client() -> (Client, Receiver<PendingRequest>) {
    let (dispatcher, receiver) = ChannelDispatcher::bounded(64, false);
    let client = Client::new(
        ClientConfig::default()
            .with_token("project-token")
            .with_anonymous_id("anon-1"),
        Arc::new(dispatcher),
    )
    .unwrap();
    (client, receiver)
}

fn props(value: Value) -> Properties {
    value.as_object().cloned().unwrap()
}

fn drain(receiver: &Receiver<PendingRequest>) -> Vec<PendingRequest> {
    receiver.try_iter().collect()
}

// --- Merge Before Identify ---

#[test]
fn test_plan_upgrade_merges_into_one_set() {
    let (client, receiver) = test_client();

    client.people().set(("Plan", "gold"), None).unwrap();
    client.people().set(("Plan", "silver"), None).unwrap();
    assert!(receiver.is_empty());

    let report = client.identify("user-42").unwrap();
    assert_eq!(report.slots_replayed, 1);

    let sent = drain(&receiver);
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0].request.payload,
        json!({
            "$set": {"Plan": "silver"},
            "$token": "project-token",
            "$distinct_id": "user-42"
        })
    );
    assert_eq!(sent[0].request.batcher, Batcher::People);
    assert!(client.queue().is_empty());
}

#[test]
fn test_distinct_keys_are_combined() {
    let (client, receiver) = test_client();

    client
        .people()
        .set(props(json!({"Company": "Acme", "Plan": "Premium"})), None)
        .unwrap();
    client.people().set(("gender", "f"), None).unwrap();
    client.people().set(("Plan", "Free"), None).unwrap();

    client.identify("user-42");

    let sent = drain(&receiver);
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0].request.payload["$set"],
        json!({"Company": "Acme", "Plan": "Free", "gender": "f"})
    );
}

#[test]
fn test_each_append_is_its_own_request() {
    let (client, receiver) = test_client();

    for i in 0..5 {
        client.people().append(("visits", i), None).unwrap();
    }
    assert_eq!(client.queue().snapshot().append.len(), 5);

    let report = client.identify("user-42").unwrap();
    assert_eq!(report.items_replayed, 5);
    assert_eq!(drain(&receiver).len(), 5);
    assert!(client.queue().is_empty());
}

#[test]
fn test_appends_replay_newest_first() {
    let (client, receiver) = test_client();

    client.people().append(("tags", "x"), None).unwrap();
    client.people().append(("tags", "y"), None).unwrap();
    client.identify("user-42");

    let values: Vec<Value> = drain(&receiver)
        .into_iter()
        .map(|p| p.request.payload["$append"]["tags"].clone())
        .collect();
    assert_eq!(values, vec![json!("y"), json!("x")]);
}

#[test]
fn test_unset_replays_as_name_list() {
    let (client, receiver) = test_client();

    client.people().unset(["a"], None).unwrap();
    client.people().unset(["b", "a"], None).unwrap();
    client.identify("user-42");

    let sent = drain(&receiver);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].request.payload["$unset"], json!(["a", "b"]));
}

#[test]
fn test_drain_order_across_kinds() {
    let (client, receiver) = test_client();

    client.people().remove(("tags", "old"), None).unwrap();
    client.people().append(("tags", "new"), None).unwrap();
    client.people().union(("langs", "rust"), None).unwrap();
    client.people().increment_one("logins", None).unwrap();
    client.people().unset(["legacy"], None).unwrap();
    client.people().set_once(("First Seen", "today"), None).unwrap();
    client.people().set(("Plan", "gold"), None).unwrap();

    client.identify("user-42");

    let keys: Vec<String> = drain(&receiver)
        .into_iter()
        .map(|p| {
            let payload = p.request.payload.as_object().cloned().unwrap();
            ActionKind::MERGE_CAPABLE
                .into_iter()
                .chain(ActionKind::LISTS)
                .map(|kind| kind.action_key())
                .find(|key| payload.contains_key(*key))
                .unwrap()
                .to_string()
        })
        .collect();
    assert_eq!(
        keys,
        vec!["$set", "$set_once", "$unset", "$add", "$union", "$append", "$remove"]
    );
}

#[test]
fn test_increment_skips_non_numeric_values() {
    let (client, receiver) = test_client();
    client.identify("user-42");

    client
        .people()
        .increment(props(json!({"a": 1, "b": "oops"})), None)
        .unwrap();

    let sent = drain(&receiver);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].request.payload["$add"], json!({"a": 1}));
}

#[test]
fn test_increments_merge_last_write_wins() {
    let (client, receiver) = test_client();

    client.people().increment(("score", 5), None).unwrap();
    client.people().increment(("score", 3), None).unwrap();
    client.identify("user-42");

    let sent = drain(&receiver);
    assert_eq!(sent[0].request.payload["$add"], json!({"score": 3}));
}

// --- Replay Outcomes ---

#[test]
fn test_failed_replay_is_requeued_then_succeeds() {
    let (client, receiver) = test_client();

    client.people().set_once(("Plan", "gold"), None).unwrap();
    client.identify("user-42");

    let first = receiver.try_recv().unwrap();
    first.complete(Response::Code(0), None);
    assert_eq!(client.queue().snapshot().set_once, props(json!({"Plan": "gold"})));

    let accepted = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&accepted);
    let callbacks = FlushCallbacks::new().on(ActionKind::SetOnce, move |response, _| {
        sink.lock().push(response)
    });

    let report = client.flush(&callbacks);
    assert_eq!(report.slots_replayed, 1);

    let second = receiver.try_recv().unwrap();
    assert_eq!(second.request.payload["$set_once"], json!({"Plan": "gold"}));
    second.complete(Response::Code(1), Some(json!({"status": 1})));

    assert!(client.queue().is_empty());
    assert_eq!(*accepted.lock(), vec![Response::Code(1)]);
}

#[test]
fn test_failed_append_goes_back_individually() {
    let (client, receiver) = test_client();

    client.people().append(("tags", "x"), None).unwrap();
    client.people().append(("tags", "y"), None).unwrap();
    client.identify("user-42");

    let sent = drain(&receiver);
    assert_eq!(sent.len(), 2);
    let mut sent = sent.into_iter();
    sent.next().unwrap().complete(Response::Code(1), None);
    sent.next().unwrap().complete(Response::Code(0), None);

    let snapshot = client.queue().snapshot();
    assert_eq!(snapshot.append, vec![props(json!({"tags": "x"}))]);
}

#[test]
fn test_failed_remove_goes_back_individually() {
    let (client, receiver) = test_client();

    client.people().remove(("tags", "x"), None).unwrap();
    client.people().remove(("tags", "y"), None).unwrap();
    client.identify("user-42");

    let mut sent = drain(&receiver).into_iter();
    let newest = sent.next().unwrap();
    assert_eq!(newest.request.payload["$remove"], json!({"tags": "y"}));
    newest.complete(Response::Code(0), None);
    sent.next().unwrap().complete(Response::Code(1), None);
    assert!(sent.next().is_none());

    let snapshot = client.queue().snapshot();
    assert_eq!(snapshot.remove, vec![props(json!({"tags": "y"}))]);
    assert!(snapshot.append.is_empty());
}

#[test]
fn test_other_response_codes_pass_through() {
    let (client, receiver) = test_client();
    client.people().set_once(("Plan", "gold"), None).unwrap();
    client.identity().identify("user-42");

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let callbacks = FlushCallbacks::new().on(ActionKind::SetOnce, move |response, data| {
        sink.lock().push((response, data))
    });
    client.flush(&callbacks);

    receiver.try_recv().unwrap().complete(Response::Code(2), Some(json!({"status": 2})));

    assert_eq!(*seen.lock(), vec![(Response::Code(2), Some(json!({"status": 2})))]);
    assert!(client.queue().is_empty());
}

#[test]
fn test_mutation_during_failed_replay_is_kept() {
    let (client, receiver) = test_client();

    client.people().set(("Plan", "gold"), None).unwrap();
    client.identify("user-42");
    let in_flight = receiver.try_recv().unwrap();

    // Identified now, so this one goes straight out.
    client.people().set(("Seats", 3), None).unwrap();
    in_flight.complete(Response::Code(0), None);

    assert_eq!(client.queue().snapshot().set, props(json!({"Plan": "gold"})));
    assert_eq!(drain(&receiver).len(), 1);
}

#[test]
fn test_identify_twice_does_not_drain_again() {
    let (client, receiver) = test_client();

    client.people().set(("Plan", "gold"), None).unwrap();
    assert!(client.identify("user-42").is_some());
    assert!(client.identify("user-43").is_none());
    assert_eq!(drain(&receiver).len(), 1);
}

// --- Identity Fields ---

#[test]
fn test_registered_identity_fields_are_stamped() {
    let (client, receiver) = test_client();
    client.register("$device_id", "device-7");
    client.register("$had_persisted_distinct_id", true);

    client.people().set(("Plan", "gold"), None).unwrap();
    client.identify("user-42");

    let payload = receiver.try_recv().unwrap().request.payload;
    assert_eq!(payload["$device_id"], json!("device-7"));
    assert_eq!(payload["$had_persisted_distinct_id"], json!(true));
    assert!(payload.get("$user_id").is_none());
}

#[test]
fn test_caller_cannot_spoof_reserved_fields() {
    let (client, receiver) = test_client();
    client.identify("user-42");

    client
        .people()
        .set(props(json!({"$distinct_id": "someone-else", "Plan": "gold"})), None)
        .unwrap();

    let payload = receiver.try_recv().unwrap().request.payload;
    assert_eq!(payload["$distinct_id"], json!("user-42"));
    assert_eq!(payload["$set"], json!({"Plan": "gold"}));
}

// --- Groups ---

#[test]
fn test_group_mutations_send_before_identify() {
    let (client, receiver) = test_client();

    client
        .group("company", "acme")
        .set(("Industry", "retail"), None)
        .unwrap();

    let sent = receiver.try_recv().unwrap();
    assert_eq!(sent.request.batcher, Batcher::Groups);
    assert_eq!(sent.request.endpoint, "https://api.greenfinch.io/groups/");
    assert_eq!(
        sent.request.payload,
        json!({
            "$set": {"Industry": "retail"},
            "$group_key": "company",
            "$group_id": "acme",
            "$token": "project-token"
        })
    );
    assert!(client.queue().is_empty());
}

#[test]
fn test_group_delete() {
    let (client, receiver) = test_client();

    client.group("company", 7).delete(None).unwrap();

    let payload = receiver.try_recv().unwrap().request.payload;
    assert_eq!(payload["$delete"], json!(""));
    assert_eq!(payload["$group_id"], json!(7));
}

// --- Charges ---

#[test]
fn test_charges_buffer_and_clear() {
    let (client, receiver) = test_client();

    client.people().track_charge(19.99, None, None).unwrap();
    client.people().track_charge("5", None, None).unwrap();
    client.people().clear_charges(None).unwrap();
    client.identify("user-42");

    let payloads: Vec<Value> = drain(&receiver)
        .into_iter()
        .map(|p| p.request.payload)
        .collect();
    assert_eq!(payloads.len(), 3);
    assert_eq!(payloads[0]["$set"], json!({"$transactions": []}));
    assert_eq!(payloads[1]["$append"]["$transactions"], json!({"$amount": 5}));
    assert_eq!(payloads[2]["$append"]["$transactions"], json!({"$amount": 19.99}));
}

// --- Concurrency ---

#[test]
fn test_appends_racing_identify_are_never_stranded() {
    for _ in 0..50 {
        let (dispatcher, receiver) = ChannelDispatcher::bounded(1024, false);
        let client = Client::new(ClientConfig::default(), Arc::new(dispatcher)).unwrap();

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for i in 0..200 {
                    client.people().append(("events", i), None).unwrap();
                }
            });
            std::thread::yield_now();
            client.identify("user-42");
        });

        assert!(client.queue().is_empty());
        assert_eq!(receiver.try_iter().count(), 200);
    }
}
