//! BDD step definitions for relay fallback feature

use std::sync::Arc;

use cucumber::{given, then, when};

use slot_watcher::io::HttpResponse;
use slot_watcher::relay::RelayRequester;
use slot_watcher::target::PollTarget;

use crate::world::{RelayScript, ScriptedRelays, SlotWorld};

const TARGET: &str = "https://upstream.example/api?date=Invalid+date&officeId=10187259";

fn add_relay(world: &mut SlotWorld, host: String, response: Option<HttpResponse>) {
    let relays = world
        .relays
        .get_or_insert_with(|| Arc::new(ScriptedRelays::default()));
    relays
        .scripts
        .lock()
        .unwrap()
        .push(RelayScript { host, response });
}

#[given(expr = "a relay {string} answering with status {int} and body {string}")]
fn relay_with_body(world: &mut SlotWorld, host: String, status: u16, body: String) {
    add_relay(world, host, Some(HttpResponse { status, body }));
}

#[given(expr = "a relay {string} answering with status {int}")]
fn relay_with_status(world: &mut SlotWorld, host: String, status: u16) {
    add_relay(
        world,
        host,
        Some(HttpResponse {
            status,
            body: String::new(),
        }),
    );
}

#[given(expr = "an unreachable relay {string}")]
fn unreachable_relay(world: &mut SlotWorld, host: String) {
    add_relay(world, host, None);
}

#[given("no relays")]
fn no_relays(world: &mut SlotWorld) {
    world.relays = Some(Arc::new(ScriptedRelays::default()));
}

#[when("the target is fetched through the relays")]
async fn fetch_through_relays(world: &mut SlotWorld) {
    let relays = world.relays.as_ref().expect("relays not set").clone();
    let target = PollTarget::new(TARGET, relays.relay_urls());
    let result = RelayRequester::new(relays)
        .fetch_via_relays(&target)
        .await
        .map_err(|e| e.to_string());
    world.fetch_result = Some(result);
}

#[then(expr = "the fetch should return {string}")]
fn fetch_returns(world: &mut SlotWorld, expected: String) {
    match world.fetch_result.as_ref().expect("no fetch result") {
        Ok(body) => assert_eq!(body, &expected),
        Err(e) => panic!("Expected body '{}', got error '{}'", expected, e),
    }
}

#[then(expr = "the fetch should fail with {string}")]
fn fetch_fails_with(world: &mut SlotWorld, expected: String) {
    match world.fetch_result.as_ref().expect("no fetch result") {
        Ok(body) => panic!("Expected failure '{}', got body '{}'", expected, body),
        Err(e) => assert_eq!(e, &expected),
    }
}

#[then(expr = "{int} relay(s) should have been tried")]
fn relays_tried(world: &mut SlotWorld, expected: usize) {
    let relays = world.relays.as_ref().expect("relays not set");
    assert_eq!(relays.tried(), expected);
}

#[then(expr = "the relay {string} should have received the encoded target")]
fn relay_received_encoded_target(world: &mut SlotWorld, host: String) {
    let relays = world.relays.as_ref().expect("relays not set");
    let calls = relays.calls.lock().unwrap();
    let expected = format!(
        "https://{}/?https%3A%2F%2Fupstream.example%2Fapi%3Fdate%3DInvalid%2Bdate%26officeId%3D10187259",
        host
    );
    assert!(
        calls.contains(&expected),
        "Expected a call to '{}', got {:?}",
        expected,
        calls
    );
}
