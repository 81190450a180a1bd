//! BDD step definitions for polling feature

use std::sync::Arc;

use cucumber::{given, then, when};

use slot_watcher::appointment::format_countdown;
use slot_watcher::config::Config;
use slot_watcher::io::HttpResponse;
use slot_watcher::notifier::Notifier;
use slot_watcher::poller::Countdown;
use slot_watcher::WatcherBuilder;

use crate::world::{RecordingSurface, RelayScript, ScriptedRelays, SlotWorld};

#[given(expr = "a countdown of {int} seconds")]
fn countdown_of(world: &mut SlotWorld, seconds: u32) {
    world.countdown = Some(Countdown::new(seconds));
    world.polls_due = 0;
}

#[when(expr = "{int} second(s) elapse(s)")]
fn seconds_elapse(world: &mut SlotWorld, seconds: u32) {
    let countdown = world.countdown.as_mut().expect("countdown not set");
    for _ in 0..seconds {
        if countdown.tick() {
            world.polls_due += 1;
        }
    }
}

#[then(expr = "{int} poll(s) should have been due")]
fn polls_due(world: &mut SlotWorld, expected: u32) {
    assert_eq!(world.polls_due, expected);
}

#[then(expr = "the countdown should show {string}")]
fn countdown_shows(world: &mut SlotWorld, expected: String) {
    let countdown = world.countdown.as_ref().expect("countdown not set");
    assert_eq!(format_countdown(countdown.remaining()), expected);
}

#[given(expr = "the upstream answers {string}")]
fn upstream_answers(world: &mut SlotWorld, body: String) {
    world.upstream_body = Some(body);
}

#[when("a poll cycle runs")]
async fn poll_cycle_runs(world: &mut SlotWorld) {
    let body = world.upstream_body.clone().expect("upstream body not set");
    let relays = Arc::new(ScriptedRelays::default());
    relays.scripts.lock().unwrap().push(RelayScript {
        host: "relay.example".to_string(),
        response: Some(HttpResponse { status: 200, body }),
    });

    let mut config = Config::default();
    config.relays = relays.relay_urls();

    let watcher = WatcherBuilder::new(config)
        .with_http_client(relays)
        .with_surface(Arc::new(RecordingSurface::default()))
        .with_notifiers(Vec::<Arc<dyn Notifier>>::new())
        .build()
        .expect("watcher should build");

    world.poll_state = Some(watcher.poll_once().await);
}

#[then(expr = "the poll result should be {string}")]
fn poll_result_kind(world: &mut SlotWorld, expected: String) {
    let state = world.poll_state.as_ref().expect("no poll state");
    assert!(!state.is_loading);
    let result = state.last_result.as_ref().expect("no poll result");
    let kind = serde_json::to_value(result).unwrap()["kind"]
        .as_str()
        .unwrap()
        .to_string();
    assert_eq!(kind, expected);
}

#[then(expr = "the poll error should start with {string}")]
fn poll_error_starts_with(world: &mut SlotWorld, expected: String) {
    let state = world.poll_state.as_ref().expect("no poll state");
    assert!(!state.is_loading);
    assert!(state.last_result.is_none());
    let error = state.last_error.as_ref().expect("no poll error");
    assert!(
        error.starts_with(&expected),
        "Expected error to start with '{}', got '{}'",
        expected,
        error
    );
}
