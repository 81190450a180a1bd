//! BDD step definitions for alerting feature

use std::sync::Arc;

use cucumber::{given, then, when};

use slot_watcher::alert::AlertDispatcher;
use slot_watcher::appointment::AppointmentResult;
use slot_watcher::config::{AlertConfig, AlertPolicy};
use slot_watcher::notifier::{Notifier, Permission};
use slot_watcher::state::new_state_handle;

use crate::world::{RecordingNotifier, RecordingSurface, SlotWorld};

fn parse_policy(s: &str) -> AlertPolicy {
    match s {
        "every_poll" => AlertPolicy::EveryPoll,
        "on_transition" => AlertPolicy::OnTransition,
        other => panic!("Unknown policy: {}", other),
    }
}

fn parse_permission(s: &str) -> Permission {
    match s {
        "granted" => Permission::Granted,
        "denied" => Permission::Denied,
        "undetermined" => Permission::Undetermined,
        other => panic!("Unknown permission: {}", other),
    }
}

fn dispatcher(world: &mut SlotWorld) -> &AlertDispatcher {
    if world.dispatcher.is_none() {
        let notifier = world
            .notifier
            .get_or_insert_with(|| Arc::new(RecordingNotifier::new(Permission::Granted, true)))
            .clone();
        let surface = Arc::new(RecordingSurface::default());
        let state = new_state_handle(180, 10);
        let config = AlertConfig {
            policy: world.alert_policy,
            ..Default::default()
        };

        world.surface = Some(surface.clone());
        world.alert_state = Some(state.clone());
        world.dispatcher = Some(AlertDispatcher::new(
            vec![notifier as Arc<dyn Notifier>],
            surface,
            config,
            "Europe/Berlin",
            state,
        ));
    }
    world.dispatcher.as_ref().expect("dispatcher not built")
}

#[given(expr = "the alert policy is {string}")]
fn alert_policy(world: &mut SlotWorld, policy: String) {
    world.alert_policy = parse_policy(&policy);
}

#[given(expr = "a notifier with permission {string}")]
fn notifier_with_permission(world: &mut SlotWorld, permission: String) {
    world.notifier = Some(Arc::new(RecordingNotifier::new(
        parse_permission(&permission),
        true,
    )));
}

#[given("a notifier whose permission request is refused")]
fn notifier_refusing(world: &mut SlotWorld) {
    world.notifier = Some(Arc::new(RecordingNotifier::new(
        Permission::Undetermined,
        false,
    )));
}

#[when(expr = "a poll resolves with slots {string}")]
async fn poll_with_slots(world: &mut SlotWorld, slots: String) {
    let result = AppointmentResult::Available {
        timestamps: slots.split(',').map(|s| s.trim().to_string()).collect(),
    };
    let fired = dispatcher(world).on_result(&result).await;
    world.last_fired = Some(fired);
}

#[when("a poll resolves with no slots")]
async fn poll_without_slots(world: &mut SlotWorld) {
    let fired = dispatcher(world).on_result(&AppointmentResult::Empty).await;
    world.last_fired = Some(fired);
}

#[when(expr = "a poll resolves with error code {string}")]
async fn poll_with_error(world: &mut SlotWorld, code: String) {
    let result = AppointmentResult::Error {
        code,
        message: None,
        last_modified: None,
    };
    let fired = dispatcher(world).on_result(&result).await;
    world.last_fired = Some(fired);
}

#[then("an alert should have fired")]
fn alert_fired(world: &mut SlotWorld) {
    assert_eq!(world.last_fired, Some(true));
}

#[then("no alert should have fired")]
fn alert_not_fired(world: &mut SlotWorld) {
    assert_eq!(world.last_fired, Some(false));
}

#[then(expr = "the notifier should have received {int} notification(s)")]
fn notifications_received(world: &mut SlotWorld, expected: usize) {
    let notifier = world.notifier.as_ref().expect("notifier not set");
    assert_eq!(notifier.sent.lock().unwrap().len(), expected);
}

#[then(expr = "the last notification should read {string}")]
fn last_notification_reads(world: &mut SlotWorld, expected: String) {
    let notifier = world.notifier.as_ref().expect("notifier not set");
    let sent = notifier.sent.lock().unwrap();
    let last = sent.last().expect("no notification sent");
    assert_eq!(last.message, expected);
}

#[then(expr = "the last notification title should be {string}")]
fn last_notification_title(world: &mut SlotWorld, expected: String) {
    let notifier = world.notifier.as_ref().expect("notifier not set");
    let sent = notifier.sent.lock().unwrap();
    let last = sent.last().expect("no notification sent");
    assert_eq!(last.title, expected);
}

#[then(expr = "permission should have been requested {int} time(s)")]
fn permission_requested(world: &mut SlotWorld, expected: u32) {
    let notifier = world.notifier.as_ref().expect("notifier not set");
    assert_eq!(*notifier.permission_requests.lock().unwrap(), expected);
}

#[then(expr = "the alert sound should have played {int} time(s)")]
fn sound_played(world: &mut SlotWorld, expected: u32) {
    let surface = world.surface.as_ref().expect("surface not set");
    assert_eq!(*surface.sounds.lock().unwrap(), expected);
}

#[then(expr = "the window title should be {string}")]
fn window_title(world: &mut SlotWorld, expected: String) {
    let surface = world.surface.as_ref().expect("surface not set");
    assert_eq!(surface.title.lock().unwrap().as_deref(), Some(expected.as_str()));
}

#[then("the window title should be unchanged")]
fn window_title_unchanged(world: &mut SlotWorld) {
    let surface = world.surface.as_ref().expect("surface not set");
    assert!(surface.title.lock().unwrap().is_none());
}

#[then(expr = "the alert history should hold {int} record(s)")]
async fn alert_history(world: &mut SlotWorld, expected: usize) {
    let state = world.alert_state.as_ref().expect("state not set");
    assert_eq!(state.read().await.history.len(), expected);
}
