use cucumber::{given, then, when};
use phonedrop_relay::RelayOutcome;
use phonedrop_tests::PhonedropWorld;
use std::time::Duration;

const PEER_DISCONNECTED: &str = r#"{"type":"peer-disconnected"}"#;

fn role_notice(role: &str) -> String {
    format!(r#"{{"type":"connected","role":"{role}"}}"#)
}

// ===== Given / When: devices =====

#[given(expr = "device {string} connected to session {string}")]
fn device_connected(world: &mut PhonedropWorld, name: String, session: String) {
    world.connect_device(&name, &session);
}

#[when(expr = "device {string} connects to session {string}")]
fn device_connects(world: &mut PhonedropWorld, name: String, session: String) {
    world.connect_device(&name, &session);
}

#[when(expr = "device {string} sends {string}")]
fn device_sends(world: &mut PhonedropWorld, name: String, raw: String) {
    world.send_from(&name, &raw);
}

#[when(expr = "device {string} disconnects")]
fn device_disconnects(world: &mut PhonedropWorld, name: String) {
    world.disconnect(&name);
}

// ===== When: time =====

#[when(regex = r"^(\d+) seconds? pass(?:es)?$")]
fn time_passes(world: &mut PhonedropWorld, seconds: u64) {
    world.now += Duration::from_secs(seconds);
}

#[when("the eviction pass runs")]
fn eviction_pass(world: &mut PhonedropWorld) {
    world.evicted = world.relay.evict_expired(world.now);
}

// ===== Then =====

#[then(expr = "device {string} is told it is the {string}")]
fn device_told_role(world: &mut PhonedropWorld, name: String, role: String) {
    let device = world.device(&name);
    let accepted = device
        .accepted
        .unwrap_or_else(|| panic!("device {name} was rejected: {:?}", device.rejection));

    assert_eq!(accepted.role.as_str(), role);
    assert_eq!(device.texts().first(), Some(&role_notice(&role)));
}

#[then(expr = "device {string} is rejected with status {int}")]
fn device_rejected(world: &mut PhonedropWorld, name: String, status: u16) {
    let device = world.device(&name);
    assert!(device.accepted.is_none(), "device {name} was admitted");

    let error = device.rejection.as_ref().expect("rejection recorded");
    assert_eq!(error.status_code().as_u16(), status);
    assert!(device.texts().is_empty());
}

#[then(expr = "device {string} receives exactly the sent message")]
fn device_receives_sent(world: &mut PhonedropWorld, name: String) {
    let sent = world.last_sent.clone().expect("nothing was sent");
    assert!(matches!(world.last_outcome, Some(RelayOutcome::Forwarded(_))));

    let texts = world.device(&name).texts();
    // the role notice, then the message, and no second `connected`
    assert_eq!(texts.len(), 2, "unexpected traffic: {texts:?}");
    assert_eq!(texts[1], sent);
}

#[then(expr = "device {string} receives nothing beyond its role notice")]
fn device_receives_nothing(world: &mut PhonedropWorld, name: String) {
    let texts = world.device(&name).texts();
    assert_eq!(texts.len(), 1, "unexpected traffic: {texts:?}");
}

#[then("the message is dropped")]
fn message_dropped(world: &mut PhonedropWorld) {
    assert!(
        matches!(world.last_outcome, Some(RelayOutcome::Dropped(_))),
        "outcome was {:?}",
        world.last_outcome
    );
}

#[then(expr = "device {string} receives exactly one peer-disconnected notice")]
fn device_receives_peer_disconnected(world: &mut PhonedropWorld, name: String) {
    let texts = world.device(&name).texts();
    let notices = texts.iter().filter(|t| *t == PEER_DISCONNECTED).count();
    assert_eq!(notices, 1, "traffic: {texts:?}");
}

#[then(expr = "device {string} is closed with code {int}")]
fn device_closed_with(world: &mut PhonedropWorld, name: String, code: u16) {
    assert_eq!(world.device(&name).close_code(), Some(code));
}

#[then(expr = "device {string} is still open")]
fn device_still_open(world: &mut PhonedropWorld, name: String) {
    assert_eq!(world.device(&name).close_code(), None);
}

#[then(expr = "session {string} still exists")]
fn session_exists(world: &mut PhonedropWorld, session: String) {
    assert!(world.has_session(&session));
}

#[then(expr = "session {string} no longer exists")]
fn session_removed(world: &mut PhonedropWorld, session: String) {
    assert!(!world.has_session(&session));
}

#[then(regex = r"^the relay holds (\d+) sessions?$")]
fn relay_holds(world: &mut PhonedropWorld, count: usize) {
    assert_eq!(world.relay.session_count(), count);
}

#[then(regex = r"^(\d+) sessions? (?:was|were) evicted$")]
fn sessions_evicted(world: &mut PhonedropWorld, count: usize) {
    assert_eq!(world.evicted, count);
}
