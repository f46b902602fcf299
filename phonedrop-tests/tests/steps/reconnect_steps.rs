use cucumber::{given, then, when};
use phonedrop_core::SessionId;
use phonedrop_p2p::{ConnectionConfig, DeviceConnection, LinkEvent};
use phonedrop_tests::{LoopbackPeers, PhonedropWorld, ScriptedConnector};
use std::sync::Arc;
use std::time::Duration;

const MAX_POLLS: usize = 32;

async fn connect_device(world: &mut PhonedropWorld, successes: usize) {
    world.connector = Arc::new(ScriptedConnector::new(successes));

    let config = ConnectionConfig::default()
        .with_reconnect_delay(Duration::from_millis(10))
        .with_connect_timeout(Duration::from_secs(1));

    let mut connection = DeviceConnection::builder(
        SessionId::generate(),
        world.connector.clone(),
        Arc::new(LoopbackPeers::default()),
    )
    .config(config)
    .build();

    connection.connect().await.expect("first connect succeeds");
    world.connection = Some(connection);
}

fn connection(world: &mut PhonedropWorld) -> &mut DeviceConnection {
    world.connection.as_mut().expect("no device connection")
}

#[given("a device connected through a relay that goes down after the first connection")]
async fn relay_goes_down(world: &mut PhonedropWorld) {
    connect_device(world, 1).await;
}

#[given("a device connected through a relay that stays up")]
async fn relay_stays_up(world: &mut PhonedropWorld) {
    connect_device(world, usize::MAX).await;
}

#[when("the signaling link drops unexpectedly")]
fn link_drops(world: &mut PhonedropWorld) {
    world.connector.emit(LinkEvent::Closed { clean: false });
}

#[when("the relay closes the signaling link cleanly")]
fn link_closed_cleanly(world: &mut PhonedropWorld) {
    world.connector.emit(LinkEvent::Closed { clean: true });
}

#[when("the device runs until it has nothing left to do")]
async fn run_until_idle(world: &mut PhonedropWorld) {
    let mut polls = 0;
    while connection(world).poll().await {
        polls += 1;
        assert!(polls < MAX_POLLS, "device never settled");
    }
    world.polls = polls;
}

#[when(expr = "the device handles {int} events")]
async fn handle_events(world: &mut PhonedropWorld, count: usize) {
    for _ in 0..count {
        assert!(connection(world).poll().await, "device went idle early");
    }
    world.polls += count;
}

#[then(regex = r"^(\d+) connection attempts? (?:was|were) made in total$")]
fn attempts_made(world: &mut PhonedropWorld, count: usize) {
    assert_eq!(world.connector.open_count(), count);
}

#[then(expr = "the device is {string}")]
fn device_state(world: &mut PhonedropWorld, state: String) {
    assert_eq!(connection(world).state().as_str(), state);
}

#[then("no further reconnect is scheduled")]
fn no_reconnect(world: &mut PhonedropWorld) {
    let connection = connection(world);
    assert!(!connection.is_reconnect_scheduled());
    assert_eq!(connection.reconnect_attempts(), 3);
}

#[then("the reconnect budget is untouched")]
fn budget_untouched(world: &mut PhonedropWorld) {
    let connection = connection(world);
    assert_eq!(connection.reconnect_attempts(), 0);
    assert!(!connection.is_reconnect_scheduled());
}
