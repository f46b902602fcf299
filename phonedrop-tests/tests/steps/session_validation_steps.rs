use cucumber::when;
use phonedrop_tests::PhonedropWorld;

#[when(expr = "device {string} connects with a session id of {int} characters")]
fn connects_with_long_id(world: &mut PhonedropWorld, name: String, length: usize) {
    let session = "a".repeat(length);
    world.connect_device(&name, &session);
}
