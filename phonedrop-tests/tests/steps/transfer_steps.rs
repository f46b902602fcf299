use cucumber::{given, then, when};
use phonedrop_p2p::application::transfer::send_file;
use phonedrop_p2p::{FileReceiver, Frame, OutgoingFile, CHUNK_SIZE, DATA_CHANNEL_LABEL};
use phonedrop_tests::{PhonedropWorld, RecordingChannel};

#[given(expr = "a file {string} of type {string} with {int} bytes")]
fn a_file(world: &mut PhonedropWorld, name: String, mime_type: String, size: usize) {
    let data = (0..size).map(|i| (i % 253) as u8).collect();
    world.outgoing = Some(OutgoingFile::new(name, mime_type, data));
}

#[when("the file is sent over the data channel")]
fn file_sent(world: &mut PhonedropWorld) {
    let file = world.outgoing.as_ref().expect("no file prepared");
    let mut channel = RecordingChannel::new(DATA_CHANNEL_LABEL);

    send_file(&mut channel, file).expect("send over an open channel");
    world.sent_frames = channel.frames;

    let mut receiver = FileReceiver::new();
    for frame in world.sent_frames.clone() {
        if let Some(file) = receiver.on_frame(frame).expect("well-formed frame") {
            world.received = Some(file);
        }
    }
}

#[then(expr = "{int} binary chunks are sent between the metadata and the terminator")]
fn chunks_sent(world: &mut PhonedropWorld, chunks: usize) {
    let frames = &world.sent_frames;
    assert_eq!(frames.len(), chunks + 2);

    assert!(matches!(&frames[0], Frame::Text(t) if t.contains(r#""type":"file-metadata""#)));
    assert_eq!(
        frames[frames.len() - 1],
        Frame::Text(r#"{"type":"file-end"}"#.to_string())
    );
    for frame in &frames[1..frames.len() - 1] {
        match frame {
            Frame::Binary(chunk) => assert!(!chunk.is_empty() && chunk.len() <= CHUNK_SIZE),
            Frame::Text(text) => panic!("unexpected text frame {text}"),
        }
    }
}

#[then("the receiver reassembles an identical file")]
fn identical_file(world: &mut PhonedropWorld) {
    let sent = world.outgoing.as_ref().expect("no file prepared");
    let received = world.received.as_ref().expect("no file reassembled");

    assert_eq!(received.name, sent.name);
    assert_eq!(received.mime_type, sent.mime_type);
    assert_eq!(received.data, sent.data);
}
