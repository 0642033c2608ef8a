use bytes::BytesMut;
use emergency_stomp::codec::{FrameCodec, parse};
use emergency_stomp::{Command, Frame};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio_util::codec::{Decoder, Encoder};

/// Encode several frames and feed them to the decoder split into random
/// chunk sizes. The RNG is seeded so the test is deterministic.
#[test]
fn randomized_splits_multiple_frames() {
    let mut codec = FrameCodec::new();

    let frames = vec![
        Frame::new(Command::Connected).header("version", "1.2"),
        Frame::new(Command::Message)
            .header("destination", "/police")
            .set_body("user:alice\ncity:Haifa\nevent name:Theft\ndate time:5\n"),
        Frame::new(Command::Receipt).header("receipt-id", "7"),
    ];

    let mut encoded = BytesMut::new();
    for f in frames.iter().cloned() {
        codec.encode(f, &mut encoded).expect("encode");
        // stray line feeds between frames must be tolerated
        encoded.extend_from_slice(b"\n");
    }

    let mut rng = StdRng::from_seed([0x42; 32]);

    let mut chunks: Vec<BytesMut> = Vec::new();
    let mut off = 0usize;
    while off < encoded.len() {
        let sz = (rng.gen_range(1..8)).min(encoded.len() - off);
        chunks.push(BytesMut::from(&encoded[off..off + sz]));
        off += sz;
    }

    let mut dec = FrameCodec::new();
    let mut feed = BytesMut::new();
    let mut decoded = Vec::new();
    for c in chunks {
        feed.extend_from_slice(&c);
        loop {
            match dec.decode(&mut feed) {
                Ok(Some(text)) => decoded.push(parse(&text).expect("parse")),
                Ok(None) => break,
                Err(e) => panic!("decoder error: {}", e),
            }
        }
    }

    assert_eq!(decoded, frames);
}
