use bytes::{Buf, BufMut, BytesMut};
use std::io;
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use crate::error::FrameError;
use crate::frame::Frame;

/// Byte that ends every frame on the wire.
pub const TERMINATOR: u8 = 0;

/// Serialize a frame into wire text, terminator included.
///
/// Headers are written in insertion order. Header keys and values are not
/// escaped, so a value containing a newline corrupts the frame.
pub fn serialize(frame: &Frame) -> String {
    let mut out = String::with_capacity(frame.command.len() + frame.body.len() + 16);
    out.push_str(&frame.command);
    out.push('\n');
    for (k, v) in &frame.headers {
        out.push_str(k);
        out.push(':');
        out.push_str(v);
        out.push('\n');
    }
    out.push('\n');
    out.push_str(&frame.body);
    out.push(TERMINATOR as char);
    out
}

/// Where the line lexer is inside the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Command,
    Headers,
}

/// Parse wire text into a [`Frame`].
///
/// The first non-blank line is the command. Header lines follow up to the
/// first blank line and are split on their first `:`; lines without a colon
/// are skipped. Everything after the blank line, up to the terminator or the
/// end of the input, is the body. Duplicate header keys keep the last value.
pub fn parse(input: &str) -> Result<Frame, FrameError> {
    let text = match input.find(TERMINATOR as char) {
        Some(end) => &input[..end],
        None => input,
    };
    let mut rest = text.trim_start_matches(['\n', '\r']);
    let mut phase = Phase::Command;
    let mut frame: Option<Frame> = None;

    loop {
        let (line, tail, more) = match rest.find('\n') {
            Some(i) => (&rest[..i], &rest[i + 1..], true),
            None => (rest, "", false),
        };
        let line = line.strip_suffix('\r').unwrap_or(line);

        match phase {
            Phase::Command => {
                if line.is_empty() {
                    return Err(FrameError::MalformedFrame("missing command line".into()));
                }
                frame = Some(Frame::new(line));
                phase = Phase::Headers;
            }
            Phase::Headers => {
                let Some(f) = frame.as_mut() else {
                    return Err(FrameError::MalformedFrame("missing command line".into()));
                };
                if line.is_empty() {
                    f.body = tail.to_string();
                    break;
                }
                match line.split_once(':') {
                    Some((key, value)) => f.set_header(key, value),
                    None => warn!(line = %line, "skipping malformed header line"),
                }
            }
        }

        if !more {
            break;
        }
        rest = tail;
    }

    frame.ok_or_else(|| FrameError::MalformedFrame("missing command line".into()))
}

/// `FrameCodec` implements `tokio_util::codec::{Decoder, Encoder}` for the
/// NUL-terminated text frames exchanged with the broker.
///
/// Decoding yields the raw text of one frame (without its terminator) so the
/// protocol layer can classify content errors itself; encoding writes
/// [`serialize`] output.
#[derive(Debug, Default)]
pub struct FrameCodec {
    // Nothing buffered here: frames are split directly out of `src`.
}

impl FrameCodec {
    pub fn new() -> Self {
        Self {}
    }
}

impl Decoder for FrameCodec {
    type Item = String;
    type Error = io::Error;

    /// Decode one frame from `src`.
    ///
    /// Returns `Ok(None)` and leaves the frame bytes in place when the
    /// terminator has not arrived yet. Line feeds between frames are padding
    /// and are consumed.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let padding = src
            .iter()
            .take_while(|&&b| b == b'\n' || b == b'\r')
            .count();
        src.advance(padding);

        let Some(end) = src.iter().position(|&b| b == TERMINATOR) else {
            return Ok(None);
        };
        let raw = src.split_to(end);
        src.advance(1);

        let text = match String::from_utf8(raw.to_vec()) {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "frame is not valid utf-8, decoding lossily");
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };
        Ok(Some(text))
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = io::Error;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let text = serialize(&frame);
        dst.reserve(text.len());
        dst.put_slice(text.as_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_waits_for_terminator() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(&b"RECEIPT\nreceipt-id:7\n\n"[..]);
        assert_eq!(codec.decode(&mut buf).expect("decode"), None);
        assert_eq!(buf.len(), 22);
        buf.extend_from_slice(b"\0");
        let text = codec.decode(&mut buf).expect("decode").expect("frame");
        assert_eq!(text, "RECEIPT\nreceipt-id:7\n\n");
        assert!(buf.is_empty());
    }

    #[test]
    fn decode_skips_padding_between_frames() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(&b"CONNECTED\n\n\0\n\nRECEIPT\n\n\0"[..]);
        let first = codec.decode(&mut buf).expect("decode").expect("frame");
        let second = codec.decode(&mut buf).expect("decode").expect("frame");
        assert_eq!(first, "CONNECTED\n\n");
        assert_eq!(second, "RECEIPT\n\n");
        assert_eq!(codec.decode(&mut buf).expect("decode"), None);
    }

    #[test]
    fn decode_invalid_utf8_is_lossy() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(&b"MESSAGE\n\n\xff\0"[..]);
        let text = codec.decode(&mut buf).expect("decode").expect("frame");
        assert!(text.starts_with("MESSAGE\n\n"));
        assert!(text.contains('\u{fffd}'));
    }

    #[test]
    fn parse_strips_carriage_returns() {
        let frame = parse("MESSAGE\r\ndestination:/fire\r\n\r\nbody").expect("parse");
        assert_eq!(frame.command, "MESSAGE");
        assert_eq!(frame.get_header("destination"), Some("/fire"));
        assert_eq!(frame.body, "body");
    }
}
