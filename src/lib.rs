//! STOMP client engine for emergency event reporting channels.
//!
//! The crate builds and parses text STOMP frames, keeps track of joined
//! channels, and stores the event reports that arrive on them, keyed by
//! channel and reporting user, so they can be summarized later.
//!
//! ```no_run
//! use emergency_stomp::{Session, SessionOptions};
//!
//! # async fn demo() -> Result<(), emergency_stomp::ClientError> {
//! let options = SessionOptions::default();
//! let session = Session::connect("127.0.0.1:7777", "alice", "secret", options).await?;
//! session.join("police").await?;
//! session.report("events.json").await?;
//! let summary = session.summary("police", "alice");
//! println!("{}", summary.render());
//! session.logout().await?;
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod error;
pub mod events;
pub mod frame;
pub mod protocol;
pub mod report;
pub mod session;
pub mod store;
pub mod subscription;
pub mod summary;

pub use codec::{FrameCodec, parse, serialize};
pub use error::{ClientError, FrameError};
pub use events::{EventRecord, EventsFile, load_events};
pub use frame::{Command, Frame};
pub use protocol::{Inbound, Protocol, SessionState};
pub use report::{EventReport, parse_report};
pub use session::{ReceiverExit, Session, SessionOptions};
pub use store::{ReportKey, ReportStore};
pub use subscription::SubscriptionRegistry;
pub use summary::Summary;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smoke_frame_display() {
        let f = Frame::new(Command::Connect)
            .header("accept-version", "1.2")
            .set_body("hello");
        let s = format!("{}", f);
        assert!(s.contains("CONNECT"));
        assert!(s.contains("Body (5 bytes)"));
    }
}
