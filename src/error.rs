use std::io;
use thiserror::Error;

/// Problems with the content of a single inbound frame.
///
/// These never end a session: the frame (or the report it carries) is
/// dropped and a diagnostic is logged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// The frame has no command line.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),
    /// A header the command requires is absent.
    #[error("missing header '{0}'")]
    MissingHeader(String),
    /// A field the report body requires is absent.
    #[error("missing field '{0}' in report body")]
    MissingField(String),
    /// The `date time` field is not an integer.
    #[error("invalid timestamp '{0}'")]
    InvalidTimestamp(String),
}

/// Errors returned by `Session` commands and the event loader.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Frame content error
    #[error(transparent)]
    Frame(#[from] FrameError),
    /// `exit` for a channel that was never joined
    #[error("not subscribed to channel {0}")]
    UnsubscribedTopic(String),
    /// `join` for a channel that is already joined
    #[error("already subscribed to channel {0}")]
    DuplicateSubscription(String),
    /// Read or write failure on the connection
    #[error("transport failure: {0}")]
    TransportFailure(#[from] io::Error),
    /// The event document is missing or invalid
    #[error("could not load events from {path}: {reason}")]
    DocumentLoadFailure { path: String, reason: String },
    /// The session has already ended (logout, ERROR frame or lost connection)
    #[error("session is not connected")]
    NotConnected,
}
