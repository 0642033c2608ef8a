use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info, warn};

use crate::codec;
use crate::error::FrameError;
use crate::frame::{Command, Frame};
use crate::report::{EventReport, parse_report, report_user};
use crate::store::ReportStore;
use crate::subscription::SubscriptionRegistry;

/// Lifecycle of one connect→disconnect cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// CONNECT sent, CONNECTED not yet seen
    Connecting,
    Connected,
    /// Logged out or connection lost
    Disconnected,
    /// The broker sent an ERROR frame; terminal
    Errored,
}

/// What `Protocol::handle_inbound_frame` did with a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// CONNECTED: the session is logged in
    Connected,
    /// MESSAGE: a report was stored under (destination, user)
    Stored { destination: String, user: String },
    /// RECEIPT, with its `receipt-id` if present
    Receipt(Option<String>),
    /// ERROR, with its `message` header if present
    ServerError(Option<String>),
    /// The frame or its report was malformed and has been discarded
    Dropped(FrameError),
    /// A command this client does not handle
    Unknown(String),
    /// The session already ended; the frame was not looked at
    Ignored,
}

/// The per-session protocol state machine.
///
/// `Protocol` owns the subscription registry, the report store and the
/// login flag. It is shared between the foreground command path and the
/// background receive task; every piece of state synchronizes itself.
#[derive(Debug)]
pub struct Protocol {
    logged_in: AtomicBool,
    state: Mutex<SessionState>,
    subscriptions: SubscriptionRegistry,
    reports: ReportStore,
}

impl Default for Protocol {
    fn default() -> Self {
        Self::new()
    }
}

impl Protocol {
    /// A fresh protocol for a session that is connecting. The login flag
    /// starts out `true`.
    pub fn new() -> Self {
        Self {
            logged_in: AtomicBool::new(true),
            state: Mutex::new(SessionState::Connecting),
            subscriptions: SubscriptionRegistry::new(),
            reports: ReportStore::new(),
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> SessionState {
        *self.lock_state()
    }

    // The login flag is only written while this lock is held.
    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Explicit logout: clears the login flag and ends the session.
    pub fn logout(&self) {
        let mut state = self.lock_state();
        self.logged_in.store(false, Ordering::SeqCst);
        *state = SessionState::Disconnected;
    }

    /// The transport went away. An errored session stays errored.
    pub fn mark_disconnected(&self) {
        let mut state = self.lock_state();
        self.logged_in.store(false, Ordering::SeqCst);
        if *state != SessionState::Errored {
            *state = SessionState::Disconnected;
        }
    }

    pub fn join(&self, topic: &str) {
        self.subscriptions.join(topic);
    }

    pub fn leave(&self, topic: &str) {
        self.subscriptions.leave(topic);
    }

    pub fn is_joined(&self, topic: &str) -> bool {
        self.subscriptions.is_joined(topic)
    }

    pub fn subscriptions(&self) -> &SubscriptionRegistry {
        &self.subscriptions
    }

    /// Reports received from `user` on `topic`, in arrival order.
    pub fn reports(&self, topic: &str, user: &str) -> Vec<EventReport> {
        self.reports.fetch(topic, user)
    }

    pub fn report_store(&self) -> &ReportStore {
        &self.reports
    }

    /// Parse and dispatch one inbound frame.
    ///
    /// Content problems (no command line, missing header, bad timestamp) are
    /// logged and reported as [`Inbound::Dropped`]; they never end the
    /// session.
    pub fn handle_inbound_frame(&self, text: &str) -> Inbound {
        if is_terminal(self.state()) {
            debug!("session ended, ignoring inbound frame");
            return Inbound::Ignored;
        }

        let frame = match codec::parse(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "dropping unparseable frame");
                return Inbound::Dropped(e);
            }
        };
        debug!(command = %frame.command, headers = frame.headers.len(), "frame received");

        match frame.kind() {
            Ok(Command::Connected) => {
                {
                    let mut state = self.lock_state();
                    // logout may have landed since the check above
                    if is_terminal(*state) {
                        return Inbound::Ignored;
                    }
                    self.logged_in.store(true, Ordering::SeqCst);
                    *state = SessionState::Connected;
                }
                info!("connected to server");
                Inbound::Connected
            }
            Ok(Command::Message) => match self.store_message(&frame) {
                Ok((destination, user)) => Inbound::Stored { destination, user },
                Err(e) => {
                    warn!(error = %e, "dropping MESSAGE frame");
                    Inbound::Dropped(e)
                }
            },
            Ok(Command::Receipt) => {
                let receipt = frame.get_header("receipt-id").map(str::to_string);
                debug!(receipt = ?receipt, "receipt received");
                Inbound::Receipt(receipt)
            }
            Ok(Command::Error) => {
                {
                    let mut state = self.lock_state();
                    self.logged_in.store(false, Ordering::SeqCst);
                    *state = SessionState::Errored;
                }
                let message = frame.get_header("message").map(str::to_string);
                match &message {
                    Some(reason) => error!(reason = %reason, "server sent ERROR frame"),
                    None => error!("server sent ERROR frame"),
                }
                Inbound::ServerError(message)
            }
            _ => {
                warn!(command = %frame.command, "unknown command");
                Inbound::Unknown(frame.command)
            }
        }
    }

    fn store_message(&self, frame: &Frame) -> Result<(String, String), FrameError> {
        let destination = frame
            .get_header("destination")
            .ok_or_else(|| FrameError::MissingHeader("destination".into()))?;
        let user =
            report_user(&frame.body).ok_or_else(|| FrameError::MissingField("user".into()))?;
        let report = parse_report(&frame.body)?;
        debug!(
            destination = %destination,
            user = %user,
            event = %report.event_name,
            "storing report"
        );
        self.reports.append(destination, &user, report);
        Ok((destination.to_string(), user))
    }
}

fn is_terminal(state: SessionState) -> bool {
    matches!(state, SessionState::Errored | SessionState::Disconnected)
}
