use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

use crate::codec::FrameCodec;
use crate::error::ClientError;
use crate::events::load_events;
use crate::frame::{Command, Frame};
use crate::protocol::{Protocol, SessionState};
use crate::report::render_report;
use crate::summary::Summary;

type FrameSink<T> = SplitSink<Framed<T, FrameCodec>, Frame>;
type FrameStream<T> = SplitStream<Framed<T, FrameCodec>>;

/// Options applied when a session is started.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Value of the CONNECT `accept-version` header.
    pub accept_version: String,
    /// Value of the CONNECT `host` header.
    pub host: String,
    /// How long logout waits for the receive task before aborting it.
    pub disconnect_timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            accept_version: "1.2".to_string(),
            host: "stomp.cs.bgu.ac.il".to_string(),
            disconnect_timeout: Duration::from_secs(5),
        }
    }
}

impl SessionOptions {
    pub fn with_accept_version(mut self, version: impl Into<String>) -> Self {
        self.accept_version = version.into();
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_disconnect_timeout(mut self, timeout: Duration) -> Self {
        self.disconnect_timeout = timeout;
        self
    }
}

/// How the receive task ended when a session was released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverExit {
    /// The loop stopped by itself: login flag cleared, ERROR, or end of stream
    Finished,
    /// Still running after `disconnect_timeout`, so it was aborted
    Aborted,
}

/// Destination for a channel name: channels live under `/`.
pub fn destination_for(channel: &str) -> String {
    if channel.starts_with('/') {
        channel.to_string()
    } else {
        format!("/{}", channel)
    }
}

/// One logged-in session with the broker.
///
/// `Session` owns the write half of the connection and the shared
/// [`Protocol`]. A background task reads frames and feeds them to the
/// protocol until the login flag is cleared or the connection drops.
/// Subscription and receipt ids are allocated from a per-session counter.
pub struct Session<T> {
    user: String,
    options: SessionOptions,
    protocol: Arc<Protocol>,
    sink: Mutex<FrameSink<T>>,
    receiver: Option<JoinHandle<()>>,
    next_id: AtomicU64,
    /// destination -> subscription id
    channel_ids: std::sync::Mutex<HashMap<String, u64>>,
}

impl Session<TcpStream> {
    /// Open a TCP connection to `addr` and log in as `login`.
    ///
    /// The CONNECT frame is sent before this returns; CONNECTED (or ERROR)
    /// is handled by the receive task when it arrives.
    pub async fn connect(
        addr: impl ToSocketAddrs,
        login: &str,
        passcode: &str,
        options: SessionOptions,
    ) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true).ok();
        Self::start(stream, login, passcode, options).await
    }
}

impl<T> Session<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Start a session over an already-open transport.
    pub async fn start(
        io: T,
        login: &str,
        passcode: &str,
        options: SessionOptions,
    ) -> Result<Self, ClientError> {
        let (mut sink, stream) = Framed::new(io, FrameCodec::new()).split();

        let connect = Frame::new(Command::Connect)
            .header("accept-version", &options.accept_version)
            .header("host", &options.host)
            .header("login", login)
            .header("passcode", passcode);
        sink.send(connect).await?;
        info!(user = %login, "CONNECT sent");

        let protocol = Arc::new(Protocol::new());
        let receiver = tokio::spawn(receive_loop(stream, protocol.clone()));

        Ok(Self {
            user: login.to_string(),
            options,
            protocol,
            sink: Mutex::new(sink),
            receiver: Some(receiver),
            next_id: AtomicU64::new(0),
            channel_ids: std::sync::Mutex::new(HashMap::new()),
        })
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn protocol(&self) -> &Arc<Protocol> {
        &self.protocol
    }

    pub fn is_logged_in(&self) -> bool {
        self.protocol.is_logged_in()
    }

    pub fn state(&self) -> SessionState {
        self.protocol.state()
    }

    fn allocate_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn channel_ids(&self) -> MutexGuard<'_, HashMap<String, u64>> {
        self.channel_ids.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_logged_in(&self) -> Result<(), ClientError> {
        if self.protocol.is_logged_in() {
            Ok(())
        } else {
            Err(ClientError::NotConnected)
        }
    }

    async fn send_frame(&self, frame: Frame) -> Result<(), ClientError> {
        debug!(command = %frame.command, "sending frame");
        self.sink.lock().await.send(frame).await?;
        Ok(())
    }

    /// Subscribe to `channel` and return the subscription id used.
    ///
    /// Fails with [`ClientError::DuplicateSubscription`] when the channel is
    /// already joined.
    pub async fn join(&self, channel: &str) -> Result<u64, ClientError> {
        self.ensure_logged_in()?;
        let destination = destination_for(channel);
        if self.protocol.is_joined(&destination) {
            return Err(ClientError::DuplicateSubscription(destination));
        }

        let id = self.allocate_id();
        let receipt = self.allocate_id();
        let frame = Frame::new(Command::Subscribe)
            .header("destination", &destination)
            .header("id", id.to_string())
            .header("receipt", receipt.to_string());
        self.send_frame(frame).await?;

        self.channel_ids().insert(destination.clone(), id);
        self.protocol.join(&destination);
        info!(destination = %destination, id, "joined channel");
        Ok(id)
    }

    /// Unsubscribe from `channel`.
    ///
    /// Fails with [`ClientError::UnsubscribedTopic`] when the channel is not
    /// joined.
    pub async fn exit(&self, channel: &str) -> Result<(), ClientError> {
        self.ensure_logged_in()?;
        let destination = destination_for(channel);
        let id = self.channel_ids().get(&destination).copied();
        let id = match id {
            Some(id) if self.protocol.is_joined(&destination) => id,
            _ => return Err(ClientError::UnsubscribedTopic(destination)),
        };

        let receipt = self.allocate_id();
        let frame = Frame::new(Command::Unsubscribe)
            .header("id", id.to_string())
            .header("receipt", receipt.to_string());
        self.send_frame(frame).await?;

        self.protocol.leave(&destination);
        self.channel_ids().remove(&destination);
        info!(destination = %destination, id, "left channel");
        Ok(())
    }

    /// Send every event of the document at `path` to its channel, one SEND
    /// frame per event. Returns how many events were sent.
    pub async fn report(&self, path: impl AsRef<Path>) -> Result<usize, ClientError> {
        self.ensure_logged_in()?;
        let file = load_events(path)?;
        let destination = destination_for(&file.channel_name);
        for event in &file.events {
            let frame = Frame::new(Command::Send)
                .header("destination", &destination)
                .set_body(render_report(&self.user, event));
            self.send_frame(frame).await?;
        }
        info!(destination = %destination, count = file.events.len(), "reports sent");
        Ok(file.events.len())
    }

    /// Summary of what `user` reported on `channel` during this session.
    pub fn summary(&self, channel: &str, user: &str) -> Summary {
        let destination = destination_for(channel);
        let reports = self.protocol.reports(&destination, user);
        Summary::new(destination.trim_start_matches('/'), user, reports)
    }

    /// Log out: clear the login flag, send DISCONNECT, then wait for the
    /// receive task before the session is released.
    ///
    /// The receive task normally ends when the broker's answer to DISCONNECT
    /// arrives; a silent broker leaves it to be aborted.
    pub async fn logout(mut self) -> Result<ReceiverExit, ClientError> {
        self.protocol.logout();
        let receipt = self.allocate_id();
        let frame = Frame::new(Command::Disconnect).header("receipt", receipt.to_string());
        let sent = self.send_frame(frame).await;
        let exit = self.shutdown().await;
        info!(user = %self.user, ?exit, "logged out");
        sent.map(|()| exit)
    }

    /// Release a session whose receive task already stopped (ERROR frame or
    /// lost connection) without sending anything.
    pub async fn close(mut self) -> ReceiverExit {
        self.protocol.mark_disconnected();
        self.shutdown().await
    }

    async fn shutdown(&mut self) -> ReceiverExit {
        let mut exit = ReceiverExit::Finished;
        if let Some(mut handle) = self.receiver.take() {
            match tokio::time::timeout(self.options.disconnect_timeout, &mut handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "receive task failed"),
                Err(_) => {
                    warn!("receive task still running after disconnect timeout, aborting");
                    handle.abort();
                    exit = ReceiverExit::Aborted;
                }
            }
        }
        if let Err(e) = self.sink.lock().await.close().await {
            debug!(error = %e, "closing connection");
        }
        exit
    }
}

impl<T> Drop for Session<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.receiver.take() {
            handle.abort();
        }
    }
}

/// Background receive loop: poll the login flag, read one frame, dispatch.
async fn receive_loop<T>(mut stream: FrameStream<T>, protocol: Arc<Protocol>)
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        if !protocol.is_logged_in() {
            debug!("login flag cleared, receive loop stopping");
            break;
        }
        match stream.next().await {
            Some(Ok(text)) => {
                protocol.handle_inbound_frame(&text);
            }
            Some(Err(e)) => {
                if protocol.is_logged_in() {
                    warn!(error = %e, "disconnected from server");
                }
                protocol.mark_disconnected();
                break;
            }
            None => {
                if protocol.is_logged_in() {
                    warn!("disconnected from server");
                }
                protocol.mark_disconnected();
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destination_prefix() {
        assert_eq!(destination_for("police"), "/police");
        assert_eq!(destination_for("/police"), "/police");
    }

    #[test]
    fn options_builder() {
        let options = SessionOptions::default()
            .with_host("localhost")
            .with_accept_version("1.1")
            .with_disconnect_timeout(Duration::from_millis(250));
        assert_eq!(options.host, "localhost");
        assert_eq!(options.accept_version, "1.1");
        assert_eq!(options.disconnect_timeout, Duration::from_millis(250));
    }
}
