//! Realtime session over a [`Transport`].
//!
//! A session sends its configuration as `session.update` as soon as the
//! transport is up, then keeps exactly one receive outstanding until it is
//! torn down. Teardown happens once: on [`Session::disconnect`], on a
//! transport failure, or on a frame that cannot be decoded.
//!
//! ```rust,ignore
//! let session = Session::create(transport, SessionConfiguration::voice_assistant());
//! let mut events = session.events();
//! session.create_response(None).await?;
//! while let Some(event) = events.recv().await {
//!     if let ServerEvent::ResponseTranscriptDelta { delta } = event {
//!         print!("{}", delta);
//!     }
//! }
//! ```

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::codec;
use crate::command::{ClientCommand, generate_event_id};
use crate::error::{Error, Result};
use crate::event::ServerEvent;
use crate::transport::{Frame, Transport};
use crate::types::{ConversationItem, ResponseOptions, SessionConfiguration};

/// Disconnects within this long after creation are logged as early disconnects.
pub const EARLY_DISCONNECT_THRESHOLD: Duration = Duration::from_secs(3);

/// Events kept for the first [`Session::events`] call. Older events are
/// dropped once the backlog is full.
pub const MAX_PENDING_EVENTS: usize = 256;

/// A realtime session.
///
/// `Session` is `Send + Sync`; share it behind an `Arc` to send from several
/// tasks while another task iterates [`Session::events`].
pub struct Session {
    shared: Arc<Shared>,
}

struct Shared {
    transport: Arc<dyn Transport>,
    configuration: SessionConfiguration,
    created_at: Instant,
    state: Mutex<State>,
    outbound: mpsc::UnboundedSender<Outbound>,
    shutdown: CancellationToken,
}

/// Mutable session state. Only touched under `Shared::state`.
struct State {
    torn_down: bool,
    /// Sender of the current subscription. Dropping it ends the stream.
    subscriber: Option<mpsc::UnboundedSender<ServerEvent>>,
    /// Events published before the first `events()` call, capped at
    /// `MAX_PENDING_EVENTS`. `None` once claimed or torn down.
    backlog: Option<VecDeque<ServerEvent>>,
}

struct Outbound {
    text: String,
    done: oneshot::Sender<Result<()>>,
}

enum TeardownReason {
    Requested,
    Dropped,
    Transport(Error),
    Protocol(Error),
}

impl Session {
    /// Creates a session on `transport` and starts it in the background.
    ///
    /// Returns immediately; the `session.update` handshake is the first frame
    /// written once the transport has resumed, ahead of any [`Session::send`].
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn create(transport: Arc<dyn Transport>, configuration: SessionConfiguration) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        let shared = Arc::new(Shared {
            transport,
            configuration,
            created_at: Instant::now(),
            state: Mutex::new(State {
                torn_down: false,
                subscriber: None,
                backlog: Some(VecDeque::new()),
            }),
            outbound: outbound_tx,
            shutdown: CancellationToken::new(),
        });

        tokio::spawn(run(shared.clone(), outbound_rx));

        Self { shared }
    }

    /// Returns the configuration the session was created with.
    pub fn configuration(&self) -> &SessionConfiguration {
        &self.shared.configuration
    }

    /// Returns true once the session has been torn down.
    pub fn is_torn_down(&self) -> bool {
        self.shared.is_torn_down()
    }

    /// Time since the session was created.
    pub fn uptime(&self) -> Duration {
        self.shared.created_at.elapsed()
    }

    /// Returns the stream of server events.
    ///
    /// The first call starts with the events published since creation (at
    /// most [`MAX_PENDING_EVENTS`], newest kept). Each later call starts a
    /// new subscription and ends the previous stream. Iterating two streams
    /// concurrently is not supported. After teardown the returned stream is
    /// already finished.
    pub fn events(&self) -> EventStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.shared.state.lock();
        if state.torn_down {
            return EventStream::new(rx);
        }
        for event in state.backlog.take().into_iter().flatten() {
            let _ = tx.send(event);
        }
        state.subscriber = Some(tx);
        EventStream::new(rx)
    }

    /// Serializes `command` and writes it as one frame.
    ///
    /// After teardown this is a logged no-op returning `Ok(())`. Encoding
    /// and write failures are returned to the caller and leave the session
    /// running.
    pub async fn send<C: Serialize + ?Sized>(&self, command: &C) -> Result<()> {
        if self.shared.is_torn_down() {
            debug!("Session torn down, dropping outbound command");
            return Ok(());
        }

        let text = codec::encode(command).inspect_err(|e| {
            warn!("Failed to encode outbound command: {}", e);
        })?;
        debug!("Sending event: {}", truncate_for_log(&text, 500));

        let (done_tx, done_rx) = oneshot::channel();
        if self
            .shared
            .outbound
            .send(Outbound {
                text,
                done: done_tx,
            })
            .is_err()
        {
            debug!("Writer stopped, dropping outbound command");
            return Ok(());
        }

        match done_rx.await {
            Ok(result) => result,
            Err(_) => {
                debug!("Session torn down before command was written");
                Ok(())
            }
        }
    }

    /// Sends a raw JSON event.
    pub async fn send_raw(&self, event: serde_json::Value) -> Result<()> {
        self.send(&event).await
    }

    /// Tears the session down: stops the stream and cancels the transport.
    /// Calling it again has no effect.
    pub async fn disconnect(&self) {
        self.shared.teardown(TeardownReason::Requested).await;
    }

    // === Convenience commands ===

    /// Sends a new `session.update`. The server acknowledges it with
    /// `session.updated`; [`Session::configuration`] is not changed.
    pub async fn update_session(&self, configuration: &SessionConfiguration) -> Result<()> {
        self.send_command(ClientCommand::session_update(configuration.clone()))
            .await
    }

    /// Appends raw audio (in the session's input format) to the input buffer.
    pub async fn append_audio(&self, audio: &[u8]) -> Result<()> {
        self.send_command(ClientCommand::append_audio(audio)).await
    }

    /// Appends base64-encoded audio to the input buffer.
    pub async fn append_audio_base64(&self, audio_base64: &str) -> Result<()> {
        self.send_command(ClientCommand::append_audio_base64(audio_base64))
            .await
    }

    /// Commits the input buffer as a user message (manual turn mode).
    pub async fn commit_input(&self) -> Result<()> {
        self.send_command(ClientCommand::commit_input()).await
    }

    pub async fn clear_input(&self) -> Result<()> {
        self.send_command(ClientCommand::clear_input()).await
    }

    pub async fn add_user_message(&self, text: &str) -> Result<()> {
        self.send_command(ClientCommand::create_item(ConversationItem::user_text(text)))
            .await
    }

    /// Returns the result of a function call requested via
    /// `response.function_call_arguments.done`.
    pub async fn add_function_call_output(&self, call_id: &str, output: &str) -> Result<()> {
        self.send_command(ClientCommand::create_item(
            ConversationItem::function_call_output(call_id, output),
        ))
        .await
    }

    pub async fn create_response(&self, options: Option<ResponseOptions>) -> Result<()> {
        self.send_command(ClientCommand::create_response(options))
            .await
    }

    pub async fn cancel_response(&self) -> Result<()> {
        self.send_command(ClientCommand::cancel_response()).await
    }

    async fn send_command(&self, command: ClientCommand) -> Result<()> {
        self.send(&command.with_event_id(generate_event_id())).await
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.shared.is_torn_down() {
            return;
        }
        let shared = self.shared.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    shared.teardown(TeardownReason::Dropped).await;
                });
            }
            Err(_) => shared.shutdown.cancel(),
        }
    }
}

impl Shared {
    fn is_torn_down(&self) -> bool {
        self.state.lock().torn_down
    }

    /// Resumes the transport and writes the handshake.
    async fn start(&self) -> Result<()> {
        self.transport.resume().await?;

        let handshake = ClientCommand::session_update(self.configuration.clone());
        match codec::encode(&handshake) {
            Ok(text) => {
                debug!("Sending handshake: {}", truncate_for_log(&text, 500));
                if let Err(e) = self.transport.send_text(text).await {
                    error!("Failed to send session.update: {}", e);
                }
            }
            Err(e) => error!("Failed to encode session.update: {}", e),
        }
        Ok(())
    }

    /// Hands an event to the current subscriber. Returns false if the
    /// session was torn down meanwhile; the event is discarded.
    fn publish(&self, event: ServerEvent) -> bool {
        let mut state = self.state.lock();
        if state.torn_down {
            debug!("Discarding {} received during teardown", event.event_type());
            return false;
        }
        if let Some(ref subscriber) = state.subscriber {
            if subscriber.send(event).is_err() {
                debug!("Event stream dropped by consumer");
            }
        } else if let Some(ref mut backlog) = state.backlog {
            if backlog.len() == MAX_PENDING_EVENTS {
                if let Some(dropped) = backlog.pop_front() {
                    debug!("No subscriber yet, dropping {}", dropped.event_type());
                }
            }
            backlog.push_back(event);
        }
        true
    }

    async fn teardown(&self, reason: TeardownReason) {
        {
            let mut state = self.state.lock();
            if state.torn_down {
                return;
            }
            state.torn_down = true;
            state.subscriber = None;
            state.backlog = None;
        }
        self.shutdown.cancel();

        let uptime = self.created_at.elapsed();
        match &reason {
            TeardownReason::Requested => info!("Realtime session disconnected after {:?}", uptime),
            TeardownReason::Dropped => debug!("Realtime session dropped after {:?}", uptime),
            TeardownReason::Transport(e) if uptime < EARLY_DISCONNECT_THRESHOLD => {
                warn!("Realtime session disconnected early ({:?} after creation): {}", uptime, e)
            }
            TeardownReason::Transport(e) => {
                error!("Realtime session lost after {:?}: {}", uptime, e)
            }
            TeardownReason::Protocol(e) => {
                warn!("Realtime session closed on unreadable frame: {}", e)
            }
        }

        self.transport.cancel().await;
    }
}

async fn run(shared: Arc<Shared>, outbound: mpsc::UnboundedReceiver<Outbound>) {
    let started = tokio::select! {
        _ = shared.shutdown.cancelled() => return,
        started = shared.start() => started,
    };
    if let Err(e) = started {
        shared.teardown(TeardownReason::Transport(e)).await;
        return;
    }

    tokio::spawn(write_loop(shared.clone(), outbound));
    receive_loop(shared).await;
}

async fn receive_loop(shared: Arc<Shared>) {
    loop {
        let received = tokio::select! {
            _ = shared.shutdown.cancelled() => return,
            received = shared.transport.receive() => received,
        };

        let text = match received {
            Ok(Frame::Text(text)) => text,
            Ok(Frame::Binary(data)) => match String::from_utf8(data) {
                Ok(text) => text,
                Err(_) => {
                    let e = Error::Protocol("binary frame is not UTF-8 text".to_string());
                    shared.teardown(TeardownReason::Protocol(e)).await;
                    return;
                }
            },
            Err(e) => {
                shared.teardown(TeardownReason::Transport(e)).await;
                return;
            }
        };
        debug!("Received: {}", truncate_for_log(&text, 1000));

        match codec::decode(&text) {
            Ok(Some(event)) => {
                if !shared.publish(event) {
                    return;
                }
            }
            Ok(None) => {}
            Err(e) => {
                shared.teardown(TeardownReason::Protocol(e)).await;
                return;
            }
        }
    }
}

async fn write_loop(shared: Arc<Shared>, mut outbound: mpsc::UnboundedReceiver<Outbound>) {
    loop {
        let next = tokio::select! {
            _ = shared.shutdown.cancelled() => return,
            next = outbound.recv() => next,
        };
        let Some(Outbound { text, done }) = next else {
            return;
        };
        if shared.is_torn_down() {
            debug!("Dropping frame queued before teardown");
            return;
        }

        // Abandon a stalled write on teardown so `cancel` can take the sink.
        let result = tokio::select! {
            _ = shared.shutdown.cancelled() => {
                debug!("Write abandoned on teardown");
                return;
            }
            result = shared.transport.send_text(text) => result,
        };
        if let Err(ref e) = result {
            error!("Write error: {}", e);
        }
        let _ = done.send(result);
    }
}

/// Stream of [`ServerEvent`]s returned by [`Session::events`].
///
/// Ends (yields `None`) once the session is torn down and buffered events
/// are drained, or when a newer subscription replaces it.
pub struct EventStream {
    inner: UnboundedReceiverStream<ServerEvent>,
}

impl EventStream {
    fn new(rx: mpsc::UnboundedReceiver<ServerEvent>) -> Self {
        Self {
            inner: UnboundedReceiverStream::new(rx),
        }
    }

    /// Receives the next event.
    pub async fn recv(&mut self) -> Option<ServerEvent> {
        self.inner.next().await
    }
}

impl Stream for EventStream {
    type Item = ServerEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}
