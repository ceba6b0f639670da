//! Voice collaborator: the song request queue and its event fan-out.
//!
//! Audio streaming itself lives outside the bot. The command layer only sees
//! the [`VoiceQueue`] operations and reacts to [`VoiceEvent`]s delivered
//! through the [`VoiceEventBus`].
//!
//! [`MemoryVoiceQueue`] is an in-process queue that tracks state and emits
//! events without producing audio. Front ends without a real voice backend
//! use it, and so do the tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use nyx_types::{ChannelId, User};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Queue-assigned request identifier.
pub type VoiceRequestId = u64;

/// One queued song.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceRequest {
    pub requester: User,
    /// Text channel the request came from. Announcements go there.
    pub requested_channel: ChannelId,
    pub url: String,
    /// Start playback immediately when nothing is playing.
    pub start_playing: bool,
}

/// Something that happened to the voice connection or queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceEvent {
    JoinedChannel(ChannelId),
    LeftChannel,
    RequestStarted(VoiceRequest),
    RequestFinished(VoiceRequest),
    RequestPaused(VoiceRequest),
    RequestResumed(VoiceRequest),
    /// The last queued request finished or the queue was cleared.
    QueueFinished,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VoiceError {
    #[error("voice event handler `{0}` is already registered")]
    DuplicateHandler(String),

    #[error("not connected to a voice channel")]
    NotConnected,

    #[error("no voice request with id {0}")]
    UnknownRequest(VoiceRequestId),

    #[error("nothing is playing")]
    NothingPlaying,

    #[error("voice backend error: {0}")]
    Backend(String),
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Request-queue operations exposed by the voice backend.
#[async_trait]
pub trait VoiceQueue: Send + Sync {
    fn is_in_voice_channel(&self) -> bool;

    fn has_request(&self) -> bool;

    fn is_playing(&self) -> bool;

    fn is_paused(&self) -> bool;

    fn current_request(&self) -> Option<VoiceRequestId>;

    async fn add_request(&self, request: VoiceRequest) -> Result<VoiceRequestId, VoiceError>;

    /// Start playing the queue if it is idle.
    async fn play(&self) -> Result<(), VoiceError>;

    async fn pause(&self) -> Result<(), VoiceError>;

    async fn resume(&self) -> Result<(), VoiceError>;

    async fn stop_and_clear(&self) -> Result<(), VoiceError>;

    /// Remove a request; removing the current one skips to the next.
    async fn remove_request(&self, id: VoiceRequestId) -> Result<(), VoiceError>;
}

/// Receives voice events. Names are unique per bus.
#[async_trait]
pub trait VoiceEventHandler: Send + Sync {
    fn name(&self) -> &str;

    async fn handle(&self, event: &VoiceEvent) -> anyhow::Result<()>;
}

// ---------------------------------------------------------------------------
// Event bus
// ---------------------------------------------------------------------------

/// Fans voice events out to registered handlers in registration order.
#[derive(Default)]
pub struct VoiceEventBus {
    handlers: RwLock<Vec<Arc<dyn VoiceEventHandler>>>,
}

impl VoiceEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registering a second handler under the same name is a wiring bug.
    pub fn register(&self, handler: Arc<dyn VoiceEventHandler>) -> Result<(), VoiceError> {
        let mut handlers = self.handlers.write().unwrap_or_else(|e| e.into_inner());
        if handlers.iter().any(|h| h.name() == handler.name()) {
            return Err(VoiceError::DuplicateHandler(handler.name().to_string()));
        }
        debug!(handler = handler.name(), "voice event handler registered");
        handlers.push(handler);
        Ok(())
    }

    pub fn unregister(&self, name: &str) -> bool {
        let mut handlers = self.handlers.write().unwrap_or_else(|e| e.into_inner());
        let before = handlers.len();
        handlers.retain(|h| h.name() != name);
        handlers.len() < before
    }

    pub fn len(&self) -> usize {
        self.handlers.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `event` to every handler. Handler failures are logged.
    pub async fn emit(&self, event: &VoiceEvent) {
        let handlers: Vec<_> = self
            .handlers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        for handler in handlers {
            if let Err(e) = handler.handle(event).await {
                warn!(handler = handler.name(), error = %e, "voice event handler failed");
            }
        }
    }
}

impl std::fmt::Debug for VoiceEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.handlers.read().unwrap_or_else(|e| e.into_inner());
        f.debug_struct("VoiceEventBus")
            .field(
                "handlers",
                &handlers.iter().map(|h| h.name().to_string()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

// ---------------------------------------------------------------------------
// In-memory queue
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct QueueState {
    connected: Option<ChannelId>,
    pending: VecDeque<(VoiceRequestId, VoiceRequest)>,
    current: Option<(VoiceRequestId, VoiceRequest)>,
    paused: bool,
    next_id: VoiceRequestId,
}

impl QueueState {
    /// Move the next pending request into `current`, returning the events
    /// this produced.
    fn advance(&mut self) -> Vec<VoiceEvent> {
        self.paused = false;
        match self.pending.pop_front() {
            Some((id, request)) => {
                self.current = Some((id, request.clone()));
                vec![VoiceEvent::RequestStarted(request)]
            }
            None => {
                self.current = None;
                vec![VoiceEvent::QueueFinished]
            }
        }
    }
}

/// Voice queue that keeps state in memory and emits events on the bus.
#[derive(Debug)]
pub struct MemoryVoiceQueue {
    state: Mutex<QueueState>,
    events: Arc<VoiceEventBus>,
}

impl MemoryVoiceQueue {
    pub fn new(events: Arc<VoiceEventBus>) -> Self {
        Self {
            state: Mutex::new(QueueState {
                next_id: 1,
                ..QueueState::default()
            }),
            events,
        }
    }

    /// Record a connection to `channel`.
    pub async fn connect(&self, channel: ChannelId) {
        self.lock().connected = Some(channel.clone());
        info!(channel = %channel, "joined voice channel");
        self.events.emit(&VoiceEvent::JoinedChannel(channel)).await;
    }

    /// Drop the connection. Playback stops but the queue is kept.
    pub async fn disconnect(&self) {
        {
            let mut state = self.lock();
            if state.connected.take().is_none() {
                return;
            }
            if let Some((id, request)) = state.current.take() {
                state.pending.push_front((id, request));
            }
            state.paused = false;
        }
        info!("left voice channel");
        self.events.emit(&VoiceEvent::LeftChannel).await;
    }

    /// The current request ended on its own.
    pub async fn finish_current(&self) -> Result<(), VoiceError> {
        let events = {
            let mut state = self.lock();
            let (_, finished) = state.current.take().ok_or(VoiceError::NothingPlaying)?;
            let mut events = vec![VoiceEvent::RequestFinished(finished)];
            events.extend(state.advance());
            events
        };
        self.emit_all(events).await;
        Ok(())
    }

    /// Requests waiting behind the current one.
    pub fn pending(&self) -> Vec<VoiceRequest> {
        self.lock().pending.iter().map(|(_, r)| r.clone()).collect()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn emit_all(&self, events: Vec<VoiceEvent>) {
        for event in &events {
            self.events.emit(event).await;
        }
    }
}

#[async_trait]
impl VoiceQueue for MemoryVoiceQueue {
    fn is_in_voice_channel(&self) -> bool {
        self.lock().connected.is_some()
    }

    fn has_request(&self) -> bool {
        let state = self.lock();
        state.current.is_some() || !state.pending.is_empty()
    }

    fn is_playing(&self) -> bool {
        self.lock().current.is_some()
    }

    fn is_paused(&self) -> bool {
        let state = self.lock();
        state.current.is_some() && state.paused
    }

    fn current_request(&self) -> Option<VoiceRequestId> {
        self.lock().current.as_ref().map(|(id, _)| *id)
    }

    async fn add_request(&self, request: VoiceRequest) -> Result<VoiceRequestId, VoiceError> {
        let (id, events) = {
            let mut state = self.lock();
            let id = state.next_id;
            state.next_id += 1;
            let start = request.start_playing && state.connected.is_some() && state.current.is_none();
            debug!(id, url = %request.url, start, "voice request queued");
            state.pending.push_back((id, request));
            let events = if start { state.advance() } else { Vec::new() };
            (id, events)
        };
        self.emit_all(events).await;
        Ok(id)
    }

    async fn play(&self) -> Result<(), VoiceError> {
        let events = {
            let mut state = self.lock();
            if state.connected.is_none() {
                return Err(VoiceError::NotConnected);
            }
            if state.current.is_some() || state.pending.is_empty() {
                return Ok(());
            }
            state.advance()
        };
        self.emit_all(events).await;
        Ok(())
    }

    async fn pause(&self) -> Result<(), VoiceError> {
        let event = {
            let mut state = self.lock();
            let request = state.current.as_ref().map(|(_, r)| r.clone());
            let request = request.ok_or(VoiceError::NothingPlaying)?;
            state.paused = true;
            VoiceEvent::RequestPaused(request)
        };
        self.events.emit(&event).await;
        Ok(())
    }

    async fn resume(&self) -> Result<(), VoiceError> {
        let event = {
            let mut state = self.lock();
            let request = state.current.as_ref().map(|(_, r)| r.clone());
            let request = request.ok_or(VoiceError::NothingPlaying)?;
            state.paused = false;
            VoiceEvent::RequestResumed(request)
        };
        self.events.emit(&event).await;
        Ok(())
    }

    async fn stop_and_clear(&self) -> Result<(), VoiceError> {
        {
            let mut state = self.lock();
            state.pending.clear();
            state.current = None;
            state.paused = false;
        }
        self.events.emit(&VoiceEvent::QueueFinished).await;
        Ok(())
    }

    async fn remove_request(&self, id: VoiceRequestId) -> Result<(), VoiceError> {
        let events = {
            let mut state = self.lock();
            match state.current.as_ref() {
                Some((current, _)) if *current == id => {
                    let mut events = Vec::new();
                    if let Some((_, finished)) = state.current.take() {
                        events.push(VoiceEvent::RequestFinished(finished));
                    }
                    events.extend(state.advance());
                    events
                }
                _ => {
                    let before = state.pending.len();
                    state.pending.retain(|(pending, _)| *pending != id);
                    if state.pending.len() == before {
                        return Err(VoiceError::UnknownRequest(id));
                    }
                    Vec::new()
                }
            }
        };
        self.emit_all(events).await;
        Ok(())
    }
}
