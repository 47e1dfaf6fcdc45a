//! Per-session progress stream.
//!
//! The stream is a pure relay: producers publish events keyed by session id
//! and the stream forwards them to at most one attached sink. Events
//! published while no sink is attached are dropped, never buffered.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::StreamError;
use crate::event::{EventKind, ProgressEvent};
use crate::types::SessionId;

/// Identifies one attachment of a sink to a session.
pub type SinkId = u64;

/// Receiver side of a session's feed.
pub trait EventSink: Send + Sync {
    fn deliver(&self, event: &ProgressEvent) -> Result<(), StreamError>;
}

impl EventSink for mpsc::UnboundedSender<ProgressEvent> {
    fn deliver(&self, event: &ProgressEvent) -> Result<(), StreamError> {
        self.send(event.clone()).map_err(|_| StreamError::SinkClosed)
    }
}

struct Slot {
    id: SinkId,
    sink: Arc<dyn EventSink>,
}

/// Session id → sink relay shared by every running session.
pub struct ProgressStream {
    slots: RwLock<HashMap<SessionId, Slot>>,
    next_id: AtomicU64,
}

impl Default for ProgressStream {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressStream {
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Attach a sink to a session, replacing any previous one.
    ///
    /// The sink receives a `Connected` event before anything else. Attaching
    /// before a producer exists is fine.
    pub fn attach(&self, session_id: &str, sink: Arc<dyn EventSink>) -> SinkId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let connected = ProgressEvent::Connected {
            message: "Stream connected".to_string(),
        };
        if let Err(e) = sink.deliver(&connected) {
            warn!(session_id = %session_id, error = %e, "Sink rejected connect event");
            return id;
        }

        let previous = self
            .slots
            .write()
            .insert(session_id.to_string(), Slot { id, sink });
        if previous.is_some() {
            debug!(session_id = %session_id, "Replaced existing stream sink");
        }
        debug!(session_id = %session_id, sink_id = id, "Stream sink attached");
        id
    }

    /// Detach whatever sink is attached to a session.
    pub fn detach(&self, session_id: &str) -> bool {
        let removed = self.slots.write().remove(session_id).is_some();
        if removed {
            debug!(session_id = %session_id, "Stream sink detached");
        }
        removed
    }

    /// Detach a specific attachment. A newer attachment for the same session
    /// is left alone.
    pub fn detach_sink(&self, session_id: &str, sink_id: SinkId) -> bool {
        let mut slots = self.slots.write();
        match slots.get(session_id) {
            Some(slot) if slot.id == sink_id => {
                slots.remove(session_id);
                debug!(session_id = %session_id, sink_id, "Stream sink detached");
                true
            }
            _ => false,
        }
    }

    pub fn has_sink(&self, session_id: &str) -> bool {
        self.slots.read().contains_key(session_id)
    }

    pub fn sink_count(&self) -> usize {
        self.slots.read().len()
    }

    /// Forward an event to the session's sink, if any.
    ///
    /// A failed delivery detaches the broken sink and is only logged.
    pub fn publish(&self, session_id: &str, event: ProgressEvent) {
        let target = {
            let slots = self.slots.read();
            slots.get(session_id).map(|slot| (slot.id, slot.sink.clone()))
        };

        let Some((sink_id, sink)) = target else {
            return;
        };

        if let Err(e) = sink.deliver(&event) {
            warn!(session_id = %session_id, error = %e, "Dropping broken stream sink");
            self.detach_sink(session_id, sink_id);
        }
    }

    /// A producer handle bound to one session.
    pub fn emitter(self: &Arc<Self>, session_id: impl Into<SessionId>) -> ProgressEmitter {
        ProgressEmitter {
            stream: Arc::clone(self),
            session_id: session_id.into(),
        }
    }
}

/// Session-bound producer with one method per event variant.
#[derive(Clone)]
pub struct ProgressEmitter {
    stream: Arc<ProgressStream>,
    session_id: SessionId,
}

impl ProgressEmitter {
    /// An emitter on a private stream nobody listens to.
    pub fn unobserved(session_id: impl Into<SessionId>) -> Self {
        Arc::new(ProgressStream::new()).emitter(session_id)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn stream(&self) -> &Arc<ProgressStream> {
        &self.stream
    }

    pub fn publish(&self, event: ProgressEvent) {
        self.stream.publish(&self.session_id, event);
    }

    pub fn status(&self, message: impl Into<String>, progress: Option<u8>) {
        self.publish(ProgressEvent::Status {
            message: message.into(),
            progress: progress.map(|p| p.min(100)),
        });
    }

    pub fn file(&self, path: impl Into<String>, content: impl Into<String>) {
        self.publish(ProgressEvent::FileEmitted {
            path: path.into(),
            content: content.into(),
        });
    }

    pub fn terminal(&self, output: impl Into<String>, is_error: bool) {
        self.publish(ProgressEvent::TerminalOutput {
            output: output.into(),
            is_error,
        });
    }

    pub fn compile_start(&self) {
        self.publish(ProgressEvent::CompileStarted);
    }

    pub fn compile_result(&self, success: bool, errors: Option<String>, warnings: Option<String>) {
        self.publish(ProgressEvent::CompileResult {
            success,
            errors,
            warnings,
        });
    }

    pub fn fixing(&self, attempt: u32, max_attempts: u32) {
        self.publish(ProgressEvent::Fixing {
            attempt,
            max_attempts,
        });
    }

    pub fn complete(&self, data: serde_json::Value) {
        self.publish(ProgressEvent::Complete { data });
    }

    pub fn error(&self, message: impl Into<String>) {
        self.publish(ProgressEvent::Error {
            error: message.into(),
        });
    }
}

/// Sink that keeps every delivered event in memory.
///
/// Used by tests and by the one-shot CLI. `close()` makes further deliveries
/// fail, simulating a dropped connection.
#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<ProgressEvent>>>,
    closed: Arc<AtomicBool>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().clone()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.lock().iter().map(|e| e.kind()).collect()
    }

    pub fn last(&self) -> Option<ProgressEvent> {
        self.events.lock().last().cloned()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.events.lock().iter().filter(|e| e.kind() == kind).count()
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

impl EventSink for RecordingSink {
    fn deliver(&self, event: &ProgressEvent) -> Result<(), StreamError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StreamError::SinkClosed);
        }
        self.events.lock().push(event.clone());
        Ok(())
    }
}
