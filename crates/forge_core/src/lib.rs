//! # forge_core
//!
//! Shared model for Contract Forge: generation requests, progress events,
//! the per-session progress stream, and the active-session registry.
//!
//! # Architecture
//!
//! - **ProgressEvent**: the tagged event union pushed to listeners
//! - **ProgressStream**: session id → sink relay, at most one sink per session
//! - **ProgressEmitter**: session-bound producer handle with typed emitters
//! - **SessionRegistry**: rejects duplicate ids while a session is active
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use forge_core::{ProgressStream, RecordingSink};
//!
//! let stream = Arc::new(ProgressStream::new());
//! let sink = RecordingSink::new();
//! stream.attach("session-1", Arc::new(sink.clone()));
//!
//! let emitter = stream.emitter("session-1");
//! emitter.status("Compiling contract...", Some(50));
//!
//! assert_eq!(sink.events().len(), 2); // connected + status
//! ```

pub mod error;
pub mod event;
pub mod session;
pub mod stream;
pub mod types;

pub use error::{CoreError, CoreResult, StreamError};
pub use event::{EventKind, ProgressEvent};
pub use session::{GenerationSession, SessionGuard, SessionRegistry};
pub use stream::{EventSink, ProgressEmitter, ProgressStream, RecordingSink, SinkId};
pub use types::{ArtifactMetadata, GeneratedArtifact, GenerationRequest, SessionId};
