//! Progress events pushed to live listeners.
//!
//! The serialized form is the wire contract of the server-push feed: a JSON
//! object with a `type` discriminator, e.g.
//! `{"type":"status","message":"Compiling contract...","progress":50}`.

use serde::{Deserialize, Serialize};

/// One immutable message on a session's progress feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// First event a freshly attached sink receives
    Connected { message: String },
    /// Human-readable status with an optional 0..=100 progress figure
    Status {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        progress: Option<u8>,
    },
    /// A generated or patched project file
    #[serde(rename = "file")]
    FileEmitted { path: String, content: String },
    /// Raw terminal text (build output, loop narration)
    #[serde(rename = "terminal")]
    TerminalOutput {
        output: String,
        #[serde(rename = "isError", default)]
        is_error: bool,
    },
    /// A compile call is about to start
    #[serde(rename = "compile_start")]
    CompileStarted,
    /// Outcome of the compile call announced by the preceding `CompileStarted`
    CompileResult {
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        errors: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        warnings: Option<String>,
    },
    /// Fix generation for a failed attempt has started
    Fixing {
        attempt: u32,
        #[serde(rename = "maxAttempts")]
        max_attempts: u32,
    },
    /// Terminal: the session finished (successfully or not)
    Complete { data: serde_json::Value },
    /// Terminal: the session failed outright
    Error { error: String },
}

/// Payload-free discriminator, handy for asserting event order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Connected,
    Status,
    FileEmitted,
    TerminalOutput,
    CompileStarted,
    CompileResult,
    Fixing,
    Complete,
    Error,
}

impl ProgressEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Connected { .. } => EventKind::Connected,
            Self::Status { .. } => EventKind::Status,
            Self::FileEmitted { .. } => EventKind::FileEmitted,
            Self::TerminalOutput { .. } => EventKind::TerminalOutput,
            Self::CompileStarted => EventKind::CompileStarted,
            Self::CompileResult { .. } => EventKind::CompileResult,
            Self::Fixing { .. } => EventKind::Fixing,
            Self::Complete { .. } => EventKind::Complete,
            Self::Error { .. } => EventKind::Error,
        }
    }

    /// `Complete` and `Error` end a session's feed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Error { .. })
    }

    /// Serialize to the JSON wire form.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
