//! Active-session bookkeeping.
//!
//! Sessions live only in process memory. An id is reserved from the moment a
//! start request is accepted until its run finishes, and a second start with
//! the same id is rejected in between.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::types::{GenerationRequest, SessionId};

/// One user-initiated generation request while it runs.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationSession {
    pub request: GenerationRequest,
    #[serde(rename = "startedAt")]
    pub started_at: DateTime<Utc>,
}

impl GenerationSession {
    pub fn id(&self) -> &str {
        &self.request.session_id
    }
}

/// Registry of sessions whose runs have not finished.
#[derive(Default)]
pub struct SessionRegistry {
    active: Mutex<HashMap<SessionId, GenerationSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the request's session id.
    pub fn begin(self: &Arc<Self>, request: &GenerationRequest) -> CoreResult<SessionGuard> {
        request.validate()?;

        let session = GenerationSession {
            request: request.clone(),
            started_at: Utc::now(),
        };

        {
            let mut active = self.active.lock();
            if active.contains_key(&request.session_id) {
                return Err(CoreError::DuplicateSession(request.session_id.clone()));
            }
            active.insert(request.session_id.clone(), session.clone());
        }

        debug!(session_id = %request.session_id, "Session reserved");
        Ok(SessionGuard {
            registry: Arc::clone(self),
            session,
        })
    }

    pub fn is_active(&self, session_id: &str) -> bool {
        self.active.lock().contains_key(session_id)
    }

    pub fn active(&self) -> Vec<GenerationSession> {
        self.active.lock().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.active.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.lock().is_empty()
    }

    fn release(&self, session_id: &str) {
        if self.active.lock().remove(session_id).is_some() {
            debug!(session_id = %session_id, "Session released");
        }
    }
}

/// Holds a session id reservation; releases it on drop.
pub struct SessionGuard {
    registry: Arc<SessionRegistry>,
    session: GenerationSession,
}

impl SessionGuard {
    pub fn session(&self) -> &GenerationSession {
        &self.session
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.registry.release(self.session.id());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_rejected_while_active() {
        let registry = Arc::new(SessionRegistry::new());
        let request = GenerationRequest::new("s1", "A token", "token");

        let guard = registry.begin(&request).unwrap();
        assert!(registry.is_active("s1"));
        assert!(matches!(
            registry.begin(&request),
            Err(CoreError::DuplicateSession(id)) if id == "s1"
        ));

        drop(guard);
        assert!(!registry.is_active("s1"));
        assert!(registry.begin(&request).is_ok());
    }

    #[test]
    fn test_invalid_request_not_reserved() {
        let registry = Arc::new(SessionRegistry::new());
        let request = GenerationRequest::new("s1", "", "token");
        assert!(matches!(
            registry.begin(&request),
            Err(CoreError::InvalidRequest(_))
        ));
        assert!(registry.is_empty());
    }
}
