//! Background session execution.

use std::sync::Arc;

use forge_core::{GenerationRequest, ProgressStream, SessionRegistry};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::error::{HealError, HealResult};
use crate::pipeline::{GenerationPipeline, SessionResult};

/// Message sent to listeners when a session task dies unexpectedly.
pub const INTERNAL_FAILURE: &str = "Internal error during generation";

/// Handle to a running session.
///
/// Dropping the handle does not cancel the session.
pub struct SessionHandle {
    session_id: String,
    result: oneshot::Receiver<SessionResult>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the session's result.
    pub async fn wait(self) -> HealResult<SessionResult> {
        self.result
            .await
            .map_err(|_| HealError::Internal(format!("session {} dropped its result", self.session_id)))
    }
}

/// Starts sessions as independent tasks and returns without awaiting them.
#[derive(Clone)]
pub struct SessionLauncher {
    registry: Arc<SessionRegistry>,
    stream: Arc<ProgressStream>,
    pipeline: Arc<GenerationPipeline>,
}

impl SessionLauncher {
    pub fn new(
        registry: Arc<SessionRegistry>,
        stream: Arc<ProgressStream>,
        pipeline: Arc<GenerationPipeline>,
    ) -> Self {
        Self {
            registry,
            stream,
            pipeline,
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn stream(&self) -> &Arc<ProgressStream> {
        &self.stream
    }

    pub fn pipeline(&self) -> &Arc<GenerationPipeline> {
        &self.pipeline
    }

    /// Validate the request, reserve its id, and spawn the session.
    ///
    /// Fails with `Session` on a blank field or an id that is still active.
    pub fn start(&self, request: GenerationRequest) -> HealResult<SessionHandle> {
        let guard = self.registry.begin(&request)?;
        let session_id = request.session_id.clone();
        let emitter = self.stream.emitter(session_id.clone());
        let pipeline = Arc::clone(&self.pipeline);
        let (tx, rx) = oneshot::channel();

        let task = tokio::spawn(async move {
            let inner_emitter = emitter.clone();
            let run = tokio::spawn(async move { pipeline.run(&request, &inner_emitter).await });

            let result = match run.await {
                Ok(result) => result,
                Err(e) => {
                    error!(session_id = %emitter.session_id(), "Session task failed: {}", e);
                    emitter.error(INTERNAL_FAILURE);
                    SessionResult::failed(emitter.session_id(), INTERNAL_FAILURE)
                }
            };

            drop(guard);
            debug!(session_id = %emitter.session_id(), success = result.success, "Session released");
            let _ = tx.send(result);
        });

        Ok(SessionHandle {
            session_id,
            result: rx,
            task,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HealConfig, PipelineConfig};
    use crate::healing::HealingLoop;
    use forge_core::{CoreError, EventKind, RecordingSink};
    use forge_llm::{MockCodeGenerator, MockDelays};
    use forge_runner::{MockBuild, MockBuildTool};
    use forge_store::MemoryStore;

    fn launcher(tool: MockBuildTool) -> SessionLauncher {
        let generator = MockCodeGenerator::new().with_delays(MockDelays::none());
        let healer = HealingLoop::new(Arc::new(tool), Arc::new(generator), HealConfig::new());
        let pipeline = GenerationPipeline::new(healer, Arc::new(MemoryStore::new()), PipelineConfig::new());
        SessionLauncher::new(
            Arc::new(SessionRegistry::new()),
            Arc::new(ProgressStream::new()),
            Arc::new(pipeline),
        )
    }

    #[tokio::test]
    async fn test_duplicate_rejected_while_active() {
        let tool = MockBuildTool::new().add_response(MockBuild::success("").with_delay(200));
        let launcher = launcher(tool);

        let first = launcher
            .start(GenerationRequest::new("dup", "A token", "token"))
            .unwrap();
        let second = launcher.start(GenerationRequest::new("dup", "A token", "token"));
        assert!(matches!(
            second,
            Err(HealError::Session(CoreError::DuplicateSession(_)))
        ));

        assert!(first.wait().await.unwrap().success);
        assert!(!launcher.registry().is_active("dup"));
        assert!(launcher
            .start(GenerationRequest::new("dup", "A token", "token"))
            .is_ok());
    }

    #[tokio::test]
    async fn test_invalid_request_rejected() {
        let launcher = launcher(MockBuildTool::new());
        let result = launcher.start(GenerationRequest::new("s1", "", "token"));
        assert!(matches!(
            result,
            Err(HealError::Session(CoreError::InvalidRequest(_)))
        ));
        assert!(launcher.registry().is_empty());
    }

    #[tokio::test]
    async fn test_listener_sees_single_terminal_event() {
        let launcher = launcher(MockBuildTool::new());
        let sink = RecordingSink::new();
        launcher.stream().attach("s1", Arc::new(sink.clone()));

        let handle = launcher
            .start(GenerationRequest::new("s1", "A token", "token"))
            .unwrap();
        assert_eq!(handle.session_id(), "s1");
        let result = handle.wait().await.unwrap();

        assert!(result.success);
        assert_eq!(sink.count(EventKind::Complete) + sink.count(EventKind::Error), 1);
    }
}
