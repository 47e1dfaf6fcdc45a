//! Shared handler state and strategy wiring.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use forge_core::{ProgressStream, SessionRegistry};
use forge_heal::{GenerationPipeline, HealingLoop, SessionLauncher};
use forge_llm::{CodeGenerator, LlmCodeGenerator, MockCodeGenerator, MockDelays};
use forge_runner::{BuildTool, CommandBuildTool};
use forge_store::{ArtifactStore, LocalStore, MemoryStore, PinataStore};
use tracing::info;

use crate::config::{GeneratorKind, ServerConfig, StoreKind};
use crate::error::{ServerError, ServerResult};

/// State handed to every route.
#[derive(Clone)]
pub struct AppState {
    pub launcher: SessionLauncher,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(launcher: SessionLauncher) -> Self {
        Self {
            launcher,
            started_at: Utc::now(),
        }
    }

    /// Wire every strategy from `config` once.
    pub fn from_config(config: &ServerConfig) -> ServerResult<Self> {
        config.validate()?;
        let generator = build_generator(config)?;
        let store = build_store(config)?;
        let builder: Arc<dyn BuildTool> = Arc::new(CommandBuildTool::new(config.build_config()));
        info!(
            generator = %generator.name(),
            store = store.name(),
            builder = %builder.name(),
            diagnostics = ?config.build.diagnostics,
            skip_compile = config.skip_compile,
            "Strategies selected"
        );

        let healer = HealingLoop::new(builder, generator, config.heal_config());
        let pipeline = GenerationPipeline::new(healer, store, config.pipeline_config());
        Ok(Self::new(SessionLauncher::new(
            Arc::new(SessionRegistry::new()),
            Arc::new(ProgressStream::new()),
            Arc::new(pipeline),
        )))
    }

    /// Time since the state was built, never negative.
    pub fn uptime_at(&self, now: DateTime<Utc>) -> Duration {
        (now - self.started_at).max(Duration::zero())
    }

    pub fn stream(&self) -> &Arc<ProgressStream> {
        self.launcher.stream()
    }

    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        self.launcher.pipeline().store()
    }
}

pub fn build_generator(config: &ServerConfig) -> ServerResult<Arc<dyn CodeGenerator>> {
    match config.generator {
        GeneratorKind::Mock => Ok(Arc::new(
            MockCodeGenerator::new().with_delays(MockDelays::scaled(config.mock_delay_scale)),
        )),
        _ => {
            let adapter = config.llm_config().build()?;
            Ok(Arc::new(LlmCodeGenerator::new(Arc::new(adapter))))
        }
    }
}

pub fn build_store(config: &ServerConfig) -> ServerResult<Arc<dyn ArtifactStore>> {
    match config.effective_store() {
        StoreKind::Pinata => {
            let settings = &config.pinata;
            let (Some(key), Some(secret)) = (&settings.api_key, &settings.secret_key) else {
                return Err(ServerError::Config("Pinata credentials missing".to_string()));
            };
            let mut store = PinataStore::new(key.clone(), secret.clone());
            if let Some(base) = &settings.api_base {
                store = store.with_api_base(base.clone());
            }
            if let Some(gateway) = &settings.gateway {
                store = store.with_gateway(gateway.clone());
            }
            Ok(Arc::new(store))
        }
        StoreKind::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreKind::Local | StoreKind::Auto => Ok(Arc::new(LocalStore::new(config.store_dir.clone()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_memory_wiring() {
        let config = ServerConfig {
            generator: GeneratorKind::Mock,
            store: StoreKind::Memory,
            ..Default::default()
        };
        let state = AppState::from_config(&config).unwrap();
        assert_eq!(state.store().name(), "memory");
        assert!(state.launcher.pipeline().config().generate_tests);
    }

    #[test]
    fn test_uptime_never_negative() {
        let state = AppState::from_config(&ServerConfig {
            generator: GeneratorKind::Mock,
            store: StoreKind::Memory,
            ..Default::default()
        })
        .unwrap();
        let earlier = state.started_at - Duration::seconds(5);
        assert_eq!(state.uptime_at(earlier), Duration::zero());
        let later = state.started_at + Duration::seconds(42);
        assert_eq!(state.uptime_at(later).num_seconds(), 42);
    }

    #[test]
    fn test_pinned_provider_with_blank_key_fails() {
        let config = ServerConfig {
            generator: GeneratorKind::Gemini,
            llm: forge_llm::LlmConfig::new().api_key(""),
            ..Default::default()
        };
        assert!(matches!(build_generator(&config), Err(ServerError::Generator(_))));
    }

    #[test]
    fn test_local_store_uses_configured_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            store: StoreKind::Local,
            store_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        assert_eq!(build_store(&config).unwrap().name(), "local");
    }
}
