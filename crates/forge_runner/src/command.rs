//! Build tool that shells out to the contract toolchain.

use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::{ArtifactConvention, BuildConfig};
use crate::error::{RunnerError, RunnerResult};
use crate::extract::DiagnosticExtractor;
use crate::outcome::{ArtifactRefs, BuildOutcome};
use crate::project::ContractProject;
use crate::tool::{BuildTool, LogHandler, LogLine, LogStream};

/// How long to keep draining output after the process is gone.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Runs the configured toolchain inside a fresh project per call.
pub struct CommandBuildTool {
    config: BuildConfig,
    extractor: Arc<dyn DiagnosticExtractor>,
}

impl CommandBuildTool {
    /// The extractor follows `config.diagnostics`.
    pub fn new(config: BuildConfig) -> Self {
        let extractor = config.extractor();
        Self { config, extractor }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn DiagnosticExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Check whether the toolchain executable can be started.
    pub async fn is_available(&self) -> bool {
        Command::new(&self.config.program)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn format_command(&self) -> String {
        let mut cmd = self.config.program.clone();
        for arg in &self.config.effective_args() {
            if arg.contains(' ') {
                cmd.push_str(&format!(" '{}'", arg));
            } else {
                cmd.push_str(&format!(" {}", arg));
            }
        }
        cmd
    }

    /// Run the toolchain in `project`, returning the exit status (`None` on
    /// timeout) and the interleaved output.
    async fn execute(
        &self,
        project: &ContractProject,
        on_line: Option<LogHandler>,
    ) -> RunnerResult<(Option<ExitStatus>, String)> {
        let mut command = Command::new(&self.config.program);
        command
            .args(self.config.effective_args())
            .envs(&self.config.env)
            .current_dir(project.root())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!("Executing: {} in {}", self.format_command(), project.root().display());

        let mut child = command.spawn().map_err(|source| RunnerError::Spawn {
            program: self.config.program.clone(),
            source,
        })?;

        // Both readers feed one channel so lines keep their arrival order.
        let (tx, mut rx) = mpsc::unbounded_channel::<LogLine>();
        let mut readers = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_reader(stdout, LogStream::Stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_reader(stderr, LogStream::Stderr, tx.clone()));
        }
        drop(tx);

        let output = Arc::new(Mutex::new(String::new()));
        let mut collector = tokio::spawn({
            let output = Arc::clone(&output);
            async move {
                while let Some(line) = rx.recv().await {
                    {
                        let mut buf = output.lock();
                        buf.push_str(&line.message);
                        buf.push('\n');
                    }
                    if let Some(handler) = &on_line {
                        handler(line);
                    }
                }
            }
        });

        let status = match self.config.timeout() {
            Some(limit) => {
                let waited = tokio::time::timeout(limit, child.wait()).await;
                match waited {
                    Ok(status) => Some(status?),
                    Err(_) => {
                        warn!(
                            "Build exceeded {}s deadline, killing {}",
                            self.config.timeout_seconds, self.config.program
                        );
                        if let Err(e) = child.kill().await {
                            warn!("Failed to kill build process: {}", e);
                        }
                        None
                    }
                }
            }
            None => Some(child.wait().await?),
        };

        // Descendants may still hold the pipes open.
        if tokio::time::timeout(DRAIN_GRACE, &mut collector).await.is_err() {
            debug!("Output still open after process exit, abandoning readers");
            collector.abort();
        }
        for reader in readers {
            reader.abort();
        }

        let raw_output = std::mem::take(&mut *output.lock());
        Ok((status, raw_output))
    }

    async fn judge(
        &self,
        project: &ContractProject,
        status: ExitStatus,
        raw_output: String,
    ) -> BuildOutcome {
        let wasm_path = project.wasm_path(&self.config.output_dir);
        let wasm_exists = tokio::fs::try_exists(&wasm_path).await.unwrap_or(false);
        let success = match self.config.artifact_convention {
            ArtifactConvention::WasmOutput => wasm_exists,
            ArtifactConvention::ExitCode => status.success(),
        };

        let outcome = BuildOutcome::from_output(success, raw_output, self.extractor.as_ref())
            .with_exit_code(status.code());
        if !(success && wasm_exists) {
            return outcome;
        }

        let abi_path = project.abi_path(&self.config.output_dir);
        let abi_exists = tokio::fs::try_exists(&abi_path).await.unwrap_or(false);
        outcome.with_artifacts(ArtifactRefs {
            wasm_path,
            abi_path: abi_exists.then_some(abi_path),
        })
    }

    /// Copy the artifacts of a successful build out of `project` so they
    /// outlive its directory.
    async fn collect_artifacts(
        &self,
        project: &ContractProject,
        mut outcome: BuildOutcome,
    ) -> RunnerResult<BuildOutcome> {
        let Some(refs) = outcome.artifacts.take() else {
            return Ok(outcome);
        };
        let dir = &self.config.artifact_dir;
        tokio::fs::create_dir_all(dir).await?;

        let wasm_path = dir.join(format!("{}.wasm", project.id()));
        tokio::fs::copy(&refs.wasm_path, &wasm_path).await?;
        let abi_path = match refs.abi_path {
            Some(abi) => {
                let target = dir.join(format!("{}.abi.json", project.id()));
                tokio::fs::copy(&abi, &target).await?;
                Some(target)
            }
            None => None,
        };

        debug!("Copied artifacts of {} to {}", project.id(), dir.display());
        Ok(outcome.with_artifacts(ArtifactRefs {
            wasm_path,
            abi_path,
        }))
    }
}

fn spawn_reader<R>(pipe: R, stream: LogStream, tx: mpsc::UnboundedSender<LogLine>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(pipe).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(LogLine::new(stream, line)).is_err() {
                break;
            }
        }
    })
}

#[async_trait]
impl BuildTool for CommandBuildTool {
    fn name(&self) -> &str {
        &self.config.program
    }

    async fn compile_with_logs(
        &self,
        source: &str,
        label: &str,
        on_line: Option<LogHandler>,
    ) -> RunnerResult<BuildOutcome> {
        let project = ContractProject::create(
            &self.config.work_root,
            source,
            label,
            &self.config.sdk_version,
        )
        .await?;

        info!("Building contract {} with {}", project.name(), self.format_command());
        let started = Instant::now();

        let (status, raw_output) = match self.execute(&project, on_line).await {
            Ok(result) => result,
            Err(e) => {
                project.remove().await;
                return Err(e);
            }
        };

        let outcome = match status {
            Some(status) => self.judge(&project, status, raw_output).await,
            None => BuildOutcome::timed_out(
                self.config.timeout_seconds,
                raw_output,
                self.extractor.as_ref(),
            ),
        }
        .with_duration_ms(started.elapsed().as_millis() as u64);

        if outcome.success {
            info!("Build succeeded in {}ms", outcome.duration_ms);
        } else {
            error!(
                "Build failed after {}ms (exit code {:?})",
                outcome.duration_ms, outcome.exit_code
            );
        }

        if self.config.keep_workspace {
            return Ok(outcome);
        }
        let outcome = self.collect_artifacts(&project, outcome).await;
        project.remove().await;
        outcome
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn shell_config(temp: &TempDir, script: &str) -> BuildConfig {
        BuildConfig::default()
            .work_root(temp.path().join("work"))
            .artifact_dir(temp.path().join("artifacts"))
            .program("sh")
            .args(vec!["-c".to_string(), script.to_string()])
            .timeout_seconds(10)
    }

    fn shell_tool(temp: &TempDir, script: &str) -> CommandBuildTool {
        CommandBuildTool::new(shell_config(temp, script))
    }

    fn entries(dir: &std::path::Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    #[tokio::test]
    async fn test_wasm_artifact_means_success() {
        let temp = TempDir::new().unwrap();
        let tool = shell_tool(
            &temp,
            "mkdir -p output && touch output/contract.wasm && echo 'warning: unused' && echo",
        );

        let outcome = tool.compile("#![no_std]", "contract").await.unwrap();
        assert!(outcome.success);
        assert!(outcome.errors.is_none());
        assert_eq!(outcome.warnings.as_deref(), Some("warning: unused"));
        let artifacts = outcome.artifacts.unwrap();
        assert!(artifacts.wasm_path.exists());
        assert!(artifacts.wasm_path.starts_with(temp.path().join("artifacts")));
        assert!(artifacts.abi_path.is_none());
    }

    #[tokio::test]
    async fn test_successful_builds_leave_no_workspace() {
        let temp = TempDir::new().unwrap();
        let tool = shell_tool(
            &temp,
            "mkdir -p output && touch output/token.wasm output/token.abi.json",
        );

        let mut wasm_paths = Vec::new();
        for _ in 0..3 {
            let outcome = tool.compile("#![no_std]", "token").await.unwrap();
            assert!(outcome.success);
            let artifacts = outcome.artifacts.unwrap();
            assert!(artifacts.abi_path.unwrap().exists());
            wasm_paths.push(artifacts.wasm_path);
        }

        assert_eq!(entries(&temp.path().join("work")), 0);
        assert_eq!(entries(&temp.path().join("artifacts")), 6);
        wasm_paths.dedup();
        assert_eq!(wasm_paths.len(), 3);
        assert!(wasm_paths.iter().all(|p| p.exists()));
    }

    #[tokio::test]
    async fn test_keep_workspace_leaves_project_in_place() {
        let temp = TempDir::new().unwrap();
        let tool = CommandBuildTool::new(
            shell_config(&temp, "mkdir -p output && touch output/token.wasm").keep_workspace(true),
        );

        let outcome = tool.compile("#![no_std]", "token").await.unwrap();
        let artifacts = outcome.artifacts.unwrap();
        assert!(artifacts.wasm_path.starts_with(temp.path().join("work")));
        assert_eq!(entries(&temp.path().join("work")), 1);
        assert_eq!(entries(&temp.path().join("artifacts")), 0);
    }

    #[tokio::test]
    async fn test_json_diagnostics_use_rendered_text() {
        let temp = TempDir::new().unwrap();
        let script = r#"test "$0" = "--message-format=json" && printf '%s\n' '{"reason":"compiler-message","message":{"level":"error","message":"bad","rendered":"error[E0308]: mismatched types
"}}'"#;
        let tool = CommandBuildTool::new(
            shell_config(&temp, script).diagnostics(crate::config::DiagnosticFormat::Json),
        );

        let outcome = tool.compile("", "contract").await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.error_text(), "error[E0308]: mismatched types");
    }

    #[tokio::test]
    async fn test_zero_exit_without_artifact_is_failure() {
        let temp = TempDir::new().unwrap();
        let tool = shell_tool(&temp, "echo 'error: could not compile' 1>&2; exit 0");

        let outcome = tool.compile("", "contract").await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.exit_code, Some(0));
        assert_eq!(outcome.error_text(), "error: could not compile");
        assert_eq!(entries(&temp.path().join("work")), 0);
    }

    #[tokio::test]
    async fn test_exit_code_convention() {
        let temp = TempDir::new().unwrap();
        let tool = CommandBuildTool::new(
            BuildConfig::default()
                .work_root(temp.path())
                .program("true")
                .args(vec![])
                .artifact_convention(ArtifactConvention::ExitCode),
        );
        let outcome = tool.compile("", "contract").await.unwrap();
        assert!(outcome.success);
        assert!(outcome.artifacts.is_none());
    }

    #[tokio::test]
    async fn test_deadline_kills_build() {
        let temp = TempDir::new().unwrap();
        let tool = CommandBuildTool::new(
            BuildConfig::default()
                .work_root(temp.path())
                .program("sleep")
                .args(vec!["30".to_string()])
                .timeout_seconds(1),
        );

        let started = Instant::now();
        let outcome = tool.compile("", "contract").await.unwrap();
        assert!(outcome.timed_out);
        assert!(!outcome.success);
        assert!(outcome.error_text().contains("timed out after 1 seconds"));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let temp = TempDir::new().unwrap();
        let tool = CommandBuildTool::new(
            BuildConfig::default()
                .work_root(temp.path())
                .program("definitely-not-a-real-build-tool"),
        );
        let err = tool.compile("", "contract").await.unwrap_err();
        assert!(matches!(err, RunnerError::Spawn { .. }));
        assert!(!tool.is_available().await);
    }

    #[tokio::test]
    async fn test_lines_streamed_to_handler() {
        let temp = TempDir::new().unwrap();
        let tool = shell_tool(&temp, "echo one; echo two 1>&2");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let handler: LogHandler = {
            let seen = Arc::clone(&seen);
            Arc::new(move |line: LogLine| seen.lock().push((line.stream, line.message)))
        };

        let outcome = tool.compile_with_logs("", "contract", Some(handler)).await.unwrap();
        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert!(seen.contains(&(LogStream::Stdout, "one".to_string())));
        assert!(seen.contains(&(LogStream::Stderr, "two".to_string())));
        assert!(outcome.raw_output.contains("one") && outcome.raw_output.contains("two"));
    }
}
