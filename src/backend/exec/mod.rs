//! `codex exec` subprocess backend.
//!
//! Each run spawns `codex exec --experimental-json`, writes the prompt to
//! stdin and reads one JSON thread event per stdout line. Model discovery
//! goes to the OpenAI-compatible REST API instead.

use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{ClientOptions, CommandSpec};
use crate::core::error::BackendError;
use crate::core::traits::{BackendConnection, BackendConnector, BackendEventStream, BackendThread};
use crate::core::types::{BackendEvent, ModelInfo, ThreadOptions};
use crate::credentials::Credential;
use crate::transport::http::HttpTransport;

pub const DEFAULT_API_BASE_URL: &str = "https://api.openai.com/v1";

const API_KEY_ENV: &str = "CODEX_API_KEY";
const BASE_URL_ENV: &str = "OPENAI_BASE_URL";
const STDERR_TAIL_LINES: usize = 20;

/// Connects by checking that the configured executable launches.
#[derive(Debug, Clone, Copy, Default)]
pub struct CodexExecConnector;

#[async_trait]
impl BackendConnector for CodexExecConnector {
    async fn connect(
        &self,
        credential: &Credential,
        options: &ClientOptions,
    ) -> Result<Arc<dyn BackendConnection>, BackendError> {
        let version = probe_version(&options.command).await?;
        info!(
            program = %options.command.program.display(),
            version = %version,
            "Codex backend available"
        );

        let transport =
            HttpTransport::new(options.timeout_ms).map_err(|error| BackendError::Launch {
                message: error.to_string(),
            })?;

        Ok(Arc::new(CodexExecConnection {
            launch: Arc::new(LaunchSpec {
                api_key: credential.clone(),
                base_url: options.base_url.clone(),
                command: options.command.clone(),
            }),
            transport,
        }))
    }
}

struct LaunchSpec {
    api_key: Credential,
    base_url: Option<String>,
    command: CommandSpec,
}

pub struct CodexExecConnection {
    launch: Arc<LaunchSpec>,
    transport: HttpTransport,
}

#[async_trait]
impl BackendConnection for CodexExecConnection {
    async fn start_thread(
        &self,
        options: &ThreadOptions,
    ) -> Result<Box<dyn BackendThread>, BackendError> {
        Ok(Box::new(ExecThread {
            id: None,
            options: options.clone(),
            launch: Arc::clone(&self.launch),
        }))
    }

    /// The CLI only rejects an unknown thread once a run starts, so the
    /// rejection surfaces from [`BackendThread::run_streamed`].
    async fn resume_thread(
        &self,
        thread_id: &str,
        options: &ThreadOptions,
    ) -> Result<Box<dyn BackendThread>, BackendError> {
        Ok(Box::new(ExecThread {
            id: Some(thread_id.to_string()),
            options: options.clone(),
            launch: Arc::clone(&self.launch),
        }))
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, BackendError> {
        let base_url = self
            .launch
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE_URL);
        let page = self
            .transport
            .get_json::<ModelsPage>(
                &format!("{base_url}/models"),
                Some(self.launch.api_key.expose()),
            )
            .await?;

        Ok(decode_models_list(page))
    }
}

pub struct ExecThread {
    id: Option<String>,
    options: ThreadOptions,
    launch: Arc<LaunchSpec>,
}

#[async_trait]
impl BackendThread for ExecThread {
    fn id(&self) -> Option<String> {
        self.id.clone()
    }

    /// Spawns the run and waits for its first event, so launch failures and
    /// rejected resume tokens are returned here rather than mid-stream.
    async fn run_streamed(&mut self, input: &str) -> Result<BackendEventStream, BackendError> {
        let resuming = self.id.clone();
        let args = exec_args(&self.options, resuming.as_deref())?;
        debug!(?args, "spawning codex exec");

        let mut run = ExecRun::spawn(&self.launch, &args, input).await?;
        let first = match run.next_event().await {
            Some(Err(error)) => return Err(reject_resume(resuming, error)),
            other => other,
        };
        if let Some(Ok(BackendEvent::ThreadStarted { thread_id })) = &first {
            self.id = Some(thread_id.clone());
        }

        Ok(Box::pin(async_stream::stream! {
            let mut next = first;
            while let Some(item) = next {
                let failed = item.is_err();
                yield item;
                if failed {
                    break;
                }
                next = run.next_event().await;
            }
        }))
    }
}

fn reject_resume(resuming: Option<String>, error: BackendError) -> BackendError {
    match (resuming, error) {
        (Some(thread_id), BackendError::Transport { message, .. }) => {
            BackendError::SessionRejected { thread_id, message }
        }
        (_, error) => error,
    }
}

struct ExecRun {
    child: Child,
    lines: Lines<BufReader<ChildStdout>>,
    stderr: Option<JoinHandle<String>>,
    finished: bool,
}

impl ExecRun {
    async fn spawn(launch: &LaunchSpec, args: &[String], input: &str) -> Result<Self, BackendError> {
        let mut command = Command::new(&launch.command.program);
        command
            .args(&launch.command.leading_args)
            .args(args)
            .env(API_KEY_ENV, launch.api_key.expose())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(base_url) = &launch.base_url {
            command.env(BASE_URL_ENV, base_url);
        }

        let mut child = command.spawn().map_err(|error| BackendError::Launch {
            message: format!(
                "failed to spawn {}: {error}",
                launch.command.program.display()
            ),
        })?;

        let stdout = child.stdout.take().ok_or_else(|| BackendError::Protocol {
            message: "codex stdout was not captured".to_string(),
        })?;
        let stderr = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut buffer = String::new();
                let _ = stderr.read_to_string(&mut buffer).await;
                buffer
            })
        });

        if let Some(mut stdin) = child.stdin.take() {
            // A child that exits early closes the pipe; its exit status
            // carries the better error.
            if let Err(error) = stdin.write_all(input.as_bytes()).await {
                debug!(error = %error, "failed to write prompt to codex stdin");
            }
        }

        Ok(Self {
            child,
            lines: BufReader::new(stdout).lines(),
            stderr,
            finished: false,
        })
    }

    /// Next parsed event; `None` after a clean exit.
    async fn next_event(&mut self) -> Option<Result<BackendEvent, BackendError>> {
        if self.finished {
            return None;
        }

        loop {
            match self.lines.next_line().await {
                Ok(Some(line)) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<BackendEvent>(trimmed) {
                        Ok(event) => return Some(Ok(event)),
                        Err(error) => {
                            warn!(line = trimmed, error = %error, "skipping malformed JSONL line");
                        }
                    }
                }
                Ok(None) => {
                    self.finished = true;
                    return self.exit_status().await.err().map(Err);
                }
                Err(error) => {
                    self.finished = true;
                    return Some(Err(BackendError::Transport {
                        request_id: None,
                        message: format!("failed to read codex output: {error}"),
                    }));
                }
            }
        }
    }

    async fn exit_status(&mut self) -> Result<(), BackendError> {
        let status = self
            .child
            .wait()
            .await
            .map_err(|error| BackendError::Transport {
                request_id: None,
                message: format!("failed to wait for codex: {error}"),
            })?;
        if status.success() {
            return Ok(());
        }

        let stderr = match self.stderr.take() {
            Some(handle) => handle.await.unwrap_or_default(),
            None => String::new(),
        };
        Err(BackendError::Transport {
            request_id: None,
            message: format!("codex exited with {status}: {}", stderr_tail(&stderr)),
        })
    }
}

async fn probe_version(command: &CommandSpec) -> Result<String, BackendError> {
    let output = Command::new(&command.program)
        .args(&command.leading_args)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|error| BackendError::Launch {
            message: format!("failed to launch {}: {error}", command.program.display()),
        })?;

    if !output.status.success() {
        return Err(BackendError::Launch {
            message: format!(
                "{} --version exited with {}: {}",
                command.program.display(),
                output.status,
                stderr_tail(&String::from_utf8_lossy(&output.stderr))
            ),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Command-line arguments for one run. Settings without a dedicated flag
/// are passed as `--config key=value` with TOML values.
pub(crate) fn exec_args(
    options: &ThreadOptions,
    thread_id: Option<&str>,
) -> Result<Vec<String>, BackendError> {
    let mut args = vec!["exec".to_string(), "--experimental-json".to_string()];

    if let Some(model) = &options.model {
        args.push("--model".to_string());
        args.push(model.clone());
    }
    args.push("--sandbox".to_string());
    args.push(options.sandbox_mode.as_str().to_string());
    args.push("--cd".to_string());
    args.push(options.working_directory.to_string_lossy().into_owned());
    if options.skip_git_repo_check {
        args.push("--skip-git-repo-check".to_string());
    }

    push_config(
        &mut args,
        "model_reasoning_effort".to_string(),
        &Value::from(options.model_reasoning_effort.as_str()),
    );
    push_config(
        &mut args,
        "approval_policy".to_string(),
        &Value::from(options.approval_policy.as_str()),
    );

    for (name, descriptor) in &options.mcp_servers {
        let value = serde_json::to_value(descriptor).map_err(|error| {
            BackendError::Serialization {
                message: error.to_string(),
            }
        })?;
        push_config(&mut args, format!("mcp_servers.{}", toml_key(name)), &value);
    }
    for (key, value) in &options.extra {
        push_config(&mut args, toml_key(key), value);
    }

    if let Some(thread_id) = thread_id {
        args.push("resume".to_string());
        args.push(thread_id.to_string());
    }

    Ok(args)
}

fn push_config(args: &mut Vec<String>, key: String, value: &Value) {
    match value {
        Value::Null => {}
        Value::Object(map) if !map.is_empty() => {
            for (child, value) in map {
                push_config(args, format!("{key}.{}", toml_key(child)), value);
            }
        }
        other => {
            args.push("--config".to_string());
            args.push(format!("{key}={}", toml_literal(other)));
        }
    }
}

fn toml_key(key: &str) -> String {
    let bare = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if bare {
        key.to_string()
    } else {
        Value::from(key).to_string()
    }
}

fn toml_literal(value: &Value) -> String {
    match value {
        Value::Null => "\"\"".to_string(),
        Value::Bool(_) | Value::Number(_) | Value::String(_) => value.to_string(),
        Value::Array(items) => {
            let rendered = items.iter().map(toml_literal).collect::<Vec<_>>();
            format!("[{}]", rendered.join(", "))
        }
        Value::Object(map) => {
            let rendered = map
                .iter()
                .map(|(key, value)| format!("{} = {}", toml_key(key), toml_literal(value)))
                .collect::<Vec<_>>();
            format!("{{{}}}", rendered.join(", "))
        }
    }
}

fn stderr_tail(stderr: &str) -> String {
    let lines = stderr
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    let tail = lines[start..].join("\n");
    if tail.is_empty() {
        "no stderr output".to_string()
    } else {
        tail
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ModelsPage {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    #[serde(default)]
    id: String,
}

/// Model ids from a `/models` page, skipping blanks and repeats.
pub(crate) fn decode_models_list(page: ModelsPage) -> Vec<ModelInfo> {
    let mut models: Vec<ModelInfo> = Vec::with_capacity(page.data.len());
    for entry in page.data {
        let model_id = entry.id.trim();
        if model_id.is_empty() || models.iter().any(|model| model.model_id == model_id) {
            continue;
        }
        models.push(ModelInfo {
            model_id: model_id.to_string(),
            display_name: None,
        });
    }
    models
}

#[cfg(test)]
mod tests;
