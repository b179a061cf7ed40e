//! Session lifecycle and live event normalization.
//!
//! A query moves through `Unstarted -> Connecting -> {Resumed | Started} ->
//! Streaming -> {Completed | Failed}`. Setup failures are returned as the
//! `Err` of [`SessionAdapter::query`]; failures after streaming began end the
//! stream with an `Err` item, or with an in-band `error` event when the
//! backend reported them as data.

pub mod translate;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::StreamExt;
use serde_json::Value;
use tracing::{debug, warn};

use crate::core::error::{ConfigError, RuntimeError};
use crate::core::traits::{BackendConnection, BackendEventStream, NormalizedEventStream};
use crate::core::types::{BackendEvent, NormalizedEvent, QueryOptions, ThreadOptions};
use crate::effort;
use crate::tools;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Unstarted,
    Connecting,
    Resumed,
    Started,
    Streaming,
    Completed,
    Failed,
}

pub struct SessionAdapter {
    connection: Arc<dyn BackendConnection>,
    working_directory: PathBuf,
    default_model: Option<String>,
}

impl SessionAdapter {
    pub fn new(connection: Arc<dyn BackendConnection>, working_directory: impl Into<PathBuf>) -> Self {
        Self {
            connection,
            working_directory: working_directory.into(),
            default_model: None,
        }
    }

    pub fn with_default_model(mut self, default_model: Option<String>) -> Self {
        self.default_model = default_model;
        self
    }

    /// Starts or resumes a thread, issues one run and returns its
    /// normalized events.
    ///
    /// A non-blank resume token always takes the resume path. A rejected
    /// token fails the query; it never falls back to a fresh thread.
    pub async fn query(&self, options: QueryOptions) -> Result<NormalizedEventStream, RuntimeError> {
        debug!(phase = ?SessionPhase::Unstarted, "query received");
        let thread_options = build_thread_options(
            &options,
            &self.working_directory,
            self.default_model.as_deref(),
        )?;

        debug!(phase = ?SessionPhase::Connecting, resume = options.resume_token().is_some());
        let mut thread = match options.resume_token() {
            Some(token) => {
                let thread = self
                    .connection
                    .resume_thread(token, &thread_options)
                    .await
                    .map_err(|error| {
                        debug!(phase = ?SessionPhase::Failed, error = %error, "resume rejected");
                        RuntimeError::query_failed(Some(token.to_string()), error)
                    })?;
                debug!(phase = ?SessionPhase::Resumed, thread_id = token);
                thread
            }
            None => {
                let thread = self
                    .connection
                    .start_thread(&thread_options)
                    .await
                    .map_err(|error| {
                        debug!(phase = ?SessionPhase::Failed, error = %error, "thread start failed");
                        RuntimeError::query_failed(None, error)
                    })?;
                debug!(
                    phase = ?SessionPhase::Started,
                    model = thread_options.model.as_deref(),
                    effort = %thread_options.model_reasoning_effort
                );
                thread
            }
        };

        let prompt = translate::compose_prompt(&options);
        let run = thread.run_streamed(&prompt).await;
        // Backends may learn the thread id while starting the run.
        let thread_id = thread.id();
        let events = run.map_err(|error| RuntimeError::query_failed(thread_id.clone(), error))?;

        Ok(normalize_stream(events, thread_id))
    }
}

/// Composes run parameters: fixed sandbox and approval policy, model,
/// effort from temperature, host tool servers, then the caller's raw
/// overrides (last write wins).
pub fn build_thread_options(
    options: &QueryOptions,
    working_directory: &Path,
    default_model: Option<&str>,
) -> Result<ThreadOptions, ConfigError> {
    let mut computed = ThreadOptions::new(working_directory);
    computed.model = options
        .model
        .as_deref()
        .filter(|model| !model.trim().is_empty())
        .or(default_model)
        .map(str::to_string);
    computed.model_reasoning_effort = effort::map_temperature(options.temperature);

    if !options.tool_servers.is_empty() {
        let descriptors = tools::to_backend_config(&options.tool_servers);
        computed.mcp_servers = match &options.tools {
            Some(allowed) => tools::restrict_to_allowed(descriptors, allowed),
            None => descriptors,
        };
    }

    if options.provider_options.is_empty() {
        return Ok(computed);
    }

    let mut merged = match serde_json::to_value(&computed) {
        Ok(Value::Object(map)) => map,
        Ok(_) => {
            return Err(ConfigError::InvalidProviderOptions {
                reason: "run parameters must serialize to an object".to_string(),
            });
        }
        Err(error) => {
            return Err(ConfigError::InvalidProviderOptions {
                reason: error.to_string(),
            });
        }
    };
    for (key, value) in &options.provider_options {
        merged.insert(key.clone(), value.clone());
    }

    serde_json::from_value(Value::Object(merged)).map_err(|error| {
        ConfigError::InvalidProviderOptions {
            reason: error.to_string(),
        }
    })
}

fn normalize_stream(
    mut events: BackendEventStream,
    known_thread_id: Option<String>,
) -> NormalizedEventStream {
    Box::pin(async_stream::stream! {
        let mut thread_id = known_thread_id;
        let mut emitted = false;

        if let Some(id) = &thread_id {
            emitted = true;
            yield Ok(NormalizedEvent::SessionId { session_id: id.clone() });
        }

        debug!(phase = ?SessionPhase::Streaming, thread_id = thread_id.as_deref());
        while let Some(next) = events.next().await {
            let event = match next {
                Ok(event) => event,
                Err(error) => {
                    debug!(phase = ?SessionPhase::Failed, error = %error, "backend stream failed");
                    yield Err(RuntimeError::query_failed(thread_id.clone(), error));
                    return;
                }
            };

            // The id only arrives with the first event; announce it if
            // nothing has been emitted yet so `session_id` stays first.
            if let BackendEvent::ThreadStarted { thread_id: started } = &event {
                if !emitted {
                    emitted = true;
                    yield Ok(NormalizedEvent::SessionId { session_id: started.clone() });
                }
                if thread_id.is_none() {
                    thread_id = Some(started.clone());
                }
            }

            let terminal = translate::ends_stream(&event);
            match translate::translate_event(event) {
                Some(normalized) => {
                    emitted = true;
                    yield Ok(normalized);
                }
                None => debug!("dropping backend event without a normalized form"),
            }

            if terminal {
                debug!(phase = ?SessionPhase::Completed, thread_id = thread_id.as_deref());
                // Drain without yielding so the backend can finish writing
                // its session record before the run is dropped.
                while let Some(trailing) = events.next().await {
                    if let Err(error) = trailing {
                        warn!(error = %error, thread_id = thread_id.as_deref(), "backend failed after the turn ended");
                        break;
                    }
                }
                return;
            }
        }

        debug!(phase = ?SessionPhase::Completed, thread_id = thread_id.as_deref(), "backend stream exhausted");
    })
}
