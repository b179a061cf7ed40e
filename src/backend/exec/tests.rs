use indexmap::IndexMap;
use serde_json::json;

use super::*;
use crate::core::types::{ApprovalPolicy, EffortLevel, ServerDescriptor, ServerKind};

fn base_options() -> ThreadOptions {
    ThreadOptions::new("/srv/repo")
}

#[test]
fn test_exec_args_for_fresh_thread() {
    let mut options = base_options();
    options.model = Some("gpt-5.1-codex".to_string());
    options.model_reasoning_effort = EffortLevel::High;

    let args = exec_args(&options, None).expect("args should build");
    assert_eq!(
        args,
        vec![
            "exec",
            "--experimental-json",
            "--model",
            "gpt-5.1-codex",
            "--sandbox",
            "workspace-write",
            "--cd",
            "/srv/repo",
            "--skip-git-repo-check",
            "--config",
            "model_reasoning_effort=\"high\"",
            "--config",
            "approval_policy=\"never\"",
        ]
    );
}

#[test]
fn test_exec_args_flatten_servers_extras_and_resume() {
    let mut options = base_options();
    options.skip_git_repo_check = false;
    options.approval_policy = ApprovalPolicy::OnFailure;
    let mut servers = IndexMap::new();
    servers.insert(
        "docs".to_string(),
        ServerDescriptor {
            kind: ServerKind::HostManaged,
            name: "docs".to_string(),
            version: "1.0.0".to_string(),
            tools: vec!["search".to_string(), "fetch".to_string()],
        },
    );
    options.mcp_servers = servers;
    options
        .extra
        .insert("profile".to_string(), json!("ci"));
    options
        .extra
        .insert("sandbox_workspace_write".to_string(), json!({"network_access": true}));

    let args = exec_args(&options, Some("th_42")).expect("args should build");

    assert!(!args.contains(&"--skip-git-repo-check".to_string()));
    assert!(!args.contains(&"--model".to_string()));
    let configs = args
        .windows(2)
        .filter(|pair| pair[0] == "--config")
        .map(|pair| pair[1].as_str())
        .collect::<Vec<_>>();
    assert_eq!(
        configs,
        vec![
            "model_reasoning_effort=\"medium\"",
            "approval_policy=\"on-failure\"",
            "mcp_servers.docs.name=\"docs\"",
            "mcp_servers.docs.tools=[\"search\", \"fetch\"]",
            "mcp_servers.docs.type=\"host_managed\"",
            "mcp_servers.docs.version=\"1.0.0\"",
            "profile=\"ci\"",
            "sandbox_workspace_write.network_access=true",
        ]
    );
    assert_eq!(&args[args.len() - 2..], ["resume", "th_42"]);
}

#[test]
fn test_toml_rendering_quotes_unusual_keys() {
    assert_eq!(toml_key("docs"), "docs");
    assert_eq!(toml_key("my docs"), "\"my docs\"");
    assert_eq!(
        toml_literal(&json!([{"a b": 1}, null, "x"])),
        "[{\"a b\" = 1}, \"\", \"x\"]"
    );
}

#[test]
fn test_decode_models_list_skips_blank_and_repeated_ids() {
    let page: ModelsPage = serde_json::from_value(json!({
        "object": "list",
        "data": [
            {"id": "gpt-5.1-codex", "owned_by": "openai"},
            {"id": "  "},
            {"id": "gpt-5"},
            {"id": "gpt-5.1-codex"},
            {"owned_by": "nobody"}
        ]
    }))
    .expect("page should parse");

    let ids = decode_models_list(page)
        .into_iter()
        .map(|model| model.model_id)
        .collect::<Vec<_>>();
    assert_eq!(ids, vec!["gpt-5.1-codex".to_string(), "gpt-5".to_string()]);
}

#[test]
fn test_stderr_tail_keeps_last_lines() {
    let long = (0..30)
        .map(|index| format!("line {index}"))
        .collect::<Vec<_>>()
        .join("\n");
    let tail = stderr_tail(&long);
    assert!(tail.starts_with("line 10"));
    assert!(tail.ends_with("line 29"));
    assert_eq!(stderr_tail("\n  \n"), "no stderr output");
}

#[tokio::test]
async fn test_connect_reports_missing_executable_as_launch_error() {
    let options = ClientOptions::default()
        .with_command(CommandSpec::new("/nonexistent/path/to/codex"));

    let result = CodexExecConnector
        .connect(&Credential::new("sk-test"), &options)
        .await;
    assert!(matches!(result, Err(BackendError::Launch { .. })));
}

#[cfg(unix)]
mod subprocess {
    use futures::StreamExt;

    use super::*;
    use crate::core::types::{ItemStatus, QueryOptions, ThreadItem, Usage};
    use crate::session::SessionAdapter;

    const FAKE_CODEX: &str = r#"
case "$1" in
  --version) echo "codex-cli 0.0.0-test"; exit 0 ;;
esac
input=$(cat)
case " $* " in
  *" resume th_missing"*) echo "error: thread th_missing not found" >&2; exit 1 ;;
esac
echo '{"type":"thread.started","thread_id":"th_exec"}'
echo 'not json at all'
echo ''
printf '{"type":"item.completed","item":{"type":"agent_message","id":"m1","text":"%s|%s|%s"}}\n' "$CODEX_API_KEY" "$OPENAI_BASE_URL" "$input"
echo '{"type":"item.completed","item":{"type":"command_execution","id":"c1","command":"ls","aggregated_output":"a.txt","exit_code":0,"status":"completed"}}'
case "$input" in
  *crash*) echo "panicked at core/src/exec.rs" >&2; exit 3 ;;
esac
echo '{"type":"turn.completed","usage":{"input_tokens":5,"output_tokens":2}}'
"#;

    const BROKEN_CODEX: &str = r#"
case "$1" in
  --version) echo "codex-cli 0.0.0-test"; exit 0 ;;
esac
cat > /dev/null
echo "error: unexpected argument" >&2
exit 2
"#;

    const SLOW_SHUTDOWN_CODEX: &str = r#"
case "$1" in
  --version) echo "codex-cli 0.0.0-test"; exit 0 ;;
esac
cat > /dev/null
echo '{"type":"thread.started","thread_id":"th_slow"}'
echo '{"type":"turn.started"}'
echo '{"type":"turn.completed","usage":{"input_tokens":1,"output_tokens":1}}'
sleep 0.3
echo flushed > "__MARKER__"
"#;

    const NOISY_CODEX: &str = r#"
case "$1" in
  --version) echo "codex-cli 0.0.0-test"; exit 0 ;;
esac
head -c 262144 /dev/zero | tr '\0' 'w' >&2
cat > /dev/null
echo '{"type":"thread.started","thread_id":"th_noisy"}'
echo '{"type":"turn.completed","usage":{"input_tokens":1,"output_tokens":1}}'
"#;

    fn script_options(script: &str) -> ClientOptions {
        ClientOptions::default()
            .with_base_url("http://127.0.0.1:9/v1")
            .with_command(CommandSpec::new("sh").with_leading_args(["-c", script, "codex"]))
    }

    async fn connect(script: &str) -> Arc<dyn BackendConnection> {
        CodexExecConnector
            .connect(&Credential::new("sk-test-key"), &script_options(script))
            .await
            .expect("fake codex should launch")
    }

    #[tokio::test]
    async fn test_run_streams_parsed_events_and_learns_thread_id() {
        let connection = connect(FAKE_CODEX).await;
        let mut thread = connection
            .start_thread(&ThreadOptions::new("/tmp"))
            .await
            .expect("thread should start");
        assert_eq!(thread.id(), None);

        let events = thread
            .run_streamed("hello")
            .await
            .expect("run should start")
            .collect::<Vec<_>>()
            .await;

        assert_eq!(thread.id().as_deref(), Some("th_exec"));
        assert_eq!(
            events,
            vec![
                Ok(BackendEvent::ThreadStarted {
                    thread_id: "th_exec".to_string()
                }),
                Ok(BackendEvent::ItemCompleted {
                    item: ThreadItem::AgentMessage {
                        id: "m1".to_string(),
                        text: "sk-test-key|http://127.0.0.1:9/v1|hello".to_string(),
                    }
                }),
                Ok(BackendEvent::ItemCompleted {
                    item: ThreadItem::CommandExecution {
                        id: "c1".to_string(),
                        command: "ls".to_string(),
                        aggregated_output: "a.txt".to_string(),
                        exit_code: Some(0),
                        status: ItemStatus::Completed,
                    }
                }),
                Ok(BackendEvent::TurnCompleted {
                    usage: Usage {
                        input_tokens: Some(5),
                        cached_input_tokens: None,
                        output_tokens: Some(2),
                    }
                }),
            ]
        );
    }

    #[tokio::test]
    async fn test_rejected_resume_fails_run_start() {
        let connection = connect(FAKE_CODEX).await;
        let mut thread = connection
            .resume_thread("th_missing", &ThreadOptions::new("/tmp"))
            .await
            .expect("resume handle should be created");

        match thread.run_streamed("continue").await {
            Err(BackendError::SessionRejected { thread_id, message }) => {
                assert_eq!(thread_id, "th_missing");
                assert!(message.contains("thread th_missing not found"));
            }
            Err(other) => panic!("expected SessionRejected, got {other:?}"),
            Ok(_) => panic!("expected SessionRejected, got a stream"),
        }
    }

    #[tokio::test]
    async fn test_failure_before_output_fails_run_start() {
        let connection = connect(BROKEN_CODEX).await;
        let mut thread = connection
            .start_thread(&ThreadOptions::new("/tmp"))
            .await
            .expect("thread should start");

        match thread.run_streamed("hello").await {
            Err(BackendError::Transport { message, .. }) => {
                assert!(message.contains("unexpected argument"));
            }
            Err(other) => panic!("expected Transport, got {other:?}"),
            Ok(_) => panic!("expected Transport, got a stream"),
        }
    }

    #[tokio::test]
    async fn test_crash_mid_run_ends_stream_with_error() {
        let connection = connect(FAKE_CODEX).await;
        let mut thread = connection
            .start_thread(&ThreadOptions::new("/tmp"))
            .await
            .expect("thread should start");

        let events = thread
            .run_streamed("please crash")
            .await
            .expect("run should start")
            .collect::<Vec<_>>()
            .await;

        assert_eq!(events.len(), 4);
        match events.last() {
            Some(Err(BackendError::Transport { message, .. })) => {
                assert!(message.contains("panicked at core/src/exec.rs"));
            }
            other => panic!("expected trailing transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_child_finishes_shutdown_after_turn_completed() {
        let marker = std::env::temp_dir().join(format!(
            "codex-exec-shutdown-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&marker);
        let script = SLOW_SHUTDOWN_CODEX.replace("__MARKER__", &marker.to_string_lossy());
        let connection = connect(&script).await;

        let events = SessionAdapter::new(connection, "/tmp")
            .query(QueryOptions::new("hello"))
            .await
            .expect("query should start")
            .collect::<Vec<_>>()
            .await;

        assert_eq!(events.len(), 4);
        assert!(events.iter().all(Result::is_ok));
        assert!(
            marker.exists(),
            "codex should run to exit before the stream ends"
        );
        let _ = std::fs::remove_file(&marker);
    }

    #[tokio::test]
    async fn test_large_stderr_before_reading_prompt_does_not_stall() {
        let connection = connect(NOISY_CODEX).await;
        let mut thread = connection
            .start_thread(&ThreadOptions::new("/tmp"))
            .await
            .expect("thread should start");
        let prompt = "p".repeat(256 * 1024);

        let events = tokio::time::timeout(std::time::Duration::from_secs(10), async {
            thread
                .run_streamed(&prompt)
                .await
                .expect("run should start")
                .collect::<Vec<_>>()
                .await
        })
        .await
        .expect("run should not stall on full pipes");

        assert_eq!(events.len(), 2);
        assert!(events.iter().all(Result::is_ok));
    }
}
