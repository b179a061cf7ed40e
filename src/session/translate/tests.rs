use super::*;
use crate::core::types::{FileChange, FileChangeKind, ItemStatus, ThreadError, Usage};

fn options_with(prompt: &str) -> QueryOptions {
    QueryOptions::new(prompt)
}

#[test]
fn test_compose_prompt_plain() {
    assert_eq!(compose_prompt(&options_with("fix bug")), "fix bug");
}

#[test]
fn test_compose_prompt_orders_images_system_then_prompt() {
    let mut options = options_with("describe the screenshots");
    options.system_prompt = Some("Answer tersely.".to_string());
    options.images = vec![
        "https://img.example.com/a.png".to_string(),
        "https://img.example.com/b.png".to_string(),
    ];

    assert_eq!(
        compose_prompt(&options),
        "[Attached images: 2]\n\
         Image 1: https://img.example.com/a.png\n\
         Image 2: https://img.example.com/b.png\n\
         \n\
         System instructions:\n\
         Answer tersely.\n\
         \n\
         describe the screenshots"
    );
}

#[test]
fn test_compose_prompt_skips_absent_blocks() {
    let mut system_only = options_with("go");
    system_only.system_prompt = Some("Be careful.".to_string());
    assert_eq!(
        compose_prompt(&system_only),
        "System instructions:\nBe careful.\n\ngo"
    );

    let mut images_only = options_with("go");
    images_only.images = vec!["https://img.example.com/a.png".to_string()];
    assert_eq!(
        compose_prompt(&images_only),
        "[Attached images: 1]\nImage 1: https://img.example.com/a.png\n\ngo"
    );

    let mut blank_system = options_with("go");
    blank_system.system_prompt = Some("   ".to_string());
    assert_eq!(compose_prompt(&blank_system), "go");
}

#[test]
fn test_translate_lifecycle_events() {
    assert_eq!(
        translate_event(BackendEvent::ThreadStarted {
            thread_id: "th_1".to_string()
        }),
        Some(NormalizedEvent::System(SystemEvent::Init {
            session_id: "th_1".to_string()
        }))
    );
    assert_eq!(
        translate_event(BackendEvent::TurnStarted),
        Some(NormalizedEvent::System(SystemEvent::TurnStart))
    );
    assert_eq!(
        translate_event(BackendEvent::TurnFailed {
            error: ThreadError {
                message: "context window exceeded".to_string()
            }
        }),
        Some(NormalizedEvent::Error {
            message: "context window exceeded".to_string()
        })
    );
}

#[test]
fn test_translate_usage_passes_absent_counts_through() {
    let usage = Usage {
        input_tokens: Some(100),
        cached_input_tokens: None,
        output_tokens: None,
    };

    assert_eq!(
        translate_event(BackendEvent::TurnCompleted {
            usage: usage.clone()
        }),
        Some(NormalizedEvent::Usage(usage))
    );
}

#[test]
fn test_translate_completed_items() {
    let text = translate_event(BackendEvent::ItemCompleted {
        item: ThreadItem::AgentMessage {
            id: "m1".to_string(),
            text: "Done.".to_string(),
        },
    });
    assert_eq!(
        text,
        Some(NormalizedEvent::Text {
            text: "Done.".to_string()
        })
    );

    let reasoning = translate_event(BackendEvent::ItemCompleted {
        item: ThreadItem::Reasoning {
            id: "r1".to_string(),
            text: "Looking at the failing test".to_string(),
        },
    });
    assert_eq!(
        reasoning,
        Some(NormalizedEvent::Reasoning {
            text: "Looking at the failing test".to_string()
        })
    );
}

#[test]
fn test_translate_command_execution_as_shell_tool() {
    let event = translate_event(BackendEvent::ItemCompleted {
        item: ThreadItem::CommandExecution {
            id: "c1".to_string(),
            command: "cargo test".to_string(),
            aggregated_output: "test result: ok".to_string(),
            exit_code: Some(0),
            status: ItemStatus::Completed,
        },
    });

    assert_eq!(
        event,
        Some(NormalizedEvent::ToolUse(ToolUse {
            id: "c1".to_string(),
            name: SHELL_TOOL_NAME.to_string(),
            detail: ToolUseDetail::Shell {
                command: "cargo test".to_string(),
                aggregated_output: "test result: ok".to_string(),
                exit_code: Some(0),
                status: ItemStatus::Completed,
            },
        }))
    );
}

#[test]
fn test_translate_file_change_keeps_change_list() {
    let changes = vec![
        FileChange {
            path: "src/lib.rs".to_string(),
            kind: FileChangeKind::Update,
        },
        FileChange {
            path: "src/new.rs".to_string(),
            kind: FileChangeKind::Add,
        },
    ];

    let event = translate_event(BackendEvent::ItemCompleted {
        item: ThreadItem::FileChange {
            id: "p1".to_string(),
            changes: changes.clone(),
            status: ItemStatus::Completed,
        },
    });

    assert_eq!(
        event,
        Some(NormalizedEvent::ToolUse(ToolUse {
            id: "p1".to_string(),
            name: FILE_CHANGE_TOOL_NAME.to_string(),
            detail: ToolUseDetail::FileChange {
                changes,
                status: ItemStatus::Completed,
            },
        }))
    );
}

#[test]
fn test_translate_external_tool_call_uses_composite_name() {
    let event = translate_event(BackendEvent::ItemCompleted {
        item: ThreadItem::McpToolCall {
            id: "t1".to_string(),
            server: "docs".to_string(),
            tool: "search".to_string(),
            status: ItemStatus::Failed,
        },
    });

    let Some(NormalizedEvent::ToolUse(tool_use)) = event else {
        panic!("expected tool_use, got {event:?}");
    };
    assert_eq!(tool_use.name, "mcp__docs__search");
    assert_eq!(
        tool_use.detail,
        ToolUseDetail::External {
            server: "docs".to_string(),
            tool: "search".to_string(),
            status: ItemStatus::Failed,
        }
    );
}

#[test]
fn test_translate_drops_partial_and_unknown_events() {
    let item = ThreadItem::AgentMessage {
        id: "m1".to_string(),
        text: "partial".to_string(),
    };

    assert_eq!(
        translate_event(BackendEvent::ItemStarted { item: item.clone() }),
        None
    );
    assert_eq!(translate_event(BackendEvent::ItemUpdated { item }), None);
    assert_eq!(translate_event(BackendEvent::Unrecognized), None);
    assert_eq!(
        translate_event(BackendEvent::ItemCompleted {
            item: ThreadItem::Unrecognized
        }),
        None
    );
}

#[test]
fn test_ends_stream_on_turn_outcome_and_errors() {
    assert!(ends_stream(&BackendEvent::TurnCompleted {
        usage: Usage::default()
    }));
    assert!(ends_stream(&BackendEvent::TurnFailed {
        error: ThreadError {
            message: "x".to_string()
        }
    }));
    assert!(ends_stream(&BackendEvent::Error {
        message: "x".to_string()
    }));
    assert!(!ends_stream(&BackendEvent::TurnStarted));
    assert!(!ends_stream(&BackendEvent::Unrecognized));
}
