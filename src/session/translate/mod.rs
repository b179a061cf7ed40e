//! Pure translation between host requests, backend events and normalized events.

use crate::core::types::{
    BackendEvent, NormalizedEvent, QueryOptions, SystemEvent, ThreadItem, ToolUse, ToolUseDetail,
};
use crate::tools::composite_tool_name;

pub const SHELL_TOOL_NAME: &str = "shell";
pub const FILE_CHANGE_TOOL_NAME: &str = "file_change";

const BLOCK_SEPARATOR: &str = "\n\n";

/// Builds the outbound prompt: image manifest, then system prompt, then the
/// caller's prompt, separated by one blank line.
pub fn compose_prompt(options: &QueryOptions) -> String {
    let mut blocks = Vec::with_capacity(3);

    if !options.images.is_empty() {
        let mut manifest = format!("[Attached images: {}]", options.images.len());
        for (index, url) in options.images.iter().enumerate() {
            manifest.push_str(&format!("\nImage {}: {url}", index + 1));
        }
        blocks.push(manifest);
    }

    if let Some(system_prompt) = options
        .system_prompt
        .as_deref()
        .filter(|text| !text.trim().is_empty())
    {
        blocks.push(format!("System instructions:\n{system_prompt}"));
    }

    blocks.push(options.prompt.clone());
    blocks.join(BLOCK_SEPARATOR)
}

/// Maps one backend event to at most one normalized event.
///
/// Item start/update notifications and kinds this crate does not know are
/// dropped; only completed items surface.
pub fn translate_event(event: BackendEvent) -> Option<NormalizedEvent> {
    match event {
        BackendEvent::ThreadStarted { thread_id } => {
            Some(NormalizedEvent::System(SystemEvent::Init {
                session_id: thread_id,
            }))
        }
        BackendEvent::TurnStarted => Some(NormalizedEvent::System(SystemEvent::TurnStart)),
        BackendEvent::ItemCompleted { item } => translate_item(item),
        BackendEvent::TurnCompleted { usage } => Some(NormalizedEvent::Usage(usage)),
        BackendEvent::TurnFailed { error } => Some(NormalizedEvent::Error {
            message: error.message,
        }),
        BackendEvent::Error { message } => Some(NormalizedEvent::Error { message }),
        BackendEvent::ItemStarted { .. }
        | BackendEvent::ItemUpdated { .. }
        | BackendEvent::Unrecognized => None,
    }
}

/// Whether the backend has signalled the end of the turn.
pub fn ends_stream(event: &BackendEvent) -> bool {
    matches!(
        event,
        BackendEvent::TurnCompleted { .. }
            | BackendEvent::TurnFailed { .. }
            | BackendEvent::Error { .. }
    )
}

fn translate_item(item: ThreadItem) -> Option<NormalizedEvent> {
    match item {
        ThreadItem::AgentMessage { text, .. } => Some(NormalizedEvent::Text { text }),
        ThreadItem::Reasoning { text, .. } => Some(NormalizedEvent::Reasoning { text }),
        ThreadItem::CommandExecution {
            id,
            command,
            aggregated_output,
            exit_code,
            status,
        } => Some(NormalizedEvent::ToolUse(ToolUse {
            id,
            name: SHELL_TOOL_NAME.to_string(),
            detail: ToolUseDetail::Shell {
                command,
                aggregated_output,
                exit_code,
                status,
            },
        })),
        ThreadItem::FileChange {
            id,
            changes,
            status,
        } => Some(NormalizedEvent::ToolUse(ToolUse {
            id,
            name: FILE_CHANGE_TOOL_NAME.to_string(),
            detail: ToolUseDetail::FileChange { changes, status },
        })),
        ThreadItem::McpToolCall {
            id,
            server,
            tool,
            status,
        } => Some(NormalizedEvent::ToolUse(ToolUse {
            id,
            name: composite_tool_name(&server, &tool),
            detail: ToolUseDetail::External {
                server,
                tool,
                status,
            },
        })),
        ThreadItem::Unrecognized => None,
    }
}

#[cfg(test)]
mod tests;
