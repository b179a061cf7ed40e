use indexmap::IndexMap;
use tracing::info;

use crate::core::types::{ExternalToolServer, ServerDescriptor, ServerKind};

/// Namespace the backend prefixes onto external tool names.
pub const EXTERNAL_TOOL_NAMESPACE: &str = "mcp";

/// Derives the backend-facing descriptor of each host tool server.
///
/// Only names and metadata cross over; schemas and handlers stay with the
/// host, which serves the calls the backend routes back to it.
pub fn to_backend_config(
    servers: &IndexMap<String, ExternalToolServer>,
) -> IndexMap<String, ServerDescriptor> {
    servers
        .iter()
        .map(|(key, server)| {
            info!(
                server = %key,
                tools = server.tools.len(),
                "registering host tool server"
            );

            let descriptor = ServerDescriptor {
                kind: ServerKind::HostManaged,
                name: server.name.clone(),
                version: server.version.clone(),
                tools: server.tools.iter().map(|tool| tool.name.clone()).collect(),
            };
            (key.clone(), descriptor)
        })
        .collect()
}

/// Keeps only allow-listed tools. Entries may name a tool bare (`search`) or
/// by its composite backend name (`mcp__docs__search`). Servers left without
/// tools are dropped.
pub fn restrict_to_allowed(
    descriptors: IndexMap<String, ServerDescriptor>,
    allowed: &[String],
) -> IndexMap<String, ServerDescriptor> {
    descriptors
        .into_iter()
        .filter_map(|(key, mut descriptor)| {
            descriptor.tools.retain(|tool| {
                let composite = composite_tool_name(&key, tool);
                allowed
                    .iter()
                    .any(|entry| entry == tool || *entry == composite)
            });

            if descriptor.tools.is_empty() {
                None
            } else {
                Some((key, descriptor))
            }
        })
        .collect()
}

/// `<namespace>__<server>__<tool>`, the name external tool calls surface under.
pub fn composite_tool_name(server: &str, tool: &str) -> String {
    format!("{EXTERNAL_TOOL_NAMESPACE}__{server}__{tool}")
}
