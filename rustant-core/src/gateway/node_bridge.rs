//! Gateway ↔ Nodes bridge — translates between gateway task events and node tasks.

use crate::gateway::events::ServerMessage;
use crate::nodes::types::{Capability, NodeResult, NodeTask};
use std::collections::HashMap;

/// Bridge connecting Gateway task events to the Node system.
pub struct NodeBridge;

impl NodeBridge {
    pub fn new() -> Self {
        Self
    }

    /// Route a task name and args from the gateway into a NodeTask, if applicable.
    pub fn route_task_to_node(
        &self,
        task_name: &str,
        args: &HashMap<String, String>,
    ) -> Option<NodeTask> {
        let capability = match task_name {
            "shell" | "execute" | "run" => Some(Capability::Shell),
            "applescript" | "osascript" => Some(Capability::AppleScript),
            "screenshot" | "capture" => Some(Capability::Screenshot),
            "clipboard" | "paste" => Some(Capability::Clipboard),
            "filesystem" | "file" | "read_file" | "write_file" => Some(Capability::FileSystem),
            "notify" | "notification" => Some(Capability::Notifications),
            "browser" | "open_url" => Some(Capability::Browser),
            _ => None,
        };

        capability.map(|cap| {
            let command = args
                .get("command")
                .cloned()
                .unwrap_or_else(|| task_name.to_string());
            let mut task = NodeTask::new(cap, command);
            if let Some(timeout) = args.get("timeout") {
                if let Ok(secs) = timeout.parse() {
                    task = task.with_timeout(secs);
                }
            }
            if let Some(task_args) = args.get("args") {
                task = task.with_args(task_args.split_whitespace().map(String::from).collect());
            }
            task
        })
    }

    /// Convert a NodeResult into a ServerMessage.
    pub fn node_result_to_server_message(result: &NodeResult) -> ServerMessage {
        if result.success {
            ServerMessage::Event {
                event: crate::gateway::events::GatewayEvent::TaskCompleted {
                    task_id: result.task_id,
                    success: true,
                    summary: result.output.clone(),
                },
            }
        } else {
            ServerMessage::Event {
                event: crate::gateway::events::GatewayEvent::TaskCompleted {
                    task_id: result.task_id,
                    success: false,
                    summary: result.output.clone(),
                },
            }
        }
    }
}

impl Default for NodeBridge {
    fn default() -> Self {
        Self::new()
    }
}
