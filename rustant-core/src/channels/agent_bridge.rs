//! Channels ↔ Multi-Agent bridge — routes channel messages to the multi-agent system.

use crate::channels::{ChannelMessage, ChannelType, ChannelUser};
use crate::multi::messaging::{AgentEnvelope, AgentPayload};
use crate::multi::routing::{AgentRouter, RouteRequest};
use std::collections::HashMap;
use uuid::Uuid;

/// Bridge routing channel messages to agents and back.
pub struct ChannelAgentBridge {
    router: AgentRouter,
}

impl ChannelAgentBridge {
    pub fn new(router: AgentRouter) -> Self {
        Self { router }
    }

    /// Route a channel message to the appropriate agent.
    /// Returns the target agent ID.
    pub fn route_channel_message(&self, msg: &ChannelMessage, default_agent: Uuid) -> Uuid {
        let text = msg.content.as_text().unwrap_or("").to_string();
        let request = RouteRequest::new()
            .with_channel(msg.channel_type)
            .with_user(&msg.sender.id)
            .with_message(text);
        self.router.route(&request).unwrap_or(default_agent)
    }

    /// Wrap a channel message into an AgentEnvelope (TaskRequest payload).
    pub fn channel_message_to_envelope(
        msg: &ChannelMessage,
        from: Uuid,
        to: Uuid,
    ) -> AgentEnvelope {
        let text = msg.content.as_text().unwrap_or("").to_string();
        let mut args = HashMap::new();
        args.insert("channel_type".into(), format!("{:?}", msg.channel_type));
        args.insert("channel_id".into(), msg.channel_id.clone());
        args.insert("sender".into(), msg.sender.id.clone());

        AgentEnvelope::new(
            from,
            to,
            AgentPayload::TaskRequest {
                description: text,
                args,
            },
        )
    }

    /// Extract a ChannelMessage from an AgentEnvelope (if it contains a TaskResult).
    pub fn envelope_to_channel_message(
        envelope: &AgentEnvelope,
        channel_type: ChannelType,
    ) -> Option<ChannelMessage> {
        match &envelope.payload {
            AgentPayload::TaskResult { output, .. } => {
                let sender = ChannelUser::new("agent", channel_type);
                Some(ChannelMessage::text(
                    channel_type,
                    "agent-response",
                    sender,
                    output,
                ))
            }
            AgentPayload::Response { answer, .. } => {
                let sender = ChannelUser::new("agent", channel_type);
                Some(ChannelMessage::text(
                    channel_type,
                    "agent-response",
                    sender,
                    answer,
                ))
            }
            _ => None,
        }
    }
}
