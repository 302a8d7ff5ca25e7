//! TuiCallback: bridges AgentCallback to TUI event channel.
//!
//! The Agent runs in a background tokio task. Each AgentCallback method
//! sends a TuiEvent through an unbounded mpsc channel, which the TUI
//! main loop polls with tokio::select!.
//!
//! For approval requests, a oneshot channel is used so the agent
//! suspends until the user responds in the TUI.

use rustant_core::explanation::DecisionExplanation;
use rustant_core::safety::{ActionRequest, ApprovalDecision};
use rustant_core::types::{AgentStatus, CostEstimate, ProgressUpdate, TokenUsage, ToolOutput};
use rustant_core::AgentCallback;
use tokio::sync::{mpsc, oneshot};

/// Events sent from the Agent (via TuiCallback) to the TUI event loop.
#[derive(Debug)]
pub enum TuiEvent {
    /// The assistant produced a complete message.
    AssistantMessage(String),
    /// A single streaming token arrived.
    StreamToken(String),
    /// An approval is needed. The TUI must send the decision via the oneshot.
    ApprovalRequest {
        action: ActionRequest,
        reply: oneshot::Sender<ApprovalDecision>,
    },
    /// A tool started executing.
    ToolStart {
        name: String,
        args: serde_json::Value,
    },
    /// A tool finished executing.
    ToolResult {
        name: String,
        output: ToolOutput,
        duration_ms: u64,
    },
    /// The agent status changed.
    StatusChange(AgentStatus),
    /// Token usage and cost update after an LLM call.
    UsageUpdate {
        usage: TokenUsage,
        cost: CostEstimate,
    },
    /// Decision explanation for a tool selection.
    DecisionExplanation(DecisionExplanation),
    /// Budget warning or exceeded notification.
    BudgetWarning {
        message: String,
        severity: rustant_core::BudgetSeverity,
    },
    /// Progress update during tool execution (streaming output, etc.).
    Progress(ProgressUpdate),
    /// Multi-agent status update for the task board.
    #[allow(dead_code)]
    MultiAgentUpdate(Vec<crate::tui::widgets::task_board::AgentSummary>),
    /// A clarification question from the agent. The TUI must send the answer via the oneshot.
    ClarificationRequest {
        question: String,
        reply: oneshot::Sender<String>,
    },
    /// Context window health notification (warnings, compression events).
    ContextHealth(rustant_core::ContextHealthEvent),
    /// A channel digest has been generated.
    ChannelDigest(serde_json::Value),
    /// A channel message needs immediate user attention.
    ChannelAlert {
        channel: String,
        sender: String,
        summary: String,
    },
    /// A scheduled follow-up reminder has been triggered.
    Reminder(serde_json::Value),
}

/// Implements AgentCallback by forwarding events through an mpsc channel.
pub struct TuiCallback {
    tx: mpsc::UnboundedSender<TuiEvent>,
}

impl TuiCallback {
    /// Create a new TuiCallback and its corresponding receiver.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TuiEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Create from an existing sender (useful for testing).
    #[allow(dead_code)]
    pub fn from_sender(tx: mpsc::UnboundedSender<TuiEvent>) -> Self {
        Self { tx }
    }
}

#[async_trait::async_trait]
impl AgentCallback for TuiCallback {
    async fn on_assistant_message(&self, message: &str) {
        let _ = self
            .tx
            .send(TuiEvent::AssistantMessage(message.to_string()));
    }

    async fn on_token(&self, token: &str) {
        let _ = self.tx.send(TuiEvent::StreamToken(token.to_string()));
    }

    async fn request_approval(&self, action: &ActionRequest) -> ApprovalDecision {
        let (reply_tx, reply_rx) = oneshot::channel();
        let sent = self.tx.send(TuiEvent::ApprovalRequest {
            action: action.clone(),
            reply: reply_tx,
        });
        if sent.is_err() {
            return ApprovalDecision::Deny;
        }
        // Block (async) until the TUI sends a decision.
        reply_rx.await.unwrap_or(ApprovalDecision::Deny)
    }

    async fn on_tool_start(&self, tool_name: &str, args: &serde_json::Value) {
        let _ = self.tx.send(TuiEvent::ToolStart {
            name: tool_name.to_string(),
            args: args.clone(),
        });
    }

    async fn on_tool_result(&self, tool_name: &str, output: &ToolOutput, duration_ms: u64) {
        let _ = self.tx.send(TuiEvent::ToolResult {
            name: tool_name.to_string(),
            output: output.clone(),
            duration_ms,
        });
    }

    async fn on_status_change(&self, status: AgentStatus) {
        let _ = self.tx.send(TuiEvent::StatusChange(status));
    }

    async fn on_usage_update(&self, usage: &TokenUsage, cost: &CostEstimate) {
        let _ = self.tx.send(TuiEvent::UsageUpdate {
            usage: *usage,
            cost: *cost,
        });
    }

    async fn on_decision_explanation(&self, explanation: &DecisionExplanation) {
        let _ = self
            .tx
            .send(TuiEvent::DecisionExplanation(explanation.clone()));
    }

    async fn on_budget_warning(&self, message: &str, severity: rustant_core::BudgetSeverity) {
        let _ = self.tx.send(TuiEvent::BudgetWarning {
            message: message.to_string(),
            severity,
        });
    }

    async fn on_progress(&self, progress: &ProgressUpdate) {
        let _ = self.tx.send(TuiEvent::Progress(progress.clone()));
    }

    async fn on_clarification_request(&self, question: &str) -> String {
        let (reply_tx, reply_rx) = oneshot::channel();
        let sent = self.tx.send(TuiEvent::ClarificationRequest {
            question: question.to_string(),
            reply: reply_tx,
        });
        if sent.is_err() {
            return String::new();
        }
        // Block (async) until the TUI sends the user's answer.
        reply_rx.await.unwrap_or_default()
    }

    async fn on_context_health(&self, event: &rustant_core::ContextHealthEvent) {
        let _ = self.tx.send(TuiEvent::ContextHealth(event.clone()));
    }

    async fn on_channel_digest(&self, digest: &serde_json::Value) {
        let _ = self.tx.send(TuiEvent::ChannelDigest(digest.clone()));
    }

    async fn on_channel_alert(&self, channel: &str, sender: &str, summary: &str) {
        let _ = self.tx.send(TuiEvent::ChannelAlert {
            channel: channel.to_string(),
            sender: sender.to_string(),
            summary: summary.to_string(),
        });
    }

    async fn on_reminder(&self, reminder: &serde_json::Value) {
        let _ = self.tx.send(TuiEvent::Reminder(reminder.clone()));
    }
}
