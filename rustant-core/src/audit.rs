//! Audit trail — unified execution trace, querying, export, and analytics.
//!
//! Provides a complete audit system that unifies safety audit events,
//! tool execution records, and token/cost tracking into a single
//! queryable, exportable trace.

use crate::merkle::{MerkleChain, VerificationResult};
use crate::safety::AuditEvent;
use crate::types::{CostEstimate, RiskLevel, TokenUsage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// TraceEvent + TraceEventKind
// ---------------------------------------------------------------------------

/// A single event within an execution trace, tagged with a monotonically
/// increasing sequence number and a wall-clock timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEvent {
    /// Monotonically increasing sequence number within the trace.
    pub sequence: usize,
    /// Wall-clock time at which the event was recorded.
    pub timestamp: DateTime<Utc>,
    /// The payload describing what happened.
    pub kind: TraceEventKind,
}

/// Discriminated union of all event kinds that may appear in a trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TraceEventKind {
    TaskStarted {
        task_id: Uuid,
        goal: String,
    },
    TaskCompleted {
        task_id: Uuid,
        success: bool,
        iterations: usize,
    },
    ToolRequested {
        tool: String,
        risk_level: RiskLevel,
        args_summary: String,
    },
    ToolApproved {
        tool: String,
    },
    ToolDenied {
        tool: String,
        reason: String,
    },
    ApprovalRequested {
        tool: String,
        context: String,
    },
    ApprovalDecision {
        tool: String,
        approved: bool,
    },
    ToolExecuted {
        tool: String,
        success: bool,
        duration_ms: u64,
        output_preview: String,
    },
    LlmCall {
        model: String,
        input_tokens: usize,
        output_tokens: usize,
        cost: f64,
    },
    StatusChange {
        from: String,
        to: String,
    },
    Error {
        message: String,
    },
}

impl TraceEventKind {
    /// Convert a safety-layer [`AuditEvent`] into the corresponding
    /// [`TraceEventKind`].
    pub fn from_audit_event(event: &AuditEvent) -> Self {
        match event {
            AuditEvent::ActionRequested {
                tool,
                risk_level,
                description,
            } => TraceEventKind::ToolRequested {
                tool: tool.clone(),
                risk_level: *risk_level,
                args_summary: description.clone(),
            },
            AuditEvent::ActionApproved { tool } => {
                TraceEventKind::ToolApproved { tool: tool.clone() }
            }
            AuditEvent::ActionDenied { tool, reason } => TraceEventKind::ToolDenied {
                tool: tool.clone(),
                reason: reason.clone(),
            },
            AuditEvent::ActionExecuted {
                tool,
                success,
                duration_ms,
            } => TraceEventKind::ToolExecuted {
                tool: tool.clone(),
                success: *success,
                duration_ms: *duration_ms,
                output_preview: String::new(),
            },
            AuditEvent::ApprovalRequested { tool, context } => TraceEventKind::ApprovalRequested {
                tool: tool.clone(),
                context: context.clone(),
            },
            AuditEvent::ApprovalDecision { tool, approved } => TraceEventKind::ApprovalDecision {
                tool: tool.clone(),
                approved: *approved,
            },
        }
    }

    /// Return the event type as a human-readable tag (e.g. `"tool_requested"`).
    fn type_tag(&self) -> &'static str {
        match self {
            TraceEventKind::TaskStarted { .. } => "task_started",
            TraceEventKind::TaskCompleted { .. } => "task_completed",
            TraceEventKind::ToolRequested { .. } => "tool_requested",
            TraceEventKind::ToolApproved { .. } => "tool_approved",
            TraceEventKind::ToolDenied { .. } => "tool_denied",
            TraceEventKind::ApprovalRequested { .. } => "approval_requested",
            TraceEventKind::ApprovalDecision { .. } => "approval_decision",
            TraceEventKind::ToolExecuted { .. } => "tool_executed",
            TraceEventKind::LlmCall { .. } => "llm_call",
            TraceEventKind::StatusChange { .. } => "status_change",
            TraceEventKind::Error { .. } => "error",
        }
    }

    /// Return the tool name referenced by this event, if any.
    fn tool_name(&self) -> Option<&str> {
        match self {
            TraceEventKind::ToolRequested { tool, .. }
            | TraceEventKind::ToolApproved { tool }
            | TraceEventKind::ToolDenied { tool, .. }
            | TraceEventKind::ApprovalRequested { tool, .. }
            | TraceEventKind::ApprovalDecision { tool, .. }
            | TraceEventKind::ToolExecuted { tool, .. } => Some(tool),
            _ => None,
        }
    }

    /// Produce a short, single-line human-readable summary of the event.
    fn summary(&self) -> String {
        match self {
            TraceEventKind::TaskStarted { goal, .. } => format!("Task started: {}", goal),
            TraceEventKind::TaskCompleted {
                success,
                iterations,
                ..
            } => {
                let tag = if *success { "SUCCESS" } else { "FAILED" };
                format!("Task completed [{}] after {} iterations", tag, iterations)
            }
            TraceEventKind::ToolRequested {
                tool, risk_level, ..
            } => format!("Tool requested: {} (risk: {})", tool, risk_level),
            TraceEventKind::ToolApproved { tool } => format!("Tool approved: {}", tool),
            TraceEventKind::ToolDenied { tool, reason } => {
                format!("Tool denied: {} — {}", tool, reason)
            }
            TraceEventKind::ApprovalRequested { tool, .. } => {
                format!("Approval requested for: {}", tool)
            }
            TraceEventKind::ApprovalDecision { tool, approved } => {
                let decision = if *approved { "approved" } else { "denied" };
                format!("Approval decision for {}: {}", tool, decision)
            }
            TraceEventKind::ToolExecuted {
                tool,
                success,
                duration_ms,
                ..
            } => {
                let tag = if *success { "OK" } else { "ERR" };
                format!("Tool executed: {} [{}] ({}ms)", tool, tag, duration_ms)
            }
            TraceEventKind::LlmCall {
                model,
                input_tokens,
                output_tokens,
                cost,
            } => format!(
                "LLM call: {} ({}/{} tokens, ${:.4})",
                model, input_tokens, output_tokens, cost
            ),
            TraceEventKind::StatusChange { from, to } => {
                format!("Status: {} -> {}", from, to)
            }
            TraceEventKind::Error { message } => format!("Error: {}", message),
        }
    }

    /// Extract CSV detail string (tool name + extra info) for tabular export.
    fn csv_details(&self) -> (String, String) {
        match self {
            TraceEventKind::TaskStarted { goal, .. } => (String::new(), goal.clone()),
            TraceEventKind::TaskCompleted {
                success,
                iterations,
                ..
            } => (
                String::new(),
                format!("success={} iterations={}", success, iterations),
            ),
            TraceEventKind::ToolRequested {
                tool,
                risk_level,
                args_summary,
            } => (
                tool.clone(),
                format!("risk={} args={}", risk_level, args_summary),
            ),
            TraceEventKind::ToolApproved { tool } => (tool.clone(), String::new()),
            TraceEventKind::ToolDenied { tool, reason } => (tool.clone(), reason.clone()),
            TraceEventKind::ApprovalRequested { tool, context } => (tool.clone(), context.clone()),
            TraceEventKind::ApprovalDecision { tool, approved } => {
                (tool.clone(), format!("approved={}", approved))
            }
            TraceEventKind::ToolExecuted {
                tool,
                success,
                duration_ms,
                output_preview,
            } => (
                tool.clone(),
                format!(
                    "success={} duration_ms={} output={}",
                    success, duration_ms, output_preview
                ),
            ),
            TraceEventKind::LlmCall {
                model,
                input_tokens,
                output_tokens,
                cost,
            } => (
                String::new(),
                format!(
                    "model={} in={} out={} cost={:.6}",
                    model, input_tokens, output_tokens, cost
                ),
            ),
            TraceEventKind::StatusChange { from, to } => {
                (String::new(), format!("{} -> {}", from, to))
            }
            TraceEventKind::Error { message } => (String::new(), message.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// ExecutionTrace
// ---------------------------------------------------------------------------

/// The full execution history of a single task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionTrace {
    pub trace_id: Uuid,
    pub session_id: Uuid,
    pub task_id: Uuid,
    pub goal: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub success: Option<bool>,
    pub iterations: usize,
    pub events: Vec<TraceEvent>,
    pub total_usage: TokenUsage,
    pub total_cost: CostEstimate,
}

impl ExecutionTrace {
    /// Create a new, in-progress execution trace.
    pub fn new(session_id: Uuid, task_id: Uuid, goal: impl Into<String>) -> Self {
        let goal = goal.into();
        let now = Utc::now();
        let mut trace = Self {
            trace_id: Uuid::new_v4(),
            session_id,
            task_id,
            goal: goal.clone(),
            started_at: now,
            completed_at: None,
            success: None,
            iterations: 0,
            events: Vec::new(),
            total_usage: TokenUsage::default(),
            total_cost: CostEstimate::default(),
        };
        // Record the initial task-started event.
        trace.push_event(TraceEventKind::TaskStarted { task_id, goal });
        trace
    }

    /// Append an event to the trace with an auto-assigned sequence number.
    pub fn push_event(&mut self, kind: TraceEventKind) {
        let seq = self.events.len();
        self.events.push(TraceEvent {
            sequence: seq,
            timestamp: Utc::now(),
            kind,
        });
    }

    /// Mark the trace as completed.
    pub fn complete(&mut self, success: bool) {
        self.completed_at = Some(Utc::now());
        self.success = Some(success);
        self.push_event(TraceEventKind::TaskCompleted {
            task_id: self.task_id,
            success,
            iterations: self.iterations,
        });
    }

    /// Compute the wall-clock duration in milliseconds, if completed.
    pub fn duration_ms(&self) -> Option<u64> {
        self.completed_at.map(|end| {
            let dur = end - self.started_at;
            dur.num_milliseconds().max(0) as u64
        })
    }

    /// Return references to all tool-related events.
    pub fn tool_events(&self) -> Vec<&TraceEvent> {
        self.events
            .iter()
            .filter(|e| {
                matches!(
                    e.kind,
                    TraceEventKind::ToolRequested { .. }
                        | TraceEventKind::ToolApproved { .. }
                        | TraceEventKind::ToolDenied { .. }
                        | TraceEventKind::ToolExecuted { .. }
                )
            })
            .collect()
    }

    /// Return references to all error events.
    pub fn error_events(&self) -> Vec<&TraceEvent> {
        self.events
            .iter()
            .filter(|e| matches!(e.kind, TraceEventKind::Error { .. }))
            .collect()
    }

    /// Return references to all LLM call events.
    pub fn llm_events(&self) -> Vec<&TraceEvent> {
        self.events
            .iter()
            .filter(|e| matches!(e.kind, TraceEventKind::LlmCall { .. }))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// AuditError
// ---------------------------------------------------------------------------

/// Errors that may occur during audit operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AuditError {
    #[error("serialization failed: {0}")]
    SerializationFailed(String),
    #[error("io error: {0}")]
    IoError(String),
    #[error("store is empty")]
    EmptyStore,
    #[error("trace not found: {0}")]
    TraceNotFound(Uuid),
}

// ---------------------------------------------------------------------------
// AuditStore
// ---------------------------------------------------------------------------

/// Persistent, capacity-bounded store of execution traces.
pub struct AuditStore {
    traces: Vec<ExecutionTrace>,
    max_traces: usize,
    merkle_chain: Option<MerkleChain>,
}

impl AuditStore {
    /// Create a new store with the default capacity of 1 000 traces.
    pub fn new() -> Self {
        Self {
            traces: Vec::new(),
            max_traces: 1000,
            merkle_chain: None,
        }
    }

    /// Create a new store with Merkle chain integrity verification enabled.
    pub fn with_merkle_chain() -> Self {
        Self {
            traces: Vec::new(),
            max_traces: 1000,
            merkle_chain: Some(MerkleChain::new()),
        }
    }

    /// Add a trace to the store, evicting the oldest trace when capacity is
    /// reached. If the Merkle chain is enabled, the serialized trace is
    /// appended to the chain for tamper-evident integrity.
    pub fn add_trace(&mut self, trace: ExecutionTrace) {
        // Append to Merkle chain if enabled
        if let Some(ref mut chain) = self.merkle_chain
            && let Ok(serialized) = serde_json::to_vec(&trace) {
                chain.append(&serialized);
            }
        if self.traces.len() >= self.max_traces {
            self.traces.remove(0);
        }
        self.traces.push(trace);
    }

    /// Verify the integrity of the Merkle chain.
    ///
    /// Returns `Some(VerificationResult)` if the chain is enabled, or `None`.
    pub fn verify_integrity(&self) -> Option<VerificationResult> {
        self.merkle_chain.as_ref().map(|chain| chain.verify_chain())
    }

    /// Return the root hash of the Merkle chain, if enabled.
    pub fn merkle_root_hash(&self) -> Option<String> {
        self.merkle_chain
            .as_ref()
            .and_then(|chain| chain.root_hash().map(|h| h.to_string()))
    }

    /// Access the underlying Merkle chain, if present.
    pub fn merkle_chain(&self) -> Option<&MerkleChain> {
        self.merkle_chain.as_ref()
    }

    /// Get a slice of all stored traces.
    pub fn traces(&self) -> &[ExecutionTrace] {
        &self.traces
    }

    /// Look up a trace by its `trace_id`.
    pub fn get_trace(&self, trace_id: Uuid) -> Option<&ExecutionTrace> {
        self.traces.iter().find(|t| t.trace_id == trace_id)
    }

    /// Run a structured query against the store and return matching traces.
    pub fn query(&self, query: &AuditQuery) -> Vec<&ExecutionTrace> {
        self.traces.iter().filter(|t| query.matches(t)).collect()
    }

    /// Return the *n* most recently added traces (most recent last).
    pub fn latest(&self, n: usize) -> Vec<&ExecutionTrace> {
        let start = self.traces.len().saturating_sub(n);
        self.traces[start..].iter().collect()
    }

    /// Persist the store to a JSON file at the given `path`.
    pub fn save(&self, path: &Path) -> Result<(), AuditError> {
        let json = serde_json::to_string_pretty(&self.traces)
            .map_err(|e| AuditError::SerializationFailed(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AuditError::IoError(e.to_string()))?;
        }

        std::fs::write(path, json).map_err(|e| AuditError::IoError(e.to_string()))?;
        Ok(())
    }

    /// Load a store from a JSON file at the given `path`.
    pub fn load(path: &Path) -> Result<Self, AuditError> {
        let json = std::fs::read_to_string(path).map_err(|e| AuditError::IoError(e.to_string()))?;

        let traces: Vec<ExecutionTrace> = serde_json::from_str(&json)
            .map_err(|e| AuditError::SerializationFailed(e.to_string()))?;

        Ok(Self {
            max_traces: 1000,
            traces,
            merkle_chain: None,
        })
    }

    /// Load a store from a JSON file and rebuild the Merkle chain from
    /// the loaded traces.
    pub fn load_with_merkle(path: &Path) -> Result<Self, AuditError> {
        let mut store = Self::load(path)?;
        let mut chain = MerkleChain::new();
        for trace in &store.traces {
            if let Ok(serialized) = serde_json::to_vec(trace) {
                chain.append(&serialized);
            }
        }
        store.merkle_chain = Some(chain);
        Ok(store)
    }

    /// Return the number of stored traces.
    pub fn len(&self) -> usize {
        self.traces.len()
    }

    /// Check whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }
}

impl Default for AuditStore {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// AuditQuery
// ---------------------------------------------------------------------------

/// Filtering criteria for querying the [`AuditStore`].
///
/// Uses a builder pattern so callers can compose predicates fluently:
/// ```ignore
/// let q = AuditQuery::new()
///     .for_session(session_id)
///     .min_risk(RiskLevel::Execute)
///     .successful();
/// ```
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    pub session_id: Option<Uuid>,
    pub task_id: Option<Uuid>,
    pub tool_name: Option<String>,
    pub risk_level_min: Option<RiskLevel>,
    pub success_only: Option<bool>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl AuditQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_session(mut self, id: Uuid) -> Self {
        self.session_id = Some(id);
        self
    }

    pub fn for_task(mut self, id: Uuid) -> Self {
        self.task_id = Some(id);
        self
    }

    pub fn for_tool(mut self, name: impl Into<String>) -> Self {
        self.tool_name = Some(name.into());
        self
    }

    pub fn min_risk(mut self, level: RiskLevel) -> Self {
        self.risk_level_min = Some(level);
        self
    }

    pub fn successful(mut self) -> Self {
        self.success_only = Some(true);
        self
    }

    pub fn failed(mut self) -> Self {
        self.success_only = Some(false);
        self
    }

    pub fn since(mut self, dt: DateTime<Utc>) -> Self {
        self.since = Some(dt);
        self
    }

    pub fn until(mut self, dt: DateTime<Utc>) -> Self {
        self.until = Some(dt);
        self
    }

    /// Determine whether a given [`ExecutionTrace`] satisfies every non-`None`
    /// predicate in this query.
    fn matches(&self, trace: &ExecutionTrace) -> bool {
        if let Some(sid) = self.session_id
            && trace.session_id != sid {
                return false;
            }
        if let Some(tid) = self.task_id
            && trace.task_id != tid {
                return false;
            }
        if let Some(ref tool) = self.tool_name {
            let has_tool = trace
                .events
                .iter()
                .any(|e| e.kind.tool_name() == Some(tool.as_str()));
            if !has_tool {
                return false;
            }
        }
        if let Some(min_risk) = self.risk_level_min {
            let has_risk = trace.events.iter().any(|e| {
                if let TraceEventKind::ToolRequested { risk_level, .. } = &e.kind {
                    *risk_level >= min_risk
                } else {
                    false
                }
            });
            if !has_risk {
                return false;
            }
        }
        if let Some(want_success) = self.success_only {
            match trace.success {
                Some(s) if s == want_success => {}
                _ => return false,
            }
        }
        if let Some(since) = self.since
            && trace.started_at < since {
                return false;
            }
        if let Some(until) = self.until
            && trace.started_at > until {
                return false;
            }
        true
    }
}

// ---------------------------------------------------------------------------
// AuditExporter
// ---------------------------------------------------------------------------

/// Stateless exporter capable of rendering execution traces in several
/// formats.
pub struct AuditExporter;

impl AuditExporter {
    /// Export trace(s) to pretty-printed JSON.
    pub fn to_json(traces: &[&ExecutionTrace]) -> Result<String, AuditError> {
        serde_json::to_string_pretty(traces)
            .map_err(|e| AuditError::SerializationFailed(e.to_string()))
    }

    /// Export trace(s) to JSON Lines format (one JSON object per line).
    pub fn to_jsonl(traces: &[&ExecutionTrace]) -> Result<String, AuditError> {
        let mut buf = String::new();
        for trace in traces {
            let line = serde_json::to_string(trace)
                .map_err(|e| AuditError::SerializationFailed(e.to_string()))?;
            buf.push_str(&line);
            buf.push('\n');
        }
        Ok(buf)
    }

    /// Export to a human-readable text summary.
    pub fn to_text(traces: &[&ExecutionTrace]) -> String {
        let mut buf = String::new();
        for trace in traces {
            buf.push_str(&format!(
                "Trace {} | Task: {}\n",
                trace.trace_id, trace.goal
            ));
            buf.push_str(&format!(
                "Started: {} | Completed: {} | Duration: {}ms\n",
                trace.started_at.to_rfc3339(),
                trace
                    .completed_at
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "in-progress".to_string()),
                trace
                    .duration_ms()
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "N/A".to_string()),
            ));
            buf.push_str(&format!(
                "Iterations: {} | Tokens: {}/{} | Cost: ${:.4}\n",
                trace.iterations,
                trace.total_usage.input_tokens,
                trace.total_usage.output_tokens,
                trace.total_cost.total(),
            ));
            buf.push_str("Events:\n");
            for event in &trace.events {
                buf.push_str(&format!(
                    "  [{}] {} {}\n",
                    event.sequence,
                    event.timestamp.to_rfc3339(),
                    event.kind.summary()
                ));
            }
            buf.push_str("---\n");
        }
        buf
    }

    /// Export to CSV (one row per trace event).
    ///
    /// Columns: `trace_id,sequence,timestamp,event_type,tool,details`
    pub fn to_csv(traces: &[&ExecutionTrace]) -> String {
        let mut buf = String::from("trace_id,sequence,timestamp,event_type,tool,details\n");
        for trace in traces {
            for event in &trace.events {
                let (tool, details) = event.kind.csv_details();
                buf.push_str(&format!(
                    "{},{},{},{},{},{}\n",
                    trace.trace_id,
                    event.sequence,
                    event.timestamp.to_rfc3339(),
                    event.kind.type_tag(),
                    csv_escape(&tool),
                    csv_escape(&details),
                ));
            }
        }
        buf
    }
}

/// Minimal CSV field escaping: wrap the value in double-quotes if it contains
/// a comma, newline, or double-quote, doubling any embedded double-quotes.
fn csv_escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        let escaped = value.replace('"', "\"\"");
        format!("\"{}\"", escaped)
    } else {
        value.to_string()
    }
}

// ---------------------------------------------------------------------------
// Analytics helpers
// ---------------------------------------------------------------------------

/// Summary of tool usage across a set of execution traces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolUsageSummary {
    pub tool_counts: HashMap<String, usize>,
    pub tool_success_rates: HashMap<String, f64>,
    pub tool_avg_duration_ms: HashMap<String, f64>,
    pub most_used: Option<String>,
    pub most_denied: Option<String>,
}

/// Per-model cost and token breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelCostEntry {
    pub calls: usize,
    pub total_tokens: usize,
    pub total_cost: f64,
}

/// Aggregate cost breakdown across all models.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub total_cost: f64,
    pub total_tokens: usize,
    pub by_model: HashMap<String, ModelCostEntry>,
}

/// A detected pattern or anomaly in the audit data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pattern {
    pub kind: PatternKind,
    pub description: String,
    pub occurrences: usize,
}

/// Enumeration of detectable pattern kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    FrequentDenial,
    ApprovalBottleneck,
    HighCostTool,
    RepeatedError,
    SlowTool,
}

/// Stateless analytics engine operating over slices of execution traces.
pub struct Analytics;

impl Analytics {
    /// Compute a summary of tool usage across the provided traces.
    pub fn tool_usage_summary(traces: &[&ExecutionTrace]) -> ToolUsageSummary {
        let mut counts: HashMap<String, usize> = HashMap::new();
        let mut successes: HashMap<String, usize> = HashMap::new();
        let mut exec_counts: HashMap<String, usize> = HashMap::new();
        let mut durations: HashMap<String, Vec<u64>> = HashMap::new();
        let mut denials: HashMap<String, usize> = HashMap::new();

        for trace in traces {
            for event in &trace.events {
                match &event.kind {
                    TraceEventKind::ToolRequested { tool, .. } => {
                        *counts.entry(tool.clone()).or_insert(0) += 1;
                    }
                    TraceEventKind::ToolExecuted {
                        tool,
                        success,
                        duration_ms,
                        ..
                    } => {
                        *exec_counts.entry(tool.clone()).or_insert(0) += 1;
                        if *success {
                            *successes.entry(tool.clone()).or_insert(0) += 1;
                        }
                        durations
                            .entry(tool.clone())
                            .or_default()
                            .push(*duration_ms);
                    }
                    TraceEventKind::ToolDenied { tool, .. } => {
                        *denials.entry(tool.clone()).or_insert(0) += 1;
                    }
                    _ => {}
                }
            }
        }

        let tool_success_rates: HashMap<String, f64> = exec_counts
            .iter()
            .map(|(tool, &total)| {
                let ok = *successes.get(tool).unwrap_or(&0);
                let rate = if total > 0 {
                    ok as f64 / total as f64
                } else {
                    0.0
                };
                (tool.clone(), rate)
            })
            .collect();

        let tool_avg_duration_ms: HashMap<String, f64> = durations
            .iter()
            .map(|(tool, durs)| {
                let avg = if durs.is_empty() {
                    0.0
                } else {
                    durs.iter().sum::<u64>() as f64 / durs.len() as f64
                };
                (tool.clone(), avg)
            })
            .collect();

        let most_used = counts
            .iter()
            .max_by_key(|&(_, &c)| c)
            .map(|(t, _)| t.clone());

        let most_denied = denials
            .iter()
            .max_by_key(|&(_, &c)| c)
            .map(|(t, _)| t.clone());

        ToolUsageSummary {
            tool_counts: counts,
            tool_success_rates,
            tool_avg_duration_ms,
            most_used,
            most_denied,
        }
    }

    /// Compute cost breakdown by model.
    pub fn cost_breakdown(traces: &[&ExecutionTrace]) -> CostBreakdown {
        let mut by_model: HashMap<String, ModelCostEntry> = HashMap::new();
        let mut total_cost = 0.0_f64;
        let mut total_tokens = 0_usize;

        for trace in traces {
            for event in &trace.events {
                if let TraceEventKind::LlmCall {
                    model,
                    input_tokens,
                    output_tokens,
                    cost,
                } = &event.kind
                {
                    let tokens = input_tokens + output_tokens;
                    total_cost += cost;
                    total_tokens += tokens;

                    let entry = by_model.entry(model.clone()).or_insert(ModelCostEntry {
                        calls: 0,
                        total_tokens: 0,
                        total_cost: 0.0,
                    });
                    entry.calls += 1;
                    entry.total_tokens += tokens;
                    entry.total_cost += cost;
                }
            }
        }

        CostBreakdown {
            total_cost,
            total_tokens,
            by_model,
        }
    }

    /// Detect patterns such as frequent denials, approval bottlenecks, slow
    /// tools, repeated errors, and high-cost tools.
    pub fn detect_patterns(traces: &[&ExecutionTrace]) -> Vec<Pattern> {
        let mut patterns = Vec::new();

        // --- Frequent denial ---
        let mut denial_counts: HashMap<String, usize> = HashMap::new();
        // --- Approval bottleneck ---
        let mut approval_counts: HashMap<String, usize> = HashMap::new();
        // --- Slow tools ---
        let mut durations: HashMap<String, Vec<u64>> = HashMap::new();
        // --- Repeated errors ---
        let mut error_counts: HashMap<String, usize> = HashMap::new();
        // --- High-cost tools ---
        let mut tool_costs: HashMap<String, f64> = HashMap::new();

        for trace in traces {
            for event in &trace.events {
                match &event.kind {
                    TraceEventKind::ToolDenied { tool, .. } => {
                        *denial_counts.entry(tool.clone()).or_insert(0) += 1;
                    }
                    TraceEventKind::ApprovalRequested { tool, .. } => {
                        *approval_counts.entry(tool.clone()).or_insert(0) += 1;
                    }
                    TraceEventKind::ToolExecuted {
                        tool, duration_ms, ..
                    } => {
                        durations
                            .entry(tool.clone())
                            .or_default()
                            .push(*duration_ms);
                    }
                    TraceEventKind::Error { message } => {
                        *error_counts.entry(message.clone()).or_insert(0) += 1;
                    }
                    TraceEventKind::LlmCall { cost, .. } => {
                        // Attribute LLM costs to the most recent tool in
                        // context (simplified heuristic).
                        *tool_costs.entry("_llm".to_string()).or_insert(0.0) += cost;
                    }
                    _ => {}
                }
            }
        }

        // Emit patterns that exceed reasonable thresholds.
        let threshold = 3_usize;

        for (tool, count) in &denial_counts {
            if *count >= threshold {
                patterns.push(Pattern {
                    kind: PatternKind::FrequentDenial,
                    description: format!("Tool '{}' was denied {} times", tool, count),
                    occurrences: *count,
                });
            }
        }

        for (tool, count) in &approval_counts {
            if *count >= threshold {
                patterns.push(Pattern {
                    kind: PatternKind::ApprovalBottleneck,
                    description: format!("Tool '{}' required approval {} times", tool, count),
                    occurrences: *count,
                });
            }
        }

        let slow_threshold_ms = 5000_u64;
        for (tool, durs) in &durations {
            let slow = durs.iter().filter(|&&d| d >= slow_threshold_ms).count();
            if slow >= threshold {
                patterns.push(Pattern {
                    kind: PatternKind::SlowTool,
                    description: format!(
                        "Tool '{}' was slow (>={}ms) {} times",
                        tool, slow_threshold_ms, slow
                    ),
                    occurrences: slow,
                });
            }
        }

        for (message, count) in &error_counts {
            if *count >= threshold {
                let preview = if message.len() > 60 {
                    format!("{}...", &message[..60])
                } else {
                    message.clone()
                };
                patterns.push(Pattern {
                    kind: PatternKind::RepeatedError,
                    description: format!("Error '{}' occurred {} times", preview, count),
                    occurrences: *count,
                });
            }
        }

        let cost_threshold = 1.0_f64;
        for (label, cost) in &tool_costs {
            if *cost >= cost_threshold {
                patterns.push(Pattern {
                    kind: PatternKind::HighCostTool,
                    description: format!("'{}' accumulated ${:.4} in costs", label, cost),
                    occurrences: 1,
                });
            }
        }

        patterns
    }

    /// Compute the fraction of traces that completed successfully.
    ///
    /// Traces without a `success` outcome are excluded from the denominator.
    pub fn success_rate(traces: &[&ExecutionTrace]) -> f64 {
        let completed: Vec<_> = traces.iter().filter(|t| t.success.is_some()).collect();
        if completed.is_empty() {
            return 0.0;
        }
        let ok = completed.iter().filter(|t| t.success == Some(true)).count();
        ok as f64 / completed.len() as f64
    }

    /// Compute the average number of iterations across all traces.
    pub fn avg_iterations(traces: &[&ExecutionTrace]) -> f64 {
        if traces.is_empty() {
            return 0.0;
        }
        let total: usize = traces.iter().map(|t| t.iterations).sum();
        total as f64 / traces.len() as f64
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
