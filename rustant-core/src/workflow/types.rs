//! Workflow type definitions for the Rustant workflow engine.
//!
//! Defines the core data structures: workflow definitions, steps, gates,
//! state tracking, and related enums.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// A complete workflow definition parsed from YAML DSL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub name: String,
    pub description: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub inputs: Vec<WorkflowInput>,
    pub steps: Vec<WorkflowStep>,
    #[serde(default)]
    pub outputs: Vec<WorkflowOutput>,
}

fn default_version() -> String {
    "1.0".to_string()
}

/// A typed input parameter for a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowInput {
    pub name: String,
    #[serde(rename = "type", default = "default_input_type")]
    pub input_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
}

fn default_input_type() -> String {
    "string".to_string()
}

/// A single step in a workflow execution plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub id: String,
    pub tool: String,
    #[serde(default)]
    pub params: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub on_error: Option<ErrorAction>,
    #[serde(default)]
    pub gate: Option<GateConfig>,
    #[serde(default)]
    pub gate_message: Option<String>,
    #[serde(default)]
    pub gate_preview: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// An output declaration for a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowOutput {
    pub name: String,
    pub value: String,
}

/// Type of approval gate on a workflow step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateType {
    ApprovalRequired,
    ApprovalOptional,
    ReviewOnly,
    Conditional,
}

impl fmt::Display for GateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateType::ApprovalRequired => write!(f, "approval_required"),
            GateType::ApprovalOptional => write!(f, "approval_optional"),
            GateType::ReviewOnly => write!(f, "review_only"),
            GateType::Conditional => write!(f, "conditional"),
        }
    }
}

/// Configuration for an approval gate on a step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    #[serde(rename = "type")]
    pub gate_type: GateType,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub preview: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub default_action: Option<String>,
    #[serde(default)]
    pub required_approvers: Option<usize>,
}

/// Error handling strategy for a failed step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "action")]
pub enum ErrorAction {
    Fail,
    Skip,
    Retry { max_retries: usize },
}

/// Status of a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Pending,
    Running,
    WaitingApproval,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowStatus::Pending => write!(f, "pending"),
            WorkflowStatus::Running => write!(f, "running"),
            WorkflowStatus::WaitingApproval => write!(f, "waiting_approval"),
            WorkflowStatus::Paused => write!(f, "paused"),
            WorkflowStatus::Completed => write!(f, "completed"),
            WorkflowStatus::Failed => write!(f, "failed"),
            WorkflowStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Persistent state of a workflow run, supporting pause/resume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    pub run_id: Uuid,
    pub workflow_name: String,
    pub status: WorkflowStatus,
    pub current_step_index: usize,
    pub step_outputs: HashMap<String, serde_json::Value>,
    pub inputs: HashMap<String, serde_json::Value>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub error: Option<String>,
}

impl WorkflowState {
    /// Create a new workflow state for a fresh run.
    pub fn new(workflow_name: String, inputs: HashMap<String, serde_json::Value>) -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            workflow_name,
            status: WorkflowStatus::Pending,
            current_step_index: 0,
            step_outputs: HashMap::new(),
            inputs,
            started_at: now,
            updated_at: now,
            error: None,
        }
    }
}

/// Approval decision from a user for a gated step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalDecision {
    Approved,
    Denied,
}
