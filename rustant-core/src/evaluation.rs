//! Evaluation framework for agent execution traces.
//!
//! Provides structured evaluators that analyze execution traces to detect
//! errors, inefficiencies, and improvement opportunities. Built on top of
//! the existing `AuditStore`/`ExecutionTrace` infrastructure.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::audit::{ExecutionTrace, TraceEventKind};

/// Error category taxonomy for trace annotations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Tool selected incorrectly for the task.
    WrongToolSelection,
    /// Correct tool but wrong parameters.
    IncorrectParameters,
    /// Safety denial that blocked needed operation.
    FalsePositiveSafety,
    /// Unsafe operation that was not caught.
    FalseNegativeSafety,
    /// Agent looped without making progress.
    InfiniteLoop,
    /// Context window overflow or compression loss.
    ContextOverflow,
    /// Task misclassification leading to wrong routing.
    MisclassifiedTask,
    /// External dependency failure.
    ExternalFailure,
    /// Custom/user-defined category.
    Custom(String),
}

/// A single evaluation annotation on a trace event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceAnnotation {
    /// Index of the event in the trace being annotated.
    pub event_index: usize,
    /// Error category (if this is an error annotation).
    pub category: Option<ErrorCategory>,
    /// Human-readable note.
    pub note: String,
    /// Severity: 0 (info) to 3 (critical).
    pub severity: u8,
}

/// Metrics for binary classification evaluation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BinaryMetrics {
    pub true_positives: usize,
    pub true_negatives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

impl BinaryMetrics {
    pub fn precision(&self) -> f64 {
        let denom = self.true_positives + self.false_positives;
        if denom == 0 {
            0.0
        } else {
            self.true_positives as f64 / denom as f64
        }
    }

    pub fn recall(&self) -> f64 {
        let denom = self.true_positives + self.false_negatives;
        if denom == 0 {
            0.0
        } else {
            self.true_positives as f64 / denom as f64
        }
    }

    pub fn f1(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }

    pub fn accuracy(&self) -> f64 {
        let total =
            self.true_positives + self.true_negatives + self.false_positives + self.false_negatives;
        if total == 0 {
            0.0
        } else {
            (self.true_positives + self.true_negatives) as f64 / total as f64
        }
    }
}

/// Trait for evaluators that analyze execution traces.
pub trait TraceEvaluator: Send + Sync {
    /// Evaluate a trace and return annotations.
    fn evaluate(&self, trace: &ExecutionTrace) -> Vec<TraceAnnotation>;
    /// Human-readable name of this evaluator.
    fn name(&self) -> &str;
}

/// Detects looping behavior (same tool called > N times consecutively).
pub struct LoopDetectionEvaluator {
    pub max_consecutive_same_tool: usize,
}

impl Default for LoopDetectionEvaluator {
    fn default() -> Self {
        Self {
            max_consecutive_same_tool: 3,
        }
    }
}

impl TraceEvaluator for LoopDetectionEvaluator {
    fn evaluate(&self, trace: &ExecutionTrace) -> Vec<TraceAnnotation> {
        let mut annotations = Vec::new();
        let mut consecutive_count = 0usize;
        let mut last_tool = String::new();

        for (i, event) in trace.events.iter().enumerate() {
            if let Some(tool_name) = Self::extract_tool_name(&event.kind) {
                if tool_name == last_tool {
                    consecutive_count += 1;
                    if consecutive_count >= self.max_consecutive_same_tool {
                        annotations.push(TraceAnnotation {
                            event_index: i,
                            category: Some(ErrorCategory::InfiniteLoop),
                            note: format!(
                                "Tool '{}' called {} times consecutively",
                                tool_name,
                                consecutive_count + 1
                            ),
                            severity: 2,
                        });
                    }
                } else {
                    consecutive_count = 0;
                    last_tool = tool_name.to_string();
                }
            }
        }
        annotations
    }

    fn name(&self) -> &str {
        "loop_detection"
    }
}

impl LoopDetectionEvaluator {
    fn extract_tool_name(kind: &TraceEventKind) -> Option<&str> {
        match kind {
            TraceEventKind::ToolExecuted { tool, .. } => Some(tool.as_str()),
            _ => None,
        }
    }
}

/// Detects safety false positives (tool denied then re-attempted and approved).
pub struct SafetyFalsePositiveEvaluator;

impl TraceEvaluator for SafetyFalsePositiveEvaluator {
    fn evaluate(&self, trace: &ExecutionTrace) -> Vec<TraceAnnotation> {
        let mut annotations = Vec::new();
        let mut denied_tools: HashMap<String, usize> = HashMap::new();

        for (i, event) in trace.events.iter().enumerate() {
            match &event.kind {
                TraceEventKind::ToolDenied { tool, .. } => {
                    denied_tools.insert(tool.clone(), i);
                }
                TraceEventKind::ToolApproved { tool } => {
                    if let Some(denied_idx) = denied_tools.remove(tool.as_str()) {
                        annotations.push(TraceAnnotation {
                            event_index: denied_idx,
                            category: Some(ErrorCategory::FalsePositiveSafety),
                            note: format!(
                                "Tool '{}' was denied at event {} but later approved at event {}",
                                tool, denied_idx, i
                            ),
                            severity: 1,
                        });
                    }
                }
                _ => {}
            }
        }
        annotations
    }

    fn name(&self) -> &str {
        "safety_false_positive"
    }
}

/// Evaluates cost efficiency (tokens per successful tool call).
pub struct CostEfficiencyEvaluator {
    pub max_tokens_per_tool_call: usize,
}

impl Default for CostEfficiencyEvaluator {
    fn default() -> Self {
        Self {
            max_tokens_per_tool_call: 5000,
        }
    }
}

impl TraceEvaluator for CostEfficiencyEvaluator {
    fn evaluate(&self, trace: &ExecutionTrace) -> Vec<TraceAnnotation> {
        let mut total_tokens = 0usize;
        let mut successful_tools = 0usize;

        for event in &trace.events {
            match &event.kind {
                TraceEventKind::LlmCall {
                    input_tokens,
                    output_tokens,
                    ..
                } => {
                    total_tokens += *input_tokens + *output_tokens;
                }
                TraceEventKind::ToolExecuted { success, .. } if *success => {
                    successful_tools += 1;
                }
                _ => {}
            }
        }

        let mut annotations = Vec::new();
        if successful_tools > 0 {
            let tokens_per_call = total_tokens / successful_tools;
            if tokens_per_call > self.max_tokens_per_tool_call {
                annotations.push(TraceAnnotation {
                    event_index: 0,
                    category: None,
                    note: format!(
                        "High token cost: {} tokens per successful tool call (threshold: {})",
                        tokens_per_call, self.max_tokens_per_tool_call
                    ),
                    severity: 1,
                });
            }
        }
        annotations
    }

    fn name(&self) -> &str {
        "cost_efficiency"
    }
}

/// Checks tool selection against task classification expectations.
pub struct ToolSelectionEvaluator;

impl TraceEvaluator for ToolSelectionEvaluator {
    fn evaluate(&self, _trace: &ExecutionTrace) -> Vec<TraceAnnotation> {
        // Placeholder -- requires TaskClassification context not available in trace alone.
        // Will be enhanced when traces include classification metadata.
        Vec::new()
    }

    fn name(&self) -> &str {
        "tool_selection"
    }
}

/// Aggregate evaluation results over a corpus of traces.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub total_traces: usize,
    pub successful_traces: usize,
    pub failed_traces: usize,
    pub error_distribution: HashMap<ErrorCategory, usize>,
    pub avg_iterations_per_task: f64,
    pub avg_cost_per_task: f64,
    pub tool_accuracy: BinaryMetrics,
    pub safety_metrics: BinaryMetrics,
}

/// Pipeline that runs multiple evaluators over a corpus of traces.
pub struct EvaluationPipeline {
    evaluators: Vec<Box<dyn TraceEvaluator>>,
}

impl EvaluationPipeline {
    pub fn new() -> Self {
        Self {
            evaluators: Vec::new(),
        }
    }

    pub fn add_evaluator(&mut self, evaluator: Box<dyn TraceEvaluator>) {
        self.evaluators.push(evaluator);
    }

    /// Create a pipeline with all default evaluators.
    pub fn with_defaults() -> Self {
        let mut pipeline = Self::new();
        pipeline.add_evaluator(Box::new(LoopDetectionEvaluator::default()));
        pipeline.add_evaluator(Box::new(SafetyFalsePositiveEvaluator));
        pipeline.add_evaluator(Box::new(CostEfficiencyEvaluator::default()));
        pipeline.add_evaluator(Box::new(ToolSelectionEvaluator));
        pipeline
    }

    /// Evaluate a corpus of traces and produce an aggregate report.
    pub fn evaluate_corpus(&self, traces: &[ExecutionTrace]) -> EvaluationReport {
        let mut report = EvaluationReport {
            total_traces: traces.len(),
            ..Default::default()
        };

        for trace in traces {
            match trace.success {
                Some(true) => report.successful_traces += 1,
                Some(false) => report.failed_traces += 1,
                None => {}
            }

            for evaluator in &self.evaluators {
                let annotations = evaluator.evaluate(trace);
                for annotation in annotations {
                    if let Some(cat) = annotation.category {
                        *report.error_distribution.entry(cat).or_insert(0) += 1;
                    }
                }
            }
        }

        report
    }
}

impl Default for EvaluationPipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract behavioral rules from evaluation annotations.
/// Frequent error patterns become improvement suggestions.
pub fn distill_corrections(report: &EvaluationReport) -> Vec<String> {
    let mut rules = Vec::new();
    for (category, count) in &report.error_distribution {
        if *count >= 3 {
            let rule = match category {
                ErrorCategory::WrongToolSelection => {
                    "When uncertain about tool selection, prefer dedicated tools over shell_exec."
                }
                ErrorCategory::InfiniteLoop => {
                    "If the same tool fails twice, try an alternative approach instead of retrying."
                }
                ErrorCategory::FalsePositiveSafety => {
                    "Review safety denials for false positives; some read-only tools may be over-restricted."
                }
                _ => continue,
            };
            rules.push(rule.to_string());
        }
    }
    rules
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
