//! Shared, research-scoped capabilities injected into every [`strategy`](super::strategy)
//! instance: the cooperative termination flag and the progress-emission callback.
//! Kept as narrow, independently testable owners rather than module-level globals
//! (spec.md §9: "Global mutable state ... encapsulate each as a single owner with a
//! narrow typed API").

use super::model::{Phase, ProgressEntry};
use super::error::ResearchError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A boolean per research, checked cooperatively at every phase boundary
/// (spec.md §5: "Cancellation").
#[derive(Clone)]
pub struct TerminationFlag(Arc<AtomicBool>);

impl TerminationFlag {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Returns `Err(ResearchError::Terminated)` if termination has been requested;
    /// called before every sub-question and before final synthesis.
    pub fn check(&self) -> Result<(), ResearchError> {
        if self.is_requested() {
            Err(ResearchError::Terminated)
        } else {
            Ok(())
        }
    }
}

impl Default for TerminationFlag {
    fn default() -> Self {
        Self::new()
    }
}

pub type ProgressCallback = Arc<dyn Fn(ProgressEntry) + Send + Sync>;

/// Bundles the two research-scoped capabilities every strategy needs but does not
/// own: the termination flag (service-owned) and the progress sink (wired by the
/// service to the log table and the progress bus).
#[derive(Clone)]
pub struct RunContext {
    pub termination: TerminationFlag,
    pub progress: ProgressCallback,
}

impl RunContext {
    pub fn new(termination: TerminationFlag, progress: ProgressCallback) -> Self {
        Self {
            termination,
            progress,
        }
    }

    /// A no-op progress sink, for tests and one-off callers that don't need to
    /// observe progress.
    pub fn silent() -> Self {
        Self {
            termination: TerminationFlag::new(),
            progress: Arc::new(|_| {}),
        }
    }

    pub fn check_termination(&self) -> Result<(), ResearchError> {
        self.termination.check()
    }

    pub fn emit(&self, message: impl Into<String>, progress: Option<u8>, phase: Phase) {
        (self.progress)(ProgressEntry::new(message, progress, phase));
    }

    pub fn emit_with_metadata(
        &self,
        message: impl Into<String>,
        progress: Option<u8>,
        phase: Phase,
        metadata: std::collections::HashMap<String, serde_json::Value>,
    ) {
        let mut entry = ProgressEntry::new(message, progress, phase);
        entry.metadata = metadata;
        (self.progress)(entry);
    }
}

/// Monotonically non-decreasing progress accumulator: phase transitions compute a
/// candidate percentage, but the value ever reported never regresses
/// (spec.md §4.7: "Progress values must be non-decreasing").
#[derive(Default)]
pub struct ProgressTracker {
    last: u8,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self { last: 0 }
    }

    /// Clamps `candidate` to `[last, 100]` and remembers the result as the new floor.
    pub fn advance(&mut self, candidate: f64) -> u8 {
        let candidate = candidate.clamp(0.0, 100.0) as u8;
        self.last = self.last.max(candidate);
        self.last
    }

    pub fn current(&self) -> u8 {
        self.last
    }
}

/// Percentage contribution of one sub-question within its iteration, per spec.md
/// §4.7.1: `base + (question_index / total) * (1 / total_iterations) * 0.5`.
pub fn question_progress(
    iteration_index: usize,
    total_iterations: usize,
    question_index: usize,
    total_questions: usize,
) -> f64 {
    let total_iterations = total_iterations.max(1);
    let total_questions = total_questions.max(1);
    let base = (iteration_index as f64 / total_iterations as f64) * 100.0;
    let increment =
        (question_index as f64 / total_questions as f64) * (1.0 / total_iterations as f64) * 100.0 * 0.5;
    base + increment
}
