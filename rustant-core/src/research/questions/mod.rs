//! C4 — `QuestionGenerator`: shared capability plus its five variants.

mod atomic_fact;
mod decomposition;
mod entity_aware;
mod progressive;
mod standard;

pub use atomic_fact::AtomicFactQuestionGenerator;
pub use decomposition::DecompositionQuestionGenerator;
pub use entity_aware::EntityAwareQuestionGenerator;
pub use progressive::{EntityCategory, ExtractedEntity, ProgressiveQuestionGenerator};
pub use standard::StandardQuestionGenerator;

use super::llm_client::ResearchLlmClient;
use super::model::QuestionsByIteration;
use async_trait::async_trait;

/// Shared capability implemented by every question-generation strategy.
#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    async fn generate(
        &self,
        current_knowledge: &str,
        query: &str,
        n: usize,
        questions_by_iteration: &QuestionsByIteration,
    ) -> Vec<String>;
}

/// Shared `Q:`-prefixed-line parser used by Standard/Decomposition/AtomicFact: keeps
/// lines that start with `Q:` (case-insensitive, optional leading whitespace/number),
/// truncated to `n`. Total parser — never returns an empty vec on its own; the caller
/// is responsible for falling back to defaults when this returns empty.
pub(super) fn parse_numbered_questions(text: &str, n: usize) -> Vec<String> {
    let mut out = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim();
        let lower = trimmed.to_lowercase();
        if let Some(rest) = lower.strip_prefix("q:") {
            let start = trimmed.len() - rest.len();
            let q = trimmed[start..].trim().to_string();
            if !q.is_empty() {
                out.push(q);
            }
        }
        if out.len() >= n {
            break;
        }
    }
    out
}

pub(super) fn today_iso() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}
