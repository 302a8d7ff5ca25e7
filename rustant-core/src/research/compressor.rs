//! C5 — `KnowledgeCompressor`: bounds accumulated-knowledge growth between iterations.

use super::llm_client::ResearchLlmClient;
use crate::config::AccumulationMode;
use crate::research::model::SearchResult;

/// `compress(currentKnowledge, query, sectionLinks) -> string` (spec.md §4.5). The
/// compressor itself never appends a link list — callers append the formatted link
/// list after compression, matching "formatted link list is appended by the caller."
pub struct KnowledgeCompressor<'a> {
    llm: &'a ResearchLlmClient,
    mode: AccumulationMode,
    max_characters: usize,
}

impl<'a> KnowledgeCompressor<'a> {
    pub fn new(llm: &'a ResearchLlmClient, mode: AccumulationMode) -> Self {
        Self {
            llm,
            mode,
            max_characters: 8000,
        }
    }

    pub fn with_max_characters(mut self, max_characters: usize) -> Self {
        self.max_characters = max_characters;
        self
    }

    /// Whether compression should run at all given the configured mode and the phase
    /// boundary the caller is at (`is_iteration_boundary` vs. per-question).
    pub fn should_compress(&self, is_iteration_boundary: bool) -> bool {
        match self.mode {
            AccumulationMode::Iteration => is_iteration_boundary,
            AccumulationMode::Question => true,
            AccumulationMode::NoCompression => false,
        }
    }

    /// Truncates to the configured character budget without an LLM call — the
    /// `MAX_NR_OF_CHARACTERS` policy named in spec.md §4.5.
    pub fn truncate_to_budget(&self, current_knowledge: &str) -> String {
        if current_knowledge.chars().count() <= self.max_characters {
            current_knowledge.to_string()
        } else {
            let mut truncated: String = current_knowledge.chars().take(self.max_characters).collect();
            truncated.push('…');
            truncated
        }
    }

    /// Emits a one-page explanation in IEEE citation style followed by a one-sentence
    /// direct answer. Never invents sources — `section_links` are provided only so the
    /// prompt can remind the model which citation numbers are valid; the compressor
    /// does not format or append a bibliography itself.
    pub async fn compress(
        &self,
        current_knowledge: &str,
        query: &str,
        section_links: &[SearchResult],
    ) -> String {
        let valid_indices: Vec<usize> = (1..=section_links.len()).collect();
        let prompt = format!(
            "Compress the following research knowledge into a concise, one-page explanation in \
IEEE citation style (numbered citations like [1], [2] referring only to the numbers already \
present in the text), followed on a new line by a single-sentence direct answer to the \
question. Do not invent sources or citation numbers beyond {valid:?}. Do not append a \
bibliography; the source list is added separately.\n\n\
Question: {query}\n\nKnowledge to compress:\n{current_knowledge}",
            valid = valid_indices,
        );
        match self.llm.invoke(&prompt).await {
            Ok(response) => response.content,
            Err(_) => self.truncate_to_budget(current_knowledge),
        }
    }
}
