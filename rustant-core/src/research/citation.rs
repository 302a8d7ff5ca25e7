//! C3 — `CitationHandler`: turns a batch of search results into numbered citations.
//!
//! Citation numbering is global and monotonically increasing across a whole research
//! run: `nr_of_links` (the caller-supplied `link_offset`) must equal
//! `LinksOfSystem::len()` *before* the batch being cited is appended, so index `n`
//! always resolves to the `n`-th result ever seen in this run.

use super::llm_client::ResearchLlmClient;
use super::model::{Document, DocumentMetadata, SearchResult};
use crate::error::LlmError;

/// Output of an `analyze_initial`/`analyze_followup` call.
pub struct CitationResult {
    pub content: String,
    pub documents: Vec<Document>,
}

pub struct CitationHandler<'a> {
    llm: &'a ResearchLlmClient,
    enable_fact_checking: bool,
}

impl<'a> CitationHandler<'a> {
    pub fn new(llm: &'a ResearchLlmClient, enable_fact_checking: bool) -> Self {
        Self {
            llm,
            enable_fact_checking,
        }
    }

    /// Convert a batch of search results into `Document`s, numbering each
    /// `link_offset + position + 1`.
    pub fn create_documents(results: &[SearchResult], link_offset: usize) -> Vec<Document> {
        results
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let index = link_offset + i + 1;
                let page_content = r
                    .full_content
                    .clone()
                    .unwrap_or_else(|| r.snippet.clone());
                let source = if r.link.is_empty() {
                    format!("source_{}", i + 1)
                } else {
                    r.link.clone()
                };
                let title = if r.title.is_empty() {
                    format!("Source {}", i + 1)
                } else {
                    r.title.clone()
                };
                Document {
                    page_content,
                    metadata: DocumentMetadata {
                        source,
                        title,
                        index,
                    },
                }
            })
            .collect()
    }

    fn format_sources(documents: &[Document]) -> String {
        documents
            .iter()
            .map(|d| format!("[{}] {}", d.metadata.index, d.page_content))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// First citation pass for a run: no previous knowledge, `link_offset` is always 0.
    pub async fn analyze_initial(
        &self,
        query: &str,
        results: &[SearchResult],
    ) -> Result<CitationResult, LlmError> {
        let documents = Self::create_documents(results, 0);
        let formatted = Self::format_sources(&documents);
        let prompt = format!(
            "Analyze the following information concerning the question and include citations \
using numbers in square brackets [1], [2], etc. When citing, use the source number provided \
at the start of each source.\n\nQuestion: {query}\n\nSources:\n{formatted}\n\nProvide a \
detailed analysis with citations. Do not create the bibliography, it will be provided \
automatically. Never make up sources. Never write or create urls. Only write text relevant \
to the question. Example format: \"According to the research [1], ...\""
        );
        let response = self.llm.invoke(&prompt).await?;
        Ok(CitationResult {
            content: response.content,
            documents,
        })
    }

    /// Follow-up citation pass: accumulates previous knowledge, numbering continues
    /// from `link_offset` (must equal `LinksOfSystem::len()` before this batch was
    /// appended by the caller).
    pub async fn analyze_followup(
        &self,
        question: &str,
        results: &[SearchResult],
        previous_knowledge: &str,
        link_offset: usize,
    ) -> Result<CitationResult, LlmError> {
        let documents = Self::create_documents(results, link_offset);
        let formatted = Self::format_sources(&documents);

        let fact_check_response = if self.enable_fact_checking {
            let fact_check_prompt = format!(
                "Analyze these sources for factual consistency:\n1. Cross-reference major \
claims between sources\n2. Identify and flag any contradictions\n3. Verify basic facts \
(dates, company names, ownership)\n4. Note when sources disagree\n\nPrevious Knowledge:\n{previous_knowledge}\n\n\
New Sources:\n{formatted}\n\nReturn any inconsistencies or conflicts found."
            );
            self.llm.invoke(&fact_check_prompt).await?.content
        } else {
            String::new()
        };

        let prompt = format!(
            "Using the previous knowledge and new sources, answer the question. Include \
citations using numbers in square brackets [1], [2], etc. When citing, use the source \
number provided at the start of each source. Reflect information from sources critically.\n\n\
Previous Knowledge:\n{previous_knowledge}\n\nQuestion: {question}\n\nNew Sources:\n{formatted}\n\
Reflect information from sources critically based on: {fact_check_response}. Never invent \
sources.\nProvide a detailed answer with citations. Example format: \"According to [1], ...\""
        );
        let response = self.llm.invoke(&prompt).await?;
        Ok(CitationResult {
            content: response.content,
            documents,
        })
    }
}
