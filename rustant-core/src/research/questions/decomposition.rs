use super::{parse_numbered_questions, QuestionGenerator};
use crate::research::llm_client::ResearchLlmClient;
use crate::research::model::QuestionsByIteration;
use async_trait::async_trait;

const QUESTION_PREFIXES: &[&str] = &[
    "what is", "what are", "how does", "how do", "how can", "why is", "why are",
    "when did", "where is", "which", "who is", "can", "will",
];

const SUBORDINATORS: &[&str] = &[
    " and ", " or ", " but ", " as ", " that ", " which ", " when ", " where ", " how ",
];

/// Splits the compound/interrogative structure out of a query to surface its core
/// subject, the way the original decomposer does before asking the LLM for sub-queries.
fn extract_subject(query: &str) -> String {
    let mut subject = query.to_string();
    let lower = query.to_lowercase();
    if lower.ends_with('?') {
        let mut candidate = query[..query.len() - 1].trim().to_string();
        for prefix in QUESTION_PREFIXES {
            if lower.starts_with(prefix) {
                candidate = query[prefix.len()..].trim().trim_end_matches('?').trim().to_string();
                break;
            }
        }
        subject = candidate;
        let subject_lower = subject.to_lowercase();
        for sub in SUBORDINATORS {
            if let Some(pos) = subject_lower.find(sub) {
                subject = subject[..pos].trim().to_string();
                break;
            }
        }
        for article in ["a ", "an ", "the "] {
            if subject.to_lowercase().starts_with(article) {
                subject = subject[article.len()..].trim().to_string();
            }
        }
    }
    subject
}

/// First call decomposes the query into 2-5 atomic sub-queries; later calls behave
/// like the standard generator (spec.md §4.4: "Decomposition/IterDRAG").
pub struct DecompositionQuestionGenerator<'a> {
    llm: &'a ResearchLlmClient,
}

impl<'a> DecompositionQuestionGenerator<'a> {
    pub fn new(llm: &'a ResearchLlmClient) -> Self {
        Self { llm }
    }

    fn default_subqueries(query: &str) -> Vec<String> {
        let subject = extract_subject(query);
        vec![
            format!("What is {}?", subject),
            format!("What is the history of {}?", subject),
            format!("What are the key facts about {}?", subject),
        ]
    }
}

#[async_trait]
impl<'a> QuestionGenerator for DecompositionQuestionGenerator<'a> {
    async fn generate(
        &self,
        current_knowledge: &str,
        query: &str,
        n: usize,
        questions_by_iteration: &QuestionsByIteration,
    ) -> Vec<String> {
        if !questions_by_iteration.is_empty() {
            return super::standard::StandardQuestionGenerator::new(self.llm)
                .generate(current_knowledge, query, n, questions_by_iteration)
                .await;
        }

        let subject = extract_subject(query);
        let context: String = current_knowledge.chars().take(2000).collect();
        let prompt = format!(
            "Decompose the main research topic into 2-5 specific sub-queries that can be \
answered independently. Prefix each sub-query with \"Q:\" on its own line.\n\n\
Main Research Topic: {subject}\nOriginal Query: {query}\n\nContext:\n{context}"
        );

        match self.llm.invoke(&prompt).await {
            Ok(response) => {
                let parsed = parse_numbered_questions(&response.content, 5.max(n));
                if parsed.len() >= 2 {
                    parsed
                } else {
                    Self::default_subqueries(query)
                }
            }
            Err(_) => Self::default_subqueries(query),
        }
    }
}
