use super::{parse_numbered_questions, today_iso, QuestionGenerator};
use crate::research::llm_client::ResearchLlmClient;
use crate::research::model::QuestionsByIteration;
use async_trait::async_trait;

const ENTITY_KEYWORDS: &[&str] = &[
    "who", "what", "which", "identify", "name", "character", "person", "place",
    "organization", "company", "author", "scientist", "inventor", "city", "country",
    "book", "movie",
];

fn is_entity_query(query: &str) -> bool {
    let lower = query.to_lowercase();
    ENTITY_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Emits multi-constraint, quoted-exact-phrase queries when the query looks like an
/// entity-identification request; falls back to the standard generator otherwise
/// (spec.md §4.4: "Entity-aware").
pub struct EntityAwareQuestionGenerator<'a> {
    llm: &'a ResearchLlmClient,
}

impl<'a> EntityAwareQuestionGenerator<'a> {
    pub fn new(llm: &'a ResearchLlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl<'a> QuestionGenerator for EntityAwareQuestionGenerator<'a> {
    async fn generate(
        &self,
        current_knowledge: &str,
        query: &str,
        n: usize,
        questions_by_iteration: &QuestionsByIteration,
    ) -> Vec<String> {
        if !is_entity_query(query) {
            return super::standard::StandardQuestionGenerator::new(self.llm)
                .generate(current_knowledge, query, n, questions_by_iteration)
                .await;
        }

        let prompt = if questions_by_iteration.is_empty() {
            format!(
                "Generate {n} direct search queries to identify the specific entity in: {query}\n\n\
Today: {today}\n\nCreate search queries that combine multiple identifying features and use \
variations of key terms, with quotation marks for exact phrases where useful.\n\n\
Format: One per line, prefixed with \"Q:\".",
                n = n,
                query = query,
                today = today_iso(),
            )
        } else {
            let past: Vec<&String> = questions_by_iteration.values().flatten().collect();
            format!(
                "Generate {n} targeted search queries to identify the specific entity in the \
query, combining multiple constraints in a single search and quoting exact phrases.\n\n\
Query: {query}\nToday: {today}\nPast questions: {past:?}\nCurrent knowledge: {knowledge}\n\n\
Format: One per line, prefixed with \"Q:\".",
                n = n,
                query = query,
                today = today_iso(),
                past = past,
                knowledge = current_knowledge,
            )
        };

        match self.llm.invoke(&prompt).await {
            Ok(response) => {
                let parsed = parse_numbered_questions(&response.content, n);
                if parsed.is_empty() {
                    vec![query.to_string()]
                } else {
                    parsed
                }
            }
            Err(_) => vec![query.to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::MockLlmProvider;
    use std::collections::HashMap;
    use std::sync::Arc;

    #[test]
    fn detects_entity_query_keywords() {
        assert!(is_entity_query("Who invented the telephone?"));
        assert!(is_entity_query("Identify the character from this show"));
        assert!(!is_entity_query("summarize the history of bridges"));
    }

    #[tokio::test]
    async fn entity_query_produces_quoted_multi_constraint_questions() {
        let provider = Arc::new(MockLlmProvider::with_response(
            "Q: \"fictional character\" \"breaks fourth wall\" 1960s\n",
        ));
        let llm = ResearchLlmClient::new(provider, "mock", uuid::Uuid::new_v4());
        let gen = EntityAwareQuestionGenerator::new(&llm);
        let qs = gen
            .generate("", "identify this fictional character", 1, &HashMap::new())
            .await;
        assert_eq!(qs.len(), 1);
        assert!(qs[0].contains("fictional character"));
    }

    #[tokio::test]
    async fn non_entity_query_falls_back_to_standard_generator() {
        let provider = Arc::new(MockLlmProvider::with_response("Q: a normal question\n"));
        let llm = ResearchLlmClient::new(provider, "mock", uuid::Uuid::new_v4());
        let gen = EntityAwareQuestionGenerator::new(&llm);
        let qs = gen
            .generate("", "summarize bridge construction history", 1, &HashMap::new())
            .await;
        assert_eq!(qs, vec!["a normal question".to_string()]);
    }
}
