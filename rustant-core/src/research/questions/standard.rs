use super::{parse_numbered_questions, today_iso, QuestionGenerator};
use crate::research::llm_client::ResearchLlmClient;
use crate::research::model::QuestionsByIteration;
use async_trait::async_trait;

/// First-iteration prompt generates `n` fresh questions; later iterations fold in
/// accumulated knowledge and past questions so the model doesn't repeat itself.
pub struct StandardQuestionGenerator<'a> {
    llm: &'a ResearchLlmClient,
}

impl<'a> StandardQuestionGenerator<'a> {
    pub fn new(llm: &'a ResearchLlmClient) -> Self {
        Self { llm }
    }

    fn default_questions(query: &str, n: usize) -> Vec<String> {
        (0..n)
            .map(|i| {
                if i == 0 {
                    query.to_string()
                } else {
                    format!("More about: {}", query)
                }
            })
            .collect()
    }
}

#[async_trait]
impl<'a> QuestionGenerator for StandardQuestionGenerator<'a> {
    async fn generate(
        &self,
        current_knowledge: &str,
        query: &str,
        n: usize,
        questions_by_iteration: &QuestionsByIteration,
    ) -> Vec<String> {
        let prompt = if questions_by_iteration.is_empty() {
            format!(
                "Generate {n} concise search questions to research the topic below. \
Today is {today}. Prefix each question with \"Q:\" on its own line.\n\nTopic: {query}",
                n = n,
                today = today_iso(),
                query = query
            )
        } else {
            let past: Vec<&String> = questions_by_iteration.values().flatten().collect();
            format!(
                "Generate {n} new search questions that go deeper than what is already known. \
Today is {today}. Prefix each question with \"Q:\" on its own line. Do not repeat past questions.\n\n\
Topic: {query}\n\nCurrent knowledge:\n{knowledge}\n\nPast questions: {past:?}",
                n = n,
                today = today_iso(),
                query = query,
                knowledge = current_knowledge,
                past = past,
            )
        };

        match self.llm.invoke(&prompt).await {
            Ok(response) => {
                let parsed = parse_numbered_questions(&response.content, n);
                if parsed.is_empty() {
                    Self::default_questions(query, n)
                } else {
                    parsed
                }
            }
            Err(_) => Self::default_questions(query, n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::MockLlmProvider;
    use std::collections::HashMap;
    use std::sync::Arc;

    #[tokio::test]
    async fn first_iteration_parses_q_prefixed_lines() {
        let provider = Arc::new(MockLlmProvider::with_response(
            "Q: What is the population of Paris?\nQ: When was Paris founded?\n",
        ));
        let llm = ResearchLlmClient::new(provider, "mock", uuid::Uuid::new_v4());
        let gen = StandardQuestionGenerator::new(&llm);
        let qs = gen.generate("", "Paris", 2, &HashMap::new()).await;
        assert_eq!(qs.len(), 2);
        assert_eq!(qs[0], "What is the population of Paris?");
    }

    #[tokio::test]
    async fn falls_back_to_default_when_no_q_lines_parsed() {
        let provider = Arc::new(MockLlmProvider::with_response("I cannot help with that."));
        let llm = ResearchLlmClient::new(provider, "mock", uuid::Uuid::new_v4());
        let gen = StandardQuestionGenerator::new(&llm);
        let qs = gen.generate("", "Paris", 2, &HashMap::new()).await;
        assert_eq!(qs.len(), 2);
        assert_eq!(qs[0], "Paris");
    }

    #[tokio::test]
    async fn later_iteration_includes_past_questions_in_prompt() {
        let mut past = HashMap::new();
        past.insert(0, vec!["What is Paris?".to_string()]);
        let provider = Arc::new(MockLlmProvider::with_response("Q: A new angle?\n"));
        let llm = ResearchLlmClient::new(provider, "mock", uuid::Uuid::new_v4());
        let gen = StandardQuestionGenerator::new(&llm);
        let qs = gen.generate("some knowledge", "Paris", 1, &past).await;
        assert_eq!(qs, vec!["A new angle?".to_string()]);
    }
}
