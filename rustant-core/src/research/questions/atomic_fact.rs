use super::QuestionGenerator;
use crate::research::llm_client::ResearchLlmClient;
use crate::research::model::QuestionsByIteration;
use async_trait::async_trait;

/// Independently-searchable single-fact queries on the first iteration; later
/// iterations ask about gaps/combinations instead of repeating the decomposition
/// (spec.md §4.4: "Atomic-fact").
pub struct AtomicFactQuestionGenerator<'a> {
    llm: &'a ResearchLlmClient,
}

impl<'a> AtomicFactQuestionGenerator<'a> {
    pub fn new(llm: &'a ResearchLlmClient) -> Self {
        Self { llm }
    }

    fn parse_lines(text: &str, n: usize) -> Vec<String> {
        text.lines()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .take(n)
            .map(|s| s.to_string())
            .collect()
    }

    fn default_facts(query: &str) -> Vec<String> {
        vec![
            format!("What is {}?", query),
            format!("What are the defining characteristics of {}?", query),
        ]
    }
}

#[async_trait]
impl<'a> QuestionGenerator for AtomicFactQuestionGenerator<'a> {
    async fn generate(
        &self,
        current_knowledge: &str,
        query: &str,
        n: usize,
        questions_by_iteration: &QuestionsByIteration,
    ) -> Vec<String> {
        if questions_by_iteration.is_empty() {
            let prompt = format!(
                "Decompose this complex query into simple, atomic facts that can be searched \
independently. Each fact should be about ONE thing only and not depend on other facts.\n\n\
Query: {query}\n\nReturn ONLY the questions, one per line."
            );
            return match self.llm.invoke(&prompt).await {
                Ok(response) => {
                    let parsed = Self::parse_lines(&response.content, n.max(3));
                    if parsed.is_empty() {
                        Self::default_facts(query)
                    } else {
                        parsed
                    }
                }
                Err(_) => Self::default_facts(query),
            };
        }

        let past: Vec<&String> = questions_by_iteration.values().flatten().collect();
        let prompt = format!(
            "Given what is already known, generate {n} additional atomic, independently \
searchable fact questions that fill gaps or test combinations of known facts. One per line.\n\n\
Query: {query}\nKnown so far:\n{current_knowledge}\nAlready asked: {past:?}"
        );
        match self.llm.invoke(&prompt).await {
            Ok(response) => {
                let parsed = Self::parse_lines(&response.content, n);
                if parsed.is_empty() {
                    Self::default_facts(query)
                } else {
                    parsed
                }
            }
            Err(_) => Self::default_facts(query),
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
    async fn first_iteration_decomposes_into_atomic_facts() {
        let provider = Arc::new(MockLlmProvider::with_response(
            "What locations were formed by glaciers?\nWhat features are named after body parts?\n",
        ));
        let llm = ResearchLlmClient::new(provider, "mock", uuid::Uuid::new_v4());
        let gen = AtomicFactQuestionGenerator::new(&llm);
        let qs = gen.generate("", "glacier-formed features named after body parts", 2, &HashMap::new()).await;
        assert_eq!(qs.len(), 2);
    }

    #[tokio::test]
    async fn later_iteration_fills_gaps() {
        let mut past = HashMap::new();
        past.insert(0, vec!["What locations were formed by glaciers?".to_string()]);
        let provider = Arc::new(MockLlmProvider::with_response("What falls occurred in 1950-1960?\n"));
        let llm = ResearchLlmClient::new(provider, "mock", uuid::Uuid::new_v4());
        let gen = AtomicFactQuestionGenerator::new(&llm);
        let qs = gen.generate("some facts known", "q", 1, &past).await;
        assert_eq!(qs, vec!["What falls occurred in 1950-1960?".to_string()]);
    }
}
