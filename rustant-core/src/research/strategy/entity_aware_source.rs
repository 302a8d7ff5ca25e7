//! 4.7.7 — wraps the source-based strategy, forcing the entity-aware question
//! generator and appending a "Potential Entity Mentions" section extracted from the
//! search-results context handed to the LLM.

use super::{AnalyzeResult, StrategyConfig};
use crate::research::citation::CitationHandler;
use crate::research::error::ResearchError;
use crate::research::llm_client::ResearchLlmClient;
use crate::research::model::{Finding, LinksOfSystem, Phase, SearchResult};
use crate::research::questions::{EntityAwareQuestionGenerator, QuestionGenerator};
use crate::research::run_context::RunContext;
use crate::research::search::SearchEngine;
use async_trait::async_trait;
use futures::future::join_all;

pub struct EntityAwareSourceStrategy<'a> {
    engine: &'a dyn SearchEngine,
    llm: &'a ResearchLlmClient,
    config: StrategyConfig,
    run: RunContext,
}

impl<'a> EntityAwareSourceStrategy<'a> {
    pub fn new(
        engine: &'a dyn SearchEngine,
        llm: &'a ResearchLlmClient,
        config: StrategyConfig,
        run: RunContext,
    ) -> Self {
        Self {
            engine,
            llm,
            config,
            run,
        }
    }

    async fn unfiltered_search(&self, question: &str) -> Vec<SearchResult> {
        let previews = self.engine.get_previews(question).await;
        if previews.is_empty() {
            return previews;
        }
        self.engine.get_full_content(previews).await
    }
}

/// Capitalized multi-word spans across a batch of results, deduplicated — the same
/// heuristic the browse-comp entity extractor uses for "Names" (spec.md §4.7.7).
fn extract_entity_mentions(results: &[SearchResult]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for r in results {
        let text = format!("{} {}", r.title, r.snippet);
        let words: Vec<&str> = text.split_whitespace().collect();
        let mut i = 0;
        while i < words.len() {
            let w = words[i].trim_matches(|c: char| !c.is_alphanumeric());
            if w.chars().next().map(|c| c.is_uppercase()).unwrap_or(false) && w.len() > 1 {
                let mut span = vec![w];
                let mut j = i + 1;
                while j < words.len() {
                    let next = words[j].trim_matches(|c: char| !c.is_alphanumeric());
                    if next.chars().next().map(|c| c.is_uppercase()).unwrap_or(false) {
                        span.push(next);
                        j += 1;
                    } else {
                        break;
                    }
                }
                if span.len() >= 2 {
                    let value = span.join(" ");
                    if seen.insert(value.clone()) {
                        out.push(value);
                    }
                }
                i = j;
            } else {
                i += 1;
            }
        }
    }
    out
}

#[async_trait]
impl<'a> super::SearchStrategy for EntityAwareSourceStrategy<'a> {
    async fn analyze(&self, query: &str) -> Result<AnalyzeResult, ResearchError> {
        self.run.check_termination()?;
        let qgen = EntityAwareQuestionGenerator::new(self.llm);
        let citation = CitationHandler::new(self.llm, self.config.enable_fact_checking);

        let iteration_questions = qgen
            .generate(
                "",
                query,
                self.config.questions_per_iteration,
                &crate::research::model::QuestionsByIteration::new(),
            )
            .await;

        self.run
            .emit("Gathering sources for entity identification", Some(15), Phase::Search);

        let futures = iteration_questions
            .iter()
            .map(|q| async move { (q.clone(), self.unfiltered_search(q).await) });
        let per_question_results: Vec<(String, Vec<SearchResult>)> = join_all(futures).await;
        self.run.check_termination()?;

        let mut links = LinksOfSystem::new();
        let mut all_results: Vec<SearchResult> = Vec::new();
        for (_, results) in &per_question_results {
            all_results.extend(results.iter().cloned());
        }
        links.append(&all_results);

        let entity_mentions = extract_entity_mentions(&all_results);

        self.run.emit("Synthesizing entity identification", Some(70), Phase::Analysis);
        let combined_question = iteration_questions.join("; ");
        let result = match citation.analyze_initial(&combined_question, &all_results).await {
            Ok(r) => r,
            Err(_) => crate::research::citation::CitationResult {
                content: "No relevant results found".to_string(),
                documents: Vec::new(),
            },
        };

        let mut content = result.content.clone();
        if !entity_mentions.is_empty() {
            content.push_str("\n\n## Potential Entity Mentions\n\n");
            for e in &entity_mentions {
                content.push_str(&format!("- {e}\n"));
            }
        }

        let mut findings = Vec::new();
        for (question, results) in per_question_results {
            findings.push(Finding {
                phase: "entity-aware-source".to_string(),
                content: content.clone(),
                question,
                search_results: results,
                documents: result.documents.clone(),
            });
        }

        let mut questions = crate::research::model::QuestionsByIteration::new();
        questions.insert(0, iteration_questions);

        let repo = {
            let mut repo = crate::research::repository::FindingsRepository::new();
            repo.add_questions(0, questions[&0].clone());
            for f in findings.clone() {
                repo.add_finding(f);
            }
            repo
        };
        let formatted_findings = repo.format_findings(query);

        self.run
            .emit("Entity-aware source research complete", Some(100), Phase::Complete);

        Ok(AnalyzeResult {
            findings,
            iterations: 1,
            questions,
            formatted_findings,
            current_knowledge: content,
            all_links: links.as_slice().to_vec(),
            extras: serde_json::json!({ "entity_mentions": entity_mentions }),
        })
    }
}
