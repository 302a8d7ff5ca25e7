//! 4.7.4 — like parallel, but never runs relevance filtering: previews go straight to
//! full-content fetch, trusting the final synthesis to discriminate. Commonly paired
//! with the atomic-fact question generator, but any generator named in settings works.

use super::{question_generator, AnalyzeResult, StrategyConfig};
use crate::research::citation::CitationHandler;
use crate::research::error::ResearchError;
use crate::research::llm_client::ResearchLlmClient;
use crate::research::model::{Finding, LinksOfSystem, Phase, SearchResult};
use crate::research::run_context::RunContext;
use crate::research::search::SearchEngine;
use async_trait::async_trait;
use futures::future::join_all;

pub struct SourceBasedStrategy<'a> {
    engine: &'a dyn SearchEngine,
    llm: &'a ResearchLlmClient,
    config: StrategyConfig,
    run: RunContext,
}

impl<'a> SourceBasedStrategy<'a> {
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

    /// Bypasses `filter_for_relevance` entirely: previews flow straight to
    /// `get_full_content`, unlike the default two-phase `run()`.
    async fn unfiltered_search(&self, question: &str) -> Vec<SearchResult> {
        let previews = self.engine.get_previews(question).await;
        if previews.is_empty() {
            return previews;
        }
        self.engine.get_full_content(previews).await
    }
}

#[async_trait]
impl<'a> super::SearchStrategy for SourceBasedStrategy<'a> {
    async fn analyze(&self, query: &str) -> Result<AnalyzeResult, ResearchError> {
        self.run.check_termination()?;
        let qgen = question_generator(self.config.question_generator, self.llm);
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
            .emit("Gathering sources without filtering", Some(15), Phase::Search);

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

        self.run.emit("Synthesizing from all sources", Some(70), Phase::Analysis);
        let combined_question = iteration_questions.join("; ");
        let result = match citation.analyze_initial(&combined_question, &all_results).await {
            Ok(r) => r,
            Err(_) => crate::research::citation::CitationResult {
                content: "No relevant results found".to_string(),
                documents: Vec::new(),
            },
        };

        let mut findings = Vec::new();
        for (question, results) in per_question_results {
            findings.push(Finding {
                phase: "source-based".to_string(),
                content: result.content.clone(),
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

        self.run.emit("Source-based research complete", Some(100), Phase::Complete);

        Ok(AnalyzeResult {
            findings,
            iterations: 1,
            questions,
            formatted_findings,
            current_knowledge: result.content,
            all_links: links.as_slice().to_vec(),
            extras: serde_json::json!({}),
        })
    }
}
