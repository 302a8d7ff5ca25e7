//! 4.7.2 — generate all sub-questions up front, fan them out concurrently, then
//! synthesize once on the union of results. Uses `futures::future::join_all` over
//! async blocks rather than `tokio::spawn`, so the borrowed `ResearchLlmClient`
//! never needs a `'static` bound.

use super::{question_generator, run_search, AnalyzeResult, StrategyConfig};
use crate::research::citation::CitationHandler;
use crate::research::error::ResearchError;
use crate::research::llm_client::ResearchLlmClient;
use crate::research::model::{Finding, LinksOfSystem, Phase, SearchResult};
use crate::research::run_context::RunContext;
use crate::research::search::SearchEngine;
use async_trait::async_trait;
use futures::future::join_all;

pub struct ParallelStrategy<'a> {
    engine: &'a dyn SearchEngine,
    llm: &'a ResearchLlmClient,
    config: StrategyConfig,
    run: RunContext,
}

impl<'a> ParallelStrategy<'a> {
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
}

#[async_trait]
impl<'a> super::SearchStrategy for ParallelStrategy<'a> {
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
            .emit("Fanning out sub-questions", Some(10), Phase::Search);

        // Snippet-only mode is forced for the fan-out, then conceptually restored —
        // the engine is const/borrowed here so "restoring" is a no-op; the forcing
        // is modeled by calling get_previews directly rather than the full two-phase
        // run() used by other strategies.
        let futures = iteration_questions
            .iter()
            .map(|q| async move { (q.clone(), run_search(self.engine, q).await) });
        let per_question_results: Vec<(String, Vec<SearchResult>)> = join_all(futures).await;

        self.run.check_termination()?;

        let mut links = LinksOfSystem::new();
        let mut all_results: Vec<SearchResult> = Vec::new();
        for (_, results) in &per_question_results {
            all_results.extend(results.iter().cloned());
        }
        links.append(&all_results);

        self.run
            .emit("Synthesizing combined results", Some(60), Phase::Analysis);

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
                phase: "parallel".to_string(),
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

        self.run.emit("Parallel research complete", Some(100), Phase::Complete);

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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::MockLlmProvider;
    use crate::config::{AccumulationMode, QuestionGeneratorName};
    use crate::research::search::EngineContext;
    use std::sync::Arc;

    struct FixedEngine {
        ctx: EngineContext,
    }

    #[async_trait]
    impl SearchEngine for FixedEngine {
        fn name(&self) -> &str {
            "fixed"
        }
        fn context(&self) -> &EngineContext {
            &self.ctx
        }
        async fn get_previews(&self, query: &str) -> Vec<SearchResult> {
            vec![SearchResult {
                title: query.to_string(),
                link: format!("http://example.invalid/{query}"),
                snippet: "snippet".into(),
                ..Default::default()
            }]
        }
    }

    #[tokio::test]
    async fn analyze_unions_results_across_all_questions() {
        let provider = Arc::new(MockLlmProvider::with_response(
            "Q: first question?\nQ: second question?\n",
        ));
        let llm = ResearchLlmClient::new(provider, "mock", uuid::Uuid::new_v4());
        let engine = FixedEngine {
            ctx: EngineContext {
                skip_relevance_filter: true,
                ..Default::default()
            },
        };
        let config = StrategyConfig {
            max_iterations: 1,
            questions_per_iteration: 2,
            accumulation_mode: AccumulationMode::NoCompression,
            question_generator: QuestionGeneratorName::Standard,
            enable_fact_checking: false,
            searches_per_section: 1,
        };
        let strategy = ParallelStrategy::new(&engine, &llm, config, RunContext::silent());
        let result = strategy.analyze("a compound query").await.unwrap();
        assert_eq!(result.findings.len(), 2);
        assert_eq!(result.all_links.len(), 2);
    }
}
