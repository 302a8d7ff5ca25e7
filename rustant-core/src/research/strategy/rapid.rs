//! 4.7.3 — snippets-only, single round, one final synthesis. Optimized for latency:
//! no per-question analysis, no compression.

use super::{question_generator, AnalyzeResult, StrategyConfig};
use crate::research::citation::CitationHandler;
use crate::research::error::ResearchError;
use crate::research::llm_client::ResearchLlmClient;
use crate::research::model::{Finding, LinksOfSystem, Phase, SearchResult};
use crate::research::run_context::RunContext;
use crate::research::search::SearchEngine;
use async_trait::async_trait;
use futures::future::join_all;

pub struct RapidStrategy<'a> {
    engine: &'a dyn SearchEngine,
    llm: &'a ResearchLlmClient,
    config: StrategyConfig,
    run: RunContext,
}

impl<'a> RapidStrategy<'a> {
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
impl<'a> super::SearchStrategy for RapidStrategy<'a> {
    async fn analyze(&self, query: &str) -> Result<AnalyzeResult, ResearchError> {
        self.run.check_termination()?;
        let qgen = question_generator(self.config.question_generator, self.llm);
        let citation = CitationHandler::new(self.llm, false);

        let iteration_questions = qgen
            .generate(
                "",
                query,
                self.config.questions_per_iteration,
                &crate::research::model::QuestionsByIteration::new(),
            )
            .await;

        self.run
            .emit("Gathering snippets", Some(20), Phase::Search);

        let futures = iteration_questions
            .iter()
            .map(|q| async move { self.engine.get_previews(q).await });
        let batches: Vec<Vec<SearchResult>> = join_all(futures).await;
        self.run.check_termination()?;

        let all_results: Vec<SearchResult> = batches.into_iter().flatten().collect();
        let mut links = LinksOfSystem::new();
        links.append(&all_results);

        self.run.emit("Synthesizing", Some(70), Phase::Analysis);
        let combined_question = iteration_questions.join("; ");
        let result = match citation.analyze_initial(&combined_question, &all_results).await {
            Ok(r) => r,
            Err(_) => crate::research::citation::CitationResult {
                content: "No relevant results found".to_string(),
                documents: Vec::new(),
            },
        };

        let finding = Finding {
            phase: "rapid".to_string(),
            content: result.content.clone(),
            question: combined_question,
            search_results: all_results,
            documents: result.documents,
        };

        let mut questions = crate::research::model::QuestionsByIteration::new();
        questions.insert(0, iteration_questions);

        let repo = {
            let mut repo = crate::research::repository::FindingsRepository::new();
            repo.add_questions(0, questions[&0].clone());
            repo.add_finding(finding.clone());
            repo
        };
        let formatted_findings = repo.format_findings(query);

        self.run.emit("Rapid research complete", Some(100), Phase::Complete);

        Ok(AnalyzeResult {
            findings: vec![finding],
            iterations: 1,
            questions,
            formatted_findings,
            current_knowledge: result.content,
            all_links: links.as_slice().to_vec(),
            extras: serde_json::json!({}),
        })
    }
}
