//! 4.7.1 — the default strategy: iterate generate-questions → search → analyze,
//! with optional per-question/per-iteration compression.

use super::{question_generator, AnalyzeResult, StrategyConfig};
use crate::research::citation::CitationHandler;
use crate::research::compressor::KnowledgeCompressor;
use crate::research::error::ResearchError;
use crate::research::llm_client::ResearchLlmClient;
use crate::research::model::{Finding, LinksOfSystem, Phase};
use crate::research::run_context::{question_progress, ProgressTracker, RunContext};
use crate::research::search::SearchEngine;
use async_trait::async_trait;

pub struct StandardStrategy<'a> {
    engine: &'a dyn SearchEngine,
    llm: &'a ResearchLlmClient,
    config: StrategyConfig,
    run: RunContext,
}

impl<'a> StandardStrategy<'a> {
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
impl<'a> super::SearchStrategy for StandardStrategy<'a> {
    async fn analyze(&self, query: &str) -> Result<AnalyzeResult, ResearchError> {
        let qgen = question_generator(self.config.question_generator, self.llm);
        let citation = CitationHandler::new(self.llm, self.config.enable_fact_checking);
        let compressor = KnowledgeCompressor::new(self.llm, self.config.accumulation_mode);

        let mut links = LinksOfSystem::new();
        let mut findings: Vec<Finding> = Vec::new();
        let mut questions = crate::research::model::QuestionsByIteration::new();
        let mut current_knowledge = String::new();
        let mut tracker = ProgressTracker::new();

        let total_iterations = self.config.max_iterations;
        for iteration in 0..total_iterations {
            self.run.check_termination()?;
            self.run.emit(
                format!("Starting iteration {} of {}", iteration + 1, total_iterations),
                Some(tracker.current()),
                Phase::IterationStart,
            );

            let iteration_questions = qgen
                .generate(
                    &current_knowledge,
                    query,
                    self.config.questions_per_iteration,
                    &questions,
                )
                .await;
            questions.insert(iteration, iteration_questions.clone());

            let total_questions = iteration_questions.len().max(1);
            for (qi, question) in iteration_questions.iter().enumerate() {
                self.run.check_termination()?;
                let progress = question_progress(iteration, total_iterations, qi, total_questions);
                self.run
                    .emit(format!("Searching: {question}"), Some(tracker.advance(progress)), Phase::Search);

                let results = self.engine.run(question).await;
                if results.is_empty() {
                    self.run.emit(
                        format!("No results for: {question}"),
                        Some(tracker.current()),
                        Phase::SearchError,
                    );
                    continue;
                }
                self.run
                    .emit(format!("Analyzing: {question}"), Some(tracker.current()), Phase::Analysis);

                let link_offset = links.len();
                links.append(&results);
                let result = if iteration == 0 && findings.is_empty() {
                    citation.analyze_initial(question, &results).await
                } else {
                    citation
                        .analyze_followup(question, &results, &current_knowledge, link_offset)
                        .await
                };
                let result = match result {
                    Ok(r) => r,
                    Err(_) => continue,
                };

                findings.push(Finding {
                    phase: "follow-up".to_string(),
                    content: result.content.clone(),
                    question: question.clone(),
                    search_results: results,
                    documents: result.documents,
                });
                self.run
                    .emit(format!("Analyzed: {question}"), Some(tracker.current()), Phase::AnalysisComplete);

                if compressor.should_compress(false) {
                    current_knowledge = compressor
                        .compress(&format!("{current_knowledge}\n\n{}", result.content), query, links.as_slice())
                        .await;
                    self.run.emit(
                        "Compressed accumulated knowledge",
                        Some(tracker.current()),
                        Phase::KnowledgeCompression,
                    );
                } else {
                    current_knowledge = format!("{current_knowledge}\n\n{}", result.content);
                }
            }

            if compressor.should_compress(true) {
                current_knowledge = compressor.compress(&current_knowledge, query, links.as_slice()).await;
                self.run.emit(
                    "Compressed knowledge for iteration",
                    Some(tracker.current()),
                    Phase::KnowledgeCompression,
                );
            }
            self.run.emit(
                format!("Completed iteration {}", iteration + 1),
                Some(tracker.advance(((iteration + 1) as f64 / total_iterations as f64) * 100.0)),
                Phase::IterationComplete,
            );
        }

        self.run.check_termination()?;
        let repo = {
            let mut repo = crate::research::repository::FindingsRepository::new();
            for (k, v) in &questions {
                repo.add_questions(*k, v.clone());
            }
            for f in findings.clone() {
                repo.add_finding(f);
            }
            repo
        };
        let formatted_findings = repo.format_findings(query);

        Ok(AnalyzeResult {
            findings,
            iterations: total_iterations,
            questions,
            formatted_findings,
            current_knowledge,
            all_links: links.as_slice().to_vec(),
            extras: serde_json::json!({}),
        })
    }
}
