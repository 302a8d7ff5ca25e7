//! 4.7.5 — progressive/browse-comp strategy: uses the `ProgressiveQuestionGenerator`,
//! tracks per-entity coverage and candidate confidences across iterations, and can
//! terminate early once a candidate is confident enough or coverage is broad enough.

use super::{AnalyzeResult, StrategyConfig};
use crate::research::citation::CitationHandler;
use crate::research::error::ResearchError;
use crate::research::llm_client::ResearchLlmClient;
use crate::research::model::{Finding, LinksOfSystem, Phase};
use crate::research::questions::{EntityCategory, ProgressiveQuestionGenerator, QuestionGenerator};
use crate::research::run_context::{ProgressTracker, RunContext};
use crate::research::search::SearchEngine;
use async_trait::async_trait;

/// A single hypothesized answer and the strategy's confidence in it, re-estimated
/// after every iteration from how many distinct entity categories it was corroborated
/// under (spec.md §4.7.5: "ProgressTracker containing found candidates").
#[derive(Debug, Clone)]
pub struct Candidate {
    pub value: String,
    pub confidence: f64,
}

/// Minimum iteration count before early-termination thresholds are honored, and the
/// thresholds themselves (spec.md §4.7.5: "after iteration 3", "past a minimum
/// iteration count").
const MIN_ITERATIONS_BEFORE_EARLY_STOP: usize = 3;
const CONFIDENCE_THRESHOLD: f64 = 0.9;
const COVERAGE_THRESHOLD: f64 = 0.8;

pub struct FocusedIterationStrategy<'a> {
    engine: &'a dyn SearchEngine,
    llm: &'a ResearchLlmClient,
    config: StrategyConfig,
    run: RunContext,
}

impl<'a> FocusedIterationStrategy<'a> {
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
impl<'a> super::SearchStrategy for FocusedIterationStrategy<'a> {
    async fn analyze(&self, query: &str) -> Result<AnalyzeResult, ResearchError> {
        let qgen = ProgressiveQuestionGenerator::new(self.llm);
        let citation = CitationHandler::new(self.llm, self.config.enable_fact_checking);
        let all_entities = ProgressiveQuestionGenerator::extract(query);
        let total_categories: std::collections::HashSet<EntityCategory> =
            all_entities.iter().map(|e| e.category).collect();

        let mut links = LinksOfSystem::new();
        let mut findings: Vec<Finding> = Vec::new();
        let mut questions = crate::research::model::QuestionsByIteration::new();
        let mut current_knowledge = String::new();
        let mut tracker = ProgressTracker::new();
        let mut candidates: Vec<Candidate> = Vec::new();
        let mut covered_categories: std::collections::HashSet<EntityCategory> =
            std::collections::HashSet::new();

        let total_iterations = self.config.max_iterations;
        let mut completed_iterations = 0;

        for iteration in 0..total_iterations {
            self.run.check_termination()?;
            self.run.emit(
                format!("Focused iteration {} of {}", iteration + 1, total_iterations),
                Some(tracker.current()),
                Phase::IterationStart,
            );

            let iteration_questions = qgen
                .generate(&current_knowledge, query, self.config.questions_per_iteration, &questions)
                .await;
            questions.insert(iteration, iteration_questions.clone());

            let total_questions = iteration_questions.len().max(1);
            for (qi, question) in iteration_questions.iter().enumerate() {
                self.run.check_termination()?;
                let progress = crate::research::run_context::question_progress(
                    iteration,
                    total_iterations,
                    qi,
                    total_questions,
                );
                self.run
                    .emit(format!("Searching: {question}"), Some(tracker.advance(progress)), Phase::Search);

                let results = self.engine.run(question).await;
                if results.is_empty() {
                    continue;
                }
                let link_offset = links.len();
                links.append(&results);
                let result = if findings.is_empty() {
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

                for e in &all_entities {
                    if result.content.to_lowercase().contains(&e.value.to_lowercase()) {
                        covered_categories.insert(e.category);
                    }
                }
                update_candidates(&mut candidates, question, &result.content, covered_categories.len() as f64, total_categories.len().max(1) as f64);

                findings.push(Finding {
                    phase: "focused-iteration".to_string(),
                    content: result.content.clone(),
                    question: question.clone(),
                    search_results: results,
                    documents: result.documents,
                });
                current_knowledge = format!("{current_knowledge}\n\n{}", result.content);
            }

            completed_iterations = iteration + 1;
            self.run.emit(
                format!("Completed iteration {completed_iterations}"),
                Some(tracker.advance((completed_iterations as f64 / total_iterations as f64) * 100.0)),
                Phase::IterationComplete,
            );

            let coverage = covered_categories.len() as f64 / total_categories.len().max(1) as f64;
            let top_confidence = candidates.iter().map(|c| c.confidence).fold(0.0_f64, f64::max);
            if completed_iterations >= MIN_ITERATIONS_BEFORE_EARLY_STOP
                && (top_confidence > CONFIDENCE_THRESHOLD || coverage > COVERAGE_THRESHOLD)
            {
                self.run.emit(
                    "Stopping early: confidence/coverage threshold reached",
                    Some(tracker.current()),
                    Phase::IterationComplete,
                );
                break;
            }
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

        let coverage = covered_categories.len() as f64 / total_categories.len().max(1) as f64;
        let candidates_json: Vec<serde_json::Value> = candidates
            .iter()
            .map(|c| serde_json::json!({ "value": c.value, "confidence": c.confidence }))
            .collect();

        Ok(AnalyzeResult {
            findings,
            iterations: completed_iterations,
            questions,
            formatted_findings,
            current_knowledge,
            all_links: links.as_slice().to_vec(),
            extras: serde_json::json!({
                "candidates": candidates_json,
                "entity_coverage": coverage,
            }),
        })
    }
}

fn update_candidates(candidates: &mut Vec<Candidate>, question: &str, content: &str, covered: f64, total: f64) {
    let confidence = (covered / total).clamp(0.0, 1.0);
    let key = question.to_string();
    if let Some(existing) = candidates.iter_mut().find(|c| c.value == key) {
        existing.confidence = existing.confidence.max(confidence);
    } else if !content.trim().is_empty() {
        candidates.push(Candidate {
            value: key,
            confidence,
        });
    }
}
