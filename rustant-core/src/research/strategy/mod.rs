//! C7 — `SearchStrategy`: the main orchestrator trait and its seven variants.
//!
//! Each variant is a value composed from the capabilities it needs (engine, LLM,
//! citation handler, question generator, compressor, repository) injected at
//! construction, per spec.md §9 ("Strategy polymorphism ... share implementation via
//! composition rather than inheritance").

mod entity_aware_source;
mod focused_iteration;
mod iterdrag;
mod parallel;
mod rapid;
mod source_based;
mod standard;

pub use entity_aware_source::EntityAwareSourceStrategy;
pub use focused_iteration::FocusedIterationStrategy;
pub use iterdrag::IterDragStrategy;
pub use parallel::ParallelStrategy;
pub use rapid::RapidStrategy;
pub use source_based::SourceBasedStrategy;
pub use standard::StandardStrategy;

use super::error::ResearchError;
use super::llm_client::ResearchLlmClient;
use super::model::{Finding, QuestionsByIteration, SearchResult};
use super::questions::{
    AtomicFactQuestionGenerator, DecompositionQuestionGenerator, EntityAwareQuestionGenerator,
    ProgressiveQuestionGenerator, QuestionGenerator, StandardQuestionGenerator,
};
use super::run_context::RunContext;
use super::search::SearchEngine;
use crate::config::{AccumulationMode, QuestionGeneratorName, ResearchSettings, StrategyName};
use async_trait::async_trait;

/// The settings subset every strategy needs, carved out of the full
/// [`ResearchSettings`] snapshot (spec.md §9: "Settings snapshot").
#[derive(Clone)]
pub struct StrategyConfig {
    pub max_iterations: usize,
    pub questions_per_iteration: usize,
    pub accumulation_mode: AccumulationMode,
    pub question_generator: QuestionGeneratorName,
    pub enable_fact_checking: bool,
    pub searches_per_section: usize,
}

impl From<&ResearchSettings> for StrategyConfig {
    fn from(settings: &ResearchSettings) -> Self {
        Self {
            max_iterations: settings.iterations.max(1),
            questions_per_iteration: settings.questions_per_iteration.max(1),
            accumulation_mode: settings.accumulation_mode,
            question_generator: settings.question_generator,
            enable_fact_checking: settings.enable_fact_checking,
            searches_per_section: settings.searches_per_section.max(1),
        }
    }
}

/// Result of one `analyze(query)` call (spec.md §4.7).
#[derive(Default)]
pub struct AnalyzeResult {
    pub findings: Vec<Finding>,
    pub iterations: usize,
    pub questions: QuestionsByIteration,
    pub formatted_findings: String,
    pub current_knowledge: String,
    pub all_links: Vec<SearchResult>,
    pub extras: serde_json::Value,
}

/// Shared orchestration capability: `analyze(query) -> AnalyzeResult` (spec.md §4.7).
#[async_trait]
pub trait SearchStrategy: Send + Sync {
    async fn analyze(&self, query: &str) -> Result<AnalyzeResult, ResearchError>;
}

/// Picks the `QuestionGenerator` implementation named by a strategy's config,
/// borrowing the LLM client for the duration of the call (spec.md §9:
/// "Question-generator polymorphism").
pub(super) fn question_generator<'a>(
    name: QuestionGeneratorName,
    llm: &'a ResearchLlmClient,
) -> Box<dyn QuestionGenerator + 'a> {
    match name {
        QuestionGeneratorName::Standard => Box::new(StandardQuestionGenerator::new(llm)),
        QuestionGeneratorName::Decomposition => Box::new(DecompositionQuestionGenerator::new(llm)),
        QuestionGeneratorName::AtomicFact => Box::new(AtomicFactQuestionGenerator::new(llm)),
        QuestionGeneratorName::EntityAware => Box::new(EntityAwareQuestionGenerator::new(llm)),
        QuestionGeneratorName::Progressive => Box::new(ProgressiveQuestionGenerator::new(llm)),
    }
}

/// Picks the `SearchStrategy` implementation named by `ResearchSettings.strategy`,
/// borrowing the engine/LLM for the duration of one `analyze` call (spec.md §9:
/// "Strategy polymorphism").
pub fn build_strategy<'a>(
    name: StrategyName,
    engine: &'a dyn SearchEngine,
    llm: &'a ResearchLlmClient,
    config: StrategyConfig,
    run: RunContext,
) -> Box<dyn SearchStrategy + 'a> {
    match name {
        StrategyName::Standard => Box::new(StandardStrategy::new(engine, llm, config, run)),
        StrategyName::Parallel => Box::new(ParallelStrategy::new(engine, llm, config, run)),
        StrategyName::Rapid => Box::new(RapidStrategy::new(engine, llm, config, run)),
        StrategyName::SourceBased => Box::new(SourceBasedStrategy::new(engine, llm, config, run)),
        StrategyName::FocusedIteration => {
            Box::new(FocusedIterationStrategy::new(engine, llm, config, run))
        }
        StrategyName::IterDrag => Box::new(IterDragStrategy::new(engine, llm, config, run)),
        StrategyName::EntityAwareSource => {
            Box::new(EntityAwareSourceStrategy::new(engine, llm, config, run))
        }
    }
}

/// Runs `engine.run(question)` and, if empty, logs a `search_error`-phase progress
/// entry; per spec.md §4.1/§7, an engine returning nothing is not itself an error —
/// only used here to distinguish "no engine configured" (fatal) from "no results
/// found" (continue).
pub(super) async fn run_search(
    engine: &dyn SearchEngine,
    question: &str,
) -> Vec<SearchResult> {
    engine.run(question).await
}
