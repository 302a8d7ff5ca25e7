//! 4.7.6 — IterDRAG: initial search on the raw query, decompose into sub-queries,
//! answer each with accumulated knowledge, then reconcile into one final answer.

use super::{AnalyzeResult, StrategyConfig};
use crate::research::citation::CitationHandler;
use crate::research::compressor::KnowledgeCompressor;
use crate::research::error::ResearchError;
use crate::research::llm_client::ResearchLlmClient;
use crate::research::model::{Finding, LinksOfSystem, Phase};
use crate::research::questions::DecompositionQuestionGenerator;
use crate::research::questions::QuestionGenerator;
use crate::research::run_context::RunContext;
use crate::research::search::SearchEngine;
use async_trait::async_trait;

pub struct IterDragStrategy<'a> {
    engine: &'a dyn SearchEngine,
    llm: &'a ResearchLlmClient,
    config: StrategyConfig,
    run: RunContext,
}

impl<'a> IterDragStrategy<'a> {
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
impl<'a> super::SearchStrategy for IterDragStrategy<'a> {
    async fn analyze(&self, query: &str) -> Result<AnalyzeResult, ResearchError> {
        self.run.check_termination()?;
        let citation = CitationHandler::new(self.llm, self.config.enable_fact_checking);
        let compressor = KnowledgeCompressor::new(self.llm, self.config.accumulation_mode);
        let decomposer = DecompositionQuestionGenerator::new(self.llm);

        let mut links = LinksOfSystem::new();
        let mut findings = Vec::new();
        let mut questions = crate::research::model::QuestionsByIteration::new();

        self.run.emit("Initial search on raw query", Some(5), Phase::Search);
        let initial_results = self.engine.run(query).await;
        links.append(&initial_results);
        let initial = if initial_results.is_empty() {
            crate::research::citation::CitationResult {
                content: "No relevant results found".to_string(),
                documents: Vec::new(),
            }
        } else {
            citation
                .analyze_initial(query, &initial_results)
                .await
                .unwrap_or(crate::research::citation::CitationResult {
                    content: "No relevant results found".to_string(),
                    documents: Vec::new(),
                })
        };
        findings.push(Finding {
            phase: "initial".to_string(),
            content: initial.content.clone(),
            question: query.to_string(),
            search_results: initial_results,
            documents: initial.documents,
        });
        let mut current_knowledge = initial.content;

        self.run.check_termination()?;
        self.run
            .emit("Decomposing into sub-queries", Some(15), Phase::Analysis);
        let sub_queries = decomposer
            .generate(&current_knowledge, query, self.config.questions_per_iteration.max(2), &questions)
            .await;
        questions.insert(0, sub_queries.clone());

        let total = sub_queries.len().max(1);
        for (i, sub_query) in sub_queries.iter().enumerate() {
            self.run.check_termination()?;
            let progress = 15.0 + (i as f64 / total as f64) * 70.0;
            self.run
                .emit(format!("Searching sub-query: {sub_query}"), Some(progress as u8), Phase::Search);

            let results = self.engine.run(sub_query).await;
            if results.is_empty() {
                continue;
            }
            let link_offset = links.len();
            links.append(&results);
            let result = match citation
                .analyze_followup(sub_query, &results, &current_knowledge, link_offset)
                .await
            {
                Ok(r) => r,
                Err(_) => continue,
            };
            findings.push(Finding {
                phase: "follow-up".to_string(),
                content: result.content.clone(),
                question: sub_query.clone(),
                search_results: results,
                documents: result.documents,
            });
            current_knowledge = format!("{current_knowledge}\n\n{}", result.content);
        }

        if compressor.should_compress(true) {
            current_knowledge = compressor.compress(&current_knowledge, query, links.as_slice()).await;
            self.run.emit(
                "Compressed accumulated knowledge",
                Some(90),
                Phase::KnowledgeCompression,
            );
        }

        self.run.check_termination()?;
        self.run
            .emit("Reconciling sub-answers into final answer", Some(95), Phase::Analysis);
        let reconcile_prompt = format!(
            "Reconcile the following sub-answers into a single, coherent, integrated answer to \
the original question. Preserve citation numbers [n] as given; do not renumber.\n\n\
Original question: {query}\n\nAccumulated sub-answers:\n{current_knowledge}"
        );
        let final_answer = match self.llm.invoke(&reconcile_prompt).await {
            Ok(r) => r.content,
            Err(_) => current_knowledge.clone(),
        };

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

        self.run.emit("IterDRAG research complete", Some(100), Phase::Complete);

        Ok(AnalyzeResult {
            findings,
            iterations: 1,
            questions,
            formatted_findings,
            current_knowledge: final_answer,
            all_links: links.as_slice().to_vec(),
            extras: serde_json::json!({ "sub_query_count": sub_queries.len() }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::MockLlmProvider;
    use crate::config::{AccumulationMode, QuestionGeneratorName};
    use crate::research::model::SearchResult;
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
    async fn analyze_produces_a_finding_per_sub_query_plus_the_initial_one() {
        let provider = Arc::new(MockLlmProvider::with_response(
            "Q: who wrote it?\nQ: when was it published?\n",
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
            question_generator: QuestionGeneratorName::Decomposition,
            enable_fact_checking: false,
            searches_per_section: 1,
        };
        let strategy = IterDragStrategy::new(&engine, &llm, config, RunContext::silent());
        let result = strategy.analyze("Who wrote X and when was it published?").await.unwrap();
        assert_eq!(result.questions[&0].len(), 2);
        assert_eq!(result.findings.len(), 3);
    }
}
