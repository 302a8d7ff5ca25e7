//! Data model — persisted records, progress entries, and per-run runtime types.
//!
//! Mirrors the shapes in the companion spec's data model section: everything that
//! outlives a single `SearchStrategy::analyze` call lives here rather than in the
//! strategy/engine modules that produce it.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Lifecycle status of a research record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchStatus {
    InProgress,
    Completed,
    Failed,
    Suspended,
}

/// Phase vocabulary for `ProgressEntry.metadata.phase`. Fixed set per the progress
/// contract: every phase transition emits one of these, values are never invented
/// ad hoc by a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Init,
    IterationStart,
    Search,
    SearchComplete,
    SearchError,
    Analysis,
    AnalysisComplete,
    AnalysisError,
    KnowledgeCompression,
    IterationComplete,
    OutputGeneration,
    ReportGeneration,
    ReportComplete,
    Complete,
    Error,
    Termination,
}

/// One entry in a research record's in-memory/append-only progress log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub time: DateTime<Utc>,
    pub message: String,
    #[serde(default)]
    pub progress: Option<u8>,
    #[serde(default)]
    pub phase: Option<Phase>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ProgressEntry {
    pub fn new(message: impl Into<String>, progress: Option<u8>, phase: Phase) -> Self {
        Self {
            time: Utc::now(),
            message: message.into(),
            progress,
            phase: Some(phase),
            metadata: HashMap::new(),
        }
    }
}

/// Persisted research record. One row per `start_research` call; single in-progress
/// row per process is enforced by `ActiveResearchManager`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchRecord {
    pub id: Uuid,
    pub query: String,
    pub mode: crate::config::ResearchMode,
    pub status: ResearchStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_seconds: Option<i64>,
    pub progress: u8,
    #[serde(default)]
    pub report_path: Option<String>,
    #[serde(default)]
    pub research_meta: serde_json::Value,
    #[serde(default)]
    pub progress_log: Vec<ProgressEntry>,
}

impl ResearchRecord {
    pub fn new(query: impl Into<String>, mode: crate::config::ResearchMode) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            query: query.into(),
            mode,
            status: ResearchStatus::InProgress,
            created_at: now,
            completed_at: None,
            duration_seconds: None,
            progress: 0,
            report_path: None,
            research_meta: serde_json::json!({}),
            progress_log: vec![ProgressEntry::new(
                "Research initialized",
                Some(0),
                Phase::Init,
            )],
        }
    }

    /// Derive the duration from `created_at`/`completed_at`; `None` while in progress.
    pub fn duration(&self) -> Option<i64> {
        self.completed_at
            .map(|end| (end - self.created_at).num_seconds())
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status, ResearchStatus::InProgress)
    }
}

/// Log severity for `ResearchLog` rows, independent of `Phase`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Milestone,
    Error,
}

/// First-class log row, duplicating (a subset of) `progress_log` so history can be
/// filtered by level/research_id independent of the legacy JSON column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchLog {
    pub id: i64,
    pub research_id: Uuid,
    pub time: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

/// Provenance classification for a `ResearchResource`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Web,
    Arxiv,
    Wikipedia,
    Pubmed,
    GitHub,
    News,
    LocalCollection,
    Other,
}

/// A single cited source, persisted alongside the record it was discovered for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchResource {
    pub id: Uuid,
    pub research_id: Uuid,
    pub title: String,
    pub url: String,
    pub content_preview: String,
    pub source_type: SourceType,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// 1:1 row naming which `StrategyName` a research record used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchStrategyRow {
    pub research_id: Uuid,
    pub strategy_name: String,
}

/// A single search hit, runtime-only (never persisted as its own row; it becomes a
/// `ResearchResource` and/or a `Document` once consumed).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub link: String,
    pub snippet: String,
    #[serde(default)]
    pub full_content: Option<String>,
    #[serde(default)]
    pub index: Option<usize>,
    #[serde(default)]
    pub extras: serde_json::Value,
}

/// Metadata carried alongside a `Document`'s page content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub source: String,
    pub title: String,
    pub index: usize,
}

/// Citable unit handed to the LLM during synthesis; one per `SearchResult` consumed
/// by `CitationHandler::create_documents`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub page_content: String,
    pub metadata: DocumentMetadata,
}

/// One phase's output within a research run (search+analysis of one sub-question, or
/// a synthesis step). Distinct from the original system's per-source "finding" — this
/// is the richer `{phase, content, question, search_results, documents}` shape spec'd.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub phase: String,
    pub content: String,
    pub question: String,
    pub search_results: Vec<SearchResult>,
    pub documents: Vec<Document>,
}

/// Sub-queries generated for each iteration, in generation order. `iteration` is
/// 0-based internally; strategies report 1-based iteration numbers in progress text.
pub type QuestionsByIteration = HashMap<usize, Vec<String>>;

/// Append-only accumulator of every `SearchResult` seen so far in a run; its length
/// is the basis for citation numbering (`nr_of_links = len(LinksOfSystem)` before the
/// next batch is appended).
#[derive(Debug, Clone, Default)]
pub struct LinksOfSystem {
    links: Vec<SearchResult>,
}

impl LinksOfSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Append a batch of results, returning the citation offset that was in effect
    /// *before* this append (i.e. `link_offset` to pass to the citation handler).
    pub fn append(&mut self, results: &[SearchResult]) -> usize {
        let offset = self.links.len();
        self.links.extend(results.iter().cloned());
        offset
    }

    pub fn as_slice(&self) -> &[SearchResult] {
        &self.links
    }

    /// De-duplicated by URL, preserving first-seen order — used for the final
    /// "Sources" section.
    pub fn deduped(&self) -> Vec<&SearchResult> {
        let mut seen = std::collections::HashSet::new();
        self.links
            .iter()
            .filter(|r| seen.insert(r.link.clone()))
            .collect()
    }
}

/// Tolerant ISO-8601 parser: prefers RFC3339, falls back to the legacy
/// `YYYY-MM-DD HH:MM:SS` naive format (spec.md §3/§8: "parseISO must be total").
pub fn parse_timestamp_tolerant(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}
