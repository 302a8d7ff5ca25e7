//! C9 — `ResearchService` + `ActiveResearchManager`: start/worker/finalize/terminate
//! lifecycle, rusqlite persistence, and settings-snapshot capture at research start
//! (spec.md §4.9, §5).

use super::error::{ErrorReportGenerator, ErrorReporter, ResearchError};
use super::llm_client::ResearchLlmClient;
use super::model::{Phase, ProgressEntry, ResearchRecord, ResearchResource, ResearchStatus, SourceType};
use super::progress_bus::{ProgressBus, ProgressEvent};
use super::report::ReportGenerator;
use super::run_context::{ProgressCallback, RunContext, TerminationFlag};
use super::search::SearchEngine;
use super::strategy::{build_strategy, StrategyConfig};
use crate::config::{ResearchMode, ResearchSettings};
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Keeps the `in_progress` set plus worker liveness, enforcing the single-active-
/// research invariant (spec.md §5: "Single-active-research is enforced by checking
/// the `in_progress` set plus worker liveness at start; stale entries are reaped").
#[derive(Default)]
pub struct ActiveResearchManager {
    live: Mutex<HashMap<Uuid, TerminationFlag>>,
}

impl ActiveResearchManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn is_live(&self, id: Uuid) -> bool {
        self.live.lock().await.contains_key(&id)
    }

    pub async fn register(&self, id: Uuid, flag: TerminationFlag) {
        self.live.lock().await.insert(id, flag);
    }

    pub async fn unregister(&self, id: Uuid) {
        self.live.lock().await.remove(&id);
    }

    pub async fn termination_flag(&self, id: Uuid) -> Option<TerminationFlag> {
        self.live.lock().await.get(&id).cloned()
    }

    pub async fn any_live(&self) -> bool {
        !self.live.lock().await.is_empty()
    }
}

/// Sanitizes a query into a filesystem-safe report filename stem: keeps
/// alphanumerics/dash/underscore/space, lowercases, spaces→underscore, truncated to
/// 50 characters (spec.md §6: "Persistent state layout").
pub fn sanitize_query_for_filename(query: &str) -> String {
    let filtered: String = query
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_' || *c == ' ')
        .collect();
    let lowered = filtered.to_lowercase().replace(' ', "_");
    lowered.chars().take(50).collect()
}

/// Durable storage for research records/logs/resources/strategy rows, opened against
/// a single SQLite file (spec.md §6: "A single relational store with tables:
/// research_history, research_logs, research_resources, research_strategy, settings").
pub struct ResearchStore {
    conn: Mutex<Connection>,
}

impl ResearchStore {
    pub fn open(path: &Path) -> Result<Self, ResearchError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS research_history (
                id TEXT PRIMARY KEY,
                query TEXT NOT NULL,
                mode TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                completed_at TEXT,
                duration_seconds INTEGER,
                progress INTEGER NOT NULL,
                report_path TEXT,
                research_meta TEXT NOT NULL,
                progress_log TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS research_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                research_id TEXT NOT NULL,
                time TEXT NOT NULL,
                level TEXT NOT NULL,
                message TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS research_resources (
                id TEXT PRIMARY KEY,
                research_id TEXT NOT NULL,
                title TEXT NOT NULL,
                url TEXT NOT NULL,
                content_preview TEXT NOT NULL,
                source_type TEXT NOT NULL,
                metadata TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS research_strategy (
                research_id TEXT PRIMARY KEY,
                strategy_name TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub async fn insert_new(&self, record: &ResearchRecord) -> Result<(), ResearchError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO research_history
                (id, query, mode, status, created_at, completed_at, duration_seconds,
                 progress, report_path, research_meta, progress_log)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                record.id.to_string(),
                record.query,
                serde_json::to_string(&record.mode).unwrap_or_default(),
                serde_json::to_string(&record.status).unwrap_or_default(),
                record.created_at.to_rfc3339(),
                record.completed_at.map(|t| t.to_rfc3339()),
                record.duration_seconds,
                record.progress,
                record.report_path,
                record.research_meta.to_string(),
                serde_json::to_string(&record.progress_log).unwrap_or_default(),
            ],
        )?;
        Ok(())
    }

    pub async fn insert_strategy(&self, research_id: Uuid, strategy_name: &str) -> Result<(), ResearchError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT OR REPLACE INTO research_strategy (research_id, strategy_name) VALUES (?1, ?2)",
            params![research_id.to_string(), strategy_name],
        )?;
        Ok(())
    }

    /// Appends one progress entry to the in-DB log column and, at milestones, to the
    /// first-class `research_logs` table (spec.md §4.9 worker contract (b)).
    pub async fn append_progress(&self, research_id: Uuid, entry: &ProgressEntry) -> Result<(), ResearchError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("SELECT progress_log, progress FROM research_history WHERE id = ?1")?;
        let (existing, current_progress): (String, i64) = stmt.query_row(params![research_id.to_string()], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?;
        let mut log: Vec<ProgressEntry> = serde_json::from_str(&existing).unwrap_or_default();
        log.push(entry.clone());
        let new_progress = entry
            .progress
            .map(|p| (p as i64).max(current_progress))
            .unwrap_or(current_progress);

        conn.execute(
            "UPDATE research_history SET progress_log = ?1, progress = ?2 WHERE id = ?3",
            params![serde_json::to_string(&log).unwrap_or_default(), new_progress, research_id.to_string()],
        )?;

        let is_milestone = entry.progress.map(|p| p % 10 == 0).unwrap_or(false)
            || matches!(
                entry.phase,
                Some(Phase::Complete) | Some(Phase::IterationComplete) | Some(Phase::Error) | Some(Phase::Termination)
            );
        if is_milestone {
            let level = if matches!(entry.phase, Some(Phase::Error)) {
                "error"
            } else {
                "milestone"
            };
            conn.execute(
                "INSERT INTO research_logs (research_id, time, level, message) VALUES (?1, ?2, ?3, ?4)",
                params![research_id.to_string(), entry.time.to_rfc3339(), level, entry.message],
            )?;
        }
        Ok(())
    }

    pub async fn finalize(
        &self,
        research_id: Uuid,
        status: ResearchStatus,
        report_path: Option<&str>,
        research_meta: serde_json::Value,
    ) -> Result<(), ResearchError> {
        let conn = self.conn.lock().await;
        let now = chrono::Utc::now();
        let created_at: String = conn.query_row(
            "SELECT created_at FROM research_history WHERE id = ?1",
            params![research_id.to_string()],
            |row| row.get(0),
        )?;
        let created_at = super::model::parse_timestamp_tolerant(&created_at).unwrap_or(now);
        let duration = (now - created_at).num_seconds();

        conn.execute(
            "UPDATE research_history
             SET status = ?1, completed_at = ?2, duration_seconds = ?3, report_path = ?4, research_meta = ?5
             WHERE id = ?6",
            params![
                serde_json::to_string(&status).unwrap_or_default(),
                now.to_rfc3339(),
                duration,
                report_path,
                research_meta.to_string(),
                research_id.to_string(),
            ],
        )?;
        Ok(())
    }

    pub async fn insert_resource(&self, resource: &ResearchResource) -> Result<(), ResearchError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO research_resources
                (id, research_id, title, url, content_preview, source_type, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                resource.id.to_string(),
                resource.research_id.to_string(),
                resource.title,
                resource.url,
                resource.content_preview,
                serde_json::to_string(&resource.source_type).unwrap_or_default(),
                resource.metadata.to_string(),
                resource.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub async fn get_record(&self, research_id: Uuid) -> Result<ResearchRecord, ResearchError> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT id, query, mode, status, created_at, completed_at, duration_seconds,
                    progress, report_path, research_meta, progress_log
             FROM research_history WHERE id = ?1",
            params![research_id.to_string()],
            row_to_record,
        )
        .map_err(|_| ResearchError::NotFound {
            id: research_id.to_string(),
        })
    }

    pub async fn list_in_progress(&self) -> Result<Vec<Uuid>, ResearchError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("SELECT id FROM research_history WHERE status = ?1")?;
        let ids = stmt
            .query_map(params![serde_json::to_string(&ResearchStatus::InProgress).unwrap_or_default()], |row| {
                row.get::<_, String>(0)
            })?
            .filter_map(|r| r.ok())
            .filter_map(|s| Uuid::parse_str(&s).ok())
            .collect();
        Ok(ids)
    }

    pub async fn delete(&self, research_id: Uuid) -> Result<(), ResearchError> {
        let record = self.get_record(research_id).await?;
        if record.status == ResearchStatus::InProgress {
            return Err(ResearchError::DeleteWhileInProgress);
        }
        let conn = self.conn.lock().await;
        conn.execute("DELETE FROM research_history WHERE id = ?1", params![research_id.to_string()])?;
        conn.execute("DELETE FROM research_logs WHERE research_id = ?1", params![research_id.to_string()])?;
        conn.execute("DELETE FROM research_resources WHERE research_id = ?1", params![research_id.to_string()])?;
        conn.execute("DELETE FROM research_strategy WHERE research_id = ?1", params![research_id.to_string()])?;
        Ok(())
    }

    pub async fn logs(&self, research_id: Uuid) -> Result<Vec<super::model::ResearchLog>, ResearchError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, research_id, time, level, message FROM research_logs WHERE research_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![research_id.to_string()], |row| {
                let level_str: String = row.get(3)?;
                let time_str: String = row.get(2)?;
                Ok(super::model::ResearchLog {
                    id: row.get(0)?,
                    research_id,
                    time: super::model::parse_timestamp_tolerant(&time_str).unwrap_or_else(chrono::Utc::now),
                    level: serde_json::from_str(&format!("\"{level_str}\"")).unwrap_or(super::model::LogLevel::Info),
                    message: row.get(4)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    pub async fn resources(&self, research_id: Uuid) -> Result<Vec<ResearchResource>, ResearchError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, research_id, title, url, content_preview, source_type, metadata, created_at
             FROM research_resources WHERE research_id = ?1",
        )?;
        let rows = stmt
            .query_map(params![research_id.to_string()], |row| {
                let id_str: String = row.get(0)?;
                let source_type_str: String = row.get(5)?;
                let metadata_str: String = row.get(6)?;
                let created_at_str: String = row.get(7)?;
                Ok(ResearchResource {
                    id: Uuid::parse_str(&id_str).unwrap_or_else(Uuid::new_v4),
                    research_id,
                    title: row.get(2)?,
                    url: row.get(3)?,
                    content_preview: row.get(4)?,
                    source_type: serde_json::from_str(&format!("\"{source_type_str}\"")).unwrap_or(SourceType::Other),
                    metadata: serde_json::from_str(&metadata_str).unwrap_or(serde_json::json!({})),
                    created_at: super::model::parse_timestamp_tolerant(&created_at_str).unwrap_or_else(chrono::Utc::now),
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }
}

fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<ResearchRecord> {
    let id_str: String = row.get(0)?;
    let mode_str: String = row.get(2)?;
    let status_str: String = row.get(3)?;
    let created_at_str: String = row.get(4)?;
    let completed_at_str: Option<String> = row.get(5)?;
    let research_meta_str: String = row.get(9)?;
    let progress_log_str: String = row.get(10)?;
    Ok(ResearchRecord {
        id: Uuid::parse_str(&id_str).unwrap_or_else(|_| Uuid::new_v4()),
        query: row.get(1)?,
        mode: serde_json::from_str(&mode_str).unwrap_or_default(),
        status: serde_json::from_str(&status_str).unwrap_or(ResearchStatus::Failed),
        created_at: super::model::parse_timestamp_tolerant(&created_at_str).unwrap_or_else(chrono::Utc::now),
        completed_at: completed_at_str.and_then(|s| super::model::parse_timestamp_tolerant(&s)),
        duration_seconds: row.get(6)?,
        progress: row.get(7)?,
        report_path: row.get(8)?,
        research_meta: serde_json::from_str(&research_meta_str).unwrap_or(serde_json::json!({})),
        progress_log: serde_json::from_str(&progress_log_str).unwrap_or_default(),
    })
}

/// The finished state of one research run, returned to callers that want a synchronous
/// view of a single run rather than polling the store (used by `quick_summary`/
/// `generate_report` library-surface callers, spec.md §6).
pub struct RunOutcome {
    pub record: ResearchRecord,
    pub summary: String,
}

/// Lifecycle owner: start/worker/finalize/terminate, per spec.md §4.9.
pub struct ResearchService {
    store: Arc<ResearchStore>,
    bus: Arc<ProgressBus>,
    active: Arc<ActiveResearchManager>,
    output_dir: PathBuf,
    error_reporter: ErrorReporter,
    error_report_generator: ErrorReportGenerator,
}

impl ResearchService {
    pub fn new(db_path: &Path, output_dir: impl Into<PathBuf>) -> Result<Self, ResearchError> {
        Ok(Self {
            store: Arc::new(ResearchStore::open(db_path)?),
            bus: Arc::new(ProgressBus::new()),
            active: Arc::new(ActiveResearchManager::new()),
            output_dir: output_dir.into(),
            error_reporter: ErrorReporter::new(),
            error_report_generator: ErrorReportGenerator::new(),
        })
    }

    pub fn bus(&self) -> Arc<ProgressBus> {
        self.bus.clone()
    }

    pub fn store(&self) -> Arc<ResearchStore> {
        self.store.clone()
    }

    /// Reaps `in_progress` rows whose worker is no longer live, marking them `failed`
    /// (spec.md §5: "stale entries are reaped").
    async fn reap_stale(&self) -> Result<(), ResearchError> {
        for id in self.store.list_in_progress().await? {
            if !self.active.is_live(id).await {
                warn!(research_id = %id, "reaping stale in_progress research with no live worker");
                self.store
                    .finalize(
                        id,
                        ResearchStatus::Failed,
                        None,
                        serde_json::json!({ "error": "worker process ended before research completed" }),
                    )
                    .await?;
            }
        }
        Ok(())
    }

    /// Starts a new research: validates the query, enforces the single-active-research
    /// invariant (after reaping stale rows), persists the initial record, and spawns the
    /// worker task. Returns the new research id.
    pub async fn start_research(
        &self,
        query: impl Into<String>,
        mode: ResearchMode,
        settings: ResearchSettings,
        engine: Arc<dyn SearchEngine>,
        llm: Arc<ResearchLlmClient>,
    ) -> Result<Uuid, ResearchError> {
        let query = query.into();
        if query.trim().is_empty() {
            return Err(ResearchError::EmptyQuery);
        }

        self.reap_stale().await?;
        if self.active.any_live().await {
            return Err(ResearchError::AlreadyRunning);
        }

        let record = ResearchRecord::new(&query, mode);
        let research_id = record.id;
        self.store.insert_new(&record).await?;
        self.store.insert_strategy(research_id, &format!("{:?}", settings.strategy)).await?;

        let termination = TerminationFlag::new();
        self.active.register(research_id, termination.clone()).await;

        let store = self.store.clone();
        let bus = self.bus.clone();
        let active = self.active.clone();
        let output_dir = self.output_dir.clone();

        tokio::spawn(async move {
            let store_for_progress = store.clone();
            let bus_for_progress = bus.clone();
            let progress: ProgressCallback = Arc::new(move |entry: ProgressEntry| {
                let store = store_for_progress.clone();
                let bus = bus_for_progress.clone();
                let status = if matches!(entry.phase, Some(Phase::Error)) {
                    ResearchStatus::Failed
                } else {
                    ResearchStatus::InProgress
                };
                tokio::spawn(async move {
                    let _ = store.append_progress(research_id, &entry).await;
                    bus.publish(
                        research_id,
                        ProgressEvent {
                            progress: entry.progress.unwrap_or(0),
                            message: entry.message.clone(),
                            status,
                            log_entry: entry,
                        },
                    )
                    .await;
                });
            });
            let run = RunContext::new(termination.clone(), progress);

            let outcome = run_worker(&query, mode, &settings, &*engine, &llm, run.clone(), &output_dir).await;

            match outcome {
                Ok((content, meta)) if !termination.is_requested() => {
                    let sanitized = sanitize_query_for_filename(&query);
                    let report_path = output_dir.join(format!("{sanitized}.md"));
                    let _ = tokio::fs::create_dir_all(&output_dir).await;
                    let _ = tokio::fs::write(&report_path, &content).await;
                    run.emit("Research complete", Some(100), Phase::Complete);
                    let _ = store
                        .finalize(
                            research_id,
                            ResearchStatus::Completed,
                            Some(&report_path.to_string_lossy()),
                            meta,
                        )
                        .await;
                }
                Ok(_) => {
                    run.emit("Research terminated by request", Some(100), Phase::Termination);
                    let _ = store.finalize(research_id, ResearchStatus::Suspended, None, serde_json::json!({})).await;
                }
                Err(err) if matches!(err, ResearchError::Terminated) => {
                    run.emit("Research terminated by request", Some(100), Phase::Termination);
                    let _ = store.finalize(research_id, ResearchStatus::Suspended, None, serde_json::json!({})).await;
                }
                Err(err) => {
                    let reporter = ErrorReporter::new();
                    let (analysis, _) = reporter.analyze(&err.to_string(), false);
                    let generator = ErrorReportGenerator::new();
                    let diagnostic = generator.generate(&err.to_string(), None);
                    let sanitized = sanitize_query_for_filename(&query);
                    let report_path = output_dir.join(format!("{sanitized}.md"));
                    let _ = tokio::fs::create_dir_all(&output_dir).await;
                    let _ = tokio::fs::write(&report_path, &diagnostic).await;
                    run.emit(format!("Research failed: {err}"), Some(100), Phase::Error);
                    let _ = store
                        .finalize(
                            research_id,
                            ResearchStatus::Failed,
                            Some(&report_path.to_string_lossy()),
                            serde_json::json!({ "category": analysis.category, "severity": analysis.severity }),
                        )
                        .await;
                }
            }
            active.unregister(research_id).await;
        });

        Ok(research_id)
    }

    /// Sets the termination flag for a live research; the status flip happens when the
    /// worker next observes it (spec.md §4.9: "Terminate").
    pub async fn terminate(&self, research_id: Uuid) -> Result<(), ResearchError> {
        match self.active.termination_flag(research_id).await {
            Some(flag) => {
                flag.request();
                self.bus
                    .publish(
                        research_id,
                        ProgressEvent {
                            progress: 0,
                            message: "terminating".to_string(),
                            status: ResearchStatus::InProgress,
                            log_entry: ProgressEntry::new("terminating", None, Phase::Termination),
                        },
                    )
                    .await;
                Ok(())
            }
            None => Err(ResearchError::NotFound {
                id: research_id.to_string(),
            }),
        }
    }

    pub async fn status(&self, research_id: Uuid) -> Result<ResearchRecord, ResearchError> {
        self.store.get_record(research_id).await
    }

    pub async fn delete(&self, research_id: Uuid) -> Result<(), ResearchError> {
        if self.active.is_live(research_id).await {
            return Err(ResearchError::DeleteWhileInProgress);
        }
        let record = self.store.get_record(research_id).await?;
        if let Some(path) = &record.report_path {
            let _ = tokio::fs::remove_file(path).await;
        }
        self.store.delete(research_id).await
    }
}

/// Instantiates the configured strategy and, for `detailed` mode, hands off to
/// `ReportGenerator`; returns the document body plus `research_meta` to persist
/// (spec.md §4.9: "Finalize").
async fn run_worker(
    query: &str,
    mode: ResearchMode,
    settings: &ResearchSettings,
    engine: &dyn SearchEngine,
    llm: &ResearchLlmClient,
    run: RunContext,
    output_dir: &Path,
) -> Result<(String, serde_json::Value), ResearchError> {
    let _ = output_dir;
    run.check_termination()?;
    run.emit("Starting research", Some(0), Phase::Init);

    let config = StrategyConfig::from(settings);
    let strategy = build_strategy(settings.strategy, engine, llm, config.clone(), run.clone());
    let initial = strategy.analyze(query).await?;

    match mode {
        ResearchMode::Quick => {
            let meta = serde_json::json!({
                "iterations": initial.iterations,
                "strategy": format!("{:?}", settings.strategy),
                "source_count": initial.all_links.len(),
            });
            Ok((initial.formatted_findings, meta))
        }
        ResearchMode::Detailed => {
            let generator = ReportGenerator::new(llm, config.clone(), run.clone());
            let report = generator
                .generate(query, &initial.current_knowledge, &initial.all_links, |cfg, run| {
                    build_strategy(settings.strategy, engine, llm, cfg, run)
                })
                .await?;
            let meta = serde_json::json!({
                "generated_at": report.metadata.generated_at,
                "initial_sources": report.metadata.initial_sources,
                "sections_researched": report.metadata.sections_researched,
                "searches_per_section": report.metadata.searches_per_section,
                "query": report.metadata.query,
            });
            Ok((report.content, meta))
        }
    }
}
