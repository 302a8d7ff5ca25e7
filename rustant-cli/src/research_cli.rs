//! `rustant research` subcommand: runs a research synchronously to completion
//! (`start`), or inspects the persisted record of a previous run (`status`,
//! `watch`, `terminate`).

use crate::ResearchAction;
use rustant_core::config::{ResearchMode, ResearchSettings, StrategyName};
use rustant_core::providers::create_provider;
use rustant_core::research::search::{EngineContext, EngineRegistry};
use rustant_core::research::service::ResearchService;
use rustant_core::research::{ResearchLlmClient, ResearchStatus};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

fn parse_strategy(name: &str) -> Option<StrategyName> {
    match name {
        "standard" => Some(StrategyName::Standard),
        "parallel" => Some(StrategyName::Parallel),
        "rapid" => Some(StrategyName::Rapid),
        "source_based" => Some(StrategyName::SourceBased),
        "focused_iteration" => Some(StrategyName::FocusedIteration),
        "iter_drag" => Some(StrategyName::IterDrag),
        "entity_aware_source" => Some(StrategyName::EntityAwareSource),
        _ => None,
    }
}

fn research_db_path(workspace: &Path) -> PathBuf {
    workspace.join(".rustant").join("research.db")
}

fn research_output_dir(workspace: &Path) -> PathBuf {
    workspace.join("research_outputs")
}

pub async fn handle_research(action: ResearchAction, workspace: &Path) -> anyhow::Result<()> {
    match action {
        ResearchAction::Start {
            query,
            mode,
            strategy,
            output,
        } => start(query, mode, strategy, output, workspace).await,
        ResearchAction::Status { id } => status(id, workspace).await,
        ResearchAction::Watch { id } => watch(id, workspace).await,
        ResearchAction::Terminate { id } => terminate(id, workspace).await,
    }
}

async fn start(
    query: String,
    mode: String,
    strategy: Option<String>,
    output: Option<PathBuf>,
    workspace: &Path,
) -> anyhow::Result<()> {
    let mode = match mode.as_str() {
        "quick" => ResearchMode::Quick,
        "detailed" => ResearchMode::Detailed,
        other => anyhow::bail!("unknown research mode '{other}', expected 'quick' or 'detailed'"),
    };

    let mut settings = ResearchSettings::default();
    settings.mode = mode;
    if let Some(name) = strategy {
        settings.strategy = parse_strategy(&name)
            .ok_or_else(|| anyhow::anyhow!("unknown strategy '{name}'"))?;
    }

    let config = rustant_core::config::load_config(Some(workspace), None)
        .map_err(|e| anyhow::anyhow!("configuration error: {e}"))?;
    let llm_provider = create_provider(&config.llm)
        .map_err(|e| anyhow::anyhow!("failed to initialize LLM provider: {e}"))?;

    std::fs::create_dir_all(workspace.join(".rustant"))?;
    let output_dir = output.unwrap_or_else(|| research_output_dir(workspace));
    std::fs::create_dir_all(&output_dir)?;

    let service = Arc::new(ResearchService::new(&research_db_path(workspace), output_dir)?);
    let registry = EngineRegistry::new();

    let llm = Arc::new(ResearchLlmClient::new(
        llm_provider.clone(),
        config.llm.provider.clone(),
        Uuid::new_v4(),
    ));
    let engine = registry
        .create(
            &settings.search_tool,
            EngineContext {
                llm: Some(llm.clone()),
                skip_relevance_filter: settings.skip_relevance_filter,
                max_filtered_results: settings.max_filtered_results,
                search_snippets_only: settings.search_snippets_only,
                max_results: settings.max_results,
                max_engines_to_try: settings.max_engines_to_try,
            },
            settings.use_api_key_services,
        )
        .map_err(|e| anyhow::anyhow!("failed to construct search engine: {e}"))?;

    println!("Starting {mode:?} research: {query}");
    let id = service
        .start_research(query, mode, settings, Arc::from(engine), llm)
        .await
        .map_err(|e| anyhow::anyhow!("failed to start research: {e}"))?;
    println!("Research id: {id}");

    loop {
        let record = service.status(id).await?;
        if !record.is_active() {
            println!("Status: {:?}", record.status);
            if let Some(path) = &record.report_path {
                println!("Report written to: {path}");
            }
            return match record.status {
                ResearchStatus::Completed => Ok(()),
                _ => std::process::exit(1),
            };
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
}

async fn status(id: String, workspace: &Path) -> anyhow::Result<()> {
    let id = Uuid::parse_str(&id)?;
    let store = rustant_core::research::service::ResearchStore::open(&research_db_path(workspace))?;
    let record = store.get_record(id).await?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

async fn watch(id: String, workspace: &Path) -> anyhow::Result<()> {
    let parsed = Uuid::parse_str(&id)?;
    let store = rustant_core::research::service::ResearchStore::open(&research_db_path(workspace))?;
    loop {
        let record = store.get_record(parsed).await?;
        println!("progress={}% status={:?}", record.progress, record.status);
        if !record.is_active() {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(1000)).await;
    }
}

async fn terminate(id: String, workspace: &Path) -> anyhow::Result<()> {
    let _ = Uuid::parse_str(&id)?;
    let _ = workspace;
    // `terminate` affects an in-memory `TerminationFlag` owned by the process
    // running `research start`; a separate CLI invocation has no handle to it.
    // A long-running `rustant research serve` front-end (exposing `research::http`)
    // is the intended way to terminate research from another process.
    anyhow::bail!(
        "cannot terminate research {id}: no live research process in this invocation; \
         run the research under a long-lived server exposing research::http to terminate it remotely"
    )
}
