//! C1 — `SearchEngine`: the two-phase preview/full-content retrieval abstraction,
//! the engine registry/factory, and the `auto` meta-engine.

pub mod engines;

use super::llm_client::ResearchLlmClient;
use super::model::SearchResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Everything a concrete engine needs that is *not* query-specific: the LLM used for
/// relevance filtering (optional — engines with no LLM attached skip filtering), and
/// the settings-snapshot knobs that shape the two-phase contract (spec.md §4.1).
#[derive(Clone)]
pub struct EngineContext {
    pub llm: Option<Arc<ResearchLlmClient>>,
    pub skip_relevance_filter: bool,
    pub max_filtered_results: Option<usize>,
    pub search_snippets_only: bool,
    pub max_results: usize,
    pub max_engines_to_try: usize,
}

impl Default for EngineContext {
    fn default() -> Self {
        Self {
            llm: None,
            skip_relevance_filter: false,
            max_filtered_results: None,
            search_snippets_only: false,
            max_results: 10,
            max_engines_to_try: 3,
        }
    }
}

/// The shared two-phase capability every concrete engine implements (spec.md §4.1:
/// `{run(query) -> []SearchResult, invoke(query) -> []SearchResult}`, `invoke` a
/// compatibility alias for `run`).
#[async_trait]
pub trait SearchEngine: Send + Sync {
    fn name(&self) -> &str;

    fn context(&self) -> &EngineContext;

    /// Cheap fetch returning title/snippet/link only. Never raises across this
    /// boundary (spec.md §7): a transient failure returns an empty vec, which the
    /// orchestrator treats as "this sub-question yielded nothing."
    async fn get_previews(&self, query: &str) -> Vec<SearchResult>;

    /// Fetches page bodies for the given (already-filtered) items, attaching
    /// `full_content`. The default passes previews through unchanged; engines that
    /// fetch full pages override this.
    async fn get_full_content(&self, items: Vec<SearchResult>) -> Vec<SearchResult> {
        items
    }

    /// Optional LLM-driven rerank. Skipped (returns the input, truncated) when
    /// `skip_relevance_filter` is set or no LLM is attached.
    async fn filter_for_relevance(&self, previews: Vec<SearchResult>, query: &str) -> Vec<SearchResult> {
        let ctx = self.context();
        if ctx.skip_relevance_filter {
            return truncate(previews, ctx.max_filtered_results);
        }
        let Some(llm) = ctx.llm.as_ref() else {
            return truncate(previews, ctx.max_filtered_results);
        };
        let prompt = relevance_prompt(query, &previews);
        match llm.invoke(&prompt).await {
            Ok(response) => match parse_ranked_indices(&response.content) {
                Some(order) => {
                    let reordered: Vec<SearchResult> = order
                        .into_iter()
                        .filter_map(|i| previews.get(i.checked_sub(1)?).cloned())
                        .collect();
                    truncate(reordered, ctx.max_filtered_results)
                }
                None => truncate(previews, ctx.max_filtered_results),
            },
            Err(_) => truncate(previews, ctx.max_filtered_results),
        }
    }

    /// Default two-phase `run`: previews → relevance filter → (snippets-only or full
    /// content). Concrete engines should not need to override this.
    async fn run(&self, query: &str) -> Vec<SearchResult> {
        let previews = self.get_previews(query).await;
        if previews.is_empty() {
            return previews;
        }
        let relevant = self.filter_for_relevance(previews, query).await;
        if self.context().search_snippets_only {
            relevant
        } else {
            self.get_full_content(relevant).await
        }
    }

    /// Compatibility alias for [`SearchEngine::run`].
    async fn invoke(&self, query: &str) -> Vec<SearchResult> {
        self.run(query).await
    }
}

fn truncate(mut items: Vec<SearchResult>, max: Option<usize>) -> Vec<SearchResult> {
    if let Some(max) = max {
        items.truncate(max);
    }
    items
}

fn relevance_prompt(query: &str, previews: &[SearchResult]) -> String {
    let today = chrono::Utc::now().format("%Y-%m-%d");
    let items: Vec<serde_json::Value> = previews
        .iter()
        .enumerate()
        .map(|(i, p)| {
            serde_json::json!({
                "index": i + 1,
                "title": p.title,
                "snippet": p.snippet,
                "link": p.link,
            })
        })
        .collect();
    let json = serde_json::to_string(&items).unwrap_or_default();
    format!(
        "Today's date is {today}. Given the search query and the following preview results, \
rank them from most to least relevant considering, in order of importance: timeliness, direct \
relevance to the query, source reliability, and factual plausibility.\n\n\
Query: {query}\n\nPreviews (JSON):\n{json}\n\n\
Return ONLY a JSON array of the 1-based \"index\" values, most relevant first. No other text."
    )
}

/// Tolerant parser: locates the first `[` and last `]` in the response and parses the
/// JSON array between them, tolerating surrounding prose (spec.md §4.1). Returns
/// `None` on any parse failure so the caller can degrade to the unranked order.
fn parse_ranked_indices(text: &str) -> Option<Vec<usize>> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end < start {
        return None;
    }
    let slice = &text[start..=end];
    serde_json::from_str::<Vec<usize>>(slice).ok()
}

/// Static description of one engine for the registry table and the meta engine's
/// prompt (spec.md §4.1: "engine configuration registry").
#[derive(Debug, Clone)]
pub struct EngineDescriptor {
    pub name: &'static str,
    pub requires_api_key: bool,
    pub api_key_env: Option<&'static str>,
    pub requires_llm: bool,
    pub reliability: f32,
    pub strengths: &'static [&'static str],
    pub weaknesses: &'static [&'static str],
    pub min_request_interval: Option<Duration>,
}

pub fn engine_descriptors() -> Vec<EngineDescriptor> {
    vec![
        EngineDescriptor {
            name: "wikipedia",
            requires_api_key: false,
            api_key_env: None,
            requires_llm: false,
            reliability: 0.9,
            strengths: &["encyclopedic facts", "general knowledge", "definitions"],
            weaknesses: &["breaking news", "niche technical detail"],
            min_request_interval: None,
        },
        EngineDescriptor {
            name: "arxiv",
            requires_api_key: false,
            api_key_env: None,
            requires_llm: false,
            reliability: 0.85,
            strengths: &["academic papers", "scientific preprints", "citations"],
            weaknesses: &["non-academic topics", "news"],
            min_request_interval: None,
        },
        EngineDescriptor {
            name: "pubmed",
            requires_api_key: false,
            api_key_env: Some("NCBI_API_KEY"),
            requires_llm: false,
            reliability: 0.88,
            strengths: &["biomedical literature", "clinical studies", "health"],
            weaknesses: &["non-medical topics"],
            min_request_interval: None,
        },
        EngineDescriptor {
            name: "searxng",
            requires_api_key: false,
            api_key_env: Some("SEARXNG_INSTANCE"),
            requires_llm: false,
            reliability: 0.7,
            strengths: &["general web", "privacy-respecting", "broad coverage"],
            weaknesses: &["instance availability", "rate limits"],
            min_request_interval: Some(Duration::from_secs(1)),
        },
        EngineDescriptor {
            name: "github",
            requires_api_key: true,
            api_key_env: Some("GITHUB_API_KEY"),
            requires_llm: false,
            reliability: 0.8,
            strengths: &["source code", "issues", "software projects"],
            weaknesses: &["non-technical topics"],
            min_request_interval: None,
        },
        EngineDescriptor {
            name: "serpapi",
            requires_api_key: true,
            api_key_env: Some("SERP_API_KEY"),
            requires_llm: false,
            reliability: 0.85,
            strengths: &["general web", "fresh results", "broad coverage"],
            weaknesses: &["cost per query"],
            min_request_interval: None,
        },
        EngineDescriptor {
            name: "google_pse",
            requires_api_key: true,
            api_key_env: Some("GOOGLE_PSE_API_KEY"),
            requires_llm: false,
            reliability: 0.85,
            strengths: &["general web", "site-restricted search"],
            weaknesses: &["daily quota limits"],
            min_request_interval: None,
        },
        EngineDescriptor {
            name: "brave",
            requires_api_key: true,
            api_key_env: Some("BRAVE_API_KEY"),
            requires_llm: false,
            reliability: 0.8,
            strengths: &["general web", "privacy-respecting"],
            weaknesses: &["smaller index than majors"],
            min_request_interval: None,
        },
        EngineDescriptor {
            name: "wayback",
            requires_api_key: false,
            api_key_env: None,
            requires_llm: false,
            reliability: 0.75,
            strengths: &["historical snapshots", "dead-link recovery"],
            weaknesses: &["not current", "partial coverage"],
            min_request_interval: None,
        },
        EngineDescriptor {
            name: "local_collection",
            requires_api_key: false,
            api_key_env: None,
            requires_llm: false,
            reliability: 0.6,
            strengths: &["private documents", "offline corpora"],
            weaknesses: &["no web coverage"],
            min_request_interval: None,
        },
    ]
}

/// Process-wide, read-only-after-init table mapping engine names to descriptors, and
/// the factory that constructs a concrete [`SearchEngine`] from a name.
pub struct EngineRegistry {
    descriptors: HashMap<&'static str, EngineDescriptor>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self {
            descriptors: engine_descriptors().into_iter().map(|d| (d.name, d)).collect(),
        }
    }

    pub fn describe(&self, name: &str) -> Option<&EngineDescriptor> {
        self.descriptors.get(name)
    }

    pub fn available(&self, use_api_key_services: bool) -> Vec<&EngineDescriptor> {
        self.descriptors
            .values()
            .filter(|d| {
                !d.requires_api_key
                    || (use_api_key_services
                        && d.api_key_env
                            .map(|var| std::env::var(var).is_ok())
                            .unwrap_or(false))
            })
            .collect()
    }

    /// `getAvailableSearchEngines() -> map[name -> description]` (spec.md §6).
    pub fn available_descriptions(&self, use_api_key_services: bool) -> HashMap<String, String> {
        self.available(use_api_key_services)
            .into_iter()
            .map(|d| {
                (
                    d.name.to_string(),
                    format!("strengths: {:?}; weaknesses: {:?}", d.strengths, d.weaknesses),
                )
            })
            .collect()
    }

    /// Constructs a concrete engine. Checks the required API key env var first
    /// (unless `use_api_key_services` is false, matching the original's toggle to run
    /// fully offline/keyless), injects the LLM when `requires_llm`, and rejects
    /// unknown names.
    pub fn create(
        &self,
        name: &str,
        ctx: EngineContext,
        use_api_key_services: bool,
    ) -> Result<Box<dyn SearchEngine>, super::error::ResearchError> {
        if name == "auto" {
            return Ok(Box::new(engines::MetaSearchEngine::new(self, ctx, use_api_key_services)));
        }
        let descriptor = self
            .describe(name)
            .ok_or_else(|| super::error::ResearchError::NoSearchEngineAvailable)?;
        if descriptor.requires_api_key && use_api_key_services {
            let var = descriptor.api_key_env.unwrap_or_default();
            if std::env::var(var).is_err() {
                return Err(super::error::ResearchError::NoSearchEngineAvailable);
            }
        }
        engines::build(descriptor.name, ctx)
    }
}

impl Default for EngineRegistry {
    fn default() -> Self {
        Self::new()
    }
}
