//! Concrete search engines (spec.md §4.1: "external, interface only"). Each honors
//! its descriptor's `requires_api_key`/`api_key_env` and implements the two-phase
//! contract at interface/stub depth: build the request, call the public API, and
//! pull title/link/snippet out of a loosely-typed JSON (or text) response defensively
//! rather than modeling the provider's full wire schema.

use super::{EngineContext, EngineRegistry, SearchEngine};
use crate::research::model::SearchResult;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::Mutex;

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .user_agent("Rustant-DeepResearch/1.0")
        .build()
        .unwrap_or_default()
}

fn text_field(v: &serde_json::Value, keys: &[&str]) -> String {
    for k in keys {
        if let Some(s) = v.get(k).and_then(|x| x.as_str()) {
            return s.to_string();
        }
    }
    String::new()
}

pub fn build(
    name: &str,
    ctx: EngineContext,
) -> Result<Box<dyn SearchEngine>, crate::research::error::ResearchError> {
    let engine: Box<dyn SearchEngine> = match name {
        "wikipedia" => Box::new(WikipediaEngine { ctx }),
        "arxiv" => Box::new(ArxivEngine { ctx }),
        "pubmed" => Box::new(PubmedEngine { ctx }),
        "searxng" => Box::new(SearxngEngine::new(ctx)),
        "github" => Box::new(GithubEngine { ctx }),
        "serpapi" => Box::new(SerpApiEngine { ctx }),
        "google_pse" => Box::new(GooglePseEngine { ctx }),
        "brave" => Box::new(BraveEngine { ctx }),
        "wayback" => Box::new(WaybackEngine { ctx }),
        "local_collection" => Box::new(LocalCollectionEngine { ctx }),
        _ => return Err(crate::research::error::ResearchError::NoSearchEngineAvailable),
    };
    Ok(engine)
}

macro_rules! simple_engine {
    ($ty:ident, $name:literal) => {
        pub struct $ty {
            pub ctx: EngineContext,
        }
        impl $ty {
            #[allow(dead_code)]
            pub fn engine_name() -> &'static str {
                $name
            }
        }
    };
}

simple_engine!(WikipediaEngine, "wikipedia");

#[async_trait]
impl SearchEngine for WikipediaEngine {
    fn name(&self) -> &str {
        "wikipedia"
    }
    fn context(&self) -> &EngineContext {
        &self.ctx
    }

    async fn get_previews(&self, query: &str) -> Vec<SearchResult> {
        let url = format!(
            "https://en.wikipedia.org/w/api.php?action=query&list=search&format=json&srlimit={}&srsearch={}",
            self.ctx.max_results,
            urlencoding::encode(query)
        );
        let Ok(resp) = http_client().get(&url).send().await else {
            return Vec::new();
        };
        let Ok(body) = resp.json::<serde_json::Value>().await else {
            return Vec::new();
        };
        body["query"]["search"]
            .as_array()
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(|item| {
                let title = text_field(&item, &["title"]);
                let snippet = text_field(&item, &["snippet"])
                    .replace("<span class=\"searchmatch\">", "")
                    .replace("</span>", "");
                SearchResult {
                    title: title.clone(),
                    link: format!(
                        "https://en.wikipedia.org/wiki/{}",
                        title.replace(' ', "_")
                    ),
                    snippet,
                    ..Default::default()
                }
            })
            .collect()
    }

    async fn get_full_content(&self, items: Vec<SearchResult>) -> Vec<SearchResult> {
        fetch_full_pages(items).await
    }
}

simple_engine!(ArxivEngine, "arxiv");

#[async_trait]
impl SearchEngine for ArxivEngine {
    fn name(&self) -> &str {
        "arxiv"
    }
    fn context(&self) -> &EngineContext {
        &self.ctx
    }

    async fn get_previews(&self, query: &str) -> Vec<SearchResult> {
        let url = format!(
            "http://export.arxiv.org/api/query?search_query=all:{}&max_results={}",
            urlencoding::encode(query),
            self.ctx.max_results
        );
        let Ok(resp) = http_client().get(&url).send().await else {
            return Vec::new();
        };
        let Ok(body) = resp.text().await else {
            return Vec::new();
        };
        parse_arxiv_atom(&body)
    }
}

/// Minimal Atom-feed field extraction (no XML parser in the dependency table; this
/// is interface/stub depth, matching spec.md §1's "concrete third-party API clients
/// ... interfaces only").
fn parse_arxiv_atom(body: &str) -> Vec<SearchResult> {
    body.split("<entry>")
        .skip(1)
        .map(|entry| {
            let title = extract_tag(entry, "title");
            let id = extract_tag(entry, "id");
            let summary = extract_tag(entry, "summary");
            SearchResult {
                title,
                link: id,
                snippet: summary.chars().take(400).collect(),
                ..Default::default()
            }
        })
        .collect()
}

fn extract_tag(text: &str, tag: &str) -> String {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let Some(start) = text.find(&open) else {
        return String::new();
    };
    let Some(end) = text[start..].find(&close) else {
        return String::new();
    };
    text[start + open.len()..start + end].trim().to_string()
}

simple_engine!(PubmedEngine, "pubmed");

#[async_trait]
impl SearchEngine for PubmedEngine {
    fn name(&self) -> &str {
        "pubmed"
    }
    fn context(&self) -> &EngineContext {
        &self.ctx
    }

    async fn get_previews(&self, query: &str) -> Vec<SearchResult> {
        let key_param = std::env::var("NCBI_API_KEY")
            .map(|k| format!("&api_key={k}"))
            .unwrap_or_default();
        let search_url = format!(
            "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi?db=pubmed&retmode=json&retmax={}&term={}{}",
            self.ctx.max_results,
            urlencoding::encode(query),
            key_param
        );
        let Ok(resp) = http_client().get(&search_url).send().await else {
            return Vec::new();
        };
        let Ok(body) = resp.json::<serde_json::Value>().await else {
            return Vec::new();
        };
        body["esearchresult"]["idlist"]
            .as_array()
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter_map(|id| id.as_str().map(|s| s.to_string()))
            .map(|id| SearchResult {
                title: format!("PMID {id}"),
                link: format!("https://pubmed.ncbi.nlm.nih.gov/{id}/"),
                snippet: String::new(),
                ..Default::default()
            })
            .collect()
    }

    async fn get_full_content(&self, items: Vec<SearchResult>) -> Vec<SearchResult> {
        fetch_full_pages(items).await
    }
}

pub struct SearxngEngine {
    ctx: EngineContext,
    last_request: Mutex<Option<tokio::time::Instant>>,
    min_interval: Duration,
}

impl SearxngEngine {
    pub fn new(ctx: EngineContext) -> Self {
        let min_interval = std::env::var("SEARXNG_DELAY")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_millis(500));
        Self {
            ctx,
            last_request: Mutex::new(None),
            min_interval,
        }
    }

    /// Sleeps, if necessary, to satisfy the configured per-instance minimum
    /// inter-request delay (spec.md §5: "Rate limiting").
    async fn throttle(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(tokio::time::Instant::now());
    }
}

#[async_trait]
impl SearchEngine for SearxngEngine {
    fn name(&self) -> &str {
        "searxng"
    }
    fn context(&self) -> &EngineContext {
        &self.ctx
    }

    async fn get_previews(&self, query: &str) -> Vec<SearchResult> {
        let Ok(instance) = std::env::var("SEARXNG_INSTANCE") else {
            return Vec::new();
        };
        self.throttle().await;
        let url = format!(
            "{}/search?q={}&format=json",
            instance.trim_end_matches('/'),
            urlencoding::encode(query)
        );
        let Ok(resp) = http_client().get(&url).send().await else {
            return Vec::new();
        };
        let Ok(body) = resp.json::<serde_json::Value>().await else {
            return Vec::new();
        };
        body["results"]
            .as_array()
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .take(self.ctx.max_results)
            .map(|item| SearchResult {
                title: text_field(&item, &["title"]),
                link: text_field(&item, &["url"]),
                snippet: text_field(&item, &["content"]),
                ..Default::default()
            })
            .collect()
    }
}

simple_engine!(GithubEngine, "github");

#[async_trait]
impl SearchEngine for GithubEngine {
    fn name(&self) -> &str {
        "github"
    }
    fn context(&self) -> &EngineContext {
        &self.ctx
    }

    async fn get_previews(&self, query: &str) -> Vec<SearchResult> {
        let Ok(token) = std::env::var("GITHUB_API_KEY") else {
            return Vec::new();
        };
        let url = format!(
            "https://api.github.com/search/repositories?q={}&per_page={}",
            urlencoding::encode(query),
            self.ctx.max_results
        );
        let Ok(resp) = http_client()
            .get(&url)
            .bearer_auth(token)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
        else {
            return Vec::new();
        };
        let Ok(body) = resp.json::<serde_json::Value>().await else {
            return Vec::new();
        };
        body["items"]
            .as_array()
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(|item| SearchResult {
                title: text_field(&item, &["full_name"]),
                link: text_field(&item, &["html_url"]),
                snippet: text_field(&item, &["description"]),
                ..Default::default()
            })
            .collect()
    }
}

simple_engine!(SerpApiEngine, "serpapi");

#[async_trait]
impl SearchEngine for SerpApiEngine {
    fn name(&self) -> &str {
        "serpapi"
    }
    fn context(&self) -> &EngineContext {
        &self.ctx
    }

    async fn get_previews(&self, query: &str) -> Vec<SearchResult> {
        let Ok(key) = std::env::var("SERP_API_KEY") else {
            return Vec::new();
        };
        let url = format!(
            "https://serpapi.com/search.json?engine=google&q={}&api_key={}",
            urlencoding::encode(query),
            key
        );
        let Ok(resp) = http_client().get(&url).send().await else {
            return Vec::new();
        };
        let Ok(body) = resp.json::<serde_json::Value>().await else {
            return Vec::new();
        };
        body["organic_results"]
            .as_array()
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .take(self.ctx.max_results)
            .map(|item| SearchResult {
                title: text_field(&item, &["title"]),
                link: text_field(&item, &["link"]),
                snippet: text_field(&item, &["snippet"]),
                ..Default::default()
            })
            .collect()
    }
}

simple_engine!(GooglePseEngine, "google_pse");

#[async_trait]
impl SearchEngine for GooglePseEngine {
    fn name(&self) -> &str {
        "google_pse"
    }
    fn context(&self) -> &EngineContext {
        &self.ctx
    }

    async fn get_previews(&self, query: &str) -> Vec<SearchResult> {
        let (Ok(key), Ok(cx)) = (
            std::env::var("GOOGLE_PSE_API_KEY"),
            std::env::var("GOOGLE_PSE_ENGINE_ID"),
        ) else {
            return Vec::new();
        };
        let url = format!(
            "https://www.googleapis.com/customsearch/v1?key={}&cx={}&q={}",
            key,
            cx,
            urlencoding::encode(query)
        );
        let Ok(resp) = http_client().get(&url).send().await else {
            return Vec::new();
        };
        let Ok(body) = resp.json::<serde_json::Value>().await else {
            return Vec::new();
        };
        body["items"]
            .as_array()
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .take(self.ctx.max_results)
            .map(|item| SearchResult {
                title: text_field(&item, &["title"]),
                link: text_field(&item, &["link"]),
                snippet: text_field(&item, &["snippet"]),
                ..Default::default()
            })
            .collect()
    }
}

simple_engine!(BraveEngine, "brave");

#[async_trait]
impl SearchEngine for BraveEngine {
    fn name(&self) -> &str {
        "brave"
    }
    fn context(&self) -> &EngineContext {
        &self.ctx
    }

    async fn get_previews(&self, query: &str) -> Vec<SearchResult> {
        let Ok(token) = std::env::var("BRAVE_API_KEY") else {
            return Vec::new();
        };
        let url = format!(
            "https://api.search.brave.com/res/v1/web/search?q={}&count={}",
            urlencoding::encode(query),
            self.ctx.max_results
        );
        let Ok(resp) = http_client()
            .get(&url)
            .header("X-Subscription-Token", token)
            .header("Accept", "application/json")
            .send()
            .await
        else {
            return Vec::new();
        };
        let Ok(body) = resp.json::<serde_json::Value>().await else {
            return Vec::new();
        };
        body["web"]["results"]
            .as_array()
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(|item| SearchResult {
                title: text_field(&item, &["title"]),
                link: text_field(&item, &["url"]),
                snippet: text_field(&item, &["description"]),
                ..Default::default()
            })
            .collect()
    }
}

simple_engine!(WaybackEngine, "wayback");

#[async_trait]
impl SearchEngine for WaybackEngine {
    fn name(&self) -> &str {
        "wayback"
    }
    fn context(&self) -> &EngineContext {
        &self.ctx
    }

    /// Wayback is a snapshot lookup rather than a free-text search engine: the
    /// "query" is treated as a URL whose most recent archived snapshot is fetched.
    async fn get_previews(&self, query: &str) -> Vec<SearchResult> {
        let url = format!(
            "https://archive.org/wayback/available?url={}",
            urlencoding::encode(query)
        );
        let Ok(resp) = http_client().get(&url).send().await else {
            return Vec::new();
        };
        let Ok(body) = resp.json::<serde_json::Value>().await else {
            return Vec::new();
        };
        let snapshot = &body["archived_snapshots"]["closest"];
        if !snapshot.is_object() {
            return Vec::new();
        }
        vec![SearchResult {
            title: format!("Archived snapshot of {query}"),
            link: text_field(snapshot, &["url"]),
            snippet: format!("Captured {}", text_field(snapshot, &["timestamp"])),
            ..Default::default()
        }]
    }
}

simple_engine!(LocalCollectionEngine, "local_collection");

#[async_trait]
impl SearchEngine for LocalCollectionEngine {
    fn name(&self) -> &str {
        "local_collection"
    }
    fn context(&self) -> &EngineContext {
        &self.ctx
    }

    /// Local-document collection indexing is explicitly out of scope (spec.md §1);
    /// this stub satisfies the `SearchEngine` contract for `analyzeDocuments` callers
    /// that request a named collection with no corresponding indexer wired up.
    async fn get_previews(&self, _query: &str) -> Vec<SearchResult> {
        Vec::new()
    }
}

/// Fetches page bodies for a batch of previews and strips the crudest HTML boilerplate,
/// matching the original's `FullSearchResults` wrapper (spec.md §4.1).
async fn fetch_full_pages(items: Vec<SearchResult>) -> Vec<SearchResult> {
    let client = http_client();
    let mut out = Vec::with_capacity(items.len());
    for mut item in items {
        if item.link.is_empty() {
            out.push(item);
            continue;
        }
        match client.get(&item.link).send().await {
            Ok(resp) => match resp.text().await {
                Ok(html) => {
                    item.full_content = Some(strip_html(&html).chars().take(5000).collect());
                }
                Err(_) => {}
            },
            Err(_) => {}
        }
        out.push(item);
    }
    out
}

/// Crude boilerplate stripper: drops `<script>`/`<style>` blocks and all remaining
/// tags, collapsing whitespace. Not a full readability pass — stub depth per
/// spec.md §1 ("full-content fetching may be delegated to a wrapper that ... strips
/// boilerplate").
fn strip_html(html: &str) -> String {
    let mut text = html.to_string();
    for tag in ["script", "style"] {
        loop {
            let open = format!("<{tag}");
            let Some(start) = text.find(&open) else { break };
            let close_tag = format!("</{tag}>");
            let Some(close_rel) = text[start..].find(&close_tag) else { break };
            let end = start + close_rel + close_tag.len();
            text.replace_range(start..end, "");
        }
    }
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Meta/`auto` engine: asks the LLM which concrete engines best suit the query, tries
/// them in that order, and falls back to a fixed engine if every attempt is empty
/// (spec.md §4.1: "Meta engine (`auto`)").
pub struct MetaSearchEngine {
    ctx: EngineContext,
    descriptors: Vec<super::EngineDescriptor>,
    use_api_key_services: bool,
}

impl MetaSearchEngine {
    pub fn new(registry: &EngineRegistry, ctx: EngineContext, use_api_key_services: bool) -> Self {
        let descriptors = registry
            .available(use_api_key_services)
            .into_iter()
            .cloned()
            .collect();
        Self {
            ctx,
            descriptors,
            use_api_key_services,
        }
    }

    fn describe_engines(&self) -> String {
        self.descriptors
            .iter()
            .map(|d| {
                let strengths: Vec<&str> = d.strengths.iter().take(3).copied().collect();
                let weaknesses: Vec<&str> = d.weaknesses.iter().take(2).copied().collect();
                format!(
                    "{}: strengths={:?}, weaknesses={:?}, reliability={:.2}",
                    d.name, strengths, weaknesses, d.reliability
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn reliability_order(&self) -> Vec<String> {
        let mut names: Vec<&super::EngineDescriptor> = self.descriptors.iter().collect();
        names.sort_by(|a, b| b.reliability.partial_cmp(&a.reliability).unwrap());
        names.into_iter().map(|d| d.name.to_string()).collect()
    }

    async fn choose_order(&self, query: &str) -> Vec<String> {
        let Some(llm) = self.ctx.llm.as_ref() else {
            return self.reliability_order();
        };
        let prompt = format!(
            "Given this research query, choose which search engines would find the best \
results, ordered from most to least suitable. Return ONLY a comma-separated list of engine \
names from this set, nothing else.\n\nQuery: {query}\n\nEngines:\n{}",
            self.describe_engines()
        );
        match llm.invoke(&prompt).await {
            Ok(response) => {
                let known: std::collections::HashSet<&str> =
                    self.descriptors.iter().map(|d| d.name).collect();
                let chosen: Vec<String> = response
                    .content
                    .split(',')
                    .map(|s| s.trim().to_lowercase())
                    .filter(|s| known.contains(s.as_str()))
                    .collect();
                if chosen.is_empty() {
                    self.reliability_order()
                } else {
                    chosen
                }
            }
            Err(_) => self.reliability_order(),
        }
    }
}

#[async_trait]
impl SearchEngine for MetaSearchEngine {
    fn name(&self) -> &str {
        "auto"
    }
    fn context(&self) -> &EngineContext {
        &self.ctx
    }

    async fn get_previews(&self, query: &str) -> Vec<SearchResult> {
        self.run(query).await
    }

    /// Overrides the default two-phase `run`: the meta engine's "phases" are which
    /// concrete engine to delegate to, not preview/full-content within one engine
    /// (each delegate already runs its own two-phase contract internally).
    async fn run(&self, query: &str) -> Vec<SearchResult> {
        let order = self.choose_order(query).await;
        for name in order.into_iter().take(self.ctx.max_engines_to_try.max(1)) {
            let Ok(engine) = build(&name, self.ctx.clone()) else {
                continue;
            };
            let results = engine.run(query).await;
            if !results.is_empty() {
                return results;
            }
        }
        // Fixed fallback per spec.md §4.1.
        if let Ok(fallback) = build("wikipedia", self.ctx.clone()) {
            return fallback.run(query).await;
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_arxiv_atom_extracts_title_id_and_summary() {
        let body = "<feed><entry><title>A Paper</title><id>http://arxiv.org/abs/1</id>\
<summary>An abstract.</summary></entry></feed>";
        let results = parse_arxiv_atom(body);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "A Paper");
        assert_eq!(results[0].link, "http://arxiv.org/abs/1");
    }

    #[test]
    fn parse_arxiv_atom_handles_multiple_entries() {
        let body = "<entry><title>One</title><id>u1</id><summary>s1</summary></entry>\
<entry><title>Two</title><id>u2</id><summary>s2</summary></entry>";
        let results = parse_arxiv_atom(body);
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].title, "Two");
    }

    #[test]
    fn strip_html_drops_tags_and_script_blocks() {
        let html = "<html><head><script>var x = 1;</script></head><body><p>Hello <b>World</b></p></body></html>";
        let text = strip_html(html);
        assert_eq!(text, "Hello World");
    }

    #[tokio::test]
    async fn local_collection_engine_always_returns_empty() {
        let engine = LocalCollectionEngine {
            ctx: EngineContext::default(),
        };
        assert!(engine.get_previews("anything").await.is_empty());
    }

    #[tokio::test]
    async fn github_engine_returns_empty_without_api_key() {
        std::env::remove_var("GITHUB_API_KEY");
        let engine = GithubEngine {
            ctx: EngineContext::default(),
        };
        assert!(engine.get_previews("rust").await.is_empty());
    }

    #[test]
    fn meta_engine_reliability_order_is_descending() {
        let registry = EngineRegistry::new();
        let meta = MetaSearchEngine::new(&registry, EngineContext::default(), false);
        let order = meta.reliability_order();
        let wikipedia_pos = order.iter().position(|n| n == "wikipedia").unwrap();
        let wayback_pos = order.iter().position(|n| n == "wayback").unwrap();
        assert!(wikipedia_pos < wayback_pos);
    }
}
