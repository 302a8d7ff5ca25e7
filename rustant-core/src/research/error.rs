//! `ResearchError` plus the `ErrorReporter`/`ErrorReportGenerator` diagnostic pipeline.
//!
//! The taxonomy and the regex pattern tables below follow a single rule: a raw error
//! message is categorized by matching against an ordered pattern table, never by
//! inspecting Rust's own type system, because most of what gets categorized here
//! originates outside this process (an engine's HTTP failure, a provider's error body).

use regex::RegexSet;
use serde::{Deserialize, Serialize};

/// Errors raised by the research engine itself (as opposed to errors *observed* from
/// an engine/provider and then categorized by `ErrorReporter`).
#[derive(Debug, thiserror::Error)]
pub enum ResearchError {
    #[error("research was terminated by request")]
    Terminated,

    #[error("no search engine available")]
    NoSearchEngineAvailable,

    #[error("another research is already in progress")]
    AlreadyRunning,

    #[error("query must not be empty")]
    EmptyQuery,

    #[error("research record not found: {id}")]
    NotFound { id: String },

    #[error("cannot delete a research that is still in progress")]
    DeleteWhileInProgress,

    #[error("database error: {message}")]
    Database { message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for ResearchError {
    fn from(e: rusqlite::Error) -> Self {
        ResearchError::Database {
            message: e.to_string(),
        }
    }
}

/// Fixed taxonomy for errors *surfaced to the user*, matched against a raw message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    ConnectionError,
    ModelError,
    SearchError,
    SynthesisError,
    FileError,
    UnknownError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// Full categorization result for one error message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorAnalysis {
    pub category: ErrorCategory,
    pub title: String,
    pub original_error: String,
    pub suggestions: Vec<String>,
    pub severity: Severity,
    pub recoverable: bool,
}

struct CategoryTable {
    category: ErrorCategory,
    patterns: RegexSet,
}

/// Categorizes raw error strings into the fixed taxonomy via an ordered regex table,
/// one `RegexSet` per category (compiled once at construction, matching the teacher's
/// precompiled-pattern-table idiom rather than compiling a `Regex` per call).
pub struct ErrorReporter {
    tables: Vec<CategoryTable>,
}

impl ErrorReporter {
    pub fn new() -> Self {
        let tables = vec![
            CategoryTable {
                category: ErrorCategory::ConnectionError,
                patterns: RegexSet::new([
                    r"(?i)connection refused",
                    r"(?i)connection.*failed",
                    r"(?i)timeout",
                    r"(?i)http error \d+",
                    r"(?i)network.*error",
                    r"(?i)post predict.*eof",
                ])
                .expect("connection_error patterns are valid"),
            },
            CategoryTable {
                category: ErrorCategory::ModelError,
                patterns: RegexSet::new([
                    r"(?i)model.*not found",
                    r"(?i)invalid.*model",
                    r"(?i)api key.*invalid",
                    r"(?i)authentication.*error",
                    r"(?i)401.*api key",
                    r"(?i)no auth credentials found",
                ])
                .expect("model_error patterns are valid"),
            },
            CategoryTable {
                category: ErrorCategory::SearchError,
                patterns: RegexSet::new([
                    r"(?i)search.*failed",
                    r"(?i)no search results",
                    r"(?i)search engine.*error",
                    r"(?i)rate limit.*exceeded",
                    r"(?i)failed to create search engine",
                    r"(?i)could not be found",
                ])
                .expect("search_error patterns are valid"),
            },
            CategoryTable {
                category: ErrorCategory::SynthesisError,
                patterns: RegexSet::new([
                    r"(?i)error.*synthesis",
                    r"(?i)failed.*generate",
                    r"(?i)synthesis.*timeout",
                ])
                .expect("synthesis_error patterns are valid"),
            },
            CategoryTable {
                category: ErrorCategory::FileError,
                patterns: RegexSet::new([
                    r"(?i)permission denied",
                    r"(?i)file.*not found",
                    r"(?i)cannot write.*file",
                    r"(?i)disk.*full",
                    r"(?i)attempt to write readonly database",
                ])
                .expect("file_error patterns are valid"),
            },
        ];
        Self { tables }
    }

    pub fn categorize(&self, error_message: &str) -> ErrorCategory {
        for table in &self.tables {
            if table.patterns.is_match(error_message) {
                return table.category;
            }
        }
        ErrorCategory::UnknownError
    }

    pub fn title(category: ErrorCategory) -> &'static str {
        match category {
            ErrorCategory::ConnectionError => "Connection Issue",
            ErrorCategory::ModelError => "LLM Service Error",
            ErrorCategory::SearchError => "Search Service Error",
            ErrorCategory::SynthesisError => "Report Generation Error",
            ErrorCategory::FileError => "File System Error",
            ErrorCategory::UnknownError => "Unexpected Error",
        }
    }

    pub fn severity(category: ErrorCategory) -> Severity {
        match category {
            ErrorCategory::ConnectionError => Severity::High,
            ErrorCategory::ModelError => Severity::High,
            ErrorCategory::SearchError => Severity::Medium,
            ErrorCategory::SynthesisError => Severity::Low,
            ErrorCategory::FileError => Severity::Medium,
            ErrorCategory::UnknownError => Severity::High,
        }
    }

    pub fn recoverable(category: ErrorCategory) -> bool {
        !matches!(category, ErrorCategory::UnknownError)
    }

    pub fn suggestions(category: ErrorCategory) -> Vec<String> {
        let raw: &[&str] = match category {
            ErrorCategory::ConnectionError => &[
                "Check if the LLM service is running",
                "Verify network connectivity",
                "Try switching to a different model provider",
            ],
            ErrorCategory::ModelError => &[
                "Verify the model name is correct",
                "Validate API keys if using external services",
                "Try switching to a different model",
            ],
            ErrorCategory::SearchError => &[
                "Check internet connectivity",
                "Try reducing the number of search results",
                "Try a different search engine if one is failing",
            ],
            ErrorCategory::SynthesisError => &[
                "The research data was collected successfully",
                "Try switching to a different model for report generation",
                "Check the partial results below",
            ],
            ErrorCategory::FileError => &[
                "Check disk space availability",
                "Verify write permissions",
                "Try changing the output directory",
            ],
            ErrorCategory::UnknownError => &[
                "Check the detailed logs below for more information",
                "Try running the research again",
                "Report this issue if it persists",
            ],
        };
        raw.iter().map(|s| s.to_string()).collect()
    }

    pub fn analyze(
        &self,
        error_message: &str,
        has_partial_results: bool,
    ) -> (ErrorAnalysis, bool) {
        let category = self.categorize(error_message);
        let analysis = ErrorAnalysis {
            category,
            title: Self::title(category).to_string(),
            original_error: error_message.to_string(),
            suggestions: Self::suggestions(category),
            severity: Self::severity(category),
            recoverable: Self::recoverable(category),
        };
        (analysis, has_partial_results)
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Partial results available at the time of failure, rendered (truncated) into the
/// diagnostic report when present.
#[derive(Debug, Clone, Default)]
pub struct PartialResults {
    pub current_knowledge: Option<String>,
    pub search_results: Vec<crate::research::model::SearchResult>,
    pub findings: Vec<crate::research::model::Finding>,
}

/// Renders a Markdown diagnostic document for a failed research run. Never panics or
/// propagates: on any internal failure it falls back to a minimal textual report so a
/// `report_path` after a failure is *guaranteed* non-empty.
pub struct ErrorReportGenerator {
    reporter: ErrorReporter,
}

impl ErrorReportGenerator {
    pub fn new() -> Self {
        Self {
            reporter: ErrorReporter::new(),
        }
    }

    pub fn generate(
        &self,
        error_message: &str,
        partial: Option<&PartialResults>,
    ) -> String {
        let has_partial = partial
            .map(|p| {
                p.current_knowledge.is_some() || !p.search_results.is_empty() || !p.findings.is_empty()
            })
            .unwrap_or(false);
        let (analysis, _) = self.reporter.analyze(error_message, has_partial);

        let mut out = String::new();
        out.push_str(&format!("# {}\n\n", analysis.title));
        out.push_str(&format!(
            "We ran into a problem while conducting this research: {}\n\n",
            analysis.original_error
        ));
        out.push_str("## What you can try\n\n");
        for s in &analysis.suggestions {
            out.push_str(&format!("- {}\n", s));
        }
        out.push_str("\n## Help\n\n");
        out.push_str("- [Documentation](https://example.invalid/docs)\n");
        out.push_str("- [Community](https://example.invalid/community)\n");
        out.push_str("- [Report an issue](https://example.invalid/issues)\n");

        if let Some(p) = partial {
            if has_partial {
                out.push_str("\n<details>\n<summary>Partial results collected before failure</summary>\n\n");
                if let Some(k) = &p.current_knowledge {
                    out.push_str(&format!("### Knowledge so far\n\n{}\n\n", k));
                }
                if !p.search_results.is_empty() {
                    out.push_str("### Search results\n\n");
                    for r in p.search_results.iter().take(5) {
                        out.push_str(&format!("- [{}]({})\n", r.title, r.link));
                    }
                    out.push('\n');
                }
                if !p.findings.is_empty() {
                    out.push_str("### Findings\n\n");
                    for f in p.findings.iter().filter(|f| f.phase != "error").take(3) {
                        let mut content = f.content.clone();
                        if content.len() > 500 {
                            content.truncate(500);
                            content.push('…');
                        }
                        out.push_str(&format!("**{}**\n\n{}\n\n", f.question, content));
                    }
                }
                out.push_str("</details>\n");
            }
        }

        if out.trim().is_empty() {
            return format!("# Unexpected Error\n\n{}\n", error_message);
        }
        out
    }
}

impl Default for ErrorReportGenerator {
    fn default() -> Self {
        Self::new()
    }
}
