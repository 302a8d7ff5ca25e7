//! C8 — `ReportGenerator`: outline → per-subsection mini-research → assembled document.

use super::error::ResearchError;
use super::llm_client::ResearchLlmClient;
use super::model::{LinksOfSystem, Phase, SearchResult};
use super::run_context::RunContext;
use super::strategy::{AnalyzeResult, SearchStrategy, StrategyConfig};
use chrono::Utc;

#[derive(Debug, Clone)]
pub struct OutlineSubsection {
    pub title: String,
    pub purpose: String,
}

#[derive(Debug, Clone)]
pub struct OutlineSection {
    pub title: String,
    pub subsections: Vec<OutlineSubsection>,
}

/// Tolerant line-oriented parser for the `STRUCTURE ... END_STRUCTURE` bracketed
/// outline format (spec.md §4.8/§9: "find bracketed STRUCTURE…END_STRUCTURE").
/// A numbered line (`1. Title`) starts a new section; an indented `- Sub | purpose`
/// line attaches a subsection to the current section. Returns a single fallback
/// section when nothing parses, per the total-parser policy (spec.md §9).
pub fn parse_outline(text: &str) -> Vec<OutlineSection> {
    let body = match (text.find("STRUCTURE"), text.find("END_STRUCTURE")) {
        (Some(start), Some(end)) if end > start => {
            &text[start + "STRUCTURE".len()..end]
        }
        _ => text,
    };

    let mut sections: Vec<OutlineSection> = Vec::new();
    for raw_line in body.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(rest) = strip_numbered_prefix(line) {
            sections.push(OutlineSection {
                title: rest.trim_start_matches('[').trim_end_matches(']').trim().to_string(),
                subsections: Vec::new(),
            });
        } else if let Some(rest) = line.strip_prefix('-').or_else(|| line.strip_prefix('*')) {
            let rest = rest.trim();
            let (title, purpose) = match rest.split_once('|') {
                Some((t, p)) => (t.trim().to_string(), p.trim().to_string()),
                None => (rest.to_string(), String::new()),
            };
            if let Some(section) = sections.last_mut() {
                section.subsections.push(OutlineSubsection { title, purpose });
            }
        }
    }

    sections.retain(|s| !s.subsections.is_empty());
    if sections.is_empty() {
        return vec![fallback_outline()];
    }
    sections
}

fn fallback_outline() -> OutlineSection {
    OutlineSection {
        title: "Overview".to_string(),
        subsections: vec![OutlineSubsection {
            title: "Summary".to_string(),
            purpose: "Present the initial findings".to_string(),
        }],
    }
}

fn strip_numbered_prefix(line: &str) -> Option<&str> {
    let mut chars = line.char_indices();
    let mut digits_end = 0;
    for (i, c) in &mut chars {
        if c.is_ascii_digit() {
            digits_end = i + 1;
        } else {
            break;
        }
    }
    if digits_end == 0 {
        return None;
    }
    line[digits_end..].strip_prefix('.').map(|rest| rest.trim())
}

pub struct ReportMetadata {
    pub generated_at: chrono::DateTime<Utc>,
    pub initial_sources: usize,
    pub sections_researched: usize,
    pub searches_per_section: usize,
    pub query: String,
}

pub struct ReportResult {
    pub content: String,
    pub metadata: ReportMetadata,
}

/// Generates an outline from initial findings, then, for every subsection, runs a
/// fresh strategy invocation scoped to that subsection's focused sub-query.
pub struct ReportGenerator<'a> {
    llm: &'a ResearchLlmClient,
    config: StrategyConfig,
    run: RunContext,
}

impl<'a> ReportGenerator<'a> {
    pub fn new(llm: &'a ResearchLlmClient, config: StrategyConfig, run: RunContext) -> Self {
        Self { llm, config, run }
    }

    async fn outline(&self, query: &str, initial_findings: &str) -> Vec<OutlineSection> {
        let prompt = format!(
            "Produce a report outline for the query below, given the initial findings. \
Respond with a bracketed structure exactly in this form, numbered sections first, then \
bulleted subsections suffixed with a purpose after a pipe character:\n\n\
STRUCTURE\n1. [Section Title]\n   - Subsection Title | purpose of this subsection\nEND_STRUCTURE\n\n\
Query: {query}\n\nInitial findings:\n{initial_findings}"
        );
        match self.llm.invoke(&prompt).await {
            Ok(response) => parse_outline(&response.content),
            Err(_) => vec![fallback_outline()],
        }
    }

    /// Runs `strategy_for(config)` (constructed fresh per subsection so each call can
    /// borrow a differently-scoped engine/llm if the caller wants) against a focused
    /// sub-query, per spec.md §4.8 step 2.
    pub async fn generate(
        &self,
        query: &str,
        initial_findings: &str,
        initial_links: &[SearchResult],
        strategy_for: impl Fn(StrategyConfig, RunContext) -> Box<dyn SearchStrategy + 'a>,
    ) -> Result<ReportResult, ResearchError> {
        self.run.check_termination()?;
        let outline = self.outline(query, initial_findings).await;

        let mut seen_headers = std::collections::HashSet::new();
        let mut body = String::new();
        let mut toc = String::new();
        let mut sections_researched = 0;
        let mut all_links = LinksOfSystem::new();
        all_links.append(initial_links);

        for section in &outline {
            self.run.check_termination()?;
            if seen_headers.insert(section.title.clone()) {
                toc.push_str(&format!("- {}\n", section.title));
                body.push_str(&format!("## {}\n\n", section.title));
            }

            for subsection in &section.subsections {
                self.run.check_termination()?;
                if !seen_headers.insert(format!("{}::{}", section.title, subsection.title)) {
                    continue;
                }
                let sub_query = format!("{query} {} {} {}", section.title, subsection.title, subsection.purpose);

                let mut per_section_config = self.config.clone();
                per_section_config.max_iterations = 1;
                let strategy = strategy_for(per_section_config, self.run.clone());
                let AnalyzeResult {
                    current_knowledge,
                    all_links: section_links,
                    ..
                } = strategy.analyze(&sub_query).await.unwrap_or(AnalyzeResult::default());

                body.push_str(&format!("### {}\n\n{}\n\n", subsection.title, current_knowledge));
                all_links.append(&section_links);
                sections_researched += 1;
                self.run.emit(
                    format!("Researched subsection: {}", subsection.title),
                    None,
                    Phase::ReportGeneration,
                );
            }
        }

        let summary = format!(
            "This report synthesizes research on \"{query}\" across {sections} section(s), drawing on {sources} distinct source(s).",
            sections = outline.len(),
            sources = all_links.deduped().len(),
        );

        let mut content = String::new();
        content.push_str(&format!("# Research Report: {query}\n\n"));
        content.push_str("## Table of Contents\n\n");
        content.push_str(&toc);
        content.push_str("\n## Summary\n\n");
        content.push_str(&summary);
        content.push_str("\n\n");
        content.push_str(&body);

        content.push_str("## Sources\n\n");
        for link in all_links.deduped() {
            let idx = link.index.map(|i| format!("[{i}] ")).unwrap_or_default();
            content.push_str(&format!("{idx}[{}]({})\n", link.title, link.link));
        }

        self.run.emit("Report generation complete", Some(100), Phase::ReportComplete);

        Ok(ReportResult {
            content,
            metadata: ReportMetadata {
                generated_at: Utc::now(),
                initial_sources: initial_links.len(),
                sections_researched,
                searches_per_section: self.config.searches_per_section,
                query: query.to_string(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_outline_extracts_sections_and_subsections_with_purpose() {
        let text = "STRUCTURE\n1. [Background]\n   - History | when it started\n   - Key figures | who was involved\n2. [Impact]\n   - Economic effects | what changed\nEND_STRUCTURE\n";
        let outline = parse_outline(text);
        assert_eq!(outline.len(), 2);
        assert_eq!(outline[0].title, "Background");
        assert_eq!(outline[0].subsections.len(), 2);
        assert_eq!(outline[0].subsections[0].purpose, "when it started");
        assert_eq!(outline[1].title, "Impact");
    }

    #[test]
    fn parse_outline_tolerates_extra_whitespace() {
        let text = "STRUCTURE\n  1.   [Topic]  \n    -   Only sub   |   its purpose   \nEND_STRUCTURE";
        let outline = parse_outline(text);
        assert_eq!(outline.len(), 1);
        assert_eq!(outline[0].subsections[0].title, "Only sub");
    }

    #[test]
    fn parse_outline_falls_back_to_single_section_on_garbage() {
        let outline = parse_outline("I cannot produce that structure.");
        assert_eq!(outline.len(), 1);
        assert_eq!(outline[0].title, "Overview");
    }
}
