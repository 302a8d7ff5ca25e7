//! C6 — `FindingsRepository`: the per-run accumulator for findings, documents, and
//! questions-by-iteration, plus the single place that finalizes human-readable source
//! ordering/numbering (spec.md §4.6).

use super::model::{Document, Finding, QuestionsByIteration, SearchResult};

#[derive(Default)]
pub struct FindingsRepository {
    findings: Vec<Finding>,
    questions_by_iteration: QuestionsByIteration,
}

impl FindingsRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_questions(&mut self, iteration: usize, questions: Vec<String>) {
        self.questions_by_iteration
            .entry(iteration)
            .or_default()
            .extend(questions);
    }

    pub fn add_finding(&mut self, finding: Finding) {
        self.findings.push(finding);
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn questions_by_iteration(&self) -> &QuestionsByIteration {
        &self.questions_by_iteration
    }

    /// All documents across every finding, in finding order.
    pub fn all_documents(&self) -> Vec<&Document> {
        self.findings.iter().flat_map(|f| f.documents.iter()).collect()
    }

    /// All search results across every finding, de-duplicated by URL and ordered by
    /// `index` so the "all sources" section and the numbered bibliography agree.
    fn deduplicated_sources(&self) -> Vec<&SearchResult> {
        let mut seen = std::collections::HashSet::new();
        let mut sources: Vec<&SearchResult> = self
            .findings
            .iter()
            .flat_map(|f| f.search_results.iter())
            .filter(|r| seen.insert(r.link.clone()))
            .collect();
        sources.sort_by_key(|r| r.index.unwrap_or(usize::MAX));
        sources
    }

    /// Produces the single formatted-text artifact spec.md §4.6 describes: a header;
    /// questions grouped by iteration; each finding's phase/question/content/links;
    /// and a de-duplicated "all sources" section.
    pub fn format_findings(&self, query: &str) -> String {
        let mut out = String::new();
        out.push_str(&format!("# Research Findings: {query}\n\n"));

        out.push_str("## Questions by Iteration\n\n");
        let mut iterations: Vec<&usize> = self.questions_by_iteration.keys().collect();
        iterations.sort();
        for iteration in iterations {
            out.push_str(&format!("### Iteration {}\n\n", iteration + 1));
            for q in &self.questions_by_iteration[iteration] {
                out.push_str(&format!("- {q}\n"));
            }
            out.push('\n');
        }

        out.push_str("## Findings\n\n");
        for finding in &self.findings {
            out.push_str(&format!("### {} — {}\n\n", finding.phase, finding.question));
            out.push_str(&finding.content);
            out.push_str("\n\n");
            if !finding.search_results.is_empty() {
                out.push_str("Sources used:\n");
                for r in &finding.search_results {
                    let idx = r.index.map(|i| format!("[{i}] ")).unwrap_or_default();
                    out.push_str(&format!("- {idx}[{}]({})\n", r.title, r.link));
                }
                out.push('\n');
            }
        }

        let sources = self.deduplicated_sources();
        if !sources.is_empty() {
            out.push_str("## All Sources\n\n");
            for r in sources {
                let idx = r.index.map(|i| format!("[{i}] ")).unwrap_or_default();
                out.push_str(&format!("{idx}[{}]({})\n", r.title, r.link));
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(phase: &str, question: &str, content: &str, links: Vec<SearchResult>) -> Finding {
        Finding {
            phase: phase.to_string(),
            content: content.to_string(),
            question: question.to_string(),
            search_results: links,
            documents: Vec::new(),
        }
    }

    #[test]
    fn add_questions_accumulates_across_calls_for_same_iteration() {
        let mut repo = FindingsRepository::new();
        repo.add_questions(0, vec!["Q1".into()]);
        repo.add_questions(0, vec!["Q2".into()]);
        assert_eq!(repo.questions_by_iteration()[&0], vec!["Q1", "Q2"]);
    }

    #[test]
    fn format_findings_includes_header_questions_and_findings() {
        let mut repo = FindingsRepository::new();
        repo.add_questions(0, vec!["capital of France?".into()]);
        repo.add_finding(finding(
            "follow-up",
            "capital of France?",
            "Paris is the capital [1].",
            vec![SearchResult {
                title: "Paris".into(),
                link: "http://example.invalid/paris".into(),
                index: Some(1),
                ..Default::default()
            }],
        ));
        let text = repo.format_findings("capital of France");
        assert!(text.contains("# Research Findings: capital of France"));
        assert!(text.contains("capital of France?"));
        assert!(text.contains("Paris is the capital [1]."));
        assert!(text.contains("All Sources"));
    }

    #[test]
    fn deduplicated_sources_drops_repeated_urls_and_sorts_by_index() {
        let mut repo = FindingsRepository::new();
        repo.add_finding(finding(
            "follow-up",
            "q1",
            "c1",
            vec![SearchResult {
                link: "http://a".into(),
                index: Some(2),
                ..Default::default()
            }],
        ));
        repo.add_finding(finding(
            "follow-up",
            "q2",
            "c2",
            vec![
                SearchResult {
                    link: "http://b".into(),
                    index: Some(1),
                    ..Default::default()
                },
                SearchResult {
                    link: "http://a".into(),
                    index: Some(2),
                    ..Default::default()
                },
            ],
        ));
        let sources = repo.deduplicated_sources();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].link, "http://b");
        assert_eq!(sources[1].link, "http://a");
    }
}
