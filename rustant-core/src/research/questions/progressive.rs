use super::QuestionGenerator;
use crate::research::llm_client::ResearchLlmClient;
use crate::research::model::QuestionsByIteration;
use async_trait::async_trait;
use std::collections::HashSet;
use tokio::sync::Mutex;

/// Category bucket an extracted entity was classified into (spec.md §4.4:
/// "browse-comp (progressive)").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityCategory {
    Temporal,
    Numerical,
    Names,
    Locations,
    Descriptors,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedEntity {
    pub category: EntityCategory,
    pub value: String,
}

const LOCATION_MARKERS: &[&str] = &["in", "at", "near", "from", "city", "country", "region"];
const DESCRIPTOR_MARKERS: &[&str] = &[
    "known for", "that is", "which is", "famous for", "described as", "called",
];

/// Heuristic entity extractor: no NER model is assumed to be available, so this
/// mirrors the original's lightweight regex/keyword pass rather than a learned one.
fn extract_entities(query: &str) -> Vec<ExtractedEntity> {
    let mut out = Vec::new();
    let lower = query.to_lowercase();

    // Temporal: bare years and decades ("1990s", "19th century").
    let mut chars = query.char_indices().peekable();
    let mut current = String::new();
    let mut start = 0usize;
    while let Some((i, c)) = chars.next() {
        if c.is_ascii_digit() {
            if current.is_empty() {
                start = i;
            }
            current.push(c);
        } else {
            if current.len() >= 4 {
                let trailing_s = query[i..].starts_with('s');
                let value = if trailing_s {
                    format!("{}s", current)
                } else {
                    current.clone()
                };
                out.push(ExtractedEntity {
                    category: EntityCategory::Temporal,
                    value,
                });
            } else if !current.is_empty() {
                out.push(ExtractedEntity {
                    category: EntityCategory::Numerical,
                    value: current.clone(),
                });
            }
            current.clear();
        }
        let _ = start;
    }
    if current.len() >= 4 {
        out.push(ExtractedEntity {
            category: EntityCategory::Temporal,
            value: current,
        });
    } else if !current.is_empty() {
        out.push(ExtractedEntity {
            category: EntityCategory::Numerical,
            value: current,
        });
    }

    // Names: capitalized multi-word spans.
    let words: Vec<&str> = query.split_whitespace().collect();
    let mut i = 0;
    while i < words.len() {
        let w = words[i].trim_matches(|c: char| !c.is_alphanumeric());
        if w.chars().next().map(|c| c.is_uppercase()).unwrap_or(false) && w.len() > 1 {
            let mut span = vec![w];
            let mut j = i + 1;
            while j < words.len() {
                let next = words[j].trim_matches(|c: char| !c.is_alphanumeric());
                if next.chars().next().map(|c| c.is_uppercase()).unwrap_or(false) {
                    span.push(next);
                    j += 1;
                } else {
                    break;
                }
            }
            let value = span.join(" ");
            let preceding = if i > 0 { words[i - 1].to_lowercase() } else { String::new() };
            let category = if LOCATION_MARKERS.contains(&preceding.as_str()) {
                EntityCategory::Locations
            } else {
                EntityCategory::Names
            };
            out.push(ExtractedEntity { category, value });
            i = j;
        } else {
            i += 1;
        }
    }

    // Descriptors: text following a known marker phrase up to the next clause end.
    for marker in DESCRIPTOR_MARKERS {
        if let Some(pos) = lower.find(marker) {
            let rest = &query[pos + marker.len()..];
            let end = rest.find(['.', ',', '?']).unwrap_or(rest.len().min(60));
            let value = rest[..end].trim();
            if !value.is_empty() {
                out.push(ExtractedEntity {
                    category: EntityCategory::Descriptors,
                    value: value.to_string(),
                });
            }
        }
    }

    out
}

/// Expands a temporal entity representing a decade ("1990s") into the ten individual
/// years within it; leaves bare years untouched.
fn expand_temporal(entity: &ExtractedEntity) -> Vec<String> {
    if let Some(decade) = entity.value.strip_suffix('s') {
        if let Ok(base) = decade.parse::<u32>() {
            return (0..10).map(|d| (base + d).to_string()).collect();
        }
    }
    vec![entity.value.clone()]
}

/// Progressively constrained entity-combination query generator for benchmark-style
/// "identify the entity matching these constraints" questions (spec.md §4.4).
pub struct ProgressiveQuestionGenerator<'a> {
    #[allow(dead_code)]
    llm: &'a ResearchLlmClient,
    searched: Mutex<HashSet<String>>,
}

impl<'a> ProgressiveQuestionGenerator<'a> {
    pub fn new(llm: &'a ResearchLlmClient) -> Self {
        Self {
            llm,
            searched: Mutex::new(HashSet::new()),
        }
    }

    /// Entities extracted from the original query, category-grouped, with temporal
    /// ranges expanded. Exposed for the focused-iteration strategy's progress tracker
    /// (spec.md §4.7.5: typed accessor for extracted-entity state).
    pub fn extract(query: &str) -> Vec<ExtractedEntity> {
        let mut out = Vec::new();
        for e in extract_entities(query) {
            if e.category == EntityCategory::Temporal {
                for year in expand_temporal(&e) {
                    out.push(ExtractedEntity {
                        category: EntityCategory::Temporal,
                        value: year,
                    });
                }
            } else {
                out.push(e);
            }
        }
        out
    }
}

#[async_trait]
impl<'a> QuestionGenerator for ProgressiveQuestionGenerator<'a> {
    async fn generate(
        &self,
        _current_knowledge: &str,
        query: &str,
        n: usize,
        questions_by_iteration: &QuestionsByIteration,
    ) -> Vec<String> {
        let entities = Self::extract(query);
        let mut candidates: Vec<String> = Vec::new();

        if questions_by_iteration.is_empty() {
            // Broad, single-entity queries first.
            for e in &entities {
                candidates.push(e.value.clone());
            }
            if candidates.is_empty() {
                candidates.push(query.to_string());
            }
        } else {
            // Progressively constrained: combine pairs of entities from distinct
            // categories that have not yet been searched together.
            for a in 0..entities.len() {
                for b in (a + 1)..entities.len() {
                    if entities[a].category != entities[b].category {
                        candidates.push(format!("{} {}", entities[a].value, entities[b].value));
                    }
                }
            }
            if entities.len() >= 3 {
                candidates.push(
                    entities
                        .iter()
                        .map(|e| e.value.as_str())
                        .collect::<Vec<_>>()
                        .join(" "),
                );
            }
            if candidates.is_empty() {
                candidates.push(query.to_string());
            }
        }

        let mut searched = self.searched.lock().await;
        let mut out = Vec::new();
        for c in candidates {
            if searched.insert(c.clone()) {
                out.push(c);
            }
            if out.len() >= n {
                break;
            }
        }
        if out.is_empty() {
            out.push(query.to_string());
        }
        out
    }
}
