//! C2 — `ResearchLlmClient`: a thin, research-shaped facade over `Brain`/`LlmProvider`.
//!
//! Every other component talks to the LLM only through `invoke(prompt) -> Response`,
//! never touching `Brain` or `LlmProvider` directly. This keeps the rest of the engine
//! oblivious to retries, token accounting, and provider selection.

use crate::brain::{Brain, LlmProvider};
use crate::error::LlmError;
use std::sync::Arc;
use tokio::sync::Mutex;

/// The result of one `invoke` call: post-processed text (think-tags stripped).
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
}

/// One token-usage sample, handed to a registered hook after every `invoke`.
#[derive(Debug, Clone)]
pub struct TokenUsageSample {
    pub research_id: uuid::Uuid,
    pub provider: String,
    pub model: String,
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
}

/// A deterministic stand-in used when no provider is configured/reachable
/// (`LDR_USE_FALLBACK_LLM`), matching `MockLlmProvider`'s shape closely enough to
/// share its construction style.
pub fn fallback_response_for(prompt_kind: &str) -> String {
    format!(
        "[fallback-llm] unable to reach a language model; no output was generated for: {}",
        prompt_kind
    )
}

/// Strips `<think>...</think>` blocks (dot-matches-newline) emitted by some reasoning
/// models before their final answer.
pub fn strip_think_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    loop {
        match rest.find("<think>") {
            Some(start) => {
                out.push_str(&rest[..start]);
                match rest[start..].find("</think>") {
                    Some(end_rel) => {
                        let end = start + end_rel + "</think>".len();
                        rest = &rest[end..];
                    }
                    None => {
                        rest = "";
                        break;
                    }
                }
            }
            None => {
                out.push_str(rest);
                break;
            }
        }
    }
    out
}

pub struct ResearchLlmClient {
    brain: Mutex<Brain>,
    research_id: uuid::Uuid,
    provider_name: String,
    usage_hook: Option<Arc<dyn Fn(TokenUsageSample) + Send + Sync>>,
}

impl ResearchLlmClient {
    pub fn new(provider: Arc<dyn LlmProvider>, provider_name: impl Into<String>, research_id: uuid::Uuid) -> Self {
        Self {
            brain: Mutex::new(Brain::new(
                provider,
                "You are a research assistant. Answer precisely and follow the exact output format requested.",
            )),
            research_id,
            provider_name: provider_name.into(),
            usage_hook: None,
        }
    }

    pub fn with_usage_hook(mut self, hook: Arc<dyn Fn(TokenUsageSample) + Send + Sync>) -> Self {
        self.usage_hook = Some(hook);
        self
    }

    /// Invoke the LLM with a single user-role prompt. Degrades on provider failure by
    /// returning the error to the caller — per spec.md §4.3/§4.4, callers of this
    /// method (citation handler, question generator) are responsible for degrading
    /// gracefully, not this client.
    pub async fn invoke(&self, prompt: &str) -> Result<LlmResponse, LlmError> {
        let conversation = vec![crate::types::Message::user(prompt)];
        let mut brain = self.brain.lock().await;
        let response = brain.think_with_retry(&conversation, None, 2).await?;
        let raw = response.message.content.as_text().unwrap_or_default();
        let content = strip_think_tags(raw);

        if let Some(hook) = &self.usage_hook {
            hook(TokenUsageSample {
                research_id: self.research_id,
                provider: self.provider_name.clone(),
                model: response.model.clone(),
                prompt_tokens: response.usage.input_tokens,
                completion_tokens: response.usage.output_tokens,
            });
        }

        Ok(LlmResponse { content })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::MockLlmProvider;

    #[test]
    fn strip_think_tags_removes_single_block() {
        let text = "before <think>internal reasoning</think> after";
        assert_eq!(strip_think_tags(text), "before  after");
    }

    #[test]
    fn strip_think_tags_removes_multiple_blocks() {
        let text = "<think>a</think>keep1<think>b</think>keep2";
        assert_eq!(strip_think_tags(text), "keep1keep2");
    }

    #[test]
    fn strip_think_tags_is_noop_without_tags() {
        assert_eq!(strip_think_tags("plain text"), "plain text");
    }

    #[tokio::test]
    async fn invoke_returns_stripped_content_and_fires_usage_hook() {
        let provider = Arc::new(MockLlmProvider::with_response(
            "<think>reasoning</think>[1] the answer",
        ));
        let samples: Arc<Mutex<Vec<TokenUsageSample>>> = Arc::new(Mutex::new(Vec::new()));
        let samples_clone = samples.clone();
        let client = ResearchLlmClient::new(provider, "mock", uuid::Uuid::new_v4()).with_usage_hook(
            Arc::new(move |s| {
                let samples = samples_clone.clone();
                tokio::spawn(async move {
                    samples.lock().await.push(s);
                });
            }),
        );
        let resp = client.invoke("what is the capital of France?").await.unwrap();
        assert_eq!(resp.content, "[1] the answer");
    }
}
