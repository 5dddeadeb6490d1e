//! Cross-encoder-via-chat-completions reranker: a single batched call
//! scoring every candidate 0-10, rather than one round trip per candidate.

use super::{RerankError, RerankScore, Reranker};
use std::time::Duration;

pub struct ApiReranker {
    url: String,
    model: String,
    api_key: Option<String>,
    timeout: Duration,
    temperature: f32,
    max_tokens: u32,
}

const DEFAULT_TEMPERATURE: f32 = 0.0;
const DEFAULT_MAX_TOKENS: u32 = 512;

impl ApiReranker {
    /// `endpoint` is the base URL (e.g. `"http://localhost:11434/v1"`);
    /// `/chat/completions` is appended automatically.
    pub fn new(endpoint: &str, model: &str, api_key: Option<&str>, timeout_ms: u64) -> Self {
        let base = endpoint.trim_end_matches('/');
        ApiReranker {
            url: format!("{base}/chat/completions"),
            model: model.to_string(),
            api_key: api_key.map(str::to_string),
            timeout: Duration::from_millis(timeout_ms),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    fn call_api(&self, query: &str, snippets: &[(usize, &str)]) -> Result<String, RerankError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": super::prompt::build_rerank_messages(query, snippets),
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });
        let agent = ureq::AgentBuilder::new().timeout(self.timeout).build();
        let mut request = agent.post(&self.url);
        if let Some(key) = &self.api_key {
            request = request.set("Authorization", &format!("Bearer {key}"));
        }
        let response = request.send_json(body).map_err(|e| {
            let msg = e.to_string();
            if msg.contains("timed out") {
                RerankError::Timeout
            } else {
                RerankError::Network(msg)
            }
        })?;
        let json: serde_json::Value = response
            .into_json()
            .map_err(|e| RerankError::Parse(e.to_string()))?;
        json.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(str::to_string)
            .ok_or_else(|| RerankError::Parse("unexpected response format".to_string()))
    }
}

/// Parse `"N: score"` lines back into candidate-indexed scores, normalized
/// to `[0.0, 1.0]`.
pub fn parse_rerank_response(text: &str, snippets: &[(usize, &str)]) -> Vec<RerankScore> {
    let mut scores = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        let Some((num_part, score_part)) = line.split_once(':') else {
            continue;
        };
        let (Ok(line_num), Ok(raw_score)) =
            (num_part.trim().parse::<usize>(), score_part.trim().parse::<f32>())
        else {
            continue;
        };
        if line_num >= 1 && line_num <= snippets.len() {
            let (orig_index, _) = snippets[line_num - 1];
            scores.push(RerankScore {
                index: orig_index,
                relevance_score: raw_score.clamp(0.0, 10.0) / 10.0,
            });
        }
    }
    scores
}

impl Reranker for ApiReranker {
    fn rerank(&self, query: &str, snippets: &[(usize, &str)]) -> Result<Vec<RerankScore>, RerankError> {
        let text = self.call_api(query, snippets)?;
        let scores = parse_rerank_response(&text, snippets);
        if scores.is_empty() {
            return Err(RerankError::Parse("model returned no valid scores".to_string()));
        }
        Ok(scores)
    }
}
