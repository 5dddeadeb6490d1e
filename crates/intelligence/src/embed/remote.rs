//! `remote_A`/`remote_B` embedding providers: an HTTP call
//! to an embeddings endpoint, retried 3 times with jittered backoff before
//! the bullet is recorded "unembedded". A `ureq` agent with a global
//! timeout, bearer auth header, and JSON body/response.

use super::EmbeddingProvider;
use kg_core::{KgError, KgResult};
use std::time::Duration;

const MAX_ATTEMPTS: u32 = 3;
const BASE_BACKOFF_MS: u64 = 200;

pub struct RemoteProvider {
    provider_name: &'static str,
    model: String,
    endpoint: String,
    api_key: Option<String>,
    dim: usize,
    timeout: Duration,
}

impl RemoteProvider {
    pub fn new(provider_name: &'static str, model: &str) -> Self {
        RemoteProvider {
            provider_name,
            model: model.to_string(),
            endpoint: default_endpoint(provider_name),
            api_key: None,
            dim: 1536,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_dim(mut self, dim: usize) -> Self {
        self.dim = dim;
        self
    }

    fn call_once(&self, batch: &[String]) -> Result<Vec<Vec<f32>>, String> {
        let body = serde_json::json!({
            "model": self.model,
            "input": batch,
        });
        let agent = ureq::AgentBuilder::new().timeout(self.timeout).build();
        let mut request = agent.post(&self.endpoint);
        if let Some(key) = &self.api_key {
            request = request.set("Authorization", &format!("Bearer {key}"));
        }
        let response = request.send_json(body).map_err(|e| e.to_string())?;
        let json: serde_json::Value = response.into_json().map_err(|e| e.to_string())?;
        let data = json
            .get("data")
            .and_then(|d| d.as_array())
            .ok_or_else(|| "missing `data` array in embeddings response".to_string())?;
        data.iter()
            .map(|row| {
                row.get("embedding")
                    .and_then(|e| e.as_array())
                    .map(|arr| arr.iter().filter_map(|v| v.as_f64()).map(|v| v as f32).collect())
                    .ok_or_else(|| "missing `embedding` field in response row".to_string())
            })
            .collect()
    }
}

impl EmbeddingProvider for RemoteProvider {
    fn embed(&self, batch: &[String]) -> KgResult<Vec<Vec<f32>>> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }
        let mut last_err = String::new();
        for attempt in 0..MAX_ATTEMPTS {
            match self.call_once(batch) {
                Ok(vectors) => return Ok(vectors),
                Err(e) => {
                    last_err = e;
                    tracing::warn!(
                        provider = self.provider_name,
                        attempt = attempt + 1,
                        error = %last_err,
                        "embedding call failed, retrying"
                    );
                    if attempt + 1 < MAX_ATTEMPTS {
                        let jitter = rand::random::<u64>() % BASE_BACKOFF_MS;
                        let backoff = BASE_BACKOFF_MS * 2u64.pow(attempt) + jitter;
                        std::thread::sleep(Duration::from_millis(backoff));
                    }
                }
            }
        }
        Err(KgError::provider_transient(self.provider_name, last_err))
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn model_id(&self) -> String {
        format!("{}:{}", self.provider_name, self.model)
    }
}

fn default_endpoint(provider_name: &str) -> String {
    match provider_name {
        "remote_a" => "https://api.openai.com/v1/embeddings".to_string(),
        _ => "https://api.example.com/v1/embeddings".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_id_includes_provider_and_model() {
        let p = RemoteProvider::new("remote_a", "text-embedding-3-small");
        assert_eq!(p.model_id(), "remote_a:text-embedding-3-small");
    }

    #[test]
    fn empty_batch_short_circuits() {
        let p = RemoteProvider::new("remote_a", "m").with_endpoint("http://127.0.0.1:1");
        assert_eq!(p.embed(&[]).unwrap().len(), 0);
    }

    #[test]
    fn unreachable_endpoint_exhausts_retries_and_reports_transient() {
        let p = RemoteProvider::new("remote_b", "m").with_endpoint("http://127.0.0.1:1/embeddings");
        let err = p.embed(&["hello".to_string()]).unwrap_err();
        assert!(matches!(err, KgError::ProviderTransient { .. }));
    }
}
