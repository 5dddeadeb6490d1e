//! Reranker error type: network failure, unparseable response, or timeout.

use std::fmt;

#[derive(Debug)]
pub enum RerankError {
    Network(String),
    Parse(String),
    Timeout,
}

impl fmt::Display for RerankError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RerankError::Network(msg) => write!(f, "network error: {msg}"),
            RerankError::Parse(msg) => write!(f, "parse error: {msg}"),
            RerankError::Timeout => write!(f, "rerank request timed out"),
        }
    }
}

impl std::error::Error for RerankError {}
