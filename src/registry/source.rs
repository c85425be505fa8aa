use std::time::Duration;

use async_trait::async_trait;
use rand::RngCore;
use thiserror::Error;

use crate::model::Problem;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source not configured: {0}")]
    NotConfigured(&'static str),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("JSON decode failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("empty response")]
    EmptyChoices,
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl SourceError {
    /// Worth retrying: connection-level failures, 408, 429 and 5xx.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request(_) | Self::Timeout(_) => true,
            Self::HttpStatus { status, .. } => {
                *status == reqwest::StatusCode::TOO_MANY_REQUESTS
                    || *status == reqwest::StatusCode::REQUEST_TIMEOUT
                    || status.is_server_error()
            }
            Self::NotConfigured(_) | Self::Json(_) | Self::EmptyChoices => false,
        }
    }
}

/// Deterministic local generator for one skill.
///
/// All randomness comes from the injected `rng`, so a seeded RNG reproduces
/// the same problem.
pub trait ProblemGenerator: Send + Sync {
    fn generate(&self, difficulty: u8, rng: &mut dyn RngCore) -> Problem;
}

impl<F> ProblemGenerator for F
where
    F: Fn(u8, &mut dyn RngCore) -> Problem + Send + Sync,
{
    fn generate(&self, difficulty: u8, rng: &mut dyn RngCore) -> Problem {
        self(difficulty, rng)
    }
}

/// Network-backed problem source. `Ok(None)` means "nothing available".
#[async_trait]
pub trait RemoteProblemSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(&self, skill_id: &str, difficulty: u8) -> Result<Option<Problem>, SourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_error(code: u16) -> SourceError {
        SourceError::HttpStatus {
            status: reqwest::StatusCode::from_u16(code).unwrap(),
            body: String::new(),
        }
    }

    #[test]
    fn test_transient_statuses() {
        assert!(status_error(429).is_transient());
        assert!(status_error(408).is_transient());
        assert!(status_error(503).is_transient());
        assert!(!status_error(400).is_transient());
        assert!(!status_error(401).is_transient());
    }

    #[test]
    fn test_decode_errors_are_final() {
        let json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(!SourceError::Json(json).is_transient());
        assert!(!SourceError::EmptyChoices.is_transient());
        assert!(!SourceError::NotConfigured("LLM_API_KEY").is_transient());
    }
}
