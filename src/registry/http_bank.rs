use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::model::Problem;
use crate::registry::source::{RemoteProblemSource, SourceError};

const DEFAULT_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BankItem {
    #[serde(default)]
    validated: bool,
    #[serde(flatten)]
    problem: Problem,
}

/// Remote bank of pre-validated problems.
///
/// `GET {base_url}/problems?skill=<id>&difficulty=<n>` returning a JSON array;
/// the first validated item wins.
#[derive(Clone)]
pub struct HttpProblemBank {
    base_url: String,
    client: reqwest::Client,
}

impl HttpProblemBank {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(DEFAULT_TIMEOUT_MS))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            base_url: base_url.into().trim().trim_end_matches('/').to_string(),
            client,
        }
    }

    fn url_for(&self, skill_id: &str, difficulty: u8) -> String {
        format!(
            "{}/problems?skill={}&difficulty={}",
            self.base_url,
            urlencoding::encode(skill_id),
            difficulty
        )
    }
}

fn first_validated(items: Vec<BankItem>) -> Option<Problem> {
    items
        .into_iter()
        .find(|item| item.validated)
        .map(|item| item.problem)
}

#[async_trait]
impl RemoteProblemSource for HttpProblemBank {
    fn name(&self) -> &'static str {
        "problem-bank"
    }

    async fn fetch(&self, skill_id: &str, difficulty: u8) -> Result<Option<Problem>, SourceError> {
        if self.base_url.is_empty() {
            return Err(SourceError::NotConfigured("PROBLEM_BANK_URL"));
        }

        let resp = self.client.get(self.url_for(skill_id, difficulty)).send().await?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SourceError::HttpStatus { status, body });
        }

        let bytes = resp.bytes().await?;
        let items: Vec<BankItem> = serde_json::from_slice(&bytes)?;
        Ok(first_validated(items))
    }
}
