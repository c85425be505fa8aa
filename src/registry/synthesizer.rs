//! On-demand problem synthesis through an OpenAI-compatible chat endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::warn;

use crate::model::{MisconceptionRule, Problem, ProblemOrigin};
use crate::registry::source::{RemoteProblemSource, SourceError};

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_API_ENDPOINT: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT_MS: u64 = 60_000;
const MAX_RETRIES: usize = 3;
const BASE_BACKOFF_MS: u64 = 200;

const SYSTEM_PROMPT: &str = "You write short practice problems for a math tutor. \
Reply with a single JSON object: {\"prompt\": string, \"answer\": string, \
\"misconceptions\": [{\"id\": string, \"errorTag\": string, \
\"trigger\": {\"kind\": \"exactAnswer\", \"value\": string}, \"hintLadder\": [string]}]}. \
The answer must be the exact canonical final answer.";

#[derive(Debug, Clone)]
pub struct SynthesisConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub api_endpoint: String,
    pub timeout: Duration,
}

impl SynthesisConfig {
    pub fn from_env() -> Self {
        let api_key = env_string("LLM_API_KEY");
        let model = env_string("LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let api_endpoint = normalize_endpoint(
            env_string("LLM_API_ENDPOINT")
                .or_else(|| env_string("LLM_BASE_URL"))
                .unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_string()),
        );
        let timeout = Duration::from_millis(env_u64("LLM_TIMEOUT").unwrap_or(DEFAULT_TIMEOUT_MS));

        Self {
            api_key,
            model,
            api_endpoint,
            timeout,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizedProblem {
    prompt: String,
    #[serde(default)]
    answer: serde_json::Value,
    /// Decoded one by one so a malformed rule only drops that rule.
    #[serde(default)]
    misconceptions: Vec<serde_json::Value>,
}

#[derive(Clone)]
pub struct ProblemSynthesizer {
    config: SynthesisConfig,
    client: reqwest::Client,
}

impl ProblemSynthesizer {
    pub fn new(config: SynthesisConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { config, client }
    }

    pub fn from_env() -> Self {
        Self::new(SynthesisConfig::from_env())
    }

    pub fn is_available(&self) -> bool {
        self.config
            .api_key
            .as_deref()
            .is_some_and(|v| !v.trim().is_empty())
            && !self.config.model.trim().is_empty()
            && !self.config.api_endpoint.trim().is_empty()
    }

    async fn complete(&self, user: &str) -> Result<String, SourceError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .ok_or(SourceError::NotConfigured("LLM_API_KEY"))?;

        let url = format!(
            "{}/chat/completions",
            self.config.api_endpoint.trim_end_matches('/')
        );
        let messages = [
            ChatMessage {
                role: "system".into(),
                content: SYSTEM_PROMPT.into(),
            },
            ChatMessage {
                role: "user".into(),
                content: user.into(),
            },
        ];
        let payload = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "stream": false
        });

        let response = self.post_with_retry(&url, api_key, &payload).await?;
        response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(SourceError::EmptyChoices)
    }

    async fn post_with_retry(
        &self,
        url: &str,
        api_key: &str,
        payload: &serde_json::Value,
    ) -> Result<ChatResponse, SourceError> {
        let mut retry = 0;
        loop {
            match self.post_once(url, api_key, payload).await {
                Err(err) if retry < MAX_RETRIES && err.is_transient() => {
                    warn!(retry, error = %err, "synthesis request failed, retrying");
                    sleep(backoff(retry)).await;
                    retry += 1;
                }
                result => return result,
            }
        }
    }

    async fn post_once(
        &self,
        url: &str,
        api_key: &str,
        payload: &serde_json::Value,
    ) -> Result<ChatResponse, SourceError> {
        let resp = self
            .client
            .post(url)
            .bearer_auth(api_key)
            .json(payload)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SourceError::HttpStatus { status, body });
        }
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl RemoteProblemSource for ProblemSynthesizer {
    fn name(&self) -> &'static str {
        "synthesizer"
    }

    async fn fetch(&self, skill_id: &str, difficulty: u8) -> Result<Option<Problem>, SourceError> {
        if !self.is_available() {
            return Err(SourceError::NotConfigured("LLM_API_KEY"));
        }
        let request = format!(
            "Skill: {skill_id}\nDifficulty (1 easiest, 10 hardest): {difficulty}\nWrite one problem."
        );
        let reply = self.complete(&request).await?;
        parse_reply(&reply, skill_id, difficulty)
    }
}

/// Extracts the JSON object from a model reply, tolerating code fences or
/// surrounding prose. A reply without a usable answer is `Ok(None)`.
fn parse_reply(reply: &str, skill_id: &str, difficulty: u8) -> Result<Option<Problem>, SourceError> {
    let (Some(start), Some(end)) = (reply.find('{'), reply.rfind('}')) else {
        return Ok(None);
    };
    if end <= start {
        return Ok(None);
    }

    let parsed: SynthesizedProblem = serde_json::from_str(&reply[start..=end])?;
    let answer = match parsed.answer {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        _ => return Ok(None),
    };
    if answer.is_empty() || parsed.prompt.trim().is_empty() {
        return Ok(None);
    }

    let misconceptions = parsed
        .misconceptions
        .into_iter()
        .filter_map(|raw| match serde_json::from_value::<MisconceptionRule>(raw) {
            Ok(rule) => Some(rule),
            Err(err) => {
                warn!(skill_id, error = %err, "dropping malformed synthesized misconception rule");
                None
            }
        })
        .collect();

    Ok(Some(Problem {
        id: uuid::Uuid::new_v4().to_string(),
        skill_id: skill_id.to_string(),
        difficulty,
        prompt: parsed.prompt.trim().to_string(),
        answer,
        misconceptions,
        origin: ProblemOrigin::Synthesized,
    }))
}

fn backoff(retry: usize) -> Duration {
    Duration::from_millis(BASE_BACKOFF_MS * (1 << retry))
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_u64(key: &str) -> Option<u64> {
    env_string(key)?.parse().ok()
}

fn normalize_endpoint(endpoint: String) -> String {
    let trimmed = endpoint.trim().trim_end_matches('/');
    if trimmed.ends_with("/v1") || trimmed.contains("/v1/") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/v1")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Trigger;

    #[test]
    fn test_normalize_endpoint() {
        assert_eq!(
            normalize_endpoint("https://llm.example/".into()),
            "https://llm.example/v1"
        );
        assert_eq!(
            normalize_endpoint("https://llm.example/v1".into()),
            "https://llm.example/v1"
        );
    }

    #[test]
    fn test_parse_fenced_reply() {
        let reply = "Here you go:\n```json\n{\"prompt\": \"6 x 7 = ?\", \"answer\": 42, \
            \"misconceptions\": [{\"id\": \"m1\", \"errorTag\": \"added_instead\", \
            \"trigger\": {\"kind\": \"exactAnswer\", \"value\": \"13\"}, \"hintLadder\": [\"x means groups of\"]}]}\n```";
        let problem = parse_reply(reply, "mul_facts", 3).unwrap().unwrap();
        assert_eq!(problem.answer, "42");
        assert_eq!(problem.skill_id, "mul_facts");
        assert_eq!(problem.misconceptions[0].trigger, Trigger::exact("13"));
    }

    #[test]
    fn test_parse_reply_without_json() {
        assert!(parse_reply("sorry, I can't", "s", 1).unwrap().is_none());
    }

    #[test]
    fn test_parse_reply_missing_answer() {
        let reply = r#"{"prompt": "2 + 2", "answer": null}"#;
        assert!(parse_reply(reply, "s", 1).unwrap().is_none());
    }

    #[test]
    fn test_unavailable_without_key() {
        let synth = ProblemSynthesizer::new(SynthesisConfig {
            api_key: None,
            model: DEFAULT_MODEL.into(),
            api_endpoint: DEFAULT_API_ENDPOINT.into(),
            timeout: Duration::from_millis(100),
        });
        assert!(!synth.is_available());
    }

    #[test]
    fn test_parse_numeric_trigger_value() {
        let reply = r#"{"prompt": "5 - 2 = ?", "answer": 3, "misconceptions": [
            {"id": "m1", "errorTag": "added_instead", "trigger": {"kind": "exactAnswer", "value": 7}}
        ]}"#;
        let problem = parse_reply(reply, "sub_single", 1).unwrap().unwrap();
        assert_eq!(problem.answer, "3");
        assert_eq!(problem.misconceptions.len(), 1);
        assert_eq!(problem.misconceptions[0].trigger, Trigger::exact("7"));
    }

    #[test]
    fn test_malformed_rule_dropped_problem_kept() {
        let reply = r#"{"prompt": "5 - 2 = ?", "answer": "3", "misconceptions": [
            {"id": "m1", "trigger": {"kind": "exactAnswer", "value": "7"}},
            {"id": "m2", "errorTag": "sign_confusion", "trigger": {"kind": "exactAnswer", "value": "-3"}}
        ]}"#;
        let problem = parse_reply(reply, "sub_single", 1).unwrap().unwrap();
        assert_eq!(problem.misconceptions.len(), 1);
        assert_eq!(problem.misconceptions[0].error_tag, "sign_confusion");
    }
}
