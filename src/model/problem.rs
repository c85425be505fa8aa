use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// How a misconception rule recognizes a wrong answer.
///
/// Serialized with a `kind` tag. Tags this build does not know about
/// deserialize to [`Trigger::Unknown`] and never match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Trigger {
    ExactAnswer {
        #[serde(deserialize_with = "string_or_number")]
        value: String,
    },
    Regex { pattern: String },
    Predicate { expr: String },
    #[serde(other)]
    Unknown,
}

impl Trigger {
    pub fn exact(value: impl Into<String>) -> Self {
        Self::ExactAnswer {
            value: value.into(),
        }
    }

    pub fn regex(pattern: impl Into<String>) -> Self {
        Self::Regex {
            pattern: pattern.into(),
        }
    }

    pub fn predicate(expr: impl Into<String>) -> Self {
        Self::Predicate { expr: expr.into() }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::ExactAnswer { .. } => "exactAnswer",
            Self::Regex { .. } => "regex",
            Self::Predicate { .. } => "predicate",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MisconceptionRule {
    pub id: String,
    pub error_tag: String,
    pub trigger: Trigger,
    #[serde(default)]
    pub hint_ladder: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl MisconceptionRule {
    pub fn new(id: impl Into<String>, error_tag: impl Into<String>, trigger: Trigger) -> Self {
        Self {
            id: id.into(),
            error_tag: error_tag.into(),
            trigger,
            hint_ladder: Vec::new(),
            explanation: None,
        }
    }

    pub fn with_hints<I, S>(mut self, hints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hint_ladder = hints.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProblemOrigin {
    Bank,
    Synthesized,
    #[default]
    Local,
}

impl ProblemOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bank => "bank",
            Self::Synthesized => "synthesized",
            Self::Local => "local",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    pub id: String,
    pub skill_id: String,
    pub difficulty: u8,
    pub prompt: String,
    #[serde(deserialize_with = "string_or_number")]
    pub answer: String,
    #[serde(default)]
    pub misconceptions: Vec<MisconceptionRule>,
    #[serde(default)]
    pub origin: ProblemOrigin,
}

impl Problem {
    /// Trimmed string comparison against the canonical answer.
    pub fn is_correct(&self, answer: &str) -> bool {
        answer.trim() == self.answer.trim()
    }
}

/// Remote content often writes numeric answers as JSON numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!(
            "expected a string or number, found {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_json_tags() {
        let json = serde_json::to_value(Trigger::exact("12")).unwrap();
        assert_eq!(json["kind"], "exactAnswer");
        assert_eq!(json["value"], "12");

        let parsed: Trigger =
            serde_json::from_str(r#"{ "kind": "regex", "pattern": "^\\d+$" }"#).unwrap();
        assert_eq!(parsed, Trigger::regex("^\\d+$"));
    }

    #[test]
    fn test_unknown_trigger_kind() {
        let parsed: Trigger =
            serde_json::from_str(r#"{ "kind": "fuzzyMatch", "value": "12" }"#).unwrap();
        assert_eq!(parsed, Trigger::Unknown);
    }

    #[test]
    fn test_is_correct_trims() {
        let problem = Problem {
            id: "p1".into(),
            skill_id: "add_single".into(),
            difficulty: 1,
            prompt: "2 + 2 = ?".into(),
            answer: "4".into(),
            misconceptions: vec![],
            origin: ProblemOrigin::Local,
        };
        assert!(problem.is_correct("  4 "));
        assert!(!problem.is_correct("5"));
    }

    #[test]
    fn test_numeric_values_become_strings() {
        let raw = r#"{
            "id": "p1", "skillId": "mul_facts", "difficulty": 2,
            "prompt": "3 x 4 = ?", "answer": 12,
            "misconceptions": [
                { "id": "m1", "errorTag": "added", "trigger": { "kind": "exactAnswer", "value": 7 } }
            ]
        }"#;
        let problem: Problem = serde_json::from_str(raw).unwrap();
        assert_eq!(problem.answer, "12");
        assert_eq!(problem.misconceptions[0].trigger, Trigger::exact("7"));
    }

    #[test]
    fn test_non_scalar_answer_rejected() {
        let raw = r#"{ "id": "p1", "skillId": "s", "difficulty": 1, "prompt": "?", "answer": [1] }"#;
        assert!(serde_json::from_str::<Problem>(raw).is_err());
    }
}
