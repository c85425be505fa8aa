use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::model::{MisconceptionRule, Problem, Trigger};

const EXACT_CONFIDENCE: f64 = 1.0;
const REGEX_CONFIDENCE: f64 = 0.8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnosis {
    pub error_category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    pub hint_ladder: Vec<String>,
    pub confidence: f64,
}

impl Diagnosis {
    /// Hint at `level` (0-based), saturating at the last rung.
    pub fn hint(&self, level: usize) -> Option<&str> {
        let last = self.hint_ladder.len().checked_sub(1)?;
        self.hint_ladder.get(level.min(last)).map(String::as_str)
    }
}

/// First rule on `problem` whose trigger matches the trimmed answer.
pub fn evaluate(problem: &Problem, user_answer: &str) -> Option<Diagnosis> {
    evaluate_rules(&problem.misconceptions, user_answer)
}

pub fn evaluate_rules(rules: &[MisconceptionRule], user_answer: &str) -> Option<Diagnosis> {
    let answer = user_answer.trim();

    rules.iter().find_map(|rule| {
        let confidence = match_rule(rule, answer)?;
        Some(Diagnosis {
            error_category: rule.error_tag.clone(),
            explanation: rule.explanation.clone(),
            hint_ladder: rule.hint_ladder.clone(),
            confidence,
        })
    })
}

fn match_rule(rule: &MisconceptionRule, answer: &str) -> Option<f64> {
    match &rule.trigger {
        Trigger::ExactAnswer { value } => (value == answer).then_some(EXACT_CONFIDENCE),
        Trigger::Regex { pattern } => match Regex::new(pattern) {
            Ok(re) => re.is_match(answer).then_some(REGEX_CONFIDENCE),
            Err(err) => {
                warn!(rule_id = %rule.id, %pattern, error = %err, "invalid misconception regex, skipping rule");
                None
            }
        },
        Trigger::Predicate { expr } => {
            warn!(rule_id = %rule.id, %expr, "predicate triggers are not supported, skipping rule");
            None
        }
        Trigger::Unknown => None,
    }
}
