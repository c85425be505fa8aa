//! Misconception rules as they arrive embedded in a serialized problem.

use kt_tutor::engine::evaluate;
use kt_tutor::model::{Problem, Trigger};

const PROBLEM_JSON: &str = r#"{
    "id": "bank-17",
    "skillId": "add_carry",
    "difficulty": 4,
    "prompt": "38 + 45 = ?",
    "answer": "83",
    "origin": "bank",
    "misconceptions": [
        { "id": "m0", "errorTag": "future_rule", "trigger": { "kind": "levenshtein", "value": "73", "distance": 1 } },
        { "id": "m1", "errorTag": "broken_pattern", "trigger": { "kind": "regex", "pattern": "[0-9" } },
        { "id": "m2", "errorTag": "pending_predicate", "trigger": { "kind": "predicate", "expr": "answer < 80" } },
        {
            "id": "m3",
            "errorTag": "forgot_carry",
            "trigger": { "kind": "exactAnswer", "value": "73" },
            "hintLadder": ["Start with the ones column.", "8 + 5 = 13: write 3, carry 1."],
            "explanation": "The carried ten was dropped."
        },
        { "id": "m4", "errorTag": "column_sums", "trigger": { "kind": "regex", "pattern": "^7\\d{2}$" } }
    ]
}"#;

fn problem() -> Problem {
    serde_json::from_str(PROBLEM_JSON).unwrap()
}

#[test]
fn unsupported_rules_are_skipped_in_order() {
    let problem = problem();
    assert_eq!(problem.misconceptions[0].trigger, Trigger::Unknown);

    let diagnosis = evaluate(&problem, " 73 ").unwrap();
    assert_eq!(diagnosis.error_category, "forgot_carry");
    assert_eq!(diagnosis.explanation.as_deref(), Some("The carried ten was dropped."));
    assert_eq!(diagnosis.hint(0), Some("Start with the ones column."));
}

#[test]
fn later_regex_rule_still_checked() {
    let diagnosis = evaluate(&problem(), "713").unwrap();
    assert_eq!(diagnosis.error_category, "column_sums");
    assert!(diagnosis.hint_ladder.is_empty());
}

#[test]
fn unmatched_wrong_answer_yields_none() {
    assert!(evaluate(&problem(), "84").is_none());
    assert!(evaluate(&problem(), "").is_none());
}
