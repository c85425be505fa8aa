//! Mastery Estimator - Bayesian Knowledge Tracing
//!
//! Evidence step (Bayes' rule on the observed correctness):
//! - correct:   P' = P(1-S) / [P(1-S) + (1-P)G]
//! - incorrect: P' = PS / [PS + (1-P)(1-G)]
//!
//! Transition step: P_new = P' + (1 - P') × T
//!
//! The result is clamped to [0.01, 0.99] so the next update's denominators
//! stay non-zero.

use std::sync::Arc;

use crate::config::BktParams;
use crate::model::{clamp_mastery, Attempt, LearnerState, SkillGraph, SkillState, INITIAL_MASTERY};

const EPSILON: f64 = 1e-12;

pub fn bkt_posterior(prior: f64, is_correct: bool, params: &BktParams) -> f64 {
    let p = prior.clamp(0.0, 1.0);
    let (s, g) = (params.slip, params.guess);

    let (numerator, denominator) = if is_correct {
        let known = p * (1.0 - s);
        (known, known + (1.0 - p) * g)
    } else {
        let known = p * s;
        (known, known + (1.0 - p) * (1.0 - g))
    };

    if denominator <= EPSILON {
        return p;
    }
    numerator / denominator
}

pub fn bkt_transition(posterior: f64, learning_rate: f64) -> f64 {
    posterior + (1.0 - posterior) * learning_rate
}

#[derive(Debug, Clone)]
pub struct MasteryEstimator {
    graph: Arc<SkillGraph>,
    defaults: BktParams,
}

impl MasteryEstimator {
    pub fn new(graph: Arc<SkillGraph>, defaults: BktParams) -> Self {
        Self { graph, defaults }
    }

    pub fn graph(&self) -> &SkillGraph {
        &self.graph
    }

    pub fn params_for(&self, skill_id: &str) -> BktParams {
        let overrides = self
            .graph
            .get(skill_id)
            .and_then(|s| s.mastery_params.as_ref());
        self.defaults.resolve(overrides)
    }

    /// Every skill in the graph starts at exactly [`INITIAL_MASTERY`].
    pub fn initial_state(&self, user_id: &str) -> LearnerState {
        let mut state = LearnerState::new(user_id);
        for id in self.graph.skill_ids() {
            state
                .skill_state
                .insert(id.to_string(), Arc::new(SkillState::default()));
        }
        state
    }

    pub fn update(&self, state: &LearnerState, attempt: &Attempt) -> LearnerState {
        let params = self.params_for(&attempt.skill_id);
        let previous = state.skill_or_default(&attempt.skill_id);

        let posterior = bkt_posterior(previous.mastery_prob, attempt.is_correct, &params);
        let mastery_prob = clamp_mastery(bkt_transition(posterior, params.learning_rate));

        let mut misconceptions = previous.misconceptions;
        misconceptions.extend(attempt.error_tags.iter().cloned());

        let next = SkillState {
            mastery_prob,
            stability: previous.stability,
            last_practiced: Some(attempt.timestamp),
            misconceptions,
        };

        tracing::debug!(
            user_id = %state.user_id,
            skill_id = %attempt.skill_id,
            correct = attempt.is_correct,
            prior = previous.mastery_prob,
            mastery = mastery_prob,
            "mastery updated"
        );

        state.with_skill(attempt.skill_id.clone(), next)
    }

    pub fn update_all<'a, I>(&self, state: &LearnerState, attempts: I) -> LearnerState
    where
        I: IntoIterator<Item = &'a Attempt>,
    {
        attempts
            .into_iter()
            .fold(state.clone(), |acc, attempt| self.update(&acc, attempt))
    }
}

impl Default for MasteryEstimator {
    fn default() -> Self {
        Self::new(Arc::new(SkillGraph::builtin()), BktParams::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SkillParamOverrides;
    use crate::model::{Skill, MASTERY_CEIL, MASTERY_FLOOR};

    fn attempt(skill_id: &str, is_correct: bool, ts: i64) -> Attempt {
        Attempt {
            user_id: "u1".into(),
            item_id: format!("{skill_id}-{ts}"),
            skill_id: skill_id.into(),
            timestamp: ts,
            is_correct,
            time_taken_ms: 4000,
            attempts_count: 1,
            hints_used: 0,
            error_tags: vec![],
        }
    }

    #[test]
    fn test_worked_example_correct_from_default_prior() {
        let estimator = MasteryEstimator::default();
        let state = estimator.initial_state("u1");
        let next = estimator.update(&state, &attempt("add_single", true, 1000));
        let mastery = next.mastery("add_single");
        assert!((mastery - 0.4).abs() < 0.05, "mastery {mastery}");
    }

    #[test]
    fn test_incorrect_decreases_from_half() {
        let estimator = MasteryEstimator::default();
        let state = LearnerState::new("u1").with_mastery("add_single", 0.5);
        let next = estimator.update(&state, &attempt("add_single", false, 1000));
        assert!(next.mastery("add_single") < 0.5);
    }

    #[test]
    fn test_posterior_monotonic_before_clamp() {
        let params = BktParams::default();
        for prior in [0.05, 0.3, 0.5, 0.8, 0.95] {
            assert!(bkt_posterior(prior, true, &params) > prior);
            assert!(bkt_posterior(prior, false, &params) < prior);
        }
    }

    #[test]
    fn test_result_clamped_at_both_ends() {
        let estimator = MasteryEstimator::default();
        let mut state = estimator.initial_state("u1");
        for ts in 0..50 {
            state = estimator.update(&state, &attempt("add_single", true, ts));
        }
        assert!(state.mastery("add_single") <= MASTERY_CEIL);

        for ts in 50..100 {
            state = estimator.update(&state, &attempt("add_single", false, ts));
        }
        assert!(state.mastery("add_single") >= MASTERY_FLOOR);
    }

    #[test]
    fn test_unknown_skill_uses_defaults() {
        let estimator = MasteryEstimator::default();
        let state = LearnerState::new("u1");
        let next = estimator.update(&state, &attempt("not_in_graph", true, 5));
        let expected = clamp_mastery(bkt_transition(
            bkt_posterior(INITIAL_MASTERY, true, &BktParams::default()),
            0.1,
        ));
        assert!((next.mastery("not_in_graph") - expected).abs() < 1e-12);
        assert_eq!(next.skill("not_in_graph").unwrap().last_practiced, Some(5));
    }

    #[test]
    fn test_skill_override_changes_update() {
        let graph = SkillGraph::new(
            vec![
                Skill::new("easy"),
                Skill::new("guessy").with_params(SkillParamOverrides {
                    guess: Some(0.6),
                    ..Default::default()
                }),
            ],
            "easy",
        )
        .unwrap();
        let estimator = MasteryEstimator::new(Arc::new(graph), BktParams::default());
        let state = estimator.initial_state("u1");

        let a = estimator.update(&state, &attempt("easy", true, 1));
        let b = estimator.update(&state, &attempt("guessy", true, 1));
        assert!(b.mastery("guessy") < a.mastery("easy"));
    }

    #[test]
    fn test_misconceptions_accumulate_without_duplicates() {
        let estimator = MasteryEstimator::default();
        let state = estimator.initial_state("u1");

        let mut first = attempt("add_carry", false, 1);
        first.error_tags = vec!["forgot_carry".into()];
        let mut second = attempt("add_carry", false, 2);
        second.error_tags = vec!["forgot_carry".into(), "digit_concat".into()];

        let next = estimator.update_all(&state, [&first, &second]);
        let tags: Vec<&str> = next
            .skill("add_carry")
            .unwrap()
            .misconceptions
            .iter()
            .map(String::as_str)
            .collect();
        assert_eq!(tags, vec!["digit_concat", "forgot_carry"]);
    }

    #[test]
    fn test_stability_passes_through() {
        let estimator = MasteryEstimator::default();
        let state = LearnerState::new("u1").with_skill(
            "add_single",
            SkillState {
                stability: 3.5,
                ..SkillState::default()
            },
        );
        let next = estimator.update(&state, &attempt("add_single", true, 9));
        assert_eq!(next.skill("add_single").unwrap().stability, 3.5);
    }

    #[test]
    fn test_input_snapshot_untouched_and_others_shared() {
        let estimator = MasteryEstimator::default();
        let state = estimator.initial_state("u1");
        let before = state.clone();
        let next = estimator.update(&state, &attempt("add_single", true, 1));

        assert_eq!(state, before);
        assert!(Arc::ptr_eq(
            &state.skill_state["mul_facts"],
            &next.skill_state["mul_facts"]
        ));
        assert!(!Arc::ptr_eq(
            &state.skill_state["add_single"],
            &next.skill_state["add_single"]
        ));
    }

    #[test]
    fn test_update_is_deterministic() {
        let estimator = MasteryEstimator::default();
        let state = estimator.initial_state("u1");
        let a = attempt("sub_single", true, 42);
        assert_eq!(estimator.update(&state, &a), estimator.update(&state, &a));
    }
}
