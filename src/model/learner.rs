use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::model::skill_graph::SkillGraph;

pub const INITIAL_MASTERY: f64 = 0.1;
pub const MASTERY_FLOOR: f64 = 0.01;
pub const MASTERY_CEIL: f64 = 0.99;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillState {
    pub mastery_prob: f64,
    /// Reserved for forgetting-curve decay; carried through updates untouched.
    #[serde(default)]
    pub stability: f64,
    #[serde(default)]
    pub last_practiced: Option<i64>,
    #[serde(default)]
    pub misconceptions: BTreeSet<String>,
}

impl Default for SkillState {
    fn default() -> Self {
        Self {
            mastery_prob: INITIAL_MASTERY,
            stability: 0.0,
            last_practiced: None,
            misconceptions: BTreeSet::new(),
        }
    }
}

impl SkillState {
    pub fn with_mastery(mastery_prob: f64) -> Self {
        Self {
            mastery_prob: clamp_mastery(mastery_prob),
            ..Self::default()
        }
    }
}

/// Keeps a probability away from the absorbing values 0 and 1.
pub fn clamp_mastery(p: f64) -> f64 {
    if p.is_nan() {
        return INITIAL_MASTERY;
    }
    p.clamp(MASTERY_FLOOR, MASTERY_CEIL)
}

/// Persistent per-learner snapshot.
///
/// Entries are `Arc`-shared, so a new snapshot produced by
/// [`LearnerState::with_skill`] reuses every skill state it did not touch and
/// older snapshots remain valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnerState {
    pub user_id: String,
    #[serde(default)]
    pub skill_state: BTreeMap<String, Arc<SkillState>>,
}

impl LearnerState {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            skill_state: BTreeMap::new(),
        }
    }

    pub fn skill(&self, skill_id: &str) -> Option<&SkillState> {
        self.skill_state.get(skill_id).map(Arc::as_ref)
    }

    pub fn skill_or_default(&self, skill_id: &str) -> SkillState {
        self.skill(skill_id).cloned().unwrap_or_default()
    }

    pub fn mastery(&self, skill_id: &str) -> f64 {
        self.skill(skill_id)
            .map(|s| s.mastery_prob)
            .unwrap_or(INITIAL_MASTERY)
    }

    pub fn with_skill(&self, skill_id: impl Into<String>, state: SkillState) -> LearnerState {
        let mut skill_state = self.skill_state.clone();
        skill_state.insert(skill_id.into(), Arc::new(state));
        LearnerState {
            user_id: self.user_id.clone(),
            skill_state,
        }
    }

    pub fn with_mastery(&self, skill_id: impl Into<String>, mastery_prob: f64) -> LearnerState {
        let skill_id = skill_id.into();
        let mut state = self.skill_or_default(&skill_id);
        state.mastery_prob = clamp_mastery(mastery_prob);
        self.with_skill(skill_id, state)
    }

    pub fn progress(&self, graph: &SkillGraph, threshold: f64) -> ProgressReport {
        let skills = graph
            .skill_ids()
            .map(|id| {
                let mastery = self.mastery(id);
                let unlocked = graph.prerequisites(id).all(|p| self.mastery(p) >= threshold);
                let status = if !unlocked {
                    SkillStatus::Locked
                } else if mastery >= threshold {
                    SkillStatus::Mastered
                } else {
                    SkillStatus::Learning
                };
                SkillProgress {
                    skill_id: id.to_string(),
                    mastery,
                    status,
                    misconceptions: self
                        .skill(id)
                        .map(|s| s.misconceptions.iter().cloned().collect())
                        .unwrap_or_default(),
                }
            })
            .collect();

        ProgressReport {
            user_id: self.user_id.clone(),
            skills,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillStatus {
    Locked,
    Learning,
    Mastered,
}

impl SkillStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Locked => "locked",
            Self::Learning => "learning",
            Self::Mastered => "mastered",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillProgress {
    pub skill_id: String,
    pub mastery: f64,
    pub status: SkillStatus,
    pub misconceptions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
    pub user_id: String,
    pub skills: Vec<SkillProgress>,
}

impl ProgressReport {
    pub fn mastered_count(&self) -> usize {
        self.skills
            .iter()
            .filter(|s| s.status == SkillStatus::Mastered)
            .count()
    }
}

/// One submitted answer. Not validated by the estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    pub user_id: String,
    pub item_id: String,
    pub skill_id: String,
    pub timestamp: i64,
    pub is_correct: bool,
    #[serde(default)]
    pub time_taken_ms: u64,
    #[serde(default = "default_attempts_count")]
    pub attempts_count: u32,
    #[serde(default)]
    pub hints_used: u32,
    #[serde(default)]
    pub error_tags: Vec<String>,
}

fn default_attempts_count() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_skill_defaults() {
        let state = LearnerState::new("u1");
        assert_eq!(state.mastery("never_seen"), INITIAL_MASTERY);
        let skill = state.skill_or_default("never_seen");
        assert!(skill.misconceptions.is_empty());
        assert!(skill.last_practiced.is_none());
    }

    #[test]
    fn test_with_skill_shares_untouched_entries() {
        let base = LearnerState::new("u1")
            .with_mastery("a", 0.4)
            .with_mastery("b", 0.6);
        let next = base.with_mastery("a", 0.9);

        assert!(Arc::ptr_eq(&base.skill_state["b"], &next.skill_state["b"]));
        assert!(!Arc::ptr_eq(&base.skill_state["a"], &next.skill_state["a"]));
        assert_eq!(base.mastery("a"), 0.4);
        assert_eq!(next.mastery("a"), 0.9);
    }

    #[test]
    fn test_clamp_mastery() {
        assert_eq!(clamp_mastery(0.0), MASTERY_FLOOR);
        assert_eq!(clamp_mastery(1.0), MASTERY_CEIL);
        assert_eq!(clamp_mastery(f64::NAN), INITIAL_MASTERY);
        assert_eq!(clamp_mastery(0.5), 0.5);
    }

    #[test]
    fn test_progress_statuses() {
        let graph = SkillGraph::builtin();
        let state = LearnerState::new("u1").with_mastery("add_single", 0.95);
        let report = state.progress(&graph, 0.85);

        let status = |id: &str| {
            report
                .skills
                .iter()
                .find(|s| s.skill_id == id)
                .map(|s| s.status)
                .unwrap()
        };
        assert_eq!(status("add_single"), SkillStatus::Mastered);
        assert_eq!(status("add_carry"), SkillStatus::Learning);
        assert_eq!(status("mul_facts"), SkillStatus::Locked);
        assert_eq!(report.mastered_count(), 1);
    }

    #[test]
    fn test_snapshot_json_shape() {
        let state = LearnerState::new("u1").with_mastery("add_single", 0.5);
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["skillState"]["add_single"]["masteryProb"], 0.5);
        let back: LearnerState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }
}
