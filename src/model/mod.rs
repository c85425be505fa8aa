//! Core data model: the static skill graph, learner snapshots, and problems.

pub mod learner;
pub mod problem;
pub mod skill_graph;

pub use learner::{
    clamp_mastery, Attempt, LearnerState, ProgressReport, SkillProgress, SkillState,
    SkillStatus, INITIAL_MASTERY, MASTERY_CEIL, MASTERY_FLOOR,
};
pub use problem::{MisconceptionRule, Problem, ProblemOrigin, Trigger};
pub use skill_graph::{Skill, SkillGraph, SkillGraphError};
