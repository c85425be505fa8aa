//! Adaptive learner core
//!
//! Contains:
//! - Mastery Estimator (Bayesian Knowledge Tracing)
//! - Misconception Diagnoser (trigger rules with hint ladders)
//! - Item Scheduler (prerequisite-aware learn/review selection)

pub mod diagnosis;
pub mod mastery;
pub mod scheduler;

pub use diagnosis::{evaluate, evaluate_rules, Diagnosis};
pub use mastery::{bkt_posterior, bkt_transition, MasteryEstimator};
pub use scheduler::{ItemScheduler, SchedulerError, SelectionReason, SkillChoice, SkillQueues};
