//! Prerequisite-aware item scheduler.
//!
//! Queue membership is recomputed from the learner snapshot on every call;
//! the only state carried between calls is the RNG.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::config::SchedulerConfig;
use crate::model::{LearnerState, Problem, SkillGraph};
use crate::registry::{GeneratorRegistry, RegistryError};

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillQueues {
    /// Unlocked, mastery below threshold.
    pub learning: Vec<String>,
    /// Unlocked, mastery at or above threshold.
    pub review: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionReason {
    Learning,
    Review,
    Fallback,
}

impl SelectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Learning => "learning",
            Self::Review => "review",
            Self::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillChoice {
    pub skill_id: String,
    pub reason: SelectionReason,
    pub mastery: f64,
    pub difficulty: u8,
}

pub struct ItemScheduler<R = StdRng> {
    graph: Arc<SkillGraph>,
    registry: Arc<GeneratorRegistry>,
    config: SchedulerConfig,
    rng: R,
}

impl ItemScheduler<StdRng> {
    pub fn new(graph: Arc<SkillGraph>, registry: Arc<GeneratorRegistry>, config: SchedulerConfig) -> Self {
        Self::with_rng(graph, registry, config, StdRng::from_os_rng())
    }

    pub fn with_seed(
        graph: Arc<SkillGraph>,
        registry: Arc<GeneratorRegistry>,
        config: SchedulerConfig,
        seed: u64,
    ) -> Self {
        Self::with_rng(graph, registry, config, StdRng::seed_from_u64(seed))
    }
}

impl<R: RngCore + Send> ItemScheduler<R> {
    pub fn with_rng(
        graph: Arc<SkillGraph>,
        registry: Arc<GeneratorRegistry>,
        config: SchedulerConfig,
        rng: R,
    ) -> Self {
        Self {
            graph,
            registry,
            config: config.normalized(),
            rng,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn is_learnable(&self, state: &LearnerState, skill_id: &str) -> bool {
        let threshold = self.config.mastery_threshold;
        self.graph
            .prerequisites(skill_id)
            .all(|prereq| state.mastery(prereq) >= threshold)
    }

    pub fn queues(&self, state: &LearnerState) -> SkillQueues {
        let threshold = self.config.mastery_threshold;
        let mut queues = SkillQueues::default();

        for id in self.graph.skill_ids() {
            if !self.is_learnable(state, id) {
                continue;
            }
            if state.mastery(id) < threshold {
                queues.learning.push(id.to_string());
            } else {
                queues.review.push(id.to_string());
            }
        }

        queues
    }

    /// Non-decreasing in `mastery`, bounded by the configured range.
    pub fn difficulty_for(&self, mastery: f64) -> u8 {
        let (min, max) = (self.config.min_difficulty, self.config.max_difficulty);
        let mastery = if mastery.is_finite() { mastery.clamp(0.0, 1.0) } else { 0.0 };
        let scaled = (mastery * f64::from(max)).ceil() as u8;
        scaled.clamp(min, max)
    }

    pub fn select_skill(&mut self, state: &LearnerState) -> SkillChoice {
        let queues = self.queues(state);
        let (skill_id, reason) = choose_from(
            &queues,
            self.config.learn_probability,
            self.graph.base_skill(),
            &mut self.rng,
        );

        let mastery = state.mastery(&skill_id);
        let choice = SkillChoice {
            difficulty: self.difficulty_for(mastery),
            skill_id,
            reason,
            mastery,
        };

        debug!(
            user_id = %state.user_id,
            skill_id = %choice.skill_id,
            reason = choice.reason.as_str(),
            learning = queues.learning.len(),
            review = queues.review.len(),
            difficulty = choice.difficulty,
            "scheduled next skill"
        );

        choice
    }

    pub async fn recommend_next(&mut self, state: &LearnerState) -> Result<Problem, SchedulerError> {
        let choice = self.select_skill(state);
        let problem = self
            .registry
            .generate(&choice.skill_id, choice.difficulty, &mut self.rng)
            .await?;
        Ok(problem)
    }
}

/// Learning queue with probability `learn_probability`, otherwise review.
/// An empty queue defers to the other one; with both empty the base skill is
/// returned.
fn choose_from<R: RngCore>(
    queues: &SkillQueues,
    learn_probability: f64,
    base_skill: &str,
    rng: &mut R,
) -> (String, SelectionReason) {
    let draw: f64 = rng.random();
    let prefer_learning = draw < learn_probability || queues.review.is_empty();

    if prefer_learning && !queues.learning.is_empty() {
        (pick(rng, &queues.learning), SelectionReason::Learning)
    } else if !queues.review.is_empty() {
        (pick(rng, &queues.review), SelectionReason::Review)
    } else {
        (base_skill.to_string(), SelectionReason::Fallback)
    }
}

fn pick<R: RngCore>(rng: &mut R, queue: &[String]) -> String {
    queue[rng.random_range(0..queue.len())].clone()
}
