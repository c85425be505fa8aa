#![allow(dead_code)]

use std::sync::Arc;

use rand::{Rng, RngCore};

use kt_tutor::config::SchedulerConfig;
use kt_tutor::engine::ItemScheduler;
use kt_tutor::model::{Attempt, Problem, ProblemOrigin, Skill, SkillGraph};
use kt_tutor::registry::{GeneratorRegistry, ProblemGenerator};

pub const FIXED_TIMESTAMP: i64 = 1700000000000;

/// `root` is the only prerequisite of `dependent`.
pub fn root_and_dependent() -> Arc<SkillGraph> {
    Arc::new(
        SkillGraph::new(
            vec![
                Skill::new("root"),
                Skill::new("dependent").with_prereqs(["root"]),
            ],
            "root",
        )
        .expect("valid graph"),
    )
}

pub struct CountingGenerator {
    pub skill_id: String,
}

impl ProblemGenerator for CountingGenerator {
    fn generate(&self, difficulty: u8, rng: &mut dyn RngCore) -> Problem {
        let n = rng.random_range(1..=20u32);
        Problem {
            id: format!("{}-{n}", self.skill_id),
            skill_id: self.skill_id.clone(),
            difficulty,
            prompt: format!("What comes after {n}?"),
            answer: (n + 1).to_string(),
            misconceptions: vec![],
            origin: ProblemOrigin::Local,
        }
    }
}

pub fn registry_for(graph: &SkillGraph) -> Arc<GeneratorRegistry> {
    let mut registry = GeneratorRegistry::new();
    for skill in graph.skills() {
        registry.register(
            skill.id.clone(),
            CountingGenerator {
                skill_id: skill.id.clone(),
            },
        );
    }
    Arc::new(registry)
}

pub fn seeded_scheduler(graph: Arc<SkillGraph>, seed: u64) -> ItemScheduler {
    let registry = registry_for(&graph);
    ItemScheduler::with_seed(graph, registry, SchedulerConfig::default(), seed)
}

pub fn attempt(skill_id: &str, is_correct: bool) -> Attempt {
    Attempt {
        user_id: "learner_1".to_string(),
        item_id: format!("{skill_id}-item"),
        skill_id: skill_id.to_string(),
        timestamp: FIXED_TIMESTAMP,
        is_correct,
        time_taken_ms: 3500,
        attempts_count: 1,
        hints_used: 0,
        error_tags: vec![],
    }
}
