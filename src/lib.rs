pub mod config;
pub mod content;
pub mod engine;
pub mod logging;
pub mod model;
pub mod registry;
pub mod session;
pub mod snapshot;

use std::sync::Arc;

use crate::config::TutorConfig;
use crate::engine::{ItemScheduler, MasteryEstimator};
use crate::model::{SkillGraph, SkillGraphError};
use crate::registry::{GeneratorRegistry, HttpProblemBank, ProblemSynthesizer};
use crate::session::TutorSession;
use crate::snapshot::{FileStore, SnapshotStore};

pub fn load_skill_graph(config: &TutorConfig) -> Result<SkillGraph, SkillGraphError> {
    match &config.skill_graph_path {
        Some(path) => SkillGraph::from_path(path),
        None => Ok(SkillGraph::builtin()),
    }
}

/// Local generators always; remote sources only when configured.
pub fn build_registry(config: &TutorConfig) -> GeneratorRegistry {
    let mut registry = GeneratorRegistry::new().with_timeout(config.registry_timeout);
    content::register_builtin(&mut registry);

    if let Some(url) = &config.problem_bank_url {
        registry = registry.with_problem_bank(Arc::new(HttpProblemBank::new(url.clone())));
    }

    let synthesizer = ProblemSynthesizer::from_env();
    if synthesizer.is_available() {
        registry = registry.with_synthesizer(Arc::new(synthesizer));
    }

    registry
}

pub fn create_session(config: &TutorConfig) -> Result<TutorSession<FileStore>, SkillGraphError> {
    let graph = Arc::new(load_skill_graph(config)?);
    let registry = Arc::new(build_registry(config));

    let estimator = MasteryEstimator::new(graph.clone(), config.bkt);
    let scheduler = match config.rng_seed {
        Some(seed) => ItemScheduler::with_seed(graph, registry, config.scheduler.clone(), seed),
        None => ItemScheduler::new(graph, registry, config.scheduler.clone()),
    };
    let snapshots = SnapshotStore::new(FileStore::new(config.data_dir.clone()));

    Ok(TutorSession::new(estimator, scheduler, snapshots, &config.user_id))
}
