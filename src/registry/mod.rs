//! Generator Registry - resolves `(skill_id, difficulty)` to a concrete problem.
//!
//! Resolution order:
//! 1. remote problem bank (validated items)
//! 2. remote synthesis service
//! 3. locally registered generator for the skill
//!
//! Remote failures and timeouts are logged and treated as "try the next
//! fallback". Only an exhausted chain is reported to the caller.

pub mod http_bank;
pub mod source;
pub mod synthesizer;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::RngCore;
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::{Problem, ProblemOrigin};

pub use http_bank::HttpProblemBank;
pub use source::{ProblemGenerator, RemoteProblemSource, SourceError};
pub use synthesizer::{ProblemSynthesizer, SynthesisConfig};

const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("no generator found for skill `{skill_id}`")]
    GeneratorNotFound { skill_id: String },
}

pub struct GeneratorRegistry {
    local: HashMap<String, Arc<dyn ProblemGenerator>>,
    bank: Option<Arc<dyn RemoteProblemSource>>,
    synthesizer: Option<Arc<dyn RemoteProblemSource>>,
    timeout: Duration,
}

impl Default for GeneratorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl GeneratorRegistry {
    pub fn new() -> Self {
        Self {
            local: HashMap::new(),
            bank: None,
            synthesizer: None,
            timeout: DEFAULT_REMOTE_TIMEOUT,
        }
    }

    pub fn register<G>(&mut self, skill_id: impl Into<String>, generator: G)
    where
        G: ProblemGenerator + 'static,
    {
        self.local.insert(skill_id.into(), Arc::new(generator));
    }

    pub fn with_problem_bank(mut self, source: Arc<dyn RemoteProblemSource>) -> Self {
        self.bank = Some(source);
        self
    }

    pub fn with_synthesizer(mut self, source: Arc<dyn RemoteProblemSource>) -> Self {
        self.synthesizer = Some(source);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn has_local(&self, skill_id: &str) -> bool {
        self.local.contains_key(skill_id)
    }

    pub fn local_skills(&self) -> impl Iterator<Item = &str> {
        self.local.keys().map(String::as_str)
    }

    pub async fn generate(
        &self,
        skill_id: &str,
        difficulty: u8,
        rng: &mut (dyn RngCore + Send),
    ) -> Result<Problem, RegistryError> {
        let remotes = [
            (self.bank.as_ref(), ProblemOrigin::Bank),
            (self.synthesizer.as_ref(), ProblemOrigin::Synthesized),
        ];

        for (source, origin) in remotes {
            let Some(source) = source else { continue };
            if let Some(mut problem) = self.try_remote(source.as_ref(), skill_id, difficulty).await {
                problem.origin = origin;
                return Ok(problem);
            }
        }

        match self.local.get(skill_id) {
            Some(generator) => {
                let mut problem = generator.generate(difficulty, rng);
                problem.origin = ProblemOrigin::Local;
                Ok(problem)
            }
            None => Err(RegistryError::GeneratorNotFound {
                skill_id: skill_id.to_string(),
            }),
        }
    }

    async fn try_remote(
        &self,
        source: &dyn RemoteProblemSource,
        skill_id: &str,
        difficulty: u8,
    ) -> Option<Problem> {
        let result = match tokio::time::timeout(self.timeout, source.fetch(skill_id, difficulty)).await {
            Ok(result) => result,
            Err(_) => Err(SourceError::Timeout(self.timeout)),
        };

        match result {
            Ok(Some(problem)) if problem.skill_id == skill_id => Some(problem),
            Ok(Some(problem)) => {
                warn!(
                    source = source.name(),
                    requested = skill_id,
                    returned = %problem.skill_id,
                    "remote source returned a problem for another skill"
                );
                None
            }
            Ok(None) => {
                debug!(source = source.name(), skill_id, difficulty, "remote source had no problem");
                None
            }
            Err(err) => {
                warn!(source = source.name(), skill_id, error = %err, "remote source failed, falling back");
                None
            }
        }
    }
}
