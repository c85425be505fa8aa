//! Static skill graph: skills keyed by id with their prerequisite sets.
//!
//! Loaded once at startup and shared read-only (`Arc<SkillGraph>`) by the
//! estimator and the scheduler.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SkillParamOverrides;

#[derive(Debug, Error)]
pub enum SkillGraphError {
    #[error("skill `{skill}` lists unknown prerequisite `{prereq}`")]
    UnknownPrerequisite { skill: String, prereq: String },
    #[error("prerequisite cycle through skill `{0}`")]
    Cycle(String),
    #[error("base skill `{0}` is not part of the graph")]
    MissingBaseSkill(String),
    #[error("duplicate skill id `{0}`")]
    DuplicateSkill(String),
    #[error("failed to read skill graph: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid skill graph JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub id: String,
    #[serde(default)]
    pub prereqs: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mastery_params: Option<SkillParamOverrides>,
}

impl Skill {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            prereqs: BTreeSet::new(),
            mastery_params: None,
        }
    }

    pub fn with_prereqs<I, S>(mut self, prereqs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prereqs = prereqs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_params(mut self, params: SkillParamOverrides) -> Self {
        self.mastery_params = Some(params);
        self
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SkillGraphFile {
    base_skill: String,
    skills: Vec<Skill>,
}

#[derive(Debug, Clone)]
pub struct SkillGraph {
    skills: BTreeMap<String, Skill>,
    base_skill: String,
}

impl SkillGraph {
    pub fn new(skills: Vec<Skill>, base_skill: impl Into<String>) -> Result<Self, SkillGraphError> {
        let base_skill = base_skill.into();
        let mut map = BTreeMap::new();
        for skill in skills {
            if map.contains_key(&skill.id) {
                return Err(SkillGraphError::DuplicateSkill(skill.id));
            }
            map.insert(skill.id.clone(), skill);
        }

        for skill in map.values() {
            if let Some(prereq) = skill.prereqs.iter().find(|p| !map.contains_key(*p)) {
                return Err(SkillGraphError::UnknownPrerequisite {
                    skill: skill.id.clone(),
                    prereq: prereq.clone(),
                });
            }
        }

        if !map.contains_key(&base_skill) {
            return Err(SkillGraphError::MissingBaseSkill(base_skill));
        }

        let graph = Self {
            skills: map,
            base_skill,
        };
        graph.topological_order()?;
        Ok(graph)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, SkillGraphError> {
        let file: SkillGraphFile = serde_json::from_str(raw)?;
        Self::new(file.skills, file.base_skill)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SkillGraphError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Arithmetic curriculum bundled with the binary.
    pub fn builtin() -> Self {
        let skills = vec![
            Skill::new("add_single"),
            Skill::new("sub_single").with_prereqs(["add_single"]),
            Skill::new("add_carry").with_prereqs(["add_single"]),
            Skill::new("mul_facts")
                .with_prereqs(["add_carry"])
                .with_params(SkillParamOverrides {
                    learning_rate: Some(0.08),
                    slip: None,
                    guess: Some(0.15),
                }),
        ];
        let skills = skills.into_iter().map(|s| (s.id.clone(), s)).collect();
        Self {
            skills,
            base_skill: "add_single".to_string(),
        }
    }

    pub fn base_skill(&self) -> &str {
        &self.base_skill
    }

    pub fn get(&self, id: &str) -> Option<&Skill> {
        self.skills.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.skills.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    pub fn skills(&self) -> impl Iterator<Item = &Skill> {
        self.skills.values()
    }

    pub fn skill_ids(&self) -> impl Iterator<Item = &str> {
        self.skills.keys().map(String::as_str)
    }

    pub fn prerequisites(&self, id: &str) -> impl Iterator<Item = &str> {
        self.skills
            .get(id)
            .into_iter()
            .flat_map(|s| s.prereqs.iter().map(String::as_str))
    }

    pub fn dependents<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.skills
            .values()
            .filter(move |s| s.prereqs.contains(id))
            .map(|s| s.id.as_str())
    }

    /// Kahn's algorithm, ties broken by id so the order is stable.
    pub fn topological_order(&self) -> Result<Vec<&str>, SkillGraphError> {
        let mut remaining: BTreeMap<&str, usize> = self
            .skills
            .values()
            .map(|s| (s.id.as_str(), s.prereqs.len()))
            .collect();
        let mut order = Vec::with_capacity(self.skills.len());

        while !remaining.is_empty() {
            let ready: Vec<&str> = remaining
                .iter()
                .filter(|(_, pending)| **pending == 0)
                .map(|(id, _)| *id)
                .collect();

            if ready.is_empty() {
                let stuck = remaining.keys().next().copied().unwrap_or_default();
                return Err(SkillGraphError::Cycle(stuck.to_string()));
            }

            for id in ready {
                remaining.remove(id);
                for dependent in self.dependents(id) {
                    if let Some(pending) = remaining.get_mut(dependent) {
                        *pending -= 1;
                    }
                }
                order.push(id);
            }
        }

        Ok(order)
    }
}
