use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

const DEFAULT_LEARNING_RATE: f64 = 0.1;
const DEFAULT_SLIP: f64 = 0.1;
const DEFAULT_GUESS: f64 = 0.2;
const PARAM_MIN: f64 = 0.001;
const PARAM_MAX: f64 = 0.999;

const DEFAULT_MASTERY_THRESHOLD: f64 = 0.85;
const DEFAULT_LEARN_PROBABILITY: f64 = 0.7;
const DEFAULT_MIN_DIFFICULTY: u8 = 1;
const DEFAULT_MAX_DIFFICULTY: u8 = 10;
const DEFAULT_REGISTRY_TIMEOUT_MS: u64 = 3_000;

/// Process-wide Bayesian Knowledge Tracing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BktParams {
    pub learning_rate: f64,
    pub slip: f64,
    pub guess: f64,
}

impl Default for BktParams {
    fn default() -> Self {
        Self {
            learning_rate: DEFAULT_LEARNING_RATE,
            slip: DEFAULT_SLIP,
            guess: DEFAULT_GUESS,
        }
    }
}

impl BktParams {
    /// Skill-specific values win; anything the skill omits comes from `self`.
    pub fn resolve(&self, overrides: Option<&SkillParamOverrides>) -> BktParams {
        let Some(o) = overrides else {
            return self.clamped();
        };
        BktParams {
            learning_rate: o.learning_rate.unwrap_or(self.learning_rate),
            slip: o.slip.unwrap_or(self.slip),
            guess: o.guess.unwrap_or(self.guess),
        }
        .clamped()
    }

    pub fn clamped(&self) -> BktParams {
        BktParams {
            learning_rate: clamp_param(self.learning_rate, DEFAULT_LEARNING_RATE),
            slip: clamp_param(self.slip, DEFAULT_SLIP),
            guess: clamp_param(self.guess, DEFAULT_GUESS),
        }
    }
}

fn clamp_param(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(PARAM_MIN, PARAM_MAX)
    } else {
        fallback
    }
}

/// Per-skill model parameters; every field is optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillParamOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learning_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slip: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guess: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerConfig {
    pub mastery_threshold: f64,
    pub learn_probability: f64,
    pub min_difficulty: u8,
    pub max_difficulty: u8,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            mastery_threshold: DEFAULT_MASTERY_THRESHOLD,
            learn_probability: DEFAULT_LEARN_PROBABILITY,
            min_difficulty: DEFAULT_MIN_DIFFICULTY,
            max_difficulty: DEFAULT_MAX_DIFFICULTY,
        }
    }
}

impl SchedulerConfig {
    pub fn normalized(mut self) -> Self {
        self.mastery_threshold = unit_or(self.mastery_threshold, DEFAULT_MASTERY_THRESHOLD);
        self.learn_probability = unit_or(self.learn_probability, DEFAULT_LEARN_PROBABILITY);
        self.min_difficulty = self.min_difficulty.max(1);
        self.max_difficulty = self.max_difficulty.max(self.min_difficulty);
        self
    }
}

fn unit_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        fallback
    }
}

#[derive(Debug, Clone)]
pub struct TutorConfig {
    pub log_level: String,
    /// Directory for rolling file logs; `None` keeps logging on the terminal.
    pub log_dir: Option<PathBuf>,
    pub user_id: String,
    pub skill_graph_path: Option<PathBuf>,
    pub data_dir: PathBuf,
    pub rng_seed: Option<u64>,
    pub problem_bank_url: Option<String>,
    pub registry_timeout: Duration,
    pub bkt: BktParams,
    pub scheduler: SchedulerConfig,
}

impl TutorConfig {
    pub fn from_env() -> Self {
        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let user_id = env_string("TUTOR_USER_ID").unwrap_or_else(|| "local".to_string());
        let skill_graph_path = env_string("TUTOR_SKILL_GRAPH").map(PathBuf::from);

        let data_dir = env_string("TUTOR_DATA_DIR")
            .map(PathBuf::from)
            .or_else(|| dirs::data_dir().map(|d| d.join("kt-tutor")))
            .unwrap_or_else(|| PathBuf::from("./data"));

        let log_dir = env_flag("ENABLE_FILE_LOGS").then(|| {
            env_string("LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir.join("logs"))
        });

        let rng_seed = env_parse::<u64>("TUTOR_RNG_SEED");
        let problem_bank_url = env_string("PROBLEM_BANK_URL");
        let registry_timeout = Duration::from_millis(
            env_parse::<u64>("REGISTRY_TIMEOUT_MS").unwrap_or(DEFAULT_REGISTRY_TIMEOUT_MS),
        );

        let defaults = SchedulerConfig::default();
        let scheduler = SchedulerConfig {
            mastery_threshold: env_parse("TUTOR_MASTERY_THRESHOLD")
                .unwrap_or(defaults.mastery_threshold),
            learn_probability: env_parse("TUTOR_LEARN_PROBABILITY")
                .unwrap_or(defaults.learn_probability),
            ..defaults
        }
        .normalized();

        Self {
            log_level,
            log_dir,
            user_id,
            skill_graph_path,
            data_dir,
            rng_seed,
            problem_bank_url,
            registry_timeout,
            bkt: BktParams::default(),
            scheduler,
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_flag(key: &str) -> bool {
    env_string(key).is_some_and(|v| parse_flag(&v))
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_string(key)?.trim().parse().ok()
}
