use serde::Serialize;
use tracing::info;

use crate::engine::{evaluate, Diagnosis, ItemScheduler, MasteryEstimator, SchedulerError};
use crate::model::{Attempt, LearnerState, Problem, ProgressReport};
use crate::snapshot::{KeyValueStore, SnapshotStore};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub correct: bool,
    /// 1-based try number within the current showing of the item.
    pub attempts_count: u32,
    pub diagnosis: Option<Diagnosis>,
    pub mastery_before: f64,
    pub mastery_after: f64,
}

/// Hints revealed for the item on screen.
///
/// `hints_used` is a per-item total; the ladder position restarts whenever a
/// new diagnosis arrives.
#[derive(Debug, Default)]
pub struct HintState {
    diagnosis: Option<Diagnosis>,
    level: usize,
    total: u32,
}

impl HintState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_diagnosis(&mut self, diagnosis: Diagnosis) {
        self.diagnosis = Some(diagnosis);
        self.level = 0;
    }

    pub fn diagnosis(&self) -> Option<&Diagnosis> {
        self.diagnosis.as_ref()
    }

    pub fn reveal(&mut self) -> Option<&str> {
        let hint = self.diagnosis.as_ref()?.hint(self.level)?;
        self.level += 1;
        self.total += 1;
        Some(hint)
    }

    pub fn hints_used(&self) -> u32 {
        self.total
    }
}

/// One learner's tutoring loop: schedule, check, diagnose, update, persist.
pub struct TutorSession<S> {
    estimator: MasteryEstimator,
    scheduler: ItemScheduler,
    snapshots: SnapshotStore<S>,
    state: LearnerState,
    /// Item currently on screen and how many answers it has received.
    current_item: Option<(String, u32)>,
}

impl<S: KeyValueStore> TutorSession<S> {
    /// Restores the stored snapshot when it belongs to `user_id`, otherwise
    /// starts from the estimator's initial state.
    pub fn new(
        estimator: MasteryEstimator,
        scheduler: ItemScheduler,
        snapshots: SnapshotStore<S>,
        user_id: &str,
    ) -> Self {
        let state = match snapshots.load() {
            Some(state) if state.user_id == user_id => state,
            Some(other) => {
                info!(stored = %other.user_id, requested = user_id, "snapshot belongs to another user, starting fresh");
                estimator.initial_state(user_id)
            }
            None => estimator.initial_state(user_id),
        };

        Self {
            estimator,
            scheduler,
            snapshots,
            state,
            current_item: None,
        }
    }

    pub fn state(&self) -> &LearnerState {
        &self.state
    }

    pub fn progress(&self) -> ProgressReport {
        self.state.progress(
            self.estimator.graph(),
            self.scheduler.config().mastery_threshold,
        )
    }

    /// Starts a new showing: the try counter restarts even when the
    /// generator repeats an item id.
    pub async fn next_problem(&mut self) -> Result<Problem, SchedulerError> {
        let problem = self.scheduler.recommend_next(&self.state).await?;
        self.current_item = Some((problem.id.clone(), 0));
        Ok(problem)
    }

    pub fn submit(
        &mut self,
        problem: &Problem,
        answer: &str,
        time_taken_ms: u64,
        hints_used: u32,
    ) -> Feedback {
        let now = chrono::Utc::now().timestamp_millis();
        self.submit_at(problem, answer, time_taken_ms, hints_used, now)
    }

    pub fn submit_at(
        &mut self,
        problem: &Problem,
        answer: &str,
        time_taken_ms: u64,
        hints_used: u32,
        timestamp: i64,
    ) -> Feedback {
        let correct = problem.is_correct(answer);
        let diagnosis = if correct { None } else { evaluate(problem, answer) };

        let attempts_count = self.next_try(&problem.id);

        let attempt = Attempt {
            user_id: self.state.user_id.clone(),
            item_id: problem.id.clone(),
            skill_id: problem.skill_id.clone(),
            timestamp,
            is_correct: correct,
            time_taken_ms,
            attempts_count,
            hints_used,
            error_tags: diagnosis
                .iter()
                .map(|d| d.error_category.clone())
                .collect(),
        };

        let mastery_before = self.state.mastery(&problem.skill_id);
        self.state = self.estimator.update(&self.state, &attempt);
        let mastery_after = self.state.mastery(&problem.skill_id);
        self.snapshots.save(&self.state);

        info!(
            skill_id = %problem.skill_id,
            correct,
            attempts_count,
            error = diagnosis.as_ref().map(|d| d.error_category.as_str()).unwrap_or("-"),
            mastery_before,
            mastery_after,
            "attempt recorded"
        );

        Feedback {
            correct,
            attempts_count,
            diagnosis,
            mastery_before,
            mastery_after,
        }
    }

    fn next_try(&mut self, item_id: &str) -> u32 {
        if let Some((current, count)) = self.current_item.as_mut() {
            if current == item_id {
                *count += 1;
                return *count;
            }
        }
        self.current_item = Some((item_id.to_string(), 1));
        1
    }
}
