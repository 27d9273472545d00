//! Detector memory between cycles
//!
//! Everything here is pure bookkeeping: given the previous observations and
//! a fresh snapshot, decide what to announce. No I/O happens in this module.

use crate::api::{Color, Job, PendingInput};
use crate::monitor::events::{input_key, BuildOutcome, InputNotification, TerminalNotification};
use crate::monitor::status::GlobalStatus;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Last observed state of one job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobState {
    pub color: Color,
    pub last_build: Option<u64>,
}

impl JobState {
    fn of(job: &Job) -> Self {
        Self {
            color: job.color,
            last_build: job.last_build_number(),
        }
    }
}

/// State shared by every detector cycle against one server
#[derive(Debug, Default)]
pub struct MonitorState {
    generation: u64,
    jobs: HashMap<String, JobState>,
    notified_inputs: HashSet<String>,
    last_status: Option<GlobalStatus>,
}

impl MonitorState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bumped on every reset; cycles started under an older generation discard their results
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Forget everything learned about the current server
    pub fn reset(&mut self) {
        self.generation += 1;
        self.jobs.clear();
        self.notified_inputs.clear();
        self.last_status = None;
    }

    pub fn job(&self, fullname: &str) -> Option<&JobState> {
        self.jobs.get(fullname)
    }

    pub fn last_status(&self) -> Option<GlobalStatus> {
        self.last_status
    }

    /// Record a fresh inventory and return the builds that finished since the last one.
    ///
    /// The first sighting of a job only records it. Jobs missing from the
    /// inventory are forgotten, so a job that reappears is treated as new.
    pub fn observe_inventory(&mut self, jobs: &[Job]) -> Vec<TerminalNotification> {
        let mut finished = Vec::new();
        let mut seen = HashMap::with_capacity(jobs.len());

        for job in jobs {
            let current = JobState::of(job);
            if let Some(previous) = self.jobs.get(&job.fullname) {
                if let Some(outcome) = terminal_outcome(previous, &current) {
                    finished.push(TerminalNotification {
                        id: Uuid::new_v4(),
                        job: job.fullname.clone(),
                        build: current.last_build,
                        outcome,
                        url: job.url.clone(),
                    });
                }
            }
            seen.insert(job.fullname.clone(), current);
        }

        self.jobs = seen;
        finished
    }

    /// Return the inputs of `job` #`build` that have not been announced yet, marking them announced
    pub fn observe_inputs(
        &mut self,
        job: &str,
        build: u64,
        inputs: &[PendingInput],
    ) -> Vec<InputNotification> {
        inputs
            .iter()
            .filter(|input| self.notified_inputs.insert(input_key(job, build, &input.id)))
            .map(|input| InputNotification {
                id: Uuid::new_v4(),
                job: job.to_string(),
                build,
                input_id: input.id.clone(),
                message: input.message.clone(),
                proceed_text: input.proceed_text.clone(),
                parameters: input.inputs.clone(),
            })
            .collect()
    }

    /// Store the new aggregate status; returns true when it differs from the last one
    pub fn update_status(&mut self, status: GlobalStatus) -> bool {
        let changed = self.last_status != Some(status);
        self.last_status = Some(status);
        changed
    }
}

/// A job is terminal when it is not running now and either was running
/// before or has a newer last build than before.
fn terminal_outcome(previous: &JobState, current: &JobState) -> Option<BuildOutcome> {
    if current.color.running {
        return None;
    }

    let newer_build = match (previous.last_build, current.last_build) {
        (Some(before), Some(now)) => now > before,
        (None, Some(_)) => true,
        _ => false,
    };

    if previous.color.running || newer_build {
        BuildOutcome::from_base(current.color.base)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::{input, job};

    fn outcomes(notes: &[TerminalNotification]) -> Vec<(String, &'static str)> {
        notes
            .iter()
            .map(|n| (n.job.clone(), n.outcome.label()))
            .collect()
    }

    #[test]
    fn first_sighting_is_silent() {
        let mut state = MonitorState::new();
        let notes = state.observe_inventory(&[job("A", "red", Some(3)), job("B", "blue_anime", Some(9))]);
        assert!(notes.is_empty());
        assert_eq!(state.job("A").map(|s| s.last_build), Some(Some(3)));
    }

    #[test]
    fn running_to_failed_is_announced_once() {
        let mut state = MonitorState::new();
        state.observe_inventory(&[job("A", "blue_anime", Some(10))]);

        let notes = state.observe_inventory(&[job("A", "red", Some(10))]);
        assert_eq!(outcomes(&notes), vec![("A".to_string(), "FAILED")]);
        assert_eq!(notes[0].build, Some(10));

        assert!(state.observe_inventory(&[job("A", "red", Some(10))]).is_empty());
    }

    #[test]
    fn missed_running_phase_detected_by_build_number() {
        let mut state = MonitorState::new();
        state.observe_inventory(&[job("A", "blue", Some(10))]);

        let notes = state.observe_inventory(&[job("A", "yellow", Some(11))]);
        assert_eq!(outcomes(&notes), vec![("A".to_string(), "UNSTABLE")]);
    }

    #[test]
    fn first_build_ever_is_terminal() {
        let mut state = MonitorState::new();
        state.observe_inventory(&[job("A", "notbuilt", None)]);

        let notes = state.observe_inventory(&[job("A", "blue", Some(1))]);
        assert_eq!(outcomes(&notes), vec![("A".to_string(), "SUCCESS")]);
    }

    #[test]
    fn still_running_or_unchanged_is_silent() {
        let mut state = MonitorState::new();
        state.observe_inventory(&[job("A", "blue_anime", Some(4)), job("B", "blue", Some(2))]);

        let notes = state.observe_inventory(&[job("A", "blue_anime", Some(5)), job("B", "blue", Some(2))]);
        assert!(notes.is_empty());
    }

    #[test]
    fn disabled_and_notbuilt_never_announced() {
        let mut state = MonitorState::new();
        state.observe_inventory(&[job("A", "notbuilt_anime", Some(1)), job("B", "blue", Some(1))]);

        let notes = state.observe_inventory(&[job("A", "notbuilt", Some(1)), job("B", "disabled", Some(2))]);
        assert!(notes.is_empty());
    }

    #[test]
    fn vanished_job_is_new_again() {
        let mut state = MonitorState::new();
        state.observe_inventory(&[job("A", "blue_anime", Some(1))]);
        state.observe_inventory(&[]);

        assert!(state.observe_inventory(&[job("A", "red", Some(1))]).is_empty());
    }

    #[test]
    fn input_announced_once_per_key() {
        let mut state = MonitorState::new();

        let first = state.observe_inputs("A", 7, &[input("deploy")]);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].key(), "A:7:deploy");

        assert!(state.observe_inputs("A", 7, &[input("deploy")]).is_empty());
        assert_eq!(state.observe_inputs("A", 8, &[input("deploy")]).len(), 1);
    }

    #[test]
    fn status_change_tracking() {
        let mut state = MonitorState::new();
        assert!(state.update_status(GlobalStatus::Success));
        assert!(!state.update_status(GlobalStatus::Success));
        assert!(state.update_status(GlobalStatus::Failure));
    }

    #[test]
    fn reset_forgets_everything() {
        let mut state = MonitorState::new();
        state.observe_inventory(&[job("A", "blue_anime", Some(1))]);
        state.observe_inputs("A", 1, &[input("go")]);
        state.update_status(GlobalStatus::Running);
        let generation = state.generation();

        state.reset();

        assert!(state.generation() > generation);
        assert!(state.job("A").is_none());
        assert_eq!(state.last_status(), None);
        assert_eq!(state.observe_inputs("A", 1, &[input("go")]).len(), 1);
    }
}
