//! Run lifecycle models.
//!
//! A run is one invocation of an operation (agent run, model call, tool
//! call) wrapped in a run context.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Lifecycle status of a single run.
///
/// The status progresses through these states:
/// Created -> Running -> (Succeeded | Failed) -> Finished
///
/// `Finished` is terminal and is reached on every exit path.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    /// The context exists but the operation body has not been entered.
    Created,

    /// `start` has been emitted and the body is executing.
    Running,

    /// The body returned a value.
    Succeeded,

    /// The body failed or the run was aborted.
    Failed,

    /// `finish` has been emitted and the context released.
    Finished,
}

impl RunStatus {
    /// Whether no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Finished)
    }

    /// Whether `self -> next` is a legal transition.
    pub fn can_transition_to(self, next: RunStatus) -> bool {
        matches!(
            (self, next),
            (RunStatus::Created, RunStatus::Running)
                | (RunStatus::Running, RunStatus::Succeeded)
                | (RunStatus::Running, RunStatus::Failed)
                | (RunStatus::Succeeded, RunStatus::Failed)
                | (RunStatus::Succeeded, RunStatus::Finished)
                | (RunStatus::Failed, RunStatus::Finished)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        assert!(RunStatus::Created.can_transition_to(RunStatus::Running));
        assert!(RunStatus::Running.can_transition_to(RunStatus::Succeeded));
        assert!(RunStatus::Succeeded.can_transition_to(RunStatus::Finished));
    }

    #[test]
    fn test_failure_transitions() {
        assert!(RunStatus::Running.can_transition_to(RunStatus::Failed));
        assert!(RunStatus::Failed.can_transition_to(RunStatus::Finished));
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(!RunStatus::Created.can_transition_to(RunStatus::Finished));
        assert!(!RunStatus::Finished.can_transition_to(RunStatus::Running));
        assert!(!RunStatus::Failed.can_transition_to(RunStatus::Succeeded));
    }

    #[test]
    fn test_only_finished_is_terminal() {
        assert!(RunStatus::Finished.is_terminal());
        assert!(!RunStatus::Failed.is_terminal());
        assert!(!RunStatus::Succeeded.is_terminal());
    }
}
