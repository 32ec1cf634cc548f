// SPDX-FileCopyrightText: Copyright © 2024-2026 Naptha Node Developers
//
// SPDX-License-Identifier: MPL-2.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

use crate::deployment::Deployment;

/// Which table family a [`Run`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RunKind {
    Agent,
    Tool,
    Orchestrator,
    Environment,
    Kb,
}

/// Lifecycle status of a [`Run`]. Ordered: a later variant may only follow
/// an earlier one, never the reverse, except that `Error` is reachable from
/// any non-terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Processing,
    Running,
    Completed,
    Error,
}

impl RunStatus {
    /// Whether this status has no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    /// Whether transitioning from `self` to `next` is a legal step of the
    /// state machine (monotone, with `Error` reachable from anywhere
    /// non-terminal).
    pub fn can_transition_to(self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == Self::Error {
            return true;
        }
        (next as u8) == (self as u8) + 1
    }
}

/// A single execution request for a module, tracked end to end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: String,
    pub consumer_id: String,
    pub kind: RunKind,
    pub deployment: Deployment,
    pub inputs: Value,
    pub status: RunStatus,
    pub error: bool,
    pub error_message: String,
    pub results: Vec<String>,
    pub created_time: DateTime<Utc>,
    pub start_processing_time: Option<DateTime<Utc>>,
    pub completed_time: Option<DateTime<Utc>>,
    pub duration: Option<f64>,
    pub parent_runs: Vec<String>,
    pub child_runs: Vec<String>,
}

impl Run {
    /// A fresh, unpersisted run in the `pending` state.
    pub fn new(consumer_id: String, kind: RunKind, deployment: Deployment, inputs: Value) -> Self {
        Self {
            id: String::new(),
            consumer_id,
            kind,
            deployment,
            inputs,
            status: RunStatus::Pending,
            error: false,
            error_message: String::new(),
            results: Vec::new(),
            created_time: Utc::now(),
            start_processing_time: None,
            completed_time: None,
            duration: None,
            parent_runs: Vec::new(),
            child_runs: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotone_transitions_allowed() {
        assert!(RunStatus::Pending.can_transition_to(RunStatus::Processing));
        assert!(RunStatus::Processing.can_transition_to(RunStatus::Running));
        assert!(RunStatus::Running.can_transition_to(RunStatus::Completed));
    }

    #[test]
    fn error_reachable_from_any_non_terminal_state() {
        assert!(RunStatus::Pending.can_transition_to(RunStatus::Error));
        assert!(RunStatus::Processing.can_transition_to(RunStatus::Error));
        assert!(RunStatus::Running.can_transition_to(RunStatus::Error));
    }

    #[test]
    fn terminal_states_reject_further_transitions() {
        assert!(!RunStatus::Completed.can_transition_to(RunStatus::Running));
        assert!(!RunStatus::Error.can_transition_to(RunStatus::Completed));
    }

    #[test]
    fn no_back_edges() {
        assert!(!RunStatus::Running.can_transition_to(RunStatus::Pending));
        assert!(!RunStatus::Completed.can_transition_to(RunStatus::Processing));
    }
}
