//! Workflow runs and the status/conclusion vocabularies.
//!
//! `RunStatus` and `RunConclusion` are read-only projections of what the
//! Actions API reports; callers never construct them from scratch.

use std::fmt;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Event name GitHub records for runs started through the dispatch endpoint
pub const WORKFLOW_DISPATCH_EVENT: &str = "workflow_dispatch";

/// A workflow run as returned by the runs listing and run detail endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: u64,

    #[serde(default)]
    pub name: Option<String>,

    /// Event that started the run (`workflow_dispatch`, `push`, `schedule`, ...)
    #[serde(default)]
    pub event: String,

    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub conclusion: Option<String>,

    #[serde(default)]
    pub html_url: String,

    #[serde(default)]
    pub head_branch: Option<String>,
}

impl WorkflowRun {
    pub fn status(&self) -> RunStatus {
        RunStatus::from_remote(self.status.as_deref())
    }

    pub fn conclusion(&self) -> RunConclusion {
        RunConclusion::from_remote(self.conclusion.as_deref())
    }

    /// Normalized view returned to callers
    pub fn to_result(&self) -> RunResult {
        RunResult {
            url: self.html_url.clone(),
            status: self.status(),
            conclusion: self.conclusion(),
        }
    }
}

/// Lifecycle of a run: `queued -> in_progress -> completed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    Completed,
}

impl RunStatus {
    /// Normalize the API's `status` field. Absent means queued.
    pub fn from_remote(status: Option<&str>) -> Self {
        match status.map(str::trim) {
            None | Some("") => Self::Queued,
            Some("queued" | "requested" | "waiting" | "pending") => Self::Queued,
            Some("in_progress") => Self::InProgress,
            Some("completed") => Self::Completed,
            Some(other) => {
                warn!(status = other, "Unknown run status, treating as queued");
                Self::Queued
            }
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Outcome of a completed run. `Neutral` doubles as the placeholder for
/// runs that have not finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunConclusion {
    Success,
    Failure,
    Cancelled,
    Skipped,
    Neutral,
    TimedOut,
    ActionRequired,
}

impl RunConclusion {
    /// Normalize the API's `conclusion` field. Absent means neutral.
    pub fn from_remote(conclusion: Option<&str>) -> Self {
        match conclusion.map(str::trim) {
            None | Some("") => Self::Neutral,
            Some("success") => Self::Success,
            Some("failure" | "startup_failure") => Self::Failure,
            Some("cancelled") => Self::Cancelled,
            Some("skipped") => Self::Skipped,
            Some("neutral" | "stale") => Self::Neutral,
            Some("timed_out") => Self::TimedOut,
            Some("action_required") => Self::ActionRequired,
            Some(other) => {
                warn!(conclusion = other, "Unknown run conclusion, treating as neutral");
                Self::Neutral
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Cancelled => "cancelled",
            Self::Skipped => "skipped",
            Self::Neutral => "neutral",
            Self::TimedOut => "timed_out",
            Self::ActionRequired => "action_required",
        }
    }
}

impl fmt::Display for RunConclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Status snapshot of the correlated run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    /// Human-viewable run page
    pub url: String,
    pub status: RunStatus,
    pub conclusion: RunConclusion,
}

/// Pick the run a dispatch produced.
///
/// Keeps `workflow_dispatch` runs created at or after the trigger instant
/// and returns the first one in API order (newest first). GitHub reports
/// `created_at` with whole-second precision, so the trigger instant is
/// truncated to the second before comparing.
pub fn select_correlated_run(
    runs: &[WorkflowRun],
    triggered_at: DateTime<Utc>,
) -> Option<&WorkflowRun> {
    let threshold = triggered_at.trunc_subsecs(0);
    runs.iter()
        .filter(|run| run.event == WORKFLOW_DISPATCH_EVENT)
        .find(|run| run.created_at >= threshold)
}
