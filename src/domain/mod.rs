//! Domain types for wfdispatch.
//!
//! This module contains the core data structures:
//! - Repository: owner/name coordinates
//! - Workflow: references, resolved ids and listed definitions
//! - Run: remote run records and the status/conclusion vocabularies
//! - Artifact: run artifacts and their retention state

pub mod artifact;
pub mod repo;
pub mod run;
pub mod workflow;

// Re-export commonly used types
pub use artifact::{Artifact, ArtifactState, ArtifactSummary};
pub use repo::Repository;
pub use run::{
    select_correlated_run, RunConclusion, RunResult, RunStatus, WorkflowRun,
    WORKFLOW_DISPATCH_EVENT,
};
pub use workflow::{find_workflow, Workflow, WorkflowId, WorkflowReference};

use serde::{Deserialize, Serialize};

/// Acknowledgement of an accepted dispatch. GitHub returns no body, only
/// a status code (204).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchAck {
    pub status: u16,
}

impl DispatchAck {
    pub fn is_accepted(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
