//! Adapter interfaces for the hosting platform.
//!
//! The correlation core talks to GitHub only through [`GitHubApi`], so it
//! can run against the real REST/GraphQL client or an in-memory fake.

pub mod github;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::{Artifact, DispatchAck, Repository, Workflow, WorkflowId, WorkflowRun};
use crate::error::Result;

// Re-export the GitHub client
pub use github::{GitHubClient, DEFAULT_API_URL};

/// Authenticated calls the dispatcher needs from the platform
#[async_trait]
pub trait GitHubApi: Send + Sync {
    /// Fire a `workflow_dispatch` event. The response carries no run id.
    async fn create_dispatch(
        &self,
        repo: &Repository,
        workflow: &WorkflowId,
        git_ref: &str,
        inputs: &HashMap<String, String>,
    ) -> Result<DispatchAck>;

    /// Every workflow defined in the repository (all pages)
    async fn list_workflows(&self, repo: &Repository) -> Result<Vec<Workflow>>;

    /// Runs of one workflow filtered by triggering event, newest first (all pages)
    async fn list_workflow_runs(
        &self,
        repo: &Repository,
        workflow: &WorkflowId,
        event: &str,
    ) -> Result<Vec<WorkflowRun>>;

    async fn get_workflow_run(&self, repo: &Repository, run_id: u64) -> Result<WorkflowRun>;

    /// Artifacts of a run (first page only)
    async fn list_run_artifacts(&self, repo: &Repository, run_id: u64) -> Result<Vec<Artifact>>;

    /// Head branch names of the repository's open pull requests
    async fn open_pull_request_branches(&self, repo: &Repository) -> Result<Vec<String>>;
}
