//! Dispatch-and-forget across open pull-request branches.
//!
//! Each branch gets its own dispatch on its own task. A failing branch is
//! recorded and never aborts the others. No run correlation happens here.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::adapters::GitHubApi;
use crate::domain::{Repository, WorkflowId, WorkflowReference};
use crate::error::Result;

use super::resolver::WorkflowResolver;

/// Outcome of dispatching to one branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchDispatch {
    pub branch: String,
    pub dispatched: bool,
    /// Failure reason when `dispatched` is false
    pub error: Option<String>,
}

impl BranchDispatch {
    /// `(dispatched, branch)` pair
    pub fn as_pair(&self) -> (bool, &str) {
        (self.dispatched, &self.branch)
    }
}

/// Dispatch `reference` once per open pull-request branch of `repo`.
///
/// Resolution and the branch query fail the whole call; individual
/// dispatches do not.
pub async fn fan_out(
    api: Arc<dyn GitHubApi>,
    repo: &Repository,
    reference: WorkflowReference,
    inputs: &HashMap<String, String>,
) -> Result<Vec<BranchDispatch>> {
    let workflow_id = WorkflowResolver::new(api.clone(), repo.clone(), reference)
        .resolve()
        .await?;

    let branches = api.open_pull_request_branches(repo).await?;
    info!(repository = %repo, count = branches.len(), "Found open pull request branches");

    Ok(dispatch_branches(api, repo, &workflow_id, branches, inputs).await)
}

/// Dispatch an already-resolved workflow to each branch concurrently.
/// Duplicate branch names are dispatched once; results keep input order.
pub async fn dispatch_branches(
    api: Arc<dyn GitHubApi>,
    repo: &Repository,
    workflow_id: &WorkflowId,
    branches: Vec<String>,
    inputs: &HashMap<String, String>,
) -> Vec<BranchDispatch> {
    let mut seen = HashSet::new();
    let branches: Vec<String> = branches
        .into_iter()
        .filter(|b| seen.insert(b.clone()))
        .collect();

    let handles: Vec<_> = branches
        .iter()
        .map(|branch| {
            let api = api.clone();
            let repo = repo.clone();
            let workflow_id = workflow_id.clone();
            let branch = branch.clone();
            let inputs = inputs.clone();
            tokio::spawn(async move {
                api.create_dispatch(&repo, &workflow_id, &branch, &inputs)
                    .await
            })
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for (branch, handle) in branches.into_iter().zip(handles) {
        let outcome = match handle.await {
            Ok(Ok(ack)) if ack.is_accepted() => Ok(()),
            Ok(Ok(ack)) => Err(format!("dispatch answered with status {}", ack.status)),
            Ok(Err(e)) => Err(e.to_string()),
            Err(e) => Err(format!("dispatch task failed: {}", e)),
        };

        let entry = match outcome {
            Ok(()) => {
                info!(%branch, "Workflow dispatched");
                BranchDispatch {
                    branch,
                    dispatched: true,
                    error: None,
                }
            }
            Err(reason) => {
                error!(%branch, error = %reason, "Workflow dispatch failed");
                BranchDispatch {
                    branch,
                    dispatched: false,
                    error: Some(reason),
                }
            }
        };
        results.push(entry);
    }

    results
}
