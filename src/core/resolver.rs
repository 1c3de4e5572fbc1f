//! Workflow identifier resolution.
//!
//! Filenames are accepted by the API as-is. Names and numeric ids are
//! looked up in the repository's workflow listing once, then cached.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::adapters::GitHubApi;
use crate::domain::{find_workflow, Repository, WorkflowId, WorkflowReference};
use crate::error::{Error, Result};

/// Resolves one workflow reference against one repository
pub struct WorkflowResolver {
    api: Arc<dyn GitHubApi>,
    repo: Repository,
    reference: WorkflowReference,
    /// Set once on first successful resolution
    resolved: OnceCell<WorkflowId>,
}

impl WorkflowResolver {
    pub fn new(api: Arc<dyn GitHubApi>, repo: Repository, reference: WorkflowReference) -> Self {
        Self {
            api,
            repo,
            reference,
            resolved: OnceCell::new(),
        }
    }

    pub fn reference(&self) -> &WorkflowReference {
        &self.reference
    }

    /// Cached id, if resolution already happened
    pub fn cached(&self) -> Option<&WorkflowId> {
        self.resolved.get()
    }

    /// Resolve the reference to the id the dispatch and runs APIs accept.
    ///
    /// Concurrent callers share a single lookup. A failed lookup is not
    /// cached.
    pub async fn resolve(&self) -> Result<WorkflowId> {
        self.resolved
            .get_or_try_init(|| self.lookup())
            .await
            .cloned()
    }

    async fn lookup(&self) -> Result<WorkflowId> {
        if self.reference.is_filename() {
            debug!(workflow = %self.reference, "Workflow reference is a filename");
            return Ok(WorkflowId::Filename(self.reference.as_str().to_string()));
        }

        let workflows = self.api.list_workflows(&self.repo).await?;
        debug!(
            repository = %self.repo,
            count = workflows.len(),
            workflows = %serde_json::to_string(&workflows).unwrap_or_default(),
            "Listed workflows"
        );

        let workflow = find_workflow(&workflows, &self.reference).ok_or_else(|| {
            Error::WorkflowNotFound {
                reference: self.reference.to_string(),
                repository: self.repo.clone(),
            }
        })?;

        info!(workflow = %self.reference, workflow_id = workflow.id, "Resolved workflow id");
        Ok(WorkflowId::Numeric(workflow.id))
    }
}
