//! Dispatch a workflow and track the run the dispatch produced.
//!
//! The dispatch endpoint answers 204 with no body, so the run is found
//! afterwards by listing `workflow_dispatch` runs of the workflow and
//! taking the newest one created since the trigger instant.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

use crate::adapters::GitHubApi;
use crate::domain::{
    select_correlated_run, ArtifactSummary, DispatchAck, Repository, RunResult, WorkflowId,
    WorkflowReference, WORKFLOW_DISPATCH_EVENT,
};
use crate::error::{Error, Result};

use super::resolver::WorkflowResolver;
use super::retry::RetryPolicy;

/// Triggers one workflow on one ref and observes the resulting run
pub struct WorkflowHandler {
    api: Arc<dyn GitHubApi>,
    repo: Repository,
    git_ref: String,
    resolver: WorkflowResolver,
    /// Backoff applied while the dispatched run is not yet listed
    correlation: RetryPolicy,
    /// Instant captured right before the last dispatch request
    triggered_at: Mutex<Option<DateTime<Utc>>>,
    /// Correlated run id, set once
    run_id: OnceCell<u64>,
}

impl WorkflowHandler {
    pub fn new(
        api: Arc<dyn GitHubApi>,
        repo: Repository,
        reference: WorkflowReference,
        git_ref: impl Into<String>,
    ) -> Self {
        let resolver = WorkflowResolver::new(api.clone(), repo.clone(), reference);
        Self {
            api,
            repo,
            git_ref: git_ref.into(),
            resolver,
            correlation: RetryPolicy::default(),
            triggered_at: Mutex::new(None),
            run_id: OnceCell::new(),
        }
    }

    /// Replace the correlation backoff policy
    pub fn with_correlation_policy(mut self, policy: RetryPolicy) -> Self {
        self.correlation = policy;
        self
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    pub fn git_ref(&self) -> &str {
        &self.git_ref
    }

    pub fn reference(&self) -> &WorkflowReference {
        self.resolver.reference()
    }

    pub fn triggered_at(&self) -> Option<DateTime<Utc>> {
        *self.triggered_at.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Correlated run id, once known
    pub fn run_id(&self) -> Option<u64> {
        self.run_id.get().copied()
    }

    /// Resolve the workflow id (cached after the first call)
    pub async fn workflow_id(&self) -> Result<WorkflowId> {
        self.resolver.resolve().await
    }

    /// Dispatch the workflow. Every call sends exactly one dispatch request.
    #[instrument(skip(self, inputs), fields(repository = %self.repo, workflow = %self.reference(), git_ref = %self.git_ref))]
    pub async fn trigger(&self, inputs: &HashMap<String, String>) -> Result<DispatchAck> {
        let workflow_id = self.workflow_id().await?;

        // Captured before sending so the run's created_at is never earlier
        let now = Utc::now();
        *self.triggered_at.lock().unwrap_or_else(|e| e.into_inner()) = Some(now);

        let ack = self
            .api
            .create_dispatch(&self.repo, &workflow_id, &self.git_ref, inputs)
            .await
            .map_err(|e| {
                debug!(error = %e, "Workflow dispatch failed");
                e
            })?;

        info!(%workflow_id, status = ack.status, triggered_at = %now, "Workflow dispatched");
        Ok(ack)
    }

    /// Status, conclusion and URL of the correlated run
    #[instrument(skip(self), fields(repository = %self.repo, workflow = %self.reference()))]
    pub async fn get_status(&self) -> Result<RunResult> {
        let run_id = self.correlated_run_id().await?;
        let run = self.api.get_workflow_run(&self.repo, run_id).await?;
        debug!(
            run_id,
            run = %serde_json::to_string(&run).unwrap_or_default(),
            "Workflow run status"
        );

        Ok(run.to_result())
    }

    /// Artifacts uploaded by the correlated run
    #[instrument(skip(self), fields(repository = %self.repo, workflow = %self.reference()))]
    pub async fn list_artifacts(&self) -> Result<Vec<ArtifactSummary>> {
        let run_id = self.correlated_run_id().await?;
        let artifacts = self.api.list_run_artifacts(&self.repo, run_id).await?;
        debug!(run_id, count = artifacts.len(), "Workflow run artifacts");

        let now = Utc::now();
        Ok(artifacts
            .iter()
            .map(|a| ArtifactSummary::from_artifact(a, now))
            .collect())
    }

    /// Return the cached run id or correlate it (once, even under concurrent callers)
    async fn correlated_run_id(&self) -> Result<u64> {
        self.run_id
            .get_or_try_init(|| self.correlate_with_retry())
            .await
            .copied()
    }

    async fn correlate_with_retry(&self) -> Result<u64> {
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            match self.correlate_run().await {
                Ok(run_id) => return Ok(run_id),
                Err(e) if e.is_run_not_found() && self.correlation.should_retry(attempt) => {
                    let delay = self.correlation.delay_for_attempt(attempt);
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Dispatched run not listed yet, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// One correlation pass over the full runs listing
    async fn correlate_run(&self) -> Result<u64> {
        let triggered_at = self.triggered_at().ok_or(Error::NotTriggered)?;
        let workflow_id = self.workflow_id().await?;

        let runs = self
            .api
            .list_workflow_runs(&self.repo, &workflow_id, WORKFLOW_DISPATCH_EVENT)
            .await?;
        debug!(%workflow_id, count = runs.len(), %triggered_at, "Listed workflow runs");

        let run = select_correlated_run(&runs, triggered_at).ok_or(Error::RunNotFound {
            workflow: workflow_id.clone(),
            triggered_at,
        })?;

        info!(run_id = run.id, created_at = %run.created_at, url = %run.html_url, "Correlated workflow run");
        Ok(run.id)
    }
}
