//! In-memory GitHub fake shared by the integration tests.
//!
//! Run timestamps are expressed relative to the moment the fake receives
//! a dispatch, so tests can place runs before or after the trigger.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use wfdispatch::adapters::GitHubApi;
use wfdispatch::domain::{
    Artifact, DispatchAck, Repository, Workflow, WorkflowId, WorkflowRun, WORKFLOW_DISPATCH_EVENT,
};
use wfdispatch::{Error, Result};

/// A run the fake will list, positioned relative to the last dispatch
#[derive(Debug, Clone)]
pub struct RunSpec {
    pub id: u64,
    pub offset_secs: i64,
    pub event: String,
    /// Successive (status, conclusion) answers of the run detail endpoint.
    /// The last entry repeats once the others are used up.
    pub details: VecDeque<(Option<String>, Option<String>)>,
}

impl RunSpec {
    pub fn dispatched(id: u64, offset_secs: i64) -> Self {
        Self {
            id,
            offset_secs,
            event: WORKFLOW_DISPATCH_EVENT.to_string(),
            details: VecDeque::from([(Some("queued".to_string()), None)]),
        }
    }

    pub fn with_event(mut self, event: &str) -> Self {
        self.event = event.to_string();
        self
    }

    pub fn with_details(mut self, details: &[(Option<&str>, Option<&str>)]) -> Self {
        self.details = details
            .iter()
            .map(|(s, c)| (s.map(String::from), c.map(String::from)))
            .collect();
        self
    }
}

/// A dispatch the fake received
#[derive(Debug, Clone)]
pub struct DispatchCall {
    pub workflow: WorkflowId,
    pub git_ref: String,
    pub inputs: HashMap<String, String>,
}

#[derive(Default)]
pub struct FakeGitHub {
    pub workflows: Mutex<Vec<Workflow>>,
    pub runs: Mutex<Vec<RunSpec>>,
    pub artifacts: Vec<Artifact>,
    pub branches: Vec<String>,
    pub failing_branches: HashSet<String>,
    pub dispatch_error_status: Option<u16>,
    pub runs_error_status: Option<u16>,
    pub graphql_error: Option<String>,
    /// Number of initial runs listings that come back empty
    pub hidden_listings: AtomicUsize,

    pub dispatches: Mutex<Vec<DispatchCall>>,
    pub dispatched_at: Mutex<Option<DateTime<Utc>>>,
    pub list_workflows_calls: AtomicUsize,
    pub list_runs_calls: AtomicUsize,
    pub get_run_calls: AtomicUsize,
}

pub fn repo() -> Repository {
    Repository::new("octo", "app")
}

pub fn workflow(id: u64, name: &str) -> Workflow {
    Workflow {
        id,
        name: name.to_string(),
        path: format!(".github/workflows/{}.yml", id),
        state: "active".to_string(),
    }
}

pub fn inputs(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl FakeGitHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workflows(self, workflows: Vec<Workflow>) -> Self {
        *self.workflows.lock().unwrap() = workflows;
        self
    }

    pub fn with_runs(self, runs: Vec<RunSpec>) -> Self {
        *self.runs.lock().unwrap() = runs;
        self
    }

    pub fn with_hidden_listings(self, count: usize) -> Self {
        self.hidden_listings.store(count, Ordering::SeqCst);
        self
    }

    pub fn list_workflows_calls(&self) -> usize {
        self.list_workflows_calls.load(Ordering::SeqCst)
    }

    pub fn list_runs_calls(&self) -> usize {
        self.list_runs_calls.load(Ordering::SeqCst)
    }

    pub fn get_run_calls(&self) -> usize {
        self.get_run_calls.load(Ordering::SeqCst)
    }

    pub fn dispatch_calls(&self) -> Vec<DispatchCall> {
        self.dispatches.lock().unwrap().clone()
    }

    fn base_time(&self) -> DateTime<Utc> {
        self.dispatched_at.lock().unwrap().unwrap_or_else(Utc::now)
    }

    fn materialize(&self, run: &RunSpec, details: Option<&(Option<String>, Option<String>)>) -> WorkflowRun {
        let (status, conclusion) = details.cloned().unwrap_or((None, None));
        WorkflowRun {
            id: run.id,
            name: Some("Build & Deploy".to_string()),
            event: run.event.clone(),
            created_at: self.base_time() + Duration::seconds(run.offset_secs),
            status,
            conclusion,
            html_url: format!("https://github.com/octo/app/actions/runs/{}", run.id),
            head_branch: Some("main".to_string()),
        }
    }
}

#[async_trait]
impl GitHubApi for FakeGitHub {
    async fn create_dispatch(
        &self,
        _repo: &Repository,
        workflow: &WorkflowId,
        git_ref: &str,
        inputs: &HashMap<String, String>,
    ) -> Result<DispatchAck> {
        self.dispatches.lock().unwrap().push(DispatchCall {
            workflow: workflow.clone(),
            git_ref: git_ref.to_string(),
            inputs: inputs.clone(),
        });

        if let Some(status) = self.dispatch_error_status {
            return Err(Error::Http {
                status,
                message: "Unexpected inputs provided".to_string(),
            });
        }
        if self.failing_branches.contains(git_ref) {
            return Err(Error::Http {
                status: 422,
                message: format!("No ref found for: {}", git_ref),
            });
        }

        *self.dispatched_at.lock().unwrap() = Some(Utc::now());
        Ok(DispatchAck { status: 204 })
    }

    async fn list_workflows(&self, _repo: &Repository) -> Result<Vec<Workflow>> {
        self.list_workflows_calls.fetch_add(1, Ordering::SeqCst);
        // Give concurrent callers a chance to interleave
        tokio::task::yield_now().await;
        Ok(self.workflows.lock().unwrap().clone())
    }

    async fn list_workflow_runs(
        &self,
        _repo: &Repository,
        _workflow: &WorkflowId,
        _event: &str,
    ) -> Result<Vec<WorkflowRun>> {
        self.list_runs_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;

        if let Some(status) = self.runs_error_status {
            return Err(Error::Http {
                status,
                message: "Server Error".to_string(),
            });
        }

        let hidden = self.hidden_listings.load(Ordering::SeqCst);
        if hidden > 0 {
            self.hidden_listings.store(hidden - 1, Ordering::SeqCst);
            return Ok(Vec::new());
        }

        let runs = self.runs.lock().unwrap();
        Ok(runs
            .iter()
            .map(|run| self.materialize(run, run.details.front()))
            .collect())
    }

    async fn get_workflow_run(&self, _repo: &Repository, run_id: u64) -> Result<WorkflowRun> {
        self.get_run_calls.fetch_add(1, Ordering::SeqCst);

        let mut runs = self.runs.lock().unwrap();
        let run = runs
            .iter_mut()
            .find(|run| run.id == run_id)
            .ok_or_else(|| Error::Http {
                status: 404,
                message: "Not Found".to_string(),
            })?;

        let details = if run.details.len() > 1 {
            run.details.pop_front()
        } else {
            run.details.front().cloned()
        };
        let run = run.clone();
        drop(runs);

        Ok(self.materialize(&run, details.as_ref()))
    }

    async fn list_run_artifacts(&self, _repo: &Repository, _run_id: u64) -> Result<Vec<Artifact>> {
        Ok(self.artifacts.clone())
    }

    async fn open_pull_request_branches(&self, _repo: &Repository) -> Result<Vec<String>> {
        if let Some(ref message) = self.graphql_error {
            return Err(Error::GraphQl(message.clone()));
        }
        Ok(self.branches.clone())
    }
}
