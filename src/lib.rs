//! wfdispatch - trigger GitHub Actions workflows and track their runs
//!
//! The `workflow_dispatch` endpoint accepts a dispatch but returns no run
//! identifier. wfdispatch records the trigger instant, then finds the run
//! the dispatch produced by listing the workflow's `workflow_dispatch`
//! runs and picking the newest one created since that instant.
//!
//! # Modules
//!
//! - `adapters`: GitHub REST/GraphQL access behind the `GitHubApi` trait
//! - `core`: Resolution, dispatch, correlation, fan-out and polling
//! - `domain`: Data structures (Workflow, WorkflowRun, Artifact)
//! - `config`: Flag/env/file configuration
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Dispatch and wait for the run to finish
//! wfdispatch run --repo octo/app --workflow release.yml --ref main \
//!     --inputs '{"release":"1.0.0"}' --wait
//!
//! # Dispatch to every open pull request branch
//! wfdispatch fan-out --repo octo/app --workflow ci.yml
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod error;

// Re-export main types at crate root for convenience
pub use adapters::{GitHubApi, GitHubClient};
pub use crate::core::{fan_out, wait_for_completion, RetryPolicy, WorkflowHandler, WorkflowResolver};
pub use domain::{
    ArtifactState, ArtifactSummary, DispatchAck, Repository, RunConclusion, RunResult, RunStatus,
    WorkflowId, WorkflowReference,
};
pub use error::{Error, ErrorKind, Result};
