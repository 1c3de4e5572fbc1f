//! Error type shared by the transport and the correlation core.
//!
//! Every variant belongs to one of three kinds:
//! - Transport: the remote call failed (network, auth, rate limit, 4xx/5xx)
//! - NotFound: a workflow or a correlated run could not be located
//! - Precondition: an operation was called out of order

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{Repository, WorkflowId};

/// Result alias used across the library
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised while dispatching or tracking a workflow run
#[derive(Debug, Error)]
pub enum Error {
    #[error("GitHub API returned {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Request to GitHub failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("GraphQL query failed: {0}")]
    GraphQl(String),

    #[error("Unable to find workflow '{reference}' in {repository}")]
    WorkflowNotFound {
        reference: String,
        repository: Repository,
    },

    #[error("Run not found for workflow {workflow} (no workflow_dispatch run created since {triggered_at})")]
    RunNotFound {
        workflow: WorkflowId,
        triggered_at: DateTime<Utc>,
    },

    #[error("Run not found: the workflow has not been triggered yet")]
    NotTriggered,
}

/// Coarse classification of [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    NotFound,
    Precondition,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Http { .. } | Self::Request(_) | Self::GraphQl(_) => ErrorKind::Transport,
            Self::WorkflowNotFound { .. } | Self::RunNotFound { .. } => ErrorKind::NotFound,
            Self::NotTriggered => ErrorKind::Precondition,
        }
    }

    /// HTTP status code of a failed remote call, if the server answered
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// True for a correlation miss that may resolve itself once the run
    /// shows up in the listing API
    pub fn is_run_not_found(&self) -> bool {
        matches!(self, Self::RunNotFound { .. })
    }
}
