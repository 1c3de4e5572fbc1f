//! Artifacts uploaded by a workflow run.
//!
//! An artifact is retrievable until its expiry deadline, so its state is
//! the two-valued `active`/`expired` rather than a run lifecycle status.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An artifact as listed by `GET /repos/{owner}/{repo}/actions/runs/{id}/artifacts`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub id: u64,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub archive_download_url: String,

    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub expired: bool,
}

/// Retention state of an artifact at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactState {
    Active,
    Expired,
}

impl ArtifactState {
    /// Expired when the API says so or the deadline is not in the future
    pub fn at(artifact: &Artifact, now: DateTime<Utc>) -> Self {
        match artifact.expires_at {
            _ if artifact.expired => Self::Expired,
            Some(deadline) if deadline <= now => Self::Expired,
            _ => Self::Active,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for ArtifactState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Summary returned to callers of `list_artifacts`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactSummary {
    pub name: String,

    /// Archive download URL
    pub url: String,

    pub state: ArtifactState,

    pub expires_at: Option<DateTime<Utc>>,
}

impl ArtifactSummary {
    pub fn from_artifact(artifact: &Artifact, now: DateTime<Utc>) -> Self {
        Self {
            name: artifact.name.clone(),
            url: artifact.archive_download_url.clone(),
            state: ArtifactState::at(artifact, now),
            expires_at: artifact.expires_at,
        }
    }
}
