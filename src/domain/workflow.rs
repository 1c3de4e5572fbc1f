//! Workflow references and the identifiers the Actions API accepts.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What the user typed to name a workflow: a numeric id, a definition
/// filename (`release.yml`) or a display name (`Build & Deploy`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowReference(String);

impl WorkflowReference {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the reference looks like `<something>.yml` or
    /// `<something>.yaml`. The API takes filenames as workflow ids directly.
    pub fn is_filename(&self) -> bool {
        self.0
            .strip_suffix(".yml")
            .or_else(|| self.0.strip_suffix(".yaml"))
            .map(|stem| !stem.is_empty())
            .unwrap_or(false)
    }

    /// Whether a listed workflow is the one this reference names
    pub fn matches(&self, workflow: &Workflow) -> bool {
        workflow.name == self.0 || workflow.id.to_string() == self.0
    }
}

impl fmt::Display for WorkflowReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkflowReference {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for WorkflowReference {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Canonical workflow identifier used in dispatch and list URLs
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WorkflowId {
    Numeric(u64),
    Filename(String),
}

impl fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(id) => write!(f, "{}", id),
            Self::Filename(name) => f.write_str(name),
        }
    }
}

/// A workflow definition as listed by `GET /repos/{owner}/{repo}/actions/workflows`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub state: String,
}

/// Find the first listed workflow a reference names
pub fn find_workflow<'a>(
    workflows: &'a [Workflow],
    reference: &WorkflowReference,
) -> Option<&'a Workflow> {
    workflows.iter().find(|w| reference.matches(w))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workflow(id: u64, name: &str) -> Workflow {
        Workflow {
            id,
            name: name.to_string(),
            path: format!(".github/workflows/{}.yml", id),
            state: "active".to_string(),
        }
    }

    #[test]
    fn test_filename_classification() {
        assert!(WorkflowReference::new("release.yml").is_filename());
        assert!(WorkflowReference::new("ci.yaml").is_filename());
        assert!(WorkflowReference::new("a.yml").is_filename());

        assert!(!WorkflowReference::new(".yml").is_filename());
        assert!(!WorkflowReference::new("yml").is_filename());
        assert!(!WorkflowReference::new("Build & Deploy").is_filename());
        assert!(!WorkflowReference::new("42").is_filename());
        assert!(!WorkflowReference::new("release.YML").is_filename());
    }

    #[test]
    fn test_find_by_name_or_id() {
        let workflows = vec![workflow(7, "Lint"), workflow(42, "Build & Deploy")];

        let by_name = find_workflow(&workflows, &"Build & Deploy".into()).unwrap();
        assert_eq!(by_name.id, 42);

        let by_id = find_workflow(&workflows, &"7".into()).unwrap();
        assert_eq!(by_id.name, "Lint");

        assert!(find_workflow(&workflows, &"Release".into()).is_none());
    }

    #[test]
    fn test_first_match_wins() {
        let workflows = vec![workflow(1, "Deploy"), workflow(2, "Deploy")];
        assert_eq!(find_workflow(&workflows, &"Deploy".into()).unwrap().id, 1);
    }

    #[test]
    fn test_workflow_id_display() {
        assert_eq!(WorkflowId::Numeric(42).to_string(), "42");
        assert_eq!(
            WorkflowId::Filename("release.yml".to_string()).to_string(),
            "release.yml"
        );
    }
}
