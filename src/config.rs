//! Configuration for wfdispatch.
//!
//! Configuration sources (highest priority first):
//! 1. Command-line flags
//! 2. Environment variables (GITHUB_TOKEN, GITHUB_REPOSITORY, GITHUB_REF, ...)
//! 3. Config file (.wfdispatch/config.yaml)
//!
//! Config file discovery:
//! - Searches current directory and parents for .wfdispatch/config.yaml
//! - Falls back to <user config dir>/wfdispatch/config.yaml
//!
//! The token, repository, workflow and ref have no built-in defaults. The
//! token is only ever read from a flag or the environment, never a file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::adapters::DEFAULT_API_URL;
use crate::core::{parse_duration, RetryPolicy, WaitSettings};
use crate::domain::{Repository, WorkflowReference};

const CONFIG_DIR: &str = ".wfdispatch";
const CONFIG_FILE: &str = "config.yaml";
const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;
const PULL_REQUEST_REF_PREFIX: &str = "refs/pull/";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub repository: Option<Repository>,
    pub workflow: Option<String>,
    #[serde(rename = "ref")]
    pub git_ref: Option<String>,
    pub api_url: Option<String>,
    /// Dispatch inputs; values must be strings
    #[serde(default)]
    pub inputs: HashMap<String, String>,
    pub request_timeout_seconds: Option<u64>,
    pub correlation: Option<RetryPolicy>,
    pub wait: Option<WaitConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WaitConfig {
    /// Polling interval, e.g. "30s"
    pub interval: Option<String>,
    /// Overall timeout, e.g. "1h"
    pub timeout: Option<String>,
}

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub token: Option<String>,
    pub repository: Option<Repository>,
    pub workflow: Option<String>,
    pub git_ref: Option<String>,
    pub api_url: Option<String>,
    /// JSON object of string inputs
    pub inputs: Option<String>,
    pub wait_interval: Option<Duration>,
    pub wait_timeout: Option<Duration>,
}

/// Resolved configuration
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub token: String,
    pub repository: Repository,
    pub workflow: WorkflowReference,
    /// Ref to dispatch against; only the tracked `run` mode needs it
    pub git_ref: Option<String>,
    pub api_url: String,
    pub inputs: HashMap<String, String>,
    pub request_timeout: Duration,
    pub correlation: RetryPolicy,
    pub wait: WaitSettings,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl ResolvedConfig {
    /// The ref, or an error explaining how to set it
    pub fn require_ref(&self) -> Result<&str> {
        let git_ref = self
            .git_ref
            .as_deref()
            .context("Missing ref: pass --ref, set GITHUB_REF, or add `ref:` to the config file")?;

        // GITHUB_REF inside a pull_request job; the dispatch endpoint answers 422
        if git_ref.starts_with(PULL_REQUEST_REF_PREFIX) {
            anyhow::bail!(
                "Ref '{}' is a pull request merge ref and cannot be dispatched: pass --ref <branch> (e.g. --ref \"$GITHUB_HEAD_REF\")",
                git_ref
            );
        }

        Ok(git_ref)
    }

    /// Token with its value hidden, for display
    pub fn redacted_token(&self) -> String {
        format!("**** ({} chars)", self.token.len())
    }
}

/// Find config file by searching `start` and its parents
fn find_config_file_from(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_DIR).join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Find config file from the current directory, then the user config dir
pub fn find_config_file() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .and_then(|cwd| find_config_file_from(&cwd))
        .or_else(|| {
            dirs::config_dir()
                .map(|dir| dir.join("wfdispatch").join(CONFIG_FILE))
                .filter(|path| path.exists())
        })
}

/// Load and parse config file
pub fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse a JSON object of dispatch inputs. Every value must be a string.
pub fn parse_inputs(json: &str) -> Result<HashMap<String, String>> {
    let value: serde_json::Value =
        serde_json::from_str(json).context("Inputs must be a JSON object")?;

    let serde_json::Value::Object(map) = value else {
        anyhow::bail!("Inputs must be a JSON object, got: {}", json);
    };

    map.into_iter()
        .map(|(key, value)| match value {
            serde_json::Value::String(s) => Ok((key, s)),
            other => anyhow::bail!(
                "Input '{}' must be a string (got {}); quote it, e.g. \"{}\"",
                key,
                other,
                other
            ),
        })
        .collect()
}

/// Merge overrides with an optional config file
pub fn resolve(overrides: Overrides, file: Option<(PathBuf, ConfigFile)>) -> Result<ResolvedConfig> {
    let (config_file, file) = match file {
        Some((path, file)) => (Some(path), file),
        None => (None, ConfigFile::default()),
    };

    let token = overrides
        .token
        .filter(|t| !t.trim().is_empty())
        .context("Missing GitHub token: pass --token or set GITHUB_TOKEN")?;

    let repository = overrides
        .repository
        .or(file.repository)
        .context("Missing repository: pass --repo, set GITHUB_REPOSITORY, or add `repository:` to the config file")?;

    let workflow = overrides
        .workflow
        .or(file.workflow)
        .filter(|w| !w.trim().is_empty())
        .map(WorkflowReference::new)
        .context("Missing workflow: pass --workflow, set WFDISPATCH_WORKFLOW, or add `workflow:` to the config file")?;

    let git_ref = overrides.git_ref.or(file.git_ref);

    let api_url = overrides
        .api_url
        .or(file.api_url)
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());

    let mut inputs = file.inputs;
    if let Some(json) = overrides.inputs {
        inputs.extend(parse_inputs(&json)?);
    }

    let mut wait = WaitSettings::default();
    if let Some(ref wait_file) = file.wait {
        if let Some(ref interval) = wait_file.interval {
            wait.interval = parse_duration(interval).context("Invalid wait.interval in config file")?;
        }
        if let Some(ref timeout) = wait_file.timeout {
            wait.timeout = parse_duration(timeout).context("Invalid wait.timeout in config file")?;
        }
    }
    if let Some(interval) = overrides.wait_interval {
        wait.interval = interval;
    }
    if let Some(timeout) = overrides.wait_timeout {
        wait.timeout = timeout;
    }

    Ok(ResolvedConfig {
        token,
        repository,
        workflow,
        git_ref,
        api_url,
        inputs,
        request_timeout: Duration::from_secs(
            file.request_timeout_seconds
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECONDS),
        ),
        correlation: file.correlation.unwrap_or_default(),
        wait,
        config_file,
    })
}

/// Load configuration from all sources
pub fn load(overrides: Overrides) -> Result<ResolvedConfig> {
    let file = match find_config_file() {
        Some(path) => {
            let parsed = load_config_file(&path)?;
            Some((path, parsed))
        }
        None => None,
    };

    resolve(overrides, file)
}
