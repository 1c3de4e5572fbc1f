//! Command-line interface for wfdispatch.
//!
//! Provides commands for dispatching a workflow and tracking its run,
//! dispatching to every open pull request branch, and showing the
//! resolved configuration.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use crate::adapters::{GitHubApi, GitHubClient};
use crate::config::{self, Overrides, ResolvedConfig};
use crate::core::{fan_out, format_duration, parse_duration, wait_for_completion, WaitOutcome, WorkflowHandler};
use crate::domain::Repository;
use crate::error::Error;

/// wfdispatch - Trigger GitHub Actions workflows and track their runs
#[derive(Parser, Debug)]
#[command(name = "wfdispatch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Where to dispatch and with which credentials
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// GitHub token with actions:write access
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Repository as owner/name
    #[arg(long = "repo", env = "GITHUB_REPOSITORY")]
    pub repository: Option<Repository>,

    /// Workflow id, filename (release.yml) or display name
    #[arg(short, long, env = "WFDISPATCH_WORKFLOW")]
    pub workflow: Option<String>,

    /// Branch or tag to run the workflow on.
    ///
    /// In a pull_request job GITHUB_REF is `refs/pull/N/merge`, which cannot
    /// be dispatched; pass the head branch (GITHUB_HEAD_REF) instead.
    #[arg(long = "ref", env = "GITHUB_REF")]
    pub git_ref: Option<String>,

    /// API base URL (GitHub Enterprise Server)
    #[arg(long, env = "GITHUB_API_URL")]
    pub api_url: Option<String>,

    /// Workflow inputs as a JSON object of strings
    #[arg(short, long)]
    pub inputs: Option<String>,
}

impl TargetArgs {
    fn into_overrides(self) -> Overrides {
        Overrides {
            token: self.token,
            repository: self.repository,
            workflow: self.workflow,
            git_ref: self.git_ref,
            api_url: self.api_url,
            inputs: self.inputs,
            ..Default::default()
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Dispatch a workflow and optionally follow the run it produced
    Run {
        #[command(flatten)]
        target: TargetArgs,

        /// Print the URL of the triggered run
        #[arg(long)]
        display_url: bool,

        /// Wait for the run to complete and fail unless it succeeded
        #[arg(long)]
        wait: bool,

        /// Polling interval while waiting (e.g. 30s, 1m)
        #[arg(long, value_parser = parse_duration)]
        wait_interval: Option<Duration>,

        /// Give up waiting after this long (e.g. 10m, 1h)
        #[arg(long, value_parser = parse_duration)]
        wait_timeout: Option<Duration>,
    },

    /// Dispatch a workflow once per open pull request branch
    FanOut {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Show resolved configuration (debug)
    Config {
        #[command(flatten)]
        target: TargetArgs,
    },
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let result = match self.command {
            Commands::Run {
                target,
                display_url,
                wait,
                wait_interval,
                wait_timeout,
            } => {
                let overrides = Overrides {
                    wait_interval,
                    wait_timeout,
                    ..target.into_overrides()
                };
                run_workflow(overrides, display_url, wait).await
            }
            Commands::FanOut { target } => {
                fan_out_branches(target.into_overrides()).await
            }
            Commands::Config { target } => {
                show_config(target.into_overrides())
            }
        };

        result.map_err(explain_failure)
    }
}

/// Call out HTTP 4xx/5xx answers as an access problem
fn explain_failure(err: anyhow::Error) -> anyhow::Error {
    let status = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<Error>())
        .and_then(Error::http_status);

    match status {
        Some(status) if status >= 400 => err.context(format!(
            "GitHub answered HTTP {}: check that the repository exists and the token can access it",
            status
        )),
        _ => err,
    }
}

fn build_client(config: &ResolvedConfig) -> Result<Arc<dyn GitHubApi>> {
    let client = GitHubClient::with_options(&config.token, &config.api_url, config.request_timeout)
        .context("Failed to build GitHub client")?;
    Ok(Arc::new(client))
}

/// Dispatch, then optionally print the run URL and wait for completion
async fn run_workflow(overrides: Overrides, display_url: bool, wait: bool) -> Result<()> {
    let config = config::load(overrides)?;
    let git_ref = config.require_ref()?.to_string();
    let api = build_client(&config)?;

    let handler = WorkflowHandler::new(
        api,
        config.repository.clone(),
        config.workflow.clone(),
        git_ref,
    )
    .with_correlation_policy(config.correlation.clone());

    eprintln!(
        "🚀 Dispatching '{}' on {} ({})",
        config.workflow,
        config.repository,
        handler.git_ref()
    );
    let ack = handler
        .trigger(&config.inputs)
        .await
        .context("Workflow dispatch failed")?;
    if ack.is_accepted() {
        eprintln!("Workflow dispatch successful");
    }

    if display_url || wait {
        let status = handler
            .get_status()
            .await
            .context("Could not find the dispatched run")?;
        println!("{}", status.url);
    }

    if !wait {
        return Ok(());
    }

    eprintln!(
        "⏳ Waiting for completion (every {}, up to {})",
        format_duration(config.wait.interval),
        format_duration(config.wait.timeout)
    );
    let outcome = wait_for_completion(&handler, &config.wait).await?;

    match outcome {
        WaitOutcome::Completed { result, elapsed } => {
            eprintln!(
                "Run completed in {} with conclusion: {}",
                format_duration(elapsed),
                result.conclusion
            );

            let artifacts = handler.list_artifacts().await?;
            for artifact in &artifacts {
                println!("{:<30} {:<8} {}", artifact.name, artifact.state, artifact.url);
            }

            if !result.conclusion.is_success() {
                anyhow::bail!(
                    "Workflow run finished with conclusion '{}': {}",
                    result.conclusion,
                    result.url
                );
            }
            Ok(())
        }
        WaitOutcome::TimedOut { last, elapsed } => {
            anyhow::bail!(
                "Timed out after {} waiting for {} (last status: {})",
                format_duration(elapsed),
                last.url,
                last.status
            )
        }
    }
}

/// Dispatch to every open pull request branch and report each outcome
async fn fan_out_branches(overrides: Overrides) -> Result<()> {
    let config = config::load(overrides)?;
    let api = build_client(&config)?;

    eprintln!(
        "🚀 Dispatching '{}' to open pull request branches of {}",
        config.workflow, config.repository
    );
    let results = fan_out(api, &config.repository, config.workflow.clone(), &config.inputs).await?;

    if results.is_empty() {
        println!("No open pull requests");
        return Ok(());
    }

    for entry in &results {
        let (dispatched, branch) = entry.as_pair();
        match &entry.error {
            Some(reason) => println!("[{}, \"{}\"]  {}", dispatched, branch, reason),
            None => println!("[{}, \"{}\"]", dispatched, branch),
        }
    }

    let succeeded = results.iter().filter(|r| r.dispatched).count();
    eprintln!("\n{}/{} branches dispatched", succeeded, results.len());

    Ok(())
}

/// Show the resolved configuration (for debugging)
fn show_config(overrides: Overrides) -> Result<()> {
    let cfg = config::load(overrides)?;

    println!("Config file: {}", cfg.config_file.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "(none)".to_string()));
    println!();
    println!("Target:");
    println!("  Repository: {}", cfg.repository);
    println!("  Workflow:   {}{}", cfg.workflow, if cfg.workflow.is_filename() { " (filename)" } else { "" });
    println!("  Ref:        {}", cfg.git_ref.as_deref().unwrap_or("(unset)"));
    println!("  API:        {}", cfg.api_url);
    println!("  Token:      {}", cfg.redacted_token());
    println!();
    println!("Inputs:");
    if cfg.inputs.is_empty() {
        println!("  (none)");
    } else {
        let mut keys: Vec<&String> = cfg.inputs.keys().collect();
        keys.sort();
        for key in keys {
            println!("  {}: {}", key, cfg.inputs[key]);
        }
    }
    println!();
    println!("Correlation retry:");
    println!("  Max attempts:  {}", cfg.correlation.max_attempts);
    println!("  Initial delay: {}ms", cfg.correlation.initial_delay_ms);
    println!("  Max delay:     {}ms", cfg.correlation.max_delay_ms);
    println!("  Gives up after {}", format_duration(cfg.correlation.worst_case_wait()));
    println!();
    println!("Wait:");
    println!("  Interval: {}", format_duration(cfg.wait.interval));
    println!("  Timeout:  {}", format_duration(cfg.wait.timeout));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_command() {
        let cli = Cli::try_parse_from([
            "wfdispatch",
            "run",
            "--token",
            "t",
            "--repo",
            "octo/app",
            "--workflow",
            "Build & Deploy",
            "--ref",
            "main",
            "--inputs",
            r#"{"release":"1.0.0"}"#,
            "--wait",
            "--wait-timeout",
            "10m",
        ])
        .unwrap();

        match cli.command {
            Commands::Run {
                target,
                wait,
                wait_timeout,
                display_url,
                ..
            } => {
                assert_eq!(target.repository, Some(Repository::new("octo", "app")));
                assert_eq!(target.workflow.as_deref(), Some("Build & Deploy"));
                assert!(wait);
                assert!(!display_url);
                assert_eq!(wait_timeout, Some(Duration::from_secs(600)));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_bad_repository_and_duration() {
        assert!(Cli::try_parse_from(["wfdispatch", "fan-out", "--repo", "no-slash"]).is_err());
        assert!(Cli::try_parse_from(["wfdispatch", "run", "--wait-timeout", "10d"]).is_err());
    }

    #[test]
    fn test_http_errors_get_access_hint() {
        let err = anyhow::Error::new(Error::Http {
            status: 404,
            message: "Not Found".to_string(),
        })
        .context("Workflow dispatch failed");

        let explained = explain_failure(err);
        assert!(explained.to_string().contains("token can access it"));

        let other = explain_failure(anyhow::Error::new(Error::NotTriggered));
        assert!(!other.to_string().contains("token can access it"));
    }
}
