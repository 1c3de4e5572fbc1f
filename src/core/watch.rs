//! Caller-side polling until the correlated run completes.
//!
//! The handler never polls on its own; this helper calls `get_status` on
//! a fixed interval and gives up after a timeout.

use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use tracing::{debug, info};

use crate::domain::RunResult;
use crate::error::Result;

use super::handler::WorkflowHandler;

/// Polling interval and overall timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitSettings {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            timeout: Duration::from_secs(60 * 60),
        }
    }
}

/// How waiting ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Run reached `completed`
    Completed { result: RunResult, elapsed: Duration },
    /// Timeout elapsed first; carries the last observed status
    TimedOut { last: RunResult, elapsed: Duration },
}

impl WaitOutcome {
    pub fn result(&self) -> &RunResult {
        match self {
            Self::Completed { result, .. } => result,
            Self::TimedOut { last, .. } => last,
        }
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            Self::Completed { elapsed, .. } | Self::TimedOut { elapsed, .. } => *elapsed,
        }
    }
}

/// Poll the handler's run until it completes or `settings.timeout` passes
pub async fn wait_for_completion(
    handler: &WorkflowHandler,
    settings: &WaitSettings,
) -> Result<WaitOutcome> {
    let start = Instant::now();

    loop {
        let result = handler.get_status().await?;
        let elapsed = start.elapsed();
        debug!(status = %result.status, conclusion = %result.conclusion, ?elapsed, "Polled run status");

        if result.status.is_completed() {
            info!(conclusion = %result.conclusion, elapsed = %format_duration(elapsed), "Workflow run completed");
            return Ok(WaitOutcome::Completed { result, elapsed });
        }

        if elapsed >= settings.timeout {
            info!(status = %result.status, elapsed = %format_duration(elapsed), "Gave up waiting for workflow run");
            return Ok(WaitOutcome::TimedOut {
                last: result,
                elapsed,
            });
        }

        // Never sleep past the deadline
        let remaining = settings.timeout - elapsed;
        tokio::time::sleep(settings.interval.min(remaining)).await;
    }
}

/// Parse a duration such as `30s`, `5m` or `1.5h`
pub fn parse_duration(text: &str) -> anyhow::Result<Duration> {
    let text = text.trim();
    let Some(unit) = text.chars().last() else {
        bail!("Empty duration");
    };

    let seconds_per_unit = match unit.to_ascii_lowercase() {
        's' => 1.0,
        'm' => 60.0,
        'h' => 3600.0,
        _ => bail!("Unknown time unit '{}' in duration '{}'", unit, text),
    };

    let magnitude: f64 = text[..text.len() - unit.len_utf8()]
        .trim()
        .parse()
        .with_context(|| format!("Invalid duration '{}'", text))?;

    Duration::try_from_secs_f64(magnitude * seconds_per_unit)
        .with_context(|| format!("Duration out of range: '{}'", text))
}

/// Render a duration as `00h 01m 05s`
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{:02}h {:02}m {:02}s", hours, minutes, seconds)
}
