//! Dispatch and run correlation logic.
//!
//! This module contains:
//! - WorkflowResolver: workflow reference -> API workflow id
//! - WorkflowHandler: trigger, correlate, status and artifact queries
//! - RetryPolicy: backoff while a dispatched run is not yet listed
//! - fan_out: dispatch-and-forget across open pull-request branches
//! - watch: caller-side polling until a run completes

pub mod fanout;
pub mod handler;
pub mod resolver;
pub mod retry;
pub mod watch;

// Re-export commonly used types
pub use fanout::{dispatch_branches, fan_out, BranchDispatch};
pub use handler::WorkflowHandler;
pub use resolver::WorkflowResolver;
pub use retry::RetryPolicy;
pub use watch::{format_duration, parse_duration, wait_for_completion, WaitOutcome, WaitSettings};
