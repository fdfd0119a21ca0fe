//! Errors and results of logins and pulls

use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Error running a single external command
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} exited with {}", exit_description(.code))]
    Failed { command: String, code: Option<i32> },

    #[error("{command} was cancelled")]
    Cancelled { command: String },

    #[error("{command} task aborted: {message}")]
    Aborted { command: String, message: String },
}

fn exit_description(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

/// Error that stops a prefetch run
#[derive(Debug, Error)]
pub enum PrefetchError {
    #[error("failed to log in to repository '{repository}': {source}")]
    Login {
        repository: String,
        #[source]
        source: CommandError,
    },
}

/// Result of pulling one image
#[derive(Debug)]
pub struct PullOutcome {
    pub image: String,
    pub result: Result<(), CommandError>,
}

impl PullOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// All pulls of one batch, in the order the images were given
#[derive(Debug, Default)]
pub struct PullBatch {
    pub outcomes: Vec<PullOutcome>,

    /// Wall-clock time from first launch to last completion
    pub elapsed: Duration,
}

impl PullBatch {
    pub fn succeeded(&self) -> impl Iterator<Item = &PullOutcome> {
        self.outcomes.iter().filter(|o| o.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &PullOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }
}

/// Summary of a completed prefetch run
#[derive(Debug)]
pub struct PrefetchReport {
    /// Unique run ID, also attached to every log line of the run
    pub run_id: Uuid,

    pub started_at: DateTime<Utc>,

    /// Total run time, selection and logins included
    pub elapsed: Duration,

    /// Number of registries logged in to
    pub logins: usize,

    pub pulls: PullBatch,
}

impl PrefetchReport {
    /// Number of distinct images prefetched
    pub fn image_count(&self) -> usize {
        self.pulls.outcomes.len()
    }

    pub fn failed_count(&self) -> usize {
        self.pulls.failed().count()
    }
}
