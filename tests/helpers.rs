//! Test utilities for prefetch

#![allow(dead_code)]

use async_trait::async_trait;
use prefetch::core::{Credential, PrefetchInputs, RunContext, Stage};
use prefetch::execution::{CommandError, CommandRunner, PrefetchEngine};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Barrier;
use tokio_util::sync::CancellationToken;

/// Command runner that records invocations instead of running them
///
/// Clones share their recorded calls, so a test can keep a clone while the
/// engine owns another.
#[derive(Clone, Default)]
pub struct MockRunner {
    calls: Arc<Mutex<Vec<Vec<String>>>>,
    failing_pulls: Arc<HashSet<String>>,
    failing_logins: Arc<HashSet<String>>,
    pull_barrier: Option<Arc<Barrier>>,
    delay: Option<Duration>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make pulls of these images fail
    pub fn failing_pulls(mut self, images: &[&str]) -> Self {
        self.failing_pulls = Arc::new(images.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Make logins with these usernames fail
    pub fn failing_logins(mut self, usernames: &[&str]) -> Self {
        self.failing_logins = Arc::new(usernames.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Block every pull until `count` pulls are in flight at once
    pub fn with_pull_barrier(mut self, count: usize) -> Self {
        self.pull_barrier = Some(Arc::new(Barrier::new(count)));
        self
    }

    /// Add artificial delay to every command
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every recorded invocation, program first
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    /// Images pulled, in invocation order
    pub fn pulls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.get(1).map(String::as_str) == Some("pull"))
            .filter_map(|c| c.get(2).cloned())
            .collect()
    }

    /// Full argument lists of the login invocations, program excluded
    pub fn logins(&self) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter(|c| c.get(1).map(String::as_str) == Some("login"))
            .map(|c| c[1..].to_vec())
            .collect()
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn run(
        &self,
        cancel: &CancellationToken,
        program: &str,
        args: &[String],
    ) -> Result<(), CommandError> {
        let mut call = vec![program.to_string()];
        call.extend(args.iter().cloned());
        self.calls.lock().unwrap().push(call);

        let subcommand = args.first().cloned().unwrap_or_default();
        let command = format!("{} {}", program, subcommand);

        if cancel.is_cancelled() {
            return Err(CommandError::Cancelled { command });
        }

        if subcommand == "pull" {
            if let Some(barrier) = &self.pull_barrier {
                barrier.wait().await;
            }
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let failed = match subcommand.as_str() {
            "pull" => args.get(1).is_some_and(|image| self.failing_pulls.contains(image)),
            "login" => args.get(2).is_some_and(|user| self.failing_logins.contains(user)),
            _ => false,
        };

        if failed {
            Err(CommandError::Failed {
                command,
                code: Some(1),
            })
        } else {
            Ok(())
        }
    }
}

/// Stage that always runs
pub fn stage(name: &str, image: &str) -> Stage {
    Stage::new(name, image, "status == 'succeeded'")
}

/// Context of a successful build on main
pub fn main_context() -> RunContext {
    RunContext::new()
        .with_branch("main")
        .with_trigger("git")
        .with_status("succeeded")
}

pub fn inputs(stages: Vec<Stage>, credentials: Vec<Credential>) -> PrefetchInputs {
    PrefetchInputs {
        stages,
        credentials,
    }
}

/// Engine backed by a mock runner, plus a handle to inspect it
pub fn mock_engine(runner: MockRunner) -> (PrefetchEngine<MockRunner>, MockRunner) {
    let handle = runner.clone();
    (PrefetchEngine::new(runner, "docker"), handle)
}
