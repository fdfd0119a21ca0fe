//! Parallel image pulls

use crate::execution::{runner::describe, CommandError, CommandRunner, PullBatch, PullOutcome};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Arguments of a `pull` invocation
pub fn pull_args(image: &str) -> Vec<String> {
    vec!["pull".to_string(), image.to_string()]
}

/// Pulls a set of images concurrently
pub struct ParallelPrefetcher<R> {
    runner: Arc<R>,
    program: String,
}

impl<R: CommandRunner + 'static> ParallelPrefetcher<R> {
    pub fn new(runner: Arc<R>, program: impl Into<String>) -> Self {
        Self {
            runner,
            program: program.into(),
        }
    }

    /// Pull every image in its own task and wait for all of them
    ///
    /// A failed pull is logged and recorded; it never stops the others.
    /// Images are expected to be distinct.
    pub async fn prefetch(&self, cancel: &CancellationToken, images: &[String]) -> PullBatch {
        let start = Instant::now();

        let handles: Vec<_> = images
            .iter()
            .map(|image| {
                let runner = Arc::clone(&self.runner);
                let cancel = cancel.clone();
                let program = self.program.clone();
                let task_image = image.clone();

                let handle = tokio::spawn(async move {
                    info!(image = %task_image, "Pulling container image {}", task_image);
                    runner.run(&cancel, &program, &pull_args(&task_image)).await
                });

                (image.clone(), handle)
            })
            .collect();

        // Barrier: every task is awaited, finished or failed
        let mut outcomes = Vec::with_capacity(handles.len());
        for (image, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(CommandError::Aborted {
                    command: describe(&self.program, &pull_args(&image)),
                    message: e.to_string(),
                }),
            };

            match &result {
                Ok(()) => debug!(image = %image, "Pulled container image"),
                Err(e) => warn!(image = %image, error = %e, "Failed pulling container image {}", image),
            }

            outcomes.push(PullOutcome { image, result });
        }

        PullBatch {
            outcomes,
            elapsed: start.elapsed(),
        }
    }
}
