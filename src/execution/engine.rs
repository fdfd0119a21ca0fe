//! Prefetch engine - orchestrates selection, logins and pulls of a run

use crate::{
    core::{container_images, resolve_credentials, select_stages, PrefetchInputs, RunContext},
    execution::{
        CommandRunner, ParallelPrefetcher, PrefetchError, PrefetchReport, RegistryAuthenticator,
    },
};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

/// Default binary used for logins and pulls
pub const DEFAULT_PROGRAM: &str = "docker";

/// Runs a complete prefetch: select stages, log in, pull
pub struct PrefetchEngine<R> {
    authenticator: RegistryAuthenticator<R>,
    prefetcher: ParallelPrefetcher<R>,
}

impl<R: CommandRunner + 'static> PrefetchEngine<R> {
    /// Create an engine issuing `login` and `pull` through `program`
    pub fn new(runner: R, program: impl Into<String>) -> Self {
        let runner = Arc::new(runner);
        let program = program.into();

        Self {
            authenticator: RegistryAuthenticator::new(Arc::clone(&runner), program.clone()),
            prefetcher: ParallelPrefetcher::new(runner, program),
        }
    }

    /// Execute one prefetch run
    ///
    /// All logins happen before the first pull. A failed login ends the run
    /// with an error and nothing is pulled; failed pulls only show up in the
    /// report.
    pub async fn run(
        &self,
        cancel: &CancellationToken,
        inputs: &PrefetchInputs,
        ctx: &RunContext,
    ) -> Result<PrefetchReport, PrefetchError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("prefetch", run_id = %run_id);

        self.run_inner(run_id, cancel, inputs, ctx)
            .instrument(span)
            .await
    }

    async fn run_inner(
        &self,
        run_id: Uuid,
        cancel: &CancellationToken,
        inputs: &PrefetchInputs,
        ctx: &RunContext,
    ) -> Result<PrefetchReport, PrefetchError> {
        let started_at = Utc::now();
        let start = Instant::now();

        if inputs.stages.is_empty() {
            info!("No stages present, nothing to prefetch");
        }

        let stages = select_stages(&inputs.stages, ctx);
        let images = container_images(&stages);

        info!(images = ?images, "Filtering credentials for images {:?}", images);
        let credentials = resolve_credentials(&inputs.credentials, &images);
        info!(
            total = inputs.credentials.len(),
            selected = credentials.len(),
            "Filtered {} container-registry credentials down to {}",
            inputs.credentials.len(),
            credentials.len()
        );

        let logins = self.authenticator.login(cancel, &credentials).await?;

        let pulls = self.prefetcher.prefetch(cancel, &images).await;
        let elapsed = start.elapsed();

        let report = PrefetchReport {
            run_id,
            started_at,
            elapsed,
            logins,
            pulls,
        };

        info!(
            images = report.image_count(),
            failed = report.failed_count(),
            elapsed_secs = elapsed.as_secs_f64(),
            "Done prefetching {} images in {} seconds",
            report.image_count(),
            elapsed.as_secs_f64()
        );

        Ok(report)
    }
}
