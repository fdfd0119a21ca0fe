//! Prefetch runs that spawn real processes
//!
//! `true` and `false` stand in for the docker binary: they ignore the
//! login and pull arguments and only decide the exit code.

#![cfg(unix)]

use prefetch::core::{Credential, PrefetchInputs, Stage};
use prefetch::execution::{CommandError, PrefetchEngine, PrefetchError, ProcessRunner};
use prefetch::RunContext;
use tokio_util::sync::CancellationToken;

fn inputs() -> PrefetchInputs {
    PrefetchInputs {
        stages: vec![
            Stage::new("build", "gcr.io/project/builder:1", "true"),
            Stage::new("test", "alpine:3.19", "true"),
        ],
        credentials: vec![Credential::new("gcr", "gcr.io/project", "bot", "pw")],
    }
}

#[tokio::test]
async fn test_successful_commands() {
    let dir = tempfile::tempdir().unwrap();
    let engine = PrefetchEngine::new(ProcessRunner::new(dir.path()), "true");

    let report = engine
        .run(&CancellationToken::new(), &inputs(), &RunContext::new())
        .await
        .unwrap();

    assert_eq!(report.logins, 1);
    assert_eq!(report.image_count(), 2);
    assert_eq!(report.failed_count(), 0);
}

#[tokio::test]
async fn test_failing_login_command() {
    let dir = tempfile::tempdir().unwrap();
    let engine = PrefetchEngine::new(ProcessRunner::new(dir.path()), "false");

    let result = engine
        .run(&CancellationToken::new(), &inputs(), &RunContext::new())
        .await;

    assert!(matches!(
        result,
        Err(PrefetchError::Login {
            source: CommandError::Failed { code: Some(1), .. },
            ..
        })
    ));
}

#[tokio::test]
async fn test_failing_pull_commands() {
    let dir = tempfile::tempdir().unwrap();
    let engine = PrefetchEngine::new(ProcessRunner::new(dir.path()), "false");
    let inputs = PrefetchInputs {
        stages: inputs().stages,
        credentials: vec![],
    };

    let report = engine
        .run(&CancellationToken::new(), &inputs, &RunContext::new())
        .await
        .unwrap();

    assert_eq!(report.failed_count(), 2);
}

#[tokio::test]
async fn test_missing_binary_fails_login() {
    let dir = tempfile::tempdir().unwrap();
    let engine = PrefetchEngine::new(
        ProcessRunner::new(dir.path()),
        "definitely-not-a-real-binary-4711",
    );

    let result = engine
        .run(&CancellationToken::new(), &inputs(), &RunContext::new())
        .await;

    assert!(matches!(
        result,
        Err(PrefetchError::Login {
            source: CommandError::Spawn { .. },
            ..
        })
    ));
}
