//! External command execution

use crate::execution::CommandError;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Runs external commands on behalf of the engine
///
/// Implementations must stop the command when `cancel` fires.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(
        &self,
        cancel: &CancellationToken,
        program: &str,
        args: &[String],
    ) -> Result<(), CommandError>;
}

/// Short description of an invocation for logs and errors
///
/// Only the program and its subcommand are included; the remaining
/// arguments can hold secrets.
pub fn describe(program: &str, args: &[String]) -> String {
    match args.first() {
        Some(subcommand) => format!("{} {}", program, subcommand),
        None => program.to_string(),
    }
}

/// Runs commands as child processes in a fixed working directory
///
/// Output of the child goes straight to this process's stdout and stderr.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    working_dir: PathBuf,
}

impl ProcessRunner {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
        }
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(
        &self,
        cancel: &CancellationToken,
        program: &str,
        args: &[String],
    ) -> Result<(), CommandError> {
        let command = describe(program, args);

        if cancel.is_cancelled() {
            return Err(CommandError::Cancelled { command });
        }

        debug!(command = %command, working_dir = %self.working_dir.display(), "Running command");

        let mut child = Command::new(program)
            .args(args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CommandError::Spawn {
                command: command.clone(),
                source,
            })?;

        tokio::select! {
            status = child.wait() => {
                let status = status.map_err(|source| CommandError::Spawn {
                    command: command.clone(),
                    source,
                })?;

                if status.success() {
                    debug!(command = %command, "Command finished");
                    Ok(())
                } else {
                    Err(CommandError::Failed {
                        command,
                        code: status.code(),
                    })
                }
            }
            _ = cancel.cancelled() => {
                warn!(command = %command, "Cancelling command");
                if let Err(e) = child.kill().await {
                    warn!(command = %command, error = %e, "Failed to kill command");
                }
                Err(CommandError::Cancelled { command })
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn runner() -> ProcessRunner {
        ProcessRunner::new(std::env::temp_dir())
    }

    #[test]
    fn test_describe_hides_arguments() {
        let args = vec![
            "login".to_string(),
            "--password".to_string(),
            "secret".to_string(),
        ];
        assert_eq!(describe("docker", &args), "docker login");
        assert_eq!(describe("docker", &[]), "docker");
    }

    #[tokio::test]
    async fn test_successful_command() {
        let cancel = CancellationToken::new();
        assert!(runner().run(&cancel, "true", &[]).await.is_ok());
    }

    #[tokio::test]
    async fn test_non_zero_exit() {
        let cancel = CancellationToken::new();
        let result = runner().run(&cancel, "false", &[]).await;
        assert!(matches!(
            result,
            Err(CommandError::Failed { code: Some(1), .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let cancel = CancellationToken::new();
        let result = runner()
            .run(&cancel, "definitely-not-a-real-binary-4711", &[])
            .await;
        assert!(matches!(result, Err(CommandError::Spawn { .. })));
    }

    #[tokio::test]
    async fn test_runs_in_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        let cancel = CancellationToken::new();
        let runner = ProcessRunner::new(dir.path());

        let args = vec!["-c".to_string(), "touch marker".to_string()];
        runner.run(&cancel, "sh", &args).await.unwrap();

        assert!(dir.path().join("marker").exists());
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_command() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        let result = runner().run(&cancel, "sleep", &["30".to_string()]).await;

        assert!(matches!(result, Err(CommandError::Cancelled { .. })));
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_already_cancelled_does_not_spawn() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = runner().run(&cancel, "true", &[]).await;
        assert!(matches!(result, Err(CommandError::Cancelled { .. })));
    }
}
