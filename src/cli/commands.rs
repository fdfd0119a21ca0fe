//! CLI command definitions

use crate::core::RunContext;
use crate::execution::DEFAULT_PROGRAM;
use clap::Args;

/// Prefetch the images of the injected stages
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Stages of the pipeline, as JSON
    #[arg(long, env = "ESTAFETTE_STAGES", default_value = "", hide_env_values = true)]
    pub stages: String,

    /// Container registry credentials injected by the CI server, as JSON
    #[arg(
        long,
        env = "ESTAFETTE_CREDENTIALS_CONTAINER_REGISTRY",
        hide_env_values = true
    )]
    pub credentials: Option<String>,

    /// Branch being built
    #[arg(long, env = "ESTAFETTE_GIT_BRANCH", default_value = "")]
    pub branch: String,

    /// What triggered the build
    #[arg(long, env = "ESTAFETTE_TRIGGER", default_value = "")]
    pub trigger: String,

    /// Status of the build so far
    #[arg(long, env = "ESTAFETTE_BUILD_STATUS", default_value = "")]
    pub status: String,

    /// Release action
    #[arg(long, env = "ESTAFETTE_RELEASE_ACTION", default_value = "")]
    pub action: String,

    /// Binary used for logins and pulls
    #[arg(long, default_value = DEFAULT_PROGRAM)]
    pub docker_binary: String,

    /// Working directory for the login and pull commands
    #[arg(long, default_value = "/estafette-work")]
    pub work_dir: String,
}

impl RunCommand {
    /// Context the stages' when-clauses are evaluated against
    pub fn run_context(&self) -> RunContext {
        RunContext::new()
            .with_branch(&self.branch)
            .with_trigger(&self.trigger)
            .with_status(&self.status)
            .with_action(&self.action)
    }
}

/// List the base images of a Dockerfile
#[derive(Debug, Args, Clone)]
pub struct DockerfileImagesCommand {
    /// Path to the Dockerfile
    #[arg(short, long, default_value = "Dockerfile")]
    pub file: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_context() {
        let cmd = RunCommand {
            stages: String::new(),
            credentials: None,
            branch: "main".to_string(),
            trigger: "git".to_string(),
            status: "succeeded".to_string(),
            action: String::new(),
            docker_binary: "docker".to_string(),
            work_dir: "/tmp".to_string(),
        };

        assert_eq!(
            cmd.run_context(),
            RunContext::new()
                .with_branch("main")
                .with_trigger("git")
                .with_status("succeeded")
        );
    }
}
