//! prefetch - pulls the container images of a CI pipeline's stages ahead of time

pub mod cli;
pub mod core;
pub mod execution;

// Re-export commonly used types
pub use core::{Condition, ConditionError, Credential, CredentialMap, PrefetchInputs, RunContext, Stage};
pub use execution::{
    CommandError, CommandRunner, PrefetchEngine, PrefetchError, PrefetchReport, ProcessRunner,
};
