//! Core domain models for prefetching
//!
//! This module defines the stages and credentials a run works on, the
//! run context and the when-clause conditions evaluated against it.

pub mod condition;
pub mod config;
pub mod context;
pub mod credential;
pub mod dockerfile;
pub mod stage;

pub use condition::{evaluate, Condition, ConditionError};
pub use config::PrefetchInputs;
pub use context::{ContextVariable, RunContext};
pub use credential::{repository_prefix, resolve_credentials, Credential, CredentialMap};
pub use dockerfile::DockerfileScanner;
pub use stage::{container_images, select_stages, Stage};
