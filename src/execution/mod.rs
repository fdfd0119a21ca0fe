//! Prefetch execution: logins, pulls and the engine driving them

pub mod authenticator;
pub mod engine;
pub mod outcome;
pub mod prefetcher;
pub mod runner;

pub use authenticator::{login_args, RegistryAuthenticator};
pub use engine::{PrefetchEngine, DEFAULT_PROGRAM};
pub use outcome::{CommandError, PrefetchError, PrefetchReport, PullBatch, PullOutcome};
pub use prefetcher::{pull_args, ParallelPrefetcher};
pub use runner::{CommandRunner, ProcessRunner};
