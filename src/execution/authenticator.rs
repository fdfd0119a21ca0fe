//! Registry logins

use crate::core::{Credential, CredentialMap};
use crate::execution::{CommandRunner, PrefetchError};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Arguments of a `login` invocation for one credential
///
/// The registry host is appended only when the repository names one,
/// otherwise the login goes to the default registry.
pub fn login_args(credential: &Credential) -> Vec<String> {
    let mut args = vec![
        "login".to_string(),
        "--username".to_string(),
        credential.username.clone(),
        "--password".to_string(),
        credential.password.clone(),
    ];
    if let Some(host) = credential.registry_host() {
        args.push(host.to_string());
    }
    args
}

/// Logs in to every registry a run needs credentials for
pub struct RegistryAuthenticator<R> {
    runner: Arc<R>,
    program: String,
}

impl<R: CommandRunner> RegistryAuthenticator<R> {
    pub fn new(runner: Arc<R>, program: impl Into<String>) -> Self {
        Self {
            runner,
            program: program.into(),
        }
    }

    /// Log in with each credential, one at a time
    ///
    /// Stops at the first failed login. Returns the number of logins.
    pub async fn login(
        &self,
        cancel: &CancellationToken,
        credentials: &CredentialMap,
    ) -> Result<usize, PrefetchError> {
        let mut count = 0;

        for credential in credentials.credentials() {
            info!(repository = %credential.repository, "Logging in to repository '{}'", credential.repository);

            self.runner
                .run(cancel, &self.program, &login_args(credential))
                .await
                .map_err(|source| PrefetchError::Login {
                    repository: credential.repository.clone(),
                    source,
                })?;

            count += 1;
        }

        Ok(count)
    }
}
