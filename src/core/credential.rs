//! Container registry credentials and their resolution per image

use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Credentials for one container registry repository
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    /// Name the credential is configured under on the CI server
    pub name: String,

    /// Registry host plus path prefix, e.g. `registry.example.com/team`
    pub repository: String,

    pub username: String,

    pub password: String,
}

impl Credential {
    pub fn new(
        name: impl Into<String>,
        repository: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            repository: repository.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    /// Registry host to log in to, if the repository names one
    ///
    /// Single-segment repositories (a Docker Hub organisation) return `None`
    /// so the login goes to the default registry.
    pub fn registry_host(&self) -> Option<&str> {
        self.repository.split_once('/').map(|(host, _)| host)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("name", &self.name)
            .field("repository", &self.repository)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Repository prefix of an image reference: everything before the last `/`
///
/// `registry.example.com/team/app:v1` gives `registry.example.com/team`,
/// an official image such as `golang:1.22` gives an empty string. Tags
/// cannot contain `/`, so the last segment is always name plus tag.
pub fn repository_prefix(image: &str) -> &str {
    match image.rsplit_once('/') {
        Some((prefix, _)) => prefix,
        None => "",
    }
}

/// Credentials selected for a run, keyed by repository prefix
#[derive(Debug, Clone, Default)]
pub struct CredentialMap {
    entries: HashMap<String, Credential>,
}

impl CredentialMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, repository: &str) -> Option<&Credential> {
        self.entries.get(repository)
    }

    pub fn contains(&self, repository: &str) -> bool {
        self.entries.contains_key(repository)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate in no particular order
    pub fn credentials(&self) -> impl Iterator<Item = &Credential> {
        self.entries.values()
    }

    fn insert(&mut self, repository: String, credential: Credential) {
        self.entries.insert(repository, credential);
    }
}

/// Pick, for every distinct repository prefix among `images`, the first
/// credential whose repository equals that prefix
///
/// Images without a matching credential are left out.
pub fn resolve_credentials<S: AsRef<str>>(credentials: &[Credential], images: &[S]) -> CredentialMap {
    let mut map = CredentialMap::new();

    for image in images {
        let prefix = repository_prefix(image.as_ref());
        if map.contains(prefix) {
            continue;
        }

        match credentials.iter().find(|c| c.repository == prefix) {
            Some(credential) => {
                debug!(image = %image.as_ref(), repository = %prefix, credential = %credential.name, "Matched credential");
                map.insert(prefix.to_string(), credential.clone());
            }
            None => {
                debug!(image = %image.as_ref(), repository = %prefix, "No credential for repository");
            }
        }
    }

    map
}
