//! Decoding of the stage and credential lists injected by the CI server

use crate::core::{Credential, Stage};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Type of the credentials used for registry logins
pub const CONTAINER_REGISTRY_TYPE: &str = "container-registry";

/// Stage as serialized by the CI server
///
/// The server emits Go-style field names; camelCase and the manifest's
/// `image` key are accepted too.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageConfig {
    #[serde(rename = "Name", alias = "name", default)]
    pub name: String,

    #[serde(
        rename = "ContainerImage",
        alias = "containerImage",
        alias = "image",
        default
    )]
    pub container_image: String,

    #[serde(rename = "When", alias = "when", default)]
    pub when: String,
}

impl From<StageConfig> for Stage {
    fn from(config: StageConfig) -> Self {
        Stage {
            name: config.name,
            container_image: config.container_image,
            when: config.when,
        }
    }
}

/// Credential as serialized by the CI server
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CredentialConfig {
    #[serde(default)]
    pub name: String,

    /// Credential type; empty is read as `container-registry`
    #[serde(rename = "type", default)]
    pub credential_type: String,

    #[serde(rename = "additionalProperties", default)]
    pub additional_properties: RegistryProperties,
}

/// Registry specific part of a credential
#[derive(Clone, Default, Deserialize)]
pub struct RegistryProperties {
    #[serde(default)]
    pub repository: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for RegistryProperties {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryProperties")
            .field("repository", &self.repository)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

impl CredentialConfig {
    pub fn is_container_registry(&self) -> bool {
        self.credential_type.is_empty() || self.credential_type == CONTAINER_REGISTRY_TYPE
    }
}

impl From<CredentialConfig> for Credential {
    fn from(config: CredentialConfig) -> Self {
        let props = config.additional_properties;
        Credential {
            name: config.name,
            repository: props.repository,
            username: props.username,
            password: props.password,
        }
    }
}

/// Decoded inputs of a prefetch run
#[derive(Debug, Clone, Default)]
pub struct PrefetchInputs {
    pub stages: Vec<Stage>,
    pub credentials: Vec<Credential>,
}

impl PrefetchInputs {
    /// Decode both inputs; a blank string stands for an empty list
    pub fn from_json(stages_json: &str, credentials_json: Option<&str>) -> Result<Self> {
        let stages = decode_stages(stages_json)?;
        let credentials = match credentials_json {
            Some(json) => decode_credentials(json)?,
            None => Vec::new(),
        };
        Ok(Self { stages, credentials })
    }
}

/// Decode a JSON array of stages
pub fn decode_stages(json: &str) -> Result<Vec<Stage>> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }
    let configs: Vec<StageConfig> =
        serde_json::from_str(json).context("Failed unmarshalling injected stages")?;
    Ok(configs.into_iter().map(Stage::from).collect())
}

/// Decode a JSON array of container registry credentials
///
/// Credentials of any other type are dropped.
pub fn decode_credentials(json: &str) -> Result<Vec<Credential>> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }
    let configs: Vec<CredentialConfig> =
        serde_json::from_str(json).context("Failed unmarshalling injected credentials")?;
    Ok(configs
        .into_iter()
        .filter(|config| {
            let keep = config.is_container_registry();
            if !keep {
                debug!(name = %config.name, credential_type = %config.credential_type, "Ignoring credential");
            }
            keep
        })
        .map(Credential::from)
        .collect())
}
