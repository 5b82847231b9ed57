// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! OpenStack clouds.yaml document and the secret it is delivered in

use crate::config::Config;
use crate::error::{ManilaOperatorError, Result};
use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, instrument};

#[derive(Deserialize, Debug, Clone)]
pub struct CloudsDocument {
    #[serde(default)]
    pub clouds: BTreeMap<String, Cloud>,
}

/// One named entry of a clouds.yaml document
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Cloud {
    pub auth: AuthInfo,
    #[serde(default)]
    pub region_name: Option<String>,
    #[serde(default)]
    pub interface: Option<String>,
    /// `false` disables TLS certificate verification
    #[serde(default)]
    pub verify: Option<bool>,
}

impl Cloud {
    /// Endpoint interface to pick from the catalog, `public` unless configured
    pub fn interface(&self) -> &str {
        self.interface
            .as_deref()
            .map(|i| i.trim_end_matches("URL"))
            .unwrap_or("public")
    }
}

#[derive(Deserialize, Clone, Default, PartialEq)]
pub struct AuthInfo {
    pub auth_url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default, alias = "tenant_name")]
    pub project_name: Option<String>,
    #[serde(default, alias = "tenant_id")]
    pub project_id: Option<String>,
    #[serde(default)]
    pub user_domain_name: Option<String>,
    #[serde(default)]
    pub user_domain_id: Option<String>,
    #[serde(default)]
    pub project_domain_name: Option<String>,
    #[serde(default)]
    pub project_domain_id: Option<String>,
    #[serde(default)]
    pub domain_name: Option<String>,
    #[serde(default)]
    pub domain_id: Option<String>,
    #[serde(default)]
    pub application_credential_id: Option<String>,
    #[serde(default)]
    pub application_credential_secret: Option<String>,
}

impl fmt::Debug for AuthInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthInfo")
            .field("auth_url", &self.auth_url)
            .field("username", &self.username)
            .field("user_id", &self.user_id)
            .field("project_name", &self.project_name)
            .field("project_id", &self.project_id)
            .field("application_credential_id", &self.application_credential_id)
            .finish_non_exhaustive()
    }
}

/// Parse a clouds.yaml document and select the cloud called `cloud_name`
pub fn parse_cloud(content: &[u8], cloud_name: &str) -> Result<Cloud> {
    let mut document: CloudsDocument = serde_yaml::from_slice(content)?;

    document.clouds.remove(cloud_name).ok_or_else(|| {
        ManilaOperatorError::CredentialsError(format!(
            "clouds document does not define cloud '{}'",
            cloud_name
        ))
    })
}

/// Read the configured cloud from the credentials secret.
///
/// Returns `None` while the secret does not exist yet.
#[instrument(skip(client, config), fields(secret = %format!("{}/{}", config.credentials_secret_namespace, config.credentials_secret_name)))]
pub async fn read_cloud(client: &Client, config: &Config) -> Result<Option<Cloud>> {
    let secrets: Api<Secret> =
        Api::namespaced(client.clone(), &config.credentials_secret_namespace);

    let Some(secret) = secrets.get_opt(&config.credentials_secret_name).await? else {
        return Ok(None);
    };

    let Some(content) = secret
        .data
        .as_ref()
        .and_then(|d| d.get(&config.credentials_secret_key))
    else {
        return Err(ManilaOperatorError::CredentialsError(format!(
            "secret {}/{} does not contain '{}' key",
            config.credentials_secret_namespace,
            config.credentials_secret_name,
            config.credentials_secret_key
        )));
    };

    let cloud = parse_cloud(&content.0, &config.cloud_name)?;
    debug!("Using cloud '{}' at {}", config.cloud_name, cloud.auth.auth_url);
    Ok(Some(cloud))
}
