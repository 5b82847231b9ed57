// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use kube::CustomResource;
use serde::{Deserialize, Serialize};

/// Request to the cloud credential operator for OpenStack credentials,
/// delivered as a clouds.yaml secret at `secret_ref`.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, PartialEq, schemars::JsonSchema)]
#[kube(group = "cloudcredential.openshift.io", version = "v1", kind = "CredentialsRequest")]
#[kube(namespaced)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsRequestSpec {
    pub secret_ref: SecretReference,
    pub provider_spec: ProviderSpec,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, schemars::JsonSchema)]
pub struct SecretReference {
    pub name: String,
    pub namespace: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSpec {
    pub api_version: String,
    pub kind: String,
}

impl ProviderSpec {
    pub fn openstack() -> Self {
        Self {
            api_version: "cloudcredential.openshift.io/v1".to_string(),
            kind: "OpenStackProviderSpec".to_string(),
        }
    }
}
