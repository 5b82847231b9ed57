// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Cloud credentials: the request to the credential operator and the secret
//! handed to the CSI sidecars.

use crate::config::Config;
use crate::constants::names::{
    CREDENTIALS_REQUEST, CREDENTIALS_REQUEST_NAMESPACE, DRIVER_NAMESPACE, DRIVER_SECRET,
};
use crate::inventory::Cloud;
use crate::kubernetes::ManagedObject;
use crate::types::credentials_request::{CredentialsRequestSpec, ProviderSpec, SecretReference};
use crate::types::CredentialsRequest;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::api::ObjectMeta;
use std::collections::BTreeMap;

/// CredentialsRequest asking for a clouds.yaml secret at the configured location
pub fn request_objects(config: &Config) -> Vec<ManagedObject> {
    let mut request = CredentialsRequest::new(
        CREDENTIALS_REQUEST,
        CredentialsRequestSpec {
            secret_ref: SecretReference {
                name: config.credentials_secret_name.clone(),
                namespace: config.credentials_secret_namespace.clone(),
            },
            provider_spec: ProviderSpec::openstack(),
        },
    );
    request.metadata.namespace = Some(CREDENTIALS_REQUEST_NAMESPACE.to_string());

    vec![ManagedObject::CredentialsRequest(request)]
}

/// Secret in the format the Manila CSI plugin reads its OpenStack credentials from
pub fn driver_secret_objects(cloud: &Cloud, ca_bundle: Option<&str>) -> Vec<ManagedObject> {
    let auth = &cloud.auth;
    let fields = [
        ("os-authURL", Some(&auth.auth_url)),
        ("os-region", cloud.region_name.as_ref()),
        ("os-userName", auth.username.as_ref()),
        ("os-userID", auth.user_id.as_ref()),
        ("os-password", auth.password.as_ref()),
        ("os-projectName", auth.project_name.as_ref()),
        ("os-projectID", auth.project_id.as_ref()),
        ("os-domainName", auth.domain_name.as_ref()),
        ("os-domainID", auth.domain_id.as_ref()),
        ("os-userDomainName", auth.user_domain_name.as_ref()),
        ("os-userDomainID", auth.user_domain_id.as_ref()),
        ("os-projectDomainName", auth.project_domain_name.as_ref()),
        ("os-projectDomainID", auth.project_domain_id.as_ref()),
        ("os-applicationCredentialID", auth.application_credential_id.as_ref()),
        (
            "os-applicationCredentialSecret",
            auth.application_credential_secret.as_ref(),
        ),
    ];

    let mut data: BTreeMap<String, ByteString> = fields
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key.to_string(), ByteString(v.as_bytes().to_vec()))))
        .collect();
    if let Some(bundle) = ca_bundle {
        data.insert(
            "os-certAuthority".to_string(),
            ByteString(bundle.as_bytes().to_vec()),
        );
    }
    if cloud.verify == Some(false) {
        data.insert("os-TLSInsecure".to_string(), ByteString(b"true".to_vec()));
    }

    vec![ManagedObject::Secret(Secret {
        metadata: ObjectMeta {
            name: Some(DRIVER_SECRET.to_string()),
            namespace: Some(DRIVER_NAMESPACE.to_string()),
            ..Default::default()
        },
        data: Some(data),
        ..Default::default()
    })]
}
