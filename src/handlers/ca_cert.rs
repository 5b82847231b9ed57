// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Projection of the cloud CA bundle into the driver namespace.

use crate::config::Config;
use crate::constants::names::{CA_BUNDLE_CONFIGMAP, CA_BUNDLE_KEY, DRIVER_NAMESPACE};
use crate::error::Result;
use crate::kubernetes::ManagedObject;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::ObjectMeta;
use kube::{Api, Client};
use tracing::{debug, instrument};

/// Read the CA bundle from the configured source ConfigMap, if there is one
#[instrument(skip_all, fields(configmap = %format!("{}/{}", config.ca_cert_configmap_namespace, config.ca_cert_configmap_name)))]
pub async fn read_ca_bundle(client: &Client, config: &Config) -> Result<Option<String>> {
    let configmaps: Api<ConfigMap> =
        Api::namespaced(client.clone(), &config.ca_cert_configmap_namespace);

    let bundle = configmaps
        .get_opt(&config.ca_cert_configmap_name)
        .await?
        .and_then(|cm| cm.data)
        .and_then(|mut data| data.remove(CA_BUNDLE_KEY))
        .filter(|bundle| !bundle.trim().is_empty());

    if bundle.is_none() {
        debug!("No CA bundle configured for the cloud");
    }
    Ok(bundle)
}

/// ConfigMap carrying the CA bundle for the driver pods; nothing without a bundle
pub fn objects(ca_bundle: Option<&str>) -> Vec<ManagedObject> {
    let Some(bundle) = ca_bundle else {
        return Vec::new();
    };

    vec![ManagedObject::ConfigMap(ConfigMap {
        metadata: ObjectMeta {
            name: Some(CA_BUNDLE_CONFIGMAP.to_string()),
            namespace: Some(DRIVER_NAMESPACE.to_string()),
            ..Default::default()
        },
        data: Some([(CA_BUNDLE_KEY.to_string(), bundle.to_string())].into_iter().collect()),
        ..Default::default()
    })]
}
