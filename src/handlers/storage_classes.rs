// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! One StorageClass per Manila share type.

use crate::constants::labels;
use crate::constants::names::{CSI_DRIVER, DRIVER_NAMESPACE, DRIVER_SECRET, STORAGE_CLASS_PREFIX};
use crate::error::Result;
use crate::inventory::ShareType;
use crate::kubernetes::{delete, ManagedKind, ManagedObject, ObjectId};
use k8s_openapi::api::storage::v1::StorageClass;
use kube::api::{ListParams, ObjectMeta};
use kube::{Api, Client, ResourceExt};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, instrument, warn};

const SECRET_PARAMETERS: [&str; 3] = [
    "csi.storage.k8s.io/provisioner-secret",
    "csi.storage.k8s.io/node-stage-secret",
    "csi.storage.k8s.io/node-publish-secret",
];

/// Lowercase DNS-1123 form of a share type name
fn sanitize(name: &str) -> String {
    let sanitized: String = name
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                c
            } else {
                '-'
            }
        })
        .collect();
    sanitized.trim_matches(|c| c == '-' || c == '.').to_string()
}

/// StorageClass name for a share type, falling back to its id when the name
/// has no usable characters
pub fn storage_class_name(share_type: &ShareType) -> String {
    let mut suffix = sanitize(&share_type.name);
    if suffix.is_empty() {
        suffix = sanitize(&share_type.id);
    }
    format!("{}{}", STORAGE_CLASS_PREFIX, suffix)
}

fn storage_class(name: String, share_type: &ShareType) -> StorageClass {
    let mut parameters = BTreeMap::from([("type".to_string(), share_type.name.clone())]);
    for prefix in SECRET_PARAMETERS {
        parameters.insert(format!("{}-name", prefix), DRIVER_SECRET.to_string());
        parameters.insert(format!("{}-namespace", prefix), DRIVER_NAMESPACE.to_string());
    }

    StorageClass {
        metadata: ObjectMeta {
            name: Some(name),
            ..Default::default()
        },
        provisioner: CSI_DRIVER.to_string(),
        parameters: Some(parameters),
        ..Default::default()
    }
}

/// Share types that get a StorageClass; later share types mapping to an
/// already used name are skipped
pub fn distinct(share_types: Vec<ShareType>) -> Vec<ShareType> {
    let mut seen = BTreeSet::new();

    share_types
        .into_iter()
        .filter(|share_type| {
            let name = storage_class_name(share_type);
            if seen.contains(&name) {
                warn!(
                    "Share type '{}' maps to StorageClass {} which is already taken",
                    share_type.name, name
                );
                return false;
            }
            seen.insert(name)
        })
        .collect()
}

pub fn objects(share_types: &[ShareType]) -> Vec<ManagedObject> {
    distinct(share_types.to_vec())
        .into_iter()
        .map(|share_type| {
            ManagedObject::StorageClass(storage_class(storage_class_name(&share_type), &share_type))
        })
        .collect()
}

/// Names of the StorageClasses currently carrying the operator's label
pub async fn list_managed(client: &Client) -> Result<Vec<String>> {
    let api: Api<StorageClass> = Api::all(client.clone());
    let list = api
        .list(&ListParams::default().labels(labels::SELECTOR))
        .await?;
    Ok(list.items.iter().map(|sc| sc.name_any()).collect())
}

/// Delete labelled StorageClasses whose share type is no longer offered
#[instrument(skip(client, desired))]
pub async fn remove_stale(client: &Client, desired: &BTreeSet<String>) -> Result<Vec<String>> {
    let mut removed = Vec::new();
    for name in list_managed(client).await? {
        if desired.contains(&name) {
            continue;
        }
        info!("Removing StorageClass {} for a share type that is gone", name);
        delete(client, &ObjectId::cluster(ManagedKind::StorageClass, &name)).await?;
        removed.push(name);
    }
    Ok(removed)
}
