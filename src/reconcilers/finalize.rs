// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Teardown of everything the operator created, in reverse creation order.
//!
//! Objects already gone count as deleted, so a teardown interrupted by an
//! error can simply be run again.

use crate::constants::names::{
    CONTROLLER_PLUGIN, CREDENTIALS_REQUEST, CREDENTIALS_REQUEST_NAMESPACE, CSI_DRIVER,
    DRIVER_NAMESPACE, NFS_NODE_PLUGIN, NODE_PLUGIN, SECURITY_CONTEXT_CONSTRAINTS,
};
use crate::error::Result;
use crate::handlers::storage_classes;
use crate::kubernetes::{delete, ManagedKind, ObjectId};
use kube::Client;
use tracing::{info, instrument};

#[derive(Debug, Clone, PartialEq)]
pub enum Teardown {
    Object(ObjectId),
    /// Every StorageClass carrying the operator's label
    StorageClasses,
}

/// Deletion order. Namespaced objects other than the CredentialsRequest go
/// away with the namespace, which comes last.
pub fn teardown_sequence() -> Vec<Teardown> {
    let plugins = [NODE_PLUGIN, CONTROLLER_PLUGIN, NFS_NODE_PLUGIN];
    let cluster = |kind: ManagedKind, name: &str| Teardown::Object(ObjectId::cluster(kind, name));

    let mut sequence: Vec<Teardown> = plugins
        .iter()
        .map(|name| cluster(ManagedKind::ClusterRoleBinding, *name))
        .chain(plugins.iter().map(|name| cluster(ManagedKind::ClusterRole, *name)))
        .collect();
    sequence.extend([
        cluster(ManagedKind::CsiDriver, CSI_DRIVER),
        cluster(ManagedKind::SecurityContextConstraints, SECURITY_CONTEXT_CONSTRAINTS),
        Teardown::StorageClasses,
        Teardown::Object(ObjectId::namespaced(
            ManagedKind::CredentialsRequest,
            CREDENTIALS_REQUEST_NAMESPACE,
            CREDENTIALS_REQUEST,
        )),
        cluster(ManagedKind::Namespace, DRIVER_NAMESPACE),
    ]);
    sequence
}

/// Delete all managed objects; stops at the first error other than not-found
#[instrument(skip(client))]
pub async fn finalize(client: &Client) -> Result<()> {
    info!("Tearing down the Manila CSI driver");

    for teardown in teardown_sequence() {
        match teardown {
            Teardown::Object(id) => {
                delete(client, &id).await?;
            }
            Teardown::StorageClasses => {
                for name in storage_classes::list_managed(client).await? {
                    delete(client, &ObjectId::cluster(ManagedKind::StorageClass, &name)).await?;
                }
            }
        }
    }

    info!("Successfully finalized ManilaDriver");
    Ok(())
}
