// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::{FINALIZER, MANILA_DRIVER_NAME};
use kube::{CustomResource, ResourceExt};
use serde::{Deserialize, Serialize};

/// Cluster-wide request to install the Manila CSI driver.
///
/// `ManilaDriverSpec` carries no settings; the resource existing is the request.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[kube(group = "manila.csi.openshift.io", version = "v1alpha1", kind = "ManilaDriver")]
#[kube(status = "ManilaDriverStatus")]
#[kube(printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#)]
#[serde(rename_all = "camelCase")]
pub struct ManilaDriverSpec {}

impl ManilaDriver {
    /// Check if the resource carries the operator's finalizer
    pub fn has_finalizer(&self) -> bool {
        self.finalizers().iter().any(|f| f == FINALIZER)
    }

    /// Check if deletion was requested
    pub fn is_being_deleted(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    /// Check if this resource uses the only accepted name
    pub fn has_required_name(&self) -> bool {
        self.name_any() == MANILA_DRIVER_NAME
    }

    /// Finalizer list with the operator's finalizer added or removed
    pub fn finalizers_with(&self, present: bool) -> Vec<String> {
        let mut finalizers: Vec<String> = self
            .finalizers()
            .iter()
            .filter(|f| *f != FINALIZER)
            .cloned()
            .collect();
        if present {
            finalizers.push(FINALIZER.to_string());
        }
        finalizers
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManilaDriverStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    /// Names of the share types a StorageClass was created for
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_types: Option<Vec<String>>,
}

/// Lifecycle phase reported in the ManilaDriver status
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, schemars::JsonSchema)]
pub enum Phase {
    /// Every managed object matches its template
    Converged,
    /// The cloud has no Manila service; only the base objects exist
    ManilaUnavailable,
    /// Waiting for the cloud credentials secret to appear
    WaitingForCredentials,
    /// The last pass failed and will be retried
    Degraded,
    /// Teardown finished and the finalizer was released
    Finalized,
    /// The resource no longer exists
    Gone,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}
