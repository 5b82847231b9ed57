// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::names::CSI_DRIVER;
use crate::kubernetes::ManagedObject;
use k8s_openapi::api::storage::v1::{CSIDriver, CSIDriverSpec};
use kube::api::ObjectMeta;

/// CSIDriver registration; Manila shares need no attach step
pub fn objects() -> Vec<ManagedObject> {
    vec![ManagedObject::CsiDriver(CSIDriver {
        metadata: ObjectMeta {
            name: Some(CSI_DRIVER.to_string()),
            ..Default::default()
        },
        spec: CSIDriverSpec {
            attach_required: Some(false),
            pod_info_on_mount: Some(false),
            ..Default::default()
        },
    })]
}
