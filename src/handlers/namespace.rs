// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::names::DRIVER_NAMESPACE;
use crate::kubernetes::ManagedObject;
use k8s_openapi::api::core::v1::Namespace;
use kube::api::ObjectMeta;

/// Namespace all driver workloads run in
pub fn objects() -> Vec<ManagedObject> {
    vec![ManagedObject::Namespace(Namespace {
        metadata: ObjectMeta {
            name: Some(DRIVER_NAMESPACE.to_string()),
            ..Default::default()
        },
        ..Default::default()
    })]
}
