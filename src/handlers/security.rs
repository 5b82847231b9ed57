// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::names::{DRIVER_NAMESPACE, NFS_NODE_PLUGIN, NODE_PLUGIN, SECURITY_CONTEXT_CONSTRAINTS};
use crate::kubernetes::managed::scc_resource;
use crate::kubernetes::ManagedObject;
use kube::api::DynamicObject;
use serde_json::json;

fn service_account_user(name: &str) -> String {
    format!("system:serviceaccount:{}:{}", DRIVER_NAMESPACE, name)
}

/// SecurityContextConstraints letting the node plugins mount host paths as privileged pods
pub fn objects() -> Vec<ManagedObject> {
    let scc = DynamicObject::new(SECURITY_CONTEXT_CONSTRAINTS, &scc_resource()).data(json!({
        "allowHostDirVolumePlugin": true,
        "allowHostIPC": true,
        "allowHostNetwork": true,
        "allowHostPID": true,
        "allowHostPorts": true,
        "allowPrivilegeEscalation": true,
        "allowPrivilegedContainer": true,
        "allowedCapabilities": ["SYS_ADMIN"],
        "defaultAddCapabilities": [],
        "fsGroup": { "type": "RunAsAny" },
        "priority": null,
        "readOnlyRootFilesystem": false,
        "requiredDropCapabilities": [],
        "runAsUser": { "type": "RunAsAny" },
        "seLinuxContext": { "type": "RunAsAny" },
        "supplementalGroups": { "type": "RunAsAny" },
        "users": [
            service_account_user(NFS_NODE_PLUGIN),
            service_account_user(NODE_PLUGIN),
        ],
        "volumes": ["*"],
    }));

    vec![ManagedObject::SecurityContextConstraints(scc)]
}
