// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Shared fragments of the driver pod templates.

use crate::constants::labels;
use serde_json::{json, Value};
use std::collections::BTreeMap;

pub const PLUGINS_DIR: &str = "/var/lib/kubelet/plugins";
pub const PODS_DIR: &str = "/var/lib/kubelet/pods";
pub const REGISTRATION_DIR: &str = "/var/lib/kubelet/plugins_registry";

/// Selector labels of one driver component
pub fn component_labels(component: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (labels::APP.to_string(), labels::APP_VALUE.to_string()),
        (labels::COMPONENT.to_string(), component.to_string()),
    ])
}

pub fn host_path_volume(name: &str, path: &str, kind: &str) -> Value {
    json!({ "name": name, "hostPath": { "path": path, "type": kind } })
}

pub fn mount(name: &str, path: &str) -> Value {
    json!({ "name": name, "mountPath": path })
}

/// Mount of the kubelet pods directory, propagated back to the host
pub fn pods_mount(name: &str) -> Value {
    json!({ "name": name, "mountPath": PODS_DIR, "mountPropagation": "Bidirectional" })
}

pub fn env(name: &str, value: &str) -> Value {
    json!({ "name": name, "value": value })
}

/// Environment variable resolving to the name of the node the pod runs on
pub fn node_name_env(name: &str) -> Value {
    json!({ "name": name, "valueFrom": { "fieldRef": { "fieldPath": "spec.nodeName" } } })
}

pub fn privileged() -> Value {
    json!({
        "privileged": true,
        "allowPrivilegeEscalation": true,
        "capabilities": { "add": ["SYS_ADMIN"] }
    })
}

/// Pod template running on the host network with the given service account
pub fn host_pod_template(component: &str, service_account: &str, containers: Vec<Value>, volumes: Vec<Value>) -> Value {
    json!({
        "metadata": { "labels": component_labels(component) },
        "spec": {
            "serviceAccountName": service_account,
            "hostNetwork": true,
            "dnsPolicy": "ClusterFirstWithHostNet",
            "containers": containers,
            "volumes": volumes
        }
    })
}
