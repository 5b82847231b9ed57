// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! NFS node plugin the Manila plugin forwards NFS mounts to.

use crate::config::Config;
use crate::constants::names::{DRIVER_NAMESPACE, NFS_CSI_DRIVER, NFS_NODE_PLUGIN};
use crate::error::Result;
use crate::handlers::pod::{self, PLUGINS_DIR};
use crate::handlers::rbac::{cluster_role, cluster_role_binding, rule, service_account};
use crate::kubernetes::ManagedObject;
use k8s_openapi::api::apps::v1::DaemonSet;
use serde_json::json;

const COMPONENT: &str = "nfs-nodeplugin";

/// Socket directory of the NFS plugin on the host
pub fn socket_dir() -> String {
    format!("{}/csi-nfsplugin", PLUGINS_DIR)
}

pub fn rbac_objects() -> Vec<ManagedObject> {
    vec![
        service_account(NFS_NODE_PLUGIN),
        cluster_role(
            NFS_NODE_PLUGIN,
            vec![
                rule("", &["persistentvolumes"], &["get", "list", "watch", "update"]),
                rule("", &["secrets"], &["get", "list"]),
                rule("", &["nodes"], &["get", "list", "watch", "update"]),
                rule("storage.k8s.io", &["volumeattachments"], &["get", "list", "watch", "update"]),
            ],
        ),
        cluster_role_binding(NFS_NODE_PLUGIN),
    ]
}

pub fn daemon_set_objects(config: &Config) -> Result<Vec<ManagedObject>> {
    let container = json!({
        "name": "nfs",
        "image": config.images.nfs_driver,
        "args": [
            "--nodeid=$(NODE_ID)",
            "--endpoint=$(CSI_ENDPOINT)",
            format!("--drivername={}", NFS_CSI_DRIVER),
        ],
        "env": [
            pod::node_name_env("NODE_ID"),
            pod::env("CSI_ENDPOINT", "unix://plugin/csi.sock"),
        ],
        "securityContext": pod::privileged(),
        "volumeMounts": [
            pod::mount("plugin-dir", "/plugin"),
            pod::pods_mount("pods-mount-dir"),
        ]
    });
    let volumes = vec![
        pod::host_path_volume("plugin-dir", &socket_dir(), "DirectoryOrCreate"),
        pod::host_path_volume("pods-mount-dir", pod::PODS_DIR, "Directory"),
    ];

    let daemon_set: DaemonSet = serde_json::from_value(json!({
        "apiVersion": "apps/v1",
        "kind": "DaemonSet",
        "metadata": { "name": NFS_NODE_PLUGIN, "namespace": DRIVER_NAMESPACE },
        "spec": {
            "selector": { "matchLabels": pod::component_labels(COMPONENT) },
            "template": pod::host_pod_template(COMPONENT, NFS_NODE_PLUGIN, vec![container], volumes)
        }
    }))?;

    Ok(vec![ManagedObject::DaemonSet(daemon_set)])
}
