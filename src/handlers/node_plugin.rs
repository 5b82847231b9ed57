// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::config::Config;
use crate::constants::names::{CSI_DRIVER, DRIVER_NAMESPACE, NODE_PLUGIN};
use crate::error::Result;
use crate::handlers::controller_plugin::driver_container;
use crate::handlers::nfs_node_plugin;
use crate::handlers::pod::{self, PLUGINS_DIR, REGISTRATION_DIR};
use crate::handlers::rbac::{cluster_role, cluster_role_binding, rule, service_account};
use crate::kubernetes::ManagedObject;
use k8s_openapi::api::apps::v1::DaemonSet;
use serde_json::json;

const COMPONENT: &str = "nodeplugin";

pub fn rbac_objects() -> Vec<ManagedObject> {
    vec![
        service_account(NODE_PLUGIN),
        cluster_role(NODE_PLUGIN, vec![rule("", &["configmaps"], &["get", "list"])]),
        cluster_role_binding(NODE_PLUGIN),
    ]
}

/// Node plugin DaemonSet with the kubelet registrar sidecar
pub fn daemon_set_objects(config: &Config) -> Result<Vec<ManagedObject>> {
    let socket_dir = format!("{}/{}", PLUGINS_DIR, CSI_DRIVER);
    let registrar = json!({
        "name": "registrar",
        "image": config.images.node_driver_registrar,
        "args": [
            "--v=5",
            "--csi-address=/csi/csi.sock",
            format!("--kubelet-registration-path={}/csi.sock", socket_dir),
        ],
        "env": [pod::node_name_env("KUBE_NODE_NAME")],
        "volumeMounts": [
            pod::mount("plugin-dir", "/csi"),
            pod::mount("registration-dir", "/registration"),
        ]
    });
    let volumes = vec![
        pod::host_path_volume("registration-dir", REGISTRATION_DIR, "Directory"),
        pod::host_path_volume("plugin-dir", &socket_dir, "DirectoryOrCreate"),
        pod::host_path_volume("fwd-plugin-dir", &nfs_node_plugin::socket_dir(), "DirectoryOrCreate"),
        pod::host_path_volume("pod-mounts", pod::PODS_DIR, "Directory"),
    ];

    let daemon_set: DaemonSet = serde_json::from_value(json!({
        "apiVersion": "apps/v1",
        "kind": "DaemonSet",
        "metadata": { "name": NODE_PLUGIN, "namespace": DRIVER_NAMESPACE },
        "spec": {
            "selector": { "matchLabels": pod::component_labels(COMPONENT) },
            "template": pod::host_pod_template(
                COMPONENT,
                NODE_PLUGIN,
                vec![registrar, driver_container(config, "csi.sock")],
                volumes
            )
        }
    }))?;

    Ok(vec![ManagedObject::DaemonSet(daemon_set)])
}
