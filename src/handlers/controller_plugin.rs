// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Manila controller plugin: provisioning and snapshot sidecars plus the driver.

use crate::config::Config;
use crate::constants::names::{CONTROLLER_PLUGIN, CSI_DRIVER, DRIVER_NAMESPACE};
use crate::error::Result;
use crate::handlers::nfs_node_plugin;
use crate::handlers::pod::{self, PLUGINS_DIR};
use crate::handlers::rbac::{cluster_role, cluster_role_binding, role, role_binding, rule, service_account};
use crate::kubernetes::ManagedObject;
use k8s_openapi::api::apps::v1::Deployment;
use serde_json::{json, Value};

const COMPONENT: &str = "controllerplugin";
const SOCKET: &str = "csi-controllerplugin.sock";

pub fn rbac_objects() -> Vec<ManagedObject> {
    let snapshot = "snapshot.storage.k8s.io";
    vec![
        service_account(CONTROLLER_PLUGIN),
        cluster_role(
            CONTROLLER_PLUGIN,
            vec![
                rule("", &["nodes"], &["get", "list", "watch"]),
                rule("", &["secrets"], &["get", "list"]),
                rule("", &["persistentvolumes"], &["get", "list", "watch", "create", "delete"]),
                rule("", &["persistentvolumeclaims"], &["get", "list", "watch", "update"]),
                rule("", &["events"], &["list", "watch", "create", "update", "patch"]),
                rule("storage.k8s.io", &["storageclasses", "csinodes"], &["get", "list", "watch"]),
                rule(snapshot, &["volumesnapshotclasses"], &["get", "list", "watch"]),
                rule(
                    snapshot,
                    &["volumesnapshotcontents"],
                    &["create", "get", "list", "watch", "update", "delete"],
                ),
                rule(snapshot, &["volumesnapshotcontents/status"], &["update"]),
                rule(snapshot, &["volumesnapshots"], &["get", "list", "watch", "update"]),
                rule(snapshot, &["volumesnapshots/status"], &["update"]),
                rule(
                    "apiextensions.k8s.io",
                    &["customresourcedefinitions"],
                    &["create", "list", "watch", "delete", "get", "update"],
                ),
            ],
        ),
        cluster_role_binding(CONTROLLER_PLUGIN),
        role(
            CONTROLLER_PLUGIN,
            vec![
                rule("", &["endpoints"], &["get", "watch", "list", "delete", "update", "create"]),
                rule("", &["configmaps"], &["get", "list", "watch", "create", "delete"]),
            ],
        ),
        role_binding(CONTROLLER_PLUGIN),
    ]
}

fn sidecar(name: &str, image: &str, socket_dir: &str) -> Value {
    json!({
        "name": name,
        "image": image,
        "args": ["--v=5", "--csi-address=$(ADDRESS)"],
        "env": [pod::env("ADDRESS", &format!("{}/{}", socket_dir, SOCKET))],
        "volumeMounts": [pod::mount("plugin-dir", socket_dir)]
    })
}

/// Manila driver container; `socket` is the CSI endpoint it serves on
pub fn driver_container(config: &Config, socket: &str) -> Value {
    let socket_dir = format!("{}/{}", PLUGINS_DIR, CSI_DRIVER);
    let fwd_dir = nfs_node_plugin::socket_dir();
    json!({
        "name": "nodeplugin",
        "image": config.images.driver,
        "securityContext": pod::privileged(),
        "args": [
            "--v=5",
            "--nodeid=$(NODE_ID)",
            "--endpoint=$(CSI_ENDPOINT)",
            "--drivername=$(DRIVER_NAME)",
            "--share-protocol-selector=$(MANILA_SHARE_PROTO)",
            "--fwdendpoint=$(FWD_CSI_ENDPOINT)"
        ],
        "env": [
            pod::node_name_env("NODE_ID"),
            pod::env("CSI_ENDPOINT", &format!("unix://{}/{}", socket_dir, socket)),
            pod::env("DRIVER_NAME", CSI_DRIVER),
            pod::env("MANILA_SHARE_PROTO", "NFS"),
            pod::env("FWD_CSI_ENDPOINT", &format!("unix://{}/csi.sock", fwd_dir)),
        ],
        "volumeMounts": [
            pod::mount("plugin-dir", &socket_dir),
            pod::mount("fwd-plugin-dir", &fwd_dir),
            pod::pods_mount("pod-mounts"),
        ]
    })
}

pub fn deployment_objects(config: &Config) -> Result<Vec<ManagedObject>> {
    let socket_dir = format!("{}/{}", PLUGINS_DIR, CSI_DRIVER);
    let mut driver = driver_container(config, SOCKET);
    driver["name"] = json!(COMPONENT);

    let containers = vec![
        sidecar("provisioner", &config.images.provisioner, &socket_dir),
        sidecar("snapshotter", &config.images.snapshotter, &socket_dir),
        driver,
    ];
    let volumes = vec![
        pod::host_path_volume("plugin-dir", &socket_dir, "DirectoryOrCreate"),
        pod::host_path_volume("fwd-plugin-dir", &nfs_node_plugin::socket_dir(), "DirectoryOrCreate"),
        pod::host_path_volume("pod-mounts", pod::PODS_DIR, "Directory"),
    ];

    let deployment: Deployment = serde_json::from_value(json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": { "name": CONTROLLER_PLUGIN, "namespace": DRIVER_NAMESPACE },
        "spec": {
            "replicas": 1,
            "selector": { "matchLabels": pod::component_labels(COMPONENT) },
            "template": pod::host_pod_template(COMPONENT, CONTROLLER_PLUGIN, containers, volumes)
        }
    }))?;

    Ok(vec![ManagedObject::Deployment(deployment)])
}
