// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

/// Container images used by the driver workloads
#[derive(Debug, Clone, PartialEq)]
pub struct Images {
    pub driver: String,
    pub nfs_driver: String,
    pub provisioner: String,
    pub snapshotter: String,
    pub node_driver_registrar: String,
}

/// Operator configuration loaded from environment variables
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Location of the secret holding the clouds.yaml document
    pub credentials_secret_namespace: String,
    pub credentials_secret_name: String,
    pub credentials_secret_key: String,
    /// Entry of the clouds document to authenticate with
    pub cloud_name: String,
    /// Location of the optional CA bundle for the OpenStack endpoints
    pub ca_cert_configmap_namespace: String,
    pub ca_cert_configmap_name: String,
    /// Delay before retrying while the credentials secret does not exist yet
    pub credentials_retry: Duration,
    /// First delay after a failed reconcile; doubles on every further failure
    pub error_backoff: Duration,
    pub error_backoff_max: Duration,
    pub images: Images,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let secs = |key: &str, default: u64| -> Result<Duration> {
            match lookup(key) {
                Some(v) => v
                    .parse()
                    .map(Duration::from_secs)
                    .with_context(|| format!("{} must be a whole number of seconds, got '{}'", key, v)),
                None => Ok(Duration::from_secs(default)),
            }
        };

        let error_backoff = secs("ERROR_BACKOFF_SECS", 5)?;
        let error_backoff_max = secs("ERROR_BACKOFF_MAX_SECS", 300)?;
        anyhow::ensure!(
            error_backoff <= error_backoff_max,
            "ERROR_BACKOFF_SECS must not exceed ERROR_BACKOFF_MAX_SECS"
        );

        Ok(Config {
            credentials_secret_namespace: var(
                "CREDENTIALS_SECRET_NAMESPACE",
                "openshift-manila-csi-driver",
            ),
            credentials_secret_name: var("CREDENTIALS_SECRET_NAME", "manila-cloud-credentials"),
            credentials_secret_key: var("CREDENTIALS_SECRET_KEY", "clouds.yaml"),
            cloud_name: var("CLOUD_NAME", "openstack"),
            ca_cert_configmap_namespace: var("CA_CERT_CONFIGMAP_NAMESPACE", "openshift-config"),
            ca_cert_configmap_name: var("CA_CERT_CONFIGMAP_NAME", "cloud-provider-config"),
            credentials_retry: secs("CREDENTIALS_RETRY_SECS", 10)?,
            error_backoff,
            error_backoff_max,
            images: Images {
                driver: var(
                    "DRIVER_IMAGE",
                    "registry.k8s.io/provider-os/manila-csi-plugin:v1.30.0",
                ),
                nfs_driver: var("NFS_DRIVER_IMAGE", "registry.k8s.io/sig-storage/nfsplugin:v4.7.0"),
                provisioner: var(
                    "PROVISIONER_IMAGE",
                    "registry.k8s.io/sig-storage/csi-provisioner:v4.0.1",
                ),
                snapshotter: var(
                    "SNAPSHOTTER_IMAGE",
                    "registry.k8s.io/sig-storage/csi-snapshotter:v7.0.2",
                ),
                node_driver_registrar: var(
                    "NODE_DRIVER_REGISTRAR_IMAGE",
                    "registry.k8s.io/sig-storage/csi-node-driver-registrar:v2.10.1",
                ),
            },
        })
    }
}
