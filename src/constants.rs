// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// The only accepted name for the ManilaDriver resource
pub const MANILA_DRIVER_NAME: &str = "cluster";

/// Finalizer that blocks ManilaDriver deletion until teardown completes
pub const FINALIZER: &str = "finalizer.manila.csi.openshift.io";

/// Kubernetes annotation keys used by the operator
pub mod annotations {
    /// Canonical JSON snapshot of the configuration last written by the operator
    pub const LAST_APPLIED: &str = "manila.csi.openshift.io/last-applied";
}

/// Labels stamped on every managed object
pub mod labels {
    pub const APP: &str = "app";
    pub const APP_VALUE: &str = "openstack-manila-csi";
    pub const COMPONENT: &str = "component";

    /// Selector matching everything the operator manages
    pub const SELECTOR: &str = "app=openstack-manila-csi";
}

/// Names and namespaces of managed objects
pub mod names {
    pub const DRIVER_NAMESPACE: &str = "openshift-manila-csi-driver";

    pub const CA_BUNDLE_CONFIGMAP: &str = "manila-csi-ca-bundle";
    pub const CA_BUNDLE_KEY: &str = "ca-bundle.pem";

    pub const CREDENTIALS_REQUEST: &str = "openshift-manila-csi-driver";
    pub const CREDENTIALS_REQUEST_NAMESPACE: &str = "openshift-cloud-credential-operator";

    pub const DRIVER_SECRET: &str = "csi-manila-secrets";

    pub const CSI_DRIVER: &str = "manila.csi.openstack.org";
    pub const NFS_CSI_DRIVER: &str = "nfs.csi.k8s.io";
    pub const STORAGE_CLASS_PREFIX: &str = "csi-manila-";

    pub const SECURITY_CONTEXT_CONSTRAINTS: &str = "manila-csi-scc";

    pub const NFS_NODE_PLUGIN: &str = "csi-nodeplugin-nfsplugin";
    pub const CONTROLLER_PLUGIN: &str = "openstack-manila-csi-controllerplugin";
    pub const NODE_PLUGIN: &str = "openstack-manila-csi-nodeplugin";
}

/// CRD polling configuration
pub mod crd {
    pub const GROUP: &str = "manila.csi.openshift.io";
    pub const VERSION: &str = "v1alpha1";
    pub const KIND: &str = "ManilaDriver";
    /// Initial polling interval in seconds when waiting for CRD
    pub const POLL_INTERVAL_SECS: u64 = 10;
    /// Maximum polling interval in seconds (exponential backoff cap)
    pub const POLL_MAX_INTERVAL_SECS: u64 = 60;
}
