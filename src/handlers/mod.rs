// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Desired state of the driver, as an ordered pipeline of steps.
//!
//! Each step builds the objects of one group and converges them in order.
//! The first error aborts the step and, with it, the pass.

pub mod ca_cert;
pub mod controller_plugin;
pub mod credentials;
pub mod csi_driver;
pub mod namespace;
pub mod nfs_node_plugin;
pub mod node_plugin;
pub mod pod;
pub mod rbac;
pub mod security;
pub mod storage_classes;

use crate::config::Config;
use crate::error::Result;
use crate::inventory::{Cloud, GateOutcome, InventoryGate, ShareType, ShareTypeInventory};
use crate::kubernetes::ManagedObject;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::Client;
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Namespace,
    CaCertProjection,
    CredentialsRequest,
    InventoryGate,
    DriverCredentials,
    StorageClasses,
    SecurityContextConstraints,
    NfsNodePluginRbac,
    NfsNodePluginDaemonSet,
    CsiDriver,
    ControllerPluginRbac,
    ControllerPluginDeployment,
    NodePluginRbac,
    NodePluginDaemonSet,
}

/// Order in which the steps of a pass run
pub const PIPELINE: [Step; 14] = [
    Step::Namespace,
    Step::CaCertProjection,
    Step::CredentialsRequest,
    Step::InventoryGate,
    Step::DriverCredentials,
    Step::StorageClasses,
    Step::SecurityContextConstraints,
    Step::NfsNodePluginRbac,
    Step::NfsNodePluginDaemonSet,
    Step::CsiDriver,
    Step::ControllerPluginRbac,
    Step::ControllerPluginDeployment,
    Step::NodePluginRbac,
    Step::NodePluginDaemonSet,
];

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Collaborators shared by all steps of one pass
pub struct PassContext<'a> {
    pub client: &'a Client,
    pub config: &'a Config,
    pub inventory: &'a dyn ShareTypeInventory,
    /// Controller reference stamped on every managed object
    pub owner: OwnerReference,
}

/// Values read by earlier steps and consumed by later ones
#[derive(Debug, Default)]
pub struct PassState {
    pub ca_bundle: Option<String>,
    pub cloud: Option<Cloud>,
    pub share_types: Vec<ShareType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Continue,
    /// Inputs are not there yet; retry the pass later
    Deferred,
    /// The remaining steps do not apply to this cloud
    SkipRemaining,
}

impl Step {
    /// Objects this step converges, given what earlier steps read
    pub fn desired_objects(self, config: &Config, state: &PassState) -> Result<Vec<ManagedObject>> {
        Ok(match self {
            Step::Namespace => namespace::objects(),
            Step::CaCertProjection => ca_cert::objects(state.ca_bundle.as_deref()),
            Step::CredentialsRequest => credentials::request_objects(config),
            Step::InventoryGate => Vec::new(),
            Step::DriverCredentials => match &state.cloud {
                Some(cloud) => credentials::driver_secret_objects(cloud, state.ca_bundle.as_deref()),
                None => Vec::new(),
            },
            Step::StorageClasses => storage_classes::objects(&state.share_types),
            Step::SecurityContextConstraints => security::objects(),
            Step::NfsNodePluginRbac => nfs_node_plugin::rbac_objects(),
            Step::NfsNodePluginDaemonSet => nfs_node_plugin::daemon_set_objects(config)?,
            Step::CsiDriver => csi_driver::objects(),
            Step::ControllerPluginRbac => controller_plugin::rbac_objects(),
            Step::ControllerPluginDeployment => controller_plugin::deployment_objects(config)?,
            Step::NodePluginRbac => node_plugin::rbac_objects(),
            Step::NodePluginDaemonSet => node_plugin::daemon_set_objects(config)?,
        })
    }

    #[instrument(skip(ctx, state))]
    pub async fn run(self, ctx: &PassContext<'_>, state: &mut PassState) -> Result<StepOutcome> {
        match self {
            Step::CaCertProjection => {
                state.ca_bundle = ca_cert::read_ca_bundle(ctx.client, ctx.config).await?;
            }
            Step::InventoryGate => {
                let gate = InventoryGate::new(ctx.inventory);
                match gate.resolve(ctx.client, ctx.config, state.ca_bundle.as_deref()).await? {
                    GateOutcome::Available { cloud, share_types } => {
                        state.cloud = Some(cloud);
                        state.share_types = storage_classes::distinct(share_types);
                    }
                    GateOutcome::CredentialsPending => return Ok(StepOutcome::Deferred),
                    GateOutcome::ServiceAbsent => {
                        info!("OpenStack Manila is not available in the cloud");
                        return Ok(StepOutcome::SkipRemaining);
                    }
                }
            }
            _ => {}
        }

        let objects = self.desired_objects(ctx.config, state)?;
        let names: BTreeSet<String> = objects.iter().map(|object| object.id().name).collect();
        for object in objects {
            let id = object.id();
            let result = object.owned_by(&ctx.owner).converge(ctx.client).await?;
            debug!("{} converged: {:?}", id, result);
        }

        if self == Step::StorageClasses {
            storage_classes::remove_stale(ctx.client, &names).await?;
        }
        Ok(StepOutcome::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::names::{CREDENTIALS_REQUEST_NAMESPACE, DRIVER_NAMESPACE};
    use crate::inventory::cloud::parse_cloud;
    use crate::inventory::fake::{FakeInventory, CLOUDS_YAML};
    use crate::kubernetes::ManagedKind;
    use crate::test_utils::FakeApiServer;

    fn make_config() -> Config {
        Config::from_lookup(|_| None).unwrap()
    }

    fn make_state() -> PassState {
        PassState {
            ca_bundle: Some("pem".to_string()),
            cloud: Some(parse_cloud(CLOUDS_YAML.as_bytes(), "openstack").unwrap()),
            share_types: vec![ShareType {
                id: "1".to_string(),
                name: "default".to_string(),
                extra_specs: Default::default(),
                required_extra_specs: Default::default(),
            }],
        }
    }

    fn make_owner() -> OwnerReference {
        OwnerReference {
            api_version: "manila.csi.openshift.io/v1alpha1".to_string(),
            kind: "ManilaDriver".to_string(),
            name: "cluster".to_string(),
            uid: "uid-1".to_string(),
            controller: Some(true),
            ..Default::default()
        }
    }

    fn all_objects() -> Vec<ManagedObject> {
        let (config, state) = (make_config(), make_state());
        PIPELINE
            .iter()
            .flat_map(|step| step.desired_objects(&config, &state).unwrap())
            .collect()
    }

    #[test]
    fn test_pipeline_order() {
        assert_eq!(PIPELINE[0], Step::Namespace);
        assert_eq!(PIPELINE[3], Step::InventoryGate);
        assert_eq!(PIPELINE[5], Step::StorageClasses);
        assert_eq!(PIPELINE[13], Step::NodePluginDaemonSet);

        let gate = PIPELINE.iter().position(|s| *s == Step::InventoryGate).unwrap();
        let credentials = PIPELINE.iter().position(|s| *s == Step::CredentialsRequest).unwrap();
        assert!(credentials < gate);
    }

    #[test]
    fn test_templates_are_namespaced_by_scope() {
        for object in all_objects() {
            let namespace = object.meta().namespace.as_deref();
            match object.kind() {
                ManagedKind::CredentialsRequest => {
                    assert_eq!(namespace, Some(CREDENTIALS_REQUEST_NAMESPACE))
                }
                kind if kind.is_namespaced() => assert_eq!(namespace, Some(DRIVER_NAMESPACE)),
                _ => assert_eq!(namespace, None, "{} must be cluster scoped", object.id()),
            }
        }
    }

    #[test]
    fn test_templates_are_deterministic() {
        assert_eq!(format!("{:?}", all_objects()), format!("{:?}", all_objects()));
    }

    #[test]
    fn test_object_identities_are_unique() {
        let ids: Vec<_> = all_objects().iter().map(|o| o.id()).collect();
        let unique: std::collections::HashSet<_> = ids.iter().cloned().collect();
        assert_eq!(ids.len(), unique.len());
    }

    #[test]
    fn test_workloads_use_configured_images() {
        let config = Config::from_lookup(|key| {
            (key == "DRIVER_IMAGE").then(|| "example.com/manila:dev".to_string())
        })
        .unwrap();
        let objects = Step::NodePluginDaemonSet
            .desired_objects(&config, &PassState::default())
            .unwrap();
        let ManagedObject::DaemonSet(ds) = &objects[0] else {
            panic!("expected a DaemonSet");
        };

        let containers = &ds.spec.as_ref().unwrap().template.spec.as_ref().unwrap().containers;
        assert_eq!(containers.len(), 2);
        assert_eq!(containers[1].image.as_deref(), Some("example.com/manila:dev"));
    }

    #[tokio::test]
    async fn test_gate_defers_without_credentials() {
        let server = FakeApiServer::new();
        let client = server.client();
        let config = make_config();
        let inventory = FakeInventory::with_share_types(&["default"]);
        let ctx = PassContext {
            client: &client,
            config: &config,
            inventory: &inventory,
            owner: make_owner(),
        };
        let mut state = PassState::default();

        let outcome = Step::InventoryGate.run(&ctx, &mut state).await.unwrap();

        assert_eq!(outcome, StepOutcome::Deferred);
        assert!(server.writes().is_empty());
    }

    #[tokio::test]
    async fn test_storage_classes_follow_share_types() {
        let server = FakeApiServer::new();
        let client = server.client();
        let config = make_config();
        let inventory = FakeInventory::service_absent();
        let ctx = PassContext {
            client: &client,
            config: &config,
            inventory: &inventory,
            owner: make_owner(),
        };
        let mut state = make_state();
        state.share_types.push(ShareType {
            id: "2".to_string(),
            name: "gold".to_string(),
            extra_specs: Default::default(),
            required_extra_specs: Default::default(),
        });

        Step::StorageClasses.run(&ctx, &mut state).await.unwrap();
        assert!(server
            .object("/apis/storage.k8s.io/v1/storageclasses/csi-manila-gold")
            .is_some());

        state.share_types.truncate(1);
        let outcome = Step::StorageClasses.run(&ctx, &mut state).await.unwrap();

        assert_eq!(outcome, StepOutcome::Continue);
        assert!(server
            .object("/apis/storage.k8s.io/v1/storageclasses/csi-manila-gold")
            .is_none());
        assert!(server
            .object("/apis/storage.k8s.io/v1/storageclasses/csi-manila-default")
            .is_some());
    }

    #[tokio::test]
    async fn test_step_stamps_owner_on_objects() {
        let server = FakeApiServer::new();
        let client = server.client();
        let config = make_config();
        let inventory = FakeInventory::service_absent();
        let ctx = PassContext {
            client: &client,
            config: &config,
            inventory: &inventory,
            owner: make_owner(),
        };

        let outcome = Step::NodePluginRbac
            .run(&ctx, &mut PassState::default())
            .await
            .unwrap();

        assert_eq!(outcome, StepOutcome::Continue);
        let crb = server
            .object("/apis/rbac.authorization.k8s.io/v1/clusterrolebindings/openstack-manila-csi-nodeplugin")
            .unwrap();
        assert_eq!(crb["metadata"]["ownerReferences"][0]["uid"], "uid-1");
        assert_eq!(crb["metadata"]["labels"]["app"], "openstack-manila-csi");
        assert_eq!(server.writes().len(), 3);
    }
}
