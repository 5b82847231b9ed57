// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! The closed set of object kinds the operator manages.

use crate::constants::labels;
use crate::error::Result;
use crate::kubernetes::converge::{converge, Convergence};
use crate::types::CredentialsRequest;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment};
use k8s_openapi::api::core::v1::{ConfigMap, Namespace, Secret, ServiceAccount};
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, Role, RoleBinding};
use k8s_openapi::api::storage::v1::{CSIDriver, StorageClass};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use k8s_openapi::NamespaceResourceScope;
use kube::{
    api::{ApiResource, DeleteParams, DynamicObject, GroupVersionKind, ObjectMeta},
    Api, Client, Resource,
};
use serde::de::DeserializeOwned;
use std::fmt;
use tracing::{debug, info};

/// API resource of OpenShift SecurityContextConstraints, which has no typed binding
pub fn scc_resource() -> ApiResource {
    ApiResource::from_gvk_with_plural(
        &GroupVersionKind::gvk("security.openshift.io", "v1", "SecurityContextConstraints"),
        "securitycontextconstraints",
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManagedKind {
    Namespace,
    ConfigMap,
    Secret,
    ServiceAccount,
    ClusterRole,
    ClusterRoleBinding,
    Role,
    RoleBinding,
    DaemonSet,
    Deployment,
    CsiDriver,
    StorageClass,
    CredentialsRequest,
    SecurityContextConstraints,
}

impl ManagedKind {
    pub fn is_namespaced(self) -> bool {
        matches!(
            self,
            ManagedKind::ConfigMap
                | ManagedKind::Secret
                | ManagedKind::ServiceAccount
                | ManagedKind::Role
                | ManagedKind::RoleBinding
                | ManagedKind::DaemonSet
                | ManagedKind::Deployment
                | ManagedKind::CredentialsRequest
        )
    }
}

impl fmt::Display for ManagedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManagedKind::CsiDriver => f.write_str("CSIDriver"),
            other => fmt::Debug::fmt(other, f),
        }
    }
}

/// Identity of a managed object in the store
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectId {
    pub kind: ManagedKind,
    pub namespace: Option<String>,
    pub name: String,
}

impl ObjectId {
    pub fn cluster(kind: ManagedKind, name: &str) -> Self {
        Self {
            kind,
            namespace: None,
            name: name.to_string(),
        }
    }

    pub fn namespaced(kind: ManagedKind, namespace: &str, name: &str) -> Self {
        Self {
            kind,
            namespace: Some(namespace.to_string()),
            name: name.to_string(),
        }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{} {}/{}", self.kind, ns, self.name),
            None => write!(f, "{} {}", self.kind, self.name),
        }
    }
}

/// A desired object of one of the managed kinds
#[derive(Debug, Clone)]
pub enum ManagedObject {
    Namespace(Namespace),
    ConfigMap(ConfigMap),
    Secret(Secret),
    ServiceAccount(ServiceAccount),
    ClusterRole(ClusterRole),
    ClusterRoleBinding(ClusterRoleBinding),
    Role(Role),
    RoleBinding(RoleBinding),
    DaemonSet(DaemonSet),
    Deployment(Deployment),
    CsiDriver(CSIDriver),
    StorageClass(StorageClass),
    CredentialsRequest(CredentialsRequest),
    SecurityContextConstraints(DynamicObject),
}

impl ManagedObject {
    pub fn kind(&self) -> ManagedKind {
        match self {
            ManagedObject::Namespace(_) => ManagedKind::Namespace,
            ManagedObject::ConfigMap(_) => ManagedKind::ConfigMap,
            ManagedObject::Secret(_) => ManagedKind::Secret,
            ManagedObject::ServiceAccount(_) => ManagedKind::ServiceAccount,
            ManagedObject::ClusterRole(_) => ManagedKind::ClusterRole,
            ManagedObject::ClusterRoleBinding(_) => ManagedKind::ClusterRoleBinding,
            ManagedObject::Role(_) => ManagedKind::Role,
            ManagedObject::RoleBinding(_) => ManagedKind::RoleBinding,
            ManagedObject::DaemonSet(_) => ManagedKind::DaemonSet,
            ManagedObject::Deployment(_) => ManagedKind::Deployment,
            ManagedObject::CsiDriver(_) => ManagedKind::CsiDriver,
            ManagedObject::StorageClass(_) => ManagedKind::StorageClass,
            ManagedObject::CredentialsRequest(_) => ManagedKind::CredentialsRequest,
            ManagedObject::SecurityContextConstraints(_) => ManagedKind::SecurityContextConstraints,
        }
    }

    pub fn meta(&self) -> &ObjectMeta {
        match self {
            ManagedObject::Namespace(o) => &o.metadata,
            ManagedObject::ConfigMap(o) => &o.metadata,
            ManagedObject::Secret(o) => &o.metadata,
            ManagedObject::ServiceAccount(o) => &o.metadata,
            ManagedObject::ClusterRole(o) => &o.metadata,
            ManagedObject::ClusterRoleBinding(o) => &o.metadata,
            ManagedObject::Role(o) => &o.metadata,
            ManagedObject::RoleBinding(o) => &o.metadata,
            ManagedObject::DaemonSet(o) => &o.metadata,
            ManagedObject::Deployment(o) => &o.metadata,
            ManagedObject::CsiDriver(o) => &o.metadata,
            ManagedObject::StorageClass(o) => &o.metadata,
            ManagedObject::CredentialsRequest(o) => &o.metadata,
            ManagedObject::SecurityContextConstraints(o) => &o.metadata,
        }
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        match self {
            ManagedObject::Namespace(o) => &mut o.metadata,
            ManagedObject::ConfigMap(o) => &mut o.metadata,
            ManagedObject::Secret(o) => &mut o.metadata,
            ManagedObject::ServiceAccount(o) => &mut o.metadata,
            ManagedObject::ClusterRole(o) => &mut o.metadata,
            ManagedObject::ClusterRoleBinding(o) => &mut o.metadata,
            ManagedObject::Role(o) => &mut o.metadata,
            ManagedObject::RoleBinding(o) => &mut o.metadata,
            ManagedObject::DaemonSet(o) => &mut o.metadata,
            ManagedObject::Deployment(o) => &mut o.metadata,
            ManagedObject::CsiDriver(o) => &mut o.metadata,
            ManagedObject::StorageClass(o) => &mut o.metadata,
            ManagedObject::CredentialsRequest(o) => &mut o.metadata,
            ManagedObject::SecurityContextConstraints(o) => &mut o.metadata,
        }
    }

    pub fn id(&self) -> ObjectId {
        let meta = self.meta();
        ObjectId {
            kind: self.kind(),
            namespace: meta.namespace.clone(),
            name: meta.name.clone().unwrap_or_default(),
        }
    }

    /// Mark the object as controlled by `owner` and carry the operator's app label
    pub fn owned_by(mut self, owner: &OwnerReference) -> Self {
        let meta = self.meta_mut();
        meta.owner_references = Some(vec![owner.clone()]);
        meta.labels
            .get_or_insert_with(Default::default)
            .insert(labels::APP.to_string(), labels::APP_VALUE.to_string());
        self
    }

    /// Create or update the object in the cluster
    pub async fn converge(self, client: &Client) -> Result<Convergence> {
        let kind = self.kind().to_string();
        let client = client.clone();
        match self {
            ManagedObject::Namespace(o) => converge(&Api::all(client), &kind, o).await,
            ManagedObject::ConfigMap(o) => converge(&namespaced(client, &o), &kind, o).await,
            ManagedObject::Secret(o) => converge(&namespaced(client, &o), &kind, o).await,
            ManagedObject::ServiceAccount(o) => converge(&namespaced(client, &o), &kind, o).await,
            ManagedObject::ClusterRole(o) => converge(&Api::all(client), &kind, o).await,
            ManagedObject::ClusterRoleBinding(o) => converge(&Api::all(client), &kind, o).await,
            ManagedObject::Role(o) => converge(&namespaced(client, &o), &kind, o).await,
            ManagedObject::RoleBinding(o) => converge(&namespaced(client, &o), &kind, o).await,
            ManagedObject::DaemonSet(o) => converge(&namespaced(client, &o), &kind, o).await,
            ManagedObject::Deployment(o) => converge(&namespaced(client, &o), &kind, o).await,
            ManagedObject::CsiDriver(o) => converge(&Api::all(client), &kind, o).await,
            ManagedObject::StorageClass(o) => converge(&Api::all(client), &kind, o).await,
            ManagedObject::CredentialsRequest(o) => {
                converge(&namespaced(client, &o), &kind, o).await
            }
            ManagedObject::SecurityContextConstraints(o) => {
                converge(&Api::all_with(client, &scc_resource()), &kind, o).await
            }
        }
    }
}

fn namespaced<K>(client: Client, obj: &K) -> Api<K>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>,
{
    Api::namespaced(client, obj.meta().namespace.as_deref().unwrap_or_default())
}

/// Outcome of a tolerant delete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deletion {
    Deleted,
    AlreadyGone,
}

/// Delete an object by identity; a missing object is not an error
pub async fn delete(client: &Client, id: &ObjectId) -> Result<Deletion> {
    let client = client.clone();
    let ns = id.namespace.as_deref().unwrap_or_default();
    match id.kind {
        ManagedKind::Namespace => delete_from(Api::<Namespace>::all(client), id).await,
        ManagedKind::ConfigMap => delete_from(Api::<ConfigMap>::namespaced(client, ns), id).await,
        ManagedKind::Secret => delete_from(Api::<Secret>::namespaced(client, ns), id).await,
        ManagedKind::ServiceAccount => {
            delete_from(Api::<ServiceAccount>::namespaced(client, ns), id).await
        }
        ManagedKind::ClusterRole => delete_from(Api::<ClusterRole>::all(client), id).await,
        ManagedKind::ClusterRoleBinding => {
            delete_from(Api::<ClusterRoleBinding>::all(client), id).await
        }
        ManagedKind::Role => delete_from(Api::<Role>::namespaced(client, ns), id).await,
        ManagedKind::RoleBinding => {
            delete_from(Api::<RoleBinding>::namespaced(client, ns), id).await
        }
        ManagedKind::DaemonSet => delete_from(Api::<DaemonSet>::namespaced(client, ns), id).await,
        ManagedKind::Deployment => {
            delete_from(Api::<Deployment>::namespaced(client, ns), id).await
        }
        ManagedKind::CsiDriver => delete_from(Api::<CSIDriver>::all(client), id).await,
        ManagedKind::StorageClass => delete_from(Api::<StorageClass>::all(client), id).await,
        ManagedKind::CredentialsRequest => {
            delete_from(Api::<CredentialsRequest>::namespaced(client, ns), id).await
        }
        ManagedKind::SecurityContextConstraints => {
            delete_from(Api::<DynamicObject>::all_with(client, &scc_resource()), id).await
        }
    }
}

async fn delete_from<K>(api: Api<K>, id: &ObjectId) -> Result<Deletion>
where
    K: Resource + Clone + DeserializeOwned + fmt::Debug,
{
    match api.delete(&id.name, &DeleteParams::default()).await {
        Ok(_) => {
            info!("{} was deleted successfully", id);
            Ok(Deletion::Deleted)
        }
        Err(kube::Error::Api(err)) if err.code == 404 => {
            debug!("{} is already gone", id);
            Ok(Deletion::AlreadyGone)
        }
        Err(e) => Err(e.into()),
    }
}
