// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Builders for ServiceAccounts and the RBAC objects binding them.

use crate::constants::names::DRIVER_NAMESPACE;
use crate::kubernetes::ManagedObject;
use k8s_openapi::api::core::v1::ServiceAccount;
use k8s_openapi::api::rbac::v1::{
    ClusterRole, ClusterRoleBinding, PolicyRule, Role, RoleBinding, RoleRef, Subject,
};
use kube::api::ObjectMeta;

pub fn rule(api_group: &str, resources: &[&str], verbs: &[&str]) -> PolicyRule {
    PolicyRule {
        api_groups: Some(vec![api_group.to_string()]),
        resources: Some(resources.iter().map(|r| r.to_string()).collect()),
        verbs: verbs.iter().map(|v| v.to_string()).collect(),
        ..Default::default()
    }
}

fn cluster_meta(name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        ..Default::default()
    }
}

fn namespaced_meta(name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(DRIVER_NAMESPACE.to_string()),
        ..Default::default()
    }
}

fn subject(service_account: &str) -> Subject {
    Subject {
        kind: "ServiceAccount".to_string(),
        name: service_account.to_string(),
        namespace: Some(DRIVER_NAMESPACE.to_string()),
        ..Default::default()
    }
}

pub fn service_account(name: &str) -> ManagedObject {
    ManagedObject::ServiceAccount(ServiceAccount {
        metadata: namespaced_meta(name),
        ..Default::default()
    })
}

pub fn cluster_role(name: &str, rules: Vec<PolicyRule>) -> ManagedObject {
    ManagedObject::ClusterRole(ClusterRole {
        metadata: cluster_meta(name),
        rules: Some(rules),
        ..Default::default()
    })
}

/// Bind the ClusterRole `name` to the ServiceAccount of the same name
pub fn cluster_role_binding(name: &str) -> ManagedObject {
    ManagedObject::ClusterRoleBinding(ClusterRoleBinding {
        metadata: cluster_meta(name),
        role_ref: RoleRef {
            api_group: "rbac.authorization.k8s.io".to_string(),
            kind: "ClusterRole".to_string(),
            name: name.to_string(),
        },
        subjects: Some(vec![subject(name)]),
    })
}

pub fn role(name: &str, rules: Vec<PolicyRule>) -> ManagedObject {
    ManagedObject::Role(Role {
        metadata: namespaced_meta(name),
        rules: Some(rules),
    })
}

/// Bind the Role `name` to the ServiceAccount of the same name
pub fn role_binding(name: &str) -> ManagedObject {
    ManagedObject::RoleBinding(RoleBinding {
        metadata: namespaced_meta(name),
        role_ref: RoleRef {
            api_group: "rbac.authorization.k8s.io".to_string(),
            kind: "Role".to_string(),
            name: name.to_string(),
        },
        subjects: Some(vec![subject(name)]),
    })
}
