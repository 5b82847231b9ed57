// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Last-applied annotation used to detect drift between a template and the stored object.
//!
//! The annotation holds the canonical JSON of the object as the operator last wrote it.
//! Comparison parses both sides and compares JSON values, so key order and
//! whitespace never cause an update.

use crate::constants::annotations::LAST_APPLIED;
use crate::error::Result;
use kube::Resource;
use serde::Serialize;
use serde_json::Value;

/// Metadata fields owned by the API server, never part of a snapshot
const SERVER_MANAGED_METADATA: &[&str] = &[
    "creationTimestamp",
    "deletionGracePeriodSeconds",
    "deletionTimestamp",
    "generation",
    "managedFields",
    "resourceVersion",
    "selfLink",
    "uid",
];

/// Canonical serialization of an object, excluding status, server-managed
/// metadata and the last-applied annotation itself.
pub fn snapshot<K: Serialize>(obj: &K) -> Result<String> {
    let mut value = serde_json::to_value(obj)?;

    if let Some(root) = value.as_object_mut() {
        root.remove("status");

        if let Some(meta) = root.get_mut("metadata").and_then(Value::as_object_mut) {
            for field in SERVER_MANAGED_METADATA {
                meta.remove(*field);
            }

            let drop_annotations = match meta.get_mut("annotations").and_then(Value::as_object_mut) {
                Some(annotations) => {
                    annotations.remove(LAST_APPLIED);
                    annotations.is_empty()
                }
                None => false,
            };
            if drop_annotations {
                meta.remove("annotations");
            }
        }
    }

    Ok(serde_json::to_string(&value)?)
}

/// Compute the snapshot of `obj` and store it in its annotations
pub fn attach<K: Resource + Serialize>(obj: &mut K) -> Result<()> {
    let snapshot = snapshot(obj)?;
    obj.meta_mut()
        .annotations
        .get_or_insert_with(Default::default)
        .insert(LAST_APPLIED.to_string(), snapshot);
    Ok(())
}

/// Read the stored snapshot of an object, if any
pub fn annotation<K: Resource>(obj: &K) -> Option<&str> {
    obj.meta()
        .annotations
        .as_ref()
        .and_then(|a| a.get(LAST_APPLIED))
        .map(String::as_str)
}

/// Structural comparison of the snapshots carried by `found` and `desired`.
///
/// A missing or unparseable annotation on either side counts as a difference.
pub fn is_unchanged<K: Resource>(found: &K, desired: &K) -> bool {
    let parse = |obj: &K| annotation(obj).and_then(|a| serde_json::from_str::<Value>(a).ok());

    match (parse(found), parse(desired)) {
        (Some(current), Some(modified)) => current == modified,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::ServiceAccount;
    use kube::api::ObjectMeta;
    use std::collections::BTreeMap;

    fn make_service_account(labels: &[(&str, &str)]) -> ServiceAccount {
        ServiceAccount {
            metadata: ObjectMeta {
                name: Some("sa".to_string()),
                namespace: Some("ns".to_string()),
                labels: Some(
                    labels
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect(),
                ),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn with_annotation(mut sa: ServiceAccount, value: &str) -> ServiceAccount {
        sa.metadata.annotations = Some(BTreeMap::from([(
            LAST_APPLIED.to_string(),
            value.to_string(),
        )]));
        sa
    }

    #[test]
    fn test_snapshot_excludes_own_annotation() {
        let mut sa = make_service_account(&[("app", "manila")]);
        attach(&mut sa).unwrap();
        let first = annotation(&sa).unwrap().to_string();

        // Attaching again must not nest the previous snapshot
        attach(&mut sa).unwrap();
        assert_eq!(annotation(&sa).unwrap(), first);
        assert!(!first.contains(LAST_APPLIED));
    }

    #[test]
    fn test_snapshot_keeps_foreign_annotations() {
        let mut sa = make_service_account(&[]);
        sa.metadata.annotations = Some(BTreeMap::from([(
            "example.com/note".to_string(),
            "kept".to_string(),
        )]));

        let snap = snapshot(&sa).unwrap();
        assert!(snap.contains("example.com/note"));
    }

    #[test]
    fn test_snapshot_ignores_server_managed_metadata() {
        let sa = make_service_account(&[("app", "manila")]);
        let mut stored = sa.clone();
        stored.metadata.resource_version = Some("42".to_string());
        stored.metadata.uid = Some("0000-1111".to_string());

        assert_eq!(snapshot(&sa).unwrap(), snapshot(&stored).unwrap());
    }

    #[test]
    fn test_is_unchanged_identical_templates() {
        let mut found = make_service_account(&[("app", "manila")]);
        let mut desired = found.clone();
        attach(&mut found).unwrap();
        attach(&mut desired).unwrap();

        assert!(is_unchanged(&found, &desired));
    }

    #[test]
    fn test_is_unchanged_detects_changed_field() {
        let mut found = make_service_account(&[("app", "manila")]);
        let mut desired = make_service_account(&[("app", "manila"), ("tier", "storage")]);
        attach(&mut found).unwrap();
        attach(&mut desired).unwrap();

        assert!(!is_unchanged(&found, &desired));
    }

    #[test]
    fn test_is_unchanged_ignores_key_order_and_whitespace() {
        let mut desired = make_service_account(&[("app", "manila"), ("component", "node")]);
        attach(&mut desired).unwrap();

        let reordered = r#"{
            "metadata": { "namespace": "ns",
                          "labels": { "component": "node", "app": "manila" },
                          "name": "sa" },
            "kind": "ServiceAccount",
            "apiVersion": "v1"
        }"#;
        let found = with_annotation(make_service_account(&[]), reordered);

        assert!(is_unchanged(&found, &desired));
    }

    #[test]
    fn test_is_unchanged_missing_annotation_is_different() {
        let found = make_service_account(&[("app", "manila")]);
        let mut desired = found.clone();
        attach(&mut desired).unwrap();

        assert!(!is_unchanged(&found, &desired));
    }

    #[test]
    fn test_is_unchanged_garbage_annotation_is_different() {
        let found = with_annotation(make_service_account(&[]), "{not json");
        let mut desired = make_service_account(&[]);
        attach(&mut desired).unwrap();

        assert!(!is_unchanged(&found, &desired));
    }
}
