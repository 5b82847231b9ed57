// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities: an in-memory Kubernetes API server behind a kube `Client`.

use bytes::Bytes;
use http::{Request, Response};
use http_body_util::BodyExt;
use kube::client::Body;
use kube::{Client, Resource, ResourceExt};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::Service;

/// A request observed by the fake API server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
}

#[derive(Default)]
struct State {
    objects: BTreeMap<String, Value>,
    requests: Vec<RecordedRequest>,
    failures: Vec<(String, String, u16)>,
    version: u64,
}

/// Stateful fake of the Kubernetes API server.
///
/// Objects are stored by their item path. Supports get, list (with label
/// selectors), create, replace, JSON merge patch (including the status
/// subresource) and delete. Deleting a namespace removes everything inside it,
/// and objects with finalizers are only marked for deletion.
#[derive(Clone, Default)]
pub struct FakeApiServer {
    state: Arc<Mutex<State>>,
}

impl FakeApiServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a kube Client talking to this server
    pub fn client(&self) -> Client {
        Client::new(self.clone(), "default")
    }

    /// Store an object directly, bypassing the request log
    pub fn insert<K>(&self, obj: &K)
    where
        K: Resource<DynamicType = ()> + Serialize,
    {
        let path = object_path::<K>(obj.meta().namespace.as_deref(), &obj.name_any());
        let mut value = serde_json::to_value(obj).unwrap();
        let mut state = self.state.lock().unwrap();
        state.stamp(&mut value);
        state.objects.insert(path, value);
    }

    /// Answer requests matching `method` and path prefix with an error status
    pub fn fail(&self, method: &str, path_prefix: &str, status: u16) {
        self.state
            .lock()
            .unwrap()
            .failures
            .push((method.to_string(), path_prefix.to_string(), status));
    }

    pub fn object(&self, path: &str) -> Option<Value> {
        self.state.lock().unwrap().objects.get(path).cloned()
    }

    pub fn paths(&self) -> Vec<String> {
        self.state.lock().unwrap().objects.keys().cloned().collect()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    /// All non-GET requests, in order
    pub fn writes(&self) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method != "GET")
            .collect()
    }

    /// Number of requests with exactly this method and path
    pub fn count(&self, method: &str, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }
}

/// Item path of a typed object
pub fn object_path<K: Resource<DynamicType = ()>>(namespace: Option<&str>, name: &str) -> String {
    format!("{}/{}", K::url_path(&(), namespace), name)
}

struct Route {
    collection: String,
    name: Option<String>,
    subresource: Option<String>,
}

impl Route {
    fn parse(path: &str) -> Option<Self> {
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
        let prefix = match segments.first() {
            Some(&"api") => 2,
            Some(&"apis") => 3,
            _ => return None,
        };
        let rest = segments.get(prefix..).filter(|r| !r.is_empty())?;
        let scope = if rest[0] == "namespaces" && rest.len() >= 3 { 3 } else { 1 };

        Some(Route {
            collection: format!("/{}", segments[..prefix + scope].join("/")),
            name: rest.get(scope).map(|s| s.to_string()),
            subresource: rest.get(scope + 1).map(|s| s.to_string()),
        })
    }

    fn item(&self, name: &str) -> String {
        format!("{}/{}", self.collection, name)
    }
}

impl State {
    fn stamp(&mut self, value: &mut Value) {
        self.version += 1;
        let meta = &mut value["metadata"];
        if meta.get("uid").is_none() {
            meta["uid"] = json!(format!("uid-{}", self.version));
        }
        meta["resourceVersion"] = json!(self.version.to_string());
    }

    fn handle(&mut self, method: &str, path: &str, query: Option<&str>, body: &[u8]) -> (u16, Value) {
        self.requests.push(RecordedRequest {
            method: method.to_string(),
            path: path.to_string(),
        });

        if let Some((_, _, code)) = self
            .failures
            .iter()
            .find(|(m, p, _)| m == method && path.starts_with(p.as_str()))
        {
            return (*code, status_json(*code, "injected failure"));
        }

        let Some(route) = Route::parse(path) else {
            return (404, status_json(404, "unknown path"));
        };
        let body: Value = serde_json::from_slice(body).unwrap_or(Value::Null);

        match (method, route.name.clone()) {
            ("GET", None) => (200, self.list(&route.collection, query)),
            ("GET", Some(name)) => self.get(&route.item(&name)),
            ("POST", None) => self.create(&route, body),
            ("PUT", Some(name)) => self.update(&route.item(&name), |_| body),
            ("PATCH", Some(name)) => {
                let item = route.item(&name);
                let status_only = route.subresource.as_deref() == Some("status");
                self.update(&item, |mut current| {
                    let patch = if status_only {
                        json!({ "status": body["status"].clone() })
                    } else {
                        body
                    };
                    merge_patch(&mut current, &patch);
                    current
                })
            }
            ("DELETE", Some(name)) => self.delete(&route, &name),
            _ => (405, status_json(405, "method not allowed")),
        }
    }

    fn list(&self, collection: &str, query: Option<&str>) -> Value {
        let selector: Vec<(String, String)> = query
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .filter(|(k, _)| k == "labelSelector")
                    .flat_map(|(_, v)| {
                        v.split(',')
                            .filter_map(|pair| pair.split_once('='))
                            .map(|(k, v)| (k.to_string(), v.to_string()))
                            .collect::<Vec<_>>()
                    })
                    .collect()
            })
            .unwrap_or_default();

        let items: Vec<Value> = self
            .objects
            .iter()
            .filter(|(path, _)| path.rsplit_once('/').map(|(parent, _)| parent) == Some(collection))
            .map(|(_, obj)| obj)
            .filter(|obj| {
                selector
                    .iter()
                    .all(|(k, v)| obj["metadata"]["labels"][k.as_str()] == json!(v))
            })
            .cloned()
            .collect();

        json!({
            "apiVersion": "v1",
            "kind": "List",
            "metadata": { "resourceVersion": "" },
            "items": items
        })
    }

    fn get(&self, item: &str) -> (u16, Value) {
        match self.objects.get(item) {
            Some(obj) => (200, obj.clone()),
            None => (404, status_json(404, &format!("{} not found", item))),
        }
    }

    fn create(&mut self, route: &Route, mut body: Value) -> (u16, Value) {
        let Some(name) = body["metadata"]["name"].as_str().map(str::to_string) else {
            return (422, status_json(422, "metadata.name is required"));
        };
        let item = route.item(&name);
        if self.objects.contains_key(&item) {
            return (409, status_json(409, &format!("{} already exists", item)));
        }
        self.stamp(&mut body);
        self.objects.insert(item, body.clone());
        (201, body)
    }

    fn update<F>(&mut self, item: &str, apply: F) -> (u16, Value)
    where
        F: FnOnce(Value) -> Value,
    {
        let Some(current) = self.objects.get(item).cloned() else {
            return (404, status_json(404, &format!("{} not found", item)));
        };
        let uid = current["metadata"]["uid"].clone();
        let deletion = current["metadata"]["deletionTimestamp"].clone();

        let mut updated = apply(current);
        updated["metadata"]["uid"] = uid;
        if !deletion.is_null() {
            updated["metadata"]["deletionTimestamp"] = deletion;
        }
        self.stamp(&mut updated);

        if !updated["metadata"]["deletionTimestamp"].is_null() && !has_finalizers(&updated) {
            self.objects.remove(item);
        } else {
            self.objects.insert(item.to_string(), updated.clone());
        }
        (200, updated)
    }

    fn delete(&mut self, route: &Route, name: &str) -> (u16, Value) {
        let item = route.item(name);
        let Some(obj) = self.objects.get_mut(&item) else {
            return (404, status_json(404, &format!("{} not found", item)));
        };

        if has_finalizers(obj) {
            obj["metadata"]["deletionTimestamp"] = json!("2026-01-01T00:00:00Z");
            return (200, obj.clone());
        }

        self.objects.remove(&item);
        if route.collection == "/api/v1/namespaces" {
            let contained = format!("/namespaces/{}/", name);
            self.objects.retain(|path, _| !path.contains(&contained));
        }
        (200, status_json(200, "deleted"))
    }
}

fn has_finalizers(obj: &Value) -> bool {
    obj["metadata"]["finalizers"]
        .as_array()
        .is_some_and(|f| !f.is_empty())
}

/// RFC 7386 JSON merge patch
fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = json!({});
    }
    if let Value::Object(target) = target {
        for (key, value) in patch {
            if value.is_null() {
                target.remove(key);
            } else {
                merge_patch(target.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}

/// Create a Kubernetes Status response body
pub fn status_json(code: u16, message: &str) -> Value {
    let (status, reason) = match code {
        200..=299 => ("Success", ""),
        404 => ("Failure", "NotFound"),
        409 => ("Failure", "AlreadyExists"),
        403 => ("Failure", "Forbidden"),
        _ => ("Failure", "InternalError"),
    };
    json!({
        "kind": "Status",
        "apiVersion": "v1",
        "metadata": {},
        "status": status,
        "message": message,
        "reason": reason,
        "code": code
    })
}

impl Service<Request<Body>> for FakeApiServer {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();
        let query = req.uri().query().map(str::to_string);
        let state = self.state.clone();

        Box::pin(async move {
            let body: Bytes = req.into_body().collect().await?.to_bytes();
            let (status, response) =
                state
                    .lock()
                    .unwrap()
                    .handle(&method, &path, query.as_deref(), &body);

            Ok(Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&response)?))
                .unwrap())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_cluster_collection() {
        let route = Route::parse("/api/v1/namespaces").unwrap();
        assert_eq!(route.collection, "/api/v1/namespaces");
        assert_eq!(route.name, None);
    }

    #[test]
    fn test_route_namespace_item() {
        let route = Route::parse("/api/v1/namespaces/manila").unwrap();
        assert_eq!(route.collection, "/api/v1/namespaces");
        assert_eq!(route.name.as_deref(), Some("manila"));
    }

    #[test]
    fn test_route_namespaced_item_with_subresource() {
        let route = Route::parse("/apis/apps/v1/namespaces/manila/deployments/ctrl/status").unwrap();
        assert_eq!(route.collection, "/apis/apps/v1/namespaces/manila/deployments");
        assert_eq!(route.name.as_deref(), Some("ctrl"));
        assert_eq!(route.subresource.as_deref(), Some("status"));
    }

    #[test]
    fn test_merge_patch_replaces_arrays_and_removes_nulls() {
        let mut target = json!({ "a": [1, 2], "b": { "c": 1, "d": 2 } });
        merge_patch(&mut target, &json!({ "a": [], "b": { "c": null } }));
        assert_eq!(target, json!({ "a": [], "b": { "d": 2 } }));
    }
}
