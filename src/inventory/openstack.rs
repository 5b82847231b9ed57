// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Keystone v3 authentication and Manila share-type listing

use crate::error::{ManilaOperatorError, Result};
use crate::inventory::cloud::{AuthInfo, Cloud};
use async_trait::async_trait;
use reqwest::{Certificate, Client as HttpClient, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, instrument};

const SHARE_SERVICE_TYPE: &str = "sharev2";
const SUBJECT_TOKEN_HEADER: &str = "X-Subject-Token";
const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// A Manila share type as returned by `GET /types`
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ShareType {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub extra_specs: BTreeMap<String, Value>,
    #[serde(default)]
    pub required_extra_specs: BTreeMap<String, Value>,
}

/// Result of asking the cloud for its share types
#[derive(Debug, Clone, PartialEq)]
pub enum ShareTypeListing {
    Found(Vec<ShareType>),
    /// Manila is not deployed in this cloud
    ServiceAbsent,
}

#[async_trait]
pub trait ShareTypeInventory: Send + Sync {
    async fn list_share_types(&self, cloud: &Cloud, ca_bundle: Option<&str>)
        -> Result<ShareTypeListing>;
}

/// Inventory backed by the OpenStack HTTP APIs
#[derive(Debug, Default, Clone)]
pub struct OpenStackInventory;

impl OpenStackInventory {
    pub fn new() -> Self {
        Self
    }

    fn http_client(cloud: &Cloud, ca_bundle: Option<&str>) -> Result<HttpClient> {
        let mut builder = HttpClient::builder().use_rustls_tls();

        if let Some(bundle) = ca_bundle {
            for cert in Certificate::from_pem_bundle(bundle.as_bytes())? {
                builder = builder.add_root_certificate(cert);
            }
        }
        if cloud.verify == Some(false) {
            builder = builder.danger_accept_invalid_certs(true);
        }

        Ok(builder.build()?)
    }
}

#[async_trait]
impl ShareTypeInventory for OpenStackInventory {
    #[instrument(skip(self, cloud, ca_bundle), fields(auth_url = %cloud.auth.auth_url))]
    async fn list_share_types(
        &self,
        cloud: &Cloud,
        ca_bundle: Option<&str>,
    ) -> Result<ShareTypeListing> {
        let http = Self::http_client(cloud, ca_bundle)?;

        let response = http
            .post(token_url(&cloud.auth.auth_url))
            .json(&auth_request(&cloud.auth)?)
            .send()
            .await?
            .error_for_status()?;

        let token = response
            .headers()
            .get(SUBJECT_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                ManilaOperatorError::InventoryError(format!(
                    "Keystone response carries no {} header",
                    SUBJECT_TOKEN_HEADER
                ))
            })?;
        let body: TokenResponse = response.json().await?;

        let Some(endpoint) = find_endpoint(
            &body.token.catalog,
            cloud.interface(),
            cloud.region_name.as_deref(),
        ) else {
            info!("No {} endpoint in the service catalog", SHARE_SERVICE_TYPE);
            return Ok(ShareTypeListing::ServiceAbsent);
        };

        let mut share_types = Vec::new();
        let mut visited = BTreeSet::new();
        let mut next = Some(format!("{}/types", endpoint.trim_end_matches('/')));
        while let Some(url) = next {
            if !visited.insert(url.clone()) {
                return Err(ManilaOperatorError::InventoryError(format!(
                    "share type listing links back to {}",
                    url
                )));
            }
            debug!("Listing share types from {}", url);
            let response = http.get(&url).header(AUTH_TOKEN_HEADER, &token).send().await?;
            if response.status() == StatusCode::NOT_FOUND {
                info!("Share type listing at {} returned 404", url);
                return Ok(ShareTypeListing::ServiceAbsent);
            }
            let page: ShareTypePage = response.error_for_status()?.json().await?;
            next = page.next_link().map(str::to_string);
            share_types.extend(page.share_types);
        }

        info!("Found {} share types", share_types.len());
        Ok(ShareTypeListing::Found(share_types))
    }
}

/// Keystone token endpoint for an `auth_url` with or without the `/v3` suffix
pub fn token_url(auth_url: &str) -> String {
    let base = auth_url.trim_end_matches('/');
    if base.ends_with("/v3") {
        format!("{}/auth/tokens", base)
    } else {
        format!("{}/v3/auth/tokens", base)
    }
}

fn named(id: &Option<String>, name: &Option<String>) -> Option<Value> {
    match (id, name) {
        (Some(id), _) => Some(json!({ "id": id })),
        (None, Some(name)) => Some(json!({ "name": name })),
        (None, None) => None,
    }
}

/// Keystone v3 token request body for password or application credential auth
pub fn auth_request(auth: &AuthInfo) -> Result<Value> {
    if let (Some(id), Some(secret)) = (
        &auth.application_credential_id,
        &auth.application_credential_secret,
    ) {
        return Ok(json!({
            "auth": {
                "identity": {
                    "methods": ["application_credential"],
                    "application_credential": { "id": id, "secret": secret }
                }
            }
        }));
    }

    let Some(password) = &auth.password else {
        return Err(ManilaOperatorError::CredentialsError(
            "cloud defines neither a password nor an application credential".to_string(),
        ));
    };
    let Some(Value::Object(mut user)) = named(&auth.user_id, &auth.username) else {
        return Err(ManilaOperatorError::CredentialsError(
            "cloud defines neither username nor user_id".to_string(),
        ));
    };
    user.insert("password".to_string(), json!(password));
    if auth.user_id.is_none() {
        let domain = named(&auth.user_domain_id, &auth.user_domain_name)
            .or_else(|| named(&auth.domain_id, &auth.domain_name));
        if let Some(domain) = domain {
            user.insert("domain".to_string(), domain);
        }
    }

    let mut body = json!({
        "auth": {
            "identity": {
                "methods": ["password"],
                "password": { "user": Value::Object(user) }
            }
        }
    });

    if let Some(Value::Object(mut project)) = named(&auth.project_id, &auth.project_name) {
        if auth.project_id.is_none() {
            let domain = named(&auth.project_domain_id, &auth.project_domain_name)
                .or_else(|| named(&auth.domain_id, &auth.domain_name));
            if let Some(domain) = domain {
                project.insert("domain".to_string(), domain);
            }
        }
        body["auth"]["scope"] = json!({ "project": Value::Object(project) });
    }

    Ok(body)
}

#[derive(Deserialize, Debug)]
struct TokenResponse {
    token: Token,
}

#[derive(Deserialize, Debug)]
struct Token {
    #[serde(default)]
    catalog: Vec<CatalogEntry>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CatalogEntry {
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Endpoint {
    pub interface: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub region_id: Option<String>,
    pub url: String,
}

/// Select the share service endpoint matching interface and, when given, region
pub fn find_endpoint<'a>(
    catalog: &'a [CatalogEntry],
    interface: &str,
    region: Option<&str>,
) -> Option<&'a str> {
    catalog
        .iter()
        .filter(|entry| entry.service_type == SHARE_SERVICE_TYPE)
        .flat_map(|entry| entry.endpoints.iter())
        .filter(|ep| ep.interface == interface)
        .find(|ep| match region {
            Some(r) => ep.region_id.as_deref() == Some(r) || ep.region.as_deref() == Some(r),
            None => true,
        })
        .map(|ep| ep.url.as_str())
}

#[derive(Deserialize, Debug)]
pub struct ShareTypePage {
    #[serde(default)]
    pub share_types: Vec<ShareType>,
    #[serde(default)]
    pub share_types_links: Vec<Link>,
}

#[derive(Deserialize, Debug)]
pub struct Link {
    pub rel: String,
    pub href: String,
}

impl ShareTypePage {
    pub fn next_link(&self) -> Option<&str> {
        self.share_types_links
            .iter()
            .find(|l| l.rel == "next")
            .map(|l| l.href.as_str())
    }
}
