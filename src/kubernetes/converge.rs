// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Create-or-update-if-changed for a single object

use crate::error::Result;
use crate::kubernetes::last_applied;
use kube::{api::PostParams, Api, Resource, ResourceExt};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;
use tracing::{debug, info, instrument};

/// What `converge` did to the stored object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convergence {
    Created,
    Updated,
    Unchanged,
}

/// Make the stored object match `desired`.
///
/// Issues at most one write. Errors from the API server, other than the object
/// not existing yet, are returned as-is.
#[instrument(skip(api, desired), fields(name = %desired.name_any(), namespace = %desired.namespace().unwrap_or_default()))]
pub async fn converge<K>(api: &Api<K>, kind: &str, mut desired: K) -> Result<Convergence>
where
    K: Resource + Clone + Serialize + DeserializeOwned + Debug,
{
    last_applied::attach(&mut desired)?;
    let name = desired.name_any();

    let Some(found) = api.get_opt(&name).await? else {
        info!("Creating a new {} {}", kind, name);
        api.create(&PostParams::default(), &desired).await?;
        return Ok(Convergence::Created);
    };

    if last_applied::is_unchanged(&found, &desired) {
        debug!("Skip reconcile: {} {} is up to date", kind, name);
        return Ok(Convergence::Unchanged);
    }

    info!("Updating {} {} with new changes", kind, name);
    desired.meta_mut().resource_version = found.meta().resource_version.clone();
    api.replace(&name, &PostParams::default(), &desired).await?;
    Ok(Convergence::Updated)
}
