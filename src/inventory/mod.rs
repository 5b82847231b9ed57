// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Lookup of the Manila share types that decide which StorageClasses exist.

pub mod cloud;
pub mod openstack;

pub use cloud::Cloud;
pub use openstack::{OpenStackInventory, ShareType, ShareTypeInventory, ShareTypeListing};

use crate::config::Config;
use crate::error::Result;
use kube::Client;
use tracing::{info, instrument};

#[derive(Debug, Clone, PartialEq)]
pub enum GateOutcome {
    Available {
        cloud: Cloud,
        share_types: Vec<ShareType>,
    },
    /// The credentials secret has not been provisioned yet
    CredentialsPending,
    ServiceAbsent,
}

pub struct InventoryGate<'a> {
    inventory: &'a dyn ShareTypeInventory,
}

impl<'a> InventoryGate<'a> {
    pub fn new(inventory: &'a dyn ShareTypeInventory) -> Self {
        Self { inventory }
    }

    #[instrument(skip_all)]
    pub async fn resolve(
        &self,
        client: &Client,
        config: &Config,
        ca_bundle: Option<&str>,
    ) -> Result<GateOutcome> {
        let Some(cloud) = cloud::read_cloud(client, config).await? else {
            info!(
                "Credentials secret {}/{} does not exist yet",
                config.credentials_secret_namespace, config.credentials_secret_name
            );
            return Ok(GateOutcome::CredentialsPending);
        };

        match self.inventory.list_share_types(&cloud, ca_bundle).await? {
            ShareTypeListing::Found(share_types) => Ok(GateOutcome::Available { cloud, share_types }),
            ShareTypeListing::ServiceAbsent => Ok(GateOutcome::ServiceAbsent),
        }
    }
}
