// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{Context, Result};
use kube::{Client, CustomResourceExt};
use std::sync::Arc;
use tracing::{info, warn};

use manila_csi_operator::config::Config;
use manila_csi_operator::inventory::OpenStackInventory;
use manila_csi_operator::kubernetes::wait_for_manila_driver_crd;
use manila_csi_operator::reconcilers::ManilaDriverReconciler;
use manila_csi_operator::types::ManilaDriver;

#[tokio::main]
async fn main() -> Result<()> {
    // `crd` prints the ManilaDriver CRD for installation
    if std::env::args().nth(1).as_deref() == Some("crd") {
        print!("{}", serde_yaml::to_string(&ManilaDriver::crd())?);
        return Ok(());
    }

    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting Manila CSI driver operator");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    info!(
        "Configuration loaded: credentials_secret={}/{}, cloud={}",
        config.credentials_secret_namespace, config.credentials_secret_name, config.cloud_name
    );

    // Create Kubernetes client
    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;
    info!("Connected to Kubernetes cluster");

    // Wait for the ManilaDriver CRD before starting the reconciler
    info!("Waiting for ManilaDriver CRD to become available...");
    wait_for_manila_driver_crd(&client).await?;

    let reconciler =
        ManilaDriverReconciler::new(client, config, Arc::new(OpenStackInventory::new()));

    info!("Starting reconciler...");
    reconciler.run().await?;

    warn!("Reconciler stopped");
    Ok(())
}
