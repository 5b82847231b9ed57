// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! ManilaDriver reconciler - drives the cluster towards the installed driver
//! and tears it down again when the ManilaDriver is deleted.

use crate::config::Config;
use crate::constants::{labels, MANILA_DRIVER_NAME};
use crate::error::{ManilaOperatorError, Result};
use crate::handlers::{PassContext, PassState, StepOutcome, PIPELINE};
use crate::inventory::ShareTypeInventory;
use crate::kubernetes::managed::scc_resource;
use crate::reconcilers::backoff::ErrorBackoff;
use crate::reconcilers::finalize::finalize;
use crate::types::{CredentialsRequest, ManilaDriver, ManilaDriverStatus, Phase};
use futures::StreamExt;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment};
use k8s_openapi::api::core::v1::{ConfigMap, Namespace, Secret, ServiceAccount};
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, Role, RoleBinding};
use k8s_openapi::api::storage::v1::{CSIDriver, StorageClass};
use kube::{
    api::{DynamicObject, ListParams, Patch, PatchParams},
    runtime::{controller::Action, reflector::ObjectRef, Controller},
    Api, Client, Resource, ResourceExt,
};
use kube_runtime::watcher::Config as WatcherConfig;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

/// Conditions no retry can fix; they wait for the user to change the resources
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FatalError {
    #[error("only one ManilaDriver is allowed in the system, found {0}")]
    SingletonViolation(usize),

    #[error("invalid ManilaDriver name '{0}', it must be called '{}'", MANILA_DRIVER_NAME)]
    InvalidName(String),
}

/// Result of one successful reconcile pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    Continue(Phase),
    DeferredRetry(Duration),
    Fatal(FatalError),
}

impl PassOutcome {
    pub fn action(&self) -> Action {
        match self {
            PassOutcome::Continue(_) => Action::await_change(),
            PassOutcome::DeferredRetry(delay) => Action::requeue(*delay),
            PassOutcome::Fatal(err) => {
                error!("Not reconciling ManilaDriver: {}", err);
                Action::await_change()
            }
        }
    }
}

pub struct ManilaDriverReconciler {
    client: Client,
    config: Config,
    inventory: Arc<dyn ShareTypeInventory>,
    backoff: ErrorBackoff,
}

/// Every change to a managed object is a change to the single ManilaDriver
fn driver_ref<K>(_: K) -> Option<ObjectRef<ManilaDriver>> {
    Some(ObjectRef::new(MANILA_DRIVER_NAME))
}

impl ManilaDriverReconciler {
    pub fn new(client: Client, config: Config, inventory: Arc<dyn ShareTypeInventory>) -> Self {
        let backoff = ErrorBackoff::new(config.error_backoff, config.error_backoff_max);
        Self {
            client,
            config,
            inventory,
            backoff,
        }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let client = self.client.clone();
        let drivers: Api<ManilaDriver> = Api::all(client.clone());
        let managed = WatcherConfig::default().labels(labels::SELECTOR);
        let context = Arc::new(self);

        // Owner references of namespaced children do not resolve to the
        // cluster scoped ManilaDriver.
        Controller::new(drivers, WatcherConfig::default())
            .owns(Api::<Namespace>::all(client.clone()), managed.clone())
            .owns(Api::<ClusterRole>::all(client.clone()), managed.clone())
            .owns(Api::<ClusterRoleBinding>::all(client.clone()), managed.clone())
            .owns(Api::<CSIDriver>::all(client.clone()), managed.clone())
            .owns(Api::<StorageClass>::all(client.clone()), managed.clone())
            .owns_with(
                Api::<DynamicObject>::all_with(client.clone(), &scc_resource()),
                scc_resource(),
                managed.clone(),
            )
            .watches(Api::<ConfigMap>::all(client.clone()), managed.clone(), driver_ref)
            .watches(Api::<Secret>::all(client.clone()), managed.clone(), driver_ref)
            .watches(Api::<ServiceAccount>::all(client.clone()), managed.clone(), driver_ref)
            .watches(Api::<Role>::all(client.clone()), managed.clone(), driver_ref)
            .watches(Api::<RoleBinding>::all(client.clone()), managed.clone(), driver_ref)
            .watches(Api::<DaemonSet>::all(client.clone()), managed.clone(), driver_ref)
            .watches(Api::<Deployment>::all(client.clone()), managed.clone(), driver_ref)
            .watches(Api::<CredentialsRequest>::all(client), managed, driver_ref)
            .shutdown_on_signal()
            .run(reconcile, error_policy, context)
            .for_each(|res| async move {
                match res {
                    Ok(o) => debug!("Reconciled ManilaDriver: {:?}", o),
                    Err(e) => warn!("Reconciliation error: {:?}", e),
                }
            })
            .await;

        Ok(())
    }

    /// One reconcile pass for the ManilaDriver called `name`
    #[instrument(skip(self))]
    pub async fn run_pass(&self, name: &str) -> Result<PassOutcome> {
        let drivers: Api<ManilaDriver> = Api::all(self.client.clone());

        let count = drivers.list(&ListParams::default()).await?.items.len();
        if count > 1 {
            return Ok(PassOutcome::Fatal(FatalError::SingletonViolation(count)));
        }

        let Some(driver) = drivers.get_opt(name).await? else {
            debug!("ManilaDriver {} no longer exists", name);
            return Ok(PassOutcome::Continue(Phase::Gone));
        };

        if !driver.has_required_name() {
            return Ok(PassOutcome::Fatal(FatalError::InvalidName(driver.name_any())));
        }

        if driver.is_being_deleted() {
            if driver.has_finalizer() {
                finalize(&self.client).await?;
                self.set_finalizer(&drivers, &driver, false).await?;
            }
            return Ok(PassOutcome::Continue(Phase::Finalized));
        }

        if !driver.has_finalizer() {
            self.set_finalizer(&drivers, &driver, true).await?;
        }

        let owner = driver.controller_owner_ref(&()).ok_or_else(|| {
            ManilaOperatorError::InvalidResource(format!("ManilaDriver {} has no uid", name))
        })?;
        let ctx = PassContext {
            client: &self.client,
            config: &self.config,
            inventory: self.inventory.as_ref(),
            owner,
        };
        let mut state = PassState::default();

        for step in PIPELINE {
            match step.run(&ctx, &mut state).await? {
                StepOutcome::Continue => {}
                StepOutcome::Deferred => {
                    let message = format!(
                        "Waiting for secret {}/{}",
                        self.config.credentials_secret_namespace, self.config.credentials_secret_name
                    );
                    self.report(&drivers, &driver, Phase::WaitingForCredentials, Some(message), None)
                        .await?;
                    return Ok(PassOutcome::DeferredRetry(self.config.credentials_retry));
                }
                StepOutcome::SkipRemaining => {
                    self.report(&drivers, &driver, Phase::ManilaUnavailable, None, None)
                        .await?;
                    return Ok(PassOutcome::Continue(Phase::ManilaUnavailable));
                }
            }
        }

        let share_types = state.share_types.iter().map(|st| st.name.clone()).collect();
        self.report(&drivers, &driver, Phase::Converged, None, Some(share_types))
            .await?;
        info!("ManilaDriver {} converged", name);
        Ok(PassOutcome::Continue(Phase::Converged))
    }

    async fn set_finalizer(&self, api: &Api<ManilaDriver>, driver: &ManilaDriver, present: bool) -> Result<()> {
        let patch = json!({
            "metadata": {
                "finalizers": driver.finalizers_with(present),
                "resourceVersion": driver.resource_version(),
            }
        });
        api.patch(&driver.name_any(), &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        if present {
            info!("Added finalizer to ManilaDriver {}", driver.name_any());
        } else {
            info!("Removed finalizer from ManilaDriver {}", driver.name_any());
        }
        Ok(())
    }

    /// Write the status unless it already reads the same
    async fn report(
        &self,
        api: &Api<ManilaDriver>,
        driver: &ManilaDriver,
        phase: Phase,
        message: Option<String>,
        share_types: Option<Vec<String>>,
    ) -> Result<()> {
        let current = driver.status.clone().unwrap_or_default();
        let status = ManilaDriverStatus {
            phase: Some(phase),
            message,
            observed_generation: driver.metadata.generation,
            share_types: share_types.or(current.share_types.clone()),
        };
        if status == current {
            return Ok(());
        }

        api.patch_status(
            &driver.name_any(),
            &PatchParams::default(),
            &Patch::Merge(json!({ "status": status })),
        )
        .await?;
        Ok(())
    }

    /// Record a failed pass on the ManilaDriver, if it is still around
    async fn report_degraded(&self, name: &str, err: &ManilaOperatorError) {
        let drivers: Api<ManilaDriver> = Api::all(self.client.clone());
        let result = match drivers.get_opt(name).await {
            Ok(Some(driver)) if driver.has_required_name() && !driver.is_being_deleted() => {
                self.report(&drivers, &driver, Phase::Degraded, Some(err.to_string()), None)
                    .await
            }
            Ok(_) => Ok(()),
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            warn!("Failed to report degraded status on ManilaDriver {}: {}", name, e);
        }
    }
}

async fn reconcile(driver: Arc<ManilaDriver>, ctx: Arc<ManilaDriverReconciler>) -> Result<Action> {
    let name = driver.name_any();
    debug!("Reconciling ManilaDriver {}", name);

    match ctx.run_pass(&name).await {
        Ok(outcome) => {
            ctx.backoff.reset();
            Ok(outcome.action())
        }
        Err(e) => {
            ctx.report_degraded(&name, &e).await;
            Err(e)
        }
    }
}

fn error_policy(
    _driver: Arc<ManilaDriver>,
    error: &ManilaOperatorError,
    ctx: Arc<ManilaDriverReconciler>,
) -> Action {
    let delay = ctx.backoff.next_delay();
    error!("Reconciliation error: {}, retrying in {:?}", error, delay);
    Action::requeue(delay)
}
