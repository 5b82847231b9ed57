// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes reconcilers that react to watch events.

pub mod backoff;
pub mod finalize;
pub mod manila_driver;

pub use manila_driver::{FatalError, ManilaDriverReconciler, PassOutcome};
