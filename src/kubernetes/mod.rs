// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes utilities for CRD discovery and idempotent object management.

pub mod converge;
pub mod crd;
pub mod last_applied;
pub mod managed;

pub use converge::{converge, Convergence};
pub use crd::wait_for_manila_driver_crd;
pub use managed::{delete, Deletion, ManagedKind, ManagedObject, ObjectId};
