// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Custom resource types read or written by the operator.

pub mod credentials_request;
pub mod manila_driver;

pub use credentials_request::CredentialsRequest;
pub use manila_driver::{ManilaDriver, ManilaDriverStatus, Phase};
