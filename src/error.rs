// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManilaOperatorError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Invalid cloud credentials: {0}")]
    CredentialsError(String),

    #[error("OpenStack request failed: {0}")]
    InventoryError(String),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Failed to render object template: {0}")]
    TemplateError(#[from] serde_json::Error),

    #[error("Failed to parse clouds document: {0}")]
    CloudsYamlError(#[from] serde_yaml::Error),

    #[error("Invalid resource: {0}")]
    InvalidResource(String),
}

pub type Result<T> = std::result::Result<T, ManilaOperatorError>;
