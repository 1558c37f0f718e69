// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::cloud::CloudError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BranchEnvError {
    #[error(transparent)]
    KubeError(#[from] kube::Error),

    #[error(transparent)]
    CloudError(#[from] CloudError),

    #[error("Failed to decode manifest: {0}")]
    DecodeError(String),

    #[error("Invalid namespace: {0}")]
    ValidationError(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("{0}")]
    ConflictError(String),

    #[error("{0}")]
    ExhaustedRetries(String),

    #[error("Unsupported annotation: {0}")]
    UnsupportedAnnotation(String),

    #[error("{0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, BranchEnvError>;
