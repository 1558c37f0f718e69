// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Namespace validation, creation, marking and removal

use crate::constants::annotations;
use crate::error::{BranchEnvError, Result};
use k8s_openapi::api::core::v1::{Namespace, Pod};
use kube::{
    api::{DeleteParams, ListParams, ObjectMeta, Patch, PatchParams, PostParams},
    Api, Client, ResourceExt,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

static NAMESPACE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("valid namespace regex"));

const MAX_NAMESPACE_LEN: usize = 63;

/// Reject names Kubernetes would not accept as a namespace
pub fn validate_namespace(namespace: &str) -> Result<()> {
    if namespace.len() > MAX_NAMESPACE_LEN || !NAMESPACE_PATTERN.is_match(namespace) {
        return Err(BranchEnvError::ValidationError(format!(
            "\"{}\" must consist of lower case alphanumeric characters or '-', start and end with an alphanumeric character, and be at most {} characters",
            namespace, MAX_NAMESPACE_LEN
        )));
    }
    Ok(())
}

/// Ensure a namespace exists in the cluster, create if it doesn't.
/// Returns the live namespace and `true` when it was created by this call.
#[instrument(skip(client))]
pub async fn ensure_namespace_exists(client: &Client, namespace: &str) -> Result<(Namespace, bool)> {
    let namespaces: Api<Namespace> = Api::all(client.clone());

    if let Some(existing) = namespaces.get_opt(namespace).await? {
        debug!("Namespace {} already exists", namespace);
        return Ok((existing, false));
    }

    info!("Creating namespace {}", namespace);
    let ns = Namespace {
        metadata: ObjectMeta {
            name: Some(namespace.to_string()),
            ..Default::default()
        },
        ..Default::default()
    };
    let created = namespaces.create(&PostParams::default(), &ns).await?;
    Ok((created, true))
}

pub async fn get_namespace(client: &Client, namespace: &str) -> Result<Option<Namespace>> {
    let namespaces: Api<Namespace> = Api::all(client.clone());
    Ok(namespaces.get_opt(namespace).await?)
}

pub fn is_ingress_provisioned(namespace: &Namespace) -> bool {
    namespace
        .annotations()
        .get(annotations::INGRESS_PROVISIONED)
        .is_some_and(|v| v == "true")
}

/// Set or remove the marker telling Delete to wait for a load balancer.
/// Removal merge-patches the annotation to null.
#[instrument(skip(client))]
pub async fn set_ingress_provisioned(client: &Client, namespace: &str, provisioned: bool) -> Result<()> {
    let namespaces: Api<Namespace> = Api::all(client.clone());
    let value = provisioned.then_some("true");
    let patch = serde_json::json!({
        "metadata": {
            "annotations": BTreeMap::from([(annotations::INGRESS_PROVISIONED, value)])
        }
    });
    namespaces
        .patch(namespace, &PatchParams::default(), &Patch::Merge(&patch))
        .await?;
    Ok(())
}

#[instrument(skip(client))]
pub async fn delete_namespace(client: &Client, namespace: &str) -> Result<()> {
    let namespaces: Api<Namespace> = Api::all(client.clone());
    namespaces
        .delete(namespace, &DeleteParams::background())
        .await?;
    Ok(())
}

pub async fn count_pods(client: &Client, namespace: &str) -> Result<usize> {
    let pods: Api<Pod> = Api::namespaced(client.clone(), namespace);
    Ok(pods.list(&ListParams::default()).await?.items.len())
}
