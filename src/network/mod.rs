// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Annotation-driven networking on the namespace's ingress: named static IPs
//! and pre-shared certificates.

pub mod certificates;
pub mod named_ip;

use crate::cloud::ComputeApi;
use crate::constants::annotations;
use crate::context::DeployContext;
use crate::error::{BranchEnvError, Result};
use crate::kubernetes::ingresses::list_ingresses;
use crate::progress::Progress;
use crate::retry::RetryPolicy;
use k8s_openapi::api::networking::v1::Ingress;
use kube::{Client, ResourceExt};
use tracing::{debug, instrument, warn};

pub use certificates::attach_certificates;
pub use named_ip::NamedIpBinder;

/// First ingress that carries both a name and annotations
pub fn select_ingress(ingresses: &[Ingress]) -> Option<&Ingress> {
    let mut qualifying = ingresses
        .iter()
        .filter(|i| !i.name_any().is_empty() && !i.annotations().is_empty());
    let selected = qualifying.next()?;
    if qualifying.next().is_some() {
        warn!(
            "More than one annotated ingress, using {} for network automation",
            selected.name_any()
        );
    }
    Some(selected)
}

/// Reject keys in our annotation namespace that nothing handles
fn check_supported(ingress: &Ingress) -> Result<()> {
    let unsupported = ingress.annotations().keys().find(|key| {
        key.starts_with(annotations::PREFIX)
            && key.as_str() != annotations::NAMED_IP_ADDRESS
            && key.as_str() != annotations::PRE_SHARED_CERT
    });
    match unsupported {
        Some(key) => Err(BranchEnvError::UnsupportedAnnotation(key.clone())),
        None => Ok(()),
    }
}

/// Apply the networking annotations of the namespace's ingress
#[instrument(skip(client, compute, rule_discovery, progress), fields(namespace = %ctx.namespace))]
pub async fn apply_network_annotations(
    client: &Client,
    compute: &dyn ComputeApi,
    ctx: &DeployContext,
    rule_discovery: &RetryPolicy,
    progress: &dyn Progress,
) -> Result<()> {
    let ingresses = list_ingresses(client, &ctx.namespace).await?;
    let Some(ingress) = select_ingress(&ingresses) else {
        debug!("No annotated ingress in {}", ctx.namespace);
        return Ok(());
    };

    check_supported(ingress)?;

    let ingress_annotations = ingress.annotations();
    if let Some(value) = ingress_annotations.get(annotations::NAMED_IP_ADDRESS) {
        NamedIpBinder::new(compute, ctx, rule_discovery, progress)
            .bind_all(value)
            .await?;
    }
    if let Some(value) = ingress_annotations.get(annotations::PRE_SHARED_CERT) {
        attach_certificates(compute, ctx, value, progress).await?;
    }

    Ok(())
}
