// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Attaches pre-shared TLS certificates to the namespace's HTTPS proxies.

use crate::cloud::ComputeApi;
use crate::context::DeployContext;
use crate::error::{BranchEnvError, Result};
use crate::progress::Progress;
use tracing::{debug, instrument};

/// Certificate names from the annotation value, blanks dropped
pub fn certificate_names(value: &str) -> Vec<&str> {
    value
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .collect()
}

/// `existing` followed by any of `added` not already present, in order
fn merge_links(existing: &[String], added: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(existing.len() + added.len());
    for link in existing.iter().chain(added) {
        if !merged.contains(link) {
            merged.push(link.clone());
        }
    }
    merged
}

#[instrument(skip(compute, progress), fields(namespace = %ctx.namespace))]
pub async fn attach_certificates(
    compute: &dyn ComputeApi,
    ctx: &DeployContext,
    value: &str,
    progress: &dyn Progress,
) -> Result<()> {
    let names = certificate_names(value);
    if names.is_empty() {
        return Err(BranchEnvError::NotFound("no certificate to add".to_string()));
    }

    let mut links = Vec::with_capacity(names.len());
    for name in names {
        let certificate = compute.get_ssl_certificate(&ctx.project_id, name).await?;
        links.push(certificate.self_link);
    }

    let proxies = compute.list_target_https_proxies(&ctx.project_id).await?;
    for proxy in proxies.iter().filter(|p| p.name.contains(&ctx.namespace)) {
        let merged = merge_links(&proxy.ssl_certificates, &links);
        debug!("Proxy {} gets {} certificates", proxy.name, merged.len());
        compute
            .set_ssl_certificates(&ctx.project_id, &proxy.name, &merged)
            .await?;
        progress.line(&format!(
            "Certificates [{}] set on proxy {}",
            merged.join(", "),
            proxy.name
        ));
    }

    Ok(())
}
