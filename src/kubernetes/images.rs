// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Pinning workload images to the concrete tag behind a branch's "latest" tag.

use crate::cloud::{ImageTagLister, TagManifest};
use crate::constants::{annotations, LATEST_BRANCHING, PRODUCTION, STAGING};
use crate::context::DeployContext;
use crate::error::Result;
use k8s_openapi::api::core::v1::{Container, PodSpec};
use kube::api::ObjectMeta;
use tracing::debug;

/// The moving tag that tracks the newest build for this environment
pub fn latest_tag(ctx: &DeployContext) -> String {
    match ctx.namespace.as_str() {
        PRODUCTION => "latest".to_string(),
        STAGING => "staging-latest".to_string(),
        _ => format!("staging-{}-latest", ctx.branch),
    }
}

/// Whether the object asked for latest-branching image updates
pub fn wants_latest_branching(meta: &ObjectMeta) -> bool {
    meta.annotations
        .as_ref()
        .and_then(|a| a.get(annotations::IMAGE_UPDATE_STRATEGY))
        .is_some_and(|v| v == LATEST_BRANCHING)
}

/// The tag sharing a manifest with `latest`, if any
pub fn pinned_tag<'a>(manifests: &'a [TagManifest], latest: &str) -> Option<&'a str> {
    manifests
        .iter()
        .find(|m| m.tags.iter().any(|t| t == latest))
        .and_then(|m| m.tags.iter().find(|t| *t != latest))
        .map(String::as_str)
}

/// Rewrites registry images in pod specs to their pinned tag
pub struct ImageResolver<'a> {
    pub lister: &'a dyn ImageTagLister,
    pub registry: &'a str,
    pub latest: String,
}

impl<'a> ImageResolver<'a> {
    pub fn new(lister: &'a dyn ImageTagLister, registry: &'a str, ctx: &DeployContext) -> Self {
        Self {
            lister,
            registry,
            latest: latest_tag(ctx),
        }
    }

    pub async fn rewrite_pod_spec(&self, spec: &mut PodSpec) -> Result<()> {
        for container in spec.containers.iter_mut() {
            self.rewrite_container(container).await?;
        }
        if let Some(init) = spec.init_containers.as_mut() {
            for container in init.iter_mut() {
                self.rewrite_container(container).await?;
            }
        }
        Ok(())
    }

    async fn rewrite_container(&self, container: &mut Container) -> Result<()> {
        let Some(image) = container.image.as_deref() else {
            return Ok(());
        };
        if self.registry.is_empty() || !image.starts_with(self.registry) {
            return Ok(());
        }

        let path = untagged(image).to_string();
        let manifests = self.lister.list(&path).await?;

        match pinned_tag(&manifests, &self.latest) {
            Some(tag) => {
                debug!("Pinning {} to tag {} (from {})", path, tag, self.latest);
                container.image = Some(format!("{}:{}", path, tag));
            }
            None => debug!("No tag found alongside {} for {}", self.latest, path),
        }
        Ok(())
    }
}

/// Strip a trailing `:tag` or `@digest` from an image reference
fn untagged(image: &str) -> &str {
    let image = image.split('@').next().unwrap_or(image);
    match image.rfind(':') {
        Some(colon) if !image[colon..].contains('/') => &image[..colon],
        _ => image,
    }
}
