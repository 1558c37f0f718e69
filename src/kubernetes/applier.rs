// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Create-or-update of manifest objects, recording what each pass touched.

use crate::cloud::ImageTagLister;
use crate::constants::annotations;
use crate::context::DeployContext;
use crate::error::Result;
use crate::kubernetes::images::{wants_latest_branching, ImageResolver};
use crate::kubernetes::manifest::{Manifest, ResourceKind};
use crate::progress::Progress;
use k8s_openapi::api::core::v1::{PersistentVolumeClaim, Service};
use kube::{api::PostParams, Api, Client, Resource, ResourceExt};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;
use tracing::{debug, instrument};

/// Names upserted during one apply pass, per kind
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TouchedResourceSet {
    touched: BTreeMap<ResourceKind, BTreeSet<String>>,
}

impl TouchedResourceSet {
    pub fn insert(&mut self, kind: ResourceKind, name: impl Into<String>) {
        self.touched.entry(kind).or_default().insert(name.into());
    }

    pub fn contains(&self, kind: ResourceKind, name: &str) -> bool {
        self.touched.get(&kind).is_some_and(|names| names.contains(name))
    }

    pub fn is_empty_for(&self, kind: ResourceKind) -> bool {
        self.touched.get(&kind).map_or(true, BTreeSet::is_empty)
    }
}

/// Outcome of a single upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upserted {
    Generated,
    Updated,
}

impl Upserted {
    fn as_str(&self) -> &'static str {
        match self {
            Upserted::Generated => "generated",
            Upserted::Updated => "updated",
        }
    }
}

/// Applies manifests into one namespace
pub struct KindApplier<'a> {
    client: Client,
    ctx: &'a DeployContext,
    images: &'a dyn ImageTagLister,
    image_registry: Option<&'a str>,
    progress: &'a dyn Progress,
    touched: TouchedResourceSet,
}

impl<'a> KindApplier<'a> {
    pub fn new(
        client: Client,
        ctx: &'a DeployContext,
        images: &'a dyn ImageTagLister,
        image_registry: Option<&'a str>,
        progress: &'a dyn Progress,
    ) -> Self {
        Self {
            client,
            ctx,
            images,
            image_registry,
            progress,
            touched: TouchedResourceSet::default(),
        }
    }

    pub fn touched(&self) -> &TouchedResourceSet {
        &self.touched
    }

    pub fn into_touched(self) -> TouchedResourceSet {
        self.touched
    }

    /// Upsert one manifest object and record it as touched
    #[instrument(skip(self, manifest), fields(kind = %manifest.kind(), name = %manifest.name()))]
    pub async fn upsert(&mut self, manifest: Manifest) -> Result<Upserted> {
        let kind = manifest.kind();
        let name = manifest.name();
        let ns = self.ctx.namespace.as_str();

        let outcome = match manifest {
            Manifest::Secret(o) => {
                upsert(&Api::namespaced(self.client.clone(), ns), in_namespace(o, ns), keep).await?
            }
            Manifest::ConfigMap(o) => {
                upsert(&Api::namespaced(self.client.clone(), ns), in_namespace(o, ns), keep).await?
            }
            Manifest::Service(o) => {
                upsert(
                    &Api::namespaced(self.client.clone(), ns),
                    in_namespace(o, ns),
                    carry_service,
                )
                .await?
            }
            Manifest::Deployment(mut o) => {
                if wants_latest_branching(&o.metadata) {
                    if let Some(pod) = o
                        .spec
                        .as_mut()
                        .and_then(|s| s.template.spec.as_mut())
                    {
                        self.resolver().rewrite_pod_spec(pod).await?;
                    }
                }
                upsert(&Api::namespaced(self.client.clone(), ns), in_namespace(o, ns), keep).await?
            }
            Manifest::Ingress(o) => {
                upsert(&Api::namespaced(self.client.clone(), ns), in_namespace(o, ns), keep).await?
            }
            Manifest::CronJob(mut o) => {
                if wants_latest_branching(&o.metadata) {
                    if let Some(pod) = o
                        .spec
                        .as_mut()
                        .and_then(|s| s.job_template.spec.as_mut())
                        .and_then(|j| j.template.spec.as_mut())
                    {
                        self.resolver().rewrite_pod_spec(pod).await?;
                    }
                }
                upsert(&Api::namespaced(self.client.clone(), ns), in_namespace(o, ns), keep).await?
            }
            Manifest::PersistentVolume(o) => {
                upsert(&Api::all(self.client.clone()), o, keep).await?
            }
            Manifest::PersistentVolumeClaim(o) => {
                upsert(
                    &Api::namespaced(self.client.clone(), ns),
                    in_namespace(o, ns),
                    carry_claim,
                )
                .await?
            }
        };

        self.progress
            .line(&format!("{} \"{}\" was {}", kind, name, outcome.as_str()));
        self.touched.insert(kind, name);
        Ok(outcome)
    }

    /// Upsert every manifest in order, stopping at the first failure
    pub async fn apply_all(&mut self, manifests: impl IntoIterator<Item = Manifest>) -> Result<()> {
        for manifest in manifests {
            self.upsert(manifest).await?;
        }
        Ok(())
    }

    fn resolver(&self) -> ImageResolver<'_> {
        ImageResolver::new(self.images, self.image_registry.unwrap_or_default(), self.ctx)
    }
}

fn in_namespace<K: Resource>(mut object: K, namespace: &str) -> K {
    object.meta_mut().namespace = Some(namespace.to_string());
    object
}

/// Get by name, then create or replace, carrying fields from the live object
async fn upsert<K>(api: &Api<K>, mut desired: K, carry: fn(&mut K, &K)) -> Result<Upserted>
where
    K: Resource + Clone + Debug + Serialize + DeserializeOwned,
{
    let name = desired.name_any();

    match api.get_opt(&name).await? {
        None => {
            api.create(&PostParams::default(), &desired).await?;
            Ok(Upserted::Generated)
        }
        Some(existing) => {
            carry(&mut desired, &existing);
            api.replace(&name, &PostParams::default(), &desired).await?;
            debug!("Replaced {}", name);
            Ok(Upserted::Updated)
        }
    }
}

fn keep<K>(_desired: &mut K, _existing: &K) {}

/// Services keep their allocated cluster IP, and ingress-owned ports
pub fn carry_service(desired: &mut Service, existing: &Service) {
    desired.metadata.resource_version = existing.metadata.resource_version.clone();

    let ingress_owned = desired
        .annotations()
        .contains_key(annotations::SERVICE_INGRESS);

    let Some(existing_spec) = existing.spec.as_ref() else {
        return;
    };
    let spec = desired.spec.get_or_insert_with(Default::default);
    spec.cluster_ip = existing_spec.cluster_ip.clone();
    spec.cluster_ips = existing_spec.cluster_ips.clone();
    if ingress_owned {
        spec.ports = existing_spec.ports.clone();
    }
}

/// Claims are immutable once bound, so the live spec wins
pub fn carry_claim(desired: &mut PersistentVolumeClaim, existing: &PersistentVolumeClaim) {
    desired.spec = existing.spec.clone();
}
