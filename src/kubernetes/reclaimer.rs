// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Deletes resources a namespace still holds but the current pass did not apply.

use crate::constants::{DEFAULT_TOKEN_PREFIX, ROOT_CA_CONFIGMAP};
use crate::error::Result;
use crate::kubernetes::applier::TouchedResourceSet;
use crate::kubernetes::manifest::ResourceKind;
use crate::progress::Progress;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::batch::v1::CronJob;
use k8s_openapi::api::core::v1::{ConfigMap, PersistentVolumeClaim, Secret, Service};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::NamespaceResourceScope;
use kube::{
    api::{DeleteParams, ListParams},
    Api, Client, Resource, ResourceExt,
};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use tracing::{debug, instrument};

/// Kinds reclaimed, in order; Service goes last as other kinds may still reference it
pub const RECLAIM_ORDER: [ResourceKind; 7] = [
    ResourceKind::Secret,
    ResourceKind::ConfigMap,
    ResourceKind::CronJob,
    ResourceKind::Deployment,
    ResourceKind::Ingress,
    ResourceKind::PersistentVolumeClaim,
    ResourceKind::Service,
];

/// Objects the platform maintains in every namespace
fn platform_managed(kind: ResourceKind, name: &str) -> bool {
    match kind {
        ResourceKind::Secret => name.starts_with(DEFAULT_TOKEN_PREFIX),
        ResourceKind::ConfigMap => name == ROOT_CA_CONFIGMAP,
        _ => false,
    }
}

/// Live names of `kind` that are candidates for deletion
pub fn orphans(kind: ResourceKind, live: Vec<String>, touched: &TouchedResourceSet) -> Vec<String> {
    live.into_iter()
        .filter(|name| !platform_managed(kind, name))
        .filter(|name| !touched.contains(kind, name))
        .collect()
}

pub struct OrphanReclaimer<'a> {
    client: Client,
    namespace: &'a str,
    progress: &'a dyn Progress,
}

impl<'a> OrphanReclaimer<'a> {
    pub fn new(client: Client, namespace: &'a str, progress: &'a dyn Progress) -> Self {
        Self {
            client,
            namespace,
            progress,
        }
    }

    /// Delete every untouched resource, stopping at the first failed delete
    #[instrument(skip(self, touched), fields(namespace = %self.namespace))]
    pub async fn reclaim(&self, touched: &TouchedResourceSet) -> Result<()> {
        for kind in RECLAIM_ORDER {
            match kind {
                ResourceKind::Secret => self.reclaim_kind::<Secret>(kind, touched).await?,
                ResourceKind::ConfigMap => self.reclaim_kind::<ConfigMap>(kind, touched).await?,
                ResourceKind::CronJob => self.reclaim_kind::<CronJob>(kind, touched).await?,
                ResourceKind::Deployment => self.reclaim_kind::<Deployment>(kind, touched).await?,
                ResourceKind::Ingress => self.reclaim_kind::<Ingress>(kind, touched).await?,
                ResourceKind::PersistentVolumeClaim => {
                    self.reclaim_kind::<PersistentVolumeClaim>(kind, touched)
                        .await?
                }
                ResourceKind::Service => self.reclaim_kind::<Service>(kind, touched).await?,
                ResourceKind::PersistentVolume => {}
            }
        }
        Ok(())
    }

    async fn reclaim_kind<K>(&self, kind: ResourceKind, touched: &TouchedResourceSet) -> Result<()>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + Debug + DeserializeOwned,
        K::DynamicType: Default,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), self.namespace);
        let live = api
            .list(&ListParams::default())
            .await?
            .items
            .iter()
            .map(|o| o.name_any())
            .collect();

        let candidates = orphans(kind, live, touched);
        debug!("{} orphaned {} object(s)", candidates.len(), kind);

        for name in candidates {
            api.delete(&name, &DeleteParams::background()).await?;
            self.progress
                .line(&format!("{} \"{}\" was removed", kind, name));
        }
        Ok(())
    }
}
