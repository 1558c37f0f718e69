// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Apply and Delete of one branch environment, end to end.

use crate::cloud::dns::DnsRecordSynchronizer;
use crate::cloud::{ComputeApi, DnsApi, EndpointsPinner, ImageTagLister};
use crate::config::Config;
use crate::constants::ADDRESS_IN_USE;
use crate::context::DeployContext;
use crate::error::Result;
use crate::kubernetes::ingresses::{delete_ingresses, has_class, list_ingresses, static_ip_names};
use crate::kubernetes::namespaces::{
    count_pods, delete_namespace, get_namespace, is_ingress_provisioned, set_ingress_provisioned,
};
use crate::kubernetes::{
    ensure_namespace_exists, validate_namespace, KindApplier, Manifest, OrphanReclaimer,
    ResourceKind,
};
use crate::network::apply_network_annotations;
use crate::progress::Progress;
use crate::reconcilers::{LoadBalancerWatcher, WatcherSession};
use crate::retry::retry;
use kube::Client;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// What an Apply pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// The namespace did not exist before this pass
    pub first_time: bool,
    /// Load balancer IP, when it was awaited in this pass
    pub ip: Option<String>,
    pub pods: usize,
}

/// Drives the environment lifecycle against one cluster and cloud project
pub struct Engine {
    client: Client,
    config: Config,
    compute: Arc<dyn ComputeApi>,
    images: Arc<dyn ImageTagLister>,
    dns: Option<DnsRecordSynchronizer>,
    endpoints: Option<Arc<dyn EndpointsPinner>>,
    progress: Arc<dyn Progress>,
}

impl Engine {
    pub fn new(
        client: Client,
        config: Config,
        compute: Arc<dyn ComputeApi>,
        images: Arc<dyn ImageTagLister>,
        progress: Arc<dyn Progress>,
    ) -> Self {
        Self {
            client,
            config,
            compute,
            images,
            dns: None,
            endpoints: None,
            progress,
        }
    }

    /// Publish environment records through `api`; ignored without a managed zone
    pub fn with_dns(mut self, api: Arc<dyn DnsApi>) -> Self {
        self.dns = self
            .config
            .dns
            .clone()
            .map(|cfg| DnsRecordSynchronizer::new(api, cfg));
        self
    }

    pub fn with_endpoints(mut self, pinner: Arc<dyn EndpointsPinner>) -> Self {
        self.endpoints = Some(pinner);
        self
    }

    /// Bring the namespace in line with `manifests`
    #[instrument(skip(self, manifests), fields(namespace = %ctx.namespace))]
    pub async fn apply(&self, ctx: &DeployContext, manifests: Vec<Manifest>) -> Result<ApplyOutcome> {
        validate_namespace(&ctx.namespace)?;

        let (namespace, first_time) = ensure_namespace_exists(&self.client, &ctx.namespace).await?;
        let marked = is_ingress_provisioned(&namespace);
        if first_time {
            self.line(&format!("Namespace \"{}\" was generated", ctx.namespace));
        }

        if let Some(pinner) = &self.endpoints {
            if let Some(version) = pinner.pin_version(ctx).await? {
                self.line(&format!("Pinned endpoints version {}", version));
            }
        }

        let mut watcher = (first_time && self.config.external_load_balancer).then(|| {
            LoadBalancerWatcher::start(self.client.clone(), &ctx.namespace, &self.config.ingress_class)
        });

        let result = self
            .apply_pass(ctx, manifests, first_time, marked, watcher.as_mut())
            .await;

        if let Some(session) = watcher {
            session.stop().await;
        }
        result
    }

    async fn apply_pass(
        &self,
        ctx: &DeployContext,
        manifests: Vec<Manifest>,
        first_time: bool,
        marked: bool,
        watcher: Option<&mut WatcherSession>,
    ) -> Result<ApplyOutcome> {
        let progress = self.progress.as_ref();

        let mut applier = KindApplier::new(
            self.client.clone(),
            ctx,
            self.images.as_ref(),
            self.config.image_registry.as_deref(),
            progress,
        );
        applier.apply_all(manifests).await?;
        let touched = applier.into_touched();

        let mut ip = None;
        if let Some(session) = watcher {
            let assigned = session.wait_for_ip(self.config.lb_ip_timeout, progress).await?;
            if let Some(dns) = &self.dns {
                dns.create(&ctx.namespace, &assigned, progress).await?;
            }
            ip = Some(assigned);
        }

        let serves_lb = self.config.external_load_balancer
            && (marked || !touched.is_empty_for(ResourceKind::Ingress))
            && has_class(
                &list_ingresses(&self.client, &ctx.namespace).await?,
                &self.config.ingress_class,
            );
        if serves_lb != marked {
            debug!("Ingress provisioned marker on {} becomes {}", ctx.namespace, serves_lb);
            set_ingress_provisioned(&self.client, &ctx.namespace, serves_lb).await?;
        }

        apply_network_annotations(
            &self.client,
            self.compute.as_ref(),
            ctx,
            &self.config.rule_discovery,
            progress,
        )
        .await?;

        OrphanReclaimer::new(self.client.clone(), &ctx.namespace, progress)
            .reclaim(&touched)
            .await?;

        let pods = count_pods(&self.client, &ctx.namespace).await?;
        self.line(&format!("There are {} pods in the cluster", pods));

        Ok(ApplyOutcome {
            first_time,
            ip,
            pods,
        })
    }

    /// Tear the environment down, releasing its load balancer and records
    #[instrument(skip(self), fields(namespace = %ctx.namespace))]
    pub async fn delete(&self, ctx: &DeployContext) -> Result<()> {
        validate_namespace(&ctx.namespace)?;

        let Some(namespace) = get_namespace(&self.client, &ctx.namespace).await? else {
            self.line(&format!("Namespace \"{}\" does not exist", ctx.namespace));
            return Ok(());
        };

        let mut ip = String::new();
        if is_ingress_provisioned(&namespace) && self.serves_load_balancer(ctx).await? {
            let mut session = LoadBalancerWatcher::start(
                self.client.clone(),
                &ctx.namespace,
                &self.config.ingress_class,
            );
            let waited = session
                .wait_for_ip(self.config.lb_ip_timeout, self.progress.as_ref())
                .await;
            session.stop().await;
            ip = waited?;

            self.release_load_balancer(ctx, &ip).await?;
        }

        delete_namespace(&self.client, &ctx.namespace).await?;
        self.line(&format!("Namespace \"{}\" was removed", ctx.namespace));

        if let Some(dns) = &self.dns {
            dns.delete(&ctx.namespace, &ip, self.progress.as_ref()).await?;
        }
        Ok(())
    }

    /// A marked namespace still holds an ingress of the configured class
    async fn serves_load_balancer(&self, ctx: &DeployContext) -> Result<bool> {
        let ingresses = list_ingresses(&self.client, &ctx.namespace).await?;
        if has_class(&ingresses, &self.config.ingress_class) {
            return Ok(true);
        }
        warn!(
            "Namespace {} is marked as ingress provisioned but has no {} ingress, not waiting for a load balancer",
            ctx.namespace, self.config.ingress_class
        );
        Ok(false)
    }

    /// Remove the ingresses and wait for a bound static IP to come free
    async fn release_load_balancer(&self, ctx: &DeployContext, ip: &str) -> Result<()> {
        let static_ips = static_ip_names(&list_ingresses(&self.client, &ctx.namespace).await?);

        delete_ingresses(&self.client, &ctx.namespace).await?;
        self.line(&format!("Ingresses in \"{}\" were removed", ctx.namespace));

        if static_ips.is_empty() {
            debug!("No static IP bound in {}", ctx.namespace);
            return Ok(());
        }

        info!("Waiting for static IP(s) {:?} to be released", static_ips);
        let compute = self.compute.as_ref();
        let project_id = ctx.project_id.as_str();
        let what = format!("static IP {} still in use", ip);
        retry(&self.config.ip_release, &what, move || async move {
            let addresses = compute.list_addresses(project_id).await?;
            let held = addresses
                .iter()
                .any(|a| a.address == ip && a.status == ADDRESS_IN_USE);
            Ok((!held).then_some(()))
        })
        .await?;

        self.line(&format!("Static IP {} released", ip));
        Ok(())
    }

    fn line(&self, text: &str) {
        self.progress.line(text);
    }
}
