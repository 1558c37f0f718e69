// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Binds reserved named IPs to the namespace's load balancer by cloning one
//! of its forwarding rules per requested port.

use crate::cloud::{Address, ComputeApi};
use crate::constants::ADDRESS_IN_USE;
use crate::context::DeployContext;
use crate::error::{BranchEnvError, Result};
use crate::progress::Progress;
use crate::retry::{retry, RetryPolicy};
use crate::types::network::{ForwardingRuleTemplate, NamedAddress};
use tracing::{debug, instrument};

/// Whether the rule's port range starts at `port`, e.g. `443-443` for `443`
fn starts_at_port(port_range: &str, port: &str) -> bool {
    port_range.split('-').next() == Some(port)
}

pub struct NamedIpBinder<'a> {
    compute: &'a dyn ComputeApi,
    ctx: &'a DeployContext,
    rule_discovery: &'a RetryPolicy,
    progress: &'a dyn Progress,
}

impl<'a> NamedIpBinder<'a> {
    pub fn new(
        compute: &'a dyn ComputeApi,
        ctx: &'a DeployContext,
        rule_discovery: &'a RetryPolicy,
        progress: &'a dyn Progress,
    ) -> Self {
        Self {
            compute,
            ctx,
            rule_discovery,
            progress,
        }
    }

    /// Bind each address of the annotation value in order.
    ///
    /// Malformed tokens are reported and skipped; the first failed binding
    /// stops the rest.
    pub async fn bind_all(&self, value: &str) -> Result<()> {
        for token in value.split(',') {
            match NamedAddress::parse(token) {
                Ok(address) => self.bind(&address).await?,
                Err(skipped) => self.progress.line(&skipped.to_string()),
            }
        }
        Ok(())
    }

    #[instrument(skip(self), fields(namespace = %self.ctx.namespace))]
    pub async fn bind(&self, address: &NamedAddress) -> Result<()> {
        let template = self.find_template(&address.port).await?;
        let reserved = self.resolve_address(&address.ip_name).await?;

        let rule_name = address.rule_name();
        match self
            .compute
            .get_forwarding_rule(&self.ctx.project_id, &rule_name)
            .await
        {
            Ok(_) => {
                return Err(BranchEnvError::ConflictError(format!(
                    "Rule {} already exists",
                    rule_name
                )))
            }
            Err(e) if e.is_not_found() => debug!("Forwarding rule {} is free", rule_name),
            Err(e) => return Err(e.into()),
        }

        let rule = template.instantiate(address, &reserved.address);
        self.compute
            .insert_forwarding_rule(&self.ctx.project_id, &rule)
            .await?;

        self.progress.line(&format!(
            "Forwarding rule {} created for {} on port {}",
            rule_name, address.ip_name, address.port
        ));
        Ok(())
    }

    /// Poll until the ingress controller has created a rule for `port`
    async fn find_template(&self, port: &str) -> Result<ForwardingRuleTemplate> {
        let what = format!(
            "no forwarding rule for port {} in {}",
            port, self.ctx.namespace
        );
        let (compute, ctx) = (self.compute, self.ctx);
        retry(self.rule_discovery, &what, move || async move {
            let rules = compute.list_forwarding_rules(&ctx.project_id).await?;
            Ok(rules
                .iter()
                .find(|r| r.name.contains(&ctx.namespace) && starts_at_port(&r.port_range, port))
                .map(ForwardingRuleTemplate::from))
        })
        .await
    }

    /// Find the reserved address by name, then re-read it for a current status
    async fn resolve_address(&self, ip_name: &str) -> Result<Address> {
        let matched = self
            .compute
            .list_addresses(&self.ctx.project_id)
            .await?
            .into_iter()
            .find(|a| a.name.contains(ip_name))
            .ok_or_else(|| BranchEnvError::NotFound(format!("Address {} not found", ip_name)))?;

        let address = self
            .compute
            .get_address(&self.ctx.project_id, &matched.name)
            .await?;
        if address.status == ADDRESS_IN_USE {
            return Err(BranchEnvError::ConflictError(format!(
                "Address {} is already in use",
                address.name
            )));
        }
        Ok(address)
    }
}
