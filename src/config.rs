// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::polling;
use crate::retry::RetryPolicy;
use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

/// Engine configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Cloud project holding the cluster's load balancer resources
    pub project_id: String,
    /// DNS settings, `None` when no managed zone is configured
    pub dns: Option<DnsConfig>,
    /// Ingress class that identifies the external load balancer
    pub ingress_class: String,
    pub external_load_balancer: bool,
    /// Registry prefix whose images are eligible for tag rewriting
    pub image_registry: Option<String>,
    pub rule_discovery: RetryPolicy,
    pub ip_release: RetryPolicy,
    /// Upper bound on the load balancer IP wait, unbounded when `None`
    pub lb_ip_timeout: Option<Duration>,
}

/// Managed zone and naming scheme for environment domains
#[derive(Debug, Clone, Default)]
pub struct DnsConfig {
    pub project_id: String,
    pub managed_zone: String,
    pub base_domain: Option<String>,
    pub spacer: String,
    pub suffix: String,
    /// Suffixes appended to the environment domain to form CNAME aliases
    pub aliases: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let project_id =
            env::var("PROJECT_ID").context("PROJECT_ID environment variable not set")?;

        let dns = match non_empty("DNS_MANAGED_ZONE") {
            Some(managed_zone) => Some(DnsConfig {
                project_id: non_empty("DNS_PROJECT_ID").unwrap_or_else(|| project_id.clone()),
                managed_zone,
                base_domain: non_empty("BASE_DOMAIN"),
                spacer: env::var("DOMAIN_SPACER").unwrap_or_else(|_| ".".to_string()),
                suffix: env::var("DOMAIN_SUFFIX").unwrap_or_default(),
                aliases: split_list(&env::var("DNS_ALIASES").unwrap_or_default()),
            }),
            None => None,
        };

        let rule_attempts = match non_empty("FORWARDING_RULE_RETRIES") {
            Some(v) => v
                .parse()
                .context("FORWARDING_RULE_RETRIES must be a positive integer")?,
            None => polling::RULE_DISCOVERY_ATTEMPTS,
        };

        let lb_ip_timeout = match non_empty("LB_IP_TIMEOUT_SECS") {
            Some(v) => Some(Duration::from_secs(
                v.parse().context("LB_IP_TIMEOUT_SECS must be a number of seconds")?,
            )),
            None => None,
        };

        Ok(Config {
            project_id,
            dns,
            ingress_class: env::var("INGRESS_CLASS").unwrap_or_else(|_| "gce".to_string()),
            external_load_balancer: parse_flag("EXTERNAL_LOAD_BALANCER", true)?,
            image_registry: non_empty("IMAGE_REGISTRY"),
            rule_discovery: RetryPolicy::every(polling::INTERVAL_SECS, rule_attempts),
            ip_release: RetryPolicy::every(polling::INTERVAL_SECS, polling::IP_RELEASE_ATTEMPTS),
            lb_ip_timeout,
        })
    }
}

/// Boolean variable, `default` when unset
fn parse_flag(key: &str, default: bool) -> Result<bool> {
    match non_empty(key) {
        Some(v) => v
            .trim()
            .parse()
            .with_context(|| format!("{} must be true or false, got {:?}", key, v)),
        None => Ok(default),
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Split a comma separated list, dropping blank entries
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
