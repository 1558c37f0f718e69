// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Keeps an environment's DNS records in step with its load balancer IP.

use crate::cloud::{Change, DnsApi, ResourceRecordSet};
use crate::config::DnsConfig;
use crate::constants::{DNS_TTL, PRODUCTION};
use crate::error::{BranchEnvError, Result};
use crate::progress::Progress;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Domain an environment is served under
pub fn domain(namespace: &str, config: &DnsConfig) -> String {
    match config.base_domain.as_deref() {
        Some(base) if namespace == PRODUCTION => base.to_string(),
        Some(base) => format!("{}{}{}", namespace, config.spacer, base),
        None if namespace == PRODUCTION => String::new(),
        None => format!("{}{}", namespace, config.suffix),
    }
}

fn fqdn(name: &str) -> String {
    if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{}.", name)
    }
}

/// The A record for `domain` plus one CNAME per configured alias suffix
pub fn record_sets(domain: &str, ip: &str, config: &DnsConfig) -> Vec<ResourceRecordSet> {
    let mut records = vec![ResourceRecordSet {
        name: fqdn(domain),
        record_type: "A".to_string(),
        ttl: DNS_TTL,
        rrdatas: vec![ip.to_string()],
    }];

    records.extend(config.aliases.iter().map(|suffix| ResourceRecordSet {
        name: fqdn(&format!("{}{}", domain, suffix)),
        record_type: "CNAME".to_string(),
        ttl: DNS_TTL,
        rrdatas: vec![fqdn(domain)],
    }));

    records
}

pub struct DnsRecordSynchronizer {
    api: Arc<dyn DnsApi>,
    config: DnsConfig,
}

impl DnsRecordSynchronizer {
    pub fn new(api: Arc<dyn DnsApi>, config: DnsConfig) -> Self {
        Self { api, config }
    }

    pub fn domain(&self, namespace: &str) -> String {
        domain(namespace, &self.config)
    }

    /// Record sets for `namespace`, refusing an empty domain
    fn records(&self, namespace: &str, ip: &str) -> Result<Vec<ResourceRecordSet>> {
        let domain = self.domain(namespace);
        if domain.is_empty() {
            return Err(BranchEnvError::ConfigError(format!(
                "no domain for namespace {}, BASE_DOMAIN is required",
                namespace
            )));
        }
        Ok(record_sets(&domain, ip, &self.config))
    }

    /// Publish the environment's records pointing at `ip`
    #[instrument(skip(self, progress))]
    pub async fn create(&self, namespace: &str, ip: &str, progress: &dyn Progress) -> Result<()> {
        let change = Change {
            additions: self.records(namespace, ip)?,
            ..Default::default()
        };

        self.api
            .create_change(&self.config.project_id, &self.config.managed_zone, &change)
            .await?;

        progress.line(&format!("Created DNS Entries for {}", ip));
        Ok(())
    }

    /// Withdraw the environment's records; a no-op when `ip` is empty
    #[instrument(skip(self, progress))]
    pub async fn delete(&self, namespace: &str, ip: &str, progress: &dyn Progress) -> Result<()> {
        if ip.is_empty() {
            debug!("No load balancer IP known for {}, leaving DNS untouched", namespace);
            return Ok(());
        }

        let change = Change {
            deletions: self.records(namespace, ip)?,
            ..Default::default()
        };

        self.api
            .create_change(&self.config.project_id, &self.config.managed_zone, &change)
            .await?;

        progress.line(&format!("Deleted DNS Entries for {}", ip));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::CloudError;
    use crate::error::BranchEnvError;
    use crate::test_utils::{FakeDns, RecordingProgress};

    fn make_config() -> DnsConfig {
        DnsConfig {
            project_id: "dns-project".to_string(),
            managed_zone: "zone".to_string(),
            base_domain: Some("example.com".to_string()),
            spacer: ".".to_string(),
            suffix: String::new(),
            aliases: vec!["-api".to_string()],
        }
    }

    #[test]
    fn test_domain_production_uses_base_domain() {
        let config = DnsConfig {
            base_domain: Some("x".to_string()),
            ..Default::default()
        };
        assert_eq!(domain("production", &config), "x");
    }

    #[test]
    fn test_domain_with_suffix() {
        let config = DnsConfig {
            suffix: "-testing".to_string(),
            ..Default::default()
        };
        assert_eq!(domain("foobar", &config), "foobar-testing");
    }

    #[test]
    fn test_domain_with_base_domain_and_spacer() {
        let config = DnsConfig {
            base_domain: Some("testing".to_string()),
            spacer: ".".to_string(),
            ..Default::default()
        };
        assert_eq!(domain("foobar", &config), "foobar.testing");
    }

    #[test]
    fn test_record_sets_a_and_aliases() {
        let records = record_sets("demo.example.com", "10.0.0.1", &make_config());

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "demo.example.com.");
        assert_eq!(records[0].record_type, "A");
        assert_eq!(records[0].ttl, 300);
        assert_eq!(records[0].rrdatas, vec!["10.0.0.1"]);
        assert_eq!(records[1].name, "demo.example.com-api.");
        assert_eq!(records[1].record_type, "CNAME");
        assert_eq!(records[1].rrdatas, vec!["demo.example.com."]);
    }

    #[tokio::test]
    async fn test_create_submits_additions() {
        let dns = Arc::new(FakeDns::default());
        let progress = RecordingProgress::default();
        let sync = DnsRecordSynchronizer::new(dns.clone(), make_config());

        sync.create("demo", "10.0.0.1", &progress).await.unwrap();

        let changes = dns.changes();
        assert_eq!(changes.len(), 1);
        let (project, zone, change) = &changes[0];
        assert_eq!(project, "dns-project");
        assert_eq!(zone, "zone");
        assert_eq!(change.additions.len(), 2);
        assert!(change.deletions.is_empty());
        assert_eq!(progress.lines(), vec!["Created DNS Entries for 10.0.0.1"]);
    }

    #[tokio::test]
    async fn test_delete_submits_deletions() {
        let dns = Arc::new(FakeDns::default());
        let progress = RecordingProgress::default();
        let sync = DnsRecordSynchronizer::new(dns.clone(), make_config());

        sync.delete("demo", "10.0.0.1", &progress).await.unwrap();

        let changes = dns.changes();
        assert_eq!(changes.len(), 1);
        assert!(changes[0].2.additions.is_empty());
        assert_eq!(changes[0].2.deletions.len(), 2);
        assert_eq!(progress.lines(), vec!["Deleted DNS Entries for 10.0.0.1"]);
    }

    #[tokio::test]
    async fn test_delete_without_ip_makes_no_calls() {
        let dns = Arc::new(FakeDns::default());
        let progress = RecordingProgress::default();
        let sync = DnsRecordSynchronizer::new(dns.clone(), make_config());

        sync.delete("demo", "", &progress).await.unwrap();

        assert!(dns.changes().is_empty());
        assert!(progress.lines().is_empty());
    }

    #[tokio::test]
    async fn test_api_error_is_surfaced_unchanged() {
        let dns = Arc::new(FakeDns::failing(CloudError::new(Some(409), "already exists")));
        let progress = RecordingProgress::default();
        let sync = DnsRecordSynchronizer::new(dns, make_config());

        let err = sync.create("demo", "10.0.0.1", &progress).await.unwrap_err();

        match err {
            BranchEnvError::CloudError(e) => {
                assert_eq!(e.status, Some(409));
                assert_eq!(e.message, "already exists");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(progress.lines().is_empty());
    }

    #[tokio::test]
    async fn test_production_without_base_domain_is_rejected() {
        let dns = Arc::new(FakeDns::default());
        let progress = RecordingProgress::default();
        let config = DnsConfig {
            base_domain: None,
            ..make_config()
        };
        let sync = DnsRecordSynchronizer::new(dns.clone(), config);

        let err = sync.create("production", "10.0.0.1", &progress).await.unwrap_err();
        assert!(matches!(err, BranchEnvError::ConfigError(_)));

        let err = sync.delete("production", "10.0.0.1", &progress).await.unwrap_err();
        assert!(matches!(err, BranchEnvError::ConfigError(_)));

        assert!(dns.changes().is_empty());
        assert!(progress.lines().is_empty());
    }
}
