// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Cloud DNS, Compute and registry seams used by the engine.
//!
//! The engine only talks to these traits; `gcp::GcpClient` is the REST
//! implementation used by the binary and tests substitute in-memory fakes.

pub mod dns;
pub mod gcp;

use crate::context::DeployContext;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported by a cloud API, passed through to the caller unchanged
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct CloudError {
    /// HTTP status of the failed call, if one was received
    pub status: Option<u16>,
    pub message: String,
}

impl CloudError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(Some(404), message)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }
}

/// One DNS resource record set
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRecordSet {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub ttl: i64,
    pub rrdatas: Vec<String>,
}

/// An additive and/or subtractive change to a managed zone
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additions: Vec<ResourceRecordSet>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deletions: Vec<ResourceRecordSet>,
}

/// Reserved external address
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub status: String,
}

/// Global forwarding rule binding an IP and port range to a target proxy
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ForwardingRule {
    pub name: String,
    #[serde(rename = "IPAddress", default)]
    pub ip_address: String,
    #[serde(rename = "IPProtocol", default)]
    pub ip_protocol: String,
    #[serde(rename = "portRange", default)]
    pub port_range: String,
    #[serde(default)]
    pub target: String,
    #[serde(rename = "loadBalancingScheme", default)]
    pub load_balancing_scheme: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TargetHttpsProxy {
    pub name: String,
    #[serde(default)]
    pub ssl_certificates: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SslCertificate {
    pub name: String,
    #[serde(default)]
    pub self_link: String,
}

/// Tags attached to one image manifest in a registry
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagManifest {
    pub tags: Vec<String>,
}

#[async_trait]
pub trait DnsApi: Send + Sync {
    async fn create_change(
        &self,
        project_id: &str,
        managed_zone: &str,
        change: &Change,
    ) -> Result<(), CloudError>;
}

#[async_trait]
pub trait ComputeApi: Send + Sync {
    async fn list_addresses(&self, project_id: &str) -> Result<Vec<Address>, CloudError>;

    async fn get_address(&self, project_id: &str, name: &str) -> Result<Address, CloudError>;

    async fn list_forwarding_rules(
        &self,
        project_id: &str,
    ) -> Result<Vec<ForwardingRule>, CloudError>;

    async fn get_forwarding_rule(
        &self,
        project_id: &str,
        name: &str,
    ) -> Result<ForwardingRule, CloudError>;

    async fn insert_forwarding_rule(
        &self,
        project_id: &str,
        rule: &ForwardingRule,
    ) -> Result<(), CloudError>;

    async fn list_target_https_proxies(
        &self,
        project_id: &str,
    ) -> Result<Vec<TargetHttpsProxy>, CloudError>;

    async fn set_ssl_certificates(
        &self,
        project_id: &str,
        proxy: &str,
        certificates: &[String],
    ) -> Result<(), CloudError>;

    async fn get_ssl_certificate(
        &self,
        project_id: &str,
        name: &str,
    ) -> Result<SslCertificate, CloudError>;
}

/// Lists the tag manifests of an image path such as `gcr.io/project/app`
#[async_trait]
pub trait ImageTagLister: Send + Sync {
    async fn list(&self, image_path: &str) -> Result<Vec<TagManifest>, CloudError>;
}

/// Pins the endpoint service configuration an environment is served with
#[async_trait]
pub trait EndpointsPinner: Send + Sync {
    /// Returns the pinned version, or `None` when nothing needed pinning
    async fn pin_version(&self, ctx: &DeployContext) -> Result<Option<String>, CloudError>;
}
