// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! REST client for Cloud DNS, Compute Engine and the container registry.

use crate::cloud::{
    Address, Change, CloudError, ComputeApi, DnsApi, ForwardingRule, ImageTagLister,
    SslCertificate, TagManifest, TargetHttpsProxy,
};
use async_trait::async_trait;
use reqwest::{Client as HttpClient, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, instrument};
use url::Url;

const COMPUTE_ENDPOINT: &str = "https://compute.googleapis.com/";
const DNS_ENDPOINT: &str = "https://dns.googleapis.com/";

/// Paged list response shared by Compute list calls
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListPage<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct RegistryTags {
    #[serde(default)]
    manifest: BTreeMap<String, RegistryManifest>,
}

#[derive(Deserialize)]
struct RegistryManifest {
    #[serde(default)]
    tag: Vec<String>,
}

/// Authenticated client; the access token is obtained by the caller
#[derive(Clone)]
pub struct GcpClient {
    http: HttpClient,
    token: String,
    compute_endpoint: Url,
    dns_endpoint: Url,
    /// Overrides `https://<registry host>/` for tag listing
    registry_endpoint: Option<Url>,
}

impl GcpClient {
    pub fn new(token: impl Into<String>) -> Result<Self, CloudError> {
        Self::with_endpoints(token, COMPUTE_ENDPOINT, DNS_ENDPOINT, None)
    }

    pub fn with_endpoints(
        token: impl Into<String>,
        compute_endpoint: &str,
        dns_endpoint: &str,
        registry_endpoint: Option<&str>,
    ) -> Result<Self, CloudError> {
        Ok(Self {
            http: HttpClient::new(),
            token: token.into(),
            compute_endpoint: parse_endpoint(compute_endpoint)?,
            dns_endpoint: parse_endpoint(dns_endpoint)?,
            registry_endpoint: registry_endpoint.map(parse_endpoint).transpose()?,
        })
    }

    fn compute_url(&self, project_id: &str, path: &str) -> Result<Url, CloudError> {
        join(
            &self.compute_endpoint,
            &format!("compute/v1/projects/{}/global/{}", project_id, path),
        )
    }

    fn tags_url(&self, image_path: &str) -> Result<Url, CloudError> {
        let (host, repository) = image_path.split_once('/').ok_or_else(|| {
            CloudError::new(None, format!("Image path {} has no repository", image_path))
        })?;

        let base = match &self.registry_endpoint {
            Some(endpoint) => endpoint.clone(),
            None => parse_endpoint(&format!("https://{}/", host))?,
        };
        join(&base, &format!("v2/{}/tags/list", repository))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(&self.token)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, CloudError> {
        debug!("GET {}", url);
        let response = self
            .authorized(self.http.get(url))
            .send()
            .await
            .map_err(transport_error)?;
        decode(check(response).await?).await
    }

    async fn post_json<B: serde::Serialize + ?Sized>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<(), CloudError> {
        debug!("POST {}", url);
        let response = self
            .authorized(self.http.post(url).json(body))
            .send()
            .await
            .map_err(transport_error)?;
        check(response).await?;
        Ok(())
    }

    async fn list_all<T: DeserializeOwned>(&self, url: Url) -> Result<Vec<T>, CloudError> {
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut page_url = url.clone();
            if let Some(token) = &page_token {
                page_url.query_pairs_mut().append_pair("pageToken", token);
            }

            let page: ListPage<T> = self.get_json(page_url).await?;
            items.extend(page.items);

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => return Ok(items),
            }
        }
    }
}

fn parse_endpoint(endpoint: &str) -> Result<Url, CloudError> {
    Url::parse(endpoint)
        .map_err(|e| CloudError::new(None, format!("Invalid endpoint {}: {}", endpoint, e)))
}

fn join(base: &Url, path: &str) -> Result<Url, CloudError> {
    base.join(path)
        .map_err(|e| CloudError::new(None, format!("Invalid path {}: {}", path, e)))
}

fn transport_error(e: reqwest::Error) -> CloudError {
    CloudError::new(e.status().map(|s| s.as_u16()), e.to_string())
}

async fn check(response: Response) -> Result<Response, CloudError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(CloudError::new(Some(status.as_u16()), error_message(status.as_u16(), &body)))
}

/// Extract `error.message` from a Google API error body, or fall back to the raw body
fn error_message(status: u16, body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(String::from))
        .unwrap_or_else(|| format!("HTTP {}: {}", status, body.trim()))
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, CloudError> {
    response
        .json()
        .await
        .map_err(|e| CloudError::new(None, format!("Failed to decode response: {}", e)))
}

#[async_trait]
impl DnsApi for GcpClient {
    #[instrument(skip(self, change))]
    async fn create_change(
        &self,
        project_id: &str,
        managed_zone: &str,
        change: &Change,
    ) -> Result<(), CloudError> {
        let url = join(
            &self.dns_endpoint,
            &format!(
                "dns/v1/projects/{}/managedZones/{}/changes",
                project_id, managed_zone
            ),
        )?;
        self.post_json(url, change).await
    }
}

#[async_trait]
impl ComputeApi for GcpClient {
    async fn list_addresses(&self, project_id: &str) -> Result<Vec<Address>, CloudError> {
        self.list_all(self.compute_url(project_id, "addresses")?).await
    }

    async fn get_address(&self, project_id: &str, name: &str) -> Result<Address, CloudError> {
        self.get_json(self.compute_url(project_id, &format!("addresses/{}", name))?)
            .await
    }

    async fn list_forwarding_rules(
        &self,
        project_id: &str,
    ) -> Result<Vec<ForwardingRule>, CloudError> {
        self.list_all(self.compute_url(project_id, "forwardingRules")?)
            .await
    }

    async fn get_forwarding_rule(
        &self,
        project_id: &str,
        name: &str,
    ) -> Result<ForwardingRule, CloudError> {
        self.get_json(self.compute_url(project_id, &format!("forwardingRules/{}", name))?)
            .await
    }

    #[instrument(skip(self, rule), fields(rule = %rule.name))]
    async fn insert_forwarding_rule(
        &self,
        project_id: &str,
        rule: &ForwardingRule,
    ) -> Result<(), CloudError> {
        self.post_json(self.compute_url(project_id, "forwardingRules")?, rule)
            .await
    }

    async fn list_target_https_proxies(
        &self,
        project_id: &str,
    ) -> Result<Vec<TargetHttpsProxy>, CloudError> {
        self.list_all(self.compute_url(project_id, "targetHttpsProxies")?)
            .await
    }

    #[instrument(skip(self, certificates))]
    async fn set_ssl_certificates(
        &self,
        project_id: &str,
        proxy: &str,
        certificates: &[String],
    ) -> Result<(), CloudError> {
        let url = self.compute_url(
            project_id,
            &format!("targetHttpsProxies/{}/setSslCertificates", proxy),
        )?;
        self.post_json(url, &serde_json::json!({ "sslCertificates": certificates }))
            .await
    }

    async fn get_ssl_certificate(
        &self,
        project_id: &str,
        name: &str,
    ) -> Result<SslCertificate, CloudError> {
        self.get_json(self.compute_url(project_id, &format!("sslCertificates/{}", name))?)
            .await
    }
}

#[async_trait]
impl ImageTagLister for GcpClient {
    async fn list(&self, image_path: &str) -> Result<Vec<TagManifest>, CloudError> {
        let tags: RegistryTags = self.get_json(self.tags_url(image_path)?).await?;

        Ok(tags
            .manifest
            .into_values()
            .map(|manifest| TagManifest { tags: manifest.tag })
            .collect())
    }
}
