// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities for mocking Kubernetes and cloud API responses.

use crate::cloud::{
    Address, Change, CloudError, ComputeApi, DnsApi, ForwardingRule, ImageTagLister,
    SslCertificate, TagManifest, TargetHttpsProxy,
};
use crate::progress::Progress;
use async_trait::async_trait;
use http::{Request, Response};
use http_body_util::BodyExt;
use kube::client::Body;
use kube::Client;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::Service;

/// A request the mock received
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub body: String,
}

impl RecordedRequest {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap_or(serde_json::Value::Null)
    }
}

type ResponseQueue = VecDeque<(u16, String)>;

/// A mock HTTP service that returns predefined responses by method and exact path.
///
/// Each `(method, path)` holds a queue of responses; the last one is repeated
/// once the queue is drained. Unmatched requests get a 404 Status.
#[derive(Clone, Default)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<(String, String), ResponseQueue>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, method: &str, path: &str, status: u16, body: impl Into<String>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry((method.to_string(), path.to_string()))
            .or_default()
            .push_back((status, body.into()));
        self
    }

    pub fn on_get(self, path: &str, status: u16, body: impl Into<String>) -> Self {
        self.on("GET", path, status, body)
    }

    pub fn on_post(self, path: &str, status: u16, body: impl Into<String>) -> Self {
        self.on("POST", path, status, body)
    }

    pub fn on_put(self, path: &str, status: u16, body: impl Into<String>) -> Self {
        self.on("PUT", path, status, body)
    }

    pub fn on_patch(self, path: &str, status: u16, body: impl Into<String>) -> Self {
        self.on("PATCH", path, status, body)
    }

    pub fn on_delete(self, path: &str, status: u16, body: impl Into<String>) -> Self {
        self.on("DELETE", path, status, body)
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "default")
    }

    /// Every request received so far, in order
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests received for a method, as paths
    pub fn paths(&self, method: &str) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method)
            .map(|r| r.path)
            .collect()
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        let mut responses = self.responses.lock().unwrap();
        let queue = responses.get_mut(&(method.to_string(), path.to_string()))?;

        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();
        let response = self.find_response(&method, &path);
        let requests = self.requests.clone();

        Box::pin(async move {
            let body = match req.into_body().collect().await {
                Ok(collected) => String::from_utf8_lossy(&collected.to_bytes()).to_string(),
                Err(_) => String::new(),
            };
            requests.lock().unwrap().push(RecordedRequest { method, path, body });

            let (status, body) = response.unwrap_or_else(|| (404, not_found_json("resource", "unknown")));
            Ok(Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(Body::from(body.into_bytes()))
                .unwrap())
        })
    }
}

/// Create a mock namespace JSON response
pub fn namespace_json(name: &str, annotations: serde_json::Value) -> String {
    serde_json::json!({
        "apiVersion": "v1",
        "kind": "Namespace",
        "metadata": {
            "name": name,
            "uid": "test-uid",
            "annotations": annotations
        }
    })
    .to_string()
}

/// Create a list response of the given kind
pub fn list_json(api_version: &str, kind: &str, items: Vec<serde_json::Value>) -> String {
    serde_json::json!({
        "apiVersion": api_version,
        "kind": format!("{}List", kind),
        "metadata": { "resourceVersion": "1" },
        "items": items
    })
    .to_string()
}

/// Create a minimal object JSON with the given name
pub fn object_json(api_version: &str, kind: &str, namespace: &str, name: &str) -> serde_json::Value {
    serde_json::json!({
        "apiVersion": api_version,
        "kind": kind,
        "metadata": { "name": name, "namespace": namespace }
    })
}

/// Create a 404 not found response
pub fn not_found_json(resource: &str, name: &str) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": format!("{} \"{}\" not found", resource, name),
        "reason": "NotFound",
        "code": 404
    })
    .to_string()
}

/// Create a successful Status response, as returned by deletes
pub fn success_status_json() -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Success",
        "metadata": {}
    })
    .to_string()
}

/// Progress sink that keeps every line for assertions
#[derive(Default)]
pub struct RecordingProgress {
    lines: Mutex<Vec<String>>,
}

impl RecordingProgress {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl Progress for RecordingProgress {
    fn line(&self, message: &str) {
        self.lines.lock().unwrap().push(message.to_string());
    }
}

/// DNS API that records submitted changes
#[derive(Default)]
pub struct FakeDns {
    changes: Mutex<Vec<(String, String, Change)>>,
    failure: Option<CloudError>,
}

impl FakeDns {
    pub fn failing(error: CloudError) -> Self {
        Self {
            failure: Some(error),
            ..Default::default()
        }
    }

    pub fn changes(&self) -> Vec<(String, String, Change)> {
        self.changes.lock().unwrap().clone()
    }
}

#[async_trait]
impl DnsApi for FakeDns {
    async fn create_change(
        &self,
        project_id: &str,
        managed_zone: &str,
        change: &Change,
    ) -> Result<(), CloudError> {
        if let Some(e) = &self.failure {
            return Err(e.clone());
        }
        self.changes.lock().unwrap().push((
            project_id.to_string(),
            managed_zone.to_string(),
            change.clone(),
        ));
        Ok(())
    }
}

/// In-memory Compute API
#[derive(Default)]
pub struct FakeCompute {
    /// Successive address lists; the last one is repeated
    pub addresses: Mutex<VecDeque<Vec<Address>>>,
    pub rules: Mutex<Vec<ForwardingRule>>,
    /// Number of rule list calls answered with no rules before `rules` is served
    pub hidden_rule_lists: Mutex<u32>,
    /// Error returned by `get_forwarding_rule` instead of a lookup
    pub rule_lookup_error: Mutex<Option<CloudError>>,
    pub inserted: Mutex<Vec<ForwardingRule>>,
    pub proxies: Mutex<Vec<TargetHttpsProxy>>,
    pub certificates: Mutex<Vec<SslCertificate>>,
    pub certificate_updates: Mutex<Vec<(String, Vec<String>)>>,
}

impl FakeCompute {
    pub fn with_addresses(self, addresses: Vec<Address>) -> Self {
        self.addresses.lock().unwrap().push_back(addresses);
        self
    }

    pub fn with_rules(self, rules: Vec<ForwardingRule>) -> Self {
        *self.rules.lock().unwrap() = rules;
        self
    }

    pub fn with_proxies(self, proxies: Vec<TargetHttpsProxy>) -> Self {
        *self.proxies.lock().unwrap() = proxies;
        self
    }

    pub fn with_certificates(self, certificates: Vec<SslCertificate>) -> Self {
        *self.certificates.lock().unwrap() = certificates;
        self
    }

    pub fn inserted(&self) -> Vec<ForwardingRule> {
        self.inserted.lock().unwrap().clone()
    }

    pub fn certificate_updates(&self) -> Vec<(String, Vec<String>)> {
        self.certificate_updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl ComputeApi for FakeCompute {
    async fn list_addresses(&self, _project_id: &str) -> Result<Vec<Address>, CloudError> {
        let mut addresses = self.addresses.lock().unwrap();
        if addresses.len() > 1 {
            Ok(addresses.pop_front().unwrap_or_default())
        } else {
            Ok(addresses.front().cloned().unwrap_or_default())
        }
    }

    async fn get_address(&self, project_id: &str, name: &str) -> Result<Address, CloudError> {
        self.list_addresses(project_id)
            .await?
            .into_iter()
            .find(|a| a.name == name)
            .ok_or_else(|| CloudError::not_found(format!("address {} not found", name)))
    }

    async fn list_forwarding_rules(
        &self,
        _project_id: &str,
    ) -> Result<Vec<ForwardingRule>, CloudError> {
        let mut hidden = self.hidden_rule_lists.lock().unwrap();
        if *hidden > 0 {
            *hidden -= 1;
            return Ok(Vec::new());
        }
        Ok(self.rules.lock().unwrap().clone())
    }

    async fn get_forwarding_rule(
        &self,
        _project_id: &str,
        name: &str,
    ) -> Result<ForwardingRule, CloudError> {
        if let Some(e) = self.rule_lookup_error.lock().unwrap().clone() {
            return Err(e);
        }
        self.rules
            .lock()
            .unwrap()
            .iter()
            .chain(self.inserted.lock().unwrap().iter())
            .find(|r| r.name == name)
            .cloned()
            .ok_or_else(|| CloudError::not_found(format!("forwarding rule {} not found", name)))
    }

    async fn insert_forwarding_rule(
        &self,
        _project_id: &str,
        rule: &ForwardingRule,
    ) -> Result<(), CloudError> {
        self.inserted.lock().unwrap().push(rule.clone());
        Ok(())
    }

    async fn list_target_https_proxies(
        &self,
        _project_id: &str,
    ) -> Result<Vec<TargetHttpsProxy>, CloudError> {
        Ok(self.proxies.lock().unwrap().clone())
    }

    async fn set_ssl_certificates(
        &self,
        _project_id: &str,
        proxy: &str,
        certificates: &[String],
    ) -> Result<(), CloudError> {
        self.certificate_updates
            .lock()
            .unwrap()
            .push((proxy.to_string(), certificates.to_vec()));
        Ok(())
    }

    async fn get_ssl_certificate(
        &self,
        _project_id: &str,
        name: &str,
    ) -> Result<SslCertificate, CloudError> {
        self.certificates
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.name == name)
            .cloned()
            .ok_or_else(|| CloudError::not_found(format!("certificate {} not found", name)))
    }
}

/// Registry that serves fixed tag manifests per image path
#[derive(Default)]
pub struct FakeImages {
    pub manifests: HashMap<String, Vec<TagManifest>>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeImages {
    pub fn with(mut self, image_path: &str, tags: &[&str]) -> Self {
        self.manifests
            .entry(image_path.to_string())
            .or_default()
            .push(TagManifest {
                tags: tags.iter().map(|t| t.to_string()).collect(),
            });
        self
    }
}

#[async_trait]
impl ImageTagLister for FakeImages {
    async fn list(&self, image_path: &str) -> Result<Vec<TagManifest>, CloudError> {
        self.calls.lock().unwrap().push(image_path.to_string());
        Ok(self.manifests.get(image_path).cloned().unwrap_or_default())
    }
}
