// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Typed manifest objects and their decoding from rendered YAML.

use crate::error::{BranchEnvError, Result};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::batch::v1::CronJob;
use k8s_openapi::api::core::v1::{
    ConfigMap, PersistentVolume, PersistentVolumeClaim, Secret, Service,
};
use k8s_openapi::api::networking::v1::Ingress;
use kube::ResourceExt;
use serde::Deserialize;
use std::fmt;

/// Resource kinds the engine applies and reclaims
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceKind {
    Secret,
    ConfigMap,
    Service,
    Deployment,
    Ingress,
    CronJob,
    PersistentVolume,
    PersistentVolumeClaim,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Secret => "Secret",
            ResourceKind::ConfigMap => "ConfigMap",
            ResourceKind::Service => "Service",
            ResourceKind::Deployment => "Deployment",
            ResourceKind::Ingress => "Ingress",
            ResourceKind::CronJob => "CronJob",
            ResourceKind::PersistentVolume => "PersistentVolume",
            ResourceKind::PersistentVolumeClaim => "PersistentVolumeClaim",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decoded manifest object
#[derive(Debug, Clone)]
pub enum Manifest {
    Secret(Secret),
    ConfigMap(ConfigMap),
    Service(Service),
    Deployment(Deployment),
    Ingress(Ingress),
    CronJob(CronJob),
    PersistentVolume(PersistentVolume),
    PersistentVolumeClaim(PersistentVolumeClaim),
}

impl Manifest {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Manifest::Secret(_) => ResourceKind::Secret,
            Manifest::ConfigMap(_) => ResourceKind::ConfigMap,
            Manifest::Service(_) => ResourceKind::Service,
            Manifest::Deployment(_) => ResourceKind::Deployment,
            Manifest::Ingress(_) => ResourceKind::Ingress,
            Manifest::CronJob(_) => ResourceKind::CronJob,
            Manifest::PersistentVolume(_) => ResourceKind::PersistentVolume,
            Manifest::PersistentVolumeClaim(_) => ResourceKind::PersistentVolumeClaim,
        }
    }

    pub fn name(&self) -> String {
        match self {
            Manifest::Secret(o) => o.name_any(),
            Manifest::ConfigMap(o) => o.name_any(),
            Manifest::Service(o) => o.name_any(),
            Manifest::Deployment(o) => o.name_any(),
            Manifest::Ingress(o) => o.name_any(),
            Manifest::CronJob(o) => o.name_any(),
            Manifest::PersistentVolume(o) => o.name_any(),
            Manifest::PersistentVolumeClaim(o) => o.name_any(),
        }
    }

    /// Decode a single object by its `kind` discriminator
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let kind = value
            .get("kind")
            .and_then(|k| k.as_str())
            .ok_or_else(|| BranchEnvError::DecodeError("object has no kind".to_string()))?
            .to_string();

        let has_name = value
            .pointer("/metadata/name")
            .and_then(|n| n.as_str())
            .is_some_and(|n| !n.is_empty());
        if !has_name {
            return Err(BranchEnvError::DecodeError(format!(
                "{} has no metadata.name",
                kind
            )));
        }

        let manifest = match kind.as_str() {
            "Secret" => serde_json::from_value(value).map(Manifest::Secret),
            "ConfigMap" => serde_json::from_value(value).map(Manifest::ConfigMap),
            "Service" => serde_json::from_value(value).map(Manifest::Service),
            "Deployment" => serde_json::from_value(value).map(Manifest::Deployment),
            "Ingress" => serde_json::from_value(value).map(Manifest::Ingress),
            "CronJob" => serde_json::from_value(value).map(Manifest::CronJob),
            "PersistentVolume" => serde_json::from_value(value).map(Manifest::PersistentVolume),
            "PersistentVolumeClaim" => {
                serde_json::from_value(value).map(Manifest::PersistentVolumeClaim)
            }
            other => {
                return Err(BranchEnvError::DecodeError(format!(
                    "unsupported kind {}",
                    other
                )))
            }
        };

        manifest.map_err(|e| BranchEnvError::DecodeError(format!("{}: {}", kind, e)))
    }

    /// Decode every document of a rendered multi-document YAML stream
    pub fn from_yaml(documents: &str) -> Result<Vec<Self>> {
        let mut manifests = Vec::new();

        for (index, document) in serde_yaml::Deserializer::from_str(documents).enumerate() {
            let value = serde_json::Value::deserialize(document).map_err(|e| {
                BranchEnvError::DecodeError(format!("document {}: {}", index, e))
            })?;

            // Empty documents between separators
            if value.is_null() {
                continue;
            }

            manifests.push(Self::from_value(value)?);
        }

        Ok(manifests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_by_kind() {
        let manifest = Manifest::from_value(json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {"name": "settings"},
            "data": {"A": "1"}
        }))
        .unwrap();

        assert_eq!(manifest.kind(), ResourceKind::ConfigMap);
        assert_eq!(manifest.name(), "settings");
    }

    #[test]
    fn test_unknown_kind_is_decode_error() {
        let err = Manifest::from_value(json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": {"name": "p"}
        }))
        .unwrap_err();

        assert!(matches!(err, BranchEnvError::DecodeError(_)));
        assert_eq!(err.to_string(), "Failed to decode manifest: unsupported kind Pod");
    }

    #[test]
    fn test_missing_name_is_decode_error() {
        let err = Manifest::from_value(json!({
            "apiVersion": "v1",
            "kind": "Secret",
            "metadata": {}
        }))
        .unwrap_err();

        assert!(matches!(err, BranchEnvError::DecodeError(_)));
    }

    #[test]
    fn test_malformed_object_is_decode_error() {
        let err = Manifest::from_value(json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {"name": "web"},
            "spec": {"replicas": "many"}
        }))
        .unwrap_err();

        assert!(matches!(err, BranchEnvError::DecodeError(_)));
    }

    #[test]
    fn test_from_yaml_skips_empty_documents() {
        let yaml = r#"
apiVersion: v1
kind: Secret
metadata:
  name: creds
---
---
apiVersion: networking.k8s.io/v1
kind: Ingress
metadata:
  name: web
"#;

        let manifests = Manifest::from_yaml(yaml).unwrap();

        let kinds: Vec<_> = manifests.iter().map(|m| m.kind()).collect();
        assert_eq!(kinds, vec![ResourceKind::Secret, ResourceKind::Ingress]);
    }
}
