// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Ingress lookups shared by the watcher, network automation and teardown.

use crate::constants::annotations;
use crate::error::Result;
use k8s_openapi::api::networking::v1::Ingress;
use kube::{
    api::{DeleteParams, ListParams},
    Api, Client, ResourceExt,
};
use tracing::instrument;

pub async fn list_ingresses(client: &Client, namespace: &str) -> Result<Vec<Ingress>> {
    let api: Api<Ingress> = Api::namespaced(client.clone(), namespace);
    Ok(api.list(&ListParams::default()).await?.items)
}

/// Ingress class, from the legacy annotation or `spec.ingressClassName`
pub fn ingress_class(ingress: &Ingress) -> Option<&str> {
    ingress
        .annotations()
        .get(annotations::INGRESS_CLASS)
        .map(String::as_str)
        .or_else(|| {
            ingress
                .spec
                .as_ref()
                .and_then(|s| s.ingress_class_name.as_deref())
        })
}

/// Whether any of the ingresses is served by the `class` controller
pub fn has_class(ingresses: &[Ingress], class: &str) -> bool {
    ingresses.iter().any(|i| ingress_class(i) == Some(class))
}

/// First IP the load balancer assigned to this ingress
pub fn external_ip(ingress: &Ingress) -> Option<&str> {
    ingress
        .status
        .as_ref()?
        .load_balancer
        .as_ref()?
        .ingress
        .as_ref()?
        .iter()
        .find_map(|lb| lb.ip.as_deref().filter(|ip| !ip.is_empty()))
}

/// Names of reserved static IPs the ingresses are bound to
pub fn static_ip_names(ingresses: &[Ingress]) -> Vec<String> {
    ingresses
        .iter()
        .filter_map(|i| i.annotations().get(annotations::STATIC_IP_NAME).cloned())
        .filter(|name| !name.is_empty())
        .collect()
}

#[instrument(skip(client))]
pub async fn delete_ingresses(client: &Client, namespace: &str) -> Result<()> {
    let api: Api<Ingress> = Api::namespaced(client.clone(), namespace);
    api.delete_collection(&DeleteParams::background(), &ListParams::default())
        .await?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    pub(crate) fn make_ingress(
        name: &str,
        annotations: serde_json::Value,
        ip: Option<&str>,
    ) -> Ingress {
        let status = match ip {
            Some(ip) => json!({"loadBalancer": {"ingress": [{"ip": ip}]}}),
            None => json!({}),
        };
        serde_json::from_value(json!({
            "apiVersion": "networking.k8s.io/v1",
            "kind": "Ingress",
            "metadata": {"name": name, "namespace": "demo", "annotations": annotations},
            "status": status
        }))
        .unwrap()
    }

    #[test]
    fn test_ingress_class_from_annotation() {
        let ingress = make_ingress("web", json!({"kubernetes.io/ingress.class": "gce"}), None);
        assert_eq!(ingress_class(&ingress), Some("gce"));
    }

    #[test]
    fn test_ingress_class_from_spec() {
        let mut ingress = make_ingress("web", json!({}), None);
        ingress.spec = Some(k8s_openapi::api::networking::v1::IngressSpec {
            ingress_class_name: Some("gce".to_string()),
            ..Default::default()
        });
        assert_eq!(ingress_class(&ingress), Some("gce"));
    }

    #[test]
    fn test_has_class() {
        let ingresses = vec![
            make_ingress("web", json!({"kubernetes.io/ingress.class": "nginx"}), None),
            make_ingress("bare", json!({}), None),
        ];
        assert!(!has_class(&ingresses, "gce"));
        assert!(has_class(&ingresses, "nginx"));
        assert!(!has_class(&[], "gce"));
    }

    #[test]
    fn test_external_ip() {
        assert_eq!(
            external_ip(&make_ingress("web", json!({}), Some("34.1.2.3"))),
            Some("34.1.2.3")
        );
        assert_eq!(external_ip(&make_ingress("web", json!({}), None)), None);
    }

    #[test]
    fn test_static_ip_names() {
        let ingresses = vec![
            make_ingress(
                "web",
                json!({"kubernetes.io/ingress.global-static-ip-name": "demo-ip"}),
                None,
            ),
            make_ingress("other", json!({}), None),
        ];
        assert_eq!(static_ip_names(&ingresses), vec!["demo-ip"]);
    }
}
