// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Kubernetes annotation keys read or written by branchenv
pub mod annotations {
    /// Prefix under which every branchenv annotation lives
    pub const PREFIX: &str = "branchenv.io/";
    /// Comma separated `<ipName>:<port>` list of reserved addresses to bind
    pub const NAMED_IP_ADDRESS: &str = "branchenv.io/named-ip-address";
    /// Comma separated list of shared certificates to attach
    pub const PRE_SHARED_CERT: &str = "branchenv.io/pre-shared-cert";
    /// Set on a Service whose node ports are owned by an ingress controller
    pub const SERVICE_INGRESS: &str = "branchenv.io/ingress";
    /// Set on a namespace once an ingress has been provisioned in it
    pub const INGRESS_PROVISIONED: &str = "branchenv.io/ingress-provisioned";
    /// Image rewrite strategy for Deployments and CronJobs
    pub const IMAGE_UPDATE_STRATEGY: &str = "imageUpdateStrategy";

    pub const INGRESS_CLASS: &str = "kubernetes.io/ingress.class";
    pub const STATIC_IP_NAME: &str = "kubernetes.io/ingress.global-static-ip-name";
}

/// Value of the image update annotation that enables tag rewriting
pub const LATEST_BRANCHING: &str = "latest-branching";

/// Namespace names with their own deployment tier
pub const PRODUCTION: &str = "production";
pub const STAGING: &str = "staging";

/// Secrets managed by the platform, never reclaimed
pub const DEFAULT_TOKEN_PREFIX: &str = "default-token-";

/// CA bundle ConfigMap the control plane publishes in every namespace
pub const ROOT_CA_CONFIGMAP: &str = "kube-root-ca.crt";

/// Cloud address status for an address bound to a forwarding rule
pub const ADDRESS_IN_USE: &str = "IN_USE";

/// Polling configuration
pub mod polling {
    /// Interval between polls of eventually-consistent cloud APIs
    pub const INTERVAL_SECS: u64 = 5;
    /// Attempts when waiting for a static IP to be released
    pub const IP_RELEASE_ATTEMPTS: u32 = 60;
    /// Default attempts when looking for a template forwarding rule
    pub const RULE_DISCOVERY_ATTEMPTS: u32 = 60;
    /// How often a pending load balancer wait is reported
    pub const LB_WAIT_TICK_SECS: u64 = 10;
}

/// Load balancer watch queue settings
pub mod watch_queue {
    /// Attempts per key before a failing item is dropped
    pub const MAX_RETRIES: u32 = 5;
    /// Base delay for the exponential requeue
    pub const BASE_DELAY_MILLIS: u64 = 5;
}

/// TTL applied to every generated DNS record
pub const DNS_TTL: i64 = 300;
