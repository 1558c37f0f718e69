// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::cloud::ForwardingRule;
use std::fmt;

/// Ports a named address may be bound on
pub const SUPPORTED_PORTS: [&str; 2] = ["80", "443"];

/// A reserved address to bind, parsed from `<ipName>:<port>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedAddress {
    pub ip_name: String,
    pub port: String,
}

/// Why an annotation token was skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressTokenError {
    Empty,
    Invalid(String),
}

impl fmt::Display for AddressTokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressTokenError::Empty => write!(f, "Empty Address"),
            AddressTokenError::Invalid(token) => write!(f, "Invalid Address \"{}\"", token),
        }
    }
}

impl NamedAddress {
    pub fn parse(token: &str) -> Result<Self, AddressTokenError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AddressTokenError::Empty);
        }

        match token.split_once(':') {
            Some((ip_name, port)) if !ip_name.is_empty() && SUPPORTED_PORTS.contains(&port) => {
                Ok(Self {
                    ip_name: ip_name.to_string(),
                    port: port.to_string(),
                })
            }
            _ => Err(AddressTokenError::Invalid(token.to_string())),
        }
    }

    /// Name of the forwarding rule created for this address
    pub fn rule_name(&self) -> String {
        format!("{}-fr-{}", self.ip_name, self.port)
    }
}

/// The parts of an existing rule reused for a new binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardingRuleTemplate {
    pub target: String,
    pub ip_protocol: String,
    pub load_balancing_scheme: String,
}

impl From<&ForwardingRule> for ForwardingRuleTemplate {
    fn from(rule: &ForwardingRule) -> Self {
        Self {
            target: rule.target.clone(),
            ip_protocol: rule.ip_protocol.clone(),
            load_balancing_scheme: rule.load_balancing_scheme.clone(),
        }
    }
}

impl ForwardingRuleTemplate {
    /// A new rule bound to `ip_address` on `address.port`
    pub fn instantiate(&self, address: &NamedAddress, ip_address: &str) -> ForwardingRule {
        ForwardingRule {
            name: address.rule_name(),
            ip_address: ip_address.to_string(),
            ip_protocol: self.ip_protocol.clone(),
            port_range: address.port.clone(),
            target: self.target.clone(),
            load_balancing_scheme: self.load_balancing_scheme.clone(),
        }
    }
}
