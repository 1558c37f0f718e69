// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Per-invocation deployment context.

/// Identity of the environment one Apply or Delete call operates on.
///
/// Every component receives this explicitly, so two calls never share
/// project or namespace state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployContext {
    pub namespace: String,
    /// Source branch, used to pick per-branch image tags
    pub branch: String,
    pub project_id: String,
}

impl DeployContext {
    pub fn new(namespace: impl Into<String>, project_id: impl Into<String>) -> Self {
        let namespace = namespace.into();
        Self {
            branch: namespace.clone(),
            namespace,
            project_id: project_id.into(),
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }
}
