// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes side of a reconciliation pass: manifest apply, orphan reclaim,
//! namespace and ingress management.

pub mod applier;
pub mod images;
pub mod ingresses;
pub mod manifest;
pub mod namespaces;
pub mod reclaimer;

pub use applier::{KindApplier, TouchedResourceSet, Upserted};
pub use manifest::{Manifest, ResourceKind};
pub use namespaces::{ensure_namespace_exists, validate_namespace};
pub use reclaimer::OrphanReclaimer;
