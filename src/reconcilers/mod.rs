// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Transient watch sessions scoped to a single Apply or Delete.

pub mod load_balancer;

pub use load_balancer::{LoadBalancerWatcher, WatcherSession};
