// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
pub mod cloud;
pub mod config;
pub mod constants;
pub mod context;
pub mod error;
pub mod kubernetes;
pub mod network;
pub mod progress;
pub mod reconcilers;
pub mod retry;
pub mod sync;
pub mod types;

#[cfg(test)]
pub(crate) mod test_utils;
