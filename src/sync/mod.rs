// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Environment lifecycle: the Apply and Delete entry points.

pub mod environment;

pub use environment::{ApplyOutcome, Engine};
