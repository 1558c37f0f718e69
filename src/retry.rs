// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Fixed-interval polling for eventually-consistent cloud state.

use crate::error::{BranchEnvError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// How many times to probe and how long to wait between probes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    pub fn every(interval_secs: u64, max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::from_secs(interval_secs))
    }
}

/// Run `probe` until it yields a value or the attempts run out.
///
/// `Ok(None)` means "not yet" and schedules another attempt after the policy
/// interval. Errors from the probe are returned immediately. Exhaustion
/// yields `ExhaustedRetries` with the message `<what> after <n> attempts`.
pub async fn retry<F, Fut, T>(policy: &RetryPolicy, what: &str, mut probe: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    for attempt in 1..=policy.max_attempts {
        if let Some(value) = probe().await? {
            return Ok(value);
        }

        debug!(
            "{}: attempt {}/{} not satisfied",
            what, attempt, policy.max_attempts
        );

        if attempt < policy.max_attempts {
            sleep(policy.interval).await;
        }
    }

    Err(BranchEnvError::ExhaustedRetries(format!(
        "{} after {} attempts",
        what, policy.max_attempts
    )))
}
