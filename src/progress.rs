// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! User-facing progress output.

use std::io::Write;
use std::sync::Mutex;
use tracing::{info, warn};

/// Sink for the progress lines an Apply or Delete emits as it advances
pub trait Progress: Send + Sync {
    fn line(&self, message: &str);
}

/// Writes each line to an `io::Write` and flushes immediately
pub struct WriterProgress {
    out: Mutex<Box<dyn Write + Send>>,
}

impl WriterProgress {
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            out: Mutex::new(Box::new(out)),
        }
    }

    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl Progress for WriterProgress {
    fn line(&self, message: &str) {
        info!(target: "branchenv::progress", "{}", message);

        let Ok(mut out) = self.out.lock() else {
            return;
        };
        if let Err(e) = writeln!(out, "{}", message).and_then(|_| out.flush()) {
            warn!("Failed to write progress line: {}", e);
        }
    }
}
