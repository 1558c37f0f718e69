// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Load balancer watcher - observes Ingresses in one namespace and delivers
//! the first externally-assigned IP.

use crate::constants::{polling, watch_queue};
use crate::error::{BranchEnvError, Result};
use crate::kubernetes::ingresses::{external_ip, ingress_class};
use crate::progress::Progress;
use futures::{FutureExt, StreamExt};
use k8s_openapi::api::networking::v1::Ingress;
use kube::{
    runtime::{controller, controller::Action, Controller},
    Api, Client, ResourceExt,
};
use kube_runtime::watcher::Config as WatcherConfig;
use std::collections::HashMap;
use std::future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep_until, Instant};
use tracing::{debug, info, warn};

/// Shared state of one watch session's reconciler
pub struct WatchContext {
    ingress_class: String,
    ip_tx: mpsc::Sender<String>,
    delivered: AtomicBool,
    failures: Mutex<HashMap<String, u32>>,
}

impl WatchContext {
    fn new(ingress_class: String, ip_tx: mpsc::Sender<String>) -> Self {
        Self {
            ingress_class,
            ip_tx,
            delivered: AtomicBool::new(false),
            failures: Mutex::new(HashMap::new()),
        }
    }
}

/// A running watch; stopped explicitly or when dropped
pub struct WatcherSession {
    namespace: String,
    ip_rx: mpsc::Receiver<String>,
    stop_tx: Option<oneshot::Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

pub struct LoadBalancerWatcher;

impl LoadBalancerWatcher {
    /// Start watching Ingresses in `namespace` on a background task
    pub fn start(client: Client, namespace: &str, ingress_class: &str) -> WatcherSession {
        let ingresses: Api<Ingress> = Api::namespaced(client, namespace);
        let (ip_tx, ip_rx) = mpsc::channel(1);
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let context = Arc::new(WatchContext::new(ingress_class.to_string(), ip_tx));

        let controller = Controller::new(ingresses, WatcherConfig::default())
            .with_config(controller::Config::default().concurrency(1))
            .graceful_shutdown_on(stop_rx.map(|_| ()));

        let ns = namespace.to_string();
        let worker = tokio::spawn(async move {
            controller
                .run(reconcile, error_policy, context)
                .for_each(|res| async move {
                    match res {
                        Ok(o) => debug!("Reconciled ingress: {:?}", o),
                        Err(e) => warn!("Ingress watch error: {:?}", e),
                    }
                })
                .await;
            debug!("Load balancer watcher for {} stopped", ns);
        });

        info!("Watching ingresses in {} for a load balancer IP", namespace);

        WatcherSession {
            namespace: namespace.to_string(),
            ip_rx,
            stop_tx: Some(stop_tx),
            worker: Some(worker),
        }
    }
}

impl WatcherSession {
    /// Block until the load balancer IP is delivered.
    ///
    /// Without a timeout this waits indefinitely; a pending wait is reported
    /// every few seconds.
    pub async fn wait_for_ip(
        &mut self,
        timeout: Option<Duration>,
        progress: &dyn Progress,
    ) -> Result<String> {
        let tick = Duration::from_secs(polling::LB_WAIT_TICK_SECS);
        let mut ticker = interval_at(Instant::now() + tick, tick);

        let expiry = async move {
            match timeout {
                Some(t) => sleep_until(Instant::now() + t).await,
                None => future::pending::<()>().await,
            }
        };
        tokio::pin!(expiry);

        loop {
            tokio::select! {
                ip = self.ip_rx.recv() => {
                    let ip = ip.ok_or_else(|| BranchEnvError::ExhaustedRetries(format!(
                        "load balancer watcher for {} stopped before an IP was assigned",
                        self.namespace
                    )))?;
                    progress.line(&format!("Loadbalancer IP : {}", ip));
                    return Ok(ip);
                }
                _ = ticker.tick() => progress.line("Waiting for Loadbalancer IP ..."),
                _ = &mut expiry => {
                    return Err(BranchEnvError::ExhaustedRetries(format!(
                        "no load balancer IP assigned in {} within {:?}",
                        self.namespace,
                        timeout.unwrap_or_default()
                    )));
                }
            }
        }
    }

    /// Stop the controller and wait for its task to finish
    pub async fn stop(mut self) {
        self.signal_stop();
        if let Some(worker) = self.worker.take() {
            if let Err(e) = worker.await {
                warn!("Load balancer watcher task failed: {}", e);
            }
        }
    }

    fn signal_stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        self.ip_rx.close();
    }
}

impl Drop for WatcherSession {
    fn drop(&mut self) {
        self.signal_stop();
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}

async fn reconcile(ingress: Arc<Ingress>, ctx: Arc<WatchContext>) -> Result<Action> {
    if ctx.delivered.load(Ordering::SeqCst) {
        return Ok(Action::await_change());
    }

    if ingress_class(&ingress) != Some(ctx.ingress_class.as_str()) {
        debug!("Ingress {} is not served by {}", ingress.name_any(), ctx.ingress_class);
        return Ok(Action::await_change());
    }

    let Some(ip) = external_ip(&ingress) else {
        debug!("Ingress {} has no external IP yet", ingress.name_any());
        return Ok(Action::await_change());
    };

    if !ctx.delivered.swap(true, Ordering::SeqCst) {
        debug!("Ingress {} was assigned {}", ingress.name_any(), ip);
        if ctx.ip_tx.try_send(ip.to_string()).is_err() {
            debug!("Load balancer IP receiver already gone");
        }
    }

    Ok(Action::await_change())
}

/// Rate-limited requeue, dropping the key after `MAX_RETRIES` failures
fn error_policy(ingress: Arc<Ingress>, error: &BranchEnvError, ctx: Arc<WatchContext>) -> Action {
    let key = ingress.name_any();
    let mut failures = ctx.failures.lock().unwrap_or_else(|e| e.into_inner());
    let attempts = failures.entry(key.clone()).or_insert(0);

    if *attempts >= watch_queue::MAX_RETRIES {
        warn!("Dropping ingress {} out of the queue: {}", key, error);
        failures.remove(&key);
        return Action::await_change();
    }

    let delay = Duration::from_millis(watch_queue::BASE_DELAY_MILLIS << *attempts);
    *attempts += 1;
    warn!("Error syncing ingress {}: {}, retrying in {:?}", key, error, delay);
    Action::requeue(delay)
}
