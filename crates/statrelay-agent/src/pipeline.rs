//! The agent's two loops: collection and reporting.
//!
//! Both tasks share one [`SampleStore`] behind a mutex. The collection loop
//! overwrites the gauges and bumps the poll counter; the reporting loop
//! snapshots the store and ships the whole thing. The store is never
//! cleared after a send: counters are cumulative in-process totals, and a
//! failed send is simply retried by the next tick.

use crate::transport::ReportClient;
use rand::Rng;
use statrelay_common::store::SampleStore;
use statrelay_common::types::MetricSample;
use statrelay_sampler::Sampler;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::time::{interval, Duration};
use tokio_util::sync::CancellationToken;

/// Cumulative poll counter; never reset, reported in full every cycle.
pub const POLL_COUNT: &str = "agent.poll_count";
/// Fresh random gauge written on every poll.
pub const RANDOM_JITTER: &str = "agent.random_jitter";

pub struct Pipeline {
    store: Arc<Mutex<SampleStore>>,
    samplers: Vec<Box<dyn Sampler>>,
    client: ReportClient,
    poll_interval: Duration,
    report_interval: Duration,
}

impl Pipeline {
    pub fn new(
        samplers: Vec<Box<dyn Sampler>>,
        client: ReportClient,
        poll_interval: Duration,
        report_interval: Duration,
    ) -> Self {
        Self {
            store: Arc::new(Mutex::new(SampleStore::new())),
            samplers,
            client,
            poll_interval,
            report_interval,
        }
    }

    /// Handle to the shared store, for tests and diagnostics.
    pub fn store(&self) -> Arc<Mutex<SampleStore>> {
        self.store.clone()
    }

    /// Runs both loops until the token is cancelled. The current iteration
    /// of each loop finishes before its task exits; in-flight requests are
    /// not aborted.
    pub async fn run(self, token: CancellationToken) {
        let Pipeline {
            store,
            mut samplers,
            client,
            poll_interval,
            report_interval,
        } = self;

        let poll_store = store.clone();
        let poll_token = token.clone();
        let poll_handle = tokio::spawn(async move {
            let mut tick = interval(poll_interval);
            loop {
                tokio::select! {
                    _ = tick.tick() => poll_once(&poll_store, &mut samplers),
                    _ = poll_token.cancelled() => {
                        tracing::info!("Collection loop stopped");
                        return;
                    }
                }
            }
        });

        let report_handle = tokio::spawn(async move {
            let mut tick = interval(report_interval);
            loop {
                tokio::select! {
                    _ = tick.tick() => report_once(&store, &client).await,
                    _ = token.cancelled() => {
                        tracing::info!("Reporting loop stopped");
                        return;
                    }
                }
            }
        });

        let _ = tokio::join!(poll_handle, report_handle);
    }
}

/// One collection cycle: sample everything, then write under the lock.
/// Sampling stays outside the critical section and never touches the
/// network or disk.
fn poll_once(store: &Arc<Mutex<SampleStore>>, samplers: &mut [Box<dyn Sampler>]) {
    let mut readings: Vec<(String, f64)> = Vec::new();
    for sampler in samplers.iter_mut() {
        match sampler.sample() {
            Ok(points) => readings.extend(points),
            Err(e) => {
                tracing::warn!(sampler = sampler.name(), error = %e, "Sampling failed");
            }
        }
    }
    readings.push((RANDOM_JITTER.to_string(), rand::thread_rng().gen::<f64>()));

    let mut guard = store.lock().unwrap_or_else(PoisonError::into_inner);
    for (name, value) in readings {
        guard.apply_gauge(name, value);
    }
    guard.apply_counter(POLL_COUNT, 1);
    tracing::debug!(
        gauges = guard.gauges.len(),
        polls = guard.counters.get(POLL_COUNT).copied().unwrap_or(0),
        "Metrics updated"
    );
}

/// One reporting cycle: snapshot under the lock, send outside it.
async fn report_once(store: &Arc<Mutex<SampleStore>>, client: &ReportClient) {
    let samples: Vec<MetricSample> = {
        let guard = store.lock().unwrap_or_else(PoisonError::into_inner);
        guard.samples()
    };
    if samples.is_empty() {
        tracing::debug!("Empty sample store, nothing to send");
        return;
    }

    match client.send_batch(&samples).await {
        Ok(()) => tracing::info!(count = samples.len(), "Report sent"),
        Err(e) => tracing::warn!(error = %e, "Failed to send report"),
    }
}
