//! Uptime prober: periodic checks, stats roll-up and incident feed
//!
//! One ticker drives the whole fleet; each tick loads the active,
//! enabled services and probes them concurrently under a semaphore
//! cap.

pub mod incidents;
pub mod probe;

use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

pub use incidents::IncidentCorrelator;

use crate::domain::{Service, ServiceCheck};
use crate::store::UptimeStore;

#[derive(Debug, Clone)]
pub struct ProberConfig {
    /// Sweep period
    pub tick: Duration,
    /// Concurrent probe cap
    pub concurrency: usize,
}

impl Default for ProberConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(30),
            concurrency: 32,
        }
    }
}

/// Probe one service and record everything that follows from the
/// result: the check row, refreshed stats and incident state. Shared
/// by the sweep loop and the manual check endpoint.
pub async fn probe_and_record(
    store: &UptimeStore,
    correlator: &IncidentCorrelator,
    http: &reqwest::Client,
    service: &Service,
) -> Result<ServiceCheck> {
    let check = probe::run_probe(http, service).await;
    debug!(
        "Probe {} ({}): {} in {}ms",
        service.name,
        service.url,
        check.status.as_str(),
        check.response_time_ms
    );

    store.insert_check(&check).await?;
    store.recompute_stats(&service.id, Utc::now()).await?;
    correlator.evaluate(service, &check).await?;

    Ok(check)
}

/// Build the HTTP client probes share. TLS details are captured so
/// https probes can report certificate expiry.
pub fn build_http_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .tls_info(true)
        .user_agent(concat!("oncallsrv/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

pub struct Prober {
    store: UptimeStore,
    correlator: IncidentCorrelator,
    http: reqwest::Client,
    limiter: Arc<Semaphore>,
    config: ProberConfig,
}

impl Prober {
    pub fn new(
        store: UptimeStore,
        correlator: IncidentCorrelator,
        http: reqwest::Client,
        config: ProberConfig,
    ) -> Self {
        let limiter = Arc::new(Semaphore::new(config.concurrency.max(1)));
        Self {
            store,
            correlator,
            http,
            limiter,
            config,
        }
    }

    /// Tick loop; runs until the task is dropped.
    pub async fn run(self) {
        info!(
            "Prober started: tick {}s, {} concurrent probes",
            self.config.tick.as_secs(),
            self.config.concurrency
        );
        let mut interval = tokio::time::interval(self.config.tick);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            if let Err(e) = self.sweep().await {
                error!("Prober sweep failed: {}", e);
            }
        }
    }

    /// Probe every active, enabled service once.
    pub async fn sweep(&self) -> Result<()> {
        let services = self.store.active_services().await?;
        if services.is_empty() {
            return Ok(());
        }
        debug!("Probing {} services", services.len());

        let mut tasks = JoinSet::new();
        for service in services {
            let permit = self.limiter.clone().acquire_owned().await?;
            let store = self.store.clone();
            let correlator = self.correlator.clone();
            let http = self.http.clone();

            tasks.spawn(async move {
                let _permit = permit;
                if let Err(e) = probe_and_record(&store, &correlator, &http, &service).await {
                    error!("Probe of service {} failed: {}", service.id, e);
                }
            });
        }

        while tasks.join_next().await.is_some() {}
        Ok(())
    }
}
