//! Shared test fixtures: in-memory database, in-memory transient
//! store and a recording notifier.

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use oncallsrv::assign::AssignmentResolver;
use oncallsrv::dispatcher::{Dispatcher, DispatcherConfig};
use oncallsrv::domain::Alert;
use oncallsrv::engine::LifecycleEngine;
use oncallsrv::lease::LeaseRegistry;
use oncallsrv::notify::Notifier;
use oncallsrv::prober::{build_http_client, IncidentCorrelator};
use oncallsrv::queue::AlertQueue;
use oncallsrv::store::{schema, AlertStore, OnCallStore, UptimeStore, User};
use oncallsrv::transient::MemoryTransientStore;
use oncallsrv::{AppState, Config};

/// Notifier that records every call instead of delivering anything.
#[derive(Default)]
pub struct RecordingNotifier {
    pub pushes: Mutex<Vec<String>>,
    pub escalations: Mutex<Vec<String>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn push(&self, alert: &Alert, _assignee: Option<&User>) -> Result<()> {
        self.pushes.lock().push(alert.id.clone());
        Ok(())
    }

    async fn escalate(&self, alert: &Alert) -> Result<()> {
        self.escalations.lock().push(alert.id.clone());
        Ok(())
    }
}

pub struct TestHarness {
    pub state: AppState,
    pub engine: LifecycleEngine,
    pub alerts: AlertStore,
    pub oncall: OnCallStore,
    pub uptime: UptimeStore,
    pub queue: AlertQueue,
    pub leases: LeaseRegistry,
    pub correlator: IncidentCorrelator,
    pub transient: Arc<MemoryTransientStore>,
    pub notifier: Arc<RecordingNotifier>,
}

/// Webhook key accepted by the test configuration.
pub const TEST_API_KEY: &str = "testkey-0123456789";

pub async fn harness() -> TestHarness {
    let db = oncall_common::SqliteClient::in_memory().await.unwrap();
    schema::run_migrations(db.pool()).await.unwrap();

    let transient = Arc::new(MemoryTransientStore::new());

    let alerts = AlertStore::new(db.pool().clone());
    let oncall = OnCallStore::new(db.pool().clone());
    let uptime = UptimeStore::new(db.pool().clone());
    let queue = AlertQueue::new(transient.clone());
    let leases = LeaseRegistry::new(transient.clone());
    let resolver = AssignmentResolver::new(oncall.clone());

    let engine = LifecycleEngine::new(
        alerts.clone(),
        queue.clone(),
        leases.clone(),
        resolver,
        Duration::from_secs(300),
    );

    let correlator = IncidentCorrelator::new(uptime.clone(), engine.clone());
    let notifier = Arc::new(RecordingNotifier::default());
    let http = build_http_client().unwrap();

    let mut config = Config::default();
    config.auth.webhook_keys = vec![TEST_API_KEY.to_string()];

    let state = AppState {
        config: Arc::new(config),
        db,
        engine: engine.clone(),
        alerts: alerts.clone(),
        oncall: oncall.clone(),
        uptime: uptime.clone(),
        queue: queue.clone(),
        correlator: correlator.clone(),
        http,
    };

    TestHarness {
        state,
        engine,
        alerts,
        oncall,
        uptime,
        queue,
        leases,
        correlator,
        transient,
        notifier,
    }
}

impl TestHarness {
    /// Dispatcher with short timers so tests finish quickly.
    pub fn dispatcher(&self, worker_tag: &str, escalation_ttl: Duration) -> Dispatcher {
        Dispatcher::new(
            self.queue.clone(),
            self.leases.clone(),
            self.alerts.clone(),
            self.engine.clone(),
            self.oncall.clone(),
            self.notifier.clone(),
            DispatcherConfig {
                worker_tag: worker_tag.to_string(),
                lease_ttl: Duration::from_secs(5),
                escalation_ttl,
                poll_interval: Duration::from_millis(40),
                notify_timeout: Duration::from_secs(1),
            },
        )
    }

    pub fn router(&self) -> axum::Router {
        oncallsrv::api::routes::create_router(self.state.clone())
    }
}
