//! On-call alerting and uptime-monitoring service
//!
//! Alerts arrive over HTTP, from webhook integrations, from an
//! external alert-manager or from the internal uptime prober. Each one
//! is persisted, assigned to the current on-call engineer, handed to a
//! dispatcher worker through a Redis queue, and escalated when nobody
//! acknowledges it in time.
//!
//! ## Architecture
//!
//! ```text
//! HTTP / webhooks ──► LifecycleEngine ──► SQLite (alerts)
//!                        │    ▲                 ▲
//!                        ▼    │ ack/escalate    │
//!                  alerts:queue ──► Dispatcher ─┘
//!                        ▲          (lease + escalation TTL keys)
//!                        │
//!          Prober ──► incidents ──► correlated alerts
//! ```

pub mod alertmanager;
pub mod api;
pub mod assign;
pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod engine;
pub mod error;
pub mod lease;
pub mod notify;
pub mod prober;
pub mod queue;
pub mod store;
pub mod transient;

use std::sync::Arc;

pub use config::Config;
pub use error::{OncallError, Result};

use crate::engine::LifecycleEngine;
use crate::prober::IncidentCorrelator;
use crate::queue::AlertQueue;
use crate::store::{AlertStore, OnCallStore, UptimeStore};

/// Service version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Service name
pub const SERVICE_NAME: &str = "oncallsrv";

/// Shared handles every API handler needs
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: oncall_common::SqliteClient,
    pub engine: LifecycleEngine,
    pub alerts: AlertStore,
    pub oncall: OnCallStore,
    pub uptime: UptimeStore,
    pub queue: AlertQueue,
    pub correlator: IncidentCorrelator,
    pub http: reqwest::Client,
}
