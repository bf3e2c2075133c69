//! Service configuration
//!
//! Loaded through the layered loader: defaults, then
//! `config/oncallsrv.yaml`, then `ONCALL__*` environment overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::dispatcher::DispatcherConfig;
use crate::prober::ProberConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceSection,
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub redis: RedisSection,
    #[serde(default)]
    pub dispatcher: DispatcherSection,
    #[serde(default)]
    pub prober: ProberSection,
    #[serde(default)]
    pub auth: AuthSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSection {
    #[serde(default = "default_service_name")]
    pub name: String,
    #[serde(default = "default_bind")]
    pub bind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSection {
    #[serde(default = "default_db_path")]
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisSection {
    #[serde(default = "default_redis_url")]
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherSection {
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_lease_ttl")]
    pub lease_ttl_seconds: u64,
    #[serde(default = "default_escalation_ttl")]
    pub escalation_ttl_seconds: u64,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    #[serde(default = "default_notify_timeout")]
    pub notify_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProberSection {
    #[serde(default = "default_probe_tick")]
    pub tick_seconds: u64,
    #[serde(default = "default_probe_concurrency")]
    pub concurrency: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthSection {
    /// Accepted webhook API keys. Empty means every webhook request is
    /// rejected.
    #[serde(default)]
    pub webhook_keys: Vec<String>,
}

fn default_service_name() -> String {
    "oncallsrv".to_string()
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_db_path() -> String {
    "data/oncall.db".to_string()
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_workers() -> usize {
    1
}

fn default_lease_ttl() -> u64 {
    300
}

fn default_escalation_ttl() -> u64 {
    300
}

fn default_poll_interval() -> u64 {
    10
}

fn default_notify_timeout() -> u64 {
    10
}

fn default_probe_tick() -> u64 {
    30
}

fn default_probe_concurrency() -> usize {
    32
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            bind: default_bind(),
        }
    }
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl Default for RedisSection {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
        }
    }
}

impl Default for DispatcherSection {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            lease_ttl_seconds: default_lease_ttl(),
            escalation_ttl_seconds: default_escalation_ttl(),
            poll_interval_seconds: default_poll_interval(),
            notify_timeout_seconds: default_notify_timeout(),
        }
    }
}

impl Default for ProberSection {
    fn default() -> Self {
        Self {
            tick_seconds: default_probe_tick(),
            concurrency: default_probe_concurrency(),
        }
    }
}

impl Config {
    /// Load from defaults, the optional YAML file and the environment.
    pub fn load() -> oncall_common::config::Result<Self> {
        oncall_common::config::load_layered("ONCALL", Some(Path::new("config/oncallsrv.yaml")))
    }

    /// Dispatcher settings for the numbered worker.
    pub fn dispatcher_config(&self, worker_index: usize) -> DispatcherConfig {
        DispatcherConfig {
            worker_tag: format!("worker-{}", worker_index + 1),
            lease_ttl: Duration::from_secs(self.dispatcher.lease_ttl_seconds),
            escalation_ttl: Duration::from_secs(self.dispatcher.escalation_ttl_seconds),
            poll_interval: Duration::from_secs(self.dispatcher.poll_interval_seconds),
            notify_timeout: Duration::from_secs(self.dispatcher.notify_timeout_seconds),
        }
    }

    pub fn prober_config(&self) -> ProberConfig {
        ProberConfig {
            tick: Duration::from_secs(self.prober.tick_seconds),
            concurrency: self.prober.concurrency,
        }
    }

    pub fn escalation_ttl(&self) -> Duration {
        Duration::from_secs(self.dispatcher.escalation_ttl_seconds)
    }
}
