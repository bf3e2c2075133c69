//! Incident correlation and the incident→alert bridge
//!
//! Keeps at most one ongoing incident per (service, type). Every newly
//! opened incident produces a correlated alert through the lifecycle
//! engine and records the alert id on the incident row.

use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};

use crate::domain::{
    CheckStatus, IncidentType, Service, ServiceCheck, ServiceIncident, Severity,
};
use crate::engine::{LifecycleEngine, NewAlert};
use crate::store::UptimeStore;

/// Checks slower than this open a slow_response incident
pub const SLOW_RESPONSE_THRESHOLD_MS: i64 = 5000;

/// Certificates expiring sooner than this open an ssl_expiry incident
pub const SSL_EXPIRY_WARN_DAYS: i64 = 30;

#[derive(Clone)]
pub struct IncidentCorrelator {
    store: UptimeStore,
    engine: LifecycleEngine,
}

impl IncidentCorrelator {
    pub fn new(store: UptimeStore, engine: LifecycleEngine) -> Self {
        Self { store, engine }
    }

    /// Evaluate one check against the incident rules.
    pub async fn evaluate(&self, service: &Service, check: &ServiceCheck) -> Result<()> {
        if check.status == CheckStatus::Up {
            self.resolve(service, IncidentType::Downtime).await?;
        } else {
            let reason = check
                .error_message
                .clone()
                .unwrap_or_else(|| check.status.as_str().to_string());
            self.ensure_open(
                service,
                IncidentType::Downtime,
                format!("Service is down: {}", reason),
                Severity::High,
            )
            .await?;
        }

        if check.response_time_ms > SLOW_RESPONSE_THRESHOLD_MS {
            self.ensure_open(
                service,
                IncidentType::SlowResponse,
                format!(
                    "Response time {}ms exceeds {}ms",
                    check.response_time_ms, SLOW_RESPONSE_THRESHOLD_MS
                ),
                Severity::Warning,
            )
            .await?;
        } else {
            self.resolve(service, IncidentType::SlowResponse).await?;
        }

        // Checks without SSL metadata leave ssl_expiry incidents alone.
        if let Some(days_left) = check.ssl_days_left {
            if days_left > 0 && days_left < SSL_EXPIRY_WARN_DAYS {
                self.ensure_open(
                    service,
                    IncidentType::SslExpiry,
                    format!("TLS certificate expires in {} days", days_left),
                    Severity::Warning,
                )
                .await?;
            } else if days_left >= SSL_EXPIRY_WARN_DAYS {
                self.resolve(service, IncidentType::SslExpiry).await?;
            }
        }

        Ok(())
    }

    /// Open an incident unless one is already ongoing; an existing one
    /// is left untouched.
    async fn ensure_open(
        &self,
        service: &Service,
        incident_type: IncidentType,
        description: String,
        severity: Severity,
    ) -> Result<()> {
        if self
            .store
            .ongoing_incident(&service.id, incident_type)
            .await?
            .is_some()
        {
            return Ok(());
        }

        let incident = ServiceIncident::open(service.id.clone(), incident_type, description.clone());
        self.store.open_incident(&incident).await?;
        info!(
            "Incident opened: {} {} on service {} ({})",
            incident.id,
            incident_type.as_str(),
            service.name,
            description
        );

        // Bridge into the alert lifecycle; a failed create leaves the
        // incident standing without a correlated alert.
        let title = match incident_type {
            IncidentType::Downtime => format!("[UPTIME] Service Down: {}", service.name),
            IncidentType::SlowResponse => format!("[UPTIME] Slow Response: {}", service.name),
            IncidentType::SslExpiry => {
                format!("[UPTIME] Certificate Expiring: {}", service.name)
            }
        };
        match self
            .engine
            .create(NewAlert {
                title,
                description,
                severity,
                source: "uptime_monitor".to_string(),
            })
            .await
        {
            Ok(alert) => {
                self.store.set_incident_alert(&incident.id, &alert.id).await?;
            }
            Err(e) => {
                warn!(
                    "Correlated alert for incident {} not created: {}",
                    incident.id, e
                );
            }
        }

        Ok(())
    }

    async fn resolve(&self, service: &Service, incident_type: IncidentType) -> Result<()> {
        let resolved = self
            .store
            .resolve_incidents(&service.id, incident_type, Utc::now())
            .await?;
        if resolved > 0 {
            info!(
                "Incident resolved: {} on service {}",
                incident_type.as_str(),
                service.name
            );
        }
        Ok(())
    }
}
