//! Domain model: alerts and the uptime-monitoring entities

pub mod alert;
pub mod uptime;

pub use alert::{Alert, AlertStatus, Severity};
pub use uptime::{
    CheckStatus, IncidentStatus, IncidentType, NewService, Service, ServiceCheck, ServiceIncident,
    ServiceKind, StatsPeriod, UptimeStats,
};
