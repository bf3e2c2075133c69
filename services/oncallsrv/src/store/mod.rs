//! SQLite persistence: alerts, users/on-call schedules and uptime data

pub mod alerts;
pub mod oncall;
pub mod schema;
pub mod uptime;

pub use alerts::AlertStore;
pub use oncall::{NewSchedule, NewUser, OnCallSchedule, OnCallStore, User};
pub use uptime::UptimeStore;
