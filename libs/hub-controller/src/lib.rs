pub mod aggregate;
pub mod config;
pub mod controller;
pub mod error;
pub mod metrics;
pub mod provision;
pub mod reconcile;
pub mod telemetry;
