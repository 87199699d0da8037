pub mod config;
pub mod controller;
pub mod error;
pub mod metrics;
pub mod query_client;
pub mod reconcile;
pub mod telemetry;
