//! Telemetry setup shared by the services and their tests.

pub mod tracing;
