pub mod config;
pub mod entitlements;
pub mod error;
pub mod telemetry;
