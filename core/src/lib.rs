//! Platform-agnostic oneM2M telemetry upload logic
//!
//! Samples a light, temperature and water-level sensor on a fixed period and
//! creates one content instance per valid reading on a oneM2M CSE over HTTPS.
//! Everything hardware specific sits behind the traits in `hal-abstractions`,
//! so this crate builds and tests on the host.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]
#![deny(warnings)]

#[macro_use]
mod fmt;

pub mod calendar;
pub mod config;
pub mod endpoint;
pub mod envelope;
pub mod error;
pub mod http;
pub mod link;
pub mod secure;
pub mod sensor;
pub mod telemetry;
pub mod time;
pub mod trust;
pub mod uploader;

#[cfg(test)]
mod testing;

pub use config::{Config, ContainerNames, LinkConfig, ServerConfig, TimeConfig, UploadConfig};
pub use envelope::{RequestEnvelope, RequestEnvelopeBuilder};
pub use error::{ConfigError, HttpError, LinkError, TimeSyncError, TransportError, TrustAnchorError};
pub use secure::SecureChannel;
pub use sensor::{Reading, SensorBank, SensorChannel, Sensors, WaterLevel};
pub use telemetry::{PublishOutcome, TelemetryClient};
pub use time::TimeBase;
pub use uploader::{establish, CycleReport, CycleState, UploadController, UploadOutcome};
