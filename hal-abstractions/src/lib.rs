//! Hardware abstraction traits for the oneM2M sensor uploader
//!
//! This crate defines the collaborator seams between the platform-agnostic
//! upload logic in `m2m-core` and a board support crate. Boards implement
//! these traits; tests implement them with simulated clocks and scripted
//! peers.

#![no_std]
#![deny(unsafe_code)]
#![deny(warnings)]

pub mod clock;
pub mod network;
pub mod sensor;

pub use clock::{Monotonic, TimeSource, WallClock};
pub use network::{Connector, LinkError, NetworkLink, TransportError};
pub use sensor::{AnalogInput, Sensor};
