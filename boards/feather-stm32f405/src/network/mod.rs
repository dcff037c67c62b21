#![deny(warnings)]
//! Board networking
//!
//! - **`config`**: Configuration structs with `Default` implementations
//! - **`error`**: Error enum for socket and SNTP operations
//! - **`link`**: `NetworkLink` over the W5500 DHCP lease
//! - **`sntp`**: SNTP client feeding the internal RTC
//! - **`socket`**: Async TCP socket wrapper for embedded-io-async
//! - **`tls`**: TLS 1.3 `Connector` for the HTTPS uploads
//!
//! The `embassy-net` stack is `!Send` and stays inside the network task;
//! everything here borrows it from there.

pub mod config;
pub mod error;
pub mod link;
pub mod sntp;
pub mod socket;
pub mod tls;

pub use config::{NetworkConfig, SntpConfig};
pub use link::EthernetLink;
pub use sntp::{SntpClient, SntpTrigger};
pub use tls::TlsConnector;
