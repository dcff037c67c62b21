#![deny(warnings)]
//! Sensor drivers
//!
//! - **`bh1750`**: ambient light on I2C1 (PB6/PB7)
//! - **`ds18b20`**: temperature on a 1-Wire bus (PC7)
//! - **`water`**: water level probe on A0 (PA4)

pub mod bh1750;
pub mod ds18b20;
pub mod water;

pub use bh1750::Bh1750;
pub use ds18b20::Ds18b20;
pub use water::WaterProbe;
