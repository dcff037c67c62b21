//! Sensor collaborators

use core::future::Future;

/// A sensor that yields one floating point value per read.
///
/// Drivers report "no reading available" through a documented sentinel
/// (a negative value, or a driver-specific constant) rather than an error.
pub trait Sensor {
    /// Take one fresh sample.
    fn read(&mut self) -> impl Future<Output = f32>;
}

/// Raw analog input channel.
pub trait AnalogInput {
    /// Full-scale raw value of the converter (4095 for a 12-bit ADC).
    const FULL_SCALE: u16 = 4095;

    /// Take one raw conversion in `0..=FULL_SCALE`.
    fn read_raw(&mut self) -> impl Future<Output = u16>;
}
