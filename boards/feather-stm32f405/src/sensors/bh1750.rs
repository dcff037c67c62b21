#![deny(unsafe_code)]
#![deny(warnings)]
//! BH1750 ambient light sensor over I2C

use defmt::{debug, error, info};
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use hal_abstractions::Sensor;

/// ADDR pin low
pub const ADDRESS_LOW: u8 = 0x23;
/// ADDR pin high
pub const ADDRESS_HIGH: u8 = 0x5C;

const POWER_ON: u8 = 0x01;
const CONTINUOUS_HIGH_RES: u8 = 0x10;

/// Typical high-resolution measurement time
const MEASUREMENT_MS: u32 = 180;

/// Reported while the sensor never initialized
pub const NOT_INITIALIZED_LUX: f32 = -1.0;
/// Reported when a measurement read fails
pub const READ_FAILED_LUX: f32 = -2.0;

pub struct Bh1750<I> {
    i2c: I,
    address: u8,
    ready: bool,
}

impl<I: I2c> Bh1750<I> {
    pub fn new(i2c: I, address: u8) -> Self {
        Self {
            i2c,
            address,
            ready: false,
        }
    }

    /// Power on and start continuous high-resolution measurements.
    ///
    /// A failure is logged and leaves the driver reporting
    /// [`NOT_INITIALIZED_LUX`].
    pub async fn init<D: DelayNs>(&mut self, delay: &mut D) -> bool {
        let result = async {
            self.i2c.write(self.address, &[POWER_ON]).await?;
            self.i2c.write(self.address, &[CONTINUOUS_HIGH_RES]).await
        }
        .await;
        match result {
            Ok(()) => {
                delay.delay_ms(MEASUREMENT_MS).await;
                info!("BH1750 ready at 0x{:02x}", self.address);
                self.ready = true;
            }
            Err(_) => {
                error!(
                    "BH1750 init failed. Check wiring/address (0x{:02x} or 0x{:02x}).",
                    ADDRESS_LOW, ADDRESS_HIGH
                );
                self.ready = false;
            }
        }
        self.ready
    }
}

/// Lux from a raw high-resolution count.
fn raw_to_lux(raw: u16) -> f32 {
    f32::from(raw) / 1.2
}

impl<I: I2c> Sensor for Bh1750<I> {
    async fn read(&mut self) -> f32 {
        if !self.ready {
            return NOT_INITIALIZED_LUX;
        }
        let mut buf = [0u8; 2];
        match self.i2c.read(self.address, &mut buf).await {
            Ok(()) => {
                let raw = u16::from_be_bytes(buf);
                debug!("BH1750 raw={}", raw);
                raw_to_lux(raw)
            }
            Err(_) => {
                error!("BH1750 read failed");
                READ_FAILED_LUX
            }
        }
    }
}
