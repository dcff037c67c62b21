#![deny(unsafe_code)]
#![deny(warnings)]
//! DS18B20 temperature sensor on a bit-banged 1-Wire bus
//!
//! Single device on the bus, so every transaction starts with SKIP ROM.
//! Slot timing is done with `block_for` inside a critical section; the
//! 750 ms conversion wait is async.

use defmt::{debug, warn};
use embassy_stm32::gpio::{Flex, Speed};
use embassy_time::{block_for, Duration};
use embedded_hal_async::delay::DelayNs;
use hal_abstractions::Sensor;
use m2m_core::sensor::DS18B20_DISCONNECTED_C;

const SKIP_ROM: u8 = 0xCC;
const CONVERT_T: u8 = 0x44;
const READ_SCRATCHPAD: u8 = 0xBE;

/// 12-bit conversion time
const CONVERSION_MS: u32 = 750;

fn wait_us(us: u64) {
    block_for(Duration::from_micros(us));
}

/// Dallas/Maxim CRC-8 (polynomial 0x31, reflected)
fn crc8(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |mut crc, &byte| {
        let mut b = byte;
        for _ in 0..8 {
            let mix = (crc ^ b) & 0x01;
            crc >>= 1;
            if mix != 0 {
                crc ^= 0x8C;
            }
            b >>= 1;
        }
        crc
    })
}

/// Temperature in °C from a CRC-checked scratchpad.
fn scratchpad_celsius(scratchpad: &[u8; 9]) -> Option<f32> {
    if crc8(&scratchpad[..8]) != scratchpad[8] {
        return None;
    }
    let raw = i16::from_le_bytes([scratchpad[0], scratchpad[1]]);
    Some(f32::from(raw) / 16.0)
}

pub struct Ds18b20<D> {
    pin: Flex<'static>,
    delay: D,
}

impl<D: DelayNs> Ds18b20<D> {
    /// `pin` needs an external 4.7 kΩ pull-up.
    pub fn new(mut pin: Flex<'static>, delay: D) -> Self {
        pin.set_high();
        pin.set_as_input_output(Speed::VeryHigh);
        Self { pin, delay }
    }

    /// Reset pulse; true when a device answered with a presence pulse.
    fn reset(&mut self) -> bool {
        critical_section::with(|_| {
            self.pin.set_low();
            wait_us(480);
            self.pin.set_high();
            wait_us(70);
            let present = self.pin.is_low();
            wait_us(410);
            present
        })
    }

    fn write_byte(&mut self, byte: u8) {
        for i in 0..8 {
            let bit = (byte >> i) & 0x01 != 0;
            critical_section::with(|_| {
                self.pin.set_low();
                if bit {
                    wait_us(6);
                    self.pin.set_high();
                    wait_us(64);
                } else {
                    wait_us(60);
                    self.pin.set_high();
                    wait_us(10);
                }
            });
        }
    }

    fn read_byte(&mut self) -> u8 {
        let mut byte = 0u8;
        for i in 0..8 {
            let bit = critical_section::with(|_| {
                self.pin.set_low();
                wait_us(6);
                self.pin.set_high();
                wait_us(9);
                let bit = self.pin.is_high();
                wait_us(55);
                bit
            });
            if bit {
                byte |= 1 << i;
            }
        }
        byte
    }

    async fn measure(&mut self) -> Option<f32> {
        if !self.reset() {
            warn!("DS18B20: no presence pulse");
            return None;
        }
        self.write_byte(SKIP_ROM);
        self.write_byte(CONVERT_T);
        self.delay.delay_ms(CONVERSION_MS).await;

        if !self.reset() {
            return None;
        }
        self.write_byte(SKIP_ROM);
        self.write_byte(READ_SCRATCHPAD);
        let mut scratchpad = [0u8; 9];
        for b in scratchpad.iter_mut() {
            *b = self.read_byte();
        }
        let celsius = scratchpad_celsius(&scratchpad);
        if celsius.is_none() {
            warn!("DS18B20: scratchpad CRC mismatch");
        }
        celsius
    }
}

impl<D: DelayNs> Sensor for Ds18b20<D> {
    async fn read(&mut self) -> f32 {
        match self.measure().await {
            Some(celsius) => {
                debug!("DS18B20 {} C", celsius);
                celsius
            }
            None => DS18B20_DISCONNECTED_C,
        }
    }
}
