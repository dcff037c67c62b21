//! Sensor channels, reading validity and raw value mapping

use core::future::Future;

use hal_abstractions::{AnalogInput, Sensor};

/// DS18B20 "device disconnected" reading in °C
pub const DS18B20_DISCONNECTED_C: f32 = -127.0;

/// One of the uploaded measurements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorChannel {
    /// Ambient light in lux
    Light,
    /// Temperature in °C
    Temperature,
    /// Water level in percent of full scale
    WaterLevel,
}

impl SensorChannel {
    /// Every channel, in upload order
    pub const ALL: [SensorChannel; 3] = [
        SensorChannel::Light,
        SensorChannel::Temperature,
        SensorChannel::WaterLevel,
    ];

    /// Short name for logs
    pub fn name(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Temperature => "temp",
            Self::WaterLevel => "wlevel",
        }
    }

    /// Whether `value` is a real measurement for this channel.
    ///
    /// The light meter signals a failed read with a negative value, the
    /// temperature bus with [`DS18B20_DISCONNECTED_C`]. A percentage can
    /// never be negative.
    pub fn accepts(self, value: f32) -> bool {
        if !value.is_finite() {
            return false;
        }
        match self {
            Self::Light | Self::WaterLevel => value >= 0.0,
            Self::Temperature => value != DS18B20_DISCONNECTED_C,
        }
    }
}

/// A sample taken for one upload attempt
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub channel: SensorChannel,
    pub value: f32,
    /// Monotonic time of capture
    pub captured_at_ms: u64,
}

impl Reading {
    pub fn is_valid(&self) -> bool {
        self.channel.accepts(self.value)
    }
}

/// Linear integer map of `raw` in `0..=full_scale` onto `0..=100`.
///
/// Truncates like the usual `map(raw, 0, full, 0, 100)` helper; out of
/// range input is clamped to full scale.
pub fn level_percent(raw: u16, full_scale: u16) -> u8 {
    if full_scale == 0 {
        return 0;
    }
    let raw = u32::from(raw.min(full_scale));
    (raw * 100 / u32::from(full_scale)) as u8
}

/// Water level sensor on top of a raw ADC channel
pub struct WaterLevel<A> {
    adc: A,
}

impl<A: AnalogInput> WaterLevel<A> {
    pub fn new(adc: A) -> Self {
        Self { adc }
    }
}

impl<A: AnalogInput> Sensor for WaterLevel<A> {
    async fn read(&mut self) -> f32 {
        let raw = self.adc.read_raw().await;
        let percent = level_percent(raw, A::FULL_SCALE);
        debug!("Water level raw={} -> {}%", raw, percent);
        f32::from(percent)
    }
}

/// The set of sensors sampled each cycle
pub trait SensorBank {
    /// Take a fresh sample for `channel`.
    fn read(&mut self, channel: SensorChannel) -> impl Future<Output = f32>;
}

/// One sensor per channel
pub struct Sensors<L, T, W> {
    pub light: L,
    pub temperature: T,
    pub water_level: W,
}

impl<L: Sensor, T: Sensor, W: Sensor> SensorBank for Sensors<L, T, W> {
    async fn read(&mut self, channel: SensorChannel) -> f32 {
        match channel {
            SensorChannel::Light => self.light.read().await,
            SensorChannel::Temperature => self.temperature.read().await,
            SensorChannel::WaterLevel => self.water_level.read().await,
        }
    }
}
