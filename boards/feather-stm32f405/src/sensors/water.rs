#![deny(unsafe_code)]
#![deny(warnings)]
//! Water level probe on an ADC channel

use embassy_stm32::adc::{Adc, AnyAdcChannel, SampleTime};
use embassy_stm32::peripherals::ADC1;
use hal_abstractions::AnalogInput;

/// 12-bit single conversions on ADC1
pub struct WaterProbe {
    adc: Adc<'static, ADC1>,
    channel: AnyAdcChannel<ADC1>,
}

impl WaterProbe {
    pub fn new(mut adc: Adc<'static, ADC1>, channel: AnyAdcChannel<ADC1>) -> Self {
        // Probe is a high-impedance divider
        adc.set_sample_time(SampleTime::CYCLES480);
        Self { adc, channel }
    }
}

impl AnalogInput for WaterProbe {
    async fn read_raw(&mut self) -> u16 {
        self.adc.blocking_read(&mut self.channel)
    }
}
