#![deny(unsafe_code)]
#![deny(warnings)]
//! Board timekeeping
//!
//! SNTP writes UTC into the STM32 internal RTC (LSE driven, 1 s
//! resolution). The uploader reads it back through [`RtcClock`] and
//! schedules cycles on [`MonoClock`], which never jumps when the RTC is set.

mod calendar;
mod rtc;

pub use rtc::{initialize_rtc, write_rtc, MonoClock, RtcClock, RtcError, Timestamp};

/// Set up the RTC with the LSE clock configured in `init`.
pub fn init_time_system(rtc_peripheral: embassy_stm32::Peri<'static, embassy_stm32::peripherals::RTC>) {
    use embassy_stm32::rtc::{Rtc, RtcConfig};

    let rtc = Rtc::new(rtc_peripheral, RtcConfig::default());
    defmt::info!("Internal RTC initialized with LSE (32.768kHz)");
    initialize_rtc(rtc);
}
