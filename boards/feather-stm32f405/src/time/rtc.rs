//! RTC wrapper and the board's clocks
//!
//! The hardware RTC holds calendar time once SNTP has written it. Until then
//! [`RtcClock`] reports 0 so the uploader treats the clock as unset.

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, Ordering};

use critical_section::Mutex;
use defmt::{info, Format};
use embassy_stm32::rtc::Rtc;
use embedded_hal_async::delay::DelayNs;
use hal_abstractions::{Monotonic, WallClock};
use rtic_monotonics::fugit::ExtU64;
use rtic_monotonics::Monotonic as _;

use super::calendar::{datetime_to_unix, unix_to_datetime};
use crate::Mono;

/// Set after the first successful RTC write
static TIME_SYNCED: AtomicBool = AtomicBool::new(false);

/// Global internal RTC instance
static RTC: Mutex<RefCell<Option<Rtc>>> = Mutex::new(RefCell::new(None));

/// Timestamp with microsecond precision
#[derive(Debug, Clone, Copy, Format)]
pub struct Timestamp {
    /// Seconds since 1970-01-01 00:00:00 UTC
    pub unix_secs: u64,
    /// Microseconds component (0-999,999)
    pub micros: u32,
}

impl Timestamp {
    pub const fn new(unix_secs: u64, micros: u32) -> Self {
        Self { unix_secs, micros }
    }

    /// Convert from NTP timestamp (seconds since 1900-01-01)
    pub fn from_ntp(ntp_secs: u64, ntp_frac: u32) -> Self {
        /// 1900-01-01 to 1970-01-01 in seconds
        const NTP_UNIX_OFFSET: u64 = 2_208_988_800;

        let unix_secs = ntp_secs.saturating_sub(NTP_UNIX_OFFSET);
        // Fraction is in units of 2^-32 s
        let micros = ((u64::from(ntp_frac) * 1_000_000) >> 32) as u32;
        Self::new(unix_secs, micros)
    }
}

/// RTC operation errors
#[derive(Debug, Clone, Copy, Format)]
pub enum RtcError {
    NotInitialized,
    HardwareError,
    /// Timestamp outside the RTC's calendar range
    OutOfRange,
}

/// Hand the RTC to the global slot. Call once from `init`.
pub fn initialize_rtc(rtc: Rtc) {
    critical_section::with(|cs| {
        RTC.borrow(cs).replace(Some(rtc));
    });
    info!("Internal RTC initialized");
}

pub fn is_time_synced() -> bool {
    TIME_SYNCED.load(Ordering::Acquire)
}

/// Write `timestamp` to the RTC and mark time as synchronized.
pub fn write_rtc(timestamp: Timestamp) -> Result<(), RtcError> {
    let datetime = unix_to_datetime(timestamp.unix_secs).ok_or(RtcError::OutOfRange)?;

    critical_section::with(|cs| {
        if let Some(rtc) = RTC.borrow(cs).borrow_mut().as_mut() {
            rtc.set_datetime(datetime)
                .map_err(|_| RtcError::HardwareError)?;
            TIME_SYNCED.store(true, Ordering::Release);
            Ok(())
        } else {
            Err(RtcError::NotInitialized)
        }
    })
}

/// Read the RTC. Fails until time has been synchronized.
pub fn read_rtc() -> Result<Timestamp, RtcError> {
    if !is_time_synced() {
        return Err(RtcError::NotInitialized);
    }

    critical_section::with(|cs| {
        if let Some(rtc) = RTC.borrow(cs).borrow_mut().as_mut() {
            let datetime = rtc.now().map_err(|_| RtcError::HardwareError)?;
            // 1 s resolution
            Ok(Timestamp::new(datetime_to_unix(&datetime), 0))
        } else {
            Err(RtcError::NotInitialized)
        }
    })
}

/// Calendar clock backed by the RTC
#[derive(Debug, Clone, Copy, Default)]
pub struct RtcClock;

impl WallClock for RtcClock {
    fn unix_secs(&self) -> u64 {
        read_rtc().map(|ts| ts.unix_secs).unwrap_or(0)
    }
}

impl embedded_tls::TlsClock for RtcClock {
    fn now() -> Option<u64> {
        read_rtc().ok().map(|ts| ts.unix_secs)
    }
}

/// Uptime clock and delay backed by the TIM2 monotonic
#[derive(Debug, Clone, Copy, Default)]
pub struct MonoClock;

impl Monotonic for MonoClock {
    fn now_ms(&self) -> u64 {
        // 1 MHz ticks
        Mono::now().ticks() / 1000
    }
}

impl DelayNs for MonoClock {
    async fn delay_ns(&mut self, ns: u32) {
        Mono::delay(u64::from(ns).div_ceil(1000).micros()).await;
    }

    async fn delay_us(&mut self, us: u32) {
        Mono::delay(u64::from(us).micros()).await;
    }

    async fn delay_ms(&mut self, ms: u32) {
        Mono::delay(u64::from(ms).millis()).await;
    }
}
