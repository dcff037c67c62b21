//! Time base: wall clock synchronization gate
//!
//! Certificate validation needs a plausible wall clock, so uploads start only
//! after [`TimeBase::sync`] has either seen the clock pass a known-valid epoch
//! or given up.

use embedded_hal_async::delay::DelayNs;
use hal_abstractions::{TimeSource, WallClock};

use crate::calendar::CivilTime;
use crate::config::TimeConfig;
use crate::error::TimeSyncError;

/// Wall clock plus the policy for trusting it
pub struct TimeBase<W, D> {
    wall: W,
    delay: D,
    config: TimeConfig,
}

impl<W: WallClock, D: DelayNs> TimeBase<W, D> {
    pub fn new(wall: W, delay: D, config: TimeConfig) -> Self {
        Self {
            wall,
            delay,
            config,
        }
    }

    /// Request synchronization and wait for the clock to become valid.
    ///
    /// Polls every `poll_interval_ms`. The last sleep is shortened so the
    /// timeout is reported exactly when `timeout_ms` has elapsed. There is
    /// no retry; the caller decides whether to carry on.
    pub async fn sync<S: TimeSource>(
        &mut self,
        source: &mut S,
        timeout_ms: u64,
    ) -> Result<u64, TimeSyncError> {
        source.request_sync(self.config.servers);
        info!("Waiting for time sync (timeout {} ms)", timeout_ms);

        let poll_ms = u64::from(self.config.poll_interval_ms.max(1));
        let mut waited_ms = 0;
        loop {
            let now = self.wall.unix_secs();
            if now > self.config.valid_epoch_secs {
                info!("Time synced after {} ms: unix {}", waited_ms, now);
                return Ok(now);
            }
            if waited_ms >= timeout_ms {
                warn!("Time sync timed out after {} ms", waited_ms);
                return Err(TimeSyncError::TimedOut { waited_ms });
            }
            let step = poll_ms.min(timeout_ms - waited_ms);
            // step <= poll_interval_ms, which is a u32
            self.delay.delay_ms(step as u32).await;
            waited_ms += step;
        }
    }

    /// Whether the wall clock is past the validity threshold
    pub fn is_valid(&self) -> bool {
        self.wall.unix_secs() > self.config.valid_epoch_secs
    }

    /// Wall clock seconds with the configured UTC offset applied
    pub fn local_secs(&self) -> i64 {
        self.wall.unix_secs() as i64 + i64::from(self.config.utc_offset_secs)
    }

    /// Local calendar time, if the clock has been set
    pub fn local_time(&self) -> Option<CivilTime> {
        self.is_valid()
            .then(|| CivilTime::from_unix(self.local_secs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingTimeSource, SimClock, SimWallClock};
    use embassy_futures::block_on;
    use hal_abstractions::Monotonic;

    fn config() -> TimeConfig {
        TimeConfig::default()
    }

    #[test]
    fn test_times_out_exactly_at_boundary() {
        let clock = SimClock::new();
        let mut time = TimeBase::new(SimWallClock::never_valid(clock.clone()), clock.clone(), config());
        let mut source = RecordingTimeSource::default();

        let result = block_on(time.sync(&mut source, 10_000));
        assert_eq!(result, Err(TimeSyncError::TimedOut { waited_ms: 10_000 }));
        assert_eq!(clock.now_ms(), 10_000);
        assert_eq!(source.requests, [config().servers]);
    }

    #[test]
    fn test_timeout_not_multiple_of_poll_interval() {
        let clock = SimClock::new();
        let mut time = TimeBase::new(SimWallClock::never_valid(clock.clone()), clock.clone(), config());
        let result = block_on(time.sync(&mut RecordingTimeSource::default(), 1_050));
        assert_eq!(result, Err(TimeSyncError::TimedOut { waited_ms: 1_050 }));
        assert_eq!(clock.now_ms(), 1_050);
    }

    #[test]
    fn test_sync_completes_when_clock_becomes_valid() {
        let clock = SimClock::new();
        let wall = SimWallClock::valid_from(clock.clone(), 1_300, 1_750_000_000);
        let mut time = TimeBase::new(wall, clock.clone(), config());

        let synced = block_on(time.sync(&mut RecordingTimeSource::default(), 10_000)).unwrap();
        assert_eq!(synced, 1_750_000_000);
        // First poll at or after 1300 ms with a 200 ms interval
        assert_eq!(clock.now_ms(), 1_400);
        assert!(time.is_valid());
    }

    #[test]
    fn test_already_valid_does_not_sleep() {
        let clock = SimClock::new();
        let wall = SimWallClock::valid_from(clock.clone(), 0, 1_750_000_000);
        let mut time = TimeBase::new(wall, clock.clone(), config());
        assert!(block_on(time.sync(&mut RecordingTimeSource::default(), 10_000)).is_ok());
        assert_eq!(clock.now_ms(), 0);
    }

    #[test]
    fn test_local_time_applies_offset() {
        let clock = SimClock::new();
        // 2023-11-14 22:13:21 UTC
        let wall = SimWallClock::valid_from(clock.clone(), 0, 1_700_000_001);
        let time = TimeBase::new(wall, clock, config());
        let local = time.local_time().unwrap();
        assert_eq!(std::format!("{}", local), "2023-11-15 07:13:21");
    }

    #[test]
    fn test_local_time_unset_clock() {
        let clock = SimClock::new();
        let time = TimeBase::new(SimWallClock::never_valid(clock.clone()), clock, config());
        assert!(!time.is_valid());
        assert_eq!(time.local_time(), None);
    }
}
