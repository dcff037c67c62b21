//! Upload cycle controller
//!
//! Two states. `Idle` until `period_ms` has elapsed since the previous cycle
//! *started*, then `Cycling` through every channel in [`SensorChannel::ALL`]
//! order: read, validate, publish. One channel's failure never stops the
//! others, and nothing is retried before the next tick.

use embedded_hal_async::delay::DelayNs;
use hal_abstractions::{Connector, Monotonic, NetworkLink, TimeSource, TransportError, WallClock};

use crate::config::{Config, UploadConfig};
use crate::link::bring_up;
use crate::sensor::{Reading, SensorBank, SensorChannel};
use crate::telemetry::{PublishOutcome, TelemetryClient};
use crate::time::TimeBase;

/// Controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CycleState {
    /// Waiting for the next tick
    Idle,
    /// Attempting every channel of the current tick
    Cycling,
}

/// What happened to one channel in one cycle
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UploadOutcome {
    /// The sensor returned an invalid or sentinel value; nothing was sent
    AcquisitionError { value: f32 },
    Published,
    Rejected(u16),
    TransportFailed(TransportError),
}

impl From<PublishOutcome> for UploadOutcome {
    fn from(outcome: PublishOutcome) -> Self {
        match outcome {
            PublishOutcome::Published => Self::Published,
            PublishOutcome::Rejected(status) => Self::Rejected(status),
            PublishOutcome::TransportFailed(e) => Self::TransportFailed(e),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelReport {
    pub channel: SensorChannel,
    pub outcome: UploadOutcome,
}

/// Per-channel outcomes of one cycle
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CycleReport {
    /// Monotonic time the cycle started
    pub started_at_ms: u64,
    /// In upload order
    pub entries: [ChannelReport; SensorChannel::ALL.len()],
}

impl CycleReport {
    pub fn outcome(&self, channel: SensorChannel) -> Option<UploadOutcome> {
        self.entries
            .iter()
            .find(|e| e.channel == channel)
            .map(|e| e.outcome)
    }

    pub fn published(&self) -> usize {
        self.count(|o| matches!(o, UploadOutcome::Published))
    }

    /// Rejections and transport failures
    pub fn failed(&self) -> usize {
        self.count(|o| {
            matches!(
                o,
                UploadOutcome::Rejected(_) | UploadOutcome::TransportFailed(_)
            )
        })
    }

    /// Readings that were not uploaded
    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, UploadOutcome::AcquisitionError { .. }))
    }

    fn count(&self, pred: impl Fn(&UploadOutcome) -> bool) -> usize {
        self.entries.iter().filter(|e| pred(&e.outcome)).count()
    }
}

/// Fixed-period scheduler driving one publish per channel per tick
pub struct UploadController<'a, C, S, M, D> {
    client: TelemetryClient<'a, C>,
    sensors: S,
    clock: M,
    delay: D,
    period_ms: u64,
    state: CycleState,
    last_cycle_start: Option<u64>,
}

impl<'a, C, S, M, D> UploadController<'a, C, S, M, D>
where
    C: Connector,
    S: SensorBank,
    M: Monotonic,
    D: DelayNs,
{
    pub fn new(
        client: TelemetryClient<'a, C>,
        sensors: S,
        clock: M,
        delay: D,
        config: &UploadConfig,
    ) -> Self {
        Self {
            client,
            sensors,
            clock,
            delay,
            period_ms: config.period_ms,
            state: CycleState::Idle,
            last_cycle_start: None,
        }
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    pub fn sensors(&self) -> &S {
        &self.sensors
    }

    /// Milliseconds until the next cycle is due; zero when due now.
    ///
    /// The first cycle is due immediately.
    pub fn time_until_due(&self) -> u64 {
        match self.last_cycle_start {
            None => 0,
            Some(start) => {
                let elapsed = self.clock.now_ms().saturating_sub(start);
                self.period_ms.saturating_sub(elapsed)
            }
        }
    }

    pub fn is_due(&self) -> bool {
        self.time_until_due() == 0
    }

    /// Run a cycle if one is due.
    pub async fn poll(&mut self) -> Option<CycleReport> {
        if self.is_due() {
            Some(self.run_cycle().await)
        } else {
            None
        }
    }

    /// Sleep until the next tick, then run its cycle.
    pub async fn next_cycle(&mut self) -> CycleReport {
        let wait_ms = self.time_until_due();
        if wait_ms > 0 {
            self.delay
                .delay_ms(u32::try_from(wait_ms).unwrap_or(u32::MAX))
                .await;
        }
        self.run_cycle().await
    }

    /// Attempt every channel once, now.
    pub async fn run_cycle(&mut self) -> CycleReport {
        let started_at_ms = self.clock.now_ms();
        self.last_cycle_start = Some(started_at_ms);
        self.state = CycleState::Cycling;

        let [light, temperature, water_level] = SensorChannel::ALL;
        let report = CycleReport {
            started_at_ms,
            entries: [
                self.attempt(light).await,
                self.attempt(temperature).await,
                self.attempt(water_level).await,
            ],
        };

        self.state = CycleState::Idle;
        info!(
            "Cycle at {} ms: {} published, {} failed, {} skipped",
            started_at_ms,
            report.published(),
            report.failed(),
            report.skipped()
        );
        report
    }

    /// Upload forever.
    pub async fn run(&mut self) -> ! {
        info!("Upload loop started, period {} ms", self.period_ms);
        loop {
            self.next_cycle().await;
        }
    }

    async fn attempt(&mut self, channel: SensorChannel) -> ChannelReport {
        let value = self.sensors.read(channel).await;
        let reading = Reading {
            channel,
            value,
            captured_at_ms: self.clock.now_ms(),
        };

        let outcome = if reading.is_valid() {
            self.client.publish(channel, reading.value).await.into()
        } else {
            warn!(
                "{}: invalid reading {} at {} ms, not uploaded",
                channel.name(),
                reading.value,
                reading.captured_at_ms
            );
            UploadOutcome::AcquisitionError {
                value: reading.value,
            }
        };
        ChannelReport { channel, outcome }
    }
}

/// Result of the startup sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Startup {
    pub link_attempts: u32,
    /// Unix time at sync, `None` when sync timed out
    pub synced_at: Option<u64>,
}

/// Bring the link up, then synchronize time.
///
/// A sync timeout is logged and otherwise ignored: uploads proceed with a
/// clock that may be wrong.
pub async fn establish<L, T, W, D, DL>(
    link: &mut L,
    link_delay: &mut DL,
    time: &mut TimeBase<W, D>,
    time_source: &mut T,
    config: &Config,
) -> Startup
where
    L: NetworkLink,
    T: TimeSource,
    W: WallClock,
    D: DelayNs,
    DL: DelayNs,
{
    let link_attempts = bring_up(link, link_delay, &config.link).await;
    let synced_at = match time.sync(time_source, config.time.timeout_ms).await {
        Ok(now) => {
            if let Some(local) = time.local_time() {
                info!(
                    "Local time {}-{}-{} {}:{}:{}",
                    local.year, local.month, local.day, local.hour, local.minute, local.second
                );
            }
            Some(now)
        }
        Err(e) => {
            warn!("{}; continuing with an unsynced clock", e);
            None
        }
    };
    Startup {
        link_attempts,
        synced_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::sensor::{Sensors, WaterLevel, DS18B20_DISCONNECTED_C};
    use crate::testing::{
        FixedAdc, FixedSensor, FlakyLink, RecordingTimeSource, Reply, RequestLog,
        ScriptedConnector, SimClock, SimWallClock, TEST_ROOT_CA,
    };
    use embassy_futures::block_on;
    use hal_abstractions::Sensor;

    type Bank = Sensors<FixedSensor, FixedSensor, WaterLevel<FixedAdc>>;

    fn bank(light: f32, temperature: f32, water_raw: u16) -> Bank {
        Sensors {
            light: FixedSensor::new(light),
            temperature: FixedSensor::new(temperature),
            water_level: WaterLevel::new(FixedAdc::new(water_raw)),
        }
    }

    fn controller<S: SensorBank>(
        connector: ScriptedConnector,
        sensors: S,
        clock: &SimClock,
    ) -> UploadController<'static, ScriptedConnector, S, SimClock, SimClock> {
        let client =
            TelemetryClient::from_config(connector, &ServerConfig::default(), TEST_ROOT_CA)
                .unwrap();
        UploadController::new(
            client,
            sensors,
            clock.clone(),
            clock.clone(),
            &UploadConfig::default(),
        )
    }

    fn created() -> (ScriptedConnector, RequestLog) {
        ScriptedConnector::always_created()
    }

    #[test]
    fn test_end_to_end_cycle() {
        let clock = SimClock::new();
        let (connector, log) = created();
        let mut uploader = controller(
            connector,
            bank(550.0, DS18B20_DISCONNECTED_C, 2048),
            &clock,
        );
        assert_eq!(uploader.state(), CycleState::Idle);

        let report = block_on(uploader.poll()).unwrap();
        assert_eq!(report.started_at_ms, 0);
        assert_eq!(
            report.outcome(SensorChannel::Light),
            Some(UploadOutcome::Published)
        );
        assert_eq!(
            report.outcome(SensorChannel::Temperature),
            Some(UploadOutcome::AcquisitionError { value: -127.0 })
        );
        assert_eq!(
            report.outcome(SensorChannel::WaterLevel),
            Some(UploadOutcome::Published)
        );
        assert_eq!((report.published(), report.failed(), report.skipped()), (2, 0, 1));

        assert_eq!(
            log.paths(),
            ["/Mobius/AE-Sensor/light", "/Mobius/AE-Sensor/wlevel"]
        );
        assert_eq!(
            log.bodies(),
            [
                r#"{"m2m:cin":{"con":550.00}}"#,
                r#"{"m2m:cin":{"con":50.00}}"#
            ]
        );
        // The sensor was still read exactly once
        assert_eq!(uploader.sensors().temperature.reads(), 1);
        assert_eq!(uploader.state(), CycleState::Idle);
    }

    #[test]
    fn test_failure_does_not_stop_later_channels() {
        let clock = SimClock::new();
        let (connector, log) = ScriptedConnector::new(|req| {
            if req.contains("/light ") {
                Reply::ReadFails
            } else if req.contains("/temp ") {
                Reply::Status(400, r#"{"m2m:dbg":"bad request"}"#)
            } else {
                Reply::Status(201, "")
            }
        });
        let mut uploader = controller(connector, bank(100.0, 21.0, 4095), &clock);

        let report = block_on(uploader.run_cycle());
        assert_eq!(
            report.entries.map(|e| e.outcome),
            [
                UploadOutcome::TransportFailed(TransportError::Io),
                UploadOutcome::Rejected(400),
                UploadOutcome::Published,
            ]
        );
        assert_eq!(log.requests().len(), 3);
        assert_eq!(log.request_ids(), [10_000, 10_001, 10_002]);
    }

    #[test]
    fn test_invalid_reading_is_never_published() {
        let clock = SimClock::new();
        let (connector, log) = created();
        let mut uploader = controller(connector, bank(-1.0, 19.5, 0), &clock);

        let report = block_on(uploader.run_cycle());
        assert_eq!(
            report.outcome(SensorChannel::Light),
            Some(UploadOutcome::AcquisitionError { value: -1.0 })
        );
        assert_eq!(
            log.paths(),
            ["/Mobius/AE-Sensor/temp", "/Mobius/AE-Sensor/wlevel"]
        );
        assert_eq!(log.bodies()[1], r#"{"m2m:cin":{"con":0.00}}"#);
    }

    #[test]
    fn test_period_gating() {
        let clock = SimClock::new();
        let (connector, log) = created();
        let mut uploader = controller(connector, bank(1.0, 2.0, 3), &clock);

        assert!(uploader.is_due());
        assert!(block_on(uploader.poll()).is_some());
        assert!(!uploader.is_due());

        clock.advance_ms(29_999);
        assert_eq!(uploader.time_until_due(), 1);
        assert!(block_on(uploader.poll()).is_none());
        assert_eq!(log.requests().len(), 3);

        clock.advance_ms(1);
        let report = block_on(uploader.poll()).unwrap();
        assert_eq!(report.started_at_ms, 30_000);
        assert_eq!(log.requests().len(), 6);
    }

    /// Sensor whose read takes simulated time
    struct SlowSensor {
        clock: SimClock,
        cost_ms: u64,
    }

    impl Sensor for SlowSensor {
        async fn read(&mut self) -> f32 {
            self.clock.advance_ms(self.cost_ms);
            42.0
        }
    }

    #[test]
    fn test_cycle_duration_does_not_drift_schedule() {
        let clock = SimClock::new();
        let (connector, log) = created();
        let sensors = Sensors {
            light: SlowSensor {
                clock: clock.clone(),
                cost_ms: 4_000,
            },
            temperature: FixedSensor::new(20.0),
            water_level: WaterLevel::new(FixedAdc::new(1000)),
        };
        let mut uploader = controller(connector, sensors, &clock);

        let starts: std::vec::Vec<u64> = (0..4)
            .map(|_| block_on(uploader.next_cycle()).started_at_ms)
            .collect();
        assert_eq!(starts, [0, 30_000, 60_000, 90_000]);
        assert_eq!(clock.now_ms(), 94_000);

        let ids = log.request_ids();
        assert_eq!(ids.len(), 12);
        assert_eq!(ids.first(), Some(&10_000));
        assert_eq!(ids.last(), Some(&10_011));
    }

    #[test]
    fn test_overlong_cycle_runs_next_immediately() {
        let clock = SimClock::new();
        let (connector, _log) = created();
        let sensors = Sensors {
            light: SlowSensor {
                clock: clock.clone(),
                cost_ms: 45_000,
            },
            temperature: FixedSensor::new(20.0),
            water_level: WaterLevel::new(FixedAdc::new(1000)),
        };
        let mut uploader = controller(connector, sensors, &clock);

        block_on(uploader.next_cycle());
        assert!(uploader.is_due());
        let report = block_on(uploader.next_cycle());
        assert_eq!(report.started_at_ms, 45_000);
    }

    #[test]
    fn test_establish_proceeds_after_sync_timeout() {
        let clock = SimClock::new();
        let config = Config::default();
        let mut link = FlakyLink::failing(2);
        let mut time = TimeBase::new(
            SimWallClock::never_valid(clock.clone()),
            clock.clone(),
            config.time,
        );
        let mut source = RecordingTimeSource::default();

        let startup = block_on(establish(
            &mut link,
            &mut clock.clone(),
            &mut time,
            &mut source,
            &config,
        ));
        assert_eq!(
            startup,
            Startup {
                link_attempts: 3,
                synced_at: None
            }
        );
        assert_eq!(clock.now_ms(), 2 * 500 + 10_000);
        assert_eq!(source.requests.len(), 1);
    }

    #[test]
    fn test_establish_with_synced_clock() {
        let clock = SimClock::new();
        let config = Config::default();
        let mut time = TimeBase::new(
            SimWallClock::valid_from(clock.clone(), 600, 1_760_000_000),
            clock.clone(),
            config.time,
        );
        let startup = block_on(establish(
            &mut FlakyLink::failing(0),
            &mut clock.clone(),
            &mut time,
            &mut RecordingTimeSource::default(),
            &config,
        ));
        assert_eq!(startup.link_attempts, 1);
        assert_eq!(startup.synced_at, Some(1_760_000_000));
    }
}
