//! Uploader configuration structures
//!
//! Everything is fixed at build or startup time. `Default` carries the
//! reference deployment: a Mobius CSE reached over HTTPS, one AE with three
//! containers, a 30 s upload period and a 10 s time-sync budget.

use crate::endpoint::Endpoint;
use crate::error::ConfigError;
use crate::sensor::SensorChannel;

/// Container names, one per sensor channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerNames {
    pub light: &'static str,
    pub temperature: &'static str,
    pub water_level: &'static str,
}

impl ContainerNames {
    /// Container that receives content instances for `channel`.
    pub fn for_channel(&self, channel: SensorChannel) -> &'static str {
        match channel {
            SensorChannel::Light => self.light,
            SensorChannel::Temperature => self.temperature,
            SensorChannel::WaterLevel => self.water_level,
        }
    }
}

impl Default for ContainerNames {
    fn default() -> Self {
        Self {
            light: "light",
            temperature: "temp",
            water_level: "wlevel",
        }
    }
}

/// Remote resource tree configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    /// `https://host[:port][/prefix]`, trailing slash optional
    pub base_url: &'static str,
    /// CSE base resource name
    pub cse_base: &'static str,
    /// Application entity resource name
    pub application_entity: &'static str,
    /// Per-channel container names
    pub containers: ContainerNames,
    /// `X-M2M-Origin` value
    pub origin: &'static str,
    /// `X-M2M-RVI` value
    pub release_version: &'static str,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://mobius.local:443",
            cse_base: "Mobius",
            application_entity: "AE-Sensor",
            containers: ContainerNames::default(),
            origin: "S-Sensor",
            release_version: "4",
        }
    }
}

/// Time synchronization configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeConfig {
    /// NTP servers to try (in order)
    pub servers: &'static [&'static str],
    /// Fixed offset applied when reporting local time
    pub utc_offset_secs: i32,
    /// Give up waiting for a valid clock after this long
    pub timeout_ms: u64,
    /// Wall clock poll interval (at most one second)
    pub poll_interval_ms: u32,
    /// Clock values at or below this are treated as unset
    pub valid_epoch_secs: u64,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            servers: &["pool.ntp.org", "time.nist.gov"],
            // KST
            utc_offset_secs: 9 * 3600,
            timeout_ms: 10_000,
            poll_interval_ms: 200,
            // 2023-11-14T22:13:20Z
            valid_epoch_secs: 1_700_000_000,
        }
    }
}

/// Upload scheduling configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadConfig {
    /// Time between cycle starts
    pub period_ms: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self { period_ms: 30_000 }
    }
}

/// Network link bring-up configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkConfig {
    /// Fixed delay between connect attempts
    pub retry_delay_ms: u32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            retry_delay_ms: 500,
        }
    }
}

/// Complete uploader configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Config {
    pub server: ServerConfig,
    pub time: TimeConfig,
    pub upload: UploadConfig,
    pub link: LinkConfig,
}

impl Config {
    /// Check the configuration once at startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let endpoint = Endpoint::parse(self.server.base_url)?;

        let names = [
            self.server.cse_base,
            self.server.application_entity,
            self.server.containers.light,
            self.server.containers.temperature,
            self.server.containers.water_level,
        ];
        if names.iter().any(|n| n.is_empty() || n.contains('/')) {
            return Err(ConfigError::InvalidResourceName);
        }

        for channel in SensorChannel::ALL {
            endpoint.resource_path(&[
                self.server.cse_base,
                self.server.application_entity,
                self.server.containers.for_channel(channel),
            ])?;
        }

        if self.upload.period_ms == 0 {
            return Err(ConfigError::InvalidPeriod);
        }
        if !(1..=1000).contains(&self.time.poll_interval_ms) {
            return Err(ConfigError::InvalidPollInterval);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.cse_base, "Mobius");
        assert_eq!(config.server.application_entity, "AE-Sensor");
        assert_eq!(config.server.origin, "S-Sensor");
        assert_eq!(config.upload.period_ms, 30_000);
        assert_eq!(config.time.timeout_ms, 10_000);
        assert_eq!(config.time.utc_offset_secs, 32_400);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_container_for_channel() {
        let names = ContainerNames::default();
        assert_eq!(names.for_channel(SensorChannel::Light), "light");
        assert_eq!(names.for_channel(SensorChannel::Temperature), "temp");
        assert_eq!(names.for_channel(SensorChannel::WaterLevel), "wlevel");
    }

    #[test]
    fn test_plain_http_rejected() {
        let mut config = Config::default();
        config.server.base_url = "http://mobius.local:7579";
        assert_eq!(config.validate(), Err(ConfigError::InsecureScheme));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = Config::default();
        config.upload.period_ms = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidPeriod));

        let mut config = Config::default();
        config.time.poll_interval_ms = 1500;
        assert_eq!(config.validate(), Err(ConfigError::InvalidPollInterval));

        let mut config = Config::default();
        config.server.containers.light = "a/b";
        assert_eq!(config.validate(), Err(ConfigError::InvalidResourceName));
    }
}
