//! Bridge configuration.
//!
//! Every field has a default, so an empty TOML document is a valid
//! configuration describing the stock eight-lock bridge.
//!
//! ```
//! use lockbridge_core::BridgeConfig;
//!
//! let config = BridgeConfig::from_toml("max_locks = 4\nled_pins = [4, 5, 16, 17]").unwrap();
//! assert_eq!(config.max_locks, 4);
//! assert_eq!(config.base_duration_ms, 1500);
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::{Error, Result};

/// Top-level bridge configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Number of lock slots.
    pub max_locks: usize,

    /// Operation time for slot 0, in milliseconds.
    pub base_duration_ms: u32,

    /// Extra operation time per slot index, in milliseconds.
    pub per_slot_increment_ms: u32,

    /// Percent chance that a completed operation jams.
    pub jam_chance_percent: u32,

    /// Percent chance that a completed, non-jammed operation faults.
    pub fault_chance_percent: u32,

    /// Driving loop cadence, in milliseconds.
    pub tick_interval_ms: u64,

    /// Periodic status display interval, in milliseconds. 0 disables it.
    pub status_interval_ms: u64,

    /// Battery health check interval, in milliseconds. 0 disables it.
    pub battery_check_interval_ms: u64,

    /// Percent chance a battery check reports low battery.
    pub low_battery_chance_percent: u32,

    /// Identify pulse length, in milliseconds.
    pub identify_duration_ms: u64,

    /// LED GPIO number for each slot.
    pub led_pins: Vec<u8>,

    /// First endpoint id handed to a bridged lock.
    pub first_endpoint_id: u16,

    /// Locks added at startup.
    pub default_locks: Vec<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            max_locks: DEFAULT_MAX_LOCKS,
            base_duration_ms: DEFAULT_BASE_DURATION_MS,
            per_slot_increment_ms: DEFAULT_PER_SLOT_INCREMENT_MS,
            jam_chance_percent: DEFAULT_JAM_CHANCE_PERCENT,
            fault_chance_percent: DEFAULT_FAULT_CHANCE_PERCENT,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            status_interval_ms: DEFAULT_STATUS_INTERVAL_MS,
            battery_check_interval_ms: DEFAULT_BATTERY_CHECK_INTERVAL_MS,
            low_battery_chance_percent: DEFAULT_LOW_BATTERY_CHANCE_PERCENT,
            identify_duration_ms: DEFAULT_IDENTIFY_DURATION_MS,
            led_pins: DEFAULT_LED_PINS.to_vec(),
            first_endpoint_id: FIRST_LOCK_ENDPOINT_ID,
            default_locks: DEFAULT_LOCK_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl BridgeConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigParse` for malformed TOML and `Error::Config`
    /// when a value is out of range.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that all values are usable.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if self.max_locks == 0 || self.max_locks > MAX_SUPPORTED_LOCKS {
            return Err(Error::Config(format!(
                "max_locks must be 1-{MAX_SUPPORTED_LOCKS}, got {}",
                self.max_locks
            )));
        }

        if self.led_pins.len() < self.max_locks {
            return Err(Error::Config(format!(
                "led_pins lists {} pins but max_locks is {}",
                self.led_pins.len(),
                self.max_locks
            )));
        }

        let pins = &self.led_pins[..self.max_locks];
        for (i, pin) in pins.iter().enumerate() {
            if pins[..i].contains(pin) {
                return Err(Error::Config(format!("LED pin {pin} is assigned twice")));
            }
        }

        for (name, value) in [
            ("jam_chance_percent", self.jam_chance_percent),
            ("fault_chance_percent", self.fault_chance_percent),
            ("low_battery_chance_percent", self.low_battery_chance_percent),
        ] {
            if value > PERCENT_ROLL_RANGE {
                return Err(Error::Config(format!(
                    "{name} must be 0-{PERCENT_ROLL_RANGE}, got {value}"
                )));
            }
        }

        if self.tick_interval_ms == 0 {
            return Err(Error::Config("tick_interval_ms must be non-zero".to_string()));
        }

        if self.first_endpoint_id == BRIDGE_ENDPOINT_ID {
            return Err(Error::Config(format!(
                "first_endpoint_id must not be the bridge endpoint ({BRIDGE_ENDPOINT_ID})"
            )));
        }

        if self.default_locks.len() > self.max_locks {
            return Err(Error::Config(format!(
                "{} default locks configured but max_locks is {}",
                self.default_locks.len(),
                self.max_locks
            )));
        }

        Ok(())
    }

    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    #[must_use]
    pub fn status_interval(&self) -> Option<Duration> {
        (self.status_interval_ms > 0).then(|| Duration::from_millis(self.status_interval_ms))
    }

    #[must_use]
    pub fn battery_check_interval(&self) -> Option<Duration> {
        (self.battery_check_interval_ms > 0)
            .then(|| Duration::from_millis(self.battery_check_interval_ms))
    }

    #[must_use]
    pub fn identify_duration(&self) -> Duration {
        Duration::from_millis(self.identify_duration_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_default_config_is_valid() {
        let config = BridgeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_locks, 8);
        assert_eq!(config.led_pins, vec![4, 5, 16, 17, 18, 19, 21, 22]);
        assert_eq!(config.default_locks.len(), 4);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = BridgeConfig::from_toml("").unwrap();
        assert_eq!(config, BridgeConfig::default());
    }

    #[test]
    fn test_partial_toml() {
        let config = BridgeConfig::from_toml(
            r#"
            base_duration_ms = 1000
            default_locks = ["Shed"]
            "#,
        )
        .unwrap();

        assert_eq!(config.base_duration_ms, 1000);
        assert_eq!(config.default_locks, vec!["Shed".to_string()]);
        assert_eq!(config.per_slot_increment_ms, DEFAULT_PER_SLOT_INCREMENT_MS);
    }

    #[rstest]
    #[case("max_locks = 0")]
    #[case("max_locks = 9")]
    #[case("max_locks = 2\nled_pins = [4, 4]")]
    #[case("jam_chance_percent = 101")]
    #[case("tick_interval_ms = 0")]
    #[case("first_endpoint_id = 0")]
    #[case("max_locks = 2\nled_pins = [4, 5]\ndefault_locks = [\"a\", \"b\", \"c\"]")]
    fn test_invalid_config(#[case] content: &str) {
        let result = BridgeConfig::from_toml(content);
        assert!(matches!(result, Err(Error::Config(_))), "{content}");
    }

    #[test]
    fn test_malformed_toml() {
        let result = BridgeConfig::from_toml("max_locks = \"eight\"");
        assert!(matches!(result, Err(Error::ConfigParse(_))));
    }

    #[test]
    fn test_intervals() {
        let mut config = BridgeConfig::default();
        assert_eq!(config.tick_interval(), Duration::from_millis(100));
        assert_eq!(config.status_interval(), Some(Duration::from_secs(10)));
        assert_eq!(config.battery_check_interval(), Some(Duration::from_secs(30)));
        assert_eq!(config.identify_duration(), Duration::from_secs(5));

        config.status_interval_ms = 0;
        config.battery_check_interval_ms = 0;
        assert_eq!(config.status_interval(), None);
        assert_eq!(config.battery_check_interval(), None);
    }

    #[test]
    fn test_config_round_trip_through_toml() {
        let config = BridgeConfig::default();
        let text = toml::to_string(&config).unwrap();
        assert_eq!(BridgeConfig::from_toml(&text).unwrap(), config);
    }
}
