//! Controller configuration
//!
//! Library callers build a [`Config`] directly (or rely on defaults);
//! the daemon loads one from a TOML file:
//!
//! ```toml
//! [controller]
//! discovery_period_ms = 500
//! high_freq_period_ms = 10000
//! low_freq_period_ms = 120000
//! preflight_timeout_ms = 5000
//! ```
//!
//! Omitted keys keep their defaults. All periods must be non-zero.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Interval between broadcast discovery messages.
pub const DEFAULT_DISCOVERY_PERIOD: Duration = Duration::from_millis(500);
/// Cadence of high-frequency state probes.
pub const DEFAULT_HIGH_FREQ_PERIOD: Duration = Duration::from_secs(10);
/// Cadence of low-frequency state probes.
pub const DEFAULT_LOW_FREQ_PERIOD: Duration = Duration::from_secs(120);
/// Hard deadline for the preflight handshake.
pub const DEFAULT_PREFLIGHT_TIMEOUT: Duration = Duration::from_secs(5);
/// Poll interval inside the preflight handshake.
pub const DEFAULT_PREFLIGHT_WAIT: Duration = Duration::from_secs(1);

/// A session is dead after this many missed probe periods.
pub const LIVENESS_MULTIPLIER: u32 = 5;
/// Floor for the derived liveness timeout.
pub const MIN_LIVENESS_TIMEOUT: Duration = Duration::from_secs(30);
/// Bound on the shutdown wait for session tasks.
pub const SESSIONS_TERMINATION_TIMEOUT: Duration = Duration::from_secs(2);

/// Timing configuration for the controller and its device sessions.
#[derive(Debug, Clone)]
pub struct Config {
    pub discovery_period: Duration,
    pub high_freq_period: Duration,
    pub low_freq_period: Duration,
    pub preflight_timeout: Duration,
    pub preflight_wait: Duration,
    /// Sessions terminate after not hearing from the device for this
    /// long. Zero means "derive from the probe periods".
    pub device_liveness_timeout: Duration,
    pub sessions_termination_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            discovery_period: DEFAULT_DISCOVERY_PERIOD,
            high_freq_period: DEFAULT_HIGH_FREQ_PERIOD,
            low_freq_period: DEFAULT_LOW_FREQ_PERIOD,
            preflight_timeout: DEFAULT_PREFLIGHT_TIMEOUT,
            preflight_wait: DEFAULT_PREFLIGHT_WAIT,
            device_liveness_timeout: Duration::ZERO,
            sessions_termination_timeout: SESSIONS_TERMINATION_TIMEOUT,
        }
        .normalized()
    }
}

impl Config {
    /// Fills the derived liveness timeout if the caller left it unset:
    /// `max(MIN_LIVENESS_TIMEOUT, min(high, low) * LIVENESS_MULTIPLIER)`.
    pub fn normalized(mut self) -> Config {
        if self.device_liveness_timeout.is_zero() {
            let probe = self.high_freq_period.min(self.low_freq_period);
            self.device_liveness_timeout = MIN_LIVENESS_TIMEOUT.max(probe * LIVENESS_MULTIPLIER);
        }
        self
    }

    /// Loads configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config> {
        let content = fs::read_to_string(&path)
            .map_err(|e| Error::Config(format!("failed to read config: {}", e)))?;
        let raw: RawConfig = basic_toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        let c = raw.controller.unwrap_or_default();
        let mut cfg = Config {
            device_liveness_timeout: Duration::ZERO,
            ..Default::default()
        };
        if let Some(ms) = c.discovery_period_ms {
            cfg.discovery_period = Duration::from_millis(ms);
        }
        if let Some(ms) = c.high_freq_period_ms {
            cfg.high_freq_period = Duration::from_millis(ms);
        }
        if let Some(ms) = c.low_freq_period_ms {
            cfg.low_freq_period = Duration::from_millis(ms);
        }
        if let Some(ms) = c.preflight_timeout_ms {
            cfg.preflight_timeout = Duration::from_millis(ms);
        }

        for (name, period) in [
            ("discovery_period_ms", cfg.discovery_period),
            ("high_freq_period_ms", cfg.high_freq_period),
            ("low_freq_period_ms", cfg.low_freq_period),
        ] {
            if period.is_zero() {
                return Err(Error::Config(format!("{} must be non-zero", name)));
            }
        }

        Ok(cfg.normalized())
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    controller: Option<RawControllerConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct RawControllerConfig {
    discovery_period_ms: Option<u64>,
    high_freq_period_ms: Option<u64>,
    low_freq_period_ms: Option<u64>,
    preflight_timeout_ms: Option<u64>,
}
