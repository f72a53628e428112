//! System configuration parameters
//!
//! Loaded once at boot from a JSON document (see `data/config.json`) and
//! immutable afterwards.  Only the `wifi` section is required; every other
//! section falls back to the defaults below.

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;

/// Default ignore window: 15 minutes.
pub const DEFAULT_IGNORE_DURATION_SECS: u32 = 15 * 60;

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    pub wifi: WifiConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub ignore: IgnoreConfig,
    #[serde(default)]
    pub supervisor: SupervisorConfig,
}

/// Station credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WifiConfig {
    pub ssid: heapless::String<32>,
    pub password: heapless::String<64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// TCP listen port
    pub port: u16,
    /// Upper bound on one accept() wait (milliseconds)
    pub accept_timeout_ms: u32,
    /// Deadline for reading one request, and again for writing its reply (milliseconds)
    pub io_timeout_ms: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IgnoreConfig {
    /// Auto-expiry of ignore mode (seconds)
    pub duration_secs: u32,
    /// Report ambient in place of object temperatures while ignoring
    pub override_on_ignore: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Hardware watchdog timeout (milliseconds)
    pub watchdog_timeout_ms: u32,
    /// Number of link-status polls before bootstrap gives up
    pub connect_poll_budget: u8,
    /// Delay between link-status polls (milliseconds)
    pub connect_poll_interval_ms: u32,
    /// Quiet period before the deliberate reset on a fatal fault (milliseconds)
    pub restart_delay_ms: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: 80,
            accept_timeout_ms: 5_000,
            io_timeout_ms: 5_000,
        }
    }
}

impl Default for IgnoreConfig {
    fn default() -> Self {
        Self {
            duration_secs: DEFAULT_IGNORE_DURATION_SECS,
            override_on_ignore: false,
        }
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            watchdog_timeout_ms: 30_000,
            connect_poll_budget: 10,
            connect_poll_interval_ms: 1_000,
            restart_delay_ms: 10_000,
        }
    }
}

impl IgnoreConfig {
    pub fn duration_ms(&self) -> u32 {
        self.duration_secs.saturating_mul(1_000)
    }
}

impl SystemConfig {
    /// Build a config with default tuning around the given credentials.
    pub fn with_credentials(ssid: &str, password: &str) -> Result<Self, ConfigError> {
        let mut wifi = WifiConfig {
            ssid: heapless::String::new(),
            password: heapless::String::new(),
        };
        wifi.ssid
            .push_str(ssid)
            .map_err(|_| ConfigError::ValidationFailed("wifi.ssid longer than 32 bytes"))?;
        wifi.password
            .push_str(password)
            .map_err(|_| ConfigError::ValidationFailed("wifi.password longer than 64 bytes"))?;
        let config = Self {
            wifi,
            http: HttpConfig::default(),
            ignore: IgnoreConfig::default(),
            supervisor: SupervisorConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON config document.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_slice(bytes).map_err(|e| {
            log::warn!("config: parse error ({})", e);
            ConfigError::Corrupted
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Range-check every field.  Rejects rather than clamps.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_ssid(&self.wifi.ssid)?;
        validate_password(&self.wifi.password)?;

        if self.http.accept_timeout_ms == 0 {
            return Err(ConfigError::ValidationFailed("http.accept_timeout_ms must be > 0"));
        }
        if self.http.io_timeout_ms == 0 {
            return Err(ConfigError::ValidationFailed("http.io_timeout_ms must be > 0"));
        }
        if self.ignore.duration_secs == 0 {
            return Err(ConfigError::ValidationFailed("ignore.duration_secs must be > 0"));
        }
        if self.supervisor.connect_poll_budget == 0 {
            return Err(ConfigError::ValidationFailed(
                "supervisor.connect_poll_budget must be > 0",
            ));
        }

        // Worst case between two feeds: one accept wait plus one request,
        // whose read and write each run against an `io_timeout_ms` deadline.
        let feed_gap = u64::from(self.http.accept_timeout_ms)
            + 2 * u64::from(self.http.io_timeout_ms);
        if u64::from(self.supervisor.watchdog_timeout_ms) <= feed_gap {
            return Err(ConfigError::ValidationFailed(
                "supervisor.watchdog_timeout_ms must exceed accept + 2 * io timeout",
            ));
        }
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Credential validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn validate_ssid(ssid: &str) -> Result<(), ConfigError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(ConfigError::ValidationFailed(
            "wifi.ssid must be 1-32 printable ASCII bytes",
        ));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ConfigError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(ConfigError::ValidationFailed(
            "wifi.password must be empty (open) or 8-64 bytes",
        ));
    }
    Ok(())
}
