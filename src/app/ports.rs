//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Supervisor / RequestHandler (domain)
//! ```
//!
//! Driven adapters (sensor, WiFi, listener, watchdog, LED, clock, reset,
//! config storage, event sinks) implement these traits.  The
//! [`Supervisor`](super::supervisor::Supervisor) consumes them via
//! generics, so the domain core never touches hardware directly.

use core::fmt;

use crate::config::{SystemConfig, WifiConfig};
use crate::error::{SensorFault, TransportFault};
use crate::sensors::TemperatureReading;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: the domain calls this to obtain a temperature reading.
pub trait TemperaturePort {
    /// Perform one full poll of the sensor.  No retries.
    fn read(&mut self) -> Result<TemperatureReading, SensorFault>;
}

// ───────────────────────────────────────────────────────────────
// Connectivity port (driven adapter: domain ↔ WiFi station)
// ───────────────────────────────────────────────────────────────

/// Link state as reported by the network interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    /// Interface idle, no association attempted or association dropped.
    Down,
    /// Association or DHCP in progress.
    Connecting,
    /// Associated and holding an IP address.
    Up,
    /// The driver gave up (wrong password, no AP found, ...).
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityError {
    InvalidSsid,
    InvalidPassword,
    DriverFailed,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSsid => write!(f, "SSID rejected by driver"),
            Self::InvalidPassword => write!(f, "password rejected by driver"),
            Self::DriverFailed => write!(f, "WiFi driver call failed"),
        }
    }
}

pub trait ConnectivityPort {
    /// Start associating with the configured access point.  Returns once the
    /// request is issued; progress is observed through [`status`](Self::status).
    fn begin_connect(&mut self, wifi: &WifiConfig) -> Result<(), ConnectivityError>;

    /// Current link state.
    fn status(&self) -> LinkStatus;
}

// ───────────────────────────────────────────────────────────────
// Listener port (driven adapter: domain ↔ TCP)
// ───────────────────────────────────────────────────────────────

/// Accepted client stream.  Dropping it closes the connection.
pub trait Connection: std::io::Read + std::io::Write {
    /// Bound every following read and write to `timeout`, which is never
    /// zero.
    fn set_io_timeout(&self, timeout: core::time::Duration) -> std::io::Result<()>;
}

impl Connection for std::net::TcpStream {
    fn set_io_timeout(&self, timeout: core::time::Duration) -> std::io::Result<()> {
        self.set_read_timeout(Some(timeout))?;
        self.set_write_timeout(Some(timeout))
    }
}

/// Single-client TCP listener.
pub trait Listener {
    type Conn: Connection;

    /// Bind to `0.0.0.0:<port>`.  Accepted connections get `io_timeout_ms`
    /// read and write timeouts.
    fn listen(&mut self, port: u16, io_timeout_ms: u32) -> Result<(), TransportFault>;

    /// Wait up to `timeout_ms` for a client.  `Ok(None)` on timeout.
    fn accept(&mut self, timeout_ms: u32) -> Result<Option<Self::Conn>, TransportFault>;
}

// ───────────────────────────────────────────────────────────────
// Watchdog / indicator / clock / reset ports
// ───────────────────────────────────────────────────────────────

/// Hardware watchdog.  Once armed it resets the device unless fed.
pub trait WatchdogPort {
    fn arm(&mut self, timeout_ms: u32);
    fn feed(&mut self);
}

/// Visible activity indicator (LED).
pub trait IndicatorPort {
    fn set_active(&mut self, on: bool);
}

/// Monotonic millisecond clock.  Wraps at `u32::MAX`; callers compare with
/// `wrapping_sub`.
pub trait ClockPort {
    fn now_ms(&self) -> u32;
    fn delay_ms(&mut self, ms: u32);
}

/// Whole-device reset.  Does not return on hardware.
pub trait ResetPort {
    fn reset(&mut self);
}

// ───────────────────────────────────────────────────────────────
// One-shot timer (owned by the ignore-mode controller)
// ───────────────────────────────────────────────────────────────

/// One-shot hardware timer.  Both methods take `&self` because the timer
/// lives inside a controller shared with interrupt context.
pub trait OneShotTimer {
    /// Schedule the expiry callback `duration_ms` from now, replacing any
    /// pending deadline.
    fn arm(&self, duration_ms: u32);

    /// Drop the pending deadline, if any.  Idempotent.
    fn cancel(&self);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ← persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads the system configuration once at boot.
///
/// Implementations MUST run [`SystemConfig::validate`] before returning;
/// invalid values are rejected, not clamped.
pub trait ConfigPort {
    fn load(&self) -> Result<SystemConfig, ConfigError>;
}

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config document in storage.
    NotFound,
    /// Document is not valid JSON or does not match the schema.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
