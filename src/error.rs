//! Unified error types for the IRThermo firmware.
//!
//! Four fault classes exist, and only two of them are recoverable:
//!
//! | Fault               | Raised by          | Handling                           |
//! |---------------------|--------------------|------------------------------------|
//! | `SensorFault`       | Temperature reader | per request, `success:false` reply |
//! | `TransportFault`    | Listener / socket  | per request, connection dropped    |
//! | `ConnectivityFault` | Supervisor (serve) | fatal, restart                     |
//! | `BootstrapFault`    | Supervisor (boot)  | fatal, restart                     |
//!
//! All variants are `Copy` so they can be handed to the event sink and the
//! fatal-fault path without allocation.

use core::fmt;

use crate::app::ports::{ConfigError, ConnectivityError, LinkStatus};

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The temperature sensor could not be read.
    Sensor(SensorFault),
    /// A single connection failed at the socket level.
    Transport(TransportFault),
    /// The network link dropped while serving.
    Connectivity(ConnectivityFault),
    /// Startup could not complete.
    Bootstrap(BootstrapFault),
}

impl Error {
    /// Fatal errors are never retried in-process; they end in a restart.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Connectivity(_) | Self::Bootstrap(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Connectivity(e) => write!(f, "connectivity: {e}"),
            Self::Bootstrap(e) => write!(f, "bootstrap: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Sensor fault
// ---------------------------------------------------------------------------

/// The sensor did not answer on the bus. The bus-level cause is logged by
/// the reader and deliberately dropped here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorFault;

impl fmt::Display for SensorFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "The temperature sensor was not available")
    }
}

impl From<SensorFault> for Error {
    fn from(e: SensorFault) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Transport fault
// ---------------------------------------------------------------------------

/// Socket operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportOp {
    Bind,
    Accept,
    Read,
    Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportFault {
    pub op: TransportOp,
    pub kind: std::io::ErrorKind,
}

impl TransportFault {
    pub const fn new(op: TransportOp, kind: std::io::ErrorKind) -> Self {
        Self { op, kind }
    }

    pub fn from_io(op: TransportOp, err: &std::io::Error) -> Self {
        Self::new(op, err.kind())
    }
}

impl fmt::Display for TransportFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.op {
            TransportOp::Bind => "bind",
            TransportOp::Accept => "accept",
            TransportOp::Read => "read",
            TransportOp::Write => "write",
        };
        write!(f, "{op} failed ({:?})", self.kind)
    }
}

impl From<TransportFault> for Error {
    fn from(e: TransportFault) -> Self {
        Self::Transport(e)
    }
}

// ---------------------------------------------------------------------------
// Connectivity fault
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityFault {
    /// The interface stopped reporting `Up`; carries what it reported instead.
    LinkLost(LinkStatus),
    /// Accept kept failing; carries the last failure.
    ListenerFailed(TransportFault),
}

impl fmt::Display for ConnectivityFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LinkLost(status) => write!(f, "link lost (status={status:?})"),
            Self::ListenerFailed(e) => write!(f, "listener stuck, last {e}"),
        }
    }
}

impl From<ConnectivityFault> for Error {
    fn from(e: ConnectivityFault) -> Self {
        Self::Connectivity(e)
    }
}

// ---------------------------------------------------------------------------
// Bootstrap fault
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapFault {
    /// Configuration missing or invalid.
    Config(ConfigError),
    /// The WiFi driver refused the join request.
    Join(ConnectivityError),
    /// The link did not come up within the poll budget.
    JoinTimeout(LinkStatus),
    /// The HTTP listener could not be bound.
    Listen(TransportFault),
}

impl fmt::Display for BootstrapFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Join(e) => write!(f, "network join: {e}"),
            Self::JoinTimeout(status) => {
                write!(f, "network connection failed (status={status:?})")
            }
            Self::Listen(e) => write!(f, "listener: {e}"),
        }
    }
}

impl From<BootstrapFault> for Error {
    fn from(e: BootstrapFault) -> Self {
        Self::Bootstrap(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
