//! Request handler: one accepted connection in, one JSON reply out.
//!
//! ```text
//!   conn ──▶ read request line + drain headers ──▶ route
//!                                                   │
//!        /reset → IgnoreController::reset           │
//!        /ignore → IgnoreController::activate  ◀────┘
//!                                                   │
//!   TemperaturePort::read ──▶ ReadingResponse ──▶ "HTTP/1.0 200 OK" + JSON
//! ```
//!
//! The connection is taken by value and dropped on every return path, so
//! the socket is always closed.  Nothing here returns an error to the
//! caller: transport trouble comes back as [`RequestOutcome::TransportFault`].
//!
//! Reading the request and writing the response each get one deadline of
//! the request timeout.  The socket timeout is cut to whatever is left
//! before every call, so a client trickling bytes cannot hold the loop
//! longer than that.

use std::io::{BufRead, BufReader, Read, Write};
use std::time::{Duration, Instant};

use log::warn;
use serde::Serialize;

use crate::app::ignore::{IgnoreController, Trigger};
use crate::app::ports::{Connection, OneShotTimer, TemperaturePort};
use crate::config::HttpConfig;
use crate::error::{SensorFault, TransportFault, TransportOp};
use crate::sensors::TemperatureReading;

/// Longest request/header line kept; the rest of an overlong line is read
/// as the next line.
pub const MAX_LINE_LEN: usize = 512;
/// Header lines drained after the request line before giving up on a
/// terminating blank line.
pub const MAX_HEADER_LINES: usize = 64;

/// Fixed status line and header block.
pub const RESPONSE_HEAD: &[u8] = b"HTTP/1.0 200 OK\r\nContent-type: application/json\r\n\r\n";

/// Recognised control path on the request line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Force ignore mode off, then read.
    Reset,
    /// Force ignore mode on, then read.
    Ignore,
    /// Plain reading.
    Reading,
}

impl Route {
    /// Substring match on the raw request line; method and version are not
    /// checked.
    pub fn from_request_line(line: &[u8]) -> Self {
        if contains(line, b"/reset") {
            Self::Reset
        } else if contains(line, b"/ignore") {
            Self::Ignore
        } else {
            Self::Reading
        }
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

// ───────────────────────────────────────────────────────────────
// Per-connection scratch state
// ───────────────────────────────────────────────────────────────

/// What survives of the request once the headers are drained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionContext {
    pub request_line: Vec<u8>,
    pub route: Route,
}

impl ConnectionContext {
    /// Read the request line, then discard header lines until a blank line
    /// or end of stream.
    ///
    /// A line longer than [`MAX_LINE_LEN`] arrives in several chunks; only a
    /// chunk that starts a fresh line can be the blank terminator.
    pub fn read_from<R: BufRead>(reader: &mut R) -> std::io::Result<Self> {
        let mut request_line = Vec::with_capacity(64);
        read_line(reader, &mut request_line)?;
        let mut mid_line = !request_line.is_empty() && !request_line.ends_with(b"\n");

        let mut scratch = Vec::with_capacity(64);
        for _ in 0..MAX_HEADER_LINES {
            scratch.clear();
            if read_line(reader, &mut scratch)? == 0 {
                break;
            }
            let blank = scratch == b"\r\n" || scratch == b"\n";
            if blank && !mid_line {
                break;
            }
            mid_line = !scratch.ends_with(b"\n");
        }

        let route = Route::from_request_line(&request_line);
        Ok(Self {
            request_line,
            route,
        })
    }
}

fn read_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<usize> {
    reader
        .by_ref()
        .take(MAX_LINE_LEN as u64)
        .read_until(b'\n', buf)
}

// ───────────────────────────────────────────────────────────────
// Deadline-bound stream
// ───────────────────────────────────────────────────────────────

/// Connection whose reads and writes share one deadline.
struct DeadlineStream<C> {
    conn: C,
    deadline: Instant,
}

impl<C: Connection> DeadlineStream<C> {
    fn new(conn: C, budget: Duration) -> Self {
        Self {
            conn,
            deadline: Instant::now() + budget,
        }
    }

    fn restart(&mut self, budget: Duration) {
        self.deadline = Instant::now() + budget;
    }

    /// Cut the socket timeout to the time left, or fail once none is.
    fn arm(&self) -> std::io::Result<()> {
        let left = self.deadline.saturating_duration_since(Instant::now());
        if left.is_zero() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "request deadline passed",
            ));
        }
        self.conn.set_io_timeout(left)
    }
}

/// A blocking socket call that hit its timeout reports `WouldBlock` on Unix.
fn normalize_timeout(e: std::io::Error) -> std::io::Error {
    if e.kind() == std::io::ErrorKind::WouldBlock {
        std::io::ErrorKind::TimedOut.into()
    } else {
        e
    }
}

impl<C: Connection> Read for DeadlineStream<C> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.arm()?;
        self.conn.read(buf).map_err(normalize_timeout)
    }
}

impl<C: Connection> Write for DeadlineStream<C> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.arm()?;
        self.conn.write(buf).map_err(normalize_timeout)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.conn.flush().map_err(normalize_timeout)
    }
}

// ───────────────────────────────────────────────────────────────
// Response body
// ───────────────────────────────────────────────────────────────

/// JSON body.  Temperature fields and `ignore_state` appear only on
/// success, `error` only on failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadingResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ambient_temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_temperature_1: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_temperature_2: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_temperature_avg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_state: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReadingResponse {
    pub fn reading(reading: &TemperatureReading, ignore_state: bool) -> Self {
        Self {
            success: true,
            ambient_temperature: Some(reading.ambient),
            object_temperature_1: Some(reading.object1),
            object_temperature_2: Some(reading.object2),
            object_temperature_avg: Some(reading.object_avg),
            ignore_state: Some(ignore_state),
            error: None,
        }
    }

    pub fn fault(fault: SensorFault) -> Self {
        Self {
            success: false,
            ambient_temperature: None,
            object_temperature_1: None,
            object_temperature_2: None,
            object_temperature_avg: None,
            ignore_state: None,
            error: Some(fault.to_string()),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Handler
// ───────────────────────────────────────────────────────────────

/// Result of one connection, for the supervisor's event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// A response was written.  `success` mirrors the JSON field.
    Served { route: Route, success: bool },
    /// The connection failed before or while the response was written.
    TransportFault(TransportFault),
}

#[derive(Debug, Clone, Copy)]
pub struct RequestHandler {
    override_on_ignore: bool,
    request_timeout: Duration,
}

impl Default for RequestHandler {
    fn default() -> Self {
        Self::new(false)
    }
}

impl RequestHandler {
    pub fn new(override_on_ignore: bool) -> Self {
        Self {
            override_on_ignore,
            request_timeout: Duration::from_millis(u64::from(HttpConfig::default().io_timeout_ms)),
        }
    }

    /// Deadline for reading the request, and again for writing the reply.
    pub fn with_request_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.request_timeout = Duration::from_millis(u64::from(timeout_ms));
        self
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Serve one connection to completion.  `conn` is closed on return.
    pub fn handle<C, S, T>(
        &self,
        conn: C,
        sensor: &mut S,
        ignore: &IgnoreController<T>,
        now_ms: u32,
    ) -> RequestOutcome
    where
        C: Connection,
        S: TemperaturePort,
        T: OneShotTimer,
    {
        let mut reader = BufReader::new(DeadlineStream::new(conn, self.request_timeout));

        let ctx = match ConnectionContext::read_from(&mut reader) {
            Ok(ctx) => ctx,
            Err(e) => {
                warn!("Handler: request read failed ({})", e);
                return RequestOutcome::TransportFault(TransportFault::from_io(
                    TransportOp::Read,
                    &e,
                ));
            }
        };

        match ctx.route {
            Route::Reset => ignore.reset(Trigger::Remote),
            Route::Ignore => ignore.activate(now_ms, Trigger::Remote),
            Route::Reading => {}
        }

        let response = self.build_response(sensor, ignore);
        let success = response.success;

        let mut conn = reader.into_inner();
        conn.restart(self.request_timeout);
        if let Err(e) = write_response(&mut conn, &response) {
            warn!("Handler: response write failed ({})", e);
            return RequestOutcome::TransportFault(TransportFault::from_io(TransportOp::Write, &e));
        }

        RequestOutcome::Served {
            route: ctx.route,
            success,
        }
    }

    fn build_response<S, T>(&self, sensor: &mut S, ignore: &IgnoreController<T>) -> ReadingResponse
    where
        S: TemperaturePort,
        T: OneShotTimer,
    {
        match sensor.read() {
            Ok(reading) => {
                let ignoring = ignore.is_active();
                let reading = if ignoring && self.override_on_ignore {
                    reading.with_objects_as_ambient()
                } else {
                    reading
                };
                ReadingResponse::reading(&reading, ignoring)
            }
            Err(fault) => ReadingResponse::fault(fault),
        }
    }
}

fn write_response<W: Write>(conn: &mut W, response: &ReadingResponse) -> std::io::Result<()> {
    let body = serde_json::to_vec(response).map_err(|e| std::io::Error::other(e.to_string()))?;
    conn.write_all(RESPONSE_HEAD)?;
    conn.write_all(&body)?;
    conn.flush()
}
