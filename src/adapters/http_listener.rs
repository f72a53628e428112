//! TCP listener adapter.
//!
//! Implements [`Listener`] over `std::net`, which ESP-IDF backs with lwIP,
//! so the same code runs on the board and on the host.  The socket is
//! non-blocking and `accept` polls it until the deadline; accepted streams
//! are switched back to blocking with read/write timeouts so a stalled
//! client cannot hold the loop past the watchdog.

use std::net::{Ipv4Addr, SocketAddr, TcpListener, TcpStream};
use std::time::{Duration, Instant};

use log::info;

use crate::app::ports::Listener;
use crate::error::{TransportFault, TransportOp};

/// Sleep between non-blocking accept attempts.
const ACCEPT_POLL_MS: u64 = 10;

pub struct TcpHttpListener {
    socket: Option<TcpListener>,
    io_timeout: Duration,
}

impl Default for TcpHttpListener {
    fn default() -> Self {
        Self::new()
    }
}

impl TcpHttpListener {
    pub fn new() -> Self {
        Self {
            socket: None,
            io_timeout: Duration::from_secs(5),
        }
    }

    /// Bound address, once listening.  Port 0 binds resolve here.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    fn prepare(&self, stream: &TcpStream) -> std::io::Result<()> {
        stream.set_nonblocking(false)?;
        stream.set_read_timeout(Some(self.io_timeout))?;
        stream.set_write_timeout(Some(self.io_timeout))?;
        Ok(())
    }
}

impl Listener for TcpHttpListener {
    type Conn = TcpStream;

    fn listen(&mut self, port: u16, io_timeout_ms: u32) -> Result<(), TransportFault> {
        self.io_timeout = Duration::from_millis(u64::from(io_timeout_ms));
        let bind = |e: std::io::Error| TransportFault::from_io(TransportOp::Bind, &e);
        let socket = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).map_err(bind)?;
        socket.set_nonblocking(true).map_err(bind)?;
        if let Ok(addr) = socket.local_addr() {
            info!("HTTP: listening on {}", addr);
        }
        self.socket = Some(socket);
        Ok(())
    }

    fn accept(&mut self, timeout_ms: u32) -> Result<Option<TcpStream>, TransportFault> {
        let Some(socket) = self.socket.as_ref() else {
            return Err(TransportFault::new(
                TransportOp::Accept,
                std::io::ErrorKind::NotConnected,
            ));
        };

        let deadline = Instant::now() + Duration::from_millis(u64::from(timeout_ms));
        loop {
            match socket.accept() {
                Ok((stream, peer)) => {
                    self.prepare(&stream)
                        .map_err(|e| TransportFault::from_io(TransportOp::Accept, &e))?;
                    log::debug!("HTTP: client {}", peer);
                    return Ok(Some(stream));
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    if Instant::now() >= deadline {
                        return Ok(None);
                    }
                    std::thread::sleep(Duration::from_millis(ACCEPT_POLL_MS));
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => return Err(TransportFault::from_io(TransportOp::Accept, &e)),
            }
        }
    }
}
