//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (UART / USB-CDC in production), one
//! `TAG | key=value` record per event.

use log::{error, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::StateChanged { from, to } => {
                info!("STATE | {:?} -> {:?}", from, to);
            }
            AppEvent::LinkUp { polls } => {
                info!("LINK  | up after {} polls", polls);
            }
            AppEvent::Started { port } => {
                info!("START | port={}", port);
            }
            AppEvent::RequestServed {
                route,
                success,
                ignore_active,
            } => {
                info!(
                    "REQ   | route={:?} success={} ignore={}",
                    route, success, ignore_active
                );
            }
            AppEvent::TransportFault(fault) => {
                warn!("NET   | {}", fault);
            }
            AppEvent::FatalFault {
                error: err,
                restart_in_ms,
            } => {
                error!("FATAL | {} | restart_in={}ms", err, restart_in_ms);
            }
        }
    }
}
