//! Outbound application events.
//!
//! The [`Supervisor`](super::supervisor::Supervisor) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them (serial log today).

use crate::app::handler::Route;
use crate::app::supervisor::SupervisorState;
use crate::error::{Error, TransportFault};

/// Structured events emitted by the application core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppEvent {
    /// The supervisor moved between lifecycle states.
    StateChanged {
        from: SupervisorState,
        to: SupervisorState,
    },

    /// The station joined the network after `polls` status checks.
    LinkUp { polls: u8 },

    /// The listener is accepting connections.
    Started { port: u16 },

    /// One connection was answered.
    RequestServed {
        route: Route,
        success: bool,
        ignore_active: bool,
    },

    /// One connection failed at the socket level and was dropped.
    TransportFault(TransportFault),

    /// Unrecoverable fault; a restart follows after `restart_in_ms`.
    FatalFault { error: Error, restart_in_ms: u32 },
}
