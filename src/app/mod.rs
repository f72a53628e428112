//! Application core: pure domain logic, zero I/O.
//!
//! Ignore-mode state machine, request handling and the supervisor loop.
//! All interaction with hardware happens through **port traits** defined
//! in [`ports`], keeping this layer fully testable without real peripherals.

pub mod events;
pub mod handler;
pub mod ignore;
pub mod ports;
pub mod supervisor;
