//! Service supervisor: bootstrap, accept loop, watchdog discipline and the
//! restart policy.
//!
//! ```text
//!  ┌───────────────┐  link Up + bound  ┌─────────┐  link lost  ┌────────────┐
//!  │ Bootstrapping │ ────────────────▶ │ Serving │ ──────────▶ │ FatalFault │
//!  └───────────────┘                   └─────────┘             └────────────┘
//!         │  config / join / bind failure                             │
//!         └───────────────────────────────────────────────────────────┤
//!                                                    delay, no feeding, reset
//! ```
//!
//! Recovery is always a full restart.  Per-request faults (sensor,
//! transport) never leave [`Supervisor::serve_once`].

use log::{error, info, warn};

use crate::app::events::AppEvent;
use crate::app::handler::{RequestHandler, RequestOutcome};
use crate::app::ignore::IgnoreController;
use crate::app::ports::{
    ClockPort, ConfigPort, ConnectivityPort, EventSink, IndicatorPort, LinkStatus, Listener,
    OneShotTimer, ResetPort, TemperaturePort, WatchdogPort,
};
use crate::config::{HttpConfig, SupervisorConfig};
use crate::error::{BootstrapFault, ConnectivityFault, Error};

/// Pause after a failed accept before the next iteration.
pub const ACCEPT_FAULT_BACKOFF_MS: u32 = 100;
/// Consecutive accept failures treated as a dead listener.
pub const ACCEPT_FAULT_LIMIT: u8 = 10;

/// Supervisor lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Bootstrapping,
    Serving,
    FatalFault,
}

// ───────────────────────────────────────────────────────────────
// Feed bookkeeping
// ───────────────────────────────────────────────────────────────

/// Tracks watchdog feed intervals so an over-long iteration shows up in
/// tests instead of as a silent reset.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedTracker {
    budget_ms: u32,
    last_feed_ms: Option<u32>,
    max_gap_ms: u32,
}

impl FeedTracker {
    /// Start tracking against a watchdog timeout of `budget_ms`.
    pub fn start(&mut self, budget_ms: u32, now_ms: u32) {
        self.budget_ms = budget_ms;
        self.last_feed_ms = Some(now_ms);
        self.max_gap_ms = 0;
    }

    pub fn record_feed(&mut self, now_ms: u32) {
        if let Some(last) = self.last_feed_ms {
            self.max_gap_ms = self.max_gap_ms.max(now_ms.wrapping_sub(last));
        }
        self.last_feed_ms = Some(now_ms);
    }

    /// Zero until tracking starts.
    pub fn since_last_feed_ms(&self, now_ms: u32) -> u32 {
        self.last_feed_ms.map_or(0, |last| now_ms.wrapping_sub(last))
    }

    pub fn max_feed_gap_ms(&self) -> u32 {
        self.max_gap_ms
    }

    /// True once any observed gap reached the watchdog timeout.
    pub fn feed_budget_exceeded(&self) -> bool {
        self.budget_ms > 0 && self.max_gap_ms >= self.budget_ms
    }
}

// ───────────────────────────────────────────────────────────────
// Supervisor
// ───────────────────────────────────────────────────────────────

/// Owns every main-loop peripheral.  The ignore controller is shared with
/// interrupt context and therefore only borrowed.
pub struct Supervisor<'a, S, N, L, W, I, C, E, T> {
    sensor: S,
    net: N,
    listener: L,
    watchdog: W,
    led: I,
    clock: C,
    sink: E,
    ignore: &'a IgnoreController<T>,
    state: SupervisorState,
    http: HttpConfig,
    tuning: SupervisorConfig,
    handler: RequestHandler,
    feeds: FeedTracker,
    accept_faults: u8,
}

impl<'a, S, N, L, W, I, C, E, T> Supervisor<'a, S, N, L, W, I, C, E, T>
where
    S: TemperaturePort,
    N: ConnectivityPort,
    L: Listener,
    W: WatchdogPort,
    I: IndicatorPort,
    C: ClockPort,
    E: EventSink,
    T: OneShotTimer,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sensor: S,
        net: N,
        listener: L,
        watchdog: W,
        led: I,
        clock: C,
        sink: E,
        ignore: &'a IgnoreController<T>,
    ) -> Self {
        Self {
            sensor,
            net,
            listener,
            watchdog,
            led,
            clock,
            sink,
            ignore,
            state: SupervisorState::Bootstrapping,
            http: HttpConfig::default(),
            tuning: SupervisorConfig::default(),
            handler: RequestHandler::default(),
            feeds: FeedTracker::default(),
            accept_faults: 0,
        }
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    pub fn feed_tracker(&self) -> &FeedTracker {
        &self.feeds
    }

    pub fn since_last_feed_ms(&self) -> u32 {
        self.feeds.since_last_feed_ms(self.clock.now_ms())
    }

    pub fn max_feed_gap_ms(&self) -> u32 {
        self.feeds.max_feed_gap_ms()
    }

    pub fn feed_budget_exceeded(&self) -> bool {
        self.feeds.feed_budget_exceeded()
    }

    /// Accept failures since the last successful or empty accept.
    pub fn consecutive_accept_faults(&self) -> u8 {
        self.accept_faults
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Load config, join the network, bind the listener.  On success the
    /// supervisor is `Serving`.
    pub fn bootstrap(&mut self, config: &impl ConfigPort) -> Result<(), Error> {
        self.transition(SupervisorState::Bootstrapping);
        self.accept_faults = 0;

        let config = config.load().map_err(BootstrapFault::Config)?;
        self.http = config.http.clone();
        self.tuning = config.supervisor.clone();
        self.handler = RequestHandler::new(config.ignore.override_on_ignore)
            .with_request_timeout_ms(self.http.io_timeout_ms);
        self.ignore.set_duration_ms(config.ignore.duration_ms());

        info!("Supervisor: joining '{}'", config.wifi.ssid);
        self.net
            .begin_connect(&config.wifi)
            .map_err(BootstrapFault::Join)?;

        self.watchdog.arm(self.tuning.watchdog_timeout_ms);
        self.feeds
            .start(self.tuning.watchdog_timeout_ms, self.clock.now_ms());

        let (status, polls) = self.await_link();
        if status != LinkStatus::Up {
            return Err(BootstrapFault::JoinTimeout(status).into());
        }
        self.sink.emit(&AppEvent::LinkUp { polls });

        self.listener
            .listen(self.http.port, self.http.io_timeout_ms)
            .map_err(BootstrapFault::Listen)?;
        self.sink.emit(&AppEvent::Started {
            port: self.http.port,
        });

        self.feed();
        self.transition(SupervisorState::Serving);
        Ok(())
    }

    /// Poll link status until `Up`/`Failed` or the budget runs out.
    fn await_link(&mut self) -> (LinkStatus, u8) {
        let mut status = self.net.status();
        let mut polls = 1;
        while polls < self.tuning.connect_poll_budget
            && !matches!(status, LinkStatus::Up | LinkStatus::Failed)
        {
            self.feed();
            self.clock.delay_ms(self.tuning.connect_poll_interval_ms);
            status = self.net.status();
            polls += 1;
        }
        (status, polls)
    }

    /// One loop iteration: feed, check the link, serve at most one client.
    ///
    /// Only fatal errors are returned.  A failed accept backs off briefly;
    /// [`ACCEPT_FAULT_LIMIT`] failures in a row are fatal.
    pub fn serve_once(&mut self) -> Result<(), Error> {
        self.feed();

        let status = self.net.status();
        if status != LinkStatus::Up {
            return Err(ConnectivityFault::LinkLost(status).into());
        }

        let accepted = self.listener.accept(self.http.accept_timeout_ms);
        let conn = match accepted {
            Ok(Some(conn)) => conn,
            Ok(None) => {
                self.accept_faults = 0;
                return Ok(());
            }
            Err(fault) => {
                warn!("Supervisor: {}", fault);
                self.sink.emit(&AppEvent::TransportFault(fault));
                self.accept_faults = self.accept_faults.saturating_add(1);
                if self.accept_faults >= ACCEPT_FAULT_LIMIT {
                    return Err(ConnectivityFault::ListenerFailed(fault).into());
                }
                self.clock.delay_ms(ACCEPT_FAULT_BACKOFF_MS);
                return Ok(());
            }
        };
        self.accept_faults = 0;

        self.led.set_active(true);
        let outcome = self
            .handler
            .handle(conn, &mut self.sensor, self.ignore, self.clock.now_ms());
        self.led.set_active(false);
        self.feed();

        match outcome {
            RequestOutcome::Served { route, success } => {
                self.sink.emit(&AppEvent::RequestServed {
                    route,
                    success,
                    ignore_active: self.ignore.is_active(),
                });
            }
            RequestOutcome::TransportFault(fault) => {
                self.sink.emit(&AppEvent::TransportFault(fault));
            }
        }
        Ok(())
    }

    /// Bootstrap, then serve until something fatal happens.
    pub fn run_until_fault(&mut self, config: &impl ConfigPort) -> Error {
        if let Err(e) = self.bootstrap(config) {
            return e;
        }
        loop {
            if let Err(e) = self.serve_once() {
                return e;
            }
        }
    }

    /// Log, stop feeding the watchdog, wait, then reset the device.
    ///
    /// Returns only where `ResetPort::reset` returns (host builds).
    pub fn enter_fatal_fault(&mut self, err: &Error, reset: &mut impl ResetPort) {
        self.transition(SupervisorState::FatalFault);
        let restart_in_ms = self.tuning.restart_delay_ms;
        error!("Supervisor: {} (restart in {} ms)", err, restart_in_ms);
        self.sink.emit(&AppEvent::FatalFault {
            error: *err,
            restart_in_ms,
        });
        self.led.set_active(false);
        self.clock.delay_ms(restart_in_ms);
        reset.reset();
    }

    /// Firmware entry loop.  Never returns.
    pub fn run(&mut self, config: &impl ConfigPort, reset: &mut impl ResetPort) -> ! {
        loop {
            let err = self.run_until_fault(config);
            self.enter_fatal_fault(&err, reset);
        }
    }

    // ── Internals ─────────────────────────────────────────────

    fn feed(&mut self) {
        self.watchdog.feed();
        self.feeds.record_feed(self.clock.now_ms());
    }

    fn transition(&mut self, to: SupervisorState) {
        let from = self.state;
        if from != to {
            self.state = to;
            info!("Supervisor: {:?} -> {:?}", from, to);
            self.sink.emit(&AppEvent::StateChanged { from, to });
        }
    }
}
