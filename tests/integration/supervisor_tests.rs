//! Supervisor lifecycle against mock peripherals: bootstrap outcomes,
//! the serve loop, watchdog discipline and the restart path.

use std::io::{Read, Write};
use std::net::{Ipv4Addr, TcpListener, TcpStream};

use irthermo::adapters::http_listener::TcpHttpListener;
use irthermo::app::events::AppEvent;
use irthermo::app::handler::Route;
use irthermo::app::ports::{ConfigError, ConnectivityError, LinkStatus};
use irthermo::app::supervisor::{
    ACCEPT_FAULT_BACKOFF_MS, ACCEPT_FAULT_LIMIT, Supervisor, SupervisorState,
};
use irthermo::drivers::button::on_button_interrupt;
use irthermo::error::{BootstrapFault, ConnectivityFault, Error, TransportFault, TransportOp};

use crate::mock_hw::{
    lab_config, CountingReset, MockNet, MockSensor, MockTimer, Rig, StaticConfig,
};

// ── Bootstrap ─────────────────────────────────────────────────

#[test]
fn bootstrap_reaches_serving() {
    let rig = Rig::new();
    let ignore = rig.ignore_controller();
    let mut sup = rig.supervisor(&ignore);

    sup.bootstrap(&StaticConfig::lab()).unwrap();

    assert_eq!(sup.state(), SupervisorState::Serving);
    assert_eq!(rig.watchdog.armed(), Some(30_000));
    assert_eq!(rig.listener.bound(), Some((80, 5_000)));
    assert_eq!(rig.net.joins(), 1);
    assert_eq!(
        rig.sink.events(),
        vec![
            AppEvent::LinkUp { polls: 1 },
            AppEvent::Started { port: 80 },
            AppEvent::StateChanged {
                from: SupervisorState::Bootstrapping,
                to: SupervisorState::Serving,
            },
        ]
    );
}

#[test]
fn bootstrap_applies_ignore_window_from_config() {
    let rig = Rig::new();
    let ignore = rig.ignore_controller();
    let mut sup = rig.supervisor(&ignore);
    let mut config = lab_config();
    config.ignore.duration_secs = 60;

    sup.bootstrap(&StaticConfig(Ok(config))).unwrap();

    assert_eq!(ignore.duration_ms(), 60_000);
}

#[test]
fn missing_config_is_a_bootstrap_fault() {
    let rig = Rig::new();
    let ignore = rig.ignore_controller();
    let mut sup = rig.supervisor(&ignore);

    let err = sup
        .bootstrap(&StaticConfig(Err(ConfigError::NotFound)))
        .unwrap_err();

    assert_eq!(err, Error::Bootstrap(BootstrapFault::Config(ConfigError::NotFound)));
    assert!(err.is_fatal());
    assert_eq!(rig.net.joins(), 0);
    assert_eq!(rig.watchdog.armed(), None);
    assert_eq!(sup.state(), SupervisorState::Bootstrapping);
}

#[test]
fn rejected_join_is_a_bootstrap_fault() {
    let rig = Rig::new();
    rig.net.fail_join(ConnectivityError::DriverFailed);
    let ignore = rig.ignore_controller();
    let mut sup = rig.supervisor(&ignore);

    let err = sup.bootstrap(&StaticConfig::lab()).unwrap_err();

    assert_eq!(
        err,
        Error::Bootstrap(BootstrapFault::Join(ConnectivityError::DriverFailed))
    );
    assert_eq!(rig.listener.bound(), None);
}

#[test]
fn link_that_never_comes_up_times_out_after_poll_budget() {
    let mut rig = Rig::new();
    rig.net = MockNet::scripted(&[], LinkStatus::Connecting);
    let ignore = rig.ignore_controller();
    let mut sup = rig.supervisor(&ignore);

    let err = sup.bootstrap(&StaticConfig::lab()).unwrap_err();

    assert_eq!(
        err,
        Error::Bootstrap(BootstrapFault::JoinTimeout(LinkStatus::Connecting))
    );
    assert_eq!(rig.net.polls(), 10);
    assert_eq!(rig.clock.delays(), vec![1_000; 9]);
    // Fed between polls so a slow join cannot trip the watchdog.
    assert_eq!(rig.watchdog.feeds(), 9);
    assert!(!sup.feed_budget_exceeded());
    assert_eq!(rig.listener.bound(), None);
}

#[test]
fn failed_link_stops_polling_early() {
    let mut rig = Rig::new();
    rig.net = MockNet::scripted(
        &[LinkStatus::Connecting, LinkStatus::Failed],
        LinkStatus::Connecting,
    );
    let ignore = rig.ignore_controller();
    let mut sup = rig.supervisor(&ignore);

    let err = sup.bootstrap(&StaticConfig::lab()).unwrap_err();

    assert_eq!(
        err,
        Error::Bootstrap(BootstrapFault::JoinTimeout(LinkStatus::Failed))
    );
    assert_eq!(rig.net.polls(), 2);
    assert_eq!(rig.clock.delays(), vec![1_000]);
}

#[test]
fn link_coming_up_late_is_reported_with_poll_count() {
    let mut rig = Rig::new();
    rig.net = MockNet::scripted(
        &[LinkStatus::Down, LinkStatus::Connecting, LinkStatus::Connecting],
        LinkStatus::Up,
    );
    let ignore = rig.ignore_controller();
    let mut sup = rig.supervisor(&ignore);

    sup.bootstrap(&StaticConfig::lab()).unwrap();

    assert_eq!(rig.sink.events()[0], AppEvent::LinkUp { polls: 4 });
}

#[test]
fn bind_failure_is_a_bootstrap_fault() {
    let rig = Rig::new();
    let fault = TransportFault::new(TransportOp::Bind, std::io::ErrorKind::AddrInUse);
    rig.listener.fail_bind(fault);
    let ignore = rig.ignore_controller();
    let mut sup = rig.supervisor(&ignore);

    let err = sup.bootstrap(&StaticConfig::lab()).unwrap_err();

    assert_eq!(err, Error::Bootstrap(BootstrapFault::Listen(fault)));
    assert_ne!(sup.state(), SupervisorState::Serving);
}

// ── Serving ───────────────────────────────────────────────────

#[test]
fn serves_one_client_per_iteration() {
    let rig = Rig::new();
    let ignore = rig.ignore_controller();
    let mut sup = rig.supervisor(&ignore);
    sup.bootstrap(&StaticConfig::lab()).unwrap();
    let client = rig.listener.push_client(b"GET / HTTP/1.1\r\n\r\n");
    let feeds_before = rig.watchdog.feeds();

    sup.serve_once().unwrap();

    assert_eq!(rig.led.history(), vec![true, false]);
    assert_eq!(rig.watchdog.feeds(), feeds_before + 2);
    assert_eq!(rig.listener.accept_timeouts(), vec![5_000]);
    assert_eq!(rig.sensor.reads(), 1);
    assert!(client.dropped());
    assert_eq!(client.json()["success"], true);
    assert_eq!(
        rig.sink.events().last(),
        Some(&AppEvent::RequestServed {
            route: Route::Reading,
            success: true,
            ignore_active: false,
        })
    );
}

#[test]
fn idle_iteration_only_feeds() {
    let rig = Rig::new();
    let ignore = rig.ignore_controller();
    let mut sup = rig.supervisor(&ignore);
    sup.bootstrap(&StaticConfig::lab()).unwrap();
    let events_before = rig.sink.events().len();

    sup.serve_once().unwrap();

    assert!(rig.led.history().is_empty());
    assert_eq!(rig.sensor.reads(), 0);
    assert_eq!(rig.sink.events().len(), events_before);
}

#[test]
fn sensor_fault_does_not_stop_serving() {
    let rig = Rig::new();
    rig.sensor.set_raw(None);
    let ignore = rig.ignore_controller();
    let mut sup = rig.supervisor(&ignore);
    sup.bootstrap(&StaticConfig::lab()).unwrap();
    let client = rig.listener.push_client(b"GET / HTTP/1.1\r\n\r\n");

    sup.serve_once().unwrap();

    assert_eq!(client.json()["success"], false);
    assert_eq!(sup.state(), SupervisorState::Serving);

    rig.sensor.set_raw(Some((30_000, 29_800, 29_900)));
    let client = rig.listener.push_client(b"GET / HTTP/1.1\r\n\r\n");
    sup.serve_once().unwrap();
    assert_eq!(client.json()["success"], true);
}

#[test]
fn accept_fault_is_logged_and_serving_continues() {
    let rig = Rig::new();
    let ignore = rig.ignore_controller();
    let mut sup = rig.supervisor(&ignore);
    sup.bootstrap(&StaticConfig::lab()).unwrap();
    let fault = TransportFault::new(TransportOp::Accept, std::io::ErrorKind::ConnectionReset);
    rig.listener.push_fault(fault);

    sup.serve_once().unwrap();

    assert_eq!(sup.state(), SupervisorState::Serving);
    assert_eq!(rig.sink.events().last(), Some(&AppEvent::TransportFault(fault)));

    let client = rig.listener.push_client(b"GET / HTTP/1.1\r\n\r\n");
    sup.serve_once().unwrap();
    assert!(client.dropped());
}

#[test]
fn accept_faults_back_off_then_escalate() {
    let rig = Rig::new();
    let ignore = rig.ignore_controller();
    let mut sup = rig.supervisor(&ignore);
    sup.bootstrap(&StaticConfig::lab()).unwrap();
    let fault = TransportFault::new(TransportOp::Accept, std::io::ErrorKind::OutOfMemory);
    for _ in 0..ACCEPT_FAULT_LIMIT {
        rig.listener.push_fault(fault);
    }

    for n in 1..ACCEPT_FAULT_LIMIT {
        sup.serve_once().unwrap();
        assert_eq!(sup.consecutive_accept_faults(), n);
    }
    assert_eq!(
        rig.clock.delays(),
        vec![ACCEPT_FAULT_BACKOFF_MS; usize::from(ACCEPT_FAULT_LIMIT - 1)]
    );

    let err = sup.serve_once().unwrap_err();
    assert_eq!(
        err,
        Error::Connectivity(ConnectivityFault::ListenerFailed(fault))
    );
    assert!(err.is_fatal());
}

#[test]
fn successful_accept_clears_fault_streak() {
    let rig = Rig::new();
    let ignore = rig.ignore_controller();
    let mut sup = rig.supervisor(&ignore);
    sup.bootstrap(&StaticConfig::lab()).unwrap();
    let fault = TransportFault::new(TransportOp::Accept, std::io::ErrorKind::OutOfMemory);
    for _ in 0..ACCEPT_FAULT_LIMIT - 1 {
        rig.listener.push_fault(fault);
    }
    rig.listener.push_client(b"GET / HTTP/1.1\r\n\r\n");
    rig.listener.push_fault(fault);

    for _ in 0..=ACCEPT_FAULT_LIMIT {
        sup.serve_once().unwrap();
    }

    assert_eq!(sup.consecutive_accept_faults(), 1);
    assert_eq!(sup.state(), SupervisorState::Serving);
}

#[test]
fn lost_link_is_fatal() {
    let rig = Rig::new();
    let ignore = rig.ignore_controller();
    let mut sup = rig.supervisor(&ignore);
    sup.bootstrap(&StaticConfig::lab()).unwrap();
    rig.net.set_steady(LinkStatus::Down);
    let client = rig.listener.push_client(b"GET / HTTP/1.1\r\n\r\n");

    let err = sup.serve_once().unwrap_err();

    assert_eq!(
        err,
        Error::Connectivity(ConnectivityFault::LinkLost(LinkStatus::Down))
    );
    assert!(err.is_fatal());
    // The queued client was never accepted.
    assert!(rig.listener.accept_timeouts().is_empty());
    assert!(!client.dropped());
}

#[test]
fn ignore_route_is_reflected_in_served_event() {
    let rig = Rig::new();
    let ignore = rig.ignore_controller();
    let mut sup = rig.supervisor(&ignore);
    sup.bootstrap(&StaticConfig::lab()).unwrap();
    rig.listener.push_client(b"GET /ignore HTTP/1.1\r\n\r\n");

    sup.serve_once().unwrap();

    assert!(ignore.is_active());
    assert_eq!(
        rig.sink.events().last(),
        Some(&AppEvent::RequestServed {
            route: Route::Ignore,
            success: true,
            ignore_active: true,
        })
    );
}

#[test]
fn button_long_press_between_requests_sets_ignore_state() {
    let rig = Rig::new();
    let ignore = rig.ignore_controller();
    let mut sup = rig.supervisor(&ignore);
    sup.bootstrap(&StaticConfig::lab()).unwrap();

    let t0 = rig.clock.now();
    on_button_interrupt(&ignore, false, t0);
    rig.clock.advance(2_500);
    on_button_interrupt(&ignore, true, rig.clock.now());

    let client = rig.listener.push_client(b"GET / HTTP/1.1\r\n\r\n");
    sup.serve_once().unwrap();
    assert_eq!(client.json()["ignore_state"], true);

    rig.clock.advance(900_000);
    assert!(MockTimer::fire_if_due(&ignore));
    let client = rig.listener.push_client(b"GET / HTTP/1.1\r\n\r\n");
    sup.serve_once().unwrap();
    assert_eq!(client.json()["ignore_state"], false);
}

// ── Watchdog discipline ───────────────────────────────────────

#[test]
fn normal_iterations_stay_within_feed_budget() {
    let mut rig = Rig::new();
    rig.sensor = MockSensor::new(30_000, 29_800, 29_900).slow(&rig.clock, 200);
    let ignore = rig.ignore_controller();
    let mut sup = rig.supervisor(&ignore);
    sup.bootstrap(&StaticConfig::lab()).unwrap();

    for _ in 0..5 {
        rig.listener.push_client(b"GET / HTTP/1.1\r\n\r\n");
        sup.serve_once().unwrap();
    }

    assert_eq!(sup.max_feed_gap_ms(), 200);
    assert!(!sup.feed_budget_exceeded());
    assert_eq!(sup.since_last_feed_ms(), 0);
}

#[test]
fn stalled_request_exceeds_feed_budget() {
    let mut rig = Rig::new();
    rig.sensor = MockSensor::new(30_000, 29_800, 29_900).slow(&rig.clock, 31_000);
    let ignore = rig.ignore_controller();
    let mut sup = rig.supervisor(&ignore);
    sup.bootstrap(&StaticConfig::lab()).unwrap();
    rig.listener.push_client(b"GET / HTTP/1.1\r\n\r\n");

    sup.serve_once().unwrap();

    assert_eq!(sup.max_feed_gap_ms(), 31_000);
    assert!(sup.feed_budget_exceeded());
}

// ── Fatal path ────────────────────────────────────────────────

#[test]
fn fatal_fault_waits_without_feeding_then_resets() {
    let mut rig = Rig::new();
    rig.net = MockNet::scripted(
        &[LinkStatus::Up, LinkStatus::Up, LinkStatus::Down],
        LinkStatus::Down,
    );
    let ignore = rig.ignore_controller();
    let mut sup = rig.supervisor(&ignore);
    let mut reset = CountingReset::default();

    let err = sup.run_until_fault(&StaticConfig::lab());
    assert_eq!(
        err,
        Error::Connectivity(ConnectivityFault::LinkLost(LinkStatus::Down))
    );

    let feeds_before = rig.watchdog.feeds();
    sup.enter_fatal_fault(&err, &mut reset);

    assert_eq!(reset.count, 1);
    assert_eq!(sup.state(), SupervisorState::FatalFault);
    assert_eq!(rig.watchdog.feeds(), feeds_before);
    assert_eq!(rig.clock.delays().last(), Some(&10_000));
    assert_eq!(rig.led.history().last(), Some(&false));
    assert_eq!(sup.since_last_feed_ms(), 10_000);

    let events = rig.sink.events();
    let tail = &events[events.len() - 2..];
    assert_eq!(
        tail,
        [
            AppEvent::StateChanged {
                from: SupervisorState::Serving,
                to: SupervisorState::FatalFault,
            },
            AppEvent::FatalFault {
                error: err,
                restart_in_ms: 10_000,
            },
        ]
    );
}

#[test]
fn bootstrap_fault_surfaces_from_run_until_fault() {
    let rig = Rig::new();
    let ignore = rig.ignore_controller();
    let mut sup = rig.supervisor(&ignore);

    let err = sup.run_until_fault(&StaticConfig(Err(ConfigError::Corrupted)));

    assert_eq!(err, Error::Bootstrap(BootstrapFault::Config(ConfigError::Corrupted)));
}

#[test]
fn restart_after_fault_bootstraps_again() {
    let mut rig = Rig::new();
    rig.net = MockNet::scripted(&[LinkStatus::Up, LinkStatus::Down], LinkStatus::Up);
    let ignore = rig.ignore_controller();
    let mut sup = rig.supervisor(&ignore);
    let mut reset = CountingReset::default();

    let err = sup.run_until_fault(&StaticConfig::lab());
    sup.enter_fatal_fault(&err, &mut reset);

    sup.bootstrap(&StaticConfig::lab()).unwrap();

    assert_eq!(sup.state(), SupervisorState::Serving);
    assert_eq!(rig.net.joins(), 2);
    assert!(rig.sink.events().contains(&AppEvent::StateChanged {
        from: SupervisorState::FatalFault,
        to: SupervisorState::Bootstrapping,
    }));
}

// ── Real sockets ──────────────────────────────────────────────

fn free_port() -> u16 {
    let probe = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    probe.local_addr().unwrap().port()
}

#[test]
fn loopback_client_gets_json_reading() {
    let rig = Rig::new();
    let ignore = rig.ignore_controller();
    let mut sup = Supervisor::new(
        rig.sensor.clone(),
        rig.net.clone(),
        TcpHttpListener::new(),
        rig.watchdog.clone(),
        rig.led.clone(),
        rig.clock.clone(),
        rig.sink.clone(),
        &ignore,
    );
    let port = free_port();
    let mut config = lab_config();
    config.http.port = port;
    config.http.accept_timeout_ms = 200;
    sup.bootstrap(&StaticConfig(Ok(config))).unwrap();

    let client = std::thread::spawn(move || {
        let mut stream = TcpStream::connect((Ipv4Addr::LOCALHOST, port)).unwrap();
        stream
            .write_all(b"GET /ignore HTTP/1.1\r\nHost: thermo\r\n\r\n")
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        response
    });

    let served = |events: &[AppEvent]| {
        events
            .iter()
            .any(|e| matches!(e, AppEvent::RequestServed { .. }))
    };
    for _ in 0..50 {
        sup.serve_once().unwrap();
        if served(&rig.sink.events()) {
            break;
        }
    }

    let response = client.join().unwrap();
    let (head, body) = response.split_once("\r\n\r\n").unwrap();
    assert_eq!(head, "HTTP/1.0 200 OK\r\nContent-type: application/json");
    let json: serde_json::Value = serde_json::from_str(body).unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["ignore_state"], true);
    let avg = json["object_temperature_avg"].as_f64().unwrap();
    assert!((avg - 323.85).abs() < 1e-9);
    let ambient = json["ambient_temperature"].as_f64().unwrap();
    assert!((ambient - 326.85).abs() < 1e-9);
}
