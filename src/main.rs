//! IRThermo firmware entry point
//!
//! Hexagonal architecture: a single supervisor loop owns every main-loop
//! peripheral; the button ISR and the expiry timer share the static
//! ignore-mode controller.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  Mlx90614       WifiStation      TcpHttpListener  SystemClock  │
//! │  (Temperature)  (Connectivity)   (Listener)       (Clock)      │
//! │  TaskWatchdog   ActivityLed      FileConfigStore  LogEventSink │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │   Supervisor ─▶ RequestHandler ─▶ IgnoreController     │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                ▲                ▲              │
//! │                        button ISR     esp_timer expiry         │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use log::{error, info};

use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::units::Hertz;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::EspWifi;

use irthermo::adapters::config_file::FileConfigStore;
use irthermo::adapters::http_listener::TcpHttpListener;
use irthermo::adapters::log_sink::LogEventSink;
use irthermo::adapters::system::SystemReset;
use irthermo::adapters::time::SystemClock;
use irthermo::adapters::wifi::WifiStation;
use irthermo::app::ignore::IgnoreController;
use irthermo::app::ports::{ClockPort, ResetPort};
use irthermo::app::supervisor::Supervisor;
use irthermo::config::{DEFAULT_IGNORE_DURATION_SECS, SupervisorConfig};
use irthermo::drivers::hw_init;
use irthermo::drivers::hw_timer::IgnoreExpiryTimer;
use irthermo::drivers::status_led::{ActivityLed, GpioOutput};
use irthermo::drivers::watchdog::TaskWatchdog;
use irthermo::pins;
use irthermo::sensors::mlx90614::Mlx90614;

/// Shared with the button ISR and the expiry timer callback.  The window
/// length is replaced from config during bootstrap.
static IGNORE_MODE: IgnoreController<IgnoreExpiryTimer> =
    IgnoreController::new(IgnoreExpiryTimer::new(), DEFAULT_IGNORE_DURATION_SECS * 1_000);

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("IRThermo v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Board bring-up ─────────────────────────────────────
    // Failures here are as fatal as a bootstrap fault: wait, then restart.
    if let Err(e) = bring_up() {
        error!("Boot: {:#}", e);
        SystemClock::new().delay_ms(SupervisorConfig::default().restart_delay_ms);
        SystemReset::new().reset();
    }

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    // I2C0 on SDA=GPIO14, SCL=GPIO15.
    let i2c_config = I2cConfig::new().baudrate(Hertz(pins::I2C_FREQ_HZ));
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio14,
        peripherals.pins.gpio15,
        &i2c_config,
    )?;
    let sensor = Mlx90614::new(i2c);

    let wifi = EspWifi::new(peripherals.modem, sysloop, Some(nvs))?;

    // ── 3. Supervisor ─────────────────────────────────────────
    let mut supervisor = Supervisor::new(
        sensor,
        WifiStation::new(wifi),
        TcpHttpListener::new(),
        TaskWatchdog::new(),
        ActivityLed::new(GpioOutput::new(pins::ACTIVITY_LED_GPIO)),
        SystemClock::new(),
        LogEventSink::new(),
        &IGNORE_MODE,
    );

    info!("Boot: entering supervisor");
    supervisor.run(&FileConfigStore::default(), &mut SystemReset::new())
}

/// GPIO, expiry timer, button ISR, config filesystem.
fn bring_up() -> Result<()> {
    hw_init::init_peripherals()?;
    IgnoreExpiryTimer::create(&IGNORE_MODE)?;
    hw_init::init_isr_service(&IGNORE_MODE)?;
    hw_init::mount_config_fs()?;
    Ok(())
}
