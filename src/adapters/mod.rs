//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter         | Implements       | Connects to              |
//! |-----------------|------------------|--------------------------|
//! | `config_file`   | ConfigPort       | SPIFFS / host filesystem |
//! | `http_listener` | Listener         | lwIP / host TCP          |
//! | `log_sink`      | EventSink        | Serial log output        |
//! | `system`        | ResetPort        | esp_restart              |
//! | `time`          | ClockPort        | ESP32 system timer       |
//! | `wifi`          | ConnectivityPort | ESP-IDF WiFi STA         |
//!
//! The sensor, watchdog, LED and expiry timer ports are implemented next
//! to their drivers (`sensors`, `drivers`).

pub mod config_file;
pub mod http_listener;
pub mod log_sink;
pub mod system;
pub mod time;
pub mod wifi;
