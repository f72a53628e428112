//! WiFi station-mode adapter.
//!
//! Implements [`ConnectivityPort`], the hexagonal boundary for network
//! connectivity.  The join is non-blocking: [`begin_connect`] configures
//! and starts the station, and the supervisor polls [`status`] against its
//! own budget.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real ESP-IDF WiFi driver via `esp_idf_svc::wifi`.
//! - **all other targets**: simulation stub for host-side runs.
//!
//! [`begin_connect`]: ConnectivityPort::begin_connect
//! [`status`]: ConnectivityPort::status

use log::info;

use crate::app::ports::{ConnectivityError, ConnectivityPort, LinkStatus};
use crate::config::WifiConfig;

// ───────────────────────────────────────────────────────────────
// ESP-IDF station
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
use esp_idf_svc::wifi::{AuthMethod, ClientConfiguration, Configuration, EspWifi};

#[cfg(target_os = "espidf")]
pub struct WifiStation {
    wifi: EspWifi<'static>,
}

#[cfg(target_os = "espidf")]
impl WifiStation {
    pub fn new(wifi: EspWifi<'static>) -> Self {
        Self { wifi }
    }
}

#[cfg(target_os = "espidf")]
impl ConnectivityPort for WifiStation {
    fn begin_connect(&mut self, wifi: &WifiConfig) -> Result<(), ConnectivityError> {
        let auth_method = if wifi.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let conf = Configuration::Client(ClientConfiguration {
            ssid: wifi
                .ssid
                .as_str()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidSsid)?,
            password: wifi
                .password
                .as_str()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidPassword)?,
            auth_method,
            ..Default::default()
        });

        let driver_failed = |e: esp_idf_svc::sys::EspError| {
            log::error!("WiFi: driver call failed ({})", e);
            ConnectivityError::DriverFailed
        };
        self.wifi.set_configuration(&conf).map_err(driver_failed)?;
        if !self.wifi.is_started().unwrap_or(false) {
            self.wifi.start().map_err(driver_failed)?;
        }
        self.wifi.connect().map_err(driver_failed)?;
        info!("WiFi: station started, connecting to '{}'", wifi.ssid);
        Ok(())
    }

    fn status(&self) -> LinkStatus {
        if self.wifi.is_up().unwrap_or(false) {
            LinkStatus::Up
        } else if self.wifi.is_connected().unwrap_or(false) {
            LinkStatus::Connecting
        } else {
            LinkStatus::Down
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Simulation
// ───────────────────────────────────────────────────────────────

/// Host stand-in.  Associates instantly; the link can be dropped by hand.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug)]
pub struct WifiStation {
    status: LinkStatus,
}

#[cfg(not(target_os = "espidf"))]
impl Default for WifiStation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(not(target_os = "espidf"))]
impl WifiStation {
    pub fn new() -> Self {
        Self {
            status: LinkStatus::Down,
        }
    }

    /// Force the reported link state.
    pub fn set_status(&mut self, status: LinkStatus) {
        self.status = status;
    }
}

#[cfg(not(target_os = "espidf"))]
impl ConnectivityPort for WifiStation {
    fn begin_connect(&mut self, wifi: &WifiConfig) -> Result<(), ConnectivityError> {
        if wifi.ssid.is_empty() {
            return Err(ConnectivityError::InvalidSsid);
        }
        info!("WiFi(sim): associated with '{}'", wifi.ssid);
        self.status = LinkStatus::Up;
        Ok(())
    }

    fn status(&self) -> LinkStatus {
        self.status
    }
}
