//! One-shot hardware peripheral initialization.
//!
//! Configures the button and LED GPIOs, installs the button ISR and mounts
//! the SPIFFS partition holding `config.json`, using raw ESP-IDF sys calls.
//! Called once from `main()` before the supervisor starts.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
use crate::app::ignore::IgnoreController;
#[cfg(target_os = "espidf")]
use crate::drivers::hw_timer::IgnoreExpiryTimer;
#[cfg(target_os = "espidf")]
use crate::pins;

/// Mount point of the config partition.
pub const CONFIG_FS_BASE: &str = "/spiffs";

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    IsrInstallFailed(i32),
    IsrAttachFailed(i32),
    TimerCreateFailed(i32),
    SpiffsMountFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc)  => write!(f, "GPIO config failed (rc={})", rc),
            Self::IsrInstallFailed(rc)  => write!(f, "GPIO ISR service install failed (rc={})", rc),
            Self::IsrAttachFailed(rc)   => write!(f, "button ISR attach failed (rc={})", rc),
            Self::TimerCreateFailed(rc) => write!(f, "esp_timer create failed (rc={})", rc),
            Self::SpiffsMountFailed(rc) => write!(f, "SPIFFS mount failed (rc={})", rc),
        }
    }
}

impl std::error::Error for HwInitError {}

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before the supervisor; single-threaded.
    unsafe {
        init_button_input()?;
        init_led_output()?;
    }
    info!("hw_init: GPIO configured (button={}, led={})", pins::BUTTON_GPIO, pins::ACTIVITY_LED_GPIO);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── GPIO ──────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_button_input() -> Result<(), HwInitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pins::BUTTON_GPIO,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_ANYEDGE,
    };
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 { return Err(HwInitError::GpioConfigFailed(ret)); }
    Ok(())
}

#[cfg(target_os = "espidf")]
unsafe fn init_led_output() -> Result<(), HwInitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pins::ACTIVITY_LED_GPIO,
        mode: gpio_mode_t_GPIO_MODE_OUTPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 { return Err(HwInitError::GpioConfigFailed(ret)); }
    unsafe { gpio_set_level(pins::ACTIVITY_LED_GPIO, 0) };
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) {
    // SAFETY: gpio_set_level writes to an already-configured output pin.
    // Main-loop only.
    unsafe { gpio_set_level(pin, if high { 1 } else { 0 }); }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_pin: i32, _high: bool) {}

// ── GPIO ISR Service ──────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe extern "C" fn button_gpio_isr(arg: *mut core::ffi::c_void) {
    // SAFETY: `arg` is the `&'static IgnoreController` passed to
    // gpio_isr_handler_add below.  gpio_get_level and esp_timer_get_time
    // are register reads; safe in ISR context.
    let ctl = unsafe { &*(arg as *const IgnoreController<IgnoreExpiryTimer>) };
    let level_high = unsafe { gpio_get_level(pins::BUTTON_GPIO) } != 0;
    let now_ms = (unsafe { esp_timer_get_time() } / 1_000) as u32;
    crate::drivers::button::on_button_interrupt(ctl, level_high, now_ms);
}

/// Install the per-pin GPIO ISR service and attach the button handler.
/// Call after `init_peripherals()` and `IgnoreExpiryTimer::create()`.
#[cfg(target_os = "espidf")]
pub fn init_isr_service(
    ignore: &'static IgnoreController<IgnoreExpiryTimer>,
) -> Result<(), HwInitError> {
    // SAFETY: gpio_install_isr_service is idempotent; ESP_ERR_INVALID_STATE
    // means it was already installed.  The handler argument is a static.
    unsafe {
        let ret = gpio_install_isr_service(0);
        if ret != ESP_OK as i32 && ret != ESP_ERR_INVALID_STATE as i32 {
            return Err(HwInitError::IsrInstallFailed(ret));
        }

        let ret = gpio_isr_handler_add(
            pins::BUTTON_GPIO,
            Some(button_gpio_isr),
            ignore as *const _ as *mut core::ffi::c_void,
        );
        if ret != ESP_OK as i32 {
            return Err(HwInitError::IsrAttachFailed(ret));
        }
        gpio_intr_enable(pins::BUTTON_GPIO);
    }
    info!("hw_init: button ISR attached (any edge)");
    Ok(())
}

// ── SPIFFS ────────────────────────────────────────────────────

/// Mount the default SPIFFS partition at [`CONFIG_FS_BASE`].
#[cfg(target_os = "espidf")]
pub fn mount_config_fs() -> Result<(), HwInitError> {
    let conf = esp_vfs_spiffs_conf_t {
        base_path: c"/spiffs".as_ptr(),
        partition_label: core::ptr::null(),
        max_files: 2,
        format_if_mount_failed: false,
    };
    // SAFETY: conf and its strings are valid for the duration of the call.
    let ret = unsafe { esp_vfs_spiffs_register(&conf) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::SpiffsMountFailed(ret));
    }
    info!("hw_init: SPIFFS mounted at {}", CONFIG_FS_BASE);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn mount_config_fs() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): SPIFFS mount skipped");
    Ok(())
}
