//! GPIO / peripheral pin assignments for the IRThermo board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// I²C bus (MLX90614)
// ---------------------------------------------------------------------------

// SDA=GPIO14, SCL=GPIO15.  The HAL takes these as typed pins, so `main`
// names them through `Peripherals` rather than by number.

/// SMBus-compatible clock for the MLX90614.
pub const I2C_FREQ_HZ: u32 = 100_000;

// ---------------------------------------------------------------------------
// User interface
// ---------------------------------------------------------------------------

/// Ignore-mode button.  Active-low with internal pull-up, any-edge IRQ.
pub const BUTTON_GPIO: i32 = 16;
/// Activity LED, lit while a request is being served.  Active HIGH.
pub const ACTIVITY_LED_GPIO: i32 = 11;
