//! Sensor subsystem: the MLX90614 driver and the reading it produces.
//!
//! The sensor reports every temperature as a 16-bit word in 0.02 K steps
//! from absolute zero.  Conversion lives here, not in the driver, so the
//! averaging rule can be tested without a bus.

pub mod mlx90614;

/// Kelvin per raw LSB.
pub const RAW_SCALE_K: f64 = 0.02;
/// 0 °C in Kelvin.
pub const KELVIN_OFFSET: f64 = 273.15;

/// Convert a raw sensor word (or an average of raw words) to Celsius.
pub fn raw_to_celsius(raw: f64) -> f64 {
    raw * RAW_SCALE_K - KELVIN_OFFSET
}

/// Inverse of [`raw_to_celsius`].
pub fn celsius_to_raw(celsius: f64) -> f64 {
    (celsius + KELVIN_OFFSET) / RAW_SCALE_K
}

/// One full poll of the sensor, in Celsius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureReading {
    pub ambient: f64,
    pub object1: f64,
    pub object2: f64,
    pub object_avg: f64,
}

impl TemperatureReading {
    /// Build a reading from the three raw register words.
    ///
    /// `object_avg` is the average of the two raw object words converted
    /// once, which is not the same float as the mean of the two converted
    /// values.
    pub fn from_raw(ambient: u16, object1: u16, object2: u16) -> Self {
        let avg_raw = 0.5 * (f64::from(object1) + f64::from(object2));
        Self {
            ambient: raw_to_celsius(f64::from(ambient)),
            object1: raw_to_celsius(f64::from(object1)),
            object2: raw_to_celsius(f64::from(object2)),
            object_avg: raw_to_celsius(avg_raw),
        }
    }

    /// Copy with every object temperature replaced by ambient.
    pub fn with_objects_as_ambient(&self) -> Self {
        Self {
            ambient: self.ambient,
            object1: self.ambient,
            object2: self.ambient,
            object_avg: self.ambient,
        }
    }
}
