//! Thermocouple amplifier calibration.
//!
//! The amplifier outputs `Vref + sensitivity * T`. Each conversion round
//! also samples the internal reference, so the sensor reading can be
//! normalised against it without knowing the exact supply voltage:
//!
//! ```text
//! vout = Vref * (sensor / reference)
//! T    = (vout - Vref) / sensitivity
//! ```

/// Calibration constants for the thermocouple amplifier.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub struct Calibration {
    /// Nominal reference voltage in volts.
    pub reference_volts: f32,
    /// Amplifier sensitivity in volts per degree Celsius.
    pub sensitivity: f32,
    /// Reference readings below this many counts are treated as broken.
    pub min_reference: f32,
}

impl Calibration {
    pub const DEFAULT: Self = Self {
        reference_volts: 1.25,
        sensitivity: 0.005,
        min_reference: 64.0,
    };

    pub const fn new(reference_volts: f32, sensitivity: f32, min_reference: f32) -> Self {
        Self {
            reference_volts,
            sensitivity,
            min_reference,
        }
    }

    /// Converts a sensor/reference pair of raw readings to degrees Celsius.
    ///
    /// Returns `f32::NAN` when the reference reading is below
    /// `min_reference` (or is itself NaN); a near-zero divisor means the
    /// reference channel is not being sampled correctly.
    pub fn celsius(&self, sensor: f32, reference: f32) -> f32 {
        if !(reference >= self.min_reference) {
            return f32::NAN;
        }
        let vout = self.reference_volts * (sensor / reference);
        (vout - self.reference_volts) / self.sensitivity
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Converts Celsius to Fahrenheit.
#[inline]
pub fn celsius_to_fahrenheit(celsius: f32) -> f32 {
    celsius * (9.0 / 5.0) + 32.0
}
