//! Compile-time configuration of the duty-cycle policy.
//!
//! All temperatures are in degrees Celsius. The display unit is chosen with
//! the `fahrenheit` cargo feature and only affects rendering.

use embassy_time::Duration;

/// Number of paired samples averaged in active mode.
pub const SAMPLE_WINDOW: usize = 8;

/// Thresholds and cadences for the power mode controller.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MonitorConfig {
    /// Single readings at or above this leave idle mode.
    pub activation_threshold_c: f32,
    /// Averaged readings above this are treated as a sensor fault.
    pub safety_ceiling_c: f32,
    /// Time between single readings in idle mode (deep sleep in between).
    pub idle_interval: Duration,
    /// Time between averaged readings in active mode.
    pub active_interval: Duration,
    /// How long each half of the two-phase fault message is shown.
    pub fault_phase: Duration,
    /// How long the idle "alive" indicator stays lit after a reading.
    pub alive_flash: Duration,
}

impl MonitorConfig {
    pub const DEFAULT: Self = Self {
        activation_threshold_c: 50.0,
        safety_ceiling_c: 250.0,
        idle_interval: Duration::from_secs(60),
        active_interval: Duration::from_secs(1),
        fault_phase: Duration::from_secs(1),
        alive_flash: Duration::from_millis(50),
    };

    /// Gap between rounds of a continuous stream, so that one window of
    /// samples spans one active interval.
    pub fn round_spacing(&self) -> Duration {
        self.active_interval / SAMPLE_WINDOW as u32
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
