//! Terminal fault description.
//!
//! Once a hardware error reaches the main loop there is no way back short of
//! a reset. The firmware then repeats the pattern described here forever:
//! a burst of status LED blinks identifying the error, a pause, and the
//! diagnostic line on the debug UART.

use core::fmt::Write;

use embassy_time::Duration;
use heapless::String;

use crate::error::Error;

/// Length of each LED on and off phase within a burst.
pub const BLINK_HALF_PERIOD: Duration = Duration::from_millis(125);

/// Dark time between bursts.
pub const BURST_GAP: Duration = Duration::from_millis(1000);

pub const MESSAGE_CAPACITY: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub struct TerminalFault {
    error: Error,
}

impl TerminalFault {
    pub const fn new(error: Error) -> Self {
        Self { error }
    }

    /// Blinks per burst. Distinct per error kind so the fault can be read
    /// off the board without a debugger.
    pub fn blink_count(&self) -> u8 {
        match self.error {
            Error::Conversion { .. } => 2,
            Error::DisplayBus => 3,
            Error::WakeTimer => 4,
        }
    }

    /// Total length of one burst including the trailing gap.
    pub fn burst_period(&self) -> Duration {
        BLINK_HALF_PERIOD * (2 * self.blink_count() as u32) + BURST_GAP
    }

    /// Diagnostic line sent over UART after every burst.
    pub fn message(&self) -> String<MESSAGE_CAPACITY> {
        let mut line = String::new();
        // a line longer than the buffer is truncated, which is fine here
        let _ = write!(line, "FATAL [{}]: {}\r\n", self.blink_count(), self.error);
        line
    }
}

impl From<Error> for TerminalFault {
    fn from(error: Error) -> Self {
        Self::new(error)
    }
}
