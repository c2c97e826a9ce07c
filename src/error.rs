//! Fatal error type for the monitor.
//!
//! Every variant here is unrecoverable: the main loop hands it to the
//! terminal fault handler (see [`crate::fault`]). Temperature range problems
//! are not errors, they are states of the [`crate::mode::Controller`].

use thiserror::Error;

/// Hardware failures that end normal operation.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum Error {
    /// The conversion peripheral reported an error or refused to start.
    #[error("ADC conversion failed (code {code})")]
    Conversion { code: u32 },

    /// An I2C write to the display backpack failed.
    #[error("display bus transaction failed")]
    DisplayBus,

    /// The RTC wakeup timer could not be armed before deep sleep.
    #[error("wake timer could not be armed")]
    WakeTimer,
}

pub type Result<T> = core::result::Result<T, Error>;
