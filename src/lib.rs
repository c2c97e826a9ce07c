//! Core logic of the battery-powered oven temperature monitor.
//!
//! # Overview
//!
//! The monitor reads a thermocouple amplifier through the ADC, normalising
//! every sample against the internal voltage reference, and shows the
//! temperature on a 4-digit LED backpack. Most of its life is spent cold,
//! so the power policy matters as much as the measurement:
//!
//! - **Idle**: one single-shot reading a minute, deep sleep in between and a
//!   short heartbeat flash on the display.
//! - **Active**: continuous acquisition averaged over
//!   [`config::SAMPLE_WINDOW`] rounds, display refreshed once a second.
//! - **Fault**: a reading above the safety ceiling (or one that cannot be
//!   calibrated) shows a two-phase error message until readings recover.
//!
//! Everything in this crate is hardware independent and runs on the host;
//! the firmware binary supplies the ADC, sleep and display plumbing.
//!
//! # Module Organization
//!
//! - [`sample_buffer`] - Paired ring buffer of raw readings
//! - [`calibration`] - Raw readings to degrees Celsius
//! - [`thermocouple`] - Conversion sequencer and ready/busy state
//! - [`mode`] - Idle/Active/Fault power mode controller
//! - [`display`] - LED backpack frames and HT16K33 driver
//! - [`fault`] - Terminal fault pattern
//! - [`config`] - Thresholds and cadences
//! - [`error`] - Fatal error type

#![cfg_attr(not(test), no_std)]

pub mod calibration;
pub mod config;
pub mod display;
pub mod error;
pub mod fault;
pub mod mode;
pub mod sample_buffer;
pub mod thermocouple;

pub use calibration::Calibration;
pub use config::MonitorConfig;
pub use error::{Error, Result};
pub use mode::{Controller, OperatingMode, Render, Sleep, Step};
pub use thermocouple::{AcquisitionState, ConversionPort, Sequencer};
