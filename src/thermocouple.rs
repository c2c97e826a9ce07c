//! Thermocouple acquisition sequencer.
//!
//! A conversion round samples two channels in a fixed order: the amplifier
//! output first, then the internal reference. The hardware reports each
//! channel through [`Sequencer::on_conversion_complete`]; once both values
//! of a round are in, they are written to the [`SampleBuffer`] as a pair.
//!
//! Two acquisition styles are supported:
//!
//! - **single**: one round, then stop. The result is ready as soon as the
//!   round lands and is consumed by [`Sequencer::single_value`].
//! - **continuous**: rounds are re-armed back to back. The result becomes
//!   ready once the ring has been filled with fresh samples and stays ready;
//!   [`Sequencer::averaged_value`] can be read as often as needed.
//!
//! The sequencer never touches hardware directly. Starting and aborting
//! rounds goes through a [`ConversionPort`].

use crate::calibration::Calibration;
use crate::config::SAMPLE_WINDOW;
use crate::error::{Error, Result};
use crate::sample_buffer::SampleBuffer;

/// Logical ADC channels, in conversion order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum Channel {
    Sensor,
    Reference,
}

impl Channel {
    /// Channels in the order the hardware converts them.
    pub const ROUND: [Channel; 2] = [Channel::Sensor, Channel::Reference];
}

/// Number of channels converted per round.
pub const CHANNELS: usize = Channel::ROUND.len();

/// Hardware side of the sequencer.
pub trait ConversionPort {
    /// Begins one round over all channels. Completion is reported
    /// asynchronously, once per channel.
    fn start_round(&mut self) -> Result<()>;

    /// Abandons any round in progress.
    fn abort(&mut self);
}

/// Observable acquisition state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum AcquisitionState {
    Idle,
    ConversionInFlight,
    ResultReady,
}

pub struct Sequencer<P, const N: usize = SAMPLE_WINDOW> {
    port: P,
    calibration: Calibration,
    buffer: SampleBuffer<N>,
    /// Raw values of the round in progress, indexed by channel order.
    pending: [u32; CHANNELS],
    /// Next channel expected from the hardware.
    pending_index: usize,
    continuous: bool,
    running: bool,
    ready: bool,
    fault: Option<Error>,
}

impl<P: ConversionPort, const N: usize> Sequencer<P, N> {
    pub const fn new(port: P, calibration: Calibration) -> Self {
        Self {
            port,
            calibration,
            buffer: SampleBuffer::new(),
            pending: [0; CHANNELS],
            pending_index: 0,
            continuous: false,
            running: false,
            ready: false,
            fault: None,
        }
    }

    /// Requests exactly one round.
    ///
    /// Clears the ready flag. A round already in flight is left to finish
    /// and its data lands normally; if it belonged to a continuous stream,
    /// the stream ends after it.
    pub fn start_single(&mut self) -> Result<()> {
        self.ready = false;
        self.continuous = false;
        if self.running {
            return Ok(());
        }
        self.arm()
    }

    /// Requests back-to-back rounds until stopped.
    ///
    /// Entering continuous mode rewinds the buffer so the first ready result
    /// averages only samples taken in this stream.
    pub fn start_continuous(&mut self) -> Result<()> {
        if !self.continuous {
            self.continuous = true;
            self.ready = false;
            self.buffer.rewind();
        }
        if self.running {
            return Ok(());
        }
        self.arm()
    }

    /// Stops acquisition and aborts the round in flight, if any.
    pub fn stop(&mut self) {
        self.port.abort();
        self.running = false;
        self.continuous = false;
        self.ready = false;
        self.pending_index = 0;
    }

    /// Hardware callback: one channel of the current round has converted.
    ///
    /// Must be called in [`Channel::ROUND`] order.
    pub fn on_conversion_complete(&mut self, value: u32) {
        if !self.running {
            return;
        }
        self.pending[self.pending_index] = value;
        self.pending_index += 1;
        if self.pending_index < CHANNELS {
            return;
        }
        self.pending_index = 0;
        self.buffer.push(self.pending[0] as f32, self.pending[1] as f32);

        if self.continuous {
            if self.buffer.cursor() == 0 {
                self.ready = true;
            }
            if let Err(e) = self.port.start_round() {
                self.fail(e);
            }
        } else {
            self.running = false;
            self.ready = true;
        }
    }

    /// Hardware callback: the conversion peripheral reported an error.
    ///
    /// Not retried; the error is surfaced through [`Sequencer::take_fault`].
    pub fn on_conversion_error(&mut self, code: u32) {
        self.fail(Error::Conversion { code });
    }

    /// Returns the fatal error recorded by a hardware callback, once.
    pub fn take_fault(&mut self) -> Option<Error> {
        self.fault.take()
    }

    /// Calibrated temperature of the latest round, in Celsius.
    ///
    /// Consumes the ready flag. Callers should check [`Sequencer::is_ready`]
    /// first; the value is whatever was last written otherwise.
    pub fn single_value(&mut self) -> f32 {
        let (sensor, reference) = self.buffer.latest();
        self.ready = false;
        self.calibration.celsius(sensor, reference)
    }

    /// Calibrated temperature of the whole window, in Celsius.
    ///
    /// Does not consume the ready flag. Only meaningful once the window has
    /// been filled in continuous mode.
    pub fn averaged_value(&self) -> f32 {
        let (sensor, reference) = self.buffer.means();
        self.calibration.celsius(sensor, reference)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn is_continuous(&self) -> bool {
        self.continuous
    }

    pub fn state(&self) -> AcquisitionState {
        if self.ready {
            AcquisitionState::ResultReady
        } else if self.running {
            AcquisitionState::ConversionInFlight
        } else {
            AcquisitionState::Idle
        }
    }

    pub fn buffer(&self) -> &SampleBuffer<N> {
        &self.buffer
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    fn arm(&mut self) -> Result<()> {
        self.pending_index = 0;
        match self.port.start_round() {
            Ok(()) => {
                self.running = true;
                Ok(())
            }
            Err(e) => {
                self.running = false;
                Err(e)
            }
        }
    }

    fn fail(&mut self, error: Error) {
        self.running = false;
        self.continuous = false;
        self.pending_index = 0;
        self.fault = Some(error);
    }
}
