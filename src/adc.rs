//! ADC plumbing for the conversion sequencer.
//!
//! The sequencer itself is hardware independent and lives in the library.
//! This module owns the single firmware instance of it and the task that
//! performs the actual conversions on ADC1.
//!
//! # Flow
//!
//! 1. The sequencer calls [`RoundTrigger::start_round`], which raises
//!    [`ROUND_REQUEST`].
//! 2. [`conversion_task`] converts the thermocouple channel, then VREFINT.
//! 3. Both values are delivered inside one critical section, so the main
//!    loop never sees a half-written round.
//! 4. [`CONVERSION_DONE`] wakes the main loop.

use core::cell::RefCell;

use embassy_stm32::adc::{Adc, AnyAdcChannel, VrefInt};
use embassy_stm32::pac;
use embassy_stm32::peripherals::ADC1;
use embassy_sync::blocking_mutex::{Mutex, raw::CriticalSectionRawMutex};
use embassy_sync::signal::Signal;
use embassy_time::Timer;
use oven_temp::{Calibration, ConversionPort, MonitorConfig, Result, Sequencer};

/// ADC status bits that mean the last round cannot be trusted.
const SR_OVERRUN: u32 = 1 << 5;

/// The firmware's one and only sequencer.
static SEQUENCER: Mutex<CriticalSectionRawMutex, RefCell<Sequencer<RoundTrigger>>> =
    Mutex::new(RefCell::new(Sequencer::new(
        RoundTrigger,
        Calibration::DEFAULT,
    )));

/// Raised by the sequencer to request one sensor/reference round.
static ROUND_REQUEST: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Raised by the conversion task after a round has been delivered.
pub static CONVERSION_DONE: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Conversion port that hands rounds to [`conversion_task`].
pub struct RoundTrigger;

impl ConversionPort for RoundTrigger {
    fn start_round(&mut self) -> Result<()> {
        ROUND_REQUEST.signal(());
        Ok(())
    }

    fn abort(&mut self) {
        ROUND_REQUEST.reset();
    }
}

/// Runs a closure against the shared sequencer.
///
/// # Arguments
///
/// * `f` - Closure receiving exclusive access for the critical section
pub fn with_sequencer<R>(f: impl FnOnce(&mut Sequencer<RoundTrigger>) -> R) -> R {
    SEQUENCER.lock(|cell| f(&mut cell.borrow_mut()))
}

/// Performs conversion rounds on request.
///
/// Each round reads the thermocouple amplifier output and then the internal
/// reference, in that order. An overrun flagged by the ADC is reported to
/// the sequencer as a conversion error instead of a value.
///
/// Rounds of a continuous stream are spaced by
/// [`MonitorConfig::round_spacing`], so the executor idles between them.
///
/// # Arguments
///
/// * `adc` - ADC1 driver
/// * `sensor` - Thermocouple amplifier input (PA4, ADC1_IN4)
/// * `vrefint` - Internal reference channel
#[embassy_executor::task]
pub async fn conversion_task(
    mut adc: Adc<'static, ADC1>,
    mut sensor: AnyAdcChannel<ADC1>,
    mut vrefint: VrefInt,
) {
    loop {
        ROUND_REQUEST.wait().await;

        let sensor_raw = adc.blocking_read(&mut sensor);
        let reference_raw = adc.blocking_read(&mut vrefint);
        let status = pac::ADC1.sr().read().0;

        let streaming = with_sequencer(|seq| {
            if status & SR_OVERRUN != 0 {
                seq.on_conversion_error(status);
            } else {
                seq.on_conversion_complete(sensor_raw as u32);
                seq.on_conversion_complete(reference_raw as u32);
            }
            seq.is_continuous() && seq.is_running()
        });

        #[cfg(feature = "debug-mode")]
        defmt::trace!("round: sensor={} reference={}", sensor_raw, reference_raw);

        CONVERSION_DONE.signal(());

        if streaming {
            Timer::after(MonitorConfig::DEFAULT.round_spacing()).await;
        }
    }
}
