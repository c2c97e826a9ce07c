//! Firmware for a battery-powered oven temperature monitor.
//!
//! # Overview
//!
//! This firmware reads a thermocouple amplifier and shows the oven
//! temperature on a 4-digit LED backpack:
//! - Idle: one reading a minute, STOP mode in between, heartbeat flash
//! - Active (oven at or above 50 °C): averaged readings shown every second
//! - Fault (above 250 °C or unusable reference): alternating error message
//!
//! # Hardware
//!
//! - **MCU**: STM32F446RE (Cortex-M4F) on a NUCLEO-64 board
//! - **Sensor**: thermocouple amplifier on PA4, normalised against VREFINT
//! - **Display**: HT16K33 4-digit 14-segment backpack on I2C3
//! - **RTC**: 32.768 kHz crystal, drives the STOP mode wakeup
//!
//! # Power Management
//!
//! The core runs from HSI so that it resumes without reconfiguration after
//! STOP. Deep sleeps are timed by the RTC wakeup timer; the independent
//! watchdog keeps running throughout and is petted at least every 8 seconds.
//! The operating mode is kept in an RTC backup register, so a watchdog
//! reset resumes in the same mode.
//!
//! # Hardware Faults
//!
//! Conversion errors, display bus errors and wake timer errors are terminal:
//! acquisition stops and the status LED blinks an error-specific count,
//! followed by a diagnostic line on UART4, until the board is reset.
//!
//! # Module Organization
//!
//! - [`adc`] - Firmware sequencer instance and the conversion task
//! - [`power`] - Sleep depths, RTC wakeup, watchdog and mode persistence
//! - [`hardware`] - Pin mappings and peripheral initialization

#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

#[cfg(target_os = "none")]
mod adc;
#[cfg(target_os = "none")]
mod hardware;
#[cfg(target_os = "none")]
mod power;

/// Everything below only exists on the board; host builds get an empty
/// `main` so the library tests can link.
#[cfg(target_os = "none")]
mod firmware {
    use core::convert::Infallible;

    use embassy_executor::Spawner;
    use embassy_stm32::{
        Config,
        gpio::Output,
        mode::Blocking,
        rcc::{self, LsConfig},
        usart::UartTx,
    };
    use embassy_time::{Instant, Timer};
    use embedded_io::Write;
    use oven_temp::{
        Controller, MonitorConfig, Result, Sleep,
        display::{Backpack, Frame},
        fault::{BLINK_HALF_PERIOD, TerminalFault},
    };
    use {defmt_rtt as _, panic_probe as _};

    use crate::adc::{conversion_task, with_sequencer};
    use crate::hardware::{DisplayBus, Peripherals};
    use crate::power::PowerManager;

    /// Creates a low-power clock configuration for STM32F446.
    ///
    /// # Clock Settings
    ///
    /// - **System clock**: HSI 16 MHz, no PLL (STOP mode exits on HSI)
    /// - **AHB**: HSI/4 in normal mode, full speed in debug mode
    /// - **LSE**: 32.768 kHz external crystal for RTC
    ///
    /// Peripheral clocks stay at or above 4 MHz so that I2C standard mode
    /// and the UART baud rate remain reachable.
    ///
    /// # Returns
    ///
    /// Configured RCC settings for embassy-stm32 initialization
    fn create_low_power_config() -> rcc::Config {
        let mut config = rcc::Config::default();
        config.hsi = true;
        config.sys = rcc::Sysclk::HSI;
        #[cfg(feature = "debug-mode")]
        {
            config.ahb_pre = rcc::AHBPrescaler::DIV1;
        }
        #[cfg(not(feature = "debug-mode"))]
        {
            config.ahb_pre = rcc::AHBPrescaler::DIV4;
        }
        config.apb1_pre = rcc::APBPrescaler::DIV1;
        config.apb2_pre = rcc::APBPrescaler::DIV1;
        config.ls = LsConfig::default_lse();
        config
    }

    /// Main entry point for the oven monitor firmware.
    ///
    /// # Initialization Sequence
    ///
    /// 1. Configure clocks for low power operation (HSI, LSE for RTC)
    /// 2. Initialize STM32 peripherals and unleash the watchdog
    /// 3. Spawn the conversion task
    /// 4. Resume the persisted mode after a watchdog reset
    /// 5. Run the monitor loop until a hardware fault ends it
    ///
    /// # Spawned Tasks
    ///
    /// - **conversion_task**: Converts sensor and reference on request
    #[embassy_executor::main]
    async fn main(spawner: Spawner) {
        let mut config = Config::default();
        config.rcc = create_low_power_config();

        let p = embassy_stm32::init(config);

        #[cfg(feature = "debug-mode")]
        defmt::info!("Oven monitor firmware starting...");

        // Wait 3 seconds after boot to allow debugger connection
        // before entering STOP mode. Negligible battery impact.
        #[cfg(feature = "debug-mode")]
        {
            defmt::info!("Waiting 3 seconds for debugger connection...");
            Timer::after_secs(3).await;
        }

        let Peripherals {
            mut power,
            mut display,
            status_led,
            fault_uart,
            adc,
        } = Peripherals::new(p);

        #[cfg(feature = "debug-mode")]
        defmt::info!("Spawning conversion task...");

        spawner
            .spawn(conversion_task(adc.adc, adc.sensor, adc.vrefint))
            .unwrap();

        let Err(error) = run(&mut power, &mut display).await;

        terminal_fault(
            TerminalFault::from(error),
            power,
            display,
            status_led,
            fault_uart,
        )
        .await
    }

    /// Drives the mode controller until a hardware error stops it.
    ///
    /// # Arguments
    ///
    /// * `power` - Sleep and watchdog handling
    /// * `display` - LED backpack
    async fn run(
        power: &mut PowerManager,
        display: &mut Backpack<DisplayBus>,
    ) -> Result<Infallible> {
        display.init()?;
        display.clear()?;

        let mut ctl = Controller::new(MonitorConfig::DEFAULT);
        let watchdog_reset = power.take_watchdog_reset();
        if let Some(bits) = power.restored_mode().filter(|_| watchdog_reset) {
            #[cfg(feature = "debug-mode")]
            defmt::warn!("watchdog reset, resuming mode bits {=u8:#x}", bits);

            with_sequencer(|seq| ctl.resume(bits, seq))?;
        }
        let mut stored = ctl.mode().to_bits();
        power.store_mode(stored);

        #[cfg(feature = "debug-mode")]
        defmt::info!("Entering monitor loop in {}", ctl.mode());

        loop {
            let now = power.now();
            let step = with_sequencer(|seq| ctl.tick(seq, now))?;

            if let Some(render) = step.render {
                display.show(&Frame::from(render))?;
            }

            let bits = ctl.mode().to_bits();
            if bits != stored {
                power.store_mode(bits);
                stored = bits;
            }

            match step.sleep {
                Sleep::UntilConversion => power.wait_for_conversion().await,
                Sleep::Light(duration) => power.light_sleep(duration).await,
                Sleep::Deep(duration) => power.deep_sleep(duration).await?,
            }
        }
    }

    /// Reports a hardware fault forever.
    ///
    /// Acquisition is stopped and the display blanked (best effort, the
    /// display may be the thing that failed). Each burst blinks the status
    /// LED [`TerminalFault::blink_count`] times, pauses, then writes the
    /// diagnostic line over UART4. The watchdog is petted once per burst so
    /// the pattern stays visible instead of ending in a reset.
    async fn terminal_fault(
        fault: TerminalFault,
        mut power: PowerManager,
        mut display: Backpack<DisplayBus>,
        mut led: Output<'static>,
        mut uart: Option<UartTx<'static, Blocking>>,
    ) -> ! {
        #[cfg(feature = "debug-mode")]
        defmt::error!("terminal fault: {}", fault);

        with_sequencer(|seq| seq.stop());
        let _ = display.clear();

        let message = fault.message();
        loop {
            let burst_started = Instant::now();
            for _ in 0..fault.blink_count() {
                led.set_high();
                Timer::after(BLINK_HALF_PERIOD).await;
                led.set_low();
                Timer::after(BLINK_HALF_PERIOD).await;
            }
            Timer::at(burst_started + fault.burst_period()).await;

            if let Some(uart) = uart.as_mut() {
                let _ = uart.write_all(message.as_bytes());
            }
            power.pet();
        }
    }
}

#[cfg(not(target_os = "none"))]
fn main() {}
