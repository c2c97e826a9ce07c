//! Hardware abstraction and peripheral initialization.
//!
//! This module defines the pin mappings and peripheral initialization
//! for the oven monitor board (NUCLEO-F446RE carrier).
//!
//! # Pin Assignments
//!
//! ## Thermocouple
//! - **PA4**: ADC1_IN4 - Thermocouple amplifier output
//! - **VREFINT**: ADC1_IN17 - Internal reference, converted after PA4
//!
//! ## Display (HT16K33 backpack at 0x70)
//! - **PA8**: I2C3_SCL
//! - **PC9**: I2C3_SDA
//!
//! ## Diagnostics
//! - **PA0**: UART4_TX - Terminal fault messages, 115200 8N1
//! - **PA5**: LD2 - Status LED, active high
//!
//! ## Low Power & RTC
//! - **PC14**: OSC32_IN - 32.768 kHz crystal input
//! - **PC15**: OSC32_OUT - 32.768 kHz crystal output
//!
//! ## Debug (SWD)
//! - **PA13**: SWDIO
//! - **PA14**: SWCLK

use embassy_stm32::{
    adc::{Adc, AdcChannel, AnyAdcChannel, VrefInt},
    gpio::{Level, Output, Speed},
    i2c::{self, I2c},
    mode::Blocking,
    peripherals::ADC1,
    time::Hertz,
    usart::{self, UartTx},
};
use oven_temp::display::Backpack;

use crate::power::PowerManager;

/// Display bus speed.
const I2C_FREQUENCY: Hertz = Hertz(100_000);

/// Fault reporting baud rate.
const UART_BAUD: u32 = 115_200;

/// Blocking I2C bus driving the LED backpack.
pub type DisplayBus = I2c<'static, Blocking>;

/// ADC resources handed to the conversion task.
pub struct AdcInputs {
    pub adc: Adc<'static, ADC1>,
    pub sensor: AnyAdcChannel<ADC1>,
    pub vrefint: VrefInt,
}

/// Top-level peripheral container for the oven monitor.
///
/// Owns all hardware controllers and provides initialization
/// from STM32 peripheral singleton.
pub struct Peripherals {
    /// Watchdog, sleep and backup-domain handling
    pub power: PowerManager,
    /// 4-digit LED backpack
    pub display: Backpack<DisplayBus>,
    /// Status LED, used for terminal fault blinking
    pub status_led: Output<'static>,
    /// Diagnostic UART (transmit only)
    pub fault_uart: Option<UartTx<'static, Blocking>>,
    /// ADC and channels for the conversion task
    pub adc: AdcInputs,
}

impl Peripherals {
    /// Initializes all peripherals from STM32 peripheral singleton.
    ///
    /// The watchdog is unleashed here, so the caller must start petting it
    /// promptly.
    ///
    /// A UART that fails to configure is left out rather than failing boot;
    /// it only matters once a terminal fault is being reported.
    ///
    /// # Initial GPIO States
    ///
    /// - PA5 (LD2): Low (LED off)
    ///
    /// # Arguments
    ///
    /// * `p` - STM32 peripheral singleton from embassy_stm32::init()
    ///
    /// # Returns
    ///
    /// Initialized Peripherals struct ready for use
    pub fn new(p: embassy_stm32::Peripherals) -> Self {
        let mut i2c_config = i2c::Config::default();
        i2c_config.frequency = I2C_FREQUENCY;
        let bus = I2c::new_blocking(p.I2C3, p.PA8, p.PC9, i2c_config);

        let mut uart_config = usart::Config::default();
        uart_config.baudrate = UART_BAUD;
        let fault_uart = UartTx::new_blocking(p.UART4, p.PA0, uart_config).ok();

        let mut adc = Adc::new(p.ADC1);
        let vrefint = adc.enable_vrefint();

        Self {
            power: PowerManager::new(p.IWDG),
            display: Backpack::new(bus, Backpack::<DisplayBus>::DEFAULT_ADDRESS),
            status_led: Output::new(p.PA5, Level::Low, Speed::Low),
            fault_uart,
            adc: AdcInputs {
                adc,
                sensor: p.PA4.degrade_adc(),
                vrefint,
            },
        }
    }
}
