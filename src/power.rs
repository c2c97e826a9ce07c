//! Sleep, wake and watchdog handling for the oven monitor.
//!
//! # Sleep Depths
//!
//! - **Light**: the executor idles in WFE while an embassy timer runs. Used
//!   between Active samples and for the fault message phases.
//! - **Deep**: STOP mode with the low-power regulator. All clocks except
//!   the LSE are gated, so the embassy time driver stops as well; the RTC
//!   wakeup timer (1 Hz `ck_spre` clock, EXTI line 22) ends the sleep.
//!
//! Time spent in STOP is added back by [`PowerManager::now`], which is the
//! clock the mode controller runs on.
//!
//! # Watchdog
//!
//! The independent watchdog runs from the LSI and keeps counting in STOP.
//! Every sleep is cut into chunks of at most [`WATCHDOG_PET_INTERVAL`] and
//! the watchdog is petted between chunks.
//!
//! # Mode Persistence
//!
//! The operating mode is mirrored into RTC backup register 0 so that a
//! watchdog reset resumes where the firmware left off.

use embassy_futures::select::{Either, select};
use embassy_stm32::{Peri, pac, peripherals::IWDG, wdg::IndependentWatchdog};
use embassy_time::{Duration, Instant, Timer};
use pac::interrupt;
use portable_atomic::{AtomicBool, Ordering};

use oven_temp::{Error, Result};

use crate::adc::CONVERSION_DONE;

/// Watchdog window in microseconds.
const WATCHDOG_TIMEOUT_US: u32 = 16_000_000;

/// Longest time between two watchdog pets.
pub const WATCHDOG_PET_INTERVAL: Duration = Duration::from_secs(8);

/// EXTI line wired to the RTC wakeup event on STM32F4.
const RTC_WKUP_EXTI_LINE: usize = 22;

/// IMR register index for EXTI line 22 (lines 0-31 are in IMR1)
const IMR1_REG_IDX: usize = 0;

/// Polls of WUTWF before the wakeup timer is declared unusable. The flag
/// normally sets within two RTC clock cycles.
const WUTWF_POLL_LIMIT: u32 = 100_000;

/// Backup register holding the persisted mode.
const MODE_BACKUP_REGISTER: usize = 0;

/// Marks the backup register as written by this firmware. The low byte
/// carries the mode bits.
const MODE_MAGIC: u32 = 0x0A5E_0000;
const MODE_MAGIC_MASK: u32 = 0xFFFF_0000;

/// Set by the RTC wakeup interrupt, cleared before each STOP entry.
static WAKE_PENDING: AtomicBool = AtomicBool::new(false);

/// Owner of the watchdog and the low-power timing state.
pub struct PowerManager {
    watchdog: IndependentWatchdog<'static, IWDG>,
    /// Total time spent in STOP since boot.
    stopped: Duration,
}

impl PowerManager {
    /// Starts the watchdog and prepares the RTC wakeup path.
    ///
    /// The watchdog cannot be stopped once unleashed; from here on the main
    /// loop must reach [`PowerManager::pet`] at least every
    /// [`WATCHDOG_PET_INTERVAL`].
    ///
    /// # Arguments
    ///
    /// * `iwdg` - Independent watchdog peripheral
    pub fn new(iwdg: Peri<'static, IWDG>) -> Self {
        setup_rtc_wakeup();

        let mut watchdog = IndependentWatchdog::new(iwdg, WATCHDOG_TIMEOUT_US);
        watchdog.unleash();

        #[cfg(feature = "debug-mode")]
        defmt::info!("watchdog armed: {} us", WATCHDOG_TIMEOUT_US);

        Self {
            watchdog,
            stopped: Duration::from_ticks(0),
        }
    }

    pub fn pet(&mut self) {
        self.watchdog.pet();
    }

    /// Monotonic time including time spent in STOP.
    pub fn now(&self) -> Instant {
        Instant::now() + self.stopped
    }

    /// Sleeps with the core clock running, waking on the timer only.
    pub async fn light_sleep(&mut self, duration: Duration) {
        let mut left = duration;
        while left > WATCHDOG_PET_INTERVAL {
            self.pet();
            Timer::after(WATCHDOG_PET_INTERVAL).await;
            left -= WATCHDOG_PET_INTERVAL;
        }
        self.pet();
        Timer::after(left).await;
    }

    /// Sleeps in STOP mode for `duration`, rounded down to whole seconds.
    ///
    /// Anything shorter than a second is slept lightly instead, since the
    /// wakeup timer runs from the 1 Hz RTC clock.
    pub async fn deep_sleep(&mut self, duration: Duration) -> Result<()> {
        let mut secs = duration.as_secs();
        let remainder = duration - Duration::from_secs(secs);

        while secs > 0 {
            let chunk = secs.min(WATCHDOG_PET_INTERVAL.as_secs());
            self.pet();
            self.arm_periodic_wake(Duration::from_secs(chunk))?;
            enter_stop();
            disarm_wake();
            self.stopped += Duration::from_secs(chunk);
            secs -= chunk;
        }

        if remainder > Duration::from_ticks(0) {
            self.light_sleep(remainder).await;
        }
        self.pet();
        Ok(())
    }

    /// Waits for the conversion task to deliver a round. There is no
    /// timeout; the wait only wakes up to keep the watchdog fed.
    pub async fn wait_for_conversion(&mut self) {
        loop {
            self.pet();
            match select(CONVERSION_DONE.wait(), Timer::after(WATCHDOG_PET_INTERVAL)).await {
                Either::First(()) => return,
                Either::Second(()) => {
                    #[cfg(feature = "debug-mode")]
                    defmt::debug!("still waiting for conversion");
                }
            }
        }
    }

    /// Programs the RTC wakeup timer to fire every `period`.
    ///
    /// The period is counted on the 1 Hz RTC clock and is clamped to
    /// 1..=65536 seconds.
    ///
    /// # Arguments
    ///
    /// * `period` - Wakeup period, whole seconds
    ///
    /// # Errors
    ///
    /// [`Error::WakeTimer`] if the RTC never allows the reload value to be
    /// written.
    pub fn arm_periodic_wake(&mut self, period: Duration) -> Result<()> {
        let reload = period.as_secs().clamp(1, 1 << 16) - 1;
        let rtc = pac::RTC;

        WAKE_PENDING.store(false, Ordering::Release);
        unlock_rtc();
        rtc.cr().modify(|w| w.set_wute(false));
        if !(0..WUTWF_POLL_LIMIT).any(|_| rtc.isr().read().wutwf()) {
            lock_rtc();
            return Err(Error::WakeTimer);
        }
        rtc.wutr().write(|w| w.set_wut(reload as u16));
        rtc.isr().modify(|w| w.set_wutf(false));
        rtc.cr().modify(|w| {
            w.set_wucksel(pac::rtc::vals::Wucksel::CLOCKSPARE);
            w.set_wutie(true);
            w.set_wute(true);
        });
        lock_rtc();
        Ok(())
    }

    /// Writes the mode bits to the backup domain.
    ///
    /// # Arguments
    ///
    /// * `bits` - Encoded operating mode
    pub fn store_mode(&mut self, bits: u8) {
        pac::RTC
            .bkpr(MODE_BACKUP_REGISTER)
            .write(|w| w.set_bkp(MODE_MAGIC | bits as u32));
    }

    /// Mode bits persisted by a previous run, if the backup domain holds any.
    pub fn restored_mode(&self) -> Option<u8> {
        let raw = pac::RTC.bkpr(MODE_BACKUP_REGISTER).read().bkp();
        (raw & MODE_MAGIC_MASK == MODE_MAGIC).then_some(raw as u8)
    }

    /// Whether the last reset was caused by the independent watchdog.
    /// Clears the reset flags.
    pub fn take_watchdog_reset(&mut self) -> bool {
        let rcc = pac::RCC;
        let fired = rcc.csr().read().iwdgrstf();
        rcc.csr().modify(|w| w.set_rmvf(true));
        fired
    }
}

/// Enables backup domain access and routes the RTC wakeup event to the NVIC.
fn setup_rtc_wakeup() {
    let exti = pac::EXTI;

    // Enable the PWR clock and backup domain writes
    pac::RCC.apb1enr().modify(|w| w.set_pwren(true));
    pac::PWR.cr1().modify(|w| w.set_dbp(true));

    // Rising edge on EXTI line 22 for RTC wakeup
    exti.imr(IMR1_REG_IDX)
        .modify(|w| w.set_line(RTC_WKUP_EXTI_LINE, true));
    exti.rtsr(IMR1_REG_IDX)
        .modify(|w| w.set_line(RTC_WKUP_EXTI_LINE, true));

    unsafe {
        cortex_m::peripheral::NVIC::unmask(embassy_stm32::interrupt::RTC_WKUP);
    };
}

fn unlock_rtc() {
    let rtc = pac::RTC;
    rtc.wpr().write(|w| w.set_key(0xCA));
    rtc.wpr().write(|w| w.set_key(0x53));
}

fn lock_rtc() {
    pac::RTC.wpr().write(|w| w.set_key(0xFF));
}

fn disarm_wake() {
    unlock_rtc();
    pac::RTC.cr().modify(|w| {
        w.set_wutie(false);
        w.set_wute(false);
    });
    lock_rtc();
}

/// Enters STOP with the low-power regulator until the RTC wakeup fires.
///
/// The core stays on HSI across STOP, so no clock reconfiguration is needed
/// on exit. Other interrupts may end WFI early; the loop goes back to sleep
/// until the wakeup flag is set.
fn enter_stop() {
    // SAFETY: nothing else in the firmware owns the SCB; only SLEEPDEEP is
    // modified.
    let mut scb = unsafe { cortex_m::Peripherals::steal() }.SCB;

    pac::PWR.cr1().modify(|w| {
        w.set_pdds(pac::pwr::vals::Pdds::STOP_MODE);
        w.set_lpds(true);
    });
    scb.set_sleepdeep();
    while !WAKE_PENDING.load(Ordering::Acquire) {
        cortex_m::asm::dsb();
        cortex_m::asm::wfi();
    }
    scb.clear_sleepdeep();
}

/// RTC wakeup interrupt handler (EXTI line 22).
///
/// Clears the RTC and EXTI pending flags and marks the wakeup for
/// [`enter_stop`].
#[interrupt]
fn RTC_WKUP() {
    pac::RTC.isr().modify(|w| w.set_wutf(false));
    pac::EXTI
        .pr(IMR1_REG_IDX)
        .write(|w| w.set_line(RTC_WKUP_EXTI_LINE, true));

    WAKE_PENDING.store(true, Ordering::Release);
}
