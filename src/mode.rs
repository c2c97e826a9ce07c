//! Power mode controller.
//!
//! The main loop calls [`Controller::tick`] every time it wakes. The
//! controller looks at the acquisition state, takes readings when they are
//! due, changes mode when a threshold is crossed and answers with a
//! [`Step`]: what to show on the display, and how deeply to sleep until the
//! next tick.
//!
//! ```text
//!            single >= activation            averaged > ceiling
//!   Idle ─────────────────────────▶ Active ─────────────────────▶ Fault
//!    ▲ ◀───────────────────────────┘  ▲                              │
//!    │      averaged < activation     └──────────────────────────────┘
//!    │                                    single < ceiling
//!    └─ non-finite readings (broken reference) also enter Fault
//! ```
//!
//! Idle samples once a minute and deep sleeps in between, Active samples
//! once a second with only shallow sleeps.

use embassy_time::{Duration, Instant};

use crate::config::MonitorConfig;
use crate::error::Result;
use crate::thermocouple::{ConversionPort, Sequencer};

/// Why the monitor is showing a fault.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum FaultReason {
    /// Averaged reading above the safety ceiling.
    OverTemperature,
    /// Reference channel near zero, the reading cannot be calibrated.
    BadReference,
    /// The controller was resumed into a mode it does not know.
    InvalidMode,
}

impl FaultReason {
    /// Four character code shown on the display.
    pub const fn code(self) -> &'static str {
        match self {
            FaultReason::OverTemperature => "HOT ",
            FaultReason::BadReference => "REF ",
            FaultReason::InvalidMode => "MODE",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum OperatingMode {
    #[default]
    Idle,
    Active,
    Fault(FaultReason),
    /// Unreachable in normal operation. Shows a fault forever.
    Invalid,
}

impl OperatingMode {
    /// Encoding used to persist the mode across a watchdog reset.
    pub const fn to_bits(self) -> u8 {
        match self {
            OperatingMode::Idle => 0x01,
            OperatingMode::Active => 0x02,
            OperatingMode::Fault(FaultReason::OverTemperature) => 0x10,
            OperatingMode::Fault(FaultReason::BadReference) => 0x11,
            OperatingMode::Fault(FaultReason::InvalidMode) => 0x12,
            OperatingMode::Invalid => 0xFF,
        }
    }

    /// Inverse of [`OperatingMode::to_bits`]. Anything unrecognised decodes
    /// as [`OperatingMode::Invalid`].
    pub const fn from_bits(bits: u8) -> Self {
        match bits {
            0x01 => OperatingMode::Idle,
            0x02 => OperatingMode::Active,
            0x10 => OperatingMode::Fault(FaultReason::OverTemperature),
            0x11 => OperatingMode::Fault(FaultReason::BadReference),
            0x12 => OperatingMode::Fault(FaultReason::InvalidMode),
            _ => OperatingMode::Invalid,
        }
    }
}

/// What the display should show after this tick.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum Render {
    /// A fresh reading, in Celsius.
    Temperature(f32),
    /// Idle heartbeat.
    Alive,
    Blank,
    /// Phase 0 shows the reason code, phase 1 shows "ERR!".
    Fault { reason: FaultReason, phase: u8 },
}

/// How the main loop should wait before the next tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum Sleep {
    /// Shallow sleep, woken by the conversion-complete interrupt.
    UntilConversion,
    /// Shallow sleep for a fixed time.
    Light(Duration),
    /// Deep sleep with the periodic wake timer armed.
    Deep(Duration),
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub struct Step {
    pub render: Option<Render>,
    pub sleep: Sleep,
}

impl Step {
    fn sleep(sleep: Sleep) -> Self {
        Self {
            render: None,
            sleep,
        }
    }

    fn render(render: Render, sleep: Sleep) -> Self {
        Self {
            render: Some(render),
            sleep,
        }
    }
}

pub struct Controller {
    config: MonitorConfig,
    mode: OperatingMode,
    last_sample: Option<Instant>,
    last_reading: Option<f32>,
    /// Idle heartbeat is on and must be cleared on the next tick.
    alive_lit: bool,
    fault_phase: u8,
    phase_started: Option<Instant>,
}

impl Controller {
    pub const fn new(config: MonitorConfig) -> Self {
        Self {
            config,
            mode: OperatingMode::Idle,
            last_sample: None,
            last_reading: None,
            alive_lit: false,
            fault_phase: 0,
            phase_started: None,
        }
    }

    pub fn mode(&self) -> OperatingMode {
        self.mode
    }

    pub fn fault_reason(&self) -> Option<FaultReason> {
        match self.mode {
            OperatingMode::Fault(reason) => Some(reason),
            OperatingMode::Invalid => Some(FaultReason::InvalidMode),
            _ => None,
        }
    }

    /// The last calibrated reading taken, in Celsius.
    pub fn last_reading(&self) -> Option<f32> {
        self.last_reading
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Restores a mode persisted before a reset and restarts the matching
    /// acquisition style.
    pub fn resume<P: ConversionPort, const N: usize>(
        &mut self,
        bits: u8,
        seq: &mut Sequencer<P, N>,
    ) -> Result<()> {
        let mode = OperatingMode::from_bits(bits);
        self.enter(mode);
        match mode {
            OperatingMode::Idle => Ok(()),
            OperatingMode::Active => seq.start_continuous(),
            OperatingMode::Fault(_) => {
                self.reset_fault_phase();
                seq.start_single()
            }
            OperatingMode::Invalid => {
                seq.stop();
                Ok(())
            }
        }
    }

    /// Runs one pass of the control loop.
    ///
    /// Hardware faults recorded by the sequencer are returned as `Err`;
    /// they are terminal.
    pub fn tick<P: ConversionPort, const N: usize>(
        &mut self,
        seq: &mut Sequencer<P, N>,
        now: Instant,
    ) -> Result<Step> {
        if let Some(error) = seq.take_fault() {
            return Err(error);
        }
        match self.mode {
            OperatingMode::Idle => self.idle(seq, now),
            OperatingMode::Active => self.active(seq, now),
            OperatingMode::Fault(reason) => self.fault(reason, seq, now),
            OperatingMode::Invalid => Ok(self.invalid(seq, now)),
        }
    }

    fn idle<P: ConversionPort, const N: usize>(
        &mut self,
        seq: &mut Sequencer<P, N>,
        now: Instant,
    ) -> Result<Step> {
        if seq.is_ready() {
            let celsius = seq.single_value();
            self.record(celsius, now);
            if !celsius.is_finite() {
                return self.enter_fault(FaultReason::BadReference, seq, now);
            }
            if celsius >= self.config.activation_threshold_c {
                self.enter(OperatingMode::Active);
                self.alive_lit = false;
                seq.start_continuous()?;
                return Ok(Step::render(
                    Render::Temperature(celsius),
                    Sleep::UntilConversion,
                ));
            }
            self.alive_lit = true;
            return Ok(Step::render(
                Render::Alive,
                Sleep::Light(self.config.alive_flash),
            ));
        }

        let render = core::mem::take(&mut self.alive_lit).then_some(Render::Blank);
        let sleep = if seq.is_running() {
            Sleep::UntilConversion
        } else if let Some(wait) = self.remaining(now, self.config.idle_interval) {
            Sleep::Deep(wait)
        } else {
            seq.start_single()?;
            Sleep::UntilConversion
        };
        Ok(Step { render, sleep })
    }

    fn active<P: ConversionPort, const N: usize>(
        &mut self,
        seq: &mut Sequencer<P, N>,
        now: Instant,
    ) -> Result<Step> {
        if !seq.is_ready() {
            if !seq.is_running() || !seq.is_continuous() {
                seq.start_continuous()?;
            }
            return Ok(Step::sleep(Sleep::UntilConversion));
        }
        if let Some(wait) = self.remaining(now, self.config.active_interval) {
            return Ok(Step::sleep(Sleep::Light(wait)));
        }

        let celsius = seq.averaged_value();
        self.record(celsius, now);
        if !celsius.is_finite() {
            return self.enter_fault(FaultReason::BadReference, seq, now);
        }
        if celsius > self.config.safety_ceiling_c {
            return self.enter_fault(FaultReason::OverTemperature, seq, now);
        }
        if celsius < self.config.activation_threshold_c {
            self.enter(OperatingMode::Idle);
            seq.start_single()?;
            return Ok(Step::render(Render::Blank, Sleep::UntilConversion));
        }
        Ok(Step::render(
            Render::Temperature(celsius),
            Sleep::Light(self.config.active_interval),
        ))
    }

    fn fault<P: ConversionPort, const N: usize>(
        &mut self,
        reason: FaultReason,
        seq: &mut Sequencer<P, N>,
        now: Instant,
    ) -> Result<Step> {
        if seq.is_ready() {
            let celsius = seq.single_value();
            self.record(celsius, now);
            if celsius.is_finite() && celsius < self.config.safety_ceiling_c {
                self.enter(OperatingMode::Active);
                seq.start_continuous()?;
                return Ok(Step::render(
                    Render::Temperature(celsius),
                    Sleep::UntilConversion,
                ));
            }
        }
        if !seq.is_running() {
            seq.start_single()?;
        }
        Ok(self.fault_message(reason, now))
    }

    fn invalid<P: ConversionPort, const N: usize>(
        &mut self,
        seq: &mut Sequencer<P, N>,
        now: Instant,
    ) -> Step {
        if seq.is_running() {
            seq.stop();
        }
        self.fault_message(FaultReason::InvalidMode, now)
    }

    fn enter_fault<P: ConversionPort, const N: usize>(
        &mut self,
        reason: FaultReason,
        seq: &mut Sequencer<P, N>,
        now: Instant,
    ) -> Result<Step> {
        self.enter(OperatingMode::Fault(reason));
        self.alive_lit = false;
        self.reset_fault_phase();
        seq.start_single()?;
        Ok(self.fault_message(reason, now))
    }

    /// Advances the two-phase fault message once per `fault_phase` and
    /// sleeps until the next phase change.
    fn fault_message(&mut self, reason: FaultReason, now: Instant) -> Step {
        let render = match self.phase_started {
            Some(started) if now < started + self.config.fault_phase => None,
            started => {
                if started.is_some() {
                    self.fault_phase ^= 1;
                }
                self.phase_started = Some(now);
                Some(Render::Fault {
                    reason,
                    phase: self.fault_phase,
                })
            }
        };
        let next = self.phase_started.unwrap_or(now) + self.config.fault_phase;
        Step {
            render,
            sleep: Sleep::Light(next.saturating_duration_since(now)),
        }
    }

    fn reset_fault_phase(&mut self) {
        self.fault_phase = 0;
        self.phase_started = None;
    }

    fn record(&mut self, celsius: f32, now: Instant) {
        self.last_sample = Some(now);
        self.last_reading = Some(celsius);
    }

    /// Time left until `interval` has passed since the last sample.
    fn remaining(&self, now: Instant, interval: Duration) -> Option<Duration> {
        let due = self.last_sample? + interval;
        (due > now).then(|| due - now)
    }

    fn enter(&mut self, mode: OperatingMode) {
        #[cfg(all(feature = "debug-mode", target_os = "none"))]
        defmt::info!("mode {} -> {}", self.mode, mode);

        self.mode = mode;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::Calibration;
    use crate::error::Error;
    use crate::thermocouple::AcquisitionState;

    #[derive(Default)]
    struct MockPort {
        starts: usize,
    }

    impl ConversionPort for MockPort {
        fn start_round(&mut self) -> Result<()> {
            self.starts += 1;
            Ok(())
        }

        fn abort(&mut self) {}
    }

    const REFERENCE: u32 = 1500;

    fn raw(celsius: f32) -> u32 {
        (REFERENCE as f32 * (1.25 + 0.005 * celsius) / 1.25).round() as u32
    }

    fn setup() -> (Controller, Sequencer<MockPort>) {
        (
            Controller::new(MonitorConfig::DEFAULT),
            Sequencer::new(MockPort::default(), Calibration::DEFAULT),
        )
    }

    fn land(seq: &mut Sequencer<MockPort>, celsius: f32) {
        seq.on_conversion_complete(raw(celsius));
        seq.on_conversion_complete(REFERENCE);
    }

    fn fill(seq: &mut Sequencer<MockPort>, celsius: f32) {
        for _ in 0..crate::config::SAMPLE_WINDOW {
            land(seq, celsius);
        }
    }

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    /// Drives a fresh controller from Idle into Active with a 55 C reading.
    /// The reading is taken at 125 ms.
    fn activate(ctl: &mut Controller, seq: &mut Sequencer<MockPort>) {
        ctl.tick(seq, at(0)).unwrap();
        land(seq, 55.0);
        ctl.tick(seq, at(125)).unwrap();
        assert_eq!(ctl.mode(), OperatingMode::Active);
    }

    #[test]
    fn first_tick_starts_a_single_reading() {
        let (mut ctl, mut seq) = setup();
        let step = ctl.tick(&mut seq, at(0)).unwrap();
        assert_eq!(step, Step::sleep(Sleep::UntilConversion));
        assert!(seq.is_running());
        assert!(!seq.is_continuous());
    }

    #[test]
    fn idle_flashes_then_deep_sleeps_for_the_rest_of_the_interval() {
        let (mut ctl, mut seq) = setup();
        ctl.tick(&mut seq, at(0)).unwrap();
        land(&mut seq, 45.0);

        let step = ctl.tick(&mut seq, at(125)).unwrap();
        assert_eq!(
            step,
            Step::render(Render::Alive, Sleep::Light(ctl.config().alive_flash))
        );
        assert_eq!(ctl.mode(), OperatingMode::Idle);

        let step = ctl.tick(&mut seq, at(250)).unwrap();
        assert_eq!(
            step,
            Step::render(Render::Blank, Sleep::Deep(Duration::from_millis(59_875)))
        );
        assert!(!seq.is_running());

        let step = ctl.tick(&mut seq, at(60_125)).unwrap();
        assert_eq!(step, Step::sleep(Sleep::UntilConversion));
        assert!(seq.is_running());
    }

    #[test]
    fn crossing_activation_upwards_enters_active_once() {
        let (mut ctl, mut seq) = setup();
        ctl.tick(&mut seq, at(0)).unwrap();
        land(&mut seq, 45.0);
        ctl.tick(&mut seq, at(125)).unwrap();
        ctl.tick(&mut seq, at(250)).unwrap();
        ctl.tick(&mut seq, at(60_125)).unwrap();
        assert_eq!(ctl.mode(), OperatingMode::Idle);

        land(&mut seq, 55.0);
        let step = ctl.tick(&mut seq, at(60_250)).unwrap();
        assert_eq!(ctl.mode(), OperatingMode::Active);
        assert!(matches!(step.render, Some(Render::Temperature(t)) if (t - 55.0).abs() < 0.1));
        assert_eq!(step.sleep, Sleep::UntilConversion);
        assert!(seq.is_running());
        assert!(seq.is_continuous());
        assert_eq!(seq.buffer().cursor(), 0);

        // more hot samples keep it active without another transition
        for i in 1..=3u64 {
            fill(&mut seq, 55.0);
            let step = ctl.tick(&mut seq, at(60_250 + i * 1_000)).unwrap();
            assert_eq!(ctl.mode(), OperatingMode::Active);
            assert!(matches!(step.render, Some(Render::Temperature(_))));
            assert!(seq.is_running());
        }
    }

    #[test]
    fn active_displays_once_per_interval() {
        let (mut ctl, mut seq) = setup();
        activate(&mut ctl, &mut seq);

        let step = ctl.tick(&mut seq, at(250)).unwrap();
        assert_eq!(step, Step::sleep(Sleep::UntilConversion));

        fill(&mut seq, 120.0);
        let step = ctl.tick(&mut seq, at(500)).unwrap();
        assert_eq!(step, Step::sleep(Sleep::Light(Duration::from_millis(625))));

        let step = ctl.tick(&mut seq, at(1_125)).unwrap();
        assert_eq!(step.sleep, Sleep::Light(Duration::from_secs(1)));
        match step.render {
            Some(Render::Temperature(t)) => assert!((t - 120.0).abs() < 0.1, "t = {t}"),
            other => panic!("unexpected render {other:?}"),
        }
        assert_eq!(ctl.last_reading().map(|t| t.round()), Some(120.0));
    }

    #[test]
    fn cooling_below_activation_returns_to_idle() {
        let (mut ctl, mut seq) = setup();
        activate(&mut ctl, &mut seq);
        fill(&mut seq, 40.0);

        let step = ctl.tick(&mut seq, at(1_125)).unwrap();
        assert_eq!(ctl.mode(), OperatingMode::Idle);
        assert_eq!(step, Step::render(Render::Blank, Sleep::UntilConversion));
        assert!(!seq.is_continuous());
        assert!(seq.is_running());

        land(&mut seq, 40.0);
        assert!(!seq.is_running());
        let step = ctl.tick(&mut seq, at(1_250)).unwrap();
        assert_eq!(step.render, Some(Render::Alive));
        assert_eq!(ctl.mode(), OperatingMode::Idle);
    }

    #[test]
    fn safety_ceiling_faults_and_recovers() {
        let (mut ctl, mut seq) = setup();
        activate(&mut ctl, &mut seq);
        fill(&mut seq, 260.0);

        let step = ctl.tick(&mut seq, at(1_125)).unwrap();
        assert_eq!(
            ctl.mode(),
            OperatingMode::Fault(FaultReason::OverTemperature)
        );
        assert_eq!(ctl.fault_reason(), Some(FaultReason::OverTemperature));
        assert_eq!(
            step,
            Step::render(
                Render::Fault {
                    reason: FaultReason::OverTemperature,
                    phase: 0
                },
                Sleep::Light(Duration::from_secs(1))
            )
        );
        // the continuous stream ends after the round in flight
        assert!(!seq.is_continuous());

        land(&mut seq, 240.0);
        let step = ctl.tick(&mut seq, at(2_125)).unwrap();
        assert_eq!(ctl.mode(), OperatingMode::Active);
        assert_eq!(ctl.fault_reason(), None);
        assert!(matches!(step.render, Some(Render::Temperature(t)) if (t - 240.0).abs() < 0.1));
        assert!(seq.is_continuous());
    }

    #[test]
    fn ceiling_is_exclusive() {
        let (mut ctl, mut seq) = setup();
        activate(&mut ctl, &mut seq);
        fill(&mut seq, 249.0);
        ctl.tick(&mut seq, at(1_125)).unwrap();
        assert_eq!(ctl.mode(), OperatingMode::Active);
    }

    #[test]
    fn fault_message_alternates_at_one_hertz_while_hot() {
        let (mut ctl, mut seq) = setup();
        activate(&mut ctl, &mut seq);
        fill(&mut seq, 300.0);
        ctl.tick(&mut seq, at(1_125)).unwrap();

        let mut phases = Vec::new();
        for second in 2..6u64 {
            land(&mut seq, 300.0);
            let step = ctl.tick(&mut seq, at(second * 1_000 + 125)).unwrap();
            match step.render {
                Some(Render::Fault { reason, phase }) => {
                    assert_eq!(reason, FaultReason::OverTemperature);
                    phases.push(phase);
                }
                other => panic!("unexpected render {other:?}"),
            }
            assert!(seq.is_running(), "a new single reading is requested");
        }
        assert_eq!(phases, vec![1, 0, 1, 0]);
        assert_eq!(
            ctl.mode(),
            OperatingMode::Fault(FaultReason::OverTemperature)
        );
    }

    #[test]
    fn early_fault_tick_does_not_redraw() {
        let (mut ctl, mut seq) = setup();
        activate(&mut ctl, &mut seq);
        fill(&mut seq, 300.0);
        ctl.tick(&mut seq, at(1_125)).unwrap();

        let step = ctl.tick(&mut seq, at(1_500)).unwrap();
        assert_eq!(step, Step::sleep(Sleep::Light(Duration::from_millis(625))));
    }

    #[test]
    fn broken_reference_faults_then_recovers() {
        let (mut ctl, mut seq) = setup();
        ctl.tick(&mut seq, at(0)).unwrap();
        seq.on_conversion_complete(1500);
        seq.on_conversion_complete(0);

        let step = ctl.tick(&mut seq, at(125)).unwrap();
        assert_eq!(ctl.mode(), OperatingMode::Fault(FaultReason::BadReference));
        assert_eq!(
            step.render,
            Some(Render::Fault {
                reason: FaultReason::BadReference,
                phase: 0
            })
        );
        assert!(ctl.last_reading().unwrap().is_nan());
        assert!(seq.is_running());

        land(&mut seq, 20.0);
        ctl.tick(&mut seq, at(1_125)).unwrap();
        assert_eq!(ctl.mode(), OperatingMode::Active);

        fill(&mut seq, 20.0);
        ctl.tick(&mut seq, at(2_125)).unwrap();
        assert_eq!(ctl.mode(), OperatingMode::Idle);
    }

    #[test]
    fn hardware_fault_is_returned() {
        let (mut ctl, mut seq) = setup();
        ctl.tick(&mut seq, at(0)).unwrap();
        seq.on_conversion_error(9);
        assert_eq!(
            ctl.tick(&mut seq, at(125)),
            Err(Error::Conversion { code: 9 })
        );
    }

    #[test]
    fn mode_bits_round_trip() {
        for mode in [
            OperatingMode::Idle,
            OperatingMode::Active,
            OperatingMode::Fault(FaultReason::OverTemperature),
            OperatingMode::Fault(FaultReason::BadReference),
            OperatingMode::Fault(FaultReason::InvalidMode),
            OperatingMode::Invalid,
        ] {
            assert_eq!(OperatingMode::from_bits(mode.to_bits()), mode);
        }
        assert_eq!(OperatingMode::from_bits(0x00), OperatingMode::Invalid);
        assert_eq!(OperatingMode::from_bits(0x13), OperatingMode::Invalid);
    }

    #[test]
    fn resume_active_restarts_continuous_acquisition() {
        let (mut ctl, mut seq) = setup();
        ctl.resume(OperatingMode::Active.to_bits(), &mut seq).unwrap();
        assert_eq!(ctl.mode(), OperatingMode::Active);
        assert!(seq.is_continuous());
        assert!(seq.is_running());
    }

    #[test]
    fn resume_fault_restarts_single_readings() {
        let (mut ctl, mut seq) = setup();
        let bits = OperatingMode::Fault(FaultReason::OverTemperature).to_bits();
        ctl.resume(bits, &mut seq).unwrap();
        assert_eq!(ctl.fault_reason(), Some(FaultReason::OverTemperature));
        assert!(seq.is_running());
        assert!(!seq.is_continuous());
        assert_eq!(seq.port().starts, 1);

        let step = ctl.tick(&mut seq, at(0)).unwrap();
        assert_eq!(
            step,
            Step::render(
                Render::Fault {
                    reason: FaultReason::OverTemperature,
                    phase: 0
                },
                Sleep::Light(Duration::from_secs(1))
            )
        );

        // a cool reading from the restarted single shot recovers
        land(&mut seq, 180.0);
        ctl.tick(&mut seq, at(1_000)).unwrap();
        assert_eq!(ctl.mode(), OperatingMode::Active);
        assert!(seq.is_continuous());
    }

    #[test]
    fn resume_idle_leaves_acquisition_alone() {
        let (mut ctl, mut seq) = setup();
        ctl.resume(OperatingMode::Idle.to_bits(), &mut seq).unwrap();
        assert_eq!(ctl.mode(), OperatingMode::Idle);
        assert_eq!(seq.state(), AcquisitionState::Idle);
        assert_eq!(seq.port().starts, 0);

        // the first tick then starts the usual single reading
        ctl.tick(&mut seq, at(0)).unwrap();
        assert_eq!(seq.port().starts, 1);
    }

    #[test]
    fn invalid_mode_shows_fault_forever() {
        let (mut ctl, mut seq) = setup();
        ctl.resume(0x42, &mut seq).unwrap();
        assert_eq!(ctl.mode(), OperatingMode::Invalid);
        assert_eq!(ctl.fault_reason(), Some(FaultReason::InvalidMode));

        let step = ctl.tick(&mut seq, at(0)).unwrap();
        assert_eq!(
            step.render,
            Some(Render::Fault {
                reason: FaultReason::InvalidMode,
                phase: 0
            })
        );
        for second in 1..4u64 {
            land(&mut seq, 20.0);
            let step = ctl.tick(&mut seq, at(second * 1_000)).unwrap();
            assert!(matches!(step.render, Some(Render::Fault { .. })));
            assert!(!seq.is_running());
        }
        assert_eq!(ctl.mode(), OperatingMode::Invalid);
        assert_eq!(seq.port().starts, 0);
    }
}
