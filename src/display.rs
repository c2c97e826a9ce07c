//! Output side: 4-digit 14-segment LED backpack.
//!
//! The backpack is an HT16K33 LED driver on I2C. Everything it needs is a
//! handful of one-byte commands and a 17-byte RAM image, so the driver here
//! is generic over any blocking `embedded-hal` I2C bus.
//!
//! [`Frame`] holds the four glyph bitmasks and knows how to lay out a
//! temperature with as many decimals as fit.

use embedded_hal::blocking::i2c::Write;

use crate::error::{Error, Result};
use crate::mode::{FaultReason, Render};

/// Number of digits on the backpack.
pub const DIGITS: usize = 4;

/// Decimal point segment of a glyph.
const POINT: u16 = 1 << 14;

/// 14-segment glyphs for ASCII 0x20 (space) through 0x5F (underscore).
#[rustfmt::skip]
const FONT: [u16; 64] = [
    0x0000, 0x0006, 0x0220, 0x12CE, 0x12ED, 0x0C24, 0x235D, 0x0400, //  !"#$%&'
    0x2400, 0x0900, 0x3FC0, 0x12C0, 0x0800, 0x00C0, 0x0000, 0x0C00, // ()*+,-./
    0x0C3F, 0x0006, 0x00DB, 0x008F, 0x00E6, 0x2069, 0x00FD, 0x0007, // 01234567
    0x00FF, 0x00EF, 0x1200, 0x0A00, 0x2400, 0x00C8, 0x0900, 0x1083, // 89:;<=>?
    0x02BB, 0x00F7, 0x128F, 0x0039, 0x120F, 0x00F9, 0x0071, 0x00BD, // @ABCDEFG
    0x00F6, 0x1200, 0x001E, 0x2470, 0x0038, 0x0536, 0x2136, 0x003F, // HIJKLMNO
    0x00F3, 0x203F, 0x20F3, 0x00ED, 0x1201, 0x003E, 0x0C30, 0x2836, // PQRSTUVW
    0x2D00, 0x1500, 0x0C09, 0x0039, 0x2100, 0x000F, 0x0C03, 0x0008, // XYZ[\]^_
];

/// Glyph for an ASCII character. Lowercase letters use the uppercase glyph;
/// anything without a glyph renders blank.
pub fn glyph(c: char) -> u16 {
    let c = c.to_ascii_uppercase();
    match c as u32 {
        code @ 0x20..=0x5F => FONT[(code - 0x20) as usize],
        _ => 0,
    }
}

/// Glyph for a single decimal digit.
pub fn digit(value: u8) -> u16 {
    FONT[0x10 + (value % 10) as usize]
}

/// Contents of the four digits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Frame {
    glyphs: [u16; DIGITS],
}

impl Frame {
    pub const fn blank() -> Self {
        Self {
            glyphs: [0; DIGITS],
        }
    }

    pub const fn from_glyphs(glyphs: [u16; DIGITS]) -> Self {
        Self { glyphs }
    }

    /// Up to four characters, left aligned. Missing characters are blank.
    pub fn text(text: &str) -> Self {
        let mut frame = Self::blank();
        for (slot, c) in frame.glyphs.iter_mut().zip(text.chars()) {
            *slot = glyph(c);
        }
        frame
    }

    /// Lays out a value in `[0, 1000)` with the most precision that fits:
    /// `TO.th` below 100, `HTO.t` otherwise. Anything else shows `----`.
    pub fn number(value: f32) -> Self {
        if !(0.0..1000.0).contains(&value) {
            return Self::text("----");
        }
        let whole = value as u32;
        let tenths = ((value * 10.0) as u32 % 10) as u8;
        if value < 100.0 {
            let hundredths = ((value * 100.0) as u32 % 10) as u8;
            let tens = if value < 10.0 {
                0
            } else {
                digit((whole / 10) as u8)
            };
            Self::from_glyphs([
                tens,
                digit((whole % 10) as u8) | POINT,
                digit(tenths),
                digit(hundredths),
            ])
        } else {
            Self::from_glyphs([
                digit((whole / 100) as u8),
                digit((whole / 10 % 10) as u8),
                digit((whole % 10) as u8) | POINT,
                digit(tenths),
            ])
        }
    }

    /// A Celsius reading in the configured display unit.
    pub fn temperature(celsius: f32) -> Self {
        #[cfg(feature = "fahrenheit")]
        let value = crate::calibration::celsius_to_fahrenheit(celsius);
        #[cfg(not(feature = "fahrenheit"))]
        let value = celsius;
        Self::number(value)
    }

    /// Idle indicator: only the last decimal point lit.
    pub const fn alive() -> Self {
        Self::from_glyphs([0, 0, 0, POINT])
    }

    /// One half of the two-phase fault message.
    pub fn fault(reason: FaultReason, phase: u8) -> Self {
        if phase % 2 == 0 {
            Self::text(reason.code())
        } else {
            Self::text("ERR!")
        }
    }

    pub fn glyphs(&self) -> &[u16; DIGITS] {
        &self.glyphs
    }

    /// HT16K33 display RAM write: start address 0, then eight rows of
    /// 16 bits, low byte first. Only the first four rows are wired.
    pub fn ram_image(&self) -> [u8; 17] {
        let mut data = [0u8; 17];
        for (i, glyph) in self.glyphs.iter().enumerate() {
            data[2 * i + 1..2 * i + 3].copy_from_slice(&glyph.to_le_bytes());
        }
        data
    }
}

impl From<Render> for Frame {
    fn from(render: Render) -> Self {
        match render {
            Render::Temperature(celsius) => Frame::temperature(celsius),
            Render::Alive => Frame::alive(),
            Render::Blank => Frame::blank(),
            Render::Fault { reason, phase } => Frame::fault(reason, phase),
        }
    }
}

/// Blink rates supported by the HT16K33.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum BlinkRate {
    Off = 0,
    TwoHz = 1,
    OneHz = 2,
    HalfHz = 3,
}

const CMD_OSCILLATOR_ON: u8 = 0x21;
const CMD_BLINK: u8 = 0x80;
const BLINK_DISPLAY_ON: u8 = 0x01;
const CMD_BRIGHTNESS: u8 = 0xE0;
const MAX_BRIGHTNESS: u8 = 15;

/// HT16K33 backpack on a blocking I2C bus.
pub struct Backpack<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C: Write> Backpack<I2C> {
    /// Factory default 7-bit address with no solder jumpers bridged.
    pub const DEFAULT_ADDRESS: u8 = 0x70;

    pub fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Starts the oscillator, turns the display on without blinking and
    /// sets full brightness.
    pub fn init(&mut self) -> Result<()> {
        self.command(CMD_OSCILLATOR_ON)?;
        self.set_blink(BlinkRate::Off)?;
        self.set_brightness(MAX_BRIGHTNESS)
    }

    /// Sets the PWM brightness, saturating at 15.
    pub fn set_brightness(&mut self, level: u8) -> Result<()> {
        self.command(CMD_BRIGHTNESS | level.min(MAX_BRIGHTNESS))
    }

    pub fn set_blink(&mut self, rate: BlinkRate) -> Result<()> {
        self.command(CMD_BLINK | BLINK_DISPLAY_ON | ((rate as u8) << 1))
    }

    pub fn show(&mut self, frame: &Frame) -> Result<()> {
        self.i2c
            .write(self.address, &frame.ram_image())
            .map_err(|_| Error::DisplayBus)
    }

    pub fn clear(&mut self) -> Result<()> {
        self.show(&Frame::blank())
    }

    pub fn release(self) -> I2C {
        self.i2c
    }

    fn command(&mut self, cmd: u8) -> Result<()> {
        self.i2c
            .write(self.address, &[cmd])
            .map_err(|_| Error::DisplayBus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct MockBus {
        writes: Vec<(u8, Vec<u8>)>,
        fail: bool,
    }

    impl Write for MockBus {
        type Error = ();

        fn write(&mut self, address: u8, bytes: &[u8]) -> core::result::Result<(), ()> {
            if self.fail {
                return Err(());
            }
            self.writes.push((address, bytes.to_vec()));
            Ok(())
        }
    }

    #[test]
    fn two_digit_reading_shows_hundredths() {
        let frame = Frame::number(42.25);
        assert_eq!(
            frame.glyphs(),
            &[digit(4), digit(2) | POINT, digit(2), digit(5)]
        );
    }

    #[test]
    fn single_digit_reading_blanks_leading_zero() {
        let frame = Frame::number(7.5);
        assert_eq!(frame.glyphs(), &[0, digit(7) | POINT, digit(5), digit(0)]);
    }

    #[test]
    fn three_digit_reading_moves_the_point() {
        let frame = Frame::number(231.5);
        assert_eq!(
            frame.glyphs(),
            &[digit(2), digit(3), digit(1) | POINT, digit(5)]
        );
    }

    #[test]
    fn out_of_range_values_show_dashes() {
        let dashes = Frame::text("----");
        assert_eq!(Frame::number(1000.0), dashes);
        assert_eq!(Frame::number(-0.5), dashes);
        assert_eq!(Frame::number(f32::NAN), dashes);
        assert_eq!(Frame::number(f32::INFINITY), dashes);
    }

    #[test]
    fn text_uses_font_and_pads_with_blanks() {
        let frame = Frame::text("hi");
        assert_eq!(frame.glyphs(), &[0x00F6, 0x1200, 0, 0]);
        assert_eq!(Frame::text("ERR!").glyphs(), &[0x00F9, 0x20F3, 0x20F3, 0x0006]);
        assert_eq!(glyph('~'), 0);
    }

    #[test]
    fn fault_frames_alternate_reason_and_err() {
        assert_eq!(
            Frame::fault(FaultReason::OverTemperature, 0),
            Frame::text("HOT ")
        );
        assert_eq!(
            Frame::fault(FaultReason::OverTemperature, 1),
            Frame::text("ERR!")
        );
        assert_eq!(Frame::from(Render::Blank), Frame::blank());
        assert_eq!(Frame::from(Render::Alive), Frame::alive());
    }

    #[test]
    fn ram_image_is_little_endian_rows() {
        let frame = Frame::from_glyphs([0x1234, 0x00FF, 0x4000, 0x0000]);
        let image = frame.ram_image();
        assert_eq!(image[0], 0);
        assert_eq!(&image[1..9], &[0x34, 0x12, 0xFF, 0x00, 0x00, 0x40, 0x00, 0x00]);
        assert!(image[9..].iter().all(|&b| b == 0));
    }

    #[test]
    fn init_sends_oscillator_blink_and_brightness() {
        let mut backpack = Backpack::new(MockBus::default(), Backpack::<MockBus>::DEFAULT_ADDRESS);
        backpack.init().unwrap();
        backpack.set_brightness(40).unwrap();
        let bus = backpack.release();
        let sent: Vec<_> = bus.writes.iter().map(|(a, b)| (*a, b.clone())).collect();
        assert_eq!(
            sent,
            vec![
                (0x70, vec![0x21]),
                (0x70, vec![0x81]),
                (0x70, vec![0xEF]),
                (0x70, vec![0xEF]),
            ]
        );
    }

    #[test]
    fn show_writes_the_ram_image() {
        let mut backpack = Backpack::new(MockBus::default(), 0x71);
        let frame = Frame::number(12.34);
        backpack.show(&frame).unwrap();
        let bus = backpack.release();
        assert_eq!(bus.writes.len(), 1);
        assert_eq!(bus.writes[0].0, 0x71);
        assert_eq!(bus.writes[0].1, frame.ram_image().to_vec());
    }

    #[test]
    fn bus_failure_maps_to_display_error() {
        let bus = MockBus {
            fail: true,
            ..Default::default()
        };
        let mut backpack = Backpack::new(bus, 0x70);
        assert_eq!(backpack.init(), Err(Error::DisplayBus));
        assert_eq!(backpack.show(&Frame::blank()), Err(Error::DisplayBus));
    }
}
