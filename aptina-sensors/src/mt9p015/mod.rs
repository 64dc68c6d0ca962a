// SPDX-License-Identifier: Apache-2.0
// Copyright © 2026 The aptina-sensors developers
//! The MT9P015 5 MP sensor.
//!
//! Unlike the other sensors here the MT9P015 mostly follows the SMIA register layout: 16-bit
//! register addresses holding 8, 16 or 32-bit values. Every write is retried, and the sensor is
//! driven through three power states instead of a power count. Turning it on the first time only
//! detects it, after that every power-up programs the mode for the current format and frame rate
//! and starts streaming.
use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::blocking::i2c;

use crate::bus::{read_sized, write_list, write_sized_retry, RegisterWrite, Width};
use crate::controls::{ControlCache, ControlId, ControlRange};
use crate::debug::{parse_decimal, show_decimal, RegisterDebug};
use crate::error::{Error, LibraryError};
use crate::format::{calc_size, find_isize, Fract, FrameSize, PixFormat, PixelFormat};
use crate::power::{PowerState, SensorPlatform};
use crate::subdev::Subdevice;

mod tables;

pub use tables::Timing;
use tables::*;

pub const DEFAULT_ADDRESS: u8 = 0x10;

const MODEL_ID_VALUE: u16 = 0x2803;
const MANUFACTURER_ID_VALUE: u8 = 0x06;

/// Nominal external clock.
pub const XCLK_NOM: u32 = 24_000_000;

pub const MIN_FPS: u32 = 13;
pub const DEFAULT_FPS: u32 = 30;
pub const MAX_FPS: u32 = 60;

pub const MIN_GAIN: i32 = 0;
pub const MAX_GAIN: i32 = 159;
pub const DEFAULT_GAIN_INDEX: i32 = 50;

/// Exposure limits in microseconds before a mode has been programmed.
pub const MIN_EXPOSURE: i32 = 2000;
pub const MAX_EXPOSURE: i32 = 27000;
pub const DEFAULT_EXPOSURE: i32 = 17500;

const CONTROL_COUNT: usize = 2;

/// Supported output sizes, smallest first.
pub const SIZES: [FrameSize; 5] = [
    FrameSize::new(640, 480),
    FrameSize::new(1280, 720),
    FrameSize::new(1920, 1080),
    FrameSize::new(2048, 1536),
    FrameSize::new(2592, 1944),
];

const ISIZE_720P: usize = 1;
const ISIZE_1080P: usize = 2;

/// Frame intervals, slowest first.
pub const FRAME_INTERVALS: [Fract; 2] = [Fract::new(1, 13), Fract::new(1, 30)];

/// Clock and exposure figures for the programmed mode.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ModeTiming {
    pub timing: Timing,
    pub pll_multiplier: u32,
    /// Video timing pixel clock in Hz.
    pub pix_clk: u32,
    /// Exposure limits in microseconds.
    pub min_exposure: u32,
    pub max_exposure: u32,
}

impl ModeTiming {
    /// Work out the PLL multiplier, pixel clock and exposure limits for a timing row.
    pub fn new(timing: Timing, fps: u32, xclk: u32) -> Self {
        let t = timing;
        let clk_div = (t.vt_pix_clk_div * t.vt_sys_clk_div) as u64;
        let vt_pix_clk = fps as u64 * t.frame_lines as u64 * t.line_len as u64;
        let pll_multiplier = ((vt_pix_clk * clk_div / xclk as u64) * t.pre_pll_div as u64 + 1)
            .clamp(t.min_pll as u64, t.max_pll as u64) as u32;
        let pix_clk = (xclk / (t.pre_pll_div * t.vt_pix_clk_div * t.vt_sys_clk_div)) * pll_multiplier;
        let min_exposure = (t.fine_int_time as u64 * 1_000_000 / pix_clk as u64 + 1) * 100;
        let exposure_factor =
            ((t.frame_lines as u64 - 1) * t.line_len as u64 + t.fine_int_time as u64) * 100;
        let max_exposure = (exposure_factor / (pix_clk / 100) as u64) * 100;
        Self {
            timing,
            pll_multiplier,
            pix_clk,
            min_exposure: min_exposure as u32,
            max_exposure: max_exposure as u32,
        }
    }

    /// Coarse integration time in lines for an exposure in microseconds.
    pub fn coarse_integration(&self, exposure: u32) -> u16 {
        let t = self.timing;
        let lines = ((exposure as i64 / 10) * (self.pix_clk as i64 / 1000) / 1000
            - t.fine_int_time as i64 / 10)
            / (t.line_len as i64 / 10);
        lines.clamp(0, u16::MAX as i64) as u16
    }
}

/// Timing row and frame rate used for a size index at a requested frame rate.
///
/// The three largest sizes only run at the minimum frame rate.
fn select_timing(size_index: usize, fps: u32) -> (Timing, u32) {
    match size_index {
        i if i > ISIZE_1080P => (TIMING_5MP, MIN_FPS),
        ISIZE_1080P => (TIMING_1080P_30, MIN_FPS),
        ISIZE_720P if fps > 30 => (TIMING_720P_60, fps),
        ISIZE_720P => (TIMING_720P_30, fps),
        _ => (TIMING_VGA, fps),
    }
}

/// Which row of [`MODES`] a frame rate uses.
fn fps_index(fps: u32, size_index: usize) -> usize {
    let threshold = if size_index > ISIZE_720P { MIN_FPS } else { 30 };
    (fps > threshold) as usize
}

/// Driver for an MT9P015.
#[derive(Debug)]
pub struct Mt9p015<I2C, D, P> {
    bus: I2C,
    delay: D,
    platform: P,
    address: u8,

    state: PowerState,
    detected: bool,
    revision: u8,

    pix: PixFormat,
    time_per_frame: Fract,
    fps: u32,
    xclk: u32,
    mode: Option<ModeTiming>,

    controls: ControlCache<CONTROL_COUNT>,
}

impl<I2C, D, P> Mt9p015<I2C, D, P>
where
    I2C: i2c::WriteRead + i2c::Write,
    D: DelayMs<u32>,
    P: SensorPlatform,
{
    pub fn new(bus: I2C, delay: D, platform: P) -> Self {
        Self::new_with_address(bus, delay, platform, DEFAULT_ADDRESS)
    }

    pub fn new_with_address(bus: I2C, delay: D, platform: P, address: u8) -> Self {
        let mut controls = ControlCache::new();
        controls
            .add_integer(
                ControlId::Exposure,
                ControlRange::new(MIN_EXPOSURE, MAX_EXPOSURE, 1, DEFAULT_EXPOSURE),
            )
            .add_integer(
                ControlId::Gain,
                ControlRange::new(MIN_GAIN, MAX_GAIN, 1, DEFAULT_GAIN_INDEX),
            );
        Self {
            bus,
            delay,
            platform,
            address,
            state: PowerState::Off,
            detected: false,
            revision: 0,
            pix: PixFormat::packed(SIZES[0], PixelFormat::Sgrbg10),
            time_per_frame: Fract::new(1, DEFAULT_FPS),
            fps: DEFAULT_FPS,
            xclk: XCLK_NOM,
            mode: None,
            controls,
        }
    }

    pub fn release(self) -> (I2C, D, P) {
        (self.bus, self.delay, self.platform)
    }

    pub fn power_state(&self) -> PowerState {
        self.state
    }

    pub fn is_detected(&self) -> bool {
        self.detected
    }

    /// Silicon revision, read during detection.
    pub fn revision(&self) -> u8 {
        self.revision
    }

    /// Figures for the last programmed mode.
    pub fn mode_timing(&self) -> Option<ModeTiming> {
        self.mode
    }

    fn read(&mut self, register: u16, width: Width) -> Result<u32, Error<I2C>> {
        read_sized(&mut self.bus, self.address, register, width)
    }

    fn write_list(&mut self, list: &[RegisterWrite]) -> Result<(), Error<I2C>> {
        write_list(&mut self.bus, &mut self.delay, self.address, list)
    }

    /// Check the model and manufacturer IDs and record the revision.
    pub fn detect(&mut self) -> Result<(), Error<I2C>> {
        let model = self.read(MODEL_ID, Width::Word)? as u16;
        let manufacturer = self.read(MANUFACTURER_ID, Width::Byte)? as u8;
        let revision = self.read(REVISION_NUMBER, Width::Byte)? as u8;
        log::info!(
            "model id 0x{:04x}, manufacturer 0x{:02x}, revision 0x{:02x}",
            model,
            manufacturer,
            revision
        );
        if model != MODEL_ID_VALUE || manufacturer != MANUFACTURER_ID_VALUE {
            log::warn!(
                "model id mismatch, got 0x{:04x} expecting 0x{:04x}",
                model,
                MODEL_ID_VALUE
            );
            return Err(LibraryError::ChipNotDetected {
                expected: MODEL_ID_VALUE,
                found: model,
            }
            .into());
        }
        self.revision = revision;
        Ok(())
    }

    fn init_device(&mut self) -> Result<(), Error<I2C>> {
        self.delay.delay_ms(10);
        self.detect().map_err(|err| {
            log::error!("Unable to detect MT9P015 sensor");
            err
        })?;
        self.detected = true;
        log::info!("MT9P015 detected at address 0x{:02x}", self.address);
        Ok(())
    }

    /// Move to a new power state.
    ///
    /// The first switch to [`PowerState::On`] detects the sensor; later ones program the current
    /// format and start streaming. A failed detection turns the sensor back off.
    pub fn set_power(&mut self, state: PowerState) -> Result<(), Error<I2C>> {
        match state {
            PowerState::On => {
                self.platform.set_power(PowerState::On);
                self.state = PowerState::On;
                let result = if self.detected {
                    self.configure()
                } else {
                    self.init_device()
                };
                if let Err(err) = result {
                    if !self.detected {
                        self.power_off();
                    }
                    return Err(err);
                }
            }
            PowerState::Off => self.power_off(),
            PowerState::Standby => {
                if self.detected {
                    self.write_list(&STREAM_OFF)?;
                }
                self.platform.set_power(PowerState::Standby);
                self.platform.set_xclk(0);
                self.state = PowerState::Standby;
            }
        }
        Ok(())
    }

    fn power_off(&mut self) {
        self.platform.set_power(PowerState::Off);
        self.platform.set_xclk(0);
        self.state = PowerState::Off;
    }

    /// Program the mode for the current format and frame rate, then start streaming.
    pub fn configure(&mut self) -> Result<(), Error<I2C>> {
        let size_index = find_isize(&SIZES, self.pix.width);
        self.write_list(&COMMON)?;
        let mode = MODES[fps_index(self.fps, size_index)][size_index];
        log::debug!("MT9P015 mode {}", mode.name);
        self.write_mode(&mode)?;
        self.calc_pll(size_index);
        self.restore_controls()?;
        self.write_list(&STREAM_ON)
    }

    fn write_mode(&mut self, mode: &Mode) -> Result<(), Error<I2C>> {
        self.write_list(&STREAM_OFF)?;
        self.delay.delay_ms(mode.stop_ms);
        self.write_list(&PLL_SETUP)?;
        self.delay.delay_ms(mode.lock_ms);
        self.write_list(mode.window)?;
        if mode.restart {
            self.write_list(&STREAM_ON[..1])?;
        }
        Ok(())
    }

    /// Work out the clocks of the selected mode and update the exposure limits to match.
    ///
    /// Sizes of 1080p and up drop the stored frame rate to [`MIN_FPS`], and it stays there for
    /// later modes until the frame interval is set again.
    fn calc_pll(&mut self, size_index: usize) {
        let (timing, fps) = select_timing(size_index, self.fps);
        self.fps = fps;
        let mode = ModeTiming::new(timing, fps, self.xclk);
        log::debug!(
            "PLL multiplier {}, pixel clock {} Hz, exposure {}..{} us",
            mode.pll_multiplier,
            mode.pix_clk,
            mode.min_exposure,
            mode.max_exposure
        );
        self.controls.set_limits(
            ControlId::Exposure,
            mode.min_exposure as i32,
            mode.max_exposure as i32,
        );
        self.mode = Some(mode);
    }

    /// Apply the cached controls to a freshly programmed mode.
    ///
    /// An exposure outside the new mode's limits is pulled back inside them.
    fn restore_controls(&mut self) -> Result<(), Error<I2C>> {
        if let Some(gain) = self.controls.get(ControlId::Gain) {
            self.write_gain(gain)?;
        }
        if let (Some(exposure), Some(range)) = (
            self.controls.get(ControlId::Exposure),
            self.controls.range(ControlId::Exposure),
        ) {
            let exposure = range.clamp(exposure);
            self.write_exposure(exposure)?;
            self.controls.commit(ControlId::Exposure, exposure);
        }
        Ok(())
    }

    fn write_exposure(&mut self, exposure: i32) -> Result<(), Error<I2C>> {
        let mode = match self.mode {
            Some(mode) => mode,
            None => return Ok(()),
        };
        let lines = mode.coarse_integration(exposure.max(0) as u32);
        log::debug!("exposure {} us, {} lines", exposure, lines);
        self.write_list(&[
            RegisterWrite::Byte(GROUPED_PAR_HOLD, 0x01),
            RegisterWrite::Word(COARSE_INT_TIME, lines),
            RegisterWrite::Byte(GROUPED_PAR_HOLD, 0x00),
        ])
    }

    fn write_gain(&mut self, gain: i32) -> Result<(), Error<I2C>> {
        let value = GAIN_TABLE[gain.clamp(MIN_GAIN, MAX_GAIN) as usize];
        self.write_list(&[
            RegisterWrite::Byte(GROUPED_PAR_HOLD, 0x01),
            RegisterWrite::Word(GAIN_GREEN1, value),
            RegisterWrite::Word(GAIN_RED, value),
            RegisterWrite::Word(GAIN_BLUE, value),
            RegisterWrite::Word(GAIN_GREEN2, value),
            RegisterWrite::Word(GAIN_GLOBAL, value),
            RegisterWrite::Byte(GROUPED_PAR_HOLD, 0x00),
        ])
    }

    pub fn control(&self, id: ControlId) -> Option<i32> {
        self.controls.get(id)
    }

    pub fn control_range(&self, id: ControlId) -> Option<ControlRange> {
        self.controls.range(id)
    }

    /// Set exposure (in microseconds) or gain (a [`GAIN_TABLE`] index).
    ///
    /// Exposures outside the current limits are rejected, gains are clamped. The hardware is
    /// only written while the sensor is on and has a mode programmed; otherwise the value is kept
    /// for the next power-up.
    pub fn set_control(&mut self, id: ControlId, value: i32) -> Result<i32, Error<I2C>> {
        let range = self
            .controls
            .range(id)
            .ok_or(LibraryError::InvalidArgument("unsupported control"))?;
        let value = match id {
            ControlId::Exposure if !range.contains(value) => {
                log::error!(
                    "Exposure time {} us not within the legal range {}..{}",
                    value,
                    range.min,
                    range.max
                );
                return Err(LibraryError::InvalidArgument("exposure time out of range").into());
            }
            ControlId::Gain if !range.contains(value) => {
                log::error!("Gain {} out of range, clamped", value);
                range.clamp(value)
            }
            _ => value,
        };
        if self.state == PowerState::On && self.mode.is_some() {
            match id {
                ControlId::Exposure => self.write_exposure(value)?,
                _ => self.write_gain(value)?,
            }
        }
        self.controls.commit(id, value);
        Ok(value)
    }

    pub fn enum_fmt(&self, index: u32) -> Result<(PixelFormat, &'static str), LibraryError> {
        match index {
            0 => Ok((PixelFormat::Sgrbg10, "Bayer10 (GrR/BGb)")),
            _ => Err(LibraryError::InvalidArgument("format index")),
        }
    }

    /// The closest supported format to a request. Any pixel format turns into 10-bit Bayer.
    pub fn try_fmt(&self, width: u32, height: u32) -> PixFormat {
        let size = SIZES[calc_size(&SIZES, width, height)];
        PixFormat::packed(size, PixelFormat::Sgrbg10)
    }

    /// Store the closest supported format. It takes effect on the next power-up.
    pub fn set_fmt(&mut self, width: u32, height: u32) -> PixFormat {
        self.pix = self.try_fmt(width, height);
        self.pix
    }

    pub fn get_fmt(&self) -> PixFormat {
        self.pix
    }

    pub fn time_per_frame(&self) -> Fract {
        self.time_per_frame
    }

    /// Set the frame interval, returning the external clock to run the sensor at.
    ///
    /// A zero numerator or denominator asks for the default 30 fps. The rate is clamped to
    /// [`MIN_FPS`]..=[`MAX_FPS`] and the stored interval rounded to a whole frame rate.
    pub fn set_frame_interval(&mut self, interval: Fract) -> u32 {
        let interval = if interval.numerator == 0 || interval.denominator == 0 {
            Fract::new(1, DEFAULT_FPS)
        } else {
            interval
        };
        self.fps = (interval.denominator / interval.numerator).clamp(MIN_FPS, MAX_FPS);
        self.time_per_frame = Fract::new(1, self.fps);
        self.xclk = XCLK_NOM;
        self.xclk
    }

    pub fn enum_frame_sizes(&self, index: u32) -> Result<FrameSize, LibraryError> {
        SIZES
            .get(index as usize)
            .copied()
            .ok_or(LibraryError::InvalidArgument("frame size index"))
    }

    /// Frame intervals available at a size. The three largest sizes only run at 13 fps.
    pub fn enum_frame_intervals(
        &self,
        index: u32,
        width: u32,
        height: u32,
    ) -> Result<Fract, LibraryError> {
        let large = SIZES[ISIZE_1080P..]
            .iter()
            .any(|size| size.width == width && size.height == height);
        let count = if large { 1 } else { FRAME_INTERVALS.len() };
        if index as usize >= count {
            return Err(LibraryError::InvalidArgument("frame interval index"));
        }
        Ok(FRAME_INTERVALS[index as usize])
    }

    pub fn show_exposure<W: core::fmt::Write>(&self, out: &mut W) -> Result<(), LibraryError> {
        show_decimal(out, self.controls.get(ControlId::Exposure).unwrap_or_default())
    }

    pub fn store_exposure(&mut self, input: &str) -> Result<(), Error<I2C>> {
        let value = parse_decimal(input)?;
        self.set_control(ControlId::Exposure, value).map(|_| ())
    }

    pub fn show_gain<W: core::fmt::Write>(&self, out: &mut W) -> Result<(), LibraryError> {
        show_decimal(out, self.controls.get(ControlId::Gain).unwrap_or_default())
    }

    pub fn store_gain(&mut self, input: &str) -> Result<(), Error<I2C>> {
        let value = parse_decimal(input)?;
        self.set_control(ControlId::Gain, value).map(|_| ())
    }

    /// Describe the sensor state on one line.
    pub fn describe<W: core::fmt::Write>(&self, out: &mut W) -> Result<(), LibraryError> {
        writeln!(
            out,
            "MT9P015 rev 0x{:02x} {:?} {}x{} @ {} fps",
            self.revision, self.state, self.pix.width, self.pix.height, self.fps
        )
        .map_err(|_| LibraryError::Other("output buffer full"))
    }
}

impl<I2C, D, P> Subdevice for Mt9p015<I2C, D, P>
where
    I2C: i2c::WriteRead + i2c::Write,
    D: DelayMs<u32>,
    P: SensorPlatform,
{
    type Error = Error<I2C>;

    /// Power up long enough to detect the sensor.
    fn registered(&mut self) -> Result<(), Self::Error> {
        self.set_power(PowerState::On)?;
        self.set_power(PowerState::Off)
    }

    fn set_power(&mut self, on: bool) -> Result<(), Self::Error> {
        let state = if on { PowerState::On } else { PowerState::Off };
        Mt9p015::set_power(self, state)
    }

    fn set_stream(&mut self, enable: bool) -> Result<(), Self::Error> {
        if enable {
            self.configure()
        } else {
            self.write_list(&STREAM_OFF)
        }
    }

    fn frame_size(&self) -> FrameSize {
        self.pix.size()
    }

    fn set_frame_size(&mut self, width: u32, height: u32) -> Result<FrameSize, Self::Error> {
        Ok(self.set_fmt(width, height).size())
    }
}

impl<I2C, D, P> RegisterDebug for Mt9p015<I2C, D, P>
where
    I2C: i2c::WriteRead + i2c::Write,
    D: DelayMs<u32>,
    P: SensorPlatform,
{
    type Error = Error<I2C>;

    fn debug_read(&mut self, address: u16, width: Width) -> Result<u32, Self::Error> {
        self.read(address, width)
    }

    fn debug_write(&mut self, address: u16, width: Width, value: u32) -> Result<(), Self::Error> {
        write_sized_retry(&mut self.bus, &mut self.delay, self.address, address, width, value)
    }
}

#[cfg(test)]
mod test {
    extern crate std;

    use std::string::String;
    use std::vec;
    use std::vec::Vec;

    use crate::debug::RegisterWindow;
    use crate::test::*;

    use super::*;

    type Sensor = Mt9p015<MockSensorBus, MockDelay, MockPlatform>;

    fn sensor() -> (MockSensorBus, Sensor) {
        let bus = MockSensorBus::new_16bit(DEFAULT_ADDRESS);
        bus.set_register(MODEL_ID, 0x2803);
        bus.set_register(MANUFACTURER_ID, 0x06);
        bus.set_register(REVISION_NUMBER, 0x02);
        let sensor = Mt9p015::new(bus.clone(), bus.delay(), bus.platform());
        (bus, sensor)
    }

    /// A detected sensor that's been through one full configuration.
    fn streaming() -> (MockSensorBus, Sensor) {
        let (bus, mut sensor) = sensor();
        sensor.set_power(PowerState::On).unwrap();
        sensor.set_power(PowerState::On).unwrap();
        bus.clear_events();
        (bus, sensor)
    }

    #[test]
    fn first_power_on_detects() {
        let (bus, mut sensor) = sensor();
        sensor.set_power(PowerState::On).unwrap();
        assert!(sensor.is_detected());
        assert_eq!(sensor.revision(), 0x02);
        assert_eq!(
            bus.events(),
            vec![
                Event::Power(PowerState::On),
                Event::Delay(10),
                Event::Read { address: 0x0000 },
                Event::Read { address: 0x0003 },
                Event::Read { address: 0x0002 },
            ]
        );
        assert!(sensor.mode_timing().is_none());
    }

    #[test]
    fn failed_detection_powers_off() {
        let (bus, mut sensor) = sensor();
        bus.set_register(MODEL_ID, 0x2800);
        assert!(matches!(
            sensor.set_power(PowerState::On),
            Err(Error::LibraryError(LibraryError::ChipNotDetected {
                expected: 0x2803,
                found: 0x2800
            }))
        ));
        assert!(!sensor.is_detected());
        assert_eq!(sensor.power_state(), PowerState::Off);
        let events = bus.events();
        assert_eq!(
            &events[events.len() - 2..],
            &[Event::Power(PowerState::Off), Event::Xclk(0)]
        );
    }

    #[test]
    fn wrong_manufacturer() {
        let (bus, mut sensor) = sensor();
        bus.set_register(MANUFACTURER_ID, 0x07);
        assert!(sensor.set_power(PowerState::On).is_err());
    }

    #[test]
    fn vga_timing() {
        let mode = ModeTiming::new(TIMING_VGA, 30, XCLK_NOM);
        assert_eq!(mode.pll_multiplier, 36);
        assert_eq!(mode.pix_clk, 72_000_000);
        assert_eq!(mode.min_exposure, 2500);
        assert_eq!(mode.max_exposure, 22700);
        assert_eq!(mode.coarse_integration(17500), 432);
    }

    #[test]
    fn full_resolution_timing() {
        let (timing, fps) = select_timing(4, 30);
        assert_eq!(timing, TIMING_5MP);
        assert_eq!(fps, 13);
        let mode = ModeTiming::new(timing, fps, XCLK_NOM);
        assert_eq!(mode.pll_multiplier, 61);
        assert_eq!(mode.pix_clk, 122_000_000);
        assert_eq!(mode.min_exposure, 1500);
        assert_eq!(mode.max_exposure, 75600);
    }

    #[test]
    fn timing_rows() {
        assert_eq!(select_timing(1, 60), (TIMING_720P_60, 60));
        assert_eq!(select_timing(1, 30), (TIMING_720P_30, 30));
        assert_eq!(select_timing(2, 60), (TIMING_1080P_30, 13));
        assert_eq!(select_timing(0, 60), (TIMING_VGA, 60));
    }

    #[test]
    fn mode_selection() {
        assert_eq!(fps_index(30, 0), 0);
        assert_eq!(fps_index(31, 0), 1);
        assert_eq!(fps_index(30, 1), 0);
        assert_eq!(fps_index(13, 2), 0);
        assert_eq!(fps_index(14, 4), 1);
        assert_eq!(MODES[1][0].name, "VGA 60fps");
        assert_eq!(MODES[0][1].name, "720p 30fps");
    }

    #[test]
    fn configure_vga() {
        let (bus, mut sensor) = sensor();
        sensor.set_power(PowerState::On).unwrap();
        bus.clear_events();
        sensor.set_power(PowerState::On).unwrap();

        let gain = GAIN_TABLE[50] as u32;
        let window: Vec<(u16, u32)> = tables::VGA_30
            .window
            .iter()
            .filter_map(|step| match *step {
                RegisterWrite::Byte(address, value) => Some((address, value as u32)),
                RegisterWrite::Word(address, value) => Some((address, value as u32)),
                _ => None,
            })
            .collect();
        let writes = bus.writes();
        assert_eq!(&writes[..4], &[(0x0103, 1), (0x301A, 0x10C8), (0x3064, 0x0805), (0x0104, 1)]);
        // Stream off, clocks, then the window.
        assert_eq!(writes[11], (0x0100, 0));
        assert_eq!(writes[12], (0x3064, 0x0805));
        assert_eq!(writes[19], (0x030A, 1));
        assert_eq!(&writes[20..20 + window.len()], window.as_slice());
        let rest = &writes[20 + window.len()..];
        assert_eq!(
            rest,
            &[
                (0x0104, 1),
                (0x3056, gain),
                (0x305A, gain),
                (0x3058, gain),
                (0x305C, gain),
                (0x305E, gain),
                (0x0104, 0),
                (0x0104, 1),
                (0x0202, 432),
                (0x0104, 0),
                (0x0100, 1),
            ]
        );
        assert_eq!(bus.delays(), vec![5, 100, 10, 1]);
        let range = sensor.control_range(ControlId::Exposure).unwrap();
        assert_eq!((range.min, range.max), (2500, 22700));
    }

    #[test]
    fn vga_60_restarts_in_mode() {
        let (bus, mut sensor) = sensor();
        sensor.set_frame_interval(Fract::new(1, 60));
        sensor.set_power(PowerState::On).unwrap();
        bus.clear_events();
        sensor.set_power(PowerState::On).unwrap();
        let starts = bus
            .writes()
            .into_iter()
            .filter(|write| *write == (0x0100, 1))
            .count();
        assert_eq!(starts, 2);
    }

    #[test]
    fn large_size_keeps_minimum_frame_rate() {
        let (bus, mut sensor) = sensor();
        sensor.set_frame_interval(Fract::new(1, 60));
        sensor.set_power(PowerState::On).unwrap();
        sensor.set_fmt(1920, 1080);
        sensor.set_power(PowerState::On).unwrap();

        sensor.set_fmt(640, 480);
        bus.clear_events();
        sensor.set_power(PowerState::On).unwrap();
        assert_eq!(
            sensor.mode_timing(),
            Some(ModeTiming::new(TIMING_VGA, 13, XCLK_NOM))
        );
        // The 30fps VGA row doesn't restart streaming mid-mode.
        let starts = bus
            .writes()
            .into_iter()
            .filter(|write| *write == (0x0100, 1))
            .count();
        assert_eq!(starts, 1);

        sensor.set_frame_interval(Fract::new(1, 60));
        sensor.set_power(PowerState::On).unwrap();
        assert_eq!(
            sensor.mode_timing(),
            Some(ModeTiming::new(TIMING_VGA, 60, XCLK_NOM))
        );
    }

    #[test]
    fn exposure_clamped_to_new_mode() {
        let (_bus, mut sensor) = streaming();
        sensor.set_fmt(2592, 1944);
        sensor.set_power(PowerState::On).unwrap();
        let range = sensor.control_range(ControlId::Exposure).unwrap();
        assert_eq!((range.min, range.max), (1500, 75600));
        sensor.set_control(ControlId::Exposure, 27000).unwrap();
        sensor.set_fmt(640, 480);
        sensor.set_power(PowerState::On).unwrap();
        // 27000 is past the VGA limit.
        assert_eq!(sensor.control(ControlId::Exposure), Some(22700));
    }

    #[test]
    fn exposure_limits() {
        let (bus, mut sensor) = streaming();
        assert!(matches!(
            sensor.set_control(ControlId::Exposure, 2000),
            Err(Error::LibraryError(LibraryError::InvalidArgument(_)))
        ));
        assert!(sensor.set_control(ControlId::Exposure, 30000).is_err());
        assert!(bus.writes().is_empty());
        assert_eq!(sensor.set_control(ControlId::Exposure, 10000).unwrap(), 10000);
        // (1000 * 72000 / 1000 - 179) / 291
        assert_eq!(bus.writes(), vec![(0x0104, 1), (0x0202, 246), (0x0104, 0)]);
    }

    #[test]
    fn gain_clamps() {
        let (bus, mut sensor) = streaming();
        assert_eq!(sensor.set_control(ControlId::Gain, 200).unwrap(), 159);
        assert_eq!(bus.writes()[1], (0x3056, 4607));
        assert_eq!(sensor.set_control(ControlId::Gain, -4).unwrap(), 0);
        assert_eq!(sensor.control(ControlId::Gain), Some(0));
    }

    #[test]
    fn controls_cached_while_off() {
        let (bus, mut sensor) = sensor();
        sensor.set_control(ControlId::Gain, 10).unwrap();
        assert!(bus.writes().is_empty());
        assert!(sensor.set_control(ControlId::TestPattern, 1).is_err());
    }

    #[test]
    fn standby_stops_streaming() {
        let (bus, mut sensor) = streaming();
        sensor.set_power(PowerState::Standby).unwrap();
        assert_eq!(
            bus.events(),
            vec![
                Event::Write {
                    address: 0x0100,
                    value: 0
                },
                Event::Power(PowerState::Standby),
                Event::Xclk(0),
            ]
        );
        assert_eq!(sensor.power_state(), PowerState::Standby);
    }

    #[test]
    fn standby_before_detection() {
        let (bus, mut sensor) = sensor();
        sensor.set_power(PowerState::Standby).unwrap();
        assert!(bus.writes().is_empty());
    }

    #[test]
    fn writes_retry() {
        let (bus, mut sensor) = streaming();
        bus.fail_writes(0, 2);
        sensor.set_power(PowerState::Standby).unwrap();
        assert_eq!(bus.writes(), vec![(0x0100, 0)]);
        assert_eq!(bus.delays(), vec![20, 20]);
    }

    #[test]
    fn frame_interval() {
        let (_bus, mut sensor) = sensor();
        assert_eq!(sensor.set_frame_interval(Fract::new(0, 0)), XCLK_NOM);
        assert_eq!(sensor.time_per_frame(), Fract::new(1, 30));
        sensor.set_frame_interval(Fract::new(1, 120));
        assert_eq!(sensor.time_per_frame(), Fract::new(1, 60));
        sensor.set_frame_interval(Fract::new(1, 5));
        assert_eq!(sensor.time_per_frame(), Fract::new(1, 13));
        sensor.set_frame_interval(Fract::new(2, 45));
        assert_eq!(sensor.time_per_frame(), Fract::new(1, 22));
    }

    #[test]
    fn enumeration() {
        let (_bus, sensor) = sensor();
        assert_eq!(sensor.enum_frame_sizes(1).unwrap(), FrameSize::new(1280, 720));
        assert!(sensor.enum_frame_sizes(5).is_err());
        assert_eq!(
            sensor.enum_frame_intervals(1, 640, 480).unwrap(),
            Fract::new(1, 30)
        );
        assert!(sensor.enum_frame_intervals(2, 640, 480).is_err());
        assert_eq!(
            sensor.enum_frame_intervals(0, 1920, 1080).unwrap(),
            Fract::new(1, 13)
        );
        assert!(sensor.enum_frame_intervals(1, 2592, 1944).is_err());
        assert!(sensor.enum_fmt(0).is_ok());
        assert!(sensor.enum_fmt(1).is_err());
    }

    #[test]
    fn formats() {
        let (_bus, mut sensor) = sensor();
        assert_eq!(sensor.get_fmt().size(), FrameSize::new(640, 480));
        let fmt = sensor.try_fmt(1280, 960);
        assert_eq!(fmt.size(), FrameSize::new(1920, 1080));
        assert_eq!(fmt.pixel_format, PixelFormat::Sgrbg10);
        assert_eq!(fmt.bytes_per_line, 3840);
        assert_eq!(sensor.get_fmt().size(), FrameSize::new(640, 480));
        assert_eq!(sensor.set_frame_size(4000, 3000).unwrap(), FrameSize::new(2592, 1944));
    }

    #[test]
    fn registered_detects_and_turns_off() {
        let (bus, mut sensor) = sensor();
        Subdevice::registered(&mut sensor).unwrap();
        assert!(sensor.is_detected());
        assert_eq!(sensor.power_state(), PowerState::Off);
        assert!(bus.writes().is_empty());
    }

    #[test]
    fn debug_widths() {
        let (bus, mut sensor) = sensor();
        let mut basic = RegisterWindow::new(Width::Byte);
        basic.store_address("0x0100").unwrap();
        basic.store_value(&mut sensor, "1").unwrap();
        let mut adv = RegisterWindow::new(Width::Word);
        adv.store_address("3064").unwrap();
        adv.store_value(&mut sensor, "0x805").unwrap();
        assert_eq!(
            bus.raw_writes(),
            vec![vec![0x01, 0x00, 0x01], vec![0x30, 0x64, 0x08, 0x05]]
        );
        let mut out = String::new();
        adv.show_value(&mut sensor, &mut out).unwrap();
        assert_eq!(out, "0x805\n");
    }

    #[test]
    fn debug_controls() {
        let (_bus, mut sensor) = streaming();
        sensor.store_gain("42").unwrap();
        let mut out = String::new();
        sensor.show_gain(&mut out).unwrap();
        assert_eq!(out, "42\n");
        assert!(sensor.store_exposure("nope").is_err());
        out.clear();
        sensor.show_exposure(&mut out).unwrap();
        assert_eq!(out, "17500\n");
    }
}
