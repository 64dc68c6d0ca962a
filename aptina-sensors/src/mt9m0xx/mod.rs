// SPDX-License-Identifier: Apache-2.0
// Copyright © 2026 The aptina-sensors developers
//! The MT9M021 and MT9M034 1.2 MP sensors.
//!
//! Both chips share a register map, window and binning logic, PLL and controls. They differ in
//! their sequencer microcode and in the calibration they need before streaming, which is
//! described by the [`Chip`] trait.
use core::marker::PhantomData;

use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::blocking::i2c;

use crate::bus::{
    read16, read_register, write16, write_register, write_script, RegisterWrite, Width,
};
use crate::controls::{
    AutoExposureMode, ControlCache, ControlId, ControlRange, TEST_PATTERN_VALUES,
};
use crate::debug::RegisterDebug;
use crate::error::{Error, LibraryError};
use crate::format::{FrameSize, FrameSizeRange, MbusCode, MbusFramefmt, Rect};
use crate::pll::{find_dividers, PllDividers};
use crate::power::{PlatformData, PowerCount, SensorPlatform};
use crate::register::{DigitalTest, ReadMode, ResetRegister};
use crate::subdev::{FormatWhich, Subdevice};
use crate::util::{align2, div_round_closest};

pub(crate) mod address;
mod mt9m021;
mod mt9m034;

pub use mt9m021::Mt9m021;
pub use mt9m034::Mt9m034;

use address::*;

/// The I²C address both sensors answer on.
pub const DEFAULT_ADDRESS: u8 = 0x10;

/// Size of the active pixel array.
pub const PIXEL_ARRAY: FrameSize = FrameSize::new(1280, 960);

const WINDOW_MIN: u32 = 2;

/// Recommended line length, in pixel clocks.
const LINE_LENGTH: u16 = 1650;

/// Blanking rows added to the window height for the frame length.
const FRAME_BLANKING: u16 = 37;

/// How many times the chip ID is re-read before giving up.
const CHIP_ID_RETRIES: usize = 5;

const CONTROL_COUNT: usize = 11;

const GAIN_RANGE: ControlRange = ControlRange::new(0x00, 0xFF, 1, 0x20);

/// Supported clock plans.
///
/// `target_freq = ext_freq * m / (n * p1 * p2)`, with the VCO (`ext_freq * m / n`) between 384
/// and 768 MHz.
pub const PLL_TABLE: [PllDividers; 4] = [
    PllDividers::new(24_000_000, 48_000_000, 32, 2, 2, 4),
    PllDividers::new(24_000_000, 66_000_000, 44, 2, 2, 4),
    PllDividers::new(27_000_000, 74_250_000, 44, 2, 1, 8),
    PllDividers::new(48_000_000, 48_000_000, 40, 5, 2, 4),
];

/// One step of the stream-on sequence.
#[derive(Clone, Copy, Debug)]
pub enum StreamStep {
    /// Upload the sequencer microcode.
    Sequencer,
    /// Run a named register script.
    Script(&'static str, &'static [RegisterWrite]),
    /// Program the window and binning for the active crop and format.
    Size,
    /// Program the PLL for the board's clock plan.
    Pll,
    Delay(u32),
}

impl StreamStep {
    fn name(&self) -> &'static str {
        match self {
            StreamStep::Sequencer => "sequencer",
            StreamStep::Script(name, _) => name,
            StreamStep::Size => "resolution",
            StreamStep::Pll => "pll",
            StreamStep::Delay(_) => "delay",
        }
    }
}

/// What differs between the MT9M0xx chips.
pub trait Chip {
    /// Used in log messages.
    const NAME: &'static str;

    /// Expected value of the chip ID register.
    const CHIP_ID: u16;

    const SEQUENCER: &'static [u16];

    /// Written to the ERS program start address after the sequencer upload, for chips that need
    /// it.
    const ERS_START: Option<u16>;

    /// Pause after sampling the streaming state, before changing the auto-exposure mode.
    const AUTO_EXPOSURE_SETTLE_MS: u32;

    /// Everything that happens before the final stream-on write, in order.
    const STREAM_ON: &'static [StreamStep];
}

/// Driver for an MT9M021 or MT9M034.
#[derive(Debug)]
pub struct Mt9m0xx<C, I2C, D, P> {
    bus: I2C,
    delay: D,
    platform: P,
    address: u8,
    platform_data: PlatformData,

    /// Sensor window on the pixel array.
    crop: Rect,
    format: MbusFramefmt,
    try_crop: Rect,
    try_format: MbusFramefmt,

    controls: ControlCache<CONTROL_COUNT>,
    power: PowerCount,

    _chip: PhantomData<C>,
}

/// An MT9M034 driver.
pub type Mt9m034Driver<I2C, D, P> = Mt9m0xx<Mt9m034, I2C, D, P>;

/// An MT9M021 driver.
pub type Mt9m021Driver<I2C, D, P> = Mt9m0xx<Mt9m021, I2C, D, P>;

impl<C, I2C, D, P> Mt9m0xx<C, I2C, D, P>
where
    C: Chip,
    I2C: i2c::WriteRead + i2c::Write,
    D: DelayMs<u32>,
    P: SensorPlatform,
{
    /// Create a driver for a sensor at the default address.
    ///
    /// Nothing is sent to the sensor until it is powered up or [`registered`][Self::registered]
    /// is called.
    pub fn new(bus: I2C, delay: D, platform: P, platform_data: PlatformData) -> Self {
        Self::new_with_address(bus, delay, platform, platform_data, DEFAULT_ADDRESS)
    }

    pub fn new_with_address(
        bus: I2C,
        delay: D,
        platform: P,
        platform_data: PlatformData,
        address: u8,
    ) -> Self {
        let crop = Rect::new(0, 0, PIXEL_ARRAY.width, PIXEL_ARRAY.height);
        let format = MbusFramefmt::new(PIXEL_ARRAY, MbusCode::Sgrbg12_1x12);
        Self {
            bus,
            delay,
            platform,
            address,
            platform_data,
            crop,
            format,
            try_crop: crop,
            try_format: format,
            controls: Self::default_controls(),
            power: PowerCount::new(),
            _chip: PhantomData,
        }
    }

    fn default_controls() -> ControlCache<CONTROL_COUNT> {
        let mut controls = ControlCache::new();
        controls
            .add_menu(
                ControlId::ExposureAuto,
                ControlRange::menu(4, AutoExposureMode::ShutterPriority as i32),
            )
            .add_integer(ControlId::Gain, GAIN_RANGE)
            .add_integer(ControlId::Exposure, ControlRange::new(1, 0x02A0, 1, 0x0100))
            .add_integer(ControlId::HorizontalFlip, ControlRange::boolean())
            .add_integer(ControlId::VerticalFlip, ControlRange::boolean())
            .add_menu(
                ControlId::TestPattern,
                ControlRange::menu(TEST_PATTERN_VALUES.len() as i32, 0),
            )
            .add_integer(ControlId::GainGreen1, GAIN_RANGE)
            .add_integer(ControlId::GainRed, GAIN_RANGE)
            .add_integer(ControlId::GainBlue, GAIN_RANGE)
            .add_integer(ControlId::GainGreen2, GAIN_RANGE)
            .add_integer(ControlId::AnalogGain, ControlRange::new(0, 3, 1, 0));
        controls
    }

    /// Give back the bus, delay and platform.
    pub fn release(self) -> (I2C, D, P) {
        (self.bus, self.delay, self.platform)
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn platform_data(&self) -> &PlatformData {
        &self.platform_data
    }

    fn write(&mut self, register: u16, value: u16) -> Result<(), Error<I2C>> {
        write16(&mut self.bus, self.address, register, value)
    }

    fn read(&mut self, register: u16) -> Result<u16, Error<I2C>> {
        read16(&mut self.bus, self.address, register)
    }

    fn power_on(&mut self) {
        // RESET_BAR low, start the clock, then release reset.
        self.platform.set_reset(true);
        self.delay.delay_ms(1);
        self.platform.set_xclk(self.platform_data.ext_freq);
        self.delay.delay_ms(1);
        self.platform.set_reset(false);
        self.delay.delay_ms(1);
    }

    fn power_off(&mut self) {
        self.platform.set_xclk(0);
    }

    /// Power up briefly and check the chip ID.
    pub fn registered(&mut self) -> Result<(), Error<I2C>> {
        self.power_on();
        let detected = self.detect();
        self.power_off();
        detected
    }

    fn detect(&mut self) -> Result<(), Error<I2C>> {
        let mut chip_id = self.read(CHIP_ID)?;
        let mut retries = 0;
        while chip_id != C::CHIP_ID && retries < CHIP_ID_RETRIES {
            self.delay.delay_ms(5);
            chip_id = self.read(CHIP_ID)?;
            retries += 1;
        }
        if chip_id != C::CHIP_ID {
            log::error!(
                "Aptina {} not detected, chip ID read:0x{:04x}",
                C::NAME,
                chip_id
            );
            return Err(LibraryError::ChipNotDetected {
                expected: C::CHIP_ID,
                found: chip_id,
            }
            .into());
        }
        log::info!(
            "Aptina {} detected at address 0x{:02x}",
            C::NAME,
            self.address
        );
        Ok(())
    }

    /// Number of outstanding power references.
    pub fn power_count(&self) -> u32 {
        self.power.count()
    }

    /// Take or drop a power reference.
    ///
    /// Powering up resets the sensor and writes every cached control value back to it. If that
    /// fails the reference is not taken.
    pub fn set_power(&mut self, on: bool) -> Result<(), Error<I2C>> {
        if on {
            if self.power.is_off() {
                self.power_up()?;
            }
            self.power.acquire();
        } else if self.power.release()? {
            self.power_off();
        }
        Ok(())
    }

    fn power_up(&mut self) -> Result<(), Error<I2C>> {
        self.power_on();
        if let Err(err) = write_register(
            &mut self.bus,
            self.address,
            ResetRegister::from(ResetRegister::RESET),
        ) {
            log::error!("Failed to reset the camera");
            return Err(err);
        }
        for (id, value) in self.controls.values() {
            self.apply_control(id, value)?;
        }
        Ok(())
    }

    /// Whether the sensor is currently streaming, read back from the reset register.
    pub fn is_streaming(&mut self) -> Result<bool, Error<I2C>> {
        let reset: ResetRegister = read_register(&mut self.bus, self.address)?;
        Ok(reset.streaming())
    }

    /// Start or stop streaming.
    ///
    /// Starting runs the chip's whole bring-up sequence. The first failing step is logged and
    /// its error returned, and nothing after it is written.
    pub fn set_stream(&mut self, enable: bool) -> Result<(), Error<I2C>> {
        if !enable {
            return self.write(RESET_REGISTER, ResetRegister::STREAM_OFF);
        }
        for step in C::STREAM_ON {
            if let Err(err) = self.run_step(step) {
                log::error!("{}: Failed to setup {}", C::NAME, step.name());
                return Err(err);
            }
        }
        self.write(RESET_REGISTER, ResetRegister::STREAM_ON)
    }

    fn run_step(&mut self, step: &StreamStep) -> Result<(), Error<I2C>> {
        match *step {
            StreamStep::Sequencer => self.load_sequencer(),
            StreamStep::Script(_, script) => {
                write_script(&mut self.bus, &mut self.delay, self.address, script)
            }
            StreamStep::Size => self.set_size(),
            StreamStep::Pll => self.pll_setup(),
            StreamStep::Delay(ms) => {
                self.delay.delay_ms(ms);
                Ok(())
            }
        }
    }

    fn load_sequencer(&mut self) -> Result<(), Error<I2C>> {
        self.write(SEQ_CTRL_PORT, 0x8000)?;
        for word in C::SEQUENCER {
            self.write(SEQ_DATA_PORT, *word)?;
        }
        if let Some(start) = C::ERS_START {
            self.write(ERS_PROG_START_ADDR, start)?;
        }
        Ok(())
    }

    /// Program the window, and binning if the output is half the crop size.
    fn set_size(&mut self) -> Result<(), Error<I2C>> {
        let crop = self.crop;
        let hratio = div_round_closest(crop.width, self.format.width);
        let vratio = div_round_closest(crop.height, self.format.height);
        if hratio == 2 {
            if vratio == 2 {
                log::debug!("horizontal and vertical binning enabled");
                self.write(DIGITAL_BINNING, 0x0022)?;
            } else if vratio < 2 {
                log::debug!("horizontal binning enabled");
                self.write(DIGITAL_BINNING, 0x0011)?;
            }
        } else {
            log::debug!("binning disabled");
            self.write(DIGITAL_BINNING, 0x0000)?;
        }
        let top = crop.top as u16;
        let left = crop.left as u16;
        let width = crop.width as u16;
        let height = crop.height as u16;
        self.write(Y_ADDR_START, top)?;
        self.write(X_ADDR_START, left)?;
        self.write(Y_ADDR_END, (top + height).saturating_sub(1))?;
        self.write(X_ADDR_END, (left + width).saturating_sub(1))?;
        self.write(FRAME_LENGTH_LINES, height + FRAME_BLANKING)?;
        self.write(LINE_LENGTH_PCK, LINE_LENGTH)?;
        self.write(COARSE_INT_TIME, 0x01C2)?;
        self.write(X_ODD_INC, 0x0001)?;
        self.write(Y_ODD_INC, 0x0001)
    }

    fn pll_setup(&mut self) -> Result<(), Error<I2C>> {
        let ext_freq = self.platform_data.ext_freq;
        let target_freq = self.platform_data.target_freq;
        let pll = find_dividers(&PLL_TABLE, ext_freq, target_freq).map_err(|err| {
            log::error!(
                "Couldn't find PLL dividers for ext_freq = {}, target_freq = {}",
                ext_freq,
                target_freq
            );
            err
        })?;
        log::debug!(
            "PLL settings: M = {}, N = {}, P1 = {}, P2 = {}",
            pll.m,
            pll.n,
            pll.p1,
            pll.p2
        );
        self.write(VT_SYS_CLK_DIV, pll.p1)?;
        self.write(VT_PIX_CLK_DIV, pll.p2)?;
        self.write(PRE_PLL_CLK_DIV, pll.n)?;
        self.write(PLL_MULTIPLIER, pll.m)?;
        let mut digital_test = DigitalTest::default();
        digital_test.set_monochrome(self.platform_data.is_monochrome());
        self.write(DIGITAL_TEST, digital_test.into())?;
        self.delay.delay_ms(100);
        Ok(())
    }

    /// The cached value of a control.
    pub fn control(&self, id: ControlId) -> Option<i32> {
        self.controls.get(id)
    }

    pub fn control_range(&self, id: ControlId) -> Option<ControlRange> {
        self.controls.range(id)
    }

    /// Set a control, returning the value actually used.
    ///
    /// Integer values are clamped to the control's range. While the sensor is powered down the
    /// value is only cached, and gets written on the next power-up.
    pub fn set_control(&mut self, id: ControlId, value: i32) -> Result<i32, Error<I2C>> {
        let value = self.controls.validate(id, value)?;
        if id == ControlId::ExposureAuto {
            autoexposure_registers(value)?;
        }
        if !self.power.is_off() {
            self.apply_control(id, value)?;
        }
        self.controls.commit(id, value);
        Ok(value)
    }

    /// The current auto-exposure mode.
    pub fn autoexposure(&self) -> Option<AutoExposureMode> {
        self.controls
            .get(ControlId::ExposureAuto)
            .and_then(|mode| AutoExposureMode::try_from(mode as u32).ok())
    }

    fn apply_control(&mut self, id: ControlId, value: i32) -> Result<(), Error<I2C>> {
        let raw = value as u16;
        match id {
            ControlId::ExposureAuto => self.set_autoexposure(value),
            ControlId::Exposure => self.write_double(COARSE_INT_TIME, COARSE_INT_TIME_CB, raw),
            ControlId::Gain => self.write_double(GLOBAL_GAIN, GLOBAL_GAIN_CB, raw),
            ControlId::GainGreen1 => self.write_double(GREEN1_GAIN, GREEN1_GAIN_CB, raw),
            ControlId::GainRed => self.write_double(RED_GAIN, RED_GAIN_CB, raw),
            ControlId::GainBlue => self.write_double(BLUE_GAIN, BLUE_GAIN_CB, raw),
            ControlId::GainGreen2 => self.write_double(GREEN2_GAIN, GREEN2_GAIN_CB, raw),
            ControlId::AnalogGain => {
                let mut digital_test: DigitalTest = read_register(&mut self.bus, self.address)?;
                digital_test.set_analog_gain(raw);
                write_register(&mut self.bus, self.address, digital_test)
            }
            ControlId::HorizontalFlip => {
                let mut read_mode: ReadMode = read_register(&mut self.bus, self.address)?;
                read_mode.set_horizontal_mirror(value != 0);
                write_register(&mut self.bus, self.address, read_mode)
            }
            ControlId::VerticalFlip => {
                let mut read_mode: ReadMode = read_register(&mut self.bus, self.address)?;
                read_mode.set_vertical_flip(value != 0);
                write_register(&mut self.bus, self.address, read_mode)
            }
            ControlId::TestPattern => {
                let pattern = TEST_PATTERN_VALUES
                    .get(value as usize)
                    .copied()
                    .ok_or(LibraryError::OutOfRange("test pattern"))?;
                if pattern == 0 {
                    self.write(TEST_PATTERN, 0x0000)?;
                }
                self.write(TEST_PATTERN, pattern)
            }
            _ => Err(LibraryError::InvalidArgument("unsupported control").into()),
        }
    }

    /// Write a value to a register and its context B copy.
    fn write_double(&mut self, primary: u16, context_b: u16, value: u16) -> Result<(), Error<I2C>> {
        self.write(primary, value)?;
        self.write(context_b, value)
    }

    /// Switch auto-exposure mode, pausing the stream around the change if it is running.
    fn set_autoexposure(&mut self, mode: i32) -> Result<(), Error<I2C>> {
        let (embedded_data, ae_control) = autoexposure_registers(mode)?;
        let streaming = self.is_streaming()?;
        if C::AUTO_EXPOSURE_SETTLE_MS > 0 {
            self.delay.delay_ms(C::AUTO_EXPOSURE_SETTLE_MS);
        }
        if streaming {
            self.write(RESET_REGISTER, ResetRegister::STREAM_OFF)?;
        }
        self.write(EMBEDDED_DATA_CTRL, embedded_data)?;
        self.write(AE_CTRL, ae_control)?;
        if streaming {
            self.write(RESET_REGISTER, ResetRegister::STREAM_ON)?;
        }
        Ok(())
    }

    /// The only media bus code is the active format's.
    pub fn enum_mbus_code(&self, index: u32) -> Result<MbusCode, LibraryError> {
        if index != 0 {
            return Err(LibraryError::InvalidArgument("mbus code index"));
        }
        Ok(self.format.code)
    }

    pub fn enum_frame_size(&self, index: u32, code: MbusCode) -> Result<FrameSizeRange, LibraryError> {
        if index != 0 || code != self.format.code {
            return Err(LibraryError::InvalidArgument("frame size index"));
        }
        Ok(FrameSizeRange {
            min: FrameSize::new(WINDOW_MIN, WINDOW_MIN),
            max: PIXEL_ARRAY,
        })
    }

    fn pad_crop(&mut self, which: FormatWhich) -> &mut Rect {
        match which {
            FormatWhich::Try => &mut self.try_crop,
            FormatWhich::Active => &mut self.crop,
        }
    }

    fn pad_format(&mut self, which: FormatWhich) -> &mut MbusFramefmt {
        match which {
            FormatWhich::Try => &mut self.try_format,
            FormatWhich::Active => &mut self.format,
        }
    }

    pub fn get_format(&self, which: FormatWhich) -> MbusFramefmt {
        match which {
            FormatWhich::Try => self.try_format,
            FormatWhich::Active => self.format,
        }
    }

    /// Set the output size.
    ///
    /// The output is the crop window divided by a whole ratio, so the result is the closest
    /// size reachable from the current crop.
    pub fn set_format(&mut self, which: FormatWhich, width: u32, height: u32) -> MbusFramefmt {
        let crop = *self.pad_crop(which);
        let width = align2(width).clamp(WINDOW_MIN, PIXEL_ARRAY.width);
        let height = align2(height).clamp(WINDOW_MIN, PIXEL_ARRAY.height);
        // A crop much smaller than the request rounds to a ratio of zero.
        let wratio = div_round_closest(crop.width, width).max(1);
        let hratio = div_round_closest(crop.height, height).max(1);
        let format = self.pad_format(which);
        format.width = crop.width / wratio;
        format.height = crop.height / hratio;
        format.code = MbusCode::Sgrbg12_1x12;
        let format = *format;
        log::info!(
            "{}: crop = {}x{} format = {}x{}",
            C::NAME,
            crop.width,
            crop.height,
            format.width,
            format.height
        );
        format
    }

    pub fn get_crop(&self, which: FormatWhich) -> Rect {
        match which {
            FormatWhich::Try => self.try_crop,
            FormatWhich::Active => self.crop,
        }
    }

    /// Set the sensor window.
    ///
    /// Edges are aligned to even pixels to keep the GRBG Bayer order, and the window is clamped
    /// to the pixel array. Changing the window size resets the output size to match it.
    pub fn set_crop(&mut self, which: FormatWhich, rect: Rect) -> Rect {
        let left = align2(rect.left).min(PIXEL_ARRAY.width - WINDOW_MIN);
        let top = align2(rect.top).min(PIXEL_ARRAY.height - WINDOW_MIN);
        let width = align2(rect.width)
            .clamp(WINDOW_MIN, PIXEL_ARRAY.width)
            .min(PIXEL_ARRAY.width - left);
        let height = align2(rect.height)
            .clamp(WINDOW_MIN, PIXEL_ARRAY.height)
            .min(PIXEL_ARRAY.height - top);
        let rect = Rect::new(left, top, width, height);
        let crop = self.pad_crop(which);
        let resized = crop.width != width || crop.height != height;
        *crop = rect;
        if resized {
            let format = self.pad_format(which);
            format.width = width;
            format.height = height;
        }
        rect
    }

    /// Read a register directly.
    pub fn get_register(&mut self, register: u16) -> Result<u16, Error<I2C>> {
        self.read(register)
    }

    /// Write a register directly.
    pub fn set_register(&mut self, register: u16, value: u16) -> Result<(), Error<I2C>> {
        self.write(register, value)
    }
}

impl<C, I2C, D, P> Subdevice for Mt9m0xx<C, I2C, D, P>
where
    C: Chip,
    I2C: i2c::WriteRead + i2c::Write,
    D: DelayMs<u32>,
    P: SensorPlatform,
{
    type Error = Error<I2C>;

    fn registered(&mut self) -> Result<(), Self::Error> {
        Mt9m0xx::registered(self)
    }

    fn set_power(&mut self, on: bool) -> Result<(), Self::Error> {
        Mt9m0xx::set_power(self, on)
    }

    fn set_stream(&mut self, enable: bool) -> Result<(), Self::Error> {
        Mt9m0xx::set_stream(self, enable)
    }

    fn frame_size(&self) -> FrameSize {
        self.format.size()
    }

    fn set_frame_size(&mut self, width: u32, height: u32) -> Result<FrameSize, Self::Error> {
        Ok(self.set_format(FormatWhich::Active, width, height).size())
    }
}

impl<C, I2C, D, P> RegisterDebug for Mt9m0xx<C, I2C, D, P>
where
    C: Chip,
    I2C: i2c::WriteRead + i2c::Write,
    D: DelayMs<u32>,
    P: SensorPlatform,
{
    type Error = Error<I2C>;

    fn debug_read(&mut self, address: u16, _width: Width) -> Result<u32, Self::Error> {
        self.read(address).map(u32::from)
    }

    fn debug_write(
        &mut self,
        address: u16,
        _width: Width,
        value: u32,
    ) -> Result<(), Self::Error> {
        self.write(address, value as u16)
    }
}

/// Embedded data and AE control values for an auto-exposure mode.
///
/// Only manual and shutter priority exposure are supported.
fn autoexposure_registers(mode: i32) -> Result<(u16, u16), LibraryError> {
    let mode = AutoExposureMode::try_from(mode as u32).map_err(|_| {
        log::error!("Auto Exposure mode out of range: {}", mode);
        LibraryError::OutOfRange("auto-exposure mode")
    })?;
    match mode {
        AutoExposureMode::Manual => Ok((0x1802, 0x0000)),
        AutoExposureMode::ShutterPriority => Ok((0x1982, 0x0013)),
        AutoExposureMode::Auto | AutoExposureMode::AperturePriority => {
            log::error!("Unsupported auto-exposure mode requested: {:?}", mode);
            Err(LibraryError::InvalidArgument("unsupported auto-exposure mode"))
        }
    }
}

#[cfg(test)]
mod test {
    extern crate std;

    use std::vec;
    use std::vec::Vec;

    use crate::power::PowerState;
    use crate::test::*;

    use super::*;

    type Sensor = Mt9m034Driver<MockSensorBus, MockDelay, MockPlatform>;

    fn sensor() -> (MockSensorBus, Sensor) {
        let bus = MockSensorBus::new_16bit(DEFAULT_ADDRESS);
        let sensor = Mt9m0xx::new(
            bus.clone(),
            bus.delay(),
            bus.platform(),
            PlatformData::default(),
        );
        (bus, sensor)
    }

    fn powered() -> (MockSensorBus, Sensor) {
        let (bus, mut sensor) = sensor();
        sensor.set_power(true).unwrap();
        bus.clear_events();
        (bus, sensor)
    }

    const POWER_ON: [Event; 6] = [
        Event::Reset(true),
        Event::Delay(1),
        Event::Xclk(24_000_000),
        Event::Delay(1),
        Event::Reset(false),
        Event::Delay(1),
    ];

    #[test]
    fn registered_detects_chip() {
        let (bus, mut sensor) = sensor();
        bus.set_register(CHIP_ID, 0x2400);
        sensor.registered().unwrap();
        let mut expected = POWER_ON.to_vec();
        expected.push(Event::Read { address: CHIP_ID });
        expected.push(Event::Xclk(0));
        assert_eq!(bus.events(), expected);
    }

    #[test]
    fn registered_wrong_chip() {
        let (bus, mut sensor) = sensor();
        bus.set_register(CHIP_ID, 0x2401);
        let err = sensor.registered().unwrap_err();
        assert!(matches!(
            err,
            Error::LibraryError(LibraryError::ChipNotDetected {
                expected: 0x2400,
                found: 0x2401
            })
        ));
        assert_eq!(bus.reads().len(), CHIP_ID_RETRIES + 1);
        assert_eq!(
            bus.delays().iter().filter(|ms| **ms == 5).count(),
            CHIP_ID_RETRIES
        );
        // The clock is stopped even when detection fails.
        assert_eq!(bus.events().last(), Some(&Event::Xclk(0)));
    }

    #[test]
    fn power_is_reference_counted() {
        let (bus, mut sensor) = sensor();
        sensor.set_power(true).unwrap();
        let events = bus.events();
        assert_eq!(&events[..6], &POWER_ON);
        assert_eq!(
            events[6],
            Event::Write {
                address: RESET_REGISTER,
                value: 0x00D9
            }
        );
        bus.clear_events();

        sensor.set_power(true).unwrap();
        assert!(bus.events().is_empty());
        assert_eq!(sensor.power_count(), 2);

        sensor.set_power(false).unwrap();
        assert!(bus.events().is_empty());
        sensor.set_power(false).unwrap();
        assert_eq!(bus.events(), vec![Event::Xclk(0)]);

        let err = sensor.set_power(false).unwrap_err();
        assert!(matches!(
            err,
            Error::LibraryError(LibraryError::PowerUnderflow)
        ));
        assert_eq!(sensor.power_count(), 0);
    }

    #[test]
    fn failed_power_up_keeps_count() {
        let (bus, mut sensor) = sensor();
        bus.fail_writes(0, 1);
        assert!(sensor.set_power(true).is_err());
        assert_eq!(sensor.power_count(), 0);
        // The next attempt runs the whole sequence again.
        bus.clear_events();
        sensor.set_power(true).unwrap();
        assert_eq!(&bus.events()[..6], &POWER_ON);
        assert_eq!(sensor.power_count(), 1);
    }

    #[test]
    fn power_up_replays_controls() {
        let (bus, mut sensor) = sensor();
        // Cached only while powered down.
        assert_eq!(sensor.set_control(ControlId::Exposure, 0x200).unwrap(), 0x200);
        assert!(bus.writes().is_empty());

        sensor.set_power(true).unwrap();
        let writes = bus.writes();
        let reset = writes
            .iter()
            .position(|w| *w == (RESET_REGISTER, 0x00D9))
            .unwrap();
        let exposure = writes
            .iter()
            .position(|w| *w == (COARSE_INT_TIME, 0x200))
            .unwrap();
        assert!(reset < exposure);
        assert_eq!(writes[exposure + 1], (COARSE_INT_TIME_CB, 0x200));
        assert!(writes.contains(&(GLOBAL_GAIN, 0x20)));
        assert!(writes.contains(&(GLOBAL_GAIN_CB, 0x20)));
        // The default shutter-priority auto-exposure.
        assert!(writes.contains(&(EMBEDDED_DATA_CTRL, 0x1982)));
        assert!(writes.contains(&(AE_CTRL, 0x0013)));
    }

    #[test]
    fn gains_write_both_contexts() {
        let (bus, mut sensor) = powered();
        assert_eq!(sensor.set_control(ControlId::Gain, 0x40).unwrap(), 0x40);
        assert_eq!(sensor.set_control(ControlId::GainRed, 300).unwrap(), 0xFF);
        assert_eq!(
            bus.writes(),
            vec![
                (GLOBAL_GAIN, 0x40),
                (GLOBAL_GAIN_CB, 0x40),
                (RED_GAIN, 0xFF),
                (RED_GAIN_CB, 0xFF),
            ]
        );
        assert_eq!(sensor.control(ControlId::GainRed), Some(0xFF));
    }

    #[test]
    fn flips_preserve_other_bits() {
        let (bus, mut sensor) = powered();
        bus.set_register(0x3040, 0x0001);
        sensor.set_control(ControlId::HorizontalFlip, 1).unwrap();
        assert_eq!(bus.register(0x3040), Some(0x4001));
        sensor.set_control(ControlId::VerticalFlip, 1).unwrap();
        assert_eq!(bus.register(0x3040), Some(0xC001));
        sensor.set_control(ControlId::HorizontalFlip, 0).unwrap();
        assert_eq!(bus.register(0x3040), Some(0x8001));
    }

    #[test]
    fn analog_gain_field() {
        let (bus, mut sensor) = powered();
        bus.set_register(DIGITAL_TEST, 0x1300);
        sensor.set_control(ControlId::AnalogGain, 3).unwrap();
        assert_eq!(bus.register(DIGITAL_TEST), Some(0x1330));
    }

    #[test]
    fn test_pattern_menu() {
        let (bus, mut sensor) = powered();
        sensor.set_control(ControlId::TestPattern, 4).unwrap();
        assert_eq!(bus.writes(), vec![(TEST_PATTERN, 256)]);
        bus.clear_events();
        sensor.set_control(ControlId::TestPattern, 0).unwrap();
        assert_eq!(bus.writes(), vec![(TEST_PATTERN, 0), (TEST_PATTERN, 0)]);
        let err = sensor.set_control(ControlId::TestPattern, 5).unwrap_err();
        assert!(matches!(
            err,
            Error::LibraryError(LibraryError::OutOfRange(_))
        ));
    }

    #[test]
    fn unsupported_control() {
        let (_bus, mut sensor) = powered();
        let err = sensor.set_control(ControlId::ZoomAbsolute, 2).unwrap_err();
        assert!(matches!(
            err,
            Error::LibraryError(LibraryError::InvalidArgument(_))
        ));
    }

    #[test]
    fn autoexposure_restarts_stream() {
        let (bus, mut sensor) = powered();
        bus.set_register(RESET_REGISTER, ResetRegister::STREAM_ON as u32);
        sensor
            .set_control(ControlId::ExposureAuto, AutoExposureMode::Manual as i32)
            .unwrap();
        assert_eq!(
            bus.writes(),
            vec![
                (RESET_REGISTER, 0x00D8),
                (EMBEDDED_DATA_CTRL, 0x1802),
                (AE_CTRL, 0x0000),
                (RESET_REGISTER, 0x00DC),
            ]
        );
        assert_eq!(bus.delays(), vec![2]);
        assert_eq!(sensor.autoexposure(), Some(AutoExposureMode::Manual));
    }

    #[test]
    fn autoexposure_while_stopped() {
        let (bus, mut sensor) = powered();
        bus.set_register(RESET_REGISTER, ResetRegister::STREAM_OFF as u32);
        sensor
            .set_control(ControlId::ExposureAuto, AutoExposureMode::ShutterPriority as i32)
            .unwrap();
        assert_eq!(
            bus.writes(),
            vec![(EMBEDDED_DATA_CTRL, 0x1982), (AE_CTRL, 0x0013)]
        );
    }

    #[test]
    fn unsupported_autoexposure_keeps_mode() {
        let (bus, mut sensor) = powered();
        let err = sensor
            .set_control(ControlId::ExposureAuto, AutoExposureMode::Auto as i32)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::LibraryError(LibraryError::InvalidArgument(_))
        ));
        let err = sensor
            .set_control(ControlId::ExposureAuto, AutoExposureMode::AperturePriority as i32)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::LibraryError(LibraryError::InvalidArgument(_))
        ));
        let err = sensor.set_control(ControlId::ExposureAuto, 7).unwrap_err();
        assert!(matches!(
            err,
            Error::LibraryError(LibraryError::OutOfRange(_))
        ));
        assert!(bus.writes().is_empty());
        assert_eq!(sensor.autoexposure(), Some(AutoExposureMode::ShutterPriority));
    }

    #[test]
    fn unsupported_autoexposure_while_off() {
        let (bus, mut sensor) = sensor();
        let err = sensor
            .set_control(ControlId::ExposureAuto, AutoExposureMode::Auto as i32)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::LibraryError(LibraryError::InvalidArgument(_))
        ));
        assert!(sensor
            .set_control(ControlId::ExposureAuto, AutoExposureMode::AperturePriority as i32)
            .is_err());
        assert!(bus.events().is_empty());
        assert_eq!(sensor.autoexposure(), Some(AutoExposureMode::ShutterPriority));

        // The rejected mode isn't replayed, so the sensor still powers up.
        sensor.set_power(true).unwrap();
        assert_eq!(sensor.power_count(), 1);
        assert!(bus.writes().contains(&(AE_CTRL, 0x0013)));
    }

    #[test]
    fn stream_off() {
        let (bus, mut sensor) = powered();
        sensor.set_stream(false).unwrap();
        assert_eq!(bus.writes(), vec![(RESET_REGISTER, 0x00D8)]);
    }

    #[test]
    fn stream_on_sequence() {
        let (bus, mut sensor) = powered();
        sensor.set_stream(true).unwrap();
        let writes = bus.writes();
        assert_eq!(writes[0], (SEQ_CTRL_PORT, 0x8000));
        let sequencer = 1 + Mt9m034::SEQUENCER.len();
        assert!(writes[1..sequencer]
            .iter()
            .all(|(address, _)| *address == SEQ_DATA_PORT));
        assert_eq!(writes[sequencer], (ERS_PROG_START_ADDR, 0x0186));
        // Linear mode starts by stopping the stream.
        assert_eq!(writes[sequencer + 1], (RESET_REGISTER, 0x00D8));
        // Full-size window without binning.
        assert!(writes.contains(&(DIGITAL_BINNING, 0x0000)));
        assert!(writes.contains(&(Y_ADDR_END, 959)));
        assert!(writes.contains(&(X_ADDR_END, 1279)));
        assert!(writes.contains(&(FRAME_LENGTH_LINES, 997)));
        assert!(writes.contains(&(LINE_LENGTH_PCK, 1650)));
        // 24 MHz to 48 MHz dividers, colour sensor.
        let pll = writes
            .iter()
            .position(|w| *w == (VT_SYS_CLK_DIV, 2))
            .unwrap();
        assert_eq!(
            &writes[pll..pll + 5],
            &[
                (VT_SYS_CLK_DIV, 2),
                (VT_PIX_CLK_DIV, 4),
                (PRE_PLL_CLK_DIV, 2),
                (PLL_MULTIPLIER, 32),
                (DIGITAL_TEST, 0x0000),
            ]
        );
        assert_eq!(writes.last(), Some(&(RESET_REGISTER, 0x00DC)));
        assert_eq!(bus.delays(), vec![200, 200, 100]);
    }

    #[test]
    fn stream_on_stops_at_failure() {
        let (bus, mut sensor) = powered();
        let sequencer = 2 + Mt9m034::SEQUENCER.len();
        // Fail the first linear mode write.
        bus.fail_writes(sequencer, 1);
        assert!(sensor.set_stream(true).is_err());
        assert_eq!(bus.writes().len(), sequencer);
        assert!(!bus.writes().contains(&(RESET_REGISTER, 0x00DC)));
    }

    #[test]
    fn stream_on_without_pll_dividers() {
        let bus = MockSensorBus::new_16bit(DEFAULT_ADDRESS);
        let mut sensor: Sensor = Mt9m0xx::new(
            bus.clone(),
            bus.delay(),
            bus.platform(),
            PlatformData::new(25_000_000, 48_000_000),
        );
        let err = sensor.set_stream(true).unwrap_err();
        assert!(matches!(
            err,
            Error::LibraryError(LibraryError::NoPllDividers {
                ext_freq: 25_000_000,
                target_freq: 48_000_000
            })
        ));
        let writes = bus.writes();
        assert!(!writes.contains(&(RESET_REGISTER, 0x00DC)));
        assert!(!writes.iter().any(|(address, _)| *address == AE_CTRL));
    }

    #[test]
    fn monochrome_digital_test() {
        let bus = MockSensorBus::new_16bit(DEFAULT_ADDRESS);
        let mut sensor: Sensor = Mt9m0xx::new(
            bus.clone(),
            bus.delay(),
            bus.platform(),
            PlatformData::default().monochrome(),
        );
        sensor.set_stream(true).unwrap();
        let writes = bus.writes();
        let multiplier = writes
            .iter()
            .position(|w| *w == (PLL_MULTIPLIER, 32))
            .unwrap();
        assert_eq!(writes[multiplier + 1], (DIGITAL_TEST, 0x0080));
    }

    fn binning_writes(bus: &MockSensorBus) -> Vec<u32> {
        bus.writes()
            .into_iter()
            .filter(|(address, _)| *address == DIGITAL_BINNING)
            .map(|(_, value)| value)
            .collect()
    }

    #[test]
    fn binning_from_format() {
        let (bus, mut sensor) = powered();
        let format = sensor.set_format(FormatWhich::Active, 640, 480);
        assert_eq!(format.size(), FrameSize::new(640, 480));
        sensor.set_stream(true).unwrap();
        assert_eq!(binning_writes(&bus), vec![0x0022]);

        bus.clear_events();
        sensor.set_format(FormatWhich::Active, 640, 960);
        sensor.set_stream(true).unwrap();
        assert_eq!(binning_writes(&bus), vec![0x0011]);

        bus.clear_events();
        sensor.set_format(FormatWhich::Active, 640, 240);
        sensor.set_stream(true).unwrap();
        assert!(binning_writes(&bus).is_empty());
    }

    #[test]
    fn format_is_clamped_and_aligned() {
        let (_bus, mut sensor) = sensor();
        let format = sensor.set_format(FormatWhich::Active, 5000, 1);
        assert_eq!(format.size(), FrameSize::new(1280, 2));
        assert_eq!(format.code, MbusCode::Sgrbg12_1x12);
        let format = sensor.set_format(FormatWhich::Active, 427, 321);
        // Ratio 3 in both directions.
        assert_eq!(format.size(), FrameSize::new(426, 320));
    }

    #[test]
    fn crop_is_clamped() {
        let (_bus, mut sensor) = sensor();
        let rect = sensor.set_crop(FormatWhich::Active, Rect::new(1001, 3, 500, 2000));
        assert_eq!(rect, Rect::new(1002, 4, 278, 956));
        // The output size followed the new window.
        assert_eq!(
            sensor.get_format(FormatWhich::Active).size(),
            FrameSize::new(278, 956)
        );
    }

    #[test]
    fn crop_same_size_keeps_format() {
        let (_bus, mut sensor) = sensor();
        sensor.set_format(FormatWhich::Active, 640, 480);
        sensor.set_crop(FormatWhich::Active, Rect::new(0, 0, 1280, 960));
        assert_eq!(
            sensor.get_format(FormatWhich::Active).size(),
            FrameSize::new(640, 480)
        );
    }

    #[test]
    fn try_format_is_separate() {
        let (_bus, mut sensor) = sensor();
        sensor.set_crop(FormatWhich::Try, Rect::new(0, 0, 640, 480));
        sensor.set_format(FormatWhich::Try, 320, 240);
        assert_eq!(
            sensor.get_format(FormatWhich::Try).size(),
            FrameSize::new(320, 240)
        );
        assert_eq!(sensor.get_crop(FormatWhich::Active), Rect::new(0, 0, 1280, 960));
        assert_eq!(sensor.get_format(FormatWhich::Active).size(), PIXEL_ARRAY);
    }

    #[test]
    fn enumeration() {
        let (_bus, sensor) = sensor();
        assert_eq!(sensor.enum_mbus_code(0), Ok(MbusCode::Sgrbg12_1x12));
        assert!(sensor.enum_mbus_code(1).is_err());
        let range = sensor.enum_frame_size(0, MbusCode::Sgrbg12_1x12).unwrap();
        assert_eq!(range.min, FrameSize::new(2, 2));
        assert_eq!(range.max, FrameSize::new(1280, 960));
        assert!(sensor.enum_frame_size(0, MbusCode::Uyvy8_1x16).is_err());
        assert!(sensor.enum_frame_size(1, MbusCode::Sgrbg12_1x12).is_err());
    }

    #[test]
    fn raw_register_access() {
        let (bus, mut sensor) = powered();
        bus.set_register(0x3000, 0x2400);
        assert_eq!(sensor.get_register(0x3000).unwrap(), 0x2400);
        sensor.set_register(0x3070, 2).unwrap();
        assert_eq!(bus.writes(), vec![(0x3070, 2)]);
    }

    #[test]
    fn subdevice_shutdown() {
        let (bus, mut sensor) = powered();
        Subdevice::shutdown(&mut sensor).unwrap();
        assert_eq!(
            bus.events(),
            vec![
                Event::Write {
                    address: RESET_REGISTER,
                    value: 0x00D8
                },
                Event::Xclk(0),
            ]
        );
        assert!(!bus.events().contains(&Event::Power(PowerState::Off)));
    }
}
