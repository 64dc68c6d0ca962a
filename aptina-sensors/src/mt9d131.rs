// SPDX-License-Identifier: Apache-2.0
// Copyright © 2026 The aptina-sensors developers
//! The MT9D131 2 MP system-on-chip sensor.
//!
//! Registers are paged behind register 0xF0, with 8-bit addresses and 16-bit values. Most of the
//! interesting settings are firmware variables, reached by writing the variable's address to
//! [`MCU_ADDRESS`] on page 1 and then its value to [`MCU_DATA`].
use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::blocking::i2c;

use crate::bus::{read_word8, write_table8, write_word8, Width};
use crate::controls::{ControlCache, ControlId, ControlRange};
use crate::debug::RegisterDebug;
use crate::error::{Error, LibraryError};
use crate::format::{calc_size, FrameSize, MbusCode, MbusFramefmt, Rect};
use crate::power::{PlatformData, PowerCount, SensorPlatform};
use crate::subdev::{FormatWhich, Subdevice};
use crate::util::with_bits;

pub const DEFAULT_ADDRESS: u8 = 0x5D;

const CHIP_VERSION: u8 = 0x00;
const CHIP_VERSION_VALUE: u16 = 0x1519;
const RST: u8 = 0x0D;
const RST_ENABLE: u16 = 0x0021;
const RST_DISABLE: u16 = 0x0000;
const READ_MODE_B: u8 = 0x20;
const READ_MODE_A: u8 = 0x21;
const PLL_CONTROL: u8 = 0x65;
const PLL_CONFIG_1: u8 = 0x66;
const PLL_CONFIG_2: u8 = 0x67;
const PAGE: u8 = 0xF0;
pub const MCU_ADDRESS: u8 = 0xC6;
pub const MCU_DATA: u8 = 0xC8;

const PLL_CONTROL_POWER_ON: u16 = 0xA000;
const PLL_CONTROL_USE_PLL: u16 = 0x2000;
const PLL_CONTROL_POWER_OFF: u16 = 0xC000;

/// Read mode bits shared by both contexts.
const READ_MODE_VFLIP: u16 = 0x0001;
const READ_MODE_HFLIP: u16 = 0x0002;

/// Read mode A with and without 2x binning.
const READ_MODE_BINNING: u16 = 0x8400;
const READ_MODE_FULL: u16 = 0x0400;

// Firmware variables
const MODE_OUTPUT_WIDTH_A: u16 = 0x2703;
const MODE_OUTPUT_HEIGHT_A: u16 = 0x2705;
const MODE_CROP_X1_A: u16 = 0x2729;
const MODE_CROP_Y1_A: u16 = 0x272D;
const MODE_SPEC_EFFECTS_B: u16 = 0xA77D;
const SEQ_CMD: u16 = 0xA103;

/// Sequencer command to refresh the current mode.
const SEQ_CMD_REFRESH: u16 = 0x0005;

pub const MAX_WIDTH: u32 = 1600;
pub const MAX_HEIGHT: u32 = 1200;

/// Outputs larger than this in both directions are read without binning.
const BINNING_LIMIT: FrameSize = FrameSize::new(800, 600);

const DEFAULT_WINDOW: Rect = Rect::new(0, 0, 800, 600);

/// Supported output sizes, smallest first.
pub const SIZES: [FrameSize; 12] = [
    FrameSize::new(80, 60),
    FrameSize::new(160, 120),
    FrameSize::new(176, 144),
    FrameSize::new(320, 240),
    FrameSize::new(352, 288),
    FrameSize::new(400, 300),
    FrameSize::new(640, 480),
    FrameSize::new(800, 600),
    FrameSize::new(1280, 720),
    FrameSize::new(1280, 960),
    FrameSize::new(1280, 1024),
    FrameSize::new(1600, 1200),
];

/// Start the PLL from the 24MHz clock and wait for it to lock.
const PLL_SETUP: [(u8, u16); 5] = [
    (PAGE, 0),
    (PLL_CONFIG_1, 0x500B),
    (PLL_CONFIG_2, 0x0200),
    (PLL_CONTROL, PLL_CONTROL_POWER_ON),
    (PLL_CONTROL, PLL_CONTROL_USE_PLL),
];

/// Clear the context B special effects and refresh.
const STREAM_SETUP: [(u8, u16); 5] = [
    (PAGE, 1),
    (MCU_ADDRESS, MODE_SPEC_EFFECTS_B),
    (MCU_DATA, 0x0000),
    (MCU_ADDRESS, SEQ_CMD),
    (MCU_DATA, SEQ_CMD_REFRESH),
];

const REFRESH: [(u8, u16); 3] = [(PAGE, 1), (MCU_ADDRESS, SEQ_CMD), (MCU_DATA, SEQ_CMD_REFRESH)];

/// Valid zoom factors. Zero leaves the output alone.
pub const ZOOM_FACTORS: [i32; 4] = [0, 2, 4, 6];

const CONTROL_COUNT: usize = 4;

/// Driver for an MT9D131.
#[derive(Debug)]
pub struct Mt9d131<I2C, D, P> {
    bus: I2C,
    delay: D,
    platform: P,
    address: u8,
    platform_data: PlatformData,

    rect: Rect,
    format: MbusFramefmt,
    try_format: MbusFramefmt,

    controls: ControlCache<CONTROL_COUNT>,
    power: PowerCount,
}

impl<I2C, D, P> Mt9d131<I2C, D, P>
where
    I2C: i2c::WriteRead + i2c::Write,
    D: DelayMs<u32>,
    P: SensorPlatform,
{
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
        let format = MbusFramefmt::new(DEFAULT_WINDOW.size(), Self::code(&platform_data));
        let mut controls = ControlCache::new();
        controls
            .add_integer(ControlId::HorizontalFlip, ControlRange::boolean())
            .add_integer(ControlId::VerticalFlip, ControlRange::boolean())
            .add_integer(ControlId::PanAbsolute, ControlRange::new(0, 400, 10, 0))
            .add_integer(ControlId::ZoomAbsolute, ControlRange::new(0, 16, 2, 0));
        Self {
            bus,
            delay,
            platform,
            address,
            platform_data,
            rect: DEFAULT_WINDOW,
            format,
            try_format: format,
            controls,
            power: PowerCount::new(),
        }
    }

    fn code(platform_data: &PlatformData) -> MbusCode {
        if platform_data.is_monochrome() {
            MbusCode::Y12_1x12
        } else {
            MbusCode::Uyvy8_1x16
        }
    }

    pub fn release(self) -> (I2C, D, P) {
        (self.bus, self.delay, self.platform)
    }

    fn read(&mut self, register: u8) -> Result<u16, Error<I2C>> {
        read_word8(&mut self.bus, self.address, register)
    }

    fn write(&mut self, register: u8, value: u16) -> Result<(), Error<I2C>> {
        write_word8(&mut self.bus, self.address, register, value)
    }

    fn write_table(&mut self, table: &[(u8, u16)]) -> Result<(), Error<I2C>> {
        write_table8(&mut self.bus, self.address, table)
    }

    fn reset(&mut self) -> Result<(), Error<I2C>> {
        self.write(RST, RST_ENABLE)?;
        self.write(RST, RST_DISABLE)
    }

    fn power_on(&mut self) -> Result<(), Error<I2C>> {
        self.platform.set_reset(true);
        self.delay.delay_ms(1);
        self.platform.set_xclk(self.platform_data.ext_freq);
        self.platform.set_reset(false);
        self.delay.delay_ms(1);
        self.reset().map_err(|err| {
            log::error!("Failed to reset the camera");
            err
        })
    }

    fn power_off(&mut self) {
        self.platform.set_reset(true);
        self.delay.delay_ms(1);
        self.platform.set_xclk(0);
    }

    pub fn power_count(&self) -> u32 {
        self.power.count()
    }

    /// Take or drop a power reference. Flips set while the sensor was off are applied when it
    /// powers up.
    pub fn set_power(&mut self, on: bool) -> Result<(), Error<I2C>> {
        if on {
            if self.power.is_off() {
                self.power_on()?;
                for id in [ControlId::HorizontalFlip, ControlId::VerticalFlip] {
                    if self.controls.get(id) == Some(1) {
                        self.apply_control(id, 1)?;
                    }
                }
            }
            self.power.acquire();
        } else if self.power.release()? {
            self.power_off();
        }
        Ok(())
    }

    fn probe(&mut self) -> Result<(), Error<I2C>> {
        let version = self.read(CHIP_VERSION)?;
        if version != CHIP_VERSION_VALUE {
            log::error!("No MT9D131 chip detected, register read {:x}", version);
            return Err(LibraryError::ChipNotDetected {
                expected: CHIP_VERSION_VALUE,
                found: version,
            }
            .into());
        }
        log::info!("Detected a MT9D131 chip ID {:x}", version);
        Ok(())
    }

    /// Power up, check the chip version, and power down again.
    pub fn registered(&mut self) -> Result<(), Error<I2C>> {
        self.set_power(true)?;
        let detected = self.probe();
        self.set_power(false)?;
        detected
    }

    /// Reset the window and format to their defaults and take a power reference.
    pub fn open(&mut self) -> Result<(), Error<I2C>> {
        self.rect = DEFAULT_WINDOW;
        self.format = MbusFramefmt::new(DEFAULT_WINDOW.size(), Self::code(&self.platform_data));
        self.set_power(true)
    }

    pub fn close(&mut self) -> Result<(), Error<I2C>> {
        self.set_power(false)
    }

    /// Program the output size, switching binning on for sizes up to 800x600.
    fn setup_output(&mut self, size: FrameSize) -> Result<(), Error<I2C>> {
        let (width, height) = (size.width as u16, size.height as u16);
        let read_mode = if size.width > BINNING_LIMIT.width && size.height > BINNING_LIMIT.height {
            READ_MODE_FULL
        } else {
            READ_MODE_BINNING
        };
        log::debug!(
            "MT9D131 output {}x{}, binning {}",
            width,
            height,
            read_mode == READ_MODE_BINNING
        );
        self.write_table(&[
            (PAGE, 1),
            (MCU_ADDRESS, MODE_OUTPUT_WIDTH_A),
            (MCU_DATA, width),
            (MCU_ADDRESS, MODE_OUTPUT_HEIGHT_A),
            (MCU_DATA, height),
            (PAGE, 0),
            (READ_MODE_A, read_mode),
            (PAGE, 1),
            (MCU_ADDRESS, MODE_CROP_X1_A),
            (MCU_DATA, width),
            (MCU_ADDRESS, MODE_CROP_Y1_A),
            (MCU_DATA, height),
        ])?;
        // Let the new mode settle
        self.delay.delay_ms(200);
        self.write_table(&REFRESH)
    }

    /// Start the PLL and program the output on stream-on, stop the PLL on stream-off.
    ///
    /// Stream-on programs the current window. Zoom is only applied when the control is set.
    pub fn set_stream(&mut self, enable: bool) -> Result<(), Error<I2C>> {
        if !enable {
            return self.write(PLL_CONTROL, PLL_CONTROL_POWER_OFF);
        }
        self.write_table(&PLL_SETUP)?;
        self.delay.delay_ms(20);
        self.write_table(&STREAM_SETUP)?;
        let size = self.rect.size();
        self.setup_output(size)
    }

    pub fn enum_mbus_code(&self, index: u32) -> Result<MbusCode, LibraryError> {
        if index != 0 {
            return Err(LibraryError::InvalidArgument("mbus code index"));
        }
        Ok(self.format.code)
    }

    pub fn get_format(&self, which: FormatWhich) -> MbusFramefmt {
        match which {
            FormatWhich::Try => self.try_format,
            FormatWhich::Active => self.format,
        }
    }

    /// Pick the smallest supported size with at least as many pixels as requested.
    pub fn set_format(&mut self, which: FormatWhich, width: u32, height: u32) -> MbusFramefmt {
        let size = SIZES[calc_size(&SIZES, width, height)];
        let code = Self::code(&self.platform_data);
        match which {
            FormatWhich::Try => {
                self.try_format = MbusFramefmt::new(size, code);
                self.try_format
            }
            FormatWhich::Active => {
                self.rect.width = size.width;
                self.rect.height = size.height;
                self.format = MbusFramefmt::new(size, code);
                self.format
            }
        }
    }

    pub fn window(&self) -> Rect {
        self.rect
    }

    pub fn control(&self, id: ControlId) -> Option<i32> {
        self.controls.get(id)
    }

    /// Set a control, returning the value actually used.
    ///
    /// Zoom only accepts the factors in [`ZOOM_FACTORS`]. Pan is accepted but does nothing.
    pub fn set_control(&mut self, id: ControlId, value: i32) -> Result<i32, Error<I2C>> {
        if id == ControlId::ZoomAbsolute && !ZOOM_FACTORS.contains(&value) {
            log::error!("Absolute zoom value out of range, supported values are 0, 2, 4, 6");
            return Err(LibraryError::InvalidArgument("zoom factor").into());
        }
        let value = self.controls.validate(id, value)?;
        if !self.power.is_off() {
            self.apply_control(id, value)?;
        }
        self.controls.commit(id, value);
        Ok(value)
    }

    fn apply_control(&mut self, id: ControlId, value: i32) -> Result<(), Error<I2C>> {
        match id {
            ControlId::HorizontalFlip => self.set_read_mode_bit(READ_MODE_HFLIP, value != 0),
            ControlId::VerticalFlip => self.set_read_mode_bit(READ_MODE_VFLIP, value != 0),
            ControlId::ZoomAbsolute => self.setup_output(zoomed_size(self.rect.size(), value)),
            _ => Ok(()),
        }
    }

    /// Set or clear a bit in both read mode contexts, then refresh.
    fn set_read_mode_bit(&mut self, bit: u16, set: bool) -> Result<(), Error<I2C>> {
        self.write(PAGE, 0)?;
        for register in [READ_MODE_B, READ_MODE_A] {
            let data = with_bits(self.read(register)?, bit, set);
            self.write(register, data)?;
        }
        self.write_table(&REFRESH)
    }
}

/// Multiply a size by a zoom factor, falling back to the full 1600x1200 if that's too large.
fn zoomed_size(size: FrameSize, zoom: i32) -> FrameSize {
    let factor = zoom.max(1) as u32;
    let zoomed = FrameSize::new(size.width * factor, size.height * factor);
    if zoomed.width > MAX_WIDTH || zoomed.height > MAX_HEIGHT {
        FrameSize::new(MAX_WIDTH, MAX_HEIGHT)
    } else {
        zoomed
    }
}

impl<I2C, D, P> Subdevice for Mt9d131<I2C, D, P>
where
    I2C: i2c::WriteRead + i2c::Write,
    D: DelayMs<u32>,
    P: SensorPlatform,
{
    type Error = Error<I2C>;

    fn registered(&mut self) -> Result<(), Self::Error> {
        Mt9d131::registered(self)
    }

    fn set_power(&mut self, on: bool) -> Result<(), Self::Error> {
        Mt9d131::set_power(self, on)
    }

    fn set_stream(&mut self, enable: bool) -> Result<(), Self::Error> {
        Mt9d131::set_stream(self, enable)
    }

    fn frame_size(&self) -> FrameSize {
        self.format.size()
    }

    fn set_frame_size(&mut self, width: u32, height: u32) -> Result<FrameSize, Self::Error> {
        Ok(self.set_format(FormatWhich::Active, width, height).size())
    }
}

impl<I2C, D, P> RegisterDebug for Mt9d131<I2C, D, P>
where
    I2C: i2c::WriteRead + i2c::Write,
    D: DelayMs<u32>,
    P: SensorPlatform,
{
    type Error = Error<I2C>;

    fn debug_read(&mut self, address: u16, _width: Width) -> Result<u32, Self::Error> {
        let register =
            u8::try_from(address).map_err(|_| LibraryError::OutOfRange("register address"))?;
        self.read(register).map(u32::from)
    }

    fn debug_write(&mut self, address: u16, _width: Width, value: u32) -> Result<(), Self::Error> {
        let register =
            u8::try_from(address).map_err(|_| LibraryError::OutOfRange("register address"))?;
        self.write(register, value as u16)
    }
}
