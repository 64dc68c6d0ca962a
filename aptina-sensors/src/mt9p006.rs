// SPDX-License-Identifier: Apache-2.0
// Copyright © 2026 The aptina-sensors developers
//! The MT9P006 5 MP sensor.
//!
//! The MT9P006 uses 8-bit register addresses with 16-bit values. Output control and read mode 2
//! are shadowed in the driver and only ever written, never read back. Output sizes are a fixed
//! list of modes, each with its own window and skipping configuration.
use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::blocking::i2c;

use crate::bus::{read_word8, write_table8, write_word8, Width};
use crate::controls::{ControlCache, ControlId, ControlRange};
use crate::debug::RegisterDebug;
use crate::error::{Error, LibraryError};
use crate::format::{calc_size, find_isize, FrameSize, FrameSizeRange, MbusCode, MbusFramefmt, Rect};
use crate::pll::{find_dividers, PllDividers};
use crate::power::{PlatformData, PowerCount, SensorPlatform};
use crate::register::{OutputControl, ReadMode2, Register};
use crate::subdev::{FormatWhich, Subdevice};

pub const DEFAULT_ADDRESS: u8 = 0x5D;

const CHIP_VERSION: u8 = 0x00;
const CHIP_VERSION_VALUE: u16 = 0x1801;
const SHUTTER_WIDTH_UPPER: u8 = 0x08;
const SHUTTER_WIDTH_LOWER: u8 = 0x09;
const PLL_CONTROL: u8 = 0x10;
const PLL_CONFIG_1: u8 = 0x11;
const PLL_CONFIG_2: u8 = 0x12;
const RST: u8 = 0x0D;
const GLOBAL_GAIN: u8 = 0x35;

const PLL_CONTROL_POWER_OFF: u16 = 0x0050;
const PLL_CONTROL_POWER_ON: u16 = 0x0051;
const PLL_CONTROL_USE_PLL: u16 = 0x0052;

const CONTROL_COUNT: usize = 4;

/// Default sensor window.
const DEFAULT_CROP: Rect = Rect::new(16, 54, 2592, 1944);

/// Supported output sizes, smallest first.
pub const SIZES: [FrameSize; 5] = [
    FrameSize::new(640, 480),
    FrameSize::new(1280, 720),
    FrameSize::new(1920, 1080),
    FrameSize::new(2048, 1536),
    FrameSize::new(2592, 1944),
];

/// Clock plans. `p2` is unused on this sensor.
pub const PLL_TABLE: [PllDividers; 1] = [PllDividers::new(24_000_000, 48_000_000, 26, 2, 6, 1)];

/// VGA with 4x skipping.
const MODE_VGA: [(u8, u16); 10] = [
    (0x03, 0x0778),
    (0x04, 0x09F8),
    (0x08, 0x0000),
    (0x09, 0x01AC),
    (0x0C, 0x0000),
    (0x22, 0x0033),
    (0x23, 0x0033),
    (0x08, 0x0000),
    (0x09, 0x0296),
    (0x0C, 0x0000),
];

/// 720p with 2x skipping.
const MODE_720P: [(u8, u16); 13] = [
    (0x01, 0x0040),
    (0x02, 0x0018),
    (0x03, 0x059F),
    (0x04, 0x09FF),
    (0x05, 0x0000),
    (0x06, 0x0000),
    (0x09, 0x0400),
    (0x22, 0x0011),
    (0x23, 0x0011),
    (0x20, 0x0060),
    (0x08, 0x0000),
    (0x09, 0x05AF),
    (0x0C, 0x0000),
];

const MODE_1080P: [(u8, u16); 12] = [
    (0x01, 0x01E6),
    (0x02, 0x0160),
    (0x03, 0x0438),
    (0x04, 0x0780),
    (0x05, 0x0121),
    (0x06, 0x0008),
    (0x09, 0x0442),
    (0x22, 0x0000),
    (0x23, 0x0000),
    (0x08, 0x0000),
    (0x06, 0x0008),
    (0x05, 0x0121),
];

const MODE_3MP: [(u8, u16); 13] = [
    (0x01, 0x00F6),
    (0x02, 0x0120),
    (0x03, 0x0600),
    (0x04, 0x0800),
    (0x05, 0x0121),
    (0x06, 0x0008),
    (0x09, 0x060A),
    (0x22, 0x0000),
    (0x23, 0x0000),
    (0x20, 0x0060),
    (0x08, 0x0000),
    (0x09, 0x060A),
    (0x0C, 0x0000),
];

const MODE_5MP: [(u8, u16); 13] = [
    (0x01, 0x0036),
    (0x02, 0x0010),
    (0x03, 0x0798),
    (0x04, 0x0A20),
    (0x05, 0x0121),
    (0x06, 0x0008),
    (0x09, 0x07A2),
    (0x22, 0x0000),
    (0x23, 0x0000),
    (0x20, 0x0060),
    (0x08, 0x0000),
    (0x09, 0x07A2),
    (0x0C, 0x0000),
];

/// Mode tables, indexed like [`SIZES`].
const MODES: [&[(u8, u16)]; 5] = [&MODE_VGA, &MODE_720P, &MODE_1080P, &MODE_3MP, &MODE_5MP];

/// Analog tuning written after every mode table.
const SUBSAMPLE_OPTIMIZATION: [(u8, u16); 26] = [
    (0x70, 0x005C),
    (0x71, 0x5B00),
    (0x72, 0x5900),
    (0x73, 0x0200),
    (0x74, 0x0200),
    (0x75, 0x2800),
    (0x76, 0x3E29),
    (0x77, 0x3E29),
    (0x78, 0x583F),
    (0x79, 0x5B00),
    (0x7A, 0x5A00),
    (0x7B, 0x5900),
    (0x7C, 0x5900),
    (0x7E, 0x5900),
    (0x7F, 0x5900),
    (0x06, 0x0000),
    (0x29, 0x0481),
    (0x3E, 0x0087),
    (0x3F, 0x0007),
    (0x41, 0x0003),
    (0x48, 0x0018),
    (0x5F, 0x1C16),
    (0x57, 0x0007),
    (0x2A, 0xFF74),
    (0x35, 0x000C),
    (0x3E, 0x0007),
];

/// Shutter, per-channel gain and read mode defaults.
const INIT_SETTINGS: [(u8, u16); 10] = [
    (SHUTTER_WIDTH_UPPER, 0x0000),
    (SHUTTER_WIDTH_LOWER, 0x00E6),
    (0x0C, 0x0613),
    (0x2B, 0x0008),
    (0x2C, 0x0012),
    (0x2D, 0x000A),
    (0x2E, 0x0008),
    (0x1E, 0x0006),
    (0x35, 0x000C),
    (0x3E, 0x0007),
];

/// Encode a global gain (in eighths) for the gain register.
///
/// The second analog stage is used up first, then the first analog stage, then the digital
/// stage. Returns the gain actually applied along with the register value.
fn encode_gain(gain: i32) -> (i32, u16) {
    if gain <= 32 {
        (gain, gain as u16)
    } else if gain <= 64 {
        let gain = gain & !1;
        (gain, (1 << 6) | (gain >> 1) as u16)
    } else {
        let gain = gain & !7;
        (gain, (((gain - 64) << 5) as u16) | (1 << 6) | 32)
    }
}

/// Driver for an MT9P006.
#[derive(Debug)]
pub struct Mt9p006<I2C, D, P> {
    bus: I2C,
    delay: D,
    platform: P,
    address: u8,
    platform_data: PlatformData,
    pll: PllDividers,

    crop: Rect,
    format: MbusFramefmt,
    try_format: MbusFramefmt,

    output_control: OutputControl,
    mode2: ReadMode2,

    controls: ControlCache<CONTROL_COUNT>,
    power: PowerCount,
}

impl<I2C, D, P> Mt9p006<I2C, D, P>
where
    I2C: i2c::WriteRead + i2c::Write,
    D: DelayMs<u32>,
    P: SensorPlatform,
{
    /// Create a driver for a sensor at the default address.
    ///
    /// Fails if the board's clock plan isn't in [`PLL_TABLE`].
    pub fn new(
        bus: I2C,
        delay: D,
        platform: P,
        platform_data: PlatformData,
    ) -> Result<Self, LibraryError> {
        Self::new_with_address(bus, delay, platform, platform_data, DEFAULT_ADDRESS)
    }

    pub fn new_with_address(
        bus: I2C,
        delay: D,
        platform: P,
        platform_data: PlatformData,
        address: u8,
    ) -> Result<Self, LibraryError> {
        let pll = find_dividers(
            &PLL_TABLE,
            platform_data.ext_freq,
            platform_data.target_freq,
        )
        .map_err(|err| {
            log::error!(
                "Couldn't find PLL dividers for ext_freq = {}, target_freq = {}",
                platform_data.ext_freq,
                platform_data.target_freq
            );
            err
        })?;
        let format = MbusFramefmt::new(DEFAULT_CROP.size(), MbusCode::Sgrbg12_1x12);
        let mut controls = ControlCache::new();
        controls
            .add_integer(ControlId::Exposure, ControlRange::new(1, 0x000F_FFFF, 1, 1943))
            .add_integer(ControlId::Gain, ControlRange::new(8, 1024, 1, 8))
            .add_integer(ControlId::HorizontalFlip, ControlRange::boolean())
            .add_integer(ControlId::VerticalFlip, ControlRange::boolean());
        Ok(Self {
            bus,
            delay,
            platform,
            address,
            platform_data,
            pll,
            crop: DEFAULT_CROP,
            format,
            try_format: format,
            output_control: OutputControl::default(),
            mode2: ReadMode2::default(),
            controls,
            power: PowerCount::new(),
        })
    }

    pub fn release(self) -> (I2C, D, P) {
        (self.bus, self.delay, self.platform)
    }

    /// The PLL dividers selected for the board's clock plan.
    pub fn pll(&self) -> PllDividers {
        self.pll
    }

    fn write(&mut self, register: u8, value: u16) -> Result<(), Error<I2C>> {
        write_word8(&mut self.bus, self.address, register, value)
    }

    fn power_on(&mut self) {
        self.platform.set_reset(true);
        self.delay.delay_ms(1);
        self.platform.set_xclk(self.platform_data.ext_freq);
        self.platform.set_reset(false);
        self.delay.delay_ms(1);
    }

    fn power_off(&mut self) {
        self.platform.set_reset(true);
        self.delay.delay_ms(1);
        self.platform.set_xclk(0);
    }

    /// Power up briefly and check the chip version.
    pub fn registered(&mut self) -> Result<(), Error<I2C>> {
        self.power_on();
        let version = read_word8(&mut self.bus, self.address, CHIP_VERSION);
        self.power_off();
        let version = version?;
        if version != CHIP_VERSION_VALUE {
            log::error!("MT9P006 not detected, wrong version 0x{:04x}", version);
            return Err(LibraryError::ChipNotDetected {
                expected: CHIP_VERSION_VALUE,
                found: version,
            }
            .into());
        }
        log::info!("MT9P006 detected at address 0x{:02x}", self.address);
        Ok(())
    }

    pub fn power_count(&self) -> u32 {
        self.power.count()
    }

    /// Take or drop a power reference. Powering up resets the sensor and restores the cached
    /// controls.
    pub fn set_power(&mut self, on: bool) -> Result<(), Error<I2C>> {
        if on {
            if self.power.is_off() {
                self.power_on();
                if let Err(err) = self.reset() {
                    log::error!("Failed to reset the camera");
                    return Err(err);
                }
                for (id, value) in self.controls.values() {
                    self.apply_control(id, value)?;
                }
            }
            self.power.acquire();
        } else if self.power.release()? {
            self.power_off();
        }
        Ok(())
    }

    fn reset(&mut self) -> Result<(), Error<I2C>> {
        self.write(RST, 1)?;
        self.write(RST, 0)?;
        self.set_chip_enable(false)
    }

    /// Update the output control shadow, writing it out first.
    fn set_chip_enable(&mut self, enable: bool) -> Result<(), Error<I2C>> {
        let mut value = self.output_control;
        value.set_chip_enable(enable);
        self.write(OutputControl::address() as u8, value.into())?;
        self.output_control = value;
        Ok(())
    }

    fn set_mode2(&mut self, update: impl FnOnce(&mut ReadMode2)) -> Result<(), Error<I2C>> {
        let mut value = self.mode2;
        update(&mut value);
        self.write(ReadMode2::address() as u8, value.into())?;
        self.mode2 = value;
        Ok(())
    }

    /// Write the shutter, per-channel gain and read mode defaults.
    pub fn load_init_settings(&mut self) -> Result<(), Error<I2C>> {
        write_table8(&mut self.bus, self.address, &INIT_SETTINGS)
    }

    /// Program the mode matching the active output width.
    fn set_params(&mut self) -> Result<(), Error<I2C>> {
        let mode = find_isize(&SIZES, self.format.width);
        log::debug!("MT9P006 mode {}x{}", SIZES[mode].width, SIZES[mode].height);
        write_table8(&mut self.bus, self.address, MODES[mode])?;
        write_table8(&mut self.bus, self.address, &SUBSAMPLE_OPTIMIZATION)
    }

    fn pll_enable(&mut self) -> Result<(), Error<I2C>> {
        let pll = self.pll;
        self.write(PLL_CONTROL, PLL_CONTROL_POWER_ON)?;
        self.write(PLL_CONFIG_1, (pll.m << 8) | (pll.n - 1))?;
        self.write(PLL_CONFIG_2, pll.p1 - 1)?;
        self.delay.delay_ms(1);
        self.write(PLL_CONTROL, PLL_CONTROL_POWER_ON | PLL_CONTROL_USE_PLL)
    }

    pub fn set_stream(&mut self, enable: bool) -> Result<(), Error<I2C>> {
        if !enable {
            self.set_chip_enable(false)?;
            return self.write(PLL_CONTROL, PLL_CONTROL_POWER_OFF);
        }
        self.set_params()?;
        self.set_chip_enable(true)?;
        self.pll_enable()
    }

    pub fn control(&self, id: ControlId) -> Option<i32> {
        self.controls.get(id)
    }

    /// Set a control, returning the value actually used.
    pub fn set_control(&mut self, id: ControlId, value: i32) -> Result<i32, Error<I2C>> {
        let mut value = self.controls.validate(id, value)?;
        if id == ControlId::Gain {
            value = encode_gain(value).0;
        }
        if !self.power.is_off() {
            self.apply_control(id, value)?;
        }
        self.controls.commit(id, value);
        Ok(value)
    }

    fn apply_control(&mut self, id: ControlId, value: i32) -> Result<(), Error<I2C>> {
        match id {
            ControlId::Exposure => {
                self.write(SHUTTER_WIDTH_UPPER, ((value >> 16) & 0xFFFF) as u16)?;
                self.write(SHUTTER_WIDTH_LOWER, (value & 0xFFFF) as u16)
            }
            ControlId::Gain => {
                let (_, data) = encode_gain(value);
                self.write(GLOBAL_GAIN, data)
            }
            ControlId::HorizontalFlip => self.set_mode2(|mode| mode.set_column_mirror(value != 0)),
            ControlId::VerticalFlip => self.set_mode2(|mode| mode.set_row_mirror(value != 0)),
            _ => Err(LibraryError::InvalidArgument("unsupported control").into()),
        }
    }

    pub fn enum_mbus_code(&self, index: u32) -> Result<MbusCode, LibraryError> {
        if index != 0 {
            return Err(LibraryError::InvalidArgument("mbus code index"));
        }
        Ok(self.format.code)
    }

    pub fn enum_frame_size(&self, index: u32, code: MbusCode) -> Result<FrameSizeRange, LibraryError> {
        if index as usize >= 8 || code != self.format.code {
            return Err(LibraryError::InvalidArgument("frame size index"));
        }
        Ok(FrameSizeRange {
            min: SIZES[0],
            max: SIZES[SIZES.len() - 1],
        })
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
        let format = match which {
            FormatWhich::Try => &mut self.try_format,
            FormatWhich::Active => &mut self.format,
        };
        format.width = size.width;
        format.height = size.height;
        format.code = MbusCode::Sgrbg12_1x12;
        *format
    }

    pub fn get_crop(&self) -> Rect {
        self.crop
    }
}

impl<I2C, D, P> Subdevice for Mt9p006<I2C, D, P>
where
    I2C: i2c::WriteRead + i2c::Write,
    D: DelayMs<u32>,
    P: SensorPlatform,
{
    type Error = Error<I2C>;

    fn registered(&mut self) -> Result<(), Self::Error> {
        Mt9p006::registered(self)
    }

    fn set_power(&mut self, on: bool) -> Result<(), Self::Error> {
        Mt9p006::set_power(self, on)
    }

    fn set_stream(&mut self, enable: bool) -> Result<(), Self::Error> {
        Mt9p006::set_stream(self, enable)
    }

    fn frame_size(&self) -> FrameSize {
        self.format.size()
    }

    fn set_frame_size(&mut self, width: u32, height: u32) -> Result<FrameSize, Self::Error> {
        Ok(self.set_format(FormatWhich::Active, width, height).size())
    }
}

impl<I2C, D, P> RegisterDebug for Mt9p006<I2C, D, P>
where
    I2C: i2c::WriteRead + i2c::Write,
    D: DelayMs<u32>,
    P: SensorPlatform,
{
    type Error = Error<I2C>;

    fn debug_read(&mut self, address: u16, _width: Width) -> Result<u32, Self::Error> {
        let register =
            u8::try_from(address).map_err(|_| LibraryError::InvalidArgument("register address"))?;
        read_word8(&mut self.bus, self.address, register).map(u32::from)
    }

    fn debug_write(&mut self, address: u16, _width: Width, value: u32) -> Result<(), Self::Error> {
        let register =
            u8::try_from(address).map_err(|_| LibraryError::InvalidArgument("register address"))?;
        self.write(register, value as u16)
    }
}
