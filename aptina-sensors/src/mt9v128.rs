// SPDX-License-Identifier: Apache-2.0
// Copyright © 2026 The aptina-sensors developers
//! The MT9V128 VGA system-on-chip sensor.
//!
//! The MT9V128 has its own microcontroller. Most of the setup is done by handing it commands
//! through the command register and waiting for it to clear the register again. The dewarp
//! configuration, colour correction and firmware patches are large vendor tables that this crate
//! doesn't carry; boards hand them over as a [`Firmware`].
use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::blocking::i2c;

use crate::bus::{poll_command, read16, write16, write_table16, Width};
use crate::debug::RegisterDebug;
use crate::error::{Error, LibraryError};
use crate::format::{calc_size, FrameSize, MbusCode, MbusFramefmt, Rect};
use crate::power::{PlatformData, PowerCount, SensorPlatform};
use crate::subdev::{FormatWhich, Subdevice};
use crate::util::with_bits;

pub const DEFAULT_ADDRESS: u8 = 0x48;

const CHIP_VERSION: u16 = 0x0000;
const CHIP_VERSION_VALUE: u16 = 0x2281;
const RESET_AND_MISC_CONTROL: u16 = 0x001A;
const SOFT_RESET: u16 = 0x0001;
const CLOCKS_CONTROL: u16 = 0x0016;
const PAD_SLEW: u16 = 0x0030;
const COMMAND_REGISTER: u16 = 0x0040;
const ACCESS_CTL_STAT: u16 = 0x0982;
const PHYSICAL_ADDRESS_ACCESS: u16 = 0x098A;
const LOGICAL_ADDRESS: u16 = 0x098E;
const LOGICAL_DATA: u16 = 0x0990;
const RESET_REGISTER: u16 = 0x301A;
const YUV_YCBCR_CONTROL: u16 = 0x337C;
const Y_RGB_OFFSET: u16 = 0x337E;
const CMD_HANDLER_PARAMS_POOL_0: u16 = 0xFC00;
const CMD_HANDLER_PARAMS_POOL_1: u16 = 0xFC02;
const CMD_HANDLER_PARAMS_POOL_2: u16 = 0xFC04;

/// Logical address of the command handler's variables.
const CMD_HANDLER_VARS: u16 = 0x7C00;
const PATCH_LOADER_VARS: u16 = 0x7C57;

const CMD_SET_PARALLEL: u16 = 0x8801;
const CMD_SYSMGR_SET_STATE: u16 = 0x8800;
const CMD_DEWARP_WRITE: u16 = 0x8304;
const CMD_DEWARP_APPLY: u16 = 0x8305;
const CMD_DEWARP_STATUS: u16 = 0x8301;
const CMD_NTSC_ENABLE: u16 = 0x8300;
const CMD_PATCH_APPLY: u16 = 0x8702;
const CMD_PATCH_STATUS: u16 = 0x8701;
const CMD_PATCH_RESERVE: u16 = 0x8703;

/// Start addresses of the four colour correction and white balance blocks.
const CCM_AWB_ADDRESSES: [u16; 4] = [0xC8CE, 0xC910, 0xC962, 0xAC40];

/// Address of a firmware variable.
const fn var(id: u16, offset: u16) -> u16 {
    0x8000 | (id & 0x1F) << 10 | (offset & 0x3FF)
}

/// Analog sensor setup, done while the sensor core is held in reset.
const SENSOR_SETUP: [(u16, u16); 11] = [
    // VLN boosted, anti-eclipse lowered
    (0x3ED8, 0x0999),
    (0x3E14, 0x6886),
    (0x3E1A, 0x8507),
    (0x3E1C, 0x8705),
    (0x3E24, 0x9A10),
    (0x3E26, 0x8F09),
    (0x3E2A, 0x8060),
    (0x3E2C, 0x6169),
    (0x3ED0, 0x8F7F),
    (0x3EDA, 0x68F6),
    (0xC8A0, 0x05BD),
];

/// Auto-exposure, low light and gamma tuning.
const TUNING: [(u16, u16); 47] = [
    // AE_TRACK_MODE
    (var(10, 0x0002), 0x00D7),
    // CAM1_AET_AE_VIRT_GAIN_TH_CG and _DCG
    (var(18, 0x00AC), 0x0100),
    (var(18, 0x00AE), 0x00A0),
    // AE_TRACK_TARGET, AE_TRACK_GATE, AE_TRACK_JUMP_DIVISOR
    (var(10, 0x0012), 0x0032),
    (var(10, 0x0014), 0x0004),
    (var(10, 0x001A), 0x0002),
    // CAM1_AET_SKIP_FRAMES
    (var(18, 0x009A), 0x0001),
    (YUV_YCBCR_CONTROL, 0x0007),
    // Low light brightness, saturation and gamma
    (var(18, 0x0130), 0x0190),
    (var(18, 0x0132), 0x0640),
    (var(18, 0x0134), 0x0080),
    (var(18, 0x0136), 0x0000),
    (var(18, 0x0158), 0x0190),
    (var(18, 0x015A), 0x0640),
    // CAM1_SENSOR_0_FINE_CORRECTION
    (var(18, 0x0016), 0x0031),
    (var(18, 0x013E), 0x0007),
    (var(18, 0x0140), 0x0002),
    (var(18, 0x0142), 0x0008),
    (var(18, 0x0144), 0x0002),
    (var(18, 0x0146), 0x0020),
    (var(18, 0x0150), 0x0040),
    (var(18, 0x0152), 0x0040),
    (var(18, 0x0154), 0x0040),
    (var(18, 0x0156), 0x0040),
    // Maximum virtual analog and digital gain, maximum analog gain
    (var(18, 0x00A8), 0x1FFF),
    (var(18, 0x00A4), 0x0100),
    (var(18, 0x007C), 0x0100),
    // SYS_REFRESH_MASK
    (var(23, 0x0028), 0x0003),
    // LL_GAMMA_NRCURVE_0 to 18
    (var(15, 0x0032), 0x0000),
    (var(15, 0x0034), 0x0018),
    (var(15, 0x0036), 0x0025),
    (var(15, 0x0038), 0x003A),
    (var(15, 0x003A), 0x0059),
    (var(15, 0x003C), 0x0070),
    (var(15, 0x003E), 0x0081),
    (var(15, 0x0040), 0x0090),
    (var(15, 0x0042), 0x009E),
    (var(15, 0x0044), 0x00AB),
    (var(15, 0x0046), 0x00B6),
    (var(15, 0x0048), 0x00C1),
    (var(15, 0x004A), 0x00CB),
    (var(15, 0x004C), 0x00D5),
    (var(15, 0x004E), 0x00DE),
    (var(15, 0x0050), 0x00E7),
    (var(15, 0x0052), 0x00EF),
    (var(15, 0x0054), 0x00F7),
    (var(15, 0x0056), 0x00FF),
];

/// Output pads and YCbCr setup once the patches are in.
const OUTPUT_SETUP: [(u16, u16); 9] = [
    (CLOCKS_CONTROL, 0x585F),
    (PAD_SLEW, 0x0200),
    (PAD_SLEW, 0x0207),
    (YUV_YCBCR_CONTROL, 0x000F),
    (Y_RGB_OFFSET, 0x1000),
    // CAM1_AET_EXT_GAIN_SETUP_0
    (0xC8BE, 0x0002),
    (CMD_HANDLER_PARAMS_POOL_0, 0x0000),
    (CMD_HANDLER_PARAMS_POOL_1, 0x0000),
    (CMD_HANDLER_PARAMS_POOL_2, 0x0103),
];

/// Supported output sizes, smallest first.
pub const SIZES: [FrameSize; 8] = [
    FrameSize::new(80, 60),
    FrameSize::new(160, 120),
    FrameSize::new(176, 144),
    FrameSize::new(320, 240),
    FrameSize::new(352, 288),
    FrameSize::new(400, 300),
    FrameSize::new(640, 480),
    FrameSize::new(722, 486),
];

const DEFAULT_WINDOW: Rect = Rect::new(0, 0, 640, 480);

/// A firmware patch, loaded into RAM through physical address access then applied by the
/// patch loader.
#[derive(Clone, Copy, Debug, Default)]
pub struct Patch<'a> {
    /// RAM address the patch is loaded at.
    pub base: u16,
    /// Patch contents, written eight words per 16-byte line.
    pub data: &'a [u16],
    /// Loader arguments: patch entry point, patch ID, firmware ID (two words) and size.
    pub loader: [u16; 5],
}

/// Vendor tables needed to bring the sensor up.
#[derive(Clone, Copy, Debug, Default)]
pub struct Firmware<'a> {
    /// Dewarp configuration, sent eight words per command.
    pub dewarp: &'a [u16],
    /// Colour correction and white balance blocks, written at 0xC8CE, 0xC910, 0xC962 and 0xAC40.
    pub ccm_awb: [&'a [u16]; 4],
    /// Patches, in load order.
    pub patches: &'a [Patch<'a>],
}

/// Driver for an MT9V128.
#[derive(Debug)]
pub struct Mt9v128<'a, I2C, D, P> {
    bus: I2C,
    delay: D,
    platform: P,
    address: u8,
    platform_data: PlatformData,
    firmware: Firmware<'a>,

    rect: Rect,
    format: MbusFramefmt,
    try_format: MbusFramefmt,

    power: PowerCount,
}

impl<'a, I2C, D, P> Mt9v128<'a, I2C, D, P>
where
    I2C: i2c::WriteRead + i2c::Write,
    D: DelayMs<u32>,
    P: SensorPlatform,
{
    pub fn new(
        bus: I2C,
        delay: D,
        platform: P,
        platform_data: PlatformData,
        firmware: Firmware<'a>,
    ) -> Self {
        Self::new_with_address(bus, delay, platform, platform_data, firmware, DEFAULT_ADDRESS)
    }

    pub fn new_with_address(
        bus: I2C,
        delay: D,
        platform: P,
        platform_data: PlatformData,
        firmware: Firmware<'a>,
        address: u8,
    ) -> Self {
        let format = MbusFramefmt::new(DEFAULT_WINDOW.size(), Self::code(&platform_data));
        Self {
            bus,
            delay,
            platform,
            address,
            platform_data,
            firmware,
            rect: DEFAULT_WINDOW,
            format,
            try_format: format,
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

    fn read(&mut self, register: u16) -> Result<u16, Error<I2C>> {
        read16(&mut self.bus, self.address, register)
    }

    fn write(&mut self, register: u16, value: u16) -> Result<(), Error<I2C>> {
        write16(&mut self.bus, self.address, register, value)
    }

    /// Toggle the soft reset bit, giving the sensor 20ms after each edge.
    fn reset(&mut self) -> Result<(), Error<I2C>> {
        let data = with_bits(self.read(RESET_AND_MISC_CONTROL)?, SOFT_RESET, true);
        self.write(RESET_AND_MISC_CONTROL, data)?;
        self.delay.delay_ms(20);
        self.write(RESET_AND_MISC_CONTROL, with_bits(data, SOFT_RESET, false))?;
        self.delay.delay_ms(20);
        Ok(())
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

    pub fn set_power(&mut self, on: bool) -> Result<(), Error<I2C>> {
        if on {
            if self.power.is_off() {
                self.power_on()?;
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
            log::error!("No MT9V128 chip detected, register read {:x}", version);
            return Err(LibraryError::ChipNotDetected {
                expected: CHIP_VERSION_VALUE,
                found: version,
            }
            .into());
        }
        log::info!("Detected MT9V128, chip ID = {:x}", version);
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

    /// Drop the power reference taken by [`open`][Mt9v128::open].
    pub fn close(&mut self) -> Result<(), Error<I2C>> {
        self.set_power(false)
    }

    /// Issue a command and wait for the microcontroller to pick it up.
    ///
    /// A command that doesn't clear in time is logged and otherwise ignored.
    fn command(&mut self, command: u16) -> Result<(), Error<I2C>> {
        self.write(COMMAND_REGISTER, command)?;
        if !poll_command(&mut self.bus, &mut self.delay, self.address, COMMAND_REGISTER)? {
            log::error!("Failed to write command 0x{:04x}", command);
        }
        Ok(())
    }

    /// Write up to eight words to the logical data registers.
    fn write_data(&mut self, words: &[u16]) -> Result<(), Error<I2C>> {
        for (offset, word) in (0..).step_by(2).zip(words) {
            self.write(LOGICAL_DATA + offset, *word)?;
        }
        Ok(())
    }

    fn load_dewarp(&mut self) -> Result<(), Error<I2C>> {
        self.write(LOGICAL_ADDRESS, CMD_HANDLER_VARS)?;
        let dewarp = self.firmware.dewarp;
        for chunk in dewarp.chunks(8) {
            self.write_data(chunk)?;
            self.command(CMD_DEWARP_WRITE)?;
        }
        Ok(())
    }

    fn load_patch(&mut self, patch: &Patch) -> Result<(), Error<I2C>> {
        self.write(ACCESS_CTL_STAT, 0x0001)?;
        for (line, chunk) in (0u16..).zip(patch.data.chunks(8)) {
            self.write(PHYSICAL_ADDRESS_ACCESS, patch.base.wrapping_add(line * 0x10))?;
            self.write_data(chunk)?;
        }
        self.write(LOGICAL_ADDRESS, PATCH_LOADER_VARS)?;
        self.write(LOGICAL_ADDRESS, CMD_HANDLER_VARS)?;
        self.write_data(&patch.loader)?;
        self.command(CMD_PATCH_APPLY)?;
        self.command(CMD_PATCH_STATUS)?;
        self.command(CMD_PATCH_RESERVE)?;
        let applied = self.read(LOGICAL_DATA)?;
        log::debug!("number of patches applied = {}", applied >> 8);
        Ok(())
    }

    /// Bring up the output: parallel mode, dewarp, NTSC, colour correction, sensor setup, tuning
    /// and patches, then start the system manager.
    fn setup_output(&mut self) -> Result<(), Error<I2C>> {
        // CPIPE 8-bit parallel with FV/LV
        self.write(LOGICAL_ADDRESS, CMD_HANDLER_VARS)?;
        self.write(CMD_HANDLER_PARAMS_POOL_0, 0x3000)?;
        self.command(CMD_SET_PARALLEL)?;

        self.load_dewarp()?;
        self.command(CMD_DEWARP_APPLY)?;
        self.command(CMD_DEWARP_STATUS)?;

        self.write(CMD_HANDLER_PARAMS_POOL_0, 0x0100)?;
        self.write(CMD_HANDLER_PARAMS_POOL_1, 0x0000)?;
        self.command(CMD_NTSC_ENABLE)?;
        self.delay.delay_ms(100);
        self.command(CMD_DEWARP_STATUS)?;

        let ccm_awb = self.firmware.ccm_awb;
        for (base, block) in CCM_AWB_ADDRESSES.iter().zip(ccm_awb.iter()) {
            for (offset, word) in (0..).step_by(2).zip(block.iter()) {
                self.write(base + offset, *word)?;
            }
        }

        self.write(RESET_REGISTER, 0x10D0)?;
        self.delay.delay_ms(100);
        write_table16(&mut self.bus, self.address, &SENSOR_SETUP)?;
        self.delay.delay_ms(100);
        self.write(RESET_REGISTER, 0x10D4)?;
        self.delay.delay_ms(10);

        write_table16(&mut self.bus, self.address, &TUNING)?;

        let patches = self.firmware.patches;
        for patch in patches {
            self.load_patch(patch)?;
        }

        write_table16(&mut self.bus, self.address, &OUTPUT_SETUP)?;
        self.command(CMD_SYSMGR_SET_STATE)?;
        self.delay.delay_ms(10);
        Ok(())
    }

    /// Start streaming. Stopping is a no-op, the sensor streams for as long as it's powered.
    pub fn set_stream(&mut self, enable: bool) -> Result<(), Error<I2C>> {
        if !enable {
            return Ok(());
        }
        log::debug!("MT9V128 output {}x{}", self.rect.width, self.rect.height);
        self.setup_output()
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
}

impl<'a, I2C, D, P> Subdevice for Mt9v128<'a, I2C, D, P>
where
    I2C: i2c::WriteRead + i2c::Write,
    D: DelayMs<u32>,
    P: SensorPlatform,
{
    type Error = Error<I2C>;

    fn registered(&mut self) -> Result<(), Self::Error> {
        Mt9v128::registered(self)
    }

    fn set_power(&mut self, on: bool) -> Result<(), Self::Error> {
        Mt9v128::set_power(self, on)
    }

    fn set_stream(&mut self, enable: bool) -> Result<(), Self::Error> {
        Mt9v128::set_stream(self, enable)
    }

    fn frame_size(&self) -> FrameSize {
        self.format.size()
    }

    fn set_frame_size(&mut self, width: u32, height: u32) -> Result<FrameSize, Self::Error> {
        Ok(self.set_format(FormatWhich::Active, width, height).size())
    }
}

impl<'a, I2C, D, P> RegisterDebug for Mt9v128<'a, I2C, D, P>
where
    I2C: i2c::WriteRead + i2c::Write,
    D: DelayMs<u32>,
    P: SensorPlatform,
{
    type Error = Error<I2C>;

    fn debug_read(&mut self, address: u16, _width: Width) -> Result<u32, Self::Error> {
        self.read(address).map(u32::from)
    }

    fn debug_write(&mut self, address: u16, _width: Width, value: u32) -> Result<(), Self::Error> {
        self.write(address, value as u16)
    }
}
