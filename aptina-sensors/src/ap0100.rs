// SPDX-License-Identifier: Apache-2.0
// Copyright © 2026 The aptina-sensors developers
//! The AP0100 image co-processor, running a fixed 720p output.
//!
//! The AP0100 is driven entirely through its system manager: powering up asks it to change
//! config (start streaming), powering down asks it to suspend. There is nothing to configure, the
//! output is always 1280x720 UYVY.
use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::blocking::i2c;

use crate::bus::{read16, write16, Width, POLL_RETRY_COUNT};
use crate::debug::RegisterDebug;
use crate::error::{Error, LibraryError};
use crate::format::{Fract, FrameSize, PixFormat, PixelFormat};
use crate::power::{PowerState, SensorPlatform};
use crate::subdev::Subdevice;

pub const DEFAULT_ADDRESS: u8 = 0x5D;

const CHIP_VERSION: u16 = 0x0000;
const CHIP_VERSION_VALUE: u16 = 0x0062;
const COMMAND_REGISTER: u16 = 0x0040;
const CMD_PARAM_0: u16 = 0xFC00;

const CMD_SET_STATE: u16 = 0x8100;

/// System manager states.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u16)]
pub enum SystemState {
    ChangeConfig = 0x2800,
    Suspend = 0x4000,
    SoftStandby = 0x5000,
}

/// How many times a state change is re-issued before giving up on it.
const STATE_REISSUE_COUNT: usize = 5;

pub const SIZE: FrameSize = FrameSize::new(1280, 720);

/// The only frame interval, reported as 20/2.
pub const FRAME_INTERVAL: Fract = Fract::new(20, 2);

/// Driver for an AP0100.
#[derive(Debug)]
pub struct Ap0100<I2C, D, P> {
    bus: I2C,
    delay: D,
    platform: P,
    address: u8,
    detected: bool,
    ready: bool,
    pix: PixFormat,
}

impl<I2C, D, P> Ap0100<I2C, D, P>
where
    I2C: i2c::WriteRead + i2c::Write,
    D: DelayMs<u32>,
    P: SensorPlatform,
{
    pub fn new(bus: I2C, delay: D, platform: P) -> Self {
        Self::new_with_address(bus, delay, platform, DEFAULT_ADDRESS)
    }

    pub fn new_with_address(bus: I2C, delay: D, platform: P, address: u8) -> Self {
        Self {
            bus,
            delay,
            platform,
            address,
            detected: false,
            ready: false,
            pix: PixFormat::packed(SIZE, PixelFormat::Uyvy),
        }
    }

    pub fn release(self) -> (I2C, D, P) {
        (self.bus, self.delay, self.platform)
    }

    /// Whether the co-processor has been powered up and told to stream.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    fn read(&mut self, register: u16) -> Result<u16, Error<I2C>> {
        read16(&mut self.bus, self.address, register)
    }

    fn write(&mut self, register: u16, value: u16) -> Result<(), Error<I2C>> {
        write16(&mut self.bus, self.address, register, value)
    }

    fn issue_state(&mut self, state: SystemState) -> Result<(), Error<I2C>> {
        self.write(CMD_PARAM_0, state as u16)?;
        self.write(COMMAND_REGISTER, CMD_SET_STATE)
    }

    /// Ask the system manager for a new state and wait for it to take the command.
    ///
    /// Once the command register has stayed busy for a while the command is issued again.
    /// Returns `Ok(false)` if it still hasn't been taken after a few re-issues.
    pub fn set_state(&mut self, state: SystemState) -> Result<bool, Error<I2C>> {
        self.issue_state(state)?;
        let mut data = self.read(COMMAND_REGISTER)?;
        let mut count = 0;
        let mut reissued = 0;
        while data != 0 {
            data = self.read(COMMAND_REGISTER)?;
            if count > POLL_RETRY_COUNT {
                if reissued >= STATE_REISSUE_COUNT {
                    log::error!("Failed to set state {:?}: 0x{:04x}", state, data);
                    return Ok(false);
                }
                reissued += 1;
                self.issue_state(state)?;
                data = self.read(COMMAND_REGISTER)?;
                self.delay.delay_ms(1);
                if data == 0 {
                    break;
                }
                log::debug!("state {:?} not taken yet: 0x{:04x}", state, data);
            }
            count += 1;
            self.delay.delay_ms(10);
        }
        Ok(true)
    }

    fn detect(&mut self) -> Result<(), Error<I2C>> {
        let chip_id = self.read(CHIP_VERSION)?;
        if chip_id != CHIP_VERSION_VALUE {
            log::error!("Product ID error {:04x}", chip_id);
            return Err(LibraryError::ChipNotDetected {
                expected: CHIP_VERSION_VALUE,
                found: chip_id,
            }
            .into());
        }
        log::info!("Aptina ap0100 is detected (chipID = 0x{:04x})", chip_id);
        Ok(())
    }

    /// Move to a new power state.
    ///
    /// Powering on is skipped if the sensor is already streaming. The chip is only detected on
    /// the first power-up. Powering off always suspends the co-processor before the board cuts
    /// power, and standby is ignored.
    pub fn set_power(&mut self, state: PowerState) -> Result<(), Error<I2C>> {
        match state {
            PowerState::Standby => Ok(()),
            PowerState::Off => {
                self.ready = false;
                let suspended = self.set_state(SystemState::Suspend);
                self.platform.set_power(PowerState::Off);
                suspended.map(|_| ())
            }
            PowerState::On => {
                if self.ready {
                    return Ok(());
                }
                self.platform.set_power(PowerState::On);
                if !self.detected {
                    self.detect().map_err(|err| {
                        log::error!("Unable to detect sensor");
                        err
                    })?;
                    self.detected = true;
                }
                self.set_state(SystemState::ChangeConfig).map_err(|err| {
                    log::error!("Unable to initialize sensor");
                    err
                })?;
                log::info!("Aptina ap0100 is initialized");
                self.ready = true;
                Ok(())
            }
        }
    }

    pub fn enum_fmt(&self, index: u32) -> Result<(PixelFormat, &'static str), LibraryError> {
        match index {
            0 => Ok((PixelFormat::Uyvy, "standard UYVY 4:2:2")),
            _ => Err(LibraryError::InvalidArgument("format index")),
        }
    }

    /// Every request gets the one supported format.
    pub fn try_fmt(&self, _width: u32, _height: u32) -> PixFormat {
        PixFormat::packed(SIZE, PixelFormat::Uyvy)
    }

    pub fn set_fmt(&mut self, width: u32, height: u32) -> PixFormat {
        self.try_fmt(width, height)
    }

    pub fn get_fmt(&self) -> PixFormat {
        self.pix
    }

    pub fn time_per_frame(&self) -> Fract {
        FRAME_INTERVAL
    }

    /// Frame rate changes are accepted and ignored.
    pub fn set_frame_interval(&mut self, _interval: Fract) -> Fract {
        FRAME_INTERVAL
    }

    pub fn enum_frame_sizes(&self, index: u32) -> Result<FrameSize, LibraryError> {
        match index {
            0 => Ok(SIZE),
            _ => Err(LibraryError::InvalidArgument("frame size index")),
        }
    }

    pub fn enum_frame_intervals(&self, index: u32, width: u32) -> Result<Fract, LibraryError> {
        if index != 0 || width > SIZE.width {
            return Err(LibraryError::InvalidArgument("frame interval index"));
        }
        Ok(FRAME_INTERVAL)
    }
}

impl<I2C, D, P> Subdevice for Ap0100<I2C, D, P>
where
    I2C: i2c::WriteRead + i2c::Write,
    D: DelayMs<u32>,
    P: SensorPlatform,
{
    type Error = Error<I2C>;

    fn registered(&mut self) -> Result<(), Self::Error> {
        self.set_power(PowerState::On)?;
        self.set_power(PowerState::Off)
    }

    fn set_power(&mut self, on: bool) -> Result<(), Self::Error> {
        let state = if on { PowerState::On } else { PowerState::Off };
        Ap0100::set_power(self, state)
    }

    /// The co-processor streams whenever it's powered.
    fn set_stream(&mut self, _enable: bool) -> Result<(), Self::Error> {
        Ok(())
    }

    fn frame_size(&self) -> FrameSize {
        self.pix.size()
    }

    fn set_frame_size(&mut self, width: u32, height: u32) -> Result<FrameSize, Self::Error> {
        Ok(self.set_fmt(width, height).size())
    }
}

impl<I2C, D, P> RegisterDebug for Ap0100<I2C, D, P>
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

#[cfg(test)]
mod test {
    extern crate std;

    use std::vec;

    use crate::test::*;

    use super::*;

    type Sensor = Ap0100<MockSensorBus, MockDelay, MockPlatform>;

    fn sensor() -> (MockSensorBus, Sensor) {
        let bus = MockSensorBus::new_16bit(DEFAULT_ADDRESS);
        bus.set_register(CHIP_VERSION, 0x0062);
        bus.set_busy(COMMAND_REGISTER, 0);
        let sensor = Ap0100::new(bus.clone(), bus.delay(), bus.platform());
        (bus, sensor)
    }

    #[test]
    fn power_on_detects_and_changes_config() {
        let (bus, mut sensor) = sensor();
        sensor.set_power(PowerState::On).unwrap();
        assert!(sensor.is_ready());
        assert_eq!(
            bus.events(),
            vec![
                Event::Power(PowerState::On),
                Event::Read { address: 0x0000 },
                Event::Write {
                    address: 0xFC00,
                    value: 0x2800
                },
                Event::Write {
                    address: 0x0040,
                    value: 0x8100
                },
                Event::Read { address: 0x0040 },
            ]
        );

        // Already streaming, nothing to do.
        bus.clear_events();
        sensor.set_power(PowerState::On).unwrap();
        assert!(bus.events().is_empty());
    }

    #[test]
    fn detection_happens_once() {
        let (bus, mut sensor) = sensor();
        sensor.set_power(PowerState::On).unwrap();
        sensor.set_power(PowerState::Off).unwrap();
        bus.clear_events();
        sensor.set_power(PowerState::On).unwrap();
        assert!(!bus.reads().contains(&CHIP_VERSION));
    }

    #[test]
    fn wrong_chip() {
        let (bus, mut sensor) = sensor();
        bus.set_register(CHIP_VERSION, 0x0061);
        assert!(matches!(
            sensor.set_power(PowerState::On),
            Err(Error::LibraryError(LibraryError::ChipNotDetected {
                expected: 0x0062,
                found: 0x0061
            }))
        ));
        assert!(!sensor.is_ready());
        assert!(bus.writes().is_empty());
    }

    #[test]
    fn power_off_suspends() {
        let (bus, mut sensor) = sensor();
        sensor.set_power(PowerState::On).unwrap();
        bus.clear_events();
        sensor.set_power(PowerState::Off).unwrap();
        assert!(!sensor.is_ready());
        assert_eq!(bus.writes(), vec![(0xFC00, 0x4000), (0x0040, 0x8100)]);
        assert_eq!(bus.events().last(), Some(&Event::Power(PowerState::Off)));
    }

    #[test]
    fn power_off_after_failed_suspend() {
        let (bus, mut sensor) = sensor();
        sensor.set_power(PowerState::On).unwrap();
        bus.clear_events();
        bus.fail_writes(0, 1);
        assert!(sensor.set_power(PowerState::Off).is_err());
        assert_eq!(bus.events().last(), Some(&Event::Power(PowerState::Off)));
    }

    #[test]
    fn standby_is_ignored() {
        let (bus, mut sensor) = sensor();
        sensor.set_power(PowerState::Standby).unwrap();
        assert!(bus.events().is_empty());
    }

    #[test]
    fn slow_state_change() {
        let (bus, mut sensor) = sensor();
        bus.set_busy(COMMAND_REGISTER, 3);
        assert!(sensor.set_state(SystemState::ChangeConfig).unwrap());
        assert_eq!(bus.reads().len(), 4);
        assert_eq!(bus.delays(), vec![10, 10, 10]);
        assert_eq!(bus.writes().len(), 2);
    }

    #[test]
    fn stuck_state_change_is_reissued() {
        let bus = MockSensorBus::new_16bit(DEFAULT_ADDRESS);
        let mut sensor = Ap0100::new(bus.clone(), bus.delay(), bus.platform());
        assert!(!sensor.set_state(SystemState::Suspend).unwrap());
        // The first command, then one per re-issue.
        assert_eq!(bus.writes().len(), 2 * (STATE_REISSUE_COUNT + 1));
        assert_eq!(bus.writes()[2], (0xFC00, 0x4000));
    }

    #[test]
    fn fixed_format() {
        let (_bus, mut sensor) = sensor();
        let fmt = sensor.set_fmt(640, 480);
        assert_eq!(fmt.size(), FrameSize::new(1280, 720));
        assert_eq!(fmt.pixel_format, PixelFormat::Uyvy);
        assert_eq!(fmt.bytes_per_line, 2560);
        assert_eq!(sensor.get_fmt(), fmt);
        assert_eq!(sensor.set_frame_interval(Fract::new(1, 30)), Fract::new(20, 2));
        assert_eq!(sensor.time_per_frame(), Fract::new(20, 2));
    }

    #[test]
    fn enumeration() {
        let (_bus, sensor) = sensor();
        assert_eq!(sensor.enum_fmt(0).unwrap().0, PixelFormat::Uyvy);
        assert!(sensor.enum_fmt(1).is_err());
        assert_eq!(sensor.enum_frame_sizes(0).unwrap(), SIZE);
        assert!(sensor.enum_frame_sizes(1).is_err());
        assert_eq!(sensor.enum_frame_intervals(0, 640).unwrap(), Fract::new(20, 2));
        assert!(sensor.enum_frame_intervals(1, 640).is_err());
        assert!(sensor.enum_frame_intervals(0, 1920).is_err());
    }

    #[test]
    fn registered_powers_down() {
        let (bus, mut sensor) = sensor();
        Subdevice::registered(&mut sensor).unwrap();
        assert!(!sensor.is_ready());
        assert_eq!(bus.events().last(), Some(&Event::Power(PowerState::Off)));
    }
}
