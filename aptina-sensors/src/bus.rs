// SPDX-License-Identifier: Apache-2.0
// Copyright © 2026 The aptina-sensors developers
//! Register access over I²C.
//!
//! Three register layouts are used by the sensors in this crate:
//!
//! * 16-bit register addresses with 16-bit values (MT9M0xx, MT9V128, AP0100).
//! * 8-bit register addresses with 16-bit values (MT9P006, MT9D131). The Linux drivers use SMBus
//!   word transfers for these and byte-swap the little-endian SMBus word, so on the wire both the
//!   address and value are big-endian just like the 16-bit layout.
//! * 16-bit register addresses with 8, 16 or 32-bit values (MT9P015).
//!
//! All values go out most significant byte first.
use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::blocking::i2c;

use crate::error::Error;
use crate::register::Register;

/// How many times a write is retried before giving up, for the sensors that retry at all.
pub const WRITE_RETRY_COUNT: usize = 5;

/// Delay between write retries, in milliseconds.
const WRITE_RETRY_DELAY: u32 = 20;

/// How many extra reads a command register gets to clear itself.
pub const POLL_RETRY_COUNT: usize = 5;

/// The width of a register value.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Width {
    Byte,
    Word,
    Long,
}

impl Width {
    /// Number of bytes on the wire.
    pub fn len(self) -> usize {
        match self {
            Width::Byte => 1,
            Width::Word => 2,
            Width::Long => 4,
        }
    }
}

/// A single step in a register list.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RegisterWrite {
    /// Write an 8-bit value.
    Byte(u16, u8),
    /// Write a 16-bit value.
    Word(u16, u16),
    /// Write a 32-bit value.
    Long(u16, u32),
    /// Wait for the given number of milliseconds.
    Delay(u32),
}

/// Read a 16-bit value from a 16-bit register address.
pub fn read16<I2C>(bus: &mut I2C, i2c_address: u8, register: u16) -> Result<u16, Error<I2C>>
where
    I2C: i2c::WriteRead + i2c::Write,
{
    let mut buf = [0u8; 2];
    bus.write_read(i2c_address, &register.to_be_bytes(), &mut buf)
        .map_err(Error::I2cWriteReadError)?;
    Ok(u16::from_be_bytes(buf))
}

/// Write a 16-bit value to a 16-bit register address.
pub fn write16<I2C>(
    bus: &mut I2C,
    i2c_address: u8,
    register: u16,
    value: u16,
) -> Result<(), Error<I2C>>
where
    I2C: i2c::WriteRead + i2c::Write,
{
    let [addr_hi, addr_lo] = register.to_be_bytes();
    let [val_hi, val_lo] = value.to_be_bytes();
    bus.write(i2c_address, &[addr_hi, addr_lo, val_hi, val_lo])
        .map_err(Error::I2cWriteError)
}

/// Read a 16-bit value from an 8-bit register address.
pub fn read_word8<I2C>(bus: &mut I2C, i2c_address: u8, register: u8) -> Result<u16, Error<I2C>>
where
    I2C: i2c::WriteRead + i2c::Write,
{
    let mut buf = [0u8; 2];
    bus.write_read(i2c_address, &[register], &mut buf)
        .map_err(Error::I2cWriteReadError)?;
    Ok(u16::from_be_bytes(buf))
}

/// Write a 16-bit value to an 8-bit register address.
pub fn write_word8<I2C>(
    bus: &mut I2C,
    i2c_address: u8,
    register: u8,
    value: u16,
) -> Result<(), Error<I2C>>
where
    I2C: i2c::WriteRead + i2c::Write,
{
    let [val_hi, val_lo] = value.to_be_bytes();
    bus.write(i2c_address, &[register, val_hi, val_lo])
        .map_err(Error::I2cWriteError)
}

/// Read a value of the given width from a 16-bit register address.
pub fn read_sized<I2C>(
    bus: &mut I2C,
    i2c_address: u8,
    register: u16,
    width: Width,
) -> Result<u32, Error<I2C>>
where
    I2C: i2c::WriteRead + i2c::Write,
{
    let mut buf = [0u8; 4];
    let len = width.len();
    bus.write_read(i2c_address, &register.to_be_bytes(), &mut buf[..len])
        .map_err(Error::I2cWriteReadError)?;
    Ok(buf[..len]
        .iter()
        .fold(0u32, |value, byte| (value << 8) | *byte as u32))
}

/// Write a value of the given width to a 16-bit register address.
///
/// Values wider than `width` are truncated to their low bytes.
pub fn write_sized<I2C>(
    bus: &mut I2C,
    i2c_address: u8,
    register: u16,
    width: Width,
    value: u32,
) -> Result<(), Error<I2C>>
where
    I2C: i2c::WriteRead + i2c::Write,
{
    let mut buf = [0u8; 6];
    buf[..2].copy_from_slice(&register.to_be_bytes());
    let len = width.len();
    buf[2..2 + len].copy_from_slice(&value.to_be_bytes()[4 - len..]);
    bus.write(i2c_address, &buf[..2 + len])
        .map_err(Error::I2cWriteError)
}

/// Write a sized value, retrying failed transfers.
///
/// A failed write is retried up to [`WRITE_RETRY_COUNT`] more times, with a 20ms pause before
/// each retry. The error from the final attempt is returned.
pub fn write_sized_retry<I2C, D>(
    bus: &mut I2C,
    delay: &mut D,
    i2c_address: u8,
    register: u16,
    width: Width,
    value: u32,
) -> Result<(), Error<I2C>>
where
    I2C: i2c::WriteRead + i2c::Write,
    D: DelayMs<u32>,
{
    let mut retry = 0;
    loop {
        match write_sized(bus, i2c_address, register, width, value) {
            Ok(()) => return Ok(()),
            Err(err) => {
                log::debug!(
                    "wrote 0x{:x} to offset 0x{:04x} failed (attempt {})",
                    value,
                    register,
                    retry + 1
                );
                if retry >= WRITE_RETRY_COUNT {
                    return Err(err);
                }
                retry += 1;
                delay.delay_ms(WRITE_RETRY_DELAY);
            }
        }
    }
}

/// Write a register list, stopping at the first failure.
///
/// Every write goes through [`write_sized_retry`].
pub fn write_list<I2C, D>(
    bus: &mut I2C,
    delay: &mut D,
    i2c_address: u8,
    list: &[RegisterWrite],
) -> Result<(), Error<I2C>>
where
    I2C: i2c::WriteRead + i2c::Write,
    D: DelayMs<u32>,
{
    for step in list {
        match *step {
            RegisterWrite::Byte(register, value) => {
                write_sized_retry(bus, delay, i2c_address, register, Width::Byte, value as u32)?
            }
            RegisterWrite::Word(register, value) => {
                write_sized_retry(bus, delay, i2c_address, register, Width::Word, value as u32)?
            }
            RegisterWrite::Long(register, value) => {
                write_sized_retry(bus, delay, i2c_address, register, Width::Long, value)?
            }
            RegisterWrite::Delay(ms) => delay.delay_ms(ms),
        }
    }
    Ok(())
}

/// Run a register list without retries, stopping at the first failure.
pub fn write_script<I2C, D>(
    bus: &mut I2C,
    delay: &mut D,
    i2c_address: u8,
    script: &[RegisterWrite],
) -> Result<(), Error<I2C>>
where
    I2C: i2c::WriteRead + i2c::Write,
    D: DelayMs<u32>,
{
    for step in script {
        match *step {
            RegisterWrite::Byte(register, value) => {
                write_sized(bus, i2c_address, register, Width::Byte, value as u32)?
            }
            RegisterWrite::Word(register, value) => write16(bus, i2c_address, register, value)?,
            RegisterWrite::Long(register, value) => {
                write_sized(bus, i2c_address, register, Width::Long, value)?
            }
            RegisterWrite::Delay(ms) => delay.delay_ms(ms),
        }
    }
    Ok(())
}

/// Write `(register, value)` pairs to 16-bit registers in order.
pub fn write_table16<I2C>(
    bus: &mut I2C,
    i2c_address: u8,
    table: &[(u16, u16)],
) -> Result<(), Error<I2C>>
where
    I2C: i2c::WriteRead + i2c::Write,
{
    table
        .iter()
        .try_for_each(|(register, value)| write16(bus, i2c_address, *register, *value))
}

/// Write `(register, value)` pairs to 8-bit registers in order.
pub fn write_table8<I2C>(
    bus: &mut I2C,
    i2c_address: u8,
    table: &[(u8, u16)],
) -> Result<(), Error<I2C>>
where
    I2C: i2c::WriteRead + i2c::Write,
{
    table
        .iter()
        .try_for_each(|(register, value)| write_word8(bus, i2c_address, *register, *value))
}

/// Wait for a firmware command register to clear.
///
/// Returns `Ok(false)` (after logging) if the register is still set after [`POLL_RETRY_COUNT`] +
/// 1 extra reads. Callers carry on regardless, the sensors usually catch up.
pub fn poll_command<I2C, D>(
    bus: &mut I2C,
    delay: &mut D,
    i2c_address: u8,
    register: u16,
) -> Result<bool, Error<I2C>>
where
    I2C: i2c::WriteRead + i2c::Write,
    D: DelayMs<u32>,
{
    let mut data = read16(bus, i2c_address, register)?;
    let mut retries = 0;
    while data != 0 {
        if retries > POLL_RETRY_COUNT {
            log::error!(
                "command register 0x{:04x} still busy (0x{:04x})",
                register,
                data
            );
            return Ok(false);
        }
        retries += 1;
        delay.delay_ms(1);
        data = read16(bus, i2c_address, register)?;
    }
    Ok(true)
}

/// Read a typed 16-bit register.
pub fn read_register<R, I2C>(bus: &mut I2C, i2c_address: u8) -> Result<R, Error<I2C>>
where
    R: Register,
    I2C: i2c::WriteRead + i2c::Write,
{
    read16(bus, i2c_address, R::address()).map(R::from)
}

/// Write a typed 16-bit register, preserving the bits outside its write mask.
///
/// Registers that own every bit are written directly. Otherwise the current value is read first.
pub fn write_register<R, I2C>(bus: &mut I2C, i2c_address: u8, register: R) -> Result<(), Error<I2C>>
where
    R: Register,
    I2C: i2c::WriteRead + i2c::Write,
{
    let mask = R::write_mask();
    let new_value: u16 = register.into();
    let value = if mask == 0xFFFF {
        new_value
    } else {
        let current = read16(bus, i2c_address, R::address())?;
        (current & !mask) | (new_value & mask)
    };
    write16(bus, i2c_address, R::address(), value)
}

#[cfg(test)]
mod test {
    extern crate std;

    use std::vec;
    use std::vec::Vec;

    use crate::register::{DigitalTest, ResetRegister};
    use crate::test::*;

    use super::*;

    #[test]
    fn word16_is_big_endian() {
        let mut bus = MockSensorBus::new_16bit(0x10);
        bus.set_register(0x3000, 0x2400);
        assert_eq!(read16(&mut bus, 0x10, 0x3000).unwrap(), 0x2400);
        write16(&mut bus, 0x10, 0x301A, 0x00D8).unwrap();
        assert_eq!(bus.raw_writes(), vec![vec![0x30, 0x1A, 0x00, 0xD8]]);
    }

    #[test]
    fn word8_is_big_endian() {
        let mut bus = MockSensorBus::new_8bit(0x5D);
        bus.set_register(0x00, 0x1801);
        assert_eq!(read_word8(&mut bus, 0x5D, 0x00).unwrap(), 0x1801);
        write_word8(&mut bus, 0x5D, 0x07, 0x1F82).unwrap();
        assert_eq!(bus.raw_writes(), vec![vec![0x07, 0x1F, 0x82]]);
    }

    #[test]
    fn sized_writes() {
        let mut bus = MockSensorBus::new_16bit(0x10);
        write_sized(&mut bus, 0x10, 0x0100, Width::Byte, 0x01).unwrap();
        write_sized(&mut bus, 0x10, 0x0112, Width::Word, 0x0C0C).unwrap();
        write_sized(&mut bus, 0x10, 0x3000, Width::Long, 0xDEADBEEF).unwrap();
        assert_eq!(
            bus.raw_writes(),
            vec![
                vec![0x01, 0x00, 0x01],
                vec![0x01, 0x12, 0x0C, 0x0C],
                vec![0x30, 0x00, 0xDE, 0xAD, 0xBE, 0xEF],
            ]
        );
        assert_eq!(
            read_sized(&mut bus, 0x10, 0x3000, Width::Long).unwrap(),
            0xDEADBEEF
        );
        assert_eq!(read_sized(&mut bus, 0x10, 0x0100, Width::Byte).unwrap(), 0x01);
    }

    #[test]
    fn unknown_i2c_address() {
        let mut bus = MockSensorBus::new_16bit(0x10);
        let err = read16(&mut bus, 0x11, 0x3000).unwrap_err();
        assert!(matches!(
            err,
            Error::I2cWriteReadError(MockError::UnknownI2cAddress(0x11))
        ));
        let err = write16(&mut bus, 0x11, 0x3000, 0).unwrap_err();
        assert!(matches!(
            err,
            Error::I2cWriteError(MockError::UnknownI2cAddress(0x11))
        ));
    }

    #[test]
    fn retry_recovers() {
        let mut bus = MockSensorBus::new_16bit(0x10);
        let mut delay = bus.delay();
        bus.fail_writes(0, 2);
        write_sized_retry(&mut bus, &mut delay, 0x10, 0x0100, Width::Byte, 1).unwrap();
        assert_eq!(bus.register(0x0100), Some(1));
        assert_eq!(bus.delays(), vec![20, 20]);
    }

    #[test]
    fn retry_gives_up() {
        let mut bus = MockSensorBus::new_16bit(0x10);
        let mut delay = bus.delay();
        bus.fail_writes(0, 100);
        let err = write_sized_retry(&mut bus, &mut delay, 0x10, 0x0100, Width::Byte, 1);
        assert!(err.is_err());
        // One attempt plus five retries, with a pause before each retry.
        assert_eq!(bus.failed_write_count(), WRITE_RETRY_COUNT + 1);
        assert_eq!(bus.delays(), vec![20; WRITE_RETRY_COUNT]);
    }

    #[test]
    fn write_list_stops_at_failure() {
        let mut bus = MockSensorBus::new_16bit(0x10);
        let mut delay = bus.delay();
        // The second write fails on every attempt.
        bus.fail_writes(1, 100);
        let list = [
            RegisterWrite::Byte(0x0103, 0x01),
            RegisterWrite::Word(0x301A, 0x10C8),
            RegisterWrite::Delay(5),
            RegisterWrite::Word(0x3064, 0x0805),
        ];
        assert!(write_list(&mut bus, &mut delay, 0x10, &list).is_err());
        assert_eq!(bus.writes(), vec![(0x0103, 0x01)]);
        assert!(!bus.delays().contains(&5));
    }

    #[test]
    fn write_list_delays() {
        let mut bus = MockSensorBus::new_16bit(0x10);
        let mut delay = bus.delay();
        let list = [
            RegisterWrite::Byte(0x0103, 0x01),
            RegisterWrite::Delay(5),
            RegisterWrite::Long(0x3000, 0x0102_0304),
        ];
        write_list(&mut bus, &mut delay, 0x10, &list).unwrap();
        assert_eq!(
            bus.events(),
            vec![
                Event::Write {
                    address: 0x0103,
                    value: 0x01
                },
                Event::Delay(5),
                Event::Write {
                    address: 0x3000,
                    value: 0x0102_0304
                },
            ]
        );
    }

    #[test]
    fn script_does_not_retry() {
        let mut bus = MockSensorBus::new_16bit(0x10);
        let mut delay = bus.delay();
        let script = [
            RegisterWrite::Word(0x301A, 0x00D8),
            RegisterWrite::Delay(200),
            RegisterWrite::Word(0x30D4, 0x0001),
        ];
        bus.fail_writes(1, 1);
        assert!(write_script(&mut bus, &mut delay, 0x10, &script).is_err());
        assert_eq!(bus.failed_write_count(), 1);
        assert_eq!(bus.writes(), vec![(0x301A, 0x00D8)]);
        assert_eq!(bus.delays(), vec![200]);
    }

    #[test]
    fn poll_command_clears() {
        let mut bus = MockSensorBus::new_16bit(0x48);
        let mut delay = bus.delay();
        bus.set_busy(0x0040, 3);
        write16(&mut bus, 0x48, 0x0040, 0x8801).unwrap();
        bus.clear_events();
        assert!(poll_command(&mut bus, &mut delay, 0x48, 0x0040).unwrap());
        let reads: Vec<_> = bus
            .events()
            .into_iter()
            .filter(|e| matches!(e, Event::Read { .. }))
            .collect();
        assert_eq!(reads.len(), 4);
        assert_eq!(bus.delays(), vec![1, 1, 1]);
    }

    #[test]
    fn poll_command_gives_up() {
        let mut bus = MockSensorBus::new_16bit(0x48);
        let mut delay = bus.delay();
        bus.set_register(0x0040, 0x8801);
        assert!(!poll_command(&mut bus, &mut delay, 0x48, 0x0040).unwrap());
        assert_eq!(bus.delays().len(), POLL_RETRY_COUNT + 1);
    }

    #[test]
    fn masked_register_write() {
        let mut bus = MockSensorBus::new_16bit(0x10);
        bus.set_register(0x30B0, 0x1300);
        let mut reg: DigitalTest = read_register(&mut bus, 0x10).unwrap();
        reg.set_analog_gain(2);
        write_register(&mut bus, 0x10, reg).unwrap();
        assert_eq!(bus.register(0x30B0), Some(0x1320));
        // Full-width registers skip the read.
        bus.clear_events();
        write_register(&mut bus, 0x10, ResetRegister::from(ResetRegister::STREAM_ON)).unwrap();
        assert_eq!(
            bus.events(),
            vec![Event::Write {
                address: 0x301A,
                value: 0x00DC
            }]
        );
    }
}
