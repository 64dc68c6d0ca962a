// SPDX-License-Identifier: Apache-2.0
// Copyright © 2026 The aptina-sensors developers
#[cfg(feature = "std")]
extern crate std;

use core::fmt;

use embedded_hal::blocking::i2c;

/// Errors that don't involve I²C.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LibraryError {
    /// A request the sensor cannot honor (an unsupported control value, for example).
    InvalidArgument(&'static str),

    /// A value outside of the range a control or menu accepts.
    OutOfRange(&'static str),

    /// The identification register did not hold the expected value.
    ChipNotDetected { expected: u16, found: u16 },

    /// There is no PLL configuration for the requested pair of clocks.
    NoPllDividers { ext_freq: u32, target_freq: u32 },

    /// The power reference count was released more times than it was acquired.
    PowerUnderflow,

    /// When a value from the sensor is malformed in some way.
    InvalidData(&'static str),

    Other(&'static str),
}

impl fmt::Display for LibraryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibraryError::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            LibraryError::OutOfRange(msg) => write!(f, "out of range: {}", msg),
            LibraryError::ChipNotDetected { expected, found } => write!(
                f,
                "chip not detected (expected ID 0x{:04x}, read 0x{:04x})",
                expected, found
            ),
            LibraryError::NoPllDividers {
                ext_freq,
                target_freq,
            } => write!(
                f,
                "no PLL dividers for {}Hz -> {}Hz",
                ext_freq, target_freq
            ),
            LibraryError::PowerUnderflow => write!(f, "power released while already off"),
            LibraryError::InvalidData(msg) => write!(f, "{}", msg),
            LibraryError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for LibraryError {}

pub enum Error<I2C>
where
    I2C: i2c::WriteRead + i2c::Write,
{
    /// Errors originating from the I²C implementation when reading a register.
    I2cWriteReadError(<I2C as i2c::WriteRead>::Error),

    /// Errors originating from the I²C implementation when writing a register.
    I2cWriteError(<I2C as i2c::Write>::Error),

    /// Errors originating from within this library.
    LibraryError(LibraryError),
}

impl<I2C> Error<I2C>
where
    I2C: i2c::WriteRead + i2c::Write,
{
    /// Whether this error came from the bus rather than from a rejected request.
    pub fn is_bus_error(&self) -> bool {
        !matches!(self, Error::LibraryError(_))
    }
}

impl<I2C> Clone for Error<I2C>
where
    I2C: i2c::WriteRead + i2c::Write,
    <I2C as i2c::WriteRead>::Error: Clone,
    <I2C as i2c::Write>::Error: Clone,
{
    fn clone(&self) -> Self {
        match self {
            Error::I2cWriteReadError(i2c_error) => Error::I2cWriteReadError(i2c_error.clone()),
            Error::I2cWriteError(i2c_error) => Error::I2cWriteError(i2c_error.clone()),
            Error::LibraryError(err) => Error::LibraryError(err.clone()),
        }
    }
}

impl<I2C> PartialEq for Error<I2C>
where
    I2C: i2c::WriteRead + i2c::Write,
    <I2C as i2c::WriteRead>::Error: PartialEq,
    <I2C as i2c::Write>::Error: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Error::I2cWriteReadError(a), Error::I2cWriteReadError(b)) => a == b,
            (Error::I2cWriteError(a), Error::I2cWriteError(b)) => a == b,
            (Error::LibraryError(a), Error::LibraryError(b)) => a == b,
            _ => false,
        }
    }
}

// Custom Debug implementation so that I2C doesn't need to implement Debug (like the one from
// linux-embedded-hal).
impl<I2C> fmt::Debug for Error<I2C>
where
    I2C: i2c::WriteRead + i2c::Write,
    <I2C as i2c::WriteRead>::Error: fmt::Debug,
    <I2C as i2c::Write>::Error: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::I2cWriteReadError(i2c_error) => f
                .debug_tuple("Error::I2cWriteReadError")
                .field(i2c_error)
                .finish(),
            Error::I2cWriteError(i2c_error) => f
                .debug_tuple("Error::I2cWriteError")
                .field(i2c_error)
                .finish(),
            Error::LibraryError(err) => f.debug_tuple("Error::LibraryError").field(err).finish(),
        }
    }
}

impl<I2C> fmt::Display for Error<I2C>
where
    I2C: i2c::WriteRead + i2c::Write,
    <I2C as i2c::WriteRead>::Error: fmt::Debug,
    <I2C as i2c::Write>::Error: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::I2cWriteReadError(i2c_error) => write!(f, "I2C read error: {:?}", i2c_error),
            Error::I2cWriteError(i2c_error) => write!(f, "I2C write error: {:?}", i2c_error),
            Error::LibraryError(err) => write!(f, "Library Error: {}", err),
        }
    }
}

#[cfg(feature = "std")]
impl<I2C> std::error::Error for Error<I2C>
where
    I2C: i2c::WriteRead + i2c::Write,
    <I2C as i2c::WriteRead>::Error: std::error::Error + 'static,
    <I2C as i2c::Write>::Error: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::I2cWriteReadError(i2c_error) => Some(i2c_error),
            Error::I2cWriteError(i2c_error) => Some(i2c_error),
            Error::LibraryError(lib_err) => Some(lib_err),
        }
    }
}

impl<I2C> From<LibraryError> for Error<I2C>
where
    I2C: i2c::WriteRead + i2c::Write,
{
    fn from(lib_err: LibraryError) -> Self {
        Self::LibraryError(lib_err)
    }
}

#[cfg(test)]
mod test {
    extern crate std;

    use std::string::ToString;

    use crate::test::{MockError, MockSensorBus};

    use super::*;

    #[test]
    fn bus_errors() {
        let err: Error<MockSensorBus> = Error::I2cWriteError(MockError::Injected);
        assert!(err.is_bus_error());
        let err: Error<MockSensorBus> = Error::I2cWriteReadError(MockError::Injected);
        assert!(err.is_bus_error());
        let err: Error<MockSensorBus> = LibraryError::PowerUnderflow.into();
        assert!(!err.is_bus_error());
    }

    #[test]
    fn display() {
        let err: Error<MockSensorBus> = LibraryError::ChipNotDetected {
            expected: 0x2400,
            found: 0x2401,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Library Error: chip not detected (expected ID 0x2400, read 0x2401)"
        );
        assert_eq!(
            LibraryError::NoPllDividers {
                ext_freq: 24_000_000,
                target_freq: 50_000_000
            }
            .to_string(),
            "no PLL dividers for 24000000Hz -> 50000000Hz"
        );
    }
}
