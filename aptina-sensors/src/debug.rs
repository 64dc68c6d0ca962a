// SPDX-License-Identifier: Apache-2.0
// Copyright © 2026 The aptina-sensors developers
//! Raw register peek and poke.
//!
//! Bring-up work on these sensors mostly consists of poking at registers and watching what the
//! image does. [`RegisterWindow`] keeps a selected register address and formats reads as text,
//! so a shell, a serial console or a debug UI can drive it with plain strings.
use core::fmt::Write;

use crate::bus::Width;
use crate::error::LibraryError;

/// Untyped register access for debugging.
pub trait RegisterDebug {
    type Error: From<LibraryError>;

    /// Read a register of the given width.
    fn debug_read(&mut self, address: u16, width: Width) -> Result<u32, Self::Error>;

    /// Write a register of the given width. Values are truncated to `width`.
    fn debug_write(&mut self, address: u16, width: Width, value: u32) -> Result<(), Self::Error>;
}

/// Parse a hexadecimal number, with or without a leading `0x`.
pub fn parse_hex(input: &str) -> Result<u32, LibraryError> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    u32::from_str_radix(digits, 16).map_err(|_| LibraryError::InvalidArgument("not a hex number"))
}

/// Parse a signed decimal number.
pub fn parse_decimal(input: &str) -> Result<i32, LibraryError> {
    input
        .trim()
        .parse()
        .map_err(|_| LibraryError::InvalidArgument("not a decimal number"))
}

/// Write a value the way the register attributes show it, `0x` hex and a newline.
pub fn show_hex<W: Write>(out: &mut W, value: u32) -> Result<(), LibraryError> {
    writeln!(out, "0x{:x}", value).map_err(|_| LibraryError::Other("output buffer full"))
}

/// Write a control value as decimal and a newline.
pub fn show_decimal<W: Write>(out: &mut W, value: i32) -> Result<(), LibraryError> {
    writeln!(out, "{}", value).map_err(|_| LibraryError::Other("output buffer full"))
}

/// A selected register address plus the width to access it with.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RegisterWindow {
    address: u16,
    width: Width,
}

impl RegisterWindow {
    pub const fn new(width: Width) -> Self {
        Self { address: 0, width }
    }

    pub fn address(&self) -> u16 {
        self.address
    }

    pub fn width(&self) -> Width {
        self.width
    }

    pub fn show_address<W: Write>(&self, out: &mut W) -> Result<(), LibraryError> {
        show_hex(out, self.address as u32)
    }

    /// Select a new register. Addresses wider than 16 bits are truncated.
    pub fn store_address(&mut self, input: &str) -> Result<(), LibraryError> {
        self.address = parse_hex(input)? as u16;
        Ok(())
    }

    /// Read the selected register and write its value to `out`.
    pub fn show_value<D, W>(&self, device: &mut D, out: &mut W) -> Result<(), D::Error>
    where
        D: RegisterDebug,
        W: Write,
    {
        let value = device.debug_read(self.address, self.width)?;
        show_hex(out, value)?;
        Ok(())
    }

    /// Parse `input` as hex and write it to the selected register.
    pub fn store_value<D: RegisterDebug>(&self, device: &mut D, input: &str) -> Result<(), D::Error> {
        let value = parse_hex(input)?;
        device.debug_write(self.address, self.width, value)
    }
}
