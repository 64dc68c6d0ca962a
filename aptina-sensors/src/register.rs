// SPDX-License-Identifier: Apache-2.0
// Copyright © 2026 The aptina-sensors developers
//! Typed views of the registers that drivers read-modify-write or shadow.
//!
//! Most sensor registers are only ever written with constants from a bring-up table, so they are
//! plain addresses in each driver's `address` module. The registers here have individual fields
//! toggled by controls, so they get accessors instead of magic masks.
use bitvec::field::BitField;
use bitvec::order::Lsb0;
use bitvec::view::BitView;

/// Trait for common register functionality.
pub trait Register: Copy + Into<u16> + From<u16> {
    /// A bit mask of which bits can be modified by the controller.
    ///
    /// When changing register values on the sensor, the current value should be read, then
    /// bitwise-ANDed with the complement of this mask, then bitwise-ORd with the new value. This
    /// preserves the values of any reserved bits in the registers.
    fn write_mask() -> u16;

    /// The address of this register in the sensor's register map.
    fn address() -> u16;
}

macro_rules! register_flag {
    ($field:ident, $bit:literal, $doc:literal) => {
        paste::paste! {
            #[doc = $doc]
            pub fn $field(&self) -> bool {
                self.0.view_bits::<Lsb0>()[$bit]
            }

            #[doc = $doc]
            pub fn [< set_ $field >](&mut self, value: bool) {
                self.0.view_bits_mut::<Lsb0>().set($bit, value);
            }
        }
    };
}

macro_rules! raw_register {
    ($name:ident) => {
        impl From<u16> for $name {
            fn from(raw: u16) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for u16 {
            fn from(register: $name) -> Self {
                register.0
            }
        }
    };
}

/// MT9M0xx reset register (0x301A).
///
/// Besides resets, this register gates streaming and parallel-interface settings. The drivers
/// write a handful of whole-register constants to it, listed as associated constants.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ResetRegister(u16);

impl ResetRegister {
    pub const RESET: u16 = 0x00D9;
    pub const STREAM_OFF: u16 = 0x00D8;
    pub const STREAM_ON: u16 = 0x00DC;

    register_flag!(reset, 0, "Trigger a soft reset. Self-clearing.");
    register_flag!(restart, 1, "Abort the current frame and restart.");
    register_flag!(streaming, 2, "Whether the sensor is streaming rather than in standby.");
    register_flag!(lock_registers, 3, "Protect registers against writes.");
}

raw_register!(ResetRegister);

impl Register for ResetRegister {
    fn write_mask() -> u16 {
        0xFFFF
    }

    fn address() -> u16 {
        0x301A
    }
}

/// MT9M0xx read mode register (0x3040).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ReadMode(u16);

impl ReadMode {
    register_flag!(horizontal_mirror, 14, "Read columns right to left.");
    register_flag!(vertical_flip, 15, "Read rows bottom to top.");
}

raw_register!(ReadMode);

impl Register for ReadMode {
    fn write_mask() -> u16 {
        0xC000
    }

    fn address() -> u16 {
        0x3040
    }
}

/// MT9M0xx digital test register (0x30B0), which also holds the column analog gain.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DigitalTest(u16);

impl DigitalTest {
    pub const ANALOG_GAIN_MASK: u16 = 0x0030;

    register_flag!(monochrome, 7, "Disable the color pipeline for monochrome parts.");

    /// The column analog gain (1x, 2x, 4x or 8x as 0 through 3).
    pub fn analog_gain(&self) -> u16 {
        self.0.view_bits::<Lsb0>()[4..6].load_le::<u16>()
    }

    /// Set the column analog gain. Only the low two bits of `gain` are used.
    pub fn set_analog_gain(&mut self, gain: u16) {
        self.0.view_bits_mut::<Lsb0>()[4..6].store_le(gain & 0x3);
    }
}

raw_register!(DigitalTest);

impl Register for DigitalTest {
    fn write_mask() -> u16 {
        Self::ANALOG_GAIN_MASK | 0x0080
    }

    fn address() -> u16 {
        0x30B0
    }
}

/// MT9P006 output control register (0x07).
///
/// The driver keeps a shadow of this register and never reads it back.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct OutputControl(u16);

impl OutputControl {
    register_flag!(chip_enable, 1, "Enable readout. Cleared while the PLL is reconfigured.");
}

impl Default for OutputControl {
    fn default() -> Self {
        Self(0x1F82)
    }
}

raw_register!(OutputControl);

impl Register for OutputControl {
    fn write_mask() -> u16 {
        0xFFFF
    }

    fn address() -> u16 {
        0x07
    }
}

/// MT9P006 read mode 2 register (0x20).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ReadMode2(u16);

impl ReadMode2 {
    pub const ROW_BLC: u16 = 1 << 6;
    pub const COLUMN_MIRROR: u16 = 1 << 14;

    register_flag!(row_black_level_correction, 6, "Row-wise black level correction.");
    register_flag!(column_mirror, 14, "Mirror the image horizontally.");
    register_flag!(row_mirror, 15, "Mirror the image vertically.");
}

impl Default for ReadMode2 {
    fn default() -> Self {
        Self(Self::ROW_BLC)
    }
}

raw_register!(ReadMode2);

impl Register for ReadMode2 {
    fn write_mask() -> u16 {
        0xFFFF
    }

    fn address() -> u16 {
        0x20
    }
}
