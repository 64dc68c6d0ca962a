// SPDX-License-Identifier: Apache-2.0
// Copyright © 2026 The aptina-sensors developers
use crate::bus::RegisterWrite::{self, Delay, Word};
use crate::register::ResetRegister;

use super::address::*;
use super::{Chip, StreamStep};

/// The MT9M021 1.2 MP global shutter sensor.
#[derive(Clone, Copy, Debug, Default)]
pub struct Mt9m021;

impl Chip for Mt9m021 {
    const NAME: &'static str = "MT9M021";
    const CHIP_ID: u16 = 0x2401;
    const SEQUENCER: &'static [u16] = &SEQUENCER;
    const ERS_START: Option<u16> = None;
    const AUTO_EXPOSURE_SETTLE_MS: u32 = 0;
    const STREAM_ON: &'static [StreamStep] = &[
        StreamStep::Sequencer,
        StreamStep::Script("column correction", &COLUMN_CORRECTION_RETRIGGER),
        StreamStep::Script("Rev2 optimised settings", &REV2_SETTINGS),
        StreamStep::Pll,
        StreamStep::Size,
    ];
}

/// Run a frame with column correction off, then turn it back on so it recalibrates.
const COLUMN_CORRECTION_RETRIGGER: [RegisterWrite; 8] = [
    Word(RESET_REGISTER, ResetRegister::STREAM_OFF),
    Word(COLUMN_CORRECTION, 0x0000),
    Delay(200),
    Word(RESET_REGISTER, ResetRegister::STREAM_ON),
    Delay(200),
    Word(RESET_REGISTER, ResetRegister::STREAM_OFF),
    Word(COLUMN_CORRECTION, 0x0001),
    Delay(200),
];

/// Recommended settings for silicon revision 2.
const REV2_SETTINGS: [RegisterWrite; 15] = [
    Word(TEST_RAW_MODE, 0x0000),
    Word(0x30EA, 0x0C00),
    Word(DARK_CONTROL, 0x0404),
    Word(DATA_PEDESTAL, 0x012C),
    Word(0x3180, 0x8000),
    Word(COLUMN_CORRECTION, 0xE007),
    Word(FINE_INT_TIME, 0x0000),
    Word(ANALOG_REG, 0x00FD),
    Word(ANALOG_REG + 2, 0x0FFF),
    Word(ANALOG_REG + 4, 0x0003),
    Word(ANALOG_REG + 6, 0xF87A),
    Word(ANALOG_REG + 8, 0xE075),
    Word(ANALOG_REG + 10, 0x077C),
    Word(ANALOG_REG + 12, 0xA4EB),
    Word(ANALOG_REG + 14, 0xD208),
];

/// Sequencer microcode, uploaded through the sequencer data port.
const SEQUENCER: [u16; 133] = [
    0x3227, 0x0101, 0x0F25, 0x0808, 0x0227, 0x0101, 0x0837, 0x2700,
    0x0138, 0x2701, 0x013A, 0x2700, 0x0125, 0x0020, 0x3C25, 0x0040,
    0x3427, 0x003F, 0x2500, 0x2037, 0x2540, 0x4036, 0x2500, 0x4031,
    0x2540, 0x403D, 0x6425, 0x2020, 0x3D64, 0x2510, 0x1037, 0x2520,
    0x2010, 0x2510, 0x100F, 0x2708, 0x0802, 0x2540, 0x402D, 0x2608,
    0x280D, 0x1709, 0x2600, 0x2805, 0x26A7, 0x2807, 0x2580, 0x8029,
    0x1705, 0x2500, 0x4027, 0x2222, 0x1616, 0x2726, 0x2617, 0x3626,
    0xA617, 0x0326, 0xA417, 0x1F28, 0x0526, 0x2028, 0x0425, 0x2020,
    0x2700, 0x2625, 0x0000, 0x171E, 0x2500, 0x0425, 0x0020, 0x2117,
    0x121B, 0x1703, 0x2726, 0x2617, 0x2828, 0x0517, 0x1A26, 0x6017,
    0xAE25, 0x0080, 0x2700, 0x2626, 0x1828, 0x002E, 0x2A28, 0x081E,
    0x4127, 0x1010, 0x0214, 0x6060, 0x0A14, 0x6060, 0x0B14, 0x6060,
    0x0C14, 0x6060, 0x0D14, 0x6060, 0x0217, 0x3C14, 0x0060, 0x0A14,
    0x0060, 0x0B14, 0x0060, 0x0C14, 0x0060, 0x0D14, 0x0060, 0x0811,
    0x2500, 0x1027, 0x0010, 0x2F6F, 0x0F3E, 0x2500, 0x0827, 0x0008,
    0x3066, 0x3225, 0x0008, 0x2700, 0x0830, 0x6631, 0x3D64, 0x2508,
    0x083D, 0xFF3D, 0x2A27, 0x083F, 0x2C00,
];
