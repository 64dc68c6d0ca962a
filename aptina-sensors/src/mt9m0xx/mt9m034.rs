// SPDX-License-Identifier: Apache-2.0
// Copyright © 2026 The aptina-sensors developers
use crate::bus::RegisterWrite::{self, Delay, Word};

use super::address::*;
use super::{Chip, StreamStep};

/// The MT9M034 1.2 MP HDR sensor.
#[derive(Clone, Copy, Debug, Default)]
pub struct Mt9m034;

impl Chip for Mt9m034 {
    const NAME: &'static str = "MT9M034";
    const CHIP_ID: u16 = 0x2400;
    const SEQUENCER: &'static [u16] = &SEQUENCER;
    const ERS_START: Option<u16> = Some(0x0186);
    const AUTO_EXPOSURE_SETTLE_MS: u32 = 2;
    const STREAM_ON: &'static [StreamStep] = &[
        StreamStep::Sequencer,
        StreamStep::Delay(200),
        StreamStep::Script("linear mode", &LINEAR_MODE),
        StreamStep::Size,
        StreamStep::Pll,
        StreamStep::Script("auto-exposure", &AUTO_EXPOSURE),
    ];
}

/// Linear (non-HDR) mode analog and ADC settings, ending with a column correction retrigger.
const LINEAR_MODE: [RegisterWrite; 26] = [
    Word(RESET_REGISTER, 0x00D8),
    Word(MODE_CTRL, 0x0029),
    Word(DATA_PEDESTAL, 0x00C8),
    Word(DAC_LD_14_15, 0x0F03),
    Word(DAC_LD_18_19, 0xC005),
    Word(DAC_LD_12_13, 0x09EF),
    Word(DAC_LD_22_23, 0xA46B),
    Word(DAC_LD_20_21, 0x067D),
    Word(DAC_LD_16_17, 0x0070),
    Word(DARK_CONTROL, 0x0404),
    Word(DAC_LD_26_27, 0x8303),
    Word(DAC_LD_24_25, 0xD208),
    Word(ANALOG_REG, 0x00BD),
    Word(ADC_BITS_6_7, 0x6372),
    Word(ADC_BITS_4_5, 0x7253),
    Word(ADC_BITS_2_3, 0x5470),
    Word(ADC_CONFIG1, 0xC4CC),
    Word(ADC_CONFIG2, 0x8050),
    Word(DIGITAL_TEST, 0x1300),
    Word(COLUMN_CORRECTION, 0xE007),
    Word(DIGITAL_CTRL, 0x0008),
    Word(RESET_REGISTER, 0x10DC),
    Word(RESET_REGISTER, 0x10D8),
    Word(BLUE_GAIN, 0x003F),
    Word(COARSE_INT_TIME, 0x02A0),
    Delay(200),
];

/// Auto-exposure with HDR compression. This also reprograms the PLL for 66 MHz from 24 MHz.
const AUTO_EXPOSURE: [RegisterWrite; 20] = [
    Word(RESET_REGISTER, 0x10D8),
    Word(HDR_COMP, 0x0001),
    Word(VT_SYS_CLK_DIV, 0x0002),
    Word(VT_PIX_CLK_DIV, 0x0004),
    Word(PRE_PLL_CLK_DIV, 0x0002),
    Word(PLL_MULTIPLIER, 0x002C),
    Word(DIGITAL_TEST, 0x1300),
    Word(RESET_REGISTER, 0x10DC),
    Word(EMBEDDED_DATA_CTRL, 0x1982),
    Word(BLUE_GAIN, 0x003F),
    Word(AE_CTRL, 0x001B),
    Word(AE_DCG_EXPOSURE_HIGH, 0x029F),
    Word(AE_DCG_EXPOSURE_LOW, 0x008C),
    Word(AE_DCG_GAIN_FACTOR, 0x02C0),
    Word(AE_DCG_GAIN_FACTOR_INV, 0x005B),
    Word(AE_LUMA_TARGET, 0x0384),
    Word(AE_HIST_TARGET, 0x1000),
    Word(AE_ALPHA_V1, 0x0080),
    Word(AE_MAX_EXPOSURE, 0x03DD),
    Word(AE_MIN_EXPOSURE, 0x0003),
];

/// Sequencer microcode, uploaded through the sequencer data port.
const SEQUENCER: [u16; 274] = [
    0x0025, 0x5050, 0x2D26, 0x0828, 0x0D17, 0x0926, 0x0028, 0x0526,
    0xA728, 0x0725, 0x8080, 0x2925, 0x0040, 0x2702, 0x1616, 0x2706,
    0x1F17, 0x3626, 0xA617, 0x0326, 0xA417, 0x1F28, 0x0526, 0x2028,
    0x0425, 0x2020, 0x2700, 0x171D, 0x2500, 0x2017, 0x1219, 0x1703,
    0x2706, 0x1728, 0x2805, 0x171A, 0x2660, 0x175A, 0x2317, 0x1122,
    0x1741, 0x2500, 0x9027, 0x0026, 0x1828, 0x002E, 0x2A28, 0x081C,
    0x1470, 0x7003, 0x1470, 0x7004, 0x1470, 0x7005, 0x1470, 0x7009,
    0x170C, 0x0014, 0x0020, 0x0014, 0x0050, 0x0314, 0x0020, 0x0314,
    0x0050, 0x0414, 0x0020, 0x0414, 0x0050, 0x0514, 0x0020, 0x2405,
    0x1400, 0x5001, 0x2550, 0x502D, 0x2608, 0x280D, 0x1709, 0x2600,
    0x2805, 0x26A7, 0x2807, 0x2580, 0x8029, 0x2500, 0x4027, 0x0216,
    0x1627, 0x0620, 0x1736, 0x26A6, 0x1703, 0x26A4, 0x171F, 0x2805,
    0x2620, 0x2804, 0x2520, 0x2027, 0x0017, 0x1D25, 0x0020, 0x1712,
    0x1A17, 0x0327, 0x0617, 0x2828, 0x0517, 0x1A26, 0x6017, 0xAE25,
    0x0090, 0x2700, 0x2618, 0x2800, 0x2E2A, 0x2808, 0x1D05, 0x1470,
    0x7009, 0x1720, 0x1400, 0x2024, 0x1400, 0x5002, 0x2550, 0x502D,
    0x2608, 0x280D, 0x1709, 0x2600, 0x2805, 0x26A7, 0x2807, 0x2580,
    0x8029, 0x2500, 0x4027, 0x0216, 0x1627, 0x0617, 0x3626, 0xA617,
    0x0326, 0xA417, 0x1F28, 0x0526, 0x2028, 0x0425, 0x2020, 0x2700,
    0x171D, 0x2500, 0x2021, 0x1712, 0x1B17, 0x0327, 0x0617, 0x2828,
    0x0517, 0x1A26, 0x6017, 0xAE25, 0x0090, 0x2700, 0x2618, 0x2800,
    0x2E2A, 0x2808, 0x1E17, 0x0A05, 0x1470, 0x7009, 0x1616, 0x1616,
    0x1616, 0x1616, 0x1616, 0x1616, 0x1616, 0x1616, 0x1616, 0x1616,
    0x1616, 0x1616, 0x1616, 0x1614, 0x0020, 0x2414, 0x0050, 0x2B2B,
    0x2C2C, 0x2C2C, 0x2C00, 0x0225, 0x5050, 0x2D26, 0x0828, 0x0D17,
    0x0926, 0x0028, 0x0526, 0xA728, 0x0725, 0x8080, 0x2917, 0x0525,
    0x0040, 0x2702, 0x1616, 0x2706, 0x1736, 0x26A6, 0x1703, 0x26A4,
    0x171F, 0x2805, 0x2620, 0x2804, 0x2520, 0x2027, 0x0017, 0x1E25,
    0x0020, 0x2117, 0x1028, 0x051B, 0x1703, 0x2706, 0x1703, 0x1747,
    0x2660, 0x17AE, 0x2500, 0x9027, 0x0026, 0x1828, 0x002E, 0x2A28,
    0x081E, 0x0831, 0x1440, 0x4014, 0x2020, 0x1410, 0x1034, 0x1400,
    0x1014, 0x0020, 0x1400, 0x4013, 0x1802, 0x1470, 0x7004, 0x1470,
    0x7003, 0x1470, 0x7017, 0x2002, 0x1400, 0x2002, 0x1400, 0x5004,
    0x1400, 0x2004, 0x1400, 0x5022, 0x0314, 0x0020, 0x0314, 0x0050,
    0x2C2C, 0x2C2C,
];
