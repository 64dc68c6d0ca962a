// SPDX-License-Identifier: Apache-2.0
// Copyright © 2026 The aptina-sensors developers
//! Register addresses shared by the MT9M021 and MT9M034.

pub(crate) const CHIP_ID: u16 = 0x3000;

pub(crate) const Y_ADDR_START: u16 = 0x3002;
pub(crate) const X_ADDR_START: u16 = 0x3004;
pub(crate) const Y_ADDR_END: u16 = 0x3006;
pub(crate) const X_ADDR_END: u16 = 0x3008;
pub(crate) const FRAME_LENGTH_LINES: u16 = 0x300A;
pub(crate) const LINE_LENGTH_PCK: u16 = 0x300C;

pub(crate) const COARSE_INT_TIME: u16 = 0x3012;
pub(crate) const FINE_INT_TIME: u16 = 0x3014;
pub(crate) const COARSE_INT_TIME_CB: u16 = 0x3016;

pub(crate) const DATA_PEDESTAL: u16 = 0x301E;
pub(crate) const RESET_REGISTER: u16 = 0x301A;

pub(crate) const VT_SYS_CLK_DIV: u16 = 0x302A;
pub(crate) const VT_PIX_CLK_DIV: u16 = 0x302C;
pub(crate) const PRE_PLL_CLK_DIV: u16 = 0x302E;
pub(crate) const PLL_MULTIPLIER: u16 = 0x3030;

pub(crate) const DIGITAL_BINNING: u16 = 0x3032;
pub(crate) const DARK_CONTROL: u16 = 0x3044;
pub(crate) const EMBEDDED_DATA_CTRL: u16 = 0x3064;
pub(crate) const TEST_PATTERN: u16 = 0x3070;
pub(crate) const TEST_RAW_MODE: u16 = 0x307A;
pub(crate) const MODE_CTRL: u16 = 0x3082;

pub(crate) const SEQ_DATA_PORT: u16 = 0x3086;
pub(crate) const SEQ_CTRL_PORT: u16 = 0x3088;
pub(crate) const ERS_PROG_START_ADDR: u16 = 0x309E;

pub(crate) const X_ODD_INC: u16 = 0x30A2;
pub(crate) const Y_ODD_INC: u16 = 0x30A6;
pub(crate) const DIGITAL_TEST: u16 = 0x30B0;
pub(crate) const DIGITAL_CTRL: u16 = 0x30BA;
pub(crate) const COLUMN_CORRECTION: u16 = 0x30D4;

pub(crate) const GREEN1_GAIN: u16 = 0x3056;
pub(crate) const BLUE_GAIN: u16 = 0x3058;
pub(crate) const RED_GAIN: u16 = 0x305A;
pub(crate) const GREEN2_GAIN: u16 = 0x305C;
pub(crate) const GLOBAL_GAIN: u16 = 0x305E;
pub(crate) const GREEN1_GAIN_CB: u16 = 0x30BC;
pub(crate) const BLUE_GAIN_CB: u16 = 0x30BE;
pub(crate) const RED_GAIN_CB: u16 = 0x30C0;
pub(crate) const GREEN2_GAIN_CB: u16 = 0x30C2;
pub(crate) const GLOBAL_GAIN_CB: u16 = 0x30C4;

pub(crate) const AE_CTRL: u16 = 0x3100;
pub(crate) const AE_LUMA_TARGET: u16 = 0x3102;
pub(crate) const AE_HIST_TARGET: u16 = 0x3104;
pub(crate) const AE_DCG_EXPOSURE_HIGH: u16 = 0x3112;
pub(crate) const AE_DCG_EXPOSURE_LOW: u16 = 0x3114;
pub(crate) const AE_DCG_GAIN_FACTOR: u16 = 0x3116;
pub(crate) const AE_DCG_GAIN_FACTOR_INV: u16 = 0x3118;
pub(crate) const AE_MAX_EXPOSURE: u16 = 0x311C;
pub(crate) const AE_MIN_EXPOSURE: u16 = 0x311E;
pub(crate) const AE_ALPHA_V1: u16 = 0x3126;
pub(crate) const HDR_COMP: u16 = 0x31D0;

/// First of the analog DAC registers (`DAC_LD_10_11`), the rest follow at 2-byte steps.
pub(crate) const ANALOG_REG: u16 = 0x3ED6;
pub(crate) const DAC_LD_12_13: u16 = 0x3ED8;
pub(crate) const DAC_LD_14_15: u16 = 0x3EDA;
pub(crate) const DAC_LD_16_17: u16 = 0x3EDC;
pub(crate) const DAC_LD_18_19: u16 = 0x3EDE;
pub(crate) const DAC_LD_20_21: u16 = 0x3EE0;
pub(crate) const DAC_LD_22_23: u16 = 0x3EE2;
pub(crate) const DAC_LD_24_25: u16 = 0x3EE4;
pub(crate) const DAC_LD_26_27: u16 = 0x3EE6;
pub(crate) const ADC_BITS_2_3: u16 = 0x30E0;
pub(crate) const ADC_BITS_4_5: u16 = 0x30E2;
pub(crate) const ADC_BITS_6_7: u16 = 0x30E4;
pub(crate) const ADC_CONFIG1: u16 = 0x30E6;
pub(crate) const ADC_CONFIG2: u16 = 0x30E8;
