// SPDX-License-Identifier: Apache-2.0
// Copyright © 2026 The aptina-sensors developers
//! MT9P015 register map and bring-up lists.
use crate::bus::RegisterWrite::{self, Byte, Delay, Word};

pub(crate) const MODEL_ID: u16 = 0x0000;
pub(crate) const REVISION_NUMBER: u16 = 0x0002;
pub(crate) const MANUFACTURER_ID: u16 = 0x0003;
pub(crate) const MODE_SELECT: u16 = 0x0100;
pub(crate) const SOFTWARE_RESET: u16 = 0x0103;
pub(crate) const GROUPED_PAR_HOLD: u16 = 0x0104;
pub(crate) const CCP_DATA_FORMAT: u16 = 0x0112;
pub(crate) const FINE_INT_TIME: u16 = 0x0200;
pub(crate) const COARSE_INT_TIME: u16 = 0x0202;
pub(crate) const VT_PIX_CLK_DIV: u16 = 0x0300;
pub(crate) const VT_SYS_CLK_DIV: u16 = 0x0302;
pub(crate) const PRE_PLL_CLK_DIV: u16 = 0x0304;
pub(crate) const PLL_MULTIPLIER: u16 = 0x0306;
pub(crate) const OP_PIX_CLK_DIV: u16 = 0x0308;
pub(crate) const OP_SYS_CLK_DIV: u16 = 0x030A;
pub(crate) const FRAME_LEN_LINES: u16 = 0x0340;
pub(crate) const LINE_LEN_PCK: u16 = 0x0342;
pub(crate) const X_ADDR_START: u16 = 0x0344;
pub(crate) const Y_ADDR_START: u16 = 0x0346;
pub(crate) const X_ADDR_END: u16 = 0x0348;
pub(crate) const Y_ADDR_END: u16 = 0x034A;
pub(crate) const X_OUTPUT_SIZE: u16 = 0x034C;
pub(crate) const Y_OUTPUT_SIZE: u16 = 0x034E;
pub(crate) const SCALING_MODE: u16 = 0x0400;
pub(crate) const SCALE_M: u16 = 0x0404;
pub(crate) const FINE_CORRECT: u16 = 0x3010;
pub(crate) const RESET_REGISTER: u16 = 0x301A;
pub(crate) const READ_MODE: u16 = 0x3040;
pub(crate) const GAIN_GREEN1: u16 = 0x3056;
pub(crate) const GAIN_BLUE: u16 = 0x3058;
pub(crate) const GAIN_RED: u16 = 0x305A;
pub(crate) const GAIN_GREEN2: u16 = 0x305C;
pub(crate) const GAIN_GLOBAL: u16 = 0x305E;
pub(crate) const RESERVED_MFR_3064: u16 = 0x3064;

/// Gain register value written at start-up.
pub(crate) const DEFAULT_GAIN: u16 = 0x10B0;

/// Register values for gain indices 0 through 159, from 1x to 16x.
pub(crate) const GAIN_TABLE: [u16; 160] = [
    // 1x to 2x
    4128, 4129, 4130, 4131, 4132, 4133, 4134, 4135, 4136, 4137, 4138, 4139, 4140, 4141, 4142, 4143,
    4144, 4145, 4146, 4147, 4148, 4149, 4150, 4151, 4152, 4153, 4154, 4155, 4156, 4157, 4158, 4159,
    // 2x to 4x
    4256, 4257, 4258, 4259, 4260, 4261, 4262, 4263, 4264, 4265, 4266, 4267, 4268, 4269, 4270, 4271,
    4272, 4273, 4274, 4275, 4276, 4277, 4278, 4279, 4280, 4281, 4282, 4283, 4284, 4285, 4286, 4287,
    // 4x to 8x
    4512, 4513, 4514, 4515, 4516, 4517, 4518, 4519, 4520, 4521, 4522, 4523, 4524, 4525, 4526, 4527,
    4528, 4529, 4530, 4531, 4532, 4533, 4534, 4535, 4536, 4537, 4538, 4539, 4540, 4541, 4542, 4543,
    // 8x to 16x
    4544, 4545, 4546, 4547, 4548, 4549, 4550, 4551, 4552, 4553, 4554, 4555, 4556, 4557, 4558, 4559,
    4560, 4561, 4562, 4563, 4564, 4565, 4566, 4567, 4568, 4569, 4570, 4571, 4572, 4573, 4574, 4575,
    4576, 4577, 4578, 4579, 4580, 4581, 4582, 4583, 4584, 4585, 4586, 4587, 4588, 4589, 4590, 4591,
    4592, 4593, 4594, 4595, 4596, 4597, 4598, 4599, 4600, 4601, 4602, 4603, 4604, 4605, 4606, 4607,
];

/// Enter soft standby. Settings are kept.
pub(crate) const STREAM_OFF: [RegisterWrite; 1] = [Byte(MODE_SELECT, 0x00)];

/// Leave soft standby, then give the PLL 1ms to lock.
pub(crate) const STREAM_ON: [RegisterWrite; 2] = [Byte(MODE_SELECT, 0x01), Delay(1)];

/// Reset and defaults shared by every mode.
pub(crate) const COMMON: [RegisterWrite; 12] = [
    Byte(SOFTWARE_RESET, 0x01),
    // At least 2400 EXTCLK cycles
    Delay(5),
    Word(RESET_REGISTER, 0x10C8),
    Word(RESERVED_MFR_3064, 0x0805),
    Byte(GROUPED_PAR_HOLD, 0x01),
    Word(CCP_DATA_FORMAT, 0x0C0C),
    Word(GAIN_GREEN1, DEFAULT_GAIN),
    Word(GAIN_RED, DEFAULT_GAIN),
    Word(GAIN_BLUE, DEFAULT_GAIN),
    Word(GAIN_GREEN2, DEFAULT_GAIN),
    Word(GAIN_GLOBAL, DEFAULT_GAIN),
    Byte(GROUPED_PAR_HOLD, 0x00),
];

/// Clock tree setup, the same for every mode.
pub(crate) const PLL_SETUP: [RegisterWrite; 8] = [
    Word(RESERVED_MFR_3064, 0x0805),
    Word(0x31AE, 0x0201),
    Word(VT_PIX_CLK_DIV, 6),
    Word(VT_SYS_CLK_DIV, 1),
    Word(PRE_PLL_CLK_DIV, 2),
    Word(PLL_MULTIPLIER, 60),
    Word(OP_PIX_CLK_DIV, 10),
    Word(OP_SYS_CLK_DIV, 1),
];

/// A sensor mode: stop streaming, wait, set up the clocks, wait again, then program the window
/// under grouped parameter hold.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Mode {
    pub(crate) name: &'static str,
    /// Pause after stopping the stream.
    pub(crate) stop_ms: u32,
    /// Pause after programming the clocks.
    pub(crate) lock_ms: u32,
    pub(crate) window: &'static [RegisterWrite],
    /// Whether the mode restarts streaming itself.
    pub(crate) restart: bool,
}

const WINDOW_VGA: [RegisterWrite; 15] = [
    Byte(GROUPED_PAR_HOLD, 0x01),
    Word(X_OUTPUT_SIZE, 640),
    Word(Y_OUTPUT_SIZE, 480),
    Word(X_ADDR_START, 0x0008),
    Word(Y_ADDR_START, 0x0008),
    Word(X_ADDR_END, 0x0A01),
    Word(Y_ADDR_END, 0x0781),
    Word(READ_MODE, 0x15C7),
    Word(FINE_INT_TIME, 0x0702),
    Word(FINE_CORRECT, 0x015C),
    Word(FRAME_LEN_LINES, 0x0233),
    Word(LINE_LEN_PCK, 0x0B60),
    Word(SCALING_MODE, 0x0000),
    Word(COARSE_INT_TIME, 0x02AE),
    Byte(GROUPED_PAR_HOLD, 0x00),
];

const WINDOW_720P_60: [RegisterWrite; 15] = [
    Byte(GROUPED_PAR_HOLD, 0x01),
    Word(X_OUTPUT_SIZE, 1280),
    Word(Y_OUTPUT_SIZE, 720),
    Word(X_ADDR_START, 0x0018),
    Word(Y_ADDR_START, 0x0104),
    Word(X_ADDR_END, 0x0A15),
    Word(Y_ADDR_END, 0x06A1),
    Word(READ_MODE, 0x14C3),
    Word(FINE_INT_TIME, 0x0702),
    Word(FINE_CORRECT, 0x015C),
    Word(FRAME_LEN_LINES, 0x0323),
    Word(LINE_LEN_PCK, 0x09BC),
    Word(SCALING_MODE, 0x0000),
    Word(COARSE_INT_TIME, 0x0321),
    Byte(GROUPED_PAR_HOLD, 0x00),
];

const WINDOW_720P_30: [RegisterWrite; 15] = [
    Byte(GROUPED_PAR_HOLD, 0x01),
    Word(X_OUTPUT_SIZE, 1280),
    Word(Y_OUTPUT_SIZE, 720),
    Word(X_ADDR_START, 0x0018),
    Word(Y_ADDR_START, 0x0104),
    Word(X_ADDR_END, 0x0A15),
    Word(Y_ADDR_END, 0x06A1),
    Word(READ_MODE, 0x14C3),
    Word(FINE_INT_TIME, 0x0702),
    Word(FINE_CORRECT, 0x015C),
    Word(FRAME_LEN_LINES, 0x0323),
    Word(LINE_LEN_PCK, 0x1374),
    Word(SCALING_MODE, 0x0000),
    Word(COARSE_INT_TIME, 0x0290),
    Byte(GROUPED_PAR_HOLD, 0x00),
];

const WINDOW_1080P: [RegisterWrite; 15] = [
    Byte(GROUPED_PAR_HOLD, 0x01),
    Word(X_OUTPUT_SIZE, 1920),
    Word(Y_OUTPUT_SIZE, 1080),
    Word(X_ADDR_START, 344),
    Word(Y_ADDR_START, 440),
    Word(X_ADDR_END, 2263),
    Word(Y_ADDR_END, 1519),
    Word(READ_MODE, 0x0041),
    Word(FINE_INT_TIME, 2551),
    Word(FINE_CORRECT, 156),
    Word(FRAME_LEN_LINES, 1175),
    Word(LINE_LEN_PCK, 3404),
    Word(SCALING_MODE, 0x0000),
    Word(COARSE_INT_TIME, 0x0490),
    Byte(GROUPED_PAR_HOLD, 0x00),
];

/// Full array scaled down to 3 MP.
const WINDOW_3MP: [RegisterWrite; 16] = [
    Byte(GROUPED_PAR_HOLD, 0x01),
    Word(X_OUTPUT_SIZE, 2048),
    Word(Y_OUTPUT_SIZE, 1536),
    Word(X_ADDR_START, 8),
    Word(Y_ADDR_START, 8),
    Word(X_ADDR_END, 2599),
    Word(Y_ADDR_END, 1951),
    Word(READ_MODE, 0x0041),
    Word(FINE_INT_TIME, 0x06CB),
    Word(FINE_CORRECT, 0x009C),
    Word(FRAME_LEN_LINES, 0x07ED),
    Word(LINE_LEN_PCK, 0x11C8),
    Word(SCALE_M, 0x0014),
    Word(SCALING_MODE, 0x0002),
    Word(COARSE_INT_TIME, 0x07EC),
    Byte(GROUPED_PAR_HOLD, 0x00),
];

const WINDOW_5MP: [RegisterWrite; 16] = [
    Byte(GROUPED_PAR_HOLD, 0x01),
    Word(X_OUTPUT_SIZE, 2592),
    Word(Y_OUTPUT_SIZE, 1944),
    Word(X_ADDR_START, 0x0008),
    Word(Y_ADDR_START, 0x0008),
    Word(X_ADDR_END, 0x0A27),
    Word(Y_ADDR_END, 0x079F),
    Word(READ_MODE, 0x0041),
    Word(FINE_INT_TIME, 0x06CB),
    Word(FINE_CORRECT, 0x009C),
    Word(FRAME_LEN_LINES, 0x07ED),
    Word(LINE_LEN_PCK, 0x11C8),
    Word(SCALE_M, 0x0010),
    Word(SCALING_MODE, 0x0000),
    Word(COARSE_INT_TIME, 0x07EC),
    Byte(GROUPED_PAR_HOLD, 0x00),
];

pub(crate) const VGA_30: Mode = Mode {
    name: "VGA 30fps",
    stop_ms: 100,
    lock_ms: 10,
    window: &WINDOW_VGA,
    restart: false,
};

pub(crate) const VGA_60: Mode = Mode {
    name: "VGA 60fps",
    stop_ms: 100,
    lock_ms: 10,
    window: &WINDOW_VGA,
    restart: true,
};

pub(crate) const HD720_30: Mode = Mode {
    name: "720p 30fps",
    stop_ms: 10,
    lock_ms: 100,
    window: &WINDOW_720P_30,
    restart: false,
};

pub(crate) const HD720_60: Mode = Mode {
    name: "720p 60fps",
    stop_ms: 100,
    lock_ms: 10,
    window: &WINDOW_720P_60,
    restart: false,
};

pub(crate) const HD1080_30: Mode = Mode {
    name: "1080p 30fps",
    stop_ms: 100,
    lock_ms: 10,
    window: &WINDOW_1080P,
    restart: false,
};

pub(crate) const IMAGE_3MP: Mode = Mode {
    name: "3MP 15fps",
    stop_ms: 100,
    lock_ms: 10,
    window: &WINDOW_3MP,
    restart: false,
};

pub(crate) const IMAGE_5MP: Mode = Mode {
    name: "5MP 15fps",
    stop_ms: 100,
    lock_ms: 10,
    window: &WINDOW_5MP,
    restart: false,
};

/// Modes by frame rate range (low, high) and size index.
pub(crate) const MODES: [[Mode; 5]; 2] = [
    [VGA_30, HD720_30, HD1080_30, IMAGE_3MP, IMAGE_5MP],
    [VGA_60, HD720_60, HD1080_30, IMAGE_3MP, IMAGE_5MP],
];

/// Clock tree and line timing of a mode, used to derive exposure limits.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Timing {
    pub vt_pix_clk_div: u32,
    pub vt_sys_clk_div: u32,
    pub pre_pll_div: u32,
    pub fine_int_time: u32,
    pub frame_lines: u32,
    pub line_len: u32,
    pub min_pll: u32,
    pub max_pll: u32,
}

impl Timing {
    const fn new(vt_pix_clk_div: u32, fine_int_time: u32, frame_lines: u32, line_len: u32) -> Self {
        Self {
            vt_pix_clk_div,
            vt_sys_clk_div: 1,
            pre_pll_div: 2,
            fine_int_time,
            frame_lines,
            line_len,
            min_pll: 36,
            max_pll: 64,
        }
    }
}

pub(crate) const TIMING_5MP: Timing = Timing::new(6, 0x06CB, 0x07ED, 0x11C8);
pub(crate) const TIMING_1080P_30: Timing = Timing::new(6, 2551, 1175, 3404);
pub(crate) const TIMING_720P_60: Timing = Timing::new(6, 0x0702, 0x0323, 0x09BC);
pub(crate) const TIMING_720P_30: Timing = Timing::new(8, 0x0702, 0x0323, 0x1374);
pub(crate) const TIMING_VGA: Timing = Timing::new(6, 0x0702, 0x0233, 0x0B60);
