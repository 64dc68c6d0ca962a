// SPDX-License-Identifier: Apache-2.0
// Copyright © 2026 The aptina-sensors developers
use num_traits::{PrimInt, Unsigned};

/// Set or clear every bit of `mask` in `value`.
pub(crate) fn with_bits<B>(value: B, mask: B, set: bool) -> B
where
    B: PrimInt + Unsigned,
{
    if set {
        value | mask
    } else {
        value & !mask
    }
}

/// Round up to the next multiple of two, the granularity of the Bayer pattern.
pub fn align2(value: u32) -> u32 {
    value.saturating_add(1) & !1
}

/// Integer division rounded to the nearest integer.
///
/// A zero divisor yields zero rather than panicking. Callers clamp sizes before dividing, so this
/// only matters for malformed input.
pub fn div_round_closest(dividend: u32, divisor: u32) -> u32 {
    if divisor == 0 {
        0
    } else {
        ((dividend as u64 + divisor as u64 / 2) / divisor as u64) as u32
    }
}

#[cfg(test)]
mod test {
    #[test]
    fn with_bits() {
        assert_eq!(super::with_bits(0x1F82u16, 0x0002, false), 0x1F80);
        assert_eq!(super::with_bits(0x1F80u16, 0x0002, true), 0x1F82);
        assert_eq!(super::with_bits(0x0040u16, 0x8000, true), 0x8040);
    }

    #[test]
    fn align2() {
        assert_eq!(super::align2(0), 0);
        assert_eq!(super::align2(1), 2);
        assert_eq!(super::align2(640), 640);
        assert_eq!(super::align2(641), 642);
    }

    #[test]
    fn div_round_closest() {
        assert_eq!(super::div_round_closest(1280, 640), 2);
        assert_eq!(super::div_round_closest(1280, 500), 3);
        assert_eq!(super::div_round_closest(1280, 900), 1);
        assert_eq!(super::div_round_closest(960, 2), 480);
        assert_eq!(super::div_round_closest(10, 0), 0);
        assert_eq!(super::div_round_closest(u32::MAX, 1), u32::MAX);
        assert_eq!(super::div_round_closest(u32::MAX, 2), 0x8000_0000);
        assert_eq!(super::div_round_closest(u32::MAX, u32::MAX), 1);
    }
}
