// SPDX-License-Identifier: Apache-2.0
// Copyright © 2026 The aptina-sensors developers
use crate::error::LibraryError;

/// One row of a PLL divider table.
///
/// The PLL output is `ext_freq / n * m`, divided down by `p1` (and `p2` on sensors with a second
/// post-divider) to reach `target_freq`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PllDividers {
    pub ext_freq: u32,
    pub target_freq: u32,
    pub m: u16,
    pub n: u16,
    pub p1: u16,
    /// Zero on sensors without a second post-divider.
    pub p2: u16,
}

impl PllDividers {
    pub const fn new(ext_freq: u32, target_freq: u32, m: u16, n: u16, p1: u16, p2: u16) -> Self {
        Self {
            ext_freq,
            target_freq,
            m,
            n,
            p1,
            p2,
        }
    }
}

/// Look up the dividers for an exact `(ext_freq, target_freq)` pair.
///
/// There is no interpolation; boards must use one of the tabulated clock plans.
pub fn find_dividers(
    table: &[PllDividers],
    ext_freq: u32,
    target_freq: u32,
) -> Result<PllDividers, LibraryError> {
    table
        .iter()
        .find(|row| row.ext_freq == ext_freq && row.target_freq == target_freq)
        .copied()
        .ok_or(LibraryError::NoPllDividers {
            ext_freq,
            target_freq,
        })
}

#[cfg(test)]
mod test {
    use super::*;

    const TABLE: [PllDividers; 2] = [
        PllDividers::new(24_000_000, 48_000_000, 32, 2, 2, 4),
        PllDividers::new(27_000_000, 74_250_000, 44, 2, 1, 8),
    ];

    #[test]
    fn exact_match() {
        assert_eq!(
            find_dividers(&TABLE, 27_000_000, 74_250_000),
            Ok(TABLE[1])
        );
    }

    #[test]
    fn no_match() {
        assert_eq!(
            find_dividers(&TABLE, 24_000_000, 74_250_000),
            Err(LibraryError::NoPllDividers {
                ext_freq: 24_000_000,
                target_freq: 74_250_000
            })
        );
        assert!(find_dividers(&[], 24_000_000, 48_000_000).is_err());
    }
}
