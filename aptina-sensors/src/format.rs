// SPDX-License-Identifier: Apache-2.0
// Copyright © 2026 The aptina-sensors developers
//! Image formats and frame size negotiation.
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// A rectangle on the pixel array.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Rect {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(left: u32, top: u32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn size(&self) -> FrameSize {
        FrameSize::new(self.width, self.height)
    }
}

/// Output image dimensions in pixels.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, PartialOrd, Ord)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// The range of sizes a sensor with continuous scaling accepts.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FrameSizeRange {
    pub min: FrameSize,
    pub max: FrameSize,
}

/// Media bus pixel codes, numbered as in Linux's `media-bus-format.h`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(u32)]
pub enum MbusCode {
    Uyvy8_1x16 = 0x200f,
    Y12_1x12 = 0x2013,
    Sgrbg10_1x10 = 0x300a,
    Sgrbg12_1x12 = 0x3011,
}

/// Memory pixel formats (V4L2 FourCC codes) for sensors that describe frames as they land in
/// memory instead of on the media bus.
#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(u32)]
pub enum PixelFormat {
    /// 10-bit GRBG Bayer, `BA10`.
    Sgrbg10 = 0x3031_4142,
    /// Packed YUV 4:2:2, `UYVY`.
    Uyvy = 0x5956_5955,
}

/// Field order. All of these sensors are progressive.
#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(u32)]
pub enum Field {
    Any = 0,
    None = 1,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(u32)]
pub enum Colorspace {
    Srgb = 8,
}

/// Format on the media bus between the sensor and the receiver.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MbusFramefmt {
    pub width: u32,
    pub height: u32,
    pub code: MbusCode,
    pub field: Field,
    pub colorspace: Colorspace,
}

impl MbusFramefmt {
    /// A progressive sRGB format of the given size.
    pub fn new(size: FrameSize, code: MbusCode) -> Self {
        Self {
            width: size.width,
            height: size.height,
            code,
            field: Field::None,
            colorspace: Colorspace::Srgb,
        }
    }

    pub fn size(&self) -> FrameSize {
        FrameSize::new(self.width, self.height)
    }
}

/// Format of a frame in memory.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PixFormat {
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
    pub field: Field,
    pub bytes_per_line: u32,
    pub size_image: u32,
    pub colorspace: Colorspace,
}

impl PixFormat {
    /// A progressive sRGB format with two bytes per pixel.
    pub fn packed(size: FrameSize, pixel_format: PixelFormat) -> Self {
        let bytes_per_line = size.width * 2;
        Self {
            width: size.width,
            height: size.height,
            pixel_format,
            field: Field::None,
            bytes_per_line,
            size_image: bytes_per_line * size.height,
            colorspace: Colorspace::Srgb,
        }
    }

    pub fn size(&self) -> FrameSize {
        FrameSize::new(self.width, self.height)
    }
}

/// A fraction of a second, used for frame intervals.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Fract {
    pub numerator: u32,
    pub denominator: u32,
}

impl Fract {
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }
}

/// Index of the smallest entry in `sizes` with at least `width * height` pixels.
///
/// Requests larger than every entry get the last (largest) one. `sizes` must be non-empty and
/// sorted by area.
pub fn calc_size(sizes: &[FrameSize], width: u32, height: u32) -> usize {
    let requested = FrameSize::new(width, height).area();
    sizes
        .iter()
        .position(|size| size.area() >= requested)
        .unwrap_or_else(|| sizes.len().saturating_sub(1))
}

/// Index of the first entry in `sizes` at least `width` pixels wide, or the last entry.
pub fn find_isize(sizes: &[FrameSize], width: u32) -> usize {
    sizes
        .iter()
        .position(|size| size.width >= width)
        .unwrap_or_else(|| sizes.len().saturating_sub(1))
}

#[cfg(test)]
mod test {
    use super::*;

    const SIZES: [FrameSize; 5] = [
        FrameSize::new(640, 480),
        FrameSize::new(1280, 720),
        FrameSize::new(1920, 1080),
        FrameSize::new(2048, 1536),
        FrameSize::new(2592, 1944),
    ];

    #[test]
    fn calc_size_rounds_up() {
        assert_eq!(calc_size(&SIZES, 100, 100), 0);
        assert_eq!(calc_size(&SIZES, 640, 480), 0);
        assert_eq!(calc_size(&SIZES, 641, 480), 1);
        assert_eq!(calc_size(&SIZES, 1920, 1080), 2);
        assert_eq!(calc_size(&SIZES, 3000, 3000), 4);
    }

    #[test]
    fn calc_size_compares_area() {
        // Narrower than 720p, but with more pixels.
        assert_eq!(calc_size(&SIZES, 1000, 1000), 2);
    }

    #[test]
    fn find_isize_by_width() {
        assert_eq!(find_isize(&SIZES, 0), 0);
        assert_eq!(find_isize(&SIZES, 1280), 1);
        assert_eq!(find_isize(&SIZES, 1281), 2);
        assert_eq!(find_isize(&SIZES, 4000), 4);
    }

    #[test]
    fn fourcc_codes() {
        assert_eq!(&u32::from(PixelFormat::Uyvy).to_le_bytes(), b"UYVY");
        assert_eq!(&u32::from(PixelFormat::Sgrbg10).to_le_bytes(), b"BA10");
    }

    #[test]
    fn packed_pix_format() {
        let pix = PixFormat::packed(FrameSize::new(1280, 720), PixelFormat::Uyvy);
        assert_eq!(pix.bytes_per_line, 2560);
        assert_eq!(pix.size_image, 2560 * 720);
        assert_eq!(pix.field, Field::None);
    }
}
