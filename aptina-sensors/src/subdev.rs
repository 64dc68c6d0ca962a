// SPDX-License-Identifier: Apache-2.0
// Copyright © 2026 The aptina-sensors developers
//! The operations every sensor driver supports.
use crate::format::FrameSize;

/// Which copy of the pad configuration an operation works on.
///
/// `Try` formats are scratch space for negotiating a format without touching the sensor, `Active`
/// is what the next stream-on will use.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FormatWhich {
    Try,
    Active,
}

/// A camera sensor on a capture pipeline.
pub trait Subdevice {
    type Error;

    /// Confirm the sensor is present, leaving it powered down.
    ///
    /// Call this once after constructing the driver.
    fn registered(&mut self) -> Result<(), Self::Error>;

    /// Take (`true`) or drop (`false`) a power reference.
    ///
    /// The sensor powers up on the first reference and down when the last one is dropped.
    fn set_power(&mut self, on: bool) -> Result<(), Self::Error>;

    /// Start or stop streaming. The sensor should be powered.
    fn set_stream(&mut self, enable: bool) -> Result<(), Self::Error>;

    /// The active output frame size.
    fn frame_size(&self) -> FrameSize;

    /// Request an output size, returning the size the sensor will actually produce.
    fn set_frame_size(&mut self, width: u32, height: u32) -> Result<FrameSize, Self::Error>;

    /// Stop streaming and drop a power reference.
    fn shutdown(&mut self) -> Result<(), Self::Error> {
        self.set_stream(false)?;
        self.set_power(false)
    }
}
