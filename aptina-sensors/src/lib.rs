// SPDX-License-Identifier: Apache-2.0
// Copyright © 2026 The aptina-sensors developers
//! Drivers for Aptina (formerly Micron) image sensors, controlled over I²C.
//!
//! Each sensor gets its own driver: the [`Mt9m034`][mt9m0xx::Mt9m034] and
//! [`Mt9m021`][mt9m0xx::Mt9m021] 1.2 MP sensors, the [`Mt9p006`][mt9p006::Mt9p006] and
//! [`Mt9p015`][mt9p015::Mt9p015] 5 MP sensors, the [`Mt9v128`][mt9v128::Mt9v128] and
//! [`Mt9d131`][mt9d131::Mt9d131] system-on-chip sensors, and the [`Ap0100`][ap0100::Ap0100]
//! co-processor. The drivers only handle the control bus: powering the sensor up and down,
//! choosing output sizes and clocks, and starting and stopping the pixel stream. Getting the
//! pixels themselves is up to the capture hardware.
//!
//! This library uses the [`embedded-hal`][embedded-hal] I²C and delay traits, so it should work
//! anywhere there's an `embedded-hal` implementation available. Board-level control of the
//! sensor's power, reset line and clock is handled through [`SensorPlatform`]. The library is
//! `no_std` compatible.
//!
//! [embedded-hal]: https://docs.rs/embedded-hal/*/embedded_hal/blocking/i2c/index.html
//!
//! # Example
//! ```no_run
//! use aptina_sensors::mt9m0xx::Mt9m034Driver;
//! use aptina_sensors::{NoPlatform, PlatformData, Subdevice};
//! use linux_embedded_hal::{Delay, I2cdev};
//!
//! let i2c_bus = I2cdev::new("/dev/i2c-1").expect("/dev/i2c-1 needs to be an I2C controller");
//! // A 24MHz clock and 48MHz pixel clock, at the default address of 0x10
//! let mut sensor = Mt9m034Driver::new(i2c_bus, Delay, NoPlatform, PlatformData::default());
//! sensor.registered()?;
//! sensor.set_power(true)?;
//! let size = sensor.set_frame_size(1280, 720)?;
//! sensor.set_stream(true)?;
//! println!("Streaming {}x{}", size.width, size.height);
//! # Ok::<(), aptina_sensors::Error<I2cdev>>(())
//! ```
//!
//! # Common operations
//! Every driver implements [`Subdevice`], covering power, streaming and the output size. Power is
//! reference counted on most sensors: the sensor powers up on the first `set_power(true)` and
//! down on the matching last `set_power(false)`. Controls such as exposure and gain are cached by
//! the drivers, so they can be set while the sensor is off and are written when it powers up.
//!
//! Drivers also implement [`RegisterDebug`], for reading and writing raw registers. The
//! [`debug`] module has helpers for building a text interface on top of it.

#![no_std]

pub mod bus;
pub mod controls;
pub mod debug;
#[doc(hidden)]
pub mod error;
pub mod format;
pub mod pll;
pub mod power;
pub mod register;
pub mod subdev;
mod util;

pub mod ap0100;
pub mod mt9d131;
pub mod mt9m0xx;
pub mod mt9p006;
pub mod mt9p015;
pub mod mt9v128;

#[cfg(test)]
mod test;

pub use controls::{ControlId, ControlRange};
#[doc(inline)]
pub use debug::RegisterDebug;
#[doc(inline)]
pub use error::{Error, LibraryError};
pub use format::{Fract, FrameSize, MbusCode, MbusFramefmt, PixFormat, PixelFormat, Rect};
pub use power::{GpioReset, NoPlatform, PlatformData, PowerState, SensorPlatform};
#[doc(inline)]
pub use subdev::{FormatWhich, Subdevice};
