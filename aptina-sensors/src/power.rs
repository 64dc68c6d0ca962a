// SPDX-License-Identifier: Apache-2.0
// Copyright © 2026 The aptina-sensors developers
//! Board hooks and power bookkeeping.
//!
//! Sensors only touch the outside world through their I²C bus, a delay, and a
//! [`SensorPlatform`]: the board's external clock and reset line (and, on some boards, a power
//! rail switch). [`PlatformData`] carries the clock plan and sensor variant the board was built
//! with.
use embedded_hal::digital::v2::OutputPin;

use crate::error::LibraryError;

/// Requested power state for sensors with a tri-state power hook.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PowerState {
    Off,
    On,
    Standby,
}

/// Board support for a sensor.
///
/// The default implementations do nothing, for boards where the clock is free-running or the
/// reset line isn't wired up.
pub trait SensorPlatform {
    /// Set the external clock (EXTCLK) frequency in Hz. Zero stops the clock.
    fn set_xclk(&mut self, _frequency: u32) {}

    /// Drive the reset line. `true` holds the sensor in reset.
    fn set_reset(&mut self, _active: bool) {}

    /// Switch the sensor's supply rails.
    fn set_power(&mut self, _state: PowerState) {}
}

/// A platform without any controllable clock, reset or supply.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoPlatform;

impl SensorPlatform for NoPlatform {}

/// Reset line driven by a GPIO pin.
#[derive(Debug)]
pub struct GpioReset<P> {
    pin: P,
    active_low: bool,
}

impl<P: OutputPin> GpioReset<P> {
    /// The sensor's RESET_BAR input, held low while in reset.
    pub fn active_low(pin: P) -> Self {
        Self {
            pin,
            active_low: true,
        }
    }

    pub fn active_high(pin: P) -> Self {
        Self {
            pin,
            active_low: false,
        }
    }

    pub fn release(self) -> P {
        self.pin
    }
}

impl<P: OutputPin> SensorPlatform for GpioReset<P> {
    fn set_reset(&mut self, active: bool) {
        let result = if active != self.active_low {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        if result.is_err() {
            log::error!("unable to drive the sensor reset line");
        }
    }
}

/// Color or monochrome variant of a sensor.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SensorVersion {
    Color,
    Monochrome,
}

/// Board configuration for a sensor.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PlatformData {
    /// Frequency of the external clock the board feeds the sensor, in Hz.
    pub ext_freq: u32,

    /// Desired pixel clock, in Hz. Together with `ext_freq` this selects the PLL dividers.
    pub target_freq: u32,

    pub version: SensorVersion,
}

impl PlatformData {
    pub fn new(ext_freq: u32, target_freq: u32) -> Self {
        Self {
            ext_freq,
            target_freq,
            version: SensorVersion::Color,
        }
    }

    pub fn monochrome(self) -> Self {
        Self {
            version: SensorVersion::Monochrome,
            ..self
        }
    }

    pub fn is_monochrome(&self) -> bool {
        self.version == SensorVersion::Monochrome
    }
}

impl Default for PlatformData {
    /// A 24MHz crystal with a 48MHz pixel clock, the most common board setup.
    fn default() -> Self {
        Self::new(24_000_000, 48_000_000)
    }
}

/// Reference count for sensor power.
///
/// Only the edges matter to hardware: the first user powers the sensor up and the last one powers
/// it down. Drivers check [`is_off`][PowerCount::is_off] before powering up and only call
/// [`acquire`][PowerCount::acquire] once that succeeded, so a failed power-up leaves the count
/// untouched.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PowerCount(u32);

impl PowerCount {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn count(&self) -> u32 {
        self.0
    }

    pub fn is_off(&self) -> bool {
        self.0 == 0
    }

    /// Add a user. Returns `true` if this was the first one.
    pub fn acquire(&mut self) -> bool {
        self.0 = self.0.saturating_add(1);
        self.0 == 1
    }

    /// Remove a user. Returns `true` if this was the last one.
    pub fn release(&mut self) -> Result<bool, LibraryError> {
        if self.0 == 0 {
            log::warn!("sensor power released while already off");
            return Err(LibraryError::PowerUnderflow);
        }
        self.0 -= 1;
        Ok(self.0 == 0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn power_count_edges() {
        let mut count = PowerCount::new();
        assert!(count.is_off());
        assert!(count.acquire());
        assert!(!count.acquire());
        assert_eq!(count.count(), 2);
        assert_eq!(count.release(), Ok(false));
        assert_eq!(count.release(), Ok(true));
        assert!(count.is_off());
    }

    #[test]
    fn power_count_never_negative() {
        let mut count = PowerCount::new();
        assert_eq!(count.release(), Err(LibraryError::PowerUnderflow));
        assert_eq!(count.count(), 0);
        assert!(count.acquire());
    }

    #[test]
    fn platform_data() {
        let data = PlatformData::default();
        assert_eq!(data.ext_freq, 24_000_000);
        assert!(!data.is_monochrome());
        assert!(data.monochrome().is_monochrome());
    }
}
