// SPDX-License-Identifier: Apache-2.0
// Copyright © 2026 The aptina-sensors developers
//! Sensor controls and the cache that replays them after power-up.
//!
//! Control values are kept in the driver so they survive the sensor being powered down: each
//! driver writes the cached values back to the hardware when it powers up again.
use arrayvec::ArrayVec;
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::error::LibraryError;

/// Control identifiers, numbered as the V4L2 control IDs they correspond to.
#[derive(
    Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, IntoPrimitive, TryFromPrimitive,
)]
#[repr(u32)]
pub enum ControlId {
    Exposure = 0x0098_0911,
    Gain = 0x0098_0913,
    HorizontalFlip = 0x0098_0914,
    VerticalFlip = 0x0098_0915,
    TestPattern = 0x0098_1901,
    GainRed = 0x0098_1902,
    GainGreen1 = 0x0098_1903,
    GainGreen2 = 0x0098_1904,
    GainBlue = 0x0098_1905,
    /// Column (analog) gain.
    AnalogGain = 0x0098_1906,
    ExposureAuto = 0x009a_0901,
    PanAbsolute = 0x009a_0908,
    ZoomAbsolute = 0x009a_090d,
}

/// Auto-exposure modes, numbered as V4L2's `v4l2_exposure_auto_type`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(u32)]
pub enum AutoExposureMode {
    Auto = 0,
    Manual = 1,
    ShutterPriority = 2,
    AperturePriority = 3,
}

/// The limits of an integer or menu control.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ControlRange {
    pub min: i32,
    pub max: i32,
    pub step: i32,
    pub default: i32,
}

impl ControlRange {
    pub const fn new(min: i32, max: i32, step: i32, default: i32) -> Self {
        Self {
            min,
            max,
            step,
            default,
        }
    }

    /// An on/off control, defaulting to off.
    pub const fn boolean() -> Self {
        Self::new(0, 1, 1, 0)
    }

    /// A menu with `entries` items.
    pub const fn menu(entries: i32, default: i32) -> Self {
        Self::new(0, entries - 1, 1, default)
    }

    /// Clamp to the range and round to the nearest step.
    pub fn clamp(&self, value: i32) -> i32 {
        let value = value.clamp(self.min, self.max);
        if self.step > 1 {
            let offset = value - self.min;
            let rounded = self.min + (offset + self.step / 2) / self.step * self.step;
            rounded.min(self.max)
        } else {
            value
        }
    }

    pub fn contains(&self, value: i32) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct Control {
    id: ControlId,
    kind: ControlKind,
    range: ControlRange,
    value: i32,
}

/// Integer controls are clamped, menu values outside the menu are rejected.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ControlKind {
    Integer,
    Menu,
}

/// The set of controls a driver exposes, with their current values.
///
/// Controls are kept sorted by ID, which is also the order they are replayed in.
#[derive(Clone, Debug, Default)]
pub struct ControlCache<const N: usize> {
    controls: ArrayVec<Control, N>,
}

impl<const N: usize> ControlCache<N> {
    pub fn new() -> Self {
        Self {
            controls: ArrayVec::new(),
        }
    }

    fn add(&mut self, id: ControlId, kind: ControlKind, range: ControlRange) -> &mut Self {
        let control = Control {
            id,
            kind,
            range,
            value: range.default,
        };
        match self.controls.binary_search_by_key(&id, |c| c.id) {
            Ok(index) => self.controls[index] = control,
            Err(index) => {
                if self.controls.try_insert(index, control).is_err() {
                    log::error!("no room for control {:?}", id);
                }
            }
        }
        self
    }

    pub fn add_integer(&mut self, id: ControlId, range: ControlRange) -> &mut Self {
        self.add(id, ControlKind::Integer, range)
    }

    pub fn add_menu(&mut self, id: ControlId, range: ControlRange) -> &mut Self {
        self.add(id, ControlKind::Menu, range)
    }

    fn find(&self, id: ControlId) -> Option<&Control> {
        self.controls
            .binary_search_by_key(&id, |c| c.id)
            .ok()
            .map(|index| &self.controls[index])
    }

    fn find_mut(&mut self, id: ControlId) -> Option<&mut Control> {
        match self.controls.binary_search_by_key(&id, |c| c.id) {
            Ok(index) => Some(&mut self.controls[index]),
            Err(_) => None,
        }
    }

    /// The current value of a control.
    pub fn get(&self, id: ControlId) -> Option<i32> {
        self.find(id).map(|c| c.value)
    }

    pub fn range(&self, id: ControlId) -> Option<ControlRange> {
        self.find(id).map(|c| c.range)
    }

    /// Change the limits of a control, for limits that depend on the sensor mode.
    ///
    /// The current value is left alone even if it is now out of range.
    pub fn set_limits(&mut self, id: ControlId, min: i32, max: i32) {
        if let Some(control) = self.find_mut(id) {
            control.range.min = min;
            control.range.max = max;
        }
    }

    /// Check a new value against a control's range.
    ///
    /// Returns the value that should be applied to the hardware, but doesn't store it; call
    /// [`commit`][ControlCache::commit] once the hardware accepted it.
    pub fn validate(&self, id: ControlId, value: i32) -> Result<i32, LibraryError> {
        let control = self
            .find(id)
            .ok_or(LibraryError::InvalidArgument("unsupported control"))?;
        match control.kind {
            ControlKind::Integer => Ok(control.range.clamp(value)),
            ControlKind::Menu if control.range.contains(value) => Ok(value),
            ControlKind::Menu => Err(LibraryError::OutOfRange("menu index")),
        }
    }

    /// Store a value that has been applied to the hardware.
    pub fn commit(&mut self, id: ControlId, value: i32) {
        if let Some(control) = self.find_mut(id) {
            control.value = value;
        }
    }

    /// A copy of every control and its current value, in ID order.
    pub fn values(&self) -> ArrayVec<(ControlId, i32), N> {
        self.controls.iter().map(|c| (c.id, c.value)).collect()
    }
}

/// MT9M0xx test pattern menu. The menu index selects the register value.
pub const TEST_PATTERN_VALUES: [u16; 5] = [0, 1, 2, 3, 256];

#[cfg(test)]
mod test {
    use super::*;

    fn cache() -> ControlCache<4> {
        let mut cache = ControlCache::new();
        cache
            .add_integer(ControlId::Gain, ControlRange::new(0, 0xFF, 1, 0x20))
            .add_integer(ControlId::Exposure, ControlRange::new(1, 0x2A0, 1, 0x100))
            .add_menu(ControlId::ExposureAuto, ControlRange::menu(4, 2))
            .add_integer(ControlId::ZoomAbsolute, ControlRange::new(0, 16, 2, 0));
        cache
    }

    #[test]
    fn defaults() {
        let cache = cache();
        assert_eq!(cache.get(ControlId::Gain), Some(0x20));
        assert_eq!(cache.get(ControlId::Exposure), Some(0x100));
        assert_eq!(cache.get(ControlId::VerticalFlip), None);
    }

    #[test]
    fn sorted_by_id() {
        let ids: ArrayVec<ControlId, 4> = cache().values().iter().map(|(id, _)| *id).collect();
        assert_eq!(
            &ids[..],
            &[
                ControlId::Exposure,
                ControlId::Gain,
                ControlId::ExposureAuto,
                ControlId::ZoomAbsolute
            ]
        );
    }

    #[test]
    fn integers_clamp() {
        let cache = cache();
        assert_eq!(cache.validate(ControlId::Gain, 0x1FF), Ok(0xFF));
        assert_eq!(cache.validate(ControlId::Exposure, 0), Ok(1));
        assert_eq!(cache.validate(ControlId::ZoomAbsolute, 3), Ok(4));
        assert_eq!(cache.validate(ControlId::ZoomAbsolute, 5), Ok(6));
    }

    #[test]
    fn menus_reject() {
        let cache = cache();
        assert_eq!(cache.validate(ControlId::ExposureAuto, 1), Ok(1));
        assert!(matches!(
            cache.validate(ControlId::ExposureAuto, 4),
            Err(LibraryError::OutOfRange(_))
        ));
        assert!(matches!(
            cache.validate(ControlId::HorizontalFlip, 1),
            Err(LibraryError::InvalidArgument(_))
        ));
    }

    #[test]
    fn commit_and_limits() {
        let mut cache = cache();
        cache.commit(ControlId::Gain, 0x40);
        assert_eq!(cache.get(ControlId::Gain), Some(0x40));
        cache.set_limits(ControlId::Exposure, 10, 20);
        assert_eq!(cache.validate(ControlId::Exposure, 100), Ok(20));
        assert_eq!(cache.range(ControlId::Exposure).map(|r| r.min), Some(10));
    }
}
