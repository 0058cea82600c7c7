// SPDX-License-Identifier: MIT

//! The handful of HID Usage Table entries this crate cares about, all on the
//! Digitizers page (0x0D).
//!
//! See the [HID Usage Tables](https://usb.org/document-library/hid-usage-tables-15),
//! Section 16 and the Windows Precision Touchpad collection requirements.

use crate::types::{UsageId, UsagePage};

/// Digitizers usage page.
pub const DIGITIZERS: UsagePage = UsagePage(0x0d);

/// Touch Screen application collection.
pub const TOUCH_SCREEN: UsageId = UsageId(0x04);

/// Touch Pad application collection.
pub const TOUCH_PAD: UsageId = UsageId(0x05);

/// Device Configuration application collection. A precision touchpad
/// declares its Input Mode feature inside this collection.
pub const DEVICE_CONFIGURATION: UsageId = UsageId(0x0e);

/// Input Mode feature ("Device Mode" in the usage tables). Writing
/// [InputMode::Touchpad] switches a touchpad from mouse emulation to
/// precision reporting.
pub const INPUT_MODE: UsageId = UsageId(0x52);

/// Values accepted by the [INPUT_MODE] feature.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum InputMode {
    /// Mouse emulation, the mode a touchpad powers up in.
    Mouse = 0,
    /// Precision touchpad reporting.
    #[default]
    Touchpad = 3,
}

impl From<InputMode> for u8 {
    fn from(mode: InputMode) -> u8 {
        mode as u8
    }
}
