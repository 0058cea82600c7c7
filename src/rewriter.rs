// SPDX-License-Identifier: MIT

//! Rewrites the top-level Touch Pad usage of a report descriptor into a
//! Touch Screen usage.
//!
//! Only Usage items outside of any collection are considered, i.e. the
//! usages that declare what a top-level (application) collection is.
//! Usages inside a collection are never touched. The rewrite replaces a
//! single data byte per match, the length of the descriptor and every
//! header byte stay the same.
//!
//! Touch screens require the In Range and Contact Count Maximum usages
//! that touchpads may omit. The OS digitizer stack currently treats them
//! as optional, so no attempt is made to add them.

use crate::item::{items, DecodeError, ItemTag};
use crate::types::UsagePage;
use crate::usages::{DIGITIZERS, TOUCH_PAD, TOUCH_SCREEN};

type Result<T> = std::result::Result<T, DecodeError>;

/// Return the offsets of the data bytes holding a top-level Digitizers
/// Touch Pad usage, in descriptor order. The descriptor is not modified.
pub fn find_touchpad_usages(bytes: &[u8]) -> Result<Vec<usize>> {
    let mut depth: usize = 0;
    let mut usage_page = UsagePage::default();
    let mut offsets = Vec::new();

    for item in items(bytes) {
        let item = item?;
        match item.tag() {
            ItemTag::Collection => depth += 1,
            ItemTag::EndCollection => depth = depth.saturating_sub(1),
            ItemTag::UsagePage => usage_page = item.usage_page(),
            ItemTag::Usage if depth == 0 && !item.is_extended_usage() => {
                if usage_page == DIGITIZERS && item.usage_id() == TOUCH_PAD {
                    offsets.push(item.data_offset());
                }
            }
            _ => {}
        }
    }

    Ok(offsets)
}

/// Replace every top-level Digitizers Touch Pad usage with Touch Screen and
/// return the number of usages replaced.
///
/// The whole descriptor is decoded before the first byte is written. If
/// decoding fails the descriptor is left untouched.
pub fn rewrite_touchpad_usages(bytes: &mut [u8]) -> Result<usize> {
    let offsets = find_touchpad_usages(bytes)?;
    let touch_screen = (u16::from(TOUCH_SCREEN) & 0xff) as u8;
    for &offset in &offsets {
        // a one or two byte Usage, the upper byte of Touch Pad is zero
        bytes[offset] = touch_screen;
    }
    Ok(offsets.len())
}

/// Rewrite the descriptor in place, see [rewrite_touchpad_usages()].
/// Returns `true` if at least one usage was replaced. A descriptor that
/// fails to decode is reported as not rewritten.
pub fn patch_report_descriptor(bytes: &mut [u8]) -> bool {
    match rewrite_touchpad_usages(bytes) {
        Ok(count) => count > 0,
        Err(e) => {
            tracing::debug!(error = %e, "report descriptor not rewritten");
            false
        }
    }
}
