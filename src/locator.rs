// SPDX-License-Identifier: MIT

//! Finds the Input Mode feature of a precision touchpad.
//!
//! A Windows Precision Touchpad declares a top-level Device Configuration
//! collection on the Digitizers page. Inside it, a Feature item whose last
//! Usage is Input Mode selects between mouse emulation and precision
//! reporting. This module locates that field without compiling the
//! report descriptor: it tracks just enough of the item state table
//! (Section 6.2.2.7) to know the report ID and size the field uses.
//!
//! The scan assumes the Input Mode usage occupies a Feature item by
//! itself. Push/Pop, Usage Minimum/Maximum, extended (four byte) Usages
//! and multiple usages per Feature item are not interpreted. Fields wider
//! than [MAX_FIELD_BITS] are rejected.

use crate::config::ConfigScope;
use crate::ensure;
use crate::item::{items, DecodeError, ItemTag};
use crate::types::*;
use crate::usages::{DEVICE_CONFIGURATION, DIGITIZERS, INPUT_MODE};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocateError {
    #[error("No Input Mode feature in a Device Configuration collection")]
    NotFound,
    #[error("Input Mode feature at offset {offset} is {} bits wide", .report_size.0)]
    FieldTooWide {
        report_size: ReportSize,
        offset: usize,
    },
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

type Result<T> = std::result::Result<T, LocateError>;

/// The widest Input Mode field accepted, in bits. The field holds a small
/// enumeration, anything wider is a broken descriptor.
pub const MAX_FIELD_BITS: u32 = 32;

/// The Input Mode feature field as found in the report descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputModeField {
    /// The report ID of the feature report carrying the field.
    pub report_id: ReportId,
    /// Width of the field in whole bytes, rounded up from the report size.
    pub byte_width: usize,
    /// The report size in bits as declared in the descriptor.
    pub report_size: ReportSize,
    /// The report count in effect for the field. Only informational,
    /// the field is assumed to be the sole member of its Feature item.
    pub report_count: ReportCount,
    /// Offset of the Feature item in the report descriptor.
    pub offset: usize,
}

/// The subset of the item state table the locator needs. Created per scan.
#[derive(Debug, Default)]
struct ScanState {
    depth: usize,
    usage_page: UsagePage,
    last_usage: UsageId,
    report_id: ReportId,
    report_size: ReportSize,
    report_count: ReportCount,
    in_config_collection: bool,
}

impl ScanState {
    fn open_collection(&mut self) {
        self.depth += 1;
        if self.depth == 1
            && self.usage_page == DIGITIZERS
            && self.last_usage == DEVICE_CONFIGURATION
        {
            self.in_config_collection = true;
        }
    }

    fn close_collection(&mut self, scope: ConfigScope) {
        self.depth = self.depth.saturating_sub(1);
        if scope == ConfigScope::Collection && self.depth == 0 {
            self.in_config_collection = false;
        }
    }

    fn is_input_mode(&self) -> bool {
        self.in_config_collection && self.last_usage == INPUT_MODE
    }
}

/// Find the Input Mode feature field with the [ConfigScope::Sticky] scope.
pub fn locate_input_mode(bytes: &[u8]) -> Result<InputModeField> {
    locate_input_mode_with(bytes, ConfigScope::default())
}

/// Find the first Feature item whose most recent Usage is Input Mode,
/// inside a top-level Digitizers Device Configuration collection.
///
/// With [ConfigScope::Sticky] any Feature item after the Device
/// Configuration collection was opened qualifies, even one in a later
/// collection. [ConfigScope::Collection] only accepts items before
/// that collection is closed.
pub fn locate_input_mode_with(bytes: &[u8], scope: ConfigScope) -> Result<InputModeField> {
    let mut state = ScanState::default();

    for item in items(bytes) {
        let item = item?;
        match item.tag() {
            ItemTag::Collection => state.open_collection(),
            ItemTag::EndCollection => state.close_collection(scope),
            ItemTag::UsagePage => state.usage_page = item.usage_page(),
            // an extended usage names its own page and never is Input Mode
            ItemTag::Usage if item.is_extended_usage() => state.last_usage = UsageId::default(),
            ItemTag::Usage => state.last_usage = item.usage_id(),
            ItemTag::ReportId => state.report_id = item.report_id(),
            ItemTag::ReportSize => state.report_size = item.report_size(),
            ItemTag::ReportCount => state.report_count = item.report_count(),
            ItemTag::Feature if state.is_input_mode() => {
                ensure!(
                    u32::from(state.report_size) <= MAX_FIELD_BITS,
                    LocateError::FieldTooWide {
                        report_size: state.report_size,
                        offset: item.offset(),
                    }
                );
                let field = InputModeField {
                    report_id: state.report_id,
                    byte_width: state.report_size.bytes(),
                    report_size: state.report_size,
                    report_count: state.report_count,
                    offset: item.offset(),
                };
                tracing::trace!(
                    report_id = %field.report_id,
                    byte_width = field.byte_width,
                    offset = field.offset,
                    "found input mode feature"
                );
                return Ok(field);
            }
            _ => {}
        }
    }

    Err(LocateError::NotFound)
}
