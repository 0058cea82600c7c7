// SPDX-License-Identifier: MIT

//! Present a Windows Precision Touchpad as a touch screen.
//!
//! This crate is the report descriptor side of a HID filter driver that sits
//! between the HID class driver and a precision touchpad's driver. When the
//! touchpad's report descriptor passes through the filter, its top-level
//! Touch Pad usage is rewritten into a Touch Screen usage so the stock
//! multitouch digitizer stack takes over. The touchpad is then switched
//! from mouse emulation into precision mode by writing its Input Mode
//! feature, something the host only does for devices it believes are
//! touchpads.
//!
//! The pieces, bottom up:
//! - [item]: a streaming decoder for HID short items
//! - [locator]: finds the Input Mode feature field
//! - [rewriter]: rewrites the Touch Pad usage in place
//! - [dispatch]: sends the Input Mode feature report
//! - [filter]: ties the above to the requests passing through the filter
//!
//! ```
//! use padscreen::rewriter::patch_report_descriptor;
//!
//! let mut rdesc = [0x05, 0x0d, 0x09, 0x05, 0xa1, 0x01, 0xc0];
//! assert!(patch_report_descriptor(&mut rdesc));
//! assert_eq!(rdesc, [0x05, 0x0d, 0x09, 0x04, 0xa1, 0x01, 0xc0]);
//! ```
//!
//! Driver lifecycle, the request queue and the transport to the device
//! belong to the host framework. They reach this crate as a
//! [ForwardedCompletion](filter::ForwardedCompletion) and an
//! [IoTarget](request::IoTarget).

use thiserror::Error;

pub mod config;
pub mod dispatch;
pub mod filter;
pub mod item;
pub mod locator;
pub mod request;
pub mod rewriter;
pub mod types;
pub mod usages;

pub use config::{ConfigScope, FilterConfig};
pub use filter::{Filtered, ForwardedCompletion, ReportDescriptorFilter};
pub use request::{Completion, DeviceRequest, IoControlCode, IoStatus, IoTarget};
pub use types::*;

/// Return early with the given error if the condition does not hold.
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !$cond {
            return Err($err);
        }
    };
}

pub(crate) use ensure;

/// All errors this crate may return, for callers that prefer a single type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Decode(#[from] item::DecodeError),
    #[error(transparent)]
    Locate(#[from] locator::LocateError),
    #[error(transparent)]
    Dispatch(#[from] dispatch::DispatchError),
    #[error(transparent)]
    Submit(#[from] request::SubmitError),
}

pub type Result<T> = std::result::Result<T, Error>;
