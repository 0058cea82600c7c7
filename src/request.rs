// SPDX-License-Identifier: MIT

//! The device request service the filter sits on.
//!
//! The host driver framework delivers HID minidriver control requests
//! identified by an [IoControlCode] and completes them with an
//! [IoStatus] and a byte count. The filter only needs to submit one kind
//! of request of its own (Set Feature), modelled by the [IoTarget] trait.

use async_trait::async_trait;
use thiserror::Error;

/// HID minidriver control requests, as seen by a filter below the HID class
/// driver. Codes this crate has no name for are kept as [IoControlCode::Other].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoControlCode {
    GetDeviceDescriptor,
    GetDeviceAttributes,
    GetReportDescriptor,
    ReadReport,
    WriteReport,
    GetFeature,
    SetFeature,
    GetInputReport,
    SetOutputReport,
    UmdfGetFeature,
    UmdfSetFeature,
    UmdfGetInputReport,
    UmdfSetOutputReport,
    GetString,
    GetIndexedString,
    SendIdleNotificationRequest,
    ActivateDevice,
    DeactivateDevice,
    GetPhysicalDescriptor,
    Other(u32),
}

impl IoControlCode {
    pub fn name(&self) -> &'static str {
        match self {
            IoControlCode::GetDeviceDescriptor => "IOCTL_HID_GET_DEVICE_DESCRIPTOR",
            IoControlCode::GetDeviceAttributes => "IOCTL_HID_GET_DEVICE_ATTRIBUTES",
            IoControlCode::GetReportDescriptor => "IOCTL_HID_GET_REPORT_DESCRIPTOR",
            IoControlCode::ReadReport => "IOCTL_HID_READ_REPORT",
            IoControlCode::WriteReport => "IOCTL_HID_WRITE_REPORT",
            IoControlCode::GetFeature => "IOCTL_HID_GET_FEATURE",
            IoControlCode::SetFeature => "IOCTL_HID_SET_FEATURE",
            IoControlCode::GetInputReport => "IOCTL_HID_GET_INPUT_REPORT",
            IoControlCode::SetOutputReport => "IOCTL_HID_SET_OUTPUT_REPORT",
            IoControlCode::UmdfGetFeature => "IOCTL_UMDF_HID_GET_FEATURE",
            IoControlCode::UmdfSetFeature => "IOCTL_UMDF_HID_SET_FEATURE",
            IoControlCode::UmdfGetInputReport => "IOCTL_UMDF_HID_GET_INPUT_REPORT",
            IoControlCode::UmdfSetOutputReport => "IOCTL_UMDF_HID_SET_OUTPUT_REPORT",
            IoControlCode::GetString => "IOCTL_HID_GET_STRING",
            IoControlCode::GetIndexedString => "IOCTL_HID_GET_INDEXED_STRING",
            IoControlCode::SendIdleNotificationRequest => {
                "IOCTL_HID_SEND_IDLE_NOTIFICATION_REQUEST"
            }
            IoControlCode::ActivateDevice => "IOCTL_HID_ACTIVATE_DEVICE",
            IoControlCode::DeactivateDevice => "IOCTL_HID_DEACTIVATE_DEVICE",
            IoControlCode::GetPhysicalDescriptor => "IOCTL_GET_PHYSICAL_DESCRIPTOR",
            IoControlCode::Other(_) => "<unknown ioctl>",
        }
    }
}

impl std::fmt::Display for IoControlCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Final status of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoStatus {
    Success,
    /// Failed with a platform status code the filter does not interpret.
    Failed(u32),
}

impl IoStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, IoStatus::Success)
    }
}

impl std::fmt::Display for IoStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IoStatus::Success => write!(f, "success"),
            IoStatus::Failed(code) => write!(f, "failed ({code:#010x})"),
        }
    }
}

/// What a completed request reports back: its status and the number of
/// bytes transferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub status: IoStatus,
    pub information: usize,
}

/// A request the filter submits on its own. The buffer is owned by the
/// request and released together with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRequest {
    pub code: IoControlCode,
    pub buffer: Vec<u8>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("No async runtime to submit the request on")]
    NoRuntime,
    #[error("Request rejected by the target: {0}")]
    Rejected(IoStatus),
    #[error("Request task aborted: {message}")]
    Aborted { message: String },
}

/// The lower device, i.e. the real touchpad driver. Requests sent here
/// bypass the filter.
///
/// `send` resolves once the request completes. An `Err` means the target
/// never accepted the request, a failed request that was accepted
/// resolves to a [Completion] with [IoStatus::Failed].
#[async_trait]
pub trait IoTarget: Send + Sync {
    async fn send(&self, request: DeviceRequest) -> Result<Completion, SubmitError>;
}
