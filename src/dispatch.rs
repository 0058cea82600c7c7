// SPDX-License-Identifier: MIT

//! Switches a precision touchpad from mouse emulation into precision mode.
//!
//! A precision touchpad powers up in mouse emulation and expects the host
//! to write its Input Mode feature. Once the descriptor claims to be a
//! touch screen the host never does, so the filter sends that feature
//! report itself.
//!
//! The request is fire-and-forget: [switch_input_mode()] returns as soon as
//! the request is spawned, the outcome is logged when it completes. There
//! is no timeout, retry or cancellation. If it fails the touchpad stays in
//! mouse emulation.

use std::sync::Arc;

use crate::config::FilterConfig;
use crate::item::DecodeError;
use crate::locator::{locate_input_mode_with, InputModeField, LocateError, MAX_FIELD_BITS};
use crate::request::{Completion, DeviceRequest, IoControlCode, IoTarget, SubmitError};
use crate::types::{ReportId, ReportSize};
use crate::usages::InputMode;

use thiserror::Error;
use tokio::task::JoinHandle;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Input Mode feature not found")]
    NotFound,
    #[error("Input Mode feature at offset {offset} is {} bits wide", .report_size.0)]
    FieldTooWide {
        report_size: ReportSize,
        offset: usize,
    },
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("Set Feature submission failed: {0}")]
    Submission(#[from] SubmitError),
}

impl From<LocateError> for DispatchError {
    fn from(e: LocateError) -> DispatchError {
        match e {
            LocateError::NotFound => DispatchError::NotFound,
            LocateError::FieldTooWide {
                report_size,
                offset,
            } => DispatchError::FieldTooWide {
                report_size,
                offset,
            },
            LocateError::Decode(e) => DispatchError::Decode(e),
        }
    }
}

type Result<T> = std::result::Result<T, DispatchError>;

/// The Set Feature report that writes the Input Mode: the report ID
/// followed by the field, zero-padded to the field's byte width.
///
/// ```
/// # use padscreen::dispatch::ModeSwitchReport;
/// # use padscreen::locator::locate_input_mode;
/// # use padscreen::usages::InputMode;
/// let rdesc = [
///     0x05, 0x0d, 0x09, 0x0e, 0xa1, 0x01, 0x85, 0x03,
///     0x75, 0x10, 0x09, 0x52, 0xb1, 0x02, 0xc0,
/// ];
/// let field = locate_input_mode(&rdesc).unwrap();
/// let report = ModeSwitchReport::new(&field, InputMode::Touchpad);
/// assert_eq!(report.as_bytes(), [0x03, 0x03, 0x00]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeSwitchReport(Vec<u8>);

impl ModeSwitchReport {
    /// The field is assumed to be the first (and only) field of its
    /// report. A field declared with a Report Size of zero still gets
    /// one byte, the width is capped at [MAX_FIELD_BITS].
    pub fn new(field: &InputModeField, mode: InputMode) -> Self {
        let width = field.byte_width.clamp(1, MAX_FIELD_BITS as usize / 8);
        let mut bytes = vec![0u8; width + 1];
        bytes[0] = u8::from(field.report_id);
        bytes[1] = u8::from(mode);
        ModeSwitchReport(bytes)
    }

    pub fn report_id(&self) -> ReportId {
        ReportId(self.0[0])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

/// Handle to an in-flight mode switch. Dropping it detaches the request,
/// it still runs to completion. There is no way to cancel it.
#[derive(Debug)]
pub struct ModeSwitch {
    report_id: ReportId,
    handle: JoinHandle<std::result::Result<Completion, SubmitError>>,
}

impl ModeSwitch {
    pub fn report_id(&self) -> ReportId {
        self.report_id
    }

    /// Wait for the Set Feature request to complete. The outcome has
    /// already been logged, this is for callers that want to know.
    pub async fn completion(self) -> std::result::Result<Completion, SubmitError> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => Err(SubmitError::Aborted {
                message: e.to_string(),
            }),
        }
    }
}

async fn send_set_feature(
    target: Arc<dyn IoTarget>,
    report: ModeSwitchReport,
) -> std::result::Result<Completion, SubmitError> {
    let report_id = report.report_id();
    let request = DeviceRequest {
        code: IoControlCode::SetFeature,
        buffer: report.into_bytes(),
    };
    let result = target.send(request).await;
    match &result {
        Ok(completion) if completion.status.is_success() => {
            tracing::debug!(
                report_id = %report_id,
                bytes = completion.information,
                "{} completed",
                IoControlCode::SetFeature
            );
        }
        Ok(completion) => {
            tracing::error!(
                report_id = %report_id,
                status = %completion.status,
                "{} failed",
                IoControlCode::SetFeature
            );
        }
        Err(e) => {
            tracing::error!(
                report_id = %report_id,
                error = %e,
                "{} not submitted",
                IoControlCode::SetFeature
            );
        }
    }
    result
}

/// Locate the Input Mode feature in the (already rewritten) descriptor and
/// send the Set Feature report selecting `config.input_mode` to `target`.
///
/// Returns once the request is spawned on the current tokio runtime. Only
/// failures before that point are returned as errors.
pub fn switch_input_mode(
    target: Arc<dyn IoTarget>,
    descriptor: &[u8],
    config: &FilterConfig,
) -> Result<ModeSwitch> {
    let field = locate_input_mode_with(descriptor, config.config_scope)?;
    let report = ModeSwitchReport::new(&field, config.input_mode);
    let report_id = report.report_id();

    let runtime = tokio::runtime::Handle::try_current().map_err(|_| SubmitError::NoRuntime)?;
    tracing::trace!(report_id = %report_id, bytes = ?report.as_bytes(), "sending input mode");
    let handle = runtime.spawn(send_set_feature(target, report));

    Ok(ModeSwitch { report_id, handle })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::IoStatus;
    use crate::types::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingTarget {
        sent: Mutex<Vec<DeviceRequest>>,
        status: Option<IoStatus>,
    }

    #[async_trait]
    impl IoTarget for RecordingTarget {
        async fn send(
            &self,
            request: DeviceRequest,
        ) -> std::result::Result<Completion, SubmitError> {
            let information = request.buffer.len();
            self.sent
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(request);
            match self.status {
                None => Err(SubmitError::Rejected(IoStatus::Failed(0xc0000010))),
                Some(status) => Ok(Completion {
                    status,
                    information,
                }),
            }
        }
    }

    #[rustfmt::skip]
    const CONFIG_COLLECTION: [u8; 17] = [
        0x05, 0x0d,                    // Usage Page (Digitizers)
        0x09, 0x0e,                    // Usage (Device Configuration)
        0xa1, 0x01,                    // Collection (Application)
        0x85, 0x05,                    //   Report ID (5)
        0x75, 0x02,                    //   Report Size (2)
        0x95, 0x01,                    //   Report Count (1)
        0x09, 0x52,                    //   Usage (Device Mode)
        0xb1, 0x02,                    //   Feature (Data,Var,Abs)
        0xc0,                          // End Collection
    ];

    fn field(report_id: u8, byte_width: usize) -> InputModeField {
        InputModeField {
            report_id: ReportId(report_id),
            byte_width,
            report_size: ReportSize(byte_width as u32 * 8),
            report_count: ReportCount(1),
            offset: 0,
        }
    }

    #[test]
    fn report_layout() {
        let report = ModeSwitchReport::new(&field(5, 1), InputMode::Touchpad);
        assert_eq!(report.as_bytes(), [0x05, 0x03]);
        assert_eq!(report.report_id(), ReportId(5));

        let report = ModeSwitchReport::new(&field(3, 4), InputMode::Touchpad);
        assert_eq!(report.as_bytes(), [0x03, 0x03, 0x00, 0x00, 0x00]);

        let report = ModeSwitchReport::new(&field(9, 0), InputMode::Mouse);
        assert_eq!(report.as_bytes(), [0x09, 0x00]);

        let report = ModeSwitchReport::new(&field(2, 1 << 29), InputMode::Touchpad);
        assert_eq!(report.as_bytes(), [0x02, 0x03, 0x00, 0x00, 0x00]);
    }

    #[tokio::test]
    async fn oversized_field_sends_nothing() {
        let target = Arc::new(RecordingTarget {
            status: Some(IoStatus::Success),
            ..Default::default()
        });
        #[rustfmt::skip]
        let rdesc = [
            0x05, 0x0d,                    // Usage Page (Digitizers)
            0x09, 0x0e,                    // Usage (Device Configuration)
            0xa1, 0x01,                    // Collection (Application)
            0x85, 0x03,                    //   Report ID (3)
            0x77, 0xff, 0xff, 0xff, 0xff,  //   Report Size (4294967295)
            0x09, 0x52,                    //   Usage (Device Mode)
            0xb1, 0x02,                    //   Feature (Data,Var,Abs)
            0xc0,                          // End Collection
        ];
        let result = switch_input_mode(target.clone(), &rdesc, &FilterConfig::default());
        assert_eq!(
            result.err(),
            Some(DispatchError::FieldTooWide {
                report_size: ReportSize(u32::MAX),
                offset: 15,
            })
        );
        assert!(target.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn sends_set_feature() {
        let target = Arc::new(RecordingTarget {
            status: Some(IoStatus::Success),
            ..Default::default()
        });
        let switch =
            switch_input_mode(target.clone(), &CONFIG_COLLECTION, &FilterConfig::default())
                .unwrap();
        assert_eq!(switch.report_id(), ReportId(5));
        let completion = switch.completion().await.unwrap();
        assert_eq!(completion.status, IoStatus::Success);
        assert_eq!(completion.information, 2);

        let sent = target.sent.lock().unwrap();
        assert_eq!(
            *sent,
            [DeviceRequest {
                code: IoControlCode::SetFeature,
                buffer: vec![0x05, 0x03],
            }]
        );
    }

    #[tokio::test]
    async fn failed_completion_is_reported() {
        let target = Arc::new(RecordingTarget {
            status: Some(IoStatus::Failed(0xc00000bb)),
            ..Default::default()
        });
        let switch =
            switch_input_mode(target, &CONFIG_COLLECTION, &FilterConfig::default()).unwrap();
        let completion = switch.completion().await.unwrap();
        assert_eq!(completion.status, IoStatus::Failed(0xc00000bb));
    }

    #[tokio::test]
    async fn rejected_submission() {
        let target = Arc::new(RecordingTarget::default());
        let switch =
            switch_input_mode(target, &CONFIG_COLLECTION, &FilterConfig::default()).unwrap();
        assert_eq!(
            switch.completion().await,
            Err(SubmitError::Rejected(IoStatus::Failed(0xc0000010)))
        );
    }

    #[tokio::test]
    async fn not_found_sends_nothing() {
        let target = Arc::new(RecordingTarget {
            status: Some(IoStatus::Success),
            ..Default::default()
        });
        let rdesc = [0x05, 0x0d, 0x09, 0x05, 0xa1, 0x01, 0xc0];
        let result = switch_input_mode(target.clone(), &rdesc, &FilterConfig::default());
        assert!(matches!(result, Err(DispatchError::NotFound)));
        assert!(target.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn no_runtime() {
        let target = Arc::new(RecordingTarget::default());
        let result = switch_input_mode(target, &CONFIG_COLLECTION, &FilterConfig::default());
        assert!(matches!(
            result,
            Err(DispatchError::Submission(SubmitError::NoRuntime))
        ));
    }
}
