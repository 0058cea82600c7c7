// SPDX-License-Identifier: MIT

//! The filter itself: sits between the HID class driver and the touchpad's
//! driver and rewrites the report descriptor on its way up.
//!
//! Every request completed by the lower driver passes through
//! [ReportDescriptorFilter::on_completion()]. Only a successful Get Report
//! Descriptor is looked at. If its descriptor declares a top-level touch
//! pad, the descriptor is rewritten to declare a touch screen and the
//! touchpad is switched to precision mode. The caller always receives the
//! original status and byte count.

use std::sync::Arc;

use crate::config::FilterConfig;
use crate::dispatch::{switch_input_mode, ModeSwitch};
use crate::request::{Completion, IoControlCode, IoStatus, IoTarget};
use crate::rewriter::patch_report_descriptor;

/// A request completed by the lower driver, before it is handed back to
/// the caller. The output buffer is writable.
#[derive(Debug)]
pub struct ForwardedCompletion<'a> {
    pub code: IoControlCode,
    pub status: IoStatus,
    /// The request's whole output buffer.
    pub output: &'a mut [u8],
    /// Where in `output` the data starts.
    pub offset: usize,
    /// Number of bytes the lower driver wrote at `offset`.
    pub information: usize,
}

impl ForwardedCompletion<'_> {
    fn completion(&self) -> Completion {
        Completion {
            status: self.status,
            information: self.information,
        }
    }
}

/// What the filter did with a forwarded completion.
#[derive(Debug)]
pub struct Filtered {
    /// To be completed to the caller, always the lower driver's status and
    /// byte count.
    pub completion: Completion,
    /// Whether the report descriptor was rewritten.
    pub rewritten: bool,
    /// The mode switch sent after a rewrite, if any. May be dropped.
    pub mode_switch: Option<ModeSwitch>,
}

/// The report descriptor filter of one device. It holds no per-request
/// state, a single instance may process completions concurrently.
#[derive(Debug, Clone, Default)]
pub struct ReportDescriptorFilter {
    config: FilterConfig,
}

impl ReportDescriptorFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Process a request completed by `target`, the lower driver.
    pub fn on_completion(
        &self,
        target: &Arc<dyn IoTarget>,
        forwarded: ForwardedCompletion<'_>,
    ) -> Filtered {
        let code = forwarded.code;
        tracing::trace!(code = %code, status = %forwarded.status, "request completed");

        let filtered = self.filter_completion(target, forwarded);

        tracing::trace!(
            code = %code,
            status = %filtered.completion.status,
            information = filtered.completion.information,
            rewritten = filtered.rewritten,
            mode_switch = filtered.mode_switch.is_some(),
            "request forwarded"
        );
        filtered
    }

    fn filter_completion(
        &self,
        target: &Arc<dyn IoTarget>,
        forwarded: ForwardedCompletion<'_>,
    ) -> Filtered {
        let completion = forwarded.completion();

        let unchanged = Filtered {
            completion,
            rewritten: false,
            mode_switch: None,
        };

        if !forwarded.status.is_success() {
            tracing::warn!(
                code = %forwarded.code,
                status = %forwarded.status,
                "forwarded request failed"
            );
            return unchanged;
        }

        if forwarded.code != IoControlCode::GetReportDescriptor {
            return unchanged;
        }

        let start = forwarded.offset;
        let Some(end) = start
            .checked_add(forwarded.information)
            .filter(|&end| end <= forwarded.output.len())
        else {
            tracing::error!(
                offset = start,
                length = forwarded.information,
                buffer = forwarded.output.len(),
                "report descriptor exceeds the output buffer"
            );
            return unchanged;
        };
        let descriptor = &mut forwarded.output[start..end];

        let (rewritten, mode_switch) = self.filter_report_descriptor(target, descriptor);
        Filtered {
            completion,
            rewritten,
            mode_switch,
        }
    }

    /// Rewrite a report descriptor in place and, if rewritten, switch the
    /// device to precision mode. Failures to switch are logged only.
    pub fn filter_report_descriptor(
        &self,
        target: &Arc<dyn IoTarget>,
        descriptor: &mut [u8],
    ) -> (bool, Option<ModeSwitch>) {
        if !patch_report_descriptor(descriptor) {
            tracing::info!(length = descriptor.len(), "no top-level touch pad usage found");
            return (false, None);
        }
        tracing::info!(
            length = descriptor.len(),
            "report descriptor now declares a touch screen"
        );

        if !self.config.switch_input_mode {
            return (true, None);
        }

        match switch_input_mode(Arc::clone(target), descriptor, &self.config) {
            Ok(mode_switch) => (true, Some(mode_switch)),
            Err(e) => {
                tracing::warn!(error = %e, "touchpad left in its default input mode");
                (true, None)
            }
        }
    }
}
