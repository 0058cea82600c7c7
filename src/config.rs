// SPDX-License-Identifier: MIT

//! Runtime configuration of the report descriptor filter.

use crate::usages::InputMode;

/// How long the locator considers itself inside the Device Configuration
/// collection once that collection was opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigScope {
    /// Never leave it again. Any later Feature item with an Input Mode
    /// usage matches, even in an unrelated top-level collection. This is
    /// how the filter has always behaved and real precision touchpad
    /// descriptors declare only one Input Mode usage.
    #[default]
    Sticky,
    /// Leave it when the Device Configuration collection is closed.
    Collection,
}

/// Configuration for [ReportDescriptorFilter](crate::filter::ReportDescriptorFilter).
///
/// ```
/// # use padscreen::config::*;
/// # use padscreen::usages::InputMode;
/// let config = FilterConfig::default()
///     .with_config_scope(ConfigScope::Collection)
///     .with_switch_input_mode(false);
/// assert_eq!(config.input_mode, InputMode::Touchpad);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterConfig {
    /// The mode written to the Input Mode feature after a rewrite.
    pub input_mode: InputMode,
    /// Send the Input Mode feature report after a rewrite at all.
    pub switch_input_mode: bool,
    /// See [ConfigScope].
    pub config_scope: ConfigScope,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            input_mode: InputMode::Touchpad,
            switch_input_mode: true,
            config_scope: ConfigScope::Sticky,
        }
    }
}

impl FilterConfig {
    pub fn with_input_mode(mut self, input_mode: InputMode) -> Self {
        self.input_mode = input_mode;
        self
    }

    pub fn with_switch_input_mode(mut self, switch_input_mode: bool) -> Self {
        self.switch_input_mode = switch_input_mode;
        self
    }

    pub fn with_config_scope(mut self, config_scope: ConfigScope) -> Self {
        self.config_scope = config_scope;
        self
    }
}
