//! Compile configuration.
//!
//! A [`CompileConfig`] is an explicit immutable value passed into every
//! compile. One process-wide default slot exists for ergonomic parity
//! with the free-function API; it is mutated only through
//! [`configure`], never through ambient globals. Concurrent writers must
//! be serialized by the caller.

use crate::plume::targets::Target;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// Pure key/value compile options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CompileConfig {
    /// Target dialect the emitted code must run on.
    pub target: Target,
    /// Escalate style findings from advisory to fatal.
    pub strict: bool,
    /// Append `# line N` markers to emitted lines.
    pub line_numbers: bool,
    /// Append the original source line to each marker.
    pub keep_lines: bool,
    /// Drop the header, comments, and blank lines from the output.
    pub minify: bool,
}

impl CompileConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_line_numbers(mut self, line_numbers: bool) -> Self {
        self.line_numbers = line_numbers;
        self
    }

    pub fn with_keep_lines(mut self, keep_lines: bool) -> Self {
        self.keep_lines = keep_lines;
        self
    }

    pub fn with_minify(mut self, minify: bool) -> Self {
        self.minify = minify;
        self
    }
}

static ACTIVE: Lazy<RwLock<CompileConfig>> = Lazy::new(|| RwLock::new(CompileConfig::default()));

/// Replace the process-wide active configuration.
pub fn configure(config: CompileConfig) {
    *ACTIVE.write().expect("config lock") = config;
}

/// Snapshot the process-wide active configuration.
pub fn active_config() -> CompileConfig {
    *ACTIVE.read().expect("config lock")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plume::targets::{Target, Version};

    #[test]
    fn test_builder_style_options() {
        let config = CompileConfig::new()
            .with_target(Target::Exact(Version::new(3, 6)))
            .with_strict(true)
            .with_minify(true);
        assert_eq!(config.target, Target::Exact(Version::new(3, 6)));
        assert!(config.strict);
        assert!(config.minify);
        assert!(!config.line_numbers);
    }

    #[test]
    fn test_default_targets_latest() {
        assert_eq!(CompileConfig::default().target, Target::Sys);
    }

    #[test]
    fn test_config_round_trips_through_serde() {
        let config = CompileConfig::new().with_strict(true);
        let json = serde_json::to_string(&config).unwrap();
        let back: CompileConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
