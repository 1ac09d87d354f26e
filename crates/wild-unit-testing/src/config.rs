//! Reporting configuration.
//!
//! Two flags shape how failures are reported:
//! - `show_failure_details`: append the detail string to every failure line.
//!   Equality checks then render both source expressions and their values.
//! - `break_on_fail`: abort the process right after a failure line has been
//!   written. Meant for running a test executable under a debugger.
//!
//! Defaults come from the cargo features `show-failure-details` and
//! `break-on-fail`. The environment variables `WILD_TEST_SHOW_FAILURE_DETAILS`
//! and `WILD_TEST_BREAK_ON_FAIL` override them; they are read once, on first
//! use, and cached for the life of the process.

use std::sync::OnceLock;

/// Environment override for [`ReportConfig::show_failure_details`].
pub const SHOW_FAILURE_DETAILS_ENV: &str = "WILD_TEST_SHOW_FAILURE_DETAILS";

/// Environment override for [`ReportConfig::break_on_fail`].
pub const BREAK_ON_FAIL_ENV: &str = "WILD_TEST_BREAK_ON_FAIL";

/// Flags controlling failure reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReportConfig {
    /// Include the detail string in failure lines.
    pub show_failure_details: bool,
    /// Abort after writing a failure line.
    pub break_on_fail: bool,
}

impl ReportConfig {
    /// Flags as selected by cargo features at build time.
    #[must_use]
    pub const fn from_build() -> Self {
        Self {
            show_failure_details: cfg!(feature = "show-failure-details"),
            break_on_fail: cfg!(feature = "break-on-fail"),
        }
    }

    /// Build defaults with environment overrides applied.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build defaults with overrides taken from `lookup`.
    ///
    /// Values that do not parse as a flag keep the build default.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let build = Self::from_build();
        Self {
            show_failure_details: lookup(SHOW_FAILURE_DETAILS_ENV)
                .and_then(|v| flag_from_str_loose(&v))
                .unwrap_or(build.show_failure_details),
            break_on_fail: lookup(BREAK_ON_FAIL_ENV)
                .and_then(|v| flag_from_str_loose(&v))
                .unwrap_or(build.break_on_fail),
        }
    }

    /// Quiet reporting: bare failure lines, keep running.
    #[must_use]
    pub const fn quiet() -> Self {
        Self {
            show_failure_details: false,
            break_on_fail: false,
        }
    }

    /// Verbose reporting: failure lines carry their detail, keep running.
    #[must_use]
    pub const fn verbose() -> Self {
        Self {
            show_failure_details: true,
            break_on_fail: false,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self::from_build()
    }
}

/// Parse a boolean flag (case-insensitive). Returns `None` for anything else.
#[must_use]
pub fn flag_from_str_loose(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

static GLOBAL_CONFIG: OnceLock<ReportConfig> = OnceLock::new();

/// Get the process-wide report configuration (reads env vars on first call, caches thereafter).
#[must_use]
pub fn report_config() -> ReportConfig {
    *GLOBAL_CONFIG.get_or_init(ReportConfig::from_env)
}
