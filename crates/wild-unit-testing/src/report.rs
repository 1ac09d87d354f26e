//! Summary rendering for a recorder's tally.

use std::fmt;
use std::process::ExitCode;

use serde::{Deserialize, Serialize};

use crate::recorder::Tally;

/// Point-in-time snapshot of a recorder's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Checks that passed.
    pub passed: u64,
    /// Checks that failed.
    pub failed: u64,
    /// All checks recorded.
    pub total: u64,
}

impl Summary {
    /// Returns true if no check failed.
    #[must_use]
    pub const fn all_passed(&self) -> bool {
        self.failed == 0
    }

    /// Failure count as an exit status, saturating at 255.
    #[must_use]
    pub fn exit_status(&self) -> u8 {
        u8::try_from(self.failed).unwrap_or(u8::MAX)
    }

    /// Failure count as a process exit code.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.exit_status())
    }

    /// Render the summary as JSON.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }
}

impl From<Tally> for Summary {
    fn from(tally: Tally) -> Self {
        Self {
            passed: tally.passed,
            failed: tally.failed,
            total: tally.total,
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} passed, {} failed, {} total",
            self.passed, self.failed, self.total
        )
    }
}
