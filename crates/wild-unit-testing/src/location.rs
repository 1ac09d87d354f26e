//! Call-site locations for failure lines.

use std::borrow::Cow;
use std::fmt;
use std::panic::Location;

/// File and line a check was made from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    /// Source file path as the compiler reports it.
    pub file: Cow<'static, str>,
    /// 1-based line number.
    pub line: u32,
}

impl SourceLocation {
    /// Build a location from explicit parts.
    #[must_use]
    pub fn new(file: impl Into<Cow<'static, str>>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    /// Location of the caller, propagated through `#[track_caller]` frames.
    #[must_use]
    #[track_caller]
    pub fn caller() -> Self {
        Location::caller().into()
    }
}

impl From<&'static Location<'static>> for SourceLocation {
    fn from(location: &'static Location<'static>) -> Self {
        Self {
            file: Cow::Borrowed(location.file()),
            line: location.line(),
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.file, self.line)
    }
}
