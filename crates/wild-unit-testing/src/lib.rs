//! Assertion recording for lightweight test executables.
//!
//! A test program is an ordinary binary that makes checks and exits with the
//! number of failures:
//!
//! ```ignore
//! use std::process::ExitCode;
//! use wild_unit_testing::{assert_equals, assert_prints, end_test};
//!
//! fn main() -> ExitCode {
//!     assert_equals!(13, 13);
//!     assert_prints!(print!("hello"), "hello");
//!     end_test!();
//! }
//! ```
//!
//! # Architecture
//!
//! - **Recorder** (`recorder`): the process-wide tally behind one re-entrant
//!   guard, writing `file(line): test failed` lines and the summary line
//! - **Assertions** (`assertions`, `macros`): boolean, equality, panic and
//!   returned-error expectations, output-capture checks
//! - **Capture** (`capture`): descriptor-level redirection of stdout/stderr
//! - **Configuration** (`config`): failure-detail and abort-on-fail flags
//! - **Report** (`report`): summary snapshot, JSON rendering, exit status

pub mod assertions;
pub mod capture;
pub mod config;
pub mod error;
pub mod location;
mod macros;
pub mod recorder;
pub mod report;

pub use assertions::{
    BoxError, NO_DETAILS, assert_equals, assert_false, assert_prints, assert_prints_to_stderr,
    assert_returns_err, assert_throws, assert_throws_matching, assert_true, end_test, fail, failed,
    finish, pass, passed, results, total,
};
pub use capture::{StdStream, capture_stderr, capture_stdout};
pub use config::{ReportConfig, report_config};
pub use error::CaptureError;
pub use location::SourceLocation;
pub use recorder::{MemorySink, Recorder, RecorderGuard, Tally, global_recorder};
pub use report::Summary;
