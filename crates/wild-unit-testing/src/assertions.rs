//! Check operations built on the [`Recorder`].
//!
//! Every check records exactly one outcome. Failures never panic; panics
//! raised while the caller evaluates a check's operands are not caught.
//!
//! The free functions at the bottom report into [`global_recorder`] and pick
//! up the caller's location through `#[track_caller]`.

use std::any::Any;
use std::error::Error;
use std::fmt::Debug;
use std::panic::{self, AssertUnwindSafe};
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;

use crate::capture::StdStream;
use crate::location::SourceLocation;
use crate::recorder::{Recorder, global_recorder};

/// Detail of an equality failure when failure details are switched off.
pub const NO_DETAILS: &str = "no details";

/// Error returned by code checked with [`Recorder::assert_returns_err`].
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

impl Recorder {
    /// Pass if `value` is true.
    #[track_caller]
    pub fn assert_true(&self, value: bool, expr: &str) {
        if value {
            self.pass();
        } else {
            let detail = format!("{expr} did not evaluate to true");
            self.fail(&SourceLocation::caller(), &detail);
        }
    }

    /// Pass if `value` is false.
    #[track_caller]
    pub fn assert_false(&self, value: bool, expr: &str) {
        if value {
            let detail = format!("{expr} did not evaluate to false");
            self.fail(&SourceLocation::caller(), &detail);
        } else {
            self.pass();
        }
    }

    /// Pass if `x == y`. The operands may have different types as long as
    /// they compare, e.g. `&str` against `String`.
    #[track_caller]
    pub fn assert_equals<X, Y>(&self, x: &X, y: &Y, x_expr: &str, y_expr: &str)
    where
        X: PartialEq<Y> + Debug + ?Sized,
        Y: Debug + ?Sized,
    {
        self.equals_at(&SourceLocation::caller(), x, y, x_expr, y_expr);
    }

    fn equals_at<X, Y>(
        &self,
        location: &SourceLocation,
        x: &X,
        y: &Y,
        x_expr: &str,
        y_expr: &str,
    ) where
        X: PartialEq<Y> + Debug + ?Sized,
        Y: Debug + ?Sized,
    {
        if x == y {
            self.pass();
        } else if self.config().show_failure_details {
            let detail = format!("{x_expr} == {y_expr} (left: {x:?}, right: {y:?})");
            self.fail(location, &detail);
        } else {
            self.fail(location, NO_DETAILS);
        }
    }

    /// Pass if `code` panics with a payload of type `E`.
    ///
    /// No panic, or a panic with any other payload, is a failure. The panic
    /// hook is silenced for the current thread while `code` runs, so an
    /// expected throw writes nothing to stderr.
    ///
    /// `code` runs under the recorder's guard. Checks it records on its own
    /// thread are fine, but `code` must not wait on another thread that
    /// records checks: that thread blocks on the guard and both deadlock.
    #[track_caller]
    pub fn assert_throws<E: Any, R>(&self, code: impl FnOnce() -> R) {
        self.throws_at(&SourceLocation::caller(), code, |payload| payload.is::<E>());
    }

    /// Pass if `code` panics and `matches` accepts the payload.
    ///
    /// Same guard and panic hook handling as [`Recorder::assert_throws`].
    #[track_caller]
    pub fn assert_throws_matching<R>(
        &self,
        code: impl FnOnce() -> R,
        matches: impl FnOnce(&(dyn Any + Send)) -> bool,
    ) {
        self.throws_at(&SourceLocation::caller(), code, matches);
    }

    fn throws_at<R>(
        &self,
        location: &SourceLocation,
        code: impl FnOnce() -> R,
        matches: impl FnOnce(&(dyn Any + Send)) -> bool,
    ) {
        // The panic hook is process-wide; swapping it needs the guard.
        let _guard = self.lock();
        let outcome = {
            let _quiet = QuietPanics::install();
            panic::catch_unwind(AssertUnwindSafe(code))
        };
        let matched = match outcome {
            Ok(_) => false,
            Err(payload) => matches(payload.as_ref()),
        };
        self.assert(matched, location, "");
    }

    /// Pass if `code` returns an error that is, or is caused by, an `E`.
    ///
    /// `Ok` and errors whose `source()` chain holds no `E` are failures.
    /// Nothing panics here, so unlike [`Recorder::assert_throws`] `code` runs
    /// without the recorder's guard.
    #[track_caller]
    pub fn assert_returns_err<E, T>(&self, code: impl FnOnce() -> Result<T, BoxError>)
    where
        E: Error + 'static,
    {
        let location = SourceLocation::caller();
        let matched = match code() {
            Ok(_) => false,
            Err(err) => chain_contains::<E>(err.as_ref()),
        };
        self.assert(matched, &location, "");
    }

    /// Pass if `code` writes exactly `expected` to standard output.
    #[track_caller]
    pub fn assert_prints<R>(&self, code: impl FnOnce() -> R, expected: &str) {
        self.prints_at(&SourceLocation::caller(), StdStream::Stdout, code, expected);
    }

    /// Pass if `code` writes exactly `expected` to standard error.
    #[track_caller]
    pub fn assert_prints_to_stderr<R>(&self, code: impl FnOnce() -> R, expected: &str) {
        self.prints_at(&SourceLocation::caller(), StdStream::Stderr, code, expected);
    }

    fn prints_at<R>(
        &self,
        location: &SourceLocation,
        stream: StdStream,
        code: impl FnOnce() -> R,
        expected: &str,
    ) {
        // Held across capture and report so the outcome is ordered after
        // the stream is back in place.
        let _guard = self.lock();
        match self.capture(stream, code) {
            Ok((_, captured)) => {
                let captured_expr = format!("captured {stream}");
                self.equals_at(
                    location,
                    captured.as_str(),
                    expected,
                    &captured_expr,
                    "expected",
                );
            }
            Err(err) => self.fail(location, &err.to_string()),
        }
    }
}

type PanicHook = Box<dyn Fn(&panic::PanicHookInfo<'_>) + Sync + Send + 'static>;

/// Silences the panic hook for the installing thread until dropped, then puts
/// the previous hook back. Panics on other threads still reach that hook.
struct QuietPanics {
    previous: Option<Arc<PanicHook>>,
}

impl QuietPanics {
    fn install() -> Self {
        let previous = Arc::new(panic::take_hook());
        let delegate = Arc::clone(&previous);
        let quiet_thread = thread::current().id();
        panic::set_hook(Box::new(move |info| {
            if thread::current().id() != quiet_thread {
                (*delegate)(info);
            }
        }));
        Self {
            previous: Some(previous),
        }
    }
}

impl Drop for QuietPanics {
    fn drop(&mut self) {
        let Some(previous) = self.previous.take() else {
            return;
        };
        if thread::panicking() {
            return;
        }
        // Dropping the quiet hook releases its clone of `previous`.
        drop(panic::take_hook());
        match Arc::try_unwrap(previous) {
            Ok(hook) => panic::set_hook(hook),
            Err(shared) => panic::set_hook(Box::new(move |info| (*shared)(info))),
        }
    }
}

fn chain_contains<E: Error + 'static>(err: &(dyn Error + 'static)) -> bool {
    std::iter::successors(Some(err), |&e| e.source()).any(|e| e.is::<E>())
}

/// Record a passing check.
pub fn pass() {
    global_recorder().pass();
}

/// Record a failing check with `detail`.
#[track_caller]
pub fn fail(detail: &str) {
    global_recorder().fail(&SourceLocation::caller(), detail);
}

/// See [`Recorder::assert_true`].
#[track_caller]
pub fn assert_true(value: bool, expr: &str) {
    global_recorder().assert_true(value, expr);
}

/// See [`Recorder::assert_false`].
#[track_caller]
pub fn assert_false(value: bool, expr: &str) {
    global_recorder().assert_false(value, expr);
}

/// See [`Recorder::assert_equals`].
#[track_caller]
pub fn assert_equals<X, Y>(x: &X, y: &Y, x_expr: &str, y_expr: &str)
where
    X: PartialEq<Y> + Debug + ?Sized,
    Y: Debug + ?Sized,
{
    global_recorder().assert_equals(x, y, x_expr, y_expr);
}

/// See [`Recorder::assert_throws`].
#[track_caller]
pub fn assert_throws<E: Any, R>(code: impl FnOnce() -> R) {
    global_recorder().assert_throws::<E, R>(code);
}

/// See [`Recorder::assert_throws_matching`].
#[track_caller]
pub fn assert_throws_matching<R>(
    code: impl FnOnce() -> R,
    matches: impl FnOnce(&(dyn Any + Send)) -> bool,
) {
    global_recorder().assert_throws_matching(code, matches);
}

/// See [`Recorder::assert_returns_err`].
#[track_caller]
pub fn assert_returns_err<E, T>(code: impl FnOnce() -> Result<T, BoxError>)
where
    E: Error + 'static,
{
    global_recorder().assert_returns_err::<E, T>(code);
}

/// See [`Recorder::assert_prints`].
#[track_caller]
pub fn assert_prints<R>(code: impl FnOnce() -> R, expected: &str) {
    global_recorder().assert_prints(code, expected);
}

/// See [`Recorder::assert_prints_to_stderr`].
#[track_caller]
pub fn assert_prints_to_stderr<R>(code: impl FnOnce() -> R, expected: &str) {
    global_recorder().assert_prints_to_stderr(code, expected);
}

/// Write the global summary line.
pub fn results() {
    global_recorder().results();
}

/// Write the global summary line and return the failure count as a status.
pub fn end_test() -> i32 {
    global_recorder().end_test()
}

/// Write the global summary line and return a process exit code.
pub fn finish() -> ExitCode {
    let recorder = global_recorder();
    let _guard = recorder.lock();
    recorder.results();
    recorder.summary().exit_code()
}

pub fn passed() -> u64 {
    global_recorder().passed()
}

pub fn failed() -> u64 {
    global_recorder().failed()
}

pub fn total() -> u64 {
    global_recorder().total()
}
